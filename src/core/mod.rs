//! Core Infrastructure
//!
//! HTTP transport used to talk to the Vault API.

pub mod transport;

pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};
