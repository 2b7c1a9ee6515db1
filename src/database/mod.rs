//! Database
//!
//! Postgres connection establishment and connect-failure classification.

pub mod classify;
pub mod connector;

pub use classify::{classify_connect_error, ConnectFailureKind, AUTH_RACE_MARKERS};
pub use connector::{
    ConnectionEstablisher, DatabaseSession, DriverError, MockConnection, MockPostgresConnector,
    PgConnection, PostgresConnector, TokioPostgresConnector,
};
