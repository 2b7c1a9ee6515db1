//! Connect Failure Classification
//!
//! Decides which Postgres connect failures are worth retrying. A role that
//! Vault created a moment ago may not be visible to the server yet, which
//! surfaces as an authentication failure. The decision is a case-insensitive
//! substring match of the driver's error text against [`AUTH_RACE_MARKERS`].
//! Changes in server or driver wording change the outcome.

/// Lower-case phrases that identify an authentication race.
///
/// | marker | seen when |
/// |---|---|
/// | `sasl` | SCRAM exchange rejected for a role the server does not know yet |
/// | `password authentication failed` | the new password is not active yet |
/// | `no pg_hba.conf entry` | host-based access rules do not cover the role yet |
pub const AUTH_RACE_MARKERS: &[&str] = &[
    "sasl",
    "password authentication failed",
    "no pg_hba.conf entry",
];

/// Outcome of classifying a connect failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailureKind {
    /// Credential not recognised yet; retry with backoff.
    AuthenticationRace,
    /// Anything else; fail immediately.
    Fatal,
}

/// Classify a connect error by its message.
pub fn classify_connect_error(message: &str) -> ConnectFailureKind {
    let lowered = message.to_lowercase();
    if AUTH_RACE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        ConnectFailureKind::AuthenticationRace
    } else {
        ConnectFailureKind::Fatal
    }
}
