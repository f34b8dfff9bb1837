//! Error categories - drive the logging policy in the axum integration

/// Coarse error category derived from the code range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Business-rule violations surfaced verbatim to the client
    Domain,
    /// Authentication / authorization failures
    Auth,
    /// Infrastructure failures - logged with full detail, surfaced generically
    System,
}
