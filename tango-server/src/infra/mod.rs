//! Infrastructure adapters: authority client, circuit breaker, broker,
//! ticket renderer, SMTP relay

pub mod afip;
pub mod broker;
pub mod circuit_breaker;
pub mod mailer;
pub mod ticket;
