//! Shared library for the Tango POS backend
//!
//! Cross-cutting pieces used by the server and its tests: structured error
//! codes with their HTTP envelope, fixed-point money helpers, and small time
//! utilities.

pub mod error;
pub mod money;
pub mod util;

pub use error::{AppError, AppResult, ErrorCode};
