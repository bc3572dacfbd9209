//! Convenience result type alias for Devanthos.

use crate::error::AppError;

/// A specialized `Result` type for Devanthos operations.
pub type AppResult<T> = Result<T, AppError>;
