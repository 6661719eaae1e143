// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    pub fn daemon_unreachable(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<mc_storage::StorageError> for ExitError {
    fn from(e: mc_storage::StorageError) -> Self {
        ExitError::new(1, e.to_string())
    }
}

impl From<mc_engine::EngineError> for ExitError {
    fn from(e: mc_engine::EngineError) -> Self {
        ExitError::new(1, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_uses_exit_code_two() {
        assert_eq!(ExitError::usage("bad flag").code, 2);
    }

    #[test]
    fn not_found_uses_exit_code_three() {
        assert_eq!(ExitError::not_found("no such task").code, 3);
    }

    #[test]
    fn daemon_unreachable_uses_exit_code_four() {
        assert_eq!(ExitError::daemon_unreachable("no socket").code, 4);
    }
}
