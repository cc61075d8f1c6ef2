//! Verification helpers for testing reconcilers
//!
//! Provides assertion helpers over the call log captured by the fake inventory

use thiserror::Error;

/// Verification error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected call '{expected}' not found in {actual:?}")]
    CallNotFound {
        expected: String,
        actual: Vec<String>,
    },

    #[error("Unexpected call '{call}' found")]
    UnexpectedCall { call: String },

    #[error("Expected {expected} calls matching '{pattern}', found {actual}")]
    CallCountMismatch {
        pattern: String,
        expected: usize,
        actual: usize,
    },

    #[error("Calls out of order: '{first}' should precede '{second}' in {actual:?}")]
    OrderMismatch {
        first: String,
        second: String,
        actual: Vec<String>,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Call log verifier
pub struct CallLogVerifier {
    calls: Vec<String>,
}

impl CallLogVerifier {
    /// Create a new verifier over captured calls
    pub fn new(calls: Vec<String>) -> Self {
        Self { calls }
    }

    fn position(&self, expected: &str) -> Option<usize> {
        self.calls.iter().position(|call| call.contains(expected))
    }

    /// Verify that a call containing `expected` was made
    pub fn assert_called(&self, expected: &str) -> VerifyResult<()> {
        match self.position(expected) {
            Some(_) => Ok(()),
            None => Err(VerificationError::CallNotFound {
                expected: expected.to_string(),
                actual: self.calls.clone(),
            }),
        }
    }

    /// Verify that no call containing `expected` was made
    pub fn assert_not_called(&self, expected: &str) -> VerifyResult<()> {
        match self.calls.iter().find(|call| call.contains(expected)) {
            Some(call) => Err(VerificationError::UnexpectedCall { call: call.clone() }),
            None => Ok(()),
        }
    }

    /// Verify the number of calls containing `pattern`
    pub fn assert_call_count(&self, pattern: &str, expected: usize) -> VerifyResult<()> {
        let actual = self
            .calls
            .iter()
            .filter(|call| call.contains(pattern))
            .count();
        if actual != expected {
            return Err(VerificationError::CallCountMismatch {
                pattern: pattern.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify the total number of calls
    pub fn assert_total_calls(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.calls.len();
        if actual != expected {
            return Err(VerificationError::CallCountMismatch {
                pattern: "*".to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify that the first call matching `first` precedes the first matching `second`
    pub fn assert_order(&self, first: &str, second: &str) -> VerifyResult<()> {
        let mismatch = || VerificationError::OrderMismatch {
            first: first.to_string(),
            second: second.to_string(),
            actual: self.calls.clone(),
        };
        match (self.position(first), self.position(second)) {
            (Some(a), Some(b)) if a < b => Ok(()),
            _ => Err(mismatch()),
        }
    }

    /// Get all captured calls
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}
