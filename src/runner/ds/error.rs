use thiserror::Error;

/// Exception thrown by an entry point.
///
/// The facade logs it and reports the call as failed; it never reaches a
/// handle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JErrorType {
    /// Arguments of the wrong shape.
    #[error("TypeError: {0}")]
    TypeError(String),
    /// Heap budget exceeded.
    #[error("RangeError: {0}")]
    RangeError(String),
    /// Input the unit cannot make sense of at all.
    #[error("SyntaxError: {0}")]
    SyntaxError(String),
}

impl JErrorType {
    pub fn message(&self) -> &str {
        match self {
            JErrorType::TypeError(m) | JErrorType::RangeError(m) | JErrorType::SyntaxError(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = JErrorType::TypeError("descriptor must be an object".to_string());
        assert_eq!(e.to_string(), "TypeError: descriptor must be an object");
        assert_eq!(e.message(), "descriptor must be an object");
    }
}
