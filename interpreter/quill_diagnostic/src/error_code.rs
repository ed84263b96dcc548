//! Stable error codes for searchability.
//!
//! Ranges mirror the error taxonomy: E1xxx parse, E2xxx reference,
//! E3xxx type, E4xxx validation, E5xxx runtime, E6xxx external.

use std::fmt;

/// Stable diagnostic code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorCode {
    // Parse (E1xxx)
    UnexpectedToken,
    UnclosedTag,
    MismatchedTag,
    UnterminatedExpr,
    MalformedAttribute,
    UnknownTag,

    // Reference (E2xxx)
    UndefinedVariable,
    UndefinedFunction,

    // Type (E3xxx)
    TypeMismatch,
    InvalidComparison,

    // Validation (E4xxx)
    MissingRequiredParam,
    ParamRuleViolation,

    // Runtime (E5xxx)
    DivisionByZero,
    ZeroStep,
    RecursionLimit,
    MisplacedControl,
    MissingOperand,
    UnknownOperation,

    // External (E6xxx)
    ExternalFailure,
}

impl ErrorCode {
    /// The code string as shown to users.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnexpectedToken => "E1001",
            ErrorCode::UnclosedTag => "E1002",
            ErrorCode::MismatchedTag => "E1003",
            ErrorCode::UnterminatedExpr => "E1004",
            ErrorCode::MalformedAttribute => "E1005",
            ErrorCode::UnknownTag => "E1006",
            ErrorCode::UndefinedVariable => "E2001",
            ErrorCode::UndefinedFunction => "E2002",
            ErrorCode::TypeMismatch => "E3001",
            ErrorCode::InvalidComparison => "E3002",
            ErrorCode::MissingRequiredParam => "E4001",
            ErrorCode::ParamRuleViolation => "E4002",
            ErrorCode::DivisionByZero => "E5001",
            ErrorCode::ZeroStep => "E5002",
            ErrorCode::RecursionLimit => "E5003",
            ErrorCode::MisplacedControl => "E5004",
            ErrorCode::MissingOperand => "E5005",
            ErrorCode::UnknownOperation => "E5006",
            ErrorCode::ExternalFailure => "E6001",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let all = [
            ErrorCode::UnexpectedToken,
            ErrorCode::UnclosedTag,
            ErrorCode::MismatchedTag,
            ErrorCode::UnterminatedExpr,
            ErrorCode::MalformedAttribute,
            ErrorCode::UnknownTag,
            ErrorCode::UndefinedVariable,
            ErrorCode::UndefinedFunction,
            ErrorCode::TypeMismatch,
            ErrorCode::InvalidComparison,
            ErrorCode::MissingRequiredParam,
            ErrorCode::ParamRuleViolation,
            ErrorCode::DivisionByZero,
            ErrorCode::ZeroStep,
            ErrorCode::RecursionLimit,
            ErrorCode::MisplacedControl,
            ErrorCode::MissingOperand,
            ErrorCode::UnknownOperation,
            ErrorCode::ExternalFailure,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }
}
