//! Error types for template evaluation.
//!
//! `EvalErrorKind` carries structured data per failure; factory functions
//! are the construction API and keep message wording in one place. Every
//! error converts to a `Diagnostic` for the execution result envelope.

use quill_diagnostic::{Diagnostic, ErrorCode};
use quill_ir::Span;
use std::fmt;

use crate::Value;

/// Result of evaluating an expression or node.
pub type EvalResult = Result<Value, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalErrorKind {
    // Reference
    UndefinedVariable { name: String },
    UndefinedFunction { name: String },

    // Type
    TypeMismatch { expected: &'static str, got: String },
    InvalidComparison { left: String, right: String },

    // Validation
    MissingRequiredParam { function: String, param: String },
    ParamRuleViolation { function: String, param: String, rule: String },

    // Runtime
    DivisionByZero,
    ZeroStep,
    RecursionLimit { depth: usize },
    MisplacedControl { what: String },
    MissingOperand { operation: String },
    UnknownOperation { operation: String },

    // External
    External { message: String },
}

impl EvalErrorKind {
    /// The stable diagnostic code for this kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            EvalErrorKind::UndefinedVariable { .. } => ErrorCode::UndefinedVariable,
            EvalErrorKind::UndefinedFunction { .. } => ErrorCode::UndefinedFunction,
            EvalErrorKind::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            EvalErrorKind::InvalidComparison { .. } => ErrorCode::InvalidComparison,
            EvalErrorKind::MissingRequiredParam { .. } => ErrorCode::MissingRequiredParam,
            EvalErrorKind::ParamRuleViolation { .. } => ErrorCode::ParamRuleViolation,
            EvalErrorKind::DivisionByZero => ErrorCode::DivisionByZero,
            EvalErrorKind::ZeroStep => ErrorCode::ZeroStep,
            EvalErrorKind::RecursionLimit { .. } => ErrorCode::RecursionLimit,
            EvalErrorKind::MisplacedControl { .. } => ErrorCode::MisplacedControl,
            EvalErrorKind::MissingOperand { .. } => ErrorCode::MissingOperand,
            EvalErrorKind::UnknownOperation { .. } => ErrorCode::UnknownOperation,
            EvalErrorKind::External { .. } => ErrorCode::ExternalFailure,
        }
    }

    /// Whether this is a validation failure (always aborts the call,
    /// never downgraded by lenient mode).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EvalErrorKind::MissingRequiredParam { .. } | EvalErrorKind::ParamRuleViolation { .. }
        )
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalErrorKind::UndefinedVariable { name } => {
                write!(f, "`{name}` is not defined in any scope")
            }
            EvalErrorKind::UndefinedFunction { name } => {
                write!(f, "no function named `{name}`")
            }
            EvalErrorKind::TypeMismatch { expected, got } => {
                write!(f, "expected {expected}, got {got}")
            }
            EvalErrorKind::InvalidComparison { left, right } => {
                write!(f, "cannot order {left} against {right}")
            }
            EvalErrorKind::MissingRequiredParam { function, param } => {
                write!(f, "`{function}` requires parameter `{param}`")
            }
            EvalErrorKind::ParamRuleViolation {
                function,
                param,
                rule,
            } => {
                write!(f, "parameter `{param}` of `{function}` violates {rule}")
            }
            EvalErrorKind::DivisionByZero => write!(f, "division by zero"),
            EvalErrorKind::ZeroStep => write!(f, "loop step must not be zero"),
            EvalErrorKind::RecursionLimit { depth } => {
                write!(f, "recursion depth limit ({depth}) exceeded")
            }
            EvalErrorKind::MisplacedControl { what } => write!(f, "{what}"),
            EvalErrorKind::MissingOperand { operation } => {
                write!(f, "`{operation}` requires a value")
            }
            EvalErrorKind::UnknownOperation { operation } => {
                write!(f, "unknown set operation `{operation}`")
            }
            EvalErrorKind::External { message } => {
                write!(f, "external collaborator failed: {message}")
            }
        }
    }
}

/// An evaluation error with an optional source position.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Option<Span>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        EvalError { kind, span: None }
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Convert to a diagnostic for the result envelope.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.kind.code(), self.kind.to_string());
        match self.span {
            Some(span) => diag.with_label(span, "while evaluating this"),
            None => diag,
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for EvalError {}

// Factory functions

pub fn undefined_variable(name: impl Into<String>, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::UndefinedVariable { name: name.into() }).with_span(span)
}

pub fn undefined_function(name: impl Into<String>, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::UndefinedFunction { name: name.into() }).with_span(span)
}

pub fn type_mismatch(expected: &'static str, got: &Value) -> EvalError {
    EvalError::new(EvalErrorKind::TypeMismatch {
        expected,
        got: got.type_name().to_string(),
    })
}

pub fn invalid_comparison(left: &Value, right: &Value) -> EvalError {
    EvalError::new(EvalErrorKind::InvalidComparison {
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    })
}

pub fn missing_required_param(function: impl Into<String>, param: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::MissingRequiredParam {
        function: function.into(),
        param: param.into(),
    })
}

pub fn param_rule_violation(
    function: impl Into<String>,
    param: impl Into<String>,
    rule: impl Into<String>,
) -> EvalError {
    EvalError::new(EvalErrorKind::ParamRuleViolation {
        function: function.into(),
        param: param.into(),
        rule: rule.into(),
    })
}

pub fn division_by_zero() -> EvalError {
    EvalError::new(EvalErrorKind::DivisionByZero)
}

pub fn zero_step(span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::ZeroStep).with_span(span)
}

pub fn recursion_limit(depth: usize) -> EvalError {
    EvalError::new(EvalErrorKind::RecursionLimit { depth })
}

pub fn misplaced_control(what: impl Into<String>, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::MisplacedControl { what: what.into() }).with_span(span)
}

pub fn missing_operand(operation: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::MissingOperand {
        operation: operation.into(),
    })
}

pub fn unknown_operation(operation: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::UnknownOperation {
        operation: operation.into(),
    })
}

pub fn external_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::External {
        message: message.into(),
    })
}
