use thiserror::Error;

/// A single tail-position violation found by the validator.
///
/// Carries enough context for a human to find and fix the offending call
/// without re-running the validator: the 1-based source line and a short
/// diagnostic naming what composed around the self-call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub line: u32,
    pub message: String,
}

impl Violation {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// The single structured error kind raised by the core, per decoration.
///
/// Exactly one of these is ever surfaced for a given decoration attempt, and
/// `NotTailRecursive` is the only one that accumulates more than one
/// finding.
#[derive(Debug, Error)]
pub enum TcoError {
    #[error("function is declared `async` and cannot be trampolined")]
    AsyncRejected,

    #[error(
        "function `{qualname}` is defined inside another function; hoist it to module scope"
    )]
    NestedRejected { qualname: String },

    #[error("function contains `yield` or `yield from` and cannot be trampolined")]
    GeneratorRejected,

    #[error("{} self-call(s) not in tail position", violations.len())]
    NotTailRecursive { violations: Vec<Violation> },

    #[error("could not retrieve source for the decorated function: {reason}")]
    SourceUnavailable { reason: String },

    #[error("self-call argument shape cannot be remapped to declared parameters: {reason}")]
    ArgumentShape { reason: String },
}

impl TcoError {
    /// A short machine-stable discriminator, mirroring the enum variant name
    /// (`ASYNC_REJECTED`, `NOT_TAIL_RECURSIVE`, ...). Used by the PyO3
    /// boundary to pick the Python exception type to raise and by tests that
    /// want to assert on the error *kind* rather than its message.
    pub fn kind(&self) -> &'static str {
        match self {
            TcoError::AsyncRejected => "ASYNC_REJECTED",
            TcoError::NestedRejected { .. } => "NESTED_REJECTED",
            TcoError::GeneratorRejected => "GENERATOR_REJECTED",
            TcoError::NotTailRecursive { .. } => "NOT_TAIL_RECURSIVE",
            TcoError::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            TcoError::ArgumentShape { .. } => "ARGUMENT_SHAPE",
        }
    }
}

pub type Result<T> = std::result::Result<T, TcoError>;
