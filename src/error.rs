//! The error taxonomy for the compiler core (spec.md §7).
//!
//! Every pass returns `Result<_, CompileError>` instead of panicking; the
//! only thing resembling the original teaching compiler's bare
//! `raise Exception(...)` calls is the `MalformedIr` variant, which carries
//! the offending shape for debugging.

use derive_more::Display;

/// Fatal compiler errors. There is no local recovery from any of these: a
/// pass either produces well-formed output for the next pass or the whole
/// pipeline aborts.
#[derive(Debug, Display, thiserror::Error)]
pub enum CompileError {
    /// A pass encountered an AST/IR shape outside its expected grammar.
    #[display("malformed IR in pass `{pass}`: {shape}")]
    MalformedIr { pass: &'static str, shape: String },

    /// Raised by the (in-crate) type checker; the rest of the pipeline
    /// assumes a well-typed program.
    #[display("type error: {0}")]
    TypeMismatch(String),

    /// A pattern for which no instruction exists.
    #[display("unsupported operation in pass `{pass}`: {detail}")]
    Unsupported { pass: &'static str, detail: String },

    /// Missing analysis name, empty transform list, or other pipeline
    /// misconfiguration detected before running.
    #[display("configuration error: {0}")]
    Configuration(String),

    /// Lexer/parser failure reading the surface syntax.
    #[display("syntax error: {0}")]
    Syntax(String),
}

impl From<crate::front::parse::ParseError> for CompileError {
    fn from(e: crate::front::parse::ParseError) -> Self {
        CompileError::Syntax(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
