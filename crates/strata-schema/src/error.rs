use std::fmt;

/// Position of the DDL construct an error refers to, as reported by the
/// query-language parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Classifies an [`Error`].
///
/// The first three kinds are user-facing and map to invalid schema input.
/// `Internal` indicates a malformed command tree or a bug in the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Unresolvable, unknown, or malformed name.
    #[error("{0}")]
    Name(String),

    /// Invalid schema definition (bad inheritance, duplicate members, ...).
    #[error("{0}")]
    Definition(String),

    /// Definition that is well-formed but fails a finalize-time check.
    #[error("{0}")]
    Validation(String),

    /// Inconsistent command tree or engine state.
    #[error("internal error: {0}")]
    Internal(String),
}

/// An error raised while building, mutating, or diffing a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    span: Option<Span>,
}

impl Error {
    pub fn name(msg: impl Into<String>) -> Self {
        ErrorKind::Name(msg.into()).into()
    }

    pub fn definition(msg: impl Into<String>) -> Self {
        ErrorKind::Definition(msg.into()).into()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ErrorKind::Validation(msg.into()).into()
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ErrorKind::Internal(msg.into()).into()
    }

    /// Attaches a source position if one is known and none is set yet.
    pub fn with_span(mut self, span: Option<Span>) -> Self {
        if self.span.is_none() {
            self.span = span;
        }
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn is_name_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Name(_))
    }

    pub fn is_definition_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Definition(_))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, span: None }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)?;
        if let Some(span) = self.span {
            write!(f, " (at {span})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
