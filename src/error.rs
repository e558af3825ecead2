//! Error taxonomy for the compiler.
//!
//! Everything here is deterministic: retrying a failed compilation with the
//! same inputs fails identically, so no variant is retryable. Each variant
//! carries the names involved so callers can render a diagnostic without
//! re-parsing the source text.

use crate::ir::RpcKind;

/// Which document failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseContext {
    Sdl,
    Operation,
}

impl std::fmt::Display for ParseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseContext::Sdl => write!(f, "schema document"),
            ParseContext::Operation => write!(f, "operation document"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CompileError {
    #[error("failed to parse GraphQL {context}: {message}")]
    Parse { context: ParseContext, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The type reference cannot be reduced to a `{name, list, required}`
    /// triple (e.g. a list nested inside a list).
    #[error("type '{rendered}' of {owner}.{field} cannot be mapped to a proto type")]
    UnmappableType {
        owner: String,
        field: String,
        rendered: String,
    },

    /// Two distinct messages registered under the same name.
    #[error("duplicate message name \"{name}\" in service \"{service}\"")]
    NameCollision { service: String, name: String },

    /// A field placeholder was never resolved before `build()`.
    #[error("field \"{field}\" in message \"{message}\" was never resolved")]
    UnresolvedField { message: String, field: String },

    /// An unsupported definition escalated to a hard error by the caller.
    #[error("unsupported definition: {0}")]
    Unsupported(Diagnostic),

    #[error("Schema does not define {0} type")]
    MissingRootType(RpcKind),

    #[error("Field '{field}' not found on type '{parent}'")]
    UnknownField { parent: String, field: String },

    #[error("Field '{field}' of type '{ty}' requires a selection set")]
    MissingSubselection { field: String, ty: String },

    #[error("Field '{field}' of type '{ty}' cannot have a selection set")]
    UnexpectedSubselection { field: String, ty: String },

    #[error("Duplicate fragment definition \"{0}\"")]
    DuplicateFragment(String),

    #[error("Unknown fragment \"{0}\"")]
    UnknownFragment(String),

    #[error("Circular fragment dependency detected: {0}")]
    CircularFragment(String),

    #[error("Fragment \"{name}\" cannot be spread on type \"{parent}\"")]
    FragmentTypeMismatch { name: String, parent: String },
}

impl CompileError {
    pub(crate) fn parse(context: ParseContext, message: impl std::fmt::Display) -> Self {
        CompileError::Parse {
            context,
            message: message.to_string(),
        }
    }
}

/// Structural preconditions for reversible operation compilation.
///
/// The message texts are part of the public contract; callers match on them
/// in user-facing tooling.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No named operations found in document")]
    NoNamedOperations,

    #[error("Multiple operations found in document: {}", .names.join(", "))]
    MultipleOperations { names: Vec<String> },

    #[error("Root-level field alias \"{alias}: {field}\" is not supported")]
    RootFieldAlias { alias: String, field: String },
}

/// A definition the reader saw but cannot map to a message or RPC.
///
/// These are collected, not raised: the caller decides whether an
/// unsupported construct is fatal for its use case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: UnsupportedKind,
    pub name: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedKind {
    Scalar,
    Interface,
    Union,
    Enum,
    Directive,
    TypeExtension,
}

impl UnsupportedKind {
    fn label(self) -> &'static str {
        match self {
            UnsupportedKind::Scalar => "scalar",
            UnsupportedKind::Interface => "interface",
            UnsupportedKind::Union => "union",
            UnsupportedKind::Enum => "enum",
            UnsupportedKind::Directive => "directive",
            UnsupportedKind::TypeExtension => "type extension",
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} definition \"{}\" at {}:{} has no proto mapping",
            self.kind.label(),
            self.name,
            self.line,
            self.column
        )
    }
}
