use serde_json::error::Category;
use serde_json::Value;
use thiserror::Error;

/// Upper bound on how much of a rejected payload is echoed into an error.
pub const RAW_EXCERPT_LIMIT: usize = 256;

/// Failure decoding a `tagSpecificationSet` value.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TagSpecError {
    #[error("unexpected hidden value: {0:?}")]
    UnexpectedSentinel(String),
    #[error("tagSpecificationSet is neither hidden nor a valid tag specification set ({reason}): {raw}")]
    Shape { raw: String, reason: String },
}

impl TagSpecError {
    pub(crate) fn shape(raw: &str, reason: impl std::fmt::Display) -> Self {
        TagSpecError::Shape {
            raw: excerpt(raw, RAW_EXCERPT_LIMIT),
            reason: reason.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    Syntax,
    TypeMismatch,
    UnexpectedSentinel,
    Shape,
    Io,
}

impl DecodeErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::TypeMismatch => "type_mismatch",
            Self::UnexpectedSentinel => "unexpected_sentinel",
            Self::Shape => "shape",
            Self::Io => "io",
        }
    }
}

/// Fatal failure decoding one record or document.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("syntax error at line {line} column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("type mismatch at {path}: {message}")]
    TypeMismatch { path: String, message: String },
    #[error("unexpected sentinel at {path}: {value:?}")]
    UnexpectedSentinel { path: String, value: String },
    #[error("shape error at {path}: {source}")]
    Shape { path: String, source: TagSpecError },
    #[error("read failure: {0}")]
    Io(String),
}

impl DecodeError {
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            DecodeError::Syntax { .. } => DecodeErrorKind::Syntax,
            DecodeError::TypeMismatch { .. } => DecodeErrorKind::TypeMismatch,
            DecodeError::UnexpectedSentinel { .. } => DecodeErrorKind::UnexpectedSentinel,
            DecodeError::Shape { .. } => DecodeErrorKind::Shape,
            DecodeError::Io(_) => DecodeErrorKind::Io,
        }
    }

    /// Field path of the failure, for the kinds that have one.
    pub fn path(&self) -> Option<&str> {
        match self {
            DecodeError::TypeMismatch { path, .. }
            | DecodeError::UnexpectedSentinel { path, .. }
            | DecodeError::Shape { path, .. } => Some(path),
            DecodeError::Syntax { .. } | DecodeError::Io(_) => None,
        }
    }

    pub(crate) fn from_tag_spec(path: String, err: TagSpecError) -> Self {
        match err {
            TagSpecError::UnexpectedSentinel(value) => {
                DecodeError::UnexpectedSentinel { path, value }
            }
            shape @ TagSpecError::Shape { .. } => DecodeError::Shape {
                path,
                source: shape,
            },
        }
    }

    /// Classifies a failure from the text-to-JSON stage.
    pub(crate) fn from_parse(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Io => DecodeError::Io(err.to_string()),
            Category::Syntax | Category::Eof | Category::Data => DecodeError::Syntax {
                line: err.line(),
                column: err.column(),
                message: err.to_string(),
            },
        }
    }

    /// Prefixes the failure path, used when a record sits inside an envelope.
    pub(crate) fn within(self, prefix: &str) -> Self {
        let join = |path: String| {
            if path == "." {
                prefix.to_string()
            } else if path.starts_with('[') {
                format!("{prefix}{path}")
            } else {
                format!("{prefix}.{path}")
            }
        };
        match self {
            DecodeError::TypeMismatch { path, message } => DecodeError::TypeMismatch {
                path: join(path),
                message,
            },
            DecodeError::UnexpectedSentinel { path, value } => DecodeError::UnexpectedSentinel {
                path: join(path),
                value,
            },
            DecodeError::Shape { path, source } => DecodeError::Shape {
                path: join(path),
                source,
            },
            other => other,
        }
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Truncates on a character boundary, marking the cut with `...`.
pub(crate) fn excerpt(raw: &str, limit: usize) -> String {
    if raw.len() <= limit {
        return raw.to_string();
    }
    let mut end = limit;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &raw[..end])
}
