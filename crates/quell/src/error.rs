use std::{
    any::Any,
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use async_graphql_parser::Pos;
use query_path::QueryPath;
use serde::{ser::SerializeMap, Serialize, Serializer};

/// An error a data fetcher or scalar coercion reports.
///
/// Carries a message and, when built from another error value, the original error so callers can
/// downcast it back out.
#[derive(Clone)]
pub struct Error {
    pub message: String,
    /// The original error value this one was created from, if any.
    pub source: Option<Arc<dyn Any + Send + Sync>>,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap another error value, keeping it available for downcasting.
    pub fn new_with_source(source: impl Display + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn into_server_error(self, pos: Pos) -> ServerError {
        ServerError::new(self.message, Some(pos))
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error").field("message", &self.message).finish_non_exhaustive()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl<T: Display + Send + Sync + 'static> From<T> for Error {
    fn from(source: T) -> Self {
        Self::new_with_source(source)
    }
}

/// Classifies an error for clients; rendered inside the error's `extensions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorClassification {
    ValidationError,
    DataFetchingException,
    NullValueInNonNullableField,
    UnresolvedType,
    OperationNotSupported,
    ExecutionAborted,
}

/// An error in the response, positioned well enough for a client to point at the failing part of
/// the query: source locations into the document and the path of the failing value in the result.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerError {
    pub message: String,
    pub locations: Vec<Pos>,
    pub path: QueryPath,
    pub classification: ErrorClassification,
}

impl ServerError {
    pub fn new(message: impl Into<String>, pos: Option<Pos>) -> Self {
        Self {
            message: message.into(),
            locations: pos.into_iter().collect(),
            path: QueryPath::empty(),
            classification: ErrorClassification::DataFetchingException,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: QueryPath) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_classification(mut self, classification: ErrorClassification) -> Self {
        self.classification = classification;
        self
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Serialize for ServerError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct ErrorLocation {
            line: usize,
            column: usize,
        }

        #[derive(Serialize)]
        struct ErrorExtensions {
            classification: ErrorClassification,
        }

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("message", &self.message)?;
        if !self.locations.is_empty() {
            let locations: Vec<_> = self
                .locations
                .iter()
                .map(|pos| ErrorLocation {
                    line: pos.line,
                    column: pos.column,
                })
                .collect();
            map.serialize_entry("locations", &locations)?;
        }
        if !self.path.is_empty() {
            map.serialize_entry("path", &self.path)?;
        }
        map.serialize_entry(
            "extensions",
            &ErrorExtensions {
                classification: self.classification,
            },
        )?;
        map.end()
    }
}

/// An alias for `Result<T, ServerError>`.
pub type ServerResult<T> = std::result::Result<T, ServerError>;
