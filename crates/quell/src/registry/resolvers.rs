use std::{fmt, sync::Arc};

use async_graphql_parser::{types::Field, Pos, Positioned};
use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use super::{resolved_value::ResolvedValue, Registry};
use crate::{
    context::{Data, ExecutionStepInfo},
    error::{Error, ErrorClassification, ServerError},
};

/// How a field obtains its value.
#[derive(Clone, Default)]
pub enum Resolver {
    /// Read the field's key out of the parent value.
    #[default]
    Property,
    /// Hand the parent value down unchanged.
    Parent,
    /// Invoke a registered data fetcher.
    Custom(Arc<dyn DataFetcher>),
}

impl Resolver {
    pub fn custom(fetcher: impl DataFetcher + 'static) -> Self {
        Resolver::Custom(Arc::new(fetcher))
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Property => f.write_str("Property"),
            Resolver::Parent => f.write_str("Parent"),
            Resolver::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Everything a data fetcher can see about the field it is resolving.
pub struct FetchContext<'a> {
    pub registry: &'a Registry,
    /// The parent value the field is being resolved on.
    pub source: &'a ResolvedValue,
    /// The primary AST node of the merged field.
    pub field: &'a Positioned<Field>,
    /// The coerced argument values of the field.
    pub arguments: &'a IndexMap<Name, ConstValue>,
    pub step_info: &'a Arc<ExecutionStepInfo>,
    /// Context a parent fetcher handed down for this subtree, if any.
    pub local_context: Option<&'a Arc<Data>>,
    pub(crate) request_data: &'a Data,
    pub(crate) schema_data: &'a Data,
}

impl FetchContext<'_> {
    pub fn argument(&self, name: &str) -> Option<&ConstValue> {
        self.arguments.get(name)
    }

    /// Looks up user data: request-scoped first, then schema-scoped.
    pub fn data<D: std::any::Any + Send + Sync>(&self) -> Option<&D> {
        self.request_data.get::<D>().or_else(|| self.schema_data.get::<D>())
    }
}

/// The envelope a fetcher returns: the value itself, plus anything the fetcher wants merged into
/// the response or handed down to child resolution.
#[derive(Debug, Default)]
pub struct FetchedValue {
    pub value: ResolvedValue,
    /// Errors the fetcher reports alongside its (possibly partial) value.
    pub errors: Vec<ServerError>,
    /// Replaces the local context for child fields when set.
    pub local_context: Option<Arc<Data>>,
}

impl FetchedValue {
    pub fn new(value: impl Into<ResolvedValue>) -> Self {
        Self {
            value: value.into(),
            errors: Vec::new(),
            local_context: None,
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ServerError>) -> Self {
        self.errors = errors;
        self
    }

    #[must_use]
    pub fn with_local_context(mut self, local_context: Data) -> Self {
        self.local_context = Some(Arc::new(local_context));
        self
    }
}

impl From<serde_json::Value> for FetchedValue {
    fn from(value: serde_json::Value) -> Self {
        Self::new(ResolvedValue::new(value))
    }
}

impl From<ResolvedValue> for FetchedValue {
    fn from(value: ResolvedValue) -> Self {
        Self::new(value)
    }
}

/// Failure of a data fetcher.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// An ordinary failure, routed through the engine's [`FetchErrorHandler`].
    #[error("{}", .0.message)]
    Failure(Error),
    /// Stop the whole operation; the carried errors become the response's error list.
    #[error("execution aborted")]
    Aborted(Vec<ServerError>),
}

impl From<Error> for FetchError {
    fn from(error: Error) -> Self {
        FetchError::Failure(error)
    }
}

impl FetchError {
    /// Abort the operation with a single message.
    pub fn abort(message: impl Into<String>) -> Self {
        FetchError::Aborted(vec![
            ServerError::new(message, None).with_classification(ErrorClassification::ExecutionAborted)
        ])
    }
}

pub type FetchResult = Result<FetchedValue, FetchError>;

/// A user-supplied function producing a field's raw value.
#[async_trait::async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, ctx: FetchContext<'_>) -> FetchResult;
}

/// The information a [`TypeResolver`] decides from.
pub struct TypeResolution<'a> {
    pub registry: &'a Registry,
    pub data: &'a Data,
    /// The fetched value whose concrete type is wanted.
    pub value: &'a ResolvedValue,
    pub field: &'a Positioned<Field>,
    pub arguments: &'a IndexMap<Name, ConstValue>,
}

/// Resolves the concrete object type behind an interface or union value.
pub trait TypeResolver: Send + Sync {
    /// The name of the concrete object type, or `None` when it cannot be determined.
    fn resolve_type(&self, resolution: TypeResolution<'_>) -> Option<String>;
}

impl<F> TypeResolver for F
where
    F: Fn(TypeResolution<'_>) -> Option<String> + Send + Sync,
{
    fn resolve_type(&self, resolution: TypeResolution<'_>) -> Option<String> {
        self(resolution)
    }
}

/// What to do about a failed fetch: which errors to record, and which value the field gets
/// instead. The handler's decision is authoritative, so a custom handler can substitute partial
/// data rather than a null.
pub struct HandledFetchError {
    pub errors: Vec<ServerError>,
    pub substitute: ResolvedValue,
}

/// Decides what happens when a data fetcher fails.
pub trait FetchErrorHandler: Send + Sync {
    fn handle(&self, error: Error, step_info: &ExecutionStepInfo, pos: Pos) -> HandledFetchError;
}

/// Records one data-fetching error against the field's path and substitutes a null.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFetchErrorHandler;

impl FetchErrorHandler for DefaultFetchErrorHandler {
    fn handle(&self, error: Error, step_info: &ExecutionStepInfo, pos: Pos) -> HandledFetchError {
        let field = step_info.field_name().unwrap_or("<root>");
        HandledFetchError {
            errors: vec![ServerError::new(
                format!("An error occurred while fetching `{field}`: {}", error.message),
                Some(pos),
            )
            .with_path(step_info.path.clone())],
            substitute: ResolvedValue::null(),
        }
    }
}

/// Unwraps container-like holders a fetcher may produce, before the engine dispatches on the
/// value's shape.
pub trait ValueUnboxer: Send + Sync {
    fn unbox(&self, value: ResolvedValue) -> ResolvedValue;
}

/// JSON fetchers have no holder to strip; values are handed back untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultValueUnboxer;

impl ValueUnboxer for DefaultValueUnboxer {
    fn unbox(&self, value: ResolvedValue) -> ResolvedValue {
        value
    }
}
