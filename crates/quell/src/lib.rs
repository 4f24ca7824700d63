//! A GraphQL query execution engine.
//!
//! Given a parsed, validated document, a [`Registry`] describing the schema, and raw input
//! variables, the engine walks the selection tree, resolves each field against its registered
//! resolver, coerces values against the declared types, merges overlapping selections, applies
//! `@skip`/`@include`, resolves interface and union values to concrete object types, enforces
//! non-null propagation, and assembles a single ordered result next to an order-independent
//! error list.
//!
//! Parsing is an external collaborator (`async-graphql-parser`); schema construction out of SDL
//! and transport concerns live above this crate. Fields resolve cooperatively: one logical
//! future per field and per list element, scheduled by the injected [`ExecutionStrategy`].
//!
//! ```ignore
//! let schema = Schema::build(registry).data(Database::connect()).finish();
//! let response = schema.execute(Request::new(document).variables(variables)).await;
//! ```

pub mod collect;
pub mod context;
mod error;
pub mod execution;
pub mod registry;
mod request;
mod response;
mod schema;
pub mod values;

pub use async_graphql_parser as parser;
pub use async_graphql_value::{ConstValue, Name, Value, Variables};
pub use query_path::{QueryPath, QueryPathSegment};

pub use crate::{
    context::{Data, ErrorSink, ExecutionContext, ExecutionParameters, ExecutionStepInfo},
    error::{Error, ErrorClassification, ServerError, ServerResult},
    execution::{
        BoundedStrategy, Concurrency, ConcurrentStrategy, ExecutionResult, ExecutionStrategy, Interrupt,
        SerialStrategy,
    },
    registry::{
        DataFetcher, DefaultFetchErrorHandler, DefaultValueUnboxer, EnumType, FetchContext, FetchError,
        FetchErrorHandler, FetchResult, FetchedValue, HandledFetchError, InputObjectType, InterfaceType, MetaField,
        MetaFieldType, MetaInputValue, MetaType, ObjectType, Registry, ResolvedValue, Resolver, ScalarCoercion,
        ScalarParser, ScalarType, TypeResolution, TypeResolver, UnionType, ValueUnboxer,
    },
    request::{BatchRequest, Request},
    response::{BatchResponse, Response},
    schema::{Schema, SchemaBuilder, SchemaEnv},
    values::{coerce_variable_values, get_argument_values, InputValueError},
};
