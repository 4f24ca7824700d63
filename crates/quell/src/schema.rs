//! The orchestrator: operation selection, variable coercion, root-type lookup, strategy dispatch
//! and final response assembly.

use std::{any::Any, ops::Deref, sync::Arc};

use async_graphql_parser::types::{DocumentOperations, ExecutableDocument, OperationDefinition, OperationType};
use async_graphql_parser::Positioned;
use async_graphql_value::{ConstValue, Name};
use futures_util::StreamExt;
use tracing::Instrument;
use ulid::Ulid;

use crate::{
    collect::collect_fields,
    context::{Data, ErrorSink, ExecutionContext, ExecutionParameters, ExecutionStepInfo},
    error::{ErrorClassification, ServerError},
    execution::{ConcurrentStrategy, ExecutionStrategy, Interrupt, SerialStrategy},
    registry::{
        DefaultFetchErrorHandler, DefaultValueUnboxer, FetchErrorHandler, ObjectType, Registry, ResolvedValue,
        ValueUnboxer,
    },
    request::{BatchRequest, Request},
    response::{BatchResponse, Response},
    values,
};

/// Assembles a [`Schema`], injecting the strategies and capability objects execution uses.
pub struct SchemaBuilder {
    registry: Registry,
    data: Data,
    query_strategy: Arc<dyn ExecutionStrategy>,
    mutation_strategy: Arc<dyn ExecutionStrategy>,
    subscription_strategy: Arc<dyn ExecutionStrategy>,
    error_handler: Arc<dyn FetchErrorHandler>,
    value_unboxer: Arc<dyn ValueUnboxer>,
}

impl SchemaBuilder {
    /// Add engine-wide data that every fetcher can access through its context.
    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    /// Replace the strategy driving query selection sets (and every nested selection set).
    #[must_use]
    pub fn query_strategy(mut self, strategy: impl ExecutionStrategy + 'static) -> Self {
        self.query_strategy = Arc::new(strategy);
        self
    }

    /// Replace the strategy driving the root selection set of mutations.
    #[must_use]
    pub fn mutation_strategy(mut self, strategy: impl ExecutionStrategy + 'static) -> Self {
        self.mutation_strategy = Arc::new(strategy);
        self
    }

    /// Replace the strategy a streaming layer above this crate would drive subscriptions with.
    #[must_use]
    pub fn subscription_strategy(mut self, strategy: impl ExecutionStrategy + 'static) -> Self {
        self.subscription_strategy = Arc::new(strategy);
        self
    }

    /// Replace what happens when a data fetcher fails. The handler's decision is authoritative,
    /// so this is the seam for substituting partial data instead of nulls.
    #[must_use]
    pub fn error_handler(mut self, error_handler: impl FetchErrorHandler + 'static) -> Self {
        self.error_handler = Arc::new(error_handler);
        self
    }

    /// Replace the unwrapping of container-like holder values fetchers may produce.
    #[must_use]
    pub fn value_unboxer(mut self, value_unboxer: impl ValueUnboxer + 'static) -> Self {
        self.value_unboxer = Arc::new(value_unboxer);
        self
    }

    pub fn finish(self) -> Schema {
        Schema {
            env: SchemaEnv(Arc::new(SchemaEnvInner {
                registry: self.registry,
                data: self.data,
                query_strategy: self.query_strategy,
                mutation_strategy: self.mutation_strategy,
                subscription_strategy: self.subscription_strategy,
                error_handler: self.error_handler,
                value_unboxer: self.value_unboxer,
            })),
        }
    }
}

#[doc(hidden)]
pub struct SchemaEnvInner {
    pub registry: Registry,
    pub data: Data,
    pub(crate) query_strategy: Arc<dyn ExecutionStrategy>,
    pub(crate) mutation_strategy: Arc<dyn ExecutionStrategy>,
    #[allow(dead_code)]
    pub(crate) subscription_strategy: Arc<dyn ExecutionStrategy>,
    pub(crate) error_handler: Arc<dyn FetchErrorHandler>,
    pub(crate) value_unboxer: Arc<dyn ValueUnboxer>,
}

#[doc(hidden)]
#[derive(Clone)]
pub struct SchemaEnv(Arc<SchemaEnvInner>);

impl Deref for SchemaEnv {
    type Target = SchemaEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A GraphQL schema ready to execute requests.
///
/// Cloning a schema is cheap, so it can be easily shared.
#[derive(Clone)]
pub struct Schema {
    env: SchemaEnv,
}

impl Schema {
    /// Create a schema builder over a registry.
    pub fn build(registry: Registry) -> SchemaBuilder {
        SchemaBuilder {
            registry,
            data: Data::default(),
            query_strategy: Arc::new(ConcurrentStrategy),
            mutation_strategy: Arc::new(SerialStrategy),
            subscription_strategy: Arc::new(ConcurrentStrategy),
            error_handler: Arc::new(DefaultFetchErrorHandler),
            value_unboxer: Arc::new(DefaultValueUnboxer),
        }
    }

    /// Create a schema with the default strategies and capability objects.
    pub fn new(registry: Registry) -> Schema {
        Self::build(registry).finish()
    }

    pub fn registry(&self) -> &Registry {
        &self.env.registry
    }

    /// Execute a GraphQL request.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        let request = request.into();
        let execution_id = request.execution_id.unwrap_or_else(Ulid::new);
        let operation_name = request.operation_name.clone();
        let span = tracing::info_span!(
            target: "quell",
            "graphql_execution",
            %execution_id,
            operation_name = operation_name.as_deref().unwrap_or_default()
        );
        self.execute_once(request, execution_id).instrument(span).await
    }

    /// Execute a batch of requests, sequentially and in order.
    pub async fn execute_batch(&self, batch_request: BatchRequest) -> BatchResponse {
        match batch_request {
            BatchRequest::Single(request) => BatchResponse::Single(self.execute(request).await),
            BatchRequest::Batch(requests) => BatchResponse::Batch(
                futures_util::stream::iter(requests.into_iter())
                    .then(|request| self.execute(request))
                    .collect()
                    .await,
            ),
        }
    }

    async fn execute_once(&self, request: Request, execution_id: Ulid) -> Response {
        let operation = match select_operation(&request.document, request.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(error) => return Response::from_errors(vec![error]),
        };
        let operation_type = operation.node.ty;

        if operation_type == OperationType::Subscription {
            return Response::from_errors(vec![ServerError::new(
                "Subscriptions are not supported on this transport.",
                None,
            )
            .with_classification(ErrorClassification::OperationNotSupported)]);
        }

        // A variable that fails to coerce aborts the request before any field resolves.
        let variables = match values::coerce_variable_values(
            &self.env.registry,
            &operation.node.variable_definitions,
            &request.variables,
        ) {
            Ok(variables) => variables,
            Err(error) => return Response::from_errors(vec![error]),
        };

        let root_type = match self.root_object_type(operation_type) {
            Ok(root_type) => root_type,
            Err(error) => return Response::from_errors(vec![error]),
        };

        let errors = ErrorSink::new();
        let ctx = ExecutionContext {
            schema_env: &self.env,
            operation_type,
            variables: &variables,
            fragments: &request.document.fragments,
            data: &request.data,
            errors: &errors,
            execution_id,
        };

        let selection_set = match collect_fields(
            &self.env.registry,
            root_type,
            [&operation.node.selection_set.node],
            &variables,
            &request.document.fragments,
        ) {
            Ok(selection_set) => selection_set,
            Err(error) => return Response::from_errors(vec![error]),
        };

        let strategy = match operation_type {
            OperationType::Query | OperationType::Subscription => &self.env.query_strategy,
            OperationType::Mutation => &self.env.mutation_strategy,
        };

        let params = ExecutionParameters {
            root_type,
            selection_set,
            parent_value: ResolvedValue::null(),
            step_info: ExecutionStepInfo::root(),
            local_context: None,
        };

        let data = match strategy.execute(&ctx, params).await {
            Ok(object) => ConstValue::Object(object),
            // A violation reached the operation root: the whole data is null, the errors stay.
            Err(Interrupt::PropagateNull) => ConstValue::Null,
            Err(Interrupt::Abort(abort_errors)) => {
                errors.extend(abort_errors);
                ConstValue::Null
            }
        };

        Response {
            data,
            errors: errors.take(),
        }
    }

    fn root_object_type(&self, operation_type: OperationType) -> Result<&ObjectType, ServerError> {
        let Some(type_name) = self.env.registry.root_type(operation_type) else {
            return Err(ServerError::new(
                format!("Schema is not configured for {operation_type}s."),
                None,
            )
            .with_classification(ErrorClassification::OperationNotSupported));
        };
        self.env
            .registry
            .lookup_type(type_name)
            .and_then(|meta_type| meta_type.object())
            .ok_or_else(|| {
                ServerError::new(
                    format!("Schema root type `{type_name}` is not defined as an object type"),
                    None,
                )
                .with_classification(ErrorClassification::OperationNotSupported)
            })
    }
}

fn select_operation<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'a Positioned<OperationDefinition>, ServerError> {
    match operation_name {
        Some(name) => match &document.operations {
            DocumentOperations::Multiple(operations) => operations.get(&Name::new(name)),
            DocumentOperations::Single(_) => None,
        }
        .ok_or_else(|| {
            ServerError::new(format!(r#"Unknown operation named "{name}""#), None)
                .with_classification(ErrorClassification::ValidationError)
        }),
        None => match &document.operations {
            DocumentOperations::Single(operation) => Ok(operation),
            DocumentOperations::Multiple(operations) if operations.len() == 1 => {
                Ok(operations.values().next().expect("just checked the length"))
            }
            DocumentOperations::Multiple(_) => Err(ServerError::new("Operation name required in request.", None)
                .with_classification(ErrorClassification::ValidationError)),
        },
    }
}
