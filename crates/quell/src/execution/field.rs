//! Per-field resolution, shared by every strategy: invoke the field's resolver, route failures
//! through the pluggable error handler, then complete the fetched value against the declared
//! type shape.

use std::sync::Arc;

use async_graphql_value::{ConstValue, Name};

use super::{abstract_type, list, non_null, Concurrency, ExecutionResult, ExecutionStrategy, Interrupt};
use crate::{
    collect::{collect_fields, MergedField},
    context::{Data, ExecutionContext, ExecutionParameters, ExecutionStepInfo},
    error::{ErrorClassification, ServerError},
    registry::{
        resolvers::{FetchContext, FetchedValue},
        DataFetcher, FetchError, FetchErrorHandler, MetaField, MetaType, ObjectType, ResolvedValue, Resolver,
        ValueUnboxer, WrappedType,
    },
    values,
};

/// Resolves one merged field of `parent_type` to its response value.
///
/// Anything that nulls the field out under a non-null declared type comes back as
/// [`Interrupt::PropagateNull`] with the error already recorded; nullable declared types absorb
/// such failures here and resolve to null.
pub(super) async fn resolve_field<'a>(
    ctx: &ExecutionContext<'a>,
    concurrency: Concurrency,
    parent_type: &'a ObjectType,
    merged_field: &MergedField<'a>,
    parent_value: &ResolvedValue,
    parent_step: &Arc<ExecutionStepInfo>,
    local_context: Option<Arc<Data>>,
) -> ExecutionResult<ConstValue> {
    if merged_field.name() == "__typename" {
        return Ok(ConstValue::String(parent_type.name.clone()));
    }

    let field = merged_field.primary();
    let response_key = merged_field.response_key();

    let Some(field_definition) = parent_type.field(merged_field.name()) else {
        ctx.errors.push(
            ServerError::new(
                format!(
                    r#"Cannot query field "{}" on type "{}""#,
                    merged_field.name(),
                    parent_type.name
                ),
                Some(field.node.name.pos),
            )
            .with_path(parent_step.path.child(response_key))
            .with_classification(ErrorClassification::ValidationError),
        );
        return Err(Interrupt::PropagateNull);
    };

    let arguments = match values::get_argument_values(
        ctx.registry(),
        &field_definition.args,
        &field.node.arguments,
        ctx.variables,
        field.pos,
    ) {
        Ok(arguments) => arguments,
        // A bad argument leaves no sound value to resolve with; the operation stops.
        Err(error) => {
            return Err(Interrupt::Abort(vec![error
                .into_server_error()
                .with_path(parent_step.path.child(response_key))]));
        }
    };

    let step_info = parent_step.child_field(
        &parent_type.name,
        &field_definition.name,
        response_key,
        field_definition.ty.clone(),
        arguments,
    );

    tracing::trace!(
        target: "quell",
        field = field_definition.name.as_str(),
        path = %step_info.path,
        "resolving field"
    );

    let (value, local_context) =
        fetch(ctx, field_definition, merged_field, parent_value, &step_info, local_context).await?;

    complete_value(
        ctx,
        concurrency,
        field_definition.ty.as_wrapped(),
        &step_info,
        merged_field,
        value,
        local_context,
    )
    .await
}

/// Runs the field's resolver and unwraps its envelope: fetcher-reported errors go into the sink,
/// a local-context override replaces the inherited one, and the value passes through the
/// pluggable unboxer. Ordinary fetch failures are settled here by the error handler; only an
/// abort escapes.
async fn fetch<'a>(
    ctx: &ExecutionContext<'a>,
    field_definition: &'a MetaField,
    merged_field: &MergedField<'a>,
    parent_value: &ResolvedValue,
    step_info: &Arc<ExecutionStepInfo>,
    local_context: Option<Arc<Data>>,
) -> ExecutionResult<(ResolvedValue, Option<Arc<Data>>)> {
    let fetched = match &field_definition.resolver {
        Resolver::Property => Ok(FetchedValue::new(
            parent_value.get_field(field_definition.target_field_name()).unwrap_or_default(),
        )),
        Resolver::Parent => Ok(FetchedValue::new(parent_value.clone())),
        Resolver::Custom(fetcher) => {
            fetcher
                .fetch(FetchContext {
                    registry: ctx.registry(),
                    source: parent_value,
                    field: merged_field.primary(),
                    arguments: &step_info.arguments,
                    step_info,
                    local_context: local_context.as_ref(),
                    request_data: ctx.data,
                    schema_data: &ctx.schema_env.data,
                })
                .await
        }
    };

    match fetched {
        Ok(FetchedValue {
            value,
            errors,
            local_context: local_override,
        }) => {
            ctx.errors.extend(errors);
            let value = ctx.schema_env.value_unboxer.unbox(value);
            Ok((value, local_override.or(local_context)))
        }
        Err(FetchError::Aborted(errors)) => Err(Interrupt::Abort(errors)),
        Err(FetchError::Failure(error)) => {
            let handled = ctx
                .schema_env
                .error_handler
                .handle(error, step_info, merged_field.pos());
            ctx.errors.extend(handled.errors);
            Ok((handled.substitute, local_context))
        }
    }
}

/// Completes a fetched value against the declared type at this position.
///
/// Null handling first, then one wrapper peeled per step: lists recurse per element under the
/// invoking discipline, composites resolve their concrete type and recurse through the engine's
/// query strategy, leaves serialize through the registered coercion.
#[async_recursion::async_recursion]
pub(super) async fn complete_value<'a>(
    ctx: &ExecutionContext<'a>,
    concurrency: Concurrency,
    ty: WrappedType<'a>,
    step_info: &Arc<ExecutionStepInfo>,
    merged_field: &MergedField<'a>,
    value: ResolvedValue,
    local_context: Option<Arc<Data>>,
) -> ExecutionResult<ConstValue> {
    if value.data_resolved().is_null() {
        if ty.is_non_null() {
            non_null::record_null_violation(ctx, step_info, merged_field.pos());
            return Err(Interrupt::PropagateNull);
        }
        return Ok(ConstValue::Null);
    }

    let non_null = ty.is_non_null();
    let ty = ty.nullable();

    if let Some(element_type) = ty.list_element() {
        return list::complete_list(
            ctx,
            concurrency,
            non_null,
            element_type,
            step_info,
            merged_field,
            value,
            local_context,
        )
        .await;
    }

    let type_name = ty.named_type();
    let Some(meta_type) = ctx.registry().lookup_type(type_name) else {
        ctx.errors.push(
            ServerError::new(
                format!("Schema is missing the type `{type_name}`"),
                Some(merged_field.pos()),
            )
            .with_path(step_info.path.clone())
            .with_classification(ErrorClassification::OperationNotSupported),
        );
        return collapse(non_null);
    };

    match meta_type {
        MetaType::Scalar(scalar) => match scalar.parser.serialize(type_name, value.take()) {
            Ok(value) => Ok(value),
            Err(error) => {
                ctx.errors
                    .push(error.into_server_error(merged_field.pos()).with_path(step_info.path.clone()));
                collapse(non_null)
            }
        },
        MetaType::Enum(enum_type) => match value.take() {
            serde_json::Value::String(name) if enum_type.values.contains(name.as_str()) => {
                Ok(ConstValue::Enum(Name::new(name)))
            }
            other => {
                ctx.errors.push(
                    ServerError::new(
                        format!("Invalid value {other} for the enum {}", enum_type.name),
                        Some(merged_field.pos()),
                    )
                    .with_path(step_info.path.clone()),
                );
                collapse(non_null)
            }
        },
        MetaType::Object(_) | MetaType::Interface(_) | MetaType::Union(_) => {
            let object_type = match abstract_type::resolve_concrete_type(ctx, meta_type, &value, merged_field, step_info)
            {
                Ok(object_type) => object_type,
                Err(error) => {
                    ctx.errors.push(error);
                    return collapse(non_null);
                }
            };

            let selection_set = match collect_fields(
                ctx.registry(),
                object_type,
                merged_field.selection_sets(),
                ctx.variables,
                ctx.fragments,
            ) {
                Ok(selection_set) => selection_set,
                Err(error) => {
                    ctx.errors.push(error.with_path(step_info.path.clone()));
                    return collapse(non_null);
                }
            };

            let params = ExecutionParameters {
                root_type: object_type,
                selection_set,
                parent_value: value,
                step_info: Arc::clone(step_info),
                local_context,
            };
            match ctx.schema_env.query_strategy.execute(ctx, params).await {
                Ok(object) => Ok(ConstValue::Object(object)),
                Err(Interrupt::PropagateNull) => collapse(non_null),
                Err(abort) => Err(abort),
            }
        }
        MetaType::InputObject(_) => {
            ctx.errors.push(
                ServerError::new(
                    format!("The input type `{type_name}` cannot appear in an output position"),
                    Some(merged_field.pos()),
                )
                .with_path(step_info.path.clone())
                .with_classification(ErrorClassification::OperationNotSupported),
            );
            collapse(non_null)
        }
    }
}

/// The value at this position became null: fine when the position is nullable, otherwise keep
/// propagating. An error was already recorded by whoever nulled the position out.
pub(super) fn collapse(non_null: bool) -> ExecutionResult<ConstValue> {
    if non_null {
        Err(Interrupt::PropagateNull)
    } else {
        Ok(ConstValue::Null)
    }
}
