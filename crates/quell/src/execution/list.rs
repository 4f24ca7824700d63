//! List completion: one future per element, run under the same concurrency discipline as the
//! strategy that launched the field, with the element index appended to the path.

use std::sync::Arc;

use async_graphql_value::ConstValue;
use futures_util::{stream, StreamExt, TryStreamExt};

use super::{
    field::{collapse, complete_value},
    Concurrency, ExecutionResult, Interrupt,
};
use crate::{
    collect::MergedField,
    context::{Data, ExecutionContext, ExecutionStepInfo},
    error::ServerError,
    registry::{MetaFieldType, ResolvedValue, WrappedType},
};

#[allow(clippy::too_many_arguments)]
pub(super) async fn complete_list<'a>(
    ctx: &ExecutionContext<'a>,
    concurrency: Concurrency,
    non_null: bool,
    element_type: WrappedType<'a>,
    step_info: &Arc<ExecutionStepInfo>,
    merged_field: &MergedField<'a>,
    value: ResolvedValue,
    local_context: Option<Arc<Data>>,
) -> ExecutionResult<ConstValue> {
    let Some(items) = value.item_iter() else {
        ctx.errors.push(
            ServerError::new(
                format!(
                    "Encountered a {} where we expected a list",
                    json_kind_str(value.data_resolved())
                ),
                Some(merged_field.pos()),
            )
            .with_path(step_info.path.clone()),
        );
        return collapse(non_null);
    };
    let items: Vec<_> = items.collect();

    let futures: Vec<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let element_step = step_info.child_element(index, MetaFieldType::from(element_type.to_string()));
            let local_context = local_context.clone();
            async move {
                complete_value(ctx, concurrency, element_type, &element_step, merged_field, item, local_context).await
            }
        })
        .collect();

    let values = match concurrency {
        Concurrency::Concurrent => futures_util::future::try_join_all(futures).await,
        Concurrency::Serial => {
            let mut values = Vec::with_capacity(futures.len());
            let mut failure = None;
            for future in futures {
                match future.await {
                    Ok(value) => values.push(value),
                    Err(interrupt) => {
                        failure = Some(interrupt);
                        break;
                    }
                }
            }
            match failure {
                Some(interrupt) => Err(interrupt),
                None => Ok(values),
            }
        }
        Concurrency::Bounded(concurrency) => {
            stream::iter(futures)
                .buffered(concurrency.max(1))
                .try_collect::<Vec<_>>()
                .await
        }
    };

    match values {
        Ok(values) => Ok(ConstValue::List(values)),
        // An element under a non-null element type nulled out; the list itself collapses.
        Err(Interrupt::PropagateNull) => collapse(non_null),
        Err(abort) => Err(abort),
    }
}

fn json_kind_str(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}
