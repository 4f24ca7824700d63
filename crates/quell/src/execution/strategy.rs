use async_graphql_value::{ConstValue, Name};
use futures_util::{stream, StreamExt, TryStreamExt};
use indexmap::IndexMap;

use super::{field::resolve_field, ExecutionResult, Interrupt};
use crate::context::{ExecutionContext, ExecutionParameters};

/// How the sibling futures of one level run relative to each other. List elements inherit the
/// discipline of the strategy that launched their field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// All launched eagerly, awaited together.
    Concurrent,
    /// One at a time, each observing the side effects of all prior ones.
    Serial,
    /// At most `n` in flight.
    Bounded(usize),
}

/// Drives resolution of one merged selection set into the ordered result object.
///
/// Implementations are stateless; the per-field resolution algorithm is shared, only the
/// scheduling of sibling fields differs.
#[async_trait::async_trait]
pub trait ExecutionStrategy: Send + Sync {
    async fn execute<'a>(
        &self,
        ctx: &ExecutionContext<'a>,
        params: ExecutionParameters<'a>,
    ) -> ExecutionResult<IndexMap<Name, ConstValue>>;
}

/// Launches every field of the selection set without waiting for any previous one, then awaits
/// them all. The default for queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConcurrentStrategy;

#[async_trait::async_trait]
impl ExecutionStrategy for ConcurrentStrategy {
    async fn execute<'a>(
        &self,
        ctx: &ExecutionContext<'a>,
        params: ExecutionParameters<'a>,
    ) -> ExecutionResult<IndexMap<Name, ConstValue>> {
        resolve_selection_set(ctx, Concurrency::Concurrent, params).await
    }
}

/// Resolves fields strictly in selection order, each waiting for the previous one to finish.
/// Mutations rely on this for user-visible side-effect ordering.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialStrategy;

#[async_trait::async_trait]
impl ExecutionStrategy for SerialStrategy {
    async fn execute<'a>(
        &self,
        ctx: &ExecutionContext<'a>,
        params: ExecutionParameters<'a>,
    ) -> ExecutionResult<IndexMap<Name, ConstValue>> {
        resolve_selection_set(ctx, Concurrency::Serial, params).await
    }
}

/// Caps the number of field futures in flight. Kept for callers that batch against rate-limited
/// backends; not the default for any operation kind.
#[derive(Debug, Clone, Copy)]
pub struct BoundedStrategy {
    pub concurrency: usize,
}

impl BoundedStrategy {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait::async_trait]
impl ExecutionStrategy for BoundedStrategy {
    async fn execute<'a>(
        &self,
        ctx: &ExecutionContext<'a>,
        params: ExecutionParameters<'a>,
    ) -> ExecutionResult<IndexMap<Name, ConstValue>> {
        resolve_selection_set(ctx, Concurrency::Bounded(self.concurrency.max(1)), params).await
    }
}

/// The shared driver: one future per response key, scheduled per `concurrency`, assembled in
/// selection-set order regardless of completion order.
pub(crate) async fn resolve_selection_set<'a>(
    ctx: &ExecutionContext<'a>,
    concurrency: Concurrency,
    params: ExecutionParameters<'a>,
) -> ExecutionResult<IndexMap<Name, ConstValue>> {
    let ExecutionParameters {
        root_type,
        selection_set,
        parent_value,
        step_info,
        local_context,
    } = params;

    tracing::trace!(
        target: "quell",
        parent_type = root_type.name.as_str(),
        fields = selection_set.len(),
        "resolving selection set"
    );

    let parent_value = &parent_value;
    let step_info = &step_info;
    let futures: Vec<_> = selection_set
        .iter()
        .map(|(response_key, merged_field)| {
            let local_context = local_context.clone();
            async move {
                let value =
                    resolve_field(ctx, concurrency, root_type, merged_field, parent_value, step_info, local_context)
                        .await?;
                Ok::<_, Interrupt>((Name::new(response_key), value))
            }
        })
        .collect();

    let results = match concurrency {
        Concurrency::Concurrent => futures_util::future::try_join_all(futures).await?,
        Concurrency::Serial => {
            let mut results = Vec::with_capacity(futures.len());
            for future in futures {
                results.push(future.await?);
            }
            results
        }
        Concurrency::Bounded(concurrency) => {
            stream::iter(futures)
                .buffered(concurrency.max(1))
                .try_collect::<Vec<_>>()
                .await?
        }
    };

    Ok(results.into_iter().collect())
}
