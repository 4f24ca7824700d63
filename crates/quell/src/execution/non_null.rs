//! Recording of non-null violations before the propagation signal is raised.

use async_graphql_parser::Pos;

use crate::{
    context::{ExecutionContext, ExecutionStepInfo},
    error::{ErrorClassification, ServerError},
};

/// Records that a non-null position resolved to null.
///
/// At most one such error exists per response path: the first writer wins and later attempts at
/// the same path are suppressed, so an aliased or merged re-resolution of the same position does
/// not inflate the error list. The caller raises the propagation signal right after, which makes
/// the signal always accompanied by a recorded error.
pub(super) fn record_null_violation(ctx: &ExecutionContext<'_>, step_info: &ExecutionStepInfo, pos: Pos) {
    let field = step_info.field_name().unwrap_or("<root>");
    let error = ServerError::new(
        format!("An error occurred while fetching `{field}`, a non-nullable value was expected but no value was found."),
        Some(pos),
    )
    .with_path(step_info.path.clone())
    .with_classification(ErrorClassification::NullValueInNonNullableField);

    if ctx.errors.push_non_null_violation(error) {
        tracing::warn!(
            target: "quell",
            path = %step_info.path,
            expected = %step_info.field_type.as_ref().map(ToString::to_string).unwrap_or_default(),
            "non-nullable field resolved to null"
        );
    }
}
