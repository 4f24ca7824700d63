//! Resolution of interface and union values to the concrete object type their selection set
//! collects against.

use crate::{
    collect::MergedField,
    context::{ExecutionContext, ExecutionStepInfo},
    error::{ErrorClassification, ServerError},
    registry::{resolvers::TypeResolution, MetaType, ObjectType, ResolvedValue, TypeResolver},
};

/// Returns the concrete object type behind `meta_type` for `value`.
///
/// Concrete object types pass through untouched. Interfaces and unions consult their registered
/// type resolver, or the conventional `__typename` key of the fetched value when none is
/// registered. Any failure is fatal for the field and is not retried.
pub(super) fn resolve_concrete_type<'a>(
    ctx: &ExecutionContext<'a>,
    meta_type: &'a MetaType,
    value: &ResolvedValue,
    merged_field: &MergedField<'_>,
    step_info: &ExecutionStepInfo,
) -> Result<&'a ObjectType, ServerError> {
    let (abstract_name, type_resolver) = match meta_type {
        MetaType::Object(object_type) => return Ok(object_type),
        MetaType::Interface(interface) => (interface.name.as_str(), interface.type_resolver.as_deref()),
        MetaType::Union(union_type) => (union_type.name.as_str(), union_type.type_resolver.as_deref()),
        other => {
            return Err(unresolved(
                format!("`{}` is not an object, interface or union type", other.name()),
                merged_field,
                step_info,
            ));
        }
    };

    let resolved = match type_resolver {
        Some(type_resolver) => type_resolver.resolve_type(TypeResolution {
            registry: ctx.registry(),
            data: ctx.data,
            value,
            field: merged_field.primary(),
            arguments: &step_info.arguments,
        }),
        None => remote_typename(value),
    };

    let Some(type_name) = resolved else {
        return Err(unresolved(
            format!(
                "Could not resolve the concrete type of `{abstract_name}` for `{}`",
                merged_field.name()
            ),
            merged_field,
            step_info,
        ));
    };

    let Some(resolved_type) = ctx.registry().lookup_type(&type_name) else {
        return Err(unresolved(
            format!(r#"Found an unknown typename "{type_name}""#),
            merged_field,
            step_info,
        ));
    };

    if !ctx.registry().is_possible_type(abstract_name, &type_name) {
        return Err(unresolved(
            format!(r#""{type_name}" is not a possible type of "{abstract_name}""#),
            merged_field,
            step_info,
        ));
    }

    resolved_type.object().ok_or_else(|| {
        unresolved(
            format!(r#""{type_name}" is not an object type"#),
            merged_field,
            step_info,
        )
    })
}

fn unresolved(message: String, merged_field: &MergedField<'_>, step_info: &ExecutionStepInfo) -> ServerError {
    ServerError::new(message, Some(merged_field.pos()))
        .with_path(step_info.path.clone())
        .with_classification(ErrorClassification::UnresolvedType)
}

/// Connector-style fetchers put the `__typename` into the JSON they return; without a registered
/// type resolver that key is the only way to tell which member of the abstract type this is.
fn remote_typename(value: &ResolvedValue) -> Option<String> {
    Some(value.data_resolved().as_object()?.get("__typename")?.as_str()?.to_owned())
}
