//! Input coercion: turning raw variable values and argument literals into runtime values checked
//! against the schema's input types.
//!
//! Both entry points are pure functions. Failures are structured [`InputValueError`]s carrying
//! the path inside the offending value and a source location, so a client can see exactly which
//! part of a deeply nested input was wrong.

use async_graphql_parser::{types::VariableDefinition, Pos, Positioned};
use async_graphql_value::{ConstValue, Name, Value, Variables};
use indexmap::IndexMap;
use query_path::QueryPathSegment;

use crate::{
    error::{ErrorClassification, ServerError},
    registry::{MetaInputValue, MetaType, Registry, WrappedType},
};

/// A structured input-coercion failure.
///
/// `path` is the pre-rendered position inside the value being coerced (empty at the top level)
/// and `location` points at the source of the value in the query document.
#[derive(Debug, thiserror::Error)]
pub enum InputValueError {
    #[error("Found a null where we expected a {expected}{path}")]
    UnexpectedNull { expected: String, path: String, location: Pos },
    #[error("Found a {actual} value where we expected a '{name}' input object{path}")]
    MissingObject {
        name: String,
        actual: ValueKind,
        path: String,
        location: Pos,
    },
    #[error("{message}{path}")]
    IncorrectScalarValue { message: String, path: String, location: Pos },
    #[error("Found a {actual} value where we expected a {expected} enum value{path}")]
    IncorrectEnumValueType {
        expected: String,
        actual: ValueKind,
        path: String,
        location: Pos,
    },
    #[error("Unknown enum value '{value}' for enum {expected}{path}")]
    UnknownEnumValue {
        expected: String,
        value: String,
        path: String,
        location: Pos,
    },
    #[error("Input object {input_object} does not have a field named '{name}'{path}")]
    UnknownInputField {
        input_object: String,
        name: String,
        path: String,
        location: Pos,
    },
    #[error("Unknown variable ${name}{path}")]
    UnknownVariable { name: String, path: String, location: Pos },
    #[error("Unknown input type {name}{path}")]
    UnknownInputType { name: String, path: String, location: Pos },
}

impl InputValueError {
    pub fn location(&self) -> Pos {
        match self {
            InputValueError::UnexpectedNull { location, .. }
            | InputValueError::MissingObject { location, .. }
            | InputValueError::IncorrectScalarValue { location, .. }
            | InputValueError::IncorrectEnumValueType { location, .. }
            | InputValueError::UnknownEnumValue { location, .. }
            | InputValueError::UnknownInputField { location, .. }
            | InputValueError::UnknownVariable { location, .. }
            | InputValueError::UnknownInputType { location, .. } => *location,
        }
    }

    pub fn into_server_error(self) -> ServerError {
        let location = self.location();
        ServerError::new(self.to_string(), Some(location)).with_classification(ErrorClassification::ValidationError)
    }
}

/// The shape of a value, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Enum,
    List,
    Object,
    Null,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ValueKind::String => "String",
            ValueKind::Integer => "Integer",
            ValueKind::Float => "Float",
            ValueKind::Boolean => "Boolean",
            ValueKind::Enum => "Enum",
            ValueKind::List => "List",
            ValueKind::Object => "Object",
            ValueKind::Null => "Null",
        };
        f.write_str(kind)
    }
}

impl From<&ConstValue> for ValueKind {
    fn from(value: &ConstValue) -> Self {
        match value {
            ConstValue::Null => ValueKind::Null,
            ConstValue::Number(number) if number.is_f64() => ValueKind::Float,
            ConstValue::Number(_) => ValueKind::Integer,
            ConstValue::String(_) | ConstValue::Binary(_) => ValueKind::String,
            ConstValue::Boolean(_) => ValueKind::Boolean,
            ConstValue::Enum(_) => ValueKind::Enum,
            ConstValue::List(_) => ValueKind::List,
            ConstValue::Object(_) => ValueKind::Object,
        }
    }
}

impl From<&Value> for ValueKind {
    fn from(value: &Value) -> Self {
        match value {
            Value::Variable(_) | Value::Null => ValueKind::Null,
            Value::Number(number) if number.is_f64() => ValueKind::Float,
            Value::Number(_) => ValueKind::Integer,
            Value::String(_) | Value::Binary(_) => ValueKind::String,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Enum(_) => ValueKind::Enum,
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

/// Coerces the raw variables of a request against the operation's variable definitions.
///
/// A declared variable missing from the input falls back to its default, errors when its type is
/// non-null, and is omitted otherwise. Failures carry the variable's name and source location.
pub fn coerce_variable_values(
    registry: &Registry,
    variable_definitions: &[Positioned<VariableDefinition>],
    variables: &Variables,
) -> Result<Variables, ServerError> {
    let mut coerced = Variables::default();
    for definition in variable_definitions {
        let name = &definition.node.name.node;
        let declared = definition.node.var_type.node.to_string();
        let ty = WrappedType::from(declared.as_str());
        match variables.get(name) {
            Some(value) => {
                let mut ctx = CoercionContext::new(registry, definition.node.name.pos);
                let value = ctx
                    .coerce_const(ty, value.clone())
                    .map_err(|error| invalid_variable(name, error))?;
                coerced.insert(name.clone(), value);
            }
            None => match &definition.node.default_value {
                Some(default) => {
                    let mut ctx = CoercionContext::new(registry, default.pos);
                    let value = ctx
                        .coerce_const(ty, default.node.clone())
                        .map_err(|error| invalid_variable(name, error))?;
                    coerced.insert(name.clone(), value);
                }
                None if ty.is_non_null() => {
                    return Err(ServerError::new(
                        format!("Variable ${name} of required type {declared} was not provided"),
                        Some(definition.node.name.pos),
                    )
                    .with_classification(ErrorClassification::ValidationError));
                }
                None => {}
            },
        }
    }
    Ok(coerced)
}

fn invalid_variable(name: &Name, error: InputValueError) -> ServerError {
    let location = error.location();
    ServerError::new(format!("Variable ${name} got an invalid value: {error}"), Some(location))
        .with_classification(ErrorClassification::ValidationError)
}

/// Coerces the arguments of one field against its declared argument definitions.
///
/// An argument appears in the result only when a value was actually supplied (a literal, or a
/// variable that is itself bound) or the definition declares a default, which keeps "omitted"
/// distinguishable from an explicit null. `pos` anchors errors about absent arguments.
pub fn get_argument_values(
    registry: &Registry,
    argument_definitions: &IndexMap<String, MetaInputValue>,
    arguments: &[(Positioned<Name>, Positioned<Value>)],
    variables: &Variables,
    pos: Pos,
) -> Result<IndexMap<Name, ConstValue>, InputValueError> {
    let mut values = IndexMap::new();
    for (name, definition) in argument_definitions {
        let supplied = arguments
            .iter()
            .find(|(argument_name, _)| argument_name.node.as_str() == name.as_str());
        let unbound_variable = supplied.map_or(false, |(_, value)| match &value.node {
            Value::Variable(variable) => variables.get(variable).is_none(),
            _ => false,
        });
        match supplied {
            Some((_, value)) if !unbound_variable => {
                let mut ctx = CoercionContext::new(registry, value.pos).with_variables(variables);
                let coerced = ctx.coerce_literal(definition.ty.as_wrapped(), value.node.clone())?;
                values.insert(Name::new(name), coerced);
            }
            // Absent, or supplied as a variable nothing was bound to.
            _ => {
                if let Some(default) = &definition.default_value {
                    values.insert(Name::new(name), default.clone());
                } else if definition.ty.is_non_null() {
                    return Err(InputValueError::UnexpectedNull {
                        expected: definition.ty.to_string(),
                        path: render_path(&[QueryPathSegment::field(name)]),
                        location: pos,
                    });
                }
            }
        }
    }
    Ok(values)
}

/// One coercion run: the registry, an optional variable table for resolving references inside
/// literals, and the path into the value being walked.
struct CoercionContext<'a> {
    registry: &'a Registry,
    variables: Option<&'a Variables>,
    location: Pos,
    value_path: Vec<QueryPathSegment>,
}

impl<'a> CoercionContext<'a> {
    fn new(registry: &'a Registry, location: Pos) -> Self {
        Self {
            registry,
            variables: None,
            location,
            value_path: Vec::new(),
        }
    }

    fn with_variables(mut self, variables: &'a Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    fn path(&self) -> String {
        render_path(&self.value_path)
    }

    fn coerce_const(&mut self, ty: WrappedType<'_>, value: ConstValue) -> Result<ConstValue, InputValueError> {
        if let ConstValue::Null = value {
            return if ty.is_non_null() {
                Err(InputValueError::UnexpectedNull {
                    expected: ty.to_string(),
                    path: self.path(),
                    location: self.location,
                })
            } else {
                Ok(ConstValue::Null)
            };
        }
        let ty = ty.nullable();
        if let Some(element) = ty.list_element() {
            return match value {
                ConstValue::List(items) => {
                    let mut coerced = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        self.value_path.push(index.into());
                        coerced.push(self.coerce_const(element, item)?);
                        self.value_path.pop();
                    }
                    Ok(ConstValue::List(coerced))
                }
                // A bare value in list position coerces as a single-element list.
                value => Ok(ConstValue::List(vec![self.coerce_const(element, value)?])),
            };
        }
        self.coerce_named(ty, value)
    }

    fn coerce_named(&mut self, ty: WrappedType<'_>, value: ConstValue) -> Result<ConstValue, InputValueError> {
        let type_name = ty.named_type();
        match self.registry.lookup_type(type_name) {
            Some(MetaType::Scalar(scalar)) => {
                scalar
                    .parser
                    .parse(type_name, value)
                    .map_err(|error| InputValueError::IncorrectScalarValue {
                        message: error.message,
                        path: self.path(),
                        location: self.location,
                    })
            }
            Some(MetaType::Enum(enum_type)) => {
                let name = match &value {
                    ConstValue::Enum(name) => name.as_str(),
                    ConstValue::String(name) => name.as_str(),
                    other => {
                        return Err(InputValueError::IncorrectEnumValueType {
                            expected: enum_type.name.clone(),
                            actual: other.into(),
                            path: self.path(),
                            location: self.location,
                        });
                    }
                };
                if enum_type.values.contains(name) {
                    Ok(ConstValue::Enum(Name::new(name)))
                } else {
                    Err(InputValueError::UnknownEnumValue {
                        expected: enum_type.name.clone(),
                        value: name.to_string(),
                        path: self.path(),
                        location: self.location,
                    })
                }
            }
            Some(MetaType::InputObject(input_object)) => {
                let kind = ValueKind::from(&value);
                let ConstValue::Object(mut fields) = value else {
                    return Err(InputValueError::MissingObject {
                        name: input_object.name.clone(),
                        actual: kind,
                        path: self.path(),
                        location: self.location,
                    });
                };
                let mut coerced = IndexMap::new();
                for (field_name, input_field) in &input_object.input_fields {
                    match fields.swap_remove(&Name::new(field_name)) {
                        Some(value) => {
                            self.value_path.push(field_name.as_str().into());
                            let value = self.coerce_const(input_field.ty.as_wrapped(), value)?;
                            self.value_path.pop();
                            coerced.insert(Name::new(field_name), value);
                        }
                        None => {
                            if let Some(default) = &input_field.default_value {
                                coerced.insert(Name::new(field_name), default.clone());
                            } else if input_field.ty.is_non_null() {
                                self.value_path.push(field_name.as_str().into());
                                return Err(InputValueError::UnexpectedNull {
                                    expected: input_field.ty.to_string(),
                                    path: self.path(),
                                    location: self.location,
                                });
                            }
                        }
                    }
                }
                if let Some(extra) = fields.keys().next() {
                    return Err(InputValueError::UnknownInputField {
                        input_object: input_object.name.clone(),
                        name: extra.to_string(),
                        path: self.path(),
                        location: self.location,
                    });
                }
                Ok(ConstValue::Object(coerced))
            }
            _ => Err(InputValueError::UnknownInputType {
                name: type_name.to_string(),
                path: self.path(),
                location: self.location,
            }),
        }
    }

    /// Coercion over AST value nodes: the same shape dispatch as [`Self::coerce_const`], with
    /// variable references resolved against the variable table and null literals passed through.
    fn coerce_literal(&mut self, ty: WrappedType<'_>, value: Value) -> Result<ConstValue, InputValueError> {
        if let Value::Variable(name) = &value {
            return self.coerce_variable_reference(ty, name);
        }
        if let Value::Null = value {
            return if ty.is_non_null() {
                Err(InputValueError::UnexpectedNull {
                    expected: ty.to_string(),
                    path: self.path(),
                    location: self.location,
                })
            } else {
                Ok(ConstValue::Null)
            };
        }
        let ty = ty.nullable();
        if let Some(element) = ty.list_element() {
            return match value {
                Value::List(items) => {
                    let mut coerced = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        self.value_path.push(index.into());
                        coerced.push(self.coerce_literal(element, item)?);
                        self.value_path.pop();
                    }
                    Ok(ConstValue::List(coerced))
                }
                value => Ok(ConstValue::List(vec![self.coerce_literal(element, value)?])),
            };
        }
        match value {
            Value::Object(fields) if matches!(self.registry.lookup_type(ty.named_type()), Some(MetaType::InputObject(_))) => {
                self.coerce_literal_input_object(ty, fields)
            }
            value => {
                let value = self.resolve_const(value)?;
                self.coerce_named(ty, value)
            }
        }
    }

    fn coerce_literal_input_object(
        &mut self,
        ty: WrappedType<'_>,
        mut fields: IndexMap<Name, Value>,
    ) -> Result<ConstValue, InputValueError> {
        let Some(MetaType::InputObject(input_object)) = self.registry.lookup_type(ty.named_type()) else {
            return Err(InputValueError::UnknownInputType {
                name: ty.named_type().to_string(),
                path: self.path(),
                location: self.location,
            });
        };
        let mut coerced = IndexMap::new();
        for (field_name, input_field) in &input_object.input_fields {
            let supplied = fields.swap_remove(&Name::new(field_name));
            // A reference to an unbound variable counts as an omitted field.
            let supplied = match supplied {
                Some(Value::Variable(variable)) if self.variable_value(&variable).is_none() => None,
                supplied => supplied,
            };
            match supplied {
                Some(value) => {
                    self.value_path.push(field_name.as_str().into());
                    let value = self.coerce_literal(input_field.ty.as_wrapped(), value)?;
                    self.value_path.pop();
                    coerced.insert(Name::new(field_name), value);
                }
                None => {
                    if let Some(default) = &input_field.default_value {
                        coerced.insert(Name::new(field_name), default.clone());
                    } else if input_field.ty.is_non_null() {
                        self.value_path.push(field_name.as_str().into());
                        return Err(InputValueError::UnexpectedNull {
                            expected: input_field.ty.to_string(),
                            path: self.path(),
                            location: self.location,
                        });
                    }
                }
            }
        }
        if let Some(extra) = fields.keys().next() {
            return Err(InputValueError::UnknownInputField {
                input_object: input_object.name.clone(),
                name: extra.to_string(),
                path: self.path(),
                location: self.location,
            });
        }
        Ok(ConstValue::Object(coerced))
    }

    /// Bound variables were coerced against their declared type when the request started, so
    /// only the null check against this position's type remains.
    fn coerce_variable_reference(&mut self, ty: WrappedType<'_>, name: &Name) -> Result<ConstValue, InputValueError> {
        match self.variable_value(name) {
            Some(ConstValue::Null) if ty.is_non_null() => Err(InputValueError::UnexpectedNull {
                expected: ty.to_string(),
                path: self.path(),
                location: self.location,
            }),
            Some(value) => Ok(value.clone()),
            None if ty.is_non_null() => Err(InputValueError::UnknownVariable {
                name: name.to_string(),
                path: self.path(),
                location: self.location,
            }),
            None => Ok(ConstValue::Null),
        }
    }

    fn variable_value(&self, name: &Name) -> Option<&'a ConstValue> {
        self.variables.and_then(|variables| variables.get(name))
    }

    /// Resolves every variable reference inside a literal; unbound references become null.
    fn resolve_const(&self, value: Value) -> Result<ConstValue, InputValueError> {
        value.into_const_with(|name| {
            Ok(self.variable_value(&name).cloned().unwrap_or(ConstValue::Null))
        })
    }
}

fn render_path(segments: &[QueryPathSegment]) -> String {
    if segments.is_empty() {
        return String::new();
    }
    let mut rendered = " at path '".to_string();
    for (i, segment) in segments.iter().enumerate() {
        if i != 0 {
            rendered.push('.');
        }
        rendered.push_str(&segment.to_string());
    }
    rendered.push('\'');
    rendered
}

#[cfg(test)]
mod tests {
    use async_graphql_parser::parse_query;
    use async_graphql_parser::types::DocumentOperations;
    use serde_json::json;

    use super::*;
    use crate::registry::{EnumType, InputObjectType, ObjectType};

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.insert_type(EnumType::new("Color", ["RED", "GREEN"]));
        registry.insert_type(InputObjectType::new(
            "Filter",
            [
                MetaInputValue::new("name", "String!"),
                MetaInputValue::new("limit", "Int").with_default(ConstValue::from_json(json!(10)).unwrap()),
                MetaInputValue::new("colors", "[Color!]"),
            ],
        ));
        registry.insert_type(ObjectType::new("Query", []));
        registry
    }

    fn variable_definitions(query: &str) -> Vec<Positioned<VariableDefinition>> {
        let document = parse_query(query).unwrap();
        let DocumentOperations::Single(operation) = document.operations else {
            unreachable!("tests use single-operation documents");
        };
        operation.node.variable_definitions
    }

    fn coerce(query: &str, variables: serde_json::Value) -> Result<Variables, ServerError> {
        coerce_variable_values(&registry(), &variable_definitions(query), &Variables::from_json(variables))
    }

    #[test]
    fn test_supplied_value_wins_over_default() {
        let coerced = coerce("query ($x: Int = 1) { __typename }", json!({ "x": 5 })).unwrap();
        assert_eq!(coerced.get(&Name::new("x")), Some(&ConstValue::from_json(json!(5)).unwrap()));
    }

    #[test]
    fn test_default_applies_when_omitted() {
        let coerced = coerce("query ($x: Int = 1) { __typename }", json!({})).unwrap();
        assert_eq!(coerced.get(&Name::new("x")), Some(&ConstValue::from_json(json!(1)).unwrap()));

        let coerced = coerce("query ($x: Int) { __typename }", json!({})).unwrap();
        assert!(coerced.get(&Name::new("x")).is_none());
    }

    #[test]
    fn test_null_against_non_null_fails() {
        let error = coerce("query ($x: Int!) { __typename }", json!({ "x": null })).unwrap_err();
        assert!(error.message.contains("null where we expected a Int!"), "{}", error.message);

        let error = coerce("query ($x: Int!) { __typename }", json!({})).unwrap_err();
        assert!(error.message.contains("was not provided"), "{}", error.message);
    }

    #[test]
    fn test_list_promotion_and_elements() {
        let coerced = coerce("query ($x: [Int!]) { __typename }", json!({ "x": 3 })).unwrap();
        assert_eq!(
            coerced.get(&Name::new("x")),
            Some(&ConstValue::from_json(json!([3])).unwrap())
        );

        let error = coerce("query ($x: [Int!]) { __typename }", json!({ "x": [1, null] })).unwrap_err();
        assert!(error.message.contains("at path '1'"), "{}", error.message);
    }

    #[test]
    fn test_input_object_coercion() {
        let coerced = coerce(
            "query ($f: Filter) { __typename }",
            json!({ "f": { "name": "a", "colors": ["RED"] } }),
        )
        .unwrap();
        assert_eq!(
            coerced.get(&Name::new("f")),
            Some(&ConstValue::from_json(json!({ "name": "a", "limit": 10, "colors": ["RED"] })).unwrap())
        );

        let error = coerce("query ($f: Filter) { __typename }", json!({ "f": { "name": "a", "bogus": 1 } })).unwrap_err();
        assert!(error.message.contains("does not have a field named 'bogus'"), "{}", error.message);

        let error = coerce("query ($f: Filter) { __typename }", json!({ "f": { "limit": 2 } })).unwrap_err();
        assert!(error.message.contains("at path 'name'"), "{}", error.message);

        let error = coerce(
            "query ($f: Filter) { __typename }",
            json!({ "f": { "name": "a", "colors": ["BLUE"] } }),
        )
        .unwrap_err();
        assert!(error.message.contains("Unknown enum value 'BLUE'"), "{}", error.message);
    }

    fn field_arguments(query: &str) -> (Vec<(Positioned<Name>, Positioned<Value>)>, Pos) {
        let document = parse_query(query).unwrap();
        let DocumentOperations::Single(operation) = document.operations else {
            unreachable!("tests use single-operation documents");
        };
        let selection = &operation.node.selection_set.node.items[0].node;
        let async_graphql_parser::types::Selection::Field(field) = selection else {
            unreachable!("tests select a field");
        };
        (field.node.arguments.clone(), field.pos)
    }

    #[test]
    fn test_argument_defaults_and_omission() {
        let registry = registry();
        let definitions: IndexMap<String, MetaInputValue> = [
            MetaInputValue::new("first", "Int").with_default(ConstValue::from_json(json!(25)).unwrap()),
            MetaInputValue::new("after", "String"),
            MetaInputValue::new("filter", "Filter"),
        ]
        .into_iter()
        .map(|value| (value.name.clone(), value))
        .collect();

        let (arguments, pos) = field_arguments("{ items(after: null) }");
        let values = get_argument_values(&registry, &definitions, &arguments, &Variables::default(), pos).unwrap();
        // The default fills in, the explicit null stays, the unset argument is omitted.
        assert_eq!(values.get(&Name::new("first")), Some(&ConstValue::from_json(json!(25)).unwrap()));
        assert_eq!(values.get(&Name::new("after")), Some(&ConstValue::Null));
        assert!(values.get(&Name::new("filter")).is_none());
    }

    #[test]
    fn test_argument_variable_resolution() {
        let registry = registry();
        let definitions: IndexMap<String, MetaInputValue> = [MetaInputValue::new("first", "Int!")]
            .into_iter()
            .map(|value| (value.name.clone(), value))
            .collect();

        let (arguments, pos) = field_arguments("{ items(first: $n) }");

        let variables = Variables::from_json(json!({ "n": 3 }));
        let values = get_argument_values(&registry, &definitions, &arguments, &variables, pos).unwrap();
        assert_eq!(values.get(&Name::new("first")), Some(&ConstValue::from_json(json!(3)).unwrap()));

        // Unbound variable on a non-null argument without default.
        let error = get_argument_values(&registry, &definitions, &arguments, &Variables::default(), pos).unwrap_err();
        assert!(matches!(error, InputValueError::UnexpectedNull { .. }), "{error}");
    }

    #[test]
    fn test_scalar_mismatch_reports_path_and_location() {
        let error = coerce("query ($x: Int) { __typename }", json!({ "x": "five" })).unwrap_err();
        assert!(error.message.starts_with("Variable $x got an invalid value"), "{}", error.message);
        assert!(!error.locations.is_empty());
    }
}
