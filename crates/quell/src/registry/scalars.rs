use std::{fmt, sync::Arc};

use async_graphql_value::ConstValue;

use crate::error::Error;

/// Custom coercion for one scalar type.
pub trait ScalarCoercion: Send + Sync {
    /// Input coercion: check and transform a value a client supplied for this scalar.
    fn parse_value(&self, value: ConstValue) -> Result<ConstValue, Error>;

    /// Result coercion: turn what a fetcher produced into the wire value of this scalar.
    fn serialize(&self, value: serde_json::Value) -> Result<ConstValue, Error>;
}

/// How values of a scalar are coerced.
#[derive(Clone, Default)]
pub enum ScalarParser {
    /// Hand values through untouched in both directions.
    PassThrough,
    /// Coerce the built-in scalars by name; custom scalars pass through.
    #[default]
    BestEffort,
    /// A registered [`ScalarCoercion`].
    Custom(Arc<dyn ScalarCoercion>),
}

impl fmt::Debug for ScalarParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarParser::PassThrough => f.write_str("PassThrough"),
            ScalarParser::BestEffort => f.write_str("BestEffort"),
            ScalarParser::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl ScalarParser {
    pub fn custom(coercion: impl ScalarCoercion + 'static) -> Self {
        ScalarParser::Custom(Arc::new(coercion))
    }

    pub(crate) fn parse(&self, scalar_name: &str, value: ConstValue) -> Result<ConstValue, Error> {
        match self {
            ScalarParser::PassThrough => Ok(value),
            ScalarParser::BestEffort => parse_best_effort(scalar_name, value),
            ScalarParser::Custom(coercion) => coercion.parse_value(value),
        }
    }

    pub(crate) fn serialize(&self, scalar_name: &str, value: serde_json::Value) -> Result<ConstValue, Error> {
        match self {
            ScalarParser::PassThrough => {
                ConstValue::from_json(value).map_err(|err| Error::new(err.to_string()))
            }
            ScalarParser::BestEffort => serialize_best_effort(scalar_name, value),
            ScalarParser::Custom(coercion) => coercion.serialize(value),
        }
    }
}

fn parse_best_effort(scalar_name: &str, value: ConstValue) -> Result<ConstValue, Error> {
    match (scalar_name, value) {
        ("Int", ConstValue::Number(number)) => {
            if number.as_i64().map(|n| i32::try_from(n).is_ok()).unwrap_or_default() {
                Ok(ConstValue::Number(number))
            } else {
                Err(Error::new(format!("Cannot parse {number} into an Int")))
            }
        }
        ("Float", value @ ConstValue::Number(_)) => Ok(value),
        ("String", value @ ConstValue::String(_)) => Ok(value),
        ("Boolean", value @ ConstValue::Boolean(_)) => Ok(value),
        ("ID", value @ ConstValue::String(_)) => Ok(value),
        ("ID", ConstValue::Number(number)) if !number.is_f64() => {
            Ok(ConstValue::String(number.to_string()))
        }
        ("Int" | "Float" | "String" | "Boolean" | "ID", other) => Err(Error::new(format!(
            "Cannot parse a {} into a {scalar_name}",
            const_value_kind_str(&other)
        ))),
        // Custom scalars accept whatever the client sent.
        (_, value) => Ok(value),
    }
}

fn serialize_best_effort(scalar_name: &str, value: serde_json::Value) -> Result<ConstValue, Error> {
    match (scalar_name, value) {
        ("Int", serde_json::Value::Number(number)) if !number.is_f64() => {
            Ok(ConstValue::Number(number))
        }
        ("Float", serde_json::Value::Number(number)) => Ok(ConstValue::Number(number)),
        ("String", serde_json::Value::String(string)) => Ok(ConstValue::String(string)),
        ("Boolean", serde_json::Value::Bool(boolean)) => Ok(ConstValue::Boolean(boolean)),
        ("ID", serde_json::Value::String(string)) => Ok(ConstValue::String(string)),
        ("ID", serde_json::Value::Number(number)) => Ok(ConstValue::String(number.to_string())),
        ("Int" | "Float" | "String" | "Boolean" | "ID", _) => Err(Error::new(format!(
            "Cannot coerce the fetched value to a {scalar_name}"
        ))),
        (_, value) => ConstValue::from_json(value).map_err(|err| Error::new(err.to_string())),
    }
}

pub(crate) fn const_value_kind_str(value: &ConstValue) -> &'static str {
    match value {
        ConstValue::Null => "null",
        ConstValue::Number(_) => "number",
        ConstValue::String(_) => "string",
        ConstValue::Boolean(_) => "boolean",
        ConstValue::Binary(_) => "binary",
        ConstValue::Enum(_) => "enum value",
        ConstValue::List(_) => "list",
        ConstValue::Object(_) => "object",
    }
}
