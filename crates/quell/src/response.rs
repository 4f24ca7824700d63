use async_graphql_value::ConstValue;
use serde::Serialize;

use crate::error::ServerError;

/// The outcome of executing one request: the data tree mirroring the query shape (or null) and
/// the errors gathered along the way.
///
/// How this reaches the wire is the caller's concern; it serializes with the conventional
/// `data`/`errors` keys.
#[derive(Debug, Default, Serialize)]
pub struct Response {
    pub data: ConstValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,
}

impl Response {
    pub fn new(data: ConstValue) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    /// A response with null data, e.g. when the request failed before any field resolved.
    pub fn from_errors(errors: Vec<ServerError>) -> Self {
        Self {
            data: ConstValue::Null,
            errors,
        }
    }

    /// Whether execution finished without recording any error.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The responses of a [`crate::BatchRequest`], in request order.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchResponse {
    Single(Response),
    Batch(Vec<Response>),
}

impl BatchResponse {
    pub fn is_ok(&self) -> bool {
        match self {
            BatchResponse::Single(response) => response.is_ok(),
            BatchResponse::Batch(responses) => responses.iter().all(Response::is_ok),
        }
    }
}
