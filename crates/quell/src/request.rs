use std::any::Any;

use async_graphql_parser::types::ExecutableDocument;
use async_graphql_value::Variables;
use ulid::Ulid;

use crate::context::Data;

/// One GraphQL request: a parsed, validated document plus everything needed to execute it.
///
/// Parsing and validation happen upstream; this engine starts from the document.
#[derive(Debug)]
pub struct Request {
    pub document: ExecutableDocument,
    /// The operation to execute when the document contains more than one.
    pub operation_name: Option<String>,
    /// The raw variables, coerced against the operation's variable definitions at the start of
    /// execution.
    pub variables: Variables,
    /// Request-scoped data fetchers can access through their context.
    ///
    /// **This data is only valid for this request.**
    pub data: Data,
    /// Overrides the generated execution id, e.g. to correlate with an upstream trace.
    pub execution_id: Option<Ulid>,
}

impl Request {
    pub fn new(document: ExecutableDocument) -> Self {
        Self {
            document,
            operation_name: None,
            variables: Variables::default(),
            data: Data::default(),
            execution_id: None,
        }
    }

    /// Specify the operation name of the request.
    #[must_use]
    pub fn with_operation_name<T: Into<String>>(self, name: T) -> Self {
        Self {
            operation_name: Some(name.into()),
            ..self
        }
    }

    /// Specify the variables.
    #[must_use]
    pub fn variables(self, variables: Variables) -> Self {
        Self { variables, ..self }
    }

    /// Insert some data for this request.
    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    #[must_use]
    pub fn with_execution_id(mut self, execution_id: Ulid) -> Self {
        self.execution_id = Some(execution_id);
        self
    }
}

impl From<ExecutableDocument> for Request {
    fn from(document: ExecutableDocument) -> Self {
        Self::new(document)
    }
}

/// Either a single request or a non-empty batch of them.
#[derive(Debug)]
pub enum BatchRequest {
    Single(Request),
    Batch(Vec<Request>),
}

impl BatchRequest {
    /// The request, when this is not actually a batch.
    pub fn into_single(self) -> Option<Request> {
        match self {
            BatchRequest::Single(request) => Some(request),
            BatchRequest::Batch(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        match self {
            BatchRequest::Single(request) => std::slice::from_ref(request).iter(),
            BatchRequest::Batch(requests) => requests.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Request> {
        match self {
            BatchRequest::Single(request) => std::slice::from_mut(request).iter_mut(),
            BatchRequest::Batch(requests) => requests.iter_mut(),
        }
    }

    /// Specify the variables for every request.
    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        for request in self.iter_mut() {
            request.variables = variables.clone();
        }
        self
    }

    /// Insert some data for every request.
    #[must_use]
    pub fn data<D: Any + Clone + Send + Sync>(mut self, data: D) -> Self {
        for request in self.iter_mut() {
            request.data.insert(data.clone());
        }
        self
    }
}

impl From<Request> for BatchRequest {
    fn from(request: Request) -> Self {
        BatchRequest::Single(request)
    }
}

impl From<Vec<Request>> for BatchRequest {
    fn from(requests: Vec<Request>) -> Self {
        BatchRequest::Batch(requests)
    }
}
