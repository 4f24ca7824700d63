//! Per-request execution state: the typed data map handed to resolvers, the synchronized error
//! sink, the parent-linked step info built as resolution descends, and the parameters a strategy
//! receives for one selection set.

use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
    fmt::{self, Debug, Formatter},
    sync::{Arc, Mutex},
};

use async_graphql_parser::{
    types::{FragmentDefinition, OperationType},
    Positioned,
};
use async_graphql_value::{ConstValue, Name, Variables};
use fnv::FnvHashMap;
use indexmap::IndexMap;
use query_path::QueryPath;
use ulid::Ulid;

use crate::{
    collect::MergedSelectionSet,
    error::ServerError,
    registry::{MetaFieldType, ObjectType, Registry, ResolvedValue},
    schema::SchemaEnv,
};

/// A type-keyed bag of values, used for engine-wide, request-scoped and fetcher-local context.
#[derive(Default)]
pub struct Data(FnvHashMap<TypeId, Box<dyn Any + Send + Sync>>);

impl Data {
    pub fn insert<D: Any + Send + Sync>(&mut self, data: D) {
        self.0.insert(TypeId::of::<D>(), Box::new(data));
    }

    pub fn get<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.0.get(&TypeId::of::<D>()).and_then(|data| data.downcast_ref::<D>())
    }
}

impl Debug for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Data")
    }
}

/// The shared error state of one request.
///
/// One lock guards both the error list and the set of paths that already carry a non-null
/// violation, so the membership test and the append cannot race between concurrently resolving
/// fields. General errors are never deduplicated; non-null violations are first-writer-wins per
/// path. The two policies are distinct on purpose: merging them would change observable error
/// counts.
#[derive(Default)]
pub struct ErrorSink {
    inner: Mutex<ErrorSinkInner>,
}

#[derive(Default)]
struct ErrorSinkInner {
    errors: Vec<ServerError>,
    non_null_paths: HashSet<QueryPath>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, error: ServerError) {
        self.lock().errors.push(error);
    }

    pub fn extend(&self, errors: impl IntoIterator<Item = ServerError>) {
        self.lock().errors.extend(errors);
    }

    /// Records a non-null violation unless its path already carries one. Returns whether the
    /// error was recorded.
    pub fn push_non_null_violation(&self, error: ServerError) -> bool {
        let mut inner = self.lock();
        if inner.non_null_paths.insert(error.path.clone()) {
            inner.errors.push(error);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().errors.len()
    }

    pub fn take(&self) -> Vec<ServerError> {
        std::mem::take(&mut self.lock().errors)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ErrorSinkInner> {
        self.inner.lock().expect("to be able to lock this mutex")
    }
}

/// Where resolution currently is: the declared type at this position, the defining parent type,
/// the field's name and response key, the coerced arguments and the response path.
///
/// One is built per field and per list element and never mutated afterwards; children keep an
/// `Arc` back-reference to their parent for error reporting.
#[derive(Debug)]
pub struct ExecutionStepInfo {
    parent: Option<Arc<ExecutionStepInfo>>,
    /// The name of the object type defining the field, absent at the operation root.
    pub parent_type: Option<String>,
    /// The declared type at this position; for a list element, the element type.
    pub field_type: Option<MetaFieldType>,
    pub field_name: Option<String>,
    pub response_key: Option<String>,
    pub arguments: IndexMap<Name, ConstValue>,
    pub path: QueryPath,
}

impl ExecutionStepInfo {
    pub fn root() -> Arc<ExecutionStepInfo> {
        Arc::new(ExecutionStepInfo {
            parent: None,
            parent_type: None,
            field_type: None,
            field_name: None,
            response_key: None,
            arguments: IndexMap::new(),
            path: QueryPath::empty(),
        })
    }

    /// A child step for one field of a selection set.
    pub fn child_field(
        self: &Arc<Self>,
        parent_type: &str,
        field_name: &str,
        response_key: &str,
        field_type: MetaFieldType,
        arguments: IndexMap<Name, ConstValue>,
    ) -> Arc<ExecutionStepInfo> {
        Arc::new(ExecutionStepInfo {
            parent: Some(Arc::clone(self)),
            parent_type: Some(parent_type.to_string()),
            field_type: Some(field_type),
            field_name: Some(field_name.to_string()),
            response_key: Some(response_key.to_string()),
            arguments,
            path: self.path.child(response_key),
        })
    }

    /// A child step for one element of a list value; keeps the field metadata, narrows the type
    /// to the element type and extends the path with the index.
    pub fn child_element(self: &Arc<Self>, index: usize, element_type: MetaFieldType) -> Arc<ExecutionStepInfo> {
        Arc::new(ExecutionStepInfo {
            parent: Some(Arc::clone(self)),
            parent_type: self.parent_type.clone(),
            field_type: Some(element_type),
            field_name: self.field_name.clone(),
            response_key: self.response_key.clone(),
            arguments: self.arguments.clone(),
            path: self.path.child(index),
        })
    }

    pub fn parent(&self) -> Option<&Arc<ExecutionStepInfo>> {
        self.parent.as_ref()
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }
}

/// Everything one request's field resolutions share, by reference. Cheap to copy into every
/// field future.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub schema_env: &'a SchemaEnv,
    pub operation_type: OperationType,
    pub variables: &'a Variables,
    pub fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    /// Request-scoped data, handed untouched to every fetcher and type resolver.
    pub data: &'a Data,
    pub errors: &'a ErrorSink,
    pub execution_id: Ulid,
}

impl<'a> ExecutionContext<'a> {
    pub fn registry(&self) -> &'a Registry {
        &self.schema_env.registry
    }
}

/// What a strategy needs to resolve one merged selection set.
pub struct ExecutionParameters<'a> {
    /// The concrete object type the selection set applies to.
    pub root_type: &'a ObjectType,
    pub selection_set: MergedSelectionSet<'a>,
    /// The parent value fields of this level resolve against.
    pub parent_value: ResolvedValue,
    pub step_info: Arc<ExecutionStepInfo>,
    /// Context a parent fetcher handed down for this subtree.
    pub local_context: Option<Arc<Data>>,
}
