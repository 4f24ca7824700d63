//! The schema as execution consumes it: named types, root types per operation kind,
//! possible-type membership for interfaces and unions, and the per-field resolver registry.
//!
//! Building a [`Registry`] out of SDL is a separate concern and happens upstream; execution only
//! reads it.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use async_graphql_parser::types::OperationType;
use indexmap::{IndexMap, IndexSet};

pub mod field_types;
pub mod resolved_value;
pub mod resolvers;
pub mod scalars;

use async_graphql_value::ConstValue;
pub use field_types::{MetaFieldType, WrappedType};
pub use resolved_value::ResolvedValue;
pub use resolvers::{
    DataFetcher, DefaultFetchErrorHandler, DefaultValueUnboxer, FetchContext, FetchError, FetchErrorHandler,
    FetchResult, FetchedValue, HandledFetchError, Resolver, TypeResolution, TypeResolver, ValueUnboxer,
};
pub use scalars::{ScalarCoercion, ScalarParser};

/// A field on an object type.
#[derive(Debug, Clone, Default)]
pub struct MetaField {
    pub name: String,
    /// The key to read out of the parent value when this differs from the field name.
    pub mapped_name: Option<String>,
    pub args: IndexMap<String, MetaInputValue>,
    pub ty: MetaFieldType,
    pub resolver: Resolver,
}

impl MetaField {
    pub fn new(name: impl Into<String>, ty: impl Into<MetaFieldType>) -> MetaField {
        MetaField {
            name: name.into(),
            ty: ty.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_argument(mut self, argument: MetaInputValue) -> Self {
        self.args.insert(argument.name.clone(), argument);
        self
    }

    #[must_use]
    pub fn with_mapped_name(mut self, mapped_name: impl Into<String>) -> Self {
        self.mapped_name = Some(mapped_name.into());
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn target_field_name(&self) -> &str {
        self.mapped_name.as_deref().unwrap_or(&self.name)
    }
}

/// An argument of a field, or a field of an input object.
#[derive(Debug, Clone)]
pub struct MetaInputValue {
    pub name: String,
    pub ty: MetaFieldType,
    pub default_value: Option<ConstValue>,
}

impl MetaInputValue {
    pub fn new(name: impl Into<String>, ty: impl Into<MetaFieldType>) -> MetaInputValue {
        MetaInputValue {
            name: name.into(),
            ty: ty.into(),
            default_value: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default_value: ConstValue) -> Self {
        self.default_value = Some(default_value);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectType {
    pub name: String,
    pub fields: IndexMap<String, MetaField>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = MetaField>) -> ObjectType {
        ObjectType {
            name: name.into(),
            fields: fields.into_iter().map(|field| (field.name.clone(), field)).collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }
}

#[derive(Clone, Default)]
pub struct InterfaceType {
    pub name: String,
    /// Resolves values of this interface to a concrete object type. When absent, the
    /// `__typename` key of the fetched value is consulted instead.
    pub type_resolver: Option<Arc<dyn TypeResolver>>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> InterfaceType {
        InterfaceType {
            name: name.into(),
            type_resolver: None,
        }
    }

    #[must_use]
    pub fn with_type_resolver(mut self, resolver: impl TypeResolver + 'static) -> Self {
        self.type_resolver = Some(Arc::new(resolver));
        self
    }
}

impl std::fmt::Debug for InterfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceType").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub struct UnionType {
    pub name: String,
    pub possible_types: IndexSet<String>,
    /// See [`InterfaceType::type_resolver`].
    pub type_resolver: Option<Arc<dyn TypeResolver>>,
}

impl UnionType {
    pub fn new<T: Into<String>>(name: impl Into<String>, possible_types: impl IntoIterator<Item = T>) -> UnionType {
        UnionType {
            name: name.into(),
            possible_types: possible_types.into_iter().map(Into::into).collect(),
            type_resolver: None,
        }
    }

    #[must_use]
    pub fn with_type_resolver(mut self, resolver: impl TypeResolver + 'static) -> Self {
        self.type_resolver = Some(Arc::new(resolver));
        self
    }
}

impl std::fmt::Debug for UnionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionType")
            .field("name", &self.name)
            .field("possible_types", &self.possible_types)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnumType {
    pub name: String,
    pub values: IndexSet<String>,
}

impl EnumType {
    pub fn new<T: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = T>) -> EnumType {
        EnumType {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScalarType {
    pub name: String,
    pub parser: ScalarParser,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> ScalarType {
        ScalarType {
            name: name.into(),
            parser: ScalarParser::default(),
        }
    }

    #[must_use]
    pub fn with_parser(mut self, parser: ScalarParser) -> Self {
        self.parser = parser;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputObjectType {
    pub name: String,
    pub input_fields: IndexMap<String, MetaInputValue>,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>, input_fields: impl IntoIterator<Item = MetaInputValue>) -> InputObjectType {
        InputObjectType {
            name: name.into(),
            input_fields: input_fields
                .into_iter()
                .map(|input_field| (input_field.name.clone(), input_field))
                .collect(),
        }
    }
}

/// A named type in the schema.
#[derive(Debug, Clone)]
pub enum MetaType {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl MetaType {
    pub fn name(&self) -> &str {
        match self {
            MetaType::Scalar(ty) => &ty.name,
            MetaType::Object(ty) => &ty.name,
            MetaType::Interface(ty) => &ty.name,
            MetaType::Union(ty) => &ty.name,
            MetaType::Enum(ty) => &ty.name,
            MetaType::InputObject(ty) => &ty.name,
        }
    }

    pub fn object(&self) -> Option<&ObjectType> {
        match self {
            MetaType::Object(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, MetaType::Interface(_) | MetaType::Union(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MetaType::Scalar(_) | MetaType::Enum(_))
    }
}

impl From<ScalarType> for MetaType {
    fn from(ty: ScalarType) -> Self {
        MetaType::Scalar(ty)
    }
}

impl From<ObjectType> for MetaType {
    fn from(ty: ObjectType) -> Self {
        MetaType::Object(ty)
    }
}

impl From<InterfaceType> for MetaType {
    fn from(ty: InterfaceType) -> Self {
        MetaType::Interface(ty)
    }
}

impl From<UnionType> for MetaType {
    fn from(ty: UnionType) -> Self {
        MetaType::Union(ty)
    }
}

impl From<EnumType> for MetaType {
    fn from(ty: EnumType) -> Self {
        MetaType::Enum(ty)
    }
}

impl From<InputObjectType> for MetaType {
    fn from(ty: InputObjectType) -> Self {
        MetaType::InputObject(ty)
    }
}

/// Every named type of the schema plus the root-type and interface-implementation tables.
#[derive(Debug, Clone)]
pub struct Registry {
    pub types: BTreeMap<String, MetaType>,
    /// Object type name to the names of the interfaces it implements.
    pub implements: HashMap<String, HashSet<String>>,
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            types: Default::default(),
            implements: Default::default(),
            query_type: "Query".to_string(),
            mutation_type: None,
            subscription_type: None,
        }
    }
}

impl Registry {
    pub fn new() -> Registry {
        let mut registry = Registry::default();
        for builtin in ["Int", "Float", "String", "Boolean", "ID"] {
            registry.insert_type(ScalarType::new(builtin));
        }
        registry
    }

    pub fn insert_type(&mut self, ty: impl Into<MetaType>) {
        let ty = ty.into();
        self.types.insert(ty.name().to_string(), ty);
    }

    /// Records that `object_type` implements `interface`.
    pub fn register_implements(&mut self, object_type: impl Into<String>, interface: impl Into<String>) {
        self.implements.entry(object_type.into()).or_default().insert(interface.into());
    }

    pub fn lookup_type(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    pub fn root_type(&self, operation_type: OperationType) -> Option<&str> {
        match operation_type {
            OperationType::Query => Some(&self.query_type),
            OperationType::Mutation => self.mutation_type.as_deref(),
            OperationType::Subscription => self.subscription_type.as_deref(),
        }
    }

    /// Whether `concrete` is one of the object types behind the interface or union named
    /// `abstract_name`.
    pub fn is_possible_type(&self, abstract_name: &str, concrete: &str) -> bool {
        match self.types.get(abstract_name) {
            Some(MetaType::Interface(_)) => self
                .implements
                .get(concrete)
                .map_or(false, |interfaces| interfaces.contains(abstract_name)),
            Some(MetaType::Union(union_type)) => union_type.possible_types.contains(concrete),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_possible_types() {
        let mut registry = Registry::new();
        registry.insert_type(ObjectType::new("Dog", [MetaField::new("name", "String!")]));
        registry.insert_type(ObjectType::new("Cat", [MetaField::new("name", "String!")]));
        registry.insert_type(UnionType::new("Pet", ["Dog", "Cat"]));
        registry.insert_type(InterfaceType::new("Named"));
        registry.register_implements("Dog", "Named");

        assert!(registry.is_possible_type("Pet", "Dog"));
        assert!(registry.is_possible_type("Pet", "Cat"));
        assert!(!registry.is_possible_type("Pet", "Named"));

        assert!(registry.is_possible_type("Named", "Dog"));
        assert!(!registry.is_possible_type("Named", "Cat"));

        // Concrete types have no possible types of their own.
        assert!(!registry.is_possible_type("Dog", "Dog"));
    }

    #[test]
    fn test_root_types() {
        let mut registry = Registry::new();
        registry.mutation_type = Some("Mutation".to_string());

        assert_eq!(registry.root_type(OperationType::Query), Some("Query"));
        assert_eq!(registry.root_type(OperationType::Mutation), Some("Mutation"));
        assert_eq!(registry.root_type(OperationType::Subscription), None);
    }

    #[test]
    fn test_mapped_field_name() {
        let field = MetaField::new("fullName", "String").with_mapped_name("full_name");
        assert_eq!(field.target_field_name(), "full_name");
        assert_eq!(MetaField::new("name", "String").target_field_name(), "name");
    }
}
