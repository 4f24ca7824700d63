use std::fmt::{self, Display, Formatter};

/// The type of a field or input value as the schema declares it, wrapping included, e.g.
/// `[String!]!`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MetaFieldType(String);

impl MetaFieldType {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The innermost named type, with all list and non-null wrapping stripped.
    pub fn named_type(&self) -> &str {
        self.0.trim_matches(|c| c == '[' || c == ']' || c == '!')
    }

    pub fn is_non_null(&self) -> bool {
        self.0.ends_with('!')
    }

    pub fn is_nullable(&self) -> bool {
        !self.is_non_null()
    }

    pub fn is_list(&self) -> bool {
        self.0.trim_end_matches('!').starts_with('[')
    }

    /// A borrowed view of this type that can be peeled one wrapper at a time.
    pub fn as_wrapped(&self) -> WrappedType<'_> {
        WrappedType(&self.0)
    }
}

impl From<&str> for MetaFieldType {
    fn from(value: &str) -> Self {
        MetaFieldType(value.to_string())
    }
}

impl From<String> for MetaFieldType {
    fn from(value: String) -> Self {
        MetaFieldType(value)
    }
}

impl Display for MetaFieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A view into a wrapped type string that peels wrappers without allocating.
///
/// Coercion and completion both walk a type from the outside in: check the non-null wrapper,
/// strip it, take the list element, recurse. Each step hands out a narrower view of the same
/// underlying string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappedType<'a>(&'a str);

impl<'a> WrappedType<'a> {
    pub fn is_non_null(self) -> bool {
        self.0.ends_with('!')
    }

    pub fn is_list(self) -> bool {
        self.0.trim_end_matches('!').starts_with('[')
    }

    /// This type with an outermost non-null wrapper stripped, if any.
    pub fn nullable(self) -> WrappedType<'a> {
        WrappedType(self.0.strip_suffix('!').unwrap_or(self.0))
    }

    /// The element type when this view is a list. The caller strips the non-null wrapper first
    /// via [`WrappedType::nullable`].
    pub fn list_element(self) -> Option<WrappedType<'a>> {
        Some(WrappedType(self.0.strip_prefix('[')?.strip_suffix(']')?))
    }

    pub fn named_type(self) -> &'a str {
        self.0.trim_matches(|c| c == '[' || c == ']' || c == '!')
    }
}

impl<'a> From<&'a str> for WrappedType<'a> {
    fn from(value: &'a str) -> Self {
        WrappedType(value)
    }
}

impl Display for WrappedType<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_type() {
        assert_eq!(MetaFieldType::from("String").named_type(), "String");
        assert_eq!(MetaFieldType::from("String!").named_type(), "String");
        assert_eq!(MetaFieldType::from("[String!]!").named_type(), "String");
        assert_eq!(MetaFieldType::from("[[User]]").named_type(), "User");
    }

    #[test]
    fn test_wrapping_checks() {
        assert!(MetaFieldType::from("String!").is_non_null());
        assert!(MetaFieldType::from("[String!]").is_nullable());
        assert!(MetaFieldType::from("[String]!").is_list());
        assert!(MetaFieldType::from("[[String]]").is_list());
        assert!(!MetaFieldType::from("String!").is_list());
    }

    #[test]
    fn test_peeling_wrappers() {
        let ty = MetaFieldType::from("[[String!]]!");
        let outer = ty.as_wrapped();
        assert!(outer.is_non_null());

        let inner = outer.nullable().list_element().unwrap();
        assert_eq!(inner.to_string(), "[String!]");
        assert!(!inner.is_non_null());

        let element = inner.nullable().list_element().unwrap();
        assert_eq!(element.to_string(), "String!");
        assert!(element.is_non_null());
        assert!(element.nullable().list_element().is_none());
        assert_eq!(element.named_type(), "String");
    }
}
