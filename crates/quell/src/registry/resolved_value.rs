use std::sync::Arc;

use query_path::QueryPathSegment;
use serde_json::Value;

/// A value produced by a data fetcher, handed down the resolution tree.
///
/// The JSON blob is kept behind an `Arc` together with a path into it, so taking a list element or
/// an object field is a cheap sub-copy rather than a clone of the whole tree.
#[derive(Debug, Clone)]
pub struct ResolvedValue {
    /// The root of the JSON blob that contains this value.
    data_root: Arc<Value>,
    /// The position of this value inside `data_root`.
    data_path: Vec<QueryPathSegment>,
}

impl ResolvedValue {
    pub fn new(value: Value) -> Self {
        Self {
            data_root: Arc::new(value),
            data_path: Vec::new(),
        }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn data_resolved(&self) -> &Value {
        self.data_path.iter().fold(self.data_root.as_ref(), |value, segment| {
            match segment {
                QueryPathSegment::Field(field) => value.get(field.as_str()),
                QueryPathSegment::Index(index) => value.get(*index),
            }
            .expect("data_path to be validated before ResolvedValue construction")
        })
    }

    /// A new value pointing at the given index, when this is a list and the index exists.
    pub fn get_index(&self, index: usize) -> Option<ResolvedValue> {
        self.data_resolved().get(index)?;

        let mut data_path = self.data_path.clone();
        data_path.push(QueryPathSegment::Index(index));

        Some(ResolvedValue {
            data_root: Arc::clone(&self.data_root),
            data_path,
        })
    }

    /// A new value pointing at the given field, when this is an object and the field exists.
    pub fn get_field(&self, name: &str) -> Option<ResolvedValue> {
        self.data_resolved().get(name)?;

        let mut data_path = self.data_path.clone();
        data_path.push(QueryPathSegment::field(name));

        Some(ResolvedValue {
            data_root: Arc::clone(&self.data_root),
            data_path,
        })
    }

    /// Takes the inner value, cloning only when the root is shared.
    pub fn take(mut self) -> Value {
        match Arc::try_unwrap(self.data_root) {
            Ok(value) => self.data_path.iter().fold(value, |mut value, segment| match segment {
                QueryPathSegment::Field(field) => {
                    value.get_mut(field.as_str()).expect("data_path to be validated").take()
                }
                QueryPathSegment::Index(index) => {
                    value.get_mut(*index).expect("data_path to be validated").take()
                }
            }),
            Err(arc) => {
                self.data_root = arc;
                self.data_resolved().clone()
            }
        }
    }

    /// When this value is a list, an iterator over its items.
    pub fn item_iter(&self) -> Option<impl Iterator<Item = ResolvedValue> + '_> {
        match self.data_resolved() {
            Value::Array(array) => Some((0..array.len()).map(|index| {
                let mut data_path = self.data_path.clone();
                data_path.push(QueryPathSegment::Index(index));

                ResolvedValue {
                    data_root: Arc::clone(&self.data_root),
                    data_path,
                }
            })),
            _ => None,
        }
    }
}

impl Default for ResolvedValue {
    fn default() -> Self {
        Self::null()
    }
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_resolved_value_array() {
        let data = ResolvedValue::new(json!(["hello", "there"]));
        assert_eq!(data.get_index(0).unwrap().data_resolved(), &json!("hello"));
        assert_eq!(data.get_index(1).unwrap().data_resolved(), &json!("there"));
        assert!(data.get_index(2).is_none());

        assert!(data.get_field("1").is_none());

        assert_eq!(data.get_index(0).unwrap().take(), json!("hello"));

        assert_eq!(
            data.item_iter().unwrap().map(ResolvedValue::take).collect::<Vec<_>>(),
            vec![json!("hello"), json!("there")]
        );
    }

    #[test]
    fn test_resolved_value_object() {
        let data = ResolvedValue::new(json!({"a": "hello", "b": "there"}));
        assert_eq!(data.get_field("a").unwrap().data_resolved(), &json!("hello"));
        assert_eq!(data.get_field("b").unwrap().data_resolved(), &json!("there"));
        assert!(data.get_field("c").is_none());

        assert!(data.get_index(1).is_none());

        assert_eq!(data.get_field("a").unwrap().take(), json!("hello"));
    }

    #[test]
    fn test_resolved_value_scalar() {
        let data = ResolvedValue::new(json!(true));

        assert!(data.get_index(0).is_none());
        assert!(data.get_field("hello").is_none());

        assert_eq!(data.data_resolved(), &json!(true));
        assert_eq!(data.take(), json!(true));
    }
}
