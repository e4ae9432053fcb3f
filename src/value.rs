//! Bind values and raw result rows exchanged with the execution facade.

use serde_json::Value;
use smallvec::SmallVec;

/// A scalar bind value or raw column value.
///
/// The execution facade receives these alongside the SQL text and is
/// responsible for rendering them as driver placeholders. Result rows come
/// back as the same type, with JSON-aggregated relation columns arriving as
/// [`Scalar::Text`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Converts into a JSON value without decoding embedded JSON text.
    pub fn into_json(self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(i) => Value::from(i),
            Scalar::Float(f) => {
                serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
            }
            Scalar::Text(s) => Value::String(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// Ordered bind values for one compiled statement.
///
/// Inline storage covers the typical handful of filter bindings without a
/// heap allocation.
pub type Bindings = SmallVec<[Scalar; 8]>;

/// A raw result row: column name to scalar, in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub Vec<(String, Scalar)>);

impl Row {
    pub fn new(columns: Vec<(String, Scalar)>) -> Self {
        Self(columns)
    }

    /// Looks a column up by name.
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl FromIterator<(String, Scalar)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Scalar)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_into_json_preserves_kind() {
        assert_eq!(Scalar::Null.into_json(), Value::Null);
        assert_eq!(Scalar::Int(3).into_json(), Value::from(3));
        assert_eq!(Scalar::Text("x".into()).into_json(), Value::from("x"));
        assert_eq!(Scalar::Bool(true).into_json(), Value::Bool(true));
    }

    #[test]
    fn scalar_from_option() {
        assert_eq!(Scalar::from(None::<i64>), Scalar::Null);
        assert_eq!(Scalar::from(Some("a")), Scalar::Text("a".into()));
    }

    #[test]
    fn row_lookup_by_name() {
        let row = Row::new(vec![
            ("id".into(), Scalar::Int(1)),
            ("name".into(), Scalar::Text("a".into())),
        ]);
        assert_eq!(row.get("name"), Some(&Scalar::Text("a".into())));
        assert_eq!(row.get("missing"), None);
    }
}
