//! Request and result types.
//!
//! # Design
//! `Params` is a `serde_json` map built with `preserve_order`, so insertion
//! order is kept all the way to the query string and the encoded body.
//! `RequestSpec` is the snapshot taken by `configure`; nothing mutates it
//! afterwards. `Decoded` is what `execute` returns: the generic value as
//! decoded, or the same data viewed as a `Record`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::RestError;
use crate::verb::Verb;

/// Ordered parameter set: unique string keys, insertion order preserved.
pub type Params = Map<String, Value>;

/// Immutable description of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub verb: Verb,
    pub url: String,
    pub params: Option<Params>,
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The generic value exactly as the codec produced it.
    Mapping(Value),
    /// The same data as a field-addressable record.
    Object(Record),
}

impl Decoded {
    pub(crate) fn new(value: Value, as_object: bool) -> Self {
        if as_object {
            Decoded::Object(Record::from(value))
        } else {
            Decoded::Mapping(value)
        }
    }

    /// Collapse either shape back into a generic value.
    pub fn into_value(self) -> Value {
        match self {
            Decoded::Mapping(value) => value,
            Decoded::Object(record) => Value::Object(record.into_map()),
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Decoded::Object(record) => Some(record),
            Decoded::Mapping(_) => None,
        }
    }
}

/// Object-like view over a decoded body.
///
/// Anything that is not already an object is wrapped the way a scalar cast
/// to an object would be: arrays are keyed by index, null becomes an empty
/// record, and other scalars sit under `"scalar"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    /// Deserialize the record into a caller-defined type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, RestError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| RestError::Decode(e.to_string()))
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect(),
            scalar => {
                let mut map = Map::new();
                map.insert("scalar".to_string(), scalar);
                map
            }
        };
        Self { fields }
    }
}
