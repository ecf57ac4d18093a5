use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored user record: the assigned integer id plus whatever JSON object
/// the client submitted. No schema is enforced on the body; fields are kept
/// verbatim and serialized flattened, so the wire shape is
/// `{"id": 1, "name": "Alice", ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl User {
    /// Build a record from a request body. Any `id` key in the body is
    /// discarded; the id always comes from the store counter or the path.
    pub fn from_body(id: u64, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Self { id, fields }
    }

    /// Build a record from an arbitrary JSON body. Non-object shapes are
    /// coerced the way a JS object spread would: arrays and strings become
    /// index-keyed fields, scalars and null contribute nothing.
    pub fn from_value(id: u64, body: Value) -> Self {
        let fields = match body {
            Value::Object(map) => map,
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            Value::String(s) => s
                .chars()
                .enumerate()
                .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
                .collect(),
            _ => Map::new(),
        };
        Self::from_body(id, fields)
    }
}
