use std::collections::BTreeMap;

use serde_json::Value;

use super::timestamp::Timestamp;

/// A document read back from the store: identifier plus decoded fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    id: String,
    fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a string field, or `None` when absent or of another type.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn f64_field(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    pub fn bool_field(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    pub fn timestamp_field(&self, field: &str) -> Option<Timestamp> {
        self.get(field).and_then(Timestamp::from_value)
    }
}

/// A single field in a pending write: a plain value or a sentinel the
/// store resolves while applying the write.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteValue {
    Value(Value),
    ServerTimestamp,
}

impl From<Value> for WriteValue {
    fn from(value: Value) -> Self {
        WriteValue::Value(value)
    }
}

impl From<&str> for WriteValue {
    fn from(value: &str) -> Self {
        WriteValue::Value(Value::from(value))
    }
}

impl From<String> for WriteValue {
    fn from(value: String) -> Self {
        WriteValue::Value(Value::from(value))
    }
}

impl From<bool> for WriteValue {
    fn from(value: bool) -> Self {
        WriteValue::Value(Value::from(value))
    }
}

impl From<f64> for WriteValue {
    fn from(value: f64) -> Self {
        WriteValue::Value(Value::from(value))
    }
}

/// Write-time placeholder resolved to the store's clock when the write is
/// applied, never on the device.
pub fn server_timestamp() -> WriteValue {
    WriteValue::ServerTimestamp
}

/// Field map handed to `create`/`update`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteData {
    fields: BTreeMap<String, WriteValue>,
}

impl WriteData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<WriteValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, WriteValue> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolves sentinels against the provided server time and returns the
    /// plain field map to persist.
    pub fn resolve(self, server_time: Timestamp) -> BTreeMap<String, Value> {
        self.fields
            .into_iter()
            .map(|(name, value)| {
                let resolved = match value {
                    WriteValue::Value(value) => value,
                    WriteValue::ServerTimestamp => server_time.to_value(),
                };
                (name, resolved)
            })
            .collect()
    }
}
