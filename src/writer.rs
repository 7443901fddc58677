//! Push-style document writers.

use serde_json::{Map, Value};

use crate::error::SerializeError;

/// Structured output sink driven by the serializer.
///
/// Inside an object, every value or nested container must be preceded by
/// [`write_field_name`](DocumentWriter::write_field_name).
pub trait DocumentWriter {
    fn start_object(&mut self) -> Result<(), SerializeError>;
    fn end_object(&mut self) -> Result<(), SerializeError>;
    fn start_array(&mut self) -> Result<(), SerializeError>;
    fn end_array(&mut self) -> Result<(), SerializeError>;
    fn write_field_name(&mut self, name: &str) -> Result<(), SerializeError>;
    fn write_value(&mut self, value: Value) -> Result<(), SerializeError>;

    fn write_field(&mut self, name: &str, value: Value) -> Result<(), SerializeError> {
        self.write_field_name(name)?;
        self.write_value(value)
    }
}

enum Frame {
    Object {
        map: Map<String, Value>,
        pending: Option<String>,
    },
    Array(Vec<Value>),
}

/// Builds a `serde_json::Value`, keeping field order.
#[derive(Default)]
pub struct JsonWriter {
    frames: Vec<Frame>,
    root: Option<Value>,
}

fn misuse(message: impl Into<String>) -> SerializeError {
    SerializeError::Writer {
        message: message.into(),
    }
}

impl JsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished document.
    ///
    /// # Errors
    ///
    /// Returns `SerializeError::Writer` if containers are still open or
    /// nothing was written.
    pub fn finish(self) -> Result<Value, SerializeError> {
        if !self.frames.is_empty() {
            return Err(misuse(format!("{} container(s) left open", self.frames.len())));
        }
        self.root.ok_or_else(|| misuse("empty document"))
    }

    /// Attach a completed value to the enclosing container, or make it the root.
    fn emit(&mut self, value: Value) -> Result<(), SerializeError> {
        match self.frames.last_mut() {
            Some(Frame::Object { map, pending }) => {
                let name = pending
                    .take()
                    .ok_or_else(|| misuse("value written without a field name"))?;
                map.insert(name, value);
                Ok(())
            }
            Some(Frame::Array(items)) => {
                items.push(value);
                Ok(())
            }
            None if self.root.is_none() => {
                self.root = Some(value);
                Ok(())
            }
            None => Err(misuse("document already has a root value")),
        }
    }
}

impl DocumentWriter for JsonWriter {
    fn start_object(&mut self) -> Result<(), SerializeError> {
        self.frames.push(Frame::Object {
            map: Map::new(),
            pending: None,
        });
        Ok(())
    }

    fn end_object(&mut self) -> Result<(), SerializeError> {
        match self.frames.pop() {
            Some(Frame::Object { map, pending: None }) => self.emit(Value::Object(map)),
            Some(Frame::Object {
                pending: Some(name),
                ..
            }) => Err(misuse(format!("field \"{}\" has no value", name))),
            _ => Err(misuse("end_object without matching start_object")),
        }
    }

    fn start_array(&mut self) -> Result<(), SerializeError> {
        self.frames.push(Frame::Array(Vec::new()));
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), SerializeError> {
        match self.frames.pop() {
            Some(Frame::Array(items)) => self.emit(Value::Array(items)),
            _ => Err(misuse("end_array without matching start_array")),
        }
    }

    fn write_field_name(&mut self, name: &str) -> Result<(), SerializeError> {
        match self.frames.last_mut() {
            Some(Frame::Object { pending, .. }) if pending.is_none() => {
                *pending = Some(name.to_string());
                Ok(())
            }
            Some(Frame::Object { .. }) => Err(misuse(format!(
                "field \"{}\" started before the previous field got a value",
                name
            ))),
            _ => Err(misuse(format!("field \"{}\" outside of an object", name))),
        }
    }

    fn write_value(&mut self, value: Value) -> Result<(), SerializeError> {
        self.emit(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_nested_document_in_order() {
        let mut writer = JsonWriter::new();
        writer.start_object().unwrap();
        writer.write_field("@type", json!("Event")).unwrap();
        writer.write_field_name("tags").unwrap();
        writer.start_array().unwrap();
        writer.write_value(json!("a")).unwrap();
        writer.start_object().unwrap();
        writer.write_field("b", json!(1)).unwrap();
        writer.end_object().unwrap();
        writer.end_array().unwrap();
        writer.write_field("name", json!("x")).unwrap();
        writer.end_object().unwrap();

        let value = writer.finish().unwrap();
        assert_eq!(value, json!({"@type": "Event", "tags": ["a", {"b": 1}], "name": "x"}));
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["@type", "tags", "name"]);
    }

    #[test]
    fn rejects_value_without_field_name() {
        let mut writer = JsonWriter::new();
        writer.start_object().unwrap();
        assert!(matches!(
            writer.write_value(json!(1)),
            Err(SerializeError::Writer { .. })
        ));
    }

    #[test]
    fn rejects_unbalanced_containers() {
        let mut writer = JsonWriter::new();
        writer.start_object().unwrap();
        assert!(writer.end_array().is_err());

        let mut writer = JsonWriter::new();
        writer.start_array().unwrap();
        assert!(writer.finish().is_err());
    }
}
