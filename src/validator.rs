//! Request payload validation against action descriptors.
//!
//! An action's inputs are turned into a JSON Schema: the request body's
//! supported properties when the action has a body, its URI parameters
//! otherwise. Payloads are then checked with `jsonschema`.

use serde_json::{json, Map, Value};

use crate::action::{ActionDescriptor, InputConstraints, InputParameter, SupportedProperty};
use crate::error::{SchemaError, ValidateError};
use crate::registry::Registry;
use crate::types::ValueType;

/// Build the JSON Schema for an action's input.
pub fn action_schema(descriptor: &ActionDescriptor, registry: &Registry) -> Value {
    match descriptor.request_body() {
        Some(body) if body.declared_type.type_name().is_some() => {
            let properties = descriptor.recurse_supported_properties(registry);
            let element = object_schema(&properties, registry);
            if body.declared_type.is_collection() {
                json!({ "type": "array", "items": element })
            } else {
                element
            }
        }
        Some(body) => parameter_schema(body, registry),
        None => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for param in descriptor.uri_parameters() {
                properties.insert(
                    param.exposed_name().to_string(),
                    parameter_schema(param, registry),
                );
                if param.is_required() {
                    required.push(Value::String(param.exposed_name().to_string()));
                }
            }
            object(properties, required)
        }
    }
}

fn object(properties: Map<String, Value>, required: Vec<Value>) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    Value::Object(schema)
}

fn object_schema(properties: &[SupportedProperty], registry: &Registry) -> Value {
    let mut schema_properties = Map::new();
    let mut required = Vec::new();
    for property in properties {
        schema_properties.insert(property.name.clone(), property_schema(property, registry));
        if property.required {
            required.push(Value::String(property.name.clone()));
        }
    }
    object(schema_properties, required)
}

fn property_schema(property: &SupportedProperty, registry: &Registry) -> Value {
    let mut element = if property.nested.is_empty() {
        type_schema(property.value_type.element(), registry)
    } else {
        object_schema(&property.nested, registry)
    };
    constrain(&mut element, &property.constraints, &property.possible_values);
    if property.multiple {
        json!({ "type": "array", "items": element })
    } else {
        element
    }
}

fn parameter_schema(param: &InputParameter, registry: &Registry) -> Value {
    let mut element = type_schema(param.declared_type.element(), registry);
    constrain(&mut element, &param.constraints, &param.possible_values);
    if param.is_array_or_collection() {
        json!({ "type": "array", "items": element })
    } else {
        element
    }
}

fn type_schema(value_type: &ValueType, registry: &Registry) -> Value {
    match value_type {
        ValueType::String => json!({ "type": "string" }),
        ValueType::Integer => json!({ "type": "integer" }),
        ValueType::Number => json!({ "type": "number" }),
        ValueType::Boolean => json!({ "type": "boolean" }),
        ValueType::Any => json!({}),
        ValueType::Named(name) => match registry.enum_config(name) {
            Some(config) if !config.constants.is_empty() => json!({ "enum": config.constants }),
            _ => json!({ "type": "object" }),
        },
        ValueType::Collection(inner) => {
            json!({ "type": "array", "items": type_schema(inner, registry) })
        }
    }
}

fn constrain(schema: &mut Value, constraints: &InputConstraints, possible_values: &[Value]) {
    let Value::Object(schema) = schema else {
        return;
    };
    if let Some(min) = constraints.min {
        schema.insert("minimum".to_string(), json!(min));
    }
    if let Some(max) = constraints.max {
        schema.insert("maximum".to_string(), json!(max));
    }
    if let Some(min_length) = constraints.min_length {
        schema.insert("minLength".to_string(), json!(min_length));
    }
    if let Some(max_length) = constraints.max_length {
        schema.insert("maxLength".to_string(), json!(max_length));
    }
    if let Some(pattern) = &constraints.pattern {
        schema.insert("pattern".to_string(), json!(pattern));
    }
    if let Some(step) = constraints.step.filter(|s| *s > 0.0) {
        schema.insert("multipleOf".to_string(), json!(step));
    }
    if constraints.read_only {
        schema.insert("readOnly".to_string(), json!(true));
    }
    if !possible_values.is_empty() {
        schema.insert("enum".to_string(), Value::Array(possible_values.to_vec()));
    }
}

/// Validate a request payload against an action.
///
/// # Errors
///
/// Returns `ValidateError::Schema` if the derived schema cannot be compiled,
/// or `ValidateError::Invalid` if the payload doesn't match it.
pub fn validate_request(
    descriptor: &ActionDescriptor,
    registry: &Registry,
    payload: &Value,
) -> Result<(), ValidateError> {
    let schema = action_schema(descriptor, registry);
    tracing::debug!(action = descriptor.action_name(), "validating request payload");
    validate_against_schema(&schema, payload)
}

/// Validate a payload against an already derived schema.
///
/// Use this when validating multiple payloads against one action.
pub fn validate_against_schema(schema: &Value, payload: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| ValidateError::Schema {
        message: e.to_string(),
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}
