//! Action descriptors: what a client can send to an affordance's target.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConstructorResolutionFailure, DescriptorError};
use crate::registry::{Registry, WritableProperty};
use crate::types::{Cardinality, HttpMethod, ValueType};

/// Maximum nesting of request-body types described by
/// [`ActionDescriptor::recurse_supported_properties`].
pub const MAX_PROPERTY_DEPTH: usize = 16;

/// Constraints on an input value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

impl InputConstraints {
    pub fn is_empty(&self) -> bool {
        *self == InputConstraints::default()
    }
}

/// One input of an action: a path variable, request param, header or body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub declared_type: ValueType,
    /// Current value, e.g. taken from the link that produced the affordance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Optional query or path slot.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    /// Semantic name the input is exposed as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<String>,
    /// Enumerable domain; empty if unconstrained.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_values: Vec<Value>,
    #[serde(default, flatten)]
    pub constraints: InputConstraints,
}

impl InputParameter {
    pub fn new(name: impl Into<String>, declared_type: ValueType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            value: None,
            default_value: None,
            optional: false,
            expose: None,
            possible_values: Vec::new(),
            constraints: InputConstraints::default(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn exposed_as(mut self, name: impl Into<String>) -> Self {
        self.expose = Some(name.into());
        self
    }

    pub fn with_possible_values(mut self, values: Vec<Value>) -> Self {
        self.possible_values = values;
        self
    }

    pub fn with_constraints(mut self, constraints: InputConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Required unless optional or defaulted.
    pub fn is_required(&self) -> bool {
        !self.optional && self.default_value.is_none()
    }

    pub fn is_array_or_collection(&self) -> bool {
        self.declared_type.is_collection()
    }

    /// Whether a non-null current value is present.
    pub fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_null())
    }

    /// Name used in documents: the exposure if set, the declared name otherwise.
    pub fn exposed_name(&self) -> &str {
        self.expose.as_deref().unwrap_or(&self.name)
    }
}

/// One writable property of a request body, as described to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedProperty {
    /// Exposed name.
    pub name: String,
    /// Declared property name.
    pub property: String,
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    pub required: bool,
    /// Collection of values (or of nested objects).
    pub multiple: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub possible_values: Vec<Value>,
    #[serde(skip_serializing_if = "InputConstraints::is_empty")]
    pub constraints: InputConstraints,
    /// Properties of a nested described type.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<SupportedProperty>,
}

/// What one HTTP method at an affordance's target accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawActionDescriptor")]
pub struct ActionDescriptor {
    #[serde(rename = "method")]
    http_method: HttpMethod,
    #[serde(rename = "name")]
    action_name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    semantic_action_type: Option<String>,
    cardinality: Cardinality,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    path_variables: Vec<InputParameter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    request_params: Vec<InputParameter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    request_headers: Vec<InputParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_body: Option<InputParameter>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActionDescriptor {
    #[serde(default)]
    method: HttpMethod,
    name: String,
    #[serde(rename = "type", default)]
    semantic_action_type: Option<String>,
    #[serde(default)]
    cardinality: Cardinality,
    #[serde(default)]
    path_variables: Vec<InputParameter>,
    #[serde(default)]
    request_params: Vec<InputParameter>,
    #[serde(default)]
    request_headers: Vec<InputParameter>,
    #[serde(default)]
    request_body: Option<InputParameter>,
}

impl TryFrom<RawActionDescriptor> for ActionDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawActionDescriptor) -> Result<Self, Self::Error> {
        let mut descriptor = ActionDescriptor::new(raw.method, raw.name);
        descriptor.semantic_action_type = raw.semantic_action_type;
        descriptor.cardinality = raw.cardinality;
        for param in raw.path_variables {
            descriptor = descriptor.with_path_variable(param);
        }
        for param in raw.request_params {
            descriptor = descriptor.with_request_param(param);
        }
        for param in raw.request_headers {
            descriptor = descriptor.with_request_header(param);
        }
        match raw.request_body {
            Some(body) => descriptor.with_request_body(body),
            None => Ok(descriptor),
        }
    }
}

/// Insert or replace by name, keeping the first position.
fn upsert(params: &mut Vec<InputParameter>, param: InputParameter) {
    match params.iter_mut().find(|p| p.name == param.name) {
        Some(existing) => *existing = param,
        None => params.push(param),
    }
}

impl ActionDescriptor {
    pub fn new(http_method: HttpMethod, action_name: impl Into<String>) -> Self {
        Self {
            http_method,
            action_name: action_name.into(),
            semantic_action_type: None,
            cardinality: Cardinality::Single,
            path_variables: Vec::new(),
            request_params: Vec::new(),
            request_headers: Vec::new(),
            request_body: None,
        }
    }

    pub fn with_semantic_action_type(mut self, action_type: impl Into<String>) -> Self {
        self.semantic_action_type = Some(action_type.into());
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_path_variable(mut self, param: InputParameter) -> Self {
        upsert(&mut self.path_variables, param);
        self
    }

    pub fn with_request_param(mut self, param: InputParameter) -> Self {
        upsert(&mut self.request_params, param);
        self
    }

    pub fn with_request_header(mut self, param: InputParameter) -> Self {
        upsert(&mut self.request_headers, param);
        self
    }

    /// Attach a request body.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::BodyNotAllowed` for methods without a body,
    /// such as GET.
    pub fn with_request_body(mut self, param: InputParameter) -> Result<Self, DescriptorError> {
        if !self.http_method.allows_body() {
            return Err(DescriptorError::BodyNotAllowed {
                action: self.action_name,
                method: self.http_method.to_string(),
            });
        }
        self.request_body = Some(param);
        Ok(self)
    }

    pub fn http_method(&self) -> HttpMethod {
        self.http_method
    }

    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    pub fn semantic_action_type(&self) -> Option<&str> {
        self.semantic_action_type.as_deref()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn path_variables(&self) -> &[InputParameter] {
        &self.path_variables
    }

    pub fn request_params(&self) -> &[InputParameter] {
        &self.request_params
    }

    pub fn request_headers(&self) -> &[InputParameter] {
        &self.request_headers
    }

    pub fn request_body(&self) -> Option<&InputParameter> {
        self.request_body.as_ref()
    }

    /// Look up a path variable, request param or header by name.
    pub fn input_parameter(&self, name: &str) -> Option<&InputParameter> {
        self.path_variables
            .iter()
            .chain(&self.request_params)
            .chain(&self.request_headers)
            .find(|p| p.name == name)
    }

    /// Path variables and request params, the inputs that appear in a URI.
    pub fn uri_parameters(&self) -> impl Iterator<Item = &InputParameter> {
        self.path_variables.iter().chain(&self.request_params)
    }

    /// Names of required URI parameters.
    pub fn required_parameter_names(&self) -> Vec<&str> {
        self.uri_parameters()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Describe the request body's writable properties.
    ///
    /// The body's declared type is looked up in the registry. Explicitly
    /// named creator-constructor parameters come first, then setters not
    /// already covered. Nested described types are walked recursively; a type
    /// already on the current path is not entered again.
    pub fn recurse_supported_properties(&self, registry: &Registry) -> Vec<SupportedProperty> {
        let Some(body) = &self.request_body else {
            return Vec::new();
        };
        let Some(type_name) = body.declared_type.type_name() else {
            return Vec::new();
        };
        let sample = body.value.as_ref().map(|v| match v {
            Value::Array(items) => items.first().unwrap_or(v),
            other => other,
        });

        let mut path = Vec::new();
        match describe_type(registry, type_name, sample, &mut path) {
            Ok(properties) => properties,
            Err(failure) => {
                tracing::warn!(
                    action = %self.action_name,
                    "{}; request body left undescribed",
                    failure
                );
                Vec::new()
            }
        }
    }
}

fn describe_type<'r>(
    registry: &'r Registry,
    type_name: &'r str,
    sample: Option<&Value>,
    path: &mut Vec<&'r str>,
) -> Result<Vec<SupportedProperty>, ConstructorResolutionFailure> {
    let Some(shape) = registry.writable_shape(type_name) else {
        return Ok(Vec::new());
    };
    if path.contains(&type_name) || path.len() >= MAX_PROPERTY_DEPTH {
        tracing::debug!(type_name, depth = path.len(), "not re-entering described type");
        return Ok(Vec::new());
    }
    if shape.constructor.is_none() && !shape.default_constructor {
        return Err(ConstructorResolutionFailure {
            type_name: type_name.to_string(),
        });
    }

    path.push(type_name);
    let mut properties = Vec::new();
    let mut covered: HashSet<&str> = HashSet::new();

    for param in shape.constructor.iter().flatten() {
        let Some(external) = param.json_property.as_deref() else {
            tracing::warn!(
                type_name,
                parameter = %param.property.name,
                "constructor parameter has no explicit name, skipping"
            );
            continue;
        };
        covered.insert(external);
        if let Some(property) = describe_property(registry, external, &param.property, sample, path)
        {
            properties.push(property);
        }
    }

    for setter in &shape.setters {
        if covered.contains(setter.name.as_str()) {
            continue;
        }
        if let Some(property) = describe_property(registry, &setter.name, setter, sample, path) {
            properties.push(property);
        }
    }

    path.pop();
    Ok(properties)
}

fn describe_property<'r>(
    registry: &'r Registry,
    name: &str,
    property: &'r WritableProperty,
    sample: Option<&Value>,
    path: &mut Vec<&'r str>,
) -> Option<SupportedProperty> {
    let current = sample
        .and_then(|s| s.get(name))
        .filter(|v| !v.is_null());
    let multiple = property.value_type.is_collection();

    let mut nested = Vec::new();
    let mut possible_values = property.possible_values.clone();
    if let Some(type_name) = property.value_type.type_name() {
        if registry.writable_shape(type_name).is_some() {
            let nested_sample = match current {
                Some(Value::Array(items)) => items.first(),
                other => other,
            };
            match describe_type(registry, type_name, nested_sample, path) {
                Ok(found) => nested = found,
                Err(failure) => {
                    tracing::warn!(property = name, "{}; skipping property", failure);
                    return None;
                }
            }
        } else if let Some(enum_config) = registry.enum_config(type_name) {
            if possible_values.is_empty() {
                possible_values = enum_config
                    .constants
                    .iter()
                    .map(|c| Value::String(c.clone()))
                    .collect();
            }
        }
    }

    Some(SupportedProperty {
        name: property.expose.clone().unwrap_or_else(|| name.to_string()),
        property: name.to_string(),
        value_type: property.value_type.clone(),
        default_value: if nested.is_empty() {
            current.cloned()
        } else {
            None
        },
        required: property.required,
        multiple,
        possible_values,
        constraints: property.constraints.clone(),
        nested,
    })
}
