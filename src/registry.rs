//! Semantic configuration registry.
//!
//! Everything the serializer needs to know about vocabularies, terms and
//! exposed names lives here, keyed by type, namespace, enum or property. The
//! registry is plain data: build it in code or load it from JSON once, then
//! share it by reference.
//!
//! ```json
//! {
//!   "namespaces": { "events": { "vocab": "http://schema.org/" } },
//!   "types": {
//!     "Event": {
//!       "namespace": "events",
//!       "terms": [{ "define": "ex", "as": "http://example.com/vocab#" }],
//!       "properties": { "eventStatus": {} }
//!     }
//!   },
//!   "enums": { "EventStatusType": { "constants": ["EVENT_SCHEDULED"] } },
//!   "mixins": { "Event": "EventMixin" }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::InputConstraints;
use crate::types::ValueType;

/// A single term mapping, `define` → `as`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDeclaration {
    pub define: String,
    #[serde(rename = "as")]
    pub as_uri: String,
    /// Emit as `{"@reverse": as}`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reverse: bool,
}

impl TermDeclaration {
    pub fn new(define: impl Into<String>, as_uri: impl Into<String>) -> Self {
        Self {
            define: define.into(),
            as_uri: as_uri.into(),
            reverse: false,
        }
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// Vocabulary and term declarations attached to one element.
///
/// `term` and `terms` are mutually exclusive; the conflict is reported when
/// the element is first resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semantics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<TermDeclaration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<Vec<TermDeclaration>>,
}

/// Per-namespace configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    #[serde(flatten)]
    pub semantics: Semantics,
}

/// Per-property configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyConfig {
    /// URI or CURIE the property name maps to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<String>,
    /// Map the property as a reverse relation of `expose`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reverse: bool,
}

impl PropertyConfig {
    pub fn exposed(uri: impl Into<String>) -> Self {
        Self {
            expose: Some(uri.into()),
            reverse: false,
        }
    }
}

/// A property that can be written when creating or updating a type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritableProperty {
    /// Declared property name.
    pub name: String,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_values: Vec<Value>,
    #[serde(default, flatten)]
    pub constraints: InputConstraints,
}

impl WritableProperty {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            ..Default::default()
        }
    }
}

/// A creator-constructor parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorParam {
    /// Explicit external name. Parameters without one are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_property: Option<String>,
    #[serde(flatten)]
    pub property: WritableProperty,
}

/// How request bodies of a type are constructed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritableShape {
    /// Type can be created empty and filled through setters.
    #[serde(default)]
    pub default_constructor: bool,
    /// Creator constructor parameters, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<Vec<ConstructorParam>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setters: Vec<WritableProperty>,
}

/// Per-type configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Value written as `@type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<String>,
    #[serde(flatten)]
    pub semantics: Semantics,
    /// Property whose value lends its vocabulary and terms to this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_provider: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writable: Option<WritableShape>,
}

/// Per-enum configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumConfig {
    /// All constants, in declaration order.
    #[serde(default)]
    pub constants: Vec<String>,
    /// Constant → exposed URI or term.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expose: BTreeMap<String, String>,
}

/// Registry of semantic configuration for types, namespaces and enums.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceConfig>,
    #[serde(default)]
    pub types: BTreeMap<String, TypeConfig>,
    #[serde(default)]
    pub enums: BTreeMap<String, EnumConfig>,
    /// Type → mixin type whose configuration takes precedence.
    #[serde(default)]
    pub mixins: BTreeMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, name: impl Into<String>, config: TypeConfig) -> Self {
        self.types.insert(name.into(), config);
        self
    }

    pub fn with_namespace(mut self, name: impl Into<String>, config: NamespaceConfig) -> Self {
        self.namespaces.insert(name.into(), config);
        self
    }

    pub fn with_enum(mut self, name: impl Into<String>, config: EnumConfig) -> Self {
        self.enums.insert(name.into(), config);
        self
    }

    pub fn with_mixin(mut self, target: impl Into<String>, mixin: impl Into<String>) -> Self {
        self.mixins.insert(target.into(), mixin.into());
        self
    }

    pub fn type_config(&self, type_name: &str) -> Option<&TypeConfig> {
        self.types.get(type_name)
    }

    /// Configuration of the namespace a type belongs to.
    pub fn namespace_of(&self, type_name: &str) -> Option<(&str, &NamespaceConfig)> {
        let namespace = self.types.get(type_name)?.namespace.as_deref()?;
        self.namespaces
            .get_key_value(namespace)
            .map(|(name, config)| (name.as_str(), config))
    }

    /// Mixin configuration for a type, if one is registered.
    pub fn mixin_for(&self, type_name: &str) -> Option<(&str, &TypeConfig)> {
        let mixin = self.mixins.get(type_name)?;
        self.types
            .get_key_value(mixin)
            .map(|(name, config)| (name.as_str(), config))
    }

    pub fn enum_config(&self, enum_name: &str) -> Option<&EnumConfig> {
        self.enums.get(enum_name)
    }

    /// Property configuration, consulting the mixin first.
    pub fn property_config(&self, type_name: &str, property: &str) -> Option<&PropertyConfig> {
        self.mixin_for(type_name)
            .and_then(|(_, mixin)| mixin.properties.get(property))
            .or_else(|| {
                self.types
                    .get(type_name)
                    .and_then(|t| t.properties.get(property))
            })
    }

    pub fn writable_shape(&self, type_name: &str) -> Option<&WritableShape> {
        self.types.get(type_name)?.writable.as_ref()
    }
}
