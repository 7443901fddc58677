//! Object model snapshots handed to the serializer.
//!
//! Hosts describe their objects as [`Resource`] trees, either directly or by
//! implementing [`Inspect`]. Resources own their children, so a snapshot can
//! never contain a cycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::affordance::Affordance;
use crate::error::SerializeError;

/// Value of a resource property.
///
/// In JSON, nested resources are written as `{"resource": {...}}`, enum
/// constants as `{"enum": "Type", "value": "CONSTANT"}` and maps as
/// `{"map": {...}}`. Arrays become collections; anything else is a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    // Tried first: derived struct variants would also accept arrays.
    Collection(Vec<PropertyValue>),
    Enum {
        #[serde(rename = "enum")]
        enum_type: String,
        value: String,
    },
    Resource {
        resource: Box<Resource>,
    },
    Map {
        #[serde(with = "ordered_properties")]
        map: Vec<(String, PropertyValue)>,
    },
    Scalar(Value),
}

impl PropertyValue {
    pub fn enum_constant(enum_type: impl Into<String>, value: impl Into<String>) -> Self {
        PropertyValue::Enum {
            enum_type: enum_type.into(),
            value: value.into(),
        }
    }

    pub fn resource(resource: Resource) -> Self {
        PropertyValue::Resource {
            resource: Box::new(resource),
        }
    }

    pub fn scalar(value: impl Into<Value>) -> Self {
        PropertyValue::Scalar(value.into())
    }

    /// First resource reachable by iteration order: the value itself, the
    /// first collection element or the first map value.
    pub fn first_resource(&self) -> Option<&Resource> {
        match self {
            PropertyValue::Resource { resource } => Some(resource),
            PropertyValue::Collection(items) => items.first()?.first_resource(),
            PropertyValue::Map { map } => map.first()?.1.first_resource(),
            _ => None,
        }
    }
}

/// Snapshot of one object: its type, its properties and its links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "ordered_properties")]
    pub properties: Vec<(String, PropertyValue)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Affordance>,
}

impl Resource {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Add or replace a property, keeping its first position.
    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        let name = name.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.properties.push((name, value)),
        }
        self
    }

    pub fn with_link(mut self, link: Affordance) -> Self {
        self.links.push(link);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Links carrying the given relation.
    pub fn links_with_rel<'a>(&'a self, rel: &'a str) -> impl Iterator<Item = &'a Affordance> {
        self.links.iter().filter(move |l| l.has_rel(rel))
    }
}

/// Produces resource snapshots from host objects.
pub trait Inspect {
    /// Human-readable identification of the object for diagnostics.
    fn describe(&self) -> String;

    /// Snapshot the object's type, properties and links.
    fn inspect(&self) -> Result<Resource, Box<dyn std::error::Error + Send + Sync>>;
}

impl Inspect for Resource {
    fn describe(&self) -> String {
        self.type_name.clone()
    }

    fn inspect(&self) -> Result<Resource, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.clone())
    }
}

/// Run an inspector, wrapping failures with the offending object.
pub fn snapshot<T: Inspect + ?Sized>(object: &T) -> Result<Resource, SerializeError> {
    object
        .inspect()
        .map_err(|e| SerializeError::SerializationFailure {
            object: object.describe(),
            message: e.to_string(),
        })
}

/// Ordered `name → value` pairs written as a JSON object.
mod ordered_properties {
    use super::PropertyValue;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        pairs: &[(String, PropertyValue)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(pairs.len()))?;
        for (name, value) in pairs {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, PropertyValue)>, D::Error> {
        struct PairsVisitor;

        impl<'de> Visitor<'de> for PairsVisitor {
            type Value = Vec<(String, PropertyValue)>;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an object of properties")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs: Vec<(String, PropertyValue)> = Vec::new();
                while let Some((name, value)) = access.next_entry::<String, PropertyValue>()? {
                    match pairs.iter_mut().find(|(n, _)| *n == name) {
                        Some((_, existing)) => *existing = value,
                        None => pairs.push((name, value)),
                    }
                }
                Ok(pairs)
            }
        }

        deserializer.deserialize_map(PairsVisitor)
    }
}
