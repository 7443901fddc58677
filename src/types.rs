//! Core types shared across the affordance model and the serializer.

use serde::{Deserialize, Serialize};

/// Vocabulary used when nothing else declares one.
pub const DEFAULT_VOCAB: &str = "http://schema.org/";

/// Hydra core vocabulary.
pub const HYDRA_VOCAB: &str = "http://www.w3.org/ns/hydra/core#";

/// JSON-LD keywords written by the serializer.
pub const AT_CONTEXT: &str = "@context";
pub const AT_VOCAB: &str = "@vocab";
pub const AT_TYPE: &str = "@type";
pub const AT_ID: &str = "@id";
pub const AT_REVERSE: &str = "@reverse";

/// HTTP method of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Parse a method name, case-insensitively.
    ///
    /// Returns `None` for unknown methods.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Whether requests with this method can carry a body.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an affordance targets a single resource or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    Collection,
}

/// Declared type of an input parameter or writable property.
///
/// Written as a string: `string`, `integer`, `number`, `boolean`, `any`, a
/// registry type or enum name, or any of those followed by `[]` for a
/// collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Any,
    /// A type or enum described in the registry.
    Named(String),
    Collection(Box<ValueType>),
}

impl ValueType {
    /// Parse a type expression.
    ///
    /// Returns `None` for an empty expression.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(inner) = s.strip_suffix("[]") {
            return ValueType::parse(inner).map(|t| ValueType::Collection(Box::new(t)));
        }
        match s {
            "" => None,
            "string" => Some(ValueType::String),
            "integer" => Some(ValueType::Integer),
            "number" => Some(ValueType::Number),
            "boolean" => Some(ValueType::Boolean),
            "any" => Some(ValueType::Any),
            name => Some(ValueType::Named(name.to_string())),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        ValueType::Named(name.into())
    }

    pub fn collection_of(element: ValueType) -> Self {
        ValueType::Collection(Box::new(element))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, ValueType::Collection(_))
    }

    /// Element type for collections, the type itself otherwise.
    pub fn element(&self) -> &ValueType {
        match self {
            ValueType::Collection(inner) => inner.element(),
            other => other,
        }
    }

    /// Registry name of the (element) type, if it is a named type.
    pub fn type_name(&self) -> Option<&str> {
        match self.element() {
            ValueType::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::String => f.write_str("string"),
            ValueType::Integer => f.write_str("integer"),
            ValueType::Number => f.write_str("number"),
            ValueType::Boolean => f.write_str("boolean"),
            ValueType::Any => f.write_str("any"),
            ValueType::Named(name) => f.write_str(name),
            ValueType::Collection(inner) => write!(f, "{}[]", inner),
        }
    }
}

impl TryFrom<String> for ValueType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ValueType::parse(&value).ok_or_else(|| "empty type expression".to_string())
    }
}

impl From<ValueType> for String {
    fn from(value: ValueType) -> Self {
        value.to_string()
    }
}
