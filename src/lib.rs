//! Hydra Affordance
//!
//! Hypermedia affordances for JSON-LD/Hydra documents.
//!
//! An [`Affordance`] is a link plus the actions its target supports: HTTP
//! method, URI parameters, request headers and a request body described
//! through a [`Registry`]. Links are [`UriTemplate`]s that can be expanded
//! fully or partially. The serializer writes resource snapshots as Hydra
//! JSON-LD and emits `@context` only where a nested object's vocabulary or
//! terms differ from what its ancestors already declared.
//!
//! # Example
//!
//! ```
//! use hydra_affordance::{
//!     to_value, ActionDescriptor, Affordance, HttpMethod, InputParameter, PropertyValue,
//!     Registry, Resource, SerializeOptions, UriTemplate, ValueType,
//! };
//! use serde_json::json;
//!
//! let find_events = ActionDescriptor::new(HttpMethod::Get, "findEvents")
//!     .with_request_param(InputParameter::new("eventName", ValueType::String).optional())
//!     .with_request_param(InputParameter::new("location", ValueType::String));
//! let search = Affordance::new(
//!     UriTemplate::parse("http://example.com/events{?eventName,location}").unwrap(),
//!     vec![find_events],
//!     vec!["search".to_string()],
//! );
//!
//! // Optional variables never show up in the plain link.
//! assert_eq!(search.href(), "http://example.com/events{?location}");
//!
//! let events = Resource::new("EventList")
//!     .with_property("name", PropertyValue::scalar("All events"))
//!     .with_link(search);
//! let document = to_value(&events, &Registry::new(), &SerializeOptions::new()).unwrap();
//! assert_eq!(document["@context"]["@vocab"], json!("http://schema.org/"));
//! assert_eq!(document["search"]["@type"], json!("hydra:IriTemplate"));
//! ```
//!
//! # Template expansion
//!
//! | Variables bound | `expand` | `expand_partially` |
//! |-----------------|----------|--------------------|
//! | all | expanded URI | expanded URI |
//! | some | `TemplateError::Unresolved` | unbound variables kept as template syntax |
//! | none | `TemplateError::Unresolved` | template unchanged |
//!
//! Values are form-encoded, so spaces become `+`.

mod action;
mod affordance;
mod context;
mod error;
mod loader;
mod registry;
mod resource;
mod serializer;
mod terms;
mod types;
mod uri_template;
mod validator;
mod writer;

pub use action::{
    ActionDescriptor, InputConstraints, InputParameter, SupportedProperty, MAX_PROPERTY_DEPTH,
};
pub use affordance::Affordance;
pub use context::{ContextStack, VocabContext};
pub use error::{
    ConstructorResolutionFailure, DescriptorError, LoadError, SchemaError, SerializeError,
    TemplateError, TermError, ValidateError,
};
pub use loader::{
    is_url, load_affordance, load_json, load_json_auto, load_json_str, load_registry,
    load_resource, parse_document,
};
pub use registry::{
    ConstructorParam, EnumConfig, NamespaceConfig, PropertyConfig, Registry, Semantics,
    TermDeclaration, TypeConfig, WritableProperty, WritableShape,
};
pub use resource::{snapshot, Inspect, PropertyValue, Resource};
pub use serializer::{
    operation, serialize, to_value, write_resource, ContextAnnotatedWriter, SerializeOptions,
    DEFAULT_MAX_DEPTH,
};
pub use terms::{camel_case_constant, Resolver};
pub use types::{
    Cardinality, HttpMethod, ValueType, AT_CONTEXT, AT_ID, AT_REVERSE, AT_TYPE, AT_VOCAB,
    DEFAULT_VOCAB, HYDRA_VOCAB,
};
pub use uri_template::{
    TemplateVariable, UriTemplate, UriTemplateComponent, UriTemplateComponents, VariableGroup,
    VariableType,
};
pub use validator::{action_schema, validate_against_schema, validate_request};
pub use writer::{DocumentWriter, JsonWriter};

#[cfg(feature = "remote")]
pub use loader::load_json_url;
