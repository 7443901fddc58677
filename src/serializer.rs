//! Hydra JSON-LD rendering of resource snapshots.
//!
//! [`ContextAnnotatedWriter`] decorates any [`DocumentWriter`]: every object
//! written through [`write_object`](ContextAnnotatedWriter::write_object)
//! gets `@context` (only when its parent chain does not already provide it)
//! and `@type`. The functions in this module use it to write properties,
//! links and operations.
//!
//! Links are written under their relation type. A link without unbound
//! variables becomes `{"@id": href}` with its operations; a templated link
//! becomes a `hydra:IriTemplate`. The `self` link provides the object's own
//! `@id` (when no required input is missing) and `hydra:operation`s.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::action::{ActionDescriptor, SupportedProperty};
use crate::affordance::Affordance;
use crate::context::{ContextStack, VocabContext};
use crate::error::SerializeError;
use crate::registry::Registry;
use crate::resource::{snapshot, Inspect, PropertyValue, Resource};
use crate::terms::Resolver;
use crate::types::{Cardinality, AT_CONTEXT, AT_ID, AT_TYPE, AT_VOCAB, HYDRA_VOCAB};
use crate::uri_template::{UriTemplate, VariableType};
use crate::writer::{DocumentWriter, JsonWriter};

pub const DEFAULT_MAX_DEPTH: usize = 32;

const SELF_REL: &str = "self";

/// Options for serialization.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Maximum object nesting depth.
    pub max_depth: usize,
    /// Declare the `hydra` prefix in the root context.
    pub hydra_prefix: bool,
    /// Write `hydra:operation` entries for link actions.
    pub emit_operations: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            hydra_prefix: true,
            emit_operations: true,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Without the prefix, callers must make `hydra:` resolvable themselves.
    pub fn hydra_prefix(mut self, hydra_prefix: bool) -> Self {
        self.hydra_prefix = hydra_prefix;
        self
    }

    pub fn emit_operations(mut self, emit_operations: bool) -> Self {
        self.emit_operations = emit_operations;
        self
    }
}

/// Document writer decorator that maintains JSON-LD context inheritance.
///
/// Owns the [`ContextStack`] of one serialization; create one per call.
pub struct ContextAnnotatedWriter<'r, W> {
    inner: W,
    resolver: Resolver<'r>,
    stack: ContextStack,
    options: SerializeOptions,
}

impl<'r, W: DocumentWriter> ContextAnnotatedWriter<'r, W> {
    pub fn new(inner: W, registry: &'r Registry, options: SerializeOptions) -> Self {
        Self {
            inner,
            resolver: Resolver::new(registry),
            stack: ContextStack::new(),
            options,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn resolver(&self) -> Resolver<'r> {
        self.resolver
    }

    pub fn options(&self) -> &SerializeOptions {
        &self.options
    }

    /// Number of objects currently open.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Write one object: `@context` if needed, `@type`, then `body`.
    ///
    /// The object's context is pushed before `body` runs and popped
    /// afterwards, also when `body` fails.
    ///
    /// # Errors
    ///
    /// Returns `SerializeError::MaxDepthExceeded` when nesting exceeds the
    /// configured depth, `SerializeError::Term` for inconsistent term
    /// declarations, and any error from `body` or the underlying writer.
    pub fn write_object<F>(&mut self, resource: &Resource, body: F) -> Result<(), SerializeError>
    where
        F: FnOnce(&mut Self) -> Result<(), SerializeError>,
    {
        if self.stack.depth() >= self.options.max_depth {
            return Err(SerializeError::MaxDepthExceeded {
                max_depth: self.options.max_depth,
                type_name: resource.type_name.clone(),
            });
        }

        let vocab = self.resolver.resolve_vocab(resource);
        let mut terms = self.resolver.resolve_terms(resource)?;
        if self.stack.is_empty() && self.options.hydra_prefix {
            let mut with_hydra = Map::new();
            with_hydra.insert("hydra".to_string(), Value::String(HYDRA_VOCAB.to_string()));
            with_hydra.extend(terms);
            terms = with_hydra;
        }

        let parent = self.stack.top();
        let must_emit = self
            .stack
            .push(VocabContext::new(parent.clone(), Some(vocab), terms));
        debug!(
            type_name = %resource.type_name,
            depth = self.stack.depth(),
            must_emit,
            "writing object"
        );

        let result = self.write_annotated(resource, must_emit, parent.as_deref(), body);
        self.stack.pop();
        result
    }

    fn write_annotated<F>(
        &mut self,
        resource: &Resource,
        must_emit: bool,
        parent: Option<&VocabContext>,
        body: F,
    ) -> Result<(), SerializeError>
    where
        F: FnOnce(&mut Self) -> Result<(), SerializeError>,
    {
        self.inner.start_object()?;
        if must_emit {
            if let Some(current) = self.stack.top() {
                self.write_context(&current, parent)?;
            }
        }
        let type_value = self.resolver.resolve_type(resource);
        self.inner.write_field(AT_TYPE, Value::String(type_value))?;
        body(self)?;
        self.inner.end_object()
    }

    fn write_context(
        &mut self,
        context: &VocabContext,
        parent: Option<&VocabContext>,
    ) -> Result<(), SerializeError> {
        self.inner.write_field_name(AT_CONTEXT)?;
        self.inner.start_object()?;
        let inherited = parent.and_then(VocabContext::effective_vocab);
        if let Some(vocab) = context.vocab() {
            if inherited != Some(vocab) {
                self.inner
                    .write_field(AT_VOCAB, Value::String(vocab.to_string()))?;
            }
        }
        for (term, value) in context.terms() {
            self.inner.write_field(term, value.clone())?;
        }
        self.inner.end_object()
    }
}

/// Inspect `object` and write it through `writer`.
///
/// # Errors
///
/// Returns `SerializeError` if inspection, term resolution or writing fails.
pub fn serialize<T, W>(
    object: &T,
    writer: W,
    registry: &Registry,
    options: &SerializeOptions,
) -> Result<W, SerializeError>
where
    T: Inspect + ?Sized,
    W: DocumentWriter,
{
    let resource = snapshot(object)?;
    let mut annotated = ContextAnnotatedWriter::new(writer, registry, options.clone());
    write_resource(&mut annotated, &resource)?;
    Ok(annotated.into_inner())
}

/// Serialize into a `serde_json::Value`.
pub fn to_value<T: Inspect + ?Sized>(
    object: &T,
    registry: &Registry,
    options: &SerializeOptions,
) -> Result<Value, SerializeError> {
    serialize(object, JsonWriter::new(), registry, options)?.finish()
}

/// Write a resource with its properties and links.
pub fn write_resource<W: DocumentWriter>(
    w: &mut ContextAnnotatedWriter<'_, W>,
    resource: &Resource,
) -> Result<(), SerializeError> {
    w.write_object(resource, |w| {
        let self_link = resource.links_with_rel(SELF_REL).next();
        if let Some(link) = self_link.filter(|l| is_identifiable(l)) {
            w.writer()
                .write_field(AT_ID, Value::String(link.href().to_string()))?;
        }

        for (name, value) in &resource.properties {
            if matches!(value, PropertyValue::Scalar(Value::Null)) {
                continue;
            }
            w.writer().write_field_name(name)?;
            write_property_value(w, value)?;
        }

        write_links(w, resource)?;

        if let Some(link) = self_link {
            write_operations(w, link.action_descriptors())?;
        }
        Ok(())
    })
}

fn write_property_value<W: DocumentWriter>(
    w: &mut ContextAnnotatedWriter<'_, W>,
    value: &PropertyValue,
) -> Result<(), SerializeError> {
    match value {
        PropertyValue::Scalar(v) => w.writer().write_value(v.clone()),
        // The constant name is a term mapped in the context.
        PropertyValue::Enum { value, .. } => w.writer().write_value(Value::String(value.clone())),
        PropertyValue::Resource { resource } => write_resource(w, resource),
        PropertyValue::Collection(items) => {
            w.writer().start_array()?;
            for item in items {
                write_property_value(w, item)?;
            }
            w.writer().end_array()
        }
        PropertyValue::Map { map } => {
            w.writer().start_object()?;
            for (key, item) in map {
                w.writer().write_field_name(key)?;
                write_property_value(w, item)?;
            }
            w.writer().end_object()
        }
    }
}

/// Whether a link can stand for its target's `@id`.
fn is_identifiable(link: &Affordance) -> bool {
    !link.has_unsatisfied_required_variables()
        && UriTemplate::parse(link.href())
            .map(|t| t.variables().next().is_none())
            .unwrap_or(false)
}

fn write_links<W: DocumentWriter>(
    w: &mut ContextAnnotatedWriter<'_, W>,
    resource: &Resource,
) -> Result<(), SerializeError> {
    let mut groups: Vec<(&str, Vec<&Affordance>)> = Vec::new();
    for link in &resource.links {
        for rel in link.rels() {
            if rel == SELF_REL {
                continue;
            }
            if resource.property(rel).is_some() {
                warn!(rel = %rel, type_name = %resource.type_name, "link relation shadowed by property");
                continue;
            }
            match groups.iter_mut().find(|(r, _)| r == rel) {
                Some((_, links)) => links.push(link),
                None => groups.push((rel.as_str(), vec![link])),
            }
        }
    }

    for (rel, links) in groups {
        w.writer().write_field_name(rel)?;
        if let [link] = links.as_slice() {
            write_link(w, link)?;
        } else {
            w.writer().start_array()?;
            for link in links {
                write_link(w, link)?;
            }
            w.writer().end_array()?;
        }
    }
    Ok(())
}

fn write_link<W: DocumentWriter>(
    w: &mut ContextAnnotatedWriter<'_, W>,
    link: &Affordance,
) -> Result<(), SerializeError> {
    if link.is_templated() || !is_identifiable(link) {
        return write_iri_template(w, link);
    }

    w.writer().start_object()?;
    w.writer()
        .write_field(AT_ID, Value::String(link.href().to_string()))?;
    if link.cardinality() == Cardinality::Collection {
        w.writer().write_field(AT_TYPE, json!("hydra:Collection"))?;
    }
    if let Some(title) = link.title() {
        w.writer().write_field("hydra:title", json!(title))?;
    }
    if let Some(holder) = link.collection_holder() {
        let property = link.rel().unwrap_or_default();
        w.writer().write_field(
            "hydra:manages",
            json!({ "hydra:subject": holder, "hydra:property": property }),
        )?;
    }
    write_operations(w, link.action_descriptors())?;
    w.writer().end_object()
}

fn write_iri_template<W: DocumentWriter>(
    w: &mut ContextAnnotatedWriter<'_, W>,
    link: &Affordance,
) -> Result<(), SerializeError> {
    let template = link.uri_template();
    let mut mappings = Vec::new();
    for variable in template.variables().filter(|v| !template.is_bound(&v.name)) {
        let param = link
            .action_descriptors()
            .iter()
            .find_map(|d| d.input_parameter(&variable.name));
        let required = match param {
            Some(param) => param.is_required() && !param.has_value(),
            None => matches!(
                variable.var_type,
                VariableType::PathVariable | VariableType::Segment
            ),
        };
        let property = param.map_or(variable.name.as_str(), |p| p.exposed_name());
        mappings.push(json!({
            "@type": "hydra:IriTemplateMapping",
            "hydra:variable": variable.name,
            "hydra:property": property,
            "hydra:required": required,
        }));
    }

    w.writer().start_object()?;
    w.writer().write_field(AT_TYPE, json!("hydra:IriTemplate"))?;
    w.writer().write_field(
        "hydra:template",
        Value::String(link.uri_template_components().to_string()),
    )?;
    w.writer().write_field(
        "hydra:variableRepresentation",
        json!("hydra:BasicRepresentation"),
    )?;
    w.writer().write_field("hydra:mapping", Value::Array(mappings))?;
    w.writer().end_object()
}

fn write_operations<W: DocumentWriter>(
    w: &mut ContextAnnotatedWriter<'_, W>,
    descriptors: &[ActionDescriptor],
) -> Result<(), SerializeError> {
    if descriptors.is_empty() || !w.options().emit_operations {
        return Ok(());
    }
    let resolver = w.resolver();
    let operations = descriptors
        .iter()
        .map(|d| operation(d, resolver))
        .collect();
    w.writer()
        .write_field("hydra:operation", Value::Array(operations))
}

/// One `hydra:operation` entry.
pub fn operation(descriptor: &ActionDescriptor, resolver: Resolver<'_>) -> Value {
    let mut op = Map::new();
    op.insert(
        AT_TYPE.to_string(),
        json!(descriptor.semantic_action_type().unwrap_or("hydra:Operation")),
    );
    op.insert("hydra:method".to_string(), json!(descriptor.http_method().as_str()));
    op.insert("hydra:title".to_string(), json!(descriptor.action_name()));

    if let Some(body) = descriptor.request_body() {
        let class = body
            .declared_type
            .type_name()
            .map_or_else(|| "hydra:Class".to_string(), |name| resolver.exposed_type(name));
        let properties: Vec<Value> = descriptor
            .recurse_supported_properties(resolver.registry())
            .iter()
            .map(|p| supported_property(p, resolver))
            .collect();
        op.insert(
            "hydra:expects".to_string(),
            json!({ "@type": class, "hydra:supportedProperty": properties }),
        );
    }
    Value::Object(op)
}

fn supported_property(property: &SupportedProperty, resolver: Resolver<'_>) -> Value {
    let mut entry = Map::new();
    entry.insert(AT_TYPE.to_string(), json!("hydra:SupportedProperty"));
    entry.insert("hydra:property".to_string(), json!(property.name));
    entry.insert("hydra:required".to_string(), json!(property.required));

    let c = &property.constraints;
    if c.read_only {
        entry.insert("hydra:readonly".to_string(), json!(true));
    }
    if property.multiple {
        entry.insert("multipleValues".to_string(), json!(true));
    }
    if let Some(default) = &property.default_value {
        entry.insert("defaultValue".to_string(), default.clone());
    }
    if let Some(pattern) = &c.pattern {
        entry.insert("valuePattern".to_string(), json!(pattern));
    }
    if let Some(min) = c.min {
        entry.insert("minValue".to_string(), json!(min));
    }
    if let Some(max) = c.max {
        entry.insert("maxValue".to_string(), json!(max));
    }
    if let Some(min_length) = c.min_length {
        entry.insert("valueMinLength".to_string(), json!(min_length));
    }
    if let Some(max_length) = c.max_length {
        entry.insert("valueMaxLength".to_string(), json!(max_length));
    }
    if let Some(step) = c.step {
        entry.insert("stepValue".to_string(), json!(step));
    }
    if !property.possible_values.is_empty() {
        entry.insert(
            "hydra:possibleValue".to_string(),
            Value::Array(property.possible_values.clone()),
        );
    }
    if !property.nested.is_empty() {
        let class = property
            .value_type
            .type_name()
            .map_or_else(|| "hydra:Class".to_string(), |name| resolver.exposed_type(name));
        let nested: Vec<Value> = property
            .nested
            .iter()
            .map(|p| supported_property(p, resolver))
            .collect();
        entry.insert(
            "rangeIncludes".to_string(),
            json!({ "@type": class, "hydra:supportedProperty": nested }),
        );
    }
    Value::Object(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::InputParameter;
    use crate::types::{HttpMethod, ValueType};
    use serde_json::json;

    const V1: &str = "http://schema.org/";

    fn registry(value: Value) -> Registry {
        serde_json::from_value(value).unwrap()
    }

    fn common_registry() -> Registry {
        registry(json!({
            "types": {
                "Parent": { "terms": [{ "define": "common", "as": "http://example.com/common#" }] },
                "Child": { "terms": [{ "define": "common", "as": "http://example.com/common#" }] },
                "Extended": {
                    "terms": [
                        { "define": "common", "as": "http://example.com/common#" },
                        { "define": "extra", "as": "http://example.com/extra#" }
                    ]
                }
            }
        }))
    }

    fn render(resource: &Resource, registry: &Registry) -> Value {
        to_value(resource, registry, &SerializeOptions::new()).unwrap()
    }

    #[test]
    fn root_declares_vocab_terms_and_hydra() {
        let reg = common_registry();
        let value = render(&Resource::new("Parent"), &reg);
        assert_eq!(
            value,
            json!({
                "@context": {
                    "@vocab": V1,
                    "hydra": HYDRA_VOCAB,
                    "common": "http://example.com/common#"
                },
                "@type": "Parent"
            })
        );
    }

    #[test]
    fn child_with_identical_context_is_not_annotated() {
        let reg = common_registry();
        let parent = Resource::new("Parent")
            .with_property("child", PropertyValue::resource(Resource::new("Child")));
        let value = render(&parent, &reg);
        assert_eq!(value["child"], json!({"@type": "Child"}));
    }

    #[test]
    fn child_with_extra_term_emits_full_term_set() {
        let reg = common_registry();
        let parent = Resource::new("Parent")
            .with_property("child", PropertyValue::resource(Resource::new("Extended")));
        let value = render(&parent, &reg);
        assert_eq!(
            value["child"]["@context"],
            json!({
                "common": "http://example.com/common#",
                "extra": "http://example.com/extra#"
            })
        );
    }

    #[test]
    fn changed_vocab_is_written() {
        let reg = registry(json!({
            "types": { "Product": { "vocab": "http://purl.org/goodrelations/v1#" } }
        }));
        let offer = Resource::new("Offer")
            .with_property("itemOffered", PropertyValue::resource(Resource::new("Product")));
        let value = render(&offer, &reg);
        assert_eq!(
            value["itemOffered"]["@context"],
            json!({"@vocab": "http://purl.org/goodrelations/v1#"})
        );
    }

    #[test]
    fn enum_constant_written_as_term() {
        let reg = Registry::new();
        let event = Resource::new("Event").with_property(
            "eventStatus",
            PropertyValue::enum_constant("EventStatusType", "EVENT_CANCELLED"),
        );
        let value = render(&event, &reg);
        assert_eq!(value["@context"]["EVENT_CANCELLED"], json!("EventCancelled"));
        assert_eq!(value["@context"]["eventStatus"], json!({"@type": "@vocab"}));
        assert_eq!(value["eventStatus"], json!("EVENT_CANCELLED"));
    }

    #[test]
    fn self_link_provides_id_and_operations() {
        let reg = Registry::new();
        let self_link = Affordance::new(
            UriTemplate::parse("http://example.com/events/1").unwrap(),
            vec![ActionDescriptor::new(HttpMethod::Delete, "deleteEvent")],
            vec!["self".into()],
        );
        let event = Resource::new("Event")
            .with_property("name", PropertyValue::scalar("Walk off the Earth"))
            .with_link(self_link);
        let value = render(&event, &reg);
        assert_eq!(value["@id"], json!("http://example.com/events/1"));
        assert_eq!(
            value["hydra:operation"],
            json!([{
                "@type": "hydra:Operation",
                "hydra:method": "DELETE",
                "hydra:title": "deleteEvent"
            }])
        );
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["@context", "@type", "@id", "name", "hydra:operation"]);
    }

    #[test]
    fn templated_self_link_gives_no_id() {
        let reg = Registry::new();
        let event = Resource::new("Event")
            .with_link(Affordance::parse("http://example.com/events/{id}", "self").unwrap());
        assert!(render(&event, &reg).get("@id").is_none());
    }

    #[test]
    fn search_link_becomes_iri_template() {
        let reg = Registry::new();
        let search = Affordance::new(
            UriTemplate::parse("http://example.com/events{?eventName}").unwrap(),
            vec![ActionDescriptor::new(HttpMethod::Get, "findEvents").with_path_variable(
                InputParameter::new("city", ValueType::String),
            )],
            vec!["search".into()],
        );
        let value = render(&Resource::new("EventList").with_link(search), &reg);
        assert_eq!(
            value["search"],
            json!({
                "@type": "hydra:IriTemplate",
                "hydra:template": "http://example.com/events{?eventName}",
                "hydra:variableRepresentation": "hydra:BasicRepresentation",
                "hydra:mapping": [{
                    "@type": "hydra:IriTemplateMapping",
                    "hydra:variable": "eventName",
                    "hydra:property": "eventName",
                    "hydra:required": false
                }]
            })
        );
    }

    #[test]
    fn post_operation_expects_supported_properties() {
        let reg = registry(json!({
            "types": {
                "Review": {
                    "expose": "Review",
                    "writable": {
                        "defaultConstructor": true,
                        "setters": [
                            { "name": "reviewBody", "required": true, "minLength": 1 },
                            { "name": "rating", "type": "integer", "min": 1, "max": 5 }
                        ]
                    }
                }
            }
        }));
        let add_review = ActionDescriptor::new(HttpMethod::Post, "addReview")
            .with_request_body(InputParameter::new("review", ValueType::named("Review")))
            .unwrap();
        let reviews = Affordance::new(
            UriTemplate::parse("http://example.com/events/1/reviews").unwrap(),
            vec![add_review],
            vec!["review".into()],
        );
        let value = render(&Resource::new("Event").with_link(reviews), &reg);
        assert_eq!(value["review"]["@id"], json!("http://example.com/events/1/reviews"));
        let expects = &value["review"]["hydra:operation"][0]["hydra:expects"];
        assert_eq!(expects["@type"], json!("Review"));
        assert_eq!(
            expects["hydra:supportedProperty"],
            json!([
                {
                    "@type": "hydra:SupportedProperty",
                    "hydra:property": "reviewBody",
                    "hydra:required": true,
                    "valueMinLength": 1
                },
                {
                    "@type": "hydra:SupportedProperty",
                    "hydra:property": "rating",
                    "hydra:required": false,
                    "minValue": 1.0,
                    "maxValue": 5.0
                }
            ])
        );
    }

    #[test]
    fn operations_can_be_suppressed() {
        let reg = Registry::new();
        let link = Affordance::new(
            UriTemplate::parse("/events/1").unwrap(),
            vec![ActionDescriptor::new(HttpMethod::Delete, "deleteEvent")],
            vec!["self".into()],
        );
        let options = SerializeOptions::new().emit_operations(false).hydra_prefix(false);
        let value = to_value(&Resource::new("Event").with_link(link), &reg, &options).unwrap();
        assert!(value.get("hydra:operation").is_none());
        assert!(value["@context"].get("hydra").is_none());
    }

    #[test]
    fn links_sharing_a_relation_become_an_array() {
        let reg = Registry::new();
        let event = Resource::new("Event")
            .with_link(Affordance::parse("/a", "related").unwrap())
            .with_link(Affordance::parse("/b", "related").unwrap());
        let value = render(&event, &reg);
        assert_eq!(value["related"], json!([{"@id": "/a"}, {"@id": "/b"}]));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let reg = Registry::new();
        let mut nested = Resource::new("Leaf");
        for _ in 0..3 {
            nested = Resource::new("Node").with_property("next", PropertyValue::resource(nested));
        }
        let options = SerializeOptions::new().max_depth(3);
        let err = to_value(&nested, &reg, &options).unwrap_err();
        assert!(matches!(
            err,
            SerializeError::MaxDepthExceeded { max_depth: 3, ref type_name } if type_name == "Leaf"
        ));
        assert!(to_value(&nested, &reg, &SerializeOptions::new().max_depth(4)).is_ok());
    }

    #[test]
    fn stack_unwinds_after_failure() {
        let reg = registry(json!({
            "types": {
                "Broken": {
                    "term": { "define": "a", "as": "http://a/" },
                    "terms": [{ "define": "b", "as": "http://b/" }]
                }
            }
        }));
        let parent = Resource::new("Parent")
            .with_property("child", PropertyValue::resource(Resource::new("Broken")));
        let mut w = ContextAnnotatedWriter::new(JsonWriter::new(), &reg, SerializeOptions::new());
        let err = write_resource(&mut w, &parent).unwrap_err();
        assert!(matches!(err, SerializeError::Term(_)));
        assert_eq!(w.depth(), 0);
    }
}
