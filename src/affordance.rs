//! Affordances: links annotated with the actions available at their target.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::ActionDescriptor;
use crate::error::TemplateError;
use crate::types::Cardinality;
use crate::uri_template::{UriTemplate, UriTemplateComponents};

/// RFC 5988 parameters with dedicated accessors.
const TITLE: &str = "title";
const TYPE: &str = "type";
const ANCHOR: &str = "anchor";
const MEDIA: &str = "media";
const HREFLANG: &str = "hreflang";

/// A hyperlink plus the HTTP actions its target supports.
///
/// Affordances are immutable; the `with_*` methods return updated copies.
/// [`href`](Affordance::href) is the plain-link view computed at
/// construction: required query variables stay as template syntax, optional
/// unbound ones are dropped. The full template stays available through
/// [`uri_template_components`](Affordance::uri_template_components).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AffordanceDoc", into = "AffordanceDoc")]
pub struct Affordance {
    template: UriTemplate,
    action_descriptors: Vec<ActionDescriptor>,
    rels: Vec<String>,
    link_params: Vec<(String, String)>,
    cardinality: Cardinality,
    collection_holder: Option<String>,
    href: String,
}

impl Affordance {
    pub fn new(
        template: UriTemplate,
        action_descriptors: Vec<ActionDescriptor>,
        rels: Vec<String>,
    ) -> Self {
        let cardinality = if action_descriptors
            .iter()
            .any(|d| d.cardinality() == Cardinality::Collection)
        {
            Cardinality::Collection
        } else {
            Cardinality::Single
        };
        let href = template.strip_optional_variables(&action_descriptors);
        Self {
            template,
            action_descriptors,
            rels,
            link_params: Vec::new(),
            cardinality,
            collection_holder: None,
            href,
        }
    }

    /// Parse a template and build an affordance with a single relation.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Malformed` if the template cannot be parsed.
    pub fn parse(template: &str, rel: impl Into<String>) -> Result<Self, TemplateError> {
        Ok(Self::new(
            UriTemplate::parse(template)?,
            Vec::new(),
            vec![rel.into()],
        ))
    }

    /// Same links, new template and descriptors; href is recomputed.
    fn rebuild(&self, template: UriTemplate) -> Self {
        let mut rebuilt = Self::new(template, self.action_descriptors.clone(), self.rels.clone());
        rebuilt.link_params = self.link_params.clone();
        rebuilt.collection_holder = self.collection_holder.clone();
        rebuilt
    }

    pub fn with_action_descriptors(&self, descriptors: Vec<ActionDescriptor>) -> Self {
        let mut updated = Self::new(self.template.clone(), descriptors, self.rels.clone());
        updated.link_params = self.link_params.clone();
        updated.collection_holder = self.collection_holder.clone();
        updated
    }

    /// Add a relation type; duplicates are ignored.
    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        let rel = rel.into();
        if !self.rels.contains(&rel) {
            self.rels.push(rel);
        }
        self
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.with_single_param(TITLE, title.into())
    }

    /// Media type hint of the target.
    pub fn with_type(self, media_type: impl Into<String>) -> Self {
        self.with_single_param(TYPE, media_type.into())
    }

    pub fn with_anchor(self, anchor: impl Into<String>) -> Self {
        self.with_single_param(ANCHOR, anchor.into())
    }

    pub fn with_media(self, media: impl Into<String>) -> Self {
        self.with_single_param(MEDIA, media.into())
    }

    /// Add a language of the target; may be given more than once.
    pub fn with_hreflang(self, hreflang: impl Into<String>) -> Self {
        self.with_link_param(HREFLANG, hreflang)
    }

    /// Append an RFC 5988 link parameter.
    pub fn with_link_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.link_params.push((name.into(), value.into()));
        self
    }

    pub fn with_collection_holder(mut self, holder: impl Into<String>) -> Self {
        self.collection_holder = Some(holder.into());
        self
    }

    fn with_single_param(mut self, name: &str, value: String) -> Self {
        self.link_params.retain(|(n, _)| n != name);
        self.link_params.push((name.to_string(), value));
        self
    }

    /// Plain-link view of the target.
    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn uri_template(&self) -> &UriTemplate {
        &self.template
    }

    /// Full view of the template, unresolved optional variables included.
    pub fn uri_template_components(&self) -> UriTemplateComponents {
        self.template.expand_components(&Map::new(), None)
    }

    /// Whether any variable is still unbound.
    pub fn is_templated(&self) -> bool {
        self.template
            .variables()
            .any(|v| !self.template.is_bound(&v.name))
    }

    pub fn rels(&self) -> &[String] {
        &self.rels
    }

    /// First relation type.
    pub fn rel(&self) -> Option<&str> {
        self.rels.first().map(String::as_str)
    }

    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels.iter().any(|r| r == rel)
    }

    pub fn action_descriptors(&self) -> &[ActionDescriptor] {
        &self.action_descriptors
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn collection_holder(&self) -> Option<&str> {
        self.collection_holder.as_deref()
    }

    pub fn link_params(&self) -> &[(String, String)] {
        &self.link_params
    }

    /// First value of a link parameter.
    pub fn link_param(&self, name: &str) -> Option<&str> {
        self.link_params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn link_param_values(&self, name: &str) -> Vec<&str> {
        self.link_params
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn title(&self) -> Option<&str> {
        self.link_param(TITLE)
    }

    pub fn media_type(&self) -> Option<&str> {
        self.link_param(TYPE)
    }

    /// Whether some action needs a URI input that has no value yet.
    ///
    /// An input counts as satisfied when it has a current value or when the
    /// template already binds a value under its name.
    pub fn has_unsatisfied_required_variables(&self) -> bool {
        self.action_descriptors.iter().any(|descriptor| {
            descriptor.uri_parameters().any(|param| {
                param.is_required() && !param.has_value() && !self.template.is_bound(&param.name)
            })
        })
    }

    /// Bind every variable.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Unresolved` if any variable stays unbound.
    pub fn expand(&self, values: &Map<String, Value>) -> Result<Affordance, TemplateError> {
        let expanded = self.template.expand(values)?;
        Ok(self.rebuild(UriTemplate::parse(&expanded)?))
    }

    /// Bind some variables, keeping the rest as template syntax.
    pub fn expand_partially(&self, values: &Map<String, Value>) -> Affordance {
        self.rebuild(self.template.expand_partially(values))
    }

    /// RFC 5988 `Link` header value.
    pub fn as_link_header(&self) -> String {
        let mut header = format!("<{}>", self.href);
        if !self.rels.is_empty() {
            header.push_str(&format!("; rel=\"{}\"", self.rels.join(" ")));
        }
        for (name, value) in &self.link_params {
            header.push_str(&format!("; {}=\"{}\"", name, value.replace('"', "\\\"")));
        }
        header
    }
}

/// JSON shape of an affordance.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AffordanceDoc {
    href: UriTemplate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    rel: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hreflang: Vec<String>,
    /// Extension parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collection_holder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    actions: Vec<ActionDescriptor>,
}

impl From<AffordanceDoc> for Affordance {
    fn from(doc: AffordanceDoc) -> Self {
        let mut affordance = Affordance::new(doc.href, doc.actions, doc.rel);
        if let Some(title) = doc.title {
            affordance = affordance.with_title(title);
        }
        if let Some(media_type) = doc.media_type {
            affordance = affordance.with_type(media_type);
        }
        if let Some(anchor) = doc.anchor {
            affordance = affordance.with_anchor(anchor);
        }
        if let Some(media) = doc.media {
            affordance = affordance.with_media(media);
        }
        for lang in doc.hreflang {
            affordance = affordance.with_hreflang(lang);
        }
        for (name, values) in doc.params {
            for value in values {
                affordance = affordance.with_link_param(name.clone(), value);
            }
        }
        if let Some(holder) = doc.collection_holder {
            affordance = affordance.with_collection_holder(holder);
        }
        affordance
    }
}

impl From<Affordance> for AffordanceDoc {
    fn from(affordance: Affordance) -> Self {
        let mut doc = AffordanceDoc {
            href: affordance.template,
            rel: affordance.rels,
            title: None,
            media_type: None,
            anchor: None,
            media: None,
            hreflang: Vec::new(),
            params: BTreeMap::new(),
            collection_holder: affordance.collection_holder,
            actions: affordance.action_descriptors,
        };
        for (name, value) in affordance.link_params {
            match name.as_str() {
                TITLE => doc.title = Some(value),
                TYPE => doc.media_type = Some(value),
                ANCHOR => doc.anchor = Some(value),
                MEDIA => doc.media = Some(value),
                HREFLANG => doc.hreflang.push(value),
                _ => doc.params.entry(name).or_default().push(value),
            }
        }
        doc
    }
}
