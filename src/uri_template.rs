//! Partial URI templates.
//!
//! Templates use an RFC 6570 flavored syntax with one variable group per pair
//! of braces:
//!
//! | Group | Variable type | Example |
//! |-------|---------------|---------|
//! | `{name}` | path variable | `/events/{id}` |
//! | `{/name}` | path segment | `/events{/city}` |
//! | `{?a,b}` | request params | `/events{?q,page}` |
//! | `{&a}` | continued request params | `/events?sort=asc{&page}` |
//! | `{#name}` | fragment | `/events{#section}` |
//!
//! A variable may carry a regex hint after a colon (`{id:[0-9]+}`), which is
//! kept in placeholders but never used for matching.
//!
//! A `{name}` group after a literal `?` or `#` expands in place inside the
//! query or fragment. Values of one group are joined with `,`, segment
//! values each get their own `/`.
//!
//! Expansion can be partial. Bound variables are rendered, unbound path and
//! fragment variables stay as placeholders, and unbound query variables are
//! collected into a trailing `{&...}` group.

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::action::ActionDescriptor;
use crate::error::TemplateError;

/// How a template variable is rendered once bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// `{name}`: value appended to the path as-is.
    PathVariable,
    /// `{/name}`: value appended to the path with a leading slash.
    Segment,
    /// First variable of a `{?...}` group.
    RequestParam,
    /// Later variables of a `{?...}` group, and all of a `{&...}` group.
    RequestParamContinued,
    /// `{#name}`.
    Fragment,
}

impl VariableType {
    fn from_sigil(sigil: Option<char>, first: bool) -> Self {
        match sigil {
            Some('/') => VariableType::Segment,
            Some('?') if first => VariableType::RequestParam,
            Some('?') | Some('&') => VariableType::RequestParamContinued,
            Some('#') => VariableType::Fragment,
            _ => VariableType::PathVariable,
        }
    }

    /// Whether the variable renders into the query string.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            VariableType::RequestParam | VariableType::RequestParamContinued
        )
    }
}

/// A single variable of a template group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVariable {
    pub name: String,
    pub var_type: VariableType,
    /// Inline regex hint (`{id:[0-9]+}`).
    pub regex: Option<String>,
    sigil: Option<char>,
}

impl TemplateVariable {
    /// The variable as a standalone template group, e.g. `{/city}`.
    pub fn placeholder(&self) -> String {
        self.group_text(self.sigil)
    }

    /// The variable as a simple `{name}` group.
    fn bare_placeholder(&self) -> String {
        self.group_text(None)
    }

    fn group_text(&self, sigil: Option<char>) -> String {
        let mut out = String::from("{");
        if let Some(sigil) = sigil {
            out.push(sigil);
        }
        out.push_str(&self.name);
        if let Some(regex) = &self.regex {
            out.push(':');
            out.push_str(regex);
        }
        out.push('}');
        out
    }
}

/// Variables sharing one pair of braces, e.g. `{?a,b}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableGroup {
    pub variables: Vec<TemplateVariable>,
    raw: String,
}

impl VariableGroup {
    /// Original text of the group, braces included.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// A parsed piece of a template, in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriTemplateComponent {
    Literal(String),
    Variables(VariableGroup),
}

impl UriTemplateComponent {
    /// Text of the component with variables left unexpanded.
    pub fn as_str(&self) -> &str {
        match self {
            UriTemplateComponent::Literal(text) => text,
            UriTemplateComponent::Variables(group) => group.as_str(),
        }
    }
}

/// Result of expanding a template, split into its URI parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UriTemplateComponents {
    base_uri: String,
    query_head: String,
    query_tail: String,
    fragment: String,
}

impl UriTemplateComponents {
    pub fn new(
        base_uri: impl Into<String>,
        query_head: impl Into<String>,
        query_tail: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            base_uri: base_uri.into(),
            query_head: query_head.into(),
            query_tail: query_tail.into(),
            fragment: fragment.into(),
        }
    }

    /// Everything before the query, with unbound path placeholders.
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Query text before the unresolved tail, starting with `?`, or empty.
    pub fn query_head(&self) -> &str {
        &self.query_head
    }

    /// Comma-joined names of unresolved query variables.
    pub fn query_tail(&self) -> &str {
        &self.query_tail
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Whether any query variable is left unresolved.
    pub fn has_variables(&self) -> bool {
        !self.query_tail.is_empty()
    }

    /// Query part: resolved head followed by the unresolved tail as a template group.
    pub fn query(&self) -> String {
        if self.query_tail.is_empty() {
            self.query_head.clone()
        } else if self.query_head.is_empty() {
            format!("{{?{}}}", self.query_tail)
        } else {
            format!("{}{{&{}}}", self.query_head, self.query_tail)
        }
    }
}

impl fmt::Display for UriTemplateComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base_uri, self.query(), self.fragment)
    }
}

/// A parsed URI template plus the values bound to it so far.
#[derive(Debug, Clone, PartialEq)]
pub struct UriTemplate {
    template: String,
    components: Vec<UriTemplateComponent>,
    bindings: Map<String, Value>,
}

impl UriTemplate {
    /// Parse a template string.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Malformed` for unbalanced braces or empty
    /// variable groups.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let components = parse_components(template)?;
        Ok(Self {
            template: template.to_string(),
            components,
            bindings: Map::new(),
        })
    }

    /// The template text as originally parsed.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn components(&self) -> &[UriTemplateComponent] {
        &self.components
    }

    /// Values bound by earlier partial expansions.
    pub fn bindings(&self) -> &Map<String, Value> {
        &self.bindings
    }

    /// All variables in template order.
    pub fn variables(&self) -> impl Iterator<Item = &TemplateVariable> {
        self.components.iter().flat_map(|c| match c {
            UriTemplateComponent::Variables(group) => group.variables.as_slice(),
            UriTemplateComponent::Literal(_) => &[],
        })
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables().map(|v| v.name.as_str()).collect()
    }

    /// Whether `name` has a non-null bound value.
    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.get(name).is_some_and(|v| !v.is_null())
    }

    /// Expand into URI components.
    ///
    /// `values` are looked up first, then the template's own bindings.
    /// With `required` set to `None`, every unbound query variable is kept in
    /// the query tail. With `Some(names)`, unbound query variables not in
    /// `names` are dropped.
    pub fn expand_components(
        &self,
        values: &Map<String, Value>,
        required: Option<&HashSet<String>>,
    ) -> UriTemplateComponents {
        let lookup = |name: &str| -> Option<String> {
            values
                .get(name)
                .or_else(|| self.bindings.get(name))
                .and_then(stringify)
        };

        let mut base = String::new();
        let mut query_head = String::new();
        let mut query_tail: Vec<&str> = Vec::new();
        let mut fragment = String::new();
        let mut in_query = false;
        let mut in_fragment = false;

        for component in &self.components {
            let group = match component {
                UriTemplateComponent::Literal(text) => {
                    if text.starts_with('#') {
                        in_fragment = true;
                    } else if text.starts_with('?') {
                        in_query = true;
                    }
                    if in_fragment {
                        fragment.push_str(text);
                    } else if in_query {
                        query_head.push_str(text);
                    } else {
                        base.push_str(text);
                    }
                    continue;
                }
                UriTemplateComponent::Variables(group) => group,
            };

            let resolved: Vec<Option<String>> =
                group.variables.iter().map(|v| lookup(&v.name)).collect();

            let Some(first) = group.variables.first() else {
                continue;
            };
            if first.var_type.is_query() {
                for (var, value) in group.variables.iter().zip(resolved) {
                    match value {
                        Some(value) => {
                            query_head.push(if query_head.is_empty() { '?' } else { '&' });
                            query_head.push_str(&var.name);
                            query_head.push('=');
                            query_head.push_str(&value);
                        }
                        None => {
                            if required.map_or(true, |names| names.contains(&var.name)) {
                                query_tail.push(&var.name);
                            }
                        }
                    }
                }
                continue;
            }

            let target = if first.var_type == VariableType::Fragment {
                in_fragment = true;
                &mut fragment
            } else if in_fragment {
                &mut fragment
            } else if in_query {
                &mut query_head
            } else {
                &mut base
            };

            // Fully unbound groups keep their original text.
            if resolved.iter().all(Option::is_none) {
                target.push_str(group.as_str());
                continue;
            }
            render_group(target, &group.variables, resolved);
        }

        tracing::trace!(template = %self.template, "expanded URI template components");

        UriTemplateComponents {
            base_uri: base,
            query_head,
            query_tail: query_tail.join(","),
            fragment,
        }
    }

    /// Expand every variable.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Unresolved` if any variable is bound neither
    /// in `values` nor in the template's bindings.
    pub fn expand(&self, values: &Map<String, Value>) -> Result<String, TemplateError> {
        let unresolved: Vec<String> = self
            .variables()
            .filter(|v| {
                values
                    .get(&v.name)
                    .or_else(|| self.bindings.get(&v.name))
                    .and_then(stringify)
                    .is_none()
            })
            .map(|v| v.name.clone())
            .collect();

        if !unresolved.is_empty() {
            return Err(TemplateError::Unresolved {
                template: self.template.clone(),
                variables: unresolved,
            });
        }

        Ok(self.expand_components(values, None).to_string())
    }

    /// Bind a subset of the variables, keeping the rest as template syntax.
    ///
    /// New values override earlier bindings of the same name.
    pub fn expand_partially(&self, values: &Map<String, Value>) -> UriTemplate {
        let mut bindings = self.bindings.clone();
        for (name, value) in values {
            bindings.insert(name.clone(), value.clone());
        }
        UriTemplate {
            template: self.template.clone(),
            components: self.components.clone(),
            bindings,
        }
    }

    /// Plain-link view: required query variables stay as template syntax,
    /// optional unbound ones are dropped.
    pub fn strip_optional_variables(&self, descriptors: &[ActionDescriptor]) -> String {
        let required: HashSet<String> = descriptors
            .iter()
            .flat_map(|d| d.required_parameter_names())
            .map(String::from)
            .collect();
        self.expand_components(&Map::new(), Some(&required))
            .to_string()
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bindings.is_empty() {
            f.write_str(&self.template)
        } else {
            write!(f, "{}", self.expand_components(&Map::new(), None))
        }
    }
}

impl std::str::FromStr for UriTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UriTemplate::parse(s)
    }
}

impl serde::Serialize for UriTemplate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for UriTemplate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        UriTemplate::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Render a path, segment or fragment group with at least one bound value.
///
/// Values are comma separated, segments are slash separated. Unbound
/// variables stay as placeholders that expand to the same text later.
fn render_group(out: &mut String, variables: &[TemplateVariable], values: Vec<Option<String>>) {
    let (first, separator) = match variables.first().map(|v| v.var_type) {
        Some(VariableType::Segment) => ("/", "/"),
        Some(VariableType::Fragment) => ("#", ","),
        _ => ("", ","),
    };
    let mut started = false;
    for (var, value) in variables.iter().zip(values) {
        match value {
            Some(value) => {
                out.push_str(if started { separator } else { first });
                out.push_str(&value);
            }
            None if started && var.var_type != VariableType::Segment => {
                out.push_str(separator);
                out.push_str(&var.bare_placeholder());
            }
            None => out.push_str(&var.placeholder()),
        }
        started = true;
    }
}

/// Render a value for use in a URI, or `None` if it counts as unbound.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(encode(s)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(stringify).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(","))
            }
        }
        Value::Object(_) => Some(encode(&value.to_string())),
    }
}

fn encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn malformed(template: &str, message: impl Into<String>) -> TemplateError {
    TemplateError::Malformed {
        template: template.to_string(),
        message: message.into(),
    }
}

fn parse_components(template: &str) -> Result<Vec<UriTemplateComponent>, TemplateError> {
    let mut components = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '{' => {
                if !literal.is_empty() {
                    components.push(UriTemplateComponent::Literal(std::mem::take(&mut literal)));
                }
                // Regex hints may contain balanced braces of their own.
                let mut depth = 1;
                let mut end = None;
                for (i, c) in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(i);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| {
                    malformed(template, format!("unclosed brace at offset {}", start))
                })?;
                let group = parse_group(template, &template[start..=end])?;
                components.push(UriTemplateComponent::Variables(group));
            }
            '}' => {
                return Err(malformed(
                    template,
                    format!("unmatched closing brace at offset {}", start),
                ));
            }
            '?' | '#' => {
                if !literal.is_empty() {
                    components.push(UriTemplateComponent::Literal(std::mem::take(&mut literal)));
                }
                literal.push(c);
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        components.push(UriTemplateComponent::Literal(literal));
    }

    Ok(components)
}

fn parse_group(template: &str, raw: &str) -> Result<VariableGroup, TemplateError> {
    let body = &raw[1..raw.len() - 1];
    let (sigil, names) = match body.chars().next() {
        Some(c @ ('?' | '&' | '#' | '/')) => (Some(c), &body[1..]),
        _ => (None, body),
    };

    if names.is_empty() {
        return Err(malformed(template, format!("empty variable group {}", raw)));
    }

    let mut variables = Vec::new();
    for (index, spec) in split_top_level(names).into_iter().enumerate() {
        let (name, regex) = match spec.split_once(':') {
            Some((name, regex)) => (name, Some(regex.to_string())),
            None => (spec, None),
        };
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '{') {
            return Err(malformed(
                template,
                format!("invalid variable name \"{}\" in {}", name, raw),
            ));
        }
        variables.push(TemplateVariable {
            name: name.to_string(),
            var_type: VariableType::from_sigil(sigil, index == 0),
            regex,
            sigil,
        });
    }

    Ok(VariableGroup {
        variables,
        raw: raw.to_string(),
    })
}

/// Split on commas that are not nested inside regex braces.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EVENTS: &str = "http://example.com/events{/city}{?eventName,location}{#section}";

    fn vars(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    // === Parsing ===

    #[test]
    fn parse_splits_literals_and_groups() {
        let template = UriTemplate::parse("http://example.com/a?x=1{&y}#top").unwrap();
        let parts: Vec<&str> = template.components().iter().map(|c| c.as_str()).collect();
        assert_eq!(parts, vec!["http://example.com/a", "?x=1", "{&y}", "#top"]);
    }

    #[test]
    fn parse_components_round_trip() {
        for text in [
            EVENTS,
            "/people/{id}/friends{?offset,limit}",
            "/files/{path:[a-z]{1,3}}/raw",
            "plain/literal?with=query#and-fragment",
        ] {
            let template = UriTemplate::parse(text).unwrap();
            let joined: String = template.components().iter().map(|c| c.as_str()).collect();
            assert_eq!(joined, text);
        }
    }

    #[test]
    fn parse_variable_types() {
        let template = UriTemplate::parse("/e/{id}{/city}{?a,b}{&c}{#s}").unwrap();
        let types: Vec<VariableType> = template.variables().map(|v| v.var_type).collect();
        assert_eq!(
            types,
            vec![
                VariableType::PathVariable,
                VariableType::Segment,
                VariableType::RequestParam,
                VariableType::RequestParamContinued,
                VariableType::RequestParamContinued,
                VariableType::Fragment,
            ]
        );
    }

    #[test]
    fn parse_keeps_regex_hint() {
        let template = UriTemplate::parse("/items/{id:[0-9]{1,3}}").unwrap();
        let var = template.variables().next().unwrap();
        assert_eq!(var.name, "id");
        assert_eq!(var.regex.as_deref(), Some("[0-9]{1,3}"));
        assert_eq!(var.placeholder(), "{id:[0-9]{1,3}}");
    }

    #[test]
    fn parse_rejects_unbalanced_braces() {
        assert!(matches!(
            UriTemplate::parse("/events{?q"),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            UriTemplate::parse("/events}"),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn parse_rejects_empty_groups() {
        assert!(matches!(
            UriTemplate::parse("/events{}"),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            UriTemplate::parse("/events{?}"),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            UriTemplate::parse("/events{?a,,b}"),
            Err(TemplateError::Malformed { .. })
        ));
    }

    // === Expansion ===

    #[test]
    fn expand_literal_template_is_identity() {
        let text = "http://example.com/events?sort=asc#list";
        let template = UriTemplate::parse(text).unwrap();
        assert_eq!(
            template.expand_components(&Map::new(), None).to_string(),
            text
        );
    }

    #[test]
    fn expand_all_variables() {
        let template = UriTemplate::parse(EVENTS).unwrap();
        let values = vars(json!({
            "city": "Wiesbaden",
            "eventName": "Revo Tour",
            "location": "Schlachthof",
            "section": "description"
        }));
        assert_eq!(
            template.expand(&values).unwrap(),
            "http://example.com/events/Wiesbaden?eventName=Revo+Tour&location=Schlachthof#description"
        );
    }

    #[test]
    fn expand_partial_query_keeps_tail() {
        let template = UriTemplate::parse(EVENTS).unwrap();
        let components =
            template.expand_components(&vars(json!({"location": "Schlachthof"})), None);
        assert_eq!(components.base_uri(), "http://example.com/events{/city}");
        assert_eq!(components.query_head(), "?location=Schlachthof");
        assert_eq!(components.query_tail(), "eventName");
        assert_eq!(components.fragment(), "{#section}");
        assert_eq!(
            components.to_string(),
            "http://example.com/events{/city}?location=Schlachthof{&eventName}{#section}"
        );
    }

    #[test]
    fn expand_unbound_query_group_reproduces_template() {
        let template = UriTemplate::parse("/events{?a,b}").unwrap();
        assert_eq!(
            template.expand_components(&Map::new(), None).to_string(),
            "/events{?a,b}"
        );
    }

    #[test]
    fn expand_literal_query_continues_with_ampersand() {
        let template = UriTemplate::parse("/events?sort=asc{&page}").unwrap();
        assert_eq!(
            template.expand(&vars(json!({"page": 2}))).unwrap(),
            "/events?sort=asc&page=2"
        );
    }

    #[test]
    fn expand_partially_bound_path_group() {
        let template = UriTemplate::parse("/map{/lat,lon}").unwrap();
        let components = template.expand_components(&vars(json!({"lat": 50.1})), None);
        assert_eq!(components.base_uri(), "/map/50.1{/lon}");
    }

    #[test]
    fn simple_variable_inside_literal_query() {
        let text = "http://example.com/search?q={term}&lang=de";
        let template = UriTemplate::parse(text).unwrap();
        let components = template.expand_components(&Map::new(), None);
        assert_eq!(components.base_uri(), "http://example.com/search");
        assert_eq!(components.query_head(), "?q={term}&lang=de");
        assert_eq!(components.to_string(), text);
        assert_eq!(
            template.expand(&vars(json!({"term": "rust lang"}))).unwrap(),
            "http://example.com/search?q=rust+lang&lang=de"
        );
    }

    #[test]
    fn simple_variable_inside_literal_fragment() {
        let template = UriTemplate::parse("/docs#{section}").unwrap();
        let components = template.expand_components(&Map::new(), None);
        assert_eq!(components.base_uri(), "/docs");
        assert_eq!(components.fragment(), "#{section}");
        assert_eq!(components.to_string(), "/docs#{section}");
        assert_eq!(
            template.expand(&vars(json!({"section": "intro"}))).unwrap(),
            "/docs#intro"
        );
    }

    #[test]
    fn multi_variable_groups_keep_separators() {
        let template = UriTemplate::parse("/points/{x,y}{#a,b}").unwrap();
        let first = template
            .expand(&vars(json!({"x": 12, "y": 3, "a": "p", "b": "q"})))
            .unwrap();
        let second = template
            .expand(&vars(json!({"x": 1, "y": 23, "a": "p", "b": "q"})))
            .unwrap();
        assert_eq!(first, "/points/12,3#p,q");
        assert_eq!(second, "/points/1,23#p,q");
        assert_ne!(first, second);

        let segments = UriTemplate::parse("/map{/lat,lon}").unwrap();
        assert_eq!(
            segments.expand(&vars(json!({"lat": 50, "lon": 8}))).unwrap(),
            "/map/50/8"
        );
    }

    #[test]
    fn partially_bound_fragment_group_expands_consistently() {
        let template = UriTemplate::parse("/doc{#a,b}").unwrap();
        let partial = template.expand_partially(&vars(json!({"b": "q"})));
        assert_eq!(partial.to_string(), "/doc{#a},q");

        let reparsed = UriTemplate::parse(&partial.to_string()).unwrap();
        assert_eq!(
            reparsed.expand(&vars(json!({"a": "p"}))).unwrap(),
            "/doc#p,q"
        );
        assert_eq!(
            template.expand(&vars(json!({"a": "p", "b": "q"}))).unwrap(),
            "/doc#p,q"
        );
    }

    #[test]
    fn expand_null_counts_as_unbound() {
        let template = UriTemplate::parse("/events{?q}").unwrap();
        let err = template.expand(&vars(json!({"q": null}))).unwrap_err();
        assert!(matches!(err, TemplateError::Unresolved { variables, .. } if variables == ["q"]));
    }

    #[test]
    fn expand_arrays_comma_joined() {
        let template = UriTemplate::parse("/events{?tags}").unwrap();
        assert_eq!(
            template.expand(&vars(json!({"tags": ["a b", "c"]}))).unwrap(),
            "/events?tags=a+b,c"
        );
    }

    #[test]
    fn required_filter_drops_optional_query_variables() {
        let template = UriTemplate::parse(EVENTS).unwrap();
        let required: HashSet<String> = ["location".to_string()].into_iter().collect();
        let components = template.expand_components(&Map::new(), Some(&required));
        assert_eq!(
            components.to_string(),
            "http://example.com/events{/city}{?location}{#section}"
        );
    }

    // === Partial expansion ===

    #[test]
    fn partial_expansion_composes() {
        let template = UriTemplate::parse(EVENTS).unwrap();
        let a = vars(json!({"city": "Wiesbaden"}));
        let b = vars(json!({"location": "Schlachthof"}));
        let mut merged = a.clone();
        merged.extend(b.clone());

        let stepwise = template.expand_partially(&a).expand_partially(&b);
        let at_once = template.expand_partially(&merged);
        assert_eq!(stepwise, at_once);
        assert_eq!(stepwise.to_string(), at_once.to_string());
        assert_eq!(
            stepwise.to_string(),
            "http://example.com/events/Wiesbaden?location=Schlachthof{&eventName}{#section}"
        );
    }

    #[test]
    fn partial_expansion_preserves_original_text() {
        let template = UriTemplate::parse(EVENTS).unwrap();
        let partial = template.expand_partially(&vars(json!({"section": "top"})));
        assert_eq!(partial.as_str(), EVENTS);
        assert!(partial.is_bound("section"));
        assert!(!partial.is_bound("city"));
    }

    #[test]
    fn serde_uses_template_text() {
        let template: UriTemplate = serde_json::from_value(json!("/events{?q}")).unwrap();
        assert_eq!(serde_json::to_value(&template).unwrap(), json!("/events{?q}"));
        assert!(serde_json::from_value::<UriTemplate>(json!("/events{?q")).is_err());
    }
}
