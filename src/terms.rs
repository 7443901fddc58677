//! Vocabulary, term and type resolution for resources.
//!
//! Sources are consulted in a fixed order. For the vocabulary the first hit
//! wins: mixin, type, namespace, nested context provider, then
//! [`DEFAULT_VOCAB`]. Terms are merged, later sources overriding earlier
//! ones: namespace, type, nested context provider, mixin, then the
//! resource's own properties. A term keeps the position of its first
//! definition and the value of its last.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::error::TermError;
use crate::registry::{PropertyConfig, Registry, Semantics, TermDeclaration};
use crate::resource::{PropertyValue, Resource};
use crate::types::{AT_ID, AT_REVERSE, AT_TYPE, AT_VOCAB, DEFAULT_VOCAB};

/// Resolves semantic information for resources against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r Registry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Value written as `@type` for a type name.
    pub fn exposed_type(&self, type_name: &str) -> String {
        self.registry
            .mixin_for(type_name)
            .and_then(|(_, mixin)| mixin.expose.clone())
            .or_else(|| {
                self.registry
                    .type_config(type_name)
                    .and_then(|t| t.expose.clone())
            })
            .unwrap_or_else(|| type_name.to_string())
    }

    pub fn resolve_type(&self, resource: &Resource) -> String {
        self.exposed_type(&resource.type_name)
    }

    pub fn resolve_vocab(&self, resource: &Resource) -> String {
        self.find_vocab(resource)
            .unwrap_or_else(|| DEFAULT_VOCAB.to_string())
    }

    fn find_vocab(&self, resource: &Resource) -> Option<String> {
        let type_name = resource.type_name.as_str();
        self.registry
            .mixin_for(type_name)
            .and_then(|(_, mixin)| mixin.semantics.vocab.clone())
            .or_else(|| {
                self.registry
                    .type_config(type_name)
                    .and_then(|t| t.semantics.vocab.clone())
            })
            .or_else(|| {
                self.registry
                    .namespace_of(type_name)
                    .and_then(|(_, ns)| ns.semantics.vocab.clone())
            })
            .or_else(|| {
                self.context_provider(resource)
                    .and_then(|provider| self.find_vocab(provider))
            })
    }

    /// Resolve the term definitions for a resource.
    ///
    /// # Errors
    ///
    /// Returns `TermError` if a namespace, type or mixin declares terms
    /// inconsistently.
    pub fn resolve_terms(&self, resource: &Resource) -> Result<Map<String, Value>, TermError> {
        let type_name = resource.type_name.as_str();
        let mut terms = Map::new();

        if let Some((name, namespace)) = self.registry.namespace_of(type_name) {
            merge_declared(
                &mut terms,
                &namespace.semantics,
                &format!("namespace {}", name),
            )?;
        }
        if let Some(config) = self.registry.type_config(type_name) {
            merge_declared(&mut terms, &config.semantics, &format!("type {}", type_name))?;
        }
        if let Some(provider) = self.context_provider(resource) {
            for (term, value) in self.resolve_terms(provider)? {
                terms.insert(term, value);
            }
        }
        if let Some((name, mixin)) = self.registry.mixin_for(type_name) {
            merge_declared(&mut terms, &mixin.semantics, &format!("mixin {}", name))?;
        }

        self.merge_property_terms(resource, &mut terms);
        Ok(terms)
    }

    /// The resource that lends its context to `resource`, if any.
    ///
    /// Collections and maps contribute their first element; empty ones
    /// contribute nothing.
    pub fn context_provider<'a>(&self, resource: &'a Resource) -> Option<&'a Resource> {
        let type_name = resource.type_name.as_str();
        let property = self
            .registry
            .mixin_for(type_name)
            .and_then(|(_, mixin)| mixin.context_provider.as_deref())
            .or_else(|| {
                self.registry
                    .type_config(type_name)
                    .and_then(|t| t.context_provider.as_deref())
            })?;
        resource.property(property)?.first_resource()
    }

    fn merge_property_terms(&self, resource: &Resource, terms: &mut Map<String, Value>) {
        for (name, value) in &resource.properties {
            let config = self.registry.property_config(&resource.type_name, name);
            match value {
                PropertyValue::Enum {
                    enum_type,
                    value: constant,
                } => {
                    terms.insert(name.clone(), enum_property_term(config));
                    let declared = self
                        .registry
                        .enum_config(enum_type)
                        .map(|e| e.constants.as_slice())
                        .unwrap_or_default();
                    if declared.is_empty() {
                        self.insert_constant_term(terms, enum_type, constant);
                    } else {
                        for constant in declared {
                            self.insert_constant_term(terms, enum_type, constant);
                        }
                    }
                }
                PropertyValue::Collection(items) if items.iter().any(is_enum) => {
                    // Only constants present in this instance get terms.
                    terms.insert(name.clone(), enum_property_term(config));
                    let mut seen = HashSet::new();
                    for item in items {
                        if let PropertyValue::Enum {
                            enum_type,
                            value: constant,
                        } = item
                        {
                            if seen.insert(constant.as_str()) {
                                self.insert_constant_term(terms, enum_type, constant);
                            }
                        }
                    }
                }
                _ => {
                    if let Some(term) = config.and_then(exposed_property_term) {
                        terms.insert(name.clone(), term);
                    }
                }
            }
        }
    }

    fn insert_constant_term(&self, terms: &mut Map<String, Value>, enum_type: &str, constant: &str) {
        let exposed = self
            .registry
            .enum_config(enum_type)
            .and_then(|e| e.expose.get(constant).cloned())
            .unwrap_or_else(|| camel_case_constant(constant));
        terms.insert(constant.to_string(), Value::String(exposed));
    }
}

fn is_enum(value: &PropertyValue) -> bool {
    matches!(value, PropertyValue::Enum { .. })
}

fn enum_property_term(config: Option<&PropertyConfig>) -> Value {
    let mut term = Map::new();
    if let Some(expose) = config.and_then(|c| c.expose.as_ref()) {
        term.insert(AT_ID.to_string(), Value::String(expose.clone()));
    }
    term.insert(AT_TYPE.to_string(), Value::String(AT_VOCAB.to_string()));
    Value::Object(term)
}

fn exposed_property_term(config: &PropertyConfig) -> Option<Value> {
    let expose = config.expose.as_ref()?;
    Some(if config.reverse {
        json!({ AT_REVERSE: expose })
    } else {
        Value::String(expose.clone())
    })
}

fn declaration_value(declaration: &TermDeclaration) -> Value {
    if declaration.reverse {
        json!({ AT_REVERSE: declaration.as_uri })
    } else {
        Value::String(declaration.as_uri.clone())
    }
}

/// Merge an element's declared terms, checking their consistency.
fn merge_declared(
    terms: &mut Map<String, Value>,
    semantics: &Semantics,
    element: &str,
) -> Result<(), TermError> {
    match (&semantics.term, &semantics.terms) {
        (Some(_), Some(_)) => Err(TermError::ConflictingTermDeclaration {
            element: element.to_string(),
        }),
        (Some(single), None) => {
            terms.insert(single.define.clone(), declaration_value(single));
            Ok(())
        }
        (None, Some(list)) => {
            let mut defined = HashSet::new();
            for declaration in list {
                if !defined.insert(declaration.define.as_str()) {
                    return Err(TermError::DuplicateTermDefinition {
                        element: element.to_string(),
                        term: declaration.define.clone(),
                    });
                }
            }
            for declaration in list {
                terms.insert(declaration.define.clone(), declaration_value(declaration));
            }
            Ok(())
        }
        (None, None) => Ok(()),
    }
}

/// `EVENT_CANCELLED` → `EventCancelled`.
pub fn camel_case_constant(constant: &str) -> String {
    constant
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
