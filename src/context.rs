//! JSON-LD context inheritance.
//!
//! Every serialized object gets a [`VocabContext`] chained to its parent's.
//! An object only re-emits `@context` when its parent chain does not already
//! provide the same vocabulary and the same value for every term it needs.

use std::rc::Rc;

use serde_json::{Map, Value};

/// Vocabulary and term mappings in scope for one serialized object.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabContext {
    parent: Option<Rc<VocabContext>>,
    /// `None` means the vocabulary is inherited from an ancestor.
    vocab: Option<String>,
    terms: Map<String, Value>,
}

impl VocabContext {
    pub fn new(
        parent: Option<Rc<VocabContext>>,
        vocab: Option<String>,
        terms: Map<String, Value>,
    ) -> Self {
        Self {
            parent,
            vocab,
            terms,
        }
    }

    pub fn root(vocab: impl Into<String>, terms: Map<String, Value>) -> Self {
        Self::new(None, Some(vocab.into()), terms)
    }

    pub fn parent(&self) -> Option<&VocabContext> {
        self.parent.as_deref()
    }

    pub fn vocab(&self) -> Option<&str> {
        self.vocab.as_deref()
    }

    pub fn terms(&self) -> &Map<String, Value> {
        &self.terms
    }

    /// The vocabulary in effect: this context's own, or the nearest ancestor's.
    pub fn effective_vocab(&self) -> Option<&str> {
        match &self.vocab {
            Some(vocab) => Some(vocab),
            None => self.parent.as_deref()?.effective_vocab(),
        }
    }

    /// Whether this context, with its ancestors, already provides everything
    /// `child` declares.
    pub fn contains(&self, child: &VocabContext) -> bool {
        if !self.same_effective_vocab(child) {
            return false;
        }
        child
            .terms
            .iter()
            .all(|(term, value)| self.has_equal_term_up_to_root(term, value))
    }

    fn same_effective_vocab(&self, child: &VocabContext) -> bool {
        match &self.vocab {
            Some(vocab) => child.effective_vocab() == Some(vocab.as_str()),
            None => match self.parent.as_deref() {
                Some(parent) => parent.same_effective_vocab(child),
                None => false,
            },
        }
    }

    fn has_equal_term_up_to_root(&self, term: &str, value: &Value) -> bool {
        match self.terms.get(term) {
            Some(existing) => existing == value,
            None => match self.parent.as_deref() {
                Some(parent) => parent.has_equal_term_up_to_root(term, value),
                None => false,
            },
        }
    }
}

/// Stack of contexts for the objects currently being serialized.
///
/// One stack belongs to one serialization call; it is never shared.
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<Rc<VocabContext>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The innermost context, used as parent for the next object.
    pub fn top(&self) -> Option<Rc<VocabContext>> {
        self.frames.last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push a context and report whether it must be emitted.
    ///
    /// The context is pushed either way so descendants see the full chain.
    pub fn push(&mut self, context: VocabContext) -> bool {
        let must_emit = match self.frames.last() {
            Some(top) => !top.contains(&context),
            None => true,
        };
        self.frames.push(Rc::new(context));
        must_emit
    }

    pub fn pop(&mut self) -> Option<Rc<VocabContext>> {
        self.frames.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const V1: &str = "http://schema.org/";
    const V2: &str = "http://example.com/vocab#";

    fn terms(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn contains_is_reflexive() {
        let ctx = VocabContext::root(V1, terms(json!({"ex": V2})));
        assert!(ctx.contains(&ctx));
    }

    #[test]
    fn different_vocabs_never_contain_each_other() {
        let t = terms(json!({"ex": V2}));
        let a = VocabContext::root(V1, t.clone());
        let b = VocabContext::root(V2, t);
        assert!(!a.contains(&b));
        assert!(!b.contains(&a));
    }

    #[test]
    fn empty_child_inherits_everything() {
        let parent = Rc::new(VocabContext::root(V1, terms(json!({"ex": V2}))));
        let child = VocabContext::new(Some(parent.clone()), None, Map::new());
        assert_eq!(child.effective_vocab(), Some(V1));
        assert!(parent.contains(&child));
    }

    #[test]
    fn term_lookup_walks_to_root() {
        let root = Rc::new(VocabContext::root(V1, terms(json!({"ex": V2}))));
        let middle = Rc::new(VocabContext::new(
            Some(root),
            None,
            terms(json!({"other": "http://other.org/"})),
        ));
        let child = VocabContext::new(Some(middle.clone()), Some(V1.into()), terms(json!({"ex": V2})));
        assert!(middle.contains(&child));

        let changed = VocabContext::new(
            Some(middle.clone()),
            Some(V1.into()),
            terms(json!({"ex": "http://changed.org/"})),
        );
        assert!(!middle.contains(&changed));
    }

    #[test]
    fn structured_terms_compare_deeply() {
        let enum_term = json!({"@id": "eventStatus", "@type": "@vocab"});
        let parent = VocabContext::root(V1, terms(json!({"eventStatus": enum_term})));
        let same = VocabContext::root(V1, terms(json!({"eventStatus": {"@id": "eventStatus", "@type": "@vocab"}})));
        let reverse = VocabContext::root(V1, terms(json!({"eventStatus": {"@reverse": "eventStatus"}})));
        assert!(parent.contains(&same));
        assert!(!parent.contains(&reverse));
    }

    #[test]
    fn vocabless_chain_contains_nothing() {
        let root = VocabContext::new(None, None, Map::new());
        let child = VocabContext::new(None, None, Map::new());
        assert!(!root.contains(&child));
    }

    #[test]
    fn stack_emits_only_when_needed() {
        let mut stack = ContextStack::new();
        let common = terms(json!({"common": "http://example.com/common#"}));

        assert!(stack.push(VocabContext::root(V1, common.clone())));
        let same = VocabContext::new(stack.top(), Some(V1.into()), common.clone());
        assert!(!stack.push(same));

        let mut extended = common;
        extended.insert("extra".into(), json!("http://example.com/extra#"));
        let more = VocabContext::new(stack.top(), Some(V1.into()), extended);
        assert!(stack.push(more));
        assert_eq!(stack.depth(), 3);
    }
}
