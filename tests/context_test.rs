//! Integration tests for JSON-LD context inheritance.

use std::rc::Rc;

use hydra_affordance::{
    to_value, ContextStack, PropertyValue, Registry, Resource, SerializeOptions, VocabContext,
};
use serde_json::{json, Map, Value};

const V1: &str = "http://schema.org/";
const V2: &str = "http://purl.org/goodrelations/v1#";

fn terms(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

mod containment {
    use super::*;

    #[test]
    fn every_context_contains_itself() {
        let samples = [
            VocabContext::root(V1, Map::new()),
            VocabContext::root(V2, terms(json!({"gr": V2}))),
            VocabContext::root(V1, terms(json!({"status": {"@id": "eventStatus", "@type": "@vocab"}}))),
        ];
        for ctx in &samples {
            assert!(ctx.contains(ctx));
        }
    }

    #[test]
    fn distinct_vocabs_exclude_each_other() {
        let t = terms(json!({"common": "http://example.com/common#"}));
        let a = VocabContext::root(V1, t.clone());
        let b = VocabContext::root(V2, t);
        assert!(!a.contains(&b));
        assert!(!b.contains(&a));
    }

    #[test]
    fn inherited_vocab_counts_as_same() {
        let parent = Rc::new(VocabContext::root(V1, terms(json!({"common": "c"}))));
        let child = VocabContext::new(Some(parent.clone()), None, terms(json!({"common": "c"})));
        assert!(parent.contains(&child));

        let overriding = VocabContext::new(Some(parent.clone()), Some(V2.into()), Map::new());
        assert!(!parent.contains(&overriding));
    }
}

mod stack {
    use super::*;

    #[test]
    fn push_reports_must_emit_and_pop_restores() {
        let mut stack = ContextStack::new();
        assert!(stack.push(VocabContext::root(V1, Map::new())));
        assert!(!stack.push(VocabContext::new(stack.top(), Some(V1.into()), Map::new())));
        assert!(stack.push(VocabContext::new(stack.top(), Some(V2.into()), Map::new())));
        assert_eq!(stack.depth(), 3);

        stack.pop();
        assert_eq!(stack.top().and_then(|t| t.vocab().map(String::from)), Some(V1.to_string()));
        stack.pop();
        stack.pop();
        assert!(stack.is_empty());
        assert!(stack.pop().is_none());
    }
}

mod emission {
    use super::*;

    fn registry() -> Registry {
        serde_json::from_value(json!({
            "types": {
                "A": { "terms": [{ "define": "common", "as": "http://example.com/common#" }] },
                "B": { "terms": [{ "define": "common", "as": "http://example.com/common#" }] },
                "C": {
                    "terms": [
                        { "define": "common", "as": "http://example.com/common#" },
                        { "define": "extra", "as": "http://example.com/extra#" }
                    ]
                },
                "Product": { "vocab": V2 }
            }
        }))
        .unwrap()
    }

    fn render(resource: &Resource) -> Value {
        to_value(resource, &registry(), &SerializeOptions::new()).unwrap()
    }

    #[test]
    fn subsumed_child_context_is_omitted() {
        let a = Resource::new("A").with_property("b", PropertyValue::resource(Resource::new("B")));
        let value = render(&a);
        assert!(value.get("@context").is_some());
        assert!(value["b"].get("@context").is_none());
    }

    #[test]
    fn extra_term_re_emits_merged_terms() {
        let a = Resource::new("A").with_property("c", PropertyValue::resource(Resource::new("C")));
        let value = render(&a);
        assert_eq!(
            value["c"]["@context"],
            json!({
                "common": "http://example.com/common#",
                "extra": "http://example.com/extra#"
            })
        );
    }

    #[test]
    fn grandchild_compares_against_nearest_ancestor() {
        // A > C > B: B's terms are all provided by the chain.
        let c = Resource::new("C").with_property("b", PropertyValue::resource(Resource::new("B")));
        let a = Resource::new("A").with_property("c", PropertyValue::resource(c));
        let value = render(&a);
        assert!(value["c"].get("@context").is_some());
        assert!(value["c"]["b"].get("@context").is_none());
    }

    #[test]
    fn vocab_switch_and_back() {
        // The product switches vocabulary; its child switches back to V1.
        let product = Resource::new("Product")
            .with_property("seller", PropertyValue::resource(Resource::new("B")));
        let offer = Resource::new("A").with_property("itemOffered", PropertyValue::resource(product));
        let value = render(&offer);
        assert_eq!(value["itemOffered"]["@context"], json!({ "@vocab": V2 }));
        assert_eq!(
            value["itemOffered"]["seller"]["@context"]["@vocab"],
            json!(V1)
        );
    }

    #[test]
    fn collection_elements_are_annotated_individually() {
        let a = Resource::new("A").with_property(
            "items",
            PropertyValue::Collection(vec![
                PropertyValue::resource(Resource::new("B")),
                PropertyValue::resource(Resource::new("Product")),
            ]),
        );
        let value = render(&a);
        assert!(value["items"][0].get("@context").is_none());
        assert_eq!(value["items"][1]["@context"], json!({ "@vocab": V2 }));
    }
}
