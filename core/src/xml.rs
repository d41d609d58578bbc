//! XML bodies decoded into nested maps.
//!
//! The root element is unwrapped: its children become the top-level keys.
//! Leaf elements become strings (CDATA included), repeated sibling tags
//! collect into an array, and attributes land under `@attributes`.

use serde_json::{Map, Value};
use tracing::trace;

/// Parse `content` into a map. Malformed XML yields an empty map.
pub fn parse(content: &str) -> Map<String, Value> {
    let document = match roxmltree::Document::parse(content) {
        Ok(document) => document,
        Err(e) => {
            trace!(error = %e, "xml body could not be parsed");
            return Map::new();
        }
    };
    match element_to_value(document.root_element()) {
        Value::Object(map) => map,
        Value::String(text) if text.is_empty() => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("0".to_string(), other);
            map
        }
    }
}

fn element_to_value(node: roxmltree::Node<'_, '_>) -> Value {
    let attributes: Map<String, Value> = node
        .attributes()
        .map(|attr| (attr.name().to_string(), Value::String(attr.value().to_string())))
        .collect();
    let children: Vec<_> = node.children().filter(|child| child.is_element()).collect();
    let text = text_of(node);

    if children.is_empty() && attributes.is_empty() {
        return Value::String(text);
    }

    let mut map = Map::new();
    if !attributes.is_empty() {
        map.insert("@attributes".to_string(), Value::Object(attributes));
    }
    if children.is_empty() && !text.is_empty() {
        map.insert("@value".to_string(), Value::String(text));
    }
    for child in children {
        let name = child.tag_name().name().to_string();
        let value = element_to_value(child);
        // Element values are strings or objects, so an array here is one
        // we built for a repeated tag.
        match map.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(name, value);
            }
        }
    }
    Value::Object(map)
}

fn text_of(node: roxmltree::Node<'_, '_>) -> String {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect::<String>()
        .trim()
        .to_string()
}
