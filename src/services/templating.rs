//! Card template rendering
//!
//! Binds `${path}` expressions in a card template against a data document,
//! following the Adaptive Cards templating conventions: a string that is a
//! single expression takes the bound value with its JSON type, expressions
//! embedded in longer strings are interpolated as text, and expressions that
//! cannot be bound are left untouched.

use super::{CollaboratorError, TemplateRenderer};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}]+)\}").expect("expression pattern is valid"));

/// Template renderer for Adaptive Card JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct AdaptiveTemplateRenderer;

impl AdaptiveTemplateRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for AdaptiveTemplateRenderer {
    fn render(&self, template_json: &str, data_json: &str) -> Result<String, CollaboratorError> {
        let mut template: Value = serde_json::from_str(template_json)
            .map_err(|e| CollaboratorError::rendering(format!("Invalid template: {e}")))?;
        let data: Value = serde_json::from_str(data_json)
            .map_err(|e| CollaboratorError::rendering(format!("Invalid data: {e}")))?;

        bind(&mut template, &data);

        serde_json::to_string(&template)
            .map_err(|e| CollaboratorError::rendering(format!("Failed to serialize card: {e}")))
    }
}

fn bind(node: &mut Value, data: &Value) {
    match node {
        Value::String(s) => {
            if let Some(bound) = bind_string(s, data) {
                *node = bound;
            }
        }
        Value::Array(items) => {
            for item in items {
                bind(item, data);
            }
        }
        Value::Object(map) => {
            for value in map.values_mut() {
                bind(value, data);
            }
        }
        _ => {}
    }
}

/// Returns the replacement for a string node, or `None` to leave it alone
fn bind_string(s: &str, data: &Value) -> Option<Value> {
    if !s.contains("${") {
        return None;
    }

    // Whole-string expression keeps the bound value's type
    if let Some(caps) = EXPRESSION.captures(s) {
        if caps.get(0).is_some_and(|m| m.len() == s.len()) {
            return lookup(data, &caps[1]).cloned();
        }
    }

    let replaced = EXPRESSION.replace_all(s, |caps: &Captures<'_>| match lookup(data, &caps[1]) {
        Some(Value::String(v)) => v.clone(),
        Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
        None => caps[0].to_string(),
    });
    Some(Value::String(replaced.into_owned()))
}

fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    let path = path.strip_prefix("$root.").unwrap_or(path);
    path.split('.')
        .try_fold(data, |current, segment| current.get(segment))
}
