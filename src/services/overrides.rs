//! Pipeline override compilation.
//!
//! A task's final override document is built by layering fragments: the
//! task's own fragment first, then for every active option (in walk order)
//! the selected case's fragment, or for input options the option-level
//! fragment with `{input}` placeholders substituted. Merging is per entry
//! and per key with the later assignment winning; values are never merged
//! deeply.

use super::options::{InputValue, Selection, ValueSource, walk_options};
use crate::models::{InputKind, OptionDef, OptionValues, PipelineOverride, Task};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Merge `fragment` into `base`, entry by entry and key by key
pub fn merge_override(base: &mut PipelineOverride, fragment: &PipelineOverride) {
    for (entry, props) in fragment {
        let target = base.entry(entry.clone()).or_default();
        for (key, value) in props {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Compile the override document for `task` given its stored option values.
///
/// Options without a stored (non-empty) value use their schema default.
pub fn compile_task_override(
    task: &Task,
    options: &IndexMap<String, OptionDef>,
    values: &OptionValues,
) -> PipelineOverride {
    let mut merged = PipelineOverride::new();
    if let Some(fragment) = &task.pipeline_override {
        merge_override(&mut merged, fragment);
    }

    walk_options(
        &task.options,
        options,
        ValueSource::Current(values),
        &mut |selection| match selection {
            Selection::Choice { case, .. } => {
                if let Some(fragment) = case.and_then(|c| c.pipeline_override.as_ref()) {
                    merge_override(&mut merged, fragment);
                }
            }
            Selection::Inputs { option, values, .. } => {
                if let Some(fragment) = &option.pipeline_override {
                    merge_override(&mut merged, &substitute_placeholders(fragment, &values));
                }
            }
        },
    );

    merged
}

/// Replace `{input}` placeholders in every value of `fragment`
pub fn substitute_placeholders(
    fragment: &PipelineOverride,
    inputs: &[InputValue<'_>],
) -> PipelineOverride {
    fragment
        .iter()
        .map(|(entry, props)| {
            let props = props
                .iter()
                .map(|(key, value)| (key.clone(), substitute_value(value, inputs)))
                .collect::<Map<String, Value>>();
            (entry.clone(), props)
        })
        .collect()
}

fn substitute_value(value: &Value, inputs: &[InputValue<'_>]) -> Value {
    match value {
        Value::String(s) => substitute_string(s, inputs),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_value(item, inputs))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_value(v, inputs)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute_string(s: &str, inputs: &[InputValue<'_>]) -> Value {
    if let Some(name) = exact_placeholder(s)
        && let Some(input) = inputs.iter().find(|i| i.input.name == name)
    {
        return typed_value(&input.value, input.input.kind);
    }

    let mut result = s.to_string();
    for input in inputs {
        let placeholder = format!("{{{}}}", input.input.name);
        if result.contains(&placeholder) {
            result = result.replace(&placeholder, &input.value);
        }
    }
    Value::String(result)
}

/// The name inside a string that is exactly one `{word}` placeholder
fn exact_placeholder(s: &str) -> Option<&str> {
    let name = s.strip_prefix('{')?.strip_suffix('}')?;
    let is_word = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_word.then_some(name)
}

/// Convert an input value to its declared JSON type. Unparseable ints stay text.
fn typed_value(value: &str, kind: InputKind) -> Value {
    match kind {
        InputKind::Int => value
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string())),
        InputKind::Bool => Value::Bool(matches!(value, "true" | "True" | "1")),
        InputKind::String => Value::String(value.to_string()),
    }
}
