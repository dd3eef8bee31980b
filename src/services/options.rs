//! Option tree walker.
//!
//! Options form a tree: a task references top-level options, and each case
//! of a select or switch option may reference further options that are only
//! active while that case is chosen. [`walk_options`] visits the active part
//! of that tree in declaration order and reports the value chosen for every
//! option it reaches. Defaults, the expected option set used by config sync,
//! and override compilation are all computed from this one walk.

use crate::models::{Case, ChoiceOption, Input, OptionDef, OptionKind, OptionValues};
use indexmap::IndexMap;
use tracing::warn;

/// Where the walker takes option values from
#[derive(Debug, Clone, Copy)]
pub enum ValueSource<'v> {
    /// Ignore stored values and use schema defaults
    Defaults,
    /// Use a stored value when present and non-empty, else the default
    Current(&'v OptionValues),
}

impl<'v> ValueSource<'v> {
    fn get(&self, key: &str) -> Option<&'v str> {
        match *self {
            ValueSource::Defaults => None,
            ValueSource::Current(values) => values
                .get(key)
                .map(String::as_str)
                .filter(|v| !v.is_empty()),
        }
    }
}

/// One resolved input of an input option
#[derive(Debug, Clone)]
pub struct InputValue<'a> {
    /// Stored key, `option.input`
    pub key: String,
    pub input: &'a Input,
    pub value: String,
}

/// Value chosen for one visited option
#[derive(Debug, Clone)]
pub enum Selection<'a> {
    Choice {
        option_name: &'a str,
        option: &'a OptionDef,
        value: String,
        /// Case named by `value`; `None` when the value matches no case
        case: Option<&'a Case>,
    },
    Inputs {
        option_name: &'a str,
        option: &'a OptionDef,
        values: Vec<InputValue<'a>>,
    },
}

/// Walk the active option tree below `names`, calling `visit` once per
/// reached option, parents before their nested options.
///
/// Unknown option names are skipped. An option that is already on the
/// current path is skipped with a warning so a cyclic schema terminates.
pub fn walk_options<'a, F>(
    names: &'a [String],
    options: &'a IndexMap<String, OptionDef>,
    source: ValueSource<'_>,
    visit: &mut F,
) where
    F: FnMut(Selection<'a>),
{
    let mut path = Vec::new();
    walk_level(names, options, source, &mut path, visit);
}

fn walk_level<'a, F>(
    names: &'a [String],
    options: &'a IndexMap<String, OptionDef>,
    source: ValueSource<'_>,
    path: &mut Vec<&'a str>,
    visit: &mut F,
) where
    F: FnMut(Selection<'a>),
{
    for name in names {
        let Some((option_name, option)) = options.get_key_value(name.as_str()) else {
            continue;
        };
        let option_name = option_name.as_str();

        if path.contains(&option_name) {
            warn!(
                "Option {} references itself through {}; skipping",
                option_name,
                path.join(" -> ")
            );
            continue;
        }

        match &option.kind {
            OptionKind::Select(choice) | OptionKind::Switch(choice) => {
                let is_switch = matches!(option.kind, OptionKind::Switch(_));
                let value = match source.get(option_name) {
                    Some(current) => current.to_string(),
                    None if is_switch => default_switch_case(choice).to_string(),
                    None => default_select_case(choice).to_string(),
                };
                let case = choice.find_case(&value);

                visit(Selection::Choice {
                    option_name,
                    option,
                    value,
                    case,
                });

                if let Some(case) = case
                    && !case.options.is_empty()
                {
                    path.push(option_name);
                    walk_level(&case.options, options, source, path, visit);
                    path.pop();
                }
            }
            OptionKind::Input(inputs) => {
                let values = inputs
                    .iter()
                    .map(|input| {
                        let key = input_key(option_name, &input.name);
                        let value = match source.get(&key) {
                            Some(current) => current.to_string(),
                            None if !input.default.is_empty() => input.default.clone(),
                            None => input.fallback_value().to_string(),
                        };
                        InputValue { key, input, value }
                    })
                    .collect();

                visit(Selection::Inputs {
                    option_name,
                    option,
                    values,
                });
            }
        }
    }
}

/// Stored key of an input value
pub fn input_key(option_name: &str, input_name: &str) -> String {
    format!("{option_name}.{input_name}")
}

/// `default_case`, else the first case
fn default_select_case(choice: &ChoiceOption) -> &str {
    choice
        .default_case
        .as_deref()
        .or_else(|| choice.cases.first().map(|c| c.name.as_str()))
        .unwrap_or_default()
}

/// First case that is not an affirmative, else the literal `No`.
///
/// `default_case` is not consulted for switches.
fn default_switch_case(choice: &ChoiceOption) -> &str {
    choice
        .cases
        .iter()
        .map(|c| c.name.as_str())
        .find(|name| !is_affirmative(name))
        .unwrap_or("No")
}

fn is_affirmative(name: &str) -> bool {
    name.eq_ignore_ascii_case("yes") || name.eq_ignore_ascii_case("y")
}

/// Flatten selections into ordered `(key, value)` pairs; first key wins
fn collect_values(
    names: &[String],
    options: &IndexMap<String, OptionDef>,
    source: ValueSource<'_>,
) -> OptionValues {
    let mut values = OptionValues::new();
    walk_options(names, options, source, &mut |selection| match selection {
        Selection::Choice {
            option_name, value, ..
        } => {
            values.entry(option_name.to_string()).or_insert(value);
        }
        Selection::Inputs { values: inputs, .. } => {
            for input in inputs {
                values.entry(input.key).or_insert(input.value);
            }
        }
    });
    values
}

/// Schema default values for the options below `names`
pub fn default_option_values(
    names: &[String],
    options: &IndexMap<String, OptionDef>,
) -> OptionValues {
    collect_values(names, options, ValueSource::Defaults)
}

/// The option set a task should store given its current values: every
/// option reached through the currently selected cases, with the stored
/// value where there is one and the default otherwise
pub fn expected_option_values(
    names: &[String],
    options: &IndexMap<String, OptionDef>,
    current: &OptionValues,
) -> OptionValues {
    collect_values(names, options, ValueSource::Current(current))
}
