//! Integration tests for override compilation and the task list builder
//!
//! These tests verify:
//! - Fragments layer task first, then options in walk order, later wins
//! - Input placeholders are typed by their pipeline type
//! - Only checked, known tasks are planned, in stored order

mod common;

use common::SAMPLE_INTERFACE;
use muu::config::{default_config, sync_config};
use muu::models::{OptionValues, TaskStatus};
use muu::schema::parse_interface;
use muu::services::{build_task_list, compile_task_override};
use muu::{Interface, InterfaceConfig};
use serde_json::{Value, json};

fn interface_from(value: Value) -> Interface {
    parse_interface(value.to_string().as_bytes()).unwrap()
}

fn sample_interface() -> Interface {
    parse_interface(SAMPLE_INTERFACE.as_bytes()).unwrap()
}

fn hard_config(interface: &Interface, x: &str) -> InterfaceConfig {
    let mut config = default_config(interface);
    config.task[0].set_option("Diff", "Hard");
    sync_config(interface, &mut config);
    config.task[0].set_option("Sub.x", x);
    config
}

#[test]
fn test_plan_uses_default_selections() {
    let interface = sample_interface();
    let config = default_config(&interface);

    let plan = build_task_list(&interface, &config);

    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].entry, "RunEntry");
    assert_eq!(plan[0].id, config.task[0].id);
    assert!(plan.iter().all(|p| p.status == TaskStatus::Pending));
    assert!(plan.iter().all(|p| p.started_at.is_none()));
    assert_eq!(
        serde_json::to_value(&plan[0].pipeline_override).unwrap(),
        json!({"RunEntry": {"enabled": true, "level": 1}})
    );
}

#[test]
fn test_nested_input_substituted_as_int() {
    let interface = sample_interface();
    let config = hard_config(&interface, "7");

    let plan = build_task_list(&interface, &config);

    assert_eq!(
        serde_json::to_value(&plan[0].pipeline_override).unwrap(),
        json!({"RunEntry": {"enabled": true, "level": 3, "repeat": 7}})
    );
}

#[test]
fn test_unparseable_int_stays_text() {
    let interface = sample_interface();
    let config = hard_config(&interface, "many");

    let plan = build_task_list(&interface, &config);
    assert_eq!(plan[0].pipeline_override["RunEntry"]["repeat"], json!("many"));
}

#[test]
fn test_option_fragment_overrides_task_fragment() {
    let mut schema: Value = serde_json::from_str(SAMPLE_INTERFACE).unwrap();
    schema["task"][0]["pipeline_override"] = json!({"RunEntry": {"level": 0, "note": "task"}});
    let interface = interface_from(schema);
    let task = interface.find_task("Run").unwrap();

    let values: OptionValues = [("Diff".to_string(), "Hard".to_string())].into_iter().collect();
    let merged = compile_task_override(task, &interface.options, &values);

    // Sub.x is not stored, so the input default applies
    assert_eq!(
        serde_json::to_value(&merged).unwrap(),
        json!({"RunEntry": {"level": 3, "note": "task", "repeat": 5}})
    );
}

#[test]
fn test_text_placeholders_replaced_inline() {
    let mut schema: Value = serde_json::from_str(SAMPLE_INTERFACE).unwrap();
    schema["option"]["Sub"]["inputs"] = json!([
        {"name": "x", "default": "5", "pipeline_type": "int"},
        {"name": "who", "default": "bob"}
    ]);
    schema["option"]["Sub"]["pipeline_override"] = json!({
        "RunEntry": {"text": "{who} x{x}", "list": ["{x}", {"nested": "{who}"}]}
    });
    let interface = interface_from(schema);
    let task = interface.find_task("Run").unwrap();

    let values: OptionValues = [("Diff".to_string(), "Hard".to_string())].into_iter().collect();
    let merged = compile_task_override(task, &interface.options, &values);

    assert_eq!(merged["RunEntry"]["text"], json!("bob x5"));
    assert_eq!(merged["RunEntry"]["list"], json!([5, {"nested": "bob"}]));
}

#[test]
fn test_plan_skips_unchecked_and_unknown_tasks() {
    let interface = sample_interface();
    let mut config = default_config(&interface);
    config.task[0].checked = false;

    let mut unknown = config.task[1].clone();
    unknown.id = "stale".to_string();
    unknown.name = "Removed".to_string();
    config.task.insert(0, unknown);

    let plan = build_task_list(&interface, &config);

    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].name, "Collect");
}

#[test]
fn test_plan_keeps_stored_order() {
    let interface = sample_interface();
    let mut config = default_config(&interface);
    config.task.reverse();

    let plan = build_task_list(&interface, &config);
    let entries: Vec<_> = plan.iter().map(|p| p.entry.as_str()).collect();
    assert_eq!(entries, vec!["CollectEntry", "RunEntry"]);
}

#[test]
fn test_switch_yes_selects_first_case_fragment() {
    let interface = sample_interface();
    let mut config = default_config(&interface);
    config.task[1].set_option("Fast", "Yes");

    let plan = build_task_list(&interface, &config);
    assert_eq!(plan[1].pipeline_override["CollectEntry"]["fast"], json!(true));
}
