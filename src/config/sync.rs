use crate::models::{
    ConfigController, ConfigTask, ConfigTaskOption, Interface, InterfaceConfig,
};
use crate::services::options::{default_option_values, expected_option_values};
use tracing::{debug, info};
use uuid::Uuid;

/// Fresh config for `interface`: first controller, first resource, and
/// every task in declaration order with its default options.
pub fn default_config(interface: &Interface) -> InterfaceConfig {
    let controller = interface
        .controllers
        .first()
        .map(|c| ConfigController {
            name: c.name.clone(),
            kind: c.kind.as_str().to_string(),
        })
        .unwrap_or_default();

    let resource = interface
        .resources
        .first()
        .map(|r| r.name.clone())
        .unwrap_or_default();

    let task = interface
        .tasks
        .iter()
        .map(|task| ConfigTask {
            id: Uuid::new_v4().to_string(),
            name: task.name.clone(),
            checked: task.default_check,
            option: default_option_values(&task.options, &interface.options)
                .into_iter()
                .map(|(name, value)| ConfigTaskOption { name, value })
                .collect(),
        })
        .collect();

    InterfaceConfig {
        controller,
        adb: None,
        win32: None,
        resource,
        task,
    }
}

/// Reconcile `config` with `interface`. Returns whether anything changed.
///
/// For each stored task that still exists, the option list is rebuilt from
/// the options reachable through its current selections: stored values are
/// kept, newly reachable options get their defaults, and options that are
/// no longer reachable are dropped. Stored tasks unknown to the interface
/// are left untouched. A selected controller or resource that no longer
/// exists is reset to the first declared one.
pub fn sync_config(interface: &Interface, config: &mut InterfaceConfig) -> bool {
    let mut changed = sync_selection(interface, config);

    for stored in &mut config.task {
        let Some(task) = interface.find_task(&stored.name) else {
            continue;
        };

        let current = stored.option_values();
        let option = expected_option_values(&task.options, &interface.options, &current)
            .into_iter()
            .map(|(name, computed)| {
                let value = current.get(&name).cloned().unwrap_or(computed);
                ConfigTaskOption { name, value }
            })
            .collect::<Vec<_>>();

        if option != stored.option {
            debug!(
                "Task {} options changed: {} -> {} entries",
                stored.name,
                stored.option.len(),
                option.len()
            );
            stored.option = option;
            changed = true;
        }
    }

    changed
}

fn sync_selection(interface: &Interface, config: &mut InterfaceConfig) -> bool {
    let mut changed = false;

    match interface.find_controller(&config.controller.name) {
        Some(controller) => {
            if config.controller.kind != controller.kind.as_str() {
                info!(
                    "Correcting type of controller {} to {}",
                    controller.name, controller.kind
                );
                config.controller.kind = controller.kind.as_str().to_string();
                changed = true;
            }
        }
        None => {
            if let Some(first) = interface.controllers.first() {
                info!(
                    "Controller {:?} no longer exists, selecting {}",
                    config.controller.name, first.name
                );
                config.controller = ConfigController {
                    name: first.name.clone(),
                    kind: first.kind.as_str().to_string(),
                };
                changed = true;
            }
        }
    }

    if interface.find_resource(&config.resource).is_none()
        && let Some(first) = interface.resources.first()
    {
        info!(
            "Resource {:?} no longer exists, selecting {}",
            config.resource, first.name
        );
        config.resource = first.name.clone();
        changed = true;
    }

    changed
}
