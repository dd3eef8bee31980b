use super::overrides::compile_task_override;
use crate::models::{Interface, InterfaceConfig, PlanItem};
use tracing::{debug, warn};

/// Build the execution plan from the checked tasks of `config`.
///
/// Tasks keep their stored order. A stored task whose name no longer exists
/// in the interface is skipped.
pub fn build_task_list(interface: &Interface, config: &InterfaceConfig) -> Vec<PlanItem> {
    let mut plan = Vec::new();

    for stored in config.task.iter().filter(|t| t.checked) {
        let Some(task) = interface.find_task(&stored.name) else {
            warn!("Skipping unknown task {} ({})", stored.name, stored.id);
            continue;
        };

        let pipeline_override =
            compile_task_override(task, &interface.options, &stored.option_values());
        debug!(
            "Planned {} -> {} with {} override entries",
            task.name,
            task.entry,
            pipeline_override.len()
        );

        plan.push(PlanItem::new(
            stored.id.clone(),
            task.name.clone(),
            task.entry.clone(),
            pipeline_override,
        ));
    }

    plan
}
