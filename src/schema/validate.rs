use super::SchemaError;
use super::raw::{RawController, RawInterface, RawOption, RawResource, RawTask};
use crate::models::{
    Agent, Case, ChoiceOption, Controller, ControllerKind, DisplayOption, Input, InputKind,
    Interface, OptionDef, OptionKind, Resource, Task, Win32Settings,
};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;

/// Validate a raw v2 document and convert it into the typed model.
///
/// Stops at the first violation. Checks run section by section in document
/// order: header, controllers, resources, agent, tasks, options.
pub(crate) fn validate_v2(raw: RawInterface) -> Result<Interface, SchemaError> {
    if raw.interface_version != 2 {
        return Err(SchemaError::VersionMismatch(raw.interface_version));
    }
    if raw.name.is_empty() {
        return Err(SchemaError::MissingName);
    }

    let mut controller_names = HashSet::new();
    let mut controllers = Vec::with_capacity(raw.controller.len());
    for (index, ctrl) in raw.controller.into_iter().enumerate() {
        controllers.push(convert_controller(index, ctrl, &mut controller_names)?);
    }

    let mut resource_names = HashSet::new();
    let mut resources = Vec::with_capacity(raw.resource.len());
    for (index, res) in raw.resource.into_iter().enumerate() {
        resources.push(convert_resource(
            index,
            res,
            &controller_names,
            &mut resource_names,
        )?);
    }

    let agent = match raw.agent {
        Some(agent) if agent.child_exec.is_empty() => return Err(SchemaError::AgentMissingExec),
        Some(agent) => Some(Agent {
            child_exec: agent.child_exec,
            child_args: agent.child_args,
            identifier: agent.identifier,
        }),
        None => None,
    };

    let mut tasks = Vec::with_capacity(raw.task.len());
    for (index, task) in raw.task.into_iter().enumerate() {
        tasks.push(convert_task(index, task, &resource_names, &raw.option)?);
    }

    let option_names: HashSet<String> = raw.option.keys().cloned().collect();
    let mut options = IndexMap::with_capacity(raw.option.len());
    for (name, opt) in raw.option {
        let def = convert_option(&name, opt, &option_names)?;
        options.insert(name, def);
    }

    Ok(Interface {
        name: raw.name,
        label: raw.label,
        title: raw.title,
        icon: raw.icon,
        version: raw.version,
        github: raw.github,
        contact: raw.contact,
        license: raw.license,
        welcome: raw.welcome,
        description: raw.description,
        mirrorchyan_rid: raw.mirrorchyan_rid,
        mirrorchyan_multiplatform: raw.mirrorchyan_multiplatform,
        languages: raw.languages,
        controllers,
        resources,
        agent,
        tasks,
        options,
    })
}

fn convert_controller(
    index: usize,
    ctrl: RawController,
    seen: &mut HashSet<String>,
) -> Result<Controller, SchemaError> {
    if ctrl.name.is_empty() {
        return Err(SchemaError::ControllerMissingName { index });
    }
    if !seen.insert(ctrl.name.clone()) {
        return Err(SchemaError::DuplicateController {
            index,
            name: ctrl.name,
        });
    }

    let kind = ControllerKind::parse(&ctrl.kind).ok_or_else(|| {
        SchemaError::InvalidControllerType {
            index,
            kind: ctrl.kind.clone(),
        }
    })?;

    let mut display = Vec::with_capacity(1);
    if let Some(side) = ctrl.display_short_side {
        display.push(DisplayOption::ShortSide(side));
    }
    if let Some(side) = ctrl.display_long_side {
        display.push(DisplayOption::LongSide(side));
    }
    if ctrl.display_raw {
        display.push(DisplayOption::Raw);
    }
    if display.len() > 1 {
        return Err(SchemaError::DisplayExclusive { index });
    }

    Ok(Controller {
        name: ctrl.name,
        label: ctrl.label,
        description: ctrl.description,
        icon: ctrl.icon,
        kind,
        display: display.pop(),
        win32: ctrl.win32.map(|w| Win32Settings {
            class_regex: w.class_regex,
            window_regex: w.window_regex,
            mouse: w.mouse,
            keyboard: w.keyboard,
            screencap: w.screencap,
        }),
    })
}

fn convert_resource(
    index: usize,
    res: RawResource,
    controllers: &HashSet<String>,
    seen: &mut HashSet<String>,
) -> Result<Resource, SchemaError> {
    if res.name.is_empty() {
        return Err(SchemaError::ResourceMissingName { index });
    }
    if !seen.insert(res.name.clone()) {
        return Err(SchemaError::DuplicateResource {
            index,
            name: res.name,
        });
    }
    if res.path.is_empty() {
        return Err(SchemaError::ResourceMissingPath { index });
    }
    if let Some(missing) = res.controller.iter().find(|c| !controllers.contains(*c)) {
        return Err(SchemaError::UnknownController {
            index,
            name: missing.clone(),
        });
    }

    Ok(Resource {
        name: res.name,
        label: res.label,
        description: res.description,
        icon: res.icon,
        paths: res.path,
        controllers: res.controller,
    })
}

fn convert_task(
    index: usize,
    task: RawTask,
    resources: &HashSet<String>,
    options: &IndexMap<String, RawOption>,
) -> Result<Task, SchemaError> {
    if task.name.is_empty() {
        return Err(SchemaError::TaskMissingName { index });
    }
    if task.entry.is_empty() {
        return Err(SchemaError::TaskMissingEntry { index });
    }
    if let Some(missing) = task.resource.iter().find(|r| !resources.contains(*r)) {
        return Err(SchemaError::UnknownResource {
            index,
            name: missing.clone(),
        });
    }
    if let Some(missing) = task.option.iter().find(|o| !options.contains_key(*o)) {
        return Err(SchemaError::UnknownTaskOption {
            index,
            name: missing.clone(),
        });
    }

    Ok(Task {
        name: task.name,
        label: task.label,
        entry: task.entry,
        default_check: task.default_check,
        description: task.description,
        icon: task.icon,
        resources: task.resource,
        pipeline_override: task.pipeline_override,
        options: task.option,
    })
}

fn convert_option(
    name: &str,
    opt: RawOption,
    option_names: &HashSet<String>,
) -> Result<OptionDef, SchemaError> {
    let kind = match opt.type_name() {
        type_name @ ("select" | "switch") => {
            let is_switch = type_name == "switch";
            let choice = convert_cases(name, is_switch, &opt, option_names)?;
            if is_switch {
                OptionKind::Switch(choice)
            } else {
                OptionKind::Select(choice)
            }
        }
        "input" => OptionKind::Input(convert_inputs(name, &opt)?),
        other => {
            return Err(SchemaError::InvalidOptionType {
                option: name.to_string(),
                kind: other.to_string(),
            });
        }
    };

    Ok(OptionDef {
        label: opt.label,
        description: opt.description,
        icon: opt.icon,
        kind,
        pipeline_override: opt.pipeline_override,
    })
}

fn convert_cases(
    name: &str,
    is_switch: bool,
    opt: &RawOption,
    option_names: &HashSet<String>,
) -> Result<ChoiceOption, SchemaError> {
    if opt.cases.is_empty() {
        return Err(SchemaError::MissingCases {
            option: name.to_string(),
        });
    }
    if is_switch && opt.cases.len() != 2 {
        return Err(SchemaError::SwitchCaseCount {
            option: name.to_string(),
            count: opt.cases.len(),
        });
    }

    let mut cases = Vec::with_capacity(opt.cases.len());
    for (index, case) in opt.cases.iter().enumerate() {
        if case.name.is_empty() {
            return Err(SchemaError::CaseMissingName {
                option: name.to_string(),
                index,
            });
        }
        if let Some(missing) = case.option.iter().find(|o| !option_names.contains(*o)) {
            return Err(SchemaError::UnknownCaseOption {
                option: name.to_string(),
                index,
                name: missing.clone(),
            });
        }
        cases.push(Case {
            name: case.name.clone(),
            label: case.label.clone(),
            description: case.description.clone(),
            icon: case.icon.clone(),
            options: case.option.clone(),
            pipeline_override: case.pipeline_override.clone(),
        });
    }

    let default_case = if opt.default_case.is_empty() {
        None
    } else if cases.iter().any(|c| c.name == opt.default_case) {
        Some(opt.default_case.clone())
    } else {
        return Err(SchemaError::UnknownDefaultCase {
            option: name.to_string(),
            name: opt.default_case.clone(),
        });
    };

    Ok(ChoiceOption {
        cases,
        default_case,
    })
}

fn convert_inputs(name: &str, opt: &RawOption) -> Result<Vec<Input>, SchemaError> {
    if opt.inputs.is_empty() {
        return Err(SchemaError::MissingInputs {
            option: name.to_string(),
        });
    }

    opt.inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            if input.name.is_empty() {
                return Err(SchemaError::InputMissingName {
                    option: name.to_string(),
                    index,
                });
            }
            let verify = if input.verify.is_empty() {
                None
            } else {
                let re = Regex::new(&input.verify).map_err(|source| {
                    SchemaError::InvalidInputPattern {
                        option: name.to_string(),
                        index,
                        source,
                    }
                })?;
                Some(re)
            };
            Ok(Input {
                name: input.name.clone(),
                label: input.label.clone(),
                description: input.description.clone(),
                default: input.default.clone(),
                kind: InputKind::from_pipeline_type(&input.pipeline_type),
                verify,
                pattern_msg: input.pattern_msg.clone(),
            })
        })
        .collect()
}
