//! Reads trigger filters out of a checked-in GitHub workflow file.

use serde_yaml::{Mapping, Value};
use std::path::Path;

use crate::error::{Result, WorkflowError};
use crate::trigger::{TriggerEvent, TriggerFilter};

/// Load the `on:` block of the workflow at `path`.
pub fn load_trigger_filter(path: &Path) -> Result<TriggerFilter> {
    let yaml = std::fs::read_to_string(path).map_err(|source| WorkflowError::WorkflowFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trigger_filter(&yaml)
}

/// Parse the `on:` block of a workflow document.
///
/// `on` may be a single event name, a list of names or a mapping. Listed
/// events without a `paths` list fire on every path. `paths-ignore` entries
/// become exclusions.
pub fn parse_trigger_filter(yaml: &str) -> Result<TriggerFilter> {
    let doc: Value = serde_yaml::from_str(yaml)?;
    let on = on_block(&doc)
        .ok_or_else(|| WorkflowError::InvalidWorkflow("missing `on` key".to_string()))?;

    let push = event_rules(on, TriggerEvent::Push)?;
    let pull_request = event_rules(on, TriggerEvent::PullRequest)?;
    TriggerFilter::from_rules(&push, &pull_request)
}

fn on_block(doc: &Value) -> Option<&Value> {
    let mapping = doc.as_mapping()?;
    // YAML 1.1 readers turn a bare `on` key into `true`.
    mapping
        .get(Value::String("on".to_string()))
        .or_else(|| mapping.get(Value::Bool(true)))
}

fn event_rules(on: &Value, event: TriggerEvent) -> Result<Vec<String>> {
    let key = event.key();
    match on {
        Value::String(name) if name == key => Ok(vec!["**".to_string()]),
        Value::Sequence(names) => {
            let listed = names.iter().any(|n| n.as_str() == Some(key));
            Ok(if listed { vec!["**".to_string()] } else { Vec::new() })
        }
        Value::Mapping(events) => match events.get(Value::String(key.to_string())) {
            None => Ok(Vec::new()),
            Some(Value::Null) => Ok(vec!["**".to_string()]),
            Some(Value::Mapping(config)) => rules_from_config(config, key),
            Some(_) => Err(WorkflowError::InvalidWorkflow(format!(
                "`on.{key}` must be a mapping"
            ))),
        },
        _ => Ok(Vec::new()),
    }
}

fn rules_from_config(config: &Mapping, key: &str) -> Result<Vec<String>> {
    let mut rules = match config.get(Value::String("paths".to_string())) {
        Some(paths) => string_list(paths, key, "paths")?,
        None => vec!["**".to_string()],
    };
    if let Some(ignored) = config.get(Value::String("paths-ignore".to_string())) {
        rules.extend(
            string_list(ignored, key, "paths-ignore")?
                .into_iter()
                .map(|p| format!("!{p}")),
        );
    }
    Ok(rules)
}

fn string_list(value: &Value, key: &str, field: &str) -> Result<Vec<String>> {
    let items = value.as_sequence().ok_or_else(|| {
        WorkflowError::InvalidWorkflow(format!("`on.{key}.{field}` must be a list"))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                WorkflowError::InvalidWorkflow(format!(
                    "`on.{key}.{field}` entries must be strings"
                ))
            })
        })
        .collect()
}
