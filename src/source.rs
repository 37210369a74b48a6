//! Loading task snapshots from JSON documents.

use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::task::RawTask;

const ID_KEYS: [&str; 2] = ["id", "taskid"];
const ASSIGNEE_KEYS: [&str; 2] = ["assignee", "assignee_username"];

/// Read and validate tasks from a JSON file.
pub fn load_tasks(path: impl AsRef<Path>) -> Result<Vec<RawTask>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
    parse_tasks(&text, &path.display().to_string())
}

/// Parse a JSON document holding either an array of tasks or an object with
/// a `tasks` array. Elements that fail validation are dropped with a warning;
/// a document with no valid element at all is an error.
pub fn parse_tasks(json: &str, origin: &str) -> Result<Vec<RawTask>> {
    let document: Value = serde_json::from_str(json)?;
    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("tasks") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::InvalidData(format!(
                    "{origin}: expected an array of tasks or an object with a \"tasks\" array"
                )))
            }
        },
        _ => {
            return Err(Error::InvalidData(format!(
                "{origin}: expected an array of tasks"
            )))
        }
    };

    let total = items.len();
    let mut tasks = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        match validate_task(item) {
            Ok(task) => tasks.push(task),
            Err(reason) => log::debug!("{origin}: skipping element {index}: {reason}"),
        }
    }

    if tasks.is_empty() {
        return Err(Error::NoValidTasks(origin.to_string()));
    }
    if tasks.len() < total {
        log::warn!(
            "{origin}: dropped {} of {total} task records that failed validation",
            total - tasks.len()
        );
    }
    log::info!("Loaded {} tasks from {origin}", tasks.len());
    Ok(tasks)
}

fn field<'a>(map: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

/// Require an integer id, a string title and a string assignee, then
/// deserialize the rest.
fn validate_task(item: Value) -> std::result::Result<RawTask, String> {
    let Value::Object(map) = &item else {
        return Err("not an object".to_string());
    };
    match field(map, &ID_KEYS) {
        Some(v) if v.is_i64() => {}
        Some(v) => return Err(format!("non-integer id {v}")),
        None => return Err("missing id".to_string()),
    }
    if !map.get("title").is_some_and(Value::is_string) {
        return Err("title must be a string".to_string());
    }
    if !field(map, &ASSIGNEE_KEYS).is_some_and(Value::is_string) {
        return Err("assignee must be a string".to_string());
    }
    serde_json::from_value(item).map_err(|e| e.to_string())
}
