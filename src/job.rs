use anyhow::anyhow;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use strum_macros::{Display, EnumString};

/// A scheduler task definition record.
///
/// `task_params` is usually the JSON-encoded string stored by the scheduler,
/// but an already decoded JSON object is accepted as well.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobDefinition {
    #[serde(alias = "taskType")]
    pub task_type: String,
    #[serde(alias = "taskParams", default)]
    pub task_params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl JobDefinition {
    pub fn new(task_type: &str, task_params: &str) -> Self {
        Self {
            task_type: task_type.to_owned(),
            task_params: Value::String(task_params.to_owned()),
            name: None,
        }
    }

    pub fn kind(&self) -> Option<TaskKind> {
        self.task_type.parse().ok()
    }

    pub fn params<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        match &self.task_params {
            Value::String(raw) => serde_json::from_str(raw),
            value => T::deserialize(value),
        }
        .map_err(|err| {
            anyhow!(
                "Invalid parameters for {} task due to error: {}",
                self.task_type,
                err
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Dependent,
    Conditions,
    DataQuality,
    Sql,
    Shell,
    Spark,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlTaskParams {
    #[serde(alias = "datasource")]
    pub datasource_id: i64,
    pub sql: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptTaskParams {
    #[serde(alias = "rawScript")]
    pub raw_script: String,
}
