use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{instance::DataNode, job::JobDefinition};

pub const PARSING_TESTS_FILE: &str = "tests/parsing_tests.toml";
pub const LINEAGE_TESTS_FILE: &str = "tests/lineage_tests.toml";
pub const ENGINE_CONFIG_FILE: &str = "tests/engine.toml";

/// Evaluation instant used by tests that expand date macros.
pub const TEST_NOW: &str = "2024-07-31T10:36:00+08:00";

pub fn test_now() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(TEST_NOW).expect("TEST_NOW is a valid RFC 3339 date")
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestParsing {
    pub sql: String,
    /// Statements as rendered by their `Display` impl.
    pub statements: Vec<String>,
    /// Tables read by each `INSERT ... SELECT`, in statement order.
    #[serde(default)]
    pub references: Vec<Vec<String>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestParsingData {
    pub tests: Vec<TestParsing>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestLineage {
    pub description: String,
    pub task_type: String,
    /// Raw parameter JSON; built from `datasource`, `sql` and `raw_script` when absent.
    pub task_params: Option<String>,
    pub datasource: Option<i64>,
    pub sql: Option<String>,
    pub raw_script: Option<String>,
    #[serde(default)]
    pub unknown: bool,
    #[serde(default)]
    pub dependent_nodes: Vec<String>,
    #[serde(default)]
    pub generated_nodes: Vec<String>,
}

impl TestLineage {
    pub fn job(&self) -> JobDefinition {
        let task_params = match &self.task_params {
            Some(task_params) => task_params.to_owned(),
            None => {
                let mut params = Map::new();
                if let Some(datasource) = self.datasource {
                    params.insert("datasource".to_owned(), Value::from(datasource));
                }
                if let Some(sql) = &self.sql {
                    params.insert("sql".to_owned(), Value::from(sql.as_str()));
                }
                if let Some(raw_script) = &self.raw_script {
                    params.insert("rawScript".to_owned(), Value::from(raw_script.as_str()));
                }
                Value::Object(params).to_string()
            }
        };
        JobDefinition::new(&self.task_type, &task_params)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestLineageData {
    pub tests: Vec<TestLineage>,
}

/// `<instance name or kind>:<schema.table>`, e.g. `warehouse:dw.orders`.
pub fn node_label(node: &DataNode) -> String {
    let instance = match &node.instance {
        Some(instance) => instance
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| instance.kind().to_string()),
        None => "NONE".to_owned(),
    };
    format!("{}:{}", instance, node.qualified_name())
}

pub fn node_labels(nodes: &[DataNode]) -> Vec<String> {
    nodes.iter().map(node_label).collect()
}
