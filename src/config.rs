use std::path::Path;

use anyhow::anyhow;
use indexmap::IndexSet;
use serde::Deserialize;

use crate::instance::HdfsInstance;

/// Operator-supplied configuration, usually read from a TOML file.
///
/// ```toml
/// [shell]
/// ignored_commands = ["echo", "sleep"]
///
/// [[hive]]
/// name = "warehouse"
/// hosts = ["10.0.0.1:2181", "10.0.0.2:2181"]
/// warehouse = { default_fs = "obs://dw-bucket", obs_endpoint = "obs.example.com", obs_bucket = "dw-bucket", root_path = "/user/hive/warehouse" }
///
/// [[mysql]]
/// name = "orders"
/// host = "10.0.1.1"
/// port = 3306
///
/// [[datasource]]
/// id = 1
/// url = "jdbc:hive2://10.0.0.1:2181,10.0.0.2:2181/default"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub shell: ShellSettings,
    #[serde(default)]
    pub hive: Vec<HiveClusterConfig>,
    #[serde(default)]
    pub mysql: Vec<MySqlServerConfig>,
    #[serde(default)]
    pub datasource: Vec<DataSourceConfig>,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content)
            .map_err(|err| anyhow!("Failed to parse engine configuration due to error: {}", err))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|_| {
            anyhow!(
                "Failed to read configuration file: {}",
                path.display().to_string()
            )
        })?;
        Self::from_toml_str(&content)
    }
}

/// How shell commands are recognized.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Commands without data lineage meaning.
    pub ignored_commands: IndexSet<String>,
    pub beeline_command: String,
    pub spark_submit_command: String,
    pub datax_command: String,
}

const DEFAULT_IGNORED_COMMANDS: &[&str] = &[
    ":", "[", "[[", "cat", "cd", "date", "echo", "exit", "export", "false", "hostname", "kinit",
    "ls", "mkdir", "printf", "pwd", "rm", "set", "sleep", "source", "test", "true", "unset", "wait",
];

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            ignored_commands: DEFAULT_IGNORED_COMMANDS
                .iter()
                .map(|&cmd| cmd.to_owned())
                .collect(),
            beeline_command: "beeline".to_owned(),
            spark_submit_command: "spark-submit".to_owned(),
            datax_command: "/data/datax/bin/datax.py".to_owned(),
        }
    }
}

impl ShellSettings {
    pub fn is_ignored(&self, command_name: &str) -> bool {
        self.ignored_commands.contains(command_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HiveClusterConfig {
    pub name: String,
    pub hosts: Vec<String>,
    pub warehouse: Option<WarehouseConfig>,
}

/// Filesystem location backing a Hive cluster's warehouse.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarehouseConfig {
    pub default_fs: String,
    pub obs_endpoint: Option<String>,
    pub obs_bucket: Option<String>,
    pub obs_access_key: Option<String>,
    pub obs_secret_key: Option<String>,
    pub root_path: String,
}

impl WarehouseConfig {
    pub fn hdfs_instance(&self) -> HdfsInstance {
        HdfsInstance {
            name: None,
            default_fs: self.default_fs.clone(),
            obs_endpoint: self.obs_endpoint.clone(),
            obs_access_key: self.obs_access_key.clone(),
            obs_secret_key: self.obs_secret_key.clone(),
            obs_bucket: self.obs_bucket.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MySqlServerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

/// A scheduler data source, addressed by its numeric id in task parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSourceConfig {
    pub id: i64,
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}
