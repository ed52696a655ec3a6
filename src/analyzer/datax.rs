use std::collections::HashMap;

use anyhow::{anyhow, bail};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    analyzer::Analyzer,
    instance::{DataNode, HdfsInstance, OBS_SCHEME},
    task::LineageTask,
};

const MYSQL_READER: &str = "mysqlreader";
const HDFS_WRITER: &str = "hdfswriter";
const OBS_ENDPOINT_KEY: &str = "fs.obs.endpoint";

#[derive(Debug, Deserialize)]
struct DataxConfig {
    job: DataxJob,
}

#[derive(Debug, Deserialize)]
struct DataxJob {
    content: Vec<DataxContent>,
}

#[derive(Debug, Deserialize)]
struct DataxContent {
    reader: DataxPlugin,
    writer: DataxPlugin,
}

#[derive(Debug, Deserialize)]
struct DataxPlugin {
    name: String,
    #[serde(default)]
    parameter: Value,
}

#[derive(Debug, Deserialize)]
struct MysqlReaderParameter {
    username: Option<String>,
    password: Option<String>,
    #[serde(default)]
    connection: Vec<MysqlReaderConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MysqlReaderConnection {
    #[serde(default)]
    table: Vec<String>,
    #[serde(default)]
    jdbc_url: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HdfsWriterParameter {
    #[serde(rename = "defaultFS")]
    default_fs: Option<String>,
    path: Option<String>,
    #[serde(default)]
    hadoop_config: HashMap<String, Value>,
}

impl Analyzer<'_> {
    /// Lineage of a DataX job config: each reader adds a dependent node, each
    /// writer landing in a registered warehouse adds a generated node.
    pub fn analyze_datax_config(&self, config_content: &str) -> LineageTask {
        let config: DataxConfig = match serde_json::from_str(&escape_tabs(config_content)) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Invalid DataX config due to error: {}", err);
                return LineageTask::unknown();
            }
        };

        let mut lineage = LineageTask::empty();
        for content in &config.job.content {
            match self.datax_reader_node(&content.reader) {
                Ok(node) => lineage.add_dependent_node(node),
                Err(err) => {
                    log::warn!("{}", err);
                    return LineageTask::unknown();
                }
            }
            match self.datax_writer_node(&content.writer) {
                Ok(Some(node)) => lineage.add_generated_node(node),
                Ok(None) => {}
                Err(err) => {
                    log::warn!("{}", err);
                    return LineageTask::unknown();
                }
            }
        }
        lineage
    }

    fn datax_reader_node(&self, reader: &DataxPlugin) -> anyhow::Result<DataNode> {
        if reader.name != MYSQL_READER {
            bail!("Unsupported DataX reader: {}", reader.name);
        }
        let parameter = MysqlReaderParameter::deserialize(&reader.parameter)
            .map_err(|err| anyhow!("Invalid {} parameter due to error: {}", reader.name, err))?;
        let connection = parameter
            .connection
            .first()
            .ok_or_else(|| anyhow!("Missing `connection` in {} parameter", reader.name))?;
        let table = connection
            .table
            .first()
            .ok_or_else(|| anyhow!("Missing `connection[0].table` in {} parameter", reader.name))?;
        let jdbc_url = connection.jdbc_url.first().ok_or_else(|| {
            anyhow!(
                "Missing `connection[0].jdbcUrl` in {} parameter",
                reader.name
            )
        })?;

        let instance = self.registry.resolve_by_connection_url(
            jdbc_url,
            parameter.username.as_deref(),
            parameter.password.as_deref(),
        );
        Ok(DataNode::new(&instance, None, Some(table)))
    }

    /// `None` when the written path is outside every registered warehouse.
    fn datax_writer_node(&self, writer: &DataxPlugin) -> anyhow::Result<Option<DataNode>> {
        if writer.name != HDFS_WRITER {
            bail!("Unsupported DataX writer: {}", writer.name);
        }
        let parameter = HdfsWriterParameter::deserialize(&writer.parameter)
            .map_err(|err| anyhow!("Invalid {} parameter due to error: {}", writer.name, err))?;
        let (Some(default_fs), Some(path)) = (&parameter.default_fs, &parameter.path) else {
            bail!("Missing `defaultFS` or `path` in {} parameter", writer.name);
        };

        let hdfs_instance = match default_fs.strip_prefix(OBS_SCHEME) {
            Some(bucket) => HdfsInstance::obs(
                parameter
                    .hadoop_config
                    .get(OBS_ENDPOINT_KEY)
                    .and_then(Value::as_str),
                bucket.trim_matches('/'),
            ),
            None => HdfsInstance::new(default_fs),
        };
        let node = self.registry.resolve_warehouse_node(&hdfs_instance, path);
        if node.is_none() {
            log::debug!(
                "Path {} on {} is outside every registered warehouse",
                path,
                default_fs
            );
        }
        Ok(node)
    }
}

/// Escapes raw tabs inside string literals, which JSON does not allow. Tabs used
/// as indentation are kept.
fn escape_tabs(config_content: &str) -> String {
    let mut escaped = String::with_capacity(config_content.len());
    let mut in_string = false;
    let mut after_backslash = false;
    for c in config_content.chars() {
        if in_string && c == '\t' {
            escaped.push_str("\\t");
            after_backslash = false;
            continue;
        }
        match c {
            '\\' if in_string => after_backslash = !after_backslash,
            '"' => {
                if !after_backslash {
                    in_string = !in_string;
                }
                after_backslash = false;
            }
            _ => after_backslash = false,
        }
        escaped.push(c);
    }
    escaped
}
