use std::hash::{Hash, Hasher};

use serde::Serialize;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceKind {
    Unknown,
    Hive,
    #[strum(serialize = "MYSQL")]
    #[serde(rename = "MYSQL")]
    MySql,
    Hdfs,
}

/// A data source a job reads from or writes to.
///
/// Two instances are the same identity when their connection fields match: the
/// display `name` never takes part in equality or hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceInstance {
    Unknown,
    Hive(HiveInstance),
    #[serde(rename = "MYSQL")]
    MySql(MySqlInstance),
    Hdfs(HdfsInstance),
}

impl DataSourceInstance {
    pub fn kind(&self) -> DataSourceKind {
        match self {
            DataSourceInstance::Unknown => DataSourceKind::Unknown,
            DataSourceInstance::Hive(_) => DataSourceKind::Hive,
            DataSourceInstance::MySql(_) => DataSourceKind::MySql,
            DataSourceInstance::Hdfs(_) => DataSourceKind::Hdfs,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            DataSourceInstance::Unknown => None,
            DataSourceInstance::Hive(hive) => hive.name.as_deref(),
            DataSourceInstance::MySql(mysql) => mysql.name.as_deref(),
            DataSourceInstance::Hdfs(hdfs) => hdfs.name.as_deref(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DataSourceInstance::Unknown)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HiveInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub hosts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl PartialEq for HiveInstance {
    fn eq(&self, other: &Self) -> bool {
        self.hosts == other.hosts
            && self.username == other.username
            && self.password == other.password
            && self.schema == other.schema
    }
}

impl Eq for HiveInstance {}

impl Hash for HiveInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hosts.hash(state);
        self.username.hash(state);
        self.password.hash(state);
        self.schema.hash(state);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MySqlInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl PartialEq for MySqlInstance {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
            && self.port == other.port
            && self.username == other.username
            && self.password == other.password
            && self.schema == other.schema
    }
}

impl Eq for MySqlInstance {}

impl Hash for MySqlInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
        self.username.hash(state);
        self.password.hash(state);
        self.schema.hash(state);
    }
}

/// A distributed filesystem, optionally backed by an OBS object-storage bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HdfsInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub default_fs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub obs_access_key: Option<String>,
    #[serde(skip_serializing)]
    pub obs_secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_bucket: Option<String>,
}

pub const OBS_SCHEME: &str = "obs://";

impl HdfsInstance {
    pub fn new(default_fs: &str) -> Self {
        Self {
            default_fs: default_fs.to_owned(),
            ..Default::default()
        }
    }

    /// Filesystem rooted at `obs://<bucket>`.
    pub fn obs(endpoint: Option<&str>, bucket: &str) -> Self {
        Self {
            name: None,
            default_fs: format!("{}{}", OBS_SCHEME, bucket),
            obs_endpoint: endpoint.map(str::to_owned),
            obs_access_key: None,
            obs_secret_key: None,
            obs_bucket: Some(bucket.to_owned()),
        }
    }
}

impl PartialEq for HdfsInstance {
    fn eq(&self, other: &Self) -> bool {
        self.default_fs == other.default_fs
            && self.obs_endpoint == other.obs_endpoint
            && self.obs_access_key == other.obs_access_key
            && self.obs_secret_key == other.obs_secret_key
            && self.obs_bucket == other.obs_bucket
    }
}

impl Eq for HdfsInstance {}

impl Hash for HdfsInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.default_fs.hash(state);
        self.obs_endpoint.hash(state);
        self.obs_access_key.hash(state);
        self.obs_secret_key.hash(state);
        self.obs_bucket.hash(state);
    }
}

/// A table (or table-like object) living in a data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DataNode {
    pub instance: Option<DataSourceInstance>,
    pub schema: Option<String>,
    pub table: Option<String>,
}

impl DataNode {
    pub fn new(instance: &DataSourceInstance, schema: Option<&str>, table: Option<&str>) -> Self {
        Self {
            instance: Some(instance.clone()),
            schema: schema.map(str::to_owned),
            table: table.map(str::to_owned),
        }
    }

    /// `schema.table`, or just the table when the schema is not known.
    pub fn qualified_name(&self) -> String {
        match (&self.schema, &self.table) {
            (Some(schema), Some(table)) => format!("{}.{}", schema, table),
            (None, Some(table)) => table.to_owned(),
            (Some(schema), None) => format!("{}.", schema),
            (None, None) => String::new(),
        }
    }
}
