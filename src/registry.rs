use std::collections::HashMap;

use indexmap::IndexMap;

use crate::{
    config::EngineConfig,
    instance::{DataNode, DataSourceInstance, HdfsInstance, HiveInstance, MySqlInstance},
};

const JDBC_PREFIX: &str = "jdbc:";
const HIVE2_SCHEME: &str = "hive2://";
const MYSQL_SCHEME: &str = "mysql://";
const SCHEMA_DIR_SUFFIX: &str = ".db";

/// Known clusters and servers, used to turn connection strings and storage paths
/// into canonical data source instances.
///
/// Populated once through the `register_*` methods, then only read.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    hive_host_to_name: HashMap<String, String>,
    hive_name_to_hosts: HashMap<String, Vec<String>>,
    mysql_host_to_name: HashMap<String, String>,
    // root paths keep registration order: the first matching root wins
    warehouse_roots: HashMap<HdfsInstance, IndexMap<String, String>>,
}

/// A path that fell under a registered warehouse root.
struct WarehouseMatch<'a> {
    hive_name: &'a str,
    schema: &'a str,
    table: Option<&'a str>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        for hive in &config.hive {
            match &hive.warehouse {
                Some(warehouse) => registry.register_hive_cluster(
                    &hive.hosts,
                    &hive.name,
                    Some((warehouse.hdfs_instance(), warehouse.root_path.as_str())),
                ),
                None => registry.register_hive_cluster(&hive.hosts, &hive.name, None),
            }
        }
        for mysql in &config.mysql {
            registry.register_mysql_server(&mysql.host, mysql.port, &mysql.name);
        }
        log::debug!(
            "Registered {} hive cluster(s) and {} mysql server(s)",
            registry.hive_name_to_hosts.len(),
            registry.mysql_host_to_name.len()
        );
        registry
    }

    /// Registers a Hive cluster, optionally together with the filesystem root
    /// under which its warehouse stores table data.
    pub fn register_hive_cluster(
        &mut self,
        hosts: &[String],
        name: &str,
        warehouse: Option<(HdfsInstance, &str)>,
    ) {
        for host in hosts {
            self.hive_host_to_name
                .insert(host.to_owned(), name.to_owned());
        }
        self.hive_name_to_hosts
            .insert(name.to_owned(), hosts.to_vec());

        if let Some((hdfs_instance, root_path)) = warehouse {
            self.warehouse_roots
                .entry(hdfs_instance)
                .or_default()
                .insert(root_path.to_owned(), name.to_owned());
        }
    }

    pub fn register_mysql_server(&mut self, host: &str, port: u16, name: &str) {
        self.mysql_host_to_name
            .insert(format!("{}:{}", host, port), name.to_owned());
    }

    /// Resolves a JDBC url such as
    /// `jdbc:hive2://h1:2181,h2:2181/db;serviceDiscoveryMode=zooKeeper` or
    /// `jdbc:mysql://host:3306/db`. Unsupported urls resolve to `Unknown`.
    pub fn resolve_by_connection_url(
        &self,
        url: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> DataSourceInstance {
        let Some(url) = url.strip_prefix(JDBC_PREFIX) else {
            log::debug!("Not a jdbc url: {}", url);
            return DataSourceInstance::Unknown;
        };

        if let Some(hive_info) = url.strip_prefix(HIVE2_SCHEME) {
            let hive_info = hive_info.split(';').next().unwrap_or_default();
            let (hosts_str, schema) = split_schema(hive_info);
            let hosts: Vec<String> = hosts_str.split(',').map(str::to_owned).collect();
            return DataSourceInstance::Hive(HiveInstance {
                name: hosts
                    .first()
                    .and_then(|host| self.hive_host_to_name.get(host))
                    .cloned(),
                hosts,
                username: username.map(str::to_owned),
                password: password.map(str::to_owned),
                schema: schema.map(str::to_owned),
            });
        }

        if let Some(mysql_info) = url.strip_prefix(MYSQL_SCHEME) {
            let mysql_info = mysql_info.split('?').next().unwrap_or_default();
            let (host_and_port, schema) = split_schema(mysql_info);
            let Some((host, port)) = host_and_port.rsplit_once(':') else {
                log::warn!("Missing port in mysql jdbc url: {}", url);
                return DataSourceInstance::Unknown;
            };
            let Ok(port) = port.parse::<u16>() else {
                log::warn!("Invalid port `{}` in mysql jdbc url: {}", port, url);
                return DataSourceInstance::Unknown;
            };
            return DataSourceInstance::MySql(MySqlInstance {
                name: self.mysql_host_to_name.get(host_and_port).cloned(),
                host: host.to_owned(),
                port,
                username: username.map(str::to_owned),
                password: password.map(str::to_owned),
                schema: schema.map(str::to_owned),
            });
        }

        log::debug!("Unsupported jdbc url scheme: {}", url);
        DataSourceInstance::Unknown
    }

    /// Derives the Hive instance whose warehouse contains `path`.
    ///
    /// Root paths are tried in registration order and the first prefix match is
    /// used, even when a later root would be a longer match.
    pub fn resolve_from_filesystem_path(
        &self,
        instance: &HdfsInstance,
        path: &str,
    ) -> Option<DataSourceInstance> {
        let warehouse_match = self.match_warehouse(instance, path)?;
        self.hive_instance(warehouse_match.hive_name, warehouse_match.schema)
    }

    /// Like [`InstanceRegistry::resolve_from_filesystem_path`], also naming the
    /// table directory that follows the schema directory.
    pub fn resolve_warehouse_node(&self, instance: &HdfsInstance, path: &str) -> Option<DataNode> {
        let warehouse_match = self.match_warehouse(instance, path)?;
        let hive_instance = self.hive_instance(warehouse_match.hive_name, warehouse_match.schema)?;
        Some(DataNode::new(
            &hive_instance,
            Some(warehouse_match.schema),
            warehouse_match.table,
        ))
    }

    fn hive_instance(&self, hive_name: &str, schema: &str) -> Option<DataSourceInstance> {
        let hosts = self.hive_name_to_hosts.get(hive_name)?;
        Some(DataSourceInstance::Hive(HiveInstance {
            name: Some(hive_name.to_owned()),
            hosts: hosts.clone(),
            username: None,
            password: None,
            schema: Some(schema.to_owned()),
        }))
    }

    fn match_warehouse<'a>(
        &'a self,
        instance: &HdfsInstance,
        path: &'a str,
    ) -> Option<WarehouseMatch<'a>> {
        let roots = self.warehouse_roots.get(instance)?;
        let (root_path, hive_name) = roots
            .iter()
            .find(|(root_path, _)| path.starts_with(root_path.as_str()))?;

        let rest = &path[root_path.len()..];
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        let mut segments = rest.split('/');
        let schema_dir = segments.next().filter(|segment| !segment.is_empty())?;
        let schema = schema_dir
            .strip_suffix(SCHEMA_DIR_SUFFIX)
            .unwrap_or(schema_dir);
        let table = segments.next().filter(|segment| !segment.is_empty());

        log::debug!(
            "Path {} resolved under root {} of hive cluster {}",
            path,
            root_path,
            hive_name
        );
        Some(WarehouseMatch {
            hive_name,
            schema,
            table,
        })
    }
}

/// Splits `authority[/schema]`. An empty schema counts as absent.
fn split_schema(info: &str) -> (&str, Option<&str>) {
    match info.split_once('/') {
        Some((authority, schema)) => {
            let schema = schema.trim_end_matches('/');
            (authority, (!schema.is_empty()).then_some(schema))
        }
        None => (info, None),
    }
}
