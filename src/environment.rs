use std::collections::HashMap;

use crate::{config::EngineConfig, instance::DataSourceInstance, registry::InstanceRegistry};

/// Resolves the numeric data source ids used by SQL tasks.
pub trait DataSourceResolver: Send + Sync {
    fn resolve_data_source(&self, id: i64) -> Option<DataSourceInstance>;
}

/// A fixed id to instance table.
#[derive(Debug, Default, Clone)]
pub struct StaticEnvironment {
    data_sources: HashMap<i64, DataSourceInstance>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves every `[[datasource]]` url through the registry.
    pub fn from_config(config: &EngineConfig, registry: &InstanceRegistry) -> Self {
        let mut environment = Self::new();
        for data_source in &config.datasource {
            let instance = registry.resolve_by_connection_url(
                &data_source.url,
                data_source.user.as_deref(),
                data_source.password.as_deref(),
            );
            if instance.is_unknown() {
                log::warn!(
                    "Data source {} has an unsupported url: {}",
                    data_source.id,
                    data_source.url
                );
            }
            environment.insert(data_source.id, instance);
        }
        environment
    }

    pub fn insert(&mut self, id: i64, instance: DataSourceInstance) {
        self.data_sources.insert(id, instance);
    }
}

impl DataSourceResolver for StaticEnvironment {
    fn resolve_data_source(&self, id: i64) -> Option<DataSourceInstance> {
        self.data_sources.get(&id).cloned()
    }
}
