//! # hanlu
//!
//! Table-level data lineage for jobs of a workflow scheduler.
//!
//! # Features
//!
//! - Classifies scheduler task definitions (SQL, shell, spark, control-flow tasks).
//! - Expands the scheduler's `${...}` date macros before analysis.
//! - Parses Hive SQL batches and maps `INSERT ... SELECT`, `ALTER TABLE` and `TRUNCATE` statements to read and written tables.
//! - Simulates shell scripts and recognizes `beeline`, `spark-submit` and DataX invocations, including configs written by here-documents.
//! - Resolves JDBC urls and warehouse paths to canonical data source instances.
//! - Reports what could not be analyzed as *unknown* lineage instead of failing the batch.
//!
//! # Example
//!
//! ```rust,no_run
//! use hanlu::{
//!     analyzer::Analyzer,
//!     config::EngineConfig,
//!     environment::StaticEnvironment,
//!     job::JobDefinition,
//!     registry::InstanceRegistry,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     env_logger::init();
//!
//!     let config = EngineConfig::from_toml_str(
//!         r#"
//!         [[hive]]
//!         name = "warehouse"
//!         hosts = ["10.0.0.1:2181", "10.0.0.2:2181"]
//!
//!         [[datasource]]
//!         id = 1
//!         url = "jdbc:hive2://10.0.0.1:2181,10.0.0.2:2181/dw"
//!         "#,
//!     )?;
//!     let registry = InstanceRegistry::from_config(&config);
//!     let environment = StaticEnvironment::from_config(&config, &registry);
//!     let analyzer = Analyzer::new(&registry)
//!         .with_environment(&environment)
//!         .with_settings(config.shell.clone());
//!
//!     let job = JobDefinition::new(
//!         "SQL",
//!         r#"{"datasource": 1, "sql": "insert overwrite table dw.daily select * from ods.orders where dt = '${start(\"yyyyMMdd\",-1)}'"}"#,
//!     );
//!     let lineage = analyzer.analyze_job(&job)?;
//!
//!     println!("Reads: {:?}", lineage.dependent_nodes());
//!     println!("Writes: {:?}", lineage.generated_nodes());
//!     Ok(())
//! }
//! ```
pub mod analyzer;
pub mod command;
pub mod config;
pub mod environment;
pub mod expression;
pub mod instance;
pub mod job;
pub mod registry;
pub mod shell;
pub mod sql;
pub mod task;
pub mod test_utils;
