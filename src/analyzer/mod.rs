//! Job dispatch: routes a scheduler task to SQL, shell or extension analysis.
pub mod datax;
pub mod hooks;
pub mod shell;
pub mod sql;

use std::fmt::Display;

use crate::{
    analyzer::hooks::{DefaultHooks, LineageHooks},
    config::ShellSettings,
    environment::DataSourceResolver,
    expression::ExpressionInterpreter,
    instance::DataSourceInstance,
    job::{JobDefinition, ScriptTaskParams, SqlTaskParams, TaskKind},
    registry::InstanceRegistry,
    shell::{ScriptSimulator, ShellSimulator},
    sql::{HiveParser, SqlParser},
    task::LineageTask,
};

/// Errors that are not lineage results: the caller has to fix its setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineageError {
    /// A SQL task was analyzed without a data source environment.
    MissingEnvironment { task_kind: String },
}

impl Display for LineageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineageError::MissingEnvironment { task_kind } => write!(
                f,
                "Cannot analyze {} task: no data source environment is bound",
                task_kind
            ),
        }
    }
}

impl std::error::Error for LineageError {}

/// Lineage analyzer for scheduler jobs.
///
/// The registry is borrowed read-only, so one analyzer can be shared across
/// threads and analyze jobs in parallel.
pub struct Analyzer<'a> {
    registry: &'a InstanceRegistry,
    environment: Option<&'a dyn DataSourceResolver>,
    settings: ShellSettings,
    interpreter: ExpressionInterpreter,
    sql_parser: Box<dyn SqlParser>,
    shell_simulator: Box<dyn ShellSimulator>,
    hooks: Box<dyn LineageHooks>,
}

impl<'a> Analyzer<'a> {
    pub fn new(registry: &'a InstanceRegistry) -> Self {
        Self {
            registry,
            environment: None,
            settings: ShellSettings::default(),
            interpreter: ExpressionInterpreter::new(),
            sql_parser: Box::new(HiveParser),
            shell_simulator: Box::new(ScriptSimulator),
            hooks: Box::new(DefaultHooks),
        }
    }

    pub fn with_environment(mut self, environment: &'a dyn DataSourceResolver) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_settings(mut self, settings: ShellSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_interpreter(mut self, interpreter: ExpressionInterpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_sql_parser(mut self, sql_parser: impl SqlParser + 'static) -> Self {
        self.sql_parser = Box::new(sql_parser);
        self
    }

    pub fn with_shell_simulator(mut self, shell_simulator: impl ShellSimulator + 'static) -> Self {
        self.shell_simulator = Box::new(shell_simulator);
        self
    }

    pub fn with_hooks(mut self, hooks: impl LineageHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn registry(&self) -> &InstanceRegistry {
        self.registry
    }

    /// Infers the lineage of one task definition.
    ///
    /// Analysis failures are reported as [`LineageTask::unknown`]; the only error
    /// is a SQL task analyzed without an environment.
    pub fn analyze_job(&self, job: &JobDefinition) -> Result<LineageTask, LineageError> {
        let Some(kind) = job.kind() else {
            return Ok(self.hooks.analyze_other_task(job));
        };
        log::debug!("Analyzing {} task {:?}", kind, job.name);

        let lineage = match kind {
            TaskKind::Dependent | TaskKind::Conditions | TaskKind::DataQuality => {
                LineageTask::empty()
            }
            TaskKind::Sql => {
                let Some(environment) = self.environment else {
                    return Err(LineageError::MissingEnvironment {
                        task_kind: job.task_type.clone(),
                    });
                };
                let params = match job.params::<SqlTaskParams>() {
                    Ok(params) => params,
                    Err(err) => {
                        log::warn!("{}", err);
                        return Ok(LineageTask::unknown());
                    }
                };
                let instance = environment
                    .resolve_data_source(params.datasource_id)
                    .unwrap_or_else(|| {
                        log::warn!("Data source {} not found", params.datasource_id);
                        DataSourceInstance::Unknown
                    });
                self.analyze_sql(&instance, &self.interpreter.expand_all(&params.sql))
            }
            TaskKind::Shell | TaskKind::Spark => match job.params::<ScriptTaskParams>() {
                Ok(params) => {
                    self.analyze_shell_script(&self.interpreter.expand_all(&params.raw_script))
                }
                Err(err) => {
                    log::warn!("{}", err);
                    LineageTask::unknown()
                }
            },
        };
        Ok(lineage)
    }
}
