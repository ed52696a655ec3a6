use crate::{
    command::{ShellCommand, SparkSubmitCommand},
    instance::DataSourceInstance,
    job::JobDefinition,
    shell::SimulatedProcess,
    task::LineageTask,
};

/// Extension points for input the built-in analysis does not understand.
///
/// Every method has a default that logs and returns [`LineageTask::unknown`];
/// implementors override the ones they can do better on.
pub trait LineageHooks: Send + Sync {
    /// A task type without built-in analysis.
    fn analyze_other_task(&self, job: &JobDefinition) -> LineageTask {
        log::warn!("Unsupported task type: {}", job.task_type);
        LineageTask::unknown()
    }

    /// A shell command that is neither ignored nor one of the known clients.
    fn analyze_other_shell_command(
        &self,
        _process: &dyn SimulatedProcess,
        command: &ShellCommand,
    ) -> LineageTask {
        log::warn!("Unsupported shell command: {}", command);
        LineageTask::unknown()
    }

    /// A SQL batch that failed to parse or contains an unsupported statement.
    fn analyze_other_sql(&self, _instance: &DataSourceInstance, sql: &str) -> LineageTask {
        log::warn!("Unsupported sql: {}", sql);
        LineageTask::unknown()
    }

    /// A spark job submission; its lineage depends on the submitted application.
    fn analyze_spark_submit(
        &self,
        _process: &dyn SimulatedProcess,
        command: &SparkSubmitCommand,
    ) -> LineageTask {
        log::warn!(
            "No lineage analysis for spark application {}",
            command.application
        );
        LineageTask::unknown()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl LineageHooks for DefaultHooks {}
