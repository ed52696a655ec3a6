use crate::{
    analyzer::Analyzer,
    command::{BeelineCommand, ShellCommand, SparkSubmitCommand},
    instance::DataSourceInstance,
    shell::SimulatedProcess,
    task::LineageTask,
};

const PYTHON_INTERPRETERS: &[&str] = &["python", "python2", "python3"];

impl Analyzer<'_> {
    /// Lineage of a whole script: every command delivered by the simulator is
    /// analyzed and accumulated in order.
    pub fn analyze_shell_script(&self, script: &str) -> LineageTask {
        let mut lineage = LineageTask::empty();
        let simulation = self.shell_simulator.simulate(
            script,
            &mut |process: &dyn SimulatedProcess, command: &ShellCommand| {
                lineage.merge_into(&self.analyze_shell_command(process, command));
            },
        );
        if let Err(err) = simulation {
            log::warn!("Failed to simulate shell script due to error: {}", err);
            lineage.merge_into(&LineageTask::unknown());
        }
        lineage
    }

    pub fn analyze_shell_command(
        &self,
        process: &dyn SimulatedProcess,
        command: &ShellCommand,
    ) -> LineageTask {
        let name = command.name.as_str();
        if self.settings.is_ignored(name) {
            return LineageTask::empty();
        }

        if name == self.settings.beeline_command {
            return self.analyze_beeline_command(process, command);
        }

        if name == self.settings.spark_submit_command {
            return match SparkSubmitCommand::parse(&command.params) {
                Ok(spark_submit) => self.hooks.analyze_spark_submit(process, &spark_submit),
                Err(err) => {
                    log::warn!("{}", err);
                    LineageTask::unknown()
                }
            };
        }

        if let Some(datax_params) = self.datax_params(command) {
            let Some(config_path) = datax_params.last() else {
                log::warn!("Missing DataX job config in command: {}", command);
                return LineageTask::unknown();
            };
            return match process.read_file(config_path) {
                Some(config_content) => self.analyze_datax_config(&config_content),
                None => {
                    log::warn!("DataX job config {} is not readable", config_path);
                    LineageTask::unknown()
                }
            };
        }

        self.hooks.analyze_other_shell_command(process, command)
    }

    /// Arguments of a DataX invocation, run directly or through a python
    /// interpreter.
    fn datax_params<'c>(&self, command: &'c ShellCommand) -> Option<&'c [String]> {
        let datax = self.settings.datax_command.as_str();
        if command.name == datax {
            return Some(command.params.as_slice());
        }
        if PYTHON_INTERPRETERS.contains(&command.name.as_str())
            && command.params.first().is_some_and(|script| script == datax)
        {
            return Some(&command.params[1..]);
        }
        None
    }

    /// SQL passed with `-e`, or read from the file passed with `-f`, run against
    /// the instance of the `-u` url.
    pub fn analyze_beeline_command(
        &self,
        process: &dyn SimulatedProcess,
        command: &ShellCommand,
    ) -> LineageTask {
        let beeline = match BeelineCommand::parse(&command.params) {
            Ok(beeline) => beeline,
            Err(err) => {
                log::warn!("{} in command: {}", err, command);
                return LineageTask::unknown();
            }
        };

        let sql = match (&beeline.execute, &beeline.filename) {
            (Some(sql), _) => sql.to_owned(),
            (None, Some(filename)) => match process.read_file(filename) {
                Some(sql) => sql,
                None => {
                    log::warn!("Beeline sql file {} is not readable", filename);
                    return LineageTask::unknown();
                }
            },
            (None, None) => {
                log::warn!("No sql found in beeline command: {}", command);
                return LineageTask::unknown();
            }
        };

        let instance = match &beeline.url {
            Some(url) => self.registry.resolve_by_connection_url(
                url,
                beeline.username.as_deref(),
                beeline.password.as_deref(),
            ),
            None => DataSourceInstance::Unknown,
        };
        self.analyze_sql(&instance, &sql)
    }
}
