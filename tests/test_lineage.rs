use hanlu::{
    analyzer::{Analyzer, LineageError, hooks::LineageHooks},
    command::SparkSubmitCommand,
    config::EngineConfig,
    environment::StaticEnvironment,
    expression::ExpressionInterpreter,
    instance::{DataNode, DataSourceInstance},
    job::JobDefinition,
    registry::InstanceRegistry,
    shell::SimulatedProcess,
    task::LineageTask,
    test_utils::{ENGINE_CONFIG_FILE, LINEAGE_TESTS_FILE, TestLineageData, node_labels, test_now},
};
use rayon::prelude::*;

fn load_config() -> EngineConfig {
    EngineConfig::load(std::path::Path::new(ENGINE_CONFIG_FILE))
        .expect("Cannot load engine configuration")
}

fn load_tests() -> TestLineageData {
    let lineage_test_file =
        std::fs::read_to_string(LINEAGE_TESTS_FILE).expect("Cannot open lineage test cases");
    toml::from_str(&lineage_test_file).expect("Cannot parse test cases defined in toml")
}

#[test]
fn test_lineage() {
    let config = load_config();
    let registry = InstanceRegistry::from_config(&config);
    let environment = StaticEnvironment::from_config(&config, &registry);
    let analyzer = Analyzer::new(&registry)
        .with_environment(&environment)
        .with_settings(config.shell.clone())
        .with_interpreter(ExpressionInterpreter::at(test_now()));

    for test in load_tests().tests {
        println!("Testing lineage: {}", test.description);
        let lineage = analyzer
            .analyze_job(&test.job())
            .expect("environment is bound");
        assert_eq!(lineage.is_unknown(), test.unknown);
        assert_eq!(node_labels(lineage.dependent_nodes()), test.dependent_nodes);
        assert_eq!(node_labels(lineage.generated_nodes()), test.generated_nodes);
    }
}

#[test]
fn test_parallel_lineage_matches_sequential() {
    let config = load_config();
    let registry = InstanceRegistry::from_config(&config);
    let environment = StaticEnvironment::from_config(&config, &registry);
    let analyzer = Analyzer::new(&registry)
        .with_environment(&environment)
        .with_settings(config.shell.clone())
        .with_interpreter(ExpressionInterpreter::at(test_now()));

    let jobs: Vec<JobDefinition> = load_tests().tests.iter().map(|test| test.job()).collect();
    let sequential: Vec<LineageTask> = jobs
        .iter()
        .map(|job| analyzer.analyze_job(job).expect("environment is bound"))
        .collect();
    let parallel: Vec<LineageTask> = jobs
        .par_iter()
        .map(|job| analyzer.analyze_job(job).expect("environment is bound"))
        .collect();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_sql_task_requires_environment() {
    let registry = InstanceRegistry::new();
    let analyzer = Analyzer::new(&registry);

    let sql_job = JobDefinition::new("SQL", r#"{"datasource": 1, "sql": "select 1"}"#);
    assert_eq!(
        analyzer.analyze_job(&sql_job),
        Err(LineageError::MissingEnvironment {
            task_kind: "SQL".to_owned()
        })
    );

    // other task kinds do not need one
    let shell_job = JobDefinition::new("SHELL", r#"{"rawScript": "echo 1"}"#);
    assert_eq!(analyzer.analyze_job(&shell_job), Ok(LineageTask::empty()));
}

#[test]
fn test_job_definition_formats() {
    let config = load_config();
    let registry = InstanceRegistry::from_config(&config);
    let environment = StaticEnvironment::from_config(&config, &registry);
    let analyzer = Analyzer::new(&registry).with_environment(&environment);

    let decoded_params: JobDefinition = serde_json::from_str(
        r#"{"taskType": "SQL", "taskParams": {"datasource": 1, "sql": "insert into dw.t select * from ods.t"}, "name": "load_t"}"#,
    )
    .expect("valid job definition");
    let encoded_params: JobDefinition = serde_json::from_str(
        r#"{"task_type": "SQL", "task_params": "{\"datasource_id\": 1, \"sql\": \"insert into dw.t select * from ods.t\"}"}"#,
    )
    .expect("valid job definition");
    assert_eq!(decoded_params.name.as_deref(), Some("load_t"));

    for job in [decoded_params, encoded_params] {
        let lineage = analyzer.analyze_job(&job).expect("environment is bound");
        assert!(!lineage.is_unknown());
        assert_eq!(node_labels(lineage.dependent_nodes()), vec!["warehouse:ods.t"]);
        assert_eq!(node_labels(lineage.generated_nodes()), vec!["warehouse:dw.t"]);
    }
}

#[test]
fn test_default_settings_ignore_exit_status_checks() {
    let config = load_config();
    let registry = InstanceRegistry::from_config(&config);
    let analyzer = Analyzer::new(&registry);

    let shell_job = JobDefinition::new(
        "SHELL",
        r#"{"rawScript": "beeline -u jdbc:hive2://10.0.0.1:2181/dw -e 'insert into dw.t select * from ods.t'\nif [ $? -ne 0 ]; then exit 1; fi\n[[ -f /tmp/done ]] || test -d /tmp"}"#,
    );
    let lineage = analyzer
        .analyze_job(&shell_job)
        .expect("shell tasks need no environment");
    assert!(!lineage.is_unknown());
    assert_eq!(node_labels(lineage.dependent_nodes()), vec!["warehouse:ods.t"]);
    assert_eq!(node_labels(lineage.generated_nodes()), vec!["warehouse:dw.t"]);
}

/// Treats the first application argument of a spark job as the table it writes.
struct SparkTableHooks;

impl LineageHooks for SparkTableHooks {
    fn analyze_spark_submit(
        &self,
        _process: &dyn SimulatedProcess,
        command: &SparkSubmitCommand,
    ) -> LineageTask {
        let Some((schema, table)) = command
            .application_arguments
            .first()
            .and_then(|arg| arg.split_once('.'))
        else {
            return LineageTask::unknown();
        };
        let mut lineage = LineageTask::empty();
        lineage.add_generated_node(DataNode::new(
            &DataSourceInstance::Unknown,
            Some(schema),
            Some(table),
        ));
        lineage
    }

    fn analyze_other_task(&self, _job: &JobDefinition) -> LineageTask {
        LineageTask::empty()
    }
}

#[test]
fn test_custom_hooks() {
    let registry = InstanceRegistry::new();
    let analyzer = Analyzer::new(&registry).with_hooks(SparkTableHooks);

    let spark_job = JobDefinition::new(
        "SPARK",
        r#"{"rawScript": "spark-submit --master yarn --class com.example.Load etl.jar dw.t"}"#,
    );
    let lineage = analyzer.analyze_job(&spark_job).expect("no environment needed");
    assert!(!lineage.is_unknown());
    assert_eq!(node_labels(lineage.generated_nodes()), vec!["UNKNOWN:dw.t"]);

    let python_job = JobDefinition::new("PYTHON", "{}");
    assert_eq!(analyzer.analyze_job(&python_job), Ok(LineageTask::empty()));

    // hooks that are not overridden keep the default
    let shell_job = JobDefinition::new("SHELL", r#"{"rawScript": "hdfs dfs -ls /"}"#);
    assert!(analyzer.analyze_job(&shell_job).expect("no environment needed").is_unknown());
}

#[test]
fn test_lineage_serialization() {
    let registry = InstanceRegistry::new();
    let analyzer = Analyzer::new(&registry);
    let lineage = analyzer.analyze_sql(
        &DataSourceInstance::Unknown,
        "insert into dw.t select * from ods.t",
    );
    let json = serde_json::to_value(&lineage).expect("lineage is serializable");
    assert_eq!(json["is_unknown"], false);
    assert_eq!(json["dependent_nodes"][0]["schema"], "ods");
    assert_eq!(json["dependent_nodes"][0]["table"], "t");
    assert_eq!(json["generated_nodes"][0]["instance"]["kind"], "UNKNOWN");
}
