use std::str::FromStr;

use anyhow::anyhow;
use serde::Serialize;
use strum_macros::EnumString;

/// A command as delivered by the shell simulator: its name and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellCommand {
    pub name: String,
    pub params: Vec<String>,
}

impl ShellCommand {
    pub fn new(name: &str, params: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            params: params.iter().map(|&p| p.to_owned()).collect(),
        }
    }
}

impl std::fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}

/// Leading `flag value` pairs of a token list.
struct FlagScan<F> {
    values: Vec<(F, String)>,
    consumed: usize,
}

/// Consumes `flag value` pairs while the current token is a known flag with a
/// value after it.
fn scan_flags<F: FromStr>(tokens: &[String]) -> FlagScan<F> {
    let mut values = vec![];
    let mut i = 0;
    while i + 1 < tokens.len() {
        let Ok(flag) = tokens[i].parse::<F>() else {
            break;
        };
        values.push((flag, tokens[i + 1].clone()));
        i += 2;
    }
    FlagScan {
        values,
        consumed: i,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum BeelineFlag {
    #[strum(serialize = "-u", serialize = "--url")]
    Url,
    #[strum(serialize = "-n", serialize = "--user", serialize = "--username")]
    Username,
    #[strum(serialize = "-p", serialize = "--password")]
    Password,
    #[strum(serialize = "-d", serialize = "--database")]
    Database,
    #[strum(serialize = "-f", serialize = "--filename")]
    Filename,
    #[strum(serialize = "-e", serialize = "--execute")]
    Execute,
    #[strum(serialize = "-i", serialize = "--incremental")]
    Incremental,
    #[strum(serialize = "-s", serialize = "--silent")]
    Silent,
    #[strum(serialize = "-v", serialize = "--verbose")]
    Verbose,
    #[strum(serialize = "-q", serialize = "--query")]
    Query,
    #[strum(serialize = "-c", serialize = "--color")]
    Color,
}

/// Interactive Hive client invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BeelineCommand {
    pub tokens: Vec<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: Option<String>,
    pub filename: Option<String>,
    pub execute: Option<String>,
    pub incremental: Option<String>,
    pub silent: Option<String>,
    pub verbose: Option<String>,
    pub query: Option<String>,
    pub color: Option<String>,
}

impl BeelineCommand {
    /// Every token must belong to a `flag value` pair.
    pub fn parse(tokens: &[String]) -> anyhow::Result<Self> {
        let scan = scan_flags::<BeelineFlag>(tokens);
        if scan.consumed < tokens.len() {
            return Err(anyhow!(
                "Unrecognized beeline argument `{}` at position {}",
                tokens[scan.consumed],
                scan.consumed
            ));
        }

        let mut command = BeelineCommand {
            tokens: tokens.to_vec(),
            ..Default::default()
        };
        for (flag, value) in scan.values {
            let field = match flag {
                BeelineFlag::Url => &mut command.url,
                BeelineFlag::Username => &mut command.username,
                BeelineFlag::Password => &mut command.password,
                BeelineFlag::Database => &mut command.database,
                BeelineFlag::Filename => &mut command.filename,
                BeelineFlag::Execute => &mut command.execute,
                BeelineFlag::Incremental => &mut command.incremental,
                BeelineFlag::Silent => &mut command.silent,
                BeelineFlag::Verbose => &mut command.verbose,
                BeelineFlag::Query => &mut command.query,
                BeelineFlag::Color => &mut command.color,
            };
            *field = Some(value);
        }
        Ok(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum SparkSubmitFlag {
    #[strum(serialize = "--master")]
    Master,
    #[strum(serialize = "--deploy-mode")]
    DeployMode,
    #[strum(serialize = "--class")]
    Class,
    #[strum(serialize = "--name")]
    Name,
    #[strum(serialize = "--jars")]
    Jars,
    #[strum(serialize = "--packages")]
    Packages,
    #[strum(serialize = "--exclude-packages")]
    ExcludePackages,
    #[strum(serialize = "--repositories")]
    Repositories,
    #[strum(serialize = "--py-files")]
    PyFiles,
    #[strum(serialize = "--files")]
    Files,
    #[strum(serialize = "--conf")]
    Conf,
    #[strum(serialize = "--properties-file")]
    PropertiesFile,
    #[strum(serialize = "--driver-memory")]
    DriverMemory,
    #[strum(serialize = "--driver-java-options")]
    DriverJavaOptions,
    #[strum(serialize = "--driver-library-path")]
    DriverLibraryPath,
    #[strum(serialize = "--driver-class-path")]
    DriverClassPath,
    #[strum(serialize = "--executor-memory")]
    ExecutorMemory,
    #[strum(serialize = "--proxy-user")]
    ProxyUser,
    #[strum(serialize = "--driver-cores")]
    DriverCores,
    #[strum(serialize = "--total-executor-cores")]
    TotalExecutorCores,
    #[strum(serialize = "--executor-cores")]
    ExecutorCores,
    #[strum(serialize = "--queue")]
    Queue,
    #[strum(serialize = "--num-executors")]
    NumExecutors,
    #[strum(serialize = "--archives")]
    Archives,
    #[strum(serialize = "--principal")]
    Principal,
    #[strum(serialize = "--keytab")]
    Keytab,
}

/// Spark job submission: submitter options, then the application and its
/// arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SparkSubmitCommand {
    pub tokens: Vec<String>,
    pub arg_master: Option<String>,
    pub arg_deploy_mode: Option<String>,
    pub arg_class: Option<String>,
    pub arg_name: Option<String>,
    pub arg_jars: Option<String>,
    pub arg_packages: Option<String>,
    pub arg_exclude_packages: Option<String>,
    pub arg_repositories: Option<String>,
    pub arg_py_files: Option<String>,
    pub arg_files: Option<String>,
    /// Every `--conf`, in order.
    pub arg_conf: Vec<String>,
    pub arg_properties_file: Option<String>,
    pub arg_driver_memory: Option<String>,
    pub arg_driver_java_options: Option<String>,
    pub arg_driver_library_path: Option<String>,
    pub arg_driver_class_path: Option<String>,
    pub arg_executor_memory: Option<String>,
    pub arg_proxy_user: Option<String>,
    pub arg_driver_cores: Option<String>,
    pub arg_total_executor_cores: Option<String>,
    pub arg_executor_cores: Option<String>,
    pub arg_queue: Option<String>,
    pub arg_num_executors: Option<String>,
    pub arg_archives: Option<String>,
    pub arg_principal: Option<String>,
    pub arg_keytab: Option<String>,
    /// Jar or python file being submitted.
    pub application: String,
    pub application_arguments: Vec<String>,
}

impl SparkSubmitCommand {
    pub fn parse(tokens: &[String]) -> anyhow::Result<Self> {
        let scan = scan_flags::<SparkSubmitFlag>(tokens);
        let Some(application) = tokens.get(scan.consumed) else {
            return Err(anyhow!(
                "Missing application in spark-submit arguments: {:?}",
                tokens
            ));
        };

        let mut command = SparkSubmitCommand {
            tokens: tokens.to_vec(),
            application: application.to_owned(),
            application_arguments: tokens[scan.consumed + 1..].to_vec(),
            ..Default::default()
        };
        for (flag, value) in scan.values {
            let field = match flag {
                SparkSubmitFlag::Conf => {
                    command.arg_conf.push(value);
                    continue;
                }
                SparkSubmitFlag::Master => &mut command.arg_master,
                SparkSubmitFlag::DeployMode => &mut command.arg_deploy_mode,
                SparkSubmitFlag::Class => &mut command.arg_class,
                SparkSubmitFlag::Name => &mut command.arg_name,
                SparkSubmitFlag::Jars => &mut command.arg_jars,
                SparkSubmitFlag::Packages => &mut command.arg_packages,
                SparkSubmitFlag::ExcludePackages => &mut command.arg_exclude_packages,
                SparkSubmitFlag::Repositories => &mut command.arg_repositories,
                SparkSubmitFlag::PyFiles => &mut command.arg_py_files,
                SparkSubmitFlag::Files => &mut command.arg_files,
                SparkSubmitFlag::PropertiesFile => &mut command.arg_properties_file,
                SparkSubmitFlag::DriverMemory => &mut command.arg_driver_memory,
                SparkSubmitFlag::DriverJavaOptions => &mut command.arg_driver_java_options,
                SparkSubmitFlag::DriverLibraryPath => &mut command.arg_driver_library_path,
                SparkSubmitFlag::DriverClassPath => &mut command.arg_driver_class_path,
                SparkSubmitFlag::ExecutorMemory => &mut command.arg_executor_memory,
                SparkSubmitFlag::ProxyUser => &mut command.arg_proxy_user,
                SparkSubmitFlag::DriverCores => &mut command.arg_driver_cores,
                SparkSubmitFlag::TotalExecutorCores => &mut command.arg_total_executor_cores,
                SparkSubmitFlag::ExecutorCores => &mut command.arg_executor_cores,
                SparkSubmitFlag::Queue => &mut command.arg_queue,
                SparkSubmitFlag::NumExecutors => &mut command.arg_num_executors,
                SparkSubmitFlag::Archives => &mut command.arg_archives,
                SparkSubmitFlag::Principal => &mut command.arg_principal,
                SparkSubmitFlag::Keytab => &mut command.arg_keytab,
            };
            *field = Some(value);
        }
        Ok(command)
    }
}
