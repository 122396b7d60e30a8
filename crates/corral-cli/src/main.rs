//! CLI binary for corral: package a Python handler and deploy it to AWS
//! Lambda behind an API Gateway url.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use corral_aws::client::Aws;
use corral_aws::lambda::FunctionSpec;
use corral_core::config::{CorralConfig, DeployConfig};
use corral_core::environ::Environ;
use corral_resolve::interp::PythonEnv;
use corral_resolve::resolver::{Resolver, SearchPaths};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "corral", about = "Wrangle Python functions onto AWS Lambda")]
struct Cli {
    /// More verbose logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show available regions and whether credentials resolve
    Info,

    /// List the IAM role names in the account
    InfoRoles,

    /// Package a handler file and deploy it behind a public url
    FunctionAdd(FunctionAddArgs),

    /// Invoke a deployed function and print its response
    FunctionRun {
        /// The deployed function name
        name: String,

        /// JSON payload to send; defaults to an empty object
        payload: Option<String>,
    },
}

#[derive(clap::Args)]
struct FunctionAddArgs {
    /// Path to a module.py containing a NAME(event, context) function
    filepath: PathBuf,

    /// IAM role the lambda and api run under
    #[arg(long)]
    role_name: Option<String>,

    /// Name of the api gateway fronting the function
    #[arg(long)]
    api_name: Option<String>,

    /// Staging environment name (eg DEV, STAGING, PROD)
    #[arg(short, long)]
    stage: Option<String>,

    /// AWS region; empty means the configured default chain
    #[arg(long)]
    region: Option<String>,

    /// Python interpreter probed for module search paths
    #[arg(long)]
    python: Option<String>,

    /// Module search directory (repeatable); disables interpreter probing
    #[arg(long)]
    search_path: Vec<PathBuf>,

    /// Trailing KEY=VALUE pairs: upper-case keys become lambda
    /// environment variables, lower-case keys set deploy options
    /// (timeout, runtime)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    vars: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let mut config = CorralConfig::load(&cwd)?;

    match cli.command {
        Commands::Info => cmd_info(&config.deploy.region).await,
        Commands::InfoRoles => cmd_info_roles(&config.deploy.region).await,
        Commands::FunctionAdd(args) => cmd_function_add(&mut config, args).await,
        Commands::FunctionRun { name, payload } => {
            cmd_function_run(&config.deploy.region, &name, payload.as_deref()).await
        }
    }
}

async fn cmd_info(region: &str) -> Result<()> {
    let aws = Aws::connect(region).await;
    let default = aws.region();

    println!("Available regions:");
    for name in corral_aws::region::REGIONS {
        if Some(*name) == default {
            println!("\t{name} (default)");
        } else {
            println!("\t{name}");
        }
    }
    println!();

    if aws.has_credentials().await {
        println!("AWS access and secret keys were found");
    } else {
        eprintln!("No AWS credentials found. Configure ~/.aws/credentials or AWS_* env vars.");
    }
    Ok(())
}

async fn cmd_info_roles(region: &str) -> Result<()> {
    let aws = Aws::connect(region).await;
    let names = corral_aws::role::list_role_names(&aws).await?;
    if names.is_empty() {
        eprintln!("No roles found");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

async fn cmd_function_add(config: &mut CorralConfig, args: FunctionAddArgs) -> Result<()> {
    let deploy = &mut config.deploy;
    apply_flags(&args, deploy);
    if !deploy.region.is_empty() && !corral_aws::region::is_known_region(&deploy.region) {
        tracing::warn!("{} is not in the commercial region table", deploy.region);
    }

    let mut search_entries = args.search_path;
    if search_entries.is_empty()
        && let Ok(raw) = std::env::var("CORRAL_SEARCH_PATH")
    {
        search_entries = std::env::split_paths(&raw).collect();
    }

    let probed = if search_entries.is_empty() && !deploy.python.is_empty() {
        let env = PythonEnv::probe(&deploy.python)?;
        deploy.runtime = env.runtime.clone();
        Some(env)
    } else {
        None
    };

    let mut environ = Environ::default();
    apply_passthrough(&args.vars, deploy, &mut environ);

    let filepath = args.filepath;
    let source = std::fs::read_to_string(&filepath)
        .with_context(|| format!("failed to read {}", filepath.display()))?;
    let handler = corral_parser::handler::find_handler(&source).with_context(|| {
        format!(
            "no NAME(event, context) handler function found in {}",
            filepath.display()
        )
    })?;
    tracing::debug!("found handler {} at line {}", handler.name, handler.line);

    let module_name = filepath
        .file_stem()
        .context("handler path has no file name")?
        .to_string_lossy()
        .to_string();

    let paths = assemble_search_paths(search_entries, probed.as_ref(), &filepath);
    let mut resolver = Resolver::new(paths);

    let spec = FunctionSpec {
        file: filepath,
        name: module_name.clone(),
        handler: format!("{module_name}.{}", handler.name),
        description: handler.description.unwrap_or_default(),
        runtime: deploy.runtime.clone(),
        timeout: deploy.timeout,
        environ,
    };

    let aws = Aws::connect(&deploy.region).await;

    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    spinner.set_message(format!("Deploying {module_name}..."));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let deployment = corral_aws::serverless::deploy(
        &aws,
        &mut resolver,
        spec,
        &deploy.role_name,
        &deploy.api_name,
        &deploy.stage,
    )
    .await?;
    spinner.finish_and_clear();

    eprintln!("Function {} available at url:", deployment.function_name);
    println!("{}", deployment.url);
    Ok(())
}

async fn cmd_function_run(region: &str, name: &str, payload: Option<&str>) -> Result<()> {
    let payload = match payload {
        Some(raw) => serde_json::from_str(raw).context("payload is not valid JSON")?,
        None => serde_json::Value::Object(serde_json::Map::new()),
    };
    let aws = Aws::connect(region).await;
    let response = corral_aws::lambda::invoke(&aws, name, payload).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("failed to render response")?
    );
    Ok(())
}

/// Flags given on the command line override config file values.
fn apply_flags(args: &FunctionAddArgs, deploy: &mut DeployConfig) {
    if let Some(v) = &args.role_name {
        deploy.role_name = v.clone();
    }
    if let Some(v) = &args.api_name {
        deploy.api_name = v.clone();
    }
    if let Some(v) = &args.stage {
        deploy.stage = v.clone();
    }
    if let Some(v) = &args.region {
        deploy.region = v.clone();
    }
    if let Some(v) = &args.python {
        deploy.python = v.clone();
    }
}

/// Search paths for one deploy. Explicit entries, from flags or
/// `CORRAL_SEARCH_PATH`, win over probed interpreter paths, and the
/// handler's own directory always goes first so sibling modules resolve
/// the same way they would at runtime. A bare filename names a handler
/// in the current directory.
fn assemble_search_paths(
    explicit: Vec<PathBuf>,
    probed: Option<&PythonEnv>,
    handler: &Path,
) -> SearchPaths {
    let mut paths = if !explicit.is_empty() {
        SearchPaths::new(explicit)
    } else if let Some(env) = probed {
        SearchPaths::from_env(env)
    } else {
        SearchPaths::default()
    };
    let dir = match handler.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    paths.prepend(dir);
    paths
}

/// Split trailing KEY=VALUE tokens. Upper-case keys set lambda
/// environment variables; lower-case keys set deploy options. Repeated
/// keys keep the last value.
fn apply_passthrough(vars: &[String], deploy: &mut DeployConfig, environ: &mut Environ) {
    for raw in vars {
        let token = raw.trim_start_matches("--");
        let Some((key, value)) = token.split_once('=') else {
            tracing::warn!("ignoring malformed option {raw}, expected KEY=VALUE");
            continue;
        };
        if is_env_key(key) {
            environ.set(key, value);
        } else {
            match key {
                "timeout" => match value.parse() {
                    Ok(v) => deploy.timeout = v,
                    Err(_) => tracing::warn!("ignoring non-numeric timeout {value}"),
                },
                "runtime" => deploy.runtime = value.to_string(),
                other => tracing::warn!("ignoring unknown option {other}"),
            }
        }
    }
}

/// Upper-case keys name lambda environment variables.
fn is_env_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(vars: &[&str]) -> (DeployConfig, Environ) {
        let mut deploy = DeployConfig::default();
        let mut environ = Environ::default();
        let vars: Vec<String> = vars.iter().map(ToString::to_string).collect();
        apply_passthrough(&vars, &mut deploy, &mut environ);
        (deploy, environ)
    }

    #[test]
    fn test_flags_override_config_defaults() {
        let mut deploy = DeployConfig::default();
        let args = FunctionAddArgs {
            filepath: PathBuf::from("handler.py"),
            role_name: Some("team-role".to_string()),
            api_name: None,
            stage: Some("PROD".to_string()),
            region: Some("eu-west-2".to_string()),
            python: None,
            search_path: vec![],
            vars: vec![],
        };
        apply_flags(&args, &mut deploy);
        assert_eq!(deploy.role_name, "team-role");
        assert_eq!(deploy.api_name, "corral-lambda-api");
        assert_eq!(deploy.stage, "PROD");
        assert_eq!(deploy.region, "eu-west-2");
        assert_eq!(deploy.python, "python3");
    }

    #[test]
    fn test_bare_filename_searches_the_current_directory() {
        let paths = assemble_search_paths(vec![], None, Path::new("handler.py"));
        assert_eq!(paths.entries, vec![PathBuf::from(".")]);
    }

    #[test]
    fn test_handler_directory_is_always_the_first_entry() {
        let paths = assemble_search_paths(
            vec![PathBuf::from("/opt/site")],
            None,
            Path::new("/srv/app/handler.py"),
        );
        assert_eq!(
            paths.entries,
            vec![PathBuf::from("/srv/app"), PathBuf::from("/opt/site")]
        );
    }

    #[test]
    fn test_probed_paths_follow_the_handler_directory() {
        let env = PythonEnv {
            search_paths: vec![PathBuf::from("/usr/lib/python3.12/site-packages")],
            stdlib_dir: Some(PathBuf::from("/usr/lib/python3.12")),
            builtins: vec!["_ast".to_string()],
            runtime: "python3.12".to_string(),
        };
        let paths = assemble_search_paths(vec![], Some(&env), Path::new("api/handler.py"));
        assert_eq!(
            paths.entries,
            vec![
                PathBuf::from("api"),
                PathBuf::from("/usr/lib/python3.12/site-packages"),
            ]
        );
        assert_eq!(paths.stdlib_dir, Some(PathBuf::from("/usr/lib/python3.12")));
        assert!(paths.is_stdlib_name("_ast"));
    }

    #[test]
    fn test_explicit_entries_beat_probed_paths() {
        let env = PythonEnv {
            search_paths: vec![PathBuf::from("/py/site")],
            stdlib_dir: None,
            builtins: vec![],
            runtime: "python3.12".to_string(),
        };
        let paths =
            assemble_search_paths(vec![PathBuf::from("/opt/site")], Some(&env), Path::new("h.py"));
        assert_eq!(
            paths.entries,
            vec![PathBuf::from("."), PathBuf::from("/opt/site")]
        );
    }

    #[test]
    fn test_upper_keys_become_environment_variables() {
        let (deploy, environ) = apply(&["--API_KEY=secret", "WORKERS=4"]);
        assert_eq!(environ.get("API_KEY"), Some("secret"));
        assert_eq!(environ.get("WORKERS"), Some("4"));
        assert_eq!(deploy.timeout, 300);
    }

    #[test]
    fn test_lower_keys_set_deploy_options() {
        let (deploy, environ) = apply(&["--timeout=60", "--runtime=python3.13"]);
        assert_eq!(deploy.timeout, 60);
        assert_eq!(deploy.runtime, "python3.13");
        assert!(environ.is_empty());
    }

    #[test]
    fn test_repeated_keys_keep_the_last_value() {
        let (deploy, environ) = apply(&["--timeout=60", "--timeout=90", "--MODE=a", "--MODE=b"]);
        assert_eq!(deploy.timeout, 90);
        assert_eq!(environ.get("MODE"), Some("b"));
    }

    #[test]
    fn test_malformed_and_unknown_tokens_are_skipped() {
        let (deploy, environ) = apply(&["notakeyvalue", "--bogus=1", "--timeout=nope"]);
        assert_eq!(deploy.timeout, 300);
        assert_eq!(deploy.runtime, "python3.12");
        assert!(environ.is_empty());
    }

    #[test]
    fn test_mixed_case_keys_are_not_environment_variables() {
        assert!(is_env_key("API_KEY"));
        assert!(is_env_key("V2"));
        assert!(!is_env_key("timeout"));
        assert!(!is_env_key("ApiKey"));
        assert!(!is_env_key(""));
    }
}
