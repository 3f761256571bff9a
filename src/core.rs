//! Main execution logic

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cache::DEFAULT_CATEGORIES;
use crate::catalog::{builtin_catalog, load_catalog, Catalog, Language};
use crate::cli::args::{PreviewArgs, RunArgs, TargetArgs};
use crate::cli::{
    apply_edits, parse_edits, reference_targets, Cli, Command, ConfigAction, DraftEdit, EditArgs, LogFormat, SecretString,
};
use crate::config::store::{API_BASE_URL, API_KEY};
use crate::config::{Config, StateStore};
use crate::context::Environment;
use crate::engine::{Credentials, Executor, Orchestrator, Session};
use crate::errors::{FlowsimError, Result, ValidationError};
use crate::output::report::{
    format_load_summary, format_preview, format_run_report, format_run_report_json, format_step_result,
    format_step_result_json, format_steps, format_workflows,
};
use crate::output::{to_curl, Painter};
use crate::status::ExitStatus;

/// EnvFilter directives for flowsim's own log output
pub const LOG_ENV: &str = "FLOWSIM_LOG";

pub fn run(args: Vec<String>, env: Environment, cancel: CancellationToken) -> ExitStatus {
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            return if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                ExitStatus::Success
            } else {
                ExitStatus::Error
            };
        }
    };

    init_logging(cli.verbose, cli.log_format.unwrap_or_default(), env.stderr_isatty);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => return handle_error(e.into()),
    };

    match runtime.block_on(program(cli, env, cancel)) {
        Ok(status) => status,
        Err(e) => handle_error(e),
    }
}

fn log_directives(verbose: u8) -> String {
    if let Some(directives) = std::env::var(LOG_ENV).ok().filter(|d| !d.trim().is_empty()) {
        return directives;
    }
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,flowsim={}", level)
}

fn init_logging(verbose: u8, format: LogFormat, ansi: bool) {
    let filter = EnvFilter::try_new(log_directives(verbose)).unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    // a subscriber may already be set when embedded in tests
    let _ = tracing_subscriber::registry().with(layer.with_filter(filter)).try_init();
}

fn handle_error(error: FlowsimError) -> ExitStatus {
    eprintln!("Error: {}", error);
    ExitStatus::Error
}

/// Everything a subcommand needs, resolved once from flags, store and config
struct Context {
    config: Config,
    store: StateStore,
    catalog_path: Option<PathBuf>,
    credentials: Credentials,
    lang: Language,
    painter: Painter,
}

impl Context {
    fn new(cli: &Cli, env: &Environment) -> Result<Self> {
        let config = Config::load(env)?;
        let store = StateStore::open(&config.state_file())?;
        let credentials = resolve_credentials(cli, &store, &config);
        debug!(base_url = %credentials.base_url, has_key = credentials.has_key(), "Credentials resolved");

        Ok(Self {
            catalog_path: cli.catalog.clone().or_else(|| config.catalog.clone()),
            lang: cli.lang.unwrap_or(config.language),
            painter: Painter::new(env.colors),
            credentials,
            store,
            config,
        })
    }

    fn catalog(&self) -> Result<Catalog> {
        match self.catalog_path {
            Some(ref path) => {
                info!(path = %path.display(), "Loading custom catalog");
                load_catalog(path)
            }
            None => Ok(builtin_catalog()),
        }
    }

    fn session(&self) -> Result<Session> {
        Ok(Session::new(self.catalog()?, self.credentials.clone()))
    }

    fn executor(&self) -> Result<Executor> {
        Executor::new(self.config.timeout)
    }
}

/// Flag or environment, then the saved store, then config, then the built-in default
fn resolve_credentials(cli: &Cli, store: &StateStore, config: &Config) -> Credentials {
    let api_key = cli.api_key.clone().filter(|k| !k.is_blank()).or_else(|| store.api_key());
    let base_url = cli
        .base_url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| store.base_url().map(str::to_string))
        .unwrap_or_else(|| config.effective_base_url().to_string());
    Credentials::new(api_key, base_url)
}

pub async fn program(cli: Cli, env: Environment, cancel: CancellationToken) -> Result<ExitStatus> {
    let mut ctx = Context::new(&cli, &env)?;

    match cli.command {
        Command::Workflows => {
            print!("{}", format_workflows(&ctx.catalog()?, ctx.lang, ctx.painter));
            Ok(ExitStatus::Success)
        }
        Command::Steps(target) => show_steps(&ctx, &target),
        Command::Preview(args) => preview(&ctx, &args).await,
        Command::Run(args) => run_workflow(&ctx, &args, cancel).await,
        Command::Refresh { categories } => refresh(&ctx, &categories).await,
        Command::Config { action } => configure(&mut ctx, cli.api_key.as_ref(), action),
    }
}

fn open_target(ctx: &Context, target: &TargetArgs, step: Option<&str>) -> Result<Session> {
    let mut session = ctx.session()?;
    session.select_workflow(&target.workflow, target.scenario.as_deref())?;
    if let Some(step) = step {
        session.focus_step(step)?;
    }
    Ok(session)
}

fn show_steps(ctx: &Context, target: &TargetArgs) -> Result<ExitStatus> {
    let session = open_target(ctx, target, None)?;
    let workflow = session.workflow()?;
    let statuses = session.step_statuses()?;
    print!("{}", format_steps(workflow, session.scenario(), &statuses, ctx.lang, ctx.painter));
    Ok(ExitStatus::Success)
}

/// Resolve and apply edit flags, loading reference data first where edits read it
async fn prepare_drafts(
    session: &mut Session,
    executor: &Executor,
    edits: &EditArgs,
    default_step: &str,
) -> Result<Vec<DraftEdit>> {
    let parsed = parse_edits(edits, session.workflow()?, default_step)?;
    if session.credentials().has_key() {
        for step in reference_targets(&parsed) {
            session.ensure_reference_data(executor, &step).await?;
        }
    }
    apply_edits(session, &parsed)?;
    Ok(parsed)
}

async fn preview(ctx: &Context, args: &PreviewArgs) -> Result<ExitStatus> {
    let mut session = open_target(ctx, &args.target, args.step.as_deref())?;
    let step = session.current_step()?.clone();

    if !args.edits.is_empty() {
        let executor = ctx.executor()?;
        prepare_drafts(&mut session, &executor, &args.edits, &step.id).await?;
    }

    let request = session.synthesize(&step.id, true)?;
    print!("{}", format_preview(&step, &request, ctx.lang, ctx.painter));
    if args.curl {
        println!("\n{}", to_curl(&request, true));
    }
    Ok(ExitStatus::Success)
}

async fn run_workflow(ctx: &Context, args: &RunArgs, cancel: CancellationToken) -> Result<ExitStatus> {
    let mut session = open_target(ctx, &args.target, args.step.as_deref())?;
    if !session.credentials().has_key() {
        return Err(ValidationError::MissingApiKey.into());
    }
    let executor = ctx.executor()?;
    let default_step = session.current_step()?.id.clone();
    prepare_drafts(&mut session, &executor, &args.edits, &default_step).await?;

    if args.step.is_some() {
        let result = session.execute_current(&executor).await?;
        if args.json {
            print!("{}", format_step_result_json(&result));
        } else {
            print!("{}", format_step_result(&result, ctx.painter));
        }
        return Ok(ExitStatus::from_http_status(result.outcome.status));
    }

    let delay = args.delay.unwrap_or(ctx.config.run_delay);
    let report = Orchestrator::new(&executor, delay, cancel).run_all(&mut session).await?;
    let total = session.visible_steps()?.len();
    if args.json {
        print!("{}", format_run_report_json(&report, total));
    } else {
        print!("{}", format_run_report(&report, total, ctx.painter));
    }
    Ok(report.state.exit_status())
}

async fn refresh(ctx: &Context, categories: &[String]) -> Result<ExitStatus> {
    let categories: Vec<&str> = if categories.is_empty() {
        DEFAULT_CATEGORIES.to_vec()
    } else {
        categories.iter().map(String::as_str).collect()
    };

    let executor = ctx.executor()?;
    let mut session = ctx.session()?;
    let summary = session.refresh_reference_data(&executor, &categories).await?;
    print!("{}", format_load_summary(&summary, ctx.painter));

    Ok(if summary.failed.is_empty() { ExitStatus::Success } else { ExitStatus::Error })
}

fn configure(ctx: &mut Context, flag_key: Option<&SecretString>, action: ConfigAction) -> Result<ExitStatus> {
    match action {
        ConfigAction::Show => {
            let key_source = if flag_key.is_some_and(|k| !k.is_blank()) {
                "set (flag or environment)"
            } else if ctx.store.api_key().is_some() {
                "set (saved)"
            } else {
                "not set"
            };
            let catalog = ctx
                .catalog_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in".to_string());

            println!("{} {}", ctx.painter.label("config dir:"), ctx.config.config_dir.display());
            println!("{} {}", ctx.painter.label("state file:"), ctx.store.path().display());
            println!("{} {}", ctx.painter.label("api key:   "), key_source);
            println!("{} {}", ctx.painter.label("base url:  "), ctx.credentials.base_url);
            println!("{} {}", ctx.painter.label("language:  "), ctx.lang.code());
            println!("{} {}", ctx.painter.label("run delay: "), humantime::format_duration(ctx.config.run_delay));
            println!("{} {}", ctx.painter.label("timeout:   "), humantime::format_duration(ctx.config.timeout));
            println!("{} {}", ctx.painter.label("catalog:   "), catalog);
        }
        ConfigAction::SetKey { key } => {
            if key.is_blank() {
                return Err(FlowsimError::Argument("API key must not be empty".to_string()));
            }
            ctx.store.set(API_KEY, key.as_str().trim());
            ctx.store.save()?;
            println!("{}", ctx.painter.success("API key saved"));
        }
        ConfigAction::ClearKey => {
            if ctx.store.remove(API_KEY) {
                ctx.store.save()?;
                println!("{}", ctx.painter.success("API key cleared"));
            } else {
                println!("No API key saved");
            }
        }
        ConfigAction::SetBaseUrl { url } => {
            let parsed = url::Url::parse(url.trim())?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(FlowsimError::Argument(format!("Base URL must be http or https: {}", url)));
            }
            let normalized = parsed.as_str().trim_end_matches('/').to_string();
            ctx.store.set(API_BASE_URL, &normalized);
            ctx.store.save()?;
            println!("{} {}", ctx.painter.success("Base URL saved:"), normalized);
        }
    }
    Ok(ExitStatus::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DEFAULT_BASE_URL;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["flowsim"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_credential_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::open(&dir.path().join("state.json")).unwrap();
        let config = Config::parse("[defaults]\nbase_url = \"https://config.example.test\"", dir.path().to_path_buf()).unwrap();

        let mut cli_args = cli(&["workflows"]);
        cli_args.api_key = None;
        cli_args.base_url = None;
        let creds = resolve_credentials(&cli_args, &store, &config);
        assert!(!creds.has_key());
        assert_eq!(creds.base_url, "https://config.example.test");

        store.set(API_KEY, "saved-key");
        store.set(API_BASE_URL, "https://saved.example.test");
        let creds = resolve_credentials(&cli_args, &store, &config);
        assert_eq!(creds.api_key.as_ref().map(SecretString::as_str), Some("saved-key"));
        assert_eq!(creds.base_url, "https://saved.example.test");

        cli_args.api_key = Some(SecretString("flag-key".into()));
        cli_args.base_url = Some("https://flag.example.test".into());
        let creds = resolve_credentials(&cli_args, &store, &config);
        assert_eq!(creds.api_key.as_ref().map(SecretString::as_str), Some("flag-key"));
        assert_eq!(creds.base_url, "https://flag.example.test");
    }

    #[test]
    fn test_default_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(&dir.path().join("state.json")).unwrap();
        let config = Config::parse("", dir.path().to_path_buf()).unwrap();
        let mut cli_args = cli(&["workflows"]);
        cli_args.base_url = None;
        assert_eq!(resolve_credentials(&cli_args, &store, &config).base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_verbosity_directives() {
        if std::env::var(LOG_ENV).is_ok() {
            return;
        }
        assert_eq!(log_directives(0), "warn,flowsim=warn");
        assert_eq!(log_directives(2), "warn,flowsim=debug");
        assert_eq!(log_directives(9), "warn,flowsim=trace");
    }
}
