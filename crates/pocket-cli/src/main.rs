use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use pocket_core::executors::judge::{judge_language_id, JUDGE_LANGUAGE_IDS};
use pocket_core::executors::router::LOCAL_SANDBOX_LANGUAGES;
use pocket_core::{resolve_environment, ConfigLoader, Dispatcher, ExecutionResult, RuntimeKind};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;

#[derive(Parser, Debug)]
#[clap(name = "pocket", author, version, about = "Run code locally or on a remote judge")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, global = true, help = "YAML configuration file")]
    config: Option<PathBuf>,

    #[clap(long, short, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a source file, or stdin when no file is given
    Run {
        #[clap(long, short = 'L')]
        language: String,

        file: Option<PathBuf>,

        #[clap(long, help = "Print the execution result as JSON")]
        json: bool,
    },
    /// Show which backend a language is routed to
    Route { language: String },
    /// List languages known to each backend
    Languages,
}

fn init_logging(level: &str) {
    let level_filter = match level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Warn,
    };
    env_logger::Builder::new().filter_level(level_filter).init();
}

async fn read_source(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut code = String::new();
            tokio::io::stdin()
                .read_to_string(&mut code)
                .await
                .context("Failed to read code from stdin")?;
            Ok(code)
        }
    }
}

fn print_result(result: &ExecutionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    print!("{}", result.output);
    if let Some(error) = &result.error {
        eprintln!("error: {}", error);
    }
    log::info!("Finished in {}ms", result.execution_time_ms);
    Ok(())
}

fn describe_route(language: &str) -> String {
    let env = resolve_environment(language);
    match env.kind {
        RuntimeKind::LocalSandbox => format!("{} -> {}", env.language, env.kind),
        RuntimeKind::RemoteJudge => {
            let id = judge_language_id(&env.language)
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unsupported".to_string());
            format!("{} -> {} (language id {})", env.language, env.kind, id)
        }
    }
}

fn exit_status(result: &ExecutionResult) -> u8 {
    if result.is_success() {
        0
    } else {
        1
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Run {
            language,
            file,
            json,
        } => {
            let config = ConfigLoader::load(cli.config.as_deref()).await?;
            let code = read_source(file.as_ref()).await?;

            let dispatcher = Dispatcher::from_config(config);
            let result = dispatcher.run(&code, &language).await?;
            print_result(&result, json)?;
            return Ok(ExitCode::from(exit_status(&result)));
        }
        Commands::Route { language } => println!("{}", describe_route(&language)),
        Commands::Languages => {
            println!("local-sandbox:");
            for language in LOCAL_SANDBOX_LANGUAGES {
                println!("  {}", language);
            }
            println!("remote-judge:");
            for (language, id) in JUDGE_LANGUAGE_IDS {
                println!("  {:<12} {}", language, id);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
