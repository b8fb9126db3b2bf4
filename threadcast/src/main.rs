/*
threadcast - main.rs
One binary, two independent pipelines: `generate` asks the model for a batch of
posts, `publish` posts a batch as an X thread. The two only meet through the
JSON batch (artifact file, stdout, TWEET_TEXT).
*/

use clap::{Parser, Subcommand};
use common::{Config, LlmConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use threadcast::artifact::append_github_output;
use threadcast::llm::remote::{RemoteLlmProvider, DEFAULT_API_URL, DEFAULT_MODEL};
use threadcast::news::{FeedNewsSearch, NewsSearch, DEFAULT_FEED_URL};
use threadcast::parser::parse_post_batch;
use threadcast::pipeline::{run_generator, run_publisher, GeneratorSettings, PublisherSettings};
use threadcast::social::oauth::OAuthCredentials;
use threadcast::social::x::{XClient, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
use threadcast::{Error, Result};

const DEFAULT_API_KEY_ENV: &str = "POE_API_KEY";
const TWEET_TEXT_ENV: &str = "TWEET_TEXT";
const ENRICH_ENV: &str = "ENRICH_WITH_NEWS";
const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

#[derive(Parser, Debug)]
#[command(name = "threadcast", about = "Generate posts with an LLM and publish them as an X thread")]
struct Args {
    /// Path to config.toml (merged over config.default.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a batch of posts and print it as a JSON array
    Generate {
        /// Prompt template file (default: prompt.txt)
        #[arg(long, value_name = "FILE")]
        prompt_file: Option<PathBuf>,

        /// Prefix the prompt with recent news headlines (also ENRICH_WITH_NEWS)
        #[arg(long)]
        with_news: bool,
    },
    /// Publish a JSON array of posts as a thread
    Publish {
        /// JSON array of posts (default: TWEET_TEXT)
        #[arg(long, value_name = "JSON")]
        text: Option<String>,

        /// Directory to pick the attached image from
        #[arg(long, value_name = "DIR")]
        image_dir: Option<PathBuf>,

        /// Skip the random delay before the first post
        #[arg(long)]
        no_jitter: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // Parse CLI args
    let args = Args::parse();

    // Logs go to stderr; stdout carries only the generated batch
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config).await?;

    match args.command {
        Command::Generate {
            prompt_file,
            with_news,
        } => generate(&config, prompt_file, with_news).await,
        Command::Publish {
            text,
            image_dir,
            no_jitter,
        } => publish(&config, text, image_dir, !no_jitter).await,
    }
}

async fn load_config(override_path: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = match override_path {
        Some(p) if !p.exists() => {
            return Err(Error::config(format!("config file not found: {}", p.display())));
        }
        Some(p) => Some(p),
        None => Some(PathBuf::from("config.toml")),
    };

    let config = Config::load_with_defaults(Some(&default_path), override_path.as_deref())
        .await
        .map_err(|e| Error::config(format!("{:#}", e)))?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

/// Build the generation client; fails before any network call if the key is missing.
fn create_llm_provider(llm_config: &LlmConfig) -> Result<RemoteLlmProvider> {
    let api_key_env = llm_config.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
    let api_key = common::require_env(api_key_env).map_err(|e| Error::config(format!("{:#}", e)))?;

    let provider = RemoteLlmProvider::new(
        llm_config.api_url.clone().unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        api_key,
        llm_config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
    )
    .with_defaults(
        llm_config.timeout_seconds.unwrap_or(60),
        llm_config.max_tokens.unwrap_or(500),
        llm_config.temperature.unwrap_or(0.7),
    );
    info!(model = provider.model(), "LLM provider initialized");
    Ok(provider)
}

async fn generate(config: &Config, prompt_file: Option<PathBuf>, with_news: bool) -> Result<()> {
    let with_news = with_news || common::env_flag(ENRICH_ENV) || config.news.enabled.unwrap_or(false);
    let settings = GeneratorSettings::from_config(config, prompt_file, with_news);

    if !settings.prompt_file.is_file() {
        return Err(Error::config(format!(
            "prompt file not found: {}",
            settings.prompt_file.display()
        )));
    }

    let llm = create_llm_provider(&config.llm)?;

    let news = if with_news {
        let feed_url = config.news.feed_url.as_deref().unwrap_or(DEFAULT_FEED_URL);
        match FeedNewsSearch::new(feed_url, config.news.timeout_seconds.unwrap_or(10)) {
            Ok(search) => Some(search),
            Err(e) => {
                warn!(error = %format!("{:#}", e), "news search unavailable, continuing without enrichment");
                None
            }
        }
    } else {
        None
    };

    let generated = run_generator(&llm, news.as_ref().map(|n| n as &dyn NewsSearch), &settings).await?;

    println!("{}", generated.batch.to_json());

    if let Ok(output) = std::env::var(GITHUB_OUTPUT_ENV) {
        if let Err(e) = append_github_output(Path::new(&output), &generated.artifact, &generated.batch).await {
            warn!(error = %e, path = %output, "failed to write GitHub Actions output");
        }
    }

    Ok(())
}

async fn publish(config: &Config, text: Option<String>, image_dir: Option<PathBuf>, jitter: bool) -> Result<()> {
    let raw = match text {
        Some(text) => text,
        None => common::require_env(TWEET_TEXT_ENV).map_err(|e| Error::config(format!("{:#}", e)))?,
    };

    let batch = parse_post_batch(&raw).map_err(|e| {
        error!(error = %e, raw = %e.raw(), "post batch is not a JSON list of strings");
        Error::from(e)
    })?;

    let credentials = OAuthCredentials::from_env(&config.x).map_err(|e| Error::config(format!("{:#}", e)))?;
    let api_base = config.x.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
    let timeout = config
        .x
        .timeout_seconds
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);
    let client = XClient::new(api_base, credentials, timeout)
        .map_err(|e| Error::config(format!("failed to build X client: {}", e)))?;

    let settings = PublisherSettings::from_config(config, image_dir, jitter)?;
    let report = run_publisher(&client, &batch, &settings).await?;

    info!(posts = batch.len(), items = report.results.len(), "publish run complete");
    Ok(())
}
