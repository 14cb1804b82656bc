use clap::{Args, Parser, Subcommand};
use office_translator::{
    AppConfig, BaiduBackend, BatchReport, ConfigOverrides, Credentials, DetectedLanguageMatcher,
    DocumentAdapter, Orchestrator, SpreadsheetAdapter, TextClassifier, TranslationCache,
    TranslationClient, WordAdapter,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Translate every Excel or Word file in a directory with the Baidu translate API.
#[derive(Parser, Debug)]
#[command(name = "office-translator", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log every cache hit and skipped text
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate .xlsx workbooks, sheet names included
    Excel(RunArgs),
    /// Translate the body text of .docx documents
    Word(RunArgs),
    /// Write a configuration file with the default values
    InitConfig {
        #[arg(default_value = "office-translator.toml")]
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Directory holding the documents to translate
    #[arg(long, visible_alias = "in_dir")]
    in_dir: Option<PathBuf>,

    /// Directory the translated documents are written to
    #[arg(long, visible_alias = "out_dir")]
    out_dir: Option<PathBuf>,

    /// Source language code, e.g. jp
    #[arg(long, visible_alias = "from_lang")]
    from_lang: Option<String>,

    /// Target language code, e.g. en
    #[arg(long, visible_alias = "to_lang")]
    to_lang: Option<String>,

    /// Translation cache file
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Only translate spreadsheet text detected to be in the source language
    #[arg(long)]
    language_gate: bool,

    /// Configuration file; the default locations are probed when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input_dir: self.in_dir.clone(),
            output_dir: self.out_dir.clone(),
            source_lang: self.from_lang.clone(),
            target_lang: self.to_lang.clone(),
            cache_path: self.cache.clone(),
            language_gate: self.language_gate,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "office_translator=debug,info"
        } else {
            "info"
        })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run<A: DocumentAdapter>(
    args: &RunArgs,
    adapter: impl FnOnce(bool) -> A,
) -> Result<BatchReport, Box<dyn Error>> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_overrides(args.overrides());
    let settings = config.validate()?;
    info!(
        input = %settings.input_dir.display(),
        output = %settings.output_dir.display(),
        from = %settings.source_lang,
        to = %settings.target_lang,
        "starting translation run"
    );

    let credentials = Credentials::from_env()?;
    let backend = BaiduBackend::new(credentials, &config.translation)?;
    let client = TranslationClient::from_config(backend, &config.translation);
    let cache = TranslationCache::open(&settings.cache_path)?;
    let classifier = if settings.language_gate {
        TextClassifier::new(Box::new(DetectedLanguageMatcher))
    } else {
        TextClassifier::default()
    };

    let adapter = adapter(settings.language_gate);
    let orchestrator = Orchestrator::from_settings(client, cache, classifier, &settings);
    let report = orchestrator
        .process_directory(&adapter, &settings.input_dir, &settings.output_dir)
        .await?;
    info!(entries = orchestrator.cache().len()?, "cache size");
    Ok(report)
}

fn summarize(report: &BatchReport) -> ExitCode {
    let suspected = report.suspected_failures();
    if suspected > 0 {
        warn!(suspected, "some texts may not have been translated");
    }
    for path in &report.failed {
        error!(path = %path.display(), "not translated");
    }
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Excel(args) => run(args, SpreadsheetAdapter::new).await,
        Command::Word(args) => run(args, |_| WordAdapter).await,
        Command::InitConfig { path } => {
            return match AppConfig::generate_example_config(path) {
                Ok(()) => {
                    info!(path = %path.display(), "wrote example configuration");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(error = %e, "failed to write configuration");
                    ExitCode::FAILURE
                }
            };
        }
    };

    match result {
        Ok(report) => summarize(&report),
        Err(e) => {
            error!(error = %e, "translation run aborted");
            ExitCode::FAILURE
        }
    }
}
