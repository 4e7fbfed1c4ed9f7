//! keypredict: run the engine against a directory of word lists.
//!
//! Usage:
//!   keypredict --assets data suggest helo --lang en
//!   keypredict --assets data predict how are --lang en
//!   keypredict detect "bonjour tout le monde"
//!   keypredict --assets data compile --lang en --out data/en.dict.bin
//!
//! Set RUST_LOG=keypredict_core=debug to see load and query tracing.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use keypredict_core::assets::build_dictionary;
use keypredict_core::{Config, DirectoryAssets, Engine, LoadOutcome, TableTransliterator};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "keypredict")]
#[command(about = "Autocorrect, completion and next-word prediction from the command line")]
struct Args {
    /// Directory holding `{code}_words.txt` and friends
    #[arg(long, default_value = "data")]
    assets: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank corrections and completions for a typed word
    Suggest {
        word: String,
        #[arg(short, long, default_value = "en")]
        lang: String,
        /// Preceding words, space separated
        #[arg(short, long, default_value = "")]
        context: String,
        /// Number of results (defaults to the configured suggestion limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// `{"corrections": {...}}` file to load first
        #[arg(long)]
        corrections: Option<PathBuf>,
    },
    /// Predict the next word after the given words
    Predict {
        previous: Vec<String>,
        #[arg(short, long, default_value = "en")]
        lang: String,
        /// Partially typed current word
        #[arg(long)]
        prefix: Option<String>,
        /// Number of results (defaults to the configured suggestion limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Detect the language of a text
    Detect {
        text: Vec<String>,
        /// Print every language's confidence
        #[arg(long)]
        all: bool,
    },
    /// Compile a language's text lists into a bincode snapshot
    Compile {
        #[arg(short, long)]
        lang: String,
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    match path {
        Some(p) => Config::load_toml(p)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", p.display(), e)),
        None => Ok(Config::default()),
    }
}

fn load(engine: &Engine, lang: &str) -> Result<()> {
    let outcome = engine
        .load_language(lang)
        .wait_timeout(Duration::from_secs(60))
        .context("timed out loading dictionary")?;
    match outcome {
        LoadOutcome::Loaded(report) => {
            tracing::info!(language = lang, ?report, "dictionary ready");
            Ok(())
        }
        LoadOutcome::AlreadyLoaded => Ok(()),
        LoadOutcome::Failed(reason) => bail!("could not load {}: {}", lang, reason),
        LoadOutcome::Cancelled => bail!("load of {} was cancelled", lang),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)?;
    let default_limit = config.default_suggestion_limit;

    match args.command {
        Command::Suggest {
            word,
            lang,
            context,
            limit,
            corrections,
        } => {
            let engine = Engine::from_directory(config, &args.assets)
                .with_transliterator(Arc::new(TableTransliterator::with_builtin_tables()));
            load(&engine, &lang)?;
            if let Some(path) = corrections {
                let n = engine
                    .load_corrections_file(&path, &lang)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                tracing::info!(count = n, "corrections loaded");
            }
            let context: Vec<String> = context.split_whitespace().map(str::to_string).collect();
            let out = engine.suggest(&word, &context, &lang, limit.unwrap_or(default_limit));
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Predict {
            previous,
            lang,
            prefix,
            limit,
        } => {
            let engine = Engine::from_directory(config, &args.assets);
            load(&engine, &lang)?;
            let limit = limit.unwrap_or(default_limit);
            let out = match prefix {
                Some(p) => engine.predictions(&p, &previous, &lang, limit),
                None => engine.next_word_predictions(&lang, &previous, limit),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Detect { text, all } => {
            let engine = Engine::from_directory(config, &args.assets);
            let text = text.join(" ");
            if all {
                println!("{}", serde_json::to_string_pretty(&engine.language_confidences(&text))?);
            } else {
                println!("{}", engine.detect_language(&text));
            }
        }
        Command::Compile { lang, out } => {
            let source = DirectoryAssets::new(&args.assets);
            let (dict, report) = build_dictionary(
                &source,
                &lang,
                config.max_words_per_language,
                config.max_ngrams_per_language,
                Arc::new(AtomicBool::new(false)),
            )
            .with_context(|| format!("failed to build {} from {}", lang, args.assets.display()))?;
            dict.save_bincode(&out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Wrote {} ({} words, {} bigrams, {} trigrams, {} corrections, {} malformed lines)",
                out.display(),
                report.words,
                report.bigrams,
                report.trigrams,
                report.corrections,
                report.malformed
            );
        }
    }
    Ok(())
}
