//! Inktrace CLI — analyze, replay, annotate and export writing sessions.
//!
//! Usage:
//!   inktrace analyze <history.json>
//!   inktrace replay <history.json>
//!   inktrace keyphrases <file> [--max-n N] [--min-score S] [--min-count C] [--limit L]
//!   inktrace render <file> [--mark PHRASE]... [--caret N] [--auto]
//!   inktrace export <history.json> --format json|csv [--out PATH]
//!   inktrace translate <text> --target LANG [--source LANG]

use clap::{Parser, Subcommand, ValueEnum};
use inktrace::cancel::CancellationToken;
use inktrace::export;
use inktrace::extract::{extract, ExtractOptions};
use inktrace::timeline::{replay, HistoryEntry, ReplayScheduler, ReplayStep, ReplayTarget};
use inktrace::translate::{HttpTranslator, TranslateRequest, Translator};
use inktrace::{Config, ConnotationScorer, SessionController, TranslationChain};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "inktrace",
    version,
    about = "Writing timeline recorder with connotation-scored phrase annotation"
)]
struct Cli {
    /// Path to config file (default: <config_dir>/inktrace/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print session metrics for a recorded history as JSON
    Analyze {
        /// Exported session or bare array of {value, time}
        history: PathBuf,
    },
    /// Replay a recorded history in real time
    Replay {
        history: PathBuf,
    },
    /// Rank keyphrases in a text file
    Keyphrases {
        file: PathBuf,
        /// Longest n-gram considered
        #[arg(long)]
        max_n: Option<usize>,
        /// Minimum phrase score
        #[arg(long)]
        min_score: Option<f64>,
        /// Minimum occurrences in the text
        #[arg(long)]
        min_count: Option<usize>,
        /// Maximum phrases printed
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Render a text file into annotated spans (one JSON object per line)
    Render {
        file: PathBuf,
        /// Mark a phrase as a user annotation (repeatable)
        #[arg(long = "mark")]
        marks: Vec<String>,
        /// Caret position (characters) for the live annotation
        #[arg(long)]
        caret: Option<usize>,
        /// Include automatically extracted phrases
        #[arg(long)]
        auto: bool,
    },
    /// Export a recorded history
    Export {
        history: PathBuf,
        #[arg(long, value_enum)]
        format: ExportFormat,
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Translate text through the configured fallback chain
    Translate {
        text: String,
        #[arg(long)]
        target: String,
        #[arg(long, default_value = "en")]
        source: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_history(path: &Path) -> Result<Vec<HistoryEntry>, String> {
    export::read_history(path).map_err(|e| format!("cannot read history '{}': {}", path.display(), e))
}

fn read_text(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path.display(), e))
}

fn cmd_analyze(config: &Config, path: &Path) -> i32 {
    let history = match read_history(path) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let analysis = inktrace::metrics::run_analysis_with(&history, &config.metrics);
    match serde_json::to_string_pretty(&analysis) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Prints each replay step as it lands.
struct StepPrinter {
    scheduler: Mutex<ReplayScheduler>,
}

impl ReplayTarget for StepPrinter {
    fn apply_step(&self, token: &CancellationToken, step: &ReplayStep) -> bool {
        let mut scheduler = self.scheduler.lock().unwrap_or_else(|p| p.into_inner());
        if !scheduler.advance(token) {
            return false;
        }
        println!("[{:>4}ms] {:?}", step.delay.as_millis(), step.value);
        true
    }
}

async fn cmd_replay(config: &Config, path: &Path) -> i32 {
    let history = match read_history(path) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut scheduler = ReplayScheduler::new(config.replay_timing());
    let Some((token, steps)) = scheduler.start(&history) else {
        eprintln!("Nothing to replay: history is empty");
        return 0;
    };
    let printer = Arc::new(StepPrinter {
        scheduler: Mutex::new(scheduler),
    });

    let interrupt = token.clone();
    tokio::select! {
        _ = replay::drive(printer, token, steps) => 0,
        _ = tokio::signal::ctrl_c() => {
            interrupt.cancel();
            eprintln!("Replay interrupted");
            130
        }
    }
}

fn cmd_keyphrases(scorer: &ConnotationScorer, path: &Path, options: ExtractOptions) -> i32 {
    let text = match read_text(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let phrases = extract(&text, &options);
    if phrases.is_empty() {
        println!("No keyphrases found.");
        return 0;
    }
    for phrase in phrases {
        let (connotation, color) = scorer.assess(&phrase.phrase);
        println!(
            "{:>7.3}  x{:<3} {:>+5.2}  {:<24}  {}",
            phrase.score, phrase.count, connotation, color.to_string(), phrase.phrase
        );
    }
    0
}

async fn cmd_render(config: &Config, path: &Path, marks: &[String], caret: Option<usize>, auto: bool) -> i32 {
    let text = match read_text(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let controller = match SessionController::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    controller.set_auto_enabled(auto);
    controller.restore(vec![HistoryEntry::new(text, 0)]);
    for phrase in marks {
        if !controller.mark(phrase) {
            eprintln!("Warning: '{}' is blank or already marked", phrase);
        }
    }
    if auto {
        controller.refresh_auto().await;
    }

    for span in controller.render(caret) {
        match serde_json::to_string(&span) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }
    0
}

fn cmd_export(config: &Config, path: &Path, format: ExportFormat, out: Option<&Path>) -> i32 {
    let history = match read_history(path) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let rendered = match format {
        ExportFormat::Json => {
            let analysis = inktrace::metrics::run_analysis_with(&history, &config.metrics);
            export::to_json(&history, analysis.as_ref())
        }
        ExportFormat::Csv => Ok(export::to_csv(&history)),
    };
    let rendered = match rendered {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match out {
        Some(out) => match std::fs::write(out, rendered) {
            Ok(()) => {
                eprintln!("Wrote {} entries to {}", history.len(), out.display());
                0
            }
            Err(e) => {
                eprintln!("Error: cannot write '{}': {}", out.display(), e);
                1
            }
        },
        None => {
            print!("{}", rendered);
            0
        }
    }
}

fn translation_chain(config: &Config) -> Result<TranslationChain, String> {
    let timeout = Duration::from_millis(config.translation.timeout_ms);
    let tier = |name: &str, endpoint: &Option<String>| -> Result<Option<Arc<dyn Translator>>, String> {
        match endpoint {
            Some(endpoint) => HttpTranslator::new(name, endpoint.clone(), timeout)
                .map(|t| Some(Arc::new(t) as Arc<dyn Translator>))
                .map_err(|e| e.to_string()),
            None => Ok(None),
        }
    };
    Ok(TranslationChain::new(
        tier("primary", &config.translation.primary)?,
        tier("secondary", &config.translation.secondary)?,
    ))
}

async fn cmd_translate(config: &Config, text: &str, source: &str, target: &str) -> i32 {
    let chain = match translation_chain(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match chain.translate(&TranslateRequest::new(text, source, target)).await {
        Ok(translation) => {
            println!("{}", translation.text);
            eprintln!("(via {:?} tier)", translation.tier);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = rt.block_on(async {
        match cli.command {
            Commands::Analyze { history } => cmd_analyze(&config, &history),
            Commands::Replay { history } => cmd_replay(&config, &history).await,
            Commands::Keyphrases {
                file,
                max_n,
                min_score,
                min_count,
                limit,
            } => {
                let scorer = match config.build_scorer() {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        return 1;
                    }
                };
                let defaults = config.extract_options();
                let options = ExtractOptions {
                    max_n: max_n.unwrap_or(defaults.max_n),
                    min_score: min_score.unwrap_or(defaults.min_score),
                    min_count: min_count.unwrap_or(defaults.min_count),
                    max_phrases: limit,
                };
                cmd_keyphrases(&scorer, &file, options)
            }
            Commands::Render {
                file,
                marks,
                caret,
                auto,
            } => cmd_render(&config, &file, &marks, caret, auto).await,
            Commands::Export { history, format, out } => {
                cmd_export(&config, &history, format, out.as_deref())
            }
            Commands::Translate { text, target, source } => {
                cmd_translate(&config, &text, &source, &target).await
            }
        }
    });
    std::process::exit(code);
}
