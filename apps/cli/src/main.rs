use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use summary_wall_core::{
    ChatGenerator, DEFAULT_TRANSLATION_HEADING, PageOutcome, PageSelector, Poller,
    ProcessGenerator, Provider, Settings, SkipReason, Summarizer, TextGenerator,
    append_translation, load_channels, local_today, notion_client,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// Where summaries come from
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliProvider {
    /// External command from SUMMARY_WALL_MODEL_COMMAND
    #[default]
    Process,
    Grok,
    Openai,
    Gemini,
}

impl CliProvider {
    fn chat_provider(self) -> Option<Provider> {
        match self {
            CliProvider::Process => None,
            CliProvider::Grok => Some(Provider::Grok),
            CliProvider::Openai => Some(Provider::Openai),
            CliProvider::Gemini => Some(Provider::Gemini),
        }
    }
}

#[derive(Parser)]
#[command(name = "summary-wall", version)]
#[command(about = "File today's YouTube transcripts into Notion and write AI highlights for them")]
struct Cli {
    /// Model backend used by the summarize commands
    #[arg(short, long, global = true, value_enum, default_value_t = CliProvider::Process)]
    provider: CliProvider,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a page for every channel that published a video today
    Poll {
        /// Channel list, overrides SUMMARY_WALL_CHANNELS
        #[arg(long)]
        channels: Option<PathBuf>,
    },
    /// Summarise the most recently edited pages that lack a summary
    Summarize {
        #[arg(default_value_t = 1)]
        limit: usize,
    },
    /// Summarise a single page by id
    SummarizePage { page_id: String },
    /// Print the transcript stored on a page
    Extract { page_id: String },
    /// Append a translated transcript under its own heading
    AppendTranslation {
        page_id: String,
        file: PathBuf,
        #[arg(long, default_value = DEFAULT_TRANSLATION_HEADING)]
        heading: String,
    },
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("summary_wall=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .with(env_filter)
            .init();
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Shows a spinner on an interactive terminal while the model works.
struct SpinnerGenerator {
    inner: Box<dyn TextGenerator>,
    label: String,
}

#[async_trait]
impl TextGenerator for SpinnerGenerator {
    async fn generate(&self, prompt: &str) -> summary_wall_core::Result<String> {
        if !Term::stderr().is_term() {
            return self.inner.generate(prompt).await;
        }

        let started = Instant::now();
        let spinner = create_spinner(&format!("Summarising with {}...", self.label));
        let result = self.inner.generate(prompt).await;
        let mark = if result.is_ok() {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        };
        spinner.finish_with_message(format!(
            "{} {} replied {}",
            mark,
            self.label,
            style(format!("[{}]", format_duration(started.elapsed()))).dim()
        ));
        result
    }
}

fn build_generator(provider: CliProvider, settings: &Settings) -> Result<Box<dyn TextGenerator>> {
    let (inner, label): (Box<dyn TextGenerator>, String) = match provider.chat_provider() {
        Some(provider) => (
            Box::new(ChatGenerator::from_env(&provider, settings.model.timeout)?),
            provider.name().to_string(),
        ),
        None => (
            Box::new(ProcessGenerator::from_settings(&settings.model)?),
            "model command".to_string(),
        ),
    };
    Ok(Box::new(SpinnerGenerator { inner, label }))
}

fn print_banner(subtitle: &str) {
    println!(
        "\n{}  {}\n",
        style("summary-wall").cyan().bold(),
        style(subtitle).dim()
    );
}

fn print_count(label: &str, count: usize) {
    println!("  {:<14} {}", style(label).dim(), style(count).bold());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    let total_start = Instant::now();

    match cli.command {
        Command::Poll { channels } => {
            print_banner("Poll channels");
            let path = channels.unwrap_or_else(|| settings.channels_path.clone());
            let channels = load_channels(&path)?;
            let today = local_today(settings.utc_offset);
            info!(channels = channels.len(), %today, "Starting poll");

            let report = Poller::from_settings(&settings)?
                .poll(&channels, today)
                .await;

            println!("{}", style("─".repeat(60)).dim());
            print_count("Created", report.created.len());
            print_count("Skipped", report.skipped);
            print_count("Failed", report.failed);
            for page_id in &report.created {
                println!("  {} {}", style("+").green().bold(), style(page_id).cyan());
            }
        }
        Command::Summarize { limit } => {
            print_banner("Summarize pages");
            let summarizer = Summarizer::new(
                notion_client(&settings)?,
                settings.database_id.as_str(),
                build_generator(cli.provider, &settings)?,
            );
            let report = summarizer.summarize(limit).await?;

            println!("{}", style("─".repeat(60)).dim());
            print_count("Summarized", report.summarized.len());
            print_count("Skipped", report.skipped);
            print_count("Failed", report.failed);
            for page_id in &report.needs_repair {
                println!(
                    "  {} {} {}",
                    style("!").yellow().bold(),
                    style(page_id).cyan(),
                    style("needs repair").yellow()
                );
            }
        }
        Command::SummarizePage { page_id } => {
            print_banner("Summarize page");
            let summarizer = Summarizer::new(
                notion_client(&settings)?,
                settings.database_id.as_str(),
                build_generator(cli.provider, &settings)?,
            );

            match summarizer.summarize_page(&page_id).await? {
                PageOutcome::Rebuilt(outcome) if outcome.is_complete() => {
                    println!("{} Summary written to {}", style("✓").green().bold(), page_id);
                }
                PageOutcome::Rebuilt(outcome) => {
                    println!(
                        "{} Partial rebuild of {}: archived {}, appended {}, {} archive failures",
                        style("!").yellow().bold(),
                        page_id,
                        outcome.archived_blocks,
                        outcome.appended_blocks,
                        outcome.failed_archives.len()
                    );
                    if let Some(error) = outcome.error {
                        println!("  {}", style(error).red());
                    }
                }
                PageOutcome::Skipped(reason) => {
                    let why = match reason {
                        SkipReason::AlreadySummarized => "already has a summary",
                        SkipReason::EmptyTranscript => "no transcript text",
                        SkipReason::EmptyReply => "model returned nothing",
                        SkipReason::EmptyAfterSanitize => "reply was empty after clean-up",
                    };
                    println!("{} Skipped {}: {}", style("-").dim(), page_id, why);
                }
            }
        }
        Command::Extract { page_id } => {
            let store = notion_client(&settings)?;
            let page = PageSelector::new(&store, &settings.database_id)
                .load(&page_id)
                .await?;
            println!("{}", page.transcript().full);
            return Ok(());
        }
        Command::AppendTranslation {
            page_id,
            file,
            heading,
        } => {
            print_banner("Append translation");
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let store = notion_client(&settings)?;
            let appended = append_translation(&store, &page_id, &heading, &text).await?;
            println!(
                "{} Appended {} blocks to {}",
                style("✓").green().bold(),
                appended,
                style(&page_id).cyan()
            );
        }
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    Ok(())
}
