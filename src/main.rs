use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use policy_checker::config::{merge_phrases, split_phrases, Settings};
use policy_checker::export::{self, OutputFormat};
use policy_checker::fetch::{build_client, ContentFetcher};
use policy_checker::matcher::PhraseMatcher;
use policy_checker::pipeline::{self, RunConfig};
use policy_checker::processor::{self, CheckMode, ProcessOptions};
use policy_checker::source;

#[derive(Parser)]
#[command(name = "policy_checker", about = "Check privacy policies for sensitive-data phrases")]
struct Cli {
    /// Settings file (default: ./policy_checker.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service-account key for authenticated spreadsheet access
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every URL in a sheet or CSV file and write the results
    Run(RunArgs),
    /// List the URLs a source would yield
    Urls {
        /// Spreadsheet URL/ID or local CSV path
        #[arg(short, long)]
        source: String,
        /// Read through the Sheets API with the service-account key
        #[arg(long)]
        auth: bool,
    },
    /// Check a single site and print its status
    Fetch {
        url: String,
        /// Extra phrases, comma-separated
        #[arg(short, long, default_value = "")]
        phrases: String,
        #[arg(short, long, value_enum, default_value_t = CheckMode::Probe)]
        mode: CheckMode,
    },
    /// Prompt for the source and phrases, then run
    Interactive,
}

#[derive(Args)]
struct RunArgs {
    /// Spreadsheet URL/ID or local CSV path
    #[arg(short, long)]
    source: String,
    /// Read through the Sheets API with the service-account key
    #[arg(long)]
    auth: bool,
    /// Extra phrases, comma-separated
    #[arg(short, long, default_value = "")]
    phrases: String,
    #[arg(short, long, value_enum, default_value_t = CheckMode::Probe)]
    mode: CheckMode,
    /// Output file (default from settings)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Output format (default: from the output extension)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
    /// Write Y/N/NA rows back into the source spreadsheet
    #[arg(long)]
    write_back: bool,
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(path) = cli.credentials {
        settings.credentials_path = path;
    }

    let result = match cli.command {
        Commands::Run(args) => {
            let output = args.output.unwrap_or_else(|| settings.output_path.clone());
            let format = args.format.unwrap_or_else(|| OutputFormat::from_path(&output));
            let cfg = RunConfig {
                source: args.source,
                authenticated: args.auth,
                extra_phrases: split_phrases(&args.phrases),
                mode: args.mode,
                output,
                format,
                write_back: args.write_back,
                show_progress: !args.no_progress,
                settings,
            };
            run_and_report(&cfg).await
        }
        Commands::Urls { source: locator, auth } => {
            let client = build_client(&settings)?;
            let list = source::read_urls(&locator, auth, &client, &settings).await;
            if let Some(warning) = &list.warning {
                println!("{}", warning);
            }
            for (row, url) in list.rows.iter().zip(&list.urls) {
                println!("{:>4}  {}", row, truncate(url, 100));
            }
            if !list.urls.is_empty() {
                println!("\n{} URLs", list.urls.len());
            }
            Ok(())
        }
        Commands::Fetch { url, phrases, mode } => {
            let phrases = merge_phrases(&settings.phrases, split_phrases(&phrases));
            let matcher = PhraseMatcher::new(&phrases)?;
            let client = build_client(&settings)?;
            let fetcher = ContentFetcher::from_settings(client, &settings);
            let opts = ProcessOptions {
                delay: std::time::Duration::ZERO,
                ..ProcessOptions::from_settings(&settings, mode, false)
            };
            let record = match processor::process_one(&url, &matcher, &fetcher, &opts).await {
                Ok(r) => r,
                Err(e) => policy_checker::ResultRecord::unavailable(&url, e.to_string()),
            };
            println!("URL:    {}", record.url);
            println!("Page:   {}", record.policy_url.as_deref().unwrap_or("-"));
            println!("Status: {}", record.status());
            Ok(())
        }
        Commands::Interactive => {
            println!("Welcome to the Privacy Policy Checker!");
            let locator = prompt("Please enter the Google Sheet URL or CSV file path: ")?;
            let extra = prompt("Enter additional terms to check for, separated by commas (press Enter if none): ")?;
            let mut cfg = RunConfig::new(locator, settings);
            cfg.extra_phrases = split_phrases(&extra);
            let result = run_and_report(&cfg).await;
            println!("\nThank you for using the Privacy Policy Checker!");
            result
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_and_report(cfg: &RunConfig) -> anyhow::Result<()> {
    let Some(summary) = pipeline::run(cfg).await? else {
        return Ok(());
    };
    export::print_summary(&summary.records, &summary.phrases);
    if let Some(err) = &summary.sheet_error {
        println!("\nSpreadsheet was not updated: {}", err);
    }
    Ok(())
}

fn prompt(question: &str) -> anyhow::Result<String> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
