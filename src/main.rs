use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::future::Future;
use std::path::PathBuf;

use lumi_qa::driver::traits::Session;
use lumi_qa::report;
use lumi_qa::runner::{execute_run, ConsoleEventListener, RunContext, RunOutcome, SuiteRunner};
use lumi_qa::suites::{api, mobile, web};
use lumi_qa::utils::Config;

#[derive(Parser)]
#[command(name = "lumi-qa")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(about = "API, mobile and web QA suites with JSON, CSV and JUnit reports", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API suite
    Api {
        /// Output directory for reports and artifacts
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// API base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Run the mobile suite through an Appium server
    Mobile {
        /// Output directory for reports and artifacts
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Appium server URL
        #[arg(long)]
        server: Option<String>,
    },

    /// Run the browser purchase flow
    Web {
        /// Output directory for reports and artifacts
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Shop base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Show the browser window
        #[arg(long, default_value = "false")]
        headed: bool,
    },

    /// Generate report from test results
    Report {
        /// Path to a JSON test report
        results: PathBuf,

        /// Output format (console, json, csv, junit)
        #[arg(short, long, default_value = "console")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    let outcome = match cli.command {
        Commands::Api { output, base_url } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            if let Some(url) = base_url {
                config.api.base_url = url;
            }

            let ctx = RunContext::new(api::SUITE, &config.output_dir)?;
            println!("  Target: {}", config.api.base_url.cyan());
            run(&ctx, api::connect(&config.api), api::runner()).await?
        }

        Commands::Mobile { output, server } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            if let Some(url) = server {
                config.appium.server_url = url;
            }

            let ctx = RunContext::new(mobile::SUITE, &config.output_dir)?;
            let shots = ctx.screenshots();
            println!("  Appium: {}", config.appium.server_url.cyan());
            println!("  Screenshots: {}", shots.dir().display().to_string().cyan());

            let runner = mobile::runner(mobile::Flow::new(shots.clone()));
            run(&ctx, mobile::connect(&config.appium, &shots), runner).await?
        }

        Commands::Web {
            output,
            base_url,
            headed,
        } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            if let Some(url) = base_url {
                config.web.base_url = url;
            }
            if headed {
                config.web.headless = false;
            }

            let ctx = RunContext::new(web::SUITE, &config.output_dir)?;
            println!("  Target: {}", config.web.base_url.cyan());
            if headed {
                println!("  Browser: {}", "Headed".yellow());
            }

            let shop = web::Shop::new(&config.web, &ctx);
            run(&ctx, web::connect(&config.web), web::runner(shop)).await?
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
            return Ok(());
        }
    };

    if outcome.is_aborted() {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one suite with live console progress, then print its outcome
async fn run<D, S>(ctx: &RunContext, setup: S, runner: SuiteRunner<D>) -> Result<RunOutcome>
where
    D: Session + ?Sized,
    S: Future<Output = Result<Box<D>>>,
{
    println!("  Run ID: {}", ctx.run_id().dimmed());
    println!(
        "  Output: {}",
        ctx.output_dir().display().to_string().cyan()
    );

    // Ends once the runner (and its emitter) is dropped
    let listener = tokio::spawn(ConsoleEventListener::listen(runner.subscribe()));
    let outcome = execute_run(ctx, setup, runner).await?;
    if let Err(e) = listener.await {
        log::warn!("console listener stopped abnormally: {}", e);
    }

    match &outcome {
        RunOutcome::Completed { summary, reports } => {
            report::console::print_summary(summary);
            println!("\n{} Reports:", "📄".to_string().blue());
            println!("   JSON:  {}", reports.json.display());
            println!("   CSV:   {}", reports.csv.display());
            println!("   JUnit: {}", reports.junit.display());
        }
        RunOutcome::Aborted {
            error,
            error_report,
        } => {
            eprintln!("\n{} {:#}", "✗ FATAL ERROR:".red().bold(), error);
            eprintln!("   Error report: {}", error_report.display());
        }
    }

    Ok(outcome)
}
