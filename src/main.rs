use clap::Parser;
use serp_harvest::config::{BrowserFetchConfig, FetchStrategyConfig};
use serp_harvest::{HarvestConfig, Harvester, Mode, PipelineResult};
use std::process::ExitCode;

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ::log::error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args)?;

    if let FetchStrategyConfig::Browser(browser) = &config.strategy {
        println!("Note: browser rendering requires a WebDriver server (e.g., ChromeDriver).");
        println!(
            "Using {}; set WEBDRIVER_URL to point elsewhere",
            browser.webdriver_url
        );
    }

    let harvester = Harvester::new(config)?;
    let started = std::time::Instant::now();

    match &args.command {
        Command::Emails(target) => {
            let result = harvester.run(&target.to_target(), Mode::Direct).await?;
            print_result(&result)?;
        }
        Command::Capture(target) => {
            let target = target.to_target();
            let captured = harvester.capture(&target).await?;
            let saved_to = harvester.store().path_for(&harvester.slot_for(&target))?;
            println!(
                "Saved {} bytes from {} to {}",
                captured.html.len(),
                captured.final_url,
                saved_to.display()
            );
        }
        Command::Links { target, dedup } => {
            let result = harvester
                .with_dedup_links(*dedup)
                .run(&target.to_target(), Mode::SnapshotThenExtract)
                .await?;
            print_result(&result)?;
        }
    }

    ::log::info!(
        "Finished in {:.2} seconds",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<HarvestConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => HarvestConfig::from_file(path)?,
        None => HarvestConfig::default(),
    };

    if args.browser && !matches!(config.strategy, FetchStrategyConfig::Browser(_)) {
        config.strategy = FetchStrategyConfig::Browser(BrowserFetchConfig::default());
    }
    if let Some(dir) = &args.snapshot_dir {
        config.snapshot_dir = dir.clone();
    }
    config.apply_env_overrides();

    Ok(config)
}

fn print_result(result: &PipelineResult) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
