//! services/app/src/bin/gpdf.rs
//!
//! A thin command-line driver for the GPdf flow: summarize a PDF, optionally
//! export the summary to a document and ask a follow-up question.
//!
//! Usage: gpdf <file.pdf> [--export docx|pdf|txt] [--ask "<question>"]

use app_lib::{
    adapters::{HttpBackend, JsonFileStore},
    config::Config,
    error::AppError,
    flow::{AppFlow, Phase},
    session::SessionTracker,
};
use gpdf_core::domain::ExportFormat;
use gpdf_core::ports::BackendService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct CliArgs {
    file: std::path::PathBuf,
    export: Option<ExportFormat>,
    ask: Option<String>,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut args = std::env::args().skip(1);
    let file = args
        .next()
        .ok_or_else(|| "usage: gpdf <file.pdf> [--export docx|pdf|txt] [--ask \"<question>\"]".to_string())?;

    let mut export = None;
    let mut ask = None;
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--export" => {
                let value = args.next().ok_or("--export requires a format")?;
                export = Some(value.parse::<ExportFormat>()?);
            }
            "--ask" => {
                ask = Some(args.next().ok_or("--ask requires a question")?);
            }
            other => return Err(format!("unknown argument: '{}'", other)),
        }
    }

    Ok(CliArgs {
        file: std::path::PathBuf::from(file),
        export,
        ask,
    })
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    // --- 2. Initialize Service Adapters ---
    let backend = Arc::new(HttpBackend::new(
        &config.api_base_url,
        config.request_timeout,
    )?);
    let store = Arc::new(JsonFileStore::new(config.store_path.clone()));
    let sessions = SessionTracker::new(store);

    // --- 3. Run the Upload Flow ---
    let mut flow = AppFlow::new(backend.clone(), sessions);
    flow.initialize().await;

    if let Phase::Offline { error } = flow.phase() {
        eprintln!("{}", error);
        std::process::exit(1);
    }

    if let Some(usage) = flow.usage() {
        info!(
            "Usage today: {}/{} ({} remaining)",
            usage.usage_count, usage.limit, usage.remaining
        );
    }

    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let file_bytes = tokio::fs::read(&args.file).await?;

    if let Err(err) = flow.submit_file(&file_name, file_bytes).await {
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }

    if let Phase::Summary { result } = flow.phase() {
        println!("{}", result.summary);
        info!("Summarized {} page(s)", result.page_count);
        if let Some(seconds) = result.processing_time {
            info!("Server processing time: {:.2}s", seconds);
        }
    }

    // --- 4. Optional Export and Q&A ---
    if let Some(format) = args.export {
        let conversion = flow.export(format).await?;
        let bytes = backend.download(&conversion.download_url).await?;
        tokio::fs::write(&conversion.filename, bytes).await?;
        println!("Saved {}", conversion.filename);
    }

    if let Some(question) = args.ask {
        match flow.ask(&question).await {
            Ok(answer) => println!("\nQ: {}\nA: {}", question, answer.answer),
            Err(err) => eprintln!("{}", err.user_message()),
        }
    }

    Ok(())
}
