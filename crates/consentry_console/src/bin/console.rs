//! CLI entry point for the consent engine console.
//!
//! Supports two execution modes:
//! - Interactive: read instructions from stdin line-by-line
//! - Batch: read instructions from a playbook file
//!
//! # Examples
//!
//! Interactive mode:
//! ```bash
//! ./consentry
//! > USER 1 alice
//! > FACILITY 1 storage
//! > REGISTER 1
//! > CREATE-CONSENT 1 1
//! > ^D
//! ```
//!
//! Batch mode:
//! ```bash
//! ./consentry --playbook scenario.consentry
//! ```

use std::io::{self, BufRead, Write};

use clap::Parser;
use consentry_console::ConsoleHandler;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "consentry")]
#[command(about = "Drive consent engine scenarios", long_about = None)]
struct Args {
    /// Path to a playbook file containing instructions to execute (batch mode)
    #[arg(short, long)]
    playbook: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_writer(std::io::stdout).with_target(false).with_env_filter(filter).init();

    let args = Args::parse();

    let mut handler = ConsoleHandler::default();

    if let Some(playbook_path) = args.playbook {
        run_batch_mode(&mut handler, &playbook_path).await?;
    } else {
        run_interactive_mode(&mut handler).await?;
    }

    Ok(())
}

/// Run in batch mode, reading instructions from a file
async fn run_batch_mode(handler: &mut ConsoleHandler, file_path: &str) -> anyhow::Result<()> {
    info!("Running batch mode from file: {}", file_path);

    let file = std::fs::File::open(file_path)?;
    let reader = io::BufReader::new(file);

    let start_time = std::time::Instant::now();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        debug!("[{}] {} ... ", line_num + 1, line.trim());

        if let Err(e) = handler.execute_line(&line).await {
            info!("✗ Error: {}", e);
            return Err(e);
        }
    }

    info!(execution_time = ?start_time.elapsed(), "Batch execution completed successfully.");
    Ok(())
}

/// Run in interactive mode, reading instructions from stdin
async fn run_interactive_mode(handler: &mut ConsoleHandler) -> anyhow::Result<()> {
    println!("consentry - Interactive Mode");
    println!("============================");
    println!("Press Ctrl+D to exit");
    println!();

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let bytes_read = reader.read_line(&mut line)?;

        // EOF reached
        if bytes_read == 0 {
            println!();
            println!("Goodbye!");
            break;
        }

        if let Err(e) = handler.execute_line(&line).await {
            // Continue in interactive mode even after errors
            eprintln!("✗ Error: {e}");
        }
    }

    Ok(())
}
