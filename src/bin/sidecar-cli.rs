use clap::{Parser, Subcommand};

use metrics_sidecar::streaming::{LogLevel, LogLine};

#[derive(Parser)]
#[command(name = "sidecar-cli")]
#[command(about = "Inspect a running metrics sidecar", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current metrics snapshot
    Metrics,
    /// Follow the synthetic log stream
    Tail {
        /// Stop after this many lines (the startup marker included)
        #[arg(short = 'n', long)]
        lines: Option<usize>,

        /// Only print lines with this level
        #[arg(short, long)]
        level: Option<LogLevel>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", cli.url)).send().await?;
            if !res.status().is_success() {
                eprintln!("Error: sidecar returned status {}", res.status());
                return Ok(());
            }
            print!("{}", res.text().await?);
        }
        Commands::Tail { lines, level } => {
            let mut res = client.get(format!("{}/logs", cli.url)).send().await?;
            if !res.status().is_success() {
                eprintln!("Error: sidecar returned status {}", res.status());
                return Ok(());
            }

            let mut pending = String::new();
            let mut printed = 0;
            while let Some(chunk) = res.chunk().await? {
                pending.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(end) = pending.find('\n') {
                    let raw: String = pending.drain(..=end).collect();
                    if !matches_level(&raw, level) {
                        continue;
                    }
                    print!("{}", raw);
                    printed += 1;
                    if lines.is_some_and(|limit| printed >= limit) {
                        return Ok(());
                    }
                }
            }
        }
    }

    Ok(())
}

fn matches_level(raw: &str, level: Option<LogLevel>) -> bool {
    match level {
        None => true,
        Some(wanted) => raw
            .parse::<LogLine>()
            .map(|line| line.level == wanted)
            .unwrap_or(false),
    }
}
