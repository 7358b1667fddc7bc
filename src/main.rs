mod config;
mod drive;
mod parser;
mod pipeline;
mod record;
mod slack;
mod team;
mod wiki;

use std::time::Instant;

use clap::{Parser, Subcommand};

use config::Config;

#[derive(Parser)]
#[command(name = "devlog_sync", about = "Devlog thread → Drive + wiki sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, parse, upload, and publish the configured thread
    Run {
        /// Merge into the local checkout but skip commit/push
        #[arg(long)]
        no_publish: bool,
    },
    /// Print the thread's comments without processing them
    Fetch,
    /// Parse a comment body from a local text file and print the fields
    Parse {
        /// Path to a file containing one comment body
        file: String,
    },
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

    let result = match cli.command {
        Commands::Run { no_publish } => {
            let cfg = Config::from_env()?;
            pipeline::run(&cfg, !no_publish).await
        }
        Commands::Fetch => {
            let (token, channel, thread_ts) = Config::slack_only()?;
            let comments = slack::fetch_thread_comments(&token, &channel, &thread_ts).await?;
            println!("{} messages in thread {}", comments.len(), thread_ts);
            for c in &comments {
                let attachments = if c.attachment_urls.is_empty() {
                    String::new()
                } else {
                    format!(" [{} attachments]", c.attachment_urls.len())
                };
                println!("--- {} {} ({}){}", c.timestamp, c.author_id, c.id, attachments);
                println!("{}", c.body);
            }
            Ok(())
        }
        Commands::Parse { file } => {
            let body = std::fs::read_to_string(&file)?;
            let fields = parser::parse_body(&body)?;
            println!("{}", serde_json::to_string_pretty(&fields)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}
