//! Operator CLI for the URL shortener store.
//!
//! Runs the shortening service directly against the configured backend
//! (PostgreSQL, snapshot file or volatile memory).
//!
//! # Usage
//!
//! ```bash
//! # Check storage
//! shortener ping
//!
//! # Shorten one or more URLs
//! shortener shorten https://example.com --owner alice
//!
//! # Resolve a code
//! shortener resolve Ab3dE9xZ
//!
//! # List a user's URLs
//! shortener list alice
//!
//! # Delete codes (waits until the deletion is applied)
//! shortener delete alice Ab3dE9xZ --yes
//! ```
//!
//! See [`url_shortener_core::config`] for environment variables.

use url_shortener_core::app::AppContext;
use url_shortener_core::application::services::Shortened;
use url_shortener_core::config::{self, Config};
use url_shortener_core::error::AppError;
use url_shortener_core::utils::short_url::short_code_from_url;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use tracing_subscriber::EnvFilter;

/// CLI tool for the url-shortener store.
#[derive(Parser)]
#[command(name = "shortener")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the storage backend is reachable
    Ping,

    /// Shorten one URL, or several as a single batch
    Shorten {
        /// URLs to shorten
        #[arg(required = true)]
        urls: Vec<String>,

        /// Owner of the new short URLs
        #[arg(short, long, default_value = "")]
        owner: String,
    },

    /// Resolve a short code to its original URL
    Resolve {
        /// Short code or full short URL
        code: String,
    },

    /// List the live short URLs of a user
    List {
        owner: String,
    },

    /// Soft-delete short codes owned by a user
    Delete {
        owner: String,

        /// Short codes or full short URLs
        #[arg(required = true)]
        codes: Vec<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env()?;
    init_tracing(&config);
    config.print_summary();

    let context = AppContext::build(&config).await?;

    let result = run(cli.command, &context).await;

    // Applies any queued deletions before exiting.
    context.shutdown().await;

    result
}

/// Logs go to stderr so command output stays machine-readable.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,url_shortener_core={}", config.log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(command: Commands, context: &AppContext) -> Result<()> {
    match command {
        Commands::Ping => ping(context).await,
        Commands::Shorten { urls, owner } => shorten(context, urls, &owner).await,
        Commands::Resolve { code } => resolve(context, &code).await,
        Commands::List { owner } => list(context, &owner).await,
        Commands::Delete { owner, codes, yes } => delete(context, &owner, codes, yes).await,
    }
}

async fn ping(context: &AppContext) -> Result<()> {
    context.service.ping().await?;
    println!("{}", "✅ Storage is reachable".green().bold());

    Ok(())
}

async fn shorten(context: &AppContext, urls: Vec<String>, owner: &str) -> Result<()> {
    if let [url] = urls.as_slice() {
        let shortened = context.service.get_short_url(url, owner).await?;
        match &shortened {
            Shortened::Created(short_url) => {
                println!("{} {}", "Created:".green().bold(), short_url.bright_yellow());
            }
            Shortened::Existing(short_url) => {
                println!(
                    "{} {}",
                    "Already shortened:".yellow().bold(),
                    short_url.bright_yellow()
                );
            }
        }
        return Ok(());
    }

    let short_urls = context.service.get_short_url_batch(&urls, owner).await?;

    println!("{}", "Created:".green().bold());
    for (url, short_url) in urls.iter().zip(&short_urls) {
        println!("  {} {} {}", short_url.bright_yellow(), "→".bright_black(), url);
    }

    Ok(())
}

async fn resolve(context: &AppContext, code: &str) -> Result<()> {
    let code = to_short_code(code);

    match context.service.get_original_url(&code).await {
        Ok(url) => println!("{}", url),
        Err(AppError::Gone { .. }) => {
            println!("{} {}", "Deleted:".red().bold(), code.bright_black());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Prints a user's URLs.
///
/// # Output Format
///
/// ```text
/// 📋 URLs of alice
///
///   Short URL                              Original URL
///   ─────────────────────────────────────────────────────────────────
///   http://127.0.0.1:8080/Ab3dE9xZ        https://example.com
/// ```
async fn list(context: &AppContext, owner: &str) -> Result<()> {
    println!("{} {}", "📋 URLs of".bright_blue().bold(), owner.cyan());
    println!();

    let urls = match context.service.get_user_urls(owner).await {
        Ok(urls) => urls,
        Err(AppError::NotFound { .. }) => {
            println!("{}", "  No URLs found".yellow());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "  {:<38} {}",
        "Short URL".bright_white().bold(),
        "Original URL".bright_white().bold()
    );
    println!("  {}", "─".repeat(75).bright_black());

    for url in &urls {
        println!("  {:<38} {}", url.short_url.bright_yellow(), url.original_url);
    }

    println!();
    println!("  Total: {}", urls.len().to_string().bright_white().bold());
    println!();

    Ok(())
}

async fn delete(context: &AppContext, owner: &str, codes: Vec<String>, yes: bool) -> Result<()> {
    let codes: Vec<String> = codes.iter().map(|c| to_short_code(c)).collect();

    println!("{}", "🗑️  Delete short URLs".bright_blue().bold());
    println!("  Owner: {}", owner.cyan());
    println!("  Codes: {}", codes.join(", ").bright_yellow());
    println!();

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Delete these short URLs?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let count = codes.len();
    context.service.delete_user_urls(owner, codes)?;

    // Wait for the workers so the deletion is visible once the command exits.
    context.shutdown().await;

    println!(
        "{}",
        format!("✅ Deletion of {} code(s) applied", count).green().bold()
    );
    println!(
        "{}",
        "  Unknown codes are reported in the logs".bright_black()
    );

    Ok(())
}

/// Accepts either a bare code or a full short URL.
fn to_short_code(input: &str) -> String {
    if input.contains("://") {
        short_code_from_url(input).unwrap_or_else(|| input.to_string())
    } else {
        input.to_string()
    }
}
