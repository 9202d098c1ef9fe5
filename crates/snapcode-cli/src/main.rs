//! Snapcode CLI - turn a UI screenshot into Tailwind HTML
//!
//! Usage:
//!   snapcode key set       - Validate and store an API key (read from stdin)
//!   snapcode key status    - Show which key is in use
//!   snapcode key remove    - Erase the stored key
//!   snapcode generate      - Generate HTML from an image

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use snapcode_core::{
    AdvancedOptions, CancellationToken, ComponentCategory, Config, GenerationOutcome, GenerationRequest,
    ImagePayload, ResolvedKey, Snapcode, TemplateStyle,
};
use snapcode_crypto::ApiKey;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "snapcode")]
#[command(author = "HeyBattle1")]
#[command(version)]
#[command(about = "Screenshot to HTML, powered by Gemini", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Generate HTML from a design image
    Generate {
        /// PNG, JPEG, GIF or WebP file, at most 5 MB
        #[arg(long)]
        image: PathBuf,

        /// Menu, Section, Footer, Cart, Hero or "Full Page"
        #[arg(long, default_value = "section")]
        component: ComponentCategory,

        /// default, landing, product-card, dashboard or portfolio
        #[arg(long)]
        template: Option<TemplateStyle>,

        /// Extra free-text instructions
        #[arg(long)]
        instructions: Option<String>,

        #[arg(long)]
        no_responsive: bool,

        #[arg(long)]
        no_performance: bool,

        /// Add ARIA attributes, labels and focus states
        #[arg(long)]
        accessible: bool,

        /// Include the script the component needs to work
        #[arg(long)]
        javascript: bool,

        /// Write HTML here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Validate and store a key read from stdin
    Set,

    /// Show where the active key comes from
    Status,

    /// Erase the stored key
    Remove,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to read configuration")?;
    let app = Snapcode::from_config(config)?;

    match cli.command {
        Commands::Key { action } => match action {
            KeyAction::Set => {
                let key = read_key()?;
                match app.manager.set_user_key(&key).await? {
                    Ok(()) => println!("API key stored."),
                    Err(message) => bail!(message),
                }
            }
            KeyAction::Status => {
                let status = app.manager.status().await?;
                match &status {
                    ResolvedKey::Absent => println!("No valid API key configured."),
                    resolved => println!("Using the {} API key.", resolved.source()),
                }
                if app.config.env_api_key.is_some() && !matches!(status, ResolvedKey::Environment(_)) {
                    println!("The environment key was rejected.");
                }
            }
            KeyAction::Remove => {
                app.manager.remove_user_key()?;
                println!("Stored API key removed.");
            }
        },

        Commands::Generate {
            image,
            component,
            template,
            instructions,
            no_responsive,
            no_performance,
            accessible,
            javascript,
            output,
        } => {
            let image = ImagePayload::from_path(&image)?;
            let options = AdvancedOptions {
                responsive: !no_responsive,
                performance_optimized: !no_performance,
                accessible,
                include_javascript: javascript,
            };
            let mut request = GenerationRequest::new(image, component, options);
            if let Some(text) = instructions {
                request = request.with_instructions(text);
            }
            if let Some(template) = template {
                request = request.with_template(template);
            }

            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        debug!("interrupt received");
                        cancel.cancel();
                    }
                }
            });

            eprintln!("Generating {}...", component);
            match app.generator.generate(&request, &cancel, None).await? {
                None => eprintln!("Generation cancelled."),
                Some(GenerationOutcome::Failure(failure)) => bail!(failure.user_message()),
                Some(GenerationOutcome::Success(page)) => {
                    match output {
                        Some(path) => {
                            std::fs::write(&path, &page.html)
                                .with_context(|| format!("failed to write {}", path.display()))?;
                            eprintln!("Wrote {}", path.display());
                        }
                        None => println!("{}", page.html),
                    }
                    for source in page.sources.unwrap_or_default() {
                        eprintln!("source: {} <{}>", source.title, source.uri);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Read one key from stdin, prompting when attached to a terminal.
fn read_key() -> anyhow::Result<ApiKey> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("Paste your Gemini API key: ");
        std::io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    ApiKey::parse(&line).context("no API key given")
}
