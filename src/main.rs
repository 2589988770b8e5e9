use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use wizard::config::Config;
use wizard::rest::{self, ApiDoc};
use wizard::steps::WizardRegistry;
use wizard::validation::ExtraValidatorRegistry;

#[derive(Parser)]
#[command(name = "wizard")]
#[command(about = "Multi-step form wizard server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve every wizard in the definitions directory
    Serve {
        /// Port to listen on (default from config: 7010)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load and validate all wizard definitions
    Check,

    /// Print the step sequence of one wizard
    Steps {
        /// Wizard page identifier
        page: String,
    },

    /// Print the OpenAPI document
    Openapi,

    /// Write the effective configuration to ./wizard.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;
    let logging_handle = wizard::logging::init_logging(&config, cli.debug)?;
    if let Some(dir) = &logging_handle.log_dir {
        tracing::debug!("Logging to {}", dir.display());
    }

    match cli.command {
        Commands::Serve { port } => cmd_serve(config, port).await?,
        Commands::Check => cmd_check(&config)?,
        Commands::Steps { page } => cmd_steps(&config, &page)?,
        Commands::Openapi => cmd_openapi()?,
        Commands::Init { force } => cmd_init(&config, force)?,
    }

    Ok(())
}

fn load_registry(config: &Config) -> Result<WizardRegistry> {
    let dir = config.definitions_path();
    WizardRegistry::load_dir(&dir, &ExtraValidatorRegistry::with_builtins())
        .with_context(|| format!("Failed to load wizards from {}", dir.display()))
}

async fn cmd_serve(mut config: Config, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    let registry = load_registry(&config)?;

    println!("Starting wizard server...");
    println!("  Address: http://{}", config.bind_address());
    println!("  Endpoints:");
    println!("    GET  /api/v1/health            Health check");
    println!("    GET  /api/v1/wizards           List wizards");
    println!("    GET  /api/v1/wizards/:page     Get wizard");
    println!("    GET  /api/v1/openapi.json      OpenAPI document");
    for graph in registry.iter() {
        println!(
            "    GET|POST {:<22} {}",
            graph.route().as_str(),
            graph.title()
        );
    }
    println!();

    let addr = config.bind_address();
    let state = rest::ApiState::new(config, registry)?;
    rest::serve(state, &addr).await
}

fn cmd_check(config: &Config) -> Result<()> {
    let registry = load_registry(config)?;

    if registry.is_empty() {
        println!(
            "No wizard definitions found in {}",
            config.definitions_path().display()
        );
        return Ok(());
    }

    println!("{} wizards OK", registry.len());
    println!("{}", "─".repeat(60));
    for graph in registry.iter() {
        println!(
            "{:<20} {:<30} {} steps",
            graph.page(),
            graph.route().as_str(),
            graph.len()
        );
    }
    Ok(())
}

fn cmd_steps(config: &Config, page: &str) -> Result<()> {
    let registry = load_registry(config)?;
    let Some(graph) = registry.get(page) else {
        anyhow::bail!("Wizard '{}' not found", page);
    };

    println!("{} ({})", graph.title(), graph.route().as_str());
    println!("{}", "─".repeat(60));
    for step in graph.steps() {
        let mut flags = Vec::new();
        if step.validate_prev_steps {
            flags.push("validatePrevSteps");
        }
        if step.keep_session {
            flags.push("keepSession");
        }
        let handlers: Vec<&str> = step.forms.keys().map(String::as_str).collect();

        println!(
            "{:>2}. {:<16} {:<24} forms: [{}] {}",
            step.position + 1,
            step.id,
            step.name,
            handlers.join(", "),
            flags.join(" ")
        );
    }
    Ok(())
}

fn cmd_openapi() -> Result<()> {
    let json = ApiDoc::json().context("Failed to generate OpenAPI document")?;
    println!("{}", json);
    Ok(())
}

fn cmd_init(config: &Config, force: bool) -> Result<()> {
    let path = Config::local_config_path();
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config.save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
