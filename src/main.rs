// src/main.rs

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use lscgen::{Config, CredentialPipeline, CredentialRequest};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "lscgen")]
#[command(
    author,
    version,
    about = "Create SSH credentials and key installer packages for scan users",
    long_about = None
)]
struct Cli {
    /// Configuration file (default: $LSCGEN_CONFIG or <config dir>/lscgen/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a keypair plus RPM and DEB installer packages for a user
    Create {
        /// Login name of the scan user
        #[arg(short, long)]
        name: String,

        #[command(flatten)]
        password: PasswordSource,

        /// Directory the keys and packages are written to
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Report which external tools are available
    Check,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PasswordSource {
    /// Read the password from this environment variable
    #[arg(long, value_name = "VAR")]
    password_env: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    password_stdin: bool,
}

impl PasswordSource {
    fn read(&self) -> Result<String> {
        if let Some(var) = &self.password_env {
            return std::env::var(var)
                .with_context(|| format!("Password variable {} is not set", var));
        }

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read password from stdin")?;
        let password = line.trim_end_matches(['\r', '\n']).to_string();
        if password.is_empty() {
            bail!("No password on stdin");
        }
        Ok(password)
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let mut config = Config::load(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => Ok(Config::discover()?),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Create {
            name,
            password,
            output,
        } => {
            let request = CredentialRequest::new(name, password.read()?);
            let pipeline = CredentialPipeline::from_config(config);
            info!("Creating credential packages for {}", request.name());

            let bundle = pipeline.run(&request)?;
            bundle
                .write_to(&output, request.name(), pipeline.naming())
                .with_context(|| format!("Failed to write artifacts to {}", output.display()))?;

            for warning in &bundle.teardown_warnings {
                eprintln!("warning: {}", warning);
            }
            println!("Wrote credentials for {} to {}", request.name(), output.display());
            println!("  RPM: {} bytes", bundle.native_package_size());
            println!("  DEB: {} bytes", bundle.converted_package_size());
            Ok(())
        }
        Commands::Check => {
            let tools = config.tools.clone();
            let pipeline = CredentialPipeline::from_config(config);
            let caps = pipeline.capabilities();

            for program in [&tools.keygen, &tools.openssl, &tools.fakeroot] {
                match caps.locate(program) {
                    Some(path) => println!("{:<12} {}", program, path.display()),
                    None => println!("{:<12} not found", program),
                }
            }
            let converter = if caps.converter_available() {
                "available"
            } else {
                "not found"
            };
            println!("{:<12} {}", tools.converter, converter);
            match caps.generator_dir() {
                Some(dir) => println!(
                    "{:<12} {}",
                    "generator",
                    dir.join(&tools.generator_script).display()
                ),
                None => println!("{:<12} not found in {}", "generator", tools.data_dir.display()),
            }
            Ok(())
        }
    }
}
