//! tx3-pipeline CLI entrypoint
//! Parses command-line arguments and drives the binding pipeline or the TRP client.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tx3_pipeline::bundler::{BuildPlugin, ResolveConfig, Tx3Plugin};
use tx3_pipeline::config::PluginOptions;
use tx3_pipeline::generation::{FreshnessPolicy, TargetLanguage};
use tx3_pipeline::infrastructure::watch::FsDevServer;
use tx3_pipeline::trp::{ArgValue, Args, ClientOptions, ProtoTx, TirEnvelope};

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

/// Config file picked up from the project root when `--config` is not given
const DEFAULT_CONFIG_FILE: &str = "tx3.toml";

#[derive(Parser)]
#[command(name = "tx3-pipeline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate bindings for the configured tx3 files
    Generate {
        #[command(flatten)]
        options: GenerationArgs,
        /// Extra arguments passed to the generator after every generated flag
        #[arg(last = true)]
        extra: Vec<String>,
    },
    /// Run the build hooks: generate at start, verify bindings at the end
    Build {
        #[command(flatten)]
        options: GenerationArgs,
    },
    /// Fail when bindings are missing or stale
    Check {
        #[command(flatten)]
        options: GenerationArgs,
    },
    /// Regenerate bindings whenever a tx3 file changes (until Ctrl-C)
    Dev {
        #[command(flatten)]
        options: GenerationArgs,
    },
    /// Resolve a transaction template against a TRP endpoint
    Resolve {
        /// TRP endpoint URL
        #[arg(long)]
        endpoint: String,
        /// JSON file holding the TIR envelope (`version`, `bytecode`, `encoding`)
        #[arg(long)]
        tir: PathBuf,
        /// Arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
        /// Extra request header (repeatable)
        #[arg(long = "header", value_parser = parse_key_value)]
        headers: Vec<(String, String)>,
        /// Environment argument sent as `params.env` (repeatable)
        #[arg(long = "env-arg", value_parser = parse_key_value)]
        env_args: Vec<(String, String)>,
    },
}

/// Options shared by every generation command; flags override the config file
#[derive(clap::Args, Debug, Clone)]
pub struct GenerationArgs {
    /// Plugin options file (defaults to tx3.toml in the project root, if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Project root input patterns and the output directory are resolved against
    #[arg(long)]
    root: Option<PathBuf>,
    /// tx3 file or glob pattern (repeatable)
    #[arg(long = "input")]
    inputs: Vec<String>,
    /// Output directory for generated bindings
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Path to the tx3-bindgen executable
    #[arg(long)]
    bindgen_path: Option<String>,
    /// Binding language (typescript, rust, python, go)
    #[arg(long)]
    target: Option<TargetLanguage>,
    /// TRP endpoint baked into the generated bindings
    #[arg(long)]
    trp_endpoint: Option<String>,
    /// Header for the generated client (repeatable)
    #[arg(long = "trp-header", value_parser = parse_key_value)]
    trp_headers: Vec<(String, String)>,
    /// Environment argument for the generated client (repeatable)
    #[arg(long = "env-arg", value_parser = parse_key_value)]
    env_args: Vec<(String, String)>,
    /// When existing bindings count as fresh (presence, modified-time)
    #[arg(long)]
    freshness: Option<FreshnessPolicy>,
}

impl GenerationArgs {
    fn project_root(&self) -> anyhow::Result<PathBuf> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to determine working directory")?,
        };
        std::path::absolute(&root)
            .with_context(|| format!("Failed to resolve project root {}", root.display()))
    }

    /// Loads the config file (if any) and applies flag overrides
    async fn load(&self, root: &Path, extra: &[String]) -> anyhow::Result<PluginOptions> {
        let config_path = self.config.clone().or_else(|| {
            let default = root.join(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        });

        let mut options = match config_path {
            Some(path) => PluginOptions::from_file(&path)
                .await
                .with_context(|| format!("Failed to load plugin options from {}", path.display()))?,
            None => PluginOptions::default(),
        };

        if !self.inputs.is_empty() {
            options.input_files = self.inputs.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            options.output_dir = Some(output_dir.clone());
        }
        if let Some(bindgen_path) = &self.bindgen_path {
            options.bindgen_path = Some(bindgen_path.clone());
        }
        if let Some(target) = self.target {
            options.target = Some(target);
        }
        if let Some(endpoint) = &self.trp_endpoint {
            options.trp_endpoint = Some(endpoint.clone());
        }
        if let Some(freshness) = self.freshness {
            options.freshness = Some(freshness);
        }
        if !self.trp_headers.is_empty() {
            options
                .trp_headers
                .get_or_insert_with(BTreeMap::new)
                .extend(self.trp_headers.iter().cloned());
        }
        if !self.env_args.is_empty() {
            options
                .env_args
                .get_or_insert_with(BTreeMap::new)
                .extend(self.env_args.iter().cloned());
        }
        if !extra.is_empty() {
            options
                .bindgen_args
                .get_or_insert_with(Vec::new)
                .extend(extra.iter().cloned());
        }

        debug!(?options, "Resolved plugin options");
        Ok(options)
    }

    async fn plugin(&self, extra: &[String]) -> anyhow::Result<Tx3Plugin> {
        let root = self.project_root()?;
        let options = self.load(&root, extra).await?;
        Tx3Plugin::new(options, &root).context("Invalid tx3 plugin options")
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default level INFO; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Generate { options, extra } => run_generate(options, extra).await?,
        Commands::Build { options } => run_build(options).await?,
        Commands::Check { options } => run_check(options).await?,
        Commands::Dev { options } => run_dev(options).await?,
        Commands::Resolve {
            endpoint,
            tir,
            args,
            headers,
            env_args,
        } => run_resolve(endpoint, tir, args.as_deref(), headers, env_args).await?,
    }
    Ok(())
}

async fn run_generate(options: &GenerationArgs, extra: &[String]) -> anyhow::Result<()> {
    let plugin = options.plugin(extra).await?;
    let outcome = plugin
        .coordinator()
        .ensure_generated()
        .await
        .context("Failed to generate tx3 bindings")?;

    info!(
        ?outcome,
        output_dir = %plugin.coordinator().config().output_dir.display(),
        "Generated tx3 bindings"
    );
    Ok(())
}

async fn run_build(options: &GenerationArgs) -> anyhow::Result<()> {
    let plugin = options.plugin(&[]).await?;

    let resolve = plugin.config(&ResolveConfig::default());
    for alias in &resolve.alias {
        info!(find = %alias.find, replacement = %alias.replacement.display(), "Import alias");
    }

    plugin.build_start().await.context("Build start failed")?;
    plugin.build_end().await.context("Build end failed")?;

    info!(plugin = plugin.name(), "Build hooks completed");
    Ok(())
}

async fn run_check(options: &GenerationArgs) -> anyhow::Result<()> {
    let plugin = options.plugin(&[]).await?;
    let config = plugin.coordinator().config();

    let fresh = plugin
        .coordinator()
        .is_fresh()
        .await
        .context("Failed to inspect output directory")?;
    if !fresh {
        anyhow::bail!(
            "tx3 bindings in {} are missing or stale",
            config.output_dir.display()
        );
    }

    println!("tx3 bindings in {} are up to date", config.output_dir.display());
    Ok(())
}

async fn run_dev(options: &GenerationArgs) -> anyhow::Result<()> {
    let plugin = options.plugin(&[]).await?;
    plugin
        .build_start()
        .await
        .context("Initial tx3 binding generation failed")?;

    let server = FsDevServer::new().context("Failed to start file watcher")?;
    let session = plugin
        .configure_server(Arc::new(server))
        .await
        .context("Failed to watch tx3 sources")?;

    info!(files = session.watched().len(), "tx3 dev session running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    session.shutdown().await;
    info!("tx3 dev session stopped");
    Ok(())
}

async fn run_resolve(
    endpoint: &str,
    tir_path: &Path,
    args: Option<&str>,
    headers: &[(String, String)],
    env_args: &[(String, String)],
) -> anyhow::Result<()> {
    let tir_content = tokio::fs::read_to_string(tir_path)
        .await
        .with_context(|| format!("Failed to read TIR file {}", tir_path.display()))?;
    let tir: TirEnvelope =
        serde_json::from_str(&tir_content).context("Failed to parse TIR envelope")?;

    let mut proto_tx = ProtoTx::new(tir);
    if let Some(json_str) = args {
        let parsed: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(json_str).context("Failed to parse JSON arguments")?;
        for (name, value) in parsed {
            let value = ArgValue::try_from(value)
                .map_err(|v| anyhow::anyhow!("Unsupported value for argument '{name}': {v}"))?;
            proto_tx.args.insert(name, value);
        }
    }

    let mut client_options = ClientOptions::new(endpoint).headers(headers.iter().cloned().collect());
    if !env_args.is_empty() {
        let env: Args = env_args
            .iter()
            .map(|(k, v)| (k.clone(), ArgValue::from(v.as_str())))
            .collect();
        client_options = client_options.env_args(env);
    }
    let client = client_options
        .build()
        .context("Failed to create TRP client")?;

    info!(endpoint = %client.endpoint(), "Resolving transaction");
    let tx = client
        .resolve(&proto_tx)
        .await
        .context("Failed to resolve transaction")?;

    println!("{}", serde_json::to_string_pretty(&tx)?);
    Ok(())
}
