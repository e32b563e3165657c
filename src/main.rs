//! metapin CLI
//!
//! Entry point for the `metapin` command-line tool.

use clap::{Args, Parser, Subcommand};
use metapin::{
    content_address, decode, HardhatArtifacts, KuboClient, MetadataDescriptor, MetadataPublisher,
    PublishReport, PublisherConfig,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metapin")]
#[command(about = "Publish Solidity metadata referenced by bytecode to IPFS", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode the metadata sections appended to bytecode
    Decode {
        #[command(flatten)]
        input: BytecodeInput,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the IPFS content address of a document
    Hash {
        /// Document to hash
        file: PathBuf,
    },

    /// Publish the metadata referenced by a compiled contract
    Publish {
        /// Contract name or fully qualified name (source:Name)
        contract: String,

        #[command(flatten)]
        options: PublishOptions,
    },

    /// Publish the metadata referenced by raw bytecode
    PublishBytecode {
        #[command(flatten)]
        input: BytecodeInput,

        #[command(flatten)]
        options: PublishOptions,
    },

    /// Verify the configuration file
    VerifyConfig {
        /// Path to config file (default: metapin.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct BytecodeInput {
    /// Bytecode as hex, with or without 0x
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    bytecode: Option<String>,

    /// Read bytecode hex from a file
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct PublishOptions {
    /// Path to config file (default: metapin.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Project root (overrides paths.root)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Kubo RPC URL (overrides storage.api_url)
    #[arg(long)]
    api_url: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { input, json } => {
            run_decode(&input, json);
        }
        Commands::Hash { file } => {
            run_hash(&file);
        }
        Commands::Publish { contract, options } => {
            run_publish(Target::Contract(&contract), &options);
        }
        Commands::PublishBytecode { input, options } => {
            let bytecode = read_bytecode(&input);
            run_publish(Target::Bytecode(&bytecode), &options);
        }
        Commands::VerifyConfig { config } => {
            run_verify_config(config.as_deref());
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn read_bytecode(input: &BytecodeInput) -> String {
    match (&input.bytecode, &input.file) {
        (Some(bytecode), _) => bytecode.clone(),
        (None, Some(path)) => match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        (None, None) => {
            eprintln!("Error: bytecode or --file is required");
            process::exit(1);
        }
    }
}

fn run_decode(input: &BytecodeInput, json_output: bool) {
    let bytecode = read_bytecode(input);
    let descriptors = match decode(&bytecode) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if json_output {
        match serde_json::to_string_pretty(&descriptors) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    if descriptors.is_empty() {
        println!("No metadata sections found.");
        return;
    }

    for (i, descriptor) in descriptors.iter().enumerate() {
        print_descriptor(i, descriptor);
    }
}

fn print_descriptor(index: usize, descriptor: &MetadataDescriptor) {
    println!("Section {}:", index);
    if let Some(ref ipfs) = descriptor.ipfs {
        println!("  ipfs: {}", ipfs);
    }
    if let Some(ref solc) = descriptor.solc {
        println!("  solc: {}", solc);
    }
    if let Some(experimental) = descriptor.experimental {
        println!("  experimental: {}", experimental);
    }
    for key in descriptor.extra.keys() {
        println!("  {}: (passed through)", key);
    }
}

fn run_hash(path: &Path) {
    match std::fs::read(path) {
        Ok(document) => println!("{}", content_address(&document)),
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

enum Target<'a> {
    Contract(&'a str),
    Bytecode(&'a str),
}

fn run_publish(target: Target<'_>, options: &PublishOptions) {
    let config = match load_config(options) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let artifacts = HardhatArtifacts::new(config.artifacts_dir());
    let storage = KuboClient::from_settings(&config.storage);
    let publisher = match MetadataPublisher::new(artifacts, storage, config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match target {
        Target::Contract(name) => publisher.publish_contract(name),
        Target::Bytecode(bytecode) => publisher.publish_bytecode(bytecode),
    };

    match result {
        Ok(report) => print_report(&report, options.json),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn load_config(options: &PublishOptions) -> Result<PublisherConfig, String> {
    let mut config =
        PublisherConfig::load_or_default(options.config.as_deref()).map_err(|e| e.to_string())?;

    if let Some(ref root) = options.root {
        config = config.with_root(root);
    }
    if let Some(ref url) = options.api_url {
        config.storage.api_url = url.clone();
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn print_report(report: &PublishReport, json_output: bool) {
    if json_output {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    for document in report.published() {
        println!(
            "Published {} as {} -> {}",
            document.contract_name,
            document.address,
            document.path.display()
        );
    }
    if report.failure_count() > 0 {
        println!("{} candidate(s) failed", report.failure_count());
    }
    println!("{}", report.address);
}

fn run_verify_config(config_path: Option<&Path>) {
    let path = config_path.unwrap_or_else(|| Path::new(metapin::config::DEFAULT_CONFIG_FILE));

    match PublisherConfig::load(path) {
        Ok(config) => {
            println!("Configuration valid: {}", path.display());
            println!();
            println!("  Storage API: {}", config.storage.api_url);
            println!("  Pin: {}", config.storage.pin);
            println!("  Artifacts: {}", config.artifacts_dir().display());
            println!("  Metadata output: {}", config.metadata_dir().display());
            if !config.compilers.is_empty() {
                let versions: Vec<_> = config.compilers.iter().map(|c| c.version.as_str()).collect();
                println!("  Compilers: {}", versions.join(", "));
            }
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    }
}
