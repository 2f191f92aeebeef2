use clap::{self, Parser as _};
use qrl::{Document, SymbolReference};
use qrl_load::{Config, Initializer, State};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod manifest;

#[derive(clap::Parser, Debug)]
#[clap(about = "Resolves symbol references against the modules listed in a chunk manifest")]
struct Arguments {
    /// Path to the chunk manifest listing the modules and the values they export.
    #[clap(long, short)]
    manifest: PathBuf,
    /// Base location that references and manifest entries are resolved against.
    #[clap(long, short)]
    base: String,
    /// Path to a loader configuration file.
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Logs cache activity, unless overridden by `RUST_LOG`.
    #[clap(long, short)]
    verbose: bool,
    /// The references to resolve, such as `./widgets/button.onClick`.
    #[clap(required = true)]
    references: Vec<String>,
}

fn initialize_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let arguments = Arguments::parse();
    initialize_logging(arguments.verbose);

    let config = match &arguments.config {
        Some(path) => read_config(path)?,
        None => Config::default(),
    };

    let document = Document::parse(&arguments.base)?;
    let resolver = manifest::Manifest::read(&arguments.manifest)?.into_resolver(&document)?;
    tracing::debug!(modules = resolver.module_count(), "read chunk manifest");

    let mut initializer = Initializer::with_config(config);
    initializer.set_resolver(resolver);
    let state = State::initialize(initializer);

    for reference in &arguments.references {
        let reference = SymbolReference::resolve(&document, reference)?;
        match state.resolve_reference(reference.clone()).await {
            Ok(value) => println!(
                "{}\t{}\t{}",
                reference.module(),
                reference.symbol(),
                manifest::display_value(&value)
            ),
            Err(error) => {
                eprintln!("Error: {}", error);
                if let Some(source) = std::error::Error::source(&error) {
                    eprintln!("- caused by: {}", source);
                }
                std::process::exit(1)
            }
        }
    }

    tracing::debug!(statistics = ?state.statistics(), "resolved all references");
    Ok(())
}
