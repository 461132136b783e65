use clap::{Parser, Subcommand};
use folio::config::{self, EndpointOverrides, FolioConfig};
use folio::content::HttpContentSource;
use folio::imaging::RustBackend;
use folio::reader::ManifestStore;
use folio::sources::{ImageSourceOptions, NavigationDirection, get_image_sources};
use folio::{output, process};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn version_string() -> &'static str {
    let on_tag = env!("FOLIO_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("FOLIO_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Responsive image derivatives and gallery manifest from a Prismic repository")]
#[command(long_about = "\
Responsive image derivatives and gallery manifest from a Prismic repository

Collections and image assets live in the CMS. A build fetches them, renders
every referenced image at a ladder of widths, and writes:

  public/i/
  └── <collection>/
      ├── w-480/<image>.jpg
      ├── w-960/<image>.jpg
      └── ...
  generated/image-manifest.json

Endpoint resolution (first available wins):
  --api-endpoint / PRISMIC_API_ENDPOINT
  content.api_endpoint in folio.toml
  apiEndpoint in slicemachine.config.json, then sm.json
  repository name (--repository, folio.toml, project files)

Run 'folio gen-config' to generate a documented folio.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Project directory (holds folio.toml and Slice Machine files)
    #[arg(long, default_value = ".", global = true)]
    project_dir: PathBuf,

    /// Config file, relative to the project directory
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Content API endpoint
    #[arg(long, env = "PRISMIC_API_ENDPOINT", global = true)]
    api_endpoint: Option<String>,

    /// Repository name, used to derive the endpoint
    #[arg(long = "repository", env = "PRISMIC_REPOSITORY_NAME", global = true)]
    repository_name: Option<String>,

    /// Access token for private repositories
    #[arg(long, env = "PRISMIC_ACCESS_TOKEN", global = true, hide_env_values = true)]
    access_token: Option<String>,

    /// Override output.manifest_path
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Override output.image_root
    #[arg(long, global = true)]
    image_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch content, render derivatives and write the manifest
    Build,
    /// Validate config and summarize the current manifest
    Check,
    /// Print responsive sources for one image
    Sources {
        /// Collection slug
        collection: String,
        /// Image slug
        image: String,
        /// `sizes` hint (defaults to viewer.sizes)
        #[arg(long)]
        sizes: Option<String>,
        /// Preload the previous image instead of the next
        #[arg(long)]
        backward: bool,
        /// Wrap around the ends of the collection when preloading
        #[arg(long)]
        wrap: bool,
        /// Use the largest variant as the primary source
        #[arg(long)]
        largest: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a stock folio.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = load_project_config(&cli)?;

    match &cli.command {
        Command::Build => {
            let overrides = EndpointOverrides {
                api_endpoint: cli.api_endpoint.clone(),
                repository_name: cli.repository_name.clone(),
            };
            let endpoint = config::resolve_endpoint(&overrides, &config.content, &cli.project_dir)?;
            info!(%endpoint, "using content endpoint");
            let source = HttpContentSource::new(&endpoint, cli.access_token.clone(), &config.content)?;

            init_thread_pool(&config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::build_manifest(&source, &RustBackend::new(), &config, Some(tx));
            if printer.join().is_err() {
                tracing::error!("progress printer panicked");
            }
            output::print_build_summary(&result?);
        }
        Command::Check => {
            let store = ManifestStore::load(&config.output.manifest_path)?;
            output::print_manifest_summary(store.snapshot());
            println!("==> Config and manifest are valid");
        }
        Command::Sources {
            collection,
            image,
            sizes,
            backward,
            wrap,
            largest,
            json,
        } => {
            let store = ManifestStore::load(&config.output.manifest_path)?;
            let options = ImageSourceOptions {
                sizes: Some(sizes.clone().unwrap_or_else(|| config.viewer.sizes.clone())),
                direction: if *backward {
                    NavigationDirection::Backward
                } else {
                    NavigationDirection::Forward
                },
                wrap: *wrap,
                prefer_largest: *largest,
            };
            let Some(source) = get_image_sources(store.snapshot(), collection, image, &options)
            else {
                return Err(format!("no image {collection}/{image} in the manifest").into());
            };
            if *json {
                println!("{}", serde_json::to_string_pretty(&source)?);
            } else {
                output::print_image_source(&source);
            }
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Log to stderr, `info` unless `RUST_LOG` says otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load `folio.toml` and apply path overrides from the command line.
///
/// Relative output paths are taken relative to the project directory.
fn load_project_config(cli: &Cli) -> Result<FolioConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.project_dir.join(&cli.config))?;
    if let Some(manifest) = &cli.manifest {
        config.output.manifest_path = manifest.clone();
    }
    if let Some(image_root) = &cli.image_root {
        config.output.image_root = image_root.clone();
    }
    config.output.manifest_path = under(&cli.project_dir, &config.output.manifest_path);
    config.output.image_root = under(&cli.project_dir, &config.output.image_root);
    Ok(config)
}

fn under(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || base == Path::new(".") {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
