use clap::{Parser, Subcommand};
use product_watermark::catalog::{ImageId, ItemId, StaticCatalog};
use product_watermark::eligibility::{BrowsingContext, ImageRequest};
use product_watermark::imaging::{self, OutputFormat, Quality};
use product_watermark::settings::{
    self, JsonSettingsStore, RawSettings, RawValue, SettingsStore,
};
use product_watermark::store::output_extension;
use product_watermark::watermark::Watermarker;
use product_watermark::{config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Settings file and catalog shared by the commands that run the request path.
#[derive(clap::Args, Clone)]
struct HostArgs {
    /// JSON file holding the watermark settings
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    /// JSON file describing items and image URLs
    #[arg(long, default_value = "catalog.json")]
    catalog: PathBuf,
}

#[derive(Parser)]
#[command(name = "product-watermark")]
#[command(about = "On-demand watermarking of product photos")]
#[command(long_about = "\
On-demand watermarking of product photos

When an item's detail page renders one of that item's own photos, the photo
is swapped for a watermarked copy. Copies are cached on disk under a name
derived from everything that affects their pixels, so each one is made once.

Files:

  <config dir>/
  ├── config.toml          # Storage root, cache namespace, allowed renditions
  ├── settings.json        # Watermark image id, position, size mode, widths
  ├── catalog.json         # Items → main/gallery image ids, image ids → URLs
  └── uploads/             # Managed storage (base_dir)
      ├── 2024/05/shoe.jpg
      ├── logo.png
      └── watermark-cache/ # Generated artifacts

Run 'product-watermark gen-config' to generate a documented config.toml.
Set RUST_LOG=debug to see every eligibility decision and cache hit.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watermark one image file directly, bypassing eligibility and cache
    Render {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        watermark: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// center, top_left, top_right, bottom_left or bottom_right
        #[arg(long)]
        position: Option<String>,
        /// default or custom
        #[arg(long)]
        size_mode: Option<String>,
        #[arg(long)]
        custom_width: Option<i64>,
        #[arg(long)]
        max_width_pct: Option<i64>,
    },
    /// Run one image request and print the URL to render
    Resolve {
        #[command(flatten)]
        host: HostArgs,
        /// Item whose detail page is being rendered
        #[arg(long)]
        item: ItemId,
        #[arg(long)]
        image: ImageId,
        #[arg(long)]
        rendition: Option<String>,
        /// URL the host would render without a watermark
        #[arg(long)]
        url: String,
    },
    /// Generate artifacts for every photo of one item
    Warm {
        #[command(flatten)]
        host: HostArgs,
        #[arg(long)]
        item: ItemId,
        /// Renditions to generate (repeatable); defaults to all allowed
        #[arg(long = "rendition")]
        renditions: Vec<String>,
    },
    /// Validate config.toml without processing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Render {
            source,
            watermark,
            output: out_path,
            position,
            size_mode,
            custom_width,
            max_width_pct,
        } => {
            let settings = settings::resolve(&RawSettings {
                watermark_image_id: None,
                position: position.as_deref().map(RawValue::from),
                size_mode: size_mode.as_deref().map(RawValue::from),
                custom_width_px: custom_width.map(RawValue::from),
                max_width_pct: max_width_pct.map(RawValue::from),
            });
            let source_img = imaging::rust_backend::load_image(&source)?;
            let watermark_img = imaging::rust_backend::load_image(&watermark)?;
            let source_dims = imaging::Dimensions {
                width: source_img.width(),
                height: source_img.height(),
            };
            let overlay = imaging::plan_overlay(
                source_dims,
                imaging::Dimensions {
                    width: watermark_img.width(),
                    height: watermark_img.height(),
                },
                &settings,
            )?;
            let composed = imaging::composite(&source_img, &watermark_img, &settings)?;
            let format = OutputFormat::from_extension(output_extension(&out_path));
            let bytes =
                imaging::rust_backend::encode_image(&composed, format, Quality::default())?;
            std::fs::write(&out_path, bytes)?;
            output::print_render_output(&output::format_render_output(
                &out_path,
                &source,
                source_dims,
                &watermark,
                &overlay,
                &settings,
            ));
        }
        Command::Resolve {
            host,
            item,
            image,
            rendition,
            url,
        } => {
            let watermarker = load_watermarker(&cli.config)?;
            let catalog = StaticCatalog::load(&host.catalog)?;
            let store = JsonSettingsStore::new(&host.settings);
            let request = ImageRequest::new(
                image,
                rendition.as_deref(),
                BrowsingContext::ItemDetail(item),
                url,
            );
            let lines = match watermarker.process(&request, &store.settings(), &catalog) {
                Ok(outcome) => output::format_resolve_output(&request, &outcome),
                Err(e) => {
                    tracing::warn!(image_id = image, error = %e, "watermarking failed");
                    output::format_resolve_fallback(&request, &e)
                }
            };
            output::print_resolve_output(&lines);
        }
        Command::Warm {
            host,
            item,
            renditions,
        } => {
            let watermarker = load_watermarker(&cli.config)?;
            let catalog = StaticCatalog::load(&host.catalog)?;
            let store = JsonSettingsStore::new(&host.settings);
            let stats = watermarker.warm_item(item, &renditions, &store, &catalog);
            output::print_warm_output(item, &stats);
        }
        Command::Check => {
            let config = config::load_config(&cli.config)?;
            output::print_check_output(&config, &config.base_dir_from(&cli.config));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `config.toml` and build a watermarker rooted at its storage directory.
fn load_watermarker(config_dir: &std::path::Path) -> Result<Watermarker, config::ConfigError> {
    let config = config::load_config(config_dir)?;
    let base_dir = config.base_dir_from(config_dir);
    Ok(Watermarker::new(&config, base_dir))
}
