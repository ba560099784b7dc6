use clap::{Parser, Subcommand};
use sticker_sheets::imaging::RustBackend;
use sticker_sheets::{config, output, pipeline};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sticker-sheets")]
#[command(about = "Batch cover and grid pages for sticker collections")]
#[command(long_about = "\
Batch cover and grid pages for sticker collections

Every subdirectory of the source root is a collection. Each one with enough
images gets a cover page and three grid pages, zipped per collection and
bundled into one timestamped aggregate archive.

Source structure:

  collections/
  ├── 01 春意慵懒kitty/            # Title \"春意慵懒kitty\" (numeric prefix stripped)
  │   ├── 001_main.png             # Cover avatar (main/cover/01/1_ in the first five)
  │   ├── 002.png                  # Images in filename order
  │   └── tab_on.png               # UI asset: skipped (exclude marker)
  ├── Bunny·Daily/                 # Title \"Bunny\", subtitle \"Daily\"
  └── tiny/                        # Fewer than min_images: excluded

Output structure:

  output/
  ├── 春意慵懒kitty/
  │   ├── 01_cover_春意慵懒kitty.jpg
  │   ├── 02_grid1_春意慵懒kitty.jpg
  │   ├── 03_grid2_春意慵懒kitty.jpg
  │   └── 04_grid3_春意慵懒kitty.jpg
  ├── _zip_packages/
  │   ├── 春意慵懒kitty_bundle.zip
  │   └── aggregate_20250101_120000.zip
  └── _processing_report.json

Set RUST_LOG=debug for diagnostics.
Run 'sticker-sheets gen-config' to generate a documented batch.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = defaults)
    #[arg(long, default_value = "batch.toml", global = true)]
    config: PathBuf,

    /// Source root (overrides the config file)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Output root (overrides the config file)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Start rendering without asking for confirmation
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List eligible and excluded collections without rendering
    Scan,
    /// Run the full pipeline: scan → render → package
    Run(RunArgs),
    /// Print a stock batch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Command::Scan => {
            let config = load_config(&cli)?;
            println!("==> Scanning {}", config.source_root.display());
            let report = pipeline::scan_sources(&config)?;
            output::print_scan_output(&report);
        }
        Command::Run(args) => {
            let mut config = load_config(&cli)?;
            config.auto_start |= args.yes;

            println!("==> Stage 1: Scanning {}", config.source_root.display());
            let report = pipeline::scan_sources(&config)?;
            output::print_scan_output(&report);

            if !config.auto_start && !confirm(report.collections.len())? {
                println!("==> Cancelled");
                return Ok(());
            }

            println!(
                "==> Stage 2: Rendering → {}",
                config.output_root.display()
            );
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_run_event(&event);
                }
            });
            let summary = pipeline::process_batch(&RustBackend::new(), &config, report, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            println!("==> Summary");
            output::print_run_summary(&summary);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Load the config file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<config::BatchConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.config)?;
    if let Some(source) = &cli.source {
        config.source_root = source.clone();
    }
    if let Some(output) = &cli.output {
        config.output_root = output.clone();
    }
    Ok(config)
}

/// Ask on stdin whether to start rendering.
fn confirm(collections: usize) -> io::Result<bool> {
    print!("Render {collections} collection(s)? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}
