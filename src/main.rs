use clap::{Parser, Subcommand};
use passport_photo::config::{self, AppConfig};
use passport_photo::imaging::{ExportFormat, RustBackend, export};
use passport_photo::landmarks::SidecarLandmarks;
use passport_photo::normalize::PolicyKind;
use passport_photo::pipeline::{self, OutputOptions};
use passport_photo::target::PhotoVariant;
use passport_photo::{batch, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Flags shared by the commands that work on one photo.
#[derive(clap::Args, Clone)]
struct PhotoArgs {
    /// Front-facing portrait (JPEG or PNG)
    photo: PathBuf,

    /// Face-mesh landmarks JSON [default: <photo>.landmarks.json]
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Directory to write results into
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// Output file name without extension [default: export.file_stem]
    #[arg(long)]
    name: Option<String>,
}

impl PhotoArgs {
    fn landmarks(&self) -> SidecarLandmarks {
        match &self.landmarks {
            Some(path) => SidecarLandmarks::new(path),
            None => SidecarLandmarks::for_photo(&self.photo),
        }
    }

    fn stem(&self, config: &AppConfig) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| config.export.file_stem.clone())
    }
}

#[derive(Parser)]
#[command(name = "passport-photo")]
#[command(about = "Turn a portrait into a compliant passport photo and print sheet")]
#[command(long_about = "\
Turn a portrait into a compliant passport photo and print sheet

The head is scaled to the target height, the eye line is placed inside the
allowed band, and the result is resampled onto a white 2 x 2 in canvas at
300 DPI. Compliance problems are reported as warnings; they never block
output.

Face landmarks are read from a JSON sidecar written by any face-mesh
detector (468 points, normalized or pixel coordinates):

  photos/
  ├── me.jpg
  └── me.landmarks.json     # {\"coordinates\": \"normalized\", \"faces\": [[[x, y], ...]]}

Run 'passport-photo gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file [default: ./config.toml when present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Photo requirements to target (overrides photo.variant)
    #[arg(long, global = true, value_enum)]
    variant: Option<PhotoVariant>,

    /// Placement policy (overrides placement.policy)
    #[arg(long, global = true, value_enum)]
    policy: Option<PolicyKind>,

    /// Output encoding (overrides export.format)
    #[arg(long, global = true, value_enum)]
    format: Option<ExportFormat>,

    /// Log pipeline diagnostics to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose one passport photo and report its measurements
    Process {
        #[command(flatten)]
        photo: PhotoArgs,

        /// Also write the measurement overlay as <name>_preview
        #[arg(long)]
        preview: bool,

        /// Also write a print sheet as <name>_sheet
        #[arg(long)]
        sheet: bool,

        /// Write a JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Compose one photo and tile copies onto a 6x4 in print sheet
    Sheet {
        #[command(flatten)]
        photo: PhotoArgs,

        /// Number of copies [default: sheet.copies]
        #[arg(long)]
        copies: Option<u32>,

        /// Leave out cut guides
        #[arg(long)]
        no_guides: bool,
    },
    /// Process every photo under a directory
    Batch {
        /// Directory of photos with landmark sidecars
        input: PathBuf,

        /// Directory to write results into
        #[arg(long, short, default_value = "passport-photos")]
        output: PathBuf,

        /// Also write measurement overlays
        #[arg(long)]
        preview: bool,

        /// Also write a print sheet per photo
        #[arg(long)]
        sheet: bool,
    },
    /// List the built-in photo requirements
    Variants,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Variants => {
            output::print_variants();
            return Ok(());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        _ => {}
    }

    let mut config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(Path::new("."))?,
    };
    if let Some(variant) = cli.variant {
        config.photo.variant = variant;
    }
    if let Some(policy) = cli.policy {
        config.placement.policy = policy;
    }
    if let Some(format) = cli.format {
        config.export.format = format;
    }
    let backend = RustBackend::with_limit(config.export.max_upload_bytes);

    match cli.command {
        Command::Process {
            photo,
            preview,
            sheet,
            report,
        } => {
            let result =
                pipeline::run_file(&backend, &photo.photo, &photo.landmarks(), &config)?;
            let written = pipeline::write_outputs(
                &backend,
                &result,
                &photo.output,
                &photo.stem(&config),
                &config,
                OutputOptions {
                    photo: true,
                    preview,
                    sheet,
                },
            )?;
            let mut run_report = result.report(&photo.photo);
            run_report.outputs = written.paths().map(|p| p.display().to_string()).collect();
            if let Some(path) = report {
                pipeline::write_report(&run_report, &path)?;
                run_report.outputs.push(path.display().to_string());
            }
            output::print_run_report(&run_report);
        }
        Command::Sheet {
            photo,
            copies,
            no_guides,
        } => {
            if let Some(n) = copies {
                config.sheet.copies = n;
            }
            if no_guides {
                config.sheet.guides = false;
            }
            let result =
                pipeline::run_file(&backend, &photo.photo, &photo.landmarks(), &config)?;
            let sheet = result.sheet(&config)?;
            let path = export(
                &backend,
                &sheet.image,
                sheet.dpi,
                &photo.output,
                &format!("{}_sheet", photo.stem(&config)),
                &config.export_config(),
            )?;
            output::print_run_report(&result.report(&photo.photo));
            output::print_sheet_output(&sheet, &path);
        }
        Command::Batch {
            input,
            output: output_dir,
            preview,
            sheet,
        } => {
            init_thread_pool(&config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let summary = batch::run_batch(
                &backend,
                &input,
                &output_dir,
                &config,
                OutputOptions {
                    photo: true,
                    preview,
                    sheet,
                },
                Some(tx),
            )?;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            output::print_batch_summary(&summary);
        }
        Command::Variants | Command::GenConfig => {}
    }

    Ok(())
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "passport_photo=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores: config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
