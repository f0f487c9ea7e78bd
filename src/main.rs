use anyhow::Context;
use clap::{Args, ColorChoice, CommandFactory, FromArgMatches, Parser, Subcommand};
use colored::Colorize;
use is_terminal::IsTerminal;
use podorders::config::{ConfigError, GallerySettings, OrdersSettings};
use podorders::labels::LabelErrorPolicy;
use podorders::schema::OrdersArtifact;
use podorders::{GalleryConfig, PipelineConfig, Settings, gallery, logging, metrics, pipeline};
use std::fs::File;
use std::io::{BufReader, stderr, stdout};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "podorders",
    about = "Join delivery-photo predictions with ground-truth labels",
    arg_required_else_help = true
)]
struct Cli {
    /// Disable color
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: $PODORDERS_CONFIG, then the user config directory)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Join predictions with labels and write the orders artifact
    Orders(OrdersArgs),
    /// Index an images directory together with its raw label files
    Images(ImagesArgs),
    /// Report prediction/ground-truth agreement for an orders artifact
    Summary(SummaryArgs),
    /// Print the JSON schema of the orders artifact
    Schema,
}

#[derive(Args, Clone)]
struct OrdersArgs {
    /// Model predictions, one JSON object per line
    #[arg(long, value_name = "FILE")]
    predictions: Option<PathBuf>,

    /// Directory holding <image>.txt label files
    #[arg(long, value_name = "DIR")]
    labels_dir: Option<PathBuf>,

    /// Prefix for image_src in the output [default: ./images]
    #[arg(long, value_name = "PREFIX")]
    image_base: Option<String>,

    /// Where to write the orders artifact
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Label files with invalid fields [default: absent]
    #[arg(long, value_enum, value_name = "POLICY")]
    on_label_error: Option<LabelErrorPolicy>,
}

impl From<OrdersArgs> for OrdersSettings {
    fn from(args: OrdersArgs) -> Self {
        Self {
            predictions: args.predictions,
            labels_dir: args.labels_dir,
            image_base: args.image_base,
            output: args.output,
            on_label_error: args.on_label_error,
        }
    }
}

#[derive(Args, Clone)]
struct ImagesArgs {
    /// Directory of .png/.jpg/.jpeg/.webp images
    #[arg(long, value_name = "DIR")]
    images_dir: Option<PathBuf>,

    /// Directory holding <stem>.txt label files
    #[arg(long, value_name = "DIR")]
    labels_dir: Option<PathBuf>,

    /// Where to write the index [default: data.json]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Prefix for image_relpath [default: image]
    #[arg(long, value_name = "PREFIX")]
    image_prefix: Option<String>,

    /// Prefix for label_relpath [default: label]
    #[arg(long, value_name = "PREFIX")]
    label_prefix: Option<String>,
}

impl From<ImagesArgs> for GallerySettings {
    fn from(args: ImagesArgs) -> Self {
        Self {
            images_dir: args.images_dir,
            labels_dir: args.labels_dir,
            output: args.output,
            image_prefix: args.image_prefix,
            label_prefix: args.label_prefix,
        }
    }
}

#[derive(Args, Clone)]
struct SummaryArgs {
    /// Orders artifact written by `podorders orders`
    #[arg(value_name = "ARTIFACT")]
    artifact: PathBuf,

    /// Output JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn detect_color_choice() -> ColorChoice {
    // Scan args before clap so help/errors honor `--no-color`.
    // Mirror clap's parsing by stopping at `--` which terminates flags.
    let mut args = std::env::args_os();
    // Skip binary name
    args.next();
    let mut flag = false;
    for arg in args {
        if arg == "--" {
            break;
        }
        if arg == "--no-color" {
            flag = true;
            break;
        }
    }
    if flag || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Prints `err` with its cause chain and picks the exit code.
fn report_error(err: &anyhow::Error, color: bool) -> i32 {
    let label = if color {
        "Error:".red().bold().to_string()
    } else {
        "Error:".to_string()
    };
    eprintln!("{} {:#}", label, err);
    if err.downcast_ref::<ConfigError>().is_some() {
        2
    } else {
        1
    }
}

fn ok_label(color: bool) -> String {
    if color {
        "OK".green().bold().to_string()
    } else {
        "OK".to_string()
    }
}

fn build_orders(args: OrdersArgs, config: Option<&Path>) -> anyhow::Result<pipeline::RunReport> {
    let settings = Settings::load(config)?;
    let config = PipelineConfig::resolve(args.into(), &settings)?;
    Ok(pipeline::run(&config)?)
}

fn run_orders(
    args: OrdersArgs,
    config: Option<&Path>,
    color: bool,
    err_color: bool,
) -> Result<(), i32> {
    let report = build_orders(args, config).map_err(|err| report_error(&err, err_color))?;
    println!(
        "{} -> {} | orders={}",
        ok_label(color),
        report.output.display(),
        report.orders
    );
    Ok(())
}

fn build_images(args: ImagesArgs, config: Option<&Path>) -> anyhow::Result<gallery::GalleryReport> {
    let settings = Settings::load(config)?;
    let config = GalleryConfig::resolve(args.into(), &settings)?;
    Ok(gallery::run(&config)?)
}

fn run_images(args: ImagesArgs, config: Option<&Path>, err_color: bool) -> Result<(), i32> {
    let report = build_images(args, config).map_err(|err| report_error(&err, err_color))?;
    println!(
        "found images: {} in {}",
        report.images,
        report.images_dir.display()
    );
    println!("wrote {} items -> {}", report.images, report.output.display());
    Ok(())
}

fn load_artifact(path: &Path) -> anyhow::Result<OrdersArtifact> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid orders artifact {}", path.display()))
}

fn run_summary(args: SummaryArgs, color: bool, err_color: bool) -> Result<(), i32> {
    let artifact = load_artifact(&args.artifact).map_err(|err| report_error(&err, err_color))?;
    let summary = metrics::summarize(&artifact);
    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(s) => println!("{}", s),
            Err(_) => return Err(3),
        }
    } else {
        println!("{}", metrics::render_summary(&summary, color));
    }
    Ok(())
}

fn run_schema() -> Result<(), i32> {
    let schema = schemars::schema_for!(OrdersArtifact);
    match serde_json::to_string_pretty(&schema) {
        Ok(s) => println!("{}", s),
        Err(_) => return Err(3),
    }
    Ok(())
}

fn main() {
    let color = detect_color_choice();
    let matches = Cli::command().color(color).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let allow_color = !cli.no_color && !matches!(color, ColorChoice::Never);
    let out_color = allow_color && stdout().is_terminal();
    let err_color = allow_color && stderr().is_terminal();
    logging::init_logging(cli.verbose, err_color);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Some(Commands::Orders(args)) => run_orders(args, config, out_color, err_color),
        Some(Commands::Images(args)) => run_images(args, config, err_color),
        Some(Commands::Summary(args)) => run_summary(args, out_color, err_color),
        Some(Commands::Schema) => run_schema(),
        None => Ok(()),
    };
    if let Err(code) = result {
        std::process::exit(code);
    }
}
