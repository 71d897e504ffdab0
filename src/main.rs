use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use upload_eta::config::Config;
use upload_eta::estimate::{RootPolicy, TrendFit};
use upload_eta::plot;
use upload_eta::store::text_format::format_timestamp;
use upload_eta::store::{SampleStore, StorePaths};

#[derive(Parser)]
#[command(
    name = "upload-eta",
    version,
    about = "Record upload progress and estimate when it will finish"
)]
struct Cli {
    #[arg(long, global = true, help = "Config file (default: user config dir)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Total number of files in the upload")]
    total: Option<u64>,

    #[arg(long, global = true, help = "Remaining-count file")]
    uploads: Option<PathBuf>,

    #[arg(long, global = true, help = "Timestamp file")]
    timestamps: Option<PathBuf>,

    #[arg(long, global = true, value_enum, help = "Which zero crossing to report")]
    policy: Option<RootPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record the file currently being uploaded
    Record {
        /// Current file index; prompted for when omitted
        index: Option<u64>,

        /// Start a new session instead of appending to the saved one
        #[arg(long)]
        fresh: bool,
    },
    /// Fit the samples and print the estimated completion time
    Estimate {
        /// Polynomial degree; repeat to compare several fits
        #[arg(short, long)]
        degree: Vec<usize>,

        /// Print the estimate as JSON
        #[arg(long)]
        json: bool,

        /// Draw the fit in the terminal
        #[arg(long)]
        chart: bool,

        /// Skip writing the PDF plot
        #[arg(long)]
        no_plot: bool,
    },
    /// List recorded samples
    Show,
    /// Delete all recorded samples
    Reset,
    /// Print config file path and current values
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match &cli.command {
        Command::Record { index, fresh } => run_record(&config, *index, *fresh),
        Command::Estimate {
            degree,
            json,
            chart,
            no_plot,
        } => run_estimate(&config, degree, *json, *chart, !*no_plot),
        Command::Show => run_show(&config),
        Command::Reset => run_reset(&config),
        Command::Config => run_print_config(&cli, &config),
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::load().context("reading config")?,
    };
    if let Some(total) = cli.total {
        config.total_files = total;
    }
    if let Some(path) = &cli.uploads {
        config.uploads_path = path.clone();
    }
    if let Some(path) = &cli.timestamps {
        config.timestamps_path = path.clone();
    }
    if let Some(policy) = cli.policy {
        config.root_policy = policy;
    }
    Ok(config)
}

fn open_store(config: &Config) -> Result<SampleStore> {
    SampleStore::open(StorePaths::from(config), config.total_files)
        .context("loading recorded samples")
}

fn run_record(config: &Config, index: Option<u64>, fresh: bool) -> Result<()> {
    let mut store = if fresh {
        SampleStore::fresh(StorePaths::from(config), config.total_files)
    } else {
        open_store(config)?
    };
    let index = match index {
        Some(i) => i,
        None => prompt_index()?,
    };
    let data = store.record(index)?;
    if let Some(last) = data.last() {
        println!(
            "Recorded {} files remaining at {} ({} samples)",
            last.remaining,
            format_timestamp(&last.timestamp),
            data.len()
        );
    }
    Ok(())
}

fn prompt_index() -> Result<u64> {
    print!("Current file # being uploaded: ");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("no file index given");
    }
    line.trim()
        .parse()
        .with_context(|| format!("'{}' is not a file index", line.trim()))
}

fn run_estimate(
    config: &Config,
    degrees: &[usize],
    json: bool,
    chart: bool,
    write_plot: bool,
) -> Result<()> {
    let store = open_store(config)?;
    let data = store.dataset();
    let degrees = if degrees.is_empty() {
        vec![config.degree]
    } else {
        degrees.to_vec()
    };

    for degree in degrees {
        let estimate = TrendFit::fit(data, degree)
            .and_then(|fit| fit.extrapolate(config.root_policy))
            .with_context(|| format!("estimating with degree {degree}"))?;

        if json {
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        } else {
            println!(
                "k={degree}: estimated completion time {} (zero crossing at {})",
                estimate.completion_label,
                format_timestamp(&estimate.completion_instant)
            );
        }
        if chart {
            print!("{}", plot::render_chart(data, &estimate, 80, 20));
        }
        if write_plot {
            let path = plot::render_pdf(data, &estimate, &config.plot_dir)?;
            if !json {
                println!("Saved: {}", path.display());
            }
        }
    }
    Ok(())
}

fn run_show(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let data = store.dataset();
    if data.is_empty() {
        println!("No samples recorded.");
        return Ok(());
    }
    println!("{:>4}  {:<26}  {:>9}", "#", "timestamp", "remaining");
    for (i, sample) in data.iter().enumerate() {
        println!(
            "{:>4}  {:<26}  {:>9}",
            i + 1,
            format_timestamp(&sample.timestamp),
            sample.remaining
        );
    }
    Ok(())
}

fn run_reset(config: &Config) -> Result<()> {
    let mut store = SampleStore::fresh(StorePaths::from(config), config.total_files);
    store.reset()?;
    println!(
        "Cleared {} and {}",
        config.uploads_path.display(),
        config.timestamps_path.display()
    );
    Ok(())
}

fn run_print_config(cli: &Cli, config: &Config) -> Result<()> {
    let path = cli.config.clone().unwrap_or_else(Config::config_path);
    println!("Config file: {}", path.display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
