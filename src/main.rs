//! cnpq-payments - build and query the unified CNPq payments dataset.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cnpq_payments::data::{load_preprocessed_dataset, DataProcessor};
use cnpq_payments::stats::{Aggregator, AreaLevel, CategoryMetric, StatePreference, StatsCalculator};
use cnpq_payments::{build_preprocessed, logging, AppConfig, BuildOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    name = "cnpq-payments",
    version,
    about = "Unifies the yearly CNPq payment exports and reports on them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read the raw exports and write the unified dataset.
    Build {
        /// Project root holding config.json and the data directories.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Also write the unified table as CSV.
        #[arg(long, default_value = "false")]
        write_csv: bool,
        /// Ignore the per-year cache and rebuild it.
        #[arg(long, default_value = "false")]
        no_cache: bool,
    },
    /// Print one aggregation of the unified dataset.
    Report {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_enum, default_value_t = ReportBy::Region)]
        by: ReportBy,
        #[arg(long, value_enum, default_value_t = HowArg::Sum)]
        how: HowArg,
        #[arg(long, value_enum, default_value_t = UfArg::Auto)]
        uf: UfArg,
    },
    /// List the reference years present in the unified dataset.
    Years {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportBy {
    Region,
    Area,
    GrandeArea,
    Subarea,
    Category,
    State,
    Time,
    Distribution,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HowArg {
    Sum,
    PerBeneficiaryMean,
    PerProcessMean,
}

impl From<HowArg> for CategoryMetric {
    fn from(how: HowArg) -> Self {
        match how {
            HowArg::Sum => CategoryMetric::Sum,
            HowArg::PerBeneficiaryMean => CategoryMetric::PerBeneficiaryMean,
            HowArg::PerProcessMean => CategoryMetric::PerProcessMean,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UfArg {
    Auto,
    Destino,
    Origem,
}

impl From<UfArg> for StatePreference {
    fn from(uf: UfArg) -> Self {
        match uf {
            UfArg::Auto => StatePreference::Auto,
            UfArg::Destino => StatePreference::Destination,
            UfArg::Origem => StatePreference::Origin,
        }
    }
}

fn setup(root: &Path) -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load(root)
        .with_context(|| format!("loading configuration from {}", root.display()))?;
    let log_dir = config.log_to_file.then_some(config.paths.logs.as_path());
    logging::init(log_dir).context("initializing logger")?;
    Ok(config)
}

fn run_build(root: &Path, write_csv: bool, no_cache: bool) -> Result<()> {
    let config = setup(root)?;
    let options = BuildOptions {
        // The flag only forces CSV on; otherwise config and WRITE_CSV decide
        write_csv: write_csv.then_some(true),
        use_cache: !no_cache,
    };
    let output = build_preprocessed(&config, options).context("building unified dataset")?;

    println!("Parquet: {}", output.outputs.parquet.display());
    if let Some(csv) = &output.outputs.csv {
        println!("CSV:     {}", csv.display());
    }
    println!(
        "Shape:   {} rows x {} cols",
        output.unified.height(),
        output.unified.width()
    );
    println!("{}", output.unified.head(Some(5)));
    Ok(())
}

fn run_report(
    root: &Path,
    year: Option<i32>,
    by: ReportBy,
    how: HowArg,
    uf: UfArg,
) -> Result<()> {
    let config = setup(root)?;
    let df = load_preprocessed_dataset(&config.paths.data_preprocessed)?;

    let table = match by {
        ReportBy::Region => {
            let prefer_destination = !matches!(uf, UfArg::Origem);
            Aggregator::total_by_region(&df, year, prefer_destination)?
        }
        ReportBy::Area => Aggregator::total_by_area(&df, year, AreaLevel::Area)?,
        ReportBy::GrandeArea => Aggregator::total_by_area(&df, year, AreaLevel::GrandeArea)?,
        ReportBy::Subarea => Aggregator::total_by_area(&df, year, AreaLevel::Subarea)?,
        ReportBy::Category => Aggregator::invest_by_category(&df, year, how.into())?,
        ReportBy::State => {
            let year = match year.or_else(|| Aggregator::list_available_years(&df).last().copied()) {
                Some(year) => year,
                None => bail!("no reference year available for a per-state report"),
            };
            Aggregator::mean_by_state_for_year(&df, year, uf.into())?
        }
        ReportBy::Time => Aggregator::time_mean_by_category(&df)?,
        ReportBy::Distribution => {
            let filtered = DataProcessor::filter_by_year(&df, year)?;
            StatsCalculator::distribution_by(&filtered, "MODALIDADE")?
        }
    };

    println!("{table}");
    Ok(())
}

fn run_years(root: &Path) -> Result<()> {
    let config = setup(root)?;
    let df = load_preprocessed_dataset(&config.paths.data_preprocessed)?;
    let years = Aggregator::list_available_years(&df);
    println!(
        "Years: {}",
        years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for note in Aggregator::dataset_notes(&df) {
        println!("Note: {note}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            root,
            write_csv,
            no_cache,
        } => run_build(&root, write_csv, no_cache),
        Command::Report {
            root,
            year,
            by,
            how,
            uf,
        } => run_report(&root, year, by, how, uf),
        Command::Years { root } => run_years(&root),
    }
}
