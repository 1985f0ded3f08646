//! lotscout: score card auction lots against price history.
//!
//! Entry point. Loads configuration, initialises logging and dispatches
//! to one of the batch jobs.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use lotscout_chart::{
    set_totals_file_name, watchlist_plot_file_name, write_html, SetTotalsChart, WatchlistChart,
};
use lotscout_core::config::ChartConfig;
use lotscout_core::{Auction, Config, CurrencyTable, PriceHistoryTable};
use lotscout_ingestion::{
    collect_auctions, read_card_list_file, read_currency_table, read_grade_table,
    read_price_history_file, read_watchlist_file, write_price_history_file, HistoryBuilder,
    JsonAuctionSource, ListingWindow, OfflineSource,
};
use lotscout_scoring::{results_file_name, write_results_file, LotScorer};

#[derive(Parser)]
#[command(name = "lotscout")]
#[command(about = "Score card auction lots against price history")]
struct Cli {
    /// TOML configuration file (missing sections use defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the price-history table for a card list
    Prices {
        /// Card list: name, set code and optional variant per row
        #[arg(short, long)]
        input: PathBuf,
        /// Column separator of the card list (a single character, or "\t")
        #[arg(long, value_parser = parse_delimiter)]
        sep: Option<char>,
        /// Directory holding per-card downloads
        #[arg(short, long)]
        download_dir: Option<PathBuf>,
        /// Output CSV (default: <output_dir>/<list>_pricehist_<timestamp>.csv)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Re-fetch cards whose download already exists
        #[arg(short, long)]
        force: bool,
    },
    /// Score current auction lots and write the result table
    Auctions {
        /// Scraped auction snapshot (JSON)
        #[arg(long)]
        snapshot: PathBuf,
        /// Price-history CSV
        #[arg(long)]
        history: PathBuf,
        /// Grade multiplier CSV
        #[arg(long)]
        grades: PathBuf,
        /// Currency multiplier CSV
        #[arg(long)]
        currencies: PathBuf,
        /// First date of the price-history window
        #[arg(short = 'b', long)]
        begin: Option<NaiveDate>,
        /// Last date of the price-history window
        #[arg(short = 'e', long)]
        end: Option<NaiveDate>,
        /// Minimum median value to consider
        #[arg(short = 'l', long)]
        lowest: Option<f64>,
        /// Maximum median value to consider
        #[arg(short = 'm', long)]
        max: Option<f64>,
        /// Maximum bid / median ratio
        #[arg(short = 'r', long)]
        ratio: Option<f64>,
        /// Max days an auction has been online
        #[arg(short = 'o', long)]
        days_online: Option<u32>,
        /// Max days left in an auction
        #[arg(short = 't', long)]
        days_left: Option<u32>,
        /// Sets to accept, e.g. "alpha,beta,unlimited" (case-insensitive)
        #[arg(short = 's', long)]
        sets: Option<String>,
        /// Directory for the result table
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Plot a watchlist's grade-adjusted price trends
    Plot {
        /// Watchlist: name, set code, grade and quantity per row
        #[arg(short, long)]
        input: PathBuf,
        /// Price-history CSV
        #[arg(long)]
        history: PathBuf,
        /// Grade multiplier CSV
        #[arg(long)]
        grades: PathBuf,
        /// Column separator of the watchlist (a single character, or "\t")
        #[arg(long, value_parser = parse_delimiter)]
        sep: Option<char>,
        #[command(flatten)]
        chart: ChartArgs,
        /// Omit cards whose max value stays below this
        #[arg(long)]
        min_max_value: Option<f64>,
        /// Output HTML (default: <output_dir>/<list>_pricehistory_plot.html)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Plot summed values of several price-history tables
    PlotSum {
        /// Price-history CSVs
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        chart: ChartArgs,
        /// Output HTML (default: <output_dir>/pricehistory_plot_sum_<timestamp>.html)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Chart flags shared by both plot commands.
#[derive(Args)]
struct ChartArgs {
    /// Plot the y axis on a log10 scale
    #[arg(long)]
    log10: bool,
    /// Plot width in px
    #[arg(long)]
    width: Option<u32>,
    /// Leave gaps instead of carrying the last value forward
    #[arg(long)]
    no_fill: bool,
    /// Clip values above this
    #[arg(long)]
    clip: Option<f64>,
    /// Remove values at or above this
    #[arg(long)]
    remove: Option<f64>,
}

impl ChartArgs {
    fn apply(&self, chart: &mut ChartConfig) {
        chart.log10 |= self.log10;
        chart.fill_missing &= !self.no_fill;
        if let Some(width) = self.width {
            chart.width = width;
        }
        if let Some(clip) = self.clip {
            chart.clip = clip;
        }
        if let Some(remove) = self.remove {
            chart.remove = remove;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading config {}", path.display()))?
        }
        None => Config::default(),
    };

    let now = Local::now().naive_local();
    match cli.command {
        Commands::Prices {
            input,
            sep,
            download_dir,
            output,
            force,
        } => {
            if let Some(sep) = sep {
                config.history.delimiter = sep;
            }
            if let Some(dir) = download_dir {
                config.history.download_dir = dir;
            }
            config.history.force_refresh |= force;
            run_prices(&config, &input, output, now)
        }
        Commands::Auctions {
            snapshot,
            history,
            grades,
            currencies,
            begin,
            end,
            lowest,
            max,
            ratio,
            days_online,
            days_left,
            sets,
            output_dir,
        } => {
            let scoring = &mut config.scoring;
            if let Some(begin) = begin {
                scoring.window_begin = begin;
            }
            if let Some(end) = end {
                scoring.window_end = end;
            }
            if let Some(lowest) = lowest {
                scoring.value_median_lowest = lowest;
            }
            if let Some(max) = max {
                scoring.value_median_max = max;
            }
            if let Some(ratio) = ratio {
                scoring.bid_ratio_threshold = ratio;
            }
            if let Some(sets) = sets {
                scoring.accepted_sets = Some(parse_set_list(&sets));
            }
            if let Some(dir) = output_dir {
                scoring.output_dir = dir;
            }
            if let Some(days) = days_online {
                config.listing.max_days_online = days;
            }
            if let Some(days) = days_left {
                config.listing.max_days_left = days;
            }
            config.validate()?;
            run_auctions(&config, &snapshot, &history, &grades, &currencies, now)
        }
        Commands::Plot {
            input,
            history,
            grades,
            sep,
            chart,
            min_max_value,
            output,
        } => {
            chart.apply(&mut config.chart);
            if let Some(value) = min_max_value {
                config.chart.min_max_value = value;
            }
            let delimiter = sep.unwrap_or(config.history.delimiter);
            run_plot(&config, &input, &history, &grades, delimiter, output)
        }
        Commands::PlotSum { files, chart, output } => {
            chart.apply(&mut config.chart);
            run_plot_sum(&config.chart, &files, output, now)
        }
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(env_filter).with_target(false).init();
}

/// Split "alpha, Beta,unlimited" into trimmed, non-empty names.
fn parse_set_list(sets: &str) -> Vec<String> {
    sets.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A single character, with `\t` or `tab` standing for a tab.
fn parse_delimiter(text: &str) -> std::result::Result<char, String> {
    if matches!(text, "\\t" | "tab") {
        return Ok('\t');
    }
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected a single character or \\t, got '{}'", text)),
    }
}

/// Currency of the results table's reference columns.
///
/// The currency table's multipliers convert into the code named by its
/// header, so that code wins over the configured one.
fn results_currency(configured: &str, currencies: &CurrencyTable) -> String {
    match currencies.reference() {
        Some(code) => {
            if !code.eq_ignore_ascii_case(configured) {
                warn!(
                    configured,
                    table = code,
                    "currency table converts to another currency, using the table's"
                );
            }
            code.to_string()
        }
        None => configured.to_string(),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_prices(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    now: NaiveDateTime,
) -> Result<()> {
    let history = &config.history;
    let output = output.unwrap_or_else(|| {
        history.output_dir.join(format!(
            "{}_pricehist_{}.csv",
            file_stem(input),
            now.format("%Y%m%d_%H%M%S")
        ))
    });
    if output.exists() && !history.force_refresh {
        warn!(path = %output.display(), "output already exists, use --force to overwrite");
        return Ok(());
    }

    let cards = read_card_list_file(input, history.delimiter)
        .with_context(|| format!("reading card list {}", input.display()))?;
    info!(cards = cards.len(), input = %input.display(), "card list loaded");

    let mut builder = HistoryBuilder::new(OfflineSource, history);
    let report = builder.build(&cards)?;
    info!(
        columns = report.table.column_count(),
        dates = report.table.row_count(),
        fetched = report.fetched.len(),
        cached = report.cached.len(),
        failed = report.failed.len(),
        missing = report.missing.len(),
        empty = report.empty.len(),
        "price history assembled"
    );

    write_price_history_file(&output, &report.table)
        .with_context(|| format!("writing price history {}", output.display()))?;
    info!(path = %output.display(), "price history written");
    Ok(())
}

fn run_auctions(
    config: &Config,
    snapshot: &Path,
    history: &Path,
    grades: &Path,
    currencies: &Path,
    now: NaiveDateTime,
) -> Result<()> {
    let table = read_price_history_file(history)
        .with_context(|| format!("reading price history {}", history.display()))?;
    let grades = read_grade_table(grades)
        .with_context(|| format!("reading grade table {}", grades.display()))?;
    let currencies = read_currency_table(currencies)
        .with_context(|| format!("reading currency table {}", currencies.display()))?;
    let currency = results_currency(&config.scoring.reference_currency, &currencies);
    let scorer = LotScorer::from_config(&table, grades, currencies, config);

    let mut source = JsonAuctionSource::open(snapshot)
        .with_context(|| format!("reading auction snapshot {}", snapshot.display()))?;
    let window = ListingWindow::from(&config.listing);
    let auctions: Vec<Auction> = collect_auctions(&mut source, &window, now)?;
    info!(auctions = auctions.len(), "auctions collected");

    let run = scorer.score_all(auctions.iter().flat_map(|a| a.lots.iter()));
    info!(summary = %run.summary, "scoring finished");

    if run.accepted.is_empty() {
        info!("No matching items");
        return Ok(());
    }

    let until = window.closes_by(now);
    let path = config.scoring.output_dir.join(results_file_name(now, until));
    write_results_file(&path, &run.accepted, &currency)
        .with_context(|| format!("writing results {}", path.display()))?;
    info!(path = %path.display(), lots = run.accepted.len(), "results written");
    Ok(())
}

fn run_plot(
    config: &Config,
    input: &Path,
    history: &Path,
    grades: &Path,
    delimiter: char,
    output: Option<PathBuf>,
) -> Result<()> {
    let watchlist = read_watchlist_file(input, delimiter)
        .with_context(|| format!("reading watchlist {}", input.display()))?;
    let table = read_price_history_file(history)
        .with_context(|| format!("reading price history {}", history.display()))?;
    let grades = read_grade_table(grades)
        .with_context(|| format!("reading grade table {}", grades.display()))?;

    let chart = WatchlistChart::build(
        &table,
        &watchlist,
        &grades,
        &config.chart,
        config.scoring.policy.default_grade_multiplier,
    )?;
    info!(
        series = chart.spec.series.len(),
        cards = chart.total_quantity,
        missing = chart.missing.len(),
        dropped = chart.dropped.len(),
        "watchlist chart prepared"
    );

    let output = output
        .unwrap_or_else(|| config.chart.output_dir.join(watchlist_plot_file_name(input)));
    write_html(&output, &chart.spec)
        .with_context(|| format!("writing chart {}", output.display()))?;
    info!(path = %output.display(), "chart written");
    Ok(())
}

fn run_plot_sum(
    chart_config: &ChartConfig,
    files: &[PathBuf],
    output: Option<PathBuf>,
    now: NaiveDateTime,
) -> Result<()> {
    if files.is_empty() {
        bail!("no price-history files given");
    }
    let tables = files
        .iter()
        .map(|path| -> Result<(String, PriceHistoryTable)> {
            let table = read_price_history_file(path)
                .with_context(|| format!("reading price history {}", path.display()))?;
            Ok((file_stem(path), table))
        })
        .collect::<Result<Vec<_>>>()?;

    let chart = SetTotalsChart::build(&tables, chart_config)?;
    let output = output.unwrap_or_else(|| chart_config.output_dir.join(set_totals_file_name(now)));
    write_html(&output, &chart.spec)
        .with_context(|| format!("writing chart {}", output.display()))?;
    info!(path = %output.display(), tables = tables.len(), "chart written");
    Ok(())
}
