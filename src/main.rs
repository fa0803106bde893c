use chrono::Local;
use cinefacet::config::Config;
use cinefacet::dataset::{loader, resolve_dataset_path, Dataset, MovieRecord};
use cinefacet::facet::{Facet, NumericFacet, NumericFilter, ValuePredicate};
use cinefacet::session::{Action, Session};
use cinefacet::view::{PickStatus, SizeMetric, SortColumn, SortOrder, TableQuery};
use cinefacet::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cinefacet")]
#[command(author, version, about = "Cross-filter a movie metadata CSV by genre, company, year, rating and more")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Dataset CSV file, or a directory containing one (optional in GUI mode)
    path: Option<PathBuf>,

    /// Launch GUI file picker (auto-enabled when double-clicked)
    #[arg(long)]
    gui: bool,

    /// Config file (default: cinefacet.json in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    filters: FilterArgs,

    /// Sort column: title, year, note, popularity, budget, revenue, runtime, genres, productions
    #[arg(long, default_value = "year")]
    sort: SortColumn,

    /// Sort order: asc or desc
    #[arg(long, default_value = "desc")]
    order: SortOrder,

    /// Page of the table to print (1-based)
    #[arg(long, default_value = "1")]
    page: usize,

    /// Rows per page (default: items_per_page from config)
    #[arg(long)]
    per_page: Option<usize>,

    /// Metric deciding which duplicate title is kept
    #[arg(long, default_value = "popularity")]
    metric: SizeMetric,

    /// Write the filtered movies to a report file (.csv, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a timestamped CSV report into --report-dir
    #[arg(long)]
    save: bool,

    /// Directory for timestamped reports
    #[arg(long, default_value = "cinefacet-reports")]
    report_dir: PathBuf,

    /// Don't prompt to open the report
    #[arg(long)]
    no_open: bool,

    /// Show debug logging and per-facet availability
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show summary
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Filter flags, applied in order as session actions.
#[derive(ClapArgs, Debug, Default, Clone)]
struct FilterArgs {
    /// Include genre (repeatable)
    #[arg(long = "genre", value_name = "GENRE")]
    genres: Vec<String>,

    /// Exclude genre (repeatable)
    #[arg(long = "exclude-genre", value_name = "GENRE")]
    exclude_genres: Vec<String>,

    /// Require every --genre instead of any
    #[arg(long)]
    strict_genres: bool,

    /// Include production company (repeatable)
    #[arg(long = "company", value_name = "COMPANY")]
    companies: Vec<String>,

    /// Exclude production company (repeatable)
    #[arg(long = "exclude-company", value_name = "COMPANY")]
    exclude_companies: Vec<String>,

    /// Require every --company instead of any
    #[arg(long)]
    strict_companies: bool,

    /// Include exact title (repeatable)
    #[arg(long = "title", value_name = "TITLE")]
    titles: Vec<String>,

    /// Exclude exact title (repeatable)
    #[arg(long = "exclude-title", value_name = "TITLE")]
    exclude_titles: Vec<String>,

    /// Include release year (repeatable)
    #[arg(long = "year", value_name = "YEAR")]
    years: Vec<String>,

    /// Exclude release year (repeatable)
    #[arg(long = "exclude-year", value_name = "YEAR")]
    exclude_years: Vec<String>,

    /// Include rating value, one decimal (repeatable)
    #[arg(long = "note", value_name = "NOTE")]
    notes: Vec<String>,

    /// Exclude rating value (repeatable)
    #[arg(long = "exclude-note", value_name = "NOTE")]
    exclude_notes: Vec<String>,

    /// Select every known year matching: ">=1990", "<=2000", "1990..2000"
    #[arg(long, value_name = "EXPR")]
    years_matching: Option<NumericFilter>,

    /// Select every known rating matching: ">=7.5", "between:6:8"
    #[arg(long, value_name = "EXPR")]
    notes_matching: Option<NumericFilter>,

    /// Year range bounds
    #[arg(long)]
    year_min: Option<i32>,
    #[arg(long)]
    year_max: Option<i32>,

    /// Popularity constraint: ">=20", "<=5", "10..50"
    #[arg(long, value_name = "EXPR")]
    popularity: Option<NumericFilter>,

    /// Budget constraint
    #[arg(long, value_name = "EXPR")]
    budget: Option<NumericFilter>,

    /// Revenue constraint
    #[arg(long, value_name = "EXPR")]
    revenue: Option<NumericFilter>,
}

impl FilterArgs {
    fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        let values = |out: &mut Vec<Action>, facet: Facet, list: &[String], exclude: bool| {
            for value in list {
                let value = value.clone();
                out.push(if exclude {
                    Action::Exclude { facet, value }
                } else {
                    Action::Select { facet, value }
                });
            }
        };

        values(&mut actions, Facet::Genre, &self.genres, false);
        values(&mut actions, Facet::Genre, &self.exclude_genres, true);
        values(&mut actions, Facet::Production, &self.companies, false);
        values(&mut actions, Facet::Production, &self.exclude_companies, true);
        values(&mut actions, Facet::Title, &self.titles, false);
        values(&mut actions, Facet::Title, &self.exclude_titles, true);
        values(&mut actions, Facet::Year, &self.years, false);
        values(&mut actions, Facet::Year, &self.exclude_years, true);
        values(&mut actions, Facet::Note, &self.notes, false);
        values(&mut actions, Facet::Note, &self.exclude_notes, true);

        if self.strict_genres {
            actions.push(Action::SetStrict {
                facet: Facet::Genre,
                strict: true,
            });
        }
        if self.strict_companies {
            actions.push(Action::SetStrict {
                facet: Facet::Production,
                strict: true,
            });
        }

        for (facet, filter) in [(Facet::Year, self.years_matching), (Facet::Note, self.notes_matching)] {
            if let Some(filter) = filter {
                actions.push(Action::SelectMatching {
                    facet,
                    predicate: ValuePredicate::from(filter),
                });
            }
        }

        for (facet, filter) in [
            (NumericFacet::Popularity, self.popularity),
            (NumericFacet::Budget, self.budget),
            (NumericFacet::Revenue, self.revenue),
        ] {
            if let Some(filter) = filter {
                actions.push(Action::SetNumeric { facet, filter });
            }
        }

        actions
    }

    /// Year bounds are applied last so they clamp against the loaded data.
    fn year_range(&self, session: &Session) -> Option<Action> {
        if self.year_min.is_none() && self.year_max.is_none() {
            return None;
        }
        let bounds = session.state().year_bounds();
        Some(Action::SetYearRange {
            min: self.year_min.unwrap_or(bounds.min),
            max: self.year_max.unwrap_or(bounds.max),
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start interactive web UI for filtering
    Serve {
        /// Dataset CSV file or directory
        path: PathBuf,

        /// Port to listen on (default: port from config, 3001)
        #[arg(short, long)]
        port: Option<u16>,

        /// Don't open the browser
        #[arg(long)]
        no_open: bool,
    },

    /// List the options of one facet with their status under the filters
    Facets {
        /// Dataset CSV file or directory
        path: PathBuf,

        /// Facet to list: genre, production, title, year, note
        facet: Facet,

        /// Case-insensitive substring filter on the option labels
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of options to print
        #[arg(long, default_value = "50")]
        limit: usize,

        #[command(flatten)]
        filters: FilterArgs,
    },
}

fn main() {
    let mut args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    let config = match Config::discover(args.config.as_deref(), Path::new(".")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid config: {}", e);
            std::process::exit(1);
        }
    };

    // Handle subcommands first
    if let Some(cmd) = args.command.take() {
        let outcome = match cmd {
            Command::Serve { path, port, no_open } => load_session(&path, config, args.quiet).and_then(|session| {
                let port = port.unwrap_or(session.config().port);
                cinefacet::serve::start(port, session, !no_open)
            }),
            Command::Facets {
                path,
                facet,
                search,
                limit,
                filters,
            } => load_session(&path, config, args.quiet)
                .and_then(|session| list_facet(session, facet, search.as_deref(), limit, &filters, args.verbose)),
        };
        if let Err(e) = outcome {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Determine if we should use GUI mode
    // With GUI feature: launch GUI if --gui flag OR no path provided
    #[cfg(feature = "gui")]
    let use_gui = args.gui || args.path.is_none();

    #[cfg(not(feature = "gui"))]
    let use_gui = false;

    let path = match args.path.clone() {
        Some(p) if !use_gui => p,
        _ => match pick_path(use_gui) {
            Some(p) => p,
            None => std::process::exit(if use_gui { 0 } else { 1 }),
        },
    };

    if let Err(e) = run(&args, &path, config, use_gui) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[cfg(feature = "gui")]
fn pick_path(use_gui: bool) -> Option<PathBuf> {
    if !use_gui {
        return None;
    }
    let picked = rfd::FileDialog::new()
        .set_title("Select a movie dataset")
        .add_filter("CSV files", &["csv"])
        .pick_file();
    if picked.is_none() {
        eprintln!("No dataset selected.");
    }
    picked
}

#[cfg(not(feature = "gui"))]
fn pick_path(_use_gui: bool) -> Option<PathBuf> {
    eprintln!("Usage: cinefacet <PATH>");
    eprintln!("Run 'cinefacet --help' for more options.");
    eprintln!("Note: GUI mode not available in this build.");
    None
}

/// Resolve and load the dataset, with a byte progress bar for large files.
fn load_dataset(path: &Path, quiet: bool) -> Result<Dataset> {
    let csv_path = resolve_dataset_path(path)?;
    let size = std::fs::metadata(&csv_path)?.len();
    let file = File::open(&csv_path)?;

    // Small files load before a bar would even draw
    let pb = if !quiet && size > 4 * 1024 * 1024 {
        let pb = ProgressBar::new(size);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.set_message("loading");
        Some(pb)
    } else {
        None
    };

    let dataset = loader::from_reader(file, |pos| {
        if let Some(ref pb) = pb {
            pb.set_position(pos);
        }
    })?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    tracing::info!(path = %csv_path.display(), records = dataset.len(), "dataset loaded");

    if !quiet {
        eprintln!("\x1b[1mcinefacet - Movie Facet Explorer\x1b[0m");
        eprintln!("{}", "─".repeat(78));
        eprintln!(
            "Loaded {} movie(s), {} distinct title(s) from {}\n",
            dataset.len(),
            dataset.unique_titles(),
            csv_path.display()
        );
    }
    Ok(dataset)
}

fn load_session(path: &Path, config: Config, quiet: bool) -> Result<Session> {
    let dataset = load_dataset(path, quiet)?;
    Ok(Session::new(Arc::new(dataset), config))
}

fn apply_filters(session: &mut Session, filters: &FilterArgs) -> Result<()> {
    for action in filters.actions() {
        tracing::debug!(action = %action, "cli filter");
        session.apply(action)?;
    }
    if let Some(action) = filters.year_range(session) {
        session.apply(action)?;
    }
    Ok(())
}

fn run(args: &Args, path: &Path, config: Config, use_gui: bool) -> Result<()> {
    let mut session = load_session(path, config, args.quiet)?;
    apply_filters(&mut session, &args.filters)?;

    let query = TableQuery {
        sort: args.sort,
        order: args.order,
        page: args.page,
        per_page: args.per_page.unwrap_or(0),
        metric: args.metric,
    };
    let page = session.table(&query);

    if !args.quiet {
        println!(
            "\x1b[1m{:<36} {:>5} {:>5} {:>9} {:>14}  {}\x1b[0m",
            "TITLE", "YEAR", "NOTE", "POPULAR", "BUDGET", "GENRES"
        );
        for record in &page.rows {
            print_row(record);
        }
        eprintln!(
            "\n\x1b[90mPage {} of {} ({} distinct titles)\x1b[0m",
            page.page, page.total_pages, page.total_rows
        );

        if args.verbose {
            let availability = session.availability();
            for facet in Facet::ALL {
                eprintln!("    {:<10} {} value(s) available", facet.name(), availability.get(facet).len());
            }
        }
    }

    // Summary
    let summary = session.summary();
    if !args.quiet {
        eprintln!("\n{}", "─".repeat(78));
    }
    eprintln!("\x1b[1mSummary:\x1b[0m");
    eprintln!("  \x1b[32m✓ Matched:\x1b[0m   {} of {}", summary.total, session.dataset().len());
    eprintln!("  Titles:      {}", summary.distinct_titles);
    if let (Some(min), Some(max)) = (summary.year_min, summary.year_max) {
        eprintln!("  Years:       {}–{}", min, max);
    }
    if let Some(rating) = summary.mean_rating {
        eprintln!("  Mean note:   {:.2}", rating);
    }
    if summary.total == 0 {
        eprintln!("  \x1b[33m? No movie passes every filter\x1b[0m");
    }

    // Determine report path
    let report_path = if let Some(ref output) = args.output {
        Some(output.clone())
    } else if args.save {
        std::fs::create_dir_all(&args.report_dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Some(args.report_dir.join(format!("cinefacet_report_{}.csv", timestamp)))
    } else {
        None
    };

    if let Some(ref output_path) = report_path {
        let rows = session.filtered();
        cinefacet::report::generate(output_path, &rows)?;
        if !args.quiet {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }
        if !args.no_open {
            maybe_open(output_path, use_gui, args.quiet);
        }
    }

    Ok(())
}

fn maybe_open(path: &Path, use_gui: bool, quiet: bool) {
    if use_gui {
        // In GUI mode, auto-open the report (no prompt)
        let _ = open::that(path);
        return;
    }
    if quiet {
        return;
    }
    eprint!("\nOpen report? [Y/n] ");
    io::stderr().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim().to_lowercase();
        if input.is_empty() || input == "y" || input == "yes" {
            if let Err(e) = open::that(path) {
                eprintln!("Failed to open report: {}", e);
            }
        }
    }
}

fn print_row(record: &MovieRecord) {
    let note = record
        .rating()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    let year = record.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());
    let popularity = record
        .popularity
        .map(|p| format!("{:.1}", p))
        .unwrap_or_else(|| "-".to_string());
    let budget = record.budget.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string());
    println!(
        "{:<36} {:>5} {:>5} {:>9} {:>14}  {}",
        truncate(&record.title, 36),
        year,
        note,
        popularity,
        budget,
        truncate(&record.genres.join(", "), 40)
    );
}

fn list_facet(
    mut session: Session,
    facet: Facet,
    search: Option<&str>,
    limit: usize,
    filters: &FilterArgs,
    verbose: bool,
) -> Result<()> {
    apply_filters(&mut session, filters)?;
    let entries = session.picker(facet, search);
    let available = entries.iter().filter(|e| e.available).count();

    for entry in entries.iter().take(limit) {
        let (color, mark) = match entry.status {
            PickStatus::Selected => ("\x1b[32m", "+"),
            PickStatus::Available => ("", " "),
            PickStatus::Excluded => ("\x1b[31m", "-"),
            PickStatus::Unavailable => ("\x1b[90m", " "),
        };
        println!("{}{} {}\x1b[0m", color, mark, entry.value);
    }
    if entries.len() > limit {
        eprintln!("\x1b[90m... {} more\x1b[0m", entries.len() - limit);
    }
    eprintln!(
        "\n{} option(s), {} available under the other filters",
        entries.len(),
        available
    );

    if verbose {
        for numeric in NumericFacet::ALL {
            if let Some((lo, hi)) = session.numeric_extent(numeric) {
                eprintln!("    {:<10} {:.1} .. {:.1}", numeric.name(), lo, hi);
            }
        }
    }
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
