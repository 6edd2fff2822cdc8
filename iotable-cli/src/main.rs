mod cmd_args;
mod error;
mod paths;
mod table;

use std::fs::{self, File};
use std::io::Write;

use iotable_lib::pagination::PageTarget;
use iotable_lib::{Grid, GridOptions, GridSeed, PageSize, SortDirective, SortOrder, Value};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use crate::cmd_args::CommandLineArgs;
use crate::error::CliError;
use crate::table::TextSink;

#[tokio::main]
async fn main() {
    let args = CommandLineArgs::parse();
    init_logging(args.verbose());

    if let Err(e) = run(&args).await {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    if verbose {
        let _ = TermLogger::init(
            LevelFilter::Debug,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        );
        return;
    }

    let Some(path) = paths::log_file() else { return };
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    if let Ok(file) = File::create(&path) {
        let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), file);
    }
}

async fn run(args: &CommandLineArgs) -> Result<(), CliError> {
    let mut options = load_options(args)?;
    if let Some(url) = args.url() {
        options = options.server(url);
    }

    let seed = GridSeed::from_file(args.seed())?;
    let sink = TextSink::new();
    let mut grid = Grid::builder(seed)
        .options(options)
        .render_sink(sink.clone())
        .listener(|event| log::debug!("Grid event: {}", event.name()))
        .build()?;
    grid.settle().await;

    if let Some(size) = args.page_size() {
        grid.set_page_size(PageSize::try_from(size)?);
    }
    if let Some(phrase) = args.search() {
        grid.search(phrase);
    }
    if !args.sort().is_empty() {
        grid.sort(Some(parse_sort(args.sort())?));
    }
    grid.settle().await;

    if let Some(page) = args.page()
        && grid.go_to_page(PageTarget::Number(page))
    {
        grid.settle().await;
    }

    if !args.select().is_empty() {
        let ids: Vec<Value> = args.select().iter().map(String::as_str).map(parse_id).collect();
        let selected = grid.select(Some(&ids));
        log::debug!("Selected {selected} row(s)");
    }

    if let Some(e) = grid.last_error() {
        eprintln!("Warning: {e}");
    }

    log::debug!("Rendered {} frame(s)", sink.frame_count());
    let mut stdout = std::io::stdout().lock();
    if args.json() {
        serde_json::to_writer_pretty(&mut stdout, &grid.view())?;
        writeln!(stdout)?;
    } else {
        write!(stdout, "{}", sink.latest())?;
    }
    Ok(())
}

/// Explicit `--options`, else the config-dir default when present.
fn load_options(args: &CommandLineArgs) -> Result<GridOptions, CliError> {
    if let Some(path) = args.options() {
        return Ok(GridOptions::from_file(path)?);
    }
    match paths::default_options() {
        Some(path) if path.is_file() => {
            log::info!("Using options from {}", path.display());
            Ok(GridOptions::from_file(path)?)
        }
        _ => Ok(GridOptions::default()),
    }
}

fn parse_sort(entries: &[String]) -> Result<SortDirective, CliError> {
    let mut directive = SortDirective::new();
    for entry in entries {
        let (column, order) = match entry.split_once(':') {
            None => (entry.as_str(), SortOrder::Asc),
            Some((column, "asc")) => (column, SortOrder::Asc),
            Some((column, "desc")) => (column, SortOrder::Desc),
            Some(_) => return Err(CliError::InvalidSort(entry.clone())),
        };
        if column.is_empty() {
            return Err(CliError::InvalidSort(entry.clone()));
        }
        directive.insert(column, order);
    }
    Ok(directive)
}

/// Numeric-looking ids match numeric identifier columns.
fn parse_id(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(raw),
    }
}
