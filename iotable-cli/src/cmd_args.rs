use std::ffi::OsString;
use std::path::PathBuf;

pub use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Render a data grid from a seed file", long_about = None)]
struct ClapArgs {
    /// JSON seed with `columns` and optional `rows` or `cells`.
    seed: PathBuf,

    #[clap(short = 'o', long, help = "grid options file (JSON)")]
    options: Option<PathBuf>,

    #[clap(short = 'u', long, help = "fetch rows from this URL (server mode)")]
    url: Option<String>,

    #[clap(short = 's', long, help = "search phrase")]
    search: Option<String>,

    #[clap(long = "sort", value_name = "COLUMN[:asc|desc]", help = "sort by column, repeatable")]
    sort: Vec<String>,

    #[clap(short = 'p', long, help = "page number to show")]
    page: Option<usize>,

    #[clap(long = "page-size", allow_negative_numbers = true, help = "rows per page, -1 for all")]
    page_size: Option<i64>,

    #[clap(long = "select", value_delimiter = ',', help = "row ids to select")]
    select: Vec<String>,

    #[clap(long, help = "print the render snapshot as JSON")]
    json: bool,

    #[clap(short = 'v', long, help = "log to stderr instead of the log file")]
    verbose: bool,
}

#[derive(Debug, Clone)]
pub struct CommandLineArgs {
    seed: PathBuf,
    options: Option<PathBuf>,
    url: Option<String>,
    search: Option<String>,
    sort: Vec<String>,
    page: Option<usize>,
    page_size: Option<i64>,
    select: Vec<String>,
    json: bool,
    verbose: bool,
}

impl From<ClapArgs> for CommandLineArgs {
    fn from(args: ClapArgs) -> Self {
        Self {
            seed: args.seed,
            options: args.options,
            url: args.url,
            search: args.search,
            sort: args.sort,
            page: args.page,
            page_size: args.page_size,
            select: args.select,
            json: args.json,
            verbose: args.verbose,
        }
    }
}

impl CommandLineArgs {
    pub fn parse() -> Self {
        ClapArgs::parse().into()
    }

    #[allow(dead_code)]
    pub fn parse_from<I, T>(itr: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        ClapArgs::parse_from(itr).into()
    }

    pub fn seed(&self) -> &PathBuf {
        &self.seed
    }

    pub fn options(&self) -> Option<&PathBuf> {
        self.options.as_ref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn sort(&self) -> &[String] {
        &self.sort
    }

    pub fn page(&self) -> Option<usize> {
        self.page
    }

    pub fn page_size(&self) -> Option<i64> {
        self.page_size
    }

    pub fn select(&self) -> &[String] {
        &self.select
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
