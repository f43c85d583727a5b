use std::{
    fs::File,
    io::{self, BufWriter},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use ebcrawler::{
    DEFAULT_API, Session,
    crawl::{PageLimit, crawl},
    output,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Options::parse();
    logger(env_logger::Env::default().default_filter_or("info"), opts.debug).init();

    let password = opts.password_source().password(&opts.ebnumber)?;
    let mut sess = Session::new(opts.api_url.clone())?;
    sess.login(&opts.ebnumber, &password).await?;

    let crawl = crawl(&sess, opts.page_limit()).await?;
    println!("Base points:    {}", crawl.points_available);
    println!("Total points:   {}", crawl.total_points_for_use);

    match &opts.csv {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            output::write_csv(BufWriter::new(file), &crawl.rows)?;
        }
        None => output::write_table(io::stdout().lock(), &crawl.rows)?,
    }

    println!("Fetched {} EuroBonus transactions.", crawl.rows.len());
    Ok(())
}

/// Logs per `env`, with debug output from this crate forced on by `--debug`
fn logger(env: env_logger::Env<'_>, debug: bool) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(env);
    if debug {
        builder.filter_module("ebcrawler", log::LevelFilter::Debug);
    }
    builder
}

/// EuroBonus transaction crawler
#[derive(Debug, Parser)]
#[command(name = "ebcrawler", version)]
struct Options {
    /// EuroBonus number
    ebnumber: String,

    /// Password, prompted for when not given
    #[arg(long)]
    password: Option<String>,

    /// Crawl all transactions
    #[arg(long, conflicts_with = "pages")]
    all: bool,

    /// Number of pages to crawl
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pages: Option<u32>,

    /// Write to file in CSV format
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Log every raw transaction before it is classified
    #[arg(long)]
    debug: bool,

    /// Base URL of the SAS API
    #[arg(long, env = "EBCRAWLER_API_URL", default_value = DEFAULT_API)]
    api_url: String,
}

impl Options {
    fn page_limit(&self) -> PageLimit {
        match (self.all, self.pages) {
            (_, Some(pages)) => PageLimit::Pages(pages),
            (true, None) => PageLimit::All,
            (false, None) => PageLimit::First,
        }
    }

    fn password_source(&self) -> PasswordSource {
        match &self.password {
            Some(password) => PasswordSource::Given(password.clone()),
            None => PasswordSource::Prompt,
        }
    }
}

/// Where the login password comes from
enum PasswordSource {
    Given(String),
    /// Ask on the terminal without echoing
    Prompt,
}

impl PasswordSource {
    fn password(self, ebnumber: &str) -> anyhow::Result<String> {
        match self {
            PasswordSource::Given(password) => Ok(password),
            PasswordSource::Prompt => {
                rpassword::prompt_password(format!("Password for EB{ebnumber}: "))
                    .context("failed to read password")
            }
        }
    }
}
