//! Walks the paginated history and collects classified rows

use std::future::Future;

use anyhow::Context;

use crate::{
    EuroBonus, Session,
    classify::{Row, classify_page},
};

/// Anything that can hand out history pages by number
pub trait PageSource {
    /// Fetches page `number`, counting from 1
    fn fetch(&self, number: u32) -> impl Future<Output = anyhow::Result<EuroBonus>> + Send;
}

impl PageSource for Session {
    fn fetch(&self, number: u32) -> impl Future<Output = anyhow::Result<EuroBonus>> + Send {
        self.page(number)
    }
}

/// How many pages to crawl
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageLimit {
    /// Only the most recent page
    #[default]
    First,
    /// At most this many pages
    Pages(u32),
    /// Every page the server has
    All,
}

impl PageLimit {
    /// The last page to fetch given the server's page count
    pub fn highest(self, total_pages: u32) -> u32 {
        match self {
            PageLimit::First => 1,
            PageLimit::Pages(n) => n.min(total_pages),
            PageLimit::All => total_pages,
        }
    }
}

/// The outcome of a crawl
#[derive(Debug)]
pub struct Crawl {
    /// Base points on the account, as reported on page 1
    pub points_available: i64,
    /// Usable points on the account, as reported on page 1
    pub total_points_for_use: i64,
    /// Page count reported by the server
    pub total_pages: u32,
    /// Pages actually fetched
    pub pages_fetched: u32,
    /// Classified transactions in page order
    pub rows: Vec<Row>,
}

/// Fetches page 1, then pages 2 up to the limit in order
///
/// The account summary and the page count are taken from page 1 only.
///
/// # Errors
///
/// Any failing page aborts the crawl, as does a transaction with a malformed date.
pub async fn crawl<S: PageSource>(source: &S, limit: PageLimit) -> anyhow::Result<Crawl> {
    let first = source.fetch(1).await?;
    let total_pages = u32::try_from(first.transaction_history.total_number_of_pages)
        .with_context(|| {
            format!(
                "invalid page count {}",
                first.transaction_history.total_number_of_pages
            )
        })?;

    let mut rows = classify_page(&first.transaction_history.transaction)
        .context("failed to classify page 1")?;

    let highest = limit.highest(total_pages);
    for number in 2..=highest {
        let page = source.fetch(number).await?;
        rows.extend(
            classify_page(&page.transaction_history.transaction)
                .with_context(|| format!("failed to classify page {number}"))?,
        );
    }

    Ok(Crawl {
        points_available: first.points_available,
        total_points_for_use: first.total_points_for_use,
        total_pages,
        pages_fetched: highest.max(1),
        rows,
    })
}
