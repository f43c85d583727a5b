//! Turns raw transactions into rows of base and usable points

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::RawTransaction;

/// A classified transaction
///
/// The serde names double as the CSV header.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Row {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    /// The point type label exactly as the API sent it
    #[serde(rename = "Pointtype")]
    pub point_type: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// Contribution to the status qualifying balance
    #[serde(rename = "Base points")]
    pub base_points: i64,
    /// Contribution to the redeemable balance, negative when points are spent or expire
    #[serde(rename = "Points")]
    pub points: i64,
}

/// Known point type label families
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointType {
    /// Status points only, like Mastercard spending
    Status,
    /// Basic points, usable too if earned by flying
    Basic,
    /// Usable points only
    Extra,
    /// Points leaving the account
    Spent,
    /// Any other label, as sent
    Unknown(String),
}

impl PointType {
    /// Matches a label case-insensitively
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "status points" | "mastercard status points" => Self::Status,
            "basic points" | "swedish domestic" => Self::Basic,
            "extra points" | "points returned" => Self::Extra,
            "points used" | "points expired" => Self::Spent,
            _ => Self::Unknown(label.to_owned()),
        }
    }
}

/// What caused a basic points transaction
///
/// Unlike point type labels, these are matched exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Activity {
    /// Flights and special activities earn both basic and usable points
    Earning,
    /// Old style card points (Amex) only count as basic points
    Correction,
    /// Any other transaction type, as sent
    Other(String),
}

impl Activity {
    /// Matches a transaction type label exactly
    pub fn from_label(label: &str) -> Self {
        match label {
            "Flightactivity" | "Flight Activity" | "Special Activity" => Self::Earning,
            "Transactioncorrection" => Self::Correction,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Vocabulary that fell through the table
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unrecognized {
    /// A point type label outside the known families
    PointType(String),
    /// A basic points transaction with an unknown transaction type
    TransactionType(String),
}

/// The point effect of one transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Effect {
    /// Goes to the [`Row::base_points`] column
    pub base_points: i64,
    /// Goes to the [`Row::points`] column
    pub points: i64,
    /// Set when the labels were not recognized; the effect is then zero for the unknown part
    pub unrecognized: Option<Unrecognized>,
}

impl Effect {
    /// Resolves the effect of moving `amount` points for the given labels
    pub fn resolve(point_type: &str, transaction_type: &str, amount: i64) -> Self {
        let (base_points, points, unrecognized) = match PointType::from_label(point_type) {
            PointType::Status => (amount, 0, None),
            PointType::Basic => match Activity::from_label(transaction_type) {
                Activity::Earning => (amount, amount, None),
                Activity::Correction => (amount, 0, None),
                Activity::Other(kind) => (amount, 0, Some(Unrecognized::TransactionType(kind))),
            },
            PointType::Extra => (0, amount, None),
            PointType::Spent => (0, amount.saturating_neg(), None),
            PointType::Unknown(label) => (0, 0, Some(Unrecognized::PointType(label))),
        };

        Effect {
            base_points,
            points,
            unrecognized,
        }
    }
}

/// Classifies one transaction
///
/// Unrecognized point types only log a warning and give a zero effect, so new API vocabulary
/// does not stop a crawl. Their amount is never looked at.
///
/// # Errors
///
/// Fails if the performed date is not a `YYYY-MM-DDTHH:MM:SS.ffffffZ` timestamp, or if a
/// recognized point type comes with an amount that is not an integer.
pub fn classify(tx: &RawTransaction) -> anyhow::Result<Row> {
    let date = performed_date(&tx.date_performed)?;
    let amount = match PointType::from_label(&tx.basic_points_after_transaction) {
        PointType::Unknown(_) => 0,
        _ => tx.points()?,
    };
    let effect = Effect::resolve(
        &tx.basic_points_after_transaction,
        &tx.type_of_transaction,
        amount,
    );

    match &effect.unrecognized {
        Some(Unrecognized::TransactionType(kind)) => {
            log::warn!("Unknown type for base points: {kind}")
        }
        Some(Unrecognized::PointType(_)) => log::warn!("Unknown transaction: {tx}"),
        None => {}
    }

    Ok(Row {
        date,
        point_type: tx.basic_points_after_transaction.clone(),
        description: description(tx),
        base_points: effect.base_points,
        points: effect.points,
    })
}

/// Classifies a page of transactions, keeping their order
pub fn classify_page(transactions: &[RawTransaction]) -> anyhow::Result<Vec<Row>> {
    let mut rows = Vec::with_capacity(transactions.len());
    for tx in transactions {
        log::debug!("{tx}");
        rows.push(classify(tx)?);
    }
    Ok(rows)
}

/// Prefers the single `description` field, falling back to the two part form
fn description(tx: &RawTransaction) -> String {
    match tx.description.as_deref() {
        Some(description) if !description.is_empty() => description.to_owned(),
        _ => format!(
            "{} {}",
            tx.description1.as_deref().unwrap_or_default(),
            tx.description2.as_deref().unwrap_or_default()
        ),
    }
}

/// Parses `YYYY-MM-DDTHH:MM:SS.ffffffZ`, with one to six fraction digits
fn performed_date(s: &str) -> anyhow::Result<NaiveDate> {
    let (timestamp, _) = s
        .strip_suffix('Z')
        .and_then(|rest| rest.split_once('.'))
        .filter(|(_, fraction)| {
            (1..=6).contains(&fraction.len()) && fraction.bytes().all(|b| b.is_ascii_digit())
        })
        .with_context(|| format!("invalid transaction date {s:?}"))?;

    let performed = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S")
        .with_context(|| format!("invalid transaction date {s:?}"))?;
    Ok(performed.date())
}
