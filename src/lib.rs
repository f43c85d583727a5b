//! Client library for the SAS EuroBonus transaction history
//!
//! This library logs in to the EuroBonus web API, fetches the paginated transaction history
//! and classifies every transaction into base (status qualifying) and usable points.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> anyhow::Result<()> {
//! let mut session = ebcrawler::Session::new(ebcrawler::DEFAULT_API)?;
//! session.login("EB123456789", "hunter2").await?;
//!
//! let crawl = ebcrawler::crawl::crawl(&session, ebcrawler::crawl::PageLimit::All).await?;
//! for row in &crawl.rows {
//!     println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```

use std::{fmt, str::FromStr};

use anyhow::Context;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub mod classify;
pub mod crawl;
pub mod output;

/// A session for interacting with the EuroBonus API
///
/// Create a new session with [`Session::new()`], authenticate with [`Session::login()`],
/// and retrieve transaction history with [`Session::page()`].
pub struct Session {
    api: String,
    client: reqwest::Client,
    credentials: Option<Credentials>,
}

impl Session {
    /// Creates a new session against the API rooted at `api`
    ///
    /// The HTTP client sends the same browser headers the SAS web site does on every request.
    /// The session is not authenticated until [`Session::login()`] is called.
    pub fn new(api: impl Into<String>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STR));
        headers.insert(ORIGIN, HeaderValue::from_static(ORIGIN_STR));
        headers.insert(REFERER, HeaderValue::from_static(REFERER_STR));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_STR));

        let api = api.into();
        Ok(Session {
            api: api.trim_end_matches('/').to_owned(),
            client: reqwest::Client::builder()
                .default_headers(headers)
                .build()?,
            credentials: None,
        })
    }

    /// Authenticates the session with a EuroBonus number and password
    ///
    /// This performs a password grant against the token endpoint. The session must be
    /// successfully logged in before calling [`Session::page()`].
    ///
    /// # Errors
    ///
    /// Reasons this could error include:
    ///
    /// - The network request fails
    /// - Authentication fails (the error carries the status and response body)
    /// - The token response cannot be parsed
    pub async fn login(&mut self, account: &str, password: &str) -> anyhow::Result<()> {
        let request = TokenRequest {
            grant_type: "password",
            username: account,
            password,
        };

        log::info!("Logging in...");
        let response = self
            .client
            .post(format!("{}/authorize/oauth/token", self.api))
            .basic_auth(CLIENT_ID, None::<&str>)
            .form(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("failed to log in ({status}):\n{body}");
        }

        self.credentials = Some(response.json::<Credentials>().await?);
        Ok(())
    }

    /// Retrieves one page of transaction history
    ///
    /// Pages are numbered from 1. The account summary fields are filled in on every page,
    /// the total number of pages is reported in [`TransactionHistory`].
    ///
    /// # Errors
    ///
    /// Reasons this could error include:
    ///
    /// - The session has not been logged in
    /// - The network request fails
    /// - The API returns an error response
    /// - The response cannot be parsed
    pub async fn page(&self, number: u32) -> anyhow::Result<EuroBonus> {
        let Some(credentials) = &self.credentials else {
            anyhow::bail!("fetching page {number} requires a logged in session");
        };

        let params = PageParams {
            page_number: number,
            customer_session_id: &credentials.customer_session_id,
        };

        log::info!("Fetching page {number}");
        let response = self
            .client
            .get(format!("{}/customer/euroBonus/getAccountInfo", self.api))
            .header(AUTHORIZATION, credentials.access_token.as_str())
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("failed to get page {number} ({status}):\n{body}");
        }

        let json = response.text().await?;
        match serde_json::from_str::<AccountInfo>(&json) {
            Ok(rsp) => Ok(rsp.euro_bonus),
            Err(error) => {
                log::debug!("{:#?}", Value::from_str(&json)?);
                anyhow::bail!("failed to decode page {number}: {error}");
            }
        }
    }
}

/// Credentials handed out by the token endpoint
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Sent verbatim in the `Authorization` header of history requests
    pub access_token: String,
    /// Passed as a query parameter on history requests
    #[serde(rename = "customerSessionId")]
    pub customer_session_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("customer_session_id", &self.customer_session_id)
            .finish()
    }
}

/// Response wrapper for the account info endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Loyalty account summary and one page of history
    pub euro_bonus: EuroBonus,
}

/// One page of the EuroBonus account info
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EuroBonus {
    /// Base points currently on the account
    #[serde(deserialize_with = "lenient_int")]
    pub points_available: i64,
    /// Points that can be spent
    #[serde(deserialize_with = "lenient_int")]
    pub total_points_for_use: i64,
    /// The transactions on this page and pagination metadata
    pub transaction_history: TransactionHistory,
}

/// A page of transactions with pagination metadata
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHistory {
    /// Number of pages the server has for this account
    #[serde(deserialize_with = "lenient_int")]
    pub total_number_of_pages: i64,
    /// The transactions on this page, newest first
    #[serde(default)]
    pub transaction: Vec<RawTransaction>,
}

/// A single transaction as returned by the API
///
/// The labels are free text and their wording and casing have changed over time, see
/// [`classify`] for how they are interpreted.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    /// Timestamp like `2023-03-01T10:15:30.123456Z`
    pub date_performed: String,
    /// The point type label, despite the name (like "Basic Points" or "Points Used")
    pub basic_points_after_transaction: String,
    /// The amount of points this transaction moved, despite the name
    ///
    /// Kept undecoded since only recognized point types need it, see [`RawTransaction::points()`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_points_after_transaction: Option<Value>,
    /// Like "Flight Activity" or "Transactioncorrection"
    #[serde(default)]
    pub type_of_transaction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description2: Option<String>,
    /// Fields not modelled above, kept so logged records are complete
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RawTransaction {
    /// The amount of points moved, sent either as a JSON number or as a numeric string
    ///
    /// # Errors
    ///
    /// Fails if the amount is missing or not an integer.
    pub fn points(&self) -> anyhow::Result<i64> {
        let points = match &self.available_points_after_transaction {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        points.with_context(|| {
            format!(
                "invalid points amount {:?}",
                self.available_points_after_transaction
            )
        })
    }
}

/// The record as JSON, including fields that are not modelled
impl fmt::Display for RawTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Integers arrive either as JSON numbers or as numeric strings
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int {
        Number(i64),
        Text(String),
    }

    match Int::deserialize(deserializer)? {
        Int::Number(n) => Ok(n),
        Int::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageParams<'a> {
    page_number: u32,
    customer_session_id: &'a str,
}

/// Production API host
pub const DEFAULT_API: &str = "https://api.flysas.com";
const CLIENT_ID: &str = "SAS-UI";
const ORIGIN_STR: &str = "https://www.sas.se";
const REFERER_STR: &str = "https://www.sas.se/";
const ACCEPT_STR: &str = "application/json, text/plain, */*";
const USER_AGENT_STR: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
