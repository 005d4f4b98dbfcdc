//! Filing acquisition and plain-text extraction.
//!
//! Downloads 8-K filings from SEC EDGAR (which requires a declared
//! User-Agent and polite request pacing) and reduces the HTML to best-effort
//! plain text. Malformed markup never fails extraction; the parser recovers
//! and we keep whatever text it found.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use scraper::Html;
use tracing::info;

use crate::error::AppError;

/// SEC EDGAR rejects requests without a contact-style User-Agent.
const SEC_USER_AGENT: &str = "FilingLens/1.0 (+https://github.com/filinglens/filinglens)";

/// EDGAR allows at most 10 requests per second; pace each download.
const FETCH_DELAY: Duration = Duration::from_millis(100);

/// Downloads a filing and returns its raw body text.
///
/// A malformed locator fails with [`AppError::Config`] before any request is
/// sent. Retrieval failures, transport-level or HTTP-level, fail with
/// [`AppError::Fetch`] carrying a status hint.
pub async fn download_filing(client: &Client, url: &str) -> Result<String, AppError> {
    url::Url::parse(url)?;
    tokio::time::sleep(FETCH_DELAY).await;

    info!(%url, "downloading filing");
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, SEC_USER_AGENT)
        .send()
        .await
        .map_err(|e| AppError::Fetch {
            url: url.to_string(),
            status_hint: e
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unreachable".to_string()),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Fetch {
            url: url.to_string(),
            status_hint: status.to_string(),
        });
    }

    response.text().await.map_err(|e| AppError::Fetch {
        url: url.to_string(),
        status_hint: format!("body read failed: {}", e),
    })
}

/// Extracts plain text from filing HTML, one line per text node.
///
/// Best-effort: the parser tolerates malformed markup, so this never fails,
/// it just returns whatever text survives.
pub fn extract_text_from_html(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

/// Collapses all whitespace runs to single spaces.
pub fn clean_filing_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

static REGISTRANT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9 .,&\-]+)\s*\(Exact name of Registrant as specified in its charter\)")
        .expect("invalid registrant regex")
});

const COMPANY_SUFFIXES: &str = r"(Inc\.|Corporation|Corp\.|LLC|Ltd\.|Co\.|Limited|Incorporated)";

static SUFFIX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?m)^([A-Za-z0-9 .,&\-]+{})$", COMPANY_SUFFIXES))
        .expect("invalid suffix line regex")
});

static SUFFIX_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"([A-Za-z0-9 .,&\-]+{})", COMPANY_SUFFIXES))
        .expect("invalid suffix regex")
});

/// Pulls the registrant name out of filing text.
///
/// Tries the line preceding the standard charter annotation first, then a
/// line ending in a company suffix, then the first suffix match anywhere.
/// Returns "Unknown" when nothing matches.
pub fn extract_company_name(text: &str) -> String {
    if let Some(captures) = REGISTRANT_LINE.captures(text) {
        return captures[1].trim().to_string();
    }
    if let Some(captures) = SUFFIX_LINE.captures(text) {
        return captures[1].trim().to_string();
    }
    if let Some(captures) = SUFFIX_ANYWHERE.captures(text) {
        return captures[1].trim().to_string();
    }
    "Unknown".to_string()
}
