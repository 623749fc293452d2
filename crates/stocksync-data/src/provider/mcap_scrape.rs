//! Market-capitalization web fallback.
//!
//! When the quote-summary API has no market cap for a symbol, the
//! key-statistics HTML page usually still shows one. This scraper fetches
//! that page, locates the "Market Cap" cell and parses its suffix-scaled
//! value ("1.23T", "456.7B", "89M", "12K" or a plain number).
//!
//! This is the only scraping surface in the system; everything else goes
//! through structured endpoints.

use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{DataError, Result};
use crate::limiter::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Key-statistics page scraper with shared rate limiting.
pub struct McapScraper {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    base_url: String,
}

impl McapScraper {
    /// Create a scraper sharing the given request limiter.
    pub fn new(limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::ConnectionError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            limiter,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the scraper at a different host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Scrape the market cap shown on the symbol's key-statistics page.
    pub async fn fetch_market_cap(&self, symbol: &str) -> Result<f64> {
        self.limiter.acquire().await;

        let url = format!(
            "{}/quote/{}/key-statistics?p={}",
            self.base_url, symbol, symbol
        );

        debug!(symbol = symbol, "market cap page request");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(DataError::FetchError(format!(
                "key-statistics page HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        let html = response.text().await?;
        let text = extract_market_cap_text(&html).ok_or_else(|| {
            DataError::ParseError(format!("no Market Cap cell on page for {}", symbol))
        })?;

        parse_scaled_number(&text).ok_or_else(|| {
            DataError::ParseError(format!(
                "unparseable market cap \"{}\" for {}",
                text, symbol
            ))
        })
    }
}

/// Find the cell following the "Market Cap" label cell.
fn extract_market_cap_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let td = Selector::parse("td").ok()?;

    for cell in document.select(&td) {
        let label: String = cell.text().collect();
        if label.contains("Market Cap") {
            let value_cell = cell.next_siblings().find_map(ElementRef::wrap)?;
            let value: String = value_cell.text().collect();
            let value = value.trim().to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }

    None
}

/// Parse "1.23T" / "456.7B" / "89M" / "12K" / "123456" into a plain number.
fn parse_scaled_number(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() || cleaned == "N/A" {
        return None;
    }

    let (mantissa, multiplier) = match cleaned.chars().last()? {
        'T' => (&cleaned[..cleaned.len() - 1], 1e12),
        'B' => (&cleaned[..cleaned.len() - 1], 1e9),
        'M' => (&cleaned[..cleaned.len() - 1], 1e6),
        'K' => (&cleaned[..cleaned.len() - 1], 1e3),
        _ => (cleaned.as_str(), 1.0),
    };

    mantissa.parse::<f64>().ok().map(|n| n * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body><table><tbody>
            <tr><td>Enterprise Value</td><td>2.10T</td></tr>
            <tr><td><span>Market Cap (intraday)</span></td><td>1.23T</td></tr>
            <tr><td>Beta</td><td>1.1</td></tr>
        </tbody></table></body></html>
    "#;

    #[test]
    fn test_extract_market_cap_cell() {
        assert_eq!(extract_market_cap_text(PAGE).as_deref(), Some("1.23T"));
    }

    #[test]
    fn test_extract_missing_cell() {
        assert_eq!(extract_market_cap_text("<html><body></body></html>"), None);
    }

    #[test]
    fn test_parse_scaled_number() {
        assert_eq!(parse_scaled_number("1.5T"), Some(1.5e12));
        assert_eq!(parse_scaled_number("456.7B"), Some(456.7e9));
        assert_eq!(parse_scaled_number("89M"), Some(89.0e6));
        assert_eq!(parse_scaled_number("12K"), Some(12.0e3));
        assert_eq!(parse_scaled_number("123456"), Some(123456.0));
        assert_eq!(parse_scaled_number("1,234,567"), Some(1234567.0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_scaled_number("N/A"), None);
        assert_eq!(parse_scaled_number(""), None);
        assert_eq!(parse_scaled_number("--"), None);
    }
}
