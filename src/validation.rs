use crate::error::{Error, Result};
use reqwest::Url;

const MAX_TICKER_LEN: usize = 16;
const MAX_POLL_INTERVAL_SECS: u64 = 86_400;

pub fn validate_ticker(ticker: &str) -> Result<()> {
    if ticker.is_empty() {
        return Err(Error::ValidationError("Ticker cannot be empty".to_string()));
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(Error::ValidationError(format!("Ticker {} is too long", ticker)));
    }
    if !ticker.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::ValidationError(format!(
            "Ticker {} must contain only letters and digits",
            ticker
        )));
    }
    Ok(())
}

pub fn validate_endpoint(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| Error::ValidationError(format!("Invalid URL {}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::ValidationError(format!("Unsupported URL scheme: {}", scheme))),
    }
}

pub fn validate_interval(secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(Error::ValidationError("Poll interval must be positive".to_string()));
    }
    if secs > MAX_POLL_INTERVAL_SECS {
        return Err(Error::ValidationError("Poll interval is longer than a day".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickers() {
        assert!(validate_ticker("USDC").is_ok());
        assert!(validate_ticker("SPYx").is_ok());
        assert!(validate_ticker("").is_err());
        assert!(validate_ticker("US DC").is_err());
        assert!(validate_ticker("ABCDEFGHIJKLMNOPQ").is_err());
    }

    #[test]
    fn test_endpoints() {
        assert!(validate_endpoint("https://api.example.com/v1/assets").is_ok());
        assert!(validate_endpoint("ftp://example.com").is_err());
        assert!(validate_endpoint("not a url").is_err());
    }

    #[test]
    fn test_intervals() {
        assert!(validate_interval(30).is_ok());
        assert!(validate_interval(0).is_err());
        assert!(validate_interval(90_000).is_err());
    }
}
