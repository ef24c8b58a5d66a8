//! Upstream fetch and EUC-KR decoding.

use std::sync::Arc;
use std::time::Instant;

use encoding_rs::EUC_KR;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::CrawlerConfig;
use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::parser::parse_ranking_table;
use crate::Snapshot;

/// Failure to obtain the upstream document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("request failed: {0}")]
    Transport(#[from] HttpError),
}

/// Performs a GET and returns the raw body of a 2xx response.
pub async fn fetch(
    http: &dyn HttpClient,
    url: &str,
    headers: &[(&str, &str)],
    timeout_ms: u64,
) -> Result<Vec<u8>, FetchError> {
    let request = headers
        .iter()
        .fold(HttpRequest::get(url), |request, (name, value)| {
            request.with_header(*name, *value)
        })
        .with_timeout_ms(timeout_ms);

    let response = http.execute(request).await?;
    if !response.is_success() {
        return Err(FetchError::Status {
            status: response.status,
        });
    }
    Ok(response.body)
}

/// Decodes EUC-KR (as served by the upstream, regardless of meta tags or a BOM).
///
/// Malformed sequences become U+FFFD instead of failing.
pub fn decode(raw: &[u8]) -> String {
    let (text, had_errors) = EUC_KR.decode_without_bom_handling(raw);
    if had_errors {
        warn!(target: "kospi::crawl", bytes = raw.len(), "malformed EUC-KR sequences replaced");
    }
    text.into_owned()
}

/// Fetch, decode, and parse pipeline for the ranking page.
#[derive(Clone)]
pub struct Crawler {
    http: Arc<dyn HttpClient>,
    config: CrawlerConfig,
}

impl Crawler {
    pub fn new(http: Arc<dyn HttpClient>, config: CrawlerConfig) -> Self {
        Self { http, config }
    }

    /// Runs one crawl. Only transport and status failures are errors.
    pub async fn crawl(&self) -> Result<Snapshot, FetchError> {
        let started = Instant::now();
        info!(target: "kospi::crawl", url = %self.config.source_url, "crawl started");

        let raw = fetch(
            self.http.as_ref(),
            &self.config.source_url,
            &[("user-agent", self.config.user_agent.as_str())],
            self.config.timeout_ms,
        )
        .await?;
        let html = decode(&raw);
        let snapshot = parse_ranking_table(&html);

        info!(
            target: "kospi::crawl",
            rows = snapshot.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "crawl finished"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{FixtureHttpClient, HttpResponse};

    fn euc_kr(text: &str) -> Vec<u8> {
        let (bytes, _, _) = EUC_KR.encode(text);
        bytes.into_owned()
    }

    #[test]
    fn decode_reads_korean_text() {
        assert_eq!(decode(&euc_kr("삼성전자")), "삼성전자");
    }

    #[test]
    fn decode_replaces_malformed_bytes() {
        let text = decode(&[0x41, 0xff, 0x42]);
        assert!(text.starts_with('A'));
        assert!(text.contains('\u{fffd}'));
    }

    #[test]
    fn decode_ignores_a_leading_bom() {
        let mut raw = vec![0xEF, 0xBB, 0xBF];
        raw.extend(euc_kr("<html>삼성전자"));

        let text = decode(&raw);

        assert!(text.ends_with("<html>삼성전자"), "decoded as {text:?}");
        assert!(!text.starts_with('\u{feff}'));
    }

    #[tokio::test]
    async fn crawl_sends_browser_user_agent() {
        let http = FixtureHttpClient::responding(HttpResponse::ok(Vec::new()));
        let crawler = Crawler::new(Arc::new(http.clone()), CrawlerConfig::default());

        let snapshot = crawler.crawl().await.expect("empty page is not an error");

        assert!(snapshot.is_empty());
        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, crate::config::DEFAULT_SOURCE_URL);
        assert_eq!(
            requests[0].headers.get("user-agent").map(String::as_str),
            Some("Mozilla/5.0")
        );
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let http = FixtureHttpClient::responding(HttpResponse::new(503, b"busy".to_vec()));
        let crawler = Crawler::new(Arc::new(http), CrawlerConfig::default());

        let err = crawler.crawl().await.expect_err("503 must fail");
        assert_eq!(err, FetchError::Status { status: 503 });
        assert_eq!(err.to_string(), "HTTP 503");
    }

    #[tokio::test]
    async fn transport_failure_is_a_fetch_error() {
        let http = FixtureHttpClient::failing("connection refused");
        let err = fetch(&http, "https://example.test", &[], 1_000)
            .await
            .expect_err("transport must fail");
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn crawl_parses_encoded_page() {
        let html = r#"<table class="type_2"><tbody>
<tr><td>1</td><td><a href="/item/main.naver?code=005930">삼성전자</a></td><td>71,500</td>
<td>1</td><td><img src="/ico_down.gif">500</td><td>-0.69%</td><td>1</td></tr>
</tbody></table>"#;
        let http = FixtureHttpClient::responding(HttpResponse::ok(euc_kr(html)));
        let crawler = Crawler::new(Arc::new(http), CrawlerConfig::default());

        let snapshot = crawler.crawl().await.expect("crawl succeeds");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.rows()[0].company_name, "삼성전자");
        assert_eq!(snapshot.rows()[0].change, -500);
    }
}
