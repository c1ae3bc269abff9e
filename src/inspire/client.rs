//! Typed InspireHEP endpoints routed through the cache coordinator.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::fetcher::{ApiFetcher, ApiRequest, HttpFetcher};
use crate::cache::CacheCoordinator;
use crate::config::Config;
use crate::error::{FetchError, InspireError, Result};

/// Largest page the API serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Largest citation listing or batch export requested in one call.
pub const MAX_BATCH_SIZE: u32 = 250;

/// Fields requested by literature searches unless told otherwise.
pub const LITERATURE_FIELDS: &[&str] = &[
    "titles",
    "authors.full_name",
    "authors.affiliations",
    "abstracts",
    "arxiv_eprints",
    "dois",
    "publication_info",
    "collaborations",
    "citation_count",
    "earliest_date",
    "legacy_creation_date",
];

/// Literature search ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    BestMatch,
    MostRecent,
    MostCited,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::BestMatch => "bestmatch",
            SortOrder::MostRecent => "mostrecent",
            SortOrder::MostCited => "mostcited",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bestmatch" => Ok(SortOrder::BestMatch),
            "mostrecent" => Ok(SortOrder::MostRecent),
            "mostcited" => Ok(SortOrder::MostCited),
            other => Err(format!(
                "invalid sort '{}', expected one of: bestmatch, mostrecent, mostcited",
                other
            )),
        }
    }
}

/// Which side of the citation graph to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Papers that cite the record.
    #[default]
    Citing,
    /// Papers the record cites.
    CitedBy,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Citing => "citing",
            Direction::CitedBy => "cited_by",
        }
    }

    fn query(&self, id: &str) -> String {
        match self {
            Direction::Citing => format!("refersto:{}", id),
            Direction::CitedBy => format!("citedby:recid:{}", id),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "citing" => Ok(Direction::Citing),
            "cited_by" | "cited-by" => Ok(Direction::CitedBy),
            other => Err(format!(
                "invalid direction '{}', expected one of: citing, cited_by",
                other
            )),
        }
    }
}

/// Citation export formats served as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Bibtex,
    LatexEu,
    LatexUs,
}

impl TextFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextFormat::Bibtex => "bibtex",
            TextFormat::LatexEu => "latex-eu",
            TextFormat::LatexUs => "latex-us",
        }
    }
}

impl fmt::Display for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bibtex" => Ok(TextFormat::Bibtex),
            "latex-eu" => Ok(TextFormat::LatexEu),
            "latex-us" => Ok(TextFormat::LatexUs),
            other => Err(format!(
                "invalid format '{}', expected one of: bibtex, latex-eu, latex-us",
                other
            )),
        }
    }
}

/// Cache and limiter health, as reported by the `stats` command.
///
/// `entries` reflects the store. Every counter covers this process only,
/// starting at `since`.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    pub backend: &'static str,
    pub persistent: bool,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: usize,
    pub max_size: usize,
    pub evictions: u64,
    pub expirations: u64,
    pub joins: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub store_errors: u64,
    pub in_flight: usize,
    pub requests_per_second: f64,
    pub throttled_requests: u64,
    pub throttle_wait_total_ms: u64,
    pub avg_throttle_wait_ms: u64,
    pub cache_ttl_secs: u64,
    pub since: DateTime<Utc>,
}

/// InspireHEP API client. Every call goes through the shared coordinator.
pub struct InspireClient {
    coordinator: Arc<CacheCoordinator>,
    fetcher: Arc<dyn ApiFetcher>,
    ttl: Duration,
}

impl InspireClient {
    pub fn new(
        coordinator: Arc<CacheCoordinator>,
        fetcher: Arc<dyn ApiFetcher>,
        ttl: Duration,
    ) -> Self {
        Self {
            coordinator,
            fetcher,
            ttl,
        }
    }

    /// Wire the coordinator and an HTTP fetcher from validated config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let coordinator = Arc::new(CacheCoordinator::from_config(config)?);
        let fetcher = Arc::new(HttpFetcher::new(&config.api)?);
        Ok(Self::new(coordinator, fetcher, config.cache.ttl()))
    }

    pub fn coordinator(&self) -> &Arc<CacheCoordinator> {
        &self.coordinator
    }

    /// Raw body for `request`, cached under its fingerprint.
    pub async fn get_text(&self, request: ApiRequest) -> Result<String> {
        let fingerprint = request.fingerprint();
        let fetcher = Arc::clone(&self.fetcher);
        self.coordinator
            .resolve(&fingerprint, self.ttl, move || async move {
                fetcher.fetch(&request).await
            })
            .await
    }

    /// Parsed JSON for `request`. Bodies that are not valid JSON fail the
    /// fetch and are never cached.
    pub async fn get_json(&self, request: ApiRequest) -> Result<Value> {
        let fingerprint = request.fingerprint();
        let fetcher = Arc::clone(&self.fetcher);
        let body = self
            .coordinator
            .resolve(&fingerprint, self.ttl, move || async move {
                let body = fetcher.fetch(&request).await?;
                serde_json::from_str::<serde::de::IgnoredAny>(&body)
                    .map_err(|e| FetchError::Decode(e.to_string()))?;
                Ok::<_, FetchError>(body)
            })
            .await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()).into())
    }

    /// Literature search. `fields` defaults to [`LITERATURE_FIELDS`].
    pub async fn search_literature(
        &self,
        query: &str,
        sort: SortOrder,
        size: u32,
        page: u32,
        fields: Option<&str>,
    ) -> Result<Value> {
        let query = non_empty("query", query)?;
        self.literature_query(query, sort, size.clamp(1, MAX_PAGE_SIZE), page, fields)
            .await
    }

    /// Papers citing `id`, or cited by it, most recent first.
    pub async fn citations(&self, id: &str, direction: Direction, size: u32) -> Result<Value> {
        let id = record_id(id)?;
        self.literature_query(
            &direction.query(id),
            SortOrder::MostRecent,
            size.clamp(1, MAX_BATCH_SIZE),
            1,
            None,
        )
        .await
    }

    async fn literature_query(
        &self,
        query: &str,
        sort: SortOrder,
        size: u32,
        page: u32,
        fields: Option<&str>,
    ) -> Result<Value> {
        let fields = match fields.map(str::trim).filter(|f| !f.is_empty()) {
            Some(fields) => fields.to_string(),
            None => LITERATURE_FIELDS.join(","),
        };
        let request = ApiRequest::json("/literature")
            .param("q", query)
            .param("sort", sort)
            .param("size", size)
            .param("page", page.max(1))
            .param("fields", fields);
        self.get_json(request).await
    }

    /// Record by numeric InspireHEP id, optionally restricted to `fields`.
    pub async fn literature_record(&self, id: &str, fields: Option<&str>) -> Result<Value> {
        let id = record_id(id)?;
        let request = ApiRequest::json(format!("/literature/{}", id)).param_opt("fields", fields);
        self.get_json(request).await
    }

    pub async fn literature_by_arxiv(&self, arxiv_id: &str, fields: Option<&str>) -> Result<Value> {
        let arxiv_id = strip_prefix_ci(non_empty("arXiv id", arxiv_id)?, "arxiv:");
        let request = ApiRequest::json(format!("/arxiv/{}", arxiv_id)).param_opt("fields", fields);
        self.get_json(request).await
    }

    pub async fn literature_by_doi(&self, doi: &str, fields: Option<&str>) -> Result<Value> {
        let doi = non_empty("DOI", doi)?;
        let doi = ["https://doi.org/", "http://doi.org/", "doi:"]
            .iter()
            .fold(doi, |doi, prefix| strip_prefix_ci(doi, prefix));
        let request = ApiRequest::json(format!("/doi/{}", doi)).param_opt("fields", fields);
        self.get_json(request).await
    }

    pub async fn search_authors(&self, query: &str, size: u32) -> Result<Value> {
        let query = non_empty("query", query)?;
        let request = ApiRequest::json("/authors")
            .param("q", query)
            .param("size", size.clamp(1, MAX_PAGE_SIZE));
        self.get_json(request).await
    }

    /// Citation export for one record.
    pub async fn literature_text(&self, id: &str, format: TextFormat) -> Result<String> {
        let id = record_id(id)?;
        self.export_text(&format!("recid:{}", id), format, None)
            .await
    }

    /// Citation export for several records in one request, e.g. the
    /// references of a paper. Only the first [`MAX_BATCH_SIZE`] ids are sent.
    pub async fn references_text(&self, ids: &[&str], format: TextFormat) -> Result<String> {
        let ids = ids
            .iter()
            .take(MAX_BATCH_SIZE as usize)
            .copied()
            .map(record_id)
            .collect::<Result<Vec<_>>>()?;
        if ids.is_empty() {
            return Err(InspireError::InvalidArgument(
                "at least one record id is required".into(),
            ));
        }
        let query = ids
            .iter()
            .map(|id| format!("recid:{}", id))
            .collect::<Vec<_>>()
            .join(" or ");
        self.export_text(&query, format, Some(ids.len() as u32))
            .await
    }

    /// Citation export for every record matching `query`.
    pub async fn export_text(
        &self,
        query: &str,
        format: TextFormat,
        size: Option<u32>,
    ) -> Result<String> {
        let query = non_empty("query", query)?;
        let request = ApiRequest::text("/literature")
            .param("q", query)
            .param_opt("size", size.map(|s| s.clamp(1, MAX_BATCH_SIZE)))
            .param("format", format);
        self.get_text(request).await
    }

    pub fn server_stats(&self) -> ServerStats {
        let snap = self.coordinator.stats();
        let store = self.coordinator.store();
        let limiter = self.coordinator.limiter().status();
        ServerStats {
            backend: store.backend(),
            persistent: store.backend() == "sqlite",
            hits: snap.hits,
            misses: snap.misses,
            hit_rate: snap.hit_rate(),
            entries: snap.entries_count,
            max_size: store.max_size(),
            evictions: snap.evictions,
            expirations: snap.expirations,
            joins: snap.joins,
            fetches: snap.fetches,
            fetch_failures: snap.fetch_failures,
            store_errors: snap.store_errors,
            in_flight: self.coordinator.in_flight(),
            requests_per_second: limiter.requests_per_second,
            throttled_requests: snap.throttled,
            throttle_wait_total_ms: snap.throttle_wait_total.as_millis() as u64,
            avg_throttle_wait_ms: snap.avg_throttle_wait().as_millis() as u64,
            cache_ttl_secs: self.ttl.as_secs(),
            since: snap.since,
        }
    }
}

fn non_empty<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(InspireError::InvalidArgument(format!("{} must not be empty", what)))
    } else {
        Ok(value)
    }
}

fn record_id(id: &str) -> Result<&str> {
    let id = non_empty("record id", id)?;
    if id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(id)
    } else {
        Err(InspireError::InvalidArgument(format!(
            "record id must be numeric, got '{}'",
            id
        )))
    }
}

fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> &'a str {
    match value.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &value[prefix.len()..],
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, StatsRegistry, SystemClock};
    use crate::inspire::fetcher::MockFetcher;
    use crate::rate_limit::RateLimiter;

    const RECORD: &str = r#"{"id":"451647","metadata":{"titles":[{"title":"The Large N limit"}]}}"#;

    fn client(fetcher: Arc<MockFetcher>, ttl: Duration) -> InspireClient {
        let stats = Arc::new(StatsRegistry::new());
        let store = Arc::new(MemoryStore::new(32, Arc::new(SystemClock), Arc::clone(&stats)));
        let limiter = Arc::new(RateLimiter::new(50.0, 1).unwrap());
        let coordinator = Arc::new(CacheCoordinator::new(
            store,
            limiter,
            stats,
            Duration::from_secs(30),
        ));
        InspireClient::new(coordinator, fetcher, ttl)
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_builds_request() {
        let fetcher = Arc::new(MockFetcher::success(r#"{"hits":{"total":0,"hits":[]}}"#));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));

        let value = client
            .search_literature("  t higgs  ", SortOrder::MostCited, 500, 0, None)
            .await
            .unwrap();
        assert_eq!(value["hits"]["total"], 0);

        let request = fetcher.last_request().unwrap();
        assert_eq!(request.path, "/literature");
        assert_eq!(request.params["q"], "t higgs");
        assert_eq!(request.params["sort"], "mostcited");
        assert_eq!(request.params["size"], "100");
        assert_eq!(request.params["page"], "1");
        assert!(request.params["fields"].starts_with("titles,authors.full_name"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_lookup_served_from_cache() {
        let fetcher = Arc::new(MockFetcher::success(RECORD));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));

        let first = client.literature_record("451647", None).await.unwrap();
        let second = client.literature_record(" 451647 ", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);

        let stats = client.server_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.max_size, 32);
        assert_eq!(stats.backend, "memory");
        assert!(!stats.persistent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_lookups_fetch_once() {
        let fetcher = Arc::new(MockFetcher::success(RECORD).with_delay(Duration::from_millis(200)));
        let client = Arc::new(client(Arc::clone(&fetcher), Duration::from_secs(60)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.literature_by_arxiv("arXiv:hep-th/9711200", None).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(fetcher.last_request().unwrap().path, "/arxiv/hep-th/9711200");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_json_is_not_cached() {
        let fetcher = Arc::new(MockFetcher::success("<html>maintenance</html>"));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));

        let err = client.search_authors("witten", 10).await.unwrap_err();
        assert!(matches!(err, InspireError::Fetch(FetchError::Decode(_))));
        assert!(client.search_authors("witten", 10).await.is_err());
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(client.server_stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_propagates() {
        let fetcher = Arc::new(MockFetcher::failure(FetchError::NotFound(
            "/doi/10.1000/none".into(),
        )));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));
        let err = client.literature_by_doi("https://doi.org/10.1000/none", None).await.unwrap_err();
        assert!(matches!(err, InspireError::Fetch(FetchError::NotFound(_))));
        assert_eq!(fetcher.last_request().unwrap().path, "/doi/10.1000/none");
        assert_eq!(client.server_stats().fetch_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_literature_text_request() {
        let fetcher = Arc::new(MockFetcher::success("@article{Maldacena:1997re,\n}"));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));

        let text = client
            .literature_text("451647", TextFormat::LatexEu)
            .await
            .unwrap();
        assert!(text.starts_with("@article"));

        let request = fetcher.last_request().unwrap();
        assert_eq!(request.accept, crate::inspire::Accept::Text);
        assert_eq!(request.params["q"], "recid:451647");
        assert_eq!(request.params["format"], "latex-eu");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_always_fetches() {
        let fetcher = Arc::new(MockFetcher::success(RECORD));
        let client = client(Arc::clone(&fetcher), Duration::ZERO);
        client.literature_record("1", None).await.unwrap();
        client.literature_record("1", None).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(client.server_stats().cache_ttl_secs, 0);
    }

    #[tokio::test]
    async fn test_argument_validation() {
        let fetcher = Arc::new(MockFetcher::success(RECORD));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));

        for result in [
            client.literature_record("abc", None).await,
            client.literature_record("   ", None).await,
            client.search_literature("", SortOrder::BestMatch, 10, 1, None).await,
            client.literature_by_doi(" ", None).await,
            client.citations("recid:1", Direction::Citing, 10).await,
        ] {
            assert!(matches!(result, Err(InspireError::InvalidArgument(_))));
        }
        for result in [
            client.references_text(&[], TextFormat::Bibtex).await,
            client.references_text(&["1", "x"], TextFormat::Bibtex).await,
            client.export_text("  ", TextFormat::Bibtex, None).await,
        ] {
            assert!(matches!(result, Err(InspireError::InvalidArgument(_))));
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fields_selection() {
        let fetcher = Arc::new(MockFetcher::success(RECORD));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));

        client.literature_record("451647", None).await.unwrap();
        assert!(!fetcher.last_request().unwrap().params.contains_key("fields"));

        client
            .literature_record("451647", Some("references,titles"))
            .await
            .unwrap();
        let request = fetcher.last_request().unwrap();
        assert_eq!(request.path, "/literature/451647");
        assert_eq!(request.params["fields"], "references,titles");
        // A different field selection is a different cache entry.
        assert_eq!(fetcher.calls(), 2);

        client.literature_by_arxiv("1207.7214", Some("titles")).await.unwrap();
        assert_eq!(fetcher.last_request().unwrap().params["fields"], "titles");
        client.literature_by_doi("doi:10.1/x", Some("dois")).await.unwrap();
        let request = fetcher.last_request().unwrap();
        assert_eq!(request.path, "/doi/10.1/x");
        assert_eq!(request.params["fields"], "dois");

        client
            .search_literature("a witten", SortOrder::BestMatch, 5, 1, Some("titles,citation_count"))
            .await
            .unwrap();
        assert_eq!(
            fetcher.last_request().unwrap().params["fields"],
            "titles,citation_count"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_citation_queries() {
        let fetcher = Arc::new(MockFetcher::success(r#"{"hits":{"total":0,"hits":[]}}"#));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));

        client.citations("451647", Direction::Citing, 1000).await.unwrap();
        let request = fetcher.last_request().unwrap();
        assert_eq!(request.path, "/literature");
        assert_eq!(request.params["q"], "refersto:451647");
        assert_eq!(request.params["sort"], "mostrecent");
        assert_eq!(request.params["size"], "250");
        assert!(request.params["fields"].starts_with("titles,"));

        client.citations("451647", Direction::CitedBy, 0).await.unwrap();
        let request = fetcher.last_request().unwrap();
        assert_eq!(request.params["q"], "citedby:recid:451647");
        assert_eq!(request.params["size"], "1");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_reference_export() {
        let fetcher = Arc::new(MockFetcher::success("@article{a,\n}\n@article{b,\n}"));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));

        client
            .references_text(&["12", " 34 ", "56"], TextFormat::Bibtex)
            .await
            .unwrap();
        let request = fetcher.last_request().unwrap();
        assert_eq!(request.accept, crate::inspire::Accept::Text);
        assert_eq!(request.params["q"], "recid:12 or recid:34 or recid:56");
        assert_eq!(request.params["size"], "3");
        assert_eq!(request.params["format"], "bibtex");

        let many: Vec<String> = (1..=300).map(|i| i.to_string()).collect();
        let many: Vec<&str> = many.iter().map(String::as_str).collect();
        client.references_text(&many, TextFormat::LatexUs).await.unwrap();
        let request = fetcher.last_request().unwrap();
        assert_eq!(request.params["size"], "250");
        assert!(request.params["q"].ends_with("or recid:250"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_record_export_sends_no_size() {
        let fetcher = Arc::new(MockFetcher::success("@article{a,\n}"));
        let client = client(Arc::clone(&fetcher), Duration::from_secs(60));
        client.literature_text("12", TextFormat::Bibtex).await.unwrap();
        assert!(!fetcher.last_request().unwrap().params.contains_key("size"));
    }

    #[test]
    fn test_sort_and_format_parsing() {
        assert_eq!("MostCited".parse::<SortOrder>().unwrap(), SortOrder::MostCited);
        assert_eq!(SortOrder::default().as_str(), "bestmatch");
        assert!("newest".parse::<SortOrder>().is_err());
        assert_eq!("latex-us".parse::<TextFormat>().unwrap(), TextFormat::LatexUs);
        assert!("ris".parse::<TextFormat>().is_err());
        assert_eq!("cited_by".parse::<Direction>().unwrap(), Direction::CitedBy);
        assert_eq!(Direction::default().to_string(), "citing");
        assert!("cites".parse::<Direction>().is_err());
    }

    #[test]
    fn test_strip_prefix_ci() {
        assert_eq!(strip_prefix_ci("arXiv:1207.7214", "arxiv:"), "1207.7214");
        assert_eq!(strip_prefix_ci("1207.7214", "arxiv:"), "1207.7214");
        assert_eq!(strip_prefix_ci("DOI:10.1/x", "doi:"), "10.1/x");
        assert_eq!(strip_prefix_ci("é", "doi:"), "é");
    }
}
