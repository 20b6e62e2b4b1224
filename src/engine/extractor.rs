// FILE: src/engine/extractor.rs
use std::sync::Arc;
use std::time::Duration;
use crate::config::IndexConfig;
use crate::engine::favicon::{favicon_url, IconFetcher};
use crate::storage::{extract_markers, Icon, Record};

/// Addresses derived from a logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUrls {
    pub canonical_url: String,
    pub http_url: String,
    /// `https://<first segment>`, or `https://` when the path has no separator.
    pub domain: String,
}

impl RecordUrls {
    pub fn derive(scheme: &str, logical_path: &str) -> Self {
        let path = normalize_logical_path(logical_path);
        let host = match path.split_once('/') {
            Some((first, _)) => first,
            None => "",
        };
        Self {
            canonical_url: format!("{}://{}", scheme, path),
            http_url: format!("https://{}", path),
            domain: format!("https://{}", host),
        }
    }

    pub fn has_host(&self) -> bool {
        self.domain.len() > "https://".len()
    }
}

/// Strip one leading separator and any trailing ones.
pub fn normalize_logical_path(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    path.strip_prefix('/').unwrap_or(path)
}

/// Turns (logical path, contents) into at most one Record.
pub struct Extractor {
    fetcher: Arc<dyn IconFetcher>,
    scheme: String,
    default_icon: String,
    icon_timeout: Duration,
}

impl Extractor {
    pub fn new(config: &IndexConfig, fetcher: Arc<dyn IconFetcher>) -> Self {
        Self {
            fetcher,
            scheme: config.scheme.clone(),
            default_icon: config.default_icon.clone(),
            icon_timeout: config.icon_timeout(),
        }
    }

    /// None when either marker is missing or blank. Never fails otherwise:
    /// icon problems fall back to the default icon.
    pub async fn extract(&self, logical_path: &str, contents: &str) -> Option<Record> {
        let Some(markers) = extract_markers(contents) else {
            tracing::debug!("[Extractor] No markers in {}, skipping", logical_path);
            return None;
        };

        let urls = RecordUrls::derive(&self.scheme, logical_path);
        let icon = self.fetch_icon(&urls).await;

        Some(Record {
            title: markers.title,
            description: markers.description,
            canonical_url: urls.canonical_url,
            http_url: urls.http_url,
            icon,
        })
    }

    async fn fetch_icon(&self, urls: &RecordUrls) -> Icon {
        let target = favicon_url(&urls.domain);
        if !urls.has_host() {
            tracing::debug!("[Extractor] No domain segment for {}, using default icon", urls.canonical_url);
            return self.default_icon();
        }

        match tokio::time::timeout(self.icon_timeout, self.fetcher.fetch(&target)).await {
            Ok(Ok(data)) => Icon::Fetched { data },
            Ok(Err(e)) => {
                tracing::debug!("[Extractor] Icon fetch failed for {}: {}", target, e);
                self.default_icon()
            }
            Err(_) => {
                tracing::debug!("[Extractor] Icon fetch timed out for {}", target);
                self.default_icon()
            }
        }
    }

    fn default_icon(&self) -> Icon {
        Icon::Default { reference: self.default_icon.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::favicon::OfflineIconFetcher;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const CATS: &str = r#"<meta property="hnet:title" content="Cats" />
<meta property="hnet:description" content="About cats" />"#;

    /// Serves fixed bytes and remembers what it was asked for.
    struct StaticFetcher {
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl IconFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(vec![1, 2, 3])
        }
    }

    struct SlowFetcher;

    #[async_trait]
    impl IconFetcher for SlowFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![9])
        }
    }

    fn extractor(fetcher: Arc<dyn IconFetcher>) -> Extractor {
        let config = IndexConfig { icon_timeout_ms: 50, ..IndexConfig::default() };
        Extractor::new(&config, fetcher)
    }

    #[test]
    fn test_urls_from_logical_path() {
        let urls = RecordUrls::derive("hnet", "/example.net/docs/page.html/");
        assert_eq!(urls.canonical_url, "hnet://example.net/docs/page.html");
        assert_eq!(urls.http_url, "https://example.net/docs/page.html");
        assert_eq!(urls.domain, "https://example.net");
        assert!(urls.has_host());
    }

    #[test]
    fn test_path_without_separator_has_empty_domain() {
        let urls = RecordUrls::derive("hnet", "page.html");
        assert_eq!(urls.canonical_url, "hnet://page.html");
        assert_eq!(urls.domain, "https://");
        assert!(!urls.has_host());
    }

    #[tokio::test]
    async fn test_fetched_icon_used_on_success() {
        let fetcher = Arc::new(StaticFetcher { requested: Mutex::new(Vec::new()) });
        let record = extractor(fetcher.clone()).extract("a/page.html", CATS).await.unwrap();

        assert_eq!(record.title, "Cats");
        assert_eq!(record.description, "About cats");
        assert_eq!(record.canonical_url, "hnet://a/page.html");
        assert_eq!(record.http_url, "https://a/page.html");
        assert_eq!(record.icon, Icon::Fetched { data: vec![1, 2, 3] });
        assert_eq!(*fetcher.requested.lock().unwrap(), vec!["https://a/favicon.ico".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_icon_falls_back_to_default() {
        let record = extractor(Arc::new(OfflineIconFetcher)).extract("a/page.html", CATS).await.unwrap();
        assert_eq!(record.icon, Icon::Default { reference: "/default-favicon.png".to_string() });
    }

    #[tokio::test]
    async fn test_slow_icon_is_bounded() {
        let started = std::time::Instant::now();
        let record = extractor(Arc::new(SlowFetcher)).extract("a/page.html", CATS).await.unwrap();
        assert!(record.icon.is_default());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_no_domain_still_builds_record() {
        let fetcher = Arc::new(StaticFetcher { requested: Mutex::new(Vec::new()) });
        let record = extractor(fetcher.clone()).extract("page.html", CATS).await.unwrap();
        assert_eq!(record.canonical_url, "hnet://page.html");
        assert!(record.icon.is_default());
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_canonical_url_is_deterministic() {
        let ex = extractor(Arc::new(OfflineIconFetcher));
        let first = ex.extract("a/b/page.html", CATS).await.unwrap();
        let second = ex.extract("a/b/page.html", CATS).await.unwrap();
        assert_eq!(first.canonical_url, second.canonical_url);
    }

    #[tokio::test]
    async fn test_missing_markers_yield_none() {
        let ex = extractor(Arc::new(OfflineIconFetcher));
        let no_description = r#"<meta property="hnet:title" content="Cats" />"#;
        assert!(ex.extract("b/page.html", no_description).await.is_none());
        assert!(ex.extract("b/page.html", "<html></html>").await.is_none());
    }
}
