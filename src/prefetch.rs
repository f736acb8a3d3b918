use futures_util::StreamExt;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Messages sent from fetch tasks back to the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchEvent {
    /// The image was fetched completely
    Fetched { url: String, bytes: usize },

    /// The fetch failed; nothing is retried automatically
    Failed { url: String, reason: String },
}

impl PrefetchEvent {
    pub fn url(&self) -> &str {
        match self {
            PrefetchEvent::Fetched { url, .. } | PrefetchEvent::Failed { url, .. } => url,
        }
    }
}

/// Fire-and-forget image fetcher.
///
/// Each URL is fetched on its own tokio task. Completed URLs are remembered so
/// that showing an image again can be answered without another fetch.
pub struct Prefetcher {
    client: reqwest::Client,
    tx: UnboundedSender<PrefetchEvent>,
    rx: UnboundedReceiver<PrefetchEvent>,
    fetched: HashMap<String, usize>,
    in_flight: HashSet<String>,
}

impl Prefetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            client,
            tx,
            rx,
            fetched: HashMap::new(),
            in_flight: HashSet::new(),
        })
    }

    /// Start fetching every URL not already fetched or in flight.
    /// Must be called from within a tokio runtime.
    pub fn prefetch(&mut self, urls: &[String]) {
        for url in urls {
            if self.fetched.contains_key(url) || !self.in_flight.insert(url.clone()) {
                continue;
            }
            let client = self.client.clone();
            let tx = self.tx.clone();
            let url = url.clone();
            tokio::spawn(async move {
                let event = match fetch(&client, &url).await {
                    Ok(bytes) => PrefetchEvent::Fetched { url, bytes },
                    Err(reason) => PrefetchEvent::Failed { url, reason },
                };
                // The receiver only goes away on shutdown.
                let _ = tx.send(event);
            });
        }
    }

    /// Collect finished fetches without blocking.
    pub fn drain(&mut self) -> Vec<PrefetchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            self.record(&event);
            events.push(event);
        }
        events
    }

    /// Wait for the next finished fetch.
    pub async fn recv(&mut self) -> Option<PrefetchEvent> {
        let event = self.rx.recv().await?;
        self.record(&event);
        Some(event)
    }

    pub fn is_fetched(&self, url: &str) -> bool {
        self.fetched.contains_key(url)
    }

    pub fn is_in_flight(&self, url: &str) -> bool {
        self.in_flight.contains(url)
    }

    pub fn size_of(&self, url: &str) -> Option<usize> {
        self.fetched.get(url).copied()
    }

    fn record(&mut self, event: &PrefetchEvent) {
        self.in_flight.remove(event.url());
        match event {
            PrefetchEvent::Fetched { url, bytes } => {
                tracing::debug!(url = %url, bytes, "image fetched");
                self.fetched.insert(url.clone(), *bytes);
            }
            PrefetchEvent::Failed { url, reason } => {
                tracing::debug!(url = %url, reason = %reason, "image fetch failed");
            }
        }
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<usize, String> {
    if !is_remote(url) {
        let path = url.strip_prefix("file://").unwrap_or(url);
        return tokio::fs::read(Path::new(path))
            .await
            .map(|data| data.len())
            .map_err(|e| e.to_string());
    }

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| e.to_string())?;

    let mut total = 0usize;
    let mut stream = response.bytes_stream();
    while let Some(item) = stream.next().await {
        let chunk = item.map_err(|e| e.to_string())?;
        total += chunk.len();
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn prefetcher() -> Prefetcher {
        Prefetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://cdn.example/a.png"));
        assert!(is_remote("http://cdn.example/a.png"));
        assert!(!is_remote("/tmp/a.png"));
        assert!(!is_remote("file:///tmp/a.png"));
    }

    #[tokio::test]
    async fn test_local_file_is_fetched() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 42]).unwrap();
        let url = file.path().to_string_lossy().to_string();

        let mut p = prefetcher();
        p.prefetch(std::slice::from_ref(&url));
        assert!(p.is_in_flight(&url));

        let event = p.recv().await.unwrap();
        assert_eq!(event, PrefetchEvent::Fetched { url: url.clone(), bytes: 42 });
        assert!(p.is_fetched(&url));
        assert!(!p.is_in_flight(&url));
        assert_eq!(p.size_of(&url), Some(42));
    }

    #[tokio::test]
    async fn test_file_scheme_is_stripped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        let url = format!("file://{}", file.path().display());

        let mut p = prefetcher();
        p.prefetch(std::slice::from_ref(&url));
        let event = p.recv().await.unwrap();
        assert!(matches!(event, PrefetchEvent::Fetched { bytes: 3, .. }));
    }

    #[tokio::test]
    async fn test_missing_file_fails_without_caching() {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("missing.png").to_string_lossy().to_string();

        let mut p = prefetcher();
        p.prefetch(std::slice::from_ref(&url));
        let event = p.recv().await.unwrap();
        assert!(matches!(event, PrefetchEvent::Failed { .. }));
        assert!(!p.is_fetched(&url));
        assert!(!p.is_in_flight(&url));
    }

    #[tokio::test]
    async fn test_duplicate_urls_fetch_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"x").unwrap();
        let url = file.path().to_string_lossy().to_string();

        let mut p = prefetcher();
        p.prefetch(&[url.clone(), url.clone()]);
        p.recv().await.unwrap();
        p.prefetch(std::slice::from_ref(&url));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(p.drain().is_empty());
    }
}
