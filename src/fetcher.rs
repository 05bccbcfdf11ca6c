use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::config::ScraperConfig;
use crate::error::{Error, Result};

/// Fetches the raw HTML of pages that render without JavaScript.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String>;
}

/// Spaces out dispatches so consecutive requests start at least `delay` apart.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits for this caller's dispatch slot.
    pub async fn wait(&self) {
        let (slot, now) = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.delay);
            (slot, now)
        };
        if slot > now {
            sleep_until(slot).await;
        }
    }
}

/// reqwest-backed fetcher with a fixed user agent, a concurrency ceiling and a
/// minimum delay between requests. Clones share the same limits.
#[derive(Clone)]
pub struct StaticFetcher {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    pacer: Arc<Pacer>,
}

impl StaticFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            pacer: Arc::new(Pacer::new(Duration::from_millis(config.request_delay_ms))),
        })
    }
}

#[async_trait::async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::Navigation(format!("fetcher closed: {}", e)))?;
        self.pacer.wait().await;

        debug!(url = %url, "Fetching page");

        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_pacer_spaces_dispatches() {
        let pacer = Pacer::new(Duration::from_millis(500));
        let start = Instant::now();

        pacer.wait().await;
        let first = start.elapsed();
        pacer.wait().await;
        let second = start.elapsed();
        pacer.wait().await;
        let third = start.elapsed();

        assert_eq!(first, Duration::ZERO);
        assert!(second >= Duration::from_millis(500));
        assert!(third >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_does_not_delay_after_idle() {
        let pacer = Pacer::new(Duration::from_millis(200));
        pacer.wait().await;

        tokio::time::sleep(Duration::from_secs(1)).await;

        let before = Instant::now();
        pacer.wait().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_concurrent_callers_get_distinct_slots() {
        let pacer = Arc::new(Pacer::new(Duration::from_millis(100)));
        let start = Instant::now();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..4 {
            let pacer = Arc::clone(&pacer);
            tasks.spawn(async move {
                pacer.wait().await;
                start.elapsed()
            });
        }

        let mut elapsed = Vec::new();
        while let Some(result) = tasks.join_next().await {
            elapsed.push(result.unwrap());
        }
        elapsed.sort();

        assert!(elapsed[3] >= Duration::from_millis(300));
    }

    /// Serves `/down` as 503 and anything else as a 200 after `delay`,
    /// recording the peak number of requests handled at once.
    async fn serve(delay: Duration) -> (Url, Arc<std::sync::atomic::AtomicUsize>) {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let inflight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let peak_out = Arc::clone(&peak);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let inflight = Arc::clone(&inflight);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }

                    let now = inflight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);

                    let head = String::from_utf8_lossy(&request).to_string();
                    let response = if head.starts_with("GET /down ") {
                        "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    } else {
                        tokio::time::sleep(delay).await;
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<html></html>"
                    };

                    inflight.fetch_sub(1, Ordering::SeqCst);
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (base, peak_out)
    }

    fn local_config(max_concurrency: usize) -> ScraperConfig {
        ScraperConfig {
            max_concurrency,
            request_delay_ms: 0,
            request_timeout_secs: 5,
            ..ScraperConfig::default()
        }
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let (base, _) = serve(Duration::ZERO).await;
        let fetcher = StaticFetcher::new(&local_config(2)).unwrap();

        let down = base.join("down").unwrap();
        match fetcher.fetch(&down).await {
            Err(Error::Fetch { url, status }) => {
                assert_eq!(status, 503);
                assert_eq!(url, down.to_string());
            }
            other => panic!("expected a 503 fetch error, got {:?}", other),
        }

        let body = fetcher.fetch(&base.join("ok").unwrap()).await.unwrap();
        assert_eq!(body, "<html></html>");
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_is_shared_by_clones() {
        let (base, peak) = serve(Duration::from_millis(100)).await;
        let fetcher = StaticFetcher::new(&local_config(2)).unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..6 {
            let fetcher = fetcher.clone();
            let url = base.join(&format!("slow/{}", i)).unwrap();
            tasks.spawn(async move { fetcher.fetch(&url).await });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().is_ok());
        }

        let peak = peak.load(std::sync::atomic::Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(peak <= 2, "peak in-flight requests was {}", peak);
    }

    #[test]
    fn test_fetcher_builds_from_config() {
        let config = ScraperConfig::default();
        assert!(StaticFetcher::new(&config).is_ok());
    }
}
