//! Stream liveness verification
//!
//! A probe is a single HEAD request with a bounded timeout. Any failure
//! counts as unreachable. Results, negative ones included, are cached per
//! url for `verification.ttl_seconds`, so a url is probed at most once per
//! TTL window no matter how many lookups ask for it.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::header::{REFERER, USER_AGENT};
use reqwest::Client;

use crate::cache::{CacheManager, CacheStore, KeyBuilder};
use crate::config::VerificationConfig;
use crate::models::{Stream, StreamDescriptor, VerificationEntry};
use crate::resilience::{bounded, TimeoutConfig, PROBE_TIMEOUT};
use crate::{Error, Result};

/// Outbound proxy family, chosen by url scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Socks,
    Http,
}

impl ProxyKind {
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::InvalidInput(format!("invalid proxy url '{url}': {e}")))?;

        match parsed.scheme() {
            "socks4" | "socks4a" | "socks5" | "socks5h" => Ok(Self::Socks),
            "http" | "https" => Ok(Self::Http),
            other => Err(Error::InvalidInput(format!(
                "unsupported proxy scheme '{other}'"
            ))),
        }
    }
}

/// Anything that can be probed: a url plus the headers it must be fetched with
pub trait ProbeTarget {
    fn url(&self) -> &str;
    fn user_agent(&self) -> Option<&str>;
    fn referrer(&self) -> Option<&str>;
}

impl ProbeTarget for Stream {
    fn url(&self) -> &str {
        &self.url
    }

    fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }
}

impl ProbeTarget for StreamDescriptor {
    fn url(&self) -> &str {
        &self.url
    }

    fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }
}

#[derive(Clone)]
pub struct StreamVerifier {
    client: Client,
    results: CacheStore<VerificationEntry>,
    keys: KeyBuilder,
    ttl: Duration,
    concurrency: usize,
    default_user_agent: String,
}

impl StreamVerifier {
    /// Each probe is bounded by `timeouts.probe`.
    pub fn new(
        config: &VerificationConfig,
        timeouts: TimeoutConfig,
        cache: &CacheManager,
    ) -> Result<Self> {
        let mut builder = Client::builder().timeout(bounded(timeouts.probe, PROBE_TIMEOUT));

        if let Some(proxy_url) = config.proxy_url.as_deref().filter(|u| !u.trim().is_empty()) {
            let kind = ProxyKind::from_url(proxy_url)?;
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| Error::Config(format!("Invalid proxy URL '{proxy_url}': {e}")))?;
            builder = builder.proxy(proxy);
            tracing::info!(proxy = ?kind, "Stream probes routed through proxy");
        }

        let client = builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build probe client: {e}")))?;

        Ok(Self {
            client,
            results: cache.verifications.clone(),
            keys: cache.keys.clone(),
            ttl: config.ttl(),
            concurrency: config.concurrency.max(1),
            default_user_agent: config.user_agent.clone(),
        })
    }

    /// Whether `url` answered its last probe with a success status.
    ///
    /// Served from cache while the previous result is fresh.
    pub async fn verify(&self, url: &str, user_agent: Option<&str>, referrer: Option<&str>) -> bool {
        let key = self.keys.verification(url);
        let probe = async {
            let reachable = self.probe(url, user_agent, referrer).await;
            Ok::<_, Error>(VerificationEntry::new(reachable, self.ttl))
        };

        match self.results.populate(&key, self.ttl, probe).await {
            Ok(entry) => entry.reachable,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Verification lookup failed");
                false
            }
        }
    }

    /// Previously stored result for `url`, without probing
    pub async fn cached(&self, url: &str) -> Option<VerificationEntry> {
        self.results.get(&self.keys.verification(url)).await
    }

    /// Keep the reachable targets, in their original order.
    ///
    /// At most `verification.concurrency` probes run at once.
    pub async fn retain_reachable<T>(&self, targets: Vec<T>) -> Vec<T>
    where
        T: ProbeTarget + Send + Sync,
    {
        stream::iter(targets)
            .map(|target| async move {
                let reachable = self
                    .verify(target.url(), target.user_agent(), target.referrer())
                    .await;
                (target, reachable)
            })
            .buffered(self.concurrency)
            .filter_map(|(target, reachable)| async move { reachable.then_some(target) })
            .collect()
            .await
    }

    async fn probe(&self, url: &str, user_agent: Option<&str>, referrer: Option<&str>) -> bool {
        let mut request = self
            .client
            .head(url)
            .header(USER_AGENT, user_agent.unwrap_or(&self.default_user_agent));
        if let Some(referrer) = referrer {
            request = request.header(REFERER, referrer);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(url = %url, status = response.status().as_u16(), "Stream reachable");
                true
            }
            Ok(response) => {
                tracing::debug!(url = %url, status = response.status().as_u16(), "Stream rejected probe");
                false
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, timeout = e.is_timeout(), "Stream probe failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for StreamVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamVerifier")
            .field("ttl", &self.ttl)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::DEFAULT_USER_AGENT;
    use crate::test_helpers::stream;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn verifier() -> StreamVerifier {
        let timeouts = TimeoutConfig::new().with_probe_timeout(Duration::from_secs(1));
        StreamVerifier::new(&VerificationConfig::default(), timeouts, &CacheManager::default())
            .unwrap()
    }

    #[test]
    fn test_proxy_kind_from_scheme() {
        assert_eq!(ProxyKind::from_url("socks5://127.0.0.1:1080").unwrap(), ProxyKind::Socks);
        assert_eq!(ProxyKind::from_url("socks5h://proxy:1080").unwrap(), ProxyKind::Socks);
        assert_eq!(ProxyKind::from_url("socks4://proxy:1080").unwrap(), ProxyKind::Socks);
        assert_eq!(ProxyKind::from_url("http://proxy:8080").unwrap(), ProxyKind::Http);
        assert_eq!(ProxyKind::from_url("https://proxy:8443").unwrap(), ProxyKind::Http);
        assert!(ProxyKind::from_url("ftp://proxy:21").is_err());
        assert!(ProxyKind::from_url("not a url").is_err());
    }

    #[test]
    fn test_verifier_accepts_socks_proxy() {
        let config = VerificationConfig {
            proxy_url: Some("socks5h://127.0.0.1:1080".to_string()),
            ..Default::default()
        };
        assert!(
            StreamVerifier::new(&config, TimeoutConfig::default(), &CacheManager::default()).is_ok()
        );
    }

    #[tokio::test]
    async fn test_verify_twice_probes_once() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/live.m3u8"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let verifier = verifier();
        let url = format!("{}/live.m3u8", server.uri());

        assert!(verifier.verify(&url, None, None).await);
        assert!(verifier.verify(&url, None, None).await);
        assert!(verifier.cached(&url).await.is_some_and(|e| e.reachable));
    }

    #[tokio::test]
    async fn test_negative_result_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/dead.m3u8"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let verifier = verifier();
        let url = format!("{}/dead.m3u8", server.uri());

        assert!(!verifier.verify(&url, None, None).await);
        assert!(!verifier.verify(&url, None, None).await);
    }

    #[tokio::test]
    async fn test_slow_stream_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/slow.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let url = format!("{}/slow.m3u8", server.uri());
        assert!(!verifier().verify(&url, None, None).await);
    }

    #[tokio::test]
    async fn test_probe_sends_default_and_custom_headers() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let verifier = verifier();
        assert!(
            verifier
                .verify(&format!("{}/default.m3u8", server.uri()), None, None)
                .await
        );
        assert!(
            verifier
                .verify(
                    &format!("{}/custom.m3u8", server.uri()),
                    Some("Kodi/20"),
                    Some("http://ert.gr/"),
                )
                .await
        );

        // The default agent contains commas, so compare the raw header values
        let requests = server.received_requests().await.unwrap();
        let header_of = |path: &str, name: &str| {
            requests
                .iter()
                .find(|r| r.url.path() == path)
                .and_then(|r| r.headers.get(name))
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        assert_eq!(
            header_of("/default.m3u8", "user-agent").as_deref(),
            Some(DEFAULT_USER_AGENT)
        );
        assert_eq!(header_of("/default.m3u8", "referer"), None);
        assert_eq!(header_of("/custom.m3u8", "user-agent").as_deref(), Some("Kodi/20"));
        assert_eq!(
            header_of("/custom.m3u8", "referer").as_deref(),
            Some("http://ert.gr/")
        );
    }

    #[tokio::test]
    async fn test_retain_reachable_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/dead"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let base = server.uri();
        let streams = vec![
            stream("a", &format!("{base}/a")),
            stream("b", &format!("{base}/dead")),
            stream("c", &format!("{base}/c")),
        ];

        let kept = verifier().retain_reachable(streams).await;
        let channels: Vec<&str> = kept.iter().map(|s| s.channel.as_str()).collect();
        assert_eq!(channels, vec!["a", "c"]);
    }
}
