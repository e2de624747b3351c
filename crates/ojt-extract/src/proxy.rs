//! Relay chain for fetching remote pages
//!
//! Each relay is a URL template. `{url}` is replaced by the percent-encoded
//! target and `{raw_url}` by the target verbatim, so a direct fetch is just a
//! relay with the template `{raw_url}`. Relays are tried once each, in the
//! configured order.
//!
//! Redirects are followed only to hosts that pass the same address guard as
//! the user supplied URL.

use async_trait::async_trait;
use ojt_core::{ExtractionConfig, RelayConfig};
use reqwest::redirect::{Attempt, Policy};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::strategy::{Strategy, StrategyChain};
use crate::url_guard::check_url;
use crate::{ExtractError, Result};

/// Fetches a page through one relay
pub struct RelayFetcher {
    name: String,
    template: String,
    client: Client,
    timeout: Duration,
}

impl RelayFetcher {
    pub fn new(relay: &RelayConfig, client: Client, timeout: Duration) -> Self {
        Self {
            name: relay.name.clone(),
            template: relay.template.clone(),
            client,
            timeout,
        }
    }

    /// The URL actually requested for `target`
    pub fn relay_url(&self, target: &Url) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
        self.template
            .replace("{raw_url}", target.as_str())
            .replace("{url}", &encoded)
    }
}

#[async_trait]
impl Strategy<Url, String> for RelayFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, target: &Url) -> Result<String> {
        let request_url = self.relay_url(target);
        debug!(relay = %self.name, url = %request_url, "Fetching through relay");

        let response = self
            .client
            .get(&request_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Relay(format!(
                "relay '{}' answered with status {}",
                self.name, status
            )));
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;
        if body.trim().is_empty() {
            return Err(ExtractError::Relay(format!(
                "relay '{}' returned an empty body",
                self.name
            )));
        }

        Ok(body)
    }
}

impl RelayFetcher {
    fn request_error(&self, e: reqwest::Error) -> ExtractError {
        if e.is_timeout() {
            ExtractError::Timeout {
                operation: format!("relay '{}'", self.name),
                duration: self.timeout,
            }
        } else {
            ExtractError::Relay(format!("relay '{}': {}", self.name, e))
        }
    }
}

/// Ordered relays tried until one returns a page
pub struct ProxyChain {
    chain: StrategyChain<Url, String>,
}

impl ProxyChain {
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        Self::with_relays(&config.relays, config.relay_timeout())
    }

    pub fn with_relays(relays: &[RelayConfig], timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("ojt-extract/{}", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::custom(guard_redirect))
            .build()
            .map_err(|e| ExtractError::Relay(format!("failed to build HTTP client: {}", e)))?;

        let chain = relays.iter().fold(StrategyChain::new(), |chain, relay| {
            chain.add(Arc::new(RelayFetcher::new(relay, client.clone(), timeout)))
        });

        Ok(Self { chain })
    }

    pub fn relay_names(&self) -> Vec<&str> {
        self.chain.names()
    }

    /// Fetch the body of `target`, returning it with the name of the relay
    /// that served it.
    #[instrument(skip(self), fields(url = %target))]
    pub async fn fetch(&self, target: &Url) -> Result<(String, String)> {
        let (body, relay) = self.chain.run(target).await?;
        debug!(relay = %relay, bytes = body.len(), "Page fetched");
        Ok((body, relay))
    }
}

const MAX_REDIRECTS: usize = 10;

fn guard_redirect(attempt: Attempt) -> reqwest::redirect::Action {
    if attempt.previous().len() >= MAX_REDIRECTS {
        return attempt.error(format!("more than {} redirects", MAX_REDIRECTS));
    }
    match check_url(attempt.url().as_str()) {
        Ok(_) => attempt.follow(),
        Err(e) => {
            warn!(location = %attempt.url(), "Refusing redirect");
            attempt.error(format!("redirect refused: {}", e))
        }
    }
}
