//! HTTP client for the hot-spot contract's smart-query endpoint.

use std::time::Duration;

use async_trait::async_trait;
use hotspot_map_hotspot_models::{HotSpotQueryMsg, RawHotSpot};

use crate::retry::{RetryPolicy, send_json};
use crate::{HotSpotQuery, HotSpotSource, QueryError, parse_hot_spots};

/// Per-request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Queries the contract by POSTing a [`HotSpotQueryMsg`] as JSON.
pub struct ContractClient {
    client: reqwest::Client,
    url: String,
    policy: RetryPolicy,
}

impl ContractClient {
    /// Creates a client for the smart-query endpoint at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Http`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            policy: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HotSpotSource for ContractClient {
    fn id(&self) -> &str {
        "contract"
    }

    async fn hot_spots(&self, query: &HotSpotQuery) -> Result<Vec<RawHotSpot>, QueryError> {
        let msg = HotSpotQueryMsg::HotSpot {
            accuracy: query.accuracy,
            zones: query.zones,
        };
        log::info!(
            "Querying hot-spots from {} (accuracy={}, zones={:?})",
            self.url,
            query.accuracy,
            query.zones
        );

        let body = send_json(&self.policy, || self.client.post(&self.url).json(&msg)).await?;
        let hot_spots = parse_hot_spots(body)?;

        log::info!("Received {} hot-spots", hot_spots.len());
        Ok(hot_spots)
    }
}
