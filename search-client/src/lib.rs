//! Search-index projection of post hotness scores.

use agora_core::{CoreError, PostId, SearchConfig, SearchError, SearchIndex};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Debug, Serialize)]
struct ScoreDocument {
    id: PostId,
    hotness_score: f64,
}

/// Sends partial document updates to a Meilisearch-compatible index over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSearchIndex {
    http_client: Client,
    documents_url: Url,
    api_key: Option<String>,
}

impl HttpSearchIndex {
    pub fn new(config: &SearchConfig) -> Result<Self, CoreError> {
        let documents_url = documents_url(&config.url, &config.index)?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(SearchError::Network)?;

        info!("Search projection enabled at {}", documents_url);
        Ok(Self {
            http_client,
            documents_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn documents_url(&self) -> &Url {
        &self.documents_url
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn update_score(&self, post_id: PostId, score: f64) -> Result<(), CoreError> {
        let body = [ScoreDocument {
            id: post_id,
            hotness_score: score,
        }];

        let mut request = self.http_client.put(self.documents_url.clone()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Search index request for post {} failed: {}", post_id, e);
            if e.is_connect() || e.is_timeout() {
                SearchError::Unavailable {
                    endpoint: self.documents_url.to_string(),
                }
            } else {
                SearchError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "Search index rejected score update for post {}: {}",
                post_id, status
            );
            return Err(SearchError::Rejected {
                post_id,
                status_code: status.as_u16(),
            }
            .into());
        }

        debug!("Projected score {} for post {} to search", score, post_id);
        Ok(())
    }
}

/// Used when search is disabled. Accepts every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSearchIndex;

#[async_trait]
impl SearchIndex for NoopSearchIndex {
    async fn update_score(&self, _post_id: PostId, _score: f64) -> Result<(), CoreError> {
        Ok(())
    }
}

/// The configured projection: HTTP when enabled, no-op otherwise.
pub fn from_config(config: &SearchConfig) -> Result<Arc<dyn SearchIndex>, CoreError> {
    if config.enabled {
        Ok(Arc::new(HttpSearchIndex::new(config)?))
    } else {
        info!("Search projection disabled");
        Ok(Arc::new(NoopSearchIndex))
    }
}

fn documents_url(base: &str, index: &str) -> Result<Url, SearchError> {
    let invalid = || SearchError::InvalidUrl {
        url: base.to_string(),
    };

    let mut base = Url::parse(base).map_err(|_| invalid())?;
    if base.cannot_be_a_base() {
        return Err(invalid());
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(&format!("indexes/{}/documents", index))
        .map_err(|_| invalid())
}
