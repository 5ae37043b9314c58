/// Blocking MusicBrainz CD-stub search. Pacing is not handled here; the catalog matcher paces every
/// call it makes through this client.
use crate::catalog::{CatalogClient, StubMatch};
use crate::error::{Result, TagsortError, TagsortExpectedError};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2";
pub const DEFAULT_USER_AGENT: &str = concat!("tagsort-rs/", env!("CARGO_PKG_VERSION"), " ( https://musicbrainz.org )");

const MAX_RESPONSE_BYTES: u64 = 1_000_000;

#[derive(Debug, Deserialize)]
struct CdStubSearchResponse {
    #[serde(default)]
    cdstubs: Vec<CdStub>,
}

#[derive(Debug, Deserialize)]
struct CdStub {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    count: u32,
    #[serde(default)]
    score: Option<u32>,
}

impl From<CdStub> for StubMatch {
    fn from(stub: CdStub) -> Self {
        StubMatch {
            id: stub.id,
            artist: stub.artist,
            title: stub.title,
            track_count: stub.count,
            score: stub.score,
        }
    }
}

pub struct MusicBrainzClient {
    base_url: String,
    agent: ureq::Agent,
}

impl MusicBrainzClient {
    pub fn new(base_url: &str, user_agent: &str) -> Self {
        let config = ureq::Agent::config_builder().user_agent(user_agent).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn failure(query: &str, reason: impl Into<String>) -> TagsortError {
        TagsortExpectedError::CatalogQueryFailure {
            query: query.to_string(),
            reason: reason.into(),
        }
        .into()
    }
}

impl CatalogClient for MusicBrainzClient {
    fn search_stub(&self, query: &str) -> Result<Vec<StubMatch>> {
        let url = format!("{}/cdstub", self.base_url);
        tracing::debug!("GET {} query={}", url, query);

        let resp = self
            .agent
            .get(&url)
            .query("query", query)
            .query("fmt", "json")
            .config()
            .http_status_as_error(false)
            .build()
            .call()
            .map_err(|e| Self::failure(query, format!("transport error: {e}")))?;

        let status = resp.status();
        let body = resp
            .into_body()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_string()
            .map_err(|e| Self::failure(query, format!("failed to read response: {e}")))?;

        if status.as_u16() >= 400 {
            let snippet: String = body.trim().chars().take(300).collect();
            return Err(Self::failure(query, format!("status {status}: {snippet}")));
        }

        let parsed: CdStubSearchResponse = serde_json::from_str(&body)?;
        Ok(parsed.cdstubs.into_iter().map(StubMatch::from).collect())
    }
}
