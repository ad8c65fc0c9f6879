pub mod http;
pub mod session;

pub use http::HttpOrgClient;
pub use session::{CachingSessionProvider, Session, SessionProvider, StaticSessionProvider};

use crate::models::{EntityInfo, FieldMetadata};
use async_trait::async_trait;
use common::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a composite request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRequest {
    pub method: String,
    pub url: String,
    pub reference_id: String,
}

/// One entry of a composite response, correlated to its request by position.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubResponse {
    #[serde(default)]
    pub body: Value,
    pub http_status_code: u16,
    #[serde(default)]
    pub reference_id: Option<String>,
}

impl SubResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status_code)
    }
}

/// Remote surface of an org: entity listing, describe and composite calls.
#[async_trait]
pub trait OrgClient: Send + Sync {
    /// Queryable entities of the org.
    async fn list_entities(&self) -> Result<Vec<EntityInfo>>;

    /// Field descriptions of one entity, in remote order.
    async fn describe(&self, entity: &str) -> Result<Vec<FieldMetadata>>;

    /// Issues all sub-requests in one round trip. An `Err` means the call as
    /// a whole failed; individual failures arrive as non-2xx sub-responses.
    async fn composite(&self, requests: &[SubRequest]) -> Result<Vec<SubResponse>>;
}
