use super::{OrgClient, Session, SubRequest, SubResponse};
use crate::models::{EntityInfo, FieldMetadata};
use async_trait::async_trait;
use common::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

#[derive(Deserialize)]
struct EntityListResponse {
    #[serde(default)]
    sobjects: Vec<RawEntity>,
}

#[derive(Deserialize)]
struct RawEntity {
    name: Option<String>,
    label: Option<String>,
    #[serde(default)]
    queryable: bool,
}

#[derive(Deserialize)]
struct DescribeResponse {
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Deserialize)]
struct RawField {
    name: String,
    label: Option<String>,
    #[serde(rename = "type")]
    field_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompositeRequest<'a> {
    all_or_none: bool,
    composite_request: &'a [SubRequest],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompositeResponse {
    composite_response: Option<Vec<SubResponse>>,
}

/// REST client bound to one org session.
pub struct HttpOrgClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    api_version: String,
}

impl HttpOrgClient {
    pub fn new(session: &Session, api_version: &str) -> Result<Self> {
        let base = if session.domain.starts_with("http://") || session.domain.starts_with("https://")
        {
            session.domain.clone()
        } else {
            format!("https://{}", session.domain)
        };

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(&base)?,
            token: session.token.clone(),
            api_version: api_version.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let path = format!("/services/data/{}/{}", self.api_version, path);
        Ok(self.base_url.join(&path)?)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl OrgClient for HttpOrgClient {
    async fn list_entities(&self) -> Result<Vec<EntityInfo>> {
        let url = self.endpoint("sobjects")?;
        let response: EntityListResponse = self.send_json(self.http.get(url)).await?;

        Ok(response
            .sobjects
            .into_iter()
            .filter(|raw| raw.queryable)
            .filter_map(|raw| {
                let name = raw.name.filter(|n| !n.is_empty())?;
                Some(EntityInfo::new(&name, raw.label.as_deref()))
            })
            .collect())
    }

    async fn describe(&self, entity: &str) -> Result<Vec<FieldMetadata>> {
        let url = self.endpoint(&format!("sobjects/{}/describe", entity))?;
        debug!(entity, "Describing entity");
        let response: DescribeResponse = self.send_json(self.http.get(url)).await?;

        Ok(response
            .fields
            .iter()
            .map(|f| FieldMetadata::new(&f.name, f.label.as_deref(), f.field_type.as_deref()))
            .collect())
    }

    async fn composite(&self, requests: &[SubRequest]) -> Result<Vec<SubResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint("tooling/composite")?;
        let body = CompositeRequest {
            all_or_none: false,
            composite_request: requests,
        };
        let response: CompositeResponse = self.send_json(self.http.post(url).json(&body)).await?;

        response.composite_response.ok_or_else(|| {
            Error::Other("Composite API did not return the expected response.".to_string())
        })
    }
}
