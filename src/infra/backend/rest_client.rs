use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::core::content::{
    ContentError, ContentGateway, PostSummary, ProfileDirectory, ProfileSummary,
};
use crate::core::moderation::ContentType;

/// Minimal client for the hosted backend's PostgREST API. It only exposes
/// the calls the moderation core needs.
///
/// Reads are retried once on timeout. Deletes are never retried.
pub struct BackendClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    id: Uuid,
}

impl BackendClient {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, ContentError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(service_key)
                .map_err(|e| ContentError::Unavailable(e.to_string()))?,
        );
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", service_key))
                .map_err(|e| ContentError::Unavailable(e.to_string()))?,
        );
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ContentError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn table_for(content_type: ContentType) -> &'static str {
        match content_type {
            ContentType::Post => "posts",
            ContentType::Comment => "comments",
        }
    }

    /// PostgREST `in.(a,b,c)` filter value.
    fn in_filter(ids: &[Uuid]) -> String {
        let joined = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("in.({})", joined)
    }

    fn map_send_error(e: reqwest::Error) -> ContentError {
        if e.is_timeout() {
            ContentError::Timeout
        } else {
            ContentError::Unavailable(e.to_string())
        }
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ContentError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ContentError::Unavailable(format!(
                "backend returned {}",
                status
            )));
        }
        resp.json()
            .await
            .map_err(|e| ContentError::Unavailable(format!("unexpected response body: {}", e)))
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ContentError> {
        let url = self.table_url(table);
        let mut retried = false;
        loop {
            match self.client.get(&url).query(query).send().await {
                Ok(resp) => return Self::read_json(resp).await,
                Err(e) if e.is_timeout() && !retried => {
                    tracing::warn!(table, "Backend read timed out; retrying once");
                    retried = true;
                }
                Err(e) => return Err(Self::map_send_error(e)),
            }
        }
    }
}

#[async_trait]
impl ContentGateway for BackendClient {
    async fn delete_content(
        &self,
        content_type: ContentType,
        id: Uuid,
    ) -> Result<(), ContentError> {
        let resp = self
            .client
            .delete(self.table_url(Self::table_for(content_type)))
            .query(&[("id", format!("eq.{}", id)), ("select", "id".to_string())])
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let deleted: Vec<IdRow> = Self::read_json(resp).await?;
        if deleted.is_empty() {
            return Err(ContentError::NotFound { content_type, id });
        }

        tracing::info!(
            content_type = %content_type,
            content_id = %id,
            "Content deleted in backend"
        );
        Ok(())
    }

    async fn content_exists(
        &self,
        content_type: ContentType,
        id: Uuid,
    ) -> Result<bool, ContentError> {
        let rows: Vec<IdRow> = self
            .get_rows(
                Self::table_for(content_type),
                &[("id", format!("eq.{}", id)), ("select", "id".to_string())],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn fetch_posts(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, PostSummary>, ContentError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<PostSummary> = self
            .get_rows(
                "posts",
                &[
                    ("id", Self::in_filter(ids)),
                    ("select", "id,user_id,content,media_url".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|p| (p.id, p)).collect())
    }
}

#[async_trait]
impl ProfileDirectory for BackendClient {
    async fn fetch_profiles(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ProfileSummary>, ContentError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<ProfileSummary> = self
            .get_rows(
                "profiles",
                &[
                    ("id", Self::in_filter(ids)),
                    ("select", "id,username,display_name,avatar_url".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|p| (p.id, p)).collect())
    }
}
