use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::Credentials;
use crate::error::RunwayError;
use crate::plane::api_types::{ApiIssueIds, ApiList};
use crate::plane::types::{EntityKind, EntityRef};

const API_KEY_HEADER: &str = "x-api-key";

/// Plane API client scoped to one workspace project.
///
/// Every method is a single request; there is no retry. Identifiers passed
/// in are used verbatim (see `CachedPlaneClient` for prefix resolution).
#[derive(Clone)]
pub struct PlaneClient {
  http: reqwest::Client,
  /// `{base}/api/v1/workspaces/{workspace}/projects/{project_id}`
  project_url: Url,
  project_id: String,
}

impl PlaneClient {
  pub fn new(credentials: &Credentials) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(
      API_KEY_HEADER,
      HeaderValue::from_str(&credentials.api_key)
        .map_err(|e| eyre!("Invalid API key header: {}", e))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .user_agent(concat!("runway/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let mut project_url = Url::parse(&credentials.base_url)
      .map_err(|e| eyre!("Invalid base URL {}: {}", credentials.base_url, e))?;
    project_url
      .path_segments_mut()
      .map_err(|_| eyre!("Invalid base URL {}", credentials.base_url))?
      .pop_if_empty()
      .extend([
        "api",
        "v1",
        "workspaces",
        credentials.workspace.as_str(),
        "projects",
        credentials.project_id.as_str(),
      ]);

    Ok(Self {
      http,
      project_url,
      project_id: credentials.project_id.clone(),
    })
  }

  pub fn project_id(&self) -> &str {
    &self.project_id
  }

  /// Project-relative endpoint; the API wants a trailing slash.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.project_url.clone();
    // `new` already proved the URL can carry path segments
    if let Ok(mut path) = url.path_segments_mut() {
      path.extend(segments).push("");
    }
    url
  }

  /// Send the request; a non-success status becomes `RunwayError::Service`.
  async fn execute(&self, request: RequestBuilder, action: &str) -> Result<Response> {
    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", action, e))?;

    let status = response.status();
    tracing::debug!(action, %status, "response");
    if !status.is_success() {
      let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
          tracing::warn!(action, %status, error = %e, "failed to read error body");
          String::new()
        }
      };
      return Err(
        RunwayError::Service {
          status: status.as_u16(),
          body,
        }
        .into(),
      );
    }

    Ok(response)
  }

  async fn execute_json<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
    action: &str,
  ) -> Result<T> {
    self
      .execute(request, action)
      .await?
      .json::<T>()
      .await
      .map_err(|e| eyre!("Failed to parse response to {}: {}", action, e))
  }

  async fn list_collection(&self, collection: &str, limit: Option<u32>) -> Result<Vec<EntityRef>> {
    let mut request = self.http.get(self.endpoint(&[collection]));
    if let Some(limit) = limit {
      request = request.query(&[("per_page", limit)]);
    }

    tracing::info!(collection, ?limit, "listing");
    let list: ApiList<EntityRef> = self
      .execute_json(request, &format!("list {}", collection))
      .await?;

    Ok(list.into_vec())
  }

  /// List entities of one kind, envelope unwrapped, in service order.
  pub async fn list_entities(&self, kind: EntityKind, limit: Option<u32>) -> Result<Vec<EntityRef>> {
    self.list_collection(kind.collection(), limit).await
  }

  /// List the project's workflow states
  pub async fn list_states(&self) -> Result<Vec<EntityRef>> {
    self.list_collection("states", None).await
  }

  /// Full JSON of a single entity
  pub async fn get_entity(&self, kind: EntityKind, id: &str) -> Result<Value> {
    let request = self.http.get(self.endpoint(&[kind.collection(), id]));
    self.execute_json(request, &format!("get {} {}", kind, id)).await
  }

  pub async fn create_entity<B>(&self, kind: EntityKind, body: &B) -> Result<EntityRef>
  where
    B: Serialize + ?Sized,
  {
    let request = self.http.post(self.endpoint(&[kind.collection()])).json(body);
    tracing::info!(%kind, "creating");
    self.execute_json(request, &format!("create {}", kind)).await
  }

  pub async fn update_entity<B>(&self, kind: EntityKind, id: &str, body: &B) -> Result<EntityRef>
  where
    B: Serialize + ?Sized,
  {
    let request = self
      .http
      .patch(self.endpoint(&[kind.collection(), id]))
      .json(body);
    tracing::info!(%kind, id, "updating");
    self
      .execute_json(request, &format!("update {} {}", kind, id))
      .await
  }

  pub async fn delete_entity(&self, kind: EntityKind, id: &str) -> Result<()> {
    let request = self.http.delete(self.endpoint(&[kind.collection(), id]));
    tracing::info!(%kind, id, "deleting");
    self
      .execute(request, &format!("delete {} {}", kind, id))
      .await?;
    Ok(())
  }

  fn membership(kind: EntityKind) -> Result<&'static str> {
    kind
      .membership()
      .ok_or_else(|| eyre!("{}s cannot contain issues", kind))
  }

  /// Add issues to a cycle or module
  pub async fn add_issues(&self, kind: EntityKind, group_id: &str, issue_ids: &[&str]) -> Result<()> {
    let sub = Self::membership(kind)?;
    let request = self
      .http
      .post(self.endpoint(&[kind.collection(), group_id, sub]))
      .json(&ApiIssueIds {
        issues: issue_ids.to_vec(),
      });
    self
      .execute(request, &format!("add issues to {} {}", kind, group_id))
      .await?;
    Ok(())
  }

  /// Remove one issue from a cycle or module
  pub async fn remove_issue(&self, kind: EntityKind, group_id: &str, issue_id: &str) -> Result<()> {
    let sub = Self::membership(kind)?;
    let request = self
      .http
      .delete(self.endpoint(&[kind.collection(), group_id, sub, issue_id]));
    self
      .execute(request, &format!("remove issue from {} {}", kind, group_id))
      .await?;
    Ok(())
  }
}
