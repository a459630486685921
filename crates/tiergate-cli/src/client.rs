//! Async HTTP client wrapping the tiergate JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tiergate_core::{
  Identity,
  account::{AccountDetails, DashboardStats, UserSearchResult},
  gate::AccessDecision,
};

/// Connection settings for the tiergate API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
  pub base_url: String,
  /// Sent as `x-identity`; requests that need a caller fail with 401
  /// when absent.
  pub identity: Option<Identity>,
}

/// Async HTTP client for the tiergate JSON REST API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let req = self.client.request(method, self.url(path));
    match self.config.identity {
      Some(id) => req.header("x-identity", id.to_string()),
      None => req,
    }
  }

  /// Send `req` and decode a JSON body, turning any non-2xx status into an
  /// error carrying the server's `error` message.
  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    let resp = checked(req.send().await.with_context(|| format!("{what} failed"))?, what).await?;
    resp.json().await.with_context(|| format!("deserialising {what} response"))
  }

  /// Denials come back as 403 or 503 with the decision attached; surface
  /// them as values rather than errors.
  async fn decision(&self, req: RequestBuilder, what: &str) -> Result<AccessDecision> {
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    if matches!(status, StatusCode::FORBIDDEN | StatusCode::SERVICE_UNAVAILABLE) {
      let body: Value = resp.json().await.unwrap_or_default();
      if let Ok(decision) = serde_json::from_value(body["decision"].clone()) {
        return Ok(decision);
      }
      return Err(anyhow!("{what} → {status}: {}", body["error"].as_str().unwrap_or_default()));
    }
    checked(resp, what).await?.json().await.context("deserialising decision")
  }

  // ── Self-service ──────────────────────────────────────────────────────────

  /// `POST /api/accounts`
  pub async fn register(
    &self,
    email: &str,
    full_name: Option<&str>,
    phone: Option<&str>,
  ) -> Result<Value> {
    let body = json!({ "email": email, "full_name": full_name, "phone": phone });
    self.send(self.request(Method::POST, "/accounts").json(&body), "POST /accounts").await
  }

  /// `GET /api/me/subscription`
  pub async fn whoami(&self) -> Result<Value> {
    self.send(self.request(Method::GET, "/me/subscription"), "GET /me/subscription").await
  }

  /// `POST /api/me/resources`
  pub async fn claim(&self) -> Result<AccessDecision> {
    self.decision(self.request(Method::POST, "/me/resources"), "POST /me/resources").await
  }

  /// `DELETE /api/me/resources`
  pub async fn release(&self) -> Result<()> {
    let what = "DELETE /me/resources";
    let req = self.request(Method::DELETE, "/me/resources");
    checked(req.send().await.with_context(|| format!("{what} failed"))?, what).await?;
    Ok(())
  }

  // ── Gates ─────────────────────────────────────────────────────────────────

  /// `GET /api/access/admin`
  pub async fn can_admin(&self) -> Result<AccessDecision> {
    self.decision(self.request(Method::GET, "/access/admin"), "GET /access/admin").await
  }

  /// `GET /api/access/resource?path=<path>`
  pub async fn can_create(&self, path: &str) -> Result<AccessDecision> {
    let req = self.request(Method::GET, "/access/resource").query(&[("path", path)]);
    self.decision(req, "GET /access/resource").await
  }

  /// `GET /api/roles`
  pub async fn roles(&self) -> Result<Value> {
    self.send(self.request(Method::GET, "/roles"), "GET /roles").await
  }

  // ── Admin ─────────────────────────────────────────────────────────────────

  /// `GET /api/admin/users?search=<term>[&limit=<n>][&offset=<n>]`
  pub async fn search(
    &self,
    term: &str,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> Result<Vec<UserSearchResult>> {
    let mut params = vec![("search", term.to_owned())];
    params.extend(limit.map(|n| ("limit", n.to_string())));
    params.extend(offset.map(|n| ("offset", n.to_string())));
    let req = self.request(Method::GET, "/admin/users").query(&params);
    self.send(req, "GET /admin/users").await
  }

  /// `GET /api/admin/users/<id>`
  pub async fn show(&self, id: Identity) -> Result<AccountDetails> {
    let req = self.request(Method::GET, &format!("/admin/users/{id}"));
    self.send(req, "GET /admin/users/{id}").await
  }

  /// `PUT /api/admin/users/<id>/subscription`
  pub async fn set_subscription(
    &self,
    id: Identity,
    role: &str,
    status: &str,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
  ) -> Result<Value> {
    let body = json!({
      "role": role,
      "status": status,
      "valid_from": valid_from,
      "valid_until": valid_until,
    });
    let req = self.request(Method::PUT, &format!("/admin/users/{id}/subscription")).json(&body);
    self.send(req, "PUT /admin/users/{id}/subscription").await
  }

  /// `PUT /api/admin/users/<id>/role`
  pub async fn set_role(&self, id: Identity, role: &str) -> Result<Value> {
    let req = self
      .request(Method::PUT, &format!("/admin/users/{id}/role"))
      .json(&json!({ "role": role }));
    self.send(req, "PUT /admin/users/{id}/role").await
  }

  /// `GET /api/admin/stats`
  pub async fn stats(&self) -> Result<DashboardStats> {
    self.send(self.request(Method::GET, "/admin/stats"), "GET /admin/stats").await
  }
}

/// Pass a successful response through; otherwise build an error from the
/// status and the server's `{"error": ..}` body, if it sent one.
async fn checked(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let message = resp
    .json::<Value>()
    .await
    .ok()
    .and_then(|v| v["error"].as_str().map(str::to_owned))
    .unwrap_or_default();
  if message.is_empty() {
    Err(anyhow!("{what} → {status}"))
  } else {
    Err(anyhow!("{what} → {status}: {message}"))
  }
}
