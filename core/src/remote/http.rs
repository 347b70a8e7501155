// basket/src/remote/http.rs

//! `HttpRemote`: `RemoteResource` over the storefront REST API using reqwest.

use crate::config::StorefrontConfig;
use crate::core::item::{ResourceItem, ResourceKind};
use crate::error::{BasketError, BasketResult};
use crate::remote::client::RemoteResource;
use crate::remote::wire::{AddItemRequest, Envelope, ErrorBody, ToggleData, ToggleRequest, UpdateItemRequest, WireItem};
use crate::session::Credential;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{event, instrument, Level};

const USER_AGENT: &str = concat!("basket/", env!("CARGO_PKG_VERSION"));

/// How a non-2xx status is interpreted depends on whether the request addressed one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
  Collection,
  Item,
}

pub struct HttpRemote {
  client: reqwest::Client,
  base_url: String,
  kind: ResourceKind,
}

impl HttpRemote {
  pub fn new(config: &StorefrontConfig, kind: ResourceKind) -> BasketResult<Self> {
    Url::parse(&config.api_base_url)
      .map_err(|e| BasketError::Config(format!("Invalid API base URL '{}': {}", config.api_base_url, e)))?;
    let client = reqwest::Client::builder()
      .user_agent(USER_AGENT)
      .timeout(config.request_timeout)
      .build()
      .map_err(|e| BasketError::Config(format!("Failed to build HTTP client: {}", e)))?;
    Ok(Self::with_client(client, &config.api_base_url, kind))
  }

  /// Uses a caller-provided client (shared connection pool, custom TLS, ...).
  pub fn with_client(client: reqwest::Client, base_url: &str, kind: ResourceKind) -> Self {
    Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      kind,
    }
  }

  fn collection_url(&self) -> BasketResult<Url> {
    let raw = format!("{}/{}", self.base_url, self.kind.path());
    Url::parse(&raw).map_err(|e| BasketError::Config(format!("Invalid API URL '{}': {}", raw, e)))
  }

  /// `segment` is percent-encoded, so ids containing `/`, `?` or `#` stay one path segment.
  fn item_url(&self, segment: &str) -> BasketResult<Url> {
    let mut url = self.collection_url()?;
    url
      .path_segments_mut()
      .map_err(|_| BasketError::Config(format!("API URL '{}' cannot take a path", self.base_url)))?
      .push(segment);
    Ok(url)
  }

  fn require_kind(&self, expected: ResourceKind, operation: &'static str) -> BasketResult<()> {
    if self.kind == expected {
      Ok(())
    } else {
      Err(BasketError::Unsupported { operation })
    }
  }

  fn authorized(&self, request: RequestBuilder, credential: &Credential) -> BasketResult<RequestBuilder> {
    if credential.token().trim().is_empty() {
      return Err(BasketError::Unauthorized);
    }
    Ok(request.header(reqwest::header::AUTHORIZATION, credential.authorization_header()))
  }

  /// Sends the request and unwraps the `{ success, data }` envelope.
  async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, target: Target) -> BasketResult<Envelope<T>> {
    let response = request.send().await.map_err(|e| {
      if e.is_timeout() {
        BasketError::network(format!("request timed out: {}", e))
      } else {
        BasketError::network(e.to_string())
      }
    })?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
      event!(Level::WARN, kind = %self.kind, "Credential rejected by server.");
      return Err(BasketError::Unauthorized);
    }

    if !status.is_success() {
      let raw = response.text().await.unwrap_or_default();
      let message = ErrorBody::parse(&raw)
        .or_else(|| Some(raw.trim().to_string()).filter(|r| !r.is_empty() && r.len() <= 200))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
      event!(Level::WARN, kind = %self.kind, status = status.as_u16(), %message, "Server returned an error status.");
      return Err(classify_status(status, target, message));
    }

    let bytes = response.bytes().await.map_err(|e| BasketError::network(e.to_string()))?;
    // 204 / empty body on deletes.
    if bytes.iter().all(u8::is_ascii_whitespace) {
      return Ok(Envelope {
        success: true,
        data: None,
        message: None,
      });
    }
    let envelope: Envelope<T> = serde_json::from_slice(&bytes).map_err(|e| BasketError::Decode {
      message: e.to_string(),
    })?;

    if !envelope.success {
      let message = envelope
        .message
        .clone()
        .unwrap_or_else(|| "Request was not successful".to_string());
      return Err(BasketError::server(status.as_u16(), message));
    }
    Ok(envelope)
  }

  fn require_data<T>(envelope: Envelope<T>) -> BasketResult<T> {
    envelope.data.ok_or_else(|| BasketError::Decode {
      message: "response has no 'data' field".to_string(),
    })
  }
}

fn classify_status(status: StatusCode, target: Target, message: String) -> BasketError {
  match (status, target) {
    (StatusCode::CONFLICT, _) | (StatusCode::NOT_FOUND, Target::Item) => BasketError::Conflict { message },
    _ => BasketError::Server {
      code: status.as_u16(),
      message,
    },
  }
}

#[async_trait]
impl RemoteResource for HttpRemote {
  fn kind(&self) -> ResourceKind {
    self.kind
  }

  #[instrument(name = "HttpRemote::fetch_collection", skip_all, fields(kind = %self.kind), err(Display))]
  async fn fetch_collection(&self, credential: &Credential) -> BasketResult<Vec<ResourceItem>> {
    let request = self.authorized(self.client.get(self.collection_url()?), credential)?;
    let envelope: Envelope<Vec<WireItem>> = self.send(request, Target::Collection).await?;
    let items: Vec<ResourceItem> = Self::require_data(envelope)?.into_iter().map(ResourceItem::from).collect();
    event!(Level::DEBUG, count = items.len(), "Fetched collection.");
    Ok(items)
  }

  #[instrument(name = "HttpRemote::add_item", skip(self, credential), fields(kind = %self.kind), err(Display))]
  async fn add_item(
    &self,
    credential: &Credential,
    product_id: &str,
    quantity: u32,
    variant: Option<&str>,
  ) -> BasketResult<ResourceItem> {
    self.require_kind(ResourceKind::Cart, "add_item")?;
    let body = AddItemRequest {
      product_id,
      quantity,
      size: variant,
    };
    let request = self.authorized(self.client.post(self.collection_url()?).json(&body), credential)?;
    let envelope: Envelope<WireItem> = self.send(request, Target::Collection).await?;
    Ok(Self::require_data(envelope)?.into())
  }

  #[instrument(name = "HttpRemote::update_item", skip(self, credential), fields(kind = %self.kind), err(Display))]
  async fn update_item(&self, credential: &Credential, item_id: &str, quantity: u32) -> BasketResult<ResourceItem> {
    self.require_kind(ResourceKind::Cart, "update_item")?;
    let request = self.authorized(
      self.client.patch(self.item_url(item_id)?).json(&UpdateItemRequest { quantity }),
      credential,
    )?;
    let envelope: Envelope<WireItem> = self.send(request, Target::Item).await?;
    Ok(Self::require_data(envelope)?.into())
  }

  #[instrument(name = "HttpRemote::remove_item", skip(self, credential), fields(kind = %self.kind), err(Display))]
  async fn remove_item(&self, credential: &Credential, item_id: &str) -> BasketResult<()> {
    self.require_kind(ResourceKind::Cart, "remove_item")?;
    let request = self.authorized(self.client.delete(self.item_url(item_id)?), credential)?;
    let _: Envelope<serde_json::Value> = self.send(request, Target::Item).await?;
    Ok(())
  }

  #[instrument(name = "HttpRemote::toggle_item", skip(self, credential), fields(kind = %self.kind), err(Display))]
  async fn toggle_item(&self, credential: &Credential, product_id: &str) -> BasketResult<bool> {
    self.require_kind(ResourceKind::Wishlist, "toggle_item")?;
    let request = self.authorized(
      self.client.post(self.item_url("toggle")?).json(&ToggleRequest { product_id }),
      credential,
    )?;
    let envelope: Envelope<ToggleData> = self.send(request, Target::Collection).await?;
    Ok(Self::require_data(envelope)?.added)
  }
}
