// basket/src/remote/client.rs

//! Defines the `RemoteResource` trait: the network boundary of a synchronized collection.

use crate::core::item::{ResourceItem, ResourceKind};
use crate::error::{BasketError, BasketResult};
use crate::session::Credential;
use async_trait::async_trait;

/// Authenticated calls against one remote collection (cart or wishlist).
///
/// Implementations report:
/// - a rejected or missing credential as `BasketError::Unauthorized`, never as empty state,
/// - transport failures and timeouts as `BasketError::Network`,
/// - non-2xx responses as `BasketError::Server { code, message }` (or `Conflict` when an
///   addressed item no longer exists server-side).
///
/// Operations a collection does not offer keep the default body, which returns
/// `BasketError::Unsupported`.
#[async_trait]
pub trait RemoteResource: Send + Sync {
  fn kind(&self) -> ResourceKind;

  async fn fetch_collection(&self, credential: &Credential) -> BasketResult<Vec<ResourceItem>>;

  /// Adds `quantity` units; the server merges into an existing entry for the same key and
  /// returns the canonical (merged) item.
  async fn add_item(
    &self,
    _credential: &Credential,
    _product_id: &str,
    _quantity: u32,
    _variant: Option<&str>,
  ) -> BasketResult<ResourceItem> {
    Err(BasketError::Unsupported { operation: "add_item" })
  }

  async fn update_item(&self, _credential: &Credential, _item_id: &str, _quantity: u32) -> BasketResult<ResourceItem> {
    Err(BasketError::Unsupported {
      operation: "update_item",
    })
  }

  async fn remove_item(&self, _credential: &Credential, _item_id: &str) -> BasketResult<()> {
    Err(BasketError::Unsupported {
      operation: "remove_item",
    })
  }

  /// Flips membership server-side and returns the resulting state (`true` = now present).
  async fn toggle_item(&self, _credential: &Credential, _product_id: &str) -> BasketResult<bool> {
    Err(BasketError::Unsupported {
      operation: "toggle_item",
    })
  }
}
