//! Cart persistence access: fetch-or-create and compare-and-swap saves.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::domain::Cart;
use crate::error::{CartError, Result};
use crate::store::CartRepository;

/// Bounded retries for the creation race and for CAS write contention.
pub const WRITE_RETRIES: usize = 3;

pub struct CartStore {
    repo: Arc<dyn CartRepository>,
}

impl CartStore {
    pub fn new(repo: Arc<dyn CartRepository>) -> Self {
        Self { repo }
    }

    /// The user's active cart, created lazily on first access.
    ///
    /// Two concurrent first-adds may both attempt the insert; the unique
    /// active-cart constraint rejects the loser, which re-reads the winner's
    /// cart instead of surfacing a conflict.
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<Cart> {
        for _ in 0..WRITE_RETRIES {
            if let Some(cart) = self.repo.find_active(user_id).await? {
                return Ok(cart);
            }
            let cart = Cart::new(user_id);
            match self.repo.insert(&cart).await {
                Ok(()) => return Ok(cart),
                Err(CartError::Conflict) => {
                    // Lost the creation race; loop re-reads the winner.
                    warn!(%user_id, "concurrent cart creation, re-reading");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(CartError::Storage("cart creation kept racing".into()))
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Cart> {
        self.repo
            .find_active(user_id)
            .await?
            .ok_or_else(|| CartError::not_found("cart"))
    }

    /// CAS write; on success the local version catches up with the store.
    /// Returns `Conflict` when another writer got there first, in which
    /// case callers reload and reapply.
    pub async fn save(&self, cart: &mut Cart) -> Result<()> {
        cart.touch();
        self.repo.update(cart).await?;
        cart.version += 1;
        Ok(())
    }
}
