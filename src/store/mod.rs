//! Persistence and collaborator seams.
//!
//! The cart and coupon repositories are owned by this service; the catalog
//! and design providers are read-only views onto collaborator data.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Cart, Coupon, ResolvedDesign, ResolvedProduct, ResolvedSize};
use crate::error::Result;

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_active(&self, user_id: Uuid) -> Result<Option<Cart>>;

    /// Insert a fresh active cart. Returns [`CartError::Conflict`] when the
    /// one-active-cart-per-user constraint rejects the row (a concurrent
    /// first-add won the race).
    ///
    /// [`CartError::Conflict`]: crate::error::CartError::Conflict
    async fn insert(&self, cart: &Cart) -> Result<()>;

    /// Compare-and-swap write keyed on `(id, version)`. Returns
    /// [`CartError::Conflict`] when the stored version has moved on.
    ///
    /// [`CartError::Conflict`]: crate::error::CartError::Conflict
    async fn update(&self, cart: &Cart) -> Result<()>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Lookup by normalized code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>>;

    /// Record a successful redemption: bump `used_count` and append the user
    /// to `used_by`. Invoked by the checkout collaborator on order
    /// completion.
    async fn record_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn get_product(&self, product_id: Uuid) -> Result<Option<ResolvedProduct>>;
    async fn get_size(&self, size_id: Uuid) -> Result<Option<ResolvedSize>>;
}

#[async_trait]
pub trait DesignProvider: Send + Sync {
    /// An active design owned by `user_id`, or `None`.
    async fn get_active_user_design(
        &self,
        user_id: Uuid,
        design_id: Uuid,
    ) -> Result<Option<ResolvedDesign>>;
}
