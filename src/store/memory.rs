//! In-memory implementations of the store seams.
//!
//! Back the test suite and reproduce the same conflict semantics as the
//! Postgres implementations: duplicate active-cart inserts and stale-version
//! updates both surface as `CartError::Conflict`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Cart, Coupon, ResolvedDesign, ResolvedProduct, ResolvedSize};
use crate::error::{CartError, Result};
use crate::store::{CartRepository, CatalogProvider, CouponRepository, DesignProvider};

#[derive(Default)]
pub struct MemoryCartRepository {
    // Active cart per user; inactive carts are of no interest here.
    carts: Mutex<HashMap<Uuid, Cart>>,
}

impl MemoryCartRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl CartRepository for MemoryCartRepository {
    async fn find_active(&self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(self.carts.lock().await.get(&user_id).cloned())
    }

    async fn insert(&self, cart: &Cart) -> Result<()> {
        let mut carts = self.carts.lock().await;
        if carts.contains_key(&cart.user_id) {
            return Err(CartError::Conflict);
        }
        carts.insert(cart.user_id, cart.clone());
        Ok(())
    }

    async fn update(&self, cart: &Cart) -> Result<()> {
        let mut carts = self.carts.lock().await;
        match carts.get(&cart.user_id) {
            Some(stored) if stored.id == cart.id && stored.version == cart.version => {}
            Some(_) => return Err(CartError::Conflict),
            None => return Err(CartError::Storage("cart vanished during update".into())),
        }
        let mut next = cart.clone();
        next.version += 1;
        carts.insert(cart.user_id, next);
        Ok(())
    }
}

pub struct MemoryCouponRepository {
    coupons: Mutex<HashMap<Uuid, Coupon>>,
}

impl MemoryCouponRepository {
    pub fn new(coupons: Vec<Coupon>) -> Arc<Self> {
        Arc::new(Self {
            coupons: Mutex::new(coupons.into_iter().map(|c| (c.id, c)).collect()),
        })
    }
}

#[async_trait]
impl CouponRepository for MemoryCouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        Ok(self
            .coupons
            .lock()
            .await
            .values()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn record_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut coupons = self.coupons.lock().await;
        let coupon = coupons
            .get_mut(&coupon_id)
            .ok_or_else(|| CartError::not_found("coupon"))?;
        coupon.used_count += 1;
        coupon.used_by.push(user_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCatalog {
    products: HashMap<Uuid, ResolvedProduct>,
    sizes: HashMap<Uuid, ResolvedSize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: ResolvedProduct) -> Self {
        self.products.insert(product.id, product);
        self
    }

    pub fn with_size(mut self, size: ResolvedSize) -> Self {
        self.sizes.insert(size.id, size);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl CatalogProvider for MemoryCatalog {
    async fn get_product(&self, product_id: Uuid) -> Result<Option<ResolvedProduct>> {
        Ok(self.products.get(&product_id).cloned())
    }

    async fn get_size(&self, size_id: Uuid) -> Result<Option<ResolvedSize>> {
        Ok(self.sizes.get(&size_id).cloned())
    }
}

pub struct MemoryDesigns {
    // Keyed by (owner, design id); only active designs are stored.
    designs: HashMap<(Uuid, Uuid), ResolvedDesign>,
}

impl MemoryDesigns {
    pub fn new(entries: Vec<(Uuid, ResolvedDesign)>) -> Arc<Self> {
        Arc::new(Self {
            designs: entries
                .into_iter()
                .map(|(owner, design)| ((owner, design.id), design))
                .collect(),
        })
    }
}

#[async_trait]
impl DesignProvider for MemoryDesigns {
    async fn get_active_user_design(
        &self,
        user_id: Uuid,
        design_id: Uuid,
    ) -> Result<Option<ResolvedDesign>> {
        Ok(self.designs.get(&(user_id, design_id)).cloned())
    }
}
