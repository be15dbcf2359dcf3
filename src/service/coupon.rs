//! Coupon validation, discount math, and cart coupon mutations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::cart::{round2, Cart};
use crate::domain::{Coupon, DiscountKind};
use crate::error::{CartError, Result};
use crate::service::cart_store::{CartStore, WRITE_RETRIES};
use crate::store::{CatalogProvider, CouponRepository};

/// The slice of an item the coupon math needs: its computed total and the
/// category of its product, resolved once per request.
#[derive(Clone, Debug)]
pub struct ItemPricing {
    pub product_id: Uuid,
    pub category_id: Option<Uuid>,
    pub is_selected: bool,
    pub total: Decimal,
}

pub struct CouponEngine {
    coupons: Arc<dyn CouponRepository>,
    store: Arc<CartStore>,
    catalog: Arc<dyn CatalogProvider>,
}

impl CouponEngine {
    pub fn new(
        coupons: Arc<dyn CouponRepository>,
        store: Arc<CartStore>,
        catalog: Arc<dyn CatalogProvider>,
    ) -> Self {
        Self { coupons, store, catalog }
    }

    /// Check every redemption constraint against the given cart contents and
    /// return the coupon when it holds.
    pub async fn validate_coupon(
        &self,
        code: &str,
        user_id: Uuid,
        items: &[ItemPricing],
    ) -> Result<Coupon> {
        let code = Coupon::normalize_code(code);
        let coupon = self
            .coupons
            .find_by_code(&code)
            .await?
            .ok_or_else(|| CartError::not_found("coupon"))?;

        if !coupon.is_active {
            return Err(CartError::bad_request("this coupon is not active"));
        }
        let now = Utc::now();
        if now < coupon.start_date {
            return Err(CartError::bad_request("this coupon is not valid yet"));
        }
        if now > coupon.end_date {
            return Err(CartError::bad_request("this coupon has expired"));
        }
        if let Some(limit) = coupon.usage_limit {
            if coupon.used_count >= limit {
                return Err(CartError::bad_request("this coupon has reached its usage limit"));
            }
        }
        if coupon.uses_by(user_id) >= coupon.per_user_limit.unwrap_or(1) {
            return Err(CartError::bad_request("you have already used this coupon"));
        }
        if let Some(category) = coupon.category_id {
            if !items.iter().any(|i| i.category_id == Some(category)) {
                return Err(CartError::bad_request(
                    "no items in your cart are eligible for this coupon",
                ));
            }
        }
        Ok(coupon)
    }

    /// Discount amount against `total`. When the coupon is category-scoped
    /// the applicable subtotal is recomputed from the matching items only
    /// and `total` is ignored. Never exceeds the applicable subtotal, never
    /// negative.
    pub fn calculate_discount(
        &self,
        coupon: &Coupon,
        total: Decimal,
        items: &[ItemPricing],
    ) -> Decimal {
        let applicable = match coupon.category_id {
            Some(category) => items
                .iter()
                .filter(|i| i.category_id == Some(category))
                .map(|i| i.total)
                .sum(),
            None => total,
        };
        let raw = match coupon.kind {
            DiscountKind::Percentage => round2(applicable * coupon.value / Decimal::ONE_HUNDRED),
            DiscountKind::Fixed => coupon.value,
        };
        raw.min(applicable).max(Decimal::ZERO)
    }

    /// Attach a coupon to the user's cart after validating it against the
    /// current contents; caches the full-cart discount on the cart row.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, user_id: Uuid, code: &str) -> Result<Cart> {
        for _ in 0..WRITE_RETRIES {
            let mut cart = self.store.get(user_id).await?;
            let pricings = self.pricings(&cart).await?;
            let coupon = self.validate_coupon(code, user_id, &pricings).await?;
            let items_total: Decimal = pricings.iter().map(|p| p.total).sum();
            cart.discount_total = self.calculate_discount(&coupon, items_total, &pricings);
            cart.coupon_code = Some(coupon.code);
            match self.store.save(&mut cart).await {
                Ok(()) => return Ok(cart),
                Err(CartError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CartError::Storage("cart write kept conflicting".into()))
    }

    #[instrument(skip(self))]
    pub async fn remove_coupon(&self, user_id: Uuid) -> Result<Cart> {
        for _ in 0..WRITE_RETRIES {
            let mut cart = self.store.get(user_id).await?;
            cart.coupon_code = None;
            cart.discount_total = Decimal::ZERO;
            match self.store.save(&mut cart).await {
                Ok(()) => return Ok(cart),
                Err(CartError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CartError::Storage("cart write kept conflicting".into()))
    }

    /// Record a successful redemption. Called by the checkout collaborator
    /// on order completion, not by the cart subsystem itself.
    pub async fn record_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<()> {
        self.coupons.record_usage(coupon_id, user_id).await
    }

    /// Item totals plus resolved product categories for coupon checks.
    async fn pricings(&self, cart: &Cart) -> Result<Vec<ItemPricing>> {
        let mut categories: HashMap<Uuid, Option<Uuid>> = HashMap::new();
        let mut pricings = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let category_id = match categories.get(&item.product_id) {
                Some(category) => *category,
                None => {
                    let category = self
                        .catalog
                        .get_product(item.product_id)
                        .await?
                        .and_then(|p| p.category_id);
                    categories.insert(item.product_id, category);
                    category
                }
            };
            pricings.push(ItemPricing {
                product_id: item.product_id,
                category_id,
                is_selected: item.is_selected,
                total: item.total(),
            });
        }
        Ok(pricings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: DiscountKind, value: Decimal, category_id: Option<Uuid>) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            code: "TEST10".into(),
            name: "test".into(),
            thumbnail: None,
            kind,
            value,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active: true,
            usage_limit: None,
            per_user_limit: None,
            used_count: 0,
            used_by: vec![],
            category_id,
        }
    }

    fn pricing(category_id: Option<Uuid>, selected: bool, total: Decimal) -> ItemPricing {
        ItemPricing { product_id: Uuid::new_v4(), category_id, is_selected: selected, total }
    }

    fn engine() -> CouponEngine {
        use crate::store::memory::{MemoryCartRepository, MemoryCatalog, MemoryCouponRepository};
        CouponEngine::new(
            MemoryCouponRepository::new(vec![]),
            Arc::new(CartStore::new(MemoryCartRepository::new())),
            MemoryCatalog::new().build(),
        )
    }

    #[test]
    fn test_percentage_discount_scopes_to_category() {
        let category = Uuid::new_v4();
        let c = coupon(DiscountKind::Percentage, Decimal::TEN, Some(category));
        let items = vec![
            pricing(Some(category), true, Decimal::new(420, 0)),
            pricing(None, false, Decimal::new(600, 0)),
        ];
        // 10% of the 420 in-category subtotal, not of the 1020 total.
        let discount = engine().calculate_discount(&c, Decimal::new(1020, 0), &items);
        assert_eq!(discount, Decimal::new(42, 0));
    }

    #[test]
    fn test_fixed_discount_caps_at_applicable_subtotal() {
        let c = coupon(DiscountKind::Fixed, Decimal::new(500, 0), None);
        let items = vec![pricing(None, true, Decimal::new(120, 0))];
        let discount = engine().calculate_discount(&c, Decimal::new(120, 0), &items);
        assert_eq!(discount, Decimal::new(120, 0));
    }

    #[test]
    fn test_fixed_discount_on_category_caps_at_category_subtotal() {
        let category = Uuid::new_v4();
        let c = coupon(DiscountKind::Fixed, Decimal::new(500, 0), Some(category));
        let items = vec![
            pricing(Some(category), true, Decimal::new(80, 0)),
            pricing(None, true, Decimal::new(900, 0)),
        ];
        let discount = engine().calculate_discount(&c, Decimal::new(980, 0), &items);
        assert_eq!(discount, Decimal::new(80, 0));
    }

    #[test]
    fn test_negative_value_never_produces_negative_discount() {
        let c = coupon(DiscountKind::Fixed, Decimal::new(-10, 0), None);
        let items = vec![pricing(None, true, Decimal::new(50, 0))];
        assert_eq!(engine().calculate_discount(&c, Decimal::new(50, 0), &items), Decimal::ZERO);
    }
}
