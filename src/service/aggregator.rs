//! Read-side cart projection.
//!
//! Turns the persisted cart plus live catalog lookups into the detail
//! response: per-size, per-variant, per-item and cart-level totals, the
//! selected-only subset, and the coupon discount. Dangling items and stale
//! coupons are repaired in place; those repair writes are best-effort and
//! never fail the read.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::domain::cart::{round2, Cart, DesignData};
use crate::domain::ResolvedProduct;
use crate::error::{CartError, Result};
use crate::service::cart_store::CartStore;
use crate::service::coupon::{CouponEngine, ItemPricing};
use crate::store::CatalogProvider;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItemDetail>,
    pub items_total: Decimal,
    pub total_quantity: u32,
    pub variant_count: u32,
    pub selected_items_total: Decimal,
    pub selected_total_quantity: u32,
    pub coupon_code: Option<String>,
    pub discount_total: Decimal,
    pub selected_discount_total: Decimal,
    pub total_amount: Decimal,
    pub selected_total_amount: Decimal,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub design_id: Option<Uuid>,
    pub design_data: Option<DesignData>,
    pub is_selected: bool,
    pub is_design_item: bool,
    pub unit_price: Decimal,
    pub variants: Vec<VariantDetail>,
    pub item_total: Decimal,
    pub quantity: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDetail {
    pub variant_id: Uuid,
    pub color: String,
    pub sizes: Vec<SizeDetail>,
    pub variant_total: Decimal,
    pub quantity: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeDetail {
    pub size_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub size_total: Decimal,
}

pub struct CartAggregator {
    store: Arc<CartStore>,
    catalog: Arc<dyn CatalogProvider>,
    engine: Arc<CouponEngine>,
}

impl CartAggregator {
    pub fn new(
        store: Arc<CartStore>,
        catalog: Arc<dyn CatalogProvider>,
        engine: Arc<CouponEngine>,
    ) -> Self {
        Self { store, catalog, engine }
    }

    /// Build the detail projection for the user's active cart (created
    /// lazily when absent, fetched when `cart` is not supplied).
    #[instrument(skip(self, cart))]
    pub async fn cart_details(&self, user_id: Uuid, cart: Option<Cart>) -> Result<CartDetail> {
        let mut cart = match cart {
            Some(cart) => cart,
            None => self.store.get_or_create(user_id).await?,
        };

        let products = self.cleanup_dangling_items(&mut cart).await?;

        let mut size_names: HashMap<Uuid, String> = HashMap::new();
        let mut items = Vec::with_capacity(cart.items.len());
        let mut pricings = Vec::with_capacity(cart.items.len());
        let mut items_total = Decimal::ZERO;
        let mut selected_items_total = Decimal::ZERO;
        let mut total_quantity = 0u32;
        let mut selected_total_quantity = 0u32;
        let mut variant_count = 0u32;

        for item in &cart.items {
            let product = &products[&item.product_id];
            let mut variants = Vec::with_capacity(item.variants.len());
            let mut item_total = Decimal::ZERO;
            let mut item_quantity = 0u32;

            for variant in &item.variants {
                let color = product
                    .variant(variant.variant_id)
                    .map(|v| v.color.clone())
                    .unwrap_or_default();
                let mut sizes = Vec::with_capacity(variant.sizes.len());
                let mut variant_total = Decimal::ZERO;
                let mut quantity = 0u32;
                for size in &variant.sizes {
                    let size_total = round2(item.price * Decimal::from(size.quantity));
                    variant_total += size_total;
                    quantity += size.quantity;
                    sizes.push(SizeDetail {
                        size_id: size.size_id,
                        name: self.size_name(&mut size_names, size.size_id).await?,
                        quantity: size.quantity,
                        size_total,
                    });
                }
                item_total += variant_total;
                item_quantity += quantity;
                variants.push(VariantDetail {
                    variant_id: variant.variant_id,
                    color,
                    sizes,
                    variant_total,
                    quantity,
                });
            }

            variant_count += variants.len() as u32;
            items_total += item_total;
            total_quantity += item_quantity;
            if item.is_selected {
                selected_items_total += item_total;
                selected_total_quantity += item_quantity;
            }
            pricings.push(ItemPricing {
                product_id: item.product_id,
                category_id: product.category_id,
                is_selected: item.is_selected,
                total: item_total,
            });
            items.push(CartItemDetail {
                id: item.id,
                product_id: item.product_id,
                product_name: product.name.clone(),
                design_id: item.design_id,
                design_data: item.design_data.clone(),
                is_selected: item.is_selected,
                is_design_item: item.is_design_item,
                unit_price: item.price,
                variants,
                item_total,
                quantity: item_quantity,
            });
        }

        let (coupon_code, discount_total, selected_discount_total) = self
            .resolve_discount(&mut cart, &pricings, items_total, selected_items_total)
            .await?;

        Ok(CartDetail {
            id: cart.id,
            user_id: cart.user_id,
            items,
            items_total,
            total_quantity,
            variant_count,
            selected_items_total,
            selected_total_quantity,
            coupon_code,
            discount_total,
            selected_discount_total,
            total_amount: (items_total - discount_total).max(Decimal::ZERO),
            selected_total_amount: (selected_items_total - selected_discount_total)
                .max(Decimal::ZERO),
        })
    }

    /// Drop items whose product no longer resolves or whose variant list is
    /// empty; persist the cleanup best-effort if anything was dropped.
    /// Returns the resolved products for the surviving items.
    async fn cleanup_dangling_items(
        &self,
        cart: &mut Cart,
    ) -> Result<HashMap<Uuid, ResolvedProduct>> {
        let mut products: HashMap<Uuid, ResolvedProduct> = HashMap::new();
        let mut unresolved: HashSet<Uuid> = HashSet::new();
        let mut kept = Vec::with_capacity(cart.items.len());
        let mut dropped = false;

        for item in std::mem::take(&mut cart.items) {
            if item.variants.is_empty() {
                dropped = true;
                continue;
            }
            if !products.contains_key(&item.product_id) && !unresolved.contains(&item.product_id) {
                match self.catalog.get_product(item.product_id).await? {
                    Some(product) => {
                        products.insert(item.product_id, product);
                    }
                    None => {
                        unresolved.insert(item.product_id);
                    }
                }
            }
            if products.contains_key(&item.product_id) {
                kept.push(item);
            } else {
                dropped = true;
            }
        }
        cart.items = kept;

        if dropped {
            if let Err(e) = self.store.save(cart).await {
                warn!(cart_id = %cart.id, error = %e, "could not persist cart cleanup");
            }
        }
        Ok(products)
    }

    /// Re-validate an applied coupon and compute both discounts. A coupon
    /// that no longer validates is detached from the cart (repair-on-read)
    /// and reported as a zero discount, never as an error.
    async fn resolve_discount(
        &self,
        cart: &mut Cart,
        pricings: &[ItemPricing],
        items_total: Decimal,
        selected_items_total: Decimal,
    ) -> Result<(Option<String>, Decimal, Decimal)> {
        let Some(code) = cart.coupon_code.clone() else {
            return Ok((None, Decimal::ZERO, Decimal::ZERO));
        };
        match self.engine.validate_coupon(&code, cart.user_id, pricings).await {
            Ok(coupon) => {
                let discount = self.engine.calculate_discount(&coupon, items_total, pricings);
                let selected: Vec<ItemPricing> =
                    pricings.iter().filter(|p| p.is_selected).cloned().collect();
                let selected_discount =
                    self.engine
                        .calculate_discount(&coupon, selected_items_total, &selected);
                Ok((Some(code), discount, selected_discount))
            }
            Err(CartError::NotFound(_)) | Err(CartError::BadRequest(_)) => {
                warn!(cart_id = %cart.id, coupon = %code, "detaching stale coupon");
                cart.coupon_code = None;
                cart.discount_total = Decimal::ZERO;
                if let Err(e) = self.store.save(cart).await {
                    warn!(cart_id = %cart.id, error = %e, "could not persist coupon detach");
                }
                Ok((None, Decimal::ZERO, Decimal::ZERO))
            }
            Err(e) => Err(e),
        }
    }

    async fn size_name(&self, cache: &mut HashMap<Uuid, String>, size_id: Uuid) -> Result<String> {
        if let Some(name) = cache.get(&size_id) {
            return Ok(name.clone());
        }
        let name = self
            .catalog
            .get_size(size_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_default();
        cache.insert(size_id, name.clone());
        Ok(name)
    }
}
