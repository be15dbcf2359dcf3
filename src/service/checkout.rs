//! Checkout gate: confirms every selected item is still sellable.
//!
//! Collects every violation into one BadRequest so the caller can render
//! the complete list in a single pass, instead of failing on the first.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::domain::ResolvedProduct;
use crate::error::{CartError, Result};
use crate::service::aggregator::{CartAggregator, CartDetail};
use crate::service::cart_store::CartStore;
use crate::store::CatalogProvider;

pub struct CheckoutValidator {
    store: Arc<CartStore>,
    catalog: Arc<dyn CatalogProvider>,
    aggregator: Arc<CartAggregator>,
}

impl CheckoutValidator {
    pub fn new(
        store: Arc<CartStore>,
        catalog: Arc<dyn CatalogProvider>,
        aggregator: Arc<CartAggregator>,
    ) -> Self {
        Self { store, catalog, aggregator }
    }

    /// Validate the selected subset of the user's cart against the live
    /// catalog. On success returns the cart detail projection.
    #[instrument(skip(self))]
    pub async fn validate_for_checkout(&self, user_id: Uuid) -> Result<CartDetail> {
        let cart = self.store.get(user_id).await?;
        if cart.is_empty() {
            return Err(CartError::bad_request("your cart is empty"));
        }
        let selected: Vec<_> = cart.items.iter().filter(|i| i.is_selected).collect();
        if selected.is_empty() {
            return Err(CartError::bad_request("no items are selected for checkout"));
        }

        let mut products: HashMap<Uuid, Option<ResolvedProduct>> = HashMap::new();
        let mut violations: Vec<String> = Vec::new();

        for item in selected {
            if !products.contains_key(&item.product_id) {
                let product = self.catalog.get_product(item.product_id).await?;
                products.insert(item.product_id, product);
            }
            let Some(product) = &products[&item.product_id] else {
                violations.push(format!("product {} is no longer available", item.product_id));
                continue;
            };
            if product.stock_status.is_stockout() {
                violations.push(format!("{} is out of stock", product.name));
                continue;
            }
            for variant in &item.variants {
                let Some(resolved) = product.variant(variant.variant_id) else {
                    violations.push(format!(
                        "a color of {} is no longer available",
                        product.name
                    ));
                    continue;
                };
                if resolved.stock_status.is_stockout() {
                    violations.push(format!(
                        "{} ({}) is out of stock",
                        product.name, resolved.color
                    ));
                    continue;
                }
                for size in &variant.sizes {
                    if !resolved.offers_size(size.size_id) {
                        violations.push(format!(
                            "a size of {} ({}) is no longer offered",
                            product.name, resolved.color
                        ));
                    }
                }
                if let Some(stock) = resolved.stock_quantity {
                    let requested = variant.quantity();
                    if requested > stock {
                        violations.push(format!(
                            "requested {} of {} ({}) but only {} in stock",
                            requested, product.name, resolved.color, stock
                        ));
                    }
                }
            }
        }

        if !violations.is_empty() {
            return Err(CartError::BadRequest(violations.join("; ")));
        }
        self.aggregator.cart_details(user_id, Some(cart)).await
    }
}
