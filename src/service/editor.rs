//! Cart item mutations: add product, add design, update, remove, clear.
//!
//! Every operation validates against the resolved catalog first, then runs a
//! read-merge-save loop with bounded retry on write conflicts, and finally
//! returns the recomputed cart detail.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::domain::cart::{CartItem, DesignData};
use crate::domain::merge::{merge_variants, MergeMode, SizeChange, VariantChange};
use crate::domain::{ResolvedProduct, ResolvedVariant};
use crate::error::{CartError, Result};
use crate::service::aggregator::{CartAggregator, CartDetail};
use crate::service::cart_store::{CartStore, WRITE_RETRIES};
use crate::store::{CatalogProvider, DesignProvider};

pub struct CartItemEditor {
    store: Arc<CartStore>,
    catalog: Arc<dyn CatalogProvider>,
    designs: Arc<dyn DesignProvider>,
    aggregator: Arc<CartAggregator>,
}

impl CartItemEditor {
    pub fn new(
        store: Arc<CartStore>,
        catalog: Arc<dyn CatalogProvider>,
        designs: Arc<dyn DesignProvider>,
        aggregator: Arc<CartAggregator>,
    ) -> Self {
        Self { store, catalog, designs, aggregator }
    }

    /// Add quantities of a plain catalog product. Merging into an existing
    /// line is additive: requesting 3 of a size already at 2 stores 5.
    #[instrument(skip(self, changes))]
    pub async fn add_product_to_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        changes: Vec<VariantChange>,
        is_selected: bool,
    ) -> Result<CartDetail> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| CartError::not_found("product"))?;
        let changes = validate_additions(&product, &changes)?;

        for _ in 0..WRITE_RETRIES {
            let mut cart = self.store.get_or_create(user_id).await?;
            match cart.find_item_mut(product_id, None) {
                Some(item) => {
                    item.variants = merge_variants(&item.variants, &changes, MergeMode::Additive);
                }
                None => {
                    let variants = merge_variants(&[], &changes, MergeMode::Additive);
                    cart.items.push(CartItem::regular(
                        product_id,
                        product.discounted_price,
                        variants,
                        is_selected,
                    ));
                }
            }
            match self.store.save(&mut cart).await {
                Ok(()) => return self.aggregator.cart_details(user_id, Some(cart)).await,
                Err(CartError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CartError::Storage("cart write kept conflicting".into()))
    }

    /// Add quantities of a user-authored design. Variants and sizes resolve
    /// from the design's base product; the new item snapshots the design
    /// preview and the base product's discounted price.
    #[instrument(skip(self, changes))]
    pub async fn add_design_to_cart(
        &self,
        user_id: Uuid,
        design_id: Uuid,
        changes: Vec<VariantChange>,
        is_selected: bool,
    ) -> Result<CartDetail> {
        let design = self
            .designs
            .get_active_user_design(user_id, design_id)
            .await?
            .ok_or_else(|| CartError::not_found("design"))?;
        let product = self
            .catalog
            .get_product(design.base_product_id)
            .await?
            .ok_or_else(|| CartError::not_found("product"))?;
        let changes = validate_additions(&product, &changes)?;

        for _ in 0..WRITE_RETRIES {
            let mut cart = self.store.get_or_create(user_id).await?;
            match cart.find_item_mut(product.id, Some(design.id)) {
                Some(item) => {
                    item.variants = merge_variants(&item.variants, &changes, MergeMode::Additive);
                }
                None => {
                    let variants = merge_variants(&[], &changes, MergeMode::Additive);
                    cart.items.push(CartItem::design(
                        product.id,
                        design.id,
                        product.discounted_price,
                        variants,
                        is_selected,
                        DesignData {
                            name: design.name.clone(),
                            preview_images: design.preview_images.clone(),
                        },
                    ));
                }
            }
            match self.store.save(&mut cart).await {
                Ok(()) => return self.aggregator.cart_details(user_id, Some(cart)).await,
                Err(CartError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CartError::Storage("cart write kept conflicting".into()))
    }

    /// Edit one cart line. Incoming quantities are absolute (overwrite
    /// semantics): zero or negative deletes the size, an explicit empty size
    /// list clears the variant, and an item whose last variant goes away is
    /// removed from the cart. `is_selected`, when given, is set as-is.
    #[instrument(skip(self, changes, is_selected))]
    pub async fn update_cart_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        changes: Option<Vec<VariantChange>>,
        is_selected: Option<bool>,
    ) -> Result<CartDetail> {
        for _ in 0..WRITE_RETRIES {
            let mut cart = self.store.get(user_id).await?;
            let pos = cart
                .items
                .iter()
                .position(|i| i.id == item_id)
                .ok_or_else(|| CartError::not_found("cart item"))?;

            if let Some(changes) = &changes {
                // Only variants newly entering the item need catalog
                // re-validation; pure reductions of existing ones do not.
                let item = &cart.items[pos];
                let introduced: Vec<&VariantChange> = changes
                    .iter()
                    .filter(|c| {
                        c.is_additive()
                            && !item.variants.iter().any(|v| v.variant_id == c.variant_id)
                    })
                    .collect();
                if !introduced.is_empty() {
                    let product = self
                        .catalog
                        .get_product(item.product_id)
                        .await?
                        .ok_or_else(|| CartError::not_found("product"))?;
                    for change in introduced {
                        let variant = lookup_variant(&product, change.variant_id)?;
                        check_variant_sellable(&product, variant)?;
                        check_sizes_offered(variant, &change.sizes)?;
                    }
                }

                let item = &mut cart.items[pos];
                item.variants = merge_variants(&item.variants, changes, MergeMode::Overwrite);
                if item.variants.is_empty() {
                    cart.items.remove(pos);
                }
            }

            if let Some(selected) = is_selected {
                if let Some(item) = cart.items.iter_mut().find(|i| i.id == item_id) {
                    item.is_selected = selected;
                }
            }

            match self.store.save(&mut cart).await {
                Ok(()) => return self.aggregator.cart_details(user_id, Some(cart)).await,
                Err(CartError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CartError::Storage("cart write kept conflicting".into()))
    }

    #[instrument(skip(self))]
    pub async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartDetail> {
        for _ in 0..WRITE_RETRIES {
            let mut cart = self.store.get(user_id).await?;
            let before = cart.items.len();
            cart.items.retain(|i| i.id != item_id);
            if cart.items.len() == before {
                return Err(CartError::not_found("cart item"));
            }
            match self.store.save(&mut cart).await {
                Ok(()) => return self.aggregator.cart_details(user_id, Some(cart)).await,
                Err(CartError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CartError::Storage("cart write kept conflicting".into()))
    }

    /// Empty the cart. Also detaches any applied coupon: an empty cart can
    /// no longer satisfy its constraints.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<CartDetail> {
        for _ in 0..WRITE_RETRIES {
            let mut cart = self.store.get_or_create(user_id).await?;
            cart.items.clear();
            cart.coupon_code = None;
            cart.discount_total = rust_decimal::Decimal::ZERO;
            match self.store.save(&mut cart).await {
                Ok(()) => return self.aggregator.cart_details(user_id, Some(cart)).await,
                Err(CartError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CartError::Storage("cart write kept conflicting".into()))
    }
}

/// Add-path validation: each requested variant must exist and be sellable,
/// and at least one requested size with a positive quantity must be among
/// the variant's offered sizes. Returns the changes filtered to positive
/// quantities.
fn validate_additions(
    product: &ResolvedProduct,
    changes: &[VariantChange],
) -> Result<Vec<VariantChange>> {
    let mut validated = Vec::with_capacity(changes.len());
    for change in changes {
        let variant = lookup_variant(product, change.variant_id)?;
        check_variant_sellable(product, variant)?;
        let sizes: Vec<SizeChange> =
            change.sizes.iter().filter(|s| s.quantity > 0).cloned().collect();
        if sizes.is_empty() {
            return Err(CartError::bad_request(format!(
                "no positive quantities requested for {} ({})",
                product.name, variant.color
            )));
        }
        check_sizes_offered(variant, &sizes)?;
        validated.push(VariantChange { variant_id: change.variant_id, sizes });
    }
    Ok(validated)
}

fn lookup_variant(product: &ResolvedProduct, variant_id: Uuid) -> Result<&ResolvedVariant> {
    product
        .variant(variant_id)
        .ok_or_else(|| CartError::not_found(format!("variant {variant_id}")))
}

fn check_variant_sellable(product: &ResolvedProduct, variant: &ResolvedVariant) -> Result<()> {
    if variant.stock_status.is_stockout() {
        return Err(CartError::bad_request(format!(
            "{} ({}) is out of stock",
            product.name, variant.color
        )));
    }
    Ok(())
}

fn check_sizes_offered(variant: &ResolvedVariant, sizes: &[SizeChange]) -> Result<()> {
    for size in sizes.iter().filter(|s| s.quantity > 0) {
        if !variant.offers_size(size.size_id) {
            return Err(CartError::bad_request(format!(
                "size {} is not offered in color {}",
                size.size_id, variant.color
            )));
        }
    }
    Ok(())
}
