//! Cart aggregate.
//!
//! One active cart per user. Items are keyed by `(product_id, design_id)`;
//! each item holds a variant → size → quantity tree. Persisted as a single
//! document row, so the whole tree round-trips through serde.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Round a money amount to 2 decimal places. Applied once per atomic
/// contribution (a single size line); aggregates sum already-rounded values
/// and are never re-rounded.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    pub is_active: bool,
    pub coupon_code: Option<String>,
    pub discount_total: Decimal,
    /// Optimistic-concurrency counter; every persisted write is a
    /// compare-and-swap on `(id, version)`.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub design_id: Option<Uuid>,
    pub variants: Vec<VariantQuantity>,
    pub is_selected: bool,
    pub is_design_item: bool,
    /// Unit price snapshot taken when the item entered the cart.
    pub price: Decimal,
    pub design_data: Option<DesignData>,
}

/// Invariant: `sizes` is never empty in a persisted cart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VariantQuantity {
    pub variant_id: Uuid,
    pub sizes: Vec<SizeQuantity>,
}

/// Invariant: `quantity > 0` in a persisted cart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SizeQuantity {
    pub size_id: Uuid,
    pub quantity: u32,
}

/// Denormalized design preview, snapshotted onto design items.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignData {
    pub name: String,
    pub preview_images: Vec<String>,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            items: vec![],
            is_active: true,
            coupon_code: None,
            discount_total: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item lookup by identity: a regular item matches on `(product, None)`,
    /// a design item on `(product, Some(design))`.
    pub fn find_item_mut(
        &mut self,
        product_id: Uuid,
        design_id: Option<Uuid>,
    ) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|i| i.product_id == product_id && i.design_id == design_id)
    }

    pub fn item_by_id(&self, item_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl CartItem {
    pub fn regular(
        product_id: Uuid,
        price: Decimal,
        variants: Vec<VariantQuantity>,
        is_selected: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            design_id: None,
            variants,
            is_selected,
            is_design_item: false,
            price,
            design_data: None,
        }
    }

    pub fn design(
        product_id: Uuid,
        design_id: Uuid,
        price: Decimal,
        variants: Vec<VariantQuantity>,
        is_selected: bool,
        design_data: DesignData,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            design_id: Some(design_id),
            variants,
            is_selected,
            is_design_item: true,
            price,
            design_data: Some(design_data),
        }
    }

    /// Σ round2(price × quantity) over every size line, rounded per line.
    pub fn total(&self) -> Decimal {
        self.variants.iter().map(|v| v.total(self.price)).sum()
    }

    pub fn quantity(&self) -> u32 {
        self.variants.iter().map(VariantQuantity::quantity).sum()
    }
}

impl VariantQuantity {
    pub fn new(variant_id: Uuid, sizes: Vec<SizeQuantity>) -> Self {
        Self { variant_id, sizes }
    }

    pub fn total(&self, unit_price: Decimal) -> Decimal {
        self.sizes
            .iter()
            .map(|s| round2(unit_price * Decimal::from(s.quantity)))
            .sum()
    }

    pub fn quantity(&self) -> u32 {
        self.sizes.iter().map(|s| s.quantity).sum()
    }
}
