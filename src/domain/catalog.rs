//! Resolved catalog views.
//!
//! The product/size/design catalog belongs to collaborator services. Cart
//! validation never touches their raw documents; a resolution step assembles
//! these typed views once per request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    Stockout,
}

impl StockStatus {
    pub fn is_stockout(self) -> bool {
        self == Self::Stockout
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedProduct {
    pub id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub discounted_price: Decimal,
    pub stock_status: StockStatus,
    pub variants: Vec<ResolvedVariant>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedVariant {
    pub id: Uuid,
    pub color: String,
    /// Sizes currently offered for this color.
    pub sizes: Vec<Uuid>,
    pub stock_status: StockStatus,
    /// Known sellable units, when the catalog tracks a count.
    pub stock_quantity: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedSize {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedDesign {
    pub id: Uuid,
    pub base_product_id: Uuid,
    pub name: String,
    pub preview_images: Vec<String>,
}

impl ResolvedProduct {
    pub fn variant(&self, variant_id: Uuid) -> Option<&ResolvedVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

impl ResolvedVariant {
    pub fn offers_size(&self, size_id: Uuid) -> bool {
        self.sizes.contains(&size_id)
    }
}
