//! Domain model: the cart document, the variant merge rules, coupons, and
//! the resolved catalog views consumed from the collaborator services.

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod merge;

pub use cart::{Cart, CartItem, DesignData, SizeQuantity, VariantQuantity};
pub use catalog::{ResolvedDesign, ResolvedProduct, ResolvedSize, ResolvedVariant, StockStatus};
pub use coupon::{Coupon, DiscountKind};
pub use merge::{merge_variants, MergeMode, SizeChange, VariantChange};
