//! Stitchcart - Cart Aggregation & Coupon Pricing Service
//!
//! The cart backend of a print-on-demand storefront. Cart items are trees of
//! product → color variant → size → quantity; this crate owns their merge
//! rules, the layered totals computed over them, coupon validation and
//! discount math, and the read-side gate run before checkout.
//!
//! ## Layout
//! - [`domain`]: the cart document, the pure variant merge, coupons, and
//!   resolved catalog views
//! - [`store`]: repository traits plus Postgres and in-memory backends
//! - [`service`]: CartStore, CartItemEditor, CartAggregator, CouponEngine,
//!   CheckoutValidator
//! - [`http`]: the axum surface

pub mod domain;
pub mod error;
pub mod http;
pub mod service;
pub mod store;

pub use error::{CartError, Result};
