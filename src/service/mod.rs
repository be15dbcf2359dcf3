//! Cart services: persistence access, item editing, aggregation, coupons,
//! and the checkout gate.

pub mod aggregator;
pub mod cart_store;
pub mod checkout;
pub mod coupon;
pub mod editor;

use std::sync::Arc;

pub use aggregator::{CartAggregator, CartDetail, CartItemDetail, SizeDetail, VariantDetail};
pub use cart_store::CartStore;
pub use checkout::CheckoutValidator;
pub use coupon::{CouponEngine, ItemPricing};
pub use editor::CartItemEditor;

use crate::store::{CartRepository, CatalogProvider, CouponRepository, DesignProvider};

/// The wired service graph, shared by the HTTP layer and the tests.
pub struct CartServices {
    pub store: Arc<CartStore>,
    pub editor: Arc<CartItemEditor>,
    pub aggregator: Arc<CartAggregator>,
    pub coupons: Arc<CouponEngine>,
    pub checkout: Arc<CheckoutValidator>,
}

impl CartServices {
    pub fn new(
        carts: Arc<dyn CartRepository>,
        coupons: Arc<dyn CouponRepository>,
        catalog: Arc<dyn CatalogProvider>,
        designs: Arc<dyn DesignProvider>,
    ) -> Arc<Self> {
        let store = Arc::new(CartStore::new(carts));
        let engine = Arc::new(CouponEngine::new(coupons, store.clone(), catalog.clone()));
        let aggregator =
            Arc::new(CartAggregator::new(store.clone(), catalog.clone(), engine.clone()));
        let editor = Arc::new(CartItemEditor::new(
            store.clone(),
            catalog.clone(),
            designs,
            aggregator.clone(),
        ));
        let checkout =
            Arc::new(CheckoutValidator::new(store.clone(), catalog, aggregator.clone()));
        Arc::new(Self { store, editor, aggregator, coupons: engine, checkout })
    }
}
