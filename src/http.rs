//! HTTP surface.
//!
//! Thin handlers over the cart services. The caller's identity arrives as
//! an `x-user-id` header set by the upstream auth layer; no authentication
//! happens here.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use validator::Validate;

use crate::domain::merge::VariantChange;
use crate::error::{CartError, Result};
use crate::service::{CartDetail, CartServices};

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<CartServices>,
}

pub fn router(services: Arc<CartServices>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/cart", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/items", post(add_item))
        .route("/api/v1/cart/design-items", post(add_design_item))
        .route("/api/v1/cart/items/:id", put(update_item).delete(remove_item))
        .route("/api/v1/cart/coupon", post(apply_coupon).delete(remove_coupon))
        .route("/api/v1/cart/checkout/validate", post(validate_checkout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { services })
}

fn caller_id(headers: &HeaderMap) -> Result<Uuid> {
    let value = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CartError::bad_request("missing x-user-id header"))?;
    value
        .parse()
        .map_err(|_| CartError::bad_request("x-user-id is not a valid UUID"))
}

fn check<T: Validate>(payload: &T) -> Result<()> {
    payload.validate().map_err(|e| CartError::bad_request(e.to_string()))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "stitchcart" }))
}

async fn get_cart(State(s): State<AppState>, headers: HeaderMap) -> Result<Json<CartDetail>> {
    let user_id = caller_id(&headers)?;
    Ok(Json(s.services.aggregator.cart_details(user_id, None).await?))
}

fn default_selected() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(length(min = 1, message = "at least one variant is required"))]
    pub variants: Vec<VariantChange>,
    #[serde(default = "default_selected")]
    pub is_selected: bool,
}

async fn add_item(
    State(s): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartDetail>> {
    let user_id = caller_id(&headers)?;
    check(&req)?;
    let detail = s
        .services
        .editor
        .add_product_to_cart(user_id, req.product_id, req.variants, req.is_selected)
        .await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddDesignItemRequest {
    pub design_id: Uuid,
    #[validate(length(min = 1, message = "at least one variant is required"))]
    pub variants: Vec<VariantChange>,
    #[serde(default = "default_selected")]
    pub is_selected: bool,
}

async fn add_design_item(
    State(s): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddDesignItemRequest>,
) -> Result<Json<CartDetail>> {
    let user_id = caller_id(&headers)?;
    check(&req)?;
    let detail = s
        .services
        .editor
        .add_design_to_cart(user_id, req.design_id, req.variants, req.is_selected)
        .await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    /// Absolute quantities; omitted leaves the tree untouched, an empty
    /// list on a variant clears that variant.
    pub variants: Option<Vec<VariantChange>>,
    pub is_selected: Option<bool>,
}

async fn update_item(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartDetail>> {
    let user_id = caller_id(&headers)?;
    let detail = s
        .services
        .editor
        .update_cart_item(user_id, item_id, req.variants, req.is_selected)
        .await?;
    Ok(Json(detail))
}

async fn remove_item(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<Uuid>,
) -> Result<Json<CartDetail>> {
    let user_id = caller_id(&headers)?;
    Ok(Json(s.services.editor.remove_cart_item(user_id, item_id).await?))
}

async fn clear_cart(State(s): State<AppState>, headers: HeaderMap) -> Result<Json<CartDetail>> {
    let user_id = caller_id(&headers)?;
    Ok(Json(s.services.editor.clear_cart(user_id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
}

async fn apply_coupon(
    State(s): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ApplyCouponRequest>,
) -> Result<Json<CartDetail>> {
    let user_id = caller_id(&headers)?;
    check(&req)?;
    let cart = s.services.coupons.apply_coupon(user_id, &req.code).await?;
    Ok(Json(s.services.aggregator.cart_details(user_id, Some(cart)).await?))
}

async fn remove_coupon(State(s): State<AppState>, headers: HeaderMap) -> Result<Json<CartDetail>> {
    let user_id = caller_id(&headers)?;
    let cart = s.services.coupons.remove_coupon(user_id).await?;
    Ok(Json(s.services.aggregator.cart_details(user_id, Some(cart)).await?))
}

async fn validate_checkout(
    State(s): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CartDetail>> {
    let user_id = caller_id(&headers)?;
    Ok(Json(s.services.checkout.validate_for_checkout(user_id).await?))
}
