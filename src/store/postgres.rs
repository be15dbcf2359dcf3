//! Postgres implementations of the store seams.
//!
//! The cart is persisted as one row per active cart with the item tree in a
//! JSONB column; a partial unique index on `(user_id) WHERE is_active`
//! enforces one active cart per user and turns the concurrent-creation race
//! into a unique violation we can catch. Catalog and design lookups are
//! read-only selects against collaborator-owned tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Cart, CartItem, Coupon, DiscountKind, ResolvedDesign, ResolvedProduct, ResolvedSize,
    ResolvedVariant, StockStatus,
};
use crate::error::{CartError, Result};
use crate::store::{CartRepository, CatalogProvider, CouponRepository, DesignProvider};

pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<CartItem>>,
    is_active: bool,
    coupon_code: Option<String>,
    discount_total: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Cart {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            is_active: row.is_active,
            coupon_code: row.coupon_code,
            discount_total: row.discount_total,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn find_active(&self, user_id: Uuid) -> Result<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT * FROM carts WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Cart::from))
    }

    async fn insert(&self, cart: &Cart) -> Result<()> {
        sqlx::query(
            "INSERT INTO carts (id, user_id, items, is_active, coupon_code, discount_total, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(cart.id)
        .bind(cart.user_id)
        .bind(Json(&cart.items))
        .bind(cart.is_active)
        .bind(&cart.coupon_code)
        .bind(cart.discount_total)
        .bind(cart.version)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => CartError::Conflict,
            _ => CartError::from(e),
        })?;
        Ok(())
    }

    async fn update(&self, cart: &Cart) -> Result<()> {
        let result = sqlx::query(
            "UPDATE carts SET items = $3, is_active = $4, coupon_code = $5, discount_total = $6, \
             version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND version = $2",
        )
        .bind(cart.id)
        .bind(cart.version)
        .bind(Json(&cart.items))
        .bind(cart.is_active)
        .bind(&cart.coupon_code)
        .bind(cart.discount_total)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CartError::Conflict);
        }
        Ok(())
    }
}

pub struct PgCouponRepository {
    pool: PgPool,
}

impl PgCouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    name: String,
    thumbnail: Option<String>,
    kind: String,
    value: Decimal,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    usage_limit: Option<i32>,
    per_user_limit: Option<i32>,
    used_count: i32,
    used_by: Vec<Uuid>,
    category_id: Option<Uuid>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Coupon {
            id: row.id,
            code: row.code,
            name: row.name,
            thumbnail: row.thumbnail,
            kind: if row.kind == "fixed" { DiscountKind::Fixed } else { DiscountKind::Percentage },
            value: row.value,
            start_date: row.start_date,
            end_date: row.end_date,
            is_active: row.is_active,
            usage_limit: row.usage_limit.map(|n| n.max(0) as u32),
            per_user_limit: row.per_user_limit.map(|n| n.max(0) as u32),
            used_count: row.used_count.max(0) as u32,
            used_by: row.used_by,
            category_id: row.category_id,
        }
    }
}

#[async_trait]
impl CouponRepository for PgCouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Coupon::from))
    }

    async fn record_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE coupons SET used_count = used_count + 1, used_by = array_append(used_by, $2) \
             WHERE id = $1",
        )
        .bind(coupon_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CartError::not_found("coupon"));
        }
        Ok(())
    }
}

/// Read-only view onto the catalog collaborator's tables.
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_stock(status: &str) -> StockStatus {
    if status == "stockout" { StockStatus::Stockout } else { StockStatus::InStock }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    category_id: Option<Uuid>,
    discounted_price: Decimal,
    stock_status: String,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    color: String,
    sizes: Vec<Uuid>,
    stock_status: String,
    stock_quantity: Option<i32>,
}

#[async_trait]
impl CatalogProvider for PgCatalog {
    async fn get_product(&self, product_id: Uuid) -> Result<Option<ResolvedProduct>> {
        let product = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, category_id, discounted_price, stock_status FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(product) = product else { return Ok(None) };

        let variants = sqlx::query_as::<_, VariantRow>(
            "SELECT id, color, sizes, stock_status, stock_quantity \
             FROM product_variants WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ResolvedProduct {
            id: product.id,
            name: product.name,
            category_id: product.category_id,
            discounted_price: product.discounted_price,
            stock_status: parse_stock(&product.stock_status),
            variants: variants
                .into_iter()
                .map(|v| ResolvedVariant {
                    id: v.id,
                    color: v.color,
                    sizes: v.sizes,
                    stock_status: parse_stock(&v.stock_status),
                    stock_quantity: v.stock_quantity.map(|n| n.max(0) as u32),
                })
                .collect(),
        }))
    }

    async fn get_size(&self, size_id: Uuid) -> Result<Option<ResolvedSize>> {
        let row = sqlx::query_as::<_, ResolvedSizeRow>("SELECT id, name FROM sizes WHERE id = $1")
            .bind(size_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| ResolvedSize { id: r.id, name: r.name }))
    }
}

#[derive(sqlx::FromRow)]
struct ResolvedSizeRow {
    id: Uuid,
    name: String,
}

/// Read-only view onto the design collaborator's table.
pub struct PgDesigns {
    pool: PgPool,
}

impl PgDesigns {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DesignRow {
    id: Uuid,
    base_product_id: Uuid,
    name: String,
    preview_images: Vec<String>,
}

#[async_trait]
impl DesignProvider for PgDesigns {
    async fn get_active_user_design(
        &self,
        user_id: Uuid,
        design_id: Uuid,
    ) -> Result<Option<ResolvedDesign>> {
        let row = sqlx::query_as::<_, DesignRow>(
            "SELECT id, base_product_id, name, preview_images \
             FROM designs WHERE id = $1 AND user_id = $2 AND is_active",
        )
        .bind(design_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|d| ResolvedDesign {
            id: d.id,
            base_product_id: d.base_product_id,
            name: d.name,
            preview_images: d.preview_images,
        }))
    }
}
