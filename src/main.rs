//! Stitchcart - cart aggregation and coupon pricing service.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stitchcart::service::CartServices;
use stitchcart::store::postgres::{PgCartRepository, PgCatalog, PgCouponRepository, PgDesigns};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let services = CartServices::new(
        Arc::new(PgCartRepository::new(db.clone())),
        Arc::new(PgCouponRepository::new(db.clone())),
        Arc::new(PgCatalog::new(db.clone())),
        Arc::new(PgDesigns::new(db)),
    );
    let app = stitchcart::http::router(services);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    tracing::info!("stitchcart listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
