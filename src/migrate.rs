//! Schema migrations for the catalog database.
//!
//! Every statement is idempotent, so `advisor init` can be run repeatedly.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Apply the schema to an open pool.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // RAM and storage variants are stored as JSON arrays in TEXT columns.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phones (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model_name TEXT NOT NULL,
            release_date TEXT,
            display_size_inches REAL,
            display_type TEXT,
            display_resolution TEXT,
            display_refresh_rate_hz INTEGER,
            processor TEXT,
            ram_options_gb TEXT,
            storage_options_gb TEXT,
            battery_mah INTEGER,
            main_camera_mp REAL,
            main_camera_aperture TEXT,
            ultrawide_camera_mp REAL,
            telephoto_camera_mp REAL,
            price_usd REAL,
            has_5g INTEGER,
            ip_rating TEXT,
            weight_g REAL,
            android_version TEXT,
            source_url TEXT,
            updated_at INTEGER NOT NULL,
            UNIQUE(model_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_phones_model_name ON phones(model_name)",
        "CREATE INDEX IF NOT EXISTS idx_phones_battery ON phones(battery_mah DESC)",
        "CREATE INDEX IF NOT EXISTS idx_phones_price ON phones(price_usd)",
        "CREATE INDEX IF NOT EXISTS idx_phones_main_camera ON phones(main_camera_mp DESC)",
        "CREATE INDEX IF NOT EXISTS idx_phones_price_battery ON phones(price_usd, battery_mah DESC)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
