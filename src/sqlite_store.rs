//! SQLite-backed [`PhoneStore`] implementation.
//!
//! A [`RetrievalRequest`] is rendered into a single parameterized `SELECT`
//! against the `phones` table. Values are always bound, never interpolated;
//! only column names from the closed [`Field`] set appear in the SQL text.
//!
//! | Request part | SQL |
//! |--------------|-----|
//! | `Equals` / `OneOf` | `col = ?` / `col IN (?, ...)` |
//! | `AtMost` / `AtLeast` | `col <= ?` / `col >= ?` (NULL never matches) |
//! | `Present` | `col IS NOT NULL` |
//! | `ContainsAny` | `EXISTS (SELECT 1 FROM json_each(col) WHERE value IN (...))` |
//! | `Never`, empty sets | `0` |
//! | `ProcessorTier` | `CASE` over `instr(processor, ...)` |
//! | `RamOptionCount` | `json_array_length(ram_options_gb)` |
//!
//! Every sort key is preceded by `expr IS NULL` so unknown values sort last
//! in both directions, and `model_name` breaks remaining ties.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use phone_advisor_core::models::{Field, Phone};
use phone_advisor_core::query::{Constraint, Direction, RetrievalRequest, SortKey};
use phone_advisor_core::store::PhoneStore;

const PHONE_COLUMNS: &str = "model_name, release_date, display_size_inches, display_type, \
    display_resolution, display_refresh_rate_hz, processor, ram_options_gb, storage_options_gb, \
    battery_mah, main_camera_mp, main_camera_aperture, ultrawide_camera_mp, telephoto_camera_mp, \
    price_usd, has_5g, ip_rating, weight_g, android_version, source_url";

/// SQLite implementation of the [`PhoneStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlParam {
    Text(String),
    Real(f64),
    Int(i64),
}

/// SQL text plus its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RenderedQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn render_constraint(field: Field, constraint: &Constraint, params: &mut Vec<SqlParam>) -> String {
    let col = field.column();
    match constraint {
        Constraint::Equals(v) => {
            params.push(SqlParam::Text(v.clone()));
            format!("{} = ?", col)
        }
        Constraint::OneOf(vs) if vs.is_empty() => "0".to_string(),
        Constraint::OneOf(vs) => {
            params.extend(vs.iter().cloned().map(SqlParam::Text));
            format!("{} IN ({})", col, placeholders(vs.len()))
        }
        Constraint::AtMost(v) => {
            params.push(SqlParam::Real(*v));
            format!("{} <= ?", col)
        }
        Constraint::AtLeast(v) => {
            params.push(SqlParam::Real(*v));
            format!("{} >= ?", col)
        }
        Constraint::Present => format!("{} IS NOT NULL", col),
        Constraint::ContainsAny(vs) if vs.is_empty() => "0".to_string(),
        Constraint::ContainsAny(vs) => {
            params.extend(vs.iter().copied().map(SqlParam::Int));
            format!(
                "EXISTS (SELECT 1 FROM json_each({}) WHERE json_each.value IN ({}))",
                col,
                placeholders(vs.len())
            )
        }
        Constraint::Never => "0".to_string(),
    }
}

fn sort_expr(key: SortKey) -> String {
    match key {
        SortKey::Field(field) => field.column().to_string(),
        SortKey::ProcessorTier => "CASE WHEN processor IS NULL THEN NULL \
             WHEN instr(processor, 'Snapdragon 8') > 0 THEN 1 \
             WHEN instr(processor, 'Exynos') > 0 THEN 2 \
             ELSE 3 END"
            .to_string(),
        SortKey::RamOptionCount => "json_array_length(ram_options_gb)".to_string(),
    }
}

/// Render a retrieval request into one parameterized statement.
pub(crate) fn render(request: &RetrievalRequest) -> RenderedQuery {
    let mut params = Vec::new();
    let mut sql = format!("SELECT {} FROM phones", PHONE_COLUMNS);

    let clauses: Vec<String> = request
        .filters
        .iter()
        .map(|(field, constraint)| render_constraint(*field, constraint, &mut params))
        .collect();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let mut order: Vec<String> = Vec::new();
    for o in &request.order_by {
        let expr = sort_expr(o.key);
        let dir = match o.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        order.push(format!("({}) IS NULL", expr));
        order.push(format!("{} {}", expr, dir));
    }
    order.push("model_name ASC".to_string());
    sql.push_str(" ORDER BY ");
    sql.push_str(&order.join(", "));

    sql.push_str(" LIMIT ?");
    params.push(SqlParam::Int(i64::from(request.limit)));

    RenderedQuery { sql, params }
}

fn parse_int_list(raw: Option<String>, column: &str) -> Result<Option<Vec<i64>>> {
    raw.map(|s| {
        serde_json::from_str(&s).with_context(|| format!("Malformed JSON array in {}: {}", column, s))
    })
    .transpose()
}

fn row_to_phone(row: &SqliteRow) -> Result<Phone> {
    Ok(Phone {
        model_name: row.try_get("model_name")?,
        release_date: row.try_get("release_date")?,
        display_size_inches: row.try_get("display_size_inches")?,
        display_type: row.try_get("display_type")?,
        display_resolution: row.try_get("display_resolution")?,
        display_refresh_rate_hz: row.try_get("display_refresh_rate_hz")?,
        processor: row.try_get("processor")?,
        ram_options_gb: parse_int_list(row.try_get("ram_options_gb")?, "ram_options_gb")?,
        storage_options_gb: parse_int_list(
            row.try_get("storage_options_gb")?,
            "storage_options_gb",
        )?,
        battery_mah: row.try_get("battery_mah")?,
        main_camera_mp: row.try_get("main_camera_mp")?,
        main_camera_aperture: row.try_get("main_camera_aperture")?,
        ultrawide_camera_mp: row.try_get("ultrawide_camera_mp")?,
        telephoto_camera_mp: row.try_get("telephoto_camera_mp")?,
        price_usd: row.try_get("price_usd")?,
        has_5g: row.try_get("has_5g")?,
        ip_rating: row.try_get("ip_rating")?,
        weight_g: row.try_get("weight_g")?,
        android_version: row.try_get("android_version")?,
        source_url: row.try_get("source_url")?,
    })
}

fn to_json_list(values: &Option<Vec<i64>>) -> Result<Option<String>> {
    values
        .as_ref()
        .map(|v| serde_json::to_string(v).map_err(anyhow::Error::from))
        .transpose()
}

#[async_trait]
impl PhoneStore for SqliteStore {
    async fn upsert_phone(&self, phone: &Phone) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO phones (model_name, release_date, display_size_inches, display_type,
                                display_resolution, display_refresh_rate_hz, processor,
                                ram_options_gb, storage_options_gb, battery_mah, main_camera_mp,
                                main_camera_aperture, ultrawide_camera_mp, telephoto_camera_mp,
                                price_usd, has_5g, ip_rating, weight_g, android_version,
                                source_url, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(model_name) DO UPDATE SET
                release_date = excluded.release_date,
                display_size_inches = excluded.display_size_inches,
                display_type = excluded.display_type,
                display_resolution = excluded.display_resolution,
                display_refresh_rate_hz = excluded.display_refresh_rate_hz,
                processor = excluded.processor,
                ram_options_gb = excluded.ram_options_gb,
                storage_options_gb = excluded.storage_options_gb,
                battery_mah = excluded.battery_mah,
                main_camera_mp = excluded.main_camera_mp,
                main_camera_aperture = excluded.main_camera_aperture,
                ultrawide_camera_mp = excluded.ultrawide_camera_mp,
                telephoto_camera_mp = excluded.telephoto_camera_mp,
                price_usd = excluded.price_usd,
                has_5g = excluded.has_5g,
                ip_rating = excluded.ip_rating,
                weight_g = excluded.weight_g,
                android_version = excluded.android_version,
                source_url = excluded.source_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&phone.model_name)
        .bind(&phone.release_date)
        .bind(phone.display_size_inches)
        .bind(&phone.display_type)
        .bind(&phone.display_resolution)
        .bind(phone.display_refresh_rate_hz)
        .bind(&phone.processor)
        .bind(to_json_list(&phone.ram_options_gb)?)
        .bind(to_json_list(&phone.storage_options_gb)?)
        .bind(phone.battery_mah)
        .bind(phone.main_camera_mp)
        .bind(&phone.main_camera_aperture)
        .bind(phone.ultrawide_camera_mp)
        .bind(phone.telephoto_camera_mp)
        .bind(phone.price_usd)
        .bind(phone.has_5g)
        .bind(&phone.ip_rating)
        .bind(phone.weight_g)
        .bind(&phone.android_version)
        .bind(&phone.source_url)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_model_names(&self) -> Result<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT model_name FROM phones ORDER BY model_name")
                .fetch_all(&self.pool)
                .await?;
        Ok(names)
    }

    async fn get_phone(&self, model_name: &str) -> Result<Option<Phone>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM phones WHERE model_name = ?",
            PHONE_COLUMNS
        ))
        .bind(model_name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_phone).transpose()
    }

    async fn list_phones(&self, limit: u32, offset: u32) -> Result<Vec<Phone>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM phones ORDER BY model_name LIMIT ? OFFSET ?",
            PHONE_COLUMNS
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_phone).collect()
    }

    async fn count_phones(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM phones")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn fetch(&self, request: &RetrievalRequest) -> Result<Vec<Phone>> {
        let rendered = render(request);
        let mut query = sqlx::query(&rendered.sql);
        for param in &rendered.params {
            query = match param {
                SqlParam::Text(v) => query.bind(v.clone()),
                SqlParam::Real(v) => query.bind(*v),
                SqlParam::Int(v) => query.bind(*v),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Retrieval query failed: {}", rendered.sql))?;
        rows.iter().map(row_to_phone).collect()
    }
}
