//! Postgres-backed report store.
//!
//! Confirmation is a single `UPDATE ... SET upvotes = upvotes + 1` so that
//! concurrent confirms of one report serialize on the row lock.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use faultmap_common::{
    OutageTelemetry, PowerSourceTag, Priority, Report, ReportType, ResolvedPowerTag,
};

use crate::traits::{OutageFeed, ReportCursor, ReportStore};

const REPORT_COLUMNS: &str = "id, report_type, operator, description, street, parish, concelho, \
     lat, lng, resolved, resolved_at, power_source, upvotes, priority, created_at, \
     last_upvoted_at, image_url";

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: Uuid,
    report_type: String,
    operator: Option<String>,
    description: Option<String>,
    street: Option<String>,
    parish: Option<String>,
    concelho: Option<String>,
    lat: f64,
    lng: f64,
    resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    power_source: Option<String>,
    upvotes: i32,
    priority: String,
    created_at: DateTime<Utc>,
    last_upvoted_at: DateTime<Utc>,
    image_url: Option<String>,
}

impl TryFrom<ReportRow> for Report {
    type Error = anyhow::Error;

    fn try_from(row: ReportRow) -> Result<Self> {
        Ok(Report {
            id: row.id,
            report_type: row.report_type.parse::<ReportType>()?,
            operator: row.operator,
            description: row.description,
            street: row.street,
            parish: row.parish,
            concelho: row.concelho,
            lat: row.lat,
            lng: row.lng,
            resolved: row.resolved,
            resolved_at: row.resolved_at,
            power_source: row
                .power_source
                .as_deref()
                .map(str::parse::<PowerSourceTag>)
                .transpose()?,
            upvotes: u32::try_from(row.upvotes)?,
            priority: Priority::from_label(&row.priority)
                .ok_or_else(|| anyhow!("unknown priority {:?} on report {}", row.priority, row.id))?,
            created_at: row.created_at,
            last_upvoted_at: row.last_upvoted_at,
            image_url: row.image_url,
        })
    }
}

fn into_reports(rows: Vec<ReportRow>) -> Result<Vec<Report>> {
    rows.into_iter().map(Report::try_from).collect()
}

// ---------------------------------------------------------------------------
// PgReportStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn insert(&self, report: &Report) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, report_type, operator, description, street, parish, concelho,
                                 lat, lng, resolved, resolved_at, power_source, upvotes, priority,
                                 created_at, last_upvoted_at, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(report.id)
        .bind(report.report_type.as_str())
        .bind(&report.operator)
        .bind(&report.description)
        .bind(&report.street)
        .bind(&report.parish)
        .bind(&report.concelho)
        .bind(report.lat)
        .bind(report.lng)
        .bind(report.resolved)
        .bind(report.resolved_at)
        .bind(report.power_source.map(|s| s.as_str()))
        .bind(i32::try_from(report.upvotes)?)
        .bind(report.priority.as_str())
        .bind(report.created_at)
        .bind(report.last_upvoted_at)
        .bind(&report.image_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Report::try_from).transpose()
    }

    async fn confirm(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Report>> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            UPDATE reports
            SET upvotes = upvotes + 1, last_upvoted_at = $2
            WHERE id = $1 AND resolved = FALSE
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Report::try_from).transpose()
    }

    async fn resolve(
        &self,
        id: Uuid,
        source: Option<PowerSourceTag>,
        at: DateTime<Utc>,
    ) -> Result<Option<Report>> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            UPDATE reports
            SET resolved = TRUE,
                resolved_at = COALESCE(resolved_at, $2),
                power_source = COALESCE(power_source, $3)
            WHERE id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .bind(source.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Report::try_from).transpose()
    }

    async fn unresolved_since(&self, since: DateTime<Utc>) -> Result<Vec<Report>> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE resolved = FALSE AND created_at >= $1"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        into_reports(rows)
    }

    async fn resolved_power_tags(
        &self,
        concelho: &str,
        parishes: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ResolvedPowerTag>> {
        let rows = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
            r#"
            SELECT parish, power_source, resolved_at
            FROM reports
            WHERE resolved = TRUE
              AND report_type = 'electricity'
              AND power_source IS NOT NULL
              AND concelho = $1
              AND parish = ANY($2)
              AND resolved_at >= $3
            ORDER BY resolved_at DESC
            "#,
        )
        .bind(concelho)
        .bind(parishes)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(parish, tag, resolved_at)| -> Result<ResolvedPowerTag> {
                Ok(ResolvedPowerTag {
                    parish,
                    tag: tag.parse()?,
                    resolved_at,
                })
            })
            .collect()
    }

    async fn missing_area(&self, after: Option<ReportCursor>, limit: usize) -> Result<Vec<Report>> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE parish IS NULL
              AND resolved = FALSE
              AND ($1::timestamptz IS NULL OR (created_at, id) > ($1::timestamptz, $2::uuid))
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#
        ))
        .bind(after.map(|c| c.created_at))
        .bind(after.map(|c| c.id))
        .bind(i64::try_from(limit)?)
        .fetch_all(&self.pool)
        .await?;
        into_reports(rows)
    }

    async fn set_area(&self, id: Uuid, parish: &str, concelho: &str) -> Result<()> {
        sqlx::query("UPDATE reports SET parish = $2, concelho = $3 WHERE id = $1")
            .bind(id)
            .bind(parish)
            .bind(concelho)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PgOutageFeed
// ---------------------------------------------------------------------------

/// Reads the newest row an external ingester wrote to `outage_telemetry`.
#[derive(Clone)]
pub struct PgOutageFeed {
    pool: PgPool,
}

impl PgOutageFeed {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, telemetry: &OutageTelemetry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outage_telemetry (concelho, outages, observed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (concelho, observed_at) DO UPDATE SET outages = EXCLUDED.outages
            "#,
        )
        .bind(&telemetry.concelho)
        .bind(i32::try_from(telemetry.outages)?)
        .bind(telemetry.observed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OutageFeed for PgOutageFeed {
    async fn latest(&self, concelho: &str) -> Result<Option<OutageTelemetry>> {
        let row = sqlx::query_as::<_, (String, i32, DateTime<Utc>)>(
            r#"
            SELECT concelho, outages, observed_at
            FROM outage_telemetry
            WHERE concelho = $1
            ORDER BY observed_at DESC
            LIMIT 1
            "#,
        )
        .bind(concelho)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(concelho, outages, observed_at)| -> Result<OutageTelemetry> {
            Ok(OutageTelemetry {
                concelho,
                outages: u32::try_from(outages)?,
                observed_at,
            })
        })
        .transpose()
    }
}
