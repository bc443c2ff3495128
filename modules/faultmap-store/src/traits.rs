use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use faultmap_common::{OutageTelemetry, PowerSourceTag, Report, ResolvedPowerTag};

/// Keyset position in `(created_at, id)` order, for paging through reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl ReportCursor {
    /// Position just past `report`.
    pub fn after(report: &Report) -> Self {
        Self {
            created_at: report.created_at,
            id: report.id,
        }
    }
}

/// Durable home of reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert(&self, report: &Report) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Report>>;

    /// Increment `upvotes` and set `last_upvoted_at` in one atomic step.
    /// Returns `None` when the report is missing or already resolved.
    async fn confirm(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Report>>;

    /// Mark resolved. Keeps the first `resolved_at` and any existing source
    /// tag. Returns `None` when the report is missing.
    async fn resolve(
        &self,
        id: Uuid,
        source: Option<PowerSourceTag>,
        at: DateTime<Utc>,
    ) -> Result<Option<Report>>;

    /// Unresolved reports created at or after `since`, in no particular order.
    async fn unresolved_since(&self, since: DateTime<Utc>) -> Result<Vec<Report>>;

    /// Source tags of electricity reports in `parishes` of `concelho`
    /// resolved at or after `since`, newest first.
    async fn resolved_power_tags(
        &self,
        concelho: &str,
        parishes: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ResolvedPowerTag>>;

    /// Unresolved reports without a parish, in `(created_at, id)` order,
    /// strictly after `after` when given.
    async fn missing_area(&self, after: Option<ReportCursor>, limit: usize) -> Result<Vec<Report>>;

    async fn set_area(&self, id: Uuid, parish: &str, concelho: &str) -> Result<()>;
}

/// Authoritative per-concelho outage counts, fed by an external ingester.
#[async_trait]
pub trait OutageFeed: Send + Sync {
    async fn latest(&self, concelho: &str) -> Result<Option<OutageTelemetry>>;
}
