use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use faultmap_common::{OutageTelemetry, PowerSourceTag, Report, ReportType, ResolvedPowerTag};

use crate::traits::{OutageFeed, ReportCursor, ReportStore};

/// In-process report store. Each mutation holds the write lock for its
/// whole read-and-update, so concurrent confirms never lose an increment.
#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<Vec<Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn insert(&self, report: &Report) -> Result<()> {
        self.reports.write().await.push(report.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.reports.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn confirm(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Report>> {
        let mut reports = self.reports.write().await;
        Ok(reports
            .iter_mut()
            .find(|r| r.id == id && !r.resolved)
            .map(|r| {
                r.upvotes += 1;
                r.last_upvoted_at = at;
                r.clone()
            }))
    }

    async fn resolve(
        &self,
        id: Uuid,
        source: Option<PowerSourceTag>,
        at: DateTime<Utc>,
    ) -> Result<Option<Report>> {
        let mut reports = self.reports.write().await;
        Ok(reports.iter_mut().find(|r| r.id == id).map(|r| {
            r.resolved = true;
            r.resolved_at = r.resolved_at.or(Some(at));
            r.power_source = r.power_source.or(source);
            r.clone()
        }))
    }

    async fn unresolved_since(&self, since: DateTime<Utc>) -> Result<Vec<Report>> {
        Ok(self
            .reports
            .read()
            .await
            .iter()
            .filter(|r| !r.resolved && r.created_at >= since)
            .cloned()
            .collect())
    }

    async fn resolved_power_tags(
        &self,
        concelho: &str,
        parishes: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ResolvedPowerTag>> {
        let reports = self.reports.read().await;
        let mut tags: Vec<ResolvedPowerTag> = reports
            .iter()
            .filter(|r| r.resolved && r.report_type == ReportType::Electricity)
            .filter(|r| r.concelho.as_deref() == Some(concelho))
            .filter_map(|r| {
                let parish = r.parish.as_ref().filter(|p| parishes.contains(p))?;
                let resolved_at = r.resolved_at.filter(|at| *at >= since)?;
                Some(ResolvedPowerTag {
                    parish: parish.clone(),
                    tag: r.power_source?,
                    resolved_at,
                })
            })
            .collect();
        tags.sort_by(|a, b| b.resolved_at.cmp(&a.resolved_at));
        Ok(tags)
    }

    async fn missing_area(&self, after: Option<ReportCursor>, limit: usize) -> Result<Vec<Report>> {
        let reports = self.reports.read().await;
        let mut missing: Vec<Report> = reports
            .iter()
            .filter(|r| r.parish.is_none() && !r.resolved)
            .filter(|r| after.map_or(true, |c| (r.created_at, r.id) > (c.created_at, c.id)))
            .cloned()
            .collect();
        missing.sort_by_key(|r| (r.created_at, r.id));
        missing.truncate(limit);
        Ok(missing)
    }

    async fn set_area(&self, id: Uuid, parish: &str, concelho: &str) -> Result<()> {
        let mut reports = self.reports.write().await;
        if let Some(report) = reports.iter_mut().find(|r| r.id == id) {
            report.parish = Some(parish.to_string());
            report.concelho = Some(concelho.to_string());
        }
        Ok(())
    }
}

/// Outage feed backed by a map; keeps the newest reading per concelho.
#[derive(Default)]
pub struct MemoryOutageFeed {
    latest: RwLock<HashMap<String, OutageTelemetry>>,
}

impl MemoryOutageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, telemetry: OutageTelemetry) {
        let mut latest = self.latest.write().await;
        let newer = latest
            .get(&telemetry.concelho)
            .map_or(true, |current| telemetry.observed_at >= current.observed_at);
        if newer {
            latest.insert(telemetry.concelho.clone(), telemetry);
        }
    }
}

#[async_trait]
impl OutageFeed for MemoryOutageFeed {
    async fn latest(&self, concelho: &str) -> Result<Option<OutageTelemetry>> {
        Ok(self.latest.read().await.get(concelho).cloned())
    }
}
