use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use faultmap_common::{
    config::DEFAULT_DISTRICT_BOUNDS, BoundingBox, Hotspot, PowerSourceTag, Priority, Report,
    ReportType, TriageError, ValidationError,
};
use faultmap_geo::ParishResolver;
use faultmap_store::{OutageFeed, ReportCursor, ReportStore};

use crate::classifier::{ClassifierInput, PriorityClassifier};
use crate::hotspot::{detect_hotspots, HotspotParams};
use crate::lifecycle::{is_stale, sort_for_triage, visibility_cutoff, Submission};
use crate::power_source::{infer_power_sources, ParishPowerStatus, POWER_TAG_LOOKBACK_DAYS};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Optional geographic narrowing of an active-report query.
#[derive(Debug, Clone, Default)]
pub struct AreaFilter {
    pub concelho: Option<String>,
    pub parish: Option<String>,
}

impl AreaFilter {
    pub fn concelho(concelho: impl Into<String>) -> Self {
        Self {
            concelho: Some(concelho.into()),
            parish: None,
        }
    }

    fn matches(&self, report: &Report) -> bool {
        let concelho_ok = self
            .concelho
            .as_ref()
            .map_or(true, |c| report.concelho.as_ref() == Some(c));
        let parish_ok = self
            .parish
            .as_ref()
            .map_or(true, |p| report.parish.as_ref() == Some(p));
        concelho_ok && parish_ok
    }
}

/// Active reports plus the aggregates computed from the same snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Situation {
    pub reports: Vec<Report>,
    pub counts: BTreeMap<ReportType, usize>,
    pub hotspots: Vec<Hotspot>,
}

/// Per-parish rollup for an area dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParishStatus {
    pub parish: String,
    pub counts: BTreeMap<ReportType, usize>,
    pub total: usize,
    pub stale: usize,
    pub top_priority: Option<Priority>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillStats {
    pub scanned: usize,
    pub resolved: usize,
    pub unmatched: usize,
}

fn zeroed_counts() -> BTreeMap<ReportType, usize> {
    ReportType::ALL.into_iter().map(|t| (t, 0)).collect()
}

fn count_by_type<'a>(reports: impl IntoIterator<Item = &'a Report>) -> BTreeMap<ReportType, usize> {
    let mut counts = zeroed_counts();
    for report in reports {
        *counts.entry(report.report_type).or_insert(0) += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// ReportService
// ---------------------------------------------------------------------------

/// Owns report creation and mutation, and assembles the read-side views.
#[derive(Clone, TypedBuilder)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
    outages: Arc<dyn OutageFeed>,
    resolver: Arc<ParishResolver>,
    classifier: Arc<dyn PriorityClassifier>,
    #[builder(default = DEFAULT_DISTRICT_BOUNDS)]
    district: BoundingBox,
    #[builder(default)]
    hotspot_params: HotspotParams,
}

impl ReportService {
    // --- Write side ---

    pub async fn create(&self, submission: &Submission) -> Result<Report, TriageError> {
        self.create_at(submission, Utc::now()).await
    }

    /// Validate, resolve the parish, classify, then persist.
    pub async fn create_at(
        &self,
        submission: &Submission,
        now: DateTime<Utc>,
    ) -> Result<Report, TriageError> {
        let valid = submission.validate(&self.district)?;

        let area = self.resolver.resolve(valid.lat, valid.lng);
        if area.is_none() {
            debug!(lat = valid.lat, lng = valid.lng, "No parish contains submitted point");
        }

        let priority = self
            .classifier
            .classify(&ClassifierInput {
                description: valid.description.as_deref().unwrap_or(""),
                report_type: valid.report_type,
                street: valid.street.as_deref().unwrap_or(""),
            })
            .await;

        let (parish, concelho) = match area {
            Some(a) => (Some(a.parish), Some(a.concelho)),
            None => (None, None),
        };

        let report = Report {
            id: Uuid::new_v4(),
            report_type: valid.report_type,
            operator: valid.operator,
            description: valid.description,
            street: valid.street,
            parish,
            concelho,
            lat: valid.lat,
            lng: valid.lng,
            resolved: false,
            resolved_at: None,
            power_source: None,
            upvotes: 1,
            priority,
            created_at: now,
            last_upvoted_at: now,
            image_url: valid.image_url,
        };

        self.store.insert(&report).await?;

        info!(
            report_id = %report.id,
            report_type = %report.report_type,
            priority = %report.priority,
            parish = report.parish.as_deref().unwrap_or("-"),
            "Report created"
        );
        Ok(report)
    }

    /// Community confirmation: +1 upvote and a fresh `last_upvoted_at`.
    pub async fn confirm(&self, id: Uuid) -> Result<Report, TriageError> {
        if let Some(report) = self.store.confirm(id, Utc::now()).await? {
            debug!(report_id = %id, upvotes = report.upvotes, "Report confirmed");
            return Ok(report);
        }
        match self.store.get(id).await? {
            Some(_) => Err(TriageError::AlreadyResolved(id)),
            None => Err(TriageError::NotFound(id)),
        }
    }

    /// Terminal transition. Safe to repeat. A source tag is kept only for
    /// electricity reports.
    pub async fn resolve(
        &self,
        id: Uuid,
        source: Option<PowerSourceTag>,
    ) -> Result<Report, TriageError> {
        let existing = self.store.get(id).await?.ok_or(TriageError::NotFound(id))?;
        let source = match (existing.report_type, source) {
            (ReportType::Electricity, tag) => tag,
            (other, Some(tag)) => {
                debug!(report_id = %id, report_type = %other, tag = tag.as_str(), "Dropping power source tag");
                None
            }
            (_, None) => None,
        };

        let report = self
            .store
            .resolve(id, source, Utc::now())
            .await?
            .ok_or(TriageError::NotFound(id))?;
        info!(report_id = %id, "Report resolved");
        Ok(report)
    }

    /// Re-run parish resolution over every unresolved report stored without
    /// one, paging through them `batch_size` at a time. Points no boundary
    /// contains are counted and passed over, so they never block later pages.
    pub async fn backfill_parishes(&self, batch_size: usize) -> Result<BackfillStats, TriageError> {
        let batch_size = batch_size.max(1);
        let mut stats = BackfillStats::default();
        let mut cursor: Option<ReportCursor> = None;

        loop {
            let page = self.store.missing_area(cursor, batch_size).await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(ReportCursor::after(last));
            stats.scanned += page.len();

            for report in &page {
                match self.resolver.resolve(report.lat, report.lng) {
                    Some(area) => {
                        self.store.set_area(report.id, &area.parish, &area.concelho).await?;
                        stats.resolved += 1;
                    }
                    None => stats.unmatched += 1,
                }
            }

            if page.len() < batch_size {
                break;
            }
        }

        info!(
            scanned = stats.scanned,
            resolved = stats.resolved,
            unmatched = stats.unmatched,
            "Parish backfill complete"
        );
        Ok(stats)
    }

    // --- Read side ---

    fn validate_filter(&self, filter: &AreaFilter) -> Result<(), ValidationError> {
        match (&filter.concelho, &filter.parish) {
            (Some(concelho), parish) => {
                let parishes = self.expected_parishes(concelho)?;
                match parish {
                    Some(p) if !parishes.contains(p) => Err(ValidationError::UnknownParish {
                        concelho: concelho.clone(),
                        parish: p.clone(),
                    }),
                    _ => Ok(()),
                }
            }
            (None, Some(parish)) => match self.resolver.concelho_of(parish) {
                Some(_) => Ok(()),
                None => Err(ValidationError::UnknownParish {
                    concelho: "*".to_string(),
                    parish: parish.clone(),
                }),
            },
            (None, None) => Ok(()),
        }
    }

    fn expected_parishes(&self, concelho: &str) -> Result<BTreeSet<String>, ValidationError> {
        let parishes = self.resolver.parishes_of(concelho);
        if parishes.is_empty() {
            return Err(ValidationError::UnknownConcelho(concelho.to_string()));
        }
        Ok(parishes)
    }

    /// Unresolved reports from the trailing 7 days, in triage order.
    pub async fn active_reports(
        &self,
        filter: &AreaFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Report>, TriageError> {
        self.validate_filter(filter)?;
        let mut reports: Vec<Report> = self
            .store
            .unresolved_since(visibility_cutoff(now))
            .await?
            .into_iter()
            .filter(|r| !r.resolved && filter.matches(r))
            .collect();
        sort_for_triage(&mut reports);
        Ok(reports)
    }

    pub async fn situation(
        &self,
        filter: &AreaFilter,
        now: DateTime<Utc>,
    ) -> Result<Situation, TriageError> {
        let reports = self.active_reports(filter, now).await?;
        let counts = count_by_type(&reports);
        let hotspots = detect_hotspots(&reports, now, &self.hotspot_params);
        Ok(Situation {
            reports,
            counts,
            hotspots,
        })
    }

    /// One row per expected parish of the concelho, including parishes
    /// with no reports at all.
    pub async fn area_status(
        &self,
        concelho: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ParishStatus>, TriageError> {
        let parishes = self.expected_parishes(concelho)?;
        let reports = self
            .active_reports(&AreaFilter::concelho(concelho), now)
            .await?;

        Ok(parishes
            .into_iter()
            .map(|parish| {
                let in_parish: Vec<&Report> = reports
                    .iter()
                    .filter(|r| r.parish.as_deref() == Some(parish.as_str()))
                    .collect();
                ParishStatus {
                    counts: count_by_type(in_parish.iter().copied()),
                    total: in_parish.len(),
                    stale: in_parish.iter().filter(|r| is_stale(r, now)).count(),
                    top_priority: in_parish.iter().map(|r| r.priority).min(),
                    parish,
                }
            })
            .collect())
    }

    /// Power-source classification for every parish of a concelho.
    /// Outage feed failures degrade to "no telemetry".
    pub async fn power_sources(
        &self,
        concelho: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ParishPowerStatus>, TriageError> {
        let parishes = self.expected_parishes(concelho)?;

        let telemetry = match self.outages.latest(concelho).await {
            Ok(t) => t,
            Err(e) => {
                warn!(concelho, error = %e, "Outage telemetry unavailable, using crowd signal only");
                None
            }
        };

        let active: Vec<Report> = self
            .active_reports(&AreaFilter::concelho(concelho), now)
            .await?
            .into_iter()
            .filter(|r| r.report_type == ReportType::Electricity)
            .collect();

        let parish_list: Vec<String> = parishes.iter().cloned().collect();
        let tags = self
            .store
            .resolved_power_tags(
                concelho,
                &parish_list,
                now - Duration::days(POWER_TAG_LOOKBACK_DAYS),
            )
            .await?;

        let statuses = infer_power_sources(&parishes, telemetry.as_ref(), &active, &tags);
        debug!(
            concelho,
            parishes = statuses.len(),
            telemetry_outages = telemetry.as_ref().map(|t| t.outages),
            "Power sources inferred"
        );
        Ok(statuses)
    }
}
