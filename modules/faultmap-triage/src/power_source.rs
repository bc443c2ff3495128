//! Per-parish electricity supply inference.
//!
//! Precedence is an ordered table, evaluated top to bottom; the first rule
//! whose predicate holds decides the parish:
//!
//! | # | rule                     | when                                        | result      |
//! |---|--------------------------|---------------------------------------------|-------------|
//! | 1 | `authoritative_restored` | telemetry for the concelho reports 0 outages | `grid`      |
//! | 2 | `live_outage_report`     | an active electricity report in the parish   | `no_power`  |
//! | 3 | `generator_tag`          | newest resolved tag in 30 days is generator  | `generator` |
//! | 4 | `grid_tag`               | newest resolved tag in 30 days is grid       | `grid`      |
//! | - | `no_signal`              | otherwise                                    | `unknown`   |

use std::collections::BTreeSet;

use serde::Serialize;

use faultmap_common::{OutageTelemetry, PowerSource, PowerSourceTag, Report, ReportType, ResolvedPowerTag};

/// How far back resolved-report source tags count.
pub const POWER_TAG_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerRule {
    AuthoritativeRestored,
    LiveOutageReport,
    GeneratorTag,
    GridTag,
    NoSignal,
}

/// Everything the policy looks at for one parish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParishSignals {
    pub telemetry_all_clear: bool,
    pub active_outage_reports: usize,
    pub latest_tag: Option<PowerSourceTag>,
}

struct PolicyEntry {
    rule: PowerRule,
    applies: fn(&ParishSignals) -> bool,
    yields: PowerSource,
}

fn telemetry_all_clear(s: &ParishSignals) -> bool {
    s.telemetry_all_clear
}

fn has_live_outage(s: &ParishSignals) -> bool {
    s.active_outage_reports > 0
}

fn tagged_generator(s: &ParishSignals) -> bool {
    s.latest_tag == Some(PowerSourceTag::Generator)
}

fn tagged_grid(s: &ParishSignals) -> bool {
    s.latest_tag == Some(PowerSourceTag::Grid)
}

const POLICY: [PolicyEntry; 4] = [
    PolicyEntry {
        rule: PowerRule::AuthoritativeRestored,
        applies: telemetry_all_clear,
        yields: PowerSource::Grid,
    },
    PolicyEntry {
        rule: PowerRule::LiveOutageReport,
        applies: has_live_outage,
        yields: PowerSource::NoPower,
    },
    PolicyEntry {
        rule: PowerRule::GeneratorTag,
        applies: tagged_generator,
        yields: PowerSource::Generator,
    },
    PolicyEntry {
        rule: PowerRule::GridTag,
        applies: tagged_grid,
        yields: PowerSource::Grid,
    },
];

/// Apply the policy table to one parish.
pub fn classify_parish(signals: &ParishSignals) -> (PowerSource, PowerRule) {
    POLICY
        .iter()
        .find(|entry| (entry.applies)(signals))
        .map(|entry| (entry.yields, entry.rule))
        .unwrap_or((PowerSource::Unknown, PowerRule::NoSignal))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParishPowerStatus {
    pub parish: String,
    pub source: PowerSource,
    /// The policy rule that decided `source`.
    pub rule: PowerRule,
}

/// Classify every target parish. Total: absent telemetry, no reports and no
/// tags simply flow to later rules.
///
/// `active_reports` may contain any types and parishes; only unresolved
/// electricity reports in a target parish count. `resolved_tags` may be in
/// any order; the newest tag per parish is used.
pub fn infer_power_sources(
    parishes: &BTreeSet<String>,
    telemetry: Option<&OutageTelemetry>,
    active_reports: &[Report],
    resolved_tags: &[ResolvedPowerTag],
) -> Vec<ParishPowerStatus> {
    let all_clear = telemetry.is_some_and(|t| t.outages == 0);

    parishes
        .iter()
        .map(|parish| {
            let signals = ParishSignals {
                telemetry_all_clear: all_clear,
                active_outage_reports: active_reports
                    .iter()
                    .filter(|r| {
                        r.report_type == ReportType::Electricity
                            && !r.resolved
                            && r.parish.as_deref() == Some(parish.as_str())
                    })
                    .count(),
                latest_tag: resolved_tags
                    .iter()
                    .filter(|t| &t.parish == parish)
                    .max_by_key(|t| t.resolved_at)
                    .map(|t| t.tag),
            };
            let (source, rule) = classify_parish(&signals);
            ParishPowerStatus {
                parish: parish.clone(),
                source,
                rule,
            }
        })
        .collect()
}
