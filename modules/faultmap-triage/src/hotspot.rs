use chrono::{DateTime, Duration, Utc};

use faultmap_common::{haversine_meters, Hotspot, Report};

/// Clustering parameters. Defaults: 24h window, 500m radius, 3 reports.
#[derive(Debug, Clone, Copy)]
pub struct HotspotParams {
    pub window: Duration,
    pub radius_meters: f64,
    pub min_reports: usize,
}

impl Default for HotspotParams {
    fn default() -> Self {
        Self {
            window: Duration::hours(24),
            radius_meters: 500.0,
            min_reports: 3,
        }
    }
}

/// Single-pass greedy clustering over a snapshot of active reports.
///
/// Each unconsumed report, in input order, seeds a candidate cluster of all
/// unconsumed reports within the radius (itself included). Candidates of at
/// least `min_reports` become hotspots and consume their members; smaller
/// ones consume nothing, so the seed can still join a later cluster.
///
/// The result depends on input order. Two runs over the same ordered input
/// always agree.
pub fn detect_hotspots(reports: &[Report], now: DateTime<Utc>, params: &HotspotParams) -> Vec<Hotspot> {
    let cutoff = now - params.window;
    let recent: Vec<&Report> = reports
        .iter()
        .filter(|r| !r.resolved && r.created_at >= cutoff)
        .collect();

    let mut consumed = vec![false; recent.len()];
    let mut hotspots = Vec::new();

    for seed in 0..recent.len() {
        if consumed[seed] {
            continue;
        }
        let members: Vec<usize> = (0..recent.len())
            .filter(|&i| !consumed[i])
            .filter(|&i| {
                haversine_meters(recent[seed].lat, recent[seed].lng, recent[i].lat, recent[i].lng)
                    <= params.radius_meters
            })
            .collect();

        if members.len() < params.min_reports {
            continue;
        }

        let count = members.len();
        let (lat_sum, lng_sum) = members
            .iter()
            .fold((0.0, 0.0), |(lat, lng), &i| (lat + recent[i].lat, lng + recent[i].lng));
        for &i in &members {
            consumed[i] = true;
        }
        hotspots.push(Hotspot {
            centroid_lat: lat_sum / count as f64,
            centroid_lng: lng_sum / count as f64,
            report_ids: members.iter().map(|&i| recent[i].id).collect(),
            count,
        });
    }

    hotspots
}
