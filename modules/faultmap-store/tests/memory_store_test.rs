use std::sync::Arc;

use chrono::{Duration, Utc};
use faultmap_common::{OutageTelemetry, PowerSourceTag, Priority, Report, ReportType};
use faultmap_store::{MemoryOutageFeed, MemoryReportStore, OutageFeed, ReportCursor, ReportStore};
use uuid::Uuid;

fn report(report_type: ReportType, parish: Option<&str>) -> Report {
    let now = Utc::now();
    Report {
        id: Uuid::new_v4(),
        report_type,
        operator: None,
        description: Some("sem luz".to_string()),
        street: None,
        parish: parish.map(str::to_string),
        concelho: parish.map(|_| "Leiria".to_string()),
        lat: 39.74,
        lng: -8.81,
        resolved: false,
        resolved_at: None,
        power_source: None,
        upvotes: 1,
        priority: Priority::Normal,
        created_at: now,
        last_upvoted_at: now,
        image_url: None,
    }
}

#[tokio::test]
async fn concurrent_confirms_are_never_lost() {
    let store = Arc::new(MemoryReportStore::new());
    let r = report(ReportType::Water, Some("Marrazes e Barosa"));
    store.insert(&r).await.unwrap();

    let id = r.id;
    let confirms = (0..50).map(|_| {
        let store = store.clone();
        tokio::spawn(async move { store.confirm(id, Utc::now()).await })
    });
    for joined in futures::future::join_all(confirms).await {
        assert!(joined.unwrap().unwrap().is_some());
    }

    assert_eq!(store.get(r.id).await.unwrap().unwrap().upvotes, 51);
}

#[tokio::test]
async fn confirm_of_resolved_report_changes_nothing() {
    let store = MemoryReportStore::new();
    let r = report(ReportType::Roads, None);
    store.insert(&r).await.unwrap();
    store.resolve(r.id, None, Utc::now()).await.unwrap();

    assert!(store.confirm(r.id, Utc::now()).await.unwrap().is_none());
    assert_eq!(store.get(r.id).await.unwrap().unwrap().upvotes, 1);
}

#[tokio::test]
async fn second_resolve_keeps_first_timestamp_and_tag() {
    let store = MemoryReportStore::new();
    let r = report(ReportType::Electricity, Some("Marrazes e Barosa"));
    store.insert(&r).await.unwrap();
    let first_at = Utc::now() - Duration::hours(2);

    store.resolve(r.id, Some(PowerSourceTag::Generator), first_at).await.unwrap();
    let again = store
        .resolve(r.id, Some(PowerSourceTag::Grid), Utc::now())
        .await
        .unwrap()
        .unwrap();

    assert!(again.resolved);
    assert_eq!(again.resolved_at, Some(first_at));
    assert_eq!(again.power_source, Some(PowerSourceTag::Generator));
}

#[tokio::test]
async fn power_tags_are_newest_first_and_scoped_to_parishes() {
    let store = MemoryReportStore::new();
    let now = Utc::now();
    let older = report(ReportType::Electricity, Some("Marrazes e Barosa"));
    let newer = report(ReportType::Electricity, Some("Marrazes e Barosa"));
    let elsewhere = report(ReportType::Electricity, Some("Batalha"));
    let water = report(ReportType::Water, Some("Marrazes e Barosa"));
    for r in [&older, &newer, &elsewhere, &water] {
        store.insert(r).await.unwrap();
    }
    store.resolve(older.id, Some(PowerSourceTag::Grid), now - Duration::days(3)).await.unwrap();
    store.resolve(newer.id, Some(PowerSourceTag::Generator), now - Duration::days(1)).await.unwrap();
    store.resolve(elsewhere.id, Some(PowerSourceTag::Grid), now).await.unwrap();
    store.resolve(water.id, Some(PowerSourceTag::Grid), now).await.unwrap();

    let tags = store
        .resolved_power_tags("Leiria", &["Marrazes e Barosa".to_string()], now - Duration::days(30))
        .await
        .unwrap();

    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].tag, PowerSourceTag::Generator);
    assert_eq!(tags[1].tag, PowerSourceTag::Grid);
}

#[tokio::test]
async fn power_tags_outside_lookback_are_ignored() {
    let store = MemoryReportStore::new();
    let now = Utc::now();
    let r = report(ReportType::Electricity, Some("Marrazes e Barosa"));
    store.insert(&r).await.unwrap();
    store.resolve(r.id, Some(PowerSourceTag::Grid), now - Duration::days(31)).await.unwrap();

    let tags = store
        .resolved_power_tags("Leiria", &["Marrazes e Barosa".to_string()], now - Duration::days(30))
        .await
        .unwrap();

    assert!(tags.is_empty());
}

#[tokio::test]
async fn missing_area_then_set_area() {
    let store = MemoryReportStore::new();
    let orphan = report(ReportType::Water, None);
    let placed = report(ReportType::Water, Some("Marrazes e Barosa"));
    store.insert(&orphan).await.unwrap();
    store.insert(&placed).await.unwrap();

    let missing = store.missing_area(None, 10).await.unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].id, orphan.id);

    store.set_area(orphan.id, "Leiria, Pousos, Barreira e Cortes", "Leiria").await.unwrap();
    assert!(store.missing_area(None, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn power_tags_ignore_same_named_parish_in_other_concelho() {
    let store = MemoryReportStore::new();
    let now = Utc::now();
    let mut neighbour = report(ReportType::Electricity, Some("Santo António"));
    neighbour.concelho = Some("Batalha".to_string());
    store.insert(&neighbour).await.unwrap();
    store.resolve(neighbour.id, Some(PowerSourceTag::Generator), now).await.unwrap();

    let tags = store
        .resolved_power_tags("Leiria", &["Santo António".to_string()], now - Duration::days(30))
        .await
        .unwrap();
    assert!(tags.is_empty());

    let tags = store
        .resolved_power_tags("Batalha", &["Santo António".to_string()], now - Duration::days(30))
        .await
        .unwrap();
    assert_eq!(tags.len(), 1);
}

#[tokio::test]
async fn missing_area_pages_past_cursor_and_skips_resolved() {
    let store = MemoryReportStore::new();
    let now = Utc::now();
    let mut pending = Vec::new();
    for minutes in [30, 20, 10] {
        let mut r = report(ReportType::Water, None);
        r.created_at = now - Duration::minutes(minutes);
        store.insert(&r).await.unwrap();
        pending.push(r);
    }
    let closed = report(ReportType::Water, None);
    store.insert(&closed).await.unwrap();
    store.resolve(closed.id, None, now).await.unwrap();

    let first = store.missing_area(None, 2).await.unwrap();
    assert_eq!(first.iter().map(|r| r.id).collect::<Vec<_>>(), vec![pending[0].id, pending[1].id]);

    let rest = store
        .missing_area(Some(ReportCursor::after(&first[1])), 2)
        .await
        .unwrap();
    assert_eq!(rest.iter().map(|r| r.id).collect::<Vec<_>>(), vec![pending[2].id]);
}

#[tokio::test]
async fn outage_feed_keeps_newest_reading() {
    let feed = MemoryOutageFeed::new();
    let now = Utc::now();
    feed.record(OutageTelemetry { concelho: "Leiria".into(), outages: 0, observed_at: now }).await;
    feed.record(OutageTelemetry {
        concelho: "Leiria".into(),
        outages: 120,
        observed_at: now - Duration::hours(1),
    })
    .await;

    let latest = feed.latest("Leiria").await.unwrap().unwrap();
    assert_eq!(latest.outages, 0);
    assert!(feed.latest("Pombal").await.unwrap().is_none());
}
