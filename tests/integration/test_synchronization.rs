//! Tests for materializing offerings into workdays.

use std::sync::Arc;

use chrono::NaiveTime;
use tempfile::TempDir;

use roster::error::ErrorKind;
use roster::graph::GraphStore;
use roster::roster::date_ref;
use roster::{Config, RosterService, Weekday};

use crate::fixtures::{create_service, date, seed_person, seed_templates, FailingStore};

#[tokio::test]
async fn test_synchronize_materializes_offered_weekdays() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;

    let report = service.synchronize_from("2021-01-06", 1).await.unwrap();
    assert_eq!(report.start, Some(date("2021-01-04")));
    assert_eq!(report.dates_processed, 7);
    assert_eq!(report.workdays_created, 3);
    assert_eq!(report.workdays_existing, 0);

    for (day, weekday) in [
        ("2021-01-04", Weekday::Mon),
        ("2021-01-05", Weekday::Tue),
        ("2021-01-06", Weekday::Wed),
    ] {
        let workdays = service
            .get_workdays_for_department_and_date("d1", day)
            .await
            .unwrap();
        assert_eq!(workdays.len(), 1, "one workday on {}", day);

        let workday = &workdays[0];
        assert_eq!(workday.weekday, weekday);
        assert_eq!(workday.start_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(workday.end_time, NaiveTime::from_hms_opt(16, 0, 0).unwrap());
        assert_eq!(workday.duration_minutes, 480);
        assert!(workday.active);
        assert!(workday.person.is_none());
    }

    assert!(service
        .get_workdays_for_department_and_date("d1", "2021-01-07")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_synchronize_is_idempotent() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;

    service.synchronize_from("2021-01-04", 3).await.unwrap();
    let first = service.stats().await.unwrap();
    assert_eq!(first.nodes_by_label.get("Workday"), Some(&9));
    assert_eq!(first.nodes_by_label.get("Date"), Some(&21));

    let report = service.synchronize_from("2021-01-04", 3).await.unwrap();
    assert_eq!(report.workdays_created, 0);
    assert_eq!(report.workdays_existing, 9);

    let second = service.stats().await.unwrap();
    assert_eq!(second.node_count, first.node_count);
    assert_eq!(second.edge_count, first.edge_count);
}

#[tokio::test]
async fn test_existing_workdays_keep_their_times() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;
    service.synchronize_from("2021-01-04", 1).await.unwrap();

    service
        .templates()
        .add_offering("d1", "w1", "day", Weekday::Mon, "09:00", "12:00")
        .await
        .unwrap();
    service.synchronize_from("2021-01-04", 2).await.unwrap();

    let old = service.get_workday("d1", "w1", "day", "2021-01-04").await.unwrap();
    assert_eq!(old.duration_minutes, 480);

    let new = service.get_workday("d1", "w1", "day", "2021-01-11").await.unwrap();
    assert_eq!(new.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    assert_eq!(new.duration_minutes, 180);
}

#[tokio::test]
async fn test_failed_write_aborts_the_run() {
    let store = Arc::new(FailingStore::new());
    let graph: Arc<dyn GraphStore> = store.clone();
    let service = RosterService::new(graph, Config::default()).await.unwrap();
    seed_templates(&service).await;

    store.fail_after(2);
    let err = service.synchronize_from("2021-01-04", 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);

    assert!(service.get_workday("d1", "w1", "day", "2021-01-04").await.is_ok());
    assert!(service.get_workday("d1", "w1", "day", "2021-01-05").await.is_ok());

    let err = service
        .get_workday("d1", "w1", "day", "2021-01-06")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(store
        .get_node(&date_ref(date("2021-01-06")))
        .await
        .unwrap()
        .is_none());
    assert!(store
        .get_node(&date_ref(date("2021-01-07")))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_persisted_graph_survives_restart() {
    let data_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.persist = true;
    config.storage.data_dir = data_dir.path().to_string_lossy().to_string();

    {
        let service = RosterService::from_config(&config).await.unwrap();
        seed_templates(&service).await;
        seed_person(&service, "p1").await;
        service.synchronize_from("2021-01-04", 1).await.unwrap();
        service
            .assign_person_to_workday("p1", "d1", "w1", "day", "2021-01-05")
            .await
            .unwrap();
    }

    let service = RosterService::from_config(&config).await.unwrap();
    let workday = service
        .get_workday("d1", "w1", "day", "2021-01-05")
        .await
        .unwrap();
    assert_eq!(workday.person.map(|p| p.id), Some("p1".to_string()));

    let report = service.synchronize_from("2021-01-04", 1).await.unwrap();
    assert_eq!(report.workdays_created, 0);
    assert_eq!(report.workdays_existing, 3);
}
