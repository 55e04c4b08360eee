//! Tests for assigning persons to workdays.

use roster::error::ErrorKind;
use roster::{AssignmentPolicy, Config, WorkdayUpdate};

use crate::fixtures::{create_service, seed_person, seed_templates};

#[tokio::test]
async fn test_absence_removes_assignments_on_that_date_only() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;
    seed_person(&service, "p1").await;
    service.synchronize_from("2021-01-04", 1).await.unwrap();

    for day in ["2021-01-04", "2021-01-05"] {
        service
            .assign_person_to_workday("p1", "d1", "w1", "day", day)
            .await
            .unwrap();
    }

    let absence = service
        .add_absence_to_person("p1", "2021-01-04", "sick")
        .await
        .unwrap();
    assert_eq!(absence.reason, "sick");

    let monday = service.get_workday("d1", "w1", "day", "2021-01-04").await.unwrap();
    assert!(monday.person.is_none());
    let tuesday = service.get_workday("d1", "w1", "day", "2021-01-05").await.unwrap();
    assert_eq!(tuesday.person.map(|p| p.id), Some("p1".to_string()));
}

#[tokio::test]
async fn test_reassignment_keeps_a_single_assignee() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;
    seed_person(&service, "p1").await;
    seed_person(&service, "p2").await;
    service.synchronize_from("2021-01-04", 1).await.unwrap();

    service
        .assign_person_to_workday("p1", "d1", "w1", "day", "2021-01-04")
        .await
        .unwrap();
    let workday = service
        .assign_person_to_workday("p2", "d1", "w1", "day", "2021-01-04")
        .await
        .unwrap();
    assert_eq!(workday.person.map(|p| p.id), Some("p2".to_string()));

    service
        .unassign_person_from_workday("p1", "d1", "w1", "day", "2021-01-04")
        .await
        .unwrap();
    let workday = service.get_workday("d1", "w1", "day", "2021-01-04").await.unwrap();
    assert_eq!(workday.person.map(|p| p.id), Some("p2".to_string()));
}

#[tokio::test]
async fn test_assignment_to_unmaterialized_or_inactive_workday_fails() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;
    seed_person(&service, "p1").await;

    let err = service
        .assign_person_to_workday("p1", "d1", "w1", "day", "2021-01-04")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    service.synchronize_from("2021-01-04", 1).await.unwrap();
    let key = roster::WorkdayKey::parse("d1", "w1", "day", "2021-01-04").unwrap();
    service
        .assignments()
        .update_workday(&key, WorkdayUpdate::default().with_active(false))
        .await
        .unwrap();

    let err = service
        .assign_person_to_workday("p1", "d1", "w1", "day", "2021-01-04")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(service
        .get_workdays_for_department_and_date("d1", "2021-01-04")
        .await
        .unwrap()
        .is_empty());

    service
        .assignments()
        .update_workday(&key, WorkdayUpdate::default().with_active(true))
        .await
        .unwrap();
    service
        .assign_person_to_workday("p1", "d1", "w1", "day", "2021-01-04")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_enforced_policy_from_config() {
    let mut config = Config::default();
    config.assignment.policy = AssignmentPolicy::EnforceEligibility;
    let service = create_service(config).await;
    seed_templates(&service).await;
    seed_person(&service, "p1").await;
    service.synchronize_from("2021-01-04", 1).await.unwrap();

    let err = service
        .assign_person_to_workday("p1", "d1", "w1", "day", "2021-01-05")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    service.add_department_to_person("p1", "d1").await.unwrap();
    service.add_workplace_to_person("p1", "d1", "w1").await.unwrap();
    service.add_weekday_to_person("p1", "MON").await.unwrap();

    let err = service
        .assign_person_to_workday("p1", "d1", "w1", "day", "2021-01-05")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    service.add_weekday_to_person("p1", "TUE").await.unwrap();
    let workday = service
        .assign_person_to_workday("p1", "d1", "w1", "day", "2021-01-05")
        .await
        .unwrap();
    assert_eq!(workday.person.map(|p| p.id), Some("p1".to_string()));
}
