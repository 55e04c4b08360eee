//! Tests for eligibility links and filtered person queries.

use roster::error::ErrorKind;
use roster::Config;

use crate::fixtures::{create_service, date, seed_person, seed_templates};

#[tokio::test]
async fn test_filter_is_conjunctive() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;
    service
        .templates()
        .create_workplace("d1", "w2", "Theatre 2")
        .await
        .unwrap();
    service.templates().create_department("d2", "Radiology").await.unwrap();

    for id in ["anna", "ben", "cleo", "dan"] {
        seed_person(&service, id).await;
    }
    for id in ["anna", "ben", "cleo"] {
        service.add_department_to_person(id, "d1").await.unwrap();
    }
    service.add_department_to_person("dan", "d2").await.unwrap();

    service.add_workplace_to_person("anna", "d1", "w1").await.unwrap();
    service.add_workplace_to_person("ben", "d1", "w1").await.unwrap();
    service.add_workplace_to_person("cleo", "d1", "w2").await.unwrap();

    service.add_weekday_to_person("anna", "MON").await.unwrap();
    service.add_weekday_to_person("ben", "TUE").await.unwrap();
    service.add_weekday_to_person("cleo", "MON").await.unwrap();

    let ids = |persons: Vec<roster::Person>| -> Vec<String> {
        persons.into_iter().map(|p| p.id).collect()
    };

    let all = service.find_all_persons("d1").await.unwrap();
    assert_eq!(ids(all), vec!["anna", "ben", "cleo"]);

    let qualified = service
        .find_all_persons_by("d1", Some("w1"), None, None)
        .await
        .unwrap();
    assert_eq!(ids(qualified), vec!["anna", "ben"]);

    let monday = service
        .find_all_persons_by("d1", Some("w1"), Some("MON"), None)
        .await
        .unwrap();
    assert_eq!(ids(monday), vec!["anna"]);

    service
        .add_absence_to_person("anna", "2021-01-04", "training")
        .await
        .unwrap();
    let available = service
        .find_all_persons_by("d1", Some("w1"), Some("MON"), Some("2021-01-04"))
        .await
        .unwrap();
    assert!(available.is_empty());

    let next_week = service
        .find_all_persons_by("d1", Some("w1"), Some("MON"), Some("2021-01-11"))
        .await
        .unwrap();
    assert_eq!(ids(next_week), vec!["anna"]);
}

#[tokio::test]
async fn test_inactive_and_deleted_persons_are_excluded() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;
    seed_person(&service, "anna").await;
    seed_person(&service, "ben").await;
    service.add_department_to_person("anna", "d1").await.unwrap();
    service.add_department_to_person("ben", "d1").await.unwrap();

    let anna = service.persons().find_by_id("anna").await.unwrap();
    service
        .persons()
        .update(
            roster::PersonInput::new("anna", &anna.first_name, &anna.last_name, &anna.email)
                .with_active(false),
        )
        .await
        .unwrap();
    service.persons().delete("ben").await.unwrap();

    assert!(service.find_all_persons("d1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_absence_lifecycle() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;
    seed_person(&service, "anna").await;
    service.add_department_to_person("anna", "d1").await.unwrap();

    service
        .add_absence_to_person("anna", "2021-01-04", "sick")
        .await
        .unwrap();
    service
        .add_absence_to_person("anna", "2021-01-20", "vacation")
        .await
        .unwrap();
    let updated = service
        .add_absence_to_person("anna", "2021-01-04", "doctor")
        .await
        .unwrap();
    assert_eq!(updated.reason, "doctor");

    let january = service
        .find_absences_in_range("anna", "2021-01-01", "2021-01-31")
        .await
        .unwrap();
    assert_eq!(january.len(), 2);
    assert_eq!(january[0].date, date("2021-01-04"));

    let first_week = service
        .find_absences_in_range("anna", "2021-01-04", "2021-01-10")
        .await
        .unwrap();
    assert_eq!(first_week.len(), 1);

    let on_date = service.find_all_absences("d1", "2021-01-04").await.unwrap();
    assert_eq!(on_date.len(), 1);
    assert_eq!(on_date[0].person_id, "anna");

    service
        .remove_absence_from_person("anna", "2021-01-04")
        .await
        .unwrap();
    let err = service.find_absence("anna", "2021-01-04").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_links_require_existing_records() {
    let service = create_service(Config::default()).await;
    seed_templates(&service).await;
    seed_person(&service, "anna").await;

    let err = service
        .add_department_to_person("anna", "missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .add_workplace_to_person("ghost", "d1", "w1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .add_workplace_to_person("anna", "d1", "missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    service.add_workplace_to_person("anna", "d1", "w1").await.unwrap();
    service.remove_workplace_from_person("anna", "d1", "w1").await.unwrap();
    service.add_weekday_to_person("anna", "fri").await.unwrap();
    service.remove_weekday_from_person("anna", "FRI").await.unwrap();
    let anna = service.persons().find_by_id("anna").await.unwrap();
    assert!(anna.workplaces.is_empty());
    assert!(anna.weekdays.is_empty());
}
