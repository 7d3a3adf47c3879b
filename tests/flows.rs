mod common;

use chrono::Duration;

use common::TestApp;
use fleet_dms::clock::Clock;
use fleet_dms::error::AppError;
use fleet_dms::models::{FlowRecordChanges, OperationType};
use fleet_dms::services::flow::Custody;

#[tokio::test]
async fn withdrawal_and_return_are_separate_rows_newest_first() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let document = app.vehicle_document(vehicle.id, None).await;
    let flows = app.state.flows();

    let withdrawal = flows
        .record_withdrawal(document.id, driver.id, None, None)
        .await
        .expect("withdrawal");
    app.clock.advance(Duration::hours(3));
    let returned = flows
        .record_return(document.id, driver.id, Some("back in cabinet".to_string()))
        .await
        .expect("return");

    let history = flows.list_by_document(document.id).await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].record.id, returned.id);
    assert_eq!(history[0].record.operation_type, OperationType::Return);
    assert_eq!(history[1].record.id, withdrawal.id);
    assert_eq!(history[1].record.actual_return_time, None);
    assert_eq!(history[1].record.expected_return_time, None);

    assert_eq!(history[0].license_plate, "ABC-123");
    assert_eq!(history[0].staff_no, "D-001");
    assert_eq!(history[0].document_code, document.code);
}

#[tokio::test]
async fn custody_follows_the_latest_record() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let document = app.vehicle_document(vehicle.id, None).await;
    let flows = app.state.flows();

    assert_eq!(flows.custody(document.id).await.expect("custody"), Custody::InStorage);

    let due = app.clock.now() + Duration::days(2);
    let withdrawal = flows
        .record_withdrawal(document.id, driver.id, Some(due), None)
        .await
        .expect("withdrawal");
    match flows.custody(document.id).await.expect("custody") {
        Custody::CheckedOut {
            driver_id,
            since,
            overdue,
            ..
        } => {
            assert_eq!(driver_id, driver.id);
            assert_eq!(since, withdrawal.operation_time);
            assert!(!overdue);
        }
        other => panic!("expected checked out, got {other:?}"),
    }

    app.clock.advance(Duration::days(3));
    let outstanding = flows.outstanding().await.expect("outstanding");
    assert_eq!(outstanding.len(), 1);
    assert!(outstanding[0].overdue);

    flows.record_return(document.id, driver.id, None).await.expect("return");
    assert_eq!(flows.custody(document.id).await.expect("custody"), Custody::InStorage);
    assert!(flows.outstanding().await.expect("outstanding").is_empty());
}

#[tokio::test]
async fn pairing_is_not_enforced_at_write_time() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let document = app.vehicle_document(vehicle.id, None).await;
    let flows = app.state.flows();

    flows.record_return(document.id, driver.id, None).await.expect("orphan return");
    app.clock.advance(Duration::minutes(1));
    flows.record_withdrawal(document.id, driver.id, None, None).await.expect("first");
    app.clock.advance(Duration::minutes(1));
    flows.record_withdrawal(document.id, driver.id, None, None).await.expect("second");

    assert_eq!(flows.list_by_document(document.id).await.expect("history").len(), 3);
}

#[tokio::test]
async fn driver_documents_have_no_flow_records() {
    let app = TestApp::new();
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let document = app.driver_document(driver.id, "CNH-1", None).await;

    let result = app
        .state
        .flows()
        .record_withdrawal(document.id, driver.id, None, None)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn unknown_references_are_rejected() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let document = app.vehicle_document(vehicle.id, None).await;
    let flows = app.state.flows();

    let no_driver = flows
        .record_withdrawal(document.id, uuid::Uuid::new_v4(), None, None)
        .await;
    assert!(matches!(no_driver, Err(AppError::NotFound(_))));

    let driver = app.driver("D-001", "Joao Mucavele").await;
    let no_document = flows
        .record_withdrawal(uuid::Uuid::new_v4(), driver.id, None, None)
        .await;
    assert!(matches!(no_document, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn edits_keep_the_operation_tag() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let document = app.vehicle_document(vehicle.id, None).await;
    let flows = app.state.flows();
    let record = flows
        .record_withdrawal(document.id, driver.id, None, None)
        .await
        .expect("withdrawal");

    let due = app.clock.now() + Duration::days(1);
    let updated = flows
        .update(
            record.id,
            FlowRecordChanges {
                expected_return_time: Some(due),
                notes: Some("trip to Beira".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.operation_type, OperationType::Withdrawal);
    assert_eq!(updated.expected_return_time, Some(due));
    assert_eq!(updated.operation_time, record.operation_time);

    let retag = serde_json::from_str::<FlowRecordChanges>(r#"{"operation_type": "return"}"#);
    assert!(retag.is_err());
}

#[tokio::test]
async fn range_queries_are_inclusive_and_ordered() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let document = app.vehicle_document(vehicle.id, None).await;
    let flows = app.state.flows();

    let start = app.clock.now();
    flows.record_withdrawal(document.id, driver.id, None, None).await.expect("w");
    app.clock.advance(Duration::days(1));
    let end = app.clock.now();
    flows.record_return(document.id, driver.id, None).await.expect("r");
    app.clock.advance(Duration::days(1));
    flows.record_withdrawal(document.id, driver.id, None, None).await.expect("w");

    let window = flows.list_between(start, end).await.expect("range");
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].record.operation_type, OperationType::Return);

    assert!(matches!(
        flows.list_between(end, start).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn grouping_and_clearing_per_vehicle() {
    let app = TestApp::new();
    let truck = app.vehicle("ABC-123").await;
    let idle = app.vehicle("XYZ-987").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let document = app.vehicle_document(truck.id, None).await;
    let flows = app.state.flows();
    flows.record_withdrawal(document.id, driver.id, None, None).await.expect("w");

    let grouped = flows.grouped_by_vehicle().await.expect("grouped");
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].vehicle_id, truck.id);
    assert_eq!(grouped[0].records.len(), 1);

    assert_eq!(flows.delete_all_for_vehicle(idle.id).await.expect("clear"), 0);
    assert_eq!(flows.delete_all_for_vehicle(truck.id).await.expect("clear"), 1);
    assert!(flows.list_by_vehicle(truck.id).await.expect("list").is_empty());
}

#[tokio::test]
async fn deleting_a_document_removes_its_flow_records() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let document = app.vehicle_document(vehicle.id, None).await;
    let flows = app.state.flows();
    let record = flows
        .record_withdrawal(document.id, driver.id, None, None)
        .await
        .expect("w");

    app.state.documents().delete(document.id).await.expect("delete");
    assert!(matches!(flows.get(record.id).await, Err(AppError::NotFound(_))));
    assert!(flows.list_by_driver(driver.id).await.expect("list").is_empty());
}
