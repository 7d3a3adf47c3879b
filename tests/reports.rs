mod common;

use chrono::Duration;

use common::TestApp;
use fleet_dms::clock::Clock;
use fleet_dms::error::AppError;
use fleet_dms::services::inspections::PendingInput;
use fleet_dms::services::reports::FlowWindow;
use fleet_dms::status::DocumentStatus;

#[tokio::test]
async fn summary_counts_live_statuses() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    app.vehicle("XYZ-987").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    app.state.assignments().assign(vehicle.id, driver.id).await.expect("assign");

    app.vehicle_document(vehicle.id, Some(app.days_from_today(45))).await;
    app.vehicle_document(vehicle.id, None).await;
    app.driver_document(driver.id, "CNH-1", Some(app.days_from_today(-1))).await;
    app.state
        .inspections()
        .enqueue(
            PendingInput {
                vehicle_id: Some(vehicle.id),
                trip_type: Some(fleet_dms::models::TripType::Internal),
                trip_destination: Some("Tete".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .expect("enqueue");

    app.clock.advance(Duration::days(20));
    let summary = app.state.reports().fleet_summary().await.expect("summary");
    assert_eq!(summary.vehicles.total, 2);
    assert_eq!(summary.vehicles.assigned, 1);
    assert_eq!(summary.drivers.total, 1);
    assert_eq!(summary.documents.total, 3);
    assert_eq!(summary.documents.expiring_30_days, 1);
    assert_eq!(summary.documents.expired, 1);
    assert_eq!(summary.documents.permanent, 1);
    assert_eq!(summary.pending_inspections, 1);
}

#[tokio::test]
async fn expiring_report_mixes_owners_soonest_first() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;

    let vehicle_soon = app.vehicle_document(vehicle.id, Some(app.days_from_today(25))).await;
    app.vehicle_document(vehicle.id, Some(app.days_from_today(90))).await;
    let driver_expired = app
        .driver_document(driver.id, "CNH-1", Some(app.days_from_today(-10)))
        .await;

    let report = app.state.reports().expiring_documents().await.expect("report");
    let ids: Vec<_> = report.iter().map(|entry| entry.document.id).collect();
    assert_eq!(ids, [driver_expired.id, vehicle_soon.id]);
    assert_eq!(report[0].owner_label, "Joao Mucavele");
    assert_eq!(report[0].document.current_status, DocumentStatus::Expired);
    assert_eq!(report[1].owner_label, "ABC-123");
}

#[tokio::test]
async fn all_documents_lists_vehicle_papers_first() {
    let app = TestApp::new();
    let second = app.vehicle("ZZZ-999").await;
    let first = app.vehicle("AAA-111").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    app.driver_document(driver.id, "CNH-1", None).await;
    app.vehicle_document(second.id, None).await;
    app.vehicle_document(first.id, None).await;

    let labels: Vec<String> = app
        .state
        .reports()
        .all_documents()
        .await
        .expect("report")
        .into_iter()
        .map(|entry| entry.owner_label)
        .collect();
    assert_eq!(labels, ["AAA-111", "ZZZ-999", "Joao Mucavele"]);
}

#[tokio::test]
async fn driver_profile_gathers_documents_flows_and_vehicle() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    app.state.assignments().assign(vehicle.id, driver.id).await.expect("assign");
    app.driver_document(driver.id, "CNH-1", None).await;
    let paper = app.vehicle_document(vehicle.id, None).await;
    app.state
        .flows()
        .record_withdrawal(paper.id, driver.id, None, None)
        .await
        .expect("withdrawal");

    let profile = app
        .state
        .reports()
        .driver_profile(driver.id)
        .await
        .expect("profile");
    assert_eq!(profile.driver.id, driver.id);
    assert_eq!(profile.documents.len(), 1);
    assert_eq!(profile.flow_records.len(), 1);
    assert_eq!(profile.vehicle.map(|v| v.id), Some(vehicle.id));

    assert!(matches!(
        app.state.reports().driver_profile(uuid::Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn flow_report_honours_open_and_closed_windows() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let paper = app.vehicle_document(vehicle.id, None).await;
    let flows = app.state.flows();

    flows.record_withdrawal(paper.id, driver.id, None, None).await.expect("w");
    app.clock.advance(Duration::days(5));
    let midpoint = app.clock.now();
    flows.record_return(paper.id, driver.id, None).await.expect("r");

    let reports = app.state.reports();
    let everything = reports.flow_report(FlowWindow::default()).await.expect("report");
    assert_eq!(everything.len(), 2);

    let from_midpoint = reports
        .flow_report(FlowWindow {
            start: Some(midpoint),
            end: None,
        })
        .await
        .expect("report");
    assert_eq!(from_midpoint.len(), 1);

    let inverted = reports
        .flow_report(FlowWindow {
            start: Some(midpoint),
            end: Some(midpoint - Duration::days(1)),
        })
        .await;
    assert!(matches!(inverted, Err(AppError::Validation(_))));
}
