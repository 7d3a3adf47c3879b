mod common;

use chrono::Duration;
use uuid::Uuid;

use common::TestApp;
use fleet_dms::checklist::{HorseChecklist, TrailerChecklist};
use fleet_dms::error::AppError;
use fleet_dms::models::{ComponentCondition, ConditionComponents, InspectionStatus, PendingStatus, TripType, VehicleStatus};
use fleet_dms::outcome::{EffectStatus, SideEffect};
use fleet_dms::services::inspections::{
    ConditionCheckInput, InspectionInput, InspectionQuery, PendingInput,
};
use fleet_dms::store::FaultPoint;

fn inspection(vehicle_id: Uuid, driver_id: Uuid, trip_type: TripType) -> InspectionInput {
    InspectionInput {
        vehicle_id: Some(vehicle_id),
        driver_id: Some(driver_id),
        trip_type: Some(trip_type),
        trip_destination: Some("Lusaka".to_string()),
        horse: HorseChecklist::all_checked(),
        trailer: TrailerChecklist::all_checked(),
        ..Default::default()
    }
}

fn pending(vehicle_id: Uuid) -> PendingInput {
    PendingInput {
        vehicle_id: Some(vehicle_id),
        trip_type: Some(TripType::LongTrip),
        trip_destination: Some("Harare".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn complete_papers_are_verified_and_one_gap_is_named() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let recorder = app.state.inspections();

    let verified = recorder
        .create(inspection(vehicle.id, driver.id, TripType::LongTrip), None)
        .await
        .expect("create")
        .value;
    assert!(verified.documents_complete);
    assert_eq!(verified.status, InspectionStatus::Verified);
    assert_eq!(verified.missing_documents, "");

    let mut input = inspection(vehicle.id, driver.id, TripType::LongTrip);
    input.trailer.seguro = false;
    let incomplete = recorder.create(input, None).await.expect("create").value;
    assert!(!incomplete.documents_complete);
    assert_eq!(incomplete.status, InspectionStatus::Incomplete);
    assert_eq!(incomplete.missing_documents, "Trela: Seguro/Insurance");
}

#[tokio::test]
async fn update_derives_completeness_again() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let recorder = app.state.inspections();
    let created = recorder
        .create(inspection(vehicle.id, driver.id, TripType::Internal), None)
        .await
        .expect("create")
        .value;

    let mut input = inspection(vehicle.id, driver.id, TripType::Internal);
    input.horse.passaport = false;
    let updated = recorder.update(created.id, input).await.expect("update");
    assert_eq!(updated.status, InspectionStatus::Incomplete);
    assert_eq!(updated.missing_documents, "Cabeça: Passaport");
    assert_eq!(updated.inspection_date, created.inspection_date);
}

#[tokio::test]
async fn required_fields_are_validated() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let recorder = app.state.inspections();

    let missing_driver = InspectionInput {
        vehicle_id: Some(vehicle.id),
        trip_type: Some(TripType::Internal),
        trip_destination: Some("Tete".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        recorder.create(missing_driver, None).await,
        Err(AppError::Validation(_))
    ));

    let blank_destination = PendingInput {
        trip_destination: Some("   ".to_string()),
        ..pending(vehicle.id)
    };
    assert!(matches!(
        recorder.enqueue(blank_destination, None).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn one_open_pending_entry_per_vehicle() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let recorder = app.state.inspections();

    let first = recorder.enqueue(pending(vehicle.id), None).await.expect("enqueue");
    assert!(matches!(
        recorder.enqueue(pending(vehicle.id), None).await,
        Err(AppError::Conflict(_))
    ));

    let cancelled = recorder.cancel(first.id).await.expect("cancel");
    assert_eq!(cancelled.status, PendingStatus::Cancelled);
    let second = recorder.enqueue(pending(vehicle.id), None).await.expect("enqueue");

    let inspected = recorder.mark_inspected(second.id, None).await.expect("inspected");
    assert_eq!(inspected.status, PendingStatus::Inspected);
    assert!(inspected.inspected_at.is_some());
    recorder.enqueue(pending(vehicle.id), None).await.expect("enqueue again");

    assert!(matches!(
        recorder.cancel(first.id).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn inspection_resolves_its_pending_entry() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let recorder = app.state.inspections();
    let entry = recorder.enqueue(pending(vehicle.id), None).await.expect("enqueue");

    let input = InspectionInput {
        pending_inspection_id: Some(entry.id),
        ..inspection(vehicle.id, driver.id, TripType::LongTrip)
    };
    let outcome = recorder.create(input, None).await.expect("create");
    assert_eq!(outcome.status_of(SideEffect::ResolvePending), Some(&EffectStatus::Applied));

    let resolved = recorder.get_pending(entry.id).await.expect("pending");
    assert_eq!(resolved.status, PendingStatus::Inspected);
    assert_eq!(resolved.inspection_id, Some(outcome.value.id));
    assert!(recorder.list_pending(None).await.expect("list").is_empty());
}

#[tokio::test]
async fn failed_resolution_keeps_the_inspection() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let recorder = app.state.inspections();
    let entry = recorder.enqueue(pending(vehicle.id), None).await.expect("enqueue");
    app.store.inject_fault(FaultPoint::SetPendingStatus);

    let input = InspectionInput {
        pending_inspection_id: Some(entry.id),
        ..inspection(vehicle.id, driver.id, TripType::LongTrip)
    };
    let outcome = recorder.create(input, None).await.expect("primary write succeeds");
    assert!(matches!(
        outcome.status_of(SideEffect::ResolvePending),
        Some(EffectStatus::Failed(_))
    ));
    recorder.get(outcome.value.id).await.expect("inspection kept");

    app.store.clear_faults();
    let still_open = recorder.get_pending(entry.id).await.expect("pending");
    assert_eq!(still_open.status, PendingStatus::Pending);
}

#[tokio::test]
async fn pending_entry_of_another_vehicle_is_rejected() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let other = app.vehicle("XYZ-987").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let recorder = app.state.inspections();
    let entry = recorder.enqueue(pending(other.id), None).await.expect("enqueue");

    let input = InspectionInput {
        pending_inspection_id: Some(entry.id),
        ..inspection(vehicle.id, driver.id, TripType::LongTrip)
    };
    assert!(matches!(
        recorder.create(input, None).await,
        Err(AppError::Validation(_))
    ));
    assert!(recorder.list_for_vehicle(vehicle.id).await.expect("list").is_empty());
}

#[tokio::test]
async fn pending_summary_counts_open_entries_by_trip() {
    let app = TestApp::new();
    let recorder = app.state.inspections();
    for (plate, trip_type) in [
        ("AAA-001", TripType::Internal),
        ("AAA-002", TripType::LongTrip),
        ("AAA-003", TripType::LongTrip),
    ] {
        let vehicle = app.vehicle(plate).await;
        recorder
            .enqueue(
                PendingInput {
                    trip_type: Some(trip_type),
                    ..pending(vehicle.id)
                },
                None,
            )
            .await
            .expect("enqueue");
    }

    let summary = recorder.pending_summary().await.expect("summary");
    assert_eq!((summary.total, summary.internal, summary.long_trip), (3, 1, 2));
    assert_eq!(
        recorder
            .list_pending(Some(TripType::Internal))
            .await
            .expect("list")
            .len(),
        1
    );
}

#[tokio::test]
async fn listing_by_day_and_range() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let recorder = app.state.inspections();

    recorder
        .create(inspection(vehicle.id, driver.id, TripType::Internal), None)
        .await
        .expect("create");
    app.clock.advance(Duration::days(2));
    recorder
        .create(inspection(vehicle.id, driver.id, TripType::LongTrip), None)
        .await
        .expect("create");

    assert_eq!(recorder.list_today().await.expect("today").len(), 1);

    let range = recorder
        .list(InspectionQuery {
            start_date: Some(common::today()),
            end_date: Some(app.today()),
            ..Default::default()
        })
        .await
        .expect("range");
    assert_eq!(range.len(), 2);

    let long_trips = recorder
        .list(InspectionQuery {
            trip_type: Some(TripType::LongTrip),
            ..Default::default()
        })
        .await
        .expect("by trip");
    assert_eq!(long_trips.len(), 1);

    let half_open = recorder
        .list(InspectionQuery {
            start_date: Some(common::today()),
            ..Default::default()
        })
        .await;
    assert!(matches!(half_open, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn stats_cover_the_last_thirty_days() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let recorder = app.state.inspections();

    recorder
        .create(inspection(vehicle.id, driver.id, TripType::Internal), None)
        .await
        .expect("create");
    app.clock.advance(Duration::days(40));

    let mut input = inspection(vehicle.id, driver.id, TripType::LongTrip);
    input.horse.comesa = false;
    recorder.create(input, None).await.expect("create");
    recorder
        .create(inspection(vehicle.id, driver.id, TripType::Internal), None)
        .await
        .expect("create");

    let stats = recorder.stats().await.expect("stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.internal, 1);
    assert_eq!(stats.long_trip, 1);
    assert_eq!(stats.verified, 1);
    assert_eq!(stats.incomplete, 1);
    assert_eq!(stats.with_missing_documents, 1);
}

#[tokio::test]
async fn overdue_roster_uses_the_trip_period() {
    let app = TestApp::new();
    let recent = app.vehicle("ABC-123").await;
    let stale = app.vehicle("XYZ-987").await;
    let parked = app.vehicle("PRK-000").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let fleet = app.state.fleet();
    fleet
        .update_vehicle(
            parked.id,
            fleet_dms::models::NewVehicle {
                license_plate: parked.license_plate.clone(),
                model: parked.model.clone(),
                department: parked.department.clone(),
                fleet: None,
                color: None,
                status: VehicleStatus::Maintenance,
            },
        )
        .await
        .expect("park");

    let recorder = app.state.inspections();
    recorder
        .create(inspection(stale.id, driver.id, TripType::Internal), None)
        .await
        .expect("create");
    app.clock.advance(Duration::days(8));
    recorder
        .create(inspection(recent.id, driver.id, TripType::Internal), None)
        .await
        .expect("create");

    let overdue = recorder.overdue(TripType::Internal).await.expect("overdue");
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].vehicle.id, stale.id);
    assert_eq!(overdue[0].days_since_inspection, Some(8));

    let long_trip = recorder.overdue(TripType::LongTrip).await.expect("overdue");
    assert_eq!(long_trip.len(), 2);
    assert!(long_trip.iter().all(|row| row.last_inspection.is_none()));
}

#[tokio::test]
async fn condition_checks_default_to_good_and_report_defects() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let recorder = app.state.inspections();

    let clean = recorder
        .create_check(
            ConditionCheckInput {
                vehicle_id: Some(vehicle.id),
                ..Default::default()
            },
            None,
        )
        .await
        .expect("check");
    assert!(clean.defects.is_empty());

    app.clock.advance(Duration::hours(1));
    let damaged = recorder
        .create_check(
            ConditionCheckInput {
                vehicle_id: Some(vehicle.id),
                components: ConditionComponents {
                    tyres: ComponentCondition::Bad,
                    left_mirror: ComponentCondition::Bad,
                    ..Default::default()
                },
                ..Default::default()
            },
            None,
        )
        .await
        .expect("check");
    assert_eq!(damaged.defects, ["left_mirror", "tyres"]);

    let latest = recorder
        .latest_check(vehicle.id)
        .await
        .expect("latest")
        .expect("has checks");
    assert_eq!(latest.check.id, damaged.check.id);

    assert!(matches!(
        recorder.create_check(ConditionCheckInput::default(), None).await,
        Err(AppError::Validation(_))
    ));

    recorder.delete_check(clean.check.id).await.expect("delete");
    assert_eq!(recorder.list_checks(Some(vehicle.id)).await.expect("list").len(), 1);
}
