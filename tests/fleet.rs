mod common;

use common::{document_input, upload, TestApp};
use fleet_dms::error::AppError;
use fleet_dms::models::{DocumentOwner, DocumentType, NewVehicle, VehicleStatus};
use fleet_dms::outcome::{EffectStatus, SideEffect};

#[tokio::test]
async fn a_vehicle_holds_one_driver_at_a_time() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let first = app.driver("D-001", "Joao Mucavele").await;
    let second = app.driver("D-002", "Maria Chissano").await;
    let assignments = app.state.assignments();

    let assigned = assignments.assign(vehicle.id, first.id).await.expect("assign");
    assert_eq!(assigned.assigned_driver_id, Some(first.id));

    let taken = assignments.assign(vehicle.id, second.id).await;
    assert!(matches!(taken, Err(AppError::Conflict(_))));

    let again = assignments.assign(vehicle.id, first.id).await.expect("idempotent");
    assert_eq!(again.assigned_driver_id, Some(first.id));

    let released = assignments.unassign(vehicle.id).await.expect("unassign");
    assert_eq!(released.assigned_driver_id, None);

    let reassigned = assignments.assign(vehicle.id, second.id).await.expect("assign");
    assert_eq!(reassigned.assigned_driver_id, Some(second.id));
}

#[tokio::test]
async fn a_driver_holds_one_vehicle_at_a_time() {
    let app = TestApp::new();
    let truck = app.vehicle("ABC-123").await;
    let trailer = app.vehicle("XYZ-987").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let assignments = app.state.assignments();

    assignments.assign(truck.id, driver.id).await.expect("assign");
    let second = assignments.assign(trailer.id, driver.id).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    let trailer = app.state.fleet().get_vehicle(trailer.id).await.expect("get");
    assert_eq!(trailer.assigned_driver_id, None);
}

#[tokio::test]
async fn transfer_requires_the_current_driver() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let from = app.driver("D-001", "Joao Mucavele").await;
    let to = app.driver("D-002", "Maria Chissano").await;
    let assignments = app.state.assignments();
    assignments.assign(vehicle.id, from.id).await.expect("assign");

    let wrong = assignments.transfer(vehicle.id, to.id, from.id).await;
    assert!(matches!(wrong, Err(AppError::Validation(_))));

    let moved = assignments.transfer(vehicle.id, from.id, to.id).await.expect("transfer");
    assert_eq!(moved.assigned_driver_id, Some(to.id));
}

#[tokio::test]
async fn unassigning_an_unknown_driver_is_a_no_op() {
    let app = TestApp::new();
    let released = app
        .state
        .assignments()
        .unassign_by_driver(uuid::Uuid::new_v4())
        .await
        .expect("no match is fine");
    assert_eq!(released, 0);
}

#[tokio::test]
async fn driver_with_a_vehicle_cannot_be_deleted() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let assignments = app.state.assignments();
    let fleet = app.state.fleet();
    assignments.assign(vehicle.id, driver.id).await.expect("assign");

    let refused = fleet.delete_driver(driver.id).await;
    assert!(matches!(refused, Err(AppError::Conflict(_))));
    let untouched = fleet.get_vehicle(vehicle.id).await.expect("get");
    assert_eq!(untouched.assigned_driver_id, Some(driver.id));

    assert_eq!(assignments.unassign_by_driver(driver.id).await.expect("release"), 1);
    fleet.delete_driver(driver.id).await.expect("delete");

    let vehicle = fleet.get_vehicle(vehicle.id).await.expect("get");
    assert_eq!(vehicle.assigned_driver_id, None);
    assert!(matches!(fleet.get_driver(driver.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn plates_and_staff_numbers_are_unique() {
    let app = TestApp::new();
    app.vehicle("ABC-123").await;
    app.driver("D-001", "Joao Mucavele").await;
    let fleet = app.state.fleet();

    let plate = fleet
        .create_vehicle(NewVehicle {
            license_plate: "ABC-123".to_string(),
            model: "Volvo FH".to_string(),
            department: "Mining".to_string(),
            fleet: None,
            color: None,
            status: VehicleStatus::Active,
        })
        .await;
    assert!(matches!(plate, Err(AppError::Conflict(_))));

    let staff_no = fleet
        .create_driver(fleet_dms::models::NewDriver {
            staff_no: "D-001".to_string(),
            name: "Someone Else".to_string(),
            contact: "+258 82 111 1111".to_string(),
            ..Default::default()
        })
        .await;
    assert!(matches!(staff_no, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn vehicle_overview_counts_live_document_health() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let driver = app.driver("D-001", "Joao Mucavele").await;
    app.state.assignments().assign(vehicle.id, driver.id).await.expect("assign");
    app.vehicle_document(vehicle.id, Some(app.days_from_today(-3))).await;
    app.vehicle_document(vehicle.id, Some(app.days_from_today(12))).await;
    app.vehicle_document(vehicle.id, None).await;

    let overview = app.state.fleet().list_vehicles().await.expect("list");
    assert_eq!(overview.len(), 1);
    let row = &overview[0];
    assert_eq!(row.total_documents, 3);
    assert_eq!(row.expired_documents, 1);
    assert_eq!(row.expiring_documents, 1);
    assert_eq!(row.driver_name.as_deref(), Some("Joao Mucavele"));
    assert_eq!(row.driver_staff_no.as_deref(), Some("D-001"));
}

#[tokio::test]
async fn deleting_a_vehicle_cascades_to_its_documents_and_files() {
    let app = TestApp::new();
    let vehicle = app.vehicle("ABC-123").await;
    let created = app
        .state
        .documents()
        .create(
            DocumentOwner::Vehicle(vehicle.id),
            document_input(DocumentType::Insurance, None),
            Some(upload("policy.pdf", b"bytes")),
        )
        .await
        .expect("create");
    let file = created.value.file.clone().expect("file attached");

    let deleted = app.state.fleet().delete_vehicle(vehicle.id).await.expect("delete");
    assert_eq!(deleted.status_of(SideEffect::BlobCleanup), Some(&EffectStatus::Applied));
    assert!(!app.state.blobs.exists(&file.path).await.expect("stat"));
    assert!(app.state.documents().list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn replacing_a_photo_releases_the_old_one() {
    let app = TestApp::new();
    let driver = app.driver("D-001", "Joao Mucavele").await;
    let fleet = app.state.fleet();

    let first = fleet
        .set_photo(driver.id, upload("face.jpg", b"one"))
        .await
        .expect("photo");
    let first_path = first.value.profile_photo.clone().expect("photo path");

    let second = fleet
        .set_photo(driver.id, upload("face.png", b"two"))
        .await
        .expect("photo");
    assert_eq!(second.status_of(SideEffect::BlobCleanup), Some(&EffectStatus::Applied));
    assert!(!app.state.blobs.exists(&first_path).await.expect("stat"));

    let (file, bytes) = fleet.photo(driver.id).await.expect("read photo");
    assert_eq!(file.mime_type.as_deref(), Some("image/png"));
    assert_eq!(bytes, b"two");

    fleet.remove_photo(driver.id).await.expect("remove");
    assert!(matches!(fleet.photo(driver.id).await, Err(AppError::NotFound(_))));
}
