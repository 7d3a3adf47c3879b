use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::checklist::{HorseChecklist, TrailerChecklist};
use crate::dtos::{
    AffectedResponse, AssignDriverRequest, ConditionCheckQuery, FlowWindowQuery, HealthResponse,
    MarkInspectedRequest, OverdueQuery, ReturnRequest, TransferRequest, TripTypeQuery,
    WithdrawalRequest,
};
use crate::models::{
    Alert, ComponentCondition, ConditionComponents, Document, DocumentType, Driver, DriverStatus,
    FileRef, FlowEntry, FlowRecord, FlowRecordChanges, InspectionStatus, NewDriver, NewVehicle,
    OperationType, OwnerKind, PendingInspection, PendingStatus, PostTripInspection, TripType,
    Vehicle, VehicleConditionCheck, VehicleStatus,
};
use crate::services::documents::DocumentInput;
use crate::services::fleet::VehicleOverview;
use crate::services::flow::{FlowRecordInput, OutstandingDocument, VehicleFlows};
use crate::services::inspections::{
    ConditionCheckInput, ConditionReport, InspectionInput, InspectionQuery, InspectionStats,
    OverdueVehicle, PendingInput, PendingSummary,
};
use crate::services::reports::{
    DocumentCounts, DriverCounts, DriverProfile, FleetSummary, FlowWindow, OwnedDocument,
    VehicleCounts,
};
use crate::status::DocumentStatus;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::vehicles::list_vehicles,
        crate::routes::vehicles::create_vehicle,
        crate::routes::vehicles::get_vehicle,
        crate::routes::vehicles::update_vehicle,
        crate::routes::vehicles::delete_vehicle,
        crate::routes::vehicles::assign_driver,
        crate::routes::vehicles::unassign_driver,
        crate::routes::vehicles::transfer_vehicle,
        crate::routes::vehicles::list_vehicle_documents,
        crate::routes::vehicles::create_vehicle_document,
        crate::routes::vehicles::list_vehicle_flows,
        crate::routes::vehicles::clear_vehicle_flows,
        crate::routes::vehicles::list_vehicle_inspections,
        crate::routes::vehicles::latest_condition_check,
        crate::routes::drivers::list_drivers,
        crate::routes::drivers::create_driver,
        crate::routes::drivers::get_driver,
        crate::routes::drivers::update_driver,
        crate::routes::drivers::delete_driver,
        crate::routes::drivers::unassign_driver_vehicles,
        crate::routes::drivers::list_driver_documents,
        crate::routes::drivers::create_driver_document,
        crate::routes::drivers::list_driver_flows,
        crate::routes::drivers::driver_profile,
        crate::routes::drivers::get_photo,
        crate::routes::drivers::upload_photo,
        crate::routes::drivers::delete_photo,
        crate::routes::documents::list_documents,
        crate::routes::documents::get_document,
        crate::routes::documents::update_document,
        crate::routes::documents::delete_document,
        crate::routes::documents::replace_file,
        crate::routes::documents::download_document,
        crate::routes::documents::list_alerts,
        crate::routes::documents::list_document_flows,
        crate::routes::documents::document_custody,
        crate::routes::documents::refresh_statuses,
        crate::routes::flow_records::list_flow_records,
        crate::routes::flow_records::flows_by_vehicle,
        crate::routes::flow_records::flows_in_range,
        crate::routes::flow_records::outstanding_documents,
        crate::routes::flow_records::create_flow_record,
        crate::routes::flow_records::record_withdrawal,
        crate::routes::flow_records::record_return,
        crate::routes::flow_records::get_flow_record,
        crate::routes::flow_records::update_flow_record,
        crate::routes::flow_records::delete_flow_record,
        crate::routes::inspections::list_inspections,
        crate::routes::inspections::create_inspection,
        crate::routes::inspections::todays_inspections,
        crate::routes::inspections::inspection_stats,
        crate::routes::inspections::overdue_vehicles,
        crate::routes::inspections::get_inspection,
        crate::routes::inspections::update_inspection,
        crate::routes::inspections::delete_inspection,
        crate::routes::pending::list_pending,
        crate::routes::pending::enqueue,
        crate::routes::pending::pending_summary,
        crate::routes::pending::get_pending,
        crate::routes::pending::mark_inspected,
        crate::routes::pending::cancel_pending,
        crate::routes::pending::delete_pending,
        crate::routes::condition_checks::list_checks,
        crate::routes::condition_checks::create_check,
        crate::routes::condition_checks::get_check,
        crate::routes::condition_checks::update_check,
        crate::routes::condition_checks::delete_check,
        crate::routes::reports::fleet_summary,
        crate::routes::reports::expiring_documents,
        crate::routes::reports::all_documents,
        crate::routes::reports::flow_report,
    ),
    components(schemas(
        Vehicle,
        NewVehicle,
        VehicleStatus,
        VehicleOverview,
        Driver,
        NewDriver,
        DriverStatus,
        Document,
        DocumentInput,
        DocumentType,
        DocumentStatus,
        OwnerKind,
        FileRef,
        Alert,
        OperationType,
        FlowRecord,
        FlowRecordInput,
        FlowRecordChanges,
        FlowEntry,
        VehicleFlows,
        OutstandingDocument,
        ComponentCondition,
        ConditionComponents,
        VehicleConditionCheck,
        ConditionCheckInput,
        ConditionReport,
        TripType,
        InspectionStatus,
        HorseChecklist,
        TrailerChecklist,
        PostTripInspection,
        InspectionInput,
        InspectionQuery,
        InspectionStats,
        OverdueVehicle,
        PendingStatus,
        PendingInspection,
        PendingInput,
        PendingSummary,
        VehicleCounts,
        DriverCounts,
        DocumentCounts,
        FleetSummary,
        OwnedDocument,
        DriverProfile,
        FlowWindow,
        AssignDriverRequest,
        TransferRequest,
        WithdrawalRequest,
        ReturnRequest,
        MarkInspectedRequest,
        TripTypeQuery,
        OverdueQuery,
        ConditionCheckQuery,
        FlowWindowQuery,
        AffectedResponse,
        HealthResponse,
    )),
    tags(
        (name = "vehicles", description = "Vehicle registry and driver assignment"),
        (name = "drivers", description = "Driver registry, photos and profiles"),
        (name = "documents", description = "Document records, files and expiry status"),
        (name = "flow-records", description = "Document withdrawal and return log"),
        (name = "inspections", description = "Post-trip inspections"),
        (name = "pending-inspections", description = "Vehicles queued for inspection"),
        (name = "condition-checks", description = "Vehicle condition checks"),
        (name = "reports", description = "Fleet-wide summaries"),
        (name = "health", description = "Liveness"),
    ),
    info(
        title = "Fleet Document Management API",
        version = "1.0.0",
        description = "REST API for vehicles, drivers, their documents, custody flows and inspections"
    ),
    servers(
        (url = "http://localhost:3000", description = "Development server")
    )
)]
pub struct ApiDoc;

pub fn openapi_with_security() -> utoipa::openapi::OpenApi {
    let mut openapi = ApiDoc::openapi();
    if let Some(components) = openapi.components.as_mut() {
        components.add_security_scheme(
            "user_id",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_ID_HEADER))),
        );
        components.add_security_scheme(
            "user_role",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_ROLE_HEADER))),
        );
    }
    openapi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths_and_header_schemes() {
        let doc = openapi_with_security();
        for path in [
            "/vehicles/{id}/assign",
            "/documents/{id}/content",
            "/flow-records/withdrawal",
            "/pending-inspections",
            "/reports/expiring-documents",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("user_id"));
        assert!(components.security_schemes.contains_key("user_role"));
    }
}
