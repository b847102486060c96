//! Venue design and project service endpoints.

use crate::aggregates::design::DesignAction;
use crate::server::error::AppError;
use crate::server::state::AppState;
use crate::types::{
    BookingId, BundleId, CameraState, ElementKind, ListingId, PlacedElement,
    PlacementId, PlacementMeta, ProjectId, ProjectService, Transform, VenueDesign,
};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for placing an element
#[derive(Debug, Deserialize)]
pub struct AddElementRequest {
    /// Listing the element comes from
    pub listing_id: Uuid,
    /// Object kind
    pub kind: ElementKind,
    /// Initial transform
    pub transform: Transform,
    /// Parent element for stacking
    pub parent_id: Option<Uuid>,
}

/// Request body for moving or locking an element
#[derive(Debug, Deserialize)]
pub struct UpdateElementRequest {
    /// New transform
    pub transform: Option<Transform>,
    /// New lock flag
    pub locked: Option<bool>,
}

/// Request body for re-parenting an element
#[derive(Debug, Deserialize)]
pub struct ReparentRequest {
    /// New parent, or null to detach
    pub parent_id: Option<Uuid>,
}

/// Request body for tagging a table with a per-table service
#[derive(Debug, Deserialize)]
pub struct TagRequest {
    /// Per-table listing
    pub listing_id: Uuid,
}

/// Request body for adding or updating a project service line
#[derive(Debug, Deserialize)]
pub struct ProjectServiceRequest {
    /// Requested quantity
    pub quantity: u32,
}

/// Request body for adding a project service line
#[derive(Debug, Deserialize)]
pub struct AddProjectServiceRequest {
    /// Listing the line refers to
    pub listing_id: Uuid,
    /// Requested quantity
    pub quantity: u32,
}

/// One element in a design response
#[derive(Debug, Serialize)]
pub struct ElementResponse {
    /// Placement id
    pub id: PlacementId,
    /// Object kind
    pub kind: ElementKind,
    /// World transform
    pub transform: Transform,
    /// Lock flag
    pub locked: bool,
    /// Parent element
    pub parent_id: Option<PlacementId>,
    /// Whether an active booking claims the element
    pub is_booked: bool,
    /// The claiming booking
    pub booking_id: Option<BookingId>,
    /// Per-table service tags
    pub service_listing_ids: Vec<ListingId>,
    /// Listing association
    pub meta: Option<PlacementMeta>,
}

/// Response body describing a project's design
#[derive(Debug, Serialize)]
pub struct DesignResponse {
    /// Owning project
    pub project_id: ProjectId,
    /// Placed elements
    pub elements: Vec<ElementResponse>,
    /// Saved camera
    pub camera: Option<CameraState>,
}

impl DesignResponse {
    fn from_design(design: &VenueDesign) -> Self {
        let mut elements: Vec<ElementResponse> = design
            .elements
            .values()
            .map(|e: &PlacedElement| ElementResponse {
                id: e.id,
                kind: e.kind,
                transform: e.transform,
                locked: e.locked,
                parent_id: e.parent_id,
                is_booked: e.is_booked,
                booking_id: e.booking_id,
                service_listing_ids: e.service_listing_ids.clone(),
                meta: design.placements_meta.get(&e.id).copied(),
            })
            .collect();
        elements.sort_by_key(|e| e.id.to_string());
        Self {
            project_id: design.project_id,
            elements,
            camera: design.camera,
        }
    }

    fn empty(project_id: ProjectId) -> Self {
        Self {
            project_id,
            elements: Vec::new(),
            camera: None,
        }
    }
}

/// Response body for a project service line
#[derive(Debug, Serialize)]
pub struct ProjectServiceResponse {
    /// Listing the line refers to
    pub service_listing_id: ListingId,
    /// Quantity
    pub quantity: u32,
    /// Whether an active booking claims the line
    pub is_booked: bool,
    /// The claiming booking
    pub booking_id: Option<BookingId>,
}

impl From<&ProjectService> for ProjectServiceResponse {
    fn from(service: &ProjectService) -> Self {
        Self {
            service_listing_id: service.service_listing_id,
            quantity: service.quantity,
            is_booked: service.is_booked,
            booking_id: service.booking_id,
        }
    }
}

/// `GET /api/projects/:id/design`
pub async fn get_design(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<DesignResponse>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .with_state(|s| {
            s.project(project_id)?;
            Some(
                s.design(project_id)
                    .map_or_else(|| DesignResponse::empty(project_id), DesignResponse::from_design),
            )
        })
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Project not found"))
}

/// `POST /api/projects/:id/design/elements`
pub async fn add_element(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<AddElementRequest>,
) -> Result<(StatusCode, Json<DesignResponse>), AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .dispatch_design(DesignAction::AddElement {
            placement_id: PlacementId::new(),
            project_id,
            listing_id: ListingId::from_uuid(request.listing_id),
            kind: request.kind,
            transform: request.transform,
            parent_id: request.parent_id.map(PlacementId::from_uuid),
        })
        .await?;
    let response = design_response(&state, project_id).await?;
    Ok((StatusCode::CREATED, response))
}

/// `PATCH /api/projects/:id/design/elements/:placement_id`
pub async fn update_element(
    State(state): State<AppState>,
    Path((project_id, placement_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateElementRequest>,
) -> Result<Json<DesignResponse>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .dispatch_design(DesignAction::UpdateElement {
            project_id,
            placement_id: PlacementId::from_uuid(placement_id),
            transform: request.transform,
            locked: request.locked,
        })
        .await?;
    design_response(&state, project_id).await
}

/// `POST /api/projects/:id/design/elements/:placement_id/reparent`
pub async fn reparent_element(
    State(state): State<AppState>,
    Path((project_id, placement_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ReparentRequest>,
) -> Result<Json<DesignResponse>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .dispatch_design(DesignAction::ReparentElement {
            project_id,
            placement_id: PlacementId::from_uuid(placement_id),
            parent_id: request.parent_id.map(PlacementId::from_uuid),
        })
        .await?;
    design_response(&state, project_id).await
}

/// `DELETE /api/projects/:id/design/elements/:placement_id`
pub async fn remove_element(
    State(state): State<AppState>,
    Path((project_id, placement_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DesignResponse>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .dispatch_design(DesignAction::RemoveElement {
            project_id,
            placement_id: PlacementId::from_uuid(placement_id),
        })
        .await?;
    design_response(&state, project_id).await
}

/// `POST /api/projects/:id/design/elements/:placement_id/duplicate`
pub async fn duplicate_element(
    State(state): State<AppState>,
    Path((project_id, placement_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<DesignResponse>), AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .dispatch_design(DesignAction::DuplicateElement {
            project_id,
            source_id: PlacementId::from_uuid(placement_id),
        })
        .await?;
    let response = design_response(&state, project_id).await?;
    Ok((StatusCode::CREATED, response))
}

/// `POST /api/projects/:id/design/bundles/:bundle_id/duplicate`
pub async fn duplicate_bundle(
    State(state): State<AppState>,
    Path((project_id, bundle_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<DesignResponse>), AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .dispatch_design(DesignAction::DuplicateBundle {
            project_id,
            bundle_id: BundleId::from_uuid(bundle_id),
        })
        .await?;
    let response = design_response(&state, project_id).await?;
    Ok((StatusCode::CREATED, response))
}

/// `POST /api/projects/:id/design/elements/:placement_id/tags`
pub async fn tag_table_service(
    State(state): State<AppState>,
    Path((project_id, placement_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<TagRequest>,
) -> Result<Json<DesignResponse>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .dispatch_design(DesignAction::TagTableService {
            project_id,
            placement_id: PlacementId::from_uuid(placement_id),
            listing_id: ListingId::from_uuid(request.listing_id),
        })
        .await?;
    design_response(&state, project_id).await
}

/// `DELETE /api/projects/:id/design/elements/:placement_id/tags/:listing_id`
pub async fn untag_table_service(
    State(state): State<AppState>,
    Path((project_id, placement_id, listing_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<DesignResponse>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .dispatch_design(DesignAction::UntagTableService {
            project_id,
            placement_id: PlacementId::from_uuid(placement_id),
            listing_id: ListingId::from_uuid(listing_id),
        })
        .await?;
    design_response(&state, project_id).await
}

/// `PUT /api/projects/:id/design/camera`
pub async fn set_camera(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(camera): Json<CameraState>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .dispatch_design(DesignAction::SetCamera {
            project_id: ProjectId::from_uuid(project_id),
            camera,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/projects/:id/services`
pub async fn list_project_services(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ProjectServiceResponse>>, AppError> {
    let project_id = ProjectId::from_uuid(project_id);
    state
        .store
        .with_state(|s| {
            s.project(project_id)?;
            let mut services: Vec<ProjectServiceResponse> = s
                .project_services
                .iter()
                .filter(|((pid, _), _)| *pid == project_id)
                .map(|(_, service)| ProjectServiceResponse::from(service))
                .collect();
            services.sort_by_key(|svc| svc.service_listing_id.to_string());
            Some(services)
        })
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Project not found"))
}

/// `POST /api/projects/:id/services`
pub async fn add_project_service(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<AddProjectServiceRequest>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .dispatch_design(DesignAction::AddProjectService {
            project_id: ProjectId::from_uuid(project_id),
            listing_id: ListingId::from_uuid(request.listing_id),
            quantity: request.quantity,
        })
        .await?;
    Ok(StatusCode::CREATED)
}

/// `PATCH /api/projects/:id/services/:listing_id`
pub async fn update_project_service(
    State(state): State<AppState>,
    Path((project_id, listing_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ProjectServiceRequest>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .dispatch_design(DesignAction::UpdateProjectService {
            project_id: ProjectId::from_uuid(project_id),
            listing_id: ListingId::from_uuid(listing_id),
            quantity: request.quantity,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/projects/:id/services/:listing_id`
pub async fn remove_project_service(
    State(state): State<AppState>,
    Path((project_id, listing_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .dispatch_design(DesignAction::RemoveProjectService {
            project_id: ProjectId::from_uuid(project_id),
            listing_id: ListingId::from_uuid(listing_id),
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn design_response(
    state: &AppState,
    project_id: ProjectId,
) -> Result<Json<DesignResponse>, AppError> {
    state
        .store
        .with_state(|s| {
            Some(
                s.design(project_id)
                    .map_or_else(|| DesignResponse::empty(project_id), DesignResponse::from_design),
            )
        })
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Design not found"))
}
