//! Venue design aggregate.
//!
//! Owns the 3D design surface: placing, moving, stacking, duplicating and
//! removing elements, per-table service tags, the non-3D project service
//! lines, and the saved camera. Placement-level edits that change what the
//! couple will pay feed a budget recompute back through the store.

use crate::availability::check_availability;
use crate::budget;
use crate::error::PlannerError;
use crate::types::{
    BundleId, CameraState, ElementKind, ListingId, PlacedElement, PlacementId,
    PlacementMeta, PlacementRole, PlannerState, PricingPolicy, ProjectId,
    ProjectService, Transform,
};
use aisle_core::effect::Effect;
use aisle_core::environment::{Clock, IdGenerator};
use aisle_core::reducer::Reducer;
use aisle_core::{SmallVec, smallvec};
use aisle_macros::Action;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Commands and events processed by the [`DesignReducer`]
#[derive(Action, Clone, Debug, Serialize, Deserialize)]
pub enum DesignAction {
    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------
    /// Place a new element from a listing into the design
    #[command]
    AddElement {
        /// Id for the new placement
        placement_id: PlacementId,
        /// Project whose design gains the element
        project_id: ProjectId,
        /// Listing the element comes from
        listing_id: ListingId,
        /// Object kind
        kind: ElementKind,
        /// Initial transform
        transform: Transform,
        /// Parent element for stacking, if any
        parent_id: Option<PlacementId>,
    },

    /// Move or (un)lock an element
    #[command]
    UpdateElement {
        /// Owning project
        project_id: ProjectId,
        /// Element to update
        placement_id: PlacementId,
        /// New transform, if changing
        transform: Option<Transform>,
        /// New lock flag, if changing
        locked: Option<bool>,
    },

    /// Re-parent an element (one stacking level only)
    #[command]
    ReparentElement {
        /// Owning project
        project_id: ProjectId,
        /// Element to re-parent
        placement_id: PlacementId,
        /// New parent, or `None` to detach
        parent_id: Option<PlacementId>,
    },

    /// Remove an element from the design
    #[command]
    RemoveElement {
        /// Owning project
        project_id: ProjectId,
        /// Element to remove
        placement_id: PlacementId,
    },

    /// Duplicate a single element as a new standalone unit
    #[command]
    DuplicateElement {
        /// Owning project
        project_id: ProjectId,
        /// Element to copy
        source_id: PlacementId,
    },

    /// Duplicate a whole bundle (e.g. a table with its chairs)
    #[command]
    DuplicateBundle {
        /// Owning project
        project_id: ProjectId,
        /// Bundle to copy
        bundle_id: BundleId,
    },

    /// Tag a table with a per-table service
    #[command]
    TagTableService {
        /// Owning project
        project_id: ProjectId,
        /// Table element to tag
        placement_id: PlacementId,
        /// Per-table listing
        listing_id: ListingId,
    },

    /// Remove a per-table service tag from a table
    #[command]
    UntagTableService {
        /// Owning project
        project_id: ProjectId,
        /// Tagged table element
        placement_id: PlacementId,
        /// Per-table listing
        listing_id: ListingId,
    },

    /// Add a non-3D service line to the project
    #[command]
    AddProjectService {
        /// Owning project
        project_id: ProjectId,
        /// Listing the line refers to
        listing_id: ListingId,
        /// Requested quantity
        quantity: u32,
    },

    /// Change the quantity of a project service line
    #[command]
    UpdateProjectService {
        /// Owning project
        project_id: ProjectId,
        /// Listing the line refers to
        listing_id: ListingId,
        /// New quantity
        quantity: u32,
    },

    /// Remove a project service line
    #[command]
    RemoveProjectService {
        /// Owning project
        project_id: ProjectId,
        /// Listing the line refers to
        listing_id: ListingId,
    },

    /// Save the editor camera state
    #[command]
    SetCamera {
        /// Owning project
        project_id: ProjectId,
        /// Camera state to save
        camera: CameraState,
    },

    /// Re-derive a project's planned spend and remaining budget
    #[command]
    RecomputeBudget {
        /// Project to reconcile
        project_id: ProjectId,
    },

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------
    /// Elements were placed (one for adds, several for bundle copies)
    #[event]
    ElementsPlaced {
        /// Owning project
        project_id: ProjectId,
        /// The placed elements with their listing associations
        placed: Vec<(PlacedElement, PlacementMeta)>,
    },

    /// An element's transform or lock changed
    #[event]
    ElementUpdated {
        /// Owning project
        project_id: ProjectId,
        /// Updated element
        placement_id: PlacementId,
        /// New transform, if changed
        transform: Option<Transform>,
        /// New lock flag, if changed
        locked: Option<bool>,
    },

    /// An element's parent changed
    #[event]
    ElementReparented {
        /// Owning project
        project_id: ProjectId,
        /// Re-parented element
        placement_id: PlacementId,
        /// New parent, or `None`
        parent_id: Option<PlacementId>,
    },

    /// An element was removed
    #[event]
    ElementRemoved {
        /// Owning project
        project_id: ProjectId,
        /// Removed element
        placement_id: PlacementId,
    },

    /// A table gained a per-table service tag
    #[event]
    TableServiceTagged {
        /// Owning project
        project_id: ProjectId,
        /// Tagged table
        placement_id: PlacementId,
        /// Per-table listing
        listing_id: ListingId,
    },

    /// A table lost a per-table service tag
    #[event]
    TableServiceUntagged {
        /// Owning project
        project_id: ProjectId,
        /// Untagged table
        placement_id: PlacementId,
        /// Per-table listing
        listing_id: ListingId,
    },

    /// A project service line was added
    #[event]
    ProjectServiceAdded {
        /// The new line
        service: ProjectService,
    },

    /// A project service line's quantity changed
    #[event]
    ProjectServiceUpdated {
        /// Owning project
        project_id: ProjectId,
        /// Listing the line refers to
        listing_id: ListingId,
        /// New quantity
        quantity: u32,
    },

    /// A project service line was removed
    #[event]
    ProjectServiceRemoved {
        /// Owning project
        project_id: ProjectId,
        /// Listing the line refers to
        listing_id: ListingId,
    },

    /// The editor camera was saved
    #[event]
    CameraSaved {
        /// Owning project
        project_id: ProjectId,
        /// Saved camera state
        camera: CameraState,
    },

    /// A command failed a business rule
    #[event]
    ValidationFailed {
        /// The failure
        error: PlannerError,
    },
}

/// Injected dependencies for the design reducer
pub struct DesignEnvironment {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Id source for duplicated elements and bundles
    pub ids: Arc<dyn IdGenerator>,
}

impl DesignEnvironment {
    /// Creates an environment around the given clock and id source
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { clock, ids }
    }
}

/// Reducer driving the venue design surface
#[derive(Clone, Copy, Debug, Default)]
pub struct DesignReducer;

impl DesignReducer {
    /// Creates a new `DesignReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn fail(
        state: &mut PlannerState,
        error: PlannerError,
    ) -> SmallVec<[Effect<DesignAction>; 4]> {
        warn!(error = %error, "design command rejected");
        Self::apply_event(state, &DesignAction::ValidationFailed { error });
        smallvec![]
    }

    fn budget_feedback(
        project_id: ProjectId,
    ) -> SmallVec<[Effect<DesignAction>; 4]> {
        smallvec![Effect::feedback(DesignAction::RecomputeBudget { project_id })]
    }

    /// Rejects the placement when the listing cannot be booked on the
    /// project's wedding date. Projects without a date are not gated.
    fn check_placement_availability(
        state: &PlannerState,
        project_id: ProjectId,
        listing_id: ListingId,
    ) -> Result<(), PlannerError> {
        let listing = state
            .listing(listing_id)
            .ok_or_else(|| PlannerError::not_found("Service listing", listing_id))?;
        if !listing.is_active {
            return Err(PlannerError::validation("Service is not active"));
        }
        let project = state
            .project(project_id)
            .ok_or_else(|| PlannerError::not_found("Project", project_id))?;
        let Some(wedding_date) = project.wedding_date else {
            return Ok(());
        };
        let report = check_availability(state, listing_id, wedding_date);
        if report.available {
            Ok(())
        } else {
            Err(PlannerError::conflict(
                report
                    .reason
                    .unwrap_or_else(|| "Service is unavailable".to_string()),
            ))
        }
    }

    fn next_quantity_index(
        state: &PlannerState,
        project_id: ProjectId,
        listing_id: ListingId,
    ) -> u32 {
        #[allow(clippy::cast_possible_truncation)] // Placement counts are small
        let index = state.design(project_id).map_or(0, |d| {
            d.placements_meta
                .values()
                .filter(|m| m.service_listing_id == listing_id)
                .count() as u32
        });
        index
    }

    #[allow(clippy::too_many_lines)]
    fn handle_command(
        state: &mut PlannerState,
        env: &DesignEnvironment,
        action: DesignAction,
    ) -> SmallVec<[Effect<DesignAction>; 4]> {
        match action {
            DesignAction::AddElement {
                placement_id,
                project_id,
                listing_id,
                kind,
                transform,
                parent_id,
            } => {
                if state
                    .design(project_id)
                    .is_some_and(|d| d.elements.contains_key(&placement_id))
                {
                    return Self::fail(
                        state,
                        PlannerError::conflict("Element already exists"),
                    );
                }
                if let Err(error) =
                    Self::check_placement_availability(state, project_id, listing_id)
                {
                    return Self::fail(state, error);
                }
                if let Some(parent) = parent_id {
                    if let Err(error) = Self::check_parent(state, project_id, parent) {
                        return Self::fail(state, error);
                    }
                }
                let unit_price = state
                    .listing(listing_id)
                    .map_or(crate::types::Money::ZERO, |l| l.base_price);
                let meta = PlacementMeta {
                    service_listing_id: listing_id,
                    bundle_id: None,
                    role: PlacementRole::Primary,
                    quantity_index: Self::next_quantity_index(
                        state, project_id, listing_id,
                    ),
                    unit_price,
                };
                let element = PlacedElement::new(placement_id, kind, transform, parent_id);
                Self::apply_event(
                    state,
                    &DesignAction::ElementsPlaced {
                        project_id,
                        placed: vec![(element, meta)],
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::UpdateElement {
                project_id,
                placement_id,
                transform,
                locked,
            } => {
                let Some(element) = state
                    .design(project_id)
                    .and_then(|d| d.elements.get(&placement_id))
                else {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Design element", placement_id),
                    );
                };
                // A locked element cannot be moved unless this command also
                // unlocks it.
                if transform.is_some() && element.locked && locked != Some(false) {
                    return Self::fail(
                        state,
                        PlannerError::validation("Element is locked"),
                    );
                }
                Self::apply_event(
                    state,
                    &DesignAction::ElementUpdated {
                        project_id,
                        placement_id,
                        transform,
                        locked,
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::ReparentElement {
                project_id,
                placement_id,
                parent_id,
            } => {
                let Some(design) = state.design(project_id) else {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Design", project_id),
                    );
                };
                if !design.elements.contains_key(&placement_id) {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Design element", placement_id),
                    );
                }
                if let Some(parent) = parent_id {
                    if parent == placement_id {
                        return Self::fail(
                            state,
                            PlannerError::validation(
                                "An element cannot be its own parent",
                            ),
                        );
                    }
                    let has_children = design
                        .elements
                        .values()
                        .any(|e| e.parent_id == Some(placement_id));
                    if has_children {
                        return Self::fail(
                            state,
                            PlannerError::validation(
                                "An element with children cannot be stacked",
                            ),
                        );
                    }
                    if let Err(error) = Self::check_parent(state, project_id, parent) {
                        return Self::fail(state, error);
                    }
                }
                Self::apply_event(
                    state,
                    &DesignAction::ElementReparented {
                        project_id,
                        placement_id,
                        parent_id,
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::RemoveElement {
                project_id,
                placement_id,
            } => {
                let Some(element) = state
                    .design(project_id)
                    .and_then(|d| d.elements.get(&placement_id))
                else {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Design element", placement_id),
                    );
                };
                if element.is_booked {
                    return Self::fail(
                        state,
                        PlannerError::conflict(
                            "Element is locked by an active booking",
                        ),
                    );
                }
                Self::apply_event(
                    state,
                    &DesignAction::ElementRemoved {
                        project_id,
                        placement_id,
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::DuplicateElement {
                project_id,
                source_id,
            } => {
                let Some((source, meta)) = state.design(project_id).and_then(|d| {
                    Some((
                        d.elements.get(&source_id)?.clone(),
                        *d.placements_meta.get(&source_id)?,
                    ))
                }) else {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Design element", source_id),
                    );
                };
                if let Err(error) = Self::check_placement_availability(
                    state,
                    project_id,
                    meta.service_listing_id,
                ) {
                    return Self::fail(state, error);
                }
                let new_id = PlacementId::from_uuid(env.ids.next_id());
                let mut element =
                    PlacedElement::new(new_id, source.kind, source.transform, None);
                element.transform.position[0] += 0.5;
                element.service_listing_ids = source.service_listing_ids;
                let new_meta = PlacementMeta {
                    bundle_id: None,
                    quantity_index: Self::next_quantity_index(
                        state,
                        project_id,
                        meta.service_listing_id,
                    ),
                    ..meta
                };
                Self::apply_event(
                    state,
                    &DesignAction::ElementsPlaced {
                        project_id,
                        placed: vec![(element, new_meta)],
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::DuplicateBundle {
                project_id,
                bundle_id,
            } => Self::handle_duplicate_bundle(state, env, project_id, bundle_id),

            DesignAction::TagTableService {
                project_id,
                placement_id,
                listing_id,
            } => {
                let Some(element) = state
                    .design(project_id)
                    .and_then(|d| d.elements.get(&placement_id))
                else {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Design element", placement_id),
                    );
                };
                if element.kind != ElementKind::Table {
                    return Self::fail(
                        state,
                        PlannerError::validation(
                            "Only tables accept per-table service tags",
                        ),
                    );
                }
                if element.service_listing_ids.contains(&listing_id) {
                    return Self::fail(
                        state,
                        PlannerError::conflict("Table already carries this tag"),
                    );
                }
                let Some(listing) = state.listing(listing_id) else {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Service listing", listing_id),
                    );
                };
                if listing.pricing_policy != PricingPolicy::PerTable {
                    return Self::fail(
                        state,
                        PlannerError::validation(
                            "Only per-table listings can tag tables",
                        ),
                    );
                }
                Self::apply_event(
                    state,
                    &DesignAction::TableServiceTagged {
                        project_id,
                        placement_id,
                        listing_id,
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::UntagTableService {
                project_id,
                placement_id,
                listing_id,
            } => {
                let tagged = state
                    .design(project_id)
                    .and_then(|d| d.elements.get(&placement_id))
                    .is_some_and(|e| e.service_listing_ids.contains(&listing_id));
                if !tagged {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Table service tag", placement_id),
                    );
                }
                Self::apply_event(
                    state,
                    &DesignAction::TableServiceUntagged {
                        project_id,
                        placement_id,
                        listing_id,
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::AddProjectService {
                project_id,
                listing_id,
                quantity,
            } => {
                if quantity == 0 {
                    return Self::fail(
                        state,
                        PlannerError::validation("Service quantity must be positive"),
                    );
                }
                if state.project_services.contains_key(&(project_id, listing_id)) {
                    return Self::fail(
                        state,
                        PlannerError::conflict(
                            "Service is already on this project",
                        ),
                    );
                }
                if let Err(error) =
                    Self::check_placement_availability(state, project_id, listing_id)
                {
                    return Self::fail(state, error);
                }
                Self::apply_event(
                    state,
                    &DesignAction::ProjectServiceAdded {
                        service: ProjectService {
                            project_id,
                            service_listing_id: listing_id,
                            quantity,
                            is_booked: false,
                            booking_id: None,
                        },
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::UpdateProjectService {
                project_id,
                listing_id,
                quantity,
            } => {
                let Some(service) =
                    state.project_services.get(&(project_id, listing_id))
                else {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Project service", listing_id),
                    );
                };
                if service.is_booked {
                    return Self::fail(
                        state,
                        PlannerError::conflict(
                            "Service is locked by an active booking",
                        ),
                    );
                }
                if quantity == 0 {
                    return Self::fail(
                        state,
                        PlannerError::validation("Service quantity must be positive"),
                    );
                }
                Self::apply_event(
                    state,
                    &DesignAction::ProjectServiceUpdated {
                        project_id,
                        listing_id,
                        quantity,
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::RemoveProjectService {
                project_id,
                listing_id,
            } => {
                let Some(service) =
                    state.project_services.get(&(project_id, listing_id))
                else {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Project service", listing_id),
                    );
                };
                if service.is_booked {
                    return Self::fail(
                        state,
                        PlannerError::conflict(
                            "Service is locked by an active booking",
                        ),
                    );
                }
                Self::apply_event(
                    state,
                    &DesignAction::ProjectServiceRemoved {
                        project_id,
                        listing_id,
                    },
                );
                Self::budget_feedback(project_id)
            },

            DesignAction::SetCamera { project_id, camera } => {
                if state.project(project_id).is_none() {
                    return Self::fail(
                        state,
                        PlannerError::not_found("Project", project_id),
                    );
                }
                Self::apply_event(
                    state,
                    &DesignAction::CameraSaved { project_id, camera },
                );
                smallvec![]
            },

            DesignAction::RecomputeBudget { project_id } => {
                budget::recompute_planned_spend(state, project_id);
                smallvec![]
            },

            event => {
                Self::apply_event(state, &event);
                smallvec![]
            },
        }
    }

    fn handle_duplicate_bundle(
        state: &mut PlannerState,
        env: &DesignEnvironment,
        project_id: ProjectId,
        bundle_id: BundleId,
    ) -> SmallVec<[Effect<DesignAction>; 4]> {
        let members: Vec<PlacementId> = state
            .design(project_id)
            .map_or_else(Vec::new, |d| d.bundle_members(bundle_id));
        if members.is_empty() {
            return Self::fail(
                state,
                PlannerError::validation("Bundle has no members"),
            );
        }
        let listing_id = state
            .design(project_id)
            .and_then(|d| d.placements_meta.get(&members[0]))
            .map(|m| m.service_listing_id);
        let Some(listing_id) = listing_id else {
            return Self::fail(
                state,
                PlannerError::validation("Bundle has no listing association"),
            );
        };
        if let Err(error) =
            Self::check_placement_availability(state, project_id, listing_id)
        {
            return Self::fail(state, error);
        }

        // Copy every member under a fresh bundle id, remapping parent links
        // inside the bundle onto the new ids.
        let new_bundle = BundleId::from_uuid(env.ids.next_id());
        let quantity_index = Self::next_quantity_index(state, project_id, listing_id);
        let mut id_map: HashMap<PlacementId, PlacementId> = HashMap::new();
        for member in &members {
            id_map.insert(*member, PlacementId::from_uuid(env.ids.next_id()));
        }
        let Some(design) = state.design(project_id) else {
            return Self::fail(state, PlannerError::not_found("Design", project_id));
        };
        let mut placed = Vec::with_capacity(members.len());
        for member in &members {
            let (Some(source), Some(meta)) = (
                design.elements.get(member),
                design.placements_meta.get(member),
            ) else {
                continue;
            };
            let new_id = id_map[member];
            let new_parent = source.parent_id.and_then(|p| id_map.get(&p).copied());
            let mut element =
                PlacedElement::new(new_id, source.kind, source.transform, new_parent);
            element.transform.position[0] += 0.5;
            element.service_listing_ids = source.service_listing_ids.clone();
            placed.push((
                element,
                PlacementMeta {
                    bundle_id: Some(new_bundle),
                    quantity_index,
                    ..*meta
                },
            ));
        }
        info!(bundle_id = %bundle_id, count = placed.len(), "bundle duplicated");
        Self::apply_event(
            state,
            &DesignAction::ElementsPlaced { project_id, placed },
        );
        Self::budget_feedback(project_id)
    }

    fn check_parent(
        state: &PlannerState,
        project_id: ProjectId,
        parent_id: PlacementId,
    ) -> Result<(), PlannerError> {
        let parent = state
            .design(project_id)
            .and_then(|d| d.elements.get(&parent_id))
            .ok_or_else(|| PlannerError::not_found("Parent element", parent_id))?;
        // Stacking is one level deep.
        if parent.parent_id.is_some() {
            return Err(PlannerError::validation(
                "Elements can only be stacked one level deep",
            ));
        }
        Ok(())
    }

    fn apply_event(state: &mut PlannerState, event: &DesignAction) {
        match event {
            DesignAction::ElementsPlaced { project_id, placed } => {
                let design = state.design_mut_or_create(*project_id);
                for (element, meta) in placed {
                    design.placements_meta.insert(element.id, *meta);
                    design.elements.insert(element.id, element.clone());
                }
                // Copied tags need their expense lines rescaled.
                let tagged: Vec<ListingId> = placed
                    .iter()
                    .flat_map(|(e, _)| e.service_listing_ids.iter().copied())
                    .collect();
                for listing_id in tagged {
                    budget::update_per_table_service_expenses(
                        state,
                        *project_id,
                        listing_id,
                    );
                }
            },
            DesignAction::ElementUpdated {
                project_id,
                placement_id,
                transform,
                locked,
            } => {
                if let Some(element) = state
                    .designs
                    .get_mut(project_id)
                    .and_then(|d| d.elements.get_mut(placement_id))
                {
                    if let Some(transform) = transform {
                        element.transform = *transform;
                    }
                    if let Some(locked) = locked {
                        element.locked = *locked;
                    }
                }
            },
            DesignAction::ElementReparented {
                project_id,
                placement_id,
                parent_id,
            } => {
                if let Some(element) = state
                    .designs
                    .get_mut(project_id)
                    .and_then(|d| d.elements.get_mut(placement_id))
                {
                    element.parent_id = *parent_id;
                }
            },
            DesignAction::ElementRemoved {
                project_id,
                placement_id,
            } => {
                let mut tagged = Vec::new();
                if let Some(design) = state.designs.get_mut(project_id) {
                    if let Some(removed) = design.elements.remove(placement_id) {
                        tagged = removed.service_listing_ids;
                    }
                    design.placements_meta.remove(placement_id);
                    // Children of the removed element become free-standing.
                    for element in design.elements.values_mut() {
                        if element.parent_id == Some(*placement_id) {
                            element.parent_id = None;
                        }
                    }
                }
                for listing_id in tagged {
                    budget::update_per_table_service_expenses(
                        state,
                        *project_id,
                        listing_id,
                    );
                }
            },
            DesignAction::TableServiceTagged {
                project_id,
                placement_id,
                listing_id,
            } => {
                if let Some(element) = state
                    .designs
                    .get_mut(project_id)
                    .and_then(|d| d.elements.get_mut(placement_id))
                {
                    element.service_listing_ids.push(*listing_id);
                }
                budget::update_per_table_service_expenses(
                    state,
                    *project_id,
                    *listing_id,
                );
            },
            DesignAction::TableServiceUntagged {
                project_id,
                placement_id,
                listing_id,
            } => {
                if let Some(element) = state
                    .designs
                    .get_mut(project_id)
                    .and_then(|d| d.elements.get_mut(placement_id))
                {
                    element.service_listing_ids.retain(|id| id != listing_id);
                }
                budget::update_per_table_service_expenses(
                    state,
                    *project_id,
                    *listing_id,
                );
            },
            DesignAction::ProjectServiceAdded { service } => {
                state.project_services.insert(
                    (service.project_id, service.service_listing_id),
                    service.clone(),
                );
            },
            DesignAction::ProjectServiceUpdated {
                project_id,
                listing_id,
                quantity,
            } => {
                if let Some(service) =
                    state.project_services.get_mut(&(*project_id, *listing_id))
                {
                    service.quantity = *quantity;
                }
            },
            DesignAction::ProjectServiceRemoved {
                project_id,
                listing_id,
            } => {
                state.project_services.remove(&(*project_id, *listing_id));
            },
            DesignAction::CameraSaved { project_id, camera } => {
                state.design_mut_or_create(*project_id).camera = Some(*camera);
            },
            DesignAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            _ => {},
        }
    }
}

impl Reducer for DesignReducer {
    type State = PlannerState;
    type Action = DesignAction;
    type Environment = DesignEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        Self::handle_command(state, env, action)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{
        AvailabilityType, Booking, BookingId, CoupleId, Money, NaiveDate,
        SelectedService, ServiceCategory, ServiceListing, VendorId, WeddingProject,
    };
    use aisle_testing::{SequentialIdGenerator, test_clock};
    use chrono::Utc;

    fn env() -> DesignEnvironment {
        DesignEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(SequentialIdGenerator::new()),
        )
    }

    fn wedding_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    fn base_state() -> (PlannerState, ProjectId) {
        let mut state = PlannerState::new();
        let project_id = ProjectId::new();
        state.projects.insert(
            project_id,
            WeddingProject {
                id: project_id,
                couple_id: CoupleId::new(),
                name: "Test wedding".to_string(),
                wedding_date: Some(wedding_date()),
                venue_listing_id: None,
                event_start: None,
                event_end: None,
            },
        );
        (state, project_id)
    }

    fn add_listing(
        state: &mut PlannerState,
        availability_type: AvailabilityType,
        policy: PricingPolicy,
        max: Option<u32>,
    ) -> ListingId {
        let listing = ServiceListing::new(
            ListingId::new(),
            VendorId::new(),
            "Listing".to_string(),
            ServiceCategory::Decor,
            availability_type,
            max,
            policy,
            Money::from_dollars(50),
            None,
        )
        .unwrap();
        let id = listing.id;
        state.listings.insert(id, listing);
        id
    }

    fn add_element(
        state: &mut PlannerState,
        env: &DesignEnvironment,
        project_id: ProjectId,
        listing_id: ListingId,
        kind: ElementKind,
    ) -> PlacementId {
        let placement_id = PlacementId::new();
        DesignReducer::new().reduce(
            state,
            DesignAction::AddElement {
                placement_id,
                project_id,
                listing_id,
                kind,
                transform: Transform::default(),
                parent_id: None,
            },
            env,
        );
        assert!(state.last_error.is_none(), "{:?}", state.last_error);
        placement_id
    }

    #[test]
    fn add_element_records_meta_and_unit_price() {
        let (mut state, project_id) = base_state();
        let env = env();
        let listing_id = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        let placement_id =
            add_element(&mut state, &env, project_id, listing_id, ElementKind::Decor);

        let design = state.design(project_id).unwrap();
        let meta = design.placements_meta.get(&placement_id).unwrap();
        assert_eq!(meta.service_listing_id, listing_id);
        assert_eq!(meta.unit_price, Money::from_dollars(50));
        assert_eq!(meta.quantity_index, 0);
    }

    #[test]
    fn add_element_is_gated_by_wedding_date_availability() {
        let (mut state, project_id) = base_state();
        let env = env();
        let venue = ServiceListing::new(
            ListingId::new(),
            VendorId::new(),
            "Garden Hall".to_string(),
            ServiceCategory::Venue,
            AvailabilityType::Exclusive,
            None,
            PricingPolicy::FixedPackage,
            Money::from_dollars(8000),
            None,
        )
        .unwrap();
        let (listing_id, vendor_id) = (venue.id, venue.vendor_id);
        state.listings.insert(listing_id, venue);

        // Someone else's active booking occupies the wedding date.
        let booking_id = BookingId::new();
        state.bookings.insert(
            booking_id,
            Booking::new(
                booking_id,
                CoupleId::new(),
                vendor_id,
                None,
                wedding_date(),
                vec![SelectedService {
                    service_listing_id: listing_id,
                    quantity: 1,
                    total_price: Money::from_dollars(8000),
                }],
                Utc::now(),
            ),
        );

        DesignReducer::new().reduce(
            &mut state,
            DesignAction::AddElement {
                placement_id: PlacementId::new(),
                project_id,
                listing_id,
                kind: ElementKind::Decor,
                transform: Transform::default(),
                parent_id: None,
            },
            &env,
        );
        assert_eq!(
            state.last_error,
            Some(PlannerError::conflict("Already booked for this date"))
        );
    }

    #[test]
    fn stacking_is_limited_to_one_level() {
        let (mut state, project_id) = base_state();
        let env = env();
        let listing_id = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        let base =
            add_element(&mut state, &env, project_id, listing_id, ElementKind::Table);
        let child = PlacementId::new();
        DesignReducer::new().reduce(
            &mut state,
            DesignAction::AddElement {
                placement_id: child,
                project_id,
                listing_id,
                kind: ElementKind::Decor,
                transform: Transform::default(),
                parent_id: Some(base),
            },
            &env,
        );
        assert!(state.last_error.is_none());

        // A grandchild is refused.
        DesignReducer::new().reduce(
            &mut state,
            DesignAction::AddElement {
                placement_id: PlacementId::new(),
                project_id,
                listing_id,
                kind: ElementKind::Decor,
                transform: Transform::default(),
                parent_id: Some(child),
            },
            &env,
        );
        assert!(matches!(
            state.last_error,
            Some(PlannerError::Validation(_))
        ));
    }

    #[test]
    fn booked_element_cannot_be_removed() {
        let (mut state, project_id) = base_state();
        let env = env();
        let listing_id = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        let placement_id =
            add_element(&mut state, &env, project_id, listing_id, ElementKind::Table);
        if let Some(d) = state.designs.get_mut(&project_id) {
            if let Some(e) = d.elements.get_mut(&placement_id) {
                e.is_booked = true;
                e.booking_id = Some(BookingId::new());
            }
        }

        DesignReducer::new().reduce(
            &mut state,
            DesignAction::RemoveElement {
                project_id,
                placement_id,
            },
            &env,
        );
        assert!(matches!(state.last_error, Some(PlannerError::Conflict(_))));
        assert!(state
            .design(project_id)
            .unwrap()
            .elements
            .contains_key(&placement_id));
    }

    #[test]
    fn removing_a_parent_frees_its_children() {
        let (mut state, project_id) = base_state();
        let env = env();
        let listing_id = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        let base =
            add_element(&mut state, &env, project_id, listing_id, ElementKind::Table);
        let child = PlacementId::new();
        DesignReducer::new().reduce(
            &mut state,
            DesignAction::AddElement {
                placement_id: child,
                project_id,
                listing_id,
                kind: ElementKind::Decor,
                transform: Transform::default(),
                parent_id: Some(base),
            },
            &env,
        );

        DesignReducer::new().reduce(
            &mut state,
            DesignAction::RemoveElement {
                project_id,
                placement_id: base,
            },
            &env,
        );
        let design = state.design(project_id).unwrap();
        assert!(!design.elements.contains_key(&base));
        assert_eq!(design.elements[&child].parent_id, None);
    }

    #[test]
    fn locked_element_cannot_be_moved() {
        let (mut state, project_id) = base_state();
        let env = env();
        let listing_id = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        let placement_id =
            add_element(&mut state, &env, project_id, listing_id, ElementKind::Decor);
        DesignReducer::new().reduce(
            &mut state,
            DesignAction::UpdateElement {
                project_id,
                placement_id,
                transform: None,
                locked: Some(true),
            },
            &env,
        );
        assert!(state.last_error.is_none());

        DesignReducer::new().reduce(
            &mut state,
            DesignAction::UpdateElement {
                project_id,
                placement_id,
                transform: Some(Transform {
                    position: [1.0, 0.0, 0.0],
                    rotation_deg: 0.0,
                }),
                locked: None,
            },
            &env,
        );
        assert_eq!(
            state.last_error,
            Some(PlannerError::validation("Element is locked"))
        );
    }

    #[test]
    fn duplicate_bundle_copies_members_under_new_ids() {
        let (mut state, project_id) = base_state();
        let env = env();
        let listing_id = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        // Seed a two-element bundle by hand.
        let bundle = BundleId::new();
        let table = add_element(&mut state, &env, project_id, listing_id, ElementKind::Table);
        let chair = PlacementId::new();
        DesignReducer::new().reduce(
            &mut state,
            DesignAction::AddElement {
                placement_id: chair,
                project_id,
                listing_id,
                kind: ElementKind::Chair,
                transform: Transform::default(),
                parent_id: Some(table),
            },
            &env,
        );
        if let Some(d) = state.designs.get_mut(&project_id) {
            for id in [table, chair] {
                if let Some(m) = d.placements_meta.get_mut(&id) {
                    m.bundle_id = Some(bundle);
                }
            }
        }

        DesignReducer::new().reduce(
            &mut state,
            DesignAction::DuplicateBundle {
                project_id,
                bundle_id: bundle,
            },
            &env,
        );
        assert!(state.last_error.is_none());
        let design = state.design(project_id).unwrap();
        assert_eq!(design.elements.len(), 4);
        // The copy forms its own bundle with an intact parent link.
        let new_members: Vec<_> = design
            .placements_meta
            .values()
            .filter(|m| m.bundle_id.is_some() && m.bundle_id != Some(bundle))
            .collect();
        assert_eq!(new_members.len(), 2);
        let new_chair = design
            .elements
            .values()
            .find(|e| e.kind == ElementKind::Chair && e.id != chair)
            .unwrap();
        assert!(new_chair.parent_id.is_some());
        assert_ne!(new_chair.parent_id, Some(table));
    }

    #[test]
    fn tagging_requires_a_table_and_a_per_table_listing() {
        let (mut state, project_id) = base_state();
        let env = env();
        let table_listing = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        let per_table = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerTable,
            None,
        );
        let decor =
            add_element(&mut state, &env, project_id, table_listing, ElementKind::Decor);
        DesignReducer::new().reduce(
            &mut state,
            DesignAction::TagTableService {
                project_id,
                placement_id: decor,
                listing_id: per_table,
            },
            &env,
        );
        assert!(matches!(
            state.last_error,
            Some(PlannerError::Validation(_))
        ));

        state.last_error = None;
        let table =
            add_element(&mut state, &env, project_id, table_listing, ElementKind::Table);
        DesignReducer::new().reduce(
            &mut state,
            DesignAction::TagTableService {
                project_id,
                placement_id: table,
                listing_id: table_listing,
            },
            &env,
        );
        // A per-unit listing cannot tag a table.
        assert!(matches!(
            state.last_error,
            Some(PlannerError::Validation(_))
        ));
    }

    #[test]
    fn tagging_creates_and_untagging_removes_the_expense() {
        let (mut state, project_id) = base_state();
        let env = env();
        let table_listing = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        let per_table = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerTable,
            None,
        );
        let table =
            add_element(&mut state, &env, project_id, table_listing, ElementKind::Table);

        DesignReducer::new().reduce(
            &mut state,
            DesignAction::TagTableService {
                project_id,
                placement_id: table,
                listing_id: per_table,
            },
            &env,
        );
        assert!(state.last_error.is_none());
        let expense_id = state.expense_for_listing(project_id, per_table).unwrap();
        assert_eq!(
            state.expenses[&expense_id].estimated_cost,
            Money::from_dollars(50)
        );

        DesignReducer::new().reduce(
            &mut state,
            DesignAction::UntagTableService {
                project_id,
                placement_id: table,
                listing_id: per_table,
            },
            &env,
        );
        assert!(state.expense_for_listing(project_id, per_table).is_none());
    }

    #[test]
    fn project_service_is_unique_per_listing() {
        let (mut state, project_id) = base_state();
        let env = env();
        let listing_id = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        let add = DesignAction::AddProjectService {
            project_id,
            listing_id,
            quantity: 2,
        };
        DesignReducer::new().reduce(&mut state, add.clone(), &env);
        assert!(state.last_error.is_none());
        DesignReducer::new().reduce(&mut state, add, &env);
        assert!(matches!(state.last_error, Some(PlannerError::Conflict(_))));
    }

    #[test]
    fn booked_project_service_cannot_change() {
        let (mut state, project_id) = base_state();
        let env = env();
        let listing_id = add_listing(
            &mut state,
            AvailabilityType::Reusable,
            PricingPolicy::PerUnit,
            None,
        );
        DesignReducer::new().reduce(
            &mut state,
            DesignAction::AddProjectService {
                project_id,
                listing_id,
                quantity: 2,
            },
            &env,
        );
        if let Some(s) = state
            .project_services
            .get_mut(&(project_id, listing_id))
        {
            s.is_booked = true;
            s.booking_id = Some(BookingId::new());
        }

        DesignReducer::new().reduce(
            &mut state,
            DesignAction::RemoveProjectService {
                project_id,
                listing_id,
            },
            &env,
        );
        assert!(matches!(state.last_error, Some(PlannerError::Conflict(_))));
        assert!(state
            .project_services
            .contains_key(&(project_id, listing_id)));
    }

    #[test]
    fn camera_state_round_trips_through_the_design() {
        let (mut state, project_id) = base_state();
        let env = env();
        let camera = CameraState {
            position: [10.0, 5.0, 10.0],
            target: [0.0, 0.0, 0.0],
            zoom: 1.5,
        };
        DesignReducer::new().reduce(
            &mut state,
            DesignAction::SetCamera { project_id, camera },
            &env,
        );
        assert_eq!(state.design(project_id).unwrap().camera, Some(camera));
    }
}
