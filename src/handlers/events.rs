use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

use crate::handlers::AppState;
use crate::models::TicketKind;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAvailability {
    pub template_id: Uuid,
    pub name: String,
    pub kind: TicketKind,
    pub quantity_total: i32,
    pub quantity_available: i32,
    pub quantity_sold: i32,
}

pub async fn event_availability(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    if state.store.event(event_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Event {event_id} not found")));
    }

    let templates = state.store.templates_for_event(event_id).await?;
    let body: Vec<TemplateAvailability> = templates
        .into_iter()
        .map(|t| TemplateAvailability {
            template_id: t.id,
            name: t.name,
            kind: t.kind,
            quantity_total: t.quantity_total,
            quantity_available: t.quantity_available,
            quantity_sold: t.quantity_sold,
        })
        .collect();
    Ok(success(body, "Availability fetched").into_response())
}
