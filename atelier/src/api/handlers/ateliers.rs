use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::models::ateliers::{AtelierCreate, AtelierResponse},
    db::models::ateliers::AtelierCreateDBRequest,
    errors::{Error, Result},
    AppState,
};

#[utoipa::path(
    post,
    path = "/ateliers",
    tag = "ateliers",
    summary = "Register atelier",
    request_body = AtelierCreate,
    responses(
        (status = 201, description = "Atelier created", body = AtelierResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "An atelier with this ID already exists"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_atelier(State(state): State<AppState>, Json(create): Json<AtelierCreate>) -> Result<(StatusCode, Json<AtelierResponse>)> {
    if create.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Atelier name cannot be empty".to_string(),
        });
    }
    if create.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
        return Err(Error::BadRequest {
            message: "Atelier ID cannot be empty".to_string(),
        });
    }

    let atelier = state.ateliers.create(&AtelierCreateDBRequest::from(create)).await?;
    Ok((StatusCode::CREATED, Json(AtelierResponse::from(atelier))))
}

#[utoipa::path(
    get,
    path = "/ateliers/{atelier_id}",
    tag = "ateliers",
    summary = "Get atelier",
    responses(
        (status = 200, description = "Atelier envelope", body = AtelierResponse),
        (status = 404, description = "Atelier not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("atelier_id" = String, Path, description = "Atelier ID")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_atelier(State(state): State<AppState>, Path(atelier_id): Path<String>) -> Result<Json<AtelierResponse>> {
    match state.ateliers.find_by_external_id(&atelier_id).await? {
        Some(atelier) => Ok(Json(AtelierResponse::from(atelier))),
        None => Err(Error::NotFound {
            resource: "Atelier".to_string(),
            id: atelier_id,
        }),
    }
}
