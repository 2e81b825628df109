use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::models::snapshots::ReplaceResponse,
    errors::{Error, Result},
    snapshot::{FullAggregate, ReplacePayload},
    AppState,
};

fn atelier_not_found(atelier_id: String) -> Error {
    Error::NotFound {
        resource: "Atelier".to_string(),
        id: atelier_id,
    }
}

#[utoipa::path(
    get,
    path = "/ateliers/{atelier_id}/data",
    tag = "snapshots",
    summary = "Get atelier data",
    description = "Every child collection of the atelier, newest first, together with its reconciled profile fields.",
    responses(
        (status = 200, description = "Full atelier aggregate", body = FullAggregate),
        (status = 404, description = "Atelier not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("atelier_id" = String, Path, description = "Atelier ID")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_atelier_data(State(state): State<AppState>, Path(atelier_id): Path<String>) -> Result<Json<FullAggregate>> {
    match state.snapshots.build_aggregate_response(&atelier_id).await? {
        Some(aggregate) => Ok(Json(aggregate)),
        None => Err(atelier_not_found(atelier_id)),
    }
}

#[utoipa::path(
    put,
    path = "/ateliers/{atelier_id}/data",
    tag = "snapshots",
    summary = "Replace atelier data",
    description = "Replaces every child collection and the profile fields with the payload. \
                   A collection missing from the payload is cleared. Not atomic: a failure part \
                   way leaves some collections rewritten and others not.",
    request_body = ReplacePayload,
    responses(
        (status = 200, description = "Data replaced", body = ReplaceResponse),
        (status = 404, description = "Atelier not found"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("atelier_id" = String, Path, description = "Atelier ID")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn replace_atelier_data(
    State(state): State<AppState>,
    Path(atelier_id): Path<String>,
    Json(payload): Json<ReplacePayload>,
) -> Result<Json<ReplaceResponse>> {
    if state.snapshots.replace_aggregate_data(&atelier_id, payload).await? {
        Ok(Json(ReplaceResponse { success: true }))
    } else {
        Err(atelier_not_found(atelier_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        db::models::documents::EntityKind,
        db::store::MemoryStore,
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[test_log::test(tokio::test)]
    async fn test_get_data_for_missing_atelier() {
        let (app, _store) = create_test_app().await;

        app.get("/api/v1/ateliers/ghost/data").await.assert_status_not_found();
    }

    #[test_log::test(tokio::test)]
    async fn test_replace_missing_atelier() {
        let (app, _store) = create_test_app().await;

        app.put("/api/v1/ateliers/ghost/data")
            .json(&json!({ "clients": [] }))
            .await
            .assert_status_not_found();
    }

    #[test_log::test(tokio::test)]
    async fn test_replace_then_read_round_trip() {
        let (app, store) = create_test_app().await;
        create_test_atelier(store.as_ref(), "atelier-1").await;

        let response = app
            .put("/api/v1/ateliers/atelier-1/data")
            .json(&json!({
                "clients": [{ "id": "c1", "name": "Fatou", "atelierId": "someone-else" }, { "id": "c2" }],
                "tutorials": [{ "title": "Ourlet invisible" }],
                "managerAccessCode": "",
                "modelOfTheMonthId": null,
                "favoriteIds": ["m2", "m1"]
            }))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));

        let response = app.get("/api/v1/ateliers/atelier-1/data").await;
        response.assert_status_ok();
        let body: Value = response.json();

        assert_eq!(body["id"], json!("atelier-1"));
        assert_eq!(body["managerId"], json!("manager-1"));
        assert_eq!(body["clients"][0]["id"], json!("c2"));
        assert_eq!(body["clients"][1]["atelierId"], json!("atelier-1"));
        assert!(body["tutorials"][0]["id"].is_string());
        assert_eq!(body["orders"], json!([]));
        assert_eq!(body["modelOfTheMonthId"], Value::Null);
        assert_eq!(body["favoriteIds"], json!(["m2", "m1"]));
        assert_eq!(body["isNew"], json!(false));
        // empty first-class access code with no legacy value resolves to nothing
        assert!(body.get("managerAccessCode").is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_partial_replace_is_server_error() {
        let store = Arc::new(MemoryStore::new());
        create_test_atelier(store.as_ref(), "atelier-1").await;
        let failing = Arc::new(FailingDocuments::new(store.clone()).fail_delete(EntityKind::Notifications));
        let app = create_test_app_with_stores(store, failing).await;

        let response = app
            .put("/api/v1/ateliers/atelier-1/data")
            .json(&json!({ "clients": [{ "id": "c1" }] }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_text("Database error occurred");
    }

    #[test_log::test(tokio::test)]
    async fn test_oversized_payload_rejected() {
        let mut config = create_test_config();
        config.limits.max_payload_bytes = 256;
        let store = Arc::new(MemoryStore::new());
        create_test_atelier(store.as_ref(), "atelier-1").await;
        let app = create_test_app_with_config(config, store.clone(), store).await;

        let clients: Vec<Value> = (0..50).map(|i| json!({ "id": format!("client-{i}") })).collect();
        app.put("/api/v1/ateliers/atelier-1/data")
            .json(&json!({ "clients": clients }))
            .await
            .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }
}
