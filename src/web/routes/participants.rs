use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::warn;

use crate::models::Participant;
use crate::services::participant_service::{
    self, BulkCreateParticipants, CreateParticipant, ServiceError,
};
use crate::services::storage_service;

pub fn router() -> Router<SqlitePool> {
    Router::new()
        .route(
            "/",
            get(list_participants_handler).post(create_participant_handler),
        )
        .route("/bulk-upload", post(bulk_upload_handler))
        .route("/archive/:id", patch(archive_participant_handler))
        .route("/event/:event_id", get(event_participants_handler))
        .route("/participant/:id", get(get_participant_handler))
        .route("/participant/:id/amenities", put(update_amenities_handler))
        .route(
            "/:id",
            get(get_participant_handler)
                .patch(update_participant_handler)
                .delete(delete_participant_handler),
        )
}

fn service_failure(context: &'static str, e: ServiceError) -> (StatusCode, Json<Value>) {
    warn!(status = %e.status, body = ?e.body, context, "participant request failed");
    (e.status, Json(e.body))
}

fn bad_form_data(err: MultipartError) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": "Invalid form data", "details": err.to_string() })),
    )
}

/// Drains the multipart stream for the single-create route. A file part named
/// `profilePicture` goes to object storage first; its public URL ends up on
/// the input like any other field.
async fn collect_create_input(
    multipart: &mut Multipart,
) -> Result<CreateParticipant, (StatusCode, Json<Value>)> {
    let mut input = CreateParticipant::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_form_data)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "profilePicture" && field.file_name().is_some() {
            let file_name = field.file_name().unwrap_or("profile").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(bad_form_data)?;
            let url = storage_service::upload_profile_picture(&file_name, &content_type, bytes)
                .await
                .map_err(|e| {
                    warn!(status = %e.status, body = ?e.body, "profile_picture_upload_failed");
                    let body = e
                        .body
                        .unwrap_or_else(|| serde_json::json!({ "error": "storage_upload_failed" }));
                    (e.status, Json(body))
                })?;
            input.profile_picture = Some(url);
            continue;
        }

        let value = field.text().await.map_err(bad_form_data)?;
        match name.as_str() {
            "firstName" => input.first_name = Some(value),
            "lastName" => input.last_name = Some(value),
            "designation" => input.designation = Some(value),
            "idCardType" => input.id_card_type = Some(value),
            "institute" => input.institute = Some(value),
            "eventId" => input.event_id = Some(value),
            "eventName" => input.event_name = Some(value),
            "backgroundImage" => input.background_image = Some(value),
            "amenities" => input.amenities = Some(value),
            _ => {}
        }
    }
    Ok(input)
}

async fn collect_bulk_input(
    multipart: &mut Multipart,
) -> Result<BulkCreateParticipants, (StatusCode, Json<Value>)> {
    let mut input = BulkCreateParticipants::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_form_data)? {
        let name = field.name().unwrap_or_default().to_string();
        // No file parts on this route; everything is a text field.
        let value = field.text().await.map_err(bad_form_data)?;
        match name.as_str() {
            "participants" => input.participants = Some(value),
            "eventId" => input.event_id = Some(value),
            "eventName" => input.event_name = Some(value),
            "backgroundImage" => input.background_image = Some(value),
            "amenities" => input.amenities = Some(value),
            _ => {}
        }
    }
    Ok(input)
}

pub async fn create_participant_handler(
    State(pool): State<SqlitePool>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Participant>), (StatusCode, Json<Value>)> {
    let input = collect_create_input(&mut multipart).await?;
    participant_service::create_participant(&pool, input)
        .await
        .map(|participant| (StatusCode::CREATED, Json(participant)))
        .map_err(|e| service_failure("participant_create_failed", e))
}

pub async fn bulk_upload_handler(
    State(pool): State<SqlitePool>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Participant>>), (StatusCode, Json<Value>)> {
    let input = collect_bulk_input(&mut multipart).await?;
    participant_service::bulk_create_participants(&pool, input)
        .await
        .map(|saved| (StatusCode::CREATED, Json(saved)))
        .map_err(|e| service_failure("participant_bulk_upload_failed", e))
}

pub async fn list_participants_handler(
    State(pool): State<SqlitePool>,
) -> Result<Json<Vec<Participant>>, (StatusCode, Json<Value>)> {
    participant_service::list_participants(&pool)
        .await
        .map(Json)
        .map_err(|e| service_failure("participant_list_failed", e))
}

pub async fn event_participants_handler(
    State(pool): State<SqlitePool>,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<Participant>>, (StatusCode, Json<Value>)> {
    participant_service::list_event_participants(&pool, &event_id)
        .await
        .map(Json)
        .map_err(|e| service_failure("participant_event_list_failed", e))
}

pub async fn get_participant_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<Json<Participant>, (StatusCode, Json<Value>)> {
    participant_service::get_participant(&pool, id)
        .await
        .map(Json)
        .map_err(|e| service_failure("participant_fetch_failed", e))
}

pub async fn archive_participant_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<Json<Participant>, (StatusCode, Json<Value>)> {
    participant_service::archive_participant(&pool, id)
        .await
        .map(Json)
        .map_err(|e| service_failure("participant_archive_failed", e))
}

pub async fn update_amenities_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Participant>, (StatusCode, Json<Value>)> {
    participant_service::replace_amenities(&pool, id, &body)
        .await
        .map(Json)
        .map_err(|e| service_failure("participant_amenities_update_failed", e))
}

pub async fn update_participant_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Participant>, (StatusCode, Json<Value>)> {
    let Some(updates) = body.as_object() else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Invalid updates!" })),
        ));
    };
    participant_service::update_participant(&pool, id, updates)
        .await
        .map(Json)
        .map_err(|e| service_failure("participant_update_failed", e))
}

pub async fn delete_participant_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let deleted = participant_service::delete_participant(&pool, id)
        .await
        .map_err(|e| service_failure("participant_delete_failed", e))?;
    Ok(Json(serde_json::json!({
        "message": "Participant successfully deleted",
        "participant": deleted
    })))
}
