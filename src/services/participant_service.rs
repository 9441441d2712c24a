use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::database::participant_repo::{self, NewParticipant};
use crate::models::Participant;
use crate::services::participant_id::{self, IdGenError};

/// Fields a PATCH may touch. Anything else rejects the whole request.
const ALLOWED_UPDATE_FIELDS: [&str; 8] = [
    "firstName",
    "lastName",
    "designation",
    "idCardType",
    "backgroundImage",
    "profilePicture",
    "eventId",
    "eventName",
];

/// Fresh-identifier retries when an insert loses the race on the
/// participant_id UNIQUE constraint.
const MAX_INSERT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct ServiceError {
    pub status: StatusCode,
    pub body: Value,
}

impl ServiceError {
    fn validation(message: &str) -> Self {
        ServiceError {
            status: StatusCode::BAD_REQUEST,
            body: serde_json::json!({ "error": message }),
        }
    }

    fn not_found() -> Self {
        ServiceError {
            status: StatusCode::NOT_FOUND,
            body: serde_json::json!({ "message": "Participant not found" }),
        }
    }

    fn store(message: &str, err: sqlx::Error) -> Self {
        ServiceError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: serde_json::json!({ "error": message, "details": err.to_string() }),
        }
    }
}

#[derive(Debug, Default)]
pub struct CreateParticipant {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub designation: Option<String>,
    pub id_card_type: Option<String>,
    pub institute: Option<String>,
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub background_image: Option<String>,
    /// Public URL of the already-uploaded picture, when a file was sent.
    pub profile_picture: Option<String>,
    /// Raw JSON string as submitted in the form.
    pub amenities: Option<String>,
}

#[derive(Debug, Default)]
pub struct BulkCreateParticipants {
    /// Raw JSON array string of per-participant entries.
    pub participants: Option<String>,
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub background_image: Option<String>,
    pub amenities: Option<String>,
}

/// Per-entry keys in the bulk payload keep the casing the badge frontend
/// sends (`FirstName`, `last`, `Designation`, `ProfilePicture`).
#[derive(Debug, Deserialize)]
struct BulkEntry {
    #[serde(rename = "FirstName")]
    first_name: Option<String>,
    #[serde(rename = "last")]
    last_name: Option<String>,
    #[serde(rename = "Designation")]
    designation: Option<String>,
    institute: Option<String>,
    #[serde(rename = "idCardType")]
    id_card_type: Option<String>,
    #[serde(rename = "ProfilePicture")]
    profile_picture: Option<String>,
}

fn parse_amenities(raw: Option<&str>) -> Result<Value, ServiceError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Value::Object(Map::new()));
    };
    serde_json::from_str::<Value>(raw)
        .ok()
        .filter(Value::is_object)
        .ok_or_else(|| ServiceError::validation("Invalid amenities format"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn id_gen_failed(err: IdGenError<sqlx::Error>) -> ServiceError {
    match err {
        IdGenError::Exhausted { attempts } => ServiceError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: serde_json::json!({
                "error": "Unable to allocate a unique participantId",
                "attempts": attempts
            }),
        },
        IdGenError::Store(e) => ServiceError::store("Error generating participantId", e),
    }
}

async fn next_participant_id(pool: &SqlitePool) -> Result<String, ServiceError> {
    participant_id::generate_unique_participant_id(|candidate| {
        let pool = pool.clone();
        async move {
            participant_repo::find_by_participant_id(&pool, &candidate)
                .await
                .map(|existing| existing.is_some())
        }
    })
    .await
    .map_err(id_gen_failed)
}

pub async fn create_participant(
    pool: &SqlitePool,
    input: CreateParticipant,
) -> Result<Participant, ServiceError> {
    let required = [
        &input.first_name,
        &input.last_name,
        &input.designation,
        &input.id_card_type,
        &input.institute,
        &input.event_id,
        &input.event_name,
    ];
    if required
        .iter()
        .any(|f| f.as_deref().map_or(true, |s| s.trim().is_empty()))
    {
        return Err(ServiceError::validation("Missing required fields"));
    }

    let amenities = serde_json::to_string(&parse_amenities(input.amenities.as_deref())?)
        .unwrap_or_else(|_| "{}".to_string());

    for _ in 0..MAX_INSERT_ATTEMPTS {
        let pid = next_participant_id(pool).await?;
        let new = NewParticipant {
            participant_id: &pid,
            first_name: input.first_name.as_deref(),
            last_name: input.last_name.as_deref(),
            designation: input.designation.as_deref(),
            id_card_type: input.id_card_type.as_deref(),
            institute: input.institute.as_deref(),
            event_id: input.event_id.as_deref(),
            event_name: input.event_name.as_deref(),
            background_image: input.background_image.as_deref(),
            profile_picture: input.profile_picture.as_deref(),
            amenities: &amenities,
        };
        match participant_repo::insert(pool, new).await {
            Ok(id) => {
                let row = participant_repo::find_by_id(pool, id)
                    .await
                    .map_err(|e| ServiceError::store("Failed to create participant", e))?
                    .ok_or_else(ServiceError::not_found)?;
                return Ok(Participant::from(row));
            }
            // Lost the race on the participant_id constraint; try a fresh one.
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => {
                return Err(ServiceError {
                    status: StatusCode::BAD_REQUEST,
                    body: serde_json::json!({
                        "error": "Failed to create participant",
                        "details": e.to_string()
                    }),
                });
            }
        }
    }

    Err(id_gen_failed(IdGenError::Exhausted {
        attempts: MAX_INSERT_ATTEMPTS,
    }))
}

pub async fn bulk_create_participants(
    pool: &SqlitePool,
    input: BulkCreateParticipants,
) -> Result<Vec<Participant>, ServiceError> {
    let invalid = || ServiceError::validation("Invalid participants data.");

    let raw = input.participants.as_deref().ok_or_else(invalid)?;
    let parsed = serde_json::from_str::<Value>(raw).map_err(|_| invalid())?;
    if !parsed.is_array() {
        return Err(invalid());
    }
    let entries: Vec<BulkEntry> = serde_json::from_value(parsed).map_err(|_| invalid())?;

    // One shared amenities object is applied identically to the whole batch.
    let amenities = serde_json::to_string(&parse_amenities(input.amenities.as_deref())?)
        .unwrap_or_else(|_| "{}".to_string());

    for _ in 0..MAX_INSERT_ATTEMPTS {
        let mut pids = Vec::with_capacity(entries.len());
        for _ in &entries {
            pids.push(next_participant_id(pool).await?);
        }

        let batch: Vec<NewParticipant<'_>> = entries
            .iter()
            .zip(&pids)
            .map(|(entry, pid)| NewParticipant {
                participant_id: pid,
                first_name: entry.first_name.as_deref(),
                last_name: entry.last_name.as_deref(),
                designation: entry.designation.as_deref(),
                id_card_type: entry.id_card_type.as_deref(),
                institute: entry.institute.as_deref(),
                event_id: input.event_id.as_deref(),
                event_name: input.event_name.as_deref(),
                background_image: input.background_image.as_deref(),
                profile_picture: entry.profile_picture.as_deref(),
                amenities: &amenities,
            })
            .collect();

        match participant_repo::insert_many(pool, &batch).await {
            Ok(ids) => {
                let mut saved = Vec::with_capacity(ids.len());
                for id in ids {
                    let row = participant_repo::find_by_id(pool, id)
                        .await
                        .map_err(|e| ServiceError::store("Error uploading participants.", e))?
                        .ok_or_else(ServiceError::not_found)?;
                    saved.push(Participant::from(row));
                }
                return Ok(saved);
            }
            // The transaction rolled back as a unit; regenerate and retry.
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(ServiceError::store("Error uploading participants.", e)),
        }
    }

    Err(id_gen_failed(IdGenError::Exhausted {
        attempts: MAX_INSERT_ATTEMPTS,
    }))
}

pub async fn list_participants(pool: &SqlitePool) -> Result<Vec<Participant>, ServiceError> {
    let rows = participant_repo::find_all(pool)
        .await
        .map_err(|e| ServiceError::store("Failed to list participants", e))?;
    Ok(rows.into_iter().map(Participant::from).collect())
}

pub async fn list_event_participants(
    pool: &SqlitePool,
    event_id: &str,
) -> Result<Vec<Participant>, ServiceError> {
    let rows = participant_repo::find_by_event(pool, event_id)
        .await
        .map_err(|e| ServiceError::store("Failed to list participants", e))?;
    Ok(rows.into_iter().map(Participant::from).collect())
}

pub async fn get_participant(pool: &SqlitePool, id: i64) -> Result<Participant, ServiceError> {
    let row = participant_repo::find_by_id(pool, id)
        .await
        .map_err(|e| ServiceError::store("Failed to load participant", e))?
        .ok_or_else(ServiceError::not_found)?;
    Ok(Participant::from(row))
}

pub async fn archive_participant(pool: &SqlitePool, id: i64) -> Result<Participant, ServiceError> {
    let changed = participant_repo::update_archive(pool, id)
        .await
        .map_err(|e| ServiceError::store("Failed to archive participant", e))?;
    if changed == 0 {
        return Err(ServiceError::not_found());
    }
    get_participant(pool, id).await
}

pub async fn replace_amenities(
    pool: &SqlitePool,
    id: i64,
    body: &Value,
) -> Result<Participant, ServiceError> {
    let amenities = body
        .get("amenities")
        .filter(|v| v.is_object())
        .ok_or_else(|| ServiceError::validation("Invalid amenities format"))?;
    let serialized =
        serde_json::to_string(amenities).unwrap_or_else(|_| "{}".to_string());

    let changed = participant_repo::update_amenities(pool, id, &serialized)
        .await
        .map_err(|e| ServiceError::store("Error updating participant amenities", e))?;
    if changed == 0 {
        return Err(ServiceError::not_found());
    }
    get_participant(pool, id).await
}

pub async fn update_participant(
    pool: &SqlitePool,
    id: i64,
    updates: &Map<String, Value>,
) -> Result<Participant, ServiceError> {
    let invalid = || ServiceError::validation("Invalid updates!");

    if updates
        .keys()
        .any(|key| !ALLOWED_UPDATE_FIELDS.contains(&key.as_str()))
    {
        return Err(invalid());
    }

    // Validate every value before touching the record (all-or-nothing).
    let mut assignments = Vec::with_capacity(updates.len());
    for (key, value) in updates {
        let clearable = matches!(key.as_str(), "backgroundImage" | "profilePicture");
        let next = match value {
            Value::String(s) => Some(s.clone()),
            Value::Null if clearable => None,
            _ => return Err(invalid()),
        };
        assignments.push((key.as_str(), next));
    }

    let mut row = participant_repo::find_by_id(pool, id)
        .await
        .map_err(|e| ServiceError::store("Failed to load participant", e))?
        .ok_or_else(ServiceError::not_found)?;

    for (key, next) in assignments {
        match key {
            "firstName" => row.first_name = next,
            "lastName" => row.last_name = next,
            "designation" => row.designation = next,
            "idCardType" => row.id_card_type = next,
            "backgroundImage" => row.background_image = next,
            "profilePicture" => row.profile_picture = next,
            "eventId" => row.event_id = next,
            "eventName" => row.event_name = next,
            _ => unreachable!("key passed the allow-list check"),
        }
    }

    let changed = participant_repo::update_fields(pool, &row)
        .await
        .map_err(|e| ServiceError::store("Failed to update participant", e))?;
    if changed == 0 {
        return Err(ServiceError::not_found());
    }
    Ok(Participant::from(row))
}

pub async fn delete_participant(pool: &SqlitePool, id: i64) -> Result<Participant, ServiceError> {
    let row = participant_repo::find_by_id(pool, id)
        .await
        .map_err(|e| ServiceError::store("Failed to load participant", e))?
        .ok_or_else(ServiceError::not_found)?;
    participant_repo::delete(pool, id)
        .await
        .map_err(|e| {
            ServiceError::store("An error occurred while trying to delete the participant", e)
        })?;
    Ok(Participant::from(row))
}
