use sqlx::SqlitePool;

use crate::models::ParticipantRow;

const SQL_SELECT_COLUMNS: &str = r#"
SELECT
    id,
    participant_id,
    first_name,
    last_name,
    designation,
    id_card_type,
    institute,
    event_id,
    event_name,
    background_image,
    profile_picture,
    amenities,
    archive
FROM participants
"#;

const SQL_INSERT_PARTICIPANT: &str = r#"
INSERT INTO participants (
    participant_id,
    first_name,
    last_name,
    designation,
    id_card_type,
    institute,
    event_id,
    event_name,
    background_image,
    profile_picture,
    amenities,
    archive
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
"#;

const SQL_UPDATE_ARCHIVE: &str = r#"
UPDATE participants SET archive = 1 WHERE id = ?
"#;

const SQL_UPDATE_AMENITIES: &str = r#"
UPDATE participants SET amenities = ? WHERE id = ?
"#;

const SQL_UPDATE_FIELDS: &str = r#"
UPDATE participants SET
    first_name = ?,
    last_name = ?,
    designation = ?,
    id_card_type = ?,
    institute = ?,
    event_id = ?,
    event_name = ?,
    background_image = ?,
    profile_picture = ?
WHERE id = ?
"#;

const SQL_DELETE_PARTICIPANT: &str = r#"
DELETE FROM participants WHERE id = ?
"#;

pub struct NewParticipant<'a> {
    pub participant_id: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub designation: Option<&'a str>,
    pub id_card_type: Option<&'a str>,
    pub institute: Option<&'a str>,
    pub event_id: Option<&'a str>,
    pub event_name: Option<&'a str>,
    pub background_image: Option<&'a str>,
    pub profile_picture: Option<&'a str>,
    pub amenities: &'a str,
}

pub async fn find_all(pool: &SqlitePool) -> sqlx::Result<Vec<ParticipantRow>> {
    sqlx::query_as::<_, ParticipantRow>(SQL_SELECT_COLUMNS)
        .fetch_all(pool)
        .await
}

pub async fn find_by_event(pool: &SqlitePool, event_id: &str) -> sqlx::Result<Vec<ParticipantRow>> {
    let sql = format!("{SQL_SELECT_COLUMNS} WHERE event_id = ? AND archive = 0");
    sqlx::query_as::<_, ParticipantRow>(&sql)
        .bind(event_id)
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<ParticipantRow>> {
    let sql = format!("{SQL_SELECT_COLUMNS} WHERE id = ? LIMIT 1");
    sqlx::query_as::<_, ParticipantRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_participant_id(
    pool: &SqlitePool,
    participant_id: &str,
) -> sqlx::Result<Option<ParticipantRow>> {
    let sql = format!("{SQL_SELECT_COLUMNS} WHERE participant_id = ? LIMIT 1");
    sqlx::query_as::<_, ParticipantRow>(&sql)
        .bind(participant_id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &SqlitePool, new: NewParticipant<'_>) -> sqlx::Result<i64> {
    let res = sqlx::query(SQL_INSERT_PARTICIPANT)
        .bind(new.participant_id)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.designation)
        .bind(new.id_card_type)
        .bind(new.institute)
        .bind(new.event_id)
        .bind(new.event_name)
        .bind(new.background_image)
        .bind(new.profile_picture)
        .bind(new.amenities)
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}

/// Inserts the whole batch inside one transaction; any failure rolls back
/// every row.
pub async fn insert_many(pool: &SqlitePool, batch: &[NewParticipant<'_>]) -> sqlx::Result<Vec<i64>> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(batch.len());
    for new in batch {
        let res = sqlx::query(SQL_INSERT_PARTICIPANT)
            .bind(new.participant_id)
            .bind(new.first_name)
            .bind(new.last_name)
            .bind(new.designation)
            .bind(new.id_card_type)
            .bind(new.institute)
            .bind(new.event_id)
            .bind(new.event_name)
            .bind(new.background_image)
            .bind(new.profile_picture)
            .bind(new.amenities)
            .execute(&mut *tx)
            .await?;
        ids.push(res.last_insert_rowid());
    }
    tx.commit().await?;
    Ok(ids)
}

pub async fn update_archive(pool: &SqlitePool, id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_ARCHIVE).bind(id).execute(pool).await?;
    Ok(res.rows_affected())
}

pub async fn update_amenities(pool: &SqlitePool, id: i64, amenities: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_AMENITIES)
        .bind(amenities)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

/// Writes back the patchable columns of an already-loaded row.
pub async fn update_fields(pool: &SqlitePool, row: &ParticipantRow) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_FIELDS)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.designation)
        .bind(&row.id_card_type)
        .bind(&row.institute)
        .bind(&row.event_id)
        .bind(&row.event_name)
        .bind(&row.background_image)
        .bind(&row.profile_picture)
        .bind(row.id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_PARTICIPANT)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
