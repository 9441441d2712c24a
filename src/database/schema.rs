use sqlx::SqlitePool;

pub const SQL_CREATE_PARTICIPANTS: &str = r#"
CREATE TABLE IF NOT EXISTS participants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_id TEXT NOT NULL UNIQUE,
    first_name TEXT,
    last_name TEXT,
    designation TEXT,
    id_card_type TEXT,
    institute TEXT,
    event_id TEXT,
    event_name TEXT,
    background_image TEXT,
    profile_picture TEXT,
    amenities TEXT NOT NULL DEFAULT '{}',
    archive INTEGER NOT NULL DEFAULT 0
)
"#;

/// Creates the participants table if this is a fresh database.
pub async fn ensure_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(SQL_CREATE_PARTICIPANTS).execute(pool).await?;
    Ok(())
}
