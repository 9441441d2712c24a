use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantRow {
    pub id: i64,
    pub participant_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub designation: Option<String>,
    pub id_card_type: Option<String>,
    pub institute: Option<String>,
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub background_image: Option<String>,
    pub profile_picture: Option<String>,
    pub amenities: String,
    pub archive: i64,
}

/// JSON shape returned to clients. `amenities` is schema-free, so it stays a
/// raw JSON object rather than a fixed struct.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub participant_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub designation: Option<String>,
    pub id_card_type: Option<String>,
    pub institute: Option<String>,
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub background_image: Option<String>,
    pub profile_picture: Option<String>,
    pub amenities: Value,
    pub archive: bool,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        // Stored amenities are always serialized objects; fall back to an
        // empty mapping if the column ever holds something else.
        let amenities = serde_json::from_str::<Value>(&row.amenities)
            .ok()
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        Participant {
            id: row.id,
            participant_id: row.participant_id,
            first_name: row.first_name,
            last_name: row.last_name,
            designation: row.designation,
            id_card_type: row.id_card_type,
            institute: row.institute,
            event_id: row.event_id,
            event_name: row.event_name,
            background_image: row.background_image,
            profile_picture: row.profile_picture,
            amenities,
            archive: row.archive != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(amenities: &str) -> ParticipantRow {
        ParticipantRow {
            id: 1,
            participant_id: "Ab3dE".to_string(),
            first_name: Some("A".to_string()),
            last_name: Some("B".to_string()),
            designation: Some("D".to_string()),
            id_card_type: Some("staff".to_string()),
            institute: Some("X".to_string()),
            event_id: Some("E1".to_string()),
            event_name: Some("Conf".to_string()),
            background_image: None,
            profile_picture: None,
            amenities: amenities.to_string(),
            archive: 0,
        }
    }

    #[test]
    fn view_parses_stored_amenities() {
        let view = Participant::from(row(r#"{"wifi":true}"#));
        assert_eq!(view.amenities, serde_json::json!({"wifi": true}));
        assert!(!view.archive);
    }

    #[test]
    fn view_falls_back_to_empty_mapping_on_bad_column() {
        let view = Participant::from(row("not json"));
        assert_eq!(view.amenities, serde_json::json!({}));
    }
}
