use crate::db::{self, DbPool};
use crate::error::Result;
use crate::ids;
use crate::models::{InventoryState, Language};
use crate::seed;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATE_SLOT: &str = "homesync_state";
pub const LANGUAGE_SLOT: &str = "homesync_lang";
/// Where an undecodable state blob is parked before the seed replaces it.
pub const CORRUPT_STATE_SLOT: &str = "homesync_state.corrupt";

/// Top-level fields added after the first release; a blob missing any of
/// them is backfilled from defaults on load.
const BACKFILLED_FIELDS: [&str; 4] = [
    "currentUserId",
    "selectedModel",
    "promptHistory",
    "developmentPrompts",
];

#[derive(Debug, Serialize, Deserialize)]
struct LanguageSlot {
    lang: Language,
}

/// Reads and writes the whole inventory document to one durable slot.
#[derive(Clone)]
pub struct Persistence {
    pool: DbPool,
}

impl Persistence {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Saved state, or the seed household on first run. Data problems never
    /// fail the load; only database errors do.
    pub fn load(&self) -> Result<InventoryState> {
        let conn = self.pool.get()?;
        let Some(blob) = db::read_slot(&conn, STATE_SLOT)? else {
            log::info!("No saved inventory found; starting from the sample household");
            return Ok(seed::seed_state(ids::now_millis()));
        };

        match decode_state(&blob) {
            Ok(state) => Ok(state),
            Err(err) => {
                log::warn!("Saved inventory is unreadable ({err}); keeping a copy and reseeding");
                db::write_slot(&conn, CORRUPT_STATE_SLOT, &blob)?;
                Ok(seed::seed_state(ids::now_millis()))
            }
        }
    }

    pub fn save(&self, state: &InventoryState) -> Result<()> {
        let blob = serde_json::to_string(state)?;
        let conn = self.pool.get()?;
        db::write_slot(&conn, STATE_SLOT, &blob)?;
        log::debug!("Saved inventory ({} bytes)", blob.len());
        Ok(())
    }

    pub fn load_language_preference(&self) -> Result<Language> {
        let conn = self.pool.get()?;
        let Some(raw) = db::read_slot(&conn, LANGUAGE_SLOT)? else {
            return Ok(Language::default());
        };
        if let Ok(slot) = serde_json::from_str::<LanguageSlot>(&raw) {
            return Ok(slot.lang);
        }
        // Older builds stored the bare code.
        match raw.trim_matches('"').parse::<Language>() {
            Ok(lang) => Ok(lang),
            Err(_) => {
                log::warn!("Ignoring unreadable language preference {raw:?}");
                Ok(Language::default())
            }
        }
    }

    pub fn save_language_preference(&self, lang: Language) -> Result<()> {
        let raw = serde_json::to_string(&LanguageSlot { lang })?;
        let conn = self.pool.get()?;
        db::write_slot(&conn, LANGUAGE_SLOT, &raw)
    }
}

/// Decodes a saved blob, filling in any subtree older builds did not write.
pub fn decode_state(blob: &str) -> std::result::Result<InventoryState, serde_json::Error> {
    let value: Value = serde_json::from_str(blob)?;
    if let Value::Object(fields) = &value {
        let missing: Vec<&str> = BACKFILLED_FIELDS
            .iter()
            .copied()
            .filter(|field| !fields.contains_key(*field))
            .collect();
        if !missing.is_empty() {
            log::info!("Backfilling saved inventory fields: {}", missing.join(", "));
        }
    }

    let mut state: InventoryState = serde_json::from_value(value)?;
    if state.current_user_id.is_empty() {
        if let Some(first) = state.members.first() {
            state.current_user_id = first.id.clone();
        }
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AiModel;

    fn persistence() -> Persistence {
        Persistence::new(db::init_in_memory().unwrap())
    }

    #[test]
    fn first_load_returns_the_seed() {
        let state = persistence().load().unwrap();
        assert_eq!(state.locations.len(), 2);
        assert_eq!(state.containers.len(), 2);
        assert_eq!(state.items.len(), 2);
        assert_eq!(state.members.len(), 2);
        assert_eq!(state.current_user_id, "u1");
        assert_eq!(state.selected_model, AiModel::default());
        assert!(state.prompt_history.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = persistence();
        let mut state = store.load().unwrap();
        state.selected_model = AiModel::Gemini25Flash;
        state.items[0].quantity = 9;
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn legacy_blob_is_backfilled() {
        let store = persistence();
        let legacy = r#"{
            "locations": [{"id": "1", "name": "Hall"}],
            "containers": [],
            "items": [{"id": "i1", "name": "Umbrella", "quantity": 2, "unit": "pcs",
                       "locationId": "1", "updatedAt": 10, "tags": []}],
            "members": [{"id": "u7", "name": "Admin"}],
            "currentUserId": "u7"
        }"#;
        db::write_slot(&store.pool.get().unwrap(), STATE_SLOT, legacy).unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.selected_model, AiModel::default());
        assert!(state.prompt_history.is_empty());
        assert!(state.development_prompts.is_empty());
        assert_eq!(state.items[0].name, "Umbrella");
    }

    #[test]
    fn missing_current_user_defaults_to_first_member() {
        let state = decode_state(r#"{"members": [{"id": "u3", "name": "A"}]}"#).unwrap();
        assert_eq!(state.current_user_id, "u3");
    }

    #[test]
    fn corrupt_blob_is_parked_and_reseeded() {
        let store = persistence();
        let conn = store.pool.get().unwrap();
        db::write_slot(&conn, STATE_SLOT, "{not json").unwrap();
        drop(conn);

        let state = store.load().unwrap();
        assert_eq!(state.items.len(), 2);
        let conn = store.pool.get().unwrap();
        assert_eq!(
            db::read_slot(&conn, CORRUPT_STATE_SLOT).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn language_slot_defaults_and_round_trips() {
        let store = persistence();
        assert_eq!(store.load_language_preference().unwrap(), Language::Zh);
        store.save_language_preference(Language::En).unwrap();
        assert_eq!(store.load_language_preference().unwrap(), Language::En);

        let conn = store.pool.get().unwrap();
        assert_eq!(
            db::read_slot(&conn, LANGUAGE_SLOT).unwrap().as_deref(),
            Some(r#"{"lang":"en"}"#)
        );
    }

    #[test]
    fn bare_legacy_language_code_is_accepted() {
        let store = persistence();
        db::write_slot(&store.pool.get().unwrap(), LANGUAGE_SLOT, "en").unwrap();
        assert_eq!(store.load_language_preference().unwrap(), Language::En);
    }

    #[test]
    fn file_backed_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let paths = crate::config::AppPaths::at(dir.path().to_path_buf()).unwrap();

        let first = Persistence::new(db::init_database(&paths).unwrap());
        let mut state = first.load().unwrap();
        state.items.retain(|item| item.id != "i2");
        first.save(&state).unwrap();
        drop(first);

        let reopened = Persistence::new(db::init_database(&paths).unwrap());
        assert_eq!(reopened.load().unwrap(), state);
    }
}
