use crate::error::Error;
use crate::history::PromptHistory;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, DefaultOnError, VecSkipError};
use std::fmt;
use std::str::FromStr;

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub name: String,
    pub location_id: String,
    pub photo_url: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub unit: String,
    pub location_id: String,
    pub container_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub photo_url: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
}

/// Recognition backends the app knows how to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiModel {
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,
    #[default]
    #[serde(rename = "gemini-3-flash-preview")]
    Gemini3FlashPreview,
    #[serde(rename = "gemini-3-pro-preview")]
    Gemini3ProPreview,
    #[serde(rename = "gemini-2.0-flash-exp")]
    Gemini20FlashExp,
}

impl AiModel {
    pub const ALL: [AiModel; 4] = [
        AiModel::Gemini25Flash,
        AiModel::Gemini3FlashPreview,
        AiModel::Gemini3ProPreview,
        AiModel::Gemini20FlashExp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AiModel::Gemini25Flash => "gemini-2.5-flash",
            AiModel::Gemini3FlashPreview => "gemini-3-flash-preview",
            AiModel::Gemini3ProPreview => "gemini-3-pro-preview",
            AiModel::Gemini20FlashExp => "gemini-2.0-flash-exp",
        }
    }
}

impl fmt::Display for AiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AiModel::ALL
            .into_iter()
            .find(|model| model.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownModel(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    Voice,
    Photo,
    BatchScan,
}

impl PromptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptType::Voice => "voice",
            PromptType::Photo => "photo",
            PromptType::BatchScan => "batch_scan",
        }
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "voice" => Ok(PromptType::Voice),
            "photo" => Ok(PromptType::Photo),
            "batch_scan" | "batch-scan" => Ok(PromptType::BatchScan),
            other => Err(Error::Recognition(format!("unknown call type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptHistoryEntry {
    pub id: String,
    pub timestamp: i64,
    pub prompt: String,
    pub model: String,
    #[serde(rename = "type")]
    pub kind: PromptType,
    pub response_summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopmentPrompt {
    pub id: String,
    pub timestamp: i64,
    pub content: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Zh,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Unit used when neither the user nor the model supplied one.
    pub fn default_unit(&self) -> &'static str {
        match self {
            Language::En => "pcs",
            Language::Zh => "个",
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            _ => Err(Error::UnknownLanguage(s.to_string())),
        }
    }
}

/// The whole persisted document. Every subtree has a default so that
/// blobs written by older builds still decode.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryState {
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub items: Vec<InventoryItem>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub current_user_id: String,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub selected_model: AiModel,
    #[serde(default)]
    pub prompt_history: PromptHistory,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub development_prompts: Vec<DevelopmentPrompt>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub name: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
}

/// Partial update for a location. The outer `Option` means "leave as is",
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPatch {
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub photo_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContainer {
    pub name: String,
    pub location_id: String,
    pub photo_url: Option<String>,
}

/// A container never changes location, so there is no `location_id` here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPatch {
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub photo_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub quantity: u32,
    pub unit: String,
    pub location_id: String,
    pub container_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub name: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<String>,
    pub location_id: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub container_id: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub photo_url: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPromptHistoryEntry {
    pub prompt: String,
    pub model: AiModel,
    pub kind: PromptType,
    pub response_summary: String,
}

/// Treats blank references (the form layer sends `""` for "no container")
/// as absent.
pub fn normalize_ref(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_camel_case_without_empty_optionals() {
        let item = InventoryItem {
            id: "i9".into(),
            name: "Soap".into(),
            quantity: 3,
            unit: "bar".into(),
            location_id: "2".into(),
            container_id: None,
            updated_at: 42,
            tags: vec![],
            photo_url: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["locationId"], "2");
        assert_eq!(json["updatedAt"], 42);
        assert!(json.get("containerId").is_none());
        assert!(json.get("photoUrl").is_none());
    }

    #[test]
    fn patch_distinguishes_missing_from_null() {
        let patch: ItemPatch = serde_json::from_str(r#"{"containerId": null}"#).unwrap();
        assert_eq!(patch.container_id, Some(None));

        let patch: ItemPatch = serde_json::from_str(r#"{"name": "Tea"}"#).unwrap();
        assert_eq!(patch.container_id, None);
        assert_eq!(patch.name.as_deref(), Some("Tea"));
    }

    #[test]
    fn unknown_model_falls_back_to_default() {
        let state: InventoryState =
            serde_json::from_str(r#"{"selectedModel": "gpt-something"}"#).unwrap();
        assert_eq!(state.selected_model, AiModel::default());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let state: InventoryState = serde_json::from_str(
            r#"{"items": [
                {"id": "a", "name": "ok", "quantity": 1, "unit": "x", "locationId": "1"},
                {"id": "b", "name": "bad", "quantity": -4, "unit": "x", "locationId": "1"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].id, "a");
        assert!(state.items[0].tags.is_empty());
    }

    #[test]
    fn model_and_language_parse_from_strings() {
        assert_eq!("gemini-2.5-flash".parse::<AiModel>().unwrap(), AiModel::Gemini25Flash);
        assert!("claude".parse::<AiModel>().is_err());
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert_eq!(Language::Zh.default_unit(), "个");
    }

    #[test]
    fn blank_refs_normalize_to_none() {
        assert_eq!(normalize_ref(Some("  ".into())), None);
        assert_eq!(normalize_ref(Some("c1".into())), Some("c1".to_string()));
    }
}
