//! Boundary to the external recognition model: request shapes, default
//! instructions and tolerant parsing of the model's free-text replies.

use crate::error::Result;
use crate::models::{normalize_ref, AiModel, Language, Location, NewItem, PromptType};
use crate::views::InventoryView;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DefaultOnError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    fn default_mime(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/jpeg",
            MediaKind::Audio => "audio/webm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub kind: MediaKind,
    pub mime_type: String,
    /// Base64 body without any `data:` URL header.
    pub data: String,
}

impl MediaPayload {
    /// Accepts either a `data:<mime>;base64,<body>` URL or a bare base64 body.
    pub fn from_data_url(kind: MediaKind, input: &str) -> Self {
        match input.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
            Some((header, body)) => {
                let mime = header.split(';').next().unwrap_or_default();
                Self {
                    kind,
                    mime_type: if mime.is_empty() {
                        kind.default_mime().to_string()
                    } else {
                        mime.to_string()
                    },
                    data: body.to_string(),
                }
            }
            None => Self {
                kind,
                mime_type: kind.default_mime().to_string(),
                data: input.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionRequest {
    pub media: MediaPayload,
    pub instruction: Option<String>,
    pub max_items: usize,
    pub model: AiModel,
}

impl RecognitionRequest {
    pub fn new(media: MediaPayload, model: AiModel, max_items: usize) -> Self {
        Self {
            media,
            instruction: None,
            max_items,
            model,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// The text actually sent alongside the media.
    pub fn prompt(&self) -> String {
        match self.instruction.as_deref().filter(|i| !i.trim().is_empty()) {
            Some(instruction) => instruction.to_string(),
            None => default_prompt(self.media.kind, self.max_items),
        }
    }
}

pub fn default_prompt(kind: MediaKind, max_items: usize) -> String {
    match kind {
        MediaKind::Image => format!(
            "You are a meticulous household storekeeper. List every distinct product visible \
in this photo, at most {max_items} entries. Name each one by brand and full product name, \
including any size printed on the package (for example 50ml or 100g). Count how many of each \
you can see and pick a fitting unit such as bottle, box, tube, bag or piece. Do not merge \
different products. Reply with a JSON array whose objects have \"item\" (string), \
\"quantity\" (number), \"unit\" (string) and optional \"tags\" (array of strings)."
        ),
        MediaKind::Audio => format!(
            "You are a home inventory assistant. Identify up to {max_items} items mentioned in \
this recording; the speaker may use Chinese or English. Reply with a JSON array whose objects \
have \"item\" (name), \"quantity\" (number), \"unit\" (string) and optional \"tags\" (array \
of strings)."
        ),
    }
}

/// Instruction for the single-item form flow, which also asks the model to
/// pick one of the existing locations.
pub fn single_item_prompt(kind: MediaKind, locations: &[Location]) -> String {
    let names = locations
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let source = match kind {
        MediaKind::Image => "photo",
        MediaKind::Audio => "voice command",
    };
    format!(
        "This {source} is about adding one item to a home inventory. Existing locations are: \
{names}. Extract the item name (brand and full product name where possible), quantity, unit, \
the best matching location and optional tags. Reply with one JSON object with the keys \
\"item\", \"quantity\", \"unit\", \"location\" and \"tags\"."
    )
}

/// The model call itself. Implementations return the raw reply text;
/// transport failures are errors, unparseable replies are not.
pub trait RecognitionService: Send + Sync {
    fn recognize(&self, request: &RecognitionRequest) -> Result<String>;
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecognizedItem {
    pub item: String,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub unit: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RecognizedItem {
    /// Whole, positive quantity; anything missing or non-positive counts as one.
    pub fn quantity(&self) -> u32 {
        whole_quantity(self.quantity).unwrap_or(1)
    }

    pub fn unit_or(&self, lang: Language) -> String {
        self.unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| lang.default_unit())
            .to_string()
    }
}

fn whole_quantity(value: Option<f64>) -> Option<u32> {
    value
        .filter(|q| q.is_finite() && *q > 0.0)
        .map(|q| q.round().clamp(1.0, f64::from(u32::MAX)) as u32)
}

/// Items from the first well-formed JSON array in `reply`. Replies with no
/// such array yield nothing; array elements of the wrong shape are skipped.
pub fn parse_recognized_items(reply: &str) -> Vec<RecognizedItem> {
    let Some(values) = first_json::<Vec<Value>>(reply, '[') else {
        log::debug!("No JSON array in recognition reply ({} chars)", reply.len());
        return Vec::new();
    };
    values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RecognizedItem>(value).ok())
        .collect()
}

/// First value of type `T` that parses starting at an `open` delimiter.
fn first_json<T: DeserializeOwned>(text: &str, open: char) -> Option<T> {
    text.match_indices(open).find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<T>()
            .next()
            .and_then(|parsed| parsed.ok())
    })
}

/// One-line description of a reply for the history log; unnamed entries
/// are not counted.
pub fn summarize(items: &[RecognizedItem]) -> String {
    let listed: Vec<String> = items
        .iter()
        .filter(|i| !i.item.trim().is_empty())
        .map(|i| format!("{} x{}", i.item.trim(), i.quantity()))
        .collect();
    if listed.is_empty() {
        return "No items identified".to_string();
    }
    format!("Identified {} item(s): {}", listed.len(), listed.join(", "))
}

/// Single-item suggestion returned by the form flow.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ItemSuggestion {
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub item: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub unit: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub location: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl ItemSuggestion {
    /// Overlays the suggestion on a form draft; fields the model left out
    /// keep the draft's values.
    pub fn merge_into(&self, mut draft: NewItem, view: &InventoryView<'_>) -> NewItem {
        if let Some(name) = self.item.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            draft.name = name.to_string();
        }
        if let Some(quantity) = whole_quantity(self.quantity) {
            draft.quantity = quantity;
        }
        if let Some(unit) = self.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            draft.unit = unit.to_string();
        }
        if let Some(location) = self.location.as_deref().and_then(|hint| view.match_location(hint)) {
            if location.id != draft.location_id {
                draft.location_id = location.id.clone();
                draft.container_id = None;
            }
        }
        if let Some(tags) = &self.tags {
            draft.tags = tags.clone();
        }
        draft.container_id = normalize_ref(draft.container_id);
        draft
    }
}

pub fn parse_item_suggestion(reply: &str) -> Option<ItemSuggestion> {
    first_json::<ItemSuggestion>(reply, '{')
}

/// Where a batch of recognized items should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTarget {
    pub location_id: String,
    pub container_id: Option<String>,
    pub kind: PromptType,
}

/// One completed recognition round trip, ready to be applied to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionBatch {
    pub target: BatchTarget,
    pub model: AiModel,
    pub prompt: String,
    pub items: Vec<RecognizedItem>,
}

/// Calls the service and parses its reply into a batch for `target`.
pub fn recognize_batch(
    service: &dyn RecognitionService,
    request: &RecognitionRequest,
    target: BatchTarget,
) -> Result<RecognitionBatch> {
    let prompt = request.prompt();
    let reply = service.recognize(request)?;
    let items = parse_recognized_items(&reply);
    log::info!(
        "Recognition with {} returned {} item(s)",
        request.model,
        items.len()
    );
    Ok(RecognitionBatch {
        target,
        model: request.model,
        prompt,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::seed::seed_state;

    struct CannedReply(&'static str);

    impl RecognitionService for CannedReply {
        fn recognize(&self, _request: &RecognitionRequest) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Offline;

    impl RecognitionService for Offline {
        fn recognize(&self, _request: &RecognitionRequest) -> Result<String> {
            Err(Error::Recognition("network unreachable".into()))
        }
    }

    fn request() -> RecognitionRequest {
        RecognitionRequest::new(
            MediaPayload::from_data_url(MediaKind::Image, "data:image/png;base64,AAAA"),
            AiModel::Gemini25Flash,
            5,
        )
    }

    #[test]
    fn data_url_header_is_stripped() {
        let payload = MediaPayload::from_data_url(MediaKind::Audio, "data:audio/ogg;base64,QUJD");
        assert_eq!(payload.mime_type, "audio/ogg");
        assert_eq!(payload.data, "QUJD");

        let bare = MediaPayload::from_data_url(MediaKind::Audio, "QUJD");
        assert_eq!(bare.mime_type, "audio/webm");
        assert_eq!(bare.data, "QUJD");
    }

    #[test]
    fn array_is_found_inside_prose() {
        let reply = "Sure! Here is what I see:\n```json\n[{\"item\": \"Dove soap 90g\", \
\"quantity\": 3, \"unit\": \"bar\", \"tags\": [\"bath\"]}]\n```\nLet me know [if] needed.";
        let items = parse_recognized_items(reply);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item, "Dove soap 90g");
        assert_eq!(items[0].quantity(), 3);
        assert_eq!(items[0].tags, vec!["bath".to_string()]);
    }

    #[test]
    fn unparseable_reply_yields_nothing() {
        assert!(parse_recognized_items("I could not see anything useful.").is_empty());
        assert!(parse_recognized_items("[broken, json").is_empty());
        assert!(parse_recognized_items("").is_empty());
    }

    #[test]
    fn later_array_is_used_when_the_first_bracket_is_not_json() {
        let reply = "[note] result: [{\"item\": \"Tea\", \"quantity\": 2, \"unit\": \"box\"}]";
        let items = parse_recognized_items(reply);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item, "Tea");
    }

    #[test]
    fn odd_fields_fall_back_to_defaults() {
        let reply = r#"[{"item": "Rice", "quantity": "lots", "unit": ""},
                        {"item": "Salt", "quantity": 0},
                        {"quantity": 4},
                        "loose string"]"#;
        let items = parse_recognized_items(reply);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity(), 1);
        assert_eq!(items[0].unit_or(Language::En), "pcs");
        assert_eq!(items[1].quantity(), 1);
        assert_eq!(items[1].unit_or(Language::Zh), "个");
    }

    #[test]
    fn default_prompt_carries_the_item_cap() {
        let req = request();
        assert!(req.prompt().contains("at most 5"));
        let custom = req.with_instruction("count the mugs");
        assert_eq!(custom.prompt(), "count the mugs");
    }

    #[test]
    fn batch_keeps_prompt_and_model() {
        let target = BatchTarget {
            location_id: "2".into(),
            container_id: None,
            kind: PromptType::BatchScan,
        };
        let batch = recognize_batch(
            &CannedReply(r#"[{"item": "Soap", "quantity": 3, "unit": "bar"}]"#),
            &request(),
            target.clone(),
        )
        .unwrap();
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.model, AiModel::Gemini25Flash);
        assert_eq!(batch.target, target);

        assert!(recognize_batch(&Offline, &request(), target).is_err());
    }

    #[test]
    fn summary_lists_items() {
        assert_eq!(summarize(&[]), "No items identified");
        let items = parse_recognized_items(r#"[{"item": "Tea", "quantity": 2}]"#);
        assert_eq!(summarize(&items), "Identified 1 item(s): Tea x2");
    }

    #[test]
    fn suggestion_merges_into_draft() {
        let state = seed_state(0);
        let view = InventoryView::new(&state);
        let draft = NewItem {
            name: String::new(),
            quantity: 1,
            unit: "个".into(),
            location_id: "1".into(),
            container_id: Some("c1".into()),
            tags: vec![],
            photo_url: None,
        };
        let suggestion = parse_item_suggestion(
            r#"Result: {"item": "老抽", "quantity": 2, "unit": "瓶", "location": "厨房", "tags": ["调料"]}"#,
        )
        .unwrap();
        let merged = suggestion.merge_into(draft.clone(), &view);
        assert_eq!(merged.name, "老抽");
        assert_eq!(merged.quantity, 2);
        assert_eq!(merged.location_id, "2");
        assert_eq!(merged.container_id, None);
        assert_eq!(merged.tags, vec!["调料".to_string()]);

        let unknown_place = parse_item_suggestion(r#"{"item": "Tape", "location": "garage"}"#)
            .unwrap()
            .merge_into(draft, &view);
        assert_eq!(unknown_place.location_id, "1");
        assert_eq!(unknown_place.container_id.as_deref(), Some("c1"));
        assert_eq!(unknown_place.quantity, 1);

        assert!(parse_item_suggestion("no json here").is_none());
    }
}
