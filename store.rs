//! The inventory store: sole owner of every collection. Each mutation is
//! staged on a copy of the state, written in full through [`Persistence`],
//! and only then becomes the live state, so a failed write changes nothing.
//! Lookups that miss return `Ok(false)` and write nothing.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::ids;
use crate::models::{
    normalize_ref, AiModel, Container, ContainerPatch, InventoryItem, InventoryState, ItemPatch,
    Language, Location, LocationPatch, NewContainer, NewItem, NewLocation, NewPromptHistoryEntry,
    PromptHistoryEntry,
};
use crate::persistence::Persistence;
use crate::recognition::{summarize, RecognitionBatch};
use crate::views::InventoryView;

pub struct InventoryStore {
    state: InventoryState,
    language: Language,
    persistence: Persistence,
    config: StoreConfig,
}

/// Outcome of applying one recognition batch.
#[derive(Debug, Clone)]
pub struct RecognitionReport {
    pub added: Vec<InventoryItem>,
    /// Entries dropped because the model gave no usable name.
    pub skipped: usize,
    pub history: PromptHistoryEntry,
}

impl InventoryStore {
    /// Loads the saved state (or the seed) and the language preference.
    pub fn open(persistence: Persistence, mut config: StoreConfig) -> Result<Self> {
        if config.history_capacity == 0 {
            log::warn!("history_capacity must be at least 1; using 1");
            config.history_capacity = 1;
        }
        let mut state = persistence.load()?;
        state.prompt_history.enforce_capacity(config.history_capacity);
        let language = persistence.load_language_preference()?;
        log::info!(
            "Opened inventory: {} location(s), {} container(s), {} item(s)",
            state.locations.len(),
            state.containers.len(),
            state.items.len()
        );
        Ok(Self {
            state,
            language,
            persistence,
            config,
        })
    }

    pub fn state(&self) -> &InventoryState {
        &self.state
    }

    pub fn view(&self) -> InventoryView<'_> {
        InventoryView::new(&self.state)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, lang: Language) -> Result<()> {
        self.persistence.save_language_preference(lang)?;
        self.language = lang;
        Ok(())
    }

    /// Writes `next` and makes it the live state once the write succeeded.
    fn commit(&mut self, next: InventoryState) -> Result<()> {
        self.persistence.save(&next)?;
        self.state = next;
        Ok(())
    }

    pub fn add_location(&mut self, data: NewLocation) -> Result<Location> {
        let location = Location {
            id: ids::new_id(),
            name: data.name,
            description: data.description,
            photo_url: data.photo_url,
        };
        let mut next = self.state.clone();
        next.locations.push(location.clone());
        self.commit(next)?;
        log::debug!("Added location {} ({})", location.id, location.name);
        Ok(location)
    }

    pub fn update_location(&mut self, id: &str, patch: LocationPatch) -> Result<bool> {
        let mut next = self.state.clone();
        let Some(location) = next.locations.iter_mut().find(|l| l.id == id) else {
            return Ok(false);
        };
        if let Some(name) = patch.name {
            location.name = name;
        }
        if let Some(description) = patch.description {
            location.description = description;
        }
        if let Some(photo_url) = patch.photo_url {
            location.photo_url = photo_url;
        }
        self.commit(next)?;
        Ok(true)
    }

    pub fn add_container(&mut self, data: NewContainer) -> Result<Container> {
        self.require_location(&data.location_id)?;
        let container = Container {
            id: ids::new_id(),
            name: data.name,
            location_id: data.location_id,
            photo_url: data.photo_url,
        };
        let mut next = self.state.clone();
        next.containers.push(container.clone());
        self.commit(next)?;
        log::debug!(
            "Added container {} to location {}",
            container.id,
            container.location_id
        );
        Ok(container)
    }

    pub fn update_container(&mut self, id: &str, patch: ContainerPatch) -> Result<bool> {
        let mut next = self.state.clone();
        let Some(container) = next.containers.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        if let Some(name) = patch.name {
            container.name = name;
        }
        if let Some(photo_url) = patch.photo_url {
            container.photo_url = photo_url;
        }
        self.commit(next)?;
        Ok(true)
    }

    pub fn add_item(&mut self, data: NewItem) -> Result<InventoryItem> {
        let item = self.place_item(data)?;
        let mut next = self.state.clone();
        next.items.push(item.clone());
        self.commit(next)?;
        log::debug!("Added item {} ({} x{})", item.id, item.name, item.quantity);
        Ok(item)
    }

    /// Validates the placement of `data` and builds the record for it.
    fn place_item(&self, data: NewItem) -> Result<InventoryItem> {
        let container_id = normalize_ref(data.container_id);
        self.check_placement(&data.location_id, container_id.as_deref())?;
        Ok(InventoryItem {
            id: ids::new_id(),
            name: data.name,
            quantity: data.quantity,
            unit: data.unit,
            location_id: data.location_id,
            container_id,
            updated_at: ids::now_millis(),
            tags: data.tags,
            photo_url: data.photo_url,
        })
    }

    /// Merges `patch` into the item and always refreshes `updated_at`.
    /// Moving to another location without naming a container drops a
    /// container that does not belong to the new location.
    pub fn update_item(&mut self, id: &str, patch: ItemPatch) -> Result<bool> {
        let Some(index) = self.state.items.iter().position(|i| i.id == id) else {
            return Ok(false);
        };
        let current = &self.state.items[index];

        let location_id = patch
            .location_id
            .clone()
            .unwrap_or_else(|| current.location_id.clone());
        let container_id = match patch.container_id.clone() {
            Some(requested) => normalize_ref(requested),
            None if location_id == current.location_id => current.container_id.clone(),
            None => current.container_id.clone().filter(|cid| {
                self.state
                    .containers
                    .iter()
                    .any(|c| &c.id == cid && c.location_id == location_id)
            }),
        };
        self.check_placement(&location_id, container_id.as_deref())?;

        let mut next = self.state.clone();
        let item = &mut next.items[index];
        if let Some(name) = patch.name {
            item.name = name;
        }
        if let Some(quantity) = patch.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            item.unit = unit;
        }
        if let Some(tags) = patch.tags {
            item.tags = tags;
        }
        if let Some(photo_url) = patch.photo_url {
            item.photo_url = photo_url;
        }
        item.location_id = location_id;
        item.container_id = container_id;
        item.updated_at = ids::touch(item.updated_at);
        self.commit(next)?;
        Ok(true)
    }

    pub fn delete_item(&mut self, id: &str) -> Result<bool> {
        if !self.state.items.iter().any(|i| i.id == id) {
            return Ok(false);
        }
        let mut next = self.state.clone();
        next.items.retain(|i| i.id != id);
        self.commit(next)?;
        log::debug!("Deleted item {id}");
        Ok(true)
    }

    /// New quantity is `max(0, current + delta)`, saturating at `u32::MAX`.
    pub fn adjust_quantity(&mut self, id: &str, delta: i64) -> Result<bool> {
        let mut next = self.state.clone();
        let Some(item) = next.items.iter_mut().find(|i| i.id == id) else {
            return Ok(false);
        };
        let adjusted = i64::from(item.quantity)
            .saturating_add(delta)
            .clamp(0, i64::from(u32::MAX));
        item.quantity = adjusted as u32;
        item.updated_at = ids::touch(item.updated_at);
        self.commit(next)?;
        Ok(true)
    }

    pub fn set_selected_model(&mut self, model: AiModel) -> Result<()> {
        let mut next = self.state.clone();
        next.selected_model = model;
        self.commit(next)
    }

    pub fn add_prompt_history_entry(
        &mut self,
        entry: NewPromptHistoryEntry,
    ) -> Result<PromptHistoryEntry> {
        let mut next = self.state.clone();
        let stored = next
            .prompt_history
            .record(entry, self.config.history_capacity);
        self.commit(next)?;
        Ok(stored)
    }

    pub fn clear_prompt_history(&mut self) -> Result<()> {
        let mut next = self.state.clone();
        next.prompt_history.clear();
        self.commit(next)
    }

    /// Adds every named item of a completed recognition round trip to the
    /// batch target, in reply order, then logs the round trip. The items and
    /// the history entry are written together or not at all.
    pub fn add_recognized_items(&mut self, batch: RecognitionBatch) -> Result<RecognitionReport> {
        let target = batch.target;
        let container_id = normalize_ref(target.container_id);
        self.check_placement(&target.location_id, container_id.as_deref())?;

        let lang = self.language;
        let mut added = Vec::new();
        let mut skipped = 0;
        for recognized in &batch.items {
            let name = recognized.item.trim();
            if name.is_empty() {
                skipped += 1;
                continue;
            }
            added.push(self.place_item(NewItem {
                name: name.to_string(),
                quantity: recognized.quantity(),
                unit: recognized.unit_or(lang),
                location_id: target.location_id.clone(),
                container_id: container_id.clone(),
                tags: recognized.tags.clone(),
                photo_url: None,
            })?);
        }

        let mut next = self.state.clone();
        next.items.extend(added.iter().cloned());
        let history = next.prompt_history.record(
            NewPromptHistoryEntry {
                prompt: batch.prompt,
                model: batch.model,
                kind: target.kind,
                response_summary: summarize(&batch.items),
            },
            self.config.history_capacity,
        );
        self.commit(next)?;
        log::info!(
            "Applied recognition batch to location {}: {} added, {skipped} skipped",
            target.location_id,
            added.len()
        );
        Ok(RecognitionReport {
            added,
            skipped,
            history,
        })
    }

    fn require_location(&self, location_id: &str) -> Result<()> {
        if self.state.locations.iter().any(|l| l.id == location_id) {
            Ok(())
        } else {
            Err(Error::UnknownLocation(location_id.to_string()))
        }
    }

    fn check_placement(&self, location_id: &str, container_id: Option<&str>) -> Result<()> {
        self.require_location(location_id)?;
        let Some(container_id) = container_id else {
            return Ok(());
        };
        let container = self
            .state
            .containers
            .iter()
            .find(|c| c.id == container_id)
            .ok_or_else(|| Error::UnknownContainer(container_id.to_string()))?;
        if container.location_id != location_id {
            return Err(Error::ContainerMismatch {
                container_id: container_id.to_string(),
                location_id: location_id.to_string(),
            });
        }
        Ok(())
    }
}
