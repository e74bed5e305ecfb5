//! Read-only projections over an [`InventoryState`]. Nothing here mutates;
//! every call recomputes from the current collections.

use crate::models::{
    AiModel, Container, DevelopmentPrompt, InventoryItem, InventoryState, Location, Member,
    PromptHistoryEntry,
};
use serde::Serialize;

#[derive(Clone, Copy)]
pub struct InventoryView<'a> {
    state: &'a InventoryState,
}

/// Where an item lives, resolved to the owning records.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ItemPlacement<'a> {
    pub location: Option<&'a Location>,
    pub container: Option<&'a Container>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShelfGroup<'a> {
    pub container: &'a Container,
    pub items: Vec<&'a InventoryItem>,
}

/// Visual summary of one location: loose items plus one group per container.
#[derive(Debug, Clone, Serialize)]
pub struct LocationLayout<'a> {
    pub location: &'a Location,
    pub uncategorized: Vec<&'a InventoryItem>,
    pub shelves: Vec<ShelfGroup<'a>>,
    pub item_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub location_count: usize,
    pub item_count: usize,
    pub total_quantity: u64,
}

impl<'a> InventoryView<'a> {
    pub fn new(state: &'a InventoryState) -> Self {
        Self { state }
    }

    pub fn locations(&self) -> &'a [Location] {
        &self.state.locations
    }

    pub fn items(&self) -> &'a [InventoryItem] {
        &self.state.items
    }

    pub fn find_location(&self, id: &str) -> Option<&'a Location> {
        self.state.locations.iter().find(|l| l.id == id)
    }

    pub fn find_container(&self, id: &str) -> Option<&'a Container> {
        self.state.containers.iter().find(|c| c.id == id)
    }

    pub fn find_item(&self, id: &str) -> Option<&'a InventoryItem> {
        self.state.items.iter().find(|i| i.id == id)
    }

    pub fn items_by_location(&self, location_id: &str) -> Vec<&'a InventoryItem> {
        self.state
            .items
            .iter()
            .filter(|i| i.location_id == location_id)
            .collect()
    }

    pub fn items_by_container(&self, container_id: &str) -> Vec<&'a InventoryItem> {
        self.state
            .items
            .iter()
            .filter(|i| i.container_id.as_deref() == Some(container_id))
            .collect()
    }

    pub fn containers_by_location(&self, location_id: &str) -> Vec<&'a Container> {
        self.state
            .containers
            .iter()
            .filter(|c| c.location_id == location_id)
            .collect()
    }

    pub fn uncategorized_items(&self, location_id: &str) -> Vec<&'a InventoryItem> {
        self.state
            .items
            .iter()
            .filter(|i| i.location_id == location_id && i.container_id.is_none())
            .collect()
    }

    pub fn total_quantity(&self) -> u64 {
        self.state.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    pub fn item_count(&self) -> usize {
        self.state.items.len()
    }

    pub fn location_count(&self) -> usize {
        self.state.locations.len()
    }

    pub fn summary(&self) -> InventorySummary {
        InventorySummary {
            location_count: self.location_count(),
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
        }
    }

    /// Case-insensitive substring match on name or any tag. A blank query
    /// matches nothing.
    pub fn search_items(&self, query: &str) -> Vec<&'a InventoryItem> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.state
            .items
            .iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&needle)
                    || item.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Thumbnail for an item: the container's photo, else the location's.
    pub fn resolve_visual_source(&self, item: &InventoryItem) -> Option<&'a str> {
        let placement = self.placement(item);
        placement
            .container
            .and_then(|c| c.photo_url.as_deref())
            .or_else(|| placement.location.and_then(|l| l.photo_url.as_deref()))
    }

    pub fn placement(&self, item: &InventoryItem) -> ItemPlacement<'a> {
        ItemPlacement {
            location: self.find_location(&item.location_id),
            container: item
                .container_id
                .as_deref()
                .and_then(|id| self.find_container(id)),
        }
    }

    pub fn location_layout(&self, location_id: &str) -> Option<LocationLayout<'a>> {
        let location = self.find_location(location_id)?;
        let shelves = self
            .containers_by_location(location_id)
            .into_iter()
            .map(|container| ShelfGroup {
                container,
                items: self.items_by_container(&container.id),
            })
            .collect();
        Some(LocationLayout {
            location,
            uncategorized: self.uncategorized_items(location_id),
            shelves,
            item_count: self.items_by_location(location_id).len(),
        })
    }

    /// First location whose name contains `hint`, ignoring case.
    pub fn match_location(&self, hint: &str) -> Option<&'a Location> {
        let needle = hint.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.state
            .locations
            .iter()
            .find(|l| l.name.to_lowercase().contains(&needle))
    }

    pub fn members(&self) -> &'a [Member] {
        &self.state.members
    }

    pub fn current_member(&self) -> Option<&'a Member> {
        self.state
            .members
            .iter()
            .find(|m| m.id == self.state.current_user_id)
    }

    pub fn selected_model(&self) -> AiModel {
        self.state.selected_model
    }

    pub fn prompt_history(&self) -> &'a [PromptHistoryEntry] {
        self.state.prompt_history.entries()
    }

    pub fn development_prompts(&self) -> &'a [DevelopmentPrompt] {
        &self.state.development_prompts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_state;

    fn ids<'a>(items: &[&'a InventoryItem]) -> Vec<&'a str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn filters_by_location_and_container() {
        let state = seed_state(0);
        let view = InventoryView::new(&state);
        assert_eq!(ids(&view.items_by_location("1")), vec!["i1"]);
        assert_eq!(ids(&view.items_by_container("c2")), vec!["i2"]);
        assert_eq!(view.containers_by_location("2")[0].id, "c2");
        assert!(view.uncategorized_items("1").is_empty());
        assert!(view.items_by_location("nope").is_empty());
    }

    #[test]
    fn totals_sum_quantities() {
        let state = seed_state(0);
        let view = InventoryView::new(&state);
        assert_eq!(view.total_quantity(), 3);
        assert_eq!(
            view.summary(),
            InventorySummary {
                location_count: 2,
                item_count: 2,
                total_quantity: 3
            }
        );
    }

    #[test]
    fn search_matches_name_or_tag_case_insensitively() {
        let mut state = seed_state(0);
        state.items[0].name = "Umbrella".into();
        let view = InventoryView::new(&state);
        assert!(view.search_items("").is_empty());
        assert!(view.search_items("   ").is_empty());
        assert_eq!(ids(&view.search_items("umbR")), vec!["i1"]);
        assert_eq!(ids(&view.search_items("调料")), vec!["i2"]);
        assert!(view.search_items("zzz").is_empty());
    }

    #[test]
    fn container_photo_wins_over_location_photo() {
        let mut state = seed_state(0);
        state.locations[0].photo_url = Some("loc.jpg".into());
        let view = InventoryView::new(&state);
        assert_eq!(view.resolve_visual_source(&state.items[0]), Some("loc.jpg"));
        assert_eq!(view.resolve_visual_source(&state.items[1]), None);

        let mut state = state.clone();
        state.containers[0].photo_url = Some("shelf.jpg".into());
        let view = InventoryView::new(&state);
        assert_eq!(view.resolve_visual_source(&state.items[0]), Some("shelf.jpg"));
    }

    #[test]
    fn layout_groups_items_per_shelf() {
        let mut state = seed_state(0);
        state.items.push(InventoryItem {
            id: "loose".into(),
            name: "Keys".into(),
            quantity: 1,
            unit: "set".into(),
            location_id: "1".into(),
            container_id: None,
            updated_at: 0,
            tags: vec![],
            photo_url: None,
        });
        state.containers.push(Container {
            id: "c9".into(),
            name: "Empty shelf".into(),
            location_id: "1".into(),
            photo_url: None,
        });
        let view = InventoryView::new(&state);
        let layout = view.location_layout("1").unwrap();
        assert_eq!(layout.item_count, 2);
        assert_eq!(ids(&layout.uncategorized), vec!["loose"]);
        assert_eq!(layout.shelves.len(), 2);
        assert_eq!(ids(&layout.shelves[0].items), vec!["i1"]);
        assert!(layout.shelves[1].items.is_empty());
        assert!(view.location_layout("missing").is_none());
    }

    #[test]
    fn location_hint_matches_by_substring() {
        let state = seed_state(0);
        let view = InventoryView::new(&state);
        assert_eq!(view.match_location("厨房").map(|l| l.id.as_str()), Some("2"));
        assert!(view.match_location("").is_none());
        assert!(view.match_location("garage").is_none());
    }

    #[test]
    fn current_member_follows_current_user_id() {
        let state = seed_state(0);
        let view = InventoryView::new(&state);
        assert_eq!(view.current_member().map(|m| m.name.as_str()), Some("管理员"));
    }
}
