use crate::history::PromptHistory;
use crate::models::{AiModel, Container, InventoryItem, InventoryState, Location, Member};

/// The sample household shown on first run.
pub fn seed_state(now: i64) -> InventoryState {
    InventoryState {
        locations: vec![
            Location {
                id: "1".into(),
                name: "玄关柜".into(),
                description: Some("入户门旁边的柜子".into()),
                photo_url: None,
            },
            Location {
                id: "2".into(),
                name: "厨房储藏间".into(),
                description: Some("存放干货和调料".into()),
                photo_url: None,
            },
        ],
        containers: vec![
            Container {
                id: "c1".into(),
                name: "抽屉 A".into(),
                location_id: "1".into(),
                photo_url: None,
            },
            Container {
                id: "c2".into(),
                name: "第一层架子".into(),
                location_id: "2".into(),
                photo_url: None,
            },
        ],
        items: vec![
            InventoryItem {
                id: "i1".into(),
                name: "雨伞".into(),
                quantity: 2,
                unit: "把".into(),
                location_id: "1".into(),
                container_id: Some("c1".into()),
                updated_at: now,
                tags: vec!["日常".into()],
                photo_url: None,
            },
            InventoryItem {
                id: "i2".into(),
                name: "生抽酱油".into(),
                quantity: 1,
                unit: "瓶".into(),
                location_id: "2".into(),
                container_id: Some("c2".into()),
                updated_at: now,
                tags: vec!["调料".into()],
                photo_url: None,
            },
        ],
        members: vec![
            Member {
                id: "u1".into(),
                name: "管理员".into(),
                avatar: Some("https://picsum.photos/seed/admin/100".into()),
            },
            Member {
                id: "u2".into(),
                name: "家庭成员".into(),
                avatar: Some("https://picsum.photos/seed/fam/100".into()),
            },
        ],
        current_user_id: "u1".into(),
        selected_model: AiModel::default(),
        prompt_history: PromptHistory::new(),
        development_prompts: Vec::new(),
    }
}
