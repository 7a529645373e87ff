use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::AnnouncementStore;
use crate::error::Result;
use crate::models::announcement::{Announcement, Draft};

/// Process-local list, lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<Vec<Announcement>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with an already ordered list.
    pub fn with_items(items: Vec<Announcement>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Announcement>> {
        Ok(self.items.read().await.clone())
    }

    async fn create(&self, draft: Draft) -> Result<Announcement> {
        draft.validate()?;
        let announcement = draft.into_announcement(Uuid::new_v4(), Utc::now());
        self.items.write().await.insert(0, announcement.clone());
        Ok(announcement)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
