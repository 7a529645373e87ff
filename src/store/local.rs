use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::AnnouncementStore;
use crate::error::Result;
use crate::models::announcement::{Announcement, Draft};
use crate::models::role::Role;

/// Announcement list persisted as one JSON array in a cache file.
///
/// Every mutation writes the file first and swaps the in-memory list only
/// once the write succeeded, so the two never disagree.
pub struct LocalStore {
    path: PathBuf,
    items: RwLock<Vec<Announcement>>,
}

impl LocalStore {
    /// Loads the cache. A missing, unreadable or corrupt file yields an empty list.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => decode_cache(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No announcement cache at {}", path.display());
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Could not read announcement cache {}: {e}", path.display());
                Vec::new()
            }
        };
        Self {
            path,
            items: RwLock::new(items),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records that `role` has read the announcement. Returns `false` when
    /// the id is unknown or the mark was already there.
    pub async fn mark_read(&self, id: Uuid, role: Role) -> Result<bool> {
        let mut items = self.items.write().await;
        let Some(pos) = items.iter().position(|a| a.id == id) else {
            return Ok(false);
        };
        if items[pos].read_by.contains(&role) {
            return Ok(false);
        }

        let mut next = items.clone();
        next[pos].read_by.insert(role);
        self.persist(&next).await?;
        *items = next;
        Ok(true)
    }

    async fn persist(&self, items: &[Announcement]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec_pretty(items).map_err(std::io::Error::other)?;

        // Write to a sibling file then rename so a crash never leaves a half-written cache
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl AnnouncementStore for LocalStore {
    async fn list(&self) -> Result<Vec<Announcement>> {
        Ok(self.items.read().await.clone())
    }

    async fn create(&self, draft: Draft) -> Result<Announcement> {
        draft.validate()?;
        let announcement = draft.into_announcement(Uuid::new_v4(), Utc::now());

        let mut items = self.items.write().await;
        let mut next = Vec::with_capacity(items.len() + 1);
        next.push(announcement.clone());
        next.extend(items.iter().cloned());

        if let Err(e) = self.persist(&next).await {
            tracing::warn!("Announcement cache write failed for {}: {e}", self.path.display());
            return Err(e);
        }
        *items = next;
        Ok(announcement)
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

/// Parses the cache file contents. Anything other than a JSON array is
/// treated as empty; records that fail to parse are skipped.
fn decode_cache(raw: &str) -> Vec<Announcement> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Announcement cache is not valid JSON, starting empty: {e}");
            return Vec::new();
        }
    };
    let serde_json::Value::Array(records) = value else {
        tracing::warn!("Announcement cache is not an array, starting empty");
        return Vec::new();
    };

    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Announcement>(record) {
            Ok(a) => Some(a),
            Err(e) => {
                tracing::warn!("Skipping unreadable cached announcement: {e}");
                None
            }
        })
        .collect()
}
