pub mod local;
pub mod memory;
pub mod postgres;
pub mod remote;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::announcement::{Announcement, Draft};
use crate::models::role::Role;
use crate::services::filter::{self, AudienceFilter};

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use remote::RemoteStore;

/// Owner of the canonical, most-recent-first announcement list.
///
/// `create` validates the draft before touching any backend and only
/// prepends the record once the backend has acknowledged the write.
#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Announcement>>;

    /// What `viewer` sees under `audience`, in canonical order.
    async fn list_visible(
        &self,
        viewer: Role,
        audience: &AudienceFilter,
    ) -> Result<Vec<Announcement>> {
        let all = self.list().await?;
        Ok(filter::visible(&all, viewer, audience)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn create(&self, draft: Draft) -> Result<Announcement>;

    /// Cheap reachability check used by `/health`.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str;
}
