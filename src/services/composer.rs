use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{AnnouncementError, Result};
use crate::models::announcement::{Announcement, Draft};
use crate::models::role::Role;
use crate::models::session::SessionContext;
use crate::services::metrics;
use crate::store::AnnouncementStore;

/// What a sender has typed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub title: String,
    pub message: String,
    pub selected_recipients: BTreeSet<Role>,
    pub attachment_ref: Option<String>,
    pub important: bool,
}

impl FormState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Turns form input into drafts on behalf of one signed-in sender.
pub struct Composer {
    store: Arc<dyn AnnouncementStore>,
    session: SessionContext,
}

impl Composer {
    pub fn new(store: Arc<dyn AnnouncementStore>, session: SessionContext) -> Self {
        Self { store, session }
    }

    pub fn compose(&self, form: &FormState) -> Result<Draft> {
        if form.selected_recipients.is_empty() {
            return Err(AnnouncementError::validation(
                "Select at least one recipient role",
            ));
        }
        let draft = Draft {
            title: form.title.clone(),
            message: form.message.clone(),
            sender_id: self.session.sender_id.clone(),
            sender_role: self.session.role,
            sender_name: self.session.sender_name.clone(),
            recipients: form.selected_recipients.iter().copied().collect(),
            attachment: form.attachment_ref.clone(),
            important: form.important,
            require_recipients: true,
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Composes and hands the draft to the store. The form is cleared only
    /// after the store confirmed the write.
    pub async fn submit(&self, form: &mut FormState) -> Result<Announcement> {
        let result = match self.compose(form) {
            Ok(draft) => self.store.create(draft).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(announcement) => {
                metrics::record_created(announcement.sender_role);
                tracing::info!(
                    id = %announcement.id,
                    sender_role = %announcement.sender_role,
                    "Announcement published"
                );
                form.clear();
                Ok(announcement)
            }
            Err(e) => {
                metrics::record_failure(&e);
                tracing::warn!(kind = e.kind(), "Announcement not published: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct OfflineStore;

    #[async_trait]
    impl AnnouncementStore for OfflineStore {
        async fn list(&self) -> Result<Vec<Announcement>> {
            Ok(Vec::new())
        }

        async fn create(&self, _draft: Draft) -> Result<Announcement> {
            Err(AnnouncementError::RemoteUnavailable("service offline".into()))
        }

        fn backend(&self) -> &'static str {
            "offline"
        }
    }

    fn session() -> SessionContext {
        SessionContext {
            sender_id: "f-7".into(),
            sender_name: "Dr. Okafor".into(),
            role: Role::Faculty,
        }
    }

    fn form() -> FormState {
        FormState {
            title: "Lab cancelled".into(),
            message: "No lab session this Thursday".into(),
            selected_recipients: [Role::Student].into_iter().collect(),
            attachment_ref: Some("uploads/notice.pdf".into()),
            important: true,
        }
    }

    #[test]
    fn compose_injects_session_identity() {
        let composer = Composer::new(Arc::new(MemoryStore::new()), session());
        let draft = composer.compose(&form()).unwrap();
        assert_eq!(draft.sender_role, Role::Faculty);
        assert_eq!(draft.sender_name, "Dr. Okafor");
        assert!(draft.recipients.contains(Role::Student));
        assert!(draft.require_recipients);
    }

    #[test]
    fn compose_requires_recipients_and_text() {
        let composer = Composer::new(Arc::new(MemoryStore::new()), session());

        let mut f = form();
        f.selected_recipients.clear();
        assert!(matches!(composer.compose(&f), Err(AnnouncementError::Validation(_))));

        let mut f = form();
        f.title = " ".into();
        assert!(matches!(composer.compose(&f), Err(AnnouncementError::Validation(_))));
    }

    #[tokio::test]
    async fn successful_submit_clears_form() {
        let store = Arc::new(MemoryStore::new());
        let composer = Composer::new(store.clone(), session());
        let mut f = form();

        let created = composer.submit(&mut f).await.unwrap();
        assert_eq!(f, FormState::default());
        assert_eq!(created.attachment.as_deref(), Some("uploads/notice.pdf"));
        assert_eq!(store.list().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn failed_submit_keeps_form() {
        let composer = Composer::new(Arc::new(OfflineStore), session());
        let mut f = form();

        let err = composer.submit(&mut f).await.unwrap_err();
        assert!(matches!(err, AnnouncementError::RemoteUnavailable(_)));
        assert_eq!(f, form());
    }
}
