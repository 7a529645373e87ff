use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tokio::sync::RwLock;

use super::AnnouncementStore;
use crate::error::{AnnouncementError, Result};
use crate::models::announcement::{
    Announcement, CreateAnnouncementRequest, Draft, Envelope, ErrorBody, RemoteAnnouncement,
};
use crate::models::role::Role;
use crate::services::filter::AudienceFilter;

/// Client of the announcement HTTP API, scoped to one viewer role.
///
/// The service filters server-side, so `list` returns what the viewer sees
/// under "all" and `list_visible` forwards the audience as `filter`.
/// Keeps a mirror of the last list it fetched; a successful create is
/// prepended to it. Calls are never retried.
pub struct RemoteStore {
    client: Client,
    base_url: String,
    viewer: Role,
    mirror: RwLock<Vec<Announcement>>,
}

impl RemoteStore {
    pub fn new(base_url: &str, viewer: Role, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            viewer,
            mirror: RwLock::new(Vec::new()),
        })
    }

    /// Last list seen, without a network round trip.
    pub async fn cached(&self) -> Vec<Announcement> {
        self.mirror.read().await.clone()
    }

    fn url(&self) -> String {
        format!("{}/announcements", self.base_url)
    }
}

#[async_trait]
impl AnnouncementStore for RemoteStore {
    async fn list(&self) -> Result<Vec<Announcement>> {
        self.list_visible(self.viewer, &AudienceFilter::All).await
    }

    async fn list_visible(
        &self,
        viewer: Role,
        audience: &AudienceFilter,
    ) -> Result<Vec<Announcement>> {
        let response = self
            .client
            .get(self.url())
            .query(&[("role", viewer.as_str()), ("filter", audience.as_tag())])
            .send()
            .await
            .map_err(unreachable)?;
        let envelope: Envelope<Vec<RemoteAnnouncement>> = read_data(response).await?;

        let items: Vec<Announcement> = envelope
            .data
            .into_iter()
            .filter_map(|record| match Announcement::try_from(record) {
                Ok(a) => Some(a),
                Err(e) => {
                    tracing::warn!("Skipping announcement from remote list: {e}");
                    None
                }
            })
            .collect();

        *self.mirror.write().await = items.clone();
        Ok(items)
    }

    async fn create(&self, draft: Draft) -> Result<Announcement> {
        draft.validate()?;

        let body = CreateAnnouncementRequest::from(&draft);
        let response = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .map_err(unreachable)?;
        let envelope: Envelope<RemoteAnnouncement> = read_data(response).await?;

        let mut announcement = Announcement::try_from(envelope.data).inspect_err(|e| {
            tracing::error!("Malformed create response from announcement service: {e}");
        })?;
        // The create response omits targeting fields; the draft is authoritative for them
        if announcement.recipients.is_everyone() {
            announcement.recipients = draft.recipients;
        }
        if announcement.attachment.is_none() {
            announcement.attachment = draft.attachment;
        }
        announcement.important |= draft.important;

        self.mirror.write().await.insert(0, announcement.clone());
        Ok(announcement)
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}

fn unreachable(e: reqwest::Error) -> AnnouncementError {
    tracing::warn!("Announcement service unreachable: {e}");
    AnnouncementError::RemoteUnavailable(e.to_string())
}

/// Decodes a `{data}` body, or turns a non-2xx `{error}` body into
/// `RemoteUnavailable` carrying the server's text as-is.
async fn read_data<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await.map_err(unreachable)?;

    if !status.is_success() {
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) => format!("HTTP {status}"),
        };
        tracing::warn!("Announcement service returned {status}: {message}");
        return Err(AnnouncementError::RemoteUnavailable(message));
    }

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!("Malformed response from announcement service: {e}");
        AnnouncementError::MalformedResponse(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::announcement::RecipientSet;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer, viewer: Role) -> RemoteStore {
        RemoteStore::new(&server.uri(), viewer, Duration::from_secs(5)).unwrap()
    }

    fn draft() -> Draft {
        Draft {
            title: "Exam Schedule".into(),
            message: "Finals start Monday".into(),
            sender_id: "c-42".into(),
            sender_role: Role::Coordinator,
            sender_name: "Exams Office".into(),
            recipients: [Role::Student].into_iter().collect::<RecipientSet>(),
            attachment: None,
            important: true,
            require_recipients: true,
        }
    }

    #[tokio::test]
    async fn list_sends_role_and_parses_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/announcements"))
            .and(query_param("role", "student"))
            .and(query_param("filter", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {
                        "id": "7d4b8f3c-6a57-4b8e-9a2d-4c1f00000002",
                        "title": "Library hours", "message": "Open late",
                        "senderName": "Admin", "senderRole": "ADMIN",
                        "createdAt": "2026-03-02T09:00:00Z"
                    },
                    {
                        "id": "7d4b8f3c-6a57-4b8e-9a2d-4c1f00000001",
                        "title": "Legacy", "message": "From an old portal",
                        "senderName": "?", "senderRole": "registrar",
                        "createdAt": "2026-03-01T09:00:00Z"
                    },
                    {
                        "id": "7d4b8f3c-6a57-4b8e-9a2d-4c1f00000004",
                        "title": "Transcripts", "message": "Office moved",
                        "senderName": "Admin", "senderRole": "admin",
                        "recipients": ["registrar"],
                        "createdAt": "2026-02-28T09:00:00Z"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let store = store(&server, Role::Student);
        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sender_role, Role::Admin);
        assert_eq!(store.cached().await, items);
    }

    #[tokio::test]
    async fn list_visible_forwards_the_audience_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/announcements"))
            .and(query_param("role", "admin"))
            .and(query_param("filter", "student"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "7d4b8f3c-6a57-4b8e-9a2d-4c1f00000005",
                    "title": "Exam Schedule", "message": "Finals start Monday",
                    "senderName": "Exams Office", "senderRole": "coordinator",
                    "recipients": ["student"],
                    "createdAt": "2026-03-04T09:00:00Z"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = store(&server, Role::Admin)
            .list_visible(Role::Admin, &AudienceFilter::Role(Role::Student))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sender_role, Role::Coordinator);
    }

    #[tokio::test]
    async fn filtered_list_matches_the_local_rule_through_the_router() {
        use crate::{routes, services::filter::visible, store::MemoryStore, AppState};
        use std::sync::Arc;

        let backing = Arc::new(MemoryStore::new());
        backing.create(draft()).await.unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = routes::router(AppState {
            store: backing.clone(),
        });
        tokio::spawn(async move { axum::serve(listener, app).await });

        let remote = RemoteStore::new(&format!("http://{addr}"), Role::Admin, Duration::from_secs(5)).unwrap();
        let all = backing.list().await.unwrap();
        for audience in [
            AudienceFilter::All,
            AudienceFilter::Everyone,
            AudienceFilter::Role(Role::Student),
            AudienceFilter::Role(Role::Faculty),
        ] {
            let local = visible(&all, Role::Admin, &audience).len();
            let served = remote.list_visible(Role::Admin, &audience).await.unwrap().len();
            assert_eq!(served, local, "{audience:?}");
        }
        assert_eq!(
            remote
                .list_visible(Role::Admin, &AudienceFilter::Role(Role::Student))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn create_prepends_acknowledged_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/announcements"))
            .and(body_partial_json(json!({
                "senderRole": "coordinator",
                "recipientRoles": ["student"]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {
                    "id": "7d4b8f3c-6a57-4b8e-9a2d-4c1f00000003",
                    "title": "Exam Schedule", "message": "Finals start Monday",
                    "sender_name": "Exams Office", "sender_role": "coordinator",
                    "created_at": "2026-03-03T09:00:00Z"
                }
            })))
            .mount(&server)
            .await;

        let store = store(&server, Role::Coordinator);
        let created = store.create(draft()).await.unwrap();
        assert!(created.recipients.contains(Role::Student));
        assert!(created.important);
        assert_eq!(store.cached().await, vec![created]);
    }

    #[tokio::test]
    async fn error_body_is_surfaced_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/announcements"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({ "error": "new row violates row-level security policy" })),
            )
            .mount(&server)
            .await;

        let store = store(&server, Role::Coordinator);
        let err = store.create(draft()).await.unwrap_err();
        match err {
            AnnouncementError::RemoteUnavailable(msg) => {
                assert_eq!(msg, "new row violates row-level security policy")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.cached().await.is_empty());
    }

    #[tokio::test]
    async fn unparseable_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/announcements"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = store(&server, Role::Faculty).list().await.unwrap_err();
        assert!(matches!(err, AnnouncementError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let mut d = draft();
        d.message = "  ".into();
        let err = store(&server, Role::Coordinator).create(d).await.unwrap_err();
        assert!(matches!(err, AnnouncementError::Validation(_)));
    }

    #[tokio::test]
    async fn unreachable_service_fails_fast() {
        let store = RemoteStore::new("http://127.0.0.1:9", Role::Student, Duration::from_secs(2)).unwrap();
        let err = store.list().await.unwrap_err();
        assert!(matches!(err, AnnouncementError::RemoteUnavailable(_)));
    }
}
