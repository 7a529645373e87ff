use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::AnnouncementError,
    models::{
        announcement::{Announcement, CreateAnnouncementRequest, CreatedAnnouncement, Envelope},
        role::Role,
    },
    services::{filter::AudienceFilter, metrics},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub role: Option<String>,
    pub filter: Option<String>,
}

/// GET /announcements?role=<role>[&filter=<tag>] returns what that role may see.
pub async fn list_announcements(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Vec<Announcement>>>, AnnouncementError> {
    let raw_role = query
        .role
        .ok_or_else(|| AnnouncementError::validation("Missing role parameter"))?;
    let viewer: Role = raw_role
        .parse()
        .map_err(|_| AnnouncementError::validation(format!("Unknown role: {raw_role}")))?;
    let audience = AudienceFilter::parse(query.filter.as_deref().unwrap_or("all"));

    let data = state.store.list_visible(viewer, &audience).await?;
    metrics::record_list(viewer);

    Ok(Json(Envelope { data }))
}

/// POST /announcements creates an announcement. An empty `recipientRoles`
/// addresses everyone.
pub async fn create_announcement(
    State(state): State<AppState>,
    body: Result<Json<CreateAnnouncementRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<CreatedAnnouncement>>), AnnouncementError> {
    let Json(body) = body.map_err(|e| AnnouncementError::validation(e.body_text()))?;

    let result = match body.into_draft() {
        Ok(draft) => state.store.create(draft).await,
        Err(e) => Err(e),
    };
    let announcement = result.inspect_err(|e| {
        metrics::record_failure(e);
        tracing::warn!(kind = e.kind(), "Announcement rejected: {e}");
    })?;

    metrics::record_created(announcement.sender_role);
    tracing::info!(
        id = %announcement.id,
        sender_role = %announcement.sender_role,
        store = state.store.backend(),
        "Announcement created"
    );

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            data: CreatedAnnouncement::from(&announcement),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{routes, store::MemoryStore};

    fn app() -> axum::Router {
        routes::router(AppState {
            store: Arc::new(MemoryStore::new()),
        })
    }

    async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(body: Value) -> Request<Body> {
        Request::post("/announcements")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn created_announcement_reaches_only_its_recipients() {
        let app = app();
        let (status, body) = send(
            &app,
            post(json!({
                "title": "Exam Schedule",
                "message": "Finals start Monday",
                "senderId": "c-42",
                "senderRole": "Coordinator",
                "senderName": "Exams Office",
                "recipientRoles": ["student"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["sender_role"], "coordinator");
        assert_eq!(body["data"]["title"], "Exam Schedule");

        let (status, body) = send(&app, get("/announcements?role=student")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["senderName"], "Exams Office");

        let (_, body) = send(&app, get("/announcements?role=faculty")).await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let (_, body) = send(&app, get("/announcements?role=coordinator&filter=faculty")).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_recipients_address_everyone() {
        let app = app();
        let (status, _) = send(
            &app,
            post(json!({
                "title": "Campus closed",
                "message": "Snow day",
                "senderId": "a-1",
                "senderRole": "admin",
                "recipientRoles": []
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        for role in Role::ALL {
            let (_, body) = send(&app, get(&format!("/announcements?role={role}"))).await;
            assert_eq!(body["data"].as_array().unwrap().len(), 1, "{role}");
            assert_eq!(body["data"][0]["senderName"], "Anonymous");
        }
    }

    #[tokio::test]
    async fn invalid_requests_return_error_body() {
        let app = app();

        let (status, body) = send(
            &app,
            post(json!({ "title": "", "message": "m", "senderRole": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Title is required");

        let (status, body) = send(
            &app,
            post(json!({ "title": "t", "message": "m", "senderRole": "registrar" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("registrar"));

        let (status, _) = send(
            &app,
            Request::post("/announcements")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, get("/announcements")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing role parameter");

        let (_, body) = send(&app, get("/announcements?role=admin")).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }
}
