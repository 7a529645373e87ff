use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::role::Role;
use crate::error::{AnnouncementError, Result};

pub const DEFAULT_SENDER_NAME: &str = "Anonymous";

/// Tags that address every role rather than a specific one.
const EVERYONE_TAGS: [&str; 2] = ["everyone", "all"];

fn default_sender_name() -> String {
    DEFAULT_SENDER_NAME.to_string()
}

fn is_everyone_tag(tag: &str) -> bool {
    EVERYONE_TAGS.contains(&tag)
}

/// Roles targeted by an announcement. Empty means everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientSet(BTreeSet<Role>);

impl RecipientSet {
    pub fn everyone() -> Self {
        Self::default()
    }

    pub fn is_everyone(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Parses tags supplied by a sender. Unknown tags are an error.
    pub fn parse_strict<S: AsRef<str>>(tags: &[S]) -> Result<Self> {
        let mut roles = BTreeSet::new();
        let mut unknown = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim().to_lowercase();
            if is_everyone_tag(&tag) {
                continue;
            }
            match tag.parse::<Role>() {
                Ok(role) => {
                    roles.insert(role);
                }
                Err(_) => unknown.push(tag),
            }
        }
        if !unknown.is_empty() {
            return Err(AnnouncementError::validation(format!(
                "Unknown recipient role(s): {}",
                unknown.join(", ")
            )));
        }
        Ok(Self(roles))
    }

    /// Parses tags read back from storage. Unknown tags are dropped with a
    /// warning, but a record whose tags are all unknown is an error: it must
    /// not widen into an announcement for everyone.
    pub fn parse_lenient<S: AsRef<str>>(tags: &[S]) -> Result<Self> {
        let mut roles = BTreeSet::new();
        let mut addressed_everyone = tags.is_empty();
        let mut unknown = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim().to_lowercase();
            if is_everyone_tag(&tag) {
                addressed_everyone = true;
                continue;
            }
            match tag.parse::<Role>() {
                Ok(role) => {
                    roles.insert(role);
                }
                Err(_) => {
                    tracing::warn!("Ignoring unknown recipient tag {tag:?}");
                    unknown.push(tag);
                }
            }
        }
        if roles.is_empty() && !addressed_everyone {
            return Err(AnnouncementError::MalformedResponse(format!(
                "no known recipient role in [{}]",
                unknown.join(", ")
            )));
        }
        Ok(Self(roles))
    }

    pub fn to_tags(&self) -> Vec<String> {
        self.iter().map(String::from).collect()
    }
}

impl FromIterator<Role> for RecipientSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for RecipientSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for RecipientSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tags = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
        Self::parse_lenient(tags.as_slice()).map_err(serde::de::Error::custom)
    }
}

/// Canonical announcement record. Immutable after creation except `read_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub sender_id: String,
    pub sender_role: Role,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default)]
    pub recipients: RecipientSet,
    #[serde(default)]
    pub important: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Viewer-local read marks, not synchronized between devices.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub read_by: BTreeSet<Role>,
}

/// An announcement waiting for a store to accept it.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub title: String,
    pub message: String,
    pub sender_id: String,
    pub sender_role: Role,
    pub sender_name: String,
    pub recipients: RecipientSet,
    pub attachment: Option<String>,
    pub important: bool,
    /// When set, an empty recipient set is rejected instead of meaning everyone.
    pub require_recipients: bool,
}

impl Draft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AnnouncementError::validation("Title is required"));
        }
        if self.message.trim().is_empty() {
            return Err(AnnouncementError::validation("Message is required"));
        }
        if self.require_recipients && self.recipients.is_everyone() {
            return Err(AnnouncementError::validation(
                "Select at least one recipient role",
            ));
        }
        Ok(())
    }

    /// Builds the stored record. Callers validate first.
    pub fn into_announcement(self, id: Uuid, created_at: DateTime<Utc>) -> Announcement {
        let sender_name = match self.sender_name.trim() {
            "" => default_sender_name(),
            name => name.to_string(),
        };
        Announcement {
            id,
            title: self.title.trim().to_string(),
            message: self.message.trim().to_string(),
            sender_id: self.sender_id,
            sender_role: self.sender_role,
            sender_name,
            recipients: self.recipients,
            important: self.important,
            attachment: self.attachment.filter(|a| !a.trim().is_empty()),
            created_at,
            read_by: BTreeSet::new(),
        }
    }
}

// Request/Response DTOs

/// Body of `POST /announcements`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub sender_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub recipient_roles: Vec<String>,
    #[serde(default)]
    pub important: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl CreateAnnouncementRequest {
    /// Normalizes the raw body. An empty `recipientRoles` addresses everyone.
    pub fn into_draft(self) -> Result<Draft> {
        let sender_role = self.sender_role.parse::<Role>().map_err(|_| {
            AnnouncementError::validation(format!("Unknown sender role: {:?}", self.sender_role))
        })?;
        let recipients = RecipientSet::parse_strict(self.recipient_roles.as_slice())?;
        Ok(Draft {
            title: self.title,
            message: self.message,
            sender_id: self.sender_id,
            sender_role,
            sender_name: self.sender_name.unwrap_or_default(),
            recipients,
            attachment: self.attachment,
            important: self.important,
            require_recipients: false,
        })
    }
}

impl From<&Draft> for CreateAnnouncementRequest {
    fn from(draft: &Draft) -> Self {
        Self {
            title: draft.title.clone(),
            message: draft.message.clone(),
            sender_id: draft.sender_id.clone(),
            sender_role: draft.sender_role.to_string(),
            sender_name: Some(draft.sender_name.clone()),
            recipient_roles: draft.recipients.to_tags(),
            important: draft.important,
            attachment: draft.attachment.clone(),
        }
    }
}

/// Payload returned by `POST /announcements` (snake_case on the wire).
#[derive(Debug, Clone, Serialize)]
pub struct CreatedAnnouncement {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: Role,
    pub recipients: RecipientSet,
    pub important: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Announcement> for CreatedAnnouncement {
    fn from(a: &Announcement) -> Self {
        Self {
            id: a.id,
            title: a.title.clone(),
            message: a.message.clone(),
            sender_id: a.sender_id.clone(),
            sender_name: a.sender_name.clone(),
            sender_role: a.sender_role,
            recipients: a.recipients.clone(),
            important: a.important,
            created_at: a.created_at,
        }
    }
}

/// A record as returned by the service, in either field casing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAnnouncement {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(default, alias = "sender_id")]
    pub sender_id: Option<String>,
    #[serde(default, alias = "sender_name")]
    pub sender_name: Option<String>,
    #[serde(alias = "sender_role")]
    pub sender_role: String,
    #[serde(default, alias = "recipient_roles", alias = "recipientRoles")]
    pub recipients: Option<Vec<String>>,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl TryFrom<RemoteAnnouncement> for Announcement {
    type Error = AnnouncementError;

    fn try_from(r: RemoteAnnouncement) -> Result<Self> {
        let sender_role = r.sender_role.parse::<Role>().map_err(|_| {
            AnnouncementError::MalformedResponse(format!("unknown sender role {:?}", r.sender_role))
        })?;
        let recipients = match r.recipients {
            Some(tags) => RecipientSet::parse_lenient(tags.as_slice())?,
            None => RecipientSet::everyone(),
        };
        Ok(Announcement {
            id: r.id,
            title: r.title,
            message: r.message,
            sender_id: r.sender_id.unwrap_or_default(),
            sender_role,
            sender_name: r
                .sender_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(default_sender_name),
            recipients,
            important: r.important,
            attachment: r.attachment,
            created_at: r.created_at,
            read_by: BTreeSet::new(),
        })
    }
}

/// `{ "data": ... }` wrapper used by every successful response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
