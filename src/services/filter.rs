use crate::models::announcement::Announcement;
use crate::models::role::Role;

/// Audience selector chosen in a feed ("all" or a recipient tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudienceFilter {
    /// Everything addressed to the viewer or to everyone.
    All,
    /// Only announcements addressed to everyone.
    Everyone,
    /// Only announcements addressed to this role.
    Role(Role),
    /// A tag outside the role set. Matches nothing.
    Unrecognized(String),
}

impl AudienceFilter {
    pub fn parse(raw: &str) -> Self {
        let tag = raw.trim().to_lowercase();
        match tag.as_str() {
            "all" | "" => AudienceFilter::All,
            "everyone" => AudienceFilter::Everyone,
            _ => match tag.parse::<Role>() {
                Ok(role) => AudienceFilter::Role(role),
                Err(_) => {
                    tracing::debug!("Unrecognized audience filter {tag:?}");
                    AudienceFilter::Unrecognized(tag)
                }
            },
        }
    }

    /// The tag this filter was parsed from, as sent in a `filter` query.
    pub fn as_tag(&self) -> &str {
        match self {
            AudienceFilter::All => "all",
            AudienceFilter::Everyone => "everyone",
            AudienceFilter::Role(role) => role.as_str(),
            AudienceFilter::Unrecognized(tag) => tag,
        }
    }
}

/// Whether `viewer` sees `announcement` under `filter`.
///
/// Senders always see their own announcements. An empty recipient set
/// stands for the single tag "everyone".
pub fn is_visible(announcement: &Announcement, viewer: Role, filter: &AudienceFilter) -> bool {
    if announcement.sender_role == viewer {
        return true;
    }
    let recipients = &announcement.recipients;
    match filter {
        AudienceFilter::All => recipients.is_everyone() || recipients.contains(viewer),
        AudienceFilter::Everyone => recipients.is_everyone(),
        AudienceFilter::Role(role) => recipients.contains(*role),
        AudienceFilter::Unrecognized(_) => false,
    }
}

/// The subset of `announcements` visible to `viewer`, in canonical order.
pub fn visible<'a>(
    announcements: &'a [Announcement],
    viewer: Role,
    filter: &AudienceFilter,
) -> Vec<&'a Announcement> {
    announcements
        .iter()
        .filter(|a| is_visible(a, viewer, filter))
        .collect()
}
