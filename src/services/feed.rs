use uuid::Uuid;

use crate::models::announcement::Announcement;
use crate::models::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Unread,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandState {
    Collapsed,
    Expanded,
}

#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub announcement: Announcement,
    pub read: ReadState,
    pub expanded: ExpandState,
}

impl FeedEntry {
    pub fn is_unread(&self) -> bool {
        self.read == ReadState::Unread
    }
}

/// Result of an interaction with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    /// True when this interaction moved the entry from unread to read.
    pub newly_read: bool,
    pub expanded: ExpandState,
}

/// View state of a viewer's announcement feed.
///
/// Read state only ever moves from unread to read. Expand state toggles
/// freely and starts collapsed. The only change made to the announcements
/// themselves is adding the viewer to `read_by`.
pub struct Feed {
    viewer: Role,
    entries: Vec<FeedEntry>,
}

impl Feed {
    pub fn new<I>(visible: I, viewer: Role) -> Self
    where
        I: IntoIterator<Item = Announcement>,
    {
        let entries = visible
            .into_iter()
            .map(|announcement| {
                let read = if announcement.read_by.contains(&viewer) {
                    ReadState::Read
                } else {
                    ReadState::Unread
                };
                FeedEntry {
                    announcement,
                    read,
                    expanded: ExpandState::Collapsed,
                }
            })
            .collect();
        Self { viewer, entries }
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn get(&self, id: Uuid) -> Option<&FeedEntry> {
        self.entries.iter().find(|e| e.announcement.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_unread()).count()
    }

    pub fn important_unread(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries
            .iter()
            .filter(|e| e.announcement.important && e.is_unread())
    }

    /// Marks the entry read without touching its expand state.
    pub fn mark_read(&mut self, id: Uuid) -> Option<Interaction> {
        let viewer = self.viewer;
        let entry = self.entry_mut(id)?;
        let newly_read = mark(entry, viewer);
        Some(Interaction {
            newly_read,
            expanded: entry.expanded,
        })
    }

    /// Expands the entry and marks it read.
    pub fn open(&mut self, id: Uuid) -> Option<Interaction> {
        let viewer = self.viewer;
        let entry = self.entry_mut(id)?;
        entry.expanded = ExpandState::Expanded;
        let newly_read = mark(entry, viewer);
        Some(Interaction {
            newly_read,
            expanded: entry.expanded,
        })
    }

    /// Flips the expand state; any interaction also marks the entry read.
    pub fn toggle(&mut self, id: Uuid) -> Option<Interaction> {
        let viewer = self.viewer;
        let entry = self.entry_mut(id)?;
        entry.expanded = match entry.expanded {
            ExpandState::Collapsed => ExpandState::Expanded,
            ExpandState::Expanded => ExpandState::Collapsed,
        };
        let newly_read = mark(entry, viewer);
        Some(Interaction {
            newly_read,
            expanded: entry.expanded,
        })
    }

    /// Plain-text rendering, one block per entry.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            render_entry(entry, &mut out);
        }
        out
    }

    pub fn render_one(&self, id: Uuid) -> Option<String> {
        let mut out = String::new();
        render_entry(self.get(id)?, &mut out);
        Some(out)
    }

    fn entry_mut(&mut self, id: Uuid) -> Option<&mut FeedEntry> {
        self.entries.iter_mut().find(|e| e.announcement.id == id)
    }
}

fn render_entry(entry: &FeedEntry, out: &mut String) {
    let a = &entry.announcement;
    let marker = if entry.is_unread() { "*" } else { " " };
    let flag = if a.important { " [!]" } else { "" };
    out.push_str(&format!(
        "{marker} {}{flag}  {} ({}) {}\n",
        a.title,
        a.sender_name,
        a.sender_role,
        a.created_at.format("%Y-%m-%d %H:%M"),
    ));
    out.push_str(&format!("    id: {}\n", a.id));
    if entry.expanded == ExpandState::Expanded {
        for line in a.message.lines() {
            out.push_str(&format!("    {line}\n"));
        }
        if let Some(attachment) = &a.attachment {
            out.push_str(&format!("    attachment: {attachment}\n"));
        }
    }
}

fn mark(entry: &mut FeedEntry, viewer: Role) -> bool {
    if entry.read == ReadState::Read {
        return false;
    }
    entry.read = ReadState::Read;
    entry.announcement.read_by.insert(viewer);
    true
}
