use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

use crate::error::AnnouncementError;
use crate::models::role::Role;

lazy_static! {
    pub static ref ANNOUNCEMENTS_CREATED_COUNTER: CounterVec = register_counter_vec!(
        "announcements_created_total",
        "Announcements published, by sender role",
        &["sender_role"]
    ).unwrap();

    pub static ref ANNOUNCEMENT_FAILURES_COUNTER: CounterVec = register_counter_vec!(
        "announcement_failures_total",
        "Rejected or failed announcement submissions, by error kind",
        &["kind"]
    ).unwrap();

    pub static ref ANNOUNCEMENT_LISTS_COUNTER: CounterVec = register_counter_vec!(
        "announcement_lists_total",
        "Announcement feed requests, by viewer role",
        &["viewer_role"]
    ).unwrap();
}

pub fn record_created(sender_role: Role) {
    ANNOUNCEMENTS_CREATED_COUNTER
        .with_label_values(&[sender_role.as_str()])
        .inc();
}

pub fn record_failure(err: &AnnouncementError) {
    ANNOUNCEMENT_FAILURES_COUNTER
        .with_label_values(&[err.kind()])
        .inc();
}

pub fn record_list(viewer: Role) {
    ANNOUNCEMENT_LISTS_COUNTER
        .with_label_values(&[viewer.as_str()])
        .inc();
}
