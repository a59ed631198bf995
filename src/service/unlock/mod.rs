//! Progressive release of course content.
//!
//! The decision and the countdown message use different clocks on purpose: access is
//! granted on calendar-month boundaries, while the countdown is shown with day precision
//! for day and week policies.

use derive_new::new;
use serde::Serialize;

use crate::model::{now, ContentItem, Member, Timestamp, UnlockType};

pub const NO_SUBSCRIPTION_MESSAGE: &str = "Requiere una suscripción activa";

/// Whether `member` can open `content` right now.
pub fn is_unlocked(content: &ContentItem, member: &Member) -> bool {
    is_unlocked_at(content, member, now())
}

pub fn is_unlocked_at(content: &ContentItem, member: &Member, now: Timestamp) -> bool {
    if member.is_staff() || content.is_always_open() {
        return true;
    }

    let Some(subscription) = member.active_subscription() else {
        return false;
    };

    let months = subscription.started_at.calendar_months_until(now);
    months >= threshold_months(content.unlock_type, content.unlock_value)
}

/// The policy expressed in calendar months, floored.
pub fn threshold_months(unlock_type: UnlockType, unlock_value: u32) -> i64 {
    let value = i64::from(unlock_value);
    match unlock_type {
        UnlockType::Immediate => 0,
        UnlockType::Day => value / 30,
        UnlockType::Week => value / 4,
        UnlockType::Month => value,
        UnlockType::Year => value * 12,
    }
}

/// Countdown shown on a locked item, `None` when the item is open.
pub fn unlock_message(content: &ContentItem, member: &Member) -> Option<String> {
    unlock_message_at(content, member, now())
}

pub fn unlock_message_at(content: &ContentItem, member: &Member, now: Timestamp) -> Option<String> {
    if is_unlocked_at(content, member, now) {
        return None;
    }

    let Some(subscription) = member.active_subscription() else {
        return Some(NO_SUBSCRIPTION_MESSAGE.to_string());
    };

    let start = subscription.started_at;
    let value = i64::from(content.unlock_value);

    let (remaining, unit) = match content.unlock_type {
        UnlockType::Day => (value - start.days_until(now), Unit::Day),
        UnlockType::Week => (value - start.days_until(now) / 7, Unit::Week),
        UnlockType::Month => (value - start.calendar_months_until(now), Unit::Month),
        UnlockType::Year => (value - start.calendar_months_until(now) / 12, Unit::Year),
        UnlockType::Immediate => return None,
    };

    // the calendar-month decision can lag behind the day countdown
    let remaining = remaining.max(1);

    Some(format!("Se desbloquea en {remaining} {}", unit.label(remaining)))
}

#[derive(Debug, Clone, Copy)]
enum Unit {
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    fn label(self, count: i64) -> &'static str {
        let singular = count == 1;
        match self {
            Unit::Day if singular => "día",
            Unit::Day => "días",
            Unit::Week if singular => "semana",
            Unit::Week => "semanas",
            Unit::Month if singular => "mes",
            Unit::Month => "meses",
            Unit::Year if singular => "año",
            Unit::Year => "años",
        }
    }
}

/// A content item together with its lock state for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, new)]
pub struct GatedContent {
    pub content: ContentItem,
    pub unlocked: bool,
    pub message: Option<String>,
}

/// Sorts `contents` for display and evaluates every item against `member`.
pub fn annotate(
    contents: impl IntoIterator<Item = ContentItem>, member: &Member, now: Timestamp,
) -> Vec<GatedContent> {
    let mut contents: Vec<ContentItem> = contents.into_iter().collect();
    contents.sort_by_key(|content| content.sort_order);

    contents
        .into_iter()
        .map(|content| {
            let unlocked = is_unlocked_at(&content, member, now);
            let message = unlock_message_at(&content, member, now);
            GatedContent::new(content, unlocked, message)
        })
        .collect()
}
