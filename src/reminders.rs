//! Revisit-reminder engine.
//!
//! Decides which saved bookmark (if any) should be surfaced as a "you saved
//! this but never went back" prompt. Pure over `(snapshot, now)` except for
//! the action handlers, which write through the store collaborator.

use crate::bookmarks::{Bookmark, BookmarkStore, ReminderStateUpdate, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A bookmark becomes eligible once it is at least this many days old.
pub const REMINDER_INTERVAL_DAYS: i64 = 3;
/// Minimum days between two reminders for the same bookmark.
pub const REMINDER_COOLDOWN_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderAction {
    /// The user opened the bookmark; snooze it for the cooldown period.
    OpenAndSnooze,
    /// Re-enter cooldown without opening.
    CheckLater,
    /// Never remind about this bookmark again.
    DismissPermanently,
}

/// At most one reminder prompt is active per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    Idle,
    Prompting(u64),
    Resolving(u64, ReminderAction),
}

/// Eligibility predicate from the scheduling rules:
/// never dismissed, older than the interval, outside the cooldown window.
///
/// Day arithmetic truncates toward zero, so "3 days minus a second" still
/// counts as 2 days.
pub fn is_eligible(
    bookmark: &Bookmark,
    now: DateTime<Utc>,
    interval_days: i64,
    cooldown_days: i64,
) -> bool {
    if bookmark.reminder_dismissed {
        return false;
    }

    let age_days = (now - bookmark.created_at).num_days();
    if age_days < interval_days {
        return false;
    }

    if let Some(last_reminded) = bookmark.last_reminded_at {
        let since_reminder = (now - last_reminded).num_days();
        if since_reminder < cooldown_days {
            return false;
        }
    }

    true
}

/// All bookmarks currently eligible for a reminder, in no particular order.
/// The presentation layer re-sorts as it sees fit.
pub fn pending<'a>(
    bookmarks: &'a [Bookmark],
    now: DateTime<Utc>,
    interval_days: i64,
    cooldown_days: i64,
) -> Vec<&'a Bookmark> {
    bookmarks
        .iter()
        .filter(|b| is_eligible(b, now, interval_days, cooldown_days))
        .collect()
}

/// The single bookmark to prompt about right now: the oldest eligible one.
/// `min_by_key` keeps the first minimum, so ties resolve to collection order.
pub fn select_due<'a>(
    bookmarks: &'a [Bookmark],
    now: DateTime<Utc>,
    interval_days: i64,
    cooldown_days: i64,
) -> Option<&'a Bookmark> {
    pending(bookmarks, now, interval_days, cooldown_days)
        .into_iter()
        .min_by_key(|b| b.created_at)
}

pub struct ReminderEngine {
    store: Arc<dyn BookmarkStore>,
    interval_days: i64,
    cooldown_days: i64,
    state: PromptState,
}

impl ReminderEngine {
    pub fn new(store: Arc<dyn BookmarkStore>) -> Self {
        Self::with_schedule(store, REMINDER_INTERVAL_DAYS, REMINDER_COOLDOWN_DAYS)
    }

    pub fn with_schedule(
        store: Arc<dyn BookmarkStore>,
        interval_days: i64,
        cooldown_days: i64,
    ) -> Self {
        ReminderEngine {
            store,
            interval_days,
            cooldown_days,
            state: PromptState::Idle,
        }
    }

    pub fn state(&self) -> PromptState {
        self.state
    }

    pub fn interval_days(&self) -> i64 {
        self.interval_days
    }

    pub fn cooldown_days(&self) -> i64 {
        self.cooldown_days
    }

    /// Fresh evaluation pass over a snapshot. Clears any previous prompt
    /// first, then prompts for the oldest eligible bookmark, if any.
    pub fn evaluate(&mut self, bookmarks: &[Bookmark], now: DateTime<Utc>) -> Option<Bookmark> {
        self.state = PromptState::Idle;

        let due = select_due(bookmarks, now, self.interval_days, self.cooldown_days)?;
        log::debug!("prompting reminder for bookmark {} ({})", due.id, due.title);

        self.state = PromptState::Prompting(due.id);
        Some(due.clone())
    }

    /// Bulk listing with the same predicate the prompt uses.
    pub fn pending(&self, bookmarks: &[Bookmark], now: DateTime<Utc>) -> Vec<Bookmark> {
        pending(bookmarks, now, self.interval_days, self.cooldown_days)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Apply one of the three reminder actions to the currently-prompting
    /// bookmark.
    ///
    /// The prompt is cleared whether or not the write succeeds, so a failing
    /// store cannot wedge the session on the same prompt. On failure the
    /// bookmark keeps its old timestamps and may legitimately come back on
    /// the next evaluation pass.
    pub fn resolve(
        &mut self,
        user_id: &str,
        action: ReminderAction,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let id = match self.state {
            PromptState::Prompting(id) => id,
            // No active prompt; repeated or stray actions are a no-op.
            _ => return Ok(()),
        };

        self.state = PromptState::Resolving(id, action);

        let update = match action {
            ReminderAction::OpenAndSnooze | ReminderAction::CheckLater => ReminderStateUpdate {
                last_reminded_at: Some(now),
                reminder_dismissed: None,
            },
            ReminderAction::DismissPermanently => ReminderStateUpdate {
                last_reminded_at: Some(now),
                reminder_dismissed: Some(true),
            },
        };

        let result = self.store.update_reminder_state(id, user_id, update);
        self.state = PromptState::Idle;

        if let Err(ref err) = result {
            log::warn!("failed to persist reminder state for bookmark {id}: {err}");
        }

        result
    }
}
