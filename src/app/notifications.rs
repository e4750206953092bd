use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::domain::notification::Notification;

/// Where local state stands relative to the server.
///
/// Mutations are applied locally before the request goes out; the next
/// successful fetch is authoritative and returns the store to `Synced`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Synced,
    Pending,
    Confirmed,
    Diverged,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    /// Unread notifications not seen before this fetch, newest first.
    pub fresh: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub sync: SyncStatus,
}

/// Per-session notification list for one user.
#[derive(Debug)]
pub struct NotificationStore {
    user_id: i64,
    items: Vec<Notification>,
    unread_count: usize,
    seen: HashSet<i64>,
    dismissed: HashSet<i64>,
    pending_reads: HashSet<i64>,
    /// Confirmed reads, keyed to the last fetch issued when they settled.
    settled_reads: HashMap<i64, u64>,
    in_flight: usize,
    sync: SyncStatus,
    issued_seq: u64,
    applied_seq: u64,
}

impl NotificationStore {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            unread_count: 0,
            seen: HashSet::new(),
            dismissed: HashSet::new(),
            pending_reads: HashSet::new(),
            settled_reads: HashMap::new(),
            in_flight: 0,
            sync: SyncStatus::Synced,
            issued_seq: 0,
            applied_seq: 0,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        NotificationSnapshot {
            notifications: self.items.clone(),
            unread_count: self.unread_count,
            sync: self.sync,
        }
    }

    /// Reserve a sequence number for a fetch about to be issued.
    pub fn begin_fetch(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// Merge a server response. Returns `None` when a newer response has
    /// already been applied.
    pub fn apply_fetch(&mut self, seq: u64, server: Vec<Notification>) -> Option<FetchOutcome> {
        if seq <= self.applied_seq {
            tracing::debug!(
                seq,
                applied = self.applied_seq,
                user_id = self.user_id,
                "discarding stale notification response"
            );
            return None;
        }
        self.applied_seq = seq;

        let mut ids = HashSet::with_capacity(server.len());
        let mut merged: Vec<Notification> = server
            .into_iter()
            .filter(|n| n.user_id == self.user_id)
            .filter(|n| !self.dismissed.contains(&n.id))
            .filter(|n| ids.insert(n.id))
            .collect();

        // a fetch issued before a read settled may still carry it as unread
        for notification in merged.iter_mut() {
            let settled_later = self
                .settled_reads
                .get(&notification.id)
                .is_some_and(|epoch| seq <= *epoch);
            if settled_later || self.pending_reads.contains(&notification.id) {
                notification.is_read = true;
            }
        }
        self.settled_reads.retain(|_, epoch| *epoch >= seq);
        merged.sort_by(Notification::newest_first);

        let fresh: Vec<Notification> = merged
            .iter()
            .filter(|n| !n.is_read && !self.seen.contains(&n.id))
            .cloned()
            .collect();
        self.seen.extend(merged.iter().map(|n| n.id));

        self.items = merged;
        self.recount();
        if self.in_flight == 0 {
            self.sync = SyncStatus::Synced;
        }

        Some(FetchOutcome {
            notifications: self.items.clone(),
            unread_count: self.unread_count,
            fresh,
        })
    }

    /// Add a notification pushed by the host. Known, dismissed or foreign
    /// notifications are ignored.
    pub fn insert(&mut self, notification: Notification) -> bool {
        if notification.user_id != self.user_id
            || self.seen.contains(&notification.id)
            || self.dismissed.contains(&notification.id)
        {
            return false;
        }
        self.seen.insert(notification.id);
        self.items.push(notification);
        self.items.sort_by(Notification::newest_first);
        self.recount();
        true
    }

    /// Optimistically flag one notification read. Returns false when there is
    /// nothing to change.
    pub fn mark_read_local(&mut self, id: i64) -> bool {
        let Some(notification) = self.items.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if notification.is_read {
            return false;
        }
        notification.is_read = true;
        self.pending_reads.insert(id);
        self.begin_mutation();
        self.recount();
        true
    }

    /// Optimistically flag everything read; returns the ids that changed.
    pub fn mark_all_read_local(&mut self) -> Vec<i64> {
        let mut changed = Vec::new();
        for notification in self.items.iter_mut().filter(|n| !n.is_read) {
            notification.is_read = true;
            changed.push(notification.id);
        }
        self.pending_reads.extend(changed.iter().copied());
        self.begin_mutation();
        self.recount();
        changed
    }

    /// Record how the server answered a read mutation.
    pub fn finish_mutation(&mut self, ids: &[i64], confirmed: bool) -> SyncStatus {
        for id in ids {
            self.pending_reads.remove(id);
            if confirmed {
                self.settled_reads.insert(*id, self.issued_seq);
            }
        }
        self.in_flight = self.in_flight.saturating_sub(1);
        if !confirmed {
            self.sync = SyncStatus::Diverged;
        } else if self.in_flight == 0 && self.sync != SyncStatus::Diverged {
            self.sync = SyncStatus::Confirmed;
        }
        self.sync
    }

    /// Local-only removal; the server record is untouched.
    pub fn dismiss(&mut self, id: i64) -> bool {
        self.dismissed.insert(id);
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.recount();
        self.items.len() != before
    }

    fn begin_mutation(&mut self) {
        self.in_flight += 1;
        self.sync = SyncStatus::Pending;
    }

    fn recount(&mut self) {
        self.unread_count = self.items.iter().filter(|n| !n.is_read).count();
    }
}
