// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synchronisation point bookkeeping.
//!
//! RTI callbacks record registration results, announcements and
//! synchronisation; the application thread polls the records and marks
//! points achieved. A label may be reused once synchronised: a fresh
//! announcement starts a new record.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Outcome of a registration issued by this federate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Requested,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Default)]
struct SyncPointRecord {
    registration: Option<Registration>,
    /// Announcement sequence number, in callback arrival order.
    announced: Option<u64>,
    tag: Vec<u8>,
    achieved: bool,
    synchronized: bool,
}

#[derive(Default)]
struct Inner {
    points: HashMap<String, SyncPointRecord>,
    next_announce: u64,
}

/// Per-federate synchronisation point table.
#[derive(Default)]
pub struct SyncPointManager {
    inner: Mutex<Inner>,
}

impl SyncPointManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Callback side
    // ------------------------------------------------------------------

    pub fn on_registration_succeeded(&self, label: &str) {
        log::debug!("[sync] registered '{}'", label);
        let mut inner = self.inner.lock();
        inner.points.entry(label.to_string()).or_default().registration =
            Some(Registration::Succeeded);
    }

    pub fn on_registration_failed(&self, label: &str, reason: &str) {
        log::warn!("[sync] registration of '{}' failed: {}", label, reason);
        let mut inner = self.inner.lock();
        inner.points.entry(label.to_string()).or_default().registration =
            Some(Registration::Failed(reason.to_string()));
    }

    pub fn on_announced(&self, label: &str, tag: &[u8]) {
        log::debug!("[sync] announced '{}'", label);
        let mut inner = self.inner.lock();
        inner.next_announce += 1;
        let seq = inner.next_announce;
        let record = inner.points.entry(label.to_string()).or_default();
        if record.synchronized {
            // Reused label: keep our registration outcome, reset the rest.
            let registration = record.registration.take();
            *record = SyncPointRecord {
                registration,
                ..SyncPointRecord::default()
            };
        }
        record.announced = Some(seq);
        record.tag = tag.to_vec();
    }

    pub fn on_synchronized(&self, label: &str) {
        log::debug!("[sync] federation synchronized on '{}'", label);
        let mut inner = self.inner.lock();
        inner.points.entry(label.to_string()).or_default().synchronized = true;
    }

    // ------------------------------------------------------------------
    // Application side
    // ------------------------------------------------------------------

    /// Record that this federate is registering `label`.
    pub fn mark_registration_requested(&self, label: &str) {
        let mut inner = self.inner.lock();
        let record = inner.points.entry(label.to_string()).or_default();
        if record.synchronized {
            *record = SyncPointRecord::default();
        }
        record.registration = Some(Registration::Requested);
    }

    pub fn registration(&self, label: &str) -> Option<Registration> {
        self.inner
            .lock()
            .points
            .get(label)
            .and_then(|r| r.registration.clone())
    }

    pub fn is_announced(&self, label: &str) -> bool {
        self.announce_order(label).is_some()
    }

    /// Sequence number of the announcement, `None` if never announced.
    pub fn announce_order(&self, label: &str) -> Option<u64> {
        self.inner.lock().points.get(label).and_then(|r| r.announced)
    }

    pub fn tag(&self, label: &str) -> Option<Vec<u8>> {
        self.inner.lock().points.get(label).map(|r| r.tag.clone())
    }

    pub fn is_achieved(&self, label: &str) -> bool {
        self.inner
            .lock()
            .points
            .get(label)
            .is_some_and(|r| r.achieved)
    }

    pub fn mark_achieved(&self, label: &str) {
        let mut inner = self.inner.lock();
        inner.points.entry(label.to_string()).or_default().achieved = true;
    }

    pub fn is_synchronized(&self, label: &str) -> bool {
        self.inner
            .lock()
            .points
            .get(label)
            .is_some_and(|r| r.synchronized)
    }

    /// Labels announced but not yet achieved by this federate, in
    /// announcement order.
    pub fn pending_announced(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut pending: Vec<(u64, String)> = inner
            .points
            .iter()
            .filter(|(_, r)| !r.achieved && !r.synchronized)
            .filter_map(|(label, r)| r.announced.map(|seq| (seq, label.clone())))
            .collect();
        pending.sort_unstable();
        pending.into_iter().map(|(_, label)| label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let sp = SyncPointManager::new();
        sp.mark_registration_requested("a");
        assert_eq!(sp.registration("a"), Some(Registration::Requested));
        sp.on_registration_succeeded("a");
        sp.on_announced("a", b"t");
        assert!(sp.is_announced("a"));
        assert_eq!(sp.tag("a"), Some(b"t".to_vec()));
        assert_eq!(sp.pending_announced(), vec!["a".to_string()]);

        sp.mark_achieved("a");
        assert!(sp.pending_announced().is_empty());
        sp.on_synchronized("a");
        assert!(sp.is_synchronized("a"));
    }

    #[test]
    fn test_announcement_order() {
        let sp = SyncPointManager::new();
        sp.on_announced("initialization_completed", b"");
        sp.on_announced("initialization_started", b"");
        let completed = sp.announce_order("initialization_completed");
        let started = sp.announce_order("initialization_started");
        assert!(completed < started);
        assert_eq!(sp.announce_order("missing"), None);
    }

    #[test]
    fn test_reused_label_resets() {
        let sp = SyncPointManager::new();
        sp.on_announced("mtr_freeze", b"");
        sp.mark_achieved("mtr_freeze");
        sp.on_synchronized("mtr_freeze");

        sp.on_announced("mtr_freeze", b"");
        assert!(!sp.is_achieved("mtr_freeze"));
        assert!(!sp.is_synchronized("mtr_freeze"));
        assert_eq!(sp.pending_announced(), vec!["mtr_freeze".to_string()]);
    }

    #[test]
    fn test_failed_registration_recorded() {
        let sp = SyncPointManager::new();
        sp.mark_registration_requested("dup");
        sp.on_registration_failed("dup", "label not unique");
        assert_eq!(
            sp.registration("dup"),
            Some(Registration::Failed("label not unique".into()))
        );
    }
}
