// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Session and push machine tables, plus the two identifier dictionaries
//! shared between the PI-intake and OTA-in tasks.
//!
//! Only the OTA-in task is meant to mutate these tables (see the
//! concurrency model in SPEC_FULL.md §5); `dashmap::DashMap` is used for
//! the same reason the originating client pool uses it — interior
//! mutability without a task-wide lock — not because multiple tasks are
//! expected to race on writes here.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::engine::{push_machine::PushMachine, session_machine::SessionMachine};

/// Registry of all live session and push machines.
pub struct Registry {
    /// Keyed by `pi_client_address` (stable before a WSP `session_id` is
    /// assigned).
    sessions: DashMap<String, SessionMachine>,
    /// Secondary index: WSP `session_id` -> `pi_client_address`.
    sessions_by_id: DashMap<u32, String>,
    /// Connectionless pushes, keyed by `pi_push_id`.
    unit_pushes: DashMap<String, PushMachine>,
    /// `pi_push_id -> origin URL` (used for `ppg_notify_requested_to`).
    push_origin_urls: DashMap<String, String>,
    next_push_id: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            sessions_by_id: DashMap::new(),
            unit_pushes: DashMap::new(),
            push_origin_urls: DashMap::new(),
            next_push_id: AtomicU64::new(1),
        }
    }

    pub fn next_push_id(&self) -> u64 {
        self.next_push_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Whether `pi_push_id` already names a live push anywhere in the
    /// registry (session-owned or connectionless).
    pub fn has_push_id(&self, pi_push_id: &str) -> bool {
        if self.unit_pushes.contains_key(pi_push_id) {
            return true;
        }
        self.sessions
            .iter()
            .any(|s| s.value().find_push(pi_push_id).is_some())
    }

    pub fn session_by_client(&self, pi_client_address: &str) -> Option<SessionMachine> {
        self.sessions.get(pi_client_address).map(|s| s.value().clone())
    }

    /// Finds the `pi_client_address` of an unbound session matching
    /// `addr_tuple`. Used to correlate a `Pom_Connect_Ind` (identified only
    /// by `addr_tuple` until a `session_id` is assigned) back to the
    /// session that requested it via `Pom_SessionRequest_Req`.
    pub fn client_for_unbound_addr_tuple(
        &self,
        addr_tuple: &crate::addr::AddrTuple,
    ) -> Option<String> {
        self.sessions
            .iter()
            .find(|s| s.value().session_id.is_none() && &s.value().addr_tuple == addr_tuple)
            .map(|s| s.key().clone())
    }

    pub fn with_session_mut<R>(
        &self,
        pi_client_address: &str,
        f: impl FnOnce(&mut SessionMachine) -> R,
    ) -> Option<R> {
        self.sessions.get_mut(pi_client_address).map(|mut s| f(&mut s))
    }

    pub fn insert_session(&self, session: SessionMachine) {
        self.sessions.insert(session.pi_client_address.clone(), session);
    }

    pub fn remove_session(&self, pi_client_address: &str) -> Option<SessionMachine> {
        let removed = self.sessions.remove(pi_client_address).map(|(_, s)| s);
        if let Some(ref s) = removed
            && let Some(id) = s.session_id
        {
            self.sessions_by_id.remove(&id);
        }
        removed
    }

    pub fn bind_session_id(&self, pi_client_address: &str, session_id: u32) {
        self.sessions_by_id
            .insert(session_id, pi_client_address.to_string());
        self.with_session_mut(pi_client_address, |s| s.session_id = Some(session_id));
    }

    pub fn client_for_session_id(&self, session_id: u32) -> Option<String> {
        self.sessions_by_id.get(&session_id).map(|v| v.clone())
    }

    pub fn insert_unit_push(&self, push: PushMachine) {
        self.unit_pushes.insert(push.pi_push_id.clone(), push);
    }

    pub fn take_unit_push(&self, pi_push_id: &str) -> Option<PushMachine> {
        self.unit_pushes.remove(pi_push_id).map(|(_, p)| p)
    }

    pub fn with_unit_push_mut<R>(
        &self,
        pi_push_id: &str,
        f: impl FnOnce(&mut PushMachine) -> R,
    ) -> Option<R> {
        self.unit_pushes.get_mut(pi_push_id).map(|mut p| f(&mut p))
    }

    pub fn set_origin_url(&self, pi_push_id: &str, url: impl Into<String>) {
        self.push_origin_urls.insert(pi_push_id.to_string(), url.into());
    }

    pub fn take_origin_url(&self, pi_push_id: &str) -> Option<String> {
        self.push_origin_urls.remove(pi_push_id).map(|(_, url)| url)
    }

    /// Session garbage collection: drops any session with no owned pushes
    /// and no bound WSP session.
    pub fn collect_garbage(&self) {
        self.sessions.retain(|_, s| !s.is_collectable());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{addr::AddrTuple, engine::push_machine::PushMachine};

    #[test]
    fn duplicate_detection_spans_unit_and_session_pushes() {
        let reg = Registry::new();
        reg.insert_unit_push(PushMachine::new("p1", reg.next_push_id()));
        assert!(reg.has_push_id("p1"));
        assert!(!reg.has_push_id("p2"));

        let mut sm = SessionMachine::new("client-1", AddrTuple::new("1.1.1.1", 2948, "0.0.0.0", 9200));
        sm.push_machines.push(PushMachine::new("p3", reg.next_push_id()));
        reg.insert_session(sm);
        assert!(reg.has_push_id("p3"));
    }

    #[test]
    fn session_id_index_resolves_back_to_client() {
        let reg = Registry::new();
        let sm = SessionMachine::new("client-1", AddrTuple::new("1.1.1.1", 2948, "0.0.0.0", 9200));
        reg.insert_session(sm);
        reg.bind_session_id("client-1", 42);
        assert_eq!(reg.client_for_session_id(42), Some("client-1".to_string()));
    }

    #[test]
    fn empty_unbound_session_is_collected() {
        let reg = Registry::new();
        reg.insert_session(SessionMachine::new(
            "client-1",
            AddrTuple::new("1.1.1.1", 2948, "0.0.0.0", 9200),
        ));
        reg.collect_garbage();
        assert!(reg.session_by_client("client-1").is_none());
    }
}
