// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The per-session record: one per WSP session carrying push traffic.

use crate::{addr::AddrTuple, engine::push_machine::PushMachine, ota::events::Capabilities};

/// One WSP session in service of push, owning the push machines bound to
/// it.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    /// Assigned by WSP via `Connect.ind`; `None` until bound.
    pub session_id: Option<u32>,
    pub addr_tuple: AddrTuple,
    /// The PI-form identifier used to look the session up before
    /// `session_id` is known.
    pub pi_client_address: String,
    pub assumed_capabilities: Option<Capabilities>,
    pub client_capabilities: Capabilities,
    pub preferconfirmed: bool,
    pub push_machines: Vec<PushMachine>,
}

impl SessionMachine {
    pub fn new(pi_client_address: impl Into<String>, addr_tuple: AddrTuple) -> Self {
        Self {
            session_id: None,
            addr_tuple,
            pi_client_address: pi_client_address.into(),
            assumed_capabilities: None,
            client_capabilities: Capabilities::default(),
            preferconfirmed: false,
            push_machines: Vec::new(),
        }
    }

    /// A session with no pushes and no bound WSP session is eligible for
    /// garbage collection.
    pub fn is_collectable(&self) -> bool {
        self.push_machines.is_empty() && self.session_id.is_none()
    }

    pub fn find_push(&self, pi_push_id: &str) -> Option<&PushMachine> {
        self.push_machines.iter().find(|p| p.pi_push_id == pi_push_id)
    }

    pub fn find_push_mut(&mut self, pi_push_id: &str) -> Option<&mut PushMachine> {
        self.push_machines.iter_mut().find(|p| p.pi_push_id == pi_push_id)
    }

    pub fn take_push(&mut self, pi_push_id: &str) -> Option<PushMachine> {
        let idx = self.push_machines.iter().position(|p| p.pi_push_id == pi_push_id)?;
        Some(self.push_machines.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_with_no_pushes_is_collectable() {
        let sm = SessionMachine::new("client-1", AddrTuple::new("1.2.3.4", 2948, "0.0.0.0", 9200));
        assert!(sm.is_collectable());
    }

    #[test]
    fn session_bound_to_wsp_is_not_collectable_even_if_empty() {
        let mut sm = SessionMachine::new("client-1", AddrTuple::new("1.2.3.4", 2948, "0.0.0.0", 9200));
        sm.session_id = Some(7);
        assert!(!sm.is_collectable());
    }
}
