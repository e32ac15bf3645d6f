// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `handle_internal_event`: reactions to indications arriving from the
//! OTA-in task, described in SPEC_FULL.md §4.2.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    engine::{PpgEngine, push_machine::AttributeUpdate},
    ota::events::{PpgEvent, WspIndication},
    pap::codes::{AbortReason, PapCode, ota_abort_to_pap},
};

impl PpgEngine {
    /// Reacts to one indication from WSP. Only the OTA-in task is expected
    /// to call this (see the concurrency model in SPEC_FULL.md §5).
    pub fn handle_internal_event(&self, indication: WspIndication) -> Result<()> {
        match indication {
            WspIndication::PomConnectInd {
                session_id,
                addr_tuple,
                requested_capabilities,
            } => self.on_connect(session_id, addr_tuple, requested_capabilities),
            WspIndication::PomDisconnectInd { session_id } => self.on_disconnect(session_id),
            WspIndication::PoConfirmedPushCnf {
                session_id,
                server_push_id,
            } => self.on_confirmed_push_cnf(session_id, server_push_id),
            WspIndication::PoPushAbortInd {
                session_id,
                push_id,
                reason,
            } => self.on_push_abort_ind(session_id, push_id, reason),
        }
    }

    fn on_connect(
        &self,
        session_id: u32,
        addr_tuple: crate::addr::AddrTuple,
        requested_capabilities: Option<crate::ota::events::Capabilities>,
    ) -> Result<()> {
        let pi_client_address = self
            .registry
            .client_for_session_id(session_id)
            .or_else(|| self.registry.client_for_unbound_addr_tuple(&addr_tuple))
            .unwrap_or_else(|| addr_tuple.to_string());

        if self.registry.session_by_client(&pi_client_address).is_none() {
            self.registry.insert_session(crate::engine::session_machine::SessionMachine::new(
                pi_client_address.clone(),
                addr_tuple,
            ));
        }
        self.registry.bind_session_id(&pi_client_address, session_id);

        if let Some(requested) = requested_capabilities {
            let capable = self
                .registry
                .with_session_mut(&pi_client_address, |s| {
                    s.assumed_capabilities = Some(requested.clone());
                    self.capability_check.check(&requested, &s.client_capabilities)
                })
                .unwrap_or(true);
            if !capable {
                warn!(session_id, "capability mismatch on connect, aborting session");
                self.destroy_session(
                    &pi_client_address,
                    PapCode::CAPABILITIES_MISMATCH.0,
                    PapCode::CAPABILITIES_MISMATCH.describe(),
                );
                return Ok(());
            }
        }

        info!(session_id, %pi_client_address, "session connected");
        self.flush_pending_pushes(&pi_client_address, session_id);
        Ok(())
    }

    fn flush_pending_pushes(&self, pi_client_address: &str, session_id: u32) {
        let pending: Vec<_> = self
            .registry
            .with_session_mut(pi_client_address, |s| s.push_machines.clone())
            .unwrap_or_default();

        for push in pending {
            let (username, password, bearer) = push.sms_credentials();
            if push.delivery_method.is_confirmed_preference() {
                self.ota_tx
                    .send(PpgEvent::PoConfirmedPushReq {
                        session_id,
                        push_id: push.push_id as u32,
                        headers: push.push_headers.clone(),
                        body: push.push_data.clone().into(),
                        authenticated: push.authenticated,
                        trusted: push.trusted,
                        last: true,
                        username,
                        password,
                        bearer,
                    })
                    .ok();
            } else {
                self.ota_tx
                    .send(PpgEvent::PoPushReq {
                        session_id,
                        headers: push.push_headers.clone(),
                        body: push.push_data.clone().into(),
                        authenticated: push.authenticated,
                        trusted: push.trusted,
                        last: true,
                        username,
                        password,
                        bearer,
                    })
                    .ok();
            }
        }
    }

    fn on_disconnect(&self, session_id: u32) -> Result<()> {
        if let Some(pi_client_address) = self.registry.client_for_session_id(session_id) {
            info!(session_id, %pi_client_address, "session disconnected, destroying owned pushes");
            let reason = AbortReason::UserPnd;
            self.destroy_session(&pi_client_address, ota_abort_to_pap(reason as u8), reason.describe());
        }
        Ok(())
    }

    /// Marks every push owned by a session as aborted and removes the
    /// session. Used both for a WSP disconnect and for a capability
    /// mismatch on connect.
    fn destroy_session(&self, pi_client_address: &str, pap_code: u32, desc: &'static str) {
        let now = Utc::now();
        if let Some(mut session) = self.registry.remove_session(pi_client_address) {
            for push in session.push_machines.iter_mut() {
                push.attribute.apply(AttributeUpdate::Aborted { code: pap_code, desc }, now);
            }
        }
    }

    fn on_confirmed_push_cnf(&self, session_id: u32, server_push_id: u32) -> Result<()> {
        let now = Utc::now();
        if let Some(pi_client_address) = self.registry.client_for_session_id(session_id) {
            self.registry.with_session_mut(&pi_client_address, |s| {
                if let Some(push) = s
                    .push_machines
                    .iter_mut()
                    .find(|p| p.push_id as u32 == server_push_id)
                {
                    push.attribute.apply(AttributeUpdate::Delivered2, now);
                }
            });
        }
        Ok(())
    }

    /// A `Po_PushAbort_Ind` destroys the entire session that owns the
    /// aborted push, not only that push (see DESIGN.md Open Question #1:
    /// this mirrors the upstream gateway's `ppg_abort_session` call inside
    /// its push-abort handler).
    fn on_push_abort_ind(&self, session_id: u32, push_id: u32, reason: AbortReason) -> Result<()> {
        let pap_code = ota_abort_to_pap(reason as u8);
        if let Some(pi_client_address) = self.registry.client_for_session_id(session_id) {
            warn!(session_id, push_id, pap_code, "push aborted, destroying owning session");
            self.destroy_session(&pi_client_address, pap_code, reason.describe());
        }
        Ok(())
    }
}
