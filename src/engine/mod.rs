// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The PPG engine: ingests PAP push messages, drives the session/push
//! machine tables, and reacts to OTA-originated events.

pub mod ingest;
pub mod internal;
pub mod push_machine;
pub mod push_message;
pub mod registry;
pub mod session_machine;

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::{
    bearerbox::BearerboxAddress,
    engine::registry::Registry,
    ota::events::{Capabilities, PpgEvent},
    pap::response::SenderIdentity,
    transcode::Transcoder,
};

/// Hook for capability negotiation (Open Question #3 in SPEC_FULL.md /
/// DESIGN.md): the upstream behaviour always reports "capable"; this is
/// kept as an injectable policy rather than hard-coded so a real WSP
/// integration can replace it without touching the engine.
pub trait CapabilityCheck: Send + Sync {
    fn check(&self, assumed: &Capabilities, actual: &Capabilities) -> bool;
}

/// Default policy: always capable, matching the stub in the original
/// gateway.
pub struct AlwaysCapable;

impl CapabilityCheck for AlwaysCapable {
    fn check(&self, _assumed: &Capabilities, _actual: &Capabilities) -> bool {
        true
    }
}

/// Owns the session/push registry and the collaborators the engine needs
/// to validate, transcode, and dispatch a push.
pub struct PpgEngine {
    pub registry: Registry,
    pub transcoder: Transcoder,
    pub identity: SenderIdentity,
    pub ota_tx: UnboundedSender<PpgEvent>,
    pub bearerbox: Arc<BearerboxAddress>,
    pub capability_check: Box<dyn CapabilityCheck>,
}

impl PpgEngine {
    pub fn new(
        transcoder: Transcoder,
        identity: SenderIdentity,
        ota_tx: UnboundedSender<PpgEvent>,
        bearerbox: Arc<BearerboxAddress>,
    ) -> Self {
        Self {
            registry: Registry::new(),
            transcoder,
            identity,
            ota_tx,
            bearerbox,
            capability_check: Box::new(AlwaysCapable),
        }
    }
}
