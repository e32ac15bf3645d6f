// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `PushMessage`: the event the HTTP intake hands to the engine once MIME
//! and PAP parsing have produced a structured request.

use chrono::{DateTime, Utc};

use crate::{addr::AddrTuple, engine::push_machine::DeliveryMethod, ota::events::Headers};

/// One parsed PAP push request, ready for `handle_push_message`.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub pi_push_id: String,
    pub pi_client_address: String,
    /// Resolved from the PAP `<address>` element; `None` when the address
    /// could not be resolved to a network tuple at all.
    pub addr_tuple: Option<AddrTuple>,

    pub push_headers: Headers,
    pub push_data: Vec<u8>,
    pub content_type: Option<String>,
    pub no_transform: bool,

    pub delivery_method: DeliveryMethod,
    pub deliver_before: Option<DateTime<Utc>>,
    pub deliver_after: Option<DateTime<Utc>>,

    pub network_required: bool,
    pub network: Option<String>,
    pub bearer_required: bool,
    pub bearer: Option<String>,

    pub authenticated: bool,
    pub trusted: bool,

    pub progress_notes_requested: bool,
    pub ppg_notify_requested_to: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,

    pub application_ids: Vec<String>,
}
