// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The per-push record and its PAP-attribute state transitions.

use chrono::{DateTime, Utc};

use crate::{addr::AddrTuple, ota::events::Headers, pap::codes::PapCode};

/// Requested delivery method, as carried by the PAP `delivery-method`
/// attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    Confirmed,
    Unconfirmed,
    PreferConfirmed,
    NotSpecified,
}

impl DeliveryMethod {
    pub fn is_confirmed_preference(self) -> bool {
        matches!(self, Self::Confirmed | Self::PreferConfirmed)
    }
}

/// Externally observable PAP message state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Pending,
    Delivered,
    Undeliverable,
    Expired,
    Aborted,
}

/// The PAP attribute: the part of a push machine the PI can observe.
#[derive(Debug, Clone)]
pub struct PapAttribute {
    pub message_state: MessageState,
    pub delivery_method: Option<DeliveryMethod>,
    pub code: Option<PapCode>,
    pub desc: Option<String>,
    pub event_time: Option<DateTime<Utc>>,
}

impl Default for PapAttribute {
    fn default() -> Self {
        Self {
            message_state: MessageState::Pending,
            delivery_method: None,
            code: None,
            desc: None,
            event_time: None,
        }
    }
}

/// One of the seven transitions `update_push_data_with_attribute` may apply.
#[derive(Debug, Clone, Copy)]
pub enum AttributeUpdate {
    Pending,
    Undeliverable1,
    Undeliverable2 { code: PapCode, desc: &'static str },
    Delivered1,
    Delivered2,
    Aborted { code: u32, desc: &'static str },
    Expired { desc: &'static str },
}

impl PapAttribute {
    pub fn apply(&mut self, update: AttributeUpdate, now: DateTime<Utc>) {
        match update {
            AttributeUpdate::Pending => {
                self.message_state = MessageState::Pending;
            },
            AttributeUpdate::Undeliverable1 => {
                self.message_state = MessageState::Undeliverable;
                self.code = Some(PapCode::BAD_REQUEST);
            },
            AttributeUpdate::Undeliverable2 { code, desc } => {
                self.message_state = MessageState::Undeliverable;
                self.code = Some(code);
                self.desc = Some(desc.to_string());
            },
            AttributeUpdate::Delivered1 => {
                self.message_state = MessageState::Delivered;
                self.delivery_method = Some(DeliveryMethod::Unconfirmed);
                self.event_time = Some(now);
            },
            AttributeUpdate::Delivered2 => {
                self.message_state = MessageState::Delivered;
                self.delivery_method = Some(DeliveryMethod::Confirmed);
                self.event_time = Some(now);
            },
            AttributeUpdate::Aborted { code, desc } => {
                self.message_state = MessageState::Aborted;
                self.code = Some(PapCode(code));
                self.event_time = Some(now);
                self.desc = Some(desc.to_string());
            },
            AttributeUpdate::Expired { desc } => {
                self.message_state = MessageState::Expired;
                self.event_time = Some(now);
                self.desc = Some(desc.to_string());
            },
        }
    }
}

/// One push request: identifiers, payload, delivery policy, and the
/// observable PAP attribute.
#[derive(Debug, Clone)]
pub struct PushMachine {
    pub pi_push_id: String,
    pub push_id: u64,
    pub session_id: Option<u32>,

    pub addr_tuple: Option<AddrTuple>,

    pub push_headers: Headers,
    pub push_data: Vec<u8>,

    pub delivery_method: DeliveryMethod,
    pub priority: Option<String>,
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

    pub attribute: PapAttribute,
}

impl PushMachine {
    /// Credentials and bearer hint to forward to WSP, present only when the
    /// SMS bearer is the one actually selected for delivery.
    pub fn sms_credentials(&self) -> (Option<String>, Option<String>, Option<String>) {
        if self.bearer.as_deref() == Some("SMS") {
            (self.username.clone(), self.password.clone(), self.bearer.clone())
        } else {
            (None, None, None)
        }
    }

    pub fn new(pi_push_id: impl Into<String>, push_id: u64) -> Self {
        Self {
            pi_push_id: pi_push_id.into(),
            push_id,
            session_id: None,
            addr_tuple: None,
            push_headers: Vec::new(),
            push_data: Vec::new(),
            delivery_method: DeliveryMethod::NotSpecified,
            priority: None,
            deliver_before: None,
            deliver_after: None,
            network_required: false,
            network: None,
            bearer_required: false,
            bearer: None,
            authenticated: false,
            trusted: false,
            progress_notes_requested: false,
            ppg_notify_requested_to: None,
            username: None,
            password: None,
            attribute: PapAttribute::default(),
        }
    }
}
