// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The tagged-union event types that flow between the PPG engine and the
//! OTA dispatcher, plus the bearer/network validation tables and the
//! Push-Flag computation.

use std::collections::BTreeMap;

use crate::{addr::AddrTuple, pap::codes::AbortReason};

/// Ordered multimap of push headers (name -> values), preserving insertion
/// order per distinct name the way an HTTP header list does.
pub type Headers = Vec<(String, String)>;

/// Networks this gateway recognises (WDP Appendix C).
pub const NETWORKS: &[&str] = &[
    "Any",
    "GSM",
    "IS-95 CDMA",
    "ANSI-136",
    "AMPS",
    "PDC",
    "IDEN",
    "PHS",
    "TETRA",
];

/// Bearers this gateway recognises (WDP Appendix C).
pub const BEARERS: &[&str] = &["Any", "SMS", "CSD", "GPRS", "Packet Data", "CDPD"];

/// Outcome of validating the requested bearer/network pair against the
/// fixed tables above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerSelection {
    /// Neither bearer nor network was required; nothing to check.
    NotRequired,
    /// Both recognised; `use_sms` tells the caller whether to keep routing
    /// hints for SMS delivery (bearer == "SMS") or clear them (assume IP).
    Selected { use_sms: bool },
    /// The requested bearer or network name is not in the fixed tables.
    Unavailable,
}

/// Validates `network` against [`NETWORKS`] and `bearer` against [`BEARERS`]
/// — the behaviour the specification text describes (the retrieved C
/// source checks `bearer` against both tables, which looks like a
/// transcription bug; this reimplementation follows the documented
/// semantics rather than reproducing it, see DESIGN.md).
pub fn select_bearer_network(
    network_required: bool,
    network: Option<&str>,
    bearer_required: bool,
    bearer: Option<&str>,
) -> BearerSelection {
    if !bearer_required || !network_required {
        return BearerSelection::NotRequired;
    }

    let network_ok = network.is_some_and(|n| NETWORKS.contains(&n));
    let bearer_ok = bearer.is_some_and(|b| BEARERS.contains(&b));
    if !network_ok || !bearer_ok {
        return BearerSelection::Unavailable;
    }

    let use_sms = bearer == Some("SMS");
    BearerSelection::Selected { use_sms }
}

/// Computes the Push-Flag header value: `authenticated | (trusted<<1) | (last<<2)`.
pub fn push_flag(authenticated: bool, trusted: bool, last: bool) -> u8 {
    authenticated as u8 | (trusted as u8) << 1 | (last as u8) << 2
}

/// Capabilities a WSP session advertises or a PI assumes for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(pub BTreeMap<String, String>);

/// Events the OTA dispatcher emits towards WSP.
#[derive(Debug, Clone)]
pub enum WspEvent {
    SUnitPushReq {
        addr_tuple: AddrTuple,
        headers: Headers,
        body: bytes::Bytes,
        username: Option<String>,
        password: Option<String>,
        bearer: Option<String>,
    },
    SPushReq {
        session_id: u32,
        headers: Headers,
        body: bytes::Bytes,
        username: Option<String>,
        password: Option<String>,
        bearer: Option<String>,
    },
    SConfirmedPushReq {
        session_id: u32,
        push_id: u32,
        headers: Headers,
        body: bytes::Bytes,
        username: Option<String>,
        password: Option<String>,
        bearer: Option<String>,
    },
    SPushAbortReq {
        session_id: u32,
        push_id: u32,
        reason: AbortReason,
    },
    PomConnectRes {
        session_id: u32,
        capabilities: Capabilities,
    },
}

/// Events WSP delivers back to the PPG engine.
#[derive(Debug, Clone)]
pub enum WspIndication {
    PomConnectInd {
        session_id: u32,
        addr_tuple: AddrTuple,
        requested_capabilities: Option<Capabilities>,
    },
    PomDisconnectInd {
        session_id: u32,
    },
    PoConfirmedPushCnf {
        session_id: u32,
        server_push_id: u32,
    },
    PoPushAbortInd {
        session_id: u32,
        push_id: u32,
        reason: AbortReason,
    },
}

/// PPG-internal primitives handed to the OTA dispatcher task.
#[derive(Debug, Clone)]
pub enum PpgEvent {
    PomSessionRequestReq {
        addr_tuple: AddrTuple,
        application_ids: Vec<String>,
    },
    PoPushReq {
        session_id: u32,
        headers: Headers,
        body: bytes::Bytes,
        authenticated: bool,
        trusted: bool,
        last: bool,
        username: Option<String>,
        password: Option<String>,
        bearer: Option<String>,
    },
    PoConfirmedPushReq {
        session_id: u32,
        push_id: u32,
        headers: Headers,
        body: bytes::Bytes,
        authenticated: bool,
        trusted: bool,
        last: bool,
        username: Option<String>,
        password: Option<String>,
        bearer: Option<String>,
    },
    PoUnitPushReq {
        addr_tuple: AddrTuple,
        headers: Headers,
        body: bytes::Bytes,
        authenticated: bool,
        trusted: bool,
        last: bool,
        username: Option<String>,
        password: Option<String>,
        bearer: Option<String>,
    },
    PoPushAbortReq {
        session_id: u32,
        push_id: u32,
        reason: AbortReason,
    },
}
