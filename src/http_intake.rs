// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! HTTP intake glue: turns a raw PI HTTP POST into a [`PushMessage`].
//!
//! The actual HTTP server, MIME multipart splitting, and PAP XML parsing
//! are out of scope for this crate (see SPEC_FULL.md §6) and are modeled
//! as narrow traits here so a concrete web framework and XML library can
//! be plugged in without the engine knowing about either.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
    addr::AddrTuple,
    engine::{PpgEngine, push_machine::DeliveryMethod, push_message::PushMessage},
    ota::events::Headers,
    pap::{
        codes::PapCode,
        response::badmessage_response,
    },
    utils::generate_pi_push_id,
};

#[derive(Debug, Error)]
pub enum MimeError {
    #[error("request Content-Type was not multipart/related")]
    NotMultipart,
    #[error("multipart body had no PAP XML part")]
    MissingPapPart,
    #[error("malformed multipart body: {0}")]
    Malformed(String),
}

/// One non-XML body part carried alongside the PAP control document
/// (the push content itself).
#[derive(Debug, Clone)]
pub struct ContentPart {
    pub content_type: Option<String>,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Result of splitting a PI's HTTP body into its PAP-XML and (optional)
/// content parts.
#[derive(Debug, Clone)]
pub struct ParsedMime {
    pub pap_xml: Vec<u8>,
    pub content: Option<ContentPart>,
}

/// Splits a `multipart/related` PAP request body.
pub trait MimeParts: Send + Sync {
    fn split(&self, content_type: &str, body: &[u8]) -> Result<ParsedMime, MimeError>;
}

#[derive(Debug, Error)]
pub enum PapXmlError {
    #[error("PAP XML was not well-formed: {0}")]
    Malformed(String),
    #[error("PAP XML was missing a required element: {0}")]
    MissingElement(&'static str),
}

/// The fields of a `<push-message>` element this gateway acts on.
#[derive(Debug, Clone)]
pub struct PapPushRequest {
    pub push_id: Option<String>,
    /// Raw `<address>` value, e.g. `WAPPUSH=358401234567/TYPE=PLMN@ppg.example.com`.
    pub address: String,
    pub delivery_method: DeliveryMethod,
    pub deliver_before: Option<chrono::DateTime<chrono::Utc>>,
    pub deliver_after: Option<chrono::DateTime<chrono::Utc>>,
    pub network_required: bool,
    pub network: Option<String>,
    pub bearer_required: bool,
    pub bearer: Option<String>,
    pub progress_notes_requested: bool,
    pub ppg_notify_requested_to: Option<String>,
}

/// Parses the PAP control document out of the XML part `MimeParts`
/// produced.
pub trait PapXmlParser: Send + Sync {
    fn parse_push_message(&self, xml: &[u8]) -> Result<PapPushRequest, PapXmlError>;
}

/// Extracts the MSISDN and bearer-box-reachable client key out of a
/// `WAPPUSH=<number>/TYPE=<type>@<ppg>` style address value. Anything not
/// matching that shape is kept verbatim as the PI client key with no
/// resolvable [`AddrTuple`].
pub fn parse_wappush_address(address: &str, bearerbox_ip: &[u8]) -> (String, Option<AddrTuple>) {
    let Some(rest) = address.strip_prefix("WAPPUSH=") else {
        return (address.to_string(), None);
    };
    let Some((number, _tail)) = rest.split_once('/') else {
        return (address.to_string(), None);
    };
    let ip = bearerbox_ip
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(".");
    let tuple = AddrTuple::new(number, crate::ota::sia::CONNECTED_PORT, ip, 0);
    (address.to_string(), Some(tuple))
}

/// Combines a parsed MIME body and a parsed PAP document into a
/// [`PushMessage`] ready for `PpgEngine::handle_push_message`.
pub fn assemble_push_message(
    parsed: ParsedMime,
    pap: PapPushRequest,
    bearerbox_ip: &[u8],
    fallback_sequence: u64,
) -> PushMessage {
    let (pi_client_address, addr_tuple) = parse_wappush_address(&pap.address, bearerbox_ip);
    let pi_push_id = pap
        .push_id
        .unwrap_or_else(|| generate_pi_push_id(fallback_sequence));

    let (content_type, push_headers, push_data) = match parsed.content {
        Some(part) => (part.content_type, part.headers, part.body),
        None => (None, Vec::new(), Vec::new()),
    };

    PushMessage {
        pi_push_id,
        pi_client_address,
        addr_tuple,
        push_headers,
        push_data,
        content_type,
        no_transform: false,
        delivery_method: pap.delivery_method,
        deliver_before: pap.deliver_before,
        deliver_after: pap.deliver_after,
        network_required: pap.network_required,
        network: pap.network,
        bearer_required: pap.bearer_required,
        bearer: pap.bearer,
        authenticated: false,
        trusted: false,
        progress_notes_requested: pap.progress_notes_requested,
        ppg_notify_requested_to: pap.ppg_notify_requested_to,
        username: None,
        password: None,
        application_ids: Vec::new(),
    }
}

/// A PI HTTP POST before MIME/PAP parsing: the path is assumed already
/// matched by the transport (`/cgi-bin/wap-push.cgi`; anything else is a
/// `404` the transport returns without ever calling [`run_pi_intake`]).
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub content_type_header: String,
    pub query_string: String,
    pub body: Vec<u8>,
}

/// The out-of-scope HTTP server boundary, modeled the same way `WspSink`
/// stands in for the WSP transport below OTA: `accept_request` blocks
/// until the next PI POST arrives (or the listener is shutting down),
/// `send_reply` hands the PAP XML document back over that connection.
pub trait HttpTransport: Send + Sync {
    fn accept_request(&self) -> Option<RawRequest>;
    fn send_reply(&self, status: u16, body: String);
}

/// The collaborators the PI-intake task needs: the (out-of-scope) HTTP
/// transport plus the MIME splitter and PAP XML parser it hands requests
/// to before injecting a [`PushMessage`] into the engine.
pub struct HttpIntakeDeps {
    pub transport: Box<dyn HttpTransport>,
    pub mime: Box<dyn MimeParts>,
    pub pap_xml: Box<dyn PapXmlParser>,
}

/// Parses one raw request and runs it through the engine, producing the
/// status/body pair to hand back to the PI. A well-formed request always
/// gets `202`, even when the engine rejects the push (PAP §14.4.1); a
/// malformed body or control document still gets a PAP `badmessage-response`
/// so the PI has something to log.
fn handle_raw_request(
    deps: &HttpIntakeDeps,
    engine: &PpgEngine,
    bearerbox_ip: &[u8],
    sequence: u64,
    raw: RawRequest,
) -> (u16, String) {
    let parsed = match deps.mime.split(&raw.content_type_header, &raw.body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "malformed multipart body");
            return (202, badmessage_response(PapCode::BAD_REQUEST, None));
        },
    };

    let pap = match deps.pap_xml.parse_push_message(&parsed.pap_xml) {
        Ok(pap) => pap,
        Err(e) => {
            warn!(error = %e, "malformed PAP XML");
            return (202, badmessage_response(PapCode::BAD_REQUEST, None));
        },
    };

    let msg = assemble_push_message(parsed, pap, bearerbox_ip, sequence);
    match engine.handle_push_message(msg) {
        Ok(outcome) => (202, outcome.pi_response_body),
        Err(e) => {
            error!(error = %e, "ingest failed");
            (202, badmessage_response(PapCode::INTERNAL_SERVER_ERROR, None))
        },
    }
}

/// The PI-intake task: blocks on `accept_request`, parses and ingests each
/// request inline, then replies, looping until the transport reports
/// shutdown. Mirrors `run_dispatcher`'s loop shape on the inbound side.
pub fn run_pi_intake(deps: HttpIntakeDeps, engine: Arc<PpgEngine>, bearerbox_ip: Vec<u8>) {
    let sequence = AtomicU64::new(1);
    while let Some(raw) = deps.transport.accept_request() {
        let seq = sequence.fetch_add(1, Ordering::SeqCst);
        let (status, body) = handle_raw_request(&deps, &engine, &bearerbox_ip, seq, raw);
        deps.transport.send_reply(status, body);
    }
    debug!("pi intake loop exiting");
}
