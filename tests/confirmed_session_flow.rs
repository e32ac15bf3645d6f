// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! End-to-end walk of a confirmed push that opens a new session (the S5
//! scenario in SPEC_FULL.md §8): ingest emits a session request, a
//! simulated `Pom_Connect_Ind` flushes the pending push as a confirmed
//! push request, and a simulated `Po_ConfirmedPush_Cnf` marks it
//! delivered.

use ppg_rs::{
    addr::AddrTuple,
    bearerbox::BearerboxAddress,
    cfg::config::{BearerboxConfig, Config, HttpConfig, IdentityConfig, RuntimeConfig},
    engine::{
        PpgEngine,
        push_machine::{DeliveryMethod, MessageState},
        push_message::PushMessage,
    },
    ota::events::{PpgEvent, WspIndication},
    pap::response::SenderIdentity,
    transcode::{ContentCompiler, TranscodeError, Transcoder},
};
use std::sync::Arc;
use tokio::sync::mpsc;

struct Identity;
impl ContentCompiler for Identity {
    fn compile(&self, body: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        Ok(body.to_vec())
    }
}

fn base_config() -> Config {
    Config {
        http: HttpConfig {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        },
        bearerbox: BearerboxConfig {
            address: "198.51.100.1".to_string(),
            connected_port: 2948,
        },
        identity: IdentityConfig {
            official_name: "Example PPG".to_string(),
            product_name: "ppg-rs".to_string(),
            product_version: "0.1.0".to_string(),
        },
        runtime: RuntimeConfig {
            max_sessions: 1000,
            gc_interval_secs: 60,
        },
    }
}

fn test_engine() -> (PpgEngine, mpsc::UnboundedReceiver<PpgEvent>) {
    let cfg = base_config();
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = PpgEngine::new(
        Transcoder::new(Box::new(Identity), Box::new(Identity)),
        SenderIdentity {
            official_name: cfg.identity.official_name,
            product_name: cfg.identity.product_name,
            product_version: cfg.identity.product_version,
        },
        tx,
        Arc::new(BearerboxAddress::new(cfg.bearerbox.address)),
    );
    (engine, rx)
}

fn confirmed_push_message() -> PushMessage {
    PushMessage {
        pi_push_id: "p-s5".to_string(),
        pi_client_address: "WAPPUSH=+358401234567/TYPE=PLMN@ppg".to_string(),
        addr_tuple: Some(AddrTuple::new("+358401234567", 2948, "198.51.100.1", 9200)),
        push_headers: vec![],
        push_data: b"confirmed hello".to_vec(),
        content_type: Some("text/plain".to_string()),
        no_transform: false,
        delivery_method: DeliveryMethod::Confirmed,
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
        application_ids: vec![],
    }
}

#[test]
fn confirmed_push_opens_session_then_delivers_then_confirms() {
    let (engine, mut rx) = test_engine();

    let outcome = engine
        .handle_push_message(confirmed_push_message())
        .expect("ingest ok");
    assert!(outcome.accepted);
    assert!(outcome.pi_response_body.contains("code=\"1001\""));

    match rx.try_recv().expect("session request queued") {
        PpgEvent::PomSessionRequestReq { .. } => {},
        other => panic!("unexpected event: {other:?}"),
    }

    engine
        .handle_internal_event(WspIndication::PomConnectInd {
            session_id: 77,
            addr_tuple: AddrTuple::new("+358401234567", 2948, "198.51.100.1", 9200),
            requested_capabilities: None,
        })
        .expect("connect ok");

    match rx.try_recv().expect("confirmed push queued") {
        PpgEvent::PoConfirmedPushReq { session_id, .. } => assert_eq!(session_id, 77),
        other => panic!("unexpected event: {other:?}"),
    }

    engine
        .handle_internal_event(WspIndication::PoConfirmedPushCnf {
            session_id: 77,
            server_push_id: 1,
        })
        .expect("cnf ok");

    engine
        .registry
        .with_session_mut("WAPPUSH=+358401234567/TYPE=PLMN@ppg", |s| {
            let push = s.find_push("p-s5").expect("push still tracked");
            assert_eq!(push.attribute.message_state, MessageState::Delivered);
            assert_eq!(push.attribute.delivery_method, Some(DeliveryMethod::Confirmed));
        })
        .expect("session still present");
}
