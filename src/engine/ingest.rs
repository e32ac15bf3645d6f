// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `handle_push_message`: the ingest path described in SPEC_FULL.md §4.1.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    engine::{
        PpgEngine,
        push_machine::{AttributeUpdate, DeliveryMethod, PushMachine},
        push_message::PushMessage,
        session_machine::SessionMachine,
    },
    ota::events::{BearerSelection, PpgEvent, select_bearer_network},
    pap::{
        codes::PapCode,
        response::{duplicate_push_id_response, push_response},
    },
};

/// Outcome of `handle_push_message`: the PAP document to hand back to the
/// PI, synchronously, over the same HTTP response.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub pi_response_body: String,
    /// `false` on any terminal rejection (duplicate, bearer mismatch,
    /// expired, transformation failure); `true` once accepted.
    pub accepted: bool,
}

enum TimeConstraint {
    Expired,
    TooEarly,
    NoConstraints,
}

fn evaluate_time_constraints(
    deliver_before: Option<chrono::DateTime<Utc>>,
    deliver_after: Option<chrono::DateTime<Utc>>,
    now: chrono::DateTime<Utc>,
) -> TimeConstraint {
    if let Some(before) = deliver_before
        && before <= now
    {
        return TimeConstraint::Expired;
    }
    if let Some(after) = deliver_after
        && after > now
    {
        return TimeConstraint::TooEarly;
    }
    TimeConstraint::NoConstraints
}

impl PpgEngine {
    pub fn handle_push_message(&self, msg: PushMessage) -> Result<IngestOutcome> {
        let now = Utc::now();

        // Step 1: session lookup + connectionless decision.
        let has_session = self.registry.session_by_client(&msg.pi_client_address).is_some();
        let cless = matches!(
            msg.delivery_method,
            DeliveryMethod::Unconfirmed | DeliveryMethod::NotSpecified
        ) && !has_session;

        // Step 2: transform.
        let transcoded = self
            .transcoder
            .transform(msg.content_type.as_deref(), &msg.push_data, msg.no_transform);

        // Step 3: allocate machines (duplicate check happens before the push is
        // actually installed into any list).
        let mut push = PushMachine::new(msg.pi_push_id.clone(), self.registry.next_push_id());
        push.addr_tuple = msg.addr_tuple.clone();
        push.delivery_method = msg.delivery_method;
        push.deliver_before = msg.deliver_before;
        push.deliver_after = msg.deliver_after;
        push.network_required = msg.network_required;
        push.network = msg.network.clone();
        push.bearer_required = msg.bearer_required;
        push.bearer = msg.bearer.clone();
        push.authenticated = msg.authenticated;
        push.trusted = msg.trusted;
        push.progress_notes_requested = msg.progress_notes_requested;
        push.ppg_notify_requested_to = msg.ppg_notify_requested_to.clone();
        push.username = msg.username.clone();
        push.password = msg.password.clone();
        push.push_headers = msg.push_headers.clone();
        push.push_data = msg.push_data.clone();

        // Step 4: duplicate detection.
        if self.registry.has_push_id(&msg.pi_push_id) {
            info!(pi_push_id = %msg.pi_push_id, "rejecting duplicate push id");
            return Ok(IngestOutcome {
                pi_response_body: duplicate_push_id_response(
                    &msg.pi_push_id,
                    &msg.pi_client_address,
                    &self.identity,
                    now,
                ),
                accepted: false,
            });
        }

        // Step 5: failure paths.
        let transcoded = match transcoded {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, pi_push_id = %msg.pi_push_id, "content transformation failed");
                let code = if push.addr_tuple.is_none() {
                    PapCode::ADDRESS_ERROR
                } else {
                    PapCode::TRANSFORMATION_FAILURE
                };
                push.attribute.apply(
                    AttributeUpdate::Undeliverable2 {
                        code,
                        desc: code.describe(),
                    },
                    now,
                );
                return Ok(IngestOutcome {
                    pi_response_body: push_response(&msg.pi_push_id, code),
                    accepted: false,
                });
            },
        };
        push.push_data = transcoded.body;
        push.push_headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
        push.push_headers
            .insert(0, ("Content-Type".to_string(), transcoded.content_type));

        // Step 6: bearer selection.
        match select_bearer_network(
            push.network_required,
            push.network.as_deref(),
            push.bearer_required,
            push.bearer.as_deref(),
        ) {
            BearerSelection::Unavailable => {
                push.attribute.apply(
                    AttributeUpdate::Undeliverable2 {
                        code: PapCode::REQUIRED_BEARER_NOT_AVAILABLE,
                        desc: PapCode::REQUIRED_BEARER_NOT_AVAILABLE.describe(),
                    },
                    now,
                );
                return Ok(IngestOutcome {
                    pi_response_body: push_response(
                        &msg.pi_push_id,
                        PapCode::REQUIRED_BEARER_NOT_AVAILABLE,
                    ),
                    accepted: false,
                });
            },
            BearerSelection::Selected { use_sms } => {
                if !use_sms {
                    push.network_required = false;
                    push.network = None;
                    push.bearer_required = false;
                    push.bearer = None;
                }
            },
            BearerSelection::NotRequired => {},
        }

        // Step 7: time constraints.
        let constraint = evaluate_time_constraints(push.deliver_before, push.deliver_after, now);
        if matches!(constraint, TimeConstraint::Expired) {
            push.attribute.apply(
                AttributeUpdate::Expired {
                    desc: PapCode::FORBIDDEN.describe(),
                },
                now,
            );
            return Ok(IngestOutcome {
                pi_response_body: push_response(&msg.pi_push_id, PapCode::FORBIDDEN),
                accepted: false,
            });
        }

        // Step 8: accept, install into the owning list.
        push.attribute.apply(AttributeUpdate::Pending, now);
        let pi_response_body = push_response(&msg.pi_push_id, PapCode::ACCEPTED_FOR_PROCESSING);

        if matches!(constraint, TimeConstraint::TooEarly) {
            // Step 9, TOO_EARLY: keep the machine, no dispatch yet (see
            // DESIGN.md Open Question #2 about the missing re-evaluation
            // timer).
            self.install_push(push, &msg.pi_client_address, cless);
            return Ok(IngestOutcome {
                pi_response_body,
                accepted: true,
            });
        }

        if push.delivery_method.is_confirmed_preference() {
            self.dispatch_confirmed(push, &msg.pi_client_address, has_session)?;
        } else {
            self.dispatch_unconfirmed(push, &msg.pi_client_address, has_session)?;
        }

        Ok(IngestOutcome {
            pi_response_body,
            accepted: true,
        })
    }

    fn install_push(&self, push: PushMachine, pi_client_address: &str, cless: bool) {
        if cless {
            self.registry.insert_unit_push(push);
            return;
        }

        if self.registry.session_by_client(pi_client_address).is_none() {
            let addr_tuple = push
                .addr_tuple
                .clone()
                .unwrap_or_else(|| crate::addr::AddrTuple::new("0.0.0.0", 0, "0.0.0.0", 0));
            self.registry
                .insert_session(SessionMachine::new(pi_client_address.to_string(), addr_tuple));
        }
        self.registry
            .with_session_mut(pi_client_address, |s| s.push_machines.push(push));
    }

    fn dispatch_unconfirmed(&self, mut push: PushMachine, pi_client_address: &str, has_session: bool) -> Result<()> {
        let now = Utc::now();
        let addr_tuple = push
            .addr_tuple
            .clone()
            .unwrap_or_else(|| crate::addr::AddrTuple::new("0.0.0.0", 0, "0.0.0.0", 0));

        let (username, password, bearer) = push.sms_credentials();
        let event = if has_session {
            let session_id = self
                .registry
                .session_by_client(pi_client_address)
                .and_then(|s| s.session_id)
                .unwrap_or(0);
            PpgEvent::PoPushReq {
                session_id,
                headers: push.push_headers.clone(),
                body: push.push_data.clone().into(),
                authenticated: push.authenticated,
                trusted: push.trusted,
                last: true,
                username,
                password,
                bearer,
            }
        } else {
            PpgEvent::PoUnitPushReq {
                addr_tuple,
                headers: push.push_headers.clone(),
                body: push.push_data.clone().into(),
                authenticated: push.authenticated,
                trusted: push.trusted,
                last: true,
                username,
                password,
                bearer,
            }
        };
        self.ota_tx.send(event).ok();

        push.attribute.apply(AttributeUpdate::Delivered1, now);
        // Unconfirmed pushes are destroyed immediately after dispatch; do
        // not install into a list (nothing left to do with it).
        Ok(())
    }

    fn dispatch_confirmed(&self, push: PushMachine, pi_client_address: &str, has_session: bool) -> Result<()> {
        if has_session {
            let session_id = self
                .registry
                .session_by_client(pi_client_address)
                .and_then(|s| s.session_id)
                .unwrap_or(0);
            let (username, password, bearer) = push.sms_credentials();
            let event = PpgEvent::PoConfirmedPushReq {
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
            };
            self.ota_tx.send(event).ok();
            self.install_push(push, pi_client_address, false);
        } else {
            let addr_tuple = push
                .addr_tuple
                .clone()
                .unwrap_or_else(|| crate::addr::AddrTuple::new("0.0.0.0", 0, "0.0.0.0", 0));
            let event = PpgEvent::PomSessionRequestReq {
                addr_tuple,
                application_ids: Vec::new(),
            };
            self.ota_tx.send(event).ok();
            self.install_push(push, pi_client_address, false);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        bearerbox::BearerboxAddress,
        pap::response::SenderIdentity,
        transcode::{ContentCompiler, TranscodeError, Transcoder},
    };

    struct Identity;
    impl ContentCompiler for Identity {
        fn compile(&self, body: &[u8]) -> Result<Vec<u8>, TranscodeError> {
            Ok(body.to_vec())
        }
    }

    fn test_engine() -> (PpgEngine, mpsc::UnboundedReceiver<PpgEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = PpgEngine::new(
            Transcoder::new(Box::new(Identity), Box::new(Identity)),
            SenderIdentity {
                official_name: "Test PPG".into(),
                product_name: "ppg-rs".into(),
                product_version: "0.1.0".into(),
            },
            tx,
            std::sync::Arc::new(BearerboxAddress::new("127.0.0.1")),
        );
        (engine, rx)
    }

    fn base_message(pi_push_id: &str) -> PushMessage {
        PushMessage {
            pi_push_id: pi_push_id.to_string(),
            pi_client_address: "wappush=+358401234567/type=plmn@ppg".to_string(),
            addr_tuple: Some(crate::addr::AddrTuple::new(
                "+358401234567",
                2948,
                "127.0.0.1",
                9200,
            )),
            push_headers: vec![],
            push_data: b"hi".to_vec(),
            content_type: Some("text/plain".to_string()),
            no_transform: false,
            delivery_method: DeliveryMethod::Unconfirmed,
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
    fn s1_unit_push_accepted() {
        let (engine, mut rx) = test_engine();
        let outcome = engine.handle_push_message(base_message("p1")).expect("ingest ok");
        assert!(outcome.accepted);
        assert!(outcome.pi_response_body.contains("code=\"1001\""));
        let event = rx.try_recv().expect("one ota event");
        match event {
            PpgEvent::PoUnitPushReq { .. } => {},
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn s2_duplicate_id_rejected_without_second_ota_event() {
        let (engine, mut rx) = test_engine();
        engine.handle_push_message(base_message("p1")).expect("first ok");
        rx.try_recv().expect("first dispatch");

        let outcome = engine.handle_push_message(base_message("p1")).expect("second ok");
        assert!(!outcome.accepted);
        assert!(outcome.pi_response_body.contains("code=\"2007\""));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn s4_expired_push_is_rejected() {
        let (engine, mut rx) = test_engine();
        let mut msg = base_message("p4");
        msg.deliver_before = Some(Utc::now() - chrono::Duration::days(1));
        let outcome = engine.handle_push_message(msg).expect("ingest ok");
        assert!(!outcome.accepted);
        assert!(outcome.pi_response_body.contains("code=\"2004\""));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn s6_bearer_mismatch_is_rejected() {
        let (engine, mut rx) = test_engine();
        let mut msg = base_message("p6");
        msg.network_required = true;
        msg.network = Some("GSM".to_string());
        msg.bearer_required = true;
        msg.bearer = Some("Bluetooth".to_string());
        let outcome = engine.handle_push_message(msg).expect("ingest ok");
        assert!(!outcome.accepted);
        assert!(outcome.pi_response_body.contains("code=\"2005\""));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn s3_wml_payload_is_transcoded() {
        let (engine, mut rx) = test_engine();
        let mut msg = base_message("p3");
        msg.content_type = Some("text/vnd.wap.wml".to_string());
        msg.push_data = b"<wml/>".to_vec();
        engine.handle_push_message(msg).expect("ingest ok");
        match rx.try_recv().expect("dispatch") {
            PpgEvent::PoUnitPushReq { headers, .. } => {
                assert!(headers.iter().any(|(k, _)| k == "Content-Type"));
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
