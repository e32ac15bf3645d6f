// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The OTA dispatcher: a single-consumer worker translating `PpgEvent`s
//! into `WspEvent`s and handing them to the WSP sink.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    bearerbox::BearerboxAddress,
    engine::PpgEngine,
    ota::{
        events::{Headers, PpgEvent, WspEvent, WspIndication, push_flag},
        sia::{CONNECTED_PORT, pack_sia},
    },
};

/// Sink for WSP-bound events, split by connection-oriented vs.
/// connectionless delivery as the specification requires.
pub trait WspSink: Send + Sync {
    fn dispatch(&self, event: WspEvent) -> Result<()>;
    fn dispatch_unit(&self, event: WspEvent) -> Result<()>;
}

/// Prepends a `Push-Flag` header computed from the trust/last flags.
fn with_push_flag(mut headers: Headers, authenticated: bool, trusted: bool, last: bool) -> Headers {
    let flag = push_flag(authenticated, trusted, last);
    let mut out = Vec::with_capacity(headers.len() + 1);
    out.push(("Push-Flag".to_string(), flag.to_string()));
    out.append(&mut headers);
    out
}

/// Drives the dispatcher loop until the channel closes or `cancel` fires.
pub async fn run_dispatcher(
    mut rx: UnboundedReceiver<PpgEvent>,
    sink: Arc<dyn WspSink>,
    bearerbox: Arc<BearerboxAddress>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            ev = rx.recv() => match ev {
                Some(ev) => ev,
                None => break,
            },
        };

        if let Err(e) = handle_one(event, &sink, &bearerbox) {
            warn!(error = %e, "ota dispatcher failed to handle event");
        }
    }
    debug!("ota dispatcher loop exiting");
}

fn handle_one(event: PpgEvent, sink: &Arc<dyn WspSink>, bearerbox: &Arc<BearerboxAddress>) -> Result<()> {
    match event {
        PpgEvent::PomSessionRequestReq {
            addr_tuple,
            application_ids,
        } => {
            let ip = bearerbox.get()?;
            let sia_body = pack_sia(&application_ids, ip.as_bytes(), CONNECTED_PORT);
            let headers = vec![("Content-Type".to_string(), "application/vnd.wap.sia".to_string())];
            sink.dispatch_unit(WspEvent::SUnitPushReq {
                addr_tuple,
                headers,
                body: sia_body,
                username: None,
                password: None,
                bearer: None,
            })
        },
        PpgEvent::PoPushReq {
            session_id,
            headers,
            body,
            authenticated,
            trusted,
            last,
            username,
            password,
            bearer,
        } => {
            let headers = with_push_flag(headers, authenticated, trusted, last);
            sink.dispatch(WspEvent::SPushReq {
                session_id,
                headers,
                body,
                username,
                password,
                bearer,
            })
        },
        PpgEvent::PoConfirmedPushReq {
            session_id,
            push_id,
            headers,
            body,
            authenticated,
            trusted,
            last,
            username,
            password,
            bearer,
        } => {
            let headers = with_push_flag(headers, authenticated, trusted, last);
            sink.dispatch(WspEvent::SConfirmedPushReq {
                session_id,
                push_id,
                headers,
                body,
                username,
                password,
                bearer,
            })
        },
        PpgEvent::PoUnitPushReq {
            addr_tuple,
            headers,
            body,
            authenticated,
            trusted,
            last,
            username,
            password,
            bearer,
        } => {
            let headers = with_push_flag(headers, authenticated, trusted, last);
            sink.dispatch_unit(WspEvent::SUnitPushReq {
                addr_tuple,
                headers,
                body,
                username,
                password,
                bearer,
            })
        },
        PpgEvent::PoPushAbortReq {
            session_id,
            push_id,
            reason,
        } => sink.dispatch(WspEvent::SPushAbortReq {
            session_id,
            push_id,
            reason,
        }),
    }
}

/// Drives the OTA-in loop: reactions to WSP indications (`Pom_Connect_Ind`
/// and friends), until the channel closes or `cancel` fires. The mirror of
/// [`run_dispatcher`] on the inbound side.
pub async fn run_ota_in(
    mut rx: UnboundedReceiver<WspIndication>,
    engine: Arc<PpgEngine>,
    cancel: CancellationToken,
) {
    loop {
        let indication = tokio::select! {
            _ = cancel.cancelled() => break,
            ind = rx.recv() => match ind {
                Some(ind) => ind,
                None => break,
            },
        };

        if let Err(e) = engine.handle_internal_event(indication) {
            warn!(error = %e, "ota-in failed to handle indication");
        }
    }
    debug!("ota-in loop exiting");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::addr::AddrTuple;

    struct RecordingSink {
        sent: Mutex<Vec<WspEvent>>,
        sent_unit: Mutex<Vec<WspEvent>>,
    }

    impl WspSink for RecordingSink {
        fn dispatch(&self, event: WspEvent) -> Result<()> {
            self.sent.lock().expect("lock").push(event);
            Ok(())
        }

        fn dispatch_unit(&self, event: WspEvent) -> Result<()> {
            self.sent_unit.lock().expect("lock").push(event);
            Ok(())
        }
    }

    #[test]
    fn unit_push_gets_push_flag_prepended() {
        let sink = Arc::new(RecordingSink {
            sent: Mutex::new(Vec::new()),
            sent_unit: Mutex::new(Vec::new()),
        });
        let bearerbox = Arc::new(BearerboxAddress::new("198.51.100.1"));

        let event = PpgEvent::PoUnitPushReq {
            addr_tuple: AddrTuple::new("203.0.113.1", 2948, "198.51.100.1", 9200),
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: bytes::Bytes::from_static(b"hi"),
            authenticated: false,
            trusted: false,
            last: false,
            username: None,
            password: None,
            bearer: None,
        };

        handle_one(event, &(sink.clone() as Arc<dyn WspSink>), &bearerbox).expect("dispatch ok");

        let sent = sink.sent_unit.lock().expect("lock");
        match &sent[0] {
            WspEvent::SUnitPushReq { headers, .. } => {
                assert_eq!(headers[0].0, "Push-Flag");
                assert_eq!(headers[0].1, "0");
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn session_request_packs_sia_with_bearerbox_address() {
        let sink = Arc::new(RecordingSink {
            sent: Mutex::new(Vec::new()),
            sent_unit: Mutex::new(Vec::new()),
        });
        let bearerbox = Arc::new(BearerboxAddress::new("10.0.0.1"));

        let event = PpgEvent::PomSessionRequestReq {
            addr_tuple: AddrTuple::new("203.0.113.1", 2948, "198.51.100.1", 9200),
            application_ids: vec![],
        };

        handle_one(event, &(sink.clone() as Arc<dyn WspSink>), &bearerbox).expect("dispatch ok");

        let sent = sink.sent_unit.lock().expect("lock");
        match &sent[0] {
            WspEvent::SUnitPushReq { body, .. } => {
                assert_eq!(body[0], crate::ota::sia::CURRENT_VERSION);
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
