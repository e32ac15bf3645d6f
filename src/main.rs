// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use ppg_rs::{
    bearerbox::BearerboxAddress,
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    engine::PpgEngine,
    http_intake::{
        HttpIntakeDeps, HttpTransport, MimeError, MimeParts, PapPushRequest, PapXmlError, PapXmlParser, ParsedMime,
        RawRequest, run_pi_intake,
    },
    ota::dispatcher::{run_dispatcher, run_ota_in},
    pap::response::SenderIdentity,
    transcode::Transcoder,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Pass-through compiler used until a real WML/SI compiler is wired in;
/// content arrives already compiled or the PI sent `Cache-Control:
/// no-transform`.
struct PassThroughCompiler;

impl ppg_rs::transcode::ContentCompiler for PassThroughCompiler {
    fn compile(&self, body: &[u8]) -> Result<Vec<u8>, ppg_rs::transcode::TranscodeError> {
        Ok(body.to_vec())
    }
}

/// Placeholder transport until a real HTTP server is wired in (out of
/// scope, SPEC_FULL.md §6): never accepts a request, so the PI-intake task
/// exits its loop immediately. Swapping in a real `HttpTransport` makes
/// `run_pi_intake` drive `handle_push_message` exactly as it does in tests.
struct NoopHttpTransport;

impl HttpTransport for NoopHttpTransport {
    fn accept_request(&self) -> Option<RawRequest> {
        None
    }

    fn send_reply(&self, _status: u16, _body: String) {}
}

struct NoopMimeParts;

impl MimeParts for NoopMimeParts {
    fn split(&self, _content_type: &str, _body: &[u8]) -> Result<ParsedMime, MimeError> {
        Err(MimeError::NotMultipart)
    }
}

struct NoopPapXmlParser;

impl PapXmlParser for NoopPapXmlParser {
    fn parse_push_message(&self, _xml: &[u8]) -> Result<PapPushRequest, PapXmlError> {
        Err(PapXmlError::Malformed("no PAP XML parser configured".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _logger_guard = init_logger("config/logger.yaml")?;

    let cfg = resolve_config_path("config/ppg.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let bearerbox = Arc::new(BearerboxAddress::new(cfg.bearerbox.address.clone()));
    bearerbox
        .set(&cfg.bearerbox.address)
        .context("failed to resolve configured bearerbox address")?;

    let bearerbox_ip = bearerbox
        .get()?
        .parse::<std::net::Ipv4Addr>()
        .context("bearerbox address did not resolve to an IPv4 address")?
        .octets()
        .to_vec();

    let (ota_tx, ota_rx) = mpsc::unbounded_channel();
    let (ota_in_tx, ota_in_rx) = mpsc::unbounded_channel();

    let identity = SenderIdentity {
        official_name: cfg.identity.official_name.clone(),
        product_name: cfg.identity.product_name.clone(),
        product_version: cfg.identity.product_version.clone(),
    };

    let engine = Arc::new(PpgEngine::new(
        Transcoder::new(Box::new(PassThroughCompiler), Box::new(PassThroughCompiler)),
        identity,
        ota_tx,
        bearerbox,
    ));

    let cancel = CancellationToken::new();

    let gc_interval = std::time::Duration::from_secs(cfg.runtime.gc_interval_secs);
    let gc_engine = engine.clone();
    let gc_cancel = cancel.clone();
    let gc_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(gc_interval);
        loop {
            tokio::select! {
                _ = gc_cancel.cancelled() => break,
                _ = ticker.tick() => gc_engine.registry.collect_garbage(),
            }
        }
    });

    // The OTA dispatcher consumes `PpgEvent`s produced by the ingest and
    // internal-event paths and pushes them out over WSP. A real `WspSink`
    // wiring a WSP session layer is out of scope here (SPEC_FULL.md §6);
    // `run_dispatcher` is generic over the sink so one can be dropped in.
    struct NoopSink;
    impl ppg_rs::ota::dispatcher::WspSink for NoopSink {
        fn dispatch(&self, event: ppg_rs::ota::events::WspEvent) -> Result<()> {
            tracing::debug!(?event, "wsp dispatch (no sink configured)");
            Ok(())
        }

        fn dispatch_unit(&self, event: ppg_rs::ota::events::WspEvent) -> Result<()> {
            tracing::debug!(?event, "wsp dispatch_unit (no sink configured)");
            Ok(())
        }
    }

    let dispatcher_cancel = cancel.clone();
    let dispatcher_sink: Arc<dyn ppg_rs::ota::dispatcher::WspSink> = Arc::new(NoopSink);
    let dispatcher_bearerbox = engine.bearerbox.clone();
    let dispatcher_task = tokio::spawn(run_dispatcher(
        ota_rx,
        dispatcher_sink,
        dispatcher_bearerbox,
        dispatcher_cancel,
    ));

    // OTA-in: reactions to WSP indications (`Pom_Connect_Ind` and friends).
    // Nothing feeds `ota_in_tx` yet since the WSP transport below OTA is out
    // of scope (SPEC_FULL.md §6); it is kept alive here so a real inbound
    // listener has a sender to hand indications through without restarting
    // this task.
    let ota_in_cancel = cancel.clone();
    let ota_in_engine = engine.clone();
    let ota_in_task = tokio::spawn(run_ota_in(ota_in_rx, ota_in_engine, ota_in_cancel));
    let _ota_in_tx = ota_in_tx;

    // PI-intake: accepts one PI HTTP POST at a time, parses it, and injects
    // a `PushMessage` into the engine. The HTTP server itself is out of
    // scope (SPEC_FULL.md §6); `NoopHttpTransport` is the placeholder until
    // one is wired in, same as `NoopSink` above for the outbound side.
    let intake_deps = HttpIntakeDeps {
        transport: Box::new(NoopHttpTransport),
        mime: Box::new(NoopMimeParts),
        pap_xml: Box::new(NoopPapXmlParser),
    };
    let intake_engine = engine.clone();
    let intake_task =
        tokio::task::spawn_blocking(move || run_pi_intake(intake_deps, intake_engine, bearerbox_ip));

    info!(
        http_port = cfg.http.port,
        bearerbox = %cfg.bearerbox.address,
        "ppg-rs started"
    );

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown requested");
    cancel.cancel();

    let _ = gc_task.await;
    let _ = dispatcher_task.await;
    let _ = ota_in_task.await;
    let _ = intake_task.await;

    Ok(())
}
