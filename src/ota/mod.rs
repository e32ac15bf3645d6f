// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! OTA (Over-The-Air) dispatch layer: translates PPG primitives into WSP
//! service primitives, packs the SIA PDU, and normalises application-id
//! headers.

pub mod appid;
pub mod dispatcher;
pub mod events;
pub mod sia;

pub use dispatcher::{WspSink, run_dispatcher, run_ota_in};
pub use events::{BearerSelection, PpgEvent, WspEvent, WspIndication, push_flag, select_bearer_network};
