// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! PAP (Push Access Protocol) numeric codes and XML response documents.

pub mod codes;
pub mod response;

pub use codes::{AbortReason, PapCode, ota_abort_to_pap};
pub use response::{SenderIdentity, badmessage_response, duplicate_push_id_response, push_response};
