// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod addr;
pub mod bearerbox;
pub mod cfg;
pub mod engine;
pub mod http_intake;
pub mod ota;
pub mod pap;
pub mod transcode;
pub mod utils;
