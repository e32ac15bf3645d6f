// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Packing of the SIA (Session Initiation Application) PDU body used to
//! open a connection-oriented push session from the client side.

use bytes::{BufMut, Bytes, BytesMut};

/// SIA content-type version advertised in the PDU (major=1, minor=0).
pub const CURRENT_VERSION: u8 = 0x10;

/// WDP bearer-type code for "CSD over GSM, IPv4 addressed".
pub const GSM_CSD_IPV4: u8 = 0x21;

/// Default port for connection-oriented WAP push sessions.
pub const CONNECTED_PORT: u16 = 2948;

bitflags::bitflags! {
    /// Contact-point flags byte. Both bits are always set by this gateway:
    /// bearer type and port number are always present in the contact point.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContactPointFlags: u8 {
        const BEARER_INCLUDED = 0b0000_0001;
        const PORT_INCLUDED   = 0b0000_0010;
    }
}

/// Packs the contact-points field:
/// `u8 address_length | u8 flags | u8 bearer_type | ASCII(port) | ip_address`.
pub fn pack_contact_point(ip_address: &[u8], port: u16, bearer_type: u8) -> Bytes {
    let flags = ContactPointFlags::BEARER_INCLUDED | ContactPointFlags::PORT_INCLUDED;

    let mut buf = BytesMut::with_capacity(3 + 5 + ip_address.len());
    buf.put_u8(ip_address.len() as u8);
    buf.put_u8(flags.bits());
    buf.put_u8(bearer_type);
    buf.put_slice(port.to_string().as_bytes());
    buf.put_slice(ip_address);
    buf.freeze()
}

/// Packs the application-id list: the concatenation of the already
/// numerically-normalised `X-WAP-Application-Id` header values.
pub fn pack_appid_list(application_ids: &[String]) -> Bytes {
    let mut buf = BytesMut::new();
    for id in application_ids {
        buf.put_slice(id.as_bytes());
    }
    buf.freeze()
}

/// Packs the full SIA PDU: `version | appid_list_len | appid_list | contactpoints`.
///
/// The wire format keeps a length-prefixed application-id list so a reader
/// can separate it from the following contact-points field without needing
/// out-of-band framing.
pub fn pack_sia(application_ids: &[String], ip_address: &[u8], port: u16) -> Bytes {
    let appid_list = pack_appid_list(application_ids);
    let contactpoints = pack_contact_point(ip_address, port, GSM_CSD_IPV4);

    let mut buf = BytesMut::with_capacity(2 + appid_list.len() + contactpoints.len());
    buf.put_u8(CURRENT_VERSION);
    buf.put_u8(appid_list.len() as u8);
    buf.put_slice(&appid_list);
    buf.put_slice(&contactpoints);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_point_length_byte_matches_address_length() {
        let ip = [192u8, 0, 2, 1];
        let packed = pack_contact_point(&ip, CONNECTED_PORT, GSM_CSD_IPV4);
        assert_eq!(packed[0] as usize, ip.len());
    }

    #[test]
    fn flags_byte_has_both_bits_set() {
        let ip = [10u8, 0, 0, 1];
        let packed = pack_contact_point(&ip, CONNECTED_PORT, GSM_CSD_IPV4);
        assert_eq!(packed[1], 0x03);
    }

    #[test]
    fn sia_body_begins_with_version_then_contactpoint_fields() {
        let ip = [10u8, 0, 0, 9];
        let sia = pack_sia(&[], &ip, CONNECTED_PORT);
        assert_eq!(sia[0], CURRENT_VERSION);
        // appid_list_len == 0 since no application ids were supplied.
        assert_eq!(sia[1], 0);
        assert_eq!(sia[2] as usize, ip.len());
        assert_eq!(sia[3], 0x03);
        assert_eq!(sia[4], GSM_CSD_IPV4);
    }
}
