// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Builders for the three PAP XML response documents the gateway ever
//! sends back to a push initiator.

use chrono::{DateTime, Utc};

use crate::pap::codes::PapCode;

const DOCTYPE: &str = "<?xml version=\"1.0\"?>\
<!DOCTYPE pap PUBLIC \"-//WAPFORUM//DTD PAP 1.0//EN\" \
\"http://www.wapforum.org/DTD/pap_1.0.dtd\">";

/// Identity fields the PPG advertises in every response it sends.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub official_name: String,
    pub product_name: String,
    pub product_version: String,
}

impl SenderIdentity {
    /// `"<official_name>; WAP/1.3 (<product_name>/<version>)"`.
    pub fn sender_name(&self) -> String {
        format!(
            "{}; WAP/1.3 ({}/{})",
            self.official_name, self.product_name, self.product_version
        )
    }
}

/// UTC ISO-8601 second-precision timestamp, e.g. `2026-07-27T10:00:00Z`.
pub fn reply_time(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Removes `"`, `<`, `>`, `&` from an XML attribute value by deletion, not
/// entity-encoding — bug-compatible with the original gateway (see the
/// Open Question in DESIGN.md about `escape_fragment`).
pub fn escape_fragment(fragment: &str) -> String {
    fragment
        .chars()
        .filter(|c| !matches!(c, '"' | '<' | '>' | '&'))
        .collect()
}

/// `<badmessage-response code desc bad-message-fragment?>` for unparsable
/// input.
pub fn badmessage_response(code: PapCode, bad_message_fragment: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(DOCTYPE);
    out.push_str("<pap><badmessage-response code=\"");
    out.push_str(&code.to_string());
    out.push_str("\" desc=\"");
    out.push_str(code.describe());
    out.push('"');
    if let Some(frag) = bad_message_fragment {
        out.push_str(" bad-message-fragment=\"");
        out.push_str(&escape_fragment(frag));
        out.push('"');
    }
    out.push_str("></badmessage-response></pap>");
    out
}

/// `<push-response>` + `<response-result code desc?>` for a successfully
/// accepted push (no `sender-*`/`reply-time` attributes echoed) or a
/// rejection carrying only a code.
pub fn push_response(push_id: &str, code: PapCode) -> String {
    let mut out = String::new();
    out.push_str(DOCTYPE);
    out.push_str("<pap><push-response push-id=\"");
    out.push_str(&escape_fragment(push_id));
    out.push_str("\"><response-result code=\"");
    out.push_str(&code.to_string());
    out.push_str("\" desc=\"");
    out.push_str(code.describe());
    out.push_str("\"></response-result></push-response></pap>");
    out
}

/// Duplicate-push-id notification: echoes `sender-name`, `reply-time` and
/// `sender-address` alongside the `response-result`.
pub fn duplicate_push_id_response(
    push_id: &str,
    sender_address: &str,
    identity: &SenderIdentity,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    out.push_str(DOCTYPE);
    out.push_str("<pap><push-response push-id=\"");
    out.push_str(&escape_fragment(push_id));
    out.push_str("\" sender-name=\"");
    out.push_str(&escape_fragment(&identity.sender_name()));
    out.push_str("\" reply-time=\"");
    out.push_str(&reply_time(now));
    out.push_str("\" sender-address=\"");
    out.push_str(&escape_fragment(sender_address));
    out.push_str("\"></push-response><response-result code=\"");
    out.push_str(&PapCode::DUPLICATE_PUSH_ID.to_string());
    out.push_str("\" desc=\"");
    out.push_str(PapCode::DUPLICATE_PUSH_ID.describe());
    out.push_str("\"></response-result></pap>");
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn escape_fragment_deletes_rather_than_encodes() {
        assert_eq!(escape_fragment("a<b>&\"c\""), "abc");
    }

    #[test]
    fn reply_time_is_second_precision_iso8601() {
        let t = Utc.with_ymd_and_hms(2026, 7, 27, 10, 30, 5).unwrap();
        assert_eq!(reply_time(t), "2026-07-27T10:30:05Z");
    }

    #[test]
    fn push_response_embeds_code_and_desc() {
        let body = push_response("p1", PapCode::ACCEPTED_FOR_PROCESSING);
        assert!(body.contains("code=\"1001\""));
        assert!(body.contains("push-id=\"p1\""));
    }

    #[test]
    fn sender_name_matches_template() {
        let id = SenderIdentity {
            official_name: "Example PPG".into(),
            product_name: "ppg-rs".into(),
            product_version: "0.1.0".into(),
        };
        assert_eq!(id.sender_name(), "Example PPG; WAP/1.3 (ppg-rs/0.1.0)");
    }
}
