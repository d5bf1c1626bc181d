//! Permissive field extraction for callback XML.
//!
//! The upstream envelope and the decrypted `<ApprovalInfo>` payload are
//! tiny, flat documents; fields arrive either as `<Field>v</Field>` or
//! `<Field><![CDATA[v]]></Field>`. A full XML parser buys nothing here.

use regex::Regex;

/// Extracts one field's text, accepting both CDATA and plain forms.
pub fn extract_field(xml: &str, field: &str) -> Option<String> {
    let pattern = format!(
        r"(?s)<{field}>(?:<!\[CDATA\[(.*?)\]\]>|(.*?))</{field}>",
        field = regex::escape(field)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(xml)?;
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())?;
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn extract_i64(xml: &str, field: &str) -> Option<i64> {
    extract_field(xml, field).and_then(|v| v.parse().ok())
}

/// The ciphertext of an encrypted callback envelope.
pub fn extract_encrypt(xml: &str) -> Option<String> {
    extract_field(xml, "Encrypt")
}

/// Fields of a decrypted `<ApprovalInfo>` event.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalEvent {
    pub sp_no: String,
    pub sp_status: Option<i64>,
    pub sp_name: Option<String>,
    pub status_change_event: Option<i64>,
}

/// Parses an approval event; `None` when no `SpNo` is present.
pub fn parse_approval_event(xml: &str) -> Option<ApprovalEvent> {
    let sp_no = extract_field(xml, "SpNo")?;
    Some(ApprovalEvent {
        sp_no,
        sp_status: extract_i64(xml, "SpStatus"),
        sp_name: extract_field(xml, "SpName"),
        status_change_event: extract_i64(xml, "StatuChangeEvent"),
    })
}
