//! Typed records of a provider message payload
//!
//! The shape mirrors the Gmail REST representation (camelCase JSON, body data
//! as base64url text). Absent fields deserialize to empty values so the
//! normalizer never has to guess about missing keys.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMessage {
    pub id: String,
    pub thread_id: String,
    pub label_ids: Vec<String>,
    pub snippet: String,
    pub payload: Option<MimePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MimePart {
    pub part_id: String,
    pub mime_type: String,
    pub filename: String,
    pub headers: Vec<Header>,
    pub body: PartBody,
    pub parts: Vec<MimePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartBody {
    pub attachment_id: Option<String>,
    pub size: i64,
    /// Base64url-encoded content, present for inline parts only
    pub data: Option<String>,
}

/// Declared `Content-Transfer-Encoding` of a part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
}

impl RawMessage {
    /// Top-level headers, empty when the payload is missing
    pub fn headers(&self) -> &[Header] {
        self.payload
            .as_ref()
            .map(|payload| payload.headers.as_slice())
            .unwrap_or(&[])
    }
}

impl MimePart {
    /// Case-insensitive header lookup, first match wins
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn transfer_encoding(&self) -> TransferEncoding {
        match self.header("Content-Transfer-Encoding") {
            Some(value) if value.trim().eq_ignore_ascii_case("quoted-printable") => {
                TransferEncoding::QuotedPrintable
            }
            _ => TransferEncoding::Base64,
        }
    }

    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty() || self.mime_type.to_ascii_lowercase().starts_with("multipart/")
    }

    pub fn is_attachment(&self) -> bool {
        !self.filename.trim().is_empty()
    }

    /// MIME type without parameters, lowercased
    pub fn essence(&self) -> String {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }
}

pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str())
}
