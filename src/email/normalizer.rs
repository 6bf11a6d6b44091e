use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::decode::{decode_base64, decode_quoted_printable};
use super::payload::{find_header, Header, MimePart, RawMessage, TransferEncoding};
use crate::error::MailResult;

pub const EMPTY_BODY_PLACEHOLDER: &str = "<div>No content</div>";

/// Uniform record served to the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEmail {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub snippet: String,
    pub body: String,
    pub labels: Vec<String>,
    pub attachments: Vec<AttachmentInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    pub filename: String,
    pub mime_type: String,
    pub attachment_id: String,
}

/// Headers surfaced in a [`NormalizedEmail`], each with its absent-value sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    From,
    To,
    Subject,
    Date,
}

impl HeaderField {
    pub const ALL: [HeaderField; 4] = [HeaderField::From, HeaderField::To, HeaderField::Subject, HeaderField::Date];

    pub fn name(&self) -> &'static str {
        match self {
            HeaderField::From => "From",
            HeaderField::To => "To",
            HeaderField::Subject => "Subject",
            HeaderField::Date => "Date",
        }
    }

    pub fn sentinel(&self) -> &'static str {
        match self {
            HeaderField::From => "Unknown Sender",
            HeaderField::To => "Unknown Recipient",
            HeaderField::Subject => "No Subject",
            HeaderField::Date => "Unknown Date",
        }
    }
}

pub fn extract_header(headers: &[Header], field: HeaderField) -> String {
    find_header(headers, field.name())
        .unwrap_or_else(|| field.sentinel())
        .to_string()
}

/// Body content found while walking a part tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBody {
    pub html: Option<String>,
    pub text: Option<String>,
}

impl DecodedBody {
    /// Append a sibling's content, same types concatenated in order
    fn merge(&mut self, other: DecodedBody) {
        append(&mut self.html, other.html);
        append(&mut self.text, other.text);
    }

    /// HTML wins over plain text
    pub fn preferred(&self) -> Option<&str> {
        self.html
            .as_deref()
            .filter(|html| !html.trim().is_empty())
            .or_else(|| self.text.as_deref().filter(|text| !text.trim().is_empty()))
    }
}

fn append(slot: &mut Option<String>, content: Option<String>) {
    if let Some(content) = content {
        match slot {
            Some(existing) => existing.push_str(&content),
            None => *slot = Some(content),
        }
    }
}

/// Recursively decode the body content of a part tree
pub fn decode_part(part: &MimePart) -> DecodedBody {
    // An attached message keeps its inner parts out of the body
    if part.is_attachment() {
        return DecodedBody::default();
    }

    if part.is_multipart() {
        let mut decoded = DecodedBody::default();
        for child in &part.parts {
            decoded.merge(decode_part(child));
        }
        return decoded;
    }

    let essence = part.essence();
    if essence != "text/html" && essence != "text/plain" {
        return DecodedBody::default();
    }

    let Some(data) = part.body.data.as_deref() else {
        return DecodedBody::default();
    };

    match decode_leaf(data, part.transfer_encoding()) {
        Ok(content) if essence == "text/html" => DecodedBody {
            html: Some(content),
            text: None,
        },
        Ok(content) => DecodedBody {
            html: None,
            text: Some(content),
        },
        Err(e) => {
            warn!("Skipping undecodable part '{}' ({}): {}", part.part_id, essence, e);
            DecodedBody::default()
        }
    }
}

/// Decode a leaf's inline data into text
pub fn decode_leaf(data: &str, encoding: TransferEncoding) -> MailResult<String> {
    let bytes = decode_base64(data)?;
    let bytes = match encoding {
        TransferEncoding::QuotedPrintable => decode_quoted_printable(&bytes),
        TransferEncoding::Base64 => bytes,
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Pick the body to serve, falling back to the snippet when nothing decodes
pub fn select_body(decoded: &DecodedBody, snippet: &str) -> String {
    if let Some(body) = decoded.preferred() {
        return body.to_string();
    }
    if snippet.is_empty() {
        EMPTY_BODY_PLACEHOLDER.to_string()
    } else {
        format!("<div>{}</div>", snippet)
    }
}

/// Every part carrying a filename, in tree order
pub fn collect_attachments(part: &MimePart) -> Vec<AttachmentInfo> {
    let mut attachments = Vec::new();
    collect_into(part, &mut attachments);
    attachments
}

fn collect_into(part: &MimePart, attachments: &mut Vec<AttachmentInfo>) {
    if part.is_attachment() {
        attachments.push(AttachmentInfo {
            filename: part.filename.clone(),
            mime_type: part.mime_type.clone(),
            attachment_id: part.body.attachment_id.clone().unwrap_or_default(),
        });
    }
    for child in &part.parts {
        collect_into(child, attachments);
    }
}

/// Shape a provider message into a [`NormalizedEmail`]
pub fn normalize(message: RawMessage) -> NormalizedEmail {
    let headers = message.headers();
    let [from, to, subject, date] = HeaderField::ALL.map(|field| extract_header(headers, field));

    let (decoded, attachments) = match &message.payload {
        Some(payload) => (decode_part(payload), collect_attachments(payload)),
        None => (DecodedBody::default(), Vec::new()),
    };
    let body = select_body(&decoded, &message.snippet);

    debug!(
        "Normalized message {}: {} attachment(s), html body: {}",
        message.id,
        attachments.len(),
        decoded.html.is_some()
    );

    NormalizedEmail {
        id: message.id,
        thread_id: message.thread_id,
        from,
        to,
        subject,
        date,
        snippet: message.snippet,
        body,
        labels: message.label_ids,
        attachments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str, value: &str) -> Header {
        Header {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_extract_header_case_insensitive() {
        let headers = vec![header("subject", "Facture #42"), header("Subject", "second")];
        assert_eq!(extract_header(&headers, HeaderField::Subject), "Facture #42");
        assert_eq!(extract_header(&headers, HeaderField::From), "Unknown Sender");
        assert_eq!(extract_header(&[], HeaderField::Subject), "No Subject");
        assert_eq!(extract_header(&[], HeaderField::Date), "Unknown Date");
    }

    #[test]
    fn test_select_body_fallbacks() {
        let empty = DecodedBody::default();
        assert_eq!(select_body(&empty, "See you"), "<div>See you</div>");
        assert_eq!(select_body(&empty, ""), EMPTY_BODY_PLACEHOLDER);

        let whitespace = DecodedBody {
            html: Some("  ".to_string()),
            text: Some("plain".to_string()),
        };
        assert_eq!(select_body(&whitespace, "snip"), "plain");
    }

    #[test]
    fn test_merge_concatenates_same_type() {
        let mut body = DecodedBody {
            html: None,
            text: Some("one ".to_string()),
        };
        body.merge(DecodedBody {
            html: Some("<p>x</p>".to_string()),
            text: Some("two".to_string()),
        });
        assert_eq!(body.text.as_deref(), Some("one two"));
        assert_eq!(body.preferred(), Some("<p>x</p>"));
    }
}
