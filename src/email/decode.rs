use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

use crate::error::{MailError, MailResult};

/// URL-safe alphabet, padding optional: Gmail sometimes pads and sometimes doesn't
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode base64 body data, accepting both the standard and the URL-safe alphabet
pub fn decode_base64(data: &str) -> MailResult<Vec<u8>> {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_LENIENT
        .decode(normalized.as_bytes())
        .map_err(|e| MailError::Decoding(format!("invalid base64 body: {}", e)))
}

/// Encode bytes the way the provider transports body data
pub fn encode_base64(bytes: &[u8]) -> String {
    URL_SAFE_LENIENT.encode(bytes)
}

/// Quoted-printable decoding: drop soft line breaks, substitute `=XX` escapes.
/// Malformed escapes are kept verbatim.
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] != b'=' {
            output.push(input[i]);
            i += 1;
            continue;
        }

        let rest = &input[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
        } else if rest.starts_with(b"\n") {
            i += 2;
        } else if let Some(byte) = rest.get(..2).and_then(hex_pair) {
            output.push(byte);
            i += 3;
        } else {
            output.push(b'=');
            i += 1;
        }
    }

    output
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let high = (pair[0] as char).to_digit(16)?;
    let low = (pair[1] as char).to_digit(16)?;
    Some((high * 16 + low) as u8)
}
