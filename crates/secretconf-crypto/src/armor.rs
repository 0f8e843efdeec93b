//! PEM-style text armor for key files.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::Zeroizing;

use crate::error::CryptoError;

pub const PUBLIC_KEY_LABEL: &str = "SECRETCONF PUBLIC KEY";
pub const PRIVATE_KEY_LABEL: &str = "SECRETCONF PRIVATE KEY";
pub const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "SECRETCONF ENCRYPTED PRIVATE KEY";

const LINE_WIDTH: usize = 64;

/// A decoded armor block.
#[derive(Debug)]
pub struct Armored {
    pub label: String,
    pub body: Zeroizing<Vec<u8>>,
}

/// Wrap `body` as `-----BEGIN <label>-----` / base64 lines / `-----END <label>-----`.
pub fn encode(label: &str, body: &[u8]) -> Zeroizing<String> {
    let encoded = Zeroizing::new(STANDARD.encode(body));
    let mut out = Zeroizing::new(String::with_capacity(encoded.len() + 2 * label.len() + 64));
    out.push_str("-----BEGIN ");
    out.push_str(label);
    out.push_str("-----\n");
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(LINE_WIDTH));
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }
    out.push_str("-----END ");
    out.push_str(label);
    out.push_str("-----\n");
    out
}

pub fn decode(text: &str) -> Result<Armored, CryptoError> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let first = lines
        .next()
        .ok_or_else(|| CryptoError::key_format("key file is empty"))?;
    let label = first
        .strip_prefix("-----BEGIN ")
        .and_then(|rest| rest.strip_suffix("-----"))
        .ok_or_else(|| CryptoError::key_format("missing BEGIN line"))?;

    let end_line = format!("-----END {label}-----");
    let mut body = Zeroizing::new(String::new());
    let mut closed = false;
    for line in lines.by_ref() {
        if line == end_line {
            closed = true;
            break;
        }
        if line.starts_with("-----") {
            return Err(CryptoError::key_format(format!("unexpected armor line `{line}`")));
        }
        body.push_str(line);
    }
    if !closed {
        return Err(CryptoError::key_format(format!("missing `{end_line}`")));
    }
    if lines.next().is_some() {
        return Err(CryptoError::key_format("trailing data after END line"));
    }

    let bytes = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| CryptoError::key_format(format!("key body is not valid base64: {e}")))?;
    Ok(Armored {
        label: label.to_string(),
        body: Zeroizing::new(bytes),
    })
}
