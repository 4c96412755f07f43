//! Text-safe framing for encoded tables.
//!
//! # Binary Format
//!
//! Before base64, a payload is laid out as:
//! - Bytes 0-3: magic `CMTB`
//! - Byte 4: format version
//! - Bytes 5-12: body length (u64, little-endian)
//! - Bytes 13-44: SHA-256 of the body
//! - Bytes 45..: body (an Arrow IPC stream)
//!
//! The length and digest make truncation and corruption detectable even
//! when they happen to fall on an IPC message boundary.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use cinemetrics_core::CodecError;
use sha2::{Digest, Sha256};

/// Magic bytes opening every payload.
pub const MAGIC: [u8; 4] = *b"CMTB";

/// Current format version. Payloads from a different version are rejected.
pub const FORMAT_VERSION: u8 = 1;

const DIGEST_LEN: usize = 32;

/// Size of the fixed header preceding the body.
pub const HEADER_LEN: usize = MAGIC.len() + 1 + 8 + DIGEST_LEN;

/// Frame a body and wrap it as base64 text.
pub fn seal(body: &[u8]) -> String {
    let mut framed = Vec::with_capacity(HEADER_LEN + body.len());
    framed.extend_from_slice(&MAGIC);
    framed.push(FORMAT_VERSION);
    framed.extend_from_slice(&(body.len() as u64).to_le_bytes());
    framed.extend_from_slice(&Sha256::digest(body));
    framed.extend_from_slice(body);
    STANDARD.encode(framed)
}

/// Unwrap base64 text and verify the frame, returning the body.
pub fn open(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut framed = STANDARD
        .decode(text.trim())
        .map_err(|e| CodecError::Envelope {
            reason: format!("invalid base64: {e}"),
        })?;

    if framed.len() < HEADER_LEN {
        return Err(CodecError::Envelope {
            reason: format!("truncated header ({} bytes)", framed.len()),
        });
    }
    if framed[..MAGIC.len()] != MAGIC {
        return Err(CodecError::Envelope {
            reason: "missing CMTB magic".to_string(),
        });
    }

    let version = framed[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&framed[5..13]);
    let declared = u64::from_le_bytes(len_bytes);
    let actual = (framed.len() - HEADER_LEN) as u64;
    if declared != actual {
        return Err(CodecError::Integrity {
            reason: format!("declared {declared} body bytes, found {actual}"),
        });
    }

    if Sha256::digest(&framed[HEADER_LEN..]).as_slice() != &framed[13..HEADER_LEN] {
        return Err(CodecError::Integrity {
            reason: "body checksum mismatch".to_string(),
        });
    }

    framed.drain(..HEADER_LEN);
    Ok(framed)
}
