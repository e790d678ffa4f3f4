//! Decoder for raw kernel event records.
//!
//! The kernel writes variable-length records into the channel buffer, each
//! laid out as `struct inotify_event`: a 16-byte native-endian header
//! (`wd: i32`, `mask: u32`, `cookie: u32`, `len: u32`) followed by `len`
//! bytes of NUL-padded name data. Reads always end on a record boundary,
//! so a well-formed batch decodes to completion; anything short of a full
//! record is corruption and reported as a hard error.

use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;

use thiserror::Error;

/// Size of the fixed record header in bytes.
pub const HEADER_LEN: usize = 16;

/// Decode failures. Both variants are distinguishable from a buffer that
/// was consumed cleanly (which yields `Ok` with whatever was decoded).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated record header: {have} bytes remain, need {HEADER_LEN}")]
    TruncatedHeader { have: usize },

    #[error("record declares {declared} name bytes but only {have} remain")]
    TruncatedName { declared: usize, have: usize },
}

/// One record decoded from the channel, before registry resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Kernel watch descriptor (may be the overflow sentinel).
    pub wd: i32,
    /// Raw event mask bits as reported.
    pub mask: u32,
    /// Correlation cookie, non-zero only for rename pairs.
    pub cookie: u32,
    /// Name of the directory entry the event concerns. `None` when the
    /// record carried no name (the event is about the watched target
    /// itself), distinct from an empty name.
    pub name: Option<OsString>,
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decode every record in `buf`.
///
/// An empty buffer decodes to an empty batch. A non-empty remainder that
/// cannot hold the record it declares is a [`DecodeError`]; no partial
/// results are returned in that case.
pub fn decode_batch(buf: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let rest = &buf[offset..];
        if rest.len() < HEADER_LEN {
            return Err(DecodeError::TruncatedHeader { have: rest.len() });
        }

        let wd = read_i32(&rest[0..4]);
        let mask = read_u32(&rest[4..8]);
        let cookie = read_u32(&rest[8..12]);
        let len = read_u32(&rest[12..16]) as usize;

        let payload = &rest[HEADER_LEN..];
        if payload.len() < len {
            return Err(DecodeError::TruncatedName {
                declared: len,
                have: payload.len(),
            });
        }

        // The name field is padded with NULs to the next record boundary;
        // only the bytes before the first NUL are the entry name.
        let name = if len == 0 {
            None
        } else {
            let raw = &payload[..len];
            let end = raw.iter().position(|&b| b == 0).unwrap_or(len);
            Some(OsString::from_vec(raw[..end].to_vec()))
        };

        records.push(RawRecord {
            wd,
            mask,
            cookie,
            name,
        });
        offset += HEADER_LEN + len;
    }

    Ok(records)
}
