//! Compressed entry text
//!
//! Compressed text is zlib-deflated UTF-8, base64 encoded so that it can sit
//! inside an XML element.

use crate::error::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

pub fn compress(text: &str) -> Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    let deflated = encoder.finish()?;
    Ok(BASE64.encode(deflated))
}

/// Inverse of [`compress`]; failures are reported as plain messages so the
/// reader can record them against the entry
pub fn decompress(encoded: &str) -> std::result::Result<String, String> {
    let deflated = BASE64
        .decode(encoded.trim())
        .map_err(|e| format!("Invalid base64 in compressed text: {}", e))?;

    let mut text = String::new();
    ZlibDecoder::new(deflated.as_slice())
        .read_to_string(&mut text)
        .map_err(|e| format!("Failed to inflate text: {}", e))?;

    Ok(text)
}
