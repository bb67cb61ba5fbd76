// Compressed <diagram> bodies as written by .drawio files:
// mxGraphModel xml -> percent-encoding (encodeURIComponent set) -> raw deflate -> base64.

use crate::error::ModelResult;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::{DeflateDecoder, DeflateEncoder};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::io::Read;

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn decode_diagram_payload(payload: &str) -> ModelResult<String> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = STANDARD.decode(compact)?;
    let mut decoder = DeflateDecoder::new(&decoded[..]);
    let mut inflated = Vec::new();
    decoder.read_to_end(&mut inflated)?;
    let inflated_str = std::str::from_utf8(&inflated)?;
    let decoded = percent_decode_str(inflated_str).decode_utf8()?;
    Ok(decoded.into_owned())
}

pub fn encode_diagram_payload(xml: &str) -> ModelResult<String> {
    let encoded_xml = utf8_percent_encode(xml, URI_COMPONENT).to_string();
    let mut encoder = DeflateEncoder::new(encoded_xml.as_bytes(), Compression::default());
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed)?;
    Ok(STANDARD.encode(compressed))
}
