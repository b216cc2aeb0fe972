use crate::error::{NmeaError, Result};

/// XOR of every payload byte (the bytes between `$` and `*`).
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, byte| acc ^ byte)
}

/// Append `*HH` to a `$`-prefixed sentence body.
pub(crate) fn seal(body: &str) -> String {
    let payload = body.strip_prefix('$').unwrap_or(body);
    format!("{body}*{:02X}", checksum(payload.as_bytes()))
}

/// Verify a complete sentence and return its checksum.
///
/// Trailing CR/LF is ignored. The checksum field must be exactly two hex digits;
/// either case is accepted.
pub fn verify(sentence: &str) -> Result<u8> {
    let sentence = sentence.trim_end_matches(['\r', '\n']);
    let body = sentence
        .strip_prefix('$')
        .ok_or(NmeaError::MissingDelimiter)?;
    let (payload, field) = body.rsplit_once('*').ok_or(NmeaError::MissingChecksum)?;

    if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(NmeaError::MalformedChecksum(field.to_string()));
    }
    let carried = u8::from_str_radix(field, 16)
        .map_err(|_| NmeaError::MalformedChecksum(field.to_string()))?;

    let computed = checksum(payload.as_bytes());
    if computed != carried {
        return Err(NmeaError::ChecksumMismatch { computed, carried });
    }
    Ok(computed)
}
