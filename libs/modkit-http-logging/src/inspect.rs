//! Header and body heuristics used to decide what gets logged.

use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, Method, StatusCode};

/// Number of leading bytes sampled by [`is_plaintext`]
pub const PLAINTEXT_SAMPLE_BYTES: usize = 64;

/// Number of code points inspected by [`is_plaintext`]
pub const PLAINTEXT_SAMPLE_CODE_POINTS: usize = 16;

/// Returns true if the body probably contains human readable text.
///
/// Decodes up to 16 code points from the first 64 bytes and rejects control
/// characters commonly found in binary file signatures. Malformed UTF-8
/// decodes as U+FFFD and does not disqualify the body, so single-byte
/// charsets such as Latin-1 still count as text. A multi-byte sequence cut
/// short by the end of the sample does. The slice is only borrowed, so
/// callers keep the full body.
#[must_use]
pub fn is_plaintext(body: &[u8]) -> bool {
    let sample = &body[..body.len().min(PLAINTEXT_SAMPLE_BYTES)];
    let mut seen = 0;
    let mut offset = 0;
    for chunk in sample.utf8_chunks() {
        for c in chunk.valid().chars() {
            if seen == PLAINTEXT_SAMPLE_CODE_POINTS {
                return true;
            }
            if is_binary_char(c) {
                return false;
            }
            seen += 1;
        }
        offset += chunk.valid().len();

        let Some(&lead) = chunk.invalid().first() else {
            continue;
        };
        if seen == PLAINTEXT_SAMPLE_CODE_POINTS {
            return true;
        }
        if offset + utf8_width(lead) > sample.len() {
            return false;
        }
        seen += 1;
        offset += chunk.invalid().len();
    }
    true
}

/// ISO control characters other than tab through carriage return and the
/// information separators U+001C..U+001F.
fn is_binary_char(c: char) -> bool {
    c.is_control() && !matches!(c, '\t'..='\r' | '\u{1c}'..='\u{1f}')
}

/// Sequence length announced by a UTF-8 lead byte, 1 for anything else.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

/// Returns true if the response must have a (possibly 0-length) body. See RFC 9110.
#[must_use]
pub fn has_body(method: &Method, status: StatusCode, headers: &HeaderMap) -> bool {
    // HEAD never yields a body regardless of the response headers.
    if *method == Method::HEAD {
        return false;
    }

    if !status.is_informational()
        && status != StatusCode::NO_CONTENT
        && status != StatusCode::NOT_MODIFIED
    {
        return true;
    }

    // Headers disagreeing with the status code mean a malformed response;
    // honor the headers.
    content_length(headers).is_some() || is_chunked(headers)
}

/// Parse `Content-Length`.
///
/// Returns `None` when the header is absent or not a non-negative integer.
#[must_use]
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Returns true if `Content-Encoding` is present and not `identity`.
#[must_use]
pub fn is_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .is_some_and(|value| !value.as_bytes().eq_ignore_ascii_case(b"identity"))
}

fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get(TRANSFER_ENCODING)
        .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"chunked"))
}
