use http::HeaderValue;
use std::borrow::Cow;

/// Character set used to render a logged body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    UsAscii,
    Latin1,
}

impl Charset {
    /// Resolve the `charset` parameter of a `Content-Type` value, defaulting to UTF-8.
    ///
    /// Unknown charsets also fall back to UTF-8.
    #[must_use]
    pub fn of(content_type: Option<&HeaderValue>) -> Self {
        content_type
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<mime::Mime>().ok())
            .and_then(|mime| {
                mime.get_param(mime::CHARSET)
                    .map(|charset| Self::from_label(charset.as_str()))
            })
            .unwrap_or(Self::Utf8)
    }

    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "us-ascii" | "ascii" => Self::UsAscii,
            "iso-8859-1" | "iso_8859-1" | "latin1" | "l1" => Self::Latin1,
            _ => Self::Utf8,
        }
    }

    /// Decode `body` for display. Undecodable bytes become `U+FFFD`.
    #[must_use]
    pub fn decode(self, body: &[u8]) -> Cow<'_, str> {
        match self {
            Self::Utf8 => String::from_utf8_lossy(body),
            Self::UsAscii => Cow::Owned(
                body.iter()
                    .map(|&b| {
                        if b.is_ascii() {
                            char::from(b)
                        } else {
                            char::REPLACEMENT_CHARACTER
                        }
                    })
                    .collect(),
            ),
            Self::Latin1 => Cow::Owned(body.iter().map(|&b| char::from(b)).collect()),
        }
    }
}
