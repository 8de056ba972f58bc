use std::borrow::Cow;
use std::convert::TryFrom;

use encoding_rs::{Encoding, UTF_8};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use httparse::Header;

use crate::constants;

pub(crate) fn convert_raw_headers_to_header_map(raw_headers: &[Header]) -> crate::Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(raw_headers.len());

    for raw_header in raw_headers {
        let name = HeaderName::try_from(raw_header.name).map_err(|err| crate::Error::DecodeHeaderName {
            name: raw_header.name.to_owned(),
            cause: err.into(),
        })?;

        let value = HeaderValue::try_from(raw_header.value).map_err(|err| crate::Error::DecodeHeaderValue {
            value: raw_header.value.to_owned(),
            cause: err.into(),
        })?;

        headers.insert(name, value);
    }

    Ok(headers)
}

/// Parses a complete part header block, CRLF terminated lines without the
/// trailing blank line.
pub(crate) fn parse_part_headers(block: &[u8]) -> crate::Result<HeaderMap> {
    let mut raw = Vec::with_capacity(block.len() + 2);
    raw.extend_from_slice(block);
    raw.extend_from_slice(constants::CRLF.as_bytes());

    let mut headers = [httparse::EMPTY_HEADER; constants::MAX_HEADERS];

    match httparse::parse_headers(&raw, &mut headers) {
        Ok(httparse::Status::Complete((_, raw_headers))) => convert_raw_headers_to_header_map(raw_headers),
        Ok(httparse::Status::Partial) => Err(crate::Error::IncompleteHeaders),
        Err(err) => Err(crate::Error::ReadHeaderFailed(err)),
    }
}

pub(crate) fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(bytes);

    match text {
        Cow::Owned(s) => s,
        Cow::Borrowed(s) => String::from(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_part_headers() {
        let block = b"Content-Disposition: form-data; name=\"a\"; filename=\"a.txt\"\r\nContent-Type: text/plain\r\n";
        let headers = parse_part_headers(block).unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(http::header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_parse_part_headers_rejects_garbage() {
        assert!(parse_part_headers(b"not a header\r\n").is_err());
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text("你好".as_bytes(), None), "你好");
        assert_eq!(decode_text(&[0xe9], Some("iso-8859-1")), "é");
        assert_eq!(decode_text(b"plain", Some("no-such-charset")), "plain");
    }
}
