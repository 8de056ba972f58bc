use std::fmt::{self, Debug, Display, Formatter};

use derive_more::Display;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while decoding a multipart upload and
/// while handing its content to an [`EventHandler`](crate::EventHandler).
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// The headers of a part could not be read completely, either because
    /// they grew past the configured limit or because a boundary showed up
    /// before the blank line ending them.
    #[display(fmt = "failed to read field complete headers")]
    IncompleteHeaders,

    /// Failed to read headers.
    #[display(fmt = "failed to read headers: {}", _0)]
    ReadHeaderFailed(httparse::Error),

    /// Failed to decode the field's raw header name to
    /// [`HeaderName`](http::header::HeaderName) type.
    #[display(fmt = "failed to decode field's raw header name: {:?} {}", name, cause)]
    DecodeHeaderName { name: String, cause: BoxError },

    /// Failed to decode the field's raw header value to
    /// [`HeaderValue`](http::header::HeaderValue) type.
    #[display(fmt = "failed to decode field's raw header value: {}", cause)]
    DecodeHeaderValue { value: Vec<u8>, cause: BoxError },

    /// The first header line of a part is not a `Content-Disposition` line
    /// carrying either a `name` or a `filename` parameter.
    #[display(fmt = "malformed Content-Disposition line: {:?}", line)]
    MalformedDisposition { line: String },

    /// A text field grew past the configured in-memory limit.
    #[display(
        fmt = "field '{}' exceeded the maximum size limit: {} bytes",
        "field_name.as_deref().unwrap_or(\"<unknown>\")",
        limit
    )]
    FieldSizeExceeded { limit: u64, field_name: Option<String> },

    /// More bytes were read from the request body than the upload limit allows.
    #[display(fmt = "stream size exceeded the maximum limit: {} bytes", limit)]
    StreamSizeExceeded { limit: u64 },

    /// Stream read failed.
    #[display(fmt = "stream read failed: {}", _0)]
    StreamReadFailed(BoxError),

    /// Writing to, flushing or removing a file sink failed.
    #[display(fmt = "sink i/o failed: {}", _0)]
    Io(std::io::Error),

    /// An event handler reported its own failure.
    #[display(fmt = "event handler failed: {}", _0)]
    Handler(BoxError),

    /// Failed to decode an upload configuration from `JSON` in
    /// [`UploadConfig::from_json`](crate::UploadConfig::from_json).
    #[cfg(feature = "json")]
    #[display(fmt = "failed to decode upload config as JSON: {}", _0)]
    DecodeJson(serde_json::Error),
}

impl Error {
    /// Wraps an arbitrary error raised inside an event handler.
    pub fn handler<E>(err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error::Handler(err.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::FieldSizeExceeded {
            limit: 10,
            field_name: Some("comment".to_owned()),
        };
        assert_eq!(
            err.to_string(),
            "field 'comment' exceeded the maximum size limit: 10 bytes"
        );

        let err = Error::FieldSizeExceeded {
            limit: 10,
            field_name: None,
        };
        assert_eq!(
            err.to_string(),
            "field '<unknown>' exceeded the maximum size limit: 10 bytes"
        );

        let err = Error::handler("disk full");
        assert_eq!(err.to_string(), "event handler failed: disk full");
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "broken pipe").into();
        assert_eq!(err, Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "broken pipe")));
    }
}
