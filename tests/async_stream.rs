#![cfg(feature = "tokio-io")]

use std::convert::Infallible;
use std::io;

use bytes::Bytes;
use formstream::{EventHandler, Flow, Outcome, RequestInfo, Upload, UploadSession};
use futures_util::stream;

#[derive(Default)]
struct Collector {
    file_names: Vec<String>,
    file: Vec<u8>,
    interrupted: bool,
}

impl EventHandler for Collector {
    fn on_file_field(&mut self, _session: &mut UploadSession, file_name: &str) -> formstream::Result<Flow> {
        self.file_names.push(file_name.to_owned());
        Ok(Flow::Continue)
    }

    fn on_file_bytes(&mut self, _session: &mut UploadSession, chunk: &[u8]) -> formstream::Result<()> {
        self.file.extend_from_slice(chunk);
        Ok(())
    }

    fn on_request_input_stream_interrupt(&mut self, _session: &mut UploadSession) -> formstream::Result<()> {
        self.interrupted = true;
        Ok(())
    }
}

const BODY: &str = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_file_field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";

fn request() -> RequestInfo {
    RequestInfo::new()
        .content_length(BODY.len() as u64)
        .content_type("multipart/form-data; boundary=X-BOUNDARY")
}

#[tokio::test]
async fn test_stream_of_single_bytes() {
    let chunks: Vec<Result<Bytes, Infallible>> = BODY.chars().map(|ch| Ok(Bytes::from(ch.to_string()))).collect();

    let mut upload = Upload::new(Collector::default());
    let summary = upload.process_stream(&request(), stream::iter(chunks)).await.unwrap();

    assert_eq!(summary.outcome, Outcome::Finished);
    assert_eq!(summary.params["my_text_field"], "abcd");
    assert_eq!(summary.total_bytes_written, 30);

    let collector = upload.into_handler();
    assert_eq!(collector.file_names, vec!["a-text-file.txt"]);
    assert_eq!(collector.file, b"Hello world\nHello\r\nWorld\rAgain".to_vec());
}

#[tokio::test]
async fn test_async_read() {
    let mut upload = Upload::new(Collector::default());
    let summary = upload.process_async_read(&request(), BODY.as_bytes()).await.unwrap();

    assert_eq!(summary.outcome, Outcome::Finished);
    assert_eq!(upload.into_handler().file, b"Hello world\nHello\r\nWorld\rAgain".to_vec());
}

#[tokio::test]
async fn test_stream_error_is_reported() {
    let chunks = vec![
        Ok(Bytes::from(&BODY[..150])),
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection dropped")),
    ];

    let mut upload = Upload::new(Collector::default());
    let err = upload.process_stream(&request(), stream::iter(chunks)).await.unwrap_err();

    assert_eq!(err.to_string(), "stream read failed: connection dropped");
    assert!(upload.into_handler().interrupted);
}

#[tokio::test]
async fn test_stream_ending_early_is_interrupted() {
    let chunks: Vec<Result<&'static str, Infallible>> = vec![Ok(&BODY[..60]), Ok(&BODY[60..200])];

    let mut upload = Upload::new(Collector::default());
    let summary = upload.process_stream(&request(), stream::iter(chunks)).await.unwrap();

    assert_eq!(summary.outcome, Outcome::Interrupted);
    assert_eq!(summary.params["my_text_field"], "abcd");
    assert!(upload.into_handler().interrupted);
}
