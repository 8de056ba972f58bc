use std::collections::HashMap;
use std::io::{self, Read};
use std::thread;

#[cfg(feature = "tokio-io")]
use bytes::Bytes;
#[cfg(feature = "tokio-io")]
use futures_util::stream::{Stream, StreamExt};
#[cfg(feature = "tokio-io")]
use tokio::io::AsyncRead;
#[cfg(feature = "tokio-io")]
use tokio_util::io::ReaderStream;

use crate::decoder::{Decoder, Progress};
use crate::handler::{EventHandler, Flow};
use crate::state::UploadSession;
use crate::throttle::{FlushThrottle, Throttle};
use crate::{RequestInfo, UploadConfig};

/// How an upload ended when no fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The terminal boundary was reached and every part was delivered.
    Finished,
    /// A callback returned [`Flow::Stop`].
    Stopped,
    /// The declared size check failed and the handler declined the upload.
    Rejected,
    /// The body ended before the terminal boundary.
    Interrupted,
    /// The content type is not `multipart/form-data; boundary=...`; nothing was read.
    NotMultipart,
}

/// Result of a completed [`Upload`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub outcome: Outcome,
    /// Text fields by name.
    pub params: HashMap<String, String>,
    pub total_bytes_written: u64,
    pub flush_count: u64,
}

impl UploadSummary {
    fn empty(outcome: Outcome) -> Self {
        UploadSummary {
            outcome,
            params: HashMap::new(),
            total_bytes_written: 0,
            flush_count: 0,
        }
    }

    fn from_session(outcome: Outcome, mut session: UploadSession) -> Self {
        UploadSummary {
            outcome,
            params: std::mem::take(&mut session.para_map),
            total_bytes_written: session.total_bytes_written,
            flush_count: session.flush_count,
        }
    }
}

enum Start {
    Decode(Decoder),
    Done(UploadSummary),
}

/// Decodes `multipart/form-data` request bodies into [`EventHandler`] callbacks.
///
/// One `Upload` can process any number of requests, one after the other;
/// every run gets a fresh [`UploadSession`]. File content is never held in
/// memory beyond one buffer.
///
/// # Examples
///
/// ```
/// use formstream::{DefaultHandler, Outcome, RequestInfo, Upload};
///
/// # fn run() -> formstream::Result<()> {
/// let body = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let request = RequestInfo::new()
///     .content_length(body.len() as u64)
///     .content_type("multipart/form-data; boundary=X-BOUNDARY");
///
/// let mut upload = Upload::new(DefaultHandler);
/// let summary = upload.process(&request, body.as_bytes())?;
///
/// assert_eq!(summary.outcome, Outcome::Finished);
/// assert_eq!(summary.params["my_text_field"], "abcd");
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
pub struct Upload<H, T = FlushThrottle> {
    handler: H,
    throttle: T,
    config: UploadConfig,
}

impl<H: EventHandler> Upload<H, FlushThrottle> {
    /// Creates an upload with the default configuration.
    pub fn new(handler: H) -> Upload<H, FlushThrottle> {
        Upload::with_config(handler, UploadConfig::default())
    }

    /// Creates an upload whose throttle follows `cpu_limit` and `buf_sleep` of the config.
    pub fn with_config(handler: H, config: UploadConfig) -> Upload<H, FlushThrottle> {
        Upload {
            handler,
            throttle: FlushThrottle::from_config(&config),
            config,
        }
    }
}

impl<H: EventHandler, T: Throttle> Upload<H, T> {
    /// Replaces the throttle policy.
    pub fn throttle<U: Throttle>(self, throttle: U) -> Upload<H, U> {
        Upload {
            handler: self.handler,
            throttle,
            config: self.config,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Decodes a request body read from a blocking reader.
    ///
    /// Faults are reported to [`EventHandler::on_error`] first and then
    /// returned as `Err`.
    pub fn process<R: Read>(&mut self, request: &RequestInfo, mut reader: R) -> crate::Result<UploadSummary> {
        let mut decoder = match self.begin(request)? {
            Start::Decode(decoder) => decoder,
            Start::Done(summary) => return Ok(summary),
        };

        let mut chunk = vec![0u8; decoder.read_size()];

        let progress = loop {
            let step = match reader.read(&mut chunk) {
                Ok(0) => decoder.finish(&mut self.handler, &mut self.throttle),
                Ok(n) => decoder.feed(&chunk[..n], &mut self.handler, &mut self.throttle),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => Err(crate::Error::StreamReadFailed(err.into())),
            };

            if let Some(pause) = decoder.take_pause() {
                thread::sleep(pause);
            }

            match step {
                Ok(Progress::Pending) => continue,
                other => break other,
            }
        };

        self.settle(decoder, progress)
    }

    /// Decodes a request body arriving as a stream of byte chunks.
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    #[cfg(feature = "tokio-io")]
    pub async fn process_stream<S, O, E>(&mut self, request: &RequestInfo, stream: S) -> crate::Result<UploadSummary>
    where
        S: Stream<Item = Result<O, E>>,
        O: Into<Bytes>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut decoder = match self.begin(request)? {
            Start::Decode(decoder) => decoder,
            Start::Done(summary) => return Ok(summary),
        };

        futures_util::pin_mut!(stream);

        let progress = loop {
            let step = match stream.next().await {
                Some(Ok(data)) => {
                    let data: Bytes = data.into();
                    decoder.feed(&data, &mut self.handler, &mut self.throttle)
                }
                Some(Err(err)) => Err(crate::Error::StreamReadFailed(err.into())),
                None => decoder.finish(&mut self.handler, &mut self.throttle),
            };

            if let Some(pause) = decoder.take_pause() {
                tokio::time::sleep(pause).await;
            }

            match step {
                Ok(Progress::Pending) => continue,
                other => break other,
            }
        };

        self.settle(decoder, progress)
    }

    /// Decodes a request body read from an [`AsyncRead`].
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    #[cfg(feature = "tokio-io")]
    pub async fn process_async_read<R>(&mut self, request: &RequestInfo, reader: R) -> crate::Result<UploadSummary>
    where
        R: AsyncRead,
    {
        let capacity = self.config.effective_buffer_size();
        self.process_stream(request, ReaderStream::with_capacity(reader, capacity))
            .await
    }

    fn begin(&mut self, request: &RequestInfo) -> crate::Result<Start> {
        if self.handler.pre_work(request)?.is_stop() {
            return Ok(Start::Done(UploadSummary::empty(Outcome::Stopped)));
        }

        let limit = self.config.max_upload_size;
        let mut unlimited = false;

        match request.declared_length() {
            Some(length) if length > 0 && length <= limit => {}
            declared => {
                log::debug!("declared length {:?} outside (0, {}]", declared, limit);

                if self.handler.on_file_size_exceed(request)? == Flow::Stop {
                    return Ok(Start::Done(UploadSummary::empty(Outcome::Rejected)));
                }
                unlimited = true;
            }
        }

        let boundary = match request.boundary() {
            Some(boundary) => boundary,
            None => {
                log::debug!("not a multipart upload: {:?}", request.get_content_type());
                return Ok(Start::Done(UploadSummary::empty(Outcome::NotMultipart)));
            }
        };

        let decoder = Decoder::new(boundary, &self.config, request.is_legacy_client());

        Ok(Start::Decode(if unlimited { decoder.unlimited() } else { decoder }))
    }

    fn settle(&mut self, decoder: Decoder, progress: crate::Result<Progress>) -> crate::Result<UploadSummary> {
        let mut session = decoder.into_session();

        match progress {
            Ok(Progress::Finished) => {
                if let Err(err) = session.close_sink() {
                    return self.fail(session, err, true);
                }
                log::debug!(
                    "upload finished: {} fields, {} file bytes",
                    session.para_map.len(),
                    session.total_bytes_written
                );

                match self.handler.on_upload_finish(&mut session) {
                    Ok(()) => Ok(UploadSummary::from_session(Outcome::Finished, session)),
                    Err(err) => self.fail(session, err, true),
                }
            }
            Ok(Progress::Stopped) => {
                if let Err(err) = session.close_sink() {
                    return self.fail(session, err, true);
                }
                log::debug!("upload stopped by handler in {:?}", session.state());

                Ok(UploadSummary::from_session(Outcome::Stopped, session))
            }
            Ok(Progress::Pending) | Ok(Progress::Interrupted) => {
                if let Err(err) = session.close_sink() {
                    log::warn!("failed to close sink of interrupted upload: {}", err);
                }

                match self.handler.on_request_input_stream_interrupt(&mut session) {
                    Ok(()) => Ok(UploadSummary::from_session(Outcome::Interrupted, session)),
                    // The cleanup hook itself failed; it is not run a second time.
                    Err(err) => self.fail(session, err, false),
                }
            }
            Err(err) => self.fail(session, err, true),
        }
    }

    /// Reports a fault to the handler, runs the cleanup hook unless the
    /// handler stops, and returns the fault.
    fn fail(&mut self, mut session: UploadSession, err: crate::Error, cleanup: bool) -> crate::Result<UploadSummary> {
        log::warn!("upload failed in {:?}: {}", session.state(), err);

        if let Err(close_err) = session.close_sink() {
            log::warn!("failed to close sink of failed upload: {}", close_err);
        }

        if self.handler.on_error(&mut session, &err) == Flow::Continue && cleanup {
            if let Err(cleanup_err) = self.handler.on_request_input_stream_interrupt(&mut session) {
                log::warn!("cleanup after failed upload failed: {}", cleanup_err);
            }
        }

        Err(err)
    }
}
