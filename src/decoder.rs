use std::time::Duration;

use bytes::BytesMut;

use crate::boundary::{BoundaryMatcher, LineKind};
use crate::buffer::ByteBuffer;
use crate::constants;
use crate::content_disposition::ContentDisposition;
use crate::handler::{EventHandler, Flow};
use crate::helpers;
use crate::state::{ParseState, UploadSession};
use crate::throttle::Throttle;
use crate::UploadConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    /// More input is needed.
    Pending,
    Finished,
    Stopped,
    Interrupted,
}

/// The field state machine.
///
/// Input is pushed in arbitrary chunks with [`feed`](Decoder::feed) and the
/// end of input is signalled with [`finish`](Decoder::finish). Lines are
/// recognized on CRLF; header lines are handled one at a time while part
/// content goes through the [`ByteBuffer`], whose tentative region holds
/// the current line (and the CRLF before it) until the line is known not
/// to be a boundary.
pub(crate) struct Decoder {
    session: UploadSession,
    buffer: ByteBuffer,
    matcher: BoundaryMatcher,
    header_block: BytesMut,
    // Start of a header line that did not fit the buffer.
    header_line: BytesMut,
    text: BytesMut,
    // A CR was the last byte seen; whether it ends a line depends on the next one.
    pending_cr: bool,
    // The current line started at a line start and is short enough to be a boundary.
    candidate: bool,
    legacy_client: bool,
    max_upload_size: u64,
    max_text_field_size: u64,
    max_header_size: usize,
    bytes_read: u64,
    pause: Duration,
}

impl Decoder {
    pub fn new(boundary: String, config: &UploadConfig, legacy_client: bool) -> Self {
        let matcher = BoundaryMatcher::new(&boundary);
        // Room for a full boundary line plus the CRLF around it after a flush.
        let capacity = std::cmp::max(config.effective_buffer_size(), matcher.max_line_len() + 4);

        Decoder {
            session: UploadSession::new(boundary),
            buffer: ByteBuffer::new(capacity),
            matcher,
            header_block: BytesMut::new(),
            header_line: BytesMut::new(),
            text: BytesMut::new(),
            pending_cr: false,
            candidate: true,
            legacy_client,
            max_upload_size: config.max_upload_size,
            max_text_field_size: config.max_text_field_size,
            max_header_size: config.max_header_size,
            bytes_read: 0,
            pause: Duration::default(),
        }
    }

    /// Lifts the limit on bytes read, for uploads a handler accepted despite their size.
    pub fn unlimited(mut self) -> Self {
        self.max_upload_size = u64::MAX;
        self
    }

    pub fn read_size(&self) -> usize {
        self.buffer.capacity()
    }

    #[cfg(test)]
    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn into_session(self) -> UploadSession {
        self.session
    }

    /// Throttle pauses accumulated since the last call.
    pub fn take_pause(&mut self) -> Option<Duration> {
        let pause = std::mem::take(&mut self.pause);
        if pause == Duration::default() {
            None
        } else {
            Some(pause)
        }
    }

    pub fn feed<H, T>(&mut self, mut data: &[u8], handler: &mut H, throttle: &mut T) -> crate::Result<Progress>
    where
        H: EventHandler,
        T: Throttle,
    {
        if self.session.state == ParseState::Terminal {
            return Ok(Progress::Finished);
        }

        self.bytes_read += data.len() as u64;
        if self.bytes_read > self.max_upload_size {
            return Err(crate::Error::StreamSizeExceeded {
                limit: self.max_upload_size,
            });
        }

        while !data.is_empty() {
            if self.pending_cr {
                self.pending_cr = false;

                if data[0] == constants::LF {
                    data = &data[1..];
                    match self.end_of_line(handler, throttle)? {
                        Progress::Pending => continue,
                        progress => return Ok(progress),
                    }
                }

                // A lone CR is content; the current byte is looked at again below.
                self.append(&[constants::CR], handler, throttle)?;
            }

            match memchr::memchr(constants::CR, data) {
                Some(idx) => {
                    self.append(&data[..idx], handler, throttle)?;
                    self.pending_cr = true;
                    data = &data[idx + 1..];
                }
                None => {
                    self.append(data, handler, throttle)?;
                    break;
                }
            }
        }

        Ok(Progress::Pending)
    }

    /// Handles the end of the input stream.
    pub fn finish<H, T>(&mut self, handler: &mut H, throttle: &mut T) -> crate::Result<Progress>
    where
        H: EventHandler,
        T: Throttle,
    {
        if self.session.state == ParseState::Terminal {
            return Ok(Progress::Finished);
        }

        if self.pending_cr {
            self.pending_cr = false;
            self.append(&[constants::CR], handler, throttle)?;
        }

        // Some clients omit the CRLF after the terminal boundary.
        if self.candidate
            && self.matcher.classify(self.buffer.line(self.session.pending_crlf)) == LineKind::TerminalBoundary
        {
            return self.end_of_line(handler, throttle);
        }

        if self.session.state == ParseState::ReadingTextValue && self.legacy_client {
            log::debug!("delivering unterminated text field of a legacy client");

            if self.buffer.line(self.session.pending_crlf).is_empty() {
                self.buffer.discard_tentative();
            } else {
                self.buffer.confirm_all();
            }
            self.session.pending_crlf = false;

            let flow = self.close_part(handler, throttle)?;
            self.session.state = ParseState::Terminal;

            return Ok(if flow.is_stop() {
                Progress::Stopped
            } else {
                Progress::Finished
            });
        }

        log::debug!("stream ended before the terminal boundary in {:?}", self.session.state);
        Ok(Progress::Interrupted)
    }

    fn append<H, T>(&mut self, mut data: &[u8], handler: &mut H, throttle: &mut T) -> crate::Result<()>
    where
        H: EventHandler,
        T: Throttle,
    {
        while !data.is_empty() {
            if self.buffer.is_full() {
                self.make_room(handler, throttle)?;
            }

            let n = self.buffer.fill(data);
            data = &data[n..];
        }

        Ok(())
    }

    fn make_room<H, T>(&mut self, handler: &mut H, throttle: &mut T) -> crate::Result<()>
    where
        H: EventHandler,
        T: Throttle,
    {
        match self.session.state {
            ParseState::AwaitingBoundary | ParseState::Terminal => {
                self.buffer.clear();
                self.candidate = false;
            }
            ParseState::ReadingHeaderLine | ParseState::SkipToFileBody | ParseState::SkipToValueBody => {
                let line = self.buffer.line(false);

                if self.header_block.len() + self.header_line.len() + line.len() > self.max_header_size {
                    return Err(crate::Error::IncompleteHeaders);
                }

                self.header_line.extend_from_slice(line);
                self.buffer.clear();
                self.candidate = false;
            }
            ParseState::ReadingFileBytes | ParseState::ReadingTextValue => {
                let line_len = self.buffer.line(self.session.pending_crlf).len();

                if !self.candidate || line_len > self.matcher.max_line_len() {
                    self.candidate = false;
                    self.session.pending_crlf = false;
                    self.buffer.confirm_all();
                }

                self.flush(handler, throttle)?;
            }
        }

        Ok(())
    }

    /// Hands the confirmed region of the buffer to the open part.
    fn flush<H, T>(&mut self, handler: &mut H, throttle: &mut T) -> crate::Result<()>
    where
        H: EventHandler,
        T: Throttle,
    {
        let chunk = self.buffer.confirmed();

        if !chunk.is_empty() {
            match self.session.state {
                ParseState::ReadingTextValue => {
                    if (self.text.len() + chunk.len()) as u64 > self.max_text_field_size {
                        return Err(crate::Error::FieldSizeExceeded {
                            limit: self.max_text_field_size,
                            field_name: self.session.current_field_name.clone(),
                        });
                    }
                    self.text.extend_from_slice(chunk);
                }
                ParseState::ReadingFileBytes => {
                    handler.on_file_bytes(&mut self.session, chunk)?;

                    self.session.total_bytes_written += chunk.len() as u64;
                    self.session.flush_count += 1;

                    if let Some(pause) = throttle.on_flush(self.session.flush_count, chunk.len()) {
                        log::trace!("pausing {:?} after flush #{}", pause, self.session.flush_count);
                        self.pause += pause;
                    }
                }
                _ => {}
            }
        }

        self.buffer.consume_confirmed();
        Ok(())
    }

    fn end_of_line<H, T>(&mut self, handler: &mut H, throttle: &mut T) -> crate::Result<Progress>
    where
        H: EventHandler,
        T: Throttle,
    {
        let kind = if self.candidate {
            self.matcher.classify(self.buffer.line(self.session.pending_crlf))
        } else {
            LineKind::Content
        };
        self.candidate = true;

        match kind {
            LineKind::PartBoundary | LineKind::TerminalBoundary => {
                self.buffer.discard_tentative();
                self.session.pending_crlf = false;

                let flow = self.close_part(handler, throttle)?;
                self.buffer.clear();

                if flow.is_stop() {
                    return Ok(Progress::Stopped);
                }

                if kind == LineKind::TerminalBoundary {
                    log::debug!("terminal boundary reached after {} bytes", self.bytes_read);
                    self.session.state = ParseState::Terminal;
                    return Ok(Progress::Finished);
                }

                self.header_block.clear();
                self.header_line.clear();
                self.session.state = ParseState::ReadingHeaderLine;
            }
            LineKind::Content => match self.session.state {
                ParseState::AwaitingBoundary | ParseState::Terminal => self.buffer.clear(),
                ParseState::ReadingHeaderLine => {
                    let line = self.take_header_line();
                    let disposition = ContentDisposition::classify(&line)?;
                    self.push_header_line(&line)?;

                    match disposition {
                        ContentDisposition::File { field_name, file_name } => {
                            self.session.current_field_name = field_name;
                            self.session.current_file_name = Some(file_name);
                            self.session.state = ParseState::SkipToFileBody;
                        }
                        ContentDisposition::Text { field_name } => {
                            self.session.current_field_name = Some(field_name);
                            self.session.current_file_name = None;
                            self.session.state = ParseState::SkipToValueBody;
                        }
                    }
                }
                ParseState::SkipToFileBody | ParseState::SkipToValueBody => {
                    let line = self.take_header_line();

                    if line.is_empty() {
                        return self.begin_body(handler);
                    }
                    self.push_header_line(&line)?;
                }
                ParseState::ReadingFileBytes | ParseState::ReadingTextValue => {
                    self.buffer.confirm_all();
                    self.defer_crlf(handler, throttle)?;
                }
            },
        }

        Ok(Progress::Pending)
    }

    /// The complete header line, including any part spilled out of the buffer.
    fn take_header_line(&mut self) -> BytesMut {
        let mut line = std::mem::take(&mut self.header_line);
        line.extend_from_slice(self.buffer.line(false));
        self.buffer.clear();
        line
    }

    fn push_header_line(&mut self, line: &[u8]) -> crate::Result<()> {
        if self.header_block.len() + line.len() + constants::CRLF.len() > self.max_header_size {
            return Err(crate::Error::IncompleteHeaders);
        }

        self.header_block.extend_from_slice(line);
        self.header_block.extend_from_slice(constants::CRLF.as_bytes());
        Ok(())
    }

    fn begin_body<H: EventHandler>(&mut self, handler: &mut H) -> crate::Result<Progress> {
        self.session.part_headers = helpers::parse_part_headers(&self.header_block)?;
        self.header_block.clear();
        self.session.pending_crlf = false;

        if self.session.state == ParseState::SkipToFileBody {
            let file_name = self.session.current_file_name.clone().unwrap_or_default();
            log::debug!(
                "file field {:?} started: {:?}",
                self.session.current_field_name.as_deref().unwrap_or("<unknown>"),
                file_name
            );

            if handler.on_file_field(&mut self.session, &file_name)?.is_stop() {
                return Ok(Progress::Stopped);
            }
            self.session.state = ParseState::ReadingFileBytes;
        } else {
            self.text.clear();
            self.session.state = ParseState::ReadingTextValue;
        }

        Ok(Progress::Pending)
    }

    /// Holds back the CRLF ending a content line; it is emitted only if
    /// the next line turns out to be content too.
    fn defer_crlf<H, T>(&mut self, handler: &mut H, throttle: &mut T) -> crate::Result<()>
    where
        H: EventHandler,
        T: Throttle,
    {
        if self.buffer.remaining() < constants::CRLF.len() {
            self.flush(handler, throttle)?;
        }

        self.buffer.fill(constants::CRLF.as_bytes());
        self.session.pending_crlf = true;
        Ok(())
    }

    /// Closes the open part, if any, and fires its completion callback.
    fn close_part<H, T>(&mut self, handler: &mut H, throttle: &mut T) -> crate::Result<Flow>
    where
        H: EventHandler,
        T: Throttle,
    {
        let flow = match self.session.state {
            ParseState::AwaitingBoundary | ParseState::ReadingHeaderLine | ParseState::Terminal => Flow::Continue,
            ParseState::SkipToFileBody | ParseState::SkipToValueBody => {
                return Err(crate::Error::IncompleteHeaders);
            }
            ParseState::ReadingTextValue => {
                self.flush(handler, throttle)?;

                let name = self.session.current_field_name.clone().unwrap_or_default();
                let charset = self
                    .session
                    .content_type()
                    .and_then(|mime| mime.get_param(mime::CHARSET).map(|charset| charset.as_str().to_owned()));

                let value = helpers::decode_text(&self.text, charset.as_deref());
                self.text.clear();

                log::debug!("text field {:?} complete: {} bytes", name, value.len());
                self.session.para_map.insert(name.clone(), value.clone());

                handler.on_text_field(&mut self.session, &name, &value)?
            }
            ParseState::ReadingFileBytes => {
                self.flush(handler, throttle)?;
                self.session.close_sink()?;
                self.session.forget_file();

                log::debug!(
                    "file {:?} complete: {} bytes written so far",
                    self.session.current_file_name.as_deref().unwrap_or_default(),
                    self.session.total_bytes_written
                );

                handler.on_file_end(&mut self.session)?;
                Flow::Continue
            }
        };

        self.session.reset_part();
        self.session.state = ParseState::AwaitingBoundary;
        Ok(flow)
    }
}
