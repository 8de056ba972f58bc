use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use http::header::{self, HeaderMap};

/// Where the decoder currently is within the multipart body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Looking for the first boundary line, or between parts.
    AwaitingBoundary,
    /// Expecting the `Content-Disposition` line of a new part.
    ReadingHeaderLine,
    /// A file part was announced; skipping its remaining headers.
    SkipToFileBody,
    /// A text part was announced; skipping its remaining headers.
    SkipToValueBody,
    ReadingFileBytes,
    ReadingTextValue,
    /// The terminal boundary was seen.
    Terminal,
}

/// Mutable context of one multipart upload.
///
/// A session is created when the body starts being decoded and handed to
/// every [`EventHandler`](crate::EventHandler) callback. Only one part is
/// open at a time, so a single sink slot serves every file of the upload.
pub struct UploadSession {
    pub(crate) boundary: String,
    pub(crate) state: ParseState,
    pub(crate) current_field_name: Option<String>,
    pub(crate) current_file_name: Option<String>,
    pub(crate) part_headers: HeaderMap,
    pub(crate) para_map: HashMap<String, String>,
    pub(crate) total_bytes_written: u64,
    pub(crate) flush_count: u64,
    pub(crate) pending_crlf: bool,
    sink: Option<Box<dyn Write + Send>>,
    file: Option<PathBuf>,
}

impl UploadSession {
    pub(crate) fn new(boundary: String) -> Self {
        UploadSession {
            boundary,
            state: ParseState::AwaitingBoundary,
            current_field_name: None,
            current_file_name: None,
            part_headers: HeaderMap::new(),
            para_map: HashMap::new(),
            total_bytes_written: 0,
            flush_count: 0,
            pending_crlf: false,
            sink: None,
            file: None,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// The `name` of the part being read, if it has one.
    pub fn current_field_name(&self) -> Option<&str> {
        self.current_field_name.as_deref()
    }

    /// The client file name of the part being read, without any Windows path prefix.
    pub fn current_file_name(&self) -> Option<&str> {
        self.current_file_name.as_deref()
    }

    /// All headers of the part being read.
    pub fn part_headers(&self) -> &HeaderMap {
        &self.part_headers
    }

    pub fn content_type(&self) -> Option<mime::Mime> {
        self.part_headers
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<mime::Mime>().ok())
    }

    /// Text fields decoded so far. A repeated name keeps its last value.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.para_map
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.para_map.get(name).map(|val| val.as_str())
    }

    pub fn total_bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Whether a CRLF that ended the last content line is still held back.
    pub fn has_pending_crlf(&self) -> bool {
        self.pending_crlf
    }

    /// Installs the writer receiving the bytes of the current file part.
    pub fn set_sink<W>(&mut self, sink: W)
    where
        W: Write + Send + 'static,
    {
        self.sink = Some(Box::new(sink));
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Creates `path` and makes it the sink of the current file part.
    ///
    /// The file is remembered as a partial artifact until the part ends, so
    /// the default [`on_request_input_stream_interrupt`](crate::EventHandler::on_request_input_stream_interrupt)
    /// can remove it when the upload breaks off.
    pub fn create_file<P: AsRef<Path>>(&mut self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;

        self.set_sink(BufWriter::new(file));
        self.file = Some(path.to_path_buf());
        Ok(())
    }

    /// The file created for the current part, while it is still incomplete.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Writes a chunk to the sink. Without a sink the chunk is dropped.
    pub fn write_to_sink(&mut self, chunk: &[u8]) -> crate::Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(chunk)?;
        }
        Ok(())
    }

    /// Removes the partially written file, if any.
    pub fn remove_partial_file(&mut self) -> crate::Result<()> {
        if let Some(path) = self.file.take() {
            match fs::remove_file(&path) {
                Ok(()) => log::debug!("removed partial upload {}", path.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    pub(crate) fn close_sink(&mut self) -> crate::Result<()> {
        match self.sink.take() {
            Some(mut sink) => sink.flush().map_err(Into::into),
            None => Ok(()),
        }
    }

    /// Marks the current file as complete: it is no longer a partial artifact.
    pub(crate) fn forget_file(&mut self) {
        self.file = None;
    }

    pub(crate) fn reset_part(&mut self) {
        self.current_field_name = None;
        self.current_file_name = None;
        self.part_headers.clear();
    }
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("boundary", &self.boundary)
            .field("state", &self.state)
            .field("current_field_name", &self.current_field_name)
            .field("current_file_name", &self.current_file_name)
            .field("para_map", &self.para_map)
            .field("total_bytes_written", &self.total_bytes_written)
            .field("flush_count", &self.flush_count)
            .field("pending_crlf", &self.pending_crlf)
            .field("has_sink", &self.sink.is_some())
            .field("file", &self.file)
            .finish()
    }
}
