use crate::{RequestInfo, UploadSession};

/// Whether decoding goes on after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl Flow {
    pub fn is_stop(self) -> bool {
        self == Flow::Stop
    }
}

/// Lifecycle callbacks of an upload.
///
/// Every method has a default, so an empty implementation decodes the whole
/// body, collects the text fields into [`UploadSession::params`] and drops
/// file content. Override only the hooks you need; most handlers implement
/// [`on_file_field`](EventHandler::on_file_field) to pick a sink.
///
/// Callbacks run on the thread (or task) driving the upload, one part at a
/// time, so no synchronization is needed between them.
///
/// # Examples
///
/// ```
/// use std::path::Path;
///
/// use formstream::{EventHandler, Flow, UploadSession};
///
/// struct SaveToTmp;
///
/// impl EventHandler for SaveToTmp {
///     fn on_file_field(&mut self, session: &mut UploadSession, file_name: &str) -> formstream::Result<Flow> {
///         if let Some(name) = Path::new(file_name).file_name() {
///             session.create_file(std::env::temp_dir().join(name))?;
///         }
///         Ok(Flow::Continue)
///     }
/// }
/// ```
pub trait EventHandler {
    /// Runs before anything is read; [`Flow::Stop`] skips the upload.
    fn pre_work(&mut self, _request: &RequestInfo) -> crate::Result<Flow> {
        Ok(Flow::Continue)
    }

    /// The declared content length is missing, zero, or above the upload
    /// limit. Nothing of the body has been read yet. The default rejects the
    /// upload.
    fn on_file_size_exceed(&mut self, _request: &RequestInfo) -> crate::Result<Flow> {
        Ok(Flow::Stop)
    }

    /// A text field is complete. Its value is already recorded in the session.
    fn on_text_field(&mut self, _session: &mut UploadSession, _name: &str, _value: &str) -> crate::Result<Flow> {
        Ok(Flow::Continue)
    }

    /// A file part starts. Install a sink on the session before returning
    /// to receive its bytes.
    ///
    /// `file_name` comes from the client. Only a backslash separated path prefix
    /// is removed, so it may still hold `..` or an absolute path; do not
    /// join it to a directory unchecked.
    fn on_file_field(&mut self, _session: &mut UploadSession, _file_name: &str) -> crate::Result<Flow> {
        Ok(Flow::Continue)
    }

    /// A chunk of file content, at most one buffer long. The default writes it to the session sink.
    fn on_file_bytes(&mut self, session: &mut UploadSession, chunk: &[u8]) -> crate::Result<()> {
        session.write_to_sink(chunk)
    }

    /// The file part is complete and its sink has been closed.
    fn on_file_end(&mut self, _session: &mut UploadSession) -> crate::Result<()> {
        Ok(())
    }

    /// The terminal boundary was reached and every part was delivered.
    fn on_upload_finish(&mut self, _session: &mut UploadSession) -> crate::Result<()> {
        Ok(())
    }

    /// The body ended early or decoding failed. The sink is already closed;
    /// the default removes the partially written file.
    fn on_request_input_stream_interrupt(&mut self, session: &mut UploadSession) -> crate::Result<()> {
        session.remove_partial_file()
    }

    /// Decoding failed. The sink is already closed. [`Flow::Continue`] runs
    /// [`on_request_input_stream_interrupt`](EventHandler::on_request_input_stream_interrupt)
    /// next, [`Flow::Stop`] returns right away.
    fn on_error(&mut self, _session: &mut UploadSession, _error: &crate::Error) -> Flow {
        Flow::Continue
    }
}

/// Handler relying on every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl EventHandler for DefaultHandler {}

impl<H: EventHandler + ?Sized> EventHandler for &mut H {
    fn pre_work(&mut self, request: &RequestInfo) -> crate::Result<Flow> {
        (**self).pre_work(request)
    }

    fn on_file_size_exceed(&mut self, request: &RequestInfo) -> crate::Result<Flow> {
        (**self).on_file_size_exceed(request)
    }

    fn on_text_field(&mut self, session: &mut UploadSession, name: &str, value: &str) -> crate::Result<Flow> {
        (**self).on_text_field(session, name, value)
    }

    fn on_file_field(&mut self, session: &mut UploadSession, file_name: &str) -> crate::Result<Flow> {
        (**self).on_file_field(session, file_name)
    }

    fn on_file_bytes(&mut self, session: &mut UploadSession, chunk: &[u8]) -> crate::Result<()> {
        (**self).on_file_bytes(session, chunk)
    }

    fn on_file_end(&mut self, session: &mut UploadSession) -> crate::Result<()> {
        (**self).on_file_end(session)
    }

    fn on_upload_finish(&mut self, session: &mut UploadSession) -> crate::Result<()> {
        (**self).on_upload_finish(session)
    }

    fn on_request_input_stream_interrupt(&mut self, session: &mut UploadSession) -> crate::Result<()> {
        (**self).on_request_input_stream_interrupt(session)
    }

    fn on_error(&mut self, session: &mut UploadSession, error: &crate::Error) -> Flow {
        (**self).on_error(session, error)
    }
}
