//! A streaming `multipart/form-data` upload decoder driven by callbacks.
//!
//! The body is read forward once, through a single fixed-size buffer. Text
//! fields are decoded into memory, file content is handed to an
//! [`EventHandler`] chunk by chunk so it can be written to any sink. Only
//! one part is open at a time.
//!
//! # Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::path::Path;
//!
//! use formstream::{EventHandler, Flow, RequestInfo, Upload, UploadSession};
//!
//! struct Uploads;
//!
//! impl EventHandler for Uploads {
//!     fn on_file_field(&mut self, session: &mut UploadSession, file_name: &str) -> formstream::Result<Flow> {
//!         // Client file names are untrusted: keep the last path component only.
//!         if let Some(name) = Path::new(file_name).file_name() {
//!             session.create_file(Path::new("/var/uploads").join(name))?;
//!         }
//!         Ok(Flow::Continue)
//!     }
//!
//!     fn on_text_field(&mut self, _: &mut UploadSession, name: &str, value: &str) -> formstream::Result<Flow> {
//!         println!("{} = {}", name, value);
//!         Ok(Flow::Continue)
//!     }
//! }
//!
//! # fn run() -> formstream::Result<()> {
//! let request = RequestInfo::new()
//!     .content_length(1024)
//!     .content_type("multipart/form-data; boundary=X-BOUNDARY");
//! let body = File::open("body.bin")?;
//!
//! let summary = Upload::new(Uploads).process(&request, body)?;
//! println!("{:?}", summary.outcome);
//! # Ok(())
//! # }
//! ```
//!
//! ## Optional features
//!
//! * `tokio-io`: async drivers over a `Stream` of byte chunks or a tokio `AsyncRead`.
//! * `serde`: `Deserialize` for [`UploadConfig`].
//! * `json`: [`UploadConfig::from_json`].

pub use config::UploadConfig;
pub use error::Error;
pub use handler::{DefaultHandler, EventHandler, Flow};
pub use multipart::{Outcome, Upload, UploadSummary};
pub use request::RequestInfo;
pub use state::{ParseState, UploadSession};
pub use throttle::{FlushThrottle, Throttle, TokenBucket, Unthrottled};

mod boundary;
mod buffer;
mod config;
mod constants;
mod content_disposition;
mod decoder;
mod error;
mod handler;
mod helpers;
mod multipart;
mod request;
mod state;
pub mod throttle;

/// A Result type often returned from methods that can have `formstream` errors.
pub type Result<T> = std::result::Result<T, Error>;
