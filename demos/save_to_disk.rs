use std::path::{Path, PathBuf};

use formstream::{EventHandler, Flow, Outcome, RequestInfo, Upload, UploadConfig, UploadSession};

// Stores every uploaded file under a directory, named after the client file name.
struct SaveToDir {
    dir: PathBuf,
    saved: Vec<PathBuf>,
}

impl EventHandler for SaveToDir {
    fn on_file_field(&mut self, session: &mut UploadSession, file_name: &str) -> formstream::Result<Flow> {
        // None for an unused file input or `..`; directories in the client path are dropped.
        let name = match Path::new(file_name).file_name() {
            Some(name) => name,
            None => return Ok(Flow::Continue),
        };

        let path = self.dir.join(name);
        session.create_file(&path)?;
        self.saved.push(path);
        Ok(Flow::Continue)
    }

    fn on_error(&mut self, _: &mut UploadSession, error: &formstream::Error) -> Flow {
        eprintln!("upload failed: {}", error);
        Flow::Continue
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let body = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nholiday\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"C:\\Photos\\beach.txt\"\r\nContent-Type: text/plain\r\n\r\nsand\r\nsea\r\n--X-BOUNDARY--\r\n";

    let request = RequestInfo::new()
        .content_length(body.len() as u64)
        .content_type("multipart/form-data; boundary=X-BOUNDARY")
        .user_agent("Mozilla/5.0");

    let handler = SaveToDir {
        dir: std::env::temp_dir(),
        saved: Vec::new(),
    };

    let config = UploadConfig::new().buffer_size(4096).cpu_limit(16).buf_sleep_ms(1);
    let mut upload = Upload::with_config(handler, config);
    let summary = upload.process(&request, body.as_bytes())?;

    assert_eq!(summary.outcome, Outcome::Finished);
    println!("title: {:?}", summary.params.get("title"));
    println!("saved: {:?}", upload.handler().saved);

    Ok(())
}
