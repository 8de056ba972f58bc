use formstream::{EventHandler, Flow, RequestInfo, Upload, UploadSession};
use tokio::io::AsyncRead;

// Prints every field as it is decoded.
struct Printer;

impl EventHandler for Printer {
    fn on_text_field(&mut self, _: &mut UploadSession, name: &str, value: &str) -> formstream::Result<Flow> {
        println!("Text field {:?}: {:?}", name, value);
        Ok(Flow::Continue)
    }

    fn on_file_field(&mut self, session: &mut UploadSession, file_name: &str) -> formstream::Result<Flow> {
        println!(
            "File field {:?}: {:?} ({:?})",
            session.current_field_name(),
            file_name,
            session.content_type()
        );
        Ok(Flow::Continue)
    }

    fn on_file_bytes(&mut self, _: &mut UploadSession, chunk: &[u8]) -> formstream::Result<()> {
        println!("Chunk: {:?}", String::from_utf8_lossy(chunk));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate an `AsyncRead` and the request headers from somewhere e.g. server request.
    let (reader, request) = get_async_reader_from_somewhere().await;

    let mut upload = Upload::new(Printer);
    let summary = upload.process_async_read(&request, reader).await?;

    println!("{:?}", summary);

    Ok(())
}

async fn get_async_reader_from_somewhere() -> (impl AsyncRead, RequestInfo) {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"My Field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"File Field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";

    let request = RequestInfo::new()
        .content_length(data.len() as u64)
        .content_type("multipart/form-data; boundary=X-BOUNDARY");

    (data.as_bytes(), request)
}
