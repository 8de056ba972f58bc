#![no_main]

use formstream::{DefaultHandler, RequestInfo, Unthrottled, Upload, UploadConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let request = RequestInfo::new()
        .content_length(data.len() as u64 + 1)
        .content_type("multipart/form-data; boundary=X-BOUNDARY");

    let config = UploadConfig::new().max_text_field_size(64 * 1024);
    let mut upload = Upload::with_config(DefaultHandler, config).throttle(Unthrottled);

    // Feed the same input whole and split at every byte of a small prefix; all runs must agree.
    let whole = upload.process(&request, data).map(|summary| summary.params);

    for split in 1..data.len().min(16) {
        let reader = std::io::Read::chain(&data[..split], &data[split..]);
        let parts = upload.process(&request, reader).map(|summary| summary.params);
        assert_eq!(whole, parts);
    }
});
