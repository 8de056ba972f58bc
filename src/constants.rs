use lazy_static::lazy_static;
use regex::bytes::Regex;

pub(crate) const MIN_BUFFER_SIZE: usize = 1024;
pub(crate) const DEFAULT_MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;
pub(crate) const DEFAULT_CPU_LIMIT: u64 = 1024;
pub(crate) const DEFAULT_BUF_SLEEP_MS: u64 = 1;
pub(crate) const DEFAULT_MAX_TEXT_FIELD_SIZE: u64 = 1024 * 1024;
pub(crate) const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;

pub(crate) const MAX_HEADERS: usize = 32;
pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';
pub(crate) const CRLF: &str = "\r\n";

pub(crate) const LEGACY_AGENT_SIGNATURES: [&str; 2] = ["Shockwave", "Flash"];

lazy_static! {
    pub(crate) static ref MULTIPART_CONTENT_TYPE_RE: Regex =
        Regex::new(r"^multipart/form-data; boundary=(.+)$").unwrap();
    pub(crate) static ref CONTENT_DISPOSITION_LINE_RE: Regex =
        Regex::new(r"(?i-u)^content-disposition:").unwrap();
    pub(crate) static ref CONTENT_DISPOSITION_FIELD_NAME_RE: Regex =
        Regex::new(r#"(?-u)(?:^|[;\s])name="([^"]*)""#).unwrap();
    pub(crate) static ref CONTENT_DISPOSITION_FILE_NAME_RE: Regex =
        Regex::new(r#"(?-u)filename="([^"]*)""#).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_field_name_re() {
        let val = br#"form-data; name="my_field""#;
        let name = CONTENT_DISPOSITION_FIELD_NAME_RE.captures(val).unwrap();
        assert_eq!(name.get(1).unwrap().as_bytes(), b"my_field");

        let val = br#"form-data; name="my field"; filename="file abc.txt""#;
        let name = CONTENT_DISPOSITION_FIELD_NAME_RE.captures(val).unwrap();
        assert_eq!(name.get(1).unwrap().as_bytes(), b"my field");

        let val = br#"form-data; filename="file abc.txt"; name="upload""#;
        let name = CONTENT_DISPOSITION_FIELD_NAME_RE.captures(val).unwrap();
        assert_eq!(name.get(1).unwrap().as_bytes(), b"upload");

        let val = "form-data; name=\"কখগ\"; filename=\"你好.txt\"".as_bytes();
        let name = CONTENT_DISPOSITION_FIELD_NAME_RE.captures(val).unwrap();
        assert_eq!(name.get(1).unwrap().as_bytes(), "কখগ".as_bytes());

        let val = br#"form-data; filename="file abc.txt""#;
        assert!(CONTENT_DISPOSITION_FIELD_NAME_RE.captures(val).is_none());
    }

    #[test]
    fn test_content_disposition_file_name_re() {
        let val = br#"form-data; name="my_field"; filename="file name.txt""#;
        let file_name = CONTENT_DISPOSITION_FILE_NAME_RE.captures(val).unwrap();
        assert_eq!(file_name.get(1).unwrap().as_bytes(), b"file name.txt");

        let val = br#"form-data; name="my_field"; filename="""#;
        let file_name = CONTENT_DISPOSITION_FILE_NAME_RE.captures(val).unwrap();
        assert_eq!(file_name.get(1).unwrap().as_bytes(), b"");

        let val = "form-data; filename=\"কখগ-你好.txt\"".as_bytes();
        let file_name = CONTENT_DISPOSITION_FILE_NAME_RE.captures(val).unwrap();
        assert_eq!(file_name.get(1).unwrap().as_bytes(), "কখগ-你好.txt".as_bytes());
    }

    #[test]
    fn test_multipart_content_type_re() {
        let caps = MULTIPART_CONTENT_TYPE_RE
            .captures(b"multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxk")
            .unwrap();
        assert_eq!(caps.get(1).unwrap().as_bytes(), b"----WebKitFormBoundary7MA4YWxk");

        assert!(MULTIPART_CONTENT_TYPE_RE.captures(b"multipart/form-data; boundary=").is_none());
        assert!(MULTIPART_CONTENT_TYPE_RE.captures(b"multipart/mixed; boundary=abc").is_none());
        assert!(MULTIPART_CONTENT_TYPE_RE.captures(b"text/plain").is_none());
    }
}
