use crate::constants;

/// What the first header line of a part announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContentDisposition {
    File {
        field_name: Option<String>,
        file_name: String,
    },
    Text {
        field_name: String,
    },
}

impl ContentDisposition {
    /// Classifies the header line following a part boundary.
    pub fn classify(line: &[u8]) -> crate::Result<ContentDisposition> {
        if !constants::CONTENT_DISPOSITION_LINE_RE.is_match(line) {
            return Err(malformed(line));
        }

        let field_name = constants::CONTENT_DISPOSITION_FIELD_NAME_RE
            .captures(line)
            .and_then(|cap| cap.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned());

        let file_name = constants::CONTENT_DISPOSITION_FILE_NAME_RE
            .captures(line)
            .and_then(|cap| cap.get(1))
            .map(|m| strip_windows_path(&String::from_utf8_lossy(m.as_bytes())).to_owned());

        match (field_name, file_name) {
            (field_name, Some(file_name)) => Ok(ContentDisposition::File { field_name, file_name }),
            (Some(field_name), None) => Ok(ContentDisposition::Text { field_name }),
            (None, None) => Err(malformed(line)),
        }
    }
}

fn malformed(line: &[u8]) -> crate::Error {
    crate::Error::MalformedDisposition {
        line: String::from_utf8_lossy(line).into_owned(),
    }
}

// IE and old Edge send the full client path, e.g. `C:\Users\me\a.txt`.
fn strip_windows_path(file_name: &str) -> &str {
    match file_name.rfind('\\') {
        Some(idx) => &file_name[idx + 1..],
        None => file_name,
    }
}
