use crate::constants;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    PartBoundary,
    TerminalBoundary,
    Content,
}

/// Recognizes `--{boundary}` and `--{boundary}--` lines.
#[derive(Debug)]
pub(crate) struct BoundaryMatcher {
    part: Vec<u8>,
    terminal: Vec<u8>,
}

impl BoundaryMatcher {
    pub fn new(boundary: &str) -> Self {
        let part = format!("{}{}", constants::BOUNDARY_EXT, boundary);
        let terminal = format!("{}{}", part, constants::BOUNDARY_EXT);

        BoundaryMatcher {
            part: part.into_bytes(),
            terminal: terminal.into_bytes(),
        }
    }

    /// Length of the longest line that can still be a boundary line.
    pub fn max_line_len(&self) -> usize {
        self.terminal.len()
    }

    pub fn classify(&self, line: &[u8]) -> LineKind {
        if line == self.part.as_slice() {
            LineKind::PartBoundary
        } else if line == self.terminal.as_slice() {
            LineKind::TerminalBoundary
        } else {
            LineKind::Content
        }
    }
}
