//! Multi-document stream framing.
//!
//! Splits a byte stream into raw documents on `---` boundary lines. Bytes inside a
//! document are kept exactly as read.

use std::io::BufRead;

use sidecar_core::{AnnotateError, Result};

const SEPARATOR: &[u8] = b"---";

/// Per-document size cap. Override with `SIDECARCTL_MAX_DOC_BYTES`.
pub fn max_document_bytes() -> usize {
    std::env::var("SIDECARCTL_MAX_DOC_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(4 * 1024 * 1024) // 4 MiB default
}

/// Lazy iterator over the raw documents of one input. Not restartable; stops
/// after the first error.
pub struct DocumentReader<R> {
    inner: R,
    line: Vec<u8>,
    max_bytes: usize,
    done: bool,
}

impl<R: BufRead> DocumentReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, max_document_bytes())
    }

    pub fn with_limit(inner: R, max_bytes: usize) -> Self {
        Self { inner, line: Vec::new(), max_bytes, done: false }
    }

    fn next_document(&mut self) -> Result<Option<Vec<u8>>> {
        let mut doc = Vec::new();
        loop {
            self.line.clear();
            let n = self
                .inner
                .read_until(b'\n', &mut self.line)
                .map_err(|e| AnnotateError::input(format!("reading manifest stream: {}", e)))?;
            if n == 0 {
                self.done = true;
                return Ok(if is_blank(&doc) { None } else { Some(doc) });
            }
            if let Some(rest) = self.line.strip_prefix(SEPARATOR) {
                let trailer = rest.trim_ascii();
                // only whitespace or a comment may follow a boundary marker
                if !trailer.is_empty() && trailer[0] != b'#' {
                    return Err(AnnotateError::decode(format!(
                        "invalid document separator: {}",
                        String::from_utf8_lossy(trailer)
                    )));
                }
                if !is_blank(&doc) {
                    return Ok(Some(doc));
                }
                doc.clear();
                continue;
            }
            doc.extend_from_slice(&self.line);
            if doc.len() > self.max_bytes {
                return Err(AnnotateError::decode(format!("document too large (>{} bytes)", self.max_bytes)));
            }
        }
    }
}

impl<R: BufRead> Iterator for DocumentReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let res = self.next_document();
        if res.is_err() {
            self.done = true;
        }
        res.transpose()
    }
}

fn is_blank(doc: &[u8]) -> bool {
    doc.iter().all(|b| b.is_ascii_whitespace())
}
