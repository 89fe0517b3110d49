//! Output side of the stream: documents in encounter order, `---` between them.

use std::io::Write;

use sidecar_core::{AnnotateError, Result};

pub struct DocumentWriter<W> {
    sink: W,
    written: usize,
}

impl<W: Write> DocumentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, written: 0 }
    }

    pub fn write_document(&mut self, doc: &[u8]) -> Result<()> {
        let io = |e: std::io::Error| AnnotateError::input(format!("writing output: {}", e));
        if self.written > 0 {
            self.sink.write_all(b"---\n").map_err(io)?;
        }
        self.sink.write_all(doc).map_err(io)?;
        if !doc.ends_with(b"\n") {
            self.sink.write_all(b"\n").map_err(io)?;
        }
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<W> {
        self.sink.flush().map_err(|e| AnnotateError::input(format!("flushing output: {}", e)))?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_and_terminates_documents() {
        let mut w = DocumentWriter::new(Vec::new());
        w.write_document(b"a: 1\n").unwrap();
        w.write_document(b"b: 2").unwrap();
        assert_eq!(w.written(), 2);
        let out = w.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a: 1\n---\nb: 2\n");
    }

    #[test]
    fn single_document_has_no_separator() {
        let mut w = DocumentWriter::new(Vec::new());
        w.write_document(b"kind: Pod\n").unwrap();
        assert_eq!(w.finish().unwrap(), b"kind: Pod\n");
    }
}
