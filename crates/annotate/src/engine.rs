use std::io::{BufRead, Write};
use std::time::Instant;

use metrics::{counter, histogram};
use serde_json::Value as Json;
use serde_yaml::Value as Yaml;
use sidecar_core::{AnnotateError, AnnotationSet, ResourceRef, Result, TargetSelector};
use tracing::{debug, info, warn};

use crate::builder::AnnotationBuilder;
use crate::classify::{self, DocumentClass, KindRoute};
use crate::load;
use crate::matcher;
use crate::patch::{self, Encoding};
use crate::reader::{self, DocumentReader};
use crate::writer::DocumentWriter;

/// Outcome of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Documents read (and written) across all inputs.
    pub documents: usize,
    /// The resource that received the annotations, if any did.
    pub target: Option<ResourceRef>,
}

/// One annotate invocation.
///
/// Owns the "already matched" state for exactly one run: `run` consumes the
/// engine, so two invocations can only ever cooperate through their byte
/// streams (e.g. a shell pipe), never through shared state.
pub struct Engine<B> {
    selector: TargetSelector,
    builder: B,
    target: Option<ResourceRef>,
    documents_seen: usize,
    max_document_bytes: usize,
}

impl<B: AnnotationBuilder> Engine<B> {
    /// Rejects a namespace selector without a resource name before any input is read.
    pub fn new(selector: TargetSelector, builder: B) -> Result<Self> {
        selector.validate()?;
        Ok(Self { selector, builder, target: None, documents_seen: 0, max_document_bytes: reader::max_document_bytes() })
    }

    pub fn with_max_document_bytes(mut self, max: usize) -> Self {
        self.max_document_bytes = max;
        self
    }

    pub fn matched(&self) -> bool {
        self.target.is_some()
    }

    /// Stream every document of `inputs`, in order, into `sink`, annotating at
    /// most one of them. The first error aborts the run; documents already
    /// written stay written.
    pub fn run<I, R, W>(mut self, inputs: I, sink: W) -> Result<RunReport>
    where
        I: IntoIterator<Item = R>,
        R: BufRead,
        W: Write,
    {
        let t0 = Instant::now();
        let set = self.builder.annotations().ensure_enabled();
        let mut writer = DocumentWriter::new(sink);
        let res = self.scan(inputs, &mut writer, &set);
        let res = res.and_then(|()| writer.finish().map(|_| ()));
        histogram!("annotate_run_ms", t0.elapsed().as_secs_f64() * 1000.0);
        if let Err(e) = res {
            counter!("annotate_errors_total", 1u64);
            return Err(e);
        }
        let documents = self.documents_seen;
        match &self.target {
            Some(t) => info!(documents, target = %t, "annotate run finished"),
            None => warn!(documents, selector = ?self.selector, "annotate run finished without a matching resource"),
        }
        Ok(RunReport { documents, target: self.target })
    }

    fn scan<I, R, W>(&mut self, inputs: I, writer: &mut DocumentWriter<W>, set: &AnnotationSet) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: BufRead,
        W: Write,
    {
        for input in inputs {
            for raw in DocumentReader::with_limit(input, self.max_document_bytes) {
                let ordinal = self.documents_seen + 1;
                let raw = raw.map_err(|e| e.at_document(ordinal))?;
                self.documents_seen = ordinal;
                counter!("annotate_documents_total", 1u64);
                match self.process(&raw, set).map_err(|e| e.at_document(ordinal))? {
                    Some(patched) => writer.write_document(&patched)?,
                    None => {
                        counter!("annotate_passthrough_total", 1u64);
                        writer.write_document(&raw)?
                    }
                }
            }
        }
        Ok(())
    }

    /// `Some(bytes)` when the document changed, `None` to emit the original bytes.
    fn process(&mut self, raw: &[u8], set: &AnnotationSet) -> Result<Option<Vec<u8>>> {
        let doc: Yaml = serde_yaml::from_slice(raw).map_err(|e| AnnotateError::decode(format!("parsing document: {}", e)))?;
        let descriptor = classify::classify_yaml(&doc).map_err(AnnotateError::decode)?;
        debug!(ordinal = self.documents_seen, kind = %descriptor.gvk.kind, class = ?descriptor.class, "classified document");
        if self.matched() || descriptor.class == DocumentClass::Passthrough {
            return Ok(None);
        }
        let mut json = load::document(raw)?;
        let changed = match descriptor.class {
            DocumentClass::Workload(route) => self.try_target(&mut json, route, &descriptor.gvk.kind, set)?,
            DocumentClass::List => self.scan_list(&mut json, set)?,
            DocumentClass::Passthrough => false,
        };
        if !changed {
            return Ok(None);
        }
        patch::encode(&json, Encoding::detect(raw)).map(Some)
    }

    /// Walk list items (recursing into nested lists); true when one was annotated.
    fn scan_list(&mut self, list: &mut Json, set: &AnnotationSet) -> Result<bool> {
        let Some(items) = list.get_mut("items").and_then(Json::as_array_mut) else { return Ok(false) };
        let mut changed = false;
        for item in items.iter_mut() {
            let descriptor = classify::classify_json(item).map_err(AnnotateError::decode)?;
            changed |= match descriptor.class {
                DocumentClass::List => self.scan_list(item, set)?,
                DocumentClass::Workload(route) => self.try_target(item, route, &descriptor.gvk.kind, set)?,
                DocumentClass::Passthrough => false,
            };
        }
        Ok(changed)
    }

    fn try_target(&mut self, doc: &mut Json, route: &KindRoute, kind: &str, set: &AnnotationSet) -> Result<bool> {
        let candidate = matcher::identity_of(doc, kind).map_err(AnnotateError::decode)?;
        if !matcher::is_target(&self.selector, &candidate, self.matched()) {
            debug!(resource = %candidate, "candidate not selected");
            return Ok(false);
        }
        patch::apply(doc, route, set, &candidate)?;
        info!(resource = %candidate, path = route.path, "annotated target resource");
        counter!("annotate_patched_total", 1u64);
        self.target = Some(candidate);
        Ok(true)
    }
}
