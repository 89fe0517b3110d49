//! Sidecar annotate: inject sidecar annotations into exactly one workload of a
//! multi-document manifest stream, passing everything else through untouched.
//!
//! Pipeline per document: frame ([`reader`]) → classify ([`classify`]) →
//! load ([`load`]) → match ([`matcher`]) → merge and patch ([`patch`]) →
//! write ([`writer`]).
//! [`Engine`] drives it and owns the per-run match state.

#![forbid(unsafe_code)]

pub mod builder;
pub mod classify;
mod engine;
pub mod load;
pub mod matcher;
pub mod patch;
pub mod reader;
pub mod writer;

use std::io::{BufRead, Write};

pub use builder::{AnnotateOptions, AnnotationBuilder};
pub use engine::{Engine, RunReport};
pub use sidecar_core::{AnnotateError, AnnotationSet, ResourceRef, Result, TargetSelector};

/// One-shot convenience over [`Engine::new`] + [`Engine::run`].
pub fn annotate<B, I, R, W>(selector: TargetSelector, builder: B, inputs: I, sink: W) -> Result<RunReport>
where
    B: AnnotationBuilder,
    I: IntoIterator<Item = R>,
    R: BufRead,
    W: Write,
{
    Engine::new(selector, builder)?.run(inputs, sink)
}
