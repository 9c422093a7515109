//! The tagged error kinds produced by the task runner core, and the
//! exit-code classification the ambient CLI layer applies to them.

// miette's derive macro causes false positives for this lint
#![allow(unused_assignments)]

pub mod classification;

pub use classification::{Classify, ErrorClassification, ForgeError};
