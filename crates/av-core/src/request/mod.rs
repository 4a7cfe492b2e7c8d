//! Typed requests built from raw parser output

pub mod normalizer;

pub use normalizer::{ParseResult, RequestSchema, ValidatedRequest, normalize, normalize_value};
