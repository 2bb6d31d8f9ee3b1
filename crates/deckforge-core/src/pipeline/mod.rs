//! End-to-end generation: topic → outline → pictures → presentation file.
//!
//! - **generator**: wires the outline extractor, image fetcher and document
//!   assembler together for one request

pub mod generator;

pub use generator::{DeckGenerator, GenerateRequest};
