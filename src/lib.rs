//! Docmask Server Library
//!
//! Document redaction and coordinate mapping. The main server binary is in
//! main.rs; the library exposes the engine for benchmarks and embedding.
//!
//! # Modules
//!
//! - `geometry`: rect/size types and conversions between template, natural,
//!   display and PDF page space
//! - `restrictions`: restriction records, validation and backends
//! - `raster`: page rasterization for PDF and image sources
//! - `masking`: live overlays and baked PNG/PDF redactions
//! - `ocr`: recognition engines, word index and region text extraction
//! - `session`: per-viewer document sessions
//! - `storage`: document byte stores

pub mod config;
pub mod error;
pub mod geometry;
pub mod masking;
pub mod ocr;
pub mod raster;
pub mod restrictions;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
