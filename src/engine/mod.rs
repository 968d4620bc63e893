//! Snapshot decoding engine.
//!
//! - `rdb`: single-pass, event-driven decoder for RDB snapshot files: byte
//!   cursor, length and string codecs, LZF decompression, value decoding and
//!   the top-level parser that drives an [`rdb::RdbListener`].

pub mod rdb;

pub use rdb::*;
