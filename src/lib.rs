/// Snapshot settings loading (defaults, files, environment).
pub mod config;
/// Decoders for compact container blobs: zipmap, ziplist, intset.
pub mod database;
/// RDB decoding engine: cursor, codecs, value decoder, parser.
pub mod engine;
/// Logging setup on top of `tracing-subscriber`.
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Settings.
pub use config::{FilterSettings, ParserSettings};
/// Compact container decoders.
pub use database::{decode_intset, decode_ziplist, decode_zipmap, ZiplistEntry};
/// Parser, listener contract and decoded value model.
pub use engine::{
    parse_file, DecodedValue, ExpiryTime, FilterError, NullListener, ParseFilter, ParseStats,
    ParserState, RdbListener, RdbParser, Value, ValueKind, ValueType,
};
/// Logging initialization.
pub use logging::{init_logging, LogFormat, LoggingConfig};
/// Error types and result alias.
pub use rdb_error::{RdbError, RdbErrorKind, RdbResult, StackError, StatusCode};
