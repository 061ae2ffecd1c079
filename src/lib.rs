//! Reading and writing Bitsquid/Stingray bundles.
//!
//! A bundle is a package of hashed resources wrapped in a segmented zlib
//! container. [`stream`] handles the container, [`package`] the record
//! table inside it, and [`extract`] ties both to the file system.
pub mod chunk;
pub mod constants;
mod cursor;
pub mod decoder;
pub mod error;
pub mod extract;
pub mod murmur;
pub mod package;
pub mod registry;
pub mod stream;

pub use decoder::{OffzipDecoder, PreDecoder, SegmentedDecoder};
pub use error::{BundleError, Result};
pub use extract::{pack_directory, unpack_archive, unpack_directory, BatchReport, UnpackOptions};
pub use package::{RecordKey, RecordLayout, SourceEntry};
pub use registry::{Naming, TypeRegistry};
