//! Archive inspection
//!
//! - `npy`: decodes the fixed-format header of a single array stream
//! - `probe`: opens a `.npz` container and reports the row count of its
//!   primary input tensor

pub mod npy;
pub mod probe;

pub use npy::{read_header, NpyHeader};
pub use probe::{ArchiveHeaderResult, HeaderProbe, PRIMARY_ENTRY};
