// Source file I/O: decoding, extraction, directory loading

pub mod groups;
pub mod loader;
pub mod read;
pub mod responses;
pub mod sheet;
pub mod taxonomy;
pub mod totals;

pub use loader::{build_school_data, load_config, load_sources, LoadedSources, SourceKind};
pub use sheet::Extracted;
