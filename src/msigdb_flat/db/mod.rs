pub mod raw;
pub mod snapshot;

pub use raw::Raw;
pub use snapshot::SnapshotScope;
