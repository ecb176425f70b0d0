pub mod dedup;
pub mod json_artifact;
pub mod traits;

pub use dedup::DedupStore;
pub use json_artifact::JsonArtifactStore;
pub use traits::ArtifactStore;
