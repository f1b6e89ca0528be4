// Silver refinement pipeline: landing reads, cleaning stages, staging
// storage.

pub mod landing;
pub mod silver;
pub mod storage;

// Re-export the stage entry points callers actually drive
pub use silver::{SilverRunSummary, SilverTransformer};
