//! PDF handling: merging downloaded copies and counting pages

pub mod merge;
pub mod metadata;

// Re-export commonly used items
pub use merge::{merge_pdfs, MergeOptions};
pub use metadata::count_pages;
