pub mod analyzer;
pub mod heuristic;
pub mod merge;
pub mod prompts;
pub mod record;

pub use analyzer::{TextAnalyzer, VisionAnalyzer};
pub use merge::{merge, MergePriority};
pub use record::ProductRecord;
