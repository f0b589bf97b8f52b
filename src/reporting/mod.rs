pub mod insights;
pub mod report;
pub mod stats;
