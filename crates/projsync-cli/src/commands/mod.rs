pub mod audit;
pub mod common;
pub mod completions;
pub mod conflicts;
pub mod download;
pub mod resolve;
pub mod status;
pub mod upload;
