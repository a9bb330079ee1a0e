pub mod jobs;
pub mod members;
