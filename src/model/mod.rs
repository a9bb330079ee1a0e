pub mod job;
pub mod role;
pub mod user;
