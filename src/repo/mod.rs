//! SQL access, one module per table.

pub mod job;
pub mod refresh_token;
pub mod user;
