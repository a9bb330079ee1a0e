pub mod db_utils;
pub mod user_cache;
