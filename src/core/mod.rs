//! Activity log persistence and export, outside the recognition core

pub mod db;
pub mod export;
