//! Log pipeline: pool, filter, formatter, writers and the logger that ties
//! them together

pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod level;
pub mod logger;
pub mod pool;
pub mod writer;
