pub mod clean;
pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod diagnose;
pub mod error;
pub mod expire;
pub mod fix_dates;
pub mod import;
pub mod logging;
pub mod member;
