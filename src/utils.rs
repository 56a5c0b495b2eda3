#![forbid(unsafe_code)]

pub mod blog_utils;
pub mod config;
pub mod errors;
