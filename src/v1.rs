#![forbid(unsafe_code)]

pub mod blog;
