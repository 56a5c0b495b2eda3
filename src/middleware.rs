#![forbid(unsafe_code)]

pub mod chain;
pub mod save_messages;
