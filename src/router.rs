#![forbid(unsafe_code)]

pub mod pages;
pub mod routes;
