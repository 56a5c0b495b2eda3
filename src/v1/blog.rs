#![forbid(unsafe_code)]

pub mod routes_list;
pub mod version;
