pub mod auth;
pub mod parsers;
