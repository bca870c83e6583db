pub mod http;
pub mod parsers;
