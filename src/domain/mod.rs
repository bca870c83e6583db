pub mod batch;
pub mod error;
pub mod models;
pub mod ports;
pub mod schema;
pub mod validation;
