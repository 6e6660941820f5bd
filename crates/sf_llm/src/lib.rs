mod client;
mod config;
mod error;
mod field;
mod mapping;

pub mod helpers;

pub use client::Client;
pub use config::Config;
pub use error::{Error, Result};
pub use field::FieldDescriptor;
pub use mapping::{parse_column_mapping, ColumnMapping};
