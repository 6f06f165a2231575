pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod services;

pub use error::ImportError;
pub use services::CsvImport;
