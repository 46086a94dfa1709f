pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod mappers;
pub mod migrate;
pub mod model;
pub mod pml;
pub mod squad;
pub mod store;
pub mod time;

pub use error::{AppError, AppResult};
pub use import::{ImportResult, SectionFlags};
