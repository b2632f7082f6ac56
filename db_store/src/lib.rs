mod error;
pub mod meta;
mod settings;

pub use error::{Error, MetaError, Result};
pub use settings::Settings;
