mod anchor;
mod config;
mod error;
mod linkifier;
mod part;

pub use anchor::*;
pub use config::*;
pub use error::*;
pub use linkifier::*;
pub use part::*;
