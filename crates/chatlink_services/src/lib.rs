mod file_path;
mod infra;
mod markdown_link;
mod symbol;
mod utils;

pub use file_path::*;
pub use infra::*;
pub use markdown_link::*;
pub use symbol::*;
