mod env;
mod fs_meta;

pub use env::*;
pub use fs_meta::*;
