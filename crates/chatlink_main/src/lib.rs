mod cli;
mod stream;

pub use cli::*;
pub use stream::*;
