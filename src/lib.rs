mod common;
mod pipeline;
mod runner;

pub use common::{load_file, Appliable, Logged};
pub use pipeline::*;
pub use runner::{run, Args};
