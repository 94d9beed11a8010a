pub mod fs;
pub mod xpath;

pub use fs::{ensure_dir, write_atomic};
pub use xpath::xpath_literal;
