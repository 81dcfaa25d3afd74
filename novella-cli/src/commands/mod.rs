//! CLI command implementations

mod chapters;
mod import;
mod info;
mod library;
mod validate;

pub use chapters::chapters;
pub use import::{import, ImportOptions};
pub use info::info;
pub use validate::validate;
