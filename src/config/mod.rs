//! Runner configuration: types and file loading.

mod loader;
mod types;

pub use loader::*;
pub use types::*;
