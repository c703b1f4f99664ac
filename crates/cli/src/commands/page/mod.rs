//! Page content extraction commands.

pub mod console;
pub mod coords;
pub mod elements;
pub mod eval;
pub mod html;
pub mod read;
pub mod snapshot;
pub mod text;
