pub mod brush;
pub mod builder;
pub mod color;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod heightmap;
pub mod morton;
pub mod node;
pub mod serialize;
pub mod validate;

pub use editor::Editor;
pub use error::{BuildError, LoadError};
pub use node::{Node, NodeArray};
