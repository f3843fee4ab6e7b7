mod color;
mod outcome;
mod position;
mod r#move;

pub use color::*;
pub use outcome::*;
pub use position::*;
pub use r#move::*;
