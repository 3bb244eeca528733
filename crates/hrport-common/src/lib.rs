pub mod address;
pub mod coord;
pub mod value;

pub use address::*;
pub use coord::*;
pub use value::*;
