mod transform;
pub use self::transform::*;

mod grid;
pub use self::grid::*;
