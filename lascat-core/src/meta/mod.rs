mod tile_index;
pub use self::tile_index::*;
