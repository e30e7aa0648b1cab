mod record;
pub use self::record::*;

mod point_set;
pub use self::point_set::*;
