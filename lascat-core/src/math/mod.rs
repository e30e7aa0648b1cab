mod extent;
pub use self::extent::*;

mod quantile;
pub use self::quantile::*;
