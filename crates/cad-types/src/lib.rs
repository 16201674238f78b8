pub mod mass;
pub mod object;
pub mod placement;
pub mod sketch;

pub use mass::*;
pub use object::*;
pub use placement::*;
pub use sketch::*;
