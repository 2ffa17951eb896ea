pub mod core;
pub mod merge;
pub mod parse;


pub use self::core::*;
pub use self::merge::*;
pub use self::parse::*;
