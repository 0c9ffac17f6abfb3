pub mod classify;
pub mod coverage;
pub mod extract;
pub mod name;

pub use classify::*;
pub use coverage::*;
pub use extract::*;
pub use name::*;
