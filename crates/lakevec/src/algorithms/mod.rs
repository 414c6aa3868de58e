pub mod preprocessing;
pub mod extraction;
pub mod repair;

pub use preprocessing::*;
pub use extraction::*;
pub use repair::*;
