//! Type definitions

pub mod leg;
pub mod route;
pub mod scenario;
pub mod stop;

pub use leg::*;
pub use route::*;
pub use scenario::*;
pub use stop::*;
