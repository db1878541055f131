pub mod error;
pub mod quote;

pub use error::*;
pub use quote::*;
