pub mod forecast;
pub mod market;

pub use forecast::*;
pub use market::*;
