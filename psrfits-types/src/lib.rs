pub mod bit_depth;
pub mod error;
pub mod header;
pub mod pol_scheme;
pub mod request;

pub use bit_depth::*;
pub use error::*;
pub use header::*;
pub use pol_scheme::*;
pub use request::*;
