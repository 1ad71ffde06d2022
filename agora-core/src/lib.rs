pub mod clock;
pub mod config;
pub mod error;
pub mod error_utils;
pub mod outcome;
pub mod traits;
pub mod types;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use outcome::*;
pub use traits::*;
pub use types::*;
