pub mod book;
pub mod error;
pub mod market_handler;
pub mod matching;
pub mod observer;
pub mod price_level;
pub mod types;

pub mod prelude {
    pub use super::book::*;
    pub use super::error::*;
    pub use super::market_handler::*;
    pub use super::matching::*;
    pub use super::observer::*;
    pub use super::price_level::*;
    pub use super::types::*;
}
