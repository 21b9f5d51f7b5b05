//! Text normalization shared by all event sources.

mod price;
mod temporal;

pub use price::parse_price;
pub use temporal::{parse_datetime, resolve_window};
