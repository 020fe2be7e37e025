pub mod price_source;

pub use price_source::{FixedPriceSource, PriceSource, StaticPriceSource};
