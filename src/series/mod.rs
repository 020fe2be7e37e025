pub mod loader;
pub mod record;

pub use loader::{load, load_file, LoadReport};
pub use record::{PriceRecord, Series};
