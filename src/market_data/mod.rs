pub mod provider;
pub mod universe;
pub mod yahoo;

pub use provider::MarketDataProvider;
pub use universe::{Universe, UniverseEntry};
pub use yahoo::YahooFinanceClient;
