//! Data collaborators: market-data providers, the Parquet store, symbol
//! universes and synthetic series.
//!
//! Nothing in the simulation core depends on this module. Providers and
//! stores are constructed once by the caller and passed in by reference.

pub mod download;
pub mod provider;
pub mod store;
pub mod synthetic;
pub mod throttle;
pub mod universe;
pub mod yahoo;

pub use download::{download_symbols, DownloadProgress, DownloadSummary, LogProgress};
pub use provider::{DataError, DataProvider, DataSource};
pub use store::{ParquetStore, StoreMeta};
pub use synthetic::random_walk;
pub use throttle::RequestThrottle;
pub use universe::{Universe, UniverseError};
pub use yahoo::YahooProvider;
