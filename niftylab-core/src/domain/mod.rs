//! Domain types: bars, price series, trades, equity curves.

pub mod bar;
pub mod equity;
pub mod series;
pub mod trade;

pub use bar::Bar;
pub use equity::{EquityCurve, EquityPoint};
pub use series::{Interval, PriceSeries, SeriesError};
pub use trade::{ExitReason, Trade};

/// Symbol type alias. Instruments are opaque string keys to the core.
pub type Symbol = String;
