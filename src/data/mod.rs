//! Price and return tables.
//!
//! Prices come in from the outside world with gaps; returns leave here
//! complete and ready for the optimizer.

pub mod prices;
pub mod returns;

pub use prices::PriceTable;
pub use returns::{ReturnTable, DATE_LABEL_FORMAT, PERIOD_LABEL_FORMAT};
