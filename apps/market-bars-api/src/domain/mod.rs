//! Domain Layer
//!
//! Parameter parsing and bar normalization. No I/O.

pub mod bars;
pub mod epoch;
pub mod timeframe;

pub use bars::{BarPoint, BarRow, BarTable, Cell, NormalizeError, TimestampCell, normalize_bars};
pub use epoch::{EpochError, parse_epoch_millis};
pub use timeframe::{TIMEFRAME_FORMAT_MESSAGE, TimeFrame, TimeFrameUnit, TimeframeError};
