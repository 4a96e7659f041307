//! Timeline navigation over a hand: cursors, point-in-time snapshots, the
//! change locator and the auto-play driver.

pub mod cursor;
pub mod locator;
pub mod playback;
pub mod snapshot;


pub use cursor::{timeline, Cursor};
pub use locator::locate_earliest_change;
pub use playback::{Playback, DEFAULT_TICK};
pub use snapshot::{compute_snapshot, PlayerSnapshot, TableSnapshot};
