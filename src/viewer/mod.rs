//! Gallery navigation: index arithmetic, the screensaver, and the session
//! state machine tying them together.

pub mod position;
pub mod screensaver;
pub mod session;

pub use position::{
    IndexPolicy, POSITION_PARAM, clamp_index, initial_index, parse_position, position_from_query,
    position_value, resolve_index, with_position, wrap_index,
};
pub use screensaver::{Screensaver, ScreensaverConfig, ScreensaverTick, pick_index};
pub use session::{GallerySession, Key, ViewerEffect, ViewerEvent, ViewerMode};
