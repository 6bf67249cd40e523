// MIT License - Copyright (c) 2026 ad2-bridge authors

pub mod keypad;
pub mod zone;

pub use keypad::Keypad;
pub use zone::{RfZone, Zone, ZoneState};
