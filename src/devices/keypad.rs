// MIT License - Copyright (c) 2026 ad2-bridge authors

use crate::protocol::message::{KeypadFlags, KeypadMessage};

/// Tracked state of one (emulated) keypad, identified by an address
/// mask (bit n = keypad address n; 0 = all addresses).
#[derive(Debug, Clone)]
pub struct Keypad {
    pub address_mask: u32,
    status: KeypadFlags,
    beeps: u8,
    zone: u32,
    display: String,
}

impl Keypad {
    pub fn new(address_mask: u32) -> Self {
        Self {
            address_mask,
            status: KeypadFlags::empty(),
            beeps: 0,
            zone: 0,
            display: String::new(),
        }
    }

    /// Whether this keypad should consume a message carrying the given
    /// address mask. True when either mask is 0 (all keypads) or when
    /// any address bit is shared.
    pub fn responsible_for(&self, address_mask: u32) -> bool {
        self.address_mask == 0 || address_mask == 0 || (self.address_mask & address_mask) != 0
    }

    /// Apply a keypad message.
    pub fn update(&mut self, kpm: &KeypadMessage) {
        self.status = kpm.status;
        self.beeps = kpm.beeps;
        self.zone = kpm.zone;
        self.display = kpm.display.clone();
    }

    pub fn status(&self) -> KeypadFlags {
        self.status
    }

    pub fn beeps(&self) -> u8 {
        self.beeps
    }

    pub fn zone(&self) -> u32 {
        self.zone
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn is_ready(&self) -> bool {
        self.status.contains(KeypadFlags::READY)
    }

    pub fn is_armed(&self) -> bool {
        self.status
            .intersects(KeypadFlags::ARMED_AWAY | KeypadFlags::ARMED_HOME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::{decode, AdMessage};

    fn keypad_message(line: &str) -> KeypadMessage {
        match decode(line).unwrap() {
            AdMessage::Keypad(kpm) => kpm,
            other => panic!("expected keypad message, got {other:?}"),
        }
    }

    #[test]
    fn responsibility_by_mask_intersection() {
        let keypad = Keypad::new(0b0000_0110);
        assert!(keypad.responsible_for(0b0000_0010));
        assert!(keypad.responsible_for(0b0000_0100));
        assert!(!keypad.responsible_for(0b0000_1000));
        // 0 on either side means "all"
        assert!(keypad.responsible_for(0));
        assert!(Keypad::new(0).responsible_for(0b1000_0000));
    }

    #[test]
    fn update_from_message() {
        let mut keypad = Keypad::new(0);
        let kpm = keypad_message(
            "[0100000100000000----],000,[f70600ff1008001c28020000000000],\"ARMED ***AWAY***                \"",
        );
        keypad.update(&kpm);
        assert!(keypad.is_armed());
        assert!(!keypad.is_ready());
        assert_eq!(keypad.display(), "ARMED ***AWAY***                ");
        assert_eq!(keypad.zone(), 0);
    }
}
