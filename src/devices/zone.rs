// MIT License - Copyright (c) 2026 ad2-bridge authors

use crate::protocol::message::RfFlags;

/// Contact state of a wired zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    Open,
    Closed,
}

/// A wired zone on an expander or relay module, identified by
/// (address, channel).
///
/// The contact state stays unknown (`None`) until either the first
/// update for this zone arrives or the panel reports READY — zones that
/// have not faulted by the time the panel finishes its status broadcast
/// can safely be assumed closed.
#[derive(Debug, Clone)]
pub struct Zone {
    pub address: u32,
    pub channel: u32,
    state: Option<ZoneState>,
    first_update_received: bool,
}

impl Zone {
    pub fn new(address: u32, channel: u32) -> Self {
        Self {
            address,
            channel,
            state: None,
            first_update_received: false,
        }
    }

    /// Whether this zone is the one identified by (address, channel).
    pub fn responsible_for(&self, address: u32, channel: u32) -> bool {
        self.address == address && self.channel == channel
    }

    pub fn state(&self) -> Option<ZoneState> {
        self.state
    }

    /// Apply an update from an EXP/REL message.
    pub fn update(&mut self, open: bool) {
        self.first_update_received = true;
        self.state = Some(if open { ZoneState::Open } else { ZoneState::Closed });
    }

    /// Seed the derived "closed" default once the panel reports ready.
    /// A zone that already reported keeps its real state.
    pub fn notify_panel_ready(&mut self) {
        if !self.first_update_received {
            self.first_update_received = true;
            self.state = Some(ZoneState::Closed);
        }
    }

    /// Clear the state on reconnect; the next panel-ready signal or
    /// update re-establishes it.
    pub fn reset(&mut self) {
        self.state = None;
        self.first_update_received = false;
    }
}

/// A wireless zone, identified by its transmitter serial number.
#[derive(Debug, Clone)]
pub struct RfZone {
    pub serial: u32,
    flags: Option<RfFlags>,
}

impl RfZone {
    pub fn new(serial: u32) -> Self {
        Self {
            serial,
            flags: None,
        }
    }

    pub fn flags(&self) -> Option<RfFlags> {
        self.flags
    }

    pub fn update(&mut self, flags: RfFlags) {
        self.flags = Some(flags);
    }

    pub fn is_low_battery(&self) -> bool {
        self.flags
            .is_some_and(|f| f.contains(RfFlags::LOW_BATTERY))
    }

    /// State of the given loop; unknown zones read as false.
    pub fn loop_state(&self, n: u8) -> bool {
        let Some(flags) = self.flags else {
            return false;
        };
        match n {
            1 => flags.contains(RfFlags::LOOP1),
            2 => flags.contains(RfFlags::LOOP2),
            3 => flags.contains(RfFlags::LOOP3),
            4 => flags.contains(RfFlags::LOOP4),
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.flags = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_unknown_until_first_update() {
        let mut zone = Zone::new(7, 1);
        assert_eq!(zone.state(), None);

        zone.update(true);
        assert_eq!(zone.state(), Some(ZoneState::Open));

        zone.update(false);
        assert_eq!(zone.state(), Some(ZoneState::Closed));
    }

    #[test]
    fn panel_ready_seeds_closed_only_before_first_update() {
        let mut fresh = Zone::new(1, 1);
        fresh.notify_panel_ready();
        assert_eq!(fresh.state(), Some(ZoneState::Closed));

        let mut reported = Zone::new(1, 2);
        reported.update(true);
        reported.notify_panel_ready();
        assert_eq!(reported.state(), Some(ZoneState::Open));
    }

    #[test]
    fn zone_reset_clears_state() {
        let mut zone = Zone::new(2, 1);
        zone.update(true);
        zone.reset();
        assert_eq!(zone.state(), None);
        zone.notify_panel_ready();
        assert_eq!(zone.state(), Some(ZoneState::Closed));
    }

    #[test]
    fn zone_responsibility() {
        let zone = Zone::new(7, 2);
        assert!(zone.responsible_for(7, 2));
        assert!(!zone.responsible_for(7, 1));
        assert!(!zone.responsible_for(8, 2));
    }

    #[test]
    fn rf_zone_tracks_flags() {
        let mut zone = RfZone::new(180036);
        assert!(!zone.loop_state(1));
        assert!(!zone.is_low_battery());

        zone.update(RfFlags::LOOP1 | RfFlags::LOW_BATTERY);
        assert!(zone.loop_state(1));
        assert!(!zone.loop_state(2));
        assert!(zone.is_low_battery());

        zone.reset();
        assert_eq!(zone.flags(), None);
    }
}
