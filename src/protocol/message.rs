// MIT License - Copyright (c) 2026 ad2-bridge authors

use bitflags::bitflags;

use crate::error::{AdError, Result};
use crate::protocol::{classify, split_fields, MessageKind};

bitflags! {
    /// Keypad status bits parsed from the bracketed bitfield of a keypad
    /// message. Positions 0-4 and 6-15 of the bitfield map to one flag
    /// each; position 5 is the beep count digit and positions 16 and up
    /// are panel-specific.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeypadFlags: u16 {
        const READY          = 1 << 0;
        const ARMED_AWAY     = 1 << 1;
        const ARMED_HOME     = 1 << 2;
        const BACKLIGHT      = 1 << 3;
        const PROGRAM        = 1 << 4;
        const BYPASSED       = 1 << 5;
        const AC_POWER       = 1 << 6;
        const CHIME          = 1 << 7;
        const ALARM_OCCURRED = 1 << 8;
        const ALARM          = 1 << 9;
        const LOW_BATTERY    = 1 << 10;
        const DELAY_OFF      = 1 << 11;
        const FIRE           = 1 << 12;
        const SYS_FAULT      = 1 << 13;
        const PERIMETER_ONLY = 1 << 14;
    }
}

/// Bitfield positions of the keypad flags, in wire order. Position 5
/// (the beep digit) is covered separately.
const KEYPAD_FLAG_POSITIONS: [(usize, KeypadFlags); 15] = [
    (0, KeypadFlags::READY),
    (1, KeypadFlags::ARMED_AWAY),
    (2, KeypadFlags::ARMED_HOME),
    (3, KeypadFlags::BACKLIGHT),
    (4, KeypadFlags::PROGRAM),
    (6, KeypadFlags::BYPASSED),
    (7, KeypadFlags::AC_POWER),
    (8, KeypadFlags::CHIME),
    (9, KeypadFlags::ALARM_OCCURRED),
    (10, KeypadFlags::ALARM),
    (11, KeypadFlags::LOW_BATTERY),
    (12, KeypadFlags::DELAY_OFF),
    (13, KeypadFlags::FIRE),
    (14, KeypadFlags::SYS_FAULT),
    (15, KeypadFlags::PERIMETER_ONLY),
];

bitflags! {
    /// Status byte of a wireless zone update.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RfFlags: u8 {
        const LOW_BATTERY = 0x02;
        const SUPERVISION = 0x04;
        const LOOP1       = 0x80;
        const LOOP2       = 0x20;
        const LOOP3       = 0x10;
        const LOOP4       = 0x40;
    }
}

/// Keypad display/status update.
///
/// Wire form:
/// `[1000000100000000----],008,[f70600ff1008001c28020000000000],"****DISARMED****  Ready to Arm  "`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeypadMessage {
    /// Original unparsed line.
    pub raw: String,
    pub status: KeypadFlags,
    /// Beep count requested by the panel (0-7).
    pub beeps: u8,
    /// Zone number the display refers to.
    pub zone: u32,
    /// Address mask of the keypads this update is directed at
    /// (0 = all keypads).
    pub address_mask: u32,
    /// 32-character alpha display text.
    pub display: String,
}

impl KeypadMessage {
    pub fn is_ready(&self) -> bool {
        self.status.contains(KeypadFlags::READY)
    }
    pub fn is_armed_away(&self) -> bool {
        self.status.contains(KeypadFlags::ARMED_AWAY)
    }
    pub fn is_armed_home(&self) -> bool {
        self.status.contains(KeypadFlags::ARMED_HOME)
    }
    pub fn is_alarm(&self) -> bool {
        self.status.contains(KeypadFlags::ALARM)
    }
    pub fn is_fire(&self) -> bool {
        self.status.contains(KeypadFlags::FIRE)
    }
    pub fn is_ac_power(&self) -> bool {
        self.status.contains(KeypadFlags::AC_POWER)
    }
}

/// Zone expander update (`!EXP:07,01,01`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpMessage {
    pub raw: String,
    pub address: u32,
    pub channel: u32,
    /// True when the zone reports open/faulted.
    pub open: bool,
}

/// Relay module update (`!REL:12,01,00`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelMessage {
    pub raw: String,
    pub address: u32,
    pub channel: u32,
    pub open: bool,
}

/// Wireless zone update (`!RFX:0180036,80`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfxMessage {
    pub raw: String,
    pub serial: u32,
    pub flags: RfFlags,
}

impl RfxMessage {
    pub fn is_low_battery(&self) -> bool {
        self.flags.contains(RfFlags::LOW_BATTERY)
    }
    pub fn needs_supervision(&self) -> bool {
        self.flags.contains(RfFlags::SUPERVISION)
    }
    /// State of loop 1-4. Out-of-range loops read as false.
    pub fn loop_state(&self, n: u8) -> bool {
        match n {
            1 => self.flags.contains(RfFlags::LOOP1),
            2 => self.flags.contains(RfFlags::LOOP2),
            3 => self.flags.contains(RfFlags::LOOP3),
            4 => self.flags.contains(RfFlags::LOOP4),
            _ => false,
        }
    }
}

/// Long range radio event (`!LRR:002,1,OPEN`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LrrMessage {
    pub raw: String,
    /// Event data (user or zone number, device dependent).
    pub event_data: String,
    pub partition: u8,
    /// Event name, e.g. `ARM_STAY`, `OPEN`, `ALARM_PANIC`.
    pub event_name: String,
}

/// Device version report (`!VER:ffffffff,V2.2a.8.8,TX;RX;SM;...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMessage {
    pub raw: String,
    pub serial: String,
    pub version: String,
    pub capabilities: Vec<String>,
}

/// A decoded AlarmDecoder message. Every variant keeps the original
/// unparsed line for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdMessage {
    Keypad(KeypadMessage),
    ZoneExpander(ExpMessage),
    Relay(RelMessage),
    Rf(RfxMessage),
    Lrr(LrrMessage),
    Version(VersionMessage),
}

impl AdMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            AdMessage::Keypad(_) => MessageKind::Kpm,
            AdMessage::ZoneExpander(_) => MessageKind::Exp,
            AdMessage::Relay(_) => MessageKind::Rel,
            AdMessage::Rf(_) => MessageKind::Rfx,
            AdMessage::Lrr(_) => MessageKind::Lrr,
            AdMessage::Version(_) => MessageKind::Ver,
        }
    }

    /// The original wire line.
    pub fn raw(&self) -> &str {
        match self {
            AdMessage::Keypad(m) => &m.raw,
            AdMessage::ZoneExpander(m) => &m.raw,
            AdMessage::Relay(m) => &m.raw,
            AdMessage::Rf(m) => &m.raw,
            AdMessage::Lrr(m) => &m.raw,
            AdMessage::Version(m) => &m.raw,
        }
    }
}

/// Classify and decode one raw line.
pub fn decode(line: &str) -> Result<AdMessage> {
    match classify(line) {
        MessageKind::Kpm => decode_keypad(line).map(AdMessage::Keypad),
        MessageKind::Exp => {
            decode_zone_update(line, "!EXP:").map(|(address, channel, open)| {
                AdMessage::ZoneExpander(ExpMessage {
                    raw: line.to_string(),
                    address,
                    channel,
                    open,
                })
            })
        }
        MessageKind::Rel => {
            decode_zone_update(line, "!REL:").map(|(address, channel, open)| {
                AdMessage::Relay(RelMessage {
                    raw: line.to_string(),
                    address,
                    channel,
                    open,
                })
            })
        }
        MessageKind::Rfx => decode_rf(line).map(AdMessage::Rf),
        MessageKind::Lrr => decode_lrr(line).map(AdMessage::Lrr),
        MessageKind::Ver => decode_version(line).map(AdMessage::Version),
        MessageKind::Invalid => Err(malformed(line, "unrecognized prefix")),
    }
}

fn malformed(line: &str, reason: &str) -> AdError {
    AdError::MalformedMessage {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}

fn decode_keypad(line: &str) -> Result<KeypadMessage> {
    let parts = split_fields(line);
    if parts.len() != 4 {
        return Err(malformed(line, "keypad message must have 4 fields"));
    }

    let bitfield = parts[0]
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| malformed(line, "keypad bitfield not bracketed"))?;
    if !bitfield.is_ascii() || bitfield.len() < 16 {
        return Err(malformed(line, "keypad bitfield too short"));
    }
    let chars = bitfield.as_bytes();

    let mut status = KeypadFlags::empty();
    for (pos, flag) in &KEYPAD_FLAG_POSITIONS {
        if chars[*pos] == b'1' {
            status |= *flag;
        }
    }
    let beeps = (chars[5] as char).to_digit(10).unwrap_or(0) as u8;

    let zone: u32 = parts[1]
        .parse()
        .map_err(|_| malformed(line, "non-numeric zone field"))?;

    // Raw panel data: byte 0 is the message type, bytes 1-4 carry the
    // destination keypad address mask in hex. Unparseable masks fall
    // back to 0 (all keypads).
    let address_mask = parts[2]
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .and_then(|s| s.get(2..10))
        .and_then(|s| u32::from_str_radix(s, 16).ok())
        .unwrap_or(0);

    Ok(KeypadMessage {
        raw: line.to_string(),
        status,
        beeps,
        zone,
        address_mask,
        display: parts[3].clone(),
    })
}

/// Shared decoder for the `address,channel,data` body of EXP and REL.
fn decode_zone_update(line: &str, prefix: &str) -> Result<(u32, u32, bool)> {
    let body = line
        .strip_prefix(prefix)
        .ok_or_else(|| malformed(line, "missing message body"))?;
    let parts = split_fields(body);
    if parts.len() != 3 {
        return Err(malformed(line, "zone update must have 3 fields"));
    }
    let address: u32 = parts[0]
        .trim()
        .parse()
        .map_err(|_| malformed(line, "non-numeric address field"))?;
    let channel: u32 = parts[1]
        .trim()
        .parse()
        .map_err(|_| malformed(line, "non-numeric channel field"))?;
    let data: u8 = parts[2]
        .trim()
        .parse()
        .map_err(|_| malformed(line, "non-numeric data field"))?;
    Ok((address, channel, data != 0))
}

fn decode_rf(line: &str) -> Result<RfxMessage> {
    let body = line
        .strip_prefix("!RFX:")
        .ok_or_else(|| malformed(line, "missing message body"))?;
    let parts = split_fields(body);
    if parts.len() != 2 {
        return Err(malformed(line, "rf update must have 2 fields"));
    }
    let serial: u32 = parts[0]
        .trim()
        .parse()
        .map_err(|_| malformed(line, "non-numeric serial field"))?;
    let bits = u8::from_str_radix(parts[1].trim(), 16)
        .map_err(|_| malformed(line, "non-hex status field"))?;
    Ok(RfxMessage {
        raw: line.to_string(),
        serial,
        flags: RfFlags::from_bits_truncate(bits),
    })
}

fn decode_lrr(line: &str) -> Result<LrrMessage> {
    let body = line
        .strip_prefix("!LRR:")
        .ok_or_else(|| malformed(line, "missing message body"))?;
    let parts = split_fields(body);
    if parts.len() != 3 {
        return Err(malformed(line, "lrr event must have 3 fields"));
    }
    let partition: u8 = parts[1]
        .trim()
        .parse()
        .map_err(|_| malformed(line, "non-numeric partition field"))?;
    Ok(LrrMessage {
        raw: line.to_string(),
        event_data: parts[0].clone(),
        partition,
        event_name: parts[2].clone(),
    })
}

fn decode_version(line: &str) -> Result<VersionMessage> {
    let body = line
        .strip_prefix("!VER:")
        .ok_or_else(|| malformed(line, "missing message body"))?;
    let parts = split_fields(body);
    if parts.len() != 3 {
        return Err(malformed(line, "version report must have 3 fields"));
    }
    Ok(VersionMessage {
        raw: line.to_string(),
        serial: parts[0].clone(),
        version: parts[1].clone(),
        capabilities: parts[2].split(';').map(str::to_string).collect(),
    })
}
