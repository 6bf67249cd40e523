// MIT License - Copyright (c) 2026 ad2-bridge authors

use crate::constants::{ADDRESSED_COMMAND_PREFIX, KEYPAD_COMMAND_CHARS, SPECIAL_KEY_REPEAT};
use crate::error::{AdError, Result};

/// An outbound command for the AlarmDecoder.
///
/// The plain form sends the body as the AlarmDecoder's own keypad
/// address; the addressed form (`K{address:02}{body}`) sends it on
/// behalf of one emulated keypad. Addressing is expressed as an address
/// mask with a single bit set (bit n = keypad address n), matching how
/// inbound keypad messages carry their destination. The write path
/// appends the line terminator; the command itself never carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdCommand {
    wire: String,
}

impl AdCommand {
    /// A plain command, sent from the AlarmDecoder's own address.
    /// The body must already be validated and special-key expanded.
    pub fn new(body: impl Into<String>) -> Self {
        Self { wire: body.into() }
    }

    /// A command addressed to the single keypad identified by `mask`
    /// (exactly one bit set; bit n = keypad address n).
    pub fn addressed(mask: u32, body: &str) -> Self {
        let address = if mask == 0 { 0 } else { mask.trailing_zeros() };
        Self {
            wire: format!("{}{:02}{}", ADDRESSED_COMMAND_PREFIX, address, body),
        }
    }

    /// Request the device version report.
    pub fn version() -> Self {
        Self::new(crate::constants::VERSION_COMMAND)
    }

    /// The wire text (without terminator).
    pub fn as_str(&self) -> &str {
        &self.wire
    }

    /// Recover the address mask and body of an addressed command.
    /// Returns `None` for plain commands.
    pub fn parse_addressed(wire: &str) -> Option<(u32, &str)> {
        let rest = wire.strip_prefix(ADDRESSED_COMMAND_PREFIX)?;
        let digits = rest.get(..2)?;
        let address: u32 = digits.parse().ok()?;
        if address > 31 {
            return None;
        }
        Some((1 << address, &rest[2..]))
    }
}

impl std::fmt::Display for AdCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.wire)
    }
}

/// Check a user-supplied keypad command against the allowed character
/// set (digits, `A`-`H` special keys, `*`, `#`, `<`, `>`).
pub fn validate_keypad_command(command: &str) -> Result<()> {
    if command.is_empty() || !command.chars().all(|c| KEYPAD_COMMAND_CHARS.contains(c)) {
        return Err(AdError::InvalidCommand {
            command: command.to_string(),
        });
    }
    Ok(())
}

/// Replace the letters `A`-`H` with keypad special keys 1-8. Each
/// special key goes out as its control byte repeated three times, which
/// is how a physical keypad signals a dedicated function key.
pub fn expand_special_keys(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    for c in command.chars() {
        match c {
            'A'..='H' => {
                let key = (c as u8 - b'A' + 1) as char;
                for _ in 0..SPECIAL_KEY_REPEAT {
                    out.push(key);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_command_wire_format() {
        assert_eq!(AdCommand::new("12341").as_str(), "12341");
        assert_eq!(AdCommand::version().as_str(), "V");
    }

    #[test]
    fn addressed_command_wire_format() {
        assert_eq!(AdCommand::addressed(1 << 2, "12341").as_str(), "K0212341");
        assert_eq!(AdCommand::addressed(1 << 17, "*71").as_str(), "K17*71");
    }

    #[test]
    fn addressed_round_trip() {
        for (mask, body) in [
            (1 << 0, "12341"),
            (1 << 3, "*99"),
            (1 << 17, "#70"),
            (1 << 31, ""),
        ] {
            let cmd = AdCommand::addressed(mask, body);
            assert_eq!(
                AdCommand::parse_addressed(cmd.as_str()),
                Some((mask, body))
            );
        }
        assert_eq!(AdCommand::parse_addressed("12341"), None);
        assert_eq!(AdCommand::parse_addressed("K9"), None);
    }

    #[test]
    fn validate_allows_keypad_characters() {
        assert!(validate_keypad_command("12341").is_ok());
        assert!(validate_keypad_command("*71").is_ok());
        assert!(validate_keypad_command("#3").is_ok());
        assert!(validate_keypad_command("A").is_ok());
        assert!(validate_keypad_command("<>").is_ok());
    }

    #[test]
    fn validate_rejects_foreign_characters() {
        assert!(validate_keypad_command("").is_err());
        assert!(validate_keypad_command("1234;rm").is_err());
        assert!(validate_keypad_command("hello").is_err());
        assert!(validate_keypad_command("12 34").is_err());
    }

    #[test]
    fn special_key_expansion() {
        assert_eq!(expand_special_keys("A"), "\u{1}\u{1}\u{1}");
        assert_eq!(expand_special_keys("H"), "\u{8}\u{8}\u{8}");
        assert_eq!(expand_special_keys("1B2"), "1\u{2}\u{2}\u{2}2");
        assert_eq!(expand_special_keys("12341"), "12341");
    }
}
