// MIT License - Copyright (c) 2026 ad2-bridge authors

//! Wire-level constants for the AlarmDecoder line protocol.

/// Default TCP port of a ser2sock-exposed AlarmDecoder.
pub const DEFAULT_TCP_PORT: u16 = 10000;

/// Default serial line speed of the AD2USB/AD2PI.
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Terminator appended to every outbound command.
pub const COMMAND_TERMINATOR: &str = "\r\n";

/// Prefix character of an addressed keypad command (`K{addr:02}{keys}`).
pub const ADDRESSED_COMMAND_PREFIX: char = 'K';

/// Command that asks the device to report its version (`!VER` reply).
pub const VERSION_COMMAND: &str = "V";

/// Characters permitted in a keypad command before encoding.
/// `A`-`H` stand for keypad special keys 1-8 and are expanded on send.
pub const KEYPAD_COMMAND_CHARS: &str = "0123456789ABCDEFGH*#<>";

/// Special keys are sent as the matching control byte repeated three
/// times (special key 1 = 0x01 0x01 0x01, special key 8 = 0x08 0x08 0x08).
pub const SPECIAL_KEY_REPEAT: usize = 3;
