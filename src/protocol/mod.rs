// MIT License - Copyright (c) 2026 ad2-bridge authors

//! AlarmDecoder line-protocol parsing.
//!
//! The device emits newline-terminated ASCII lines. Keypad updates start
//! with `[`; everything else announces its kind in a four-character
//! prefix (`!REL`, `!RFX`, `!EXP`, `!LRR`, `!VER`). Unknown prefixes and
//! short lines are invalid and get dropped by the reader loop.

pub mod command;
pub mod message;

/// The kinds of message the AlarmDecoder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Zone expander update
    Exp,
    /// Keypad display/status update
    Kpm,
    /// Long range radio event
    Lrr,
    /// Relay module update
    Rel,
    /// Wireless (RF) zone update
    Rfx,
    /// Device version report
    Ver,
    /// Unrecognized line
    Invalid,
}

/// Determine the message kind from a raw line.
///
/// Keypad messages are recognized by their leading `[` before the prefix
/// table is consulted. `!SER` lines (serial passthrough echoes) are known
/// but carry nothing decodable, so they classify as invalid.
pub fn classify(line: &str) -> MessageKind {
    if line.starts_with('[') {
        return MessageKind::Kpm;
    }
    // get() rejects short lines and any non-ASCII prefix in one step
    match line.get(..4) {
        Some("!EXP") => MessageKind::Exp,
        Some("!LRR") => MessageKind::Lrr,
        Some("!REL") => MessageKind::Rel,
        Some("!RFX") => MessageKind::Rfx,
        Some("!VER") => MessageKind::Ver,
        Some("!SER") => MessageKind::Invalid,
        _ => MessageKind::Invalid,
    }
}

/// Split a comma-delimited message body into fields, treating any
/// double-quoted substring as a single atomic field (embedded commas are
/// not delimiters). Surrounding quotes are stripped; empty unquoted
/// tokens are skipped.
pub fn split_fields(body: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;

    for ch in body.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                if in_quotes {
                    was_quoted = true;
                }
            }
            ',' if !in_quotes => {
                if !current.is_empty() || was_quoted {
                    fields.push(std::mem::take(&mut current));
                }
                was_quoted = false;
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() || was_quoted {
        fields.push(current);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_prefixes() {
        assert_eq!(classify("!EXP:07,01,01"), MessageKind::Exp);
        assert_eq!(classify("!REL:12,01,00"), MessageKind::Rel);
        assert_eq!(classify("!RFX:0180036,80"), MessageKind::Rfx);
        assert_eq!(classify("!LRR:002,1,OPEN"), MessageKind::Lrr);
        assert_eq!(classify("!VER:ffffffff,V2.2a.8.8,TX;RX"), MessageKind::Ver);
    }

    #[test]
    fn classify_keypad_takes_precedence() {
        assert_eq!(classify("[F1....,..."), MessageKind::Kpm);
        assert_eq!(classify("[00010001000000003A--]"), MessageKind::Kpm);
        // even a single bracket is a keypad line, not a short-line reject
        assert_eq!(classify("["), MessageKind::Kpm);
    }

    #[test]
    fn classify_unknown_or_short() {
        assert_eq!(classify(""), MessageKind::Invalid);
        assert_eq!(classify("!EX"), MessageKind::Invalid);
        assert_eq!(classify("!XYZ:1,2,3"), MessageKind::Invalid);
        assert_eq!(classify("!Sending.done"), MessageKind::Invalid);
        assert_eq!(classify("!SER2SOCK Connected"), MessageKind::Invalid);
    }

    #[test]
    fn split_fields_quoted_comma() {
        assert_eq!(
            split_fields("A,B,\"C,D\",E"),
            vec!["A", "B", "C,D", "E"]
        );
    }

    #[test]
    fn split_fields_plain() {
        assert_eq!(split_fields("07,01,01"), vec!["07", "01", "01"]);
    }

    #[test]
    fn split_fields_keeps_quoted_empty_and_skips_bare_empty() {
        assert_eq!(split_fields("A,,B"), vec!["A", "B"]);
        assert_eq!(split_fields("A,\"\",B"), vec!["A", "", "B"]);
    }

    #[test]
    fn split_fields_quoted_spaces_preserved() {
        assert_eq!(
            split_fields("[10010001],008,\"****DISARMED****  Ready to Arm  \""),
            vec![
                "[10010001]",
                "008",
                "****DISARMED****  Ready to Arm  "
            ]
        );
    }
}
