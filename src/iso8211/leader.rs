//! The fixed 24-byte ISO/IEC 8211 record leader.

use crate::diagnostics::WarningCode;

pub const LEADER_LEN: usize = 24;

pub const FIELD_TERMINATOR: u8 = 0x1E;
pub const SUBFIELD_DELIMITER: u8 = 0x1F;
pub const RECORD_TERMINATOR: u8 = 0x1D;

/// Whether a record's leader identifies it as the schema-declaring DDR or
/// an ordinary data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderKind {
    /// 'L' — Data Descriptive Record, the first record in a file.
    Ddr,
    /// 'D' — an ordinary data record.
    Data,
}

#[derive(Debug, Clone, Copy)]
pub struct Leader {
    pub record_length: usize,
    pub interchange_level: u8,
    pub kind: LeaderKind,
    pub field_control_length: u8,
    pub base_address: usize,
    pub size_of_field_length: usize,
    pub size_of_field_position: usize,
    pub size_of_field_tag: usize,
}

/// Parse the 24-byte leader at the front of `bytes`.
///
/// Returns `Err(WarningCode)` describing which structural check failed;
/// the caller decides whether that's fatal (DDR) or recoverable (later
/// records).
pub fn parse(bytes: &[u8]) -> Result<Leader, WarningCode> {
    if bytes.len() < LEADER_LEN {
        return Err(WarningCode::LEADER_TRUNCATED);
    }

    let record_length = parse_ascii_digits(&bytes[0..5]).ok_or(WarningCode::LEADER_LEN_MISMATCH)?;
    let interchange_level = bytes[5];
    let kind = match bytes[6] {
        b'L' => LeaderKind::Ddr,
        _ => LeaderKind::Data,
    };
    let field_control_length = bytes[7];
    let base_address = parse_ascii_digits(&bytes[8..12]).ok_or(WarningCode::BAD_BASE_ADDR)?;
    let size_of_field_length = digit_value(bytes[16]).ok_or(WarningCode::LEADER_LEN_MISMATCH)?;
    let size_of_field_position =
        digit_value(bytes[17]).ok_or(WarningCode::LEADER_LEN_MISMATCH)?;
    let size_of_field_tag = digit_value(bytes[19]).ok_or(WarningCode::LEADER_LEN_MISMATCH)?;

    let leader = Leader {
        record_length,
        interchange_level,
        kind,
        field_control_length,
        base_address,
        size_of_field_length,
        size_of_field_position,
        size_of_field_tag,
    };

    if !(leader.record_length > LEADER_LEN && leader.record_length <= bytes.len()) {
        return Err(WarningCode::LEADER_LEN_MISMATCH);
    }
    if !(leader.base_address >= LEADER_LEN && leader.base_address < leader.record_length) {
        return Err(WarningCode::BAD_BASE_ADDR);
    }
    if !(1..=9).contains(&leader.size_of_field_tag)
        || !(1..=9).contains(&leader.size_of_field_length)
        || !(1..=9).contains(&leader.size_of_field_position)
    {
        return Err(WarningCode::LEADER_LEN_MISMATCH);
    }

    Ok(leader)
}

fn digit_value(b: u8) -> Option<usize> {
    (b as char).to_digit(10).map(|d| d as usize)
}

/// Parse a fixed-width ASCII decimal field, as used for the leader's
/// numeric subfields. Non-digit bytes make the field unparseable.
pub fn parse_ascii_digits(bytes: &[u8]) -> Option<usize> {
    let s = std::str::from_utf8(bytes).ok()?;
    s.trim().parse::<usize>().ok()
}
