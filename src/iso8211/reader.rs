//! The tolerant ISO/IEC 8211 record reader.

use std::collections::HashMap;

use crate::diagnostics::{Collector, Severity, WarningCode};
use crate::error::OpenEncError;
use crate::iso8211::leader::{self, Leader, LeaderKind, FIELD_TERMINATOR, LEADER_LEN};

/// One entry of a record's directory: a field tag plus where its payload
/// lives relative to the record's base address.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub tag: String,
    pub length: usize,
    pub position: usize,
}

/// A single decoded ISO 8211 record: its leader facts, directory, and the
/// raw field payloads keyed by tag.
#[derive(Debug, Clone)]
pub struct Record {
    pub record_length: usize,
    pub base_address: usize,
    pub kind: LeaderKind,
    pub directory: Vec<DirectoryEntry>,
    pub fields: HashMap<String, Vec<u8>>,
}

impl Record {
    pub fn field(&self, tag: &str) -> Option<&[u8]> {
        self.fields.get(tag).map(Vec::as_slice)
    }
}

/// Lazily yields [`Record`]s from a byte buffer, recovering from structural
/// corruption in every record after the first (the DDR). Never returns
/// `Err` from `next` — fatal DDR failures and resource exhaustion stop the
/// iterator and are reported through [`Records::take_fatal`].
pub struct Records<'a, 'c> {
    bytes: &'a [u8],
    cursor: usize,
    is_first: bool,
    stopped: bool,
    fatal: Option<OpenEncError>,
    collector: &'c mut Collector,
}

impl<'a, 'c> Records<'a, 'c> {
    pub fn new(bytes: &'a [u8], collector: &'c mut Collector) -> Self {
        Self {
            bytes,
            cursor: 0,
            is_first: true,
            stopped: false,
            fatal: None,
            collector,
        }
    }

    /// Take the fatal error that stopped iteration, if any. Only ever
    /// `Some` after the iterator has yielded its last `Some(Record)` (or
    /// immediately, if the very first record was invalid).
    pub fn take_fatal(&mut self) -> Option<OpenEncError> {
        self.fatal.take()
    }

    fn push_warning(&mut self, code: WarningCode, severity: Severity, message: String) -> bool {
        match self.collector.warn(code, severity, message) {
            Err(e) => {
                self.fatal = Some(e);
                self.stopped = true;
                true
            }
            Ok(()) => {
                let overflowed = self
                    .collector
                    .warnings()
                    .last()
                    .is_some_and(|w| w.code == WarningCode::MAX_WARNINGS_EXCEEDED);
                if overflowed {
                    self.fatal = Some(OpenEncError::ResourceExhausted {
                        warnings: self.collector.warnings().to_vec(),
                    });
                    self.stopped = true;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn fail_ddr(&mut self, reason: String) {
        let _ = self.push_warning(WarningCode::LEADER_TRUNCATED, Severity::Error, reason.clone());
        if self.fatal.is_none() {
            self.fatal = Some(OpenEncError::InvalidDdr { reason });
        }
        self.stopped = true;
    }

    /// Step the cursor forward after a record was successfully parsed.
    /// Guarantees forward progress even on a record reporting length 0.
    fn advance(&mut self, record_start: usize, record_length: usize) {
        let next = record_start + record_length;
        self.cursor = if next > self.cursor { next } else { self.cursor + 1 };
    }

    /// Step the cursor forward after a structurally invalid record:
    /// fast-forward by its apparent length if plausible, else skip-scan.
    fn advance_after_failure(&mut self, record_start: usize) {
        let remaining = &self.bytes[record_start..];
        let plausible_len = leader::parse_ascii_digits(&remaining[..remaining.len().min(5)])
            .filter(|&l| l > LEADER_LEN && l <= remaining.len());

        let next = match plausible_len {
            Some(len) => record_start + len,
            None => skip_scan(self.bytes, record_start + 1).unwrap_or(self.bytes.len()),
        };
        self.cursor = next.max(self.cursor + 1);
    }
}

impl<'a, 'c> Iterator for Records<'a, 'c> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            if self.stopped || self.cursor >= self.bytes.len() {
                self.stopped = true;
                return None;
            }

            let record_start = self.cursor;
            let remaining = &self.bytes[record_start..];

            if remaining.len() < LEADER_LEN {
                if self.is_first {
                    self.fail_ddr(format!(
                        "input too short: {} bytes remain, need {LEADER_LEN}",
                        remaining.len()
                    ));
                } else {
                    self.push_warning(
                        WarningCode::LEADER_TRUNCATED,
                        Severity::Warning,
                        format!("{} bytes remain at offset {record_start}", remaining.len()),
                    );
                    self.stopped = true;
                }
                return None;
            }

            let leader = match leader::parse(remaining) {
                Ok(l) => l,
                Err(code) => {
                    if self.is_first {
                        self.fail_ddr(format!("DDR leader rejected: {code}"));
                        return None;
                    }
                    if self.push_warning(
                        code,
                        Severity::Warning,
                        format!("leader rejected at offset {record_start}"),
                    ) {
                        return None;
                    }
                    self.advance_after_failure(record_start);
                    continue;
                }
            };

            match parse_directory(remaining, &leader) {
                Ok(directory) => {
                    let fields = extract_fields(remaining, &leader, &directory, self.collector);
                    if self.stopped {
                        return None;
                    }
                    let record = Record {
                        record_length: leader.record_length,
                        base_address: leader.base_address,
                        kind: leader.kind,
                        directory,
                        fields,
                    };
                    self.advance(record_start, leader.record_length);
                    self.is_first = false;
                    return Some(record);
                }
                Err(code) => {
                    if self.is_first {
                        self.fail_ddr(format!("DDR directory rejected: {code}"));
                        return None;
                    }
                    if self.push_warning(
                        code,
                        Severity::Warning,
                        format!("directory rejected at offset {record_start}"),
                    ) {
                        return None;
                    }
                    self.advance(record_start, leader.record_length);
                    self.is_first = false;
                    continue;
                }
            }
        }
    }
}

fn parse_directory(record: &[u8], leader: &Leader) -> Result<Vec<DirectoryEntry>, WarningCode> {
    let entry_len = leader.size_of_field_tag + leader.size_of_field_length + leader.size_of_field_position;
    let dir = &record[LEADER_LEN..leader.base_address];

    let mut entries = Vec::new();
    let mut i = 0;
    while i < dir.len() {
        if dir[i] == FIELD_TERMINATOR {
            break;
        }
        if i + entry_len > dir.len() {
            return Err(WarningCode::DIR_TRUNCATED);
        }
        let tag_bytes = &dir[i..i + leader.size_of_field_tag];
        let tag = std::str::from_utf8(tag_bytes)
            .map_err(|_| WarningCode::DIR_TRUNCATED)?
            .to_string();
        let len_start = i + leader.size_of_field_tag;
        let pos_start = len_start + leader.size_of_field_length;
        let length = leader::parse_ascii_digits(&dir[len_start..pos_start])
            .ok_or(WarningCode::DIR_TRUNCATED)?;
        let position = leader::parse_ascii_digits(
            &dir[pos_start..pos_start + leader.size_of_field_position],
        )
        .ok_or(WarningCode::DIR_TRUNCATED)?;

        entries.push(DirectoryEntry {
            tag,
            length,
            position,
        });
        i += entry_len;
    }

    Ok(entries)
}

fn extract_fields(
    record: &[u8],
    leader: &Leader,
    directory: &[DirectoryEntry],
    collector: &mut Collector,
) -> HashMap<String, Vec<u8>> {
    let mut fields = HashMap::with_capacity(directory.len());
    for entry in directory {
        let start = leader.base_address + entry.position;
        let end = start + entry.length;
        if end > record.len() {
            let _ = collector.warn(
                WarningCode::FIELD_BOUNDS,
                Severity::Warning,
                format!("field {} out of bounds ({start}..{end})", entry.tag),
            );
            continue;
        }
        let mut slice = &record[start..end];
        if slice.last() == Some(&FIELD_TERMINATOR) {
            slice = &slice[..slice.len() - 1];
        }
        fields.insert(entry.tag.clone(), slice.to_vec());
    }
    fields
}

/// Recovery skip-scan: read 5 ASCII digits at successive
/// offsets, accepting the first that looks like a plausible record length.
fn skip_scan(bytes: &[u8], from: usize) -> Option<usize> {
    let mut offset = from;
    while offset + 5 <= bytes.len() {
        if let Some(len) = leader::parse_ascii_digits(&bytes[offset..offset + 5]) {
            if len > LEADER_LEN && len < 100_000 && offset + len <= bytes.len() {
                return Some(offset);
            }
        }
        offset += 1;
    }
    None
}
