use std::io::{self, Write};

use super::parse::HostRecord;

/// Hostnames per output line unless configured otherwise.
pub const DEFAULT_MAX_HOSTS_PER_LINE: usize = 8;

/// Sort records by (ip, host), byte-wise.
///
/// Equal records are indistinguishable, so an unstable sort is fine.
#[inline]
pub fn sort_records(records: &mut [HostRecord<'_>]) {
    records.sort_unstable();
}

/// Drop every record identical to its immediate predecessor.
/// On sorted input this removes all exact (ip, host) duplicates.
/// Returns the number of records removed.
pub fn dedup_records(records: &mut Vec<HostRecord<'_>>) -> usize {
    let before = records.len();
    records.dedup();
    before - records.len()
}

/// Sort then deduplicate; the collection is ready for `write_hosts`.
pub fn sort_and_dedup(records: &mut Vec<HostRecord<'_>>) -> usize {
    sort_records(records);
    dedup_records(records)
}

/// Write one output line: `<ip> <host1> <host2> ...\n`.
#[inline]
fn write_line(out: &mut impl Write, ip: &[u8], hosts: &[&[u8]]) -> io::Result<()> {
    out.write_all(ip)?;
    for host in hosts {
        out.write_all(b" ")?;
        out.write_all(host)?;
    }
    out.write_all(b"\n")
}

/// Collects the hostnames of one output line.
///
/// Empty until the first record; afterwards holds the current IP and up to
/// `max_per_line` hostnames (no limit when `max_per_line` is 0). A record
/// with another IP, or one arriving when the line is full, flushes the
/// current line and starts the next.
#[derive(Debug)]
pub struct LineAccumulator<'a> {
    ip: Option<&'a [u8]>,
    hosts: Vec<&'a [u8]>,
    max_per_line: usize,
}

impl<'a> LineAccumulator<'a> {
    pub fn new(max_per_line: usize) -> Self {
        let capacity = if max_per_line == 0 {
            DEFAULT_MAX_HOSTS_PER_LINE
        } else {
            max_per_line
        };
        Self {
            ip: None,
            hosts: Vec::with_capacity(capacity),
            max_per_line,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Current IP, if any record has been accepted since the last flush.
    pub fn ip(&self) -> Option<&'a [u8]> {
        self.ip
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.max_per_line != 0 && self.hosts.len() >= self.max_per_line
    }

    /// Add a record, first flushing the current line to `out` if the IP
    /// changed or the line is full. Returns whether a line was written.
    pub fn push(&mut self, record: HostRecord<'a>, out: &mut impl Write) -> io::Result<bool> {
        let new_line = self.ip.is_some_and(|ip| ip != record.ip) || self.is_full();
        let flushed = if new_line { self.flush(out)? } else { false };
        self.ip = Some(record.ip);
        self.hosts.push(record.host);
        Ok(flushed)
    }

    /// Write the pending line, if any, and return to the empty state.
    pub fn flush(&mut self, out: &mut impl Write) -> io::Result<bool> {
        let ip = match self.ip.take() {
            Some(ip) if !self.hosts.is_empty() => ip,
            _ => return Ok(false),
        };
        write_line(out, ip, &self.hosts)?;
        self.hosts.clear();
        Ok(true)
    }
}

/// Write sorted, deduplicated records grouped by IP, at most
/// `max_per_line` hostnames per line (0 = unlimited).
/// Returns the number of lines written.
///
/// Duplicates are not filtered here; run `sort_and_dedup` first.
pub fn write_hosts(
    records: &[HostRecord<'_>],
    out: &mut impl Write,
    max_per_line: usize,
) -> io::Result<u64> {
    let mut acc = LineAccumulator::new(max_per_line);
    let mut lines = 0u64;
    for &record in records {
        if acc.push(record, out)? {
            lines += 1;
        }
    }
    if acc.flush(out)? {
        lines += 1;
    }
    Ok(lines)
}
