use std::collections::TryReserveError;

use memchr::memchr_iter;

/// One (IP, hostname) association, borrowed from the input buffer.
///
/// Field order matters: the derived `Ord` compares `ip` first and breaks
/// ties on `host`, both byte-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostRecord<'a> {
    pub ip: &'a [u8],
    pub host: &'a [u8],
}

impl<'a> HostRecord<'a> {
    pub fn new(ip: &'a [u8], host: &'a [u8]) -> Self {
        Self { ip, host }
    }
}

/// Marks the start of a comment, either as the first character of a line
/// or as the first character of a hostname token.
pub const COMMENT_MARKER: u8 = b'#';

/// C `isspace` in the "C" locale. Unlike `u8::is_ascii_whitespace` this
/// includes vertical tab.
#[inline]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

/// Separates the IP from the first hostname.
#[inline]
fn is_ip_delim(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Separates hostname tokens from each other.
#[inline]
fn is_host_delim(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Strip leading and trailing whitespace.
#[inline]
pub fn trim_space(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&b| !is_space(b)).unwrap_or(s.len());
    let end = s.iter().rposition(|&b| !is_space(b)).map_or(start, |i| i + 1);
    &s[start..end]
}

/// Iterate over the lines of `data`, without their `\n` terminators.
/// A final line without a terminator is still yielded.
pub fn lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut start = 0;
    let mut ends = memchr_iter(b'\n', data);
    std::iter::from_fn(move || {
        if let Some(end) = ends.next() {
            let line = &data[start..end];
            start = end + 1;
            Some(line)
        } else if start < data.len() {
            let line = &data[start..];
            start = data.len();
            Some(line)
        } else {
            None
        }
    })
}

/// Parse one hosts-file line, appending a record per hostname to `records`.
///
/// Returns the number of records appended. Blank lines, comment lines and
/// lines carrying only an IP contribute nothing.
pub fn parse_line<'a>(
    line: &'a [u8],
    records: &mut Vec<HostRecord<'a>>,
) -> Result<usize, TryReserveError> {
    let line = trim_space(line);
    if line.is_empty() || line[0] == COMMENT_MARKER {
        return Ok(0);
    }

    // The line is trimmed, so the IP runs from the start to the first blank.
    let ip_end = line.iter().position(|&b| is_ip_delim(b));
    let (ip, rest) = match ip_end {
        Some(i) => (&line[..i], &line[i + 1..]),
        None => return Ok(0),
    };

    let mut added = 0;
    for token in rest.split(|&b| is_host_delim(b)) {
        let host = trim_space(token);
        if host.is_empty() {
            continue;
        }
        // Inline comment: consumes the rest of the line.
        if host[0] == COMMENT_MARKER {
            break;
        }
        records.try_reserve(1)?;
        records.push(HostRecord::new(ip, host));
        added += 1;
    }
    Ok(added)
}

/// Parse a whole hosts file into one record per (IP, hostname) occurrence,
/// in input order.
///
/// Allocation failure while growing the collection is reported instead of
/// aborting; the partially filled collection is dropped on that path.
pub fn parse_hosts(data: &[u8]) -> Result<Vec<HostRecord<'_>>, TryReserveError> {
    let mut records = Vec::new();
    for line in lines(data) {
        parse_line(line, &mut records)?;
    }
    Ok(records)
}
