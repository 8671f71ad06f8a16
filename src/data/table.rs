//! Comma-separated tables used by the snapshot and record files.
//!
//! Both files are plain CSV with a header row. Fields containing a comma,
//! a quote or a line break are quoted, with embedded quotes doubled.

use std::path::Path;

use failwatch_types::{Counters, FailoverEvent, RateRecord, Site, Snapshot};

use crate::error::{MonitorError, Result};

/// Header of the per-group snapshot table.
pub const SNAPSHOT_COLUMNS: [&str; 3] = ["Host", "Hits", "Bandwidth"];

/// Column order of the full and reduced failover records.
pub const RECORD_COLUMNS: [&str; 10] = [
    "Timestamp",
    "Sites",
    "Group",
    "IsSquid",
    "Host",
    "Alias",
    "Hits",
    "HitsRate",
    "Bandwidth",
    "BandwidthRate",
];

/// Split one CSV line into fields.
pub fn split_row(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => quoted = false,
                _ => field.push(c),
            }
        } else {
            match c {
                ',' => fields.push(std::mem::take(&mut field)),
                '"' if field.is_empty() => quoted = true,
                _ => field.push(c),
            }
        }
    }

    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

/// Split a table into rows, keeping line breaks inside quoted fields.
///
/// Each row is paired with the 1-based line number it starts on. A trailing
/// `\r` is dropped from every row.
pub fn split_lines(content: &str) -> Vec<(usize, &str)> {
    let mut rows = Vec::new();
    let mut start = 0;
    let mut start_line = 1;
    let mut line = 1;
    let mut quoted = false;

    for (i, c) in content.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '\n' => {
                line += 1;
                if !quoted {
                    rows.push((start_line, &content[start..i]));
                    start = i + 1;
                    start_line = line;
                }
            }
            _ => {}
        }
    }
    if start < content.len() {
        rows.push((start_line, &content[start..]));
    }

    rows.into_iter()
        .map(|(n, row)| (n, row.strip_suffix('\r').unwrap_or(row)))
        .collect()
}

/// Join fields into one CSV line, quoting where needed.
pub fn join_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| {
            let f = f.as_ref();
            if f.contains(&[',', '"', '\n', '\r'][..]) {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a snapshot: epoch on the first line, then the host table.
pub fn write_snapshot(snapshot: &Snapshot) -> String {
    let mut out = format!("{}\n", snapshot.timestamp);
    out.push_str(&join_row(&SNAPSHOT_COLUMNS));
    out.push('\n');
    for (host, counters) in snapshot.iter() {
        out.push_str(&join_row(&[
            host.clone(),
            counters.hits.to_string(),
            counters.bandwidth.to_string(),
        ]));
        out.push('\n');
    }
    out
}

/// Parse a snapshot file produced by [`write_snapshot`].
pub fn parse_snapshot(content: &str, path: &Path) -> Result<Snapshot> {
    if content.trim().is_empty() {
        return Err(MonitorError::corrupt(path, "empty file"));
    }
    let (first, rest) = content.split_once('\n').unwrap_or((content, ""));

    let timestamp = first
        .trim()
        .parse()
        .map_err(|e| MonitorError::corrupt(path, format!("line 1: bad timestamp: {e}")))?;

    let mut snapshot = parse_counter_table(rest, path, 1)?;
    snapshot.timestamp = timestamp;
    Ok(snapshot)
}

/// Parse a `Host,Hits,Bandwidth` table into an untimed snapshot.
///
/// Hosts listed more than once are summed. `line_offset` is the number of
/// lines preceding `content` in the file, for error messages.
pub fn parse_counter_table(content: &str, path: &Path, line_offset: usize) -> Result<Snapshot> {
    let mut lines = split_lines(content)
        .into_iter()
        .map(|(n, line)| (n + line_offset, line));

    let (header_line, header) = match lines.next() {
        Some((n, line)) => (
            n,
            split_row(line.trim_end())
                .map_err(|e| MonitorError::corrupt(path, format!("line {n}: {e}")))?,
        ),
        None => return Err(MonitorError::corrupt(path, "missing header")),
    };
    let index = ColumnIndex::new(&header, &SNAPSHOT_COLUMNS)
        .map_err(|e| MonitorError::corrupt(path, format!("line {header_line}: {e}")))?;

    let mut snapshot = Snapshot::new(0);
    for (n, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let corrupt = |reason: String| MonitorError::corrupt(path, format!("line {n}: {reason}"));
        let row = split_row(line.trim_end()).map_err(corrupt)?;
        let hits = parse_count(index.get(&row, "Hits").map_err(corrupt)?).map_err(corrupt)?;
        let bandwidth =
            parse_count(index.get(&row, "Bandwidth").map_err(corrupt)?).map_err(corrupt)?;
        snapshot.record(
            index.get(&row, "Host").map_err(corrupt)?,
            Counters::new(hits, bandwidth),
        );
    }

    Ok(snapshot)
}

/// Render failover events as a record table.
pub fn write_record(events: &[FailoverEvent]) -> String {
    let mut out = join_row(&RECORD_COLUMNS);
    out.push('\n');
    for event in events {
        let r = &event.record;
        out.push_str(&join_row(&[
            event.timestamp.to_string(),
            r.site.to_string(),
            event.group.clone(),
            format_bool(r.is_relay).to_string(),
            r.host.clone(),
            r.alias.clone(),
            r.hits.to_string(),
            format!("{:.2}", r.hits_rate),
            r.bandwidth.to_string(),
            format!("{:.2}", r.bandwidth_rate),
        ]));
        out.push('\n');
    }
    out
}

/// Parse a record table. Columns are matched by header name.
pub fn parse_record(content: &str, path: &Path) -> Result<Vec<FailoverEvent>> {
    let mut lines = split_lines(content).into_iter();

    let header = match lines.next() {
        Some((_, line)) => split_row(line.trim_end())
            .map_err(|e| MonitorError::corrupt(path, format!("line 1: {e}")))?,
        None => return Ok(Vec::new()),
    };
    let index = ColumnIndex::new(&header, &RECORD_COLUMNS)
        .map_err(|e| MonitorError::corrupt(path, format!("line 1: {e}")))?;

    let mut events = Vec::new();
    for (n, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let event = split_row(line.trim_end())
            .and_then(|row| parse_event(&index, &row))
            .map_err(|e| MonitorError::corrupt(path, format!("line {n}: {e}")))?;
        events.push(event);
    }

    Ok(events)
}

fn parse_event(index: &ColumnIndex, row: &[String]) -> std::result::Result<FailoverEvent, String> {
    let timestamp = index
        .get(row, "Timestamp")?
        .parse()
        .map_err(|e| format!("bad Timestamp: {e}"))?;

    let record = RateRecord {
        host: index.get(row, "Host")?.to_string(),
        alias: index.get(row, "Alias")?.to_string(),
        hits: parse_count(index.get(row, "Hits")?)?,
        hits_rate: parse_rate(index.get(row, "HitsRate")?)?,
        bandwidth: parse_count(index.get(row, "Bandwidth")?)?,
        bandwidth_rate: parse_rate(index.get(row, "BandwidthRate")?)?,
        is_relay: parse_bool(index.get(row, "IsSquid")?)?,
        site: Site::new(index.get(row, "Sites")?),
    };

    Ok(FailoverEvent::new(timestamp, index.get(row, "Group")?, record))
}

/// Positions of required columns within a header row.
struct ColumnIndex {
    names: Vec<&'static str>,
    positions: Vec<usize>,
}

impl ColumnIndex {
    fn new(header: &[String], required: &[&'static str]) -> std::result::Result<Self, String> {
        let mut positions = Vec::with_capacity(required.len());
        for name in required {
            let pos = header
                .iter()
                .position(|h| h.trim() == *name)
                .ok_or_else(|| format!("missing column {name}"))?;
            positions.push(pos);
        }
        Ok(Self {
            names: required.to_vec(),
            positions,
        })
    }

    fn get<'a>(&self, row: &'a [String], name: &str) -> std::result::Result<&'a str, String> {
        let slot = self
            .names
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| format!("unknown column {name}"))?;
        row.get(self.positions[slot])
            .map(|s| s.trim())
            .ok_or_else(|| format!("row has no {name} field"))
    }
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn parse_bool(s: &str) -> std::result::Result<bool, String> {
    match s {
        "True" | "true" | "TRUE" | "1" => Ok(true),
        "False" | "false" | "FALSE" | "0" => Ok(false),
        _ => Err(format!("bad boolean {s:?}")),
    }
}

/// Counts are integers, but older tables may carry them as `123.0`.
fn parse_count(s: &str) -> std::result::Result<u64, String> {
    if let Ok(v) = s.parse::<u64>() {
        return Ok(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u64),
        _ => Err(format!("bad count {s:?}")),
    }
}

fn parse_rate(s: &str) -> std::result::Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("bad rate {s:?}")),
    }
}
