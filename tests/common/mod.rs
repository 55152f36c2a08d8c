//! Synthetic BIN files for integration tests
//!
//! File layout: header, IPv4 index, IPv6 index, IPv4 rows, IPv6 rows,
//! string payload. Header offsets are 1-based; string pointers are 0-based.

#![allow(dead_code)]

use geobin::{Column, ColumnLayout};
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER_LEN: usize = 64;
const INDEX_BUCKETS: usize = 1 << 16;
const INDEX_TABLE_LEN: usize = INDEX_BUCKETS * 8;

/// A column value as stored in the file
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Float(f32),
}

/// One range row
#[derive(Debug, Clone)]
pub struct Row {
    pub start: u128,
    pub values: Vec<(Column, Value)>,
}

impl Row {
    pub fn new(start: u128) -> Self {
        Row {
            start,
            values: Vec::new(),
        }
    }

    /// Country short code (at most two characters) and long name
    pub fn country(self, short: &str, long: &str) -> Self {
        self.text(Column::Country, &format!("{}\u{0}{}", short, long))
    }

    pub fn text(mut self, column: Column, value: &str) -> Self {
        self.values.push((column, Value::Text(value.to_string())));
        self
    }

    pub fn float(mut self, column: Column, value: f32) -> Self {
        self.values.push((column, Value::Float(value)));
        self
    }

    fn value(&self, column: Column) -> Option<&Value> {
        self.values
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }
}

/// Builds a BIN file in memory
#[derive(Debug, Clone)]
pub struct BinBuilder {
    schema_type: u8,
    column_count: Option<u8>,
    date: (u8, u8, u8),
    product_code: u8,
    product_type: u8,
    v4_rows: Vec<Row>,
    v6_rows: Vec<Row>,
    index_v4: bool,
    index_v6: bool,
}

impl BinBuilder {
    pub fn new(schema_type: u8) -> Self {
        BinBuilder {
            schema_type,
            column_count: None,
            date: (24, 6, 1),
            product_code: 1,
            product_type: 1,
            v4_rows: Vec::new(),
            v6_rows: Vec::new(),
            index_v4: false,
            index_v6: false,
        }
    }

    pub fn v4(mut self, row: Row) -> Self {
        self.v4_rows.push(row);
        self
    }

    pub fn v6(mut self, row: Row) -> Self {
        self.v6_rows.push(row);
        self
    }

    pub fn indexed(mut self) -> Self {
        self.index_v4 = true;
        self.index_v6 = true;
        self
    }

    pub fn date(mut self, year: u8, month: u8, day: u8) -> Self {
        self.date = (year, month, day);
        self
    }

    pub fn product_code(mut self, code: u8) -> Self {
        self.product_code = code;
        self
    }

    pub fn column_count(mut self, count: u8) -> Self {
        self.column_count = Some(count);
        self
    }

    /// The whole file
    pub fn build(&self) -> Vec<u8> {
        let layout = ColumnLayout::for_schema(self.schema_type)
            .unwrap_or_else(|| ColumnLayout::for_schema(1).unwrap());
        let cols = usize::from(self.column_count.unwrap_or(layout.min_column_count()));
        let v4_width = 4 * cols;
        let v6_width = 16 + 4 * cols.saturating_sub(1);

        let index_v4_at = HEADER_LEN;
        let index_v6_at = index_v4_at + if self.index_v4 { INDEX_TABLE_LEN } else { 0 };
        let v4_at = index_v6_at + if self.index_v6 && !self.v6_rows.is_empty() {
            INDEX_TABLE_LEN
        } else {
            0
        };
        let v6_at = v4_at + self.v4_rows.len() * v4_width;
        let payload_at = v6_at + self.v6_rows.len() * v6_width;

        let mut payload = Vec::new();
        let mut rows_v4 = Vec::new();
        for row in &self.v4_rows {
            rows_v4.extend_from_slice(&(row.start as u32).to_le_bytes());
            encode_columns(&layout, cols, row, payload_at, &mut payload, &mut rows_v4);
        }
        let mut rows_v6 = Vec::new();
        for row in &self.v6_rows {
            rows_v6.extend_from_slice(&row.start.to_le_bytes());
            encode_columns(&layout, cols, row, payload_at, &mut payload, &mut rows_v6);
        }

        let mut file = vec![0u8; HEADER_LEN];
        if self.index_v4 {
            let starts: Vec<u128> = self.v4_rows.iter().map(|r| r.start).collect();
            file.extend_from_slice(&index_table(&starts, 16));
        }
        if self.index_v6 && !self.v6_rows.is_empty() {
            let starts: Vec<u128> = self.v6_rows.iter().map(|r| r.start).collect();
            file.extend_from_slice(&index_table(&starts, 112));
        }
        file.extend_from_slice(&rows_v4);
        file.extend_from_slice(&rows_v6);
        file.extend_from_slice(&payload);
        let total = file.len() as u32;

        let base = |present: bool, at: usize| if present { at as u32 + 1 } else { 0 };
        let header = &mut file[..HEADER_LEN];
        header[0] = self.schema_type;
        header[1] = cols as u8;
        header[2] = self.date.0;
        header[3] = self.date.1;
        header[4] = self.date.2;
        header[5..9].copy_from_slice(&(self.v4_rows.len() as u32).to_le_bytes());
        header[9..13].copy_from_slice(&base(!self.v4_rows.is_empty(), v4_at).to_le_bytes());
        header[13..17].copy_from_slice(&(self.v6_rows.len() as u32).to_le_bytes());
        header[17..21].copy_from_slice(&base(!self.v6_rows.is_empty(), v6_at).to_le_bytes());
        header[21..25].copy_from_slice(&base(self.index_v4, index_v4_at).to_le_bytes());
        header[25..29].copy_from_slice(
            &base(self.index_v6 && !self.v6_rows.is_empty(), index_v6_at).to_le_bytes(),
        );
        header[29] = self.product_code;
        header[30] = self.product_type;
        header[31..35].copy_from_slice(&total.to_le_bytes());
        file
    }

    /// Write the file to a temp file that lives as long as the handle
    pub fn write(&self) -> NamedTempFile {
        write_bytes(&self.build())
    }
}

pub fn write_bytes(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn encode_columns(
    layout: &ColumnLayout,
    cols: usize,
    row: &Row,
    payload_at: usize,
    payload: &mut Vec<u8>,
    out: &mut Vec<u8>,
) {
    let mut columns = vec![0u8; 4 * cols.saturating_sub(1)];
    for column in layout.columns() {
        let Some(offset) = layout.offset(column).filter(|o| o + 4 <= columns.len()) else {
            continue;
        };
        let raw = match (column, row.value(column)) {
            (Column::Latitude | Column::Longitude, Some(Value::Float(v))) => v.to_bits(),
            (Column::Latitude | Column::Longitude, _) => 0f32.to_bits(),
            (Column::Country, Some(Value::Text(both))) => {
                let (short, long) = both.split_once('\u{0}').unwrap_or((both.as_str(), ""));
                push_country(payload, payload_at, short, long)
            }
            (_, Some(Value::Text(s))) => push_string(payload, payload_at, s),
            (_, Some(Value::Float(v))) => push_string(payload, payload_at, &v.to_string()),
            (_, None) => push_string(payload, payload_at, ""),
        };
        columns[offset..offset + 4].copy_from_slice(&raw.to_le_bytes());
    }
    out.extend_from_slice(&columns);
}

fn push_string(payload: &mut Vec<u8>, payload_at: usize, s: &str) -> u32 {
    let ptr = (payload_at + payload.len()) as u32;
    payload.push(s.len() as u8);
    payload.extend_from_slice(s.as_bytes());
    ptr
}

/// Short name record padded to three bytes, long name right after
fn push_country(payload: &mut Vec<u8>, payload_at: usize, short: &str, long: &str) -> u32 {
    assert!(short.len() <= 2, "country short code too long: {}", short);
    let ptr = push_string(payload, payload_at, short);
    payload.resize(payload.len() + 2 - short.len(), 0);
    push_string(payload, payload_at, long);
    ptr
}

/// Bucket bounds: the rows holding the first and last key of each bucket
fn index_table(starts: &[u128], shift: u32) -> Vec<u8> {
    let row_of = |key: u128| -> u32 {
        let after = starts.partition_point(|s| *s <= key);
        after.saturating_sub(1) as u32
    };
    let mut table = Vec::with_capacity(INDEX_TABLE_LEN);
    for bucket in 0..INDEX_BUCKETS as u128 {
        let first = bucket << shift;
        let last = first | ((1u128 << shift) - 1);
        table.extend_from_slice(&row_of(first).to_le_bytes());
        table.extend_from_slice(&row_of(last).to_le_bytes());
    }
    table
}

pub fn v4(a: u8, b: u8, c: u8, d: u8) -> u128 {
    u128::from(u32::from_be_bytes([a, b, c, d]))
}

/// DB5 file: three IPv4 ranges and two IPv6 ranges
///
/// | range                     | country | region     | city          |
/// |---------------------------|---------|------------|---------------|
/// | 0.0.0.0 - 8.8.7.255       | -       |            |               |
/// | 8.8.8.0 - 8.8.8.255       | US      | California | Mountain View |
/// | 8.8.9.0 - 255.255.255.255 | DE      | Hessen     |               |
/// | :: - 2001:4860::/32 - 1   | -       |            |               |
/// | 2001:4860:: - max         | US      | California | Mountain View |
pub fn db5(indexed: bool) -> BinBuilder {
    let mut builder = BinBuilder::new(5)
        .v4(Row::new(0).country("-", "-"))
        .v4(
            Row::new(v4(8, 8, 8, 0))
                .country("US", "United States of America")
                .text(Column::Region, "California")
                .text(Column::City, "Mountain View")
                .float(Column::Latitude, 37.405_99)
                .float(Column::Longitude, -122.078_514),
        )
        .v4(
            Row::new(v4(8, 8, 9, 0))
                .country("DE", "Germany")
                .text(Column::Region, "Hessen")
                .float(Column::Latitude, 50.110_92)
                .float(Column::Longitude, 8.682_127),
        )
        .v6(Row::new(0).country("-", "-"))
        .v6(
            Row::new(0x2001_4860u128 << 96)
                .country("US", "United States of America")
                .text(Column::Region, "California")
                .text(Column::City, "Mountain View")
                .float(Column::Latitude, 37.405_99)
                .float(Column::Longitude, -122.078_514),
        );
    if indexed {
        builder = builder.indexed();
    }
    builder
}
