//! Row decoding
//!
//! A matched row is kept as raw column bytes ([`LookupRecord`]) and decoded
//! column by column through the [`ColumnLayout`] of the database. Every
//! column is a little-endian u32 whose meaning depends on the column:
//!
//! | column                | u32 holds                                   |
//! |-----------------------|---------------------------------------------|
//! | latitude, longitude   | IEEE-754 single-precision bit pattern       |
//! | country               | pointer to short name; long name at ptr + 3 |
//! | elevation             | pointer to ASCII text parsed as a float     |
//! | everything else       | pointer to a `[len:u8][bytes]` string       |

use crate::error::{GeoError, Result};
use crate::result::{Field, LookupResult};
use crate::schema::{Column, ColumnLayout};
use crate::source::{ByteSource, Region};
use std::io;

/// Offset from the country pointer to the long country name
const COUNTRY_LONG_OFFSET: u64 = 3;

/// A matched row: its range and the bytes after the range start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRecord {
    pub range_start: u128,
    /// Exclusive upper bound (start of the next row, or the family maximum)
    pub range_end: u128,
    columns: Vec<u8>,
}

impl LookupRecord {
    pub(crate) fn new(range_start: u128, range_end: u128, columns: Vec<u8>) -> Self {
        LookupRecord {
            range_start,
            range_end,
            columns,
        }
    }

    /// Raw non-key column bytes
    pub fn columns(&self) -> &[u8] {
        &self.columns
    }

    /// The u32 stored at a column byte offset
    pub fn column_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.columns.get(offset..offset.checked_add(4)?)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Decodes the columns of a record for one schema layout
pub struct FieldDecoder<'a> {
    source: &'a dyn ByteSource,
    layout: &'a ColumnLayout,
}

impl<'a> FieldDecoder<'a> {
    pub fn new(source: &'a dyn ByteSource, layout: &'a ColumnLayout) -> Self {
        FieldDecoder { source, layout }
    }

    /// Fill every column of `result` from `record`
    ///
    /// Columns the layout lacks are left as [`Field::NotSupported`].
    pub fn decode_into(&self, record: &LookupRecord, result: &mut LookupResult) -> Result<()> {
        for column in self.layout.columns() {
            match column {
                Column::Country => {
                    let ptr = self.pointer(record, column)?;
                    result.country_short = self.string_at(ptr)?;
                    result.country_long = self.string_at(ptr + COUNTRY_LONG_OFFSET)?;
                }
                Column::Latitude => result.latitude = self.coordinate(record, column)?,
                Column::Longitude => result.longitude = self.coordinate(record, column)?,
                Column::Elevation => result.elevation = self.elevation(record)?,
                other => {
                    if let Some(slot) = string_slot(result, other) {
                        let ptr = self.pointer(record, other)?;
                        *slot = self.string_at(ptr)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn raw(&self, record: &LookupRecord, column: Column) -> Result<u32> {
        let offset = self.layout.offset(column).ok_or_else(|| {
            GeoError::Read(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not part of this schema", column),
            ))
        })?;
        record.column_u32(offset).ok_or_else(|| {
            GeoError::Read(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("row too short for {}", column),
            ))
        })
    }

    fn pointer(&self, record: &LookupRecord, column: Column) -> Result<u64> {
        self.raw(record, column).map(u64::from)
    }

    fn coordinate(&self, record: &LookupRecord, column: Column) -> Result<Field<f32>> {
        let value = f32::from_bits(self.raw(record, column)?);
        Ok(Field::Value(round_coordinate(value)))
    }

    fn elevation(&self, record: &LookupRecord) -> Result<Field<f32>> {
        let ptr = self.pointer(record, Column::Elevation)?;
        let text = self.read_string(ptr)?;
        Ok(Field::Value(text.trim().parse::<f32>().unwrap_or(0.0)))
    }

    fn string_at(&self, ptr: u64) -> Result<Field<String>> {
        let text = self.read_string(ptr)?;
        Ok(if text.is_empty() {
            Field::Absent
        } else {
            Field::Value(text)
        })
    }

    /// Read a `[len:u8][bytes]` record at an absolute offset
    pub fn read_string(&self, ptr: u64) -> Result<String> {
        let mut len = [0u8; 1];
        self.source.read_range(Region::Payload, ptr, &mut len)?;
        if len[0] == 0 {
            return Ok(String::new());
        }
        let mut buf = vec![0u8; usize::from(len[0])];
        self.source.read_range(Region::Payload, ptr + 1, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Round to at most six fractional digits
pub fn round_coordinate(value: f32) -> f32 {
    format!("{:.6}", value).parse().unwrap_or(value)
}

fn string_slot(result: &mut LookupResult, column: Column) -> Option<&mut Field<String>> {
    Some(match column {
        Column::Region => &mut result.region,
        Column::City => &mut result.city,
        Column::Isp => &mut result.isp,
        Column::Domain => &mut result.domain,
        Column::ZipCode => &mut result.zip_code,
        Column::TimeZone => &mut result.time_zone,
        Column::NetSpeed => &mut result.net_speed,
        Column::IddCode => &mut result.idd_code,
        Column::AreaCode => &mut result.area_code,
        Column::WeatherStationCode => &mut result.weather_station_code,
        Column::WeatherStationName => &mut result.weather_station_name,
        Column::Mcc => &mut result.mcc,
        Column::Mnc => &mut result.mnc,
        Column::MobileBrand => &mut result.mobile_brand,
        Column::UsageType => &mut result.usage_type,
        Column::AddressType => &mut result.address_type,
        Column::Category => &mut result.category,
        Column::Country | Column::Latitude | Column::Longitude | Column::Elevation => {
            return None
        }
    })
}
