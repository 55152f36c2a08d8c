//! Per-schema column layout
//!
//! A BIN file declares a schema type between 1 and 26. The type decides
//! which optional columns a row carries and where each one sits. Positions
//! below count fields of a row from 1, the range start being position 1, so
//! position 2 is the first 4-byte column after the key.
//!
//! ```text
//! IPv4 row:  [start:u32][col 2][col 3] ... [col N]
//! IPv6 row:  [start:u128][col 2][col 3] ... [col N]
//!                        ^ byte offset 0 of the column buffer
//! ```

use serde::Serialize;
use std::fmt;

/// Number of optional columns known to the decoder
pub const COLUMN_COUNT: usize = 21;

/// Highest schema type in the table
pub const MAX_SCHEMA_TYPE: u8 = 26;

/// Optional output column of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Country short and long names (one pointer serves both)
    Country = 0,
    /// Region or state
    Region,
    /// City
    City,
    /// Internet service provider
    Isp,
    /// Latitude (f32)
    Latitude,
    /// Longitude (f32)
    Longitude,
    /// Domain name of the network
    Domain,
    /// Postal code
    ZipCode,
    /// UTC offset
    TimeZone,
    /// Connection speed class
    NetSpeed,
    /// International direct dialing code
    IddCode,
    /// Telephone area code
    AreaCode,
    /// Weather station code
    WeatherStationCode,
    /// Weather station name
    WeatherStationName,
    /// Mobile country code
    Mcc,
    /// Mobile network code
    Mnc,
    /// Mobile carrier brand
    MobileBrand,
    /// Elevation in meters (stored as text)
    Elevation,
    /// Usage type (commercial, ISP, data center, ...)
    UsageType,
    /// Address type (unicast, broadcast, ...)
    AddressType,
    /// IAB category
    Category,
}

impl Column {
    /// All columns in table order
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::Country,
        Column::Region,
        Column::City,
        Column::Isp,
        Column::Latitude,
        Column::Longitude,
        Column::Domain,
        Column::ZipCode,
        Column::TimeZone,
        Column::NetSpeed,
        Column::IddCode,
        Column::AreaCode,
        Column::WeatherStationCode,
        Column::WeatherStationName,
        Column::Mcc,
        Column::Mnc,
        Column::MobileBrand,
        Column::Elevation,
        Column::UsageType,
        Column::AddressType,
        Column::Category,
    ];

    /// Snake-case name used in JSON and CSV output
    pub const fn name(self) -> &'static str {
        match self {
            Column::Country => "country",
            Column::Region => "region",
            Column::City => "city",
            Column::Isp => "isp",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
            Column::Domain => "domain",
            Column::ZipCode => "zip_code",
            Column::TimeZone => "time_zone",
            Column::NetSpeed => "net_speed",
            Column::IddCode => "idd_code",
            Column::AreaCode => "area_code",
            Column::WeatherStationCode => "weather_station_code",
            Column::WeatherStationName => "weather_station_name",
            Column::Mcc => "mcc",
            Column::Mnc => "mnc",
            Column::MobileBrand => "mobile_brand",
            Column::Elevation => "elevation",
            Column::UsageType => "usage_type",
            Column::AddressType => "address_type",
            Column::Category => "category",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// One row per schema type, one entry per `Column` in declaration order.
// 0 means the schema does not carry the column.
#[rustfmt::skip]
const POSITIONS: [[u8; COLUMN_COUNT]; MAX_SCHEMA_TYPE as usize] = [
    //C  R  Ci Isp La Lo Dom Zip TZ NS Idd Ar WsC WsN Mcc Mnc MB El Use AT Cat
    [2, 0, 0, 0, 0, 0, 0,  0,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 1
    [2, 0, 0, 3, 0, 0, 0,  0,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 2
    [2, 3, 4, 0, 0, 0, 0,  0,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 3
    [2, 3, 4, 5, 0, 0, 0,  0,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 4
    [2, 3, 4, 0, 5, 6, 0,  0,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 5
    [2, 3, 4, 7, 5, 6, 0,  0,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 6
    [2, 3, 4, 5, 0, 0, 6,  0,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 7
    [2, 3, 4, 7, 5, 6, 8,  0,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 8
    [2, 3, 4, 0, 5, 6, 0,  7,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 9
    [2, 3, 4, 8, 5, 6, 9,  7,  0, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 10
    [2, 3, 4, 0, 5, 6, 0,  7,  8, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 11
    [2, 3, 4, 9, 5, 6, 10, 7,  8, 0,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 12
    [2, 3, 4, 0, 5, 6, 0,  0,  7, 8,  0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 13
    [2, 3, 4, 9, 5, 6, 10, 7,  8, 11, 0,  0,  0,  0,  0,  0,  0, 0,  0,  0,  0], // 14
    [2, 3, 4, 0, 5, 6, 0,  7,  8, 0,  9,  10, 0,  0,  0,  0,  0, 0,  0,  0,  0], // 15
    [2, 3, 4, 9, 5, 6, 10, 7,  8, 11, 12, 13, 0,  0,  0,  0,  0, 0,  0,  0,  0], // 16
    [2, 3, 4, 0, 5, 6, 0,  0,  7, 8,  0,  0,  9,  10, 0,  0,  0, 0,  0,  0,  0], // 17
    [2, 3, 4, 9, 5, 6, 10, 7,  8, 11, 12, 13, 14, 15, 0,  0,  0, 0,  0,  0,  0], // 18
    [2, 3, 4, 7, 5, 6, 8,  0,  0, 0,  0,  0,  0,  0,  9,  10, 11, 0, 0,  0,  0], // 19
    [2, 3, 4, 9, 5, 6, 10, 7,  8, 11, 12, 13, 14, 15, 16, 17, 18, 0, 0,  0,  0], // 20
    [2, 3, 4, 0, 5, 6, 0,  7,  8, 0,  9,  10, 0,  0,  0,  0,  0, 11, 0,  0,  0], // 21
    [2, 3, 4, 9, 5, 6, 10, 7,  8, 11, 12, 13, 14, 15, 16, 17, 18, 19, 0, 0,  0], // 22
    [2, 3, 4, 7, 5, 6, 8,  0,  0, 0,  0,  0,  0,  0,  9,  10, 11, 0, 12,  0,  0], // 23
    [2, 3, 4, 9, 5, 6, 10, 7,  8, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 0,  0], // 24
    [2, 3, 4, 9, 5, 6, 10, 7,  8, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22], // 25
    [2, 3, 4, 9, 5, 6, 10, 7,  8, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22], // 26
];

/// Position (1-based field number) of `column` in rows of `schema_type`
pub fn position(schema_type: u8, column: Column) -> Option<u8> {
    let row = POSITIONS.get(usize::from(schema_type).checked_sub(1)?)?;
    match row[column as usize] {
        0 => None,
        pos => Some(pos),
    }
}

/// Byte offsets of every column for one schema type
///
/// Offsets are relative to the first byte after the row's range start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    offsets: [Option<u16>; COLUMN_COUNT],
}

impl ColumnLayout {
    /// Layout for a schema type, or `None` outside 1..=26
    pub fn for_schema(schema_type: u8) -> Option<Self> {
        if !(1..=MAX_SCHEMA_TYPE).contains(&schema_type) {
            return None;
        }
        let mut offsets = [None; COLUMN_COUNT];
        for column in Column::ALL {
            offsets[column as usize] =
                position(schema_type, column).map(|pos| u16::from(pos - 2) * 4);
        }
        Some(ColumnLayout { offsets })
    }

    /// Byte offset of `column` within the column buffer
    #[inline]
    pub fn offset(&self, column: Column) -> Option<usize> {
        self.offsets[column as usize].map(usize::from)
    }

    /// Whether this schema carries `column`
    #[inline]
    pub fn supports(&self, column: Column) -> bool {
        self.offsets[column as usize].is_some()
    }

    /// Columns carried by this schema, in table order
    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        Column::ALL.into_iter().filter(|c| self.supports(*c))
    }

    /// Smallest header column count able to hold every enabled column
    pub fn min_column_count(&self) -> u8 {
        self.offsets
            .iter()
            .flatten()
            .map(|off| (off / 4) as u8 + 2)
            .max()
            .unwrap_or(1)
    }
}
