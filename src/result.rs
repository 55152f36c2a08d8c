//! Query results
//!
//! Every query produces a [`LookupResult`], whether or not it succeeded.
//! Each column is a [`Field`], which keeps apart a schema that does not carry
//! the column ([`Field::NotSupported`]) from a row that carries it but holds
//! nothing ([`Field::Absent`]).

use crate::address::Family;
use crate::error::GeoError;
use crate::schema::Column;
use serde::{Serialize, Serializer};
use std::fmt;

/// Outcome of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    EmptyAddress,
    InvalidAddress,
    Ipv6Unsupported,
    MissingDatabase,
    /// I/O failure while reading rows or payload
    ReadError,
    /// No row covers the address
    NotFound,
}

impl Status {
    /// Stable numeric code, as returned through the C ABI
    pub const fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::EmptyAddress => 1,
            Status::InvalidAddress => 2,
            Status::Ipv6Unsupported => 3,
            Status::MissingDatabase => 4,
            Status::ReadError => 5,
            Status::NotFound => 6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::EmptyAddress => "EMPTY_ADDRESS",
            Status::InvalidAddress => "INVALID_ADDRESS",
            Status::Ipv6Unsupported => "IPV6_UNSUPPORTED",
            Status::MissingDatabase => "MISSING_DATABASE",
            Status::ReadError => "READ_ERROR",
            Status::NotFound => "NOT_FOUND",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&GeoError> for Status {
    fn from(err: &GeoError) -> Self {
        match err {
            GeoError::EmptyAddress => Status::EmptyAddress,
            GeoError::InvalidAddress(_) => Status::InvalidAddress,
            GeoError::MissingDatabase { .. } | GeoError::CorruptDatabase(_) => {
                Status::MissingDatabase
            }
            GeoError::Ipv6Unsupported => Status::Ipv6Unsupported,
            GeoError::Read(_) => Status::ReadError,
            GeoError::NotFound => Status::NotFound,
        }
    }
}

/// One decoded column
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// The row holds a value
    Value(T),
    /// The schema type has no such column
    NotSupported,
    /// The column exists but is empty for this row
    Absent,
}

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Field::NotSupported)
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Field::NotSupported)
    }
}

impl<T: fmt::Display> Field<T> {
    /// Value rendered as text, `None` unless a value is present
    pub fn text(&self) -> Option<String> {
        self.value().map(|v| v.to_string())
    }
}

// Values serialize as themselves and absent columns as null. Unsupported
// columns are skipped at the struct level.
impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            Field::NotSupported | Field::Absent => serializer.serialize_none(),
        }
    }
}

/// The result of one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    /// Address as given (trimmed)
    pub address: String,
    /// Dotted quad or expanded IPv6 form, when the address parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    pub status: Status,
    /// Family of the address as written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<Family>,
    /// Family of the table that was searched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_family: Option<Family>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub country_short: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub country_long: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub region: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub city: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub isp: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub latitude: Field<f32>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub longitude: Field<f32>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub domain: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub zip_code: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub time_zone: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub net_speed: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub idd_code: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub area_code: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub weather_station_code: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub weather_station_name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub mcc: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub mnc: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub mobile_brand: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub elevation: Field<f32>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub usage_type: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub address_type: Field<String>,
    #[serde(skip_serializing_if = "Field::is_not_supported")]
    pub category: Field<String>,
}

/// Column names in output order, as used for CSV headers
pub const FIELD_NAMES: [&str; 22] = [
    "country_short",
    "country_long",
    "region",
    "city",
    "isp",
    "latitude",
    "longitude",
    "domain",
    "zip_code",
    "time_zone",
    "net_speed",
    "idd_code",
    "area_code",
    "weather_station_code",
    "weather_station_name",
    "mcc",
    "mnc",
    "mobile_brand",
    "elevation",
    "usage_type",
    "address_type",
    "category",
];

impl LookupResult {
    /// A result with every column unsupported and the given status
    pub fn with_status(address: impl Into<String>, status: Status) -> Self {
        LookupResult {
            address: address.into(),
            normalized: None,
            status,
            family: None,
            effective_family: None,
            country_short: Field::NotSupported,
            country_long: Field::NotSupported,
            region: Field::NotSupported,
            city: Field::NotSupported,
            isp: Field::NotSupported,
            latitude: Field::NotSupported,
            longitude: Field::NotSupported,
            domain: Field::NotSupported,
            zip_code: Field::NotSupported,
            time_zone: Field::NotSupported,
            net_speed: Field::NotSupported,
            idd_code: Field::NotSupported,
            area_code: Field::NotSupported,
            weather_station_code: Field::NotSupported,
            weather_station_name: Field::NotSupported,
            mcc: Field::NotSupported,
            mnc: Field::NotSupported,
            mobile_brand: Field::NotSupported,
            elevation: Field::NotSupported,
            usage_type: Field::NotSupported,
            address_type: Field::NotSupported,
            category: Field::NotSupported,
        }
    }

    /// Answer for a query made with no database loaded
    ///
    /// Blank input is still reported as [`Status::EmptyAddress`].
    pub fn without_database(address: &str) -> Self {
        let address = address.trim();
        if address.is_empty() {
            Self::with_status(address, Status::EmptyAddress)
        } else {
            Self::with_status(address, Status::MissingDatabase)
        }
    }

    /// A failed result carrying the status for `err`
    pub fn from_error(address: impl Into<String>, err: &GeoError) -> Self {
        Self::with_status(address, Status::from(err))
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Latitude and longitude, when both are present
    pub fn coordinates(&self) -> Option<(f32, f32)> {
        Some((*self.latitude.value()?, *self.longitude.value()?))
    }

    /// String column by schema column
    ///
    /// For [`Column::Country`] this is the short (ISO) name. Float columns
    /// are rendered as text.
    pub fn column_text(&self, column: Column) -> Option<String> {
        match column {
            Column::Country => self.country_short.text(),
            Column::Region => self.region.text(),
            Column::City => self.city.text(),
            Column::Isp => self.isp.text(),
            Column::Latitude => self.latitude.text(),
            Column::Longitude => self.longitude.text(),
            Column::Domain => self.domain.text(),
            Column::ZipCode => self.zip_code.text(),
            Column::TimeZone => self.time_zone.text(),
            Column::NetSpeed => self.net_speed.text(),
            Column::IddCode => self.idd_code.text(),
            Column::AreaCode => self.area_code.text(),
            Column::WeatherStationCode => self.weather_station_code.text(),
            Column::WeatherStationName => self.weather_station_name.text(),
            Column::Mcc => self.mcc.text(),
            Column::Mnc => self.mnc.text(),
            Column::MobileBrand => self.mobile_brand.text(),
            Column::Elevation => self.elevation.text(),
            Column::UsageType => self.usage_type.text(),
            Column::AddressType => self.address_type.text(),
            Column::Category => self.category.text(),
        }
    }

    /// Every column as text, in [`FIELD_NAMES`] order
    pub fn text_fields(&self) -> [Option<String>; 22] {
        let mut out: [Option<String>; 22] = Default::default();
        out[0] = self.country_short.text();
        out[1] = self.country_long.text();
        for (slot, column) in out[2..].iter_mut().zip(Column::ALL[1..].iter()) {
            *slot = self.column_text(*column);
        }
        out
    }
}
