//! Address canonicalization
//!
//! Turns a textual IPv4 or IPv6 address into the unsigned integer key used
//! by the range search, together with the address family that key belongs
//! to. IPv6 text is first expanded into its full eight-group form so that
//! every spelling of the same address produces the same key.
//!
//! IPv6 addresses that merely carry an IPv4 address are unwrapped and
//! searched in the IPv4 table:
//!
//! ```text
//! ::ffff:a.b.c.d          IPv4-mapped   -> low 32 bits
//! 2002:AABB:CCDD::/16     6to4          -> bits 80..112
//! 2001:0000::/32          Teredo        -> complement of the low 32 bits
//! ```
//!
//! # Example
//!
//! ```
//! use geobin::address::{canonicalize, Family};
//!
//! let addr = canonicalize("2002:0102:0304::").unwrap();
//! assert_eq!(addr.effective, Family::V4);
//! assert_eq!(addr.literal, Family::V6);
//! assert_eq!(addr.value, 0x0102_0304);
//! ```

use crate::error::{GeoError, Result};
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

const V4_MAPPED_FIRST: u128 = 0x0000_0000_0000_0000_0000_ffff_0000_0000;
const V4_MAPPED_LAST: u128 = 0x0000_0000_0000_0000_0000_ffff_ffff_ffff;
const PREFIX_6TO4: u128 = 0x2002;
const PREFIX_TEREDO: u128 = 0x2001_0000;

/// Address family of a canonical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum Family {
    /// 32-bit keys, searched in the IPv4 row table
    V4,
    /// 128-bit keys, searched in the IPv6 row table
    V6,
}

impl Family {
    /// Largest key representable in this family
    pub const fn max_value(self) -> u128 {
        match self {
            Family::V4 => u32::MAX as u128,
            Family::V6 => u128::MAX,
        }
    }

    /// Width in bytes of the range-start field of a row
    pub const fn key_width(self) -> usize {
        match self {
            Family::V4 => 4,
            Family::V6 => 16,
        }
    }

    /// Shift that leaves the top 16 bits of a key (the index bucket)
    pub const fn bucket_shift(self) -> u32 {
        match self {
            Family::V4 => 16,
            Family::V6 => 112,
        }
    }

    /// The family as the conventional number, 4 or 6
    pub const fn number(self) -> u8 {
        match self {
            Family::V4 => 4,
            Family::V6 => 6,
        }
    }
}

impl From<Family> for u8 {
    fn from(family: Family) -> Self {
        family.number()
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPv{}", self.number())
    }
}

/// A normalized, family-tagged search key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalAddress {
    /// Family whose row table is searched (4 after tunnel unwrapping)
    pub effective: Family,
    /// Family of the text as written
    pub literal: Family,
    /// Search key; only the low 32 bits are used for [`Family::V4`]
    pub value: u128,
    /// Dotted quad, or the fully expanded eight-group IPv6 form
    pub normalized: String,
}

impl CanonicalAddress {
    /// Canonicalize an already-parsed address
    pub fn from_ip(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::v4(u32::from(v4)),
            IpAddr::V6(v6) => {
                let normalized = v6
                    .segments()
                    .iter()
                    .map(|s| format!("{:04x}", s))
                    .collect::<Vec<_>>()
                    .join(":");
                Self::from_v6_value(u128::from(v6), normalized)
            }
        }
    }

    fn v4(value: u32) -> Self {
        CanonicalAddress {
            effective: Family::V4,
            literal: Family::V4,
            value: u128::from(value),
            normalized: Ipv4Addr::from(value).to_string(),
        }
    }

    fn from_v6_value(value: u128, normalized: String) -> Self {
        let embedded = if (V4_MAPPED_FIRST..=V4_MAPPED_LAST).contains(&value) {
            Some(value & 0xffff_ffff)
        } else if value >> 112 == PREFIX_6TO4 {
            Some((value >> 80) & 0xffff_ffff)
        } else if value >> 96 == PREFIX_TEREDO {
            Some(!value & 0xffff_ffff)
        } else {
            None
        };

        CanonicalAddress {
            effective: if embedded.is_some() {
                Family::V4
            } else {
                Family::V6
            },
            literal: Family::V6,
            value: embedded.unwrap_or(value),
            normalized,
        }
    }

    /// Index bucket for this key (its top 16 bits within the family)
    pub fn bucket(&self) -> usize {
        (self.value >> self.effective.bucket_shift()) as usize
    }
}

/// Canonicalize an address string into a search key
///
/// # Errors
///
/// [`GeoError::EmptyAddress`] for blank input and [`GeoError::InvalidAddress`]
/// for anything that does not parse, including the legacy rejections
/// described on [`is_legacy_rejected`].
pub fn canonicalize(input: &str) -> Result<CanonicalAddress> {
    let text = input.trim();
    if text.is_empty() {
        return Err(GeoError::EmptyAddress);
    }

    if let Some(value) = parse_strict_ipv4(text) {
        return Ok(CanonicalAddress::v4(value));
    }

    if is_legacy_rejected(text) {
        return Err(GeoError::InvalidAddress(text.to_string()));
    }

    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ok(CanonicalAddress::v4(u32::from(v4))),
        Ok(IpAddr::V6(_)) => {
            let normalized =
                expand_ipv6(text).ok_or_else(|| GeoError::InvalidAddress(text.to_string()))?;
            let value = hextets_to_value(&normalized)
                .ok_or_else(|| GeoError::InvalidAddress(text.to_string()))?;
            Ok(CanonicalAddress::from_v6_value(value, normalized))
        }
        Err(_) => Err(GeoError::InvalidAddress(text.to_string())),
    }
}

/// Parse strict dotted-decimal IPv4: four groups of 1-3 digits, each <= 255
///
/// Leading zeros are accepted (`010.001.000.255`), unlike the standard
/// library parser.
pub fn parse_strict_ipv4(text: &str) -> Option<u32> {
    let mut value = 0u32;
    let mut groups = 0;
    for part in text.split('.') {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let octet: u32 = part.parse().ok()?;
        if octet > 255 {
            return None;
        }
        value = (value << 8) | octet;
        groups += 1;
    }
    (groups == 4).then_some(value)
}

/// Inputs refused before the general parser runs
///
/// Two shapes are rejected on purpose because older lookups rejected them:
/// a string of bare digits, and an address with six leading hextets whose
/// embedded IPv4 tail has an octet with a leading zero
/// (`1:2:3:4:5:6:01.2.3.4`, `1:2:3:4:5:6:1.2.3.04`).
pub fn is_legacy_rejected(text: &str) -> bool {
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }

    let Some(rest) = strip_six_hextets(text) else {
        return false;
    };

    let leading_zero_octet = rest.strip_prefix('0').is_some_and(|after| {
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        digits > 0 && after.as_bytes().get(digits) == Some(&b'.')
    });

    leading_zero_octet
        || rest.match_indices(".0").any(|(i, _)| {
            rest.as_bytes()
                .get(i + 2)
                .is_some_and(|b| b.is_ascii_digit())
        })
}

fn strip_six_hextets(text: &str) -> Option<&str> {
    let mut rest = text;
    for _ in 0..6 {
        let end = rest.find(':')?;
        let group = &rest[..end];
        if group.is_empty() || group.len() > 4 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        rest = &rest[end + 1..];
    }
    Some(rest)
}

/// Expand an IPv6 address into eight zero-padded lowercase hextets
///
/// Handles `::` compression, a dotted IPv4 tail and the bare `::`, which
/// stands for `::ffff:0.0.0.0`. Expanding an already expanded address
/// returns it unchanged. Returns `None` for text that cannot form exactly
/// eight groups.
///
/// ```
/// use geobin::address::expand_ipv6;
///
/// assert_eq!(
///     expand_ipv6("::ffff:1.2.3.4").as_deref(),
///     Some("0000:0000:0000:0000:0000:ffff:0102:0304")
/// );
/// ```
pub fn expand_ipv6(text: &str) -> Option<String> {
    let mut text = text.trim().to_ascii_lowercase();
    if text == "::" {
        text = "::ffff:0.0.0.0".to_string();
    }

    if let Some(colon) = text.rfind(':') {
        let tail = &text[colon + 1..];
        if tail.contains('.') {
            let v4 = parse_strict_ipv4(tail)?;
            text = format!("{}{:x}:{:x}", &text[..=colon], v4 >> 16, v4 & 0xffff);
        }
    }

    let groups: Vec<&str> = match text.split_once("::") {
        Some((left, right)) => {
            if right.contains("::") {
                return None;
            }
            let left: Vec<&str> = split_groups(left);
            let right: Vec<&str> = split_groups(right);
            if left.len() + right.len() > 7 {
                return None;
            }
            let zeros = 8 - (left.len() + right.len());
            left.into_iter()
                .chain(std::iter::repeat("0").take(zeros))
                .chain(right)
                .collect()
        }
        None => text.split(':').collect(),
    };

    if groups.len() != 8 {
        return None;
    }

    let mut expanded = String::with_capacity(39);
    for (i, group) in groups.iter().enumerate() {
        if group.is_empty() || group.len() > 4 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        if i > 0 {
            expanded.push(':');
        }
        for _ in group.len()..4 {
            expanded.push('0');
        }
        expanded.push_str(group);
    }
    Some(expanded)
}

fn split_groups(side: &str) -> Vec<&str> {
    if side.is_empty() {
        Vec::new()
    } else {
        side.split(':').collect()
    }
}

fn hextets_to_value(expanded: &str) -> Option<u128> {
    expanded.split(':').try_fold(0u128, |acc, group| {
        u16::from_str_radix(group, 16)
            .ok()
            .map(|g| (acc << 16) | u128::from(g))
    })
}
