//! End-to-end lookups against synthetic BIN files

mod common;

use common::{db5, v4, write_bytes, BinBuilder, Row};
use geobin::{Column, Database, Family, Field, GeoError, LookupResult, Status};

fn both_modes(file: &tempfile::NamedTempFile) -> [Database; 2] {
    [
        Database::open(file.path(), true).unwrap(),
        Database::open(file.path(), false).unwrap(),
    ]
}

fn text(field: &Field<String>) -> Option<&str> {
    field.value().map(String::as_str)
}

fn assert_mountain_view(result: &LookupResult) {
    assert_eq!(result.status, Status::Ok, "{:?}", result);
    assert_eq!(text(&result.country_short), Some("US"));
    assert_eq!(text(&result.country_long), Some("United States of America"));
    assert_eq!(text(&result.region), Some("California"));
    assert_eq!(text(&result.city), Some("Mountain View"));
    let (lat, lon) = result.coordinates().unwrap();
    assert!((lat - 37.405_99).abs() < 1e-5);
    assert!((lon + 122.078_514).abs() < 1e-5);
}

#[test]
fn test_ipv4_lookup_both_modes() {
    for indexed in [false, true] {
        let file = db5(indexed).write();
        for db in both_modes(&file) {
            let result = db.query("8.8.8.8");
            assert_mountain_view(&result);
            assert_eq!(result.normalized.as_deref(), Some("8.8.8.8"));
            assert_eq!(result.family, Some(Family::V4));

            let result = db.query("8.8.9.1");
            assert_eq!(text(&result.country_short), Some("DE"));
            assert_eq!(result.city, Field::Absent);

            let result = db.query("1.1.1.1");
            assert_eq!(text(&result.country_short), Some("-"));
            assert_eq!(text(&result.country_long), Some("-"));
        }
    }
}

#[test]
fn test_range_boundaries() {
    let file = db5(true).write();
    let db = Database::open(file.path(), true).unwrap();

    assert_eq!(text(&db.query("8.8.7.255").country_short), Some("-"));
    assert_eq!(text(&db.query("8.8.8.0").country_short), Some("US"));
    assert_eq!(text(&db.query("8.8.8.255").country_short), Some("US"));
    assert_eq!(text(&db.query("8.8.9.0").country_short), Some("DE"));
    assert_eq!(text(&db.query("0.0.0.0").country_short), Some("-"));
}

#[test]
fn test_family_maximum_is_clamped() {
    let file = db5(false).write();
    for db in both_modes(&file) {
        assert_eq!(text(&db.query("255.255.255.255").country_short), Some("DE"));
        let top = db.query("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff");
        assert_eq!(top.status, Status::Ok);
        assert_eq!(text(&top.country_short), Some("US"));
    }
}

#[test]
fn test_ipv6_lookup() {
    let file = db5(true).write();
    for db in both_modes(&file) {
        let result = db.query("2001:4860:4860::8888");
        assert_mountain_view(&result);
        assert_eq!(
            result.normalized.as_deref(),
            Some("2001:4860:4860:0000:0000:0000:0000:8888")
        );
        assert_eq!(result.family, Some(Family::V6));
        assert_eq!(result.effective_family, Some(Family::V6));

        assert_eq!(text(&db.query("2001:4000::1").country_short), Some("-"));
    }
}

#[test]
fn test_embedded_ipv4_forms() {
    let file = db5(false).write();
    let db = Database::open(file.path(), true).unwrap();

    for address in [
        "::ffff:8.8.8.8",
        "::ffff:0808:0808",
        "2002:0808:0808::",
        "2001:0000:4136:e378:8000:63bf:f7f7:f7f7",
    ] {
        let result = db.query(address);
        assert_eq!(result.status, Status::Ok, "{}", address);
        assert_eq!(text(&result.country_short), Some("US"), "{}", address);
        assert_eq!(result.family, Some(Family::V6));
        assert_eq!(result.effective_family, Some(Family::V4));
    }
}

#[test]
fn test_legacy_file_rejects_ipv6() {
    let file = BinBuilder::new(1)
        .v4(Row::new(0).country("-", "-"))
        .v4(Row::new(v4(10, 0, 0, 0)).country("NL", "Netherlands"))
        .indexed()
        .write();
    for db in both_modes(&file) {
        assert!(db.metadata().is_legacy());
        assert_eq!(db.query("10.1.2.3").status, Status::Ok);
        assert_eq!(db.query("2001:db8::1").status, Status::Ipv6Unsupported);

        // Tunnelled IPv4 still resolves through the IPv4 table
        let tunnelled = db.query("2002:0a00:0001::");
        assert_eq!(tunnelled.status, Status::Ok);
        assert_eq!(text(&tunnelled.country_short), Some("NL"));
    }
}

#[test]
fn test_uncovered_address_not_found() {
    let file = BinBuilder::new(3)
        .v4(Row::new(v4(10, 0, 0, 0)).country("NL", "Netherlands"))
        .write();
    for db in both_modes(&file) {
        let result = db.query("1.1.1.1");
        assert_eq!(result.status, Status::NotFound);
        assert_eq!(result.normalized.as_deref(), Some("1.1.1.1"));
        assert_eq!(db.query("10.0.0.1").status, Status::Ok);
    }
}

#[test]
fn test_unsupported_versus_absent() {
    let file = db5(false).write();
    let db = Database::open(file.path(), false).unwrap();
    let result = db.query("8.8.9.9");

    assert_eq!(result.isp, Field::NotSupported);
    assert_eq!(result.elevation, Field::NotSupported);
    assert_eq!(result.city, Field::Absent);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("isp").is_none());
    assert!(json["city"].is_null());
    assert_eq!(json["status"], "OK");
}

#[test]
fn test_wide_schema_columns() {
    let file = BinBuilder::new(26)
        .v4(
            Row::new(0)
                .country("JP", "Japan")
                .text(Column::Isp, "Example Net")
                .text(Column::Elevation, "44")
                .text(Column::UsageType, "ISP")
                .text(Column::AddressType, "U")
                .text(Column::Category, "IAB19-18"),
        )
        .v4(
            Row::new(v4(100, 0, 0, 0))
                .country("JP", "Japan")
                .text(Column::Elevation, "unknown"),
        )
        .write();

    for db in both_modes(&file) {
        let result = db.query("1.2.3.4");
        assert_eq!(text(&result.isp), Some("Example Net"));
        assert_eq!(result.elevation, Field::Value(44.0));
        assert_eq!(text(&result.usage_type), Some("ISP"));
        assert_eq!(text(&result.address_type), Some("U"));
        assert_eq!(text(&result.category), Some("IAB19-18"));
        assert_eq!(result.latitude, Field::Value(0.0));

        let other = db.query("200.0.0.1");
        assert_eq!(other.elevation, Field::Value(0.0));
        assert_eq!(other.mobile_brand, Field::Absent);
    }
}

#[test]
fn test_invalid_addresses() {
    let file = db5(false).write();
    let db = Database::open(file.path(), true).unwrap();

    assert_eq!(db.query("").status, Status::EmptyAddress);
    assert_eq!(db.query("   ").status, Status::EmptyAddress);
    for bad in ["256.1.1.1", "1.2.3", "example.com", "12345", "1:2:3:4:5:6:01.2.3.4"] {
        let result = db.query(bad);
        assert_eq!(result.status, Status::InvalidAddress, "{}", bad);
        assert!(result.country_short.is_not_supported());
    }
    assert!(matches!(db.lookup("nope"), Err(GeoError::InvalidAddress(_))));
}

#[test]
fn test_leading_zero_ipv4_accepted() {
    let file = db5(false).write();
    let db = Database::open(file.path(), true).unwrap();
    let result = db.query("008.008.008.008");
    assert_eq!(result.status, Status::Ok);
    assert_eq!(result.normalized.as_deref(), Some("8.8.8.8"));
}

#[test]
fn test_mapping_is_lazy_and_idempotent() {
    let file = db5(false).write();
    let db = Database::open(file.path(), true).unwrap();
    assert!(!db.is_mapped());

    db.query("8.8.8.8");
    assert!(db.is_mapped());
    let first = db.map_regions().unwrap() as *const _;
    let second = db.map_regions().unwrap() as *const _;
    assert_eq!(first, second);

    let direct = Database::open(file.path(), false).unwrap();
    direct.query("8.8.8.8");
    assert!(!direct.is_mapped());
}

#[test]
fn test_corrupt_files() {
    let good = db5(true).build();

    // Truncated inside the row tables
    let truncated = write_bytes(&good[..good.len() / 2]);
    assert!(matches!(
        Database::open(truncated.path(), true),
        Err(GeoError::CorruptDatabase(_))
    ));

    let short = write_bytes(&good[..10]);
    assert!(matches!(
        Database::open(short.path(), false),
        Err(GeoError::CorruptDatabase(_))
    ));

    let mut zipped = good.clone();
    zipped[..2].copy_from_slice(b"PK");
    assert!(Database::open(write_bytes(&zipped).path(), true).is_err());

    let bad_product = db5(false).date(23, 1, 1).product_code(7).write();
    assert!(matches!(
        Database::open(bad_product.path(), true),
        Err(GeoError::CorruptDatabase(_))
    ));

    // Before the product code existed any value is accepted
    let old = db5(false).date(20, 1, 1).product_code(0).write();
    assert!(Database::open(old.path(), true).is_ok());

    let bad_schema = BinBuilder::new(27).v4(Row::new(0)).write();
    assert!(Database::open(bad_schema.path(), true).is_err());

    let too_few_columns = db5(false).column_count(3).write();
    assert!(Database::open(too_few_columns.path(), true).is_err());
}

#[test]
fn test_missing_file() {
    let err = Database::open("/nonexistent/dir/geo.bin", true).unwrap_err();
    assert!(matches!(err, GeoError::MissingDatabase { .. }));
    assert_eq!(Status::from(&err), Status::MissingDatabase);
}

#[test]
fn test_metadata() {
    let file = db5(true).date(24, 11, 3).write();
    let db = Database::open(file.path(), true).unwrap();
    let meta = db.metadata();

    assert_eq!(meta.schema_type, 5);
    assert_eq!(meta.column_count, 6);
    assert_eq!(meta.release_date(), "2024-11-03");
    assert_eq!(meta.ipv4_count, 3);
    assert_eq!(meta.ipv6_count, 2);
    assert!(!db.index(Family::V4).is_empty());
    assert!(!db.index(Family::V6).is_empty());
    assert_eq!(
        db.layout().columns().collect::<Vec<_>>(),
        vec![
            Column::Country,
            Column::Region,
            Column::City,
            Column::Latitude,
            Column::Longitude
        ]
    );
}
