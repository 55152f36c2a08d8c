//! C API
//!
//! A stable C ABI over [`Database`]. Handles are opaque; results are plain
//! structs whose strings are owned by the library and released with
//! [`geobin_result_free`].
//!
//! ```c
//! geobin_t *db = geobin_open("IP2LOCATION-LITE-DB5.BIN", true);
//! geobin_result_t result;
//! if (geobin_query(db, "8.8.8.8", &result) == GEOBIN_STATUS_OK) {
//!     printf("%s %f %f\n", result.country_short, result.latitude, result.longitude);
//! }
//! geobin_result_free(&result);
//! geobin_close(db);
//! ```

use crate::database::Database;
use crate::result::{Field, LookupResult};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

// ============================================================================
// STATUS CODES
// ============================================================================

/// Address resolved
pub const GEOBIN_STATUS_OK: i32 = 0;
/// Empty address string
pub const GEOBIN_STATUS_EMPTY_ADDRESS: i32 = 1;
/// Unparsable or rejected address
pub const GEOBIN_STATUS_INVALID_ADDRESS: i32 = 2;
/// IPv6 address against an IPv4-only database
pub const GEOBIN_STATUS_IPV6_UNSUPPORTED: i32 = 3;
/// No database loaded
pub const GEOBIN_STATUS_MISSING_DATABASE: i32 = 4;
/// I/O failure during the lookup
pub const GEOBIN_STATUS_READ_ERROR: i32 = 5;
/// No range covers the address
pub const GEOBIN_STATUS_NOT_FOUND: i32 = 6;
/// NULL or non-UTF-8 argument
pub const GEOBIN_ERROR_INVALID_PARAM: i32 = -1;

// ============================================================================
// HANDLES
// ============================================================================

/// Opaque database handle
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct geobin_t {
    _private: [u8; 0],
}

/// Query result
///
/// String fields are NULL when the database does not carry the column or
/// the row holds nothing for it.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct geobin_result_t {
    /// One of the `GEOBIN_STATUS_*` codes
    pub status: i32,
    pub country_short: *mut c_char,
    pub country_long: *mut c_char,
    pub region: *mut c_char,
    pub city: *mut c_char,
    /// Whether `latitude` and `longitude` are meaningful
    pub has_coordinates: bool,
    pub latitude: f32,
    pub longitude: f32,
    /// Full result, for geobin_result_to_json
    pub _result: *mut (),
}

impl geobin_result_t {
    fn empty(status: i32) -> Self {
        geobin_result_t {
            status,
            country_short: ptr::null_mut(),
            country_long: ptr::null_mut(),
            region: ptr::null_mut(),
            city: ptr::null_mut(),
            has_coordinates: false,
            latitude: 0.0,
            longitude: 0.0,
            _result: ptr::null_mut(),
        }
    }

    fn from_result(result: LookupResult) -> Self {
        let coordinates = result.coordinates();
        geobin_result_t {
            status: result.status.code(),
            country_short: owned_c_string(&result.country_short),
            country_long: owned_c_string(&result.country_long),
            region: owned_c_string(&result.region),
            city: owned_c_string(&result.city),
            has_coordinates: coordinates.is_some(),
            latitude: coordinates.map_or(0.0, |c| c.0),
            longitude: coordinates.map_or(0.0, |c| c.1),
            _result: Box::into_raw(Box::new(result)) as *mut (),
        }
    }
}

fn owned_c_string(field: &Field<String>) -> *mut c_char {
    field
        .value()
        .and_then(|s| CString::new(s.as_str()).ok())
        .map_or(ptr::null_mut(), CString::into_raw)
}

unsafe fn free_c_string(slot: &mut *mut c_char) {
    if !slot.is_null() {
        drop(CString::from_raw(*slot));
        *slot = ptr::null_mut();
    }
}

impl geobin_t {
    fn from_database(db: Database) -> *mut Self {
        Box::into_raw(Box::new(db)) as *mut Self
    }

    unsafe fn into_database(ptr: *mut Self) -> Box<Database> {
        Box::from_raw(ptr as *mut Database)
    }

    unsafe fn as_database<'a>(ptr: *const Self) -> &'a Database {
        &*(ptr as *const Database)
    }
}

// ============================================================================
// API
// ============================================================================

/// Open a database file
///
/// # Returns
/// * Non-null handle on success
/// * NULL if the file is missing, unreadable or corrupt
///
/// # Safety
/// * `path` must be a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn geobin_open(path: *const c_char, use_mmap: bool) -> *mut geobin_t {
    if path.is_null() {
        return ptr::null_mut();
    }
    let path = match CStr::from_ptr(path).to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    match Database::open(path, use_mmap) {
        Ok(db) => geobin_t::from_database(db),
        Err(_) => ptr::null_mut(),
    }
}

/// Resolve an address
///
/// Fills `*result` and returns its status code, or
/// `GEOBIN_ERROR_INVALID_PARAM` when an argument is NULL or not UTF-8.
/// The result must be released with `geobin_result_free` whenever this
/// function returned a status code.
///
/// # Safety
/// * `db` must be NULL or a handle from `geobin_open`
/// * `address` must be NULL or a valid null-terminated C string
/// * `result` must be NULL or point to writable memory for one result
#[no_mangle]
pub unsafe extern "C" fn geobin_query(
    db: *const geobin_t,
    address: *const c_char,
    result: *mut geobin_result_t,
) -> i32 {
    if result.is_null() {
        return GEOBIN_ERROR_INVALID_PARAM;
    }
    if address.is_null() {
        result.write(geobin_result_t::empty(GEOBIN_ERROR_INVALID_PARAM));
        return GEOBIN_ERROR_INVALID_PARAM;
    }
    let address = match CStr::from_ptr(address).to_str() {
        Ok(s) => s,
        Err(_) => {
            result.write(geobin_result_t::empty(GEOBIN_ERROR_INVALID_PARAM));
            return GEOBIN_ERROR_INVALID_PARAM;
        }
    };

    let lookup = if db.is_null() {
        LookupResult::without_database(address)
    } else {
        geobin_t::as_database(db).query(address)
    };
    let out = geobin_result_t::from_result(lookup);
    let status = out.status;
    result.write(out);
    status
}

/// Render a result as JSON
///
/// # Returns
/// * Newly allocated string, release with `geobin_free_string`
/// * NULL if `result` is NULL or carries no lookup
///
/// # Safety
/// * `result` must be NULL or a result filled by `geobin_query`
#[no_mangle]
pub unsafe extern "C" fn geobin_result_to_json(result: *const geobin_result_t) -> *mut c_char {
    if result.is_null() || (*result)._result.is_null() {
        return ptr::null_mut();
    }
    let lookup = &*((*result)._result as *const LookupResult);
    match serde_json::to_string(lookup).map(CString::new) {
        Ok(Ok(json)) => json.into_raw(),
        _ => ptr::null_mut(),
    }
}

/// Release the strings owned by a result
///
/// # Safety
/// * `result` must be NULL or a result filled by `geobin_query`
/// * Calling twice on the same result is a no-op
#[no_mangle]
pub unsafe extern "C" fn geobin_result_free(result: *mut geobin_result_t) {
    if result.is_null() {
        return;
    }
    let result = &mut *result;
    free_c_string(&mut result.country_short);
    free_c_string(&mut result.country_long);
    free_c_string(&mut result.region);
    free_c_string(&mut result.city);
    if !result._result.is_null() {
        drop(Box::from_raw(result._result as *mut LookupResult));
        result._result = ptr::null_mut();
    }
}

/// Free a string returned by geobin
///
/// # Safety
/// * `string` must be NULL or a pointer returned by geobin
#[no_mangle]
pub unsafe extern "C" fn geobin_free_string(string: *mut c_char) {
    if !string.is_null() {
        drop(CString::from_raw(string));
    }
}

/// Close a database handle
///
/// # Safety
/// * `db` must be NULL or a handle from `geobin_open`, not used afterwards
#[no_mangle]
pub unsafe extern "C" fn geobin_close(db: *mut geobin_t) {
    if !db.is_null() {
        geobin_t::into_database(db).close();
    }
}

/// Library version; valid for the program lifetime, do not free
#[no_mangle]
pub extern "C" fn geobin_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Status;
    use crate::test_support::tiny_db1;
    use std::mem::MaybeUninit;

    fn c_path(file: &tempfile::NamedTempFile) -> CString {
        CString::new(file.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_open_query_close() {
        let file = tiny_db1();
        let path = c_path(&file);
        let address = CString::new("10.0.0.1").unwrap();

        unsafe {
            let db = geobin_open(path.as_ptr(), true);
            assert!(!db.is_null());

            let mut result = MaybeUninit::<geobin_result_t>::uninit();
            let status = geobin_query(db, address.as_ptr(), result.as_mut_ptr());
            let mut result = result.assume_init();
            assert_eq!(status, GEOBIN_STATUS_OK);
            assert_eq!(CStr::from_ptr(result.country_short).to_str().unwrap(), "US");
            assert!(result.city.is_null());
            assert!(!result.has_coordinates);

            let json = geobin_result_to_json(&result);
            assert!(!json.is_null());
            let text = CStr::from_ptr(json).to_str().unwrap().to_string();
            assert!(text.contains("\"status\":\"OK\""));
            geobin_free_string(json);

            geobin_result_free(&mut result);
            assert!(result.country_short.is_null());
            geobin_result_free(&mut result);
            geobin_close(db);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let address = CString::new("999.999.999.999").unwrap();
        unsafe {
            assert!(geobin_open(ptr::null(), true).is_null());
            let missing = CString::new("/nonexistent/geo.bin").unwrap();
            assert!(geobin_open(missing.as_ptr(), false).is_null());

            let mut result = MaybeUninit::<geobin_result_t>::uninit();
            let status = geobin_query(ptr::null(), address.as_ptr(), result.as_mut_ptr());
            assert_eq!(status, GEOBIN_STATUS_MISSING_DATABASE);
            geobin_result_free(result.as_mut_ptr());

            let blank = CString::new("").unwrap();
            let status = geobin_query(ptr::null(), blank.as_ptr(), result.as_mut_ptr());
            assert_eq!(status, GEOBIN_STATUS_EMPTY_ADDRESS);
            geobin_result_free(result.as_mut_ptr());

            assert_eq!(
                geobin_query(ptr::null(), address.as_ptr(), ptr::null_mut()),
                GEOBIN_ERROR_INVALID_PARAM
            );
            geobin_close(ptr::null_mut());
        }
    }

    #[test]
    fn test_codes_match_status() {
        assert_eq!(GEOBIN_STATUS_OK, Status::Ok.code());
        assert_eq!(GEOBIN_STATUS_EMPTY_ADDRESS, Status::EmptyAddress.code());
        assert_eq!(GEOBIN_STATUS_INVALID_ADDRESS, Status::InvalidAddress.code());
        assert_eq!(GEOBIN_STATUS_IPV6_UNSUPPORTED, Status::Ipv6Unsupported.code());
        assert_eq!(GEOBIN_STATUS_MISSING_DATABASE, Status::MissingDatabase.code());
        assert_eq!(GEOBIN_STATUS_READ_ERROR, Status::ReadError.code());
        assert_eq!(GEOBIN_STATUS_NOT_FOUND, Status::NotFound.code());
    }

    #[test]
    fn test_version() {
        let version = unsafe { CStr::from_ptr(geobin_version()) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }
}
