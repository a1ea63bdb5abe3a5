use windows::core::GUID;

use crate::typedefs::FileTime;

/// Formats a moniker time stamp as local time.
///
/// A zero time means "unknown" and renders as `N/A`.
pub fn filetime_to_string(ft: FileTime) -> String {
    if ft.is_zero() {
        return "N/A".to_string();
    }
    ft.to_datetime().map_or_else(
        || "Invalid".to_string(),
        |utc| {
            utc.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

/// Registry form of a class id, e.g. `{00000303-0000-0000-C000-000000000046}`.
pub fn guid_to_string(guid: &GUID) -> String {
    format!(
        "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
        guid.data1,
        guid.data2,
        guid.data3,
        guid.data4[0],
        guid.data4[1],
        guid.data4[2],
        guid.data4[3],
        guid.data4[4],
        guid.data4[5],
        guid.data4[6],
        guid.data4[7],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filetime_to_string_zero() {
        assert_eq!(filetime_to_string(FileTime(0)), "N/A");
    }

    #[test]
    fn test_filetime_to_string_nonzero() {
        let rendered = filetime_to_string(FileTime::from_unix_seconds(1_700_000_000));
        assert_eq!(rendered.len(), "2023-11-14 22:13:20".len());
        assert!(rendered.starts_with("2023-11-1"));
    }

    #[test]
    fn test_guid_to_string() {
        let clsid = GUID::from_u128(0x0000_0303_0000_0000_c000_0000_0000_0046);
        assert_eq!(
            guid_to_string(&clsid),
            "{00000303-0000-0000-C000-000000000046}"
        );
        assert_eq!(
            guid_to_string(&GUID::zeroed()),
            "{00000000-0000-0000-0000-000000000000}"
        );
    }
}
