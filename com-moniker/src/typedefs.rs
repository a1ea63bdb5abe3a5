use std::time::Duration;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use windows::Win32::Foundation::FILETIME;

/// Status codes of the moniker protocol.
///
/// Kept as raw values so the mapping does not depend on which
/// `windows` module happens to export them.
#[allow(clippy::cast_possible_wrap)]
pub mod codes {
    use windows::core::HRESULT;

    pub const S_OK: HRESULT = HRESULT(0);
    pub const S_FALSE: HRESULT = HRESULT(1);

    pub const E_NOTIMPL: HRESULT = HRESULT(0x8000_4001_u32 as i32);
    pub const E_NOINTERFACE: HRESULT = HRESULT(0x8000_4002_u32 as i32);
    pub const E_POINTER: HRESULT = HRESULT(0x8000_4003_u32 as i32);
    pub const E_FAIL: HRESULT = HRESULT(0x8000_4005_u32 as i32);
    pub const E_UNEXPECTED: HRESULT = HRESULT(0x8000_FFFF_u32 as i32);
    pub const E_INVALIDARG: HRESULT = HRESULT(0x8007_0057_u32 as i32);
    pub const RPC_E_CHANGED_MODE: HRESULT = HRESULT(0x8001_0106_u32 as i32);
    pub const CO_E_NOTINITIALIZED: HRESULT = HRESULT(0x8004_01F0_u32 as i32);

    pub const MK_E_CONNECTMANUALLY: HRESULT = HRESULT(0x8004_01E0_u32 as i32);
    pub const MK_E_EXCEEDEDDEADLINE: HRESULT = HRESULT(0x8004_01E1_u32 as i32);
    pub const MK_E_NEEDGENERIC: HRESULT = HRESULT(0x8004_01E2_u32 as i32);
    pub const MK_E_UNAVAILABLE: HRESULT = HRESULT(0x8004_01E3_u32 as i32);
    pub const MK_E_SYNTAX: HRESULT = HRESULT(0x8004_01E4_u32 as i32);
    pub const MK_E_NOOBJECT: HRESULT = HRESULT(0x8004_01E5_u32 as i32);
    pub const MK_E_NOTBINDABLE: HRESULT = HRESULT(0x8004_01E8_u32 as i32);
    pub const MK_E_NOTBOUND: HRESULT = HRESULT(0x8004_01E9_u32 as i32);
    pub const MK_E_NOINVERSE: HRESULT = HRESULT(0x8004_01EC_u32 as i32);
    pub const MK_E_NOSTORAGE: HRESULT = HRESULT(0x8004_01ED_u32 as i32);
    pub const MK_E_NOPREFIX: HRESULT = HRESULT(0x8004_01EE_u32 as i32);

    pub const MK_S_REDUCED_TO_SELF: HRESULT = HRESULT(0x0004_01E2);
    pub const MK_S_ME: HRESULT = HRESULT(0x0004_01E4);
    pub const MK_S_HIM: HRESULT = HRESULT(0x0004_01E5);
    pub const MK_S_US: HRESULT = HRESULT(0x0004_01E6);
    pub const MK_S_MONIKERALREADYREGISTERED: HRESULT = HRESULT(0x0004_01E7);
}

/// Classification reported by `IMoniker::IsSystemMoniker` (`MKSYS_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MonikerKind {
    /// Not one of the system-provided moniker classes.
    #[default]
    None,
    GenericComposite,
    File,
    Anti,
    Item,
    Pointer,
    Class,
    ObjRef,
    Session,
    Lua,
    /// A value this crate does not know about.
    Other(u32),
}

impl MonikerKind {
    /// Returns the raw `MKSYS_*` value.
    pub fn as_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::GenericComposite => 1,
            Self::File => 2,
            Self::Anti => 3,
            Self::Item => 4,
            Self::Pointer => 5,
            Self::Class => 7,
            Self::ObjRef => 8,
            Self::Session => 9,
            Self::Lua => 10,
            Self::Other(raw) => raw,
        }
    }

    /// Whether this is a generic composite, i.e. enumerable.
    pub fn is_composite(self) -> bool {
        self == Self::GenericComposite
    }
}

impl From<u32> for MonikerKind {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::GenericComposite,
            2 => Self::File,
            3 => Self::Anti,
            4 => Self::Item,
            5 => Self::Pointer,
            7 => Self::Class,
            8 => Self::ObjRef,
            9 => Self::Session,
            10 => Self::Lua,
            other => Self::Other(other),
        }
    }
}

impl std::fmt::Display for MonikerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::GenericComposite => f.write_str("generic composite"),
            Self::File => f.write_str("file"),
            Self::Anti => f.write_str("anti"),
            Self::Item => f.write_str("item"),
            Self::Pointer => f.write_str("pointer"),
            Self::Class => f.write_str("class"),
            Self::ObjRef => f.write_str("objref"),
            Self::Session => f.write_str("session"),
            Self::Lua => f.write_str("elevation"),
            Self::Other(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// How far `IMoniker::Reduce` may proceed (`MKRREDUCE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReduceDepth {
    /// Reduce as far as possible.
    #[default]
    All,
    /// Perform a single reduction step.
    One,
    /// Stop at a moniker meaningful to the user.
    ToUser,
    /// Reduce through user-meaningful monikers as well.
    ThroughUser,
}

impl ReduceDepth {
    pub fn as_raw(self) -> u32 {
        match self {
            Self::All => 0,
            Self::ThroughUser => 1 << 16,
            Self::ToUser => 2 << 16,
            Self::One => 3 << 16,
        }
    }
}

/// 32-bit hash value reported by `IMoniker::Hash`.
///
/// Equal monikers hash equally; the converse does not hold.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MonikerHash(pub u32);

impl std::fmt::Display for MonikerHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_EPOCH_SECS: u64 = 11_644_473_600;
const TICKS_PER_SECOND: u64 = 10_000_000;

/// A `FILETIME` stamp: 100-nanosecond ticks since 1601-01-01 UTC.
///
/// # Examples
///
/// ```
/// use com_moniker::FileTime;
/// let ft = FileTime::from_unix_seconds(0);
/// assert_eq!(ft.to_datetime().unwrap().timestamp(), 0);
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FileTime(pub u64);

impl FileTime {
    /// Builds a stamp from seconds since the Unix epoch.
    pub fn from_unix_seconds(secs: u64) -> Self {
        Self((secs + FILETIME_UNIX_EPOCH_SECS) * TICKS_PER_SECOND)
    }

    /// `FILETIME` of zero, used by objects that never report a change.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Converts to a UTC datetime.
    ///
    /// Returns `None` for a zero stamp or one before the Unix epoch.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.is_zero() {
            return None;
        }
        let secs = (self.0 / TICKS_PER_SECOND).checked_sub(FILETIME_UNIX_EPOCH_SECS)?;
        let nanos = ((self.0 % TICKS_PER_SECOND) * 100) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }

    /// Converts from a UTC datetime; instants before 1970 clamp to the epoch.
    #[allow(clippy::cast_sign_loss)]
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        let secs = value.timestamp().max(0) as u64;
        let sub = u64::from(value.timestamp_subsec_nanos()) / 100;
        Self((secs + FILETIME_UNIX_EPOCH_SECS) * TICKS_PER_SECOND + sub)
    }
}

impl From<FILETIME> for FileTime {
    fn from(ft: FILETIME) -> Self {
        Self((u64::from(ft.dwHighDateTime) << 32) | u64::from(ft.dwLowDateTime))
    }
}

impl From<FileTime> for FILETIME {
    #[allow(clippy::cast_possible_truncation)]
    fn from(ft: FileTime) -> Self {
        Self {
            dwLowDateTime: ft.0 as u32,
            dwHighDateTime: (ft.0 >> 32) as u32,
        }
    }
}

bitflags! {
    /// `BIND_FLAGS` carried in the bind options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindFlags: u32 {
        /// The moniker may interact with the user.
        const MAYBE_BOTHER_USER = 0x1;
        /// Only test for existence; do not bind the object.
        const JUST_TEST_EXISTENCE = 0x2;
    }
}

bitflags! {
    /// Storage access mode (`STGM_*`) requested when binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessMode: u32 {
        const WRITE = 0x0000_0001;
        const READ_WRITE = 0x0000_0002;
        const SHARE_EXCLUSIVE = 0x0000_0010;
        const SHARE_DENY_WRITE = 0x0000_0020;
        const SHARE_DENY_READ = 0x0000_0030;
        const SHARE_DENY_NONE = 0x0000_0040;
        const CREATE = 0x0000_1000;
        const TRANSACTED = 0x0001_0000;
    }
}

/// Options applied to a bind context (`BIND_OPTS`).
///
/// A `mode` of [`AccessMode::empty`] means `STGM_READ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindOptions {
    pub flags: BindFlags,
    pub mode: AccessMode,
    /// Tick-count deadline; `None` means no deadline.
    pub deadline: Option<u32>,
}

impl BindOptions {
    /// Options for existence checks that must not start servers.
    pub fn existence_check() -> Self {
        Self {
            flags: BindFlags::JUST_TEST_EXISTENCE,
            ..Self::default()
        }
    }

    /// Sets a deadline `timeout` past the supplied current tick count.
    ///
    /// Tick counts wrap, as `GetTickCount` does.
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_deadline(mut self, now_ticks: u32, timeout: Duration) -> Self {
        let millis = timeout.as_millis().min(u128::from(u32::MAX)) as u32;
        // Zero is reserved for "no deadline".
        self.deadline = Some(now_ticks.wrapping_add(millis).max(1));
        self
    }

    pub(crate) fn from_raw(flags: u32, mode: u32, deadline: u32) -> Self {
        Self {
            flags: BindFlags::from_bits_truncate(flags),
            mode: AccessMode::from_bits_retain(mode),
            deadline: (deadline != 0).then_some(deadline),
        }
    }

    pub(crate) fn raw_deadline(&self) -> u32 {
        self.deadline.unwrap_or(0)
    }
}
