//! Running Object Table access.
//!
//! The ROT is where running objects publish themselves under a moniker;
//! `IMoniker::IsRunning` and binding consult it before starting servers.

use windows::Win32::Foundation::FILETIME;
use windows::Win32::System::Com::{GetRunningObjectTable, IRunningObjectTable, ROT_FLAGS};
use windows::core::{IUnknown, Interface};

use crate::errors::MonikerResult;
use crate::iterator::MonikerIterator;
use crate::moniker::Moniker;
use crate::status::check_bool;
use crate::typedefs::FileTime;

/// Keeps the registered object alive while it is in the table.
pub const REGISTRATION_KEEPS_ALIVE: u32 = 0x1;
/// Lets clients in other security contexts see the registration.
pub const ALLOW_ANY_CLIENT: u32 = 0x2;

/// Cookie returned by [`RunningObjectTable::register`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration(pub u32);

/// Owned reference to an `IRunningObjectTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningObjectTable {
    inner: IRunningObjectTable,
}

impl RunningObjectTable {
    /// Opens the local Running Object Table.
    pub fn open() -> MonikerResult<Self> {
        // SAFETY: the reserved argument must be zero.
        let inner = unsafe { GetRunningObjectTable(0)? };
        Ok(Self { inner })
    }

    /// Publishes `object` under `name`.
    ///
    /// A duplicate registration still succeeds (`MK_S_MONIKERALREADYREGISTERED`)
    /// and yields a distinct cookie.
    pub fn register(&self, flags: u32, object: &IUnknown, name: &Moniker) -> MonikerResult<Registration> {
        // SAFETY: both interfaces are live; the table AddRefs what it keeps.
        let cookie = unsafe { self.inner.Register(ROT_FLAGS(flags), object, name.as_interface())? };
        tracing::debug!(cookie, "Object registered in ROT");
        Ok(Registration(cookie))
    }

    pub fn revoke(&self, registration: Registration) -> MonikerResult<()> {
        // SAFETY: plain value argument.
        unsafe { self.inner.Revoke(registration.0)? };
        tracing::debug!(cookie = registration.0, "ROT registration revoked");
        Ok(())
    }

    /// `S_FALSE` (not registered) yields `false`.
    pub fn is_running(&self, name: &Moniker) -> MonikerResult<bool> {
        // SAFETY: both interfaces are live for the call.
        let hr = unsafe { (self.inner.vtable().IsRunning)(self.inner.as_raw(), name.as_raw()) };
        check_bool(hr)
    }

    /// Gets the running object registered under `name`.
    pub fn get_object(&self, name: &Moniker) -> MonikerResult<IUnknown> {
        // SAFETY: `name` is live for the call.
        Ok(unsafe { self.inner.GetObject(name.as_interface())? })
    }

    /// Records that the registered object changed at `time`.
    pub fn note_change_time(&self, registration: Registration, time: FileTime) -> MonikerResult<()> {
        let time = FILETIME::from(time);
        // SAFETY: `time` outlives the call.
        unsafe { self.inner.NoteChangeTime(registration.0, &time)? };
        Ok(())
    }

    pub fn time_of_last_change(&self, name: &Moniker) -> MonikerResult<FileTime> {
        // SAFETY: `name` is live for the call.
        let time = unsafe { self.inner.GetTimeOfLastChange(name.as_interface())? };
        Ok(time.into())
    }

    /// Enumerates the monikers of every registered object.
    pub fn enum_running(&self) -> MonikerResult<MonikerIterator> {
        // SAFETY: no arguments.
        let enumerator = unsafe { self.inner.EnumRunning()? };
        Ok(MonikerIterator::new(enumerator))
    }
}

impl From<IRunningObjectTable> for RunningObjectTable {
    fn from(inner: IRunningObjectTable) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComGuard, MonikerTrait};

    fn unique_item(tag: &str) -> Moniker {
        let name = format!("com-moniker-test-{tag}-{}", std::process::id());
        Moniker::item("!", &name).unwrap()
    }

    #[test]
    fn test_register_and_revoke() {
        let _com = ComGuard::new().unwrap();
        let rot = RunningObjectTable::open().unwrap();
        let name = unique_item("register");
        let object: IUnknown = name.as_interface().cast().unwrap();

        assert!(!rot.is_running(&name).unwrap());

        let cookie = rot.register(0, &object, &name).unwrap();
        assert!(rot.is_running(&name).unwrap());
        let found = rot.get_object(&name).unwrap();
        assert_eq!(found, object);

        let listed = rot
            .enum_running()
            .unwrap()
            .filter_map(Result::ok)
            .any(|m| m.is_equal(&name).unwrap_or(false));
        assert!(listed);

        rot.revoke(cookie).unwrap();
        assert!(!rot.is_running(&name).unwrap());
    }

    #[test]
    fn test_note_change_time() {
        let _com = ComGuard::new().unwrap();
        let rot = RunningObjectTable::open().unwrap();
        let name = unique_item("time");
        let object: IUnknown = name.as_interface().cast().unwrap();

        let cookie = rot.register(0, &object, &name).unwrap();
        let stamp = FileTime::from_unix_seconds(1_600_000_000);
        rot.note_change_time(cookie, stamp).unwrap();
        assert_eq!(rot.time_of_last_change(&name).unwrap(), stamp);
        rot.revoke(cookie).unwrap();
    }

    #[test]
    fn test_get_object_not_running() {
        let _com = ComGuard::new().unwrap();
        let rot = RunningObjectTable::open().unwrap();
        let err = rot.get_object(&unique_item("missing")).unwrap_err();
        assert!(err.hresult().is_some_and(|hr| hr.is_err()));
    }
}
