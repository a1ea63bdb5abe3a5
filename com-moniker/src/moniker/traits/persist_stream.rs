use windows::Win32::Foundation::{FALSE, TRUE};
use windows::Win32::System::Com::{IPersistStream, IStream};
use windows::core::{GUID, Interface};

use crate::errors::MonikerResult;
use crate::status::{check, check_bool};

/// Persistence functionality every moniker inherits from `IPersistStream`
/// (and, through it, `IPersist`).
pub trait PersistStreamTrait {
    fn persist_stream(&self) -> MonikerResult<&IPersistStream>;

    /// Gets the CLSID of the moniker class, used to reload it from a stream.
    fn class_id(&self) -> MonikerResult<GUID> {
        let this = self.persist_stream()?;
        let mut clsid = GUID::zeroed();
        // SAFETY: `this` is a live interface and `clsid` outlives the call.
        let hr = unsafe { (this.vtable().base__.GetClassID)(this.as_raw(), &mut clsid) };
        check(hr)?;
        Ok(clsid)
    }

    /// Reports whether the object changed since it was last saved.
    ///
    /// `S_FALSE` means clean and is not an error.
    fn is_dirty(&self) -> MonikerResult<bool> {
        let this = self.persist_stream()?;
        // SAFETY: `this` is a live interface.
        let hr = unsafe { (this.vtable().IsDirty)(this.as_raw()) };
        check_bool(hr)
    }

    /// Initializes the object from a stream previously written by [`save`].
    ///
    /// [`save`]: PersistStreamTrait::save
    fn load(&self, stream: &IStream) -> MonikerResult<()> {
        let this = self.persist_stream()?;
        // SAFETY: both interfaces are live for the duration of the call;
        // the callee AddRefs the stream if it keeps it.
        let hr = unsafe { (this.vtable().Load)(this.as_raw(), stream.as_raw()) };
        check(hr)
    }

    /// Writes the object to a stream.
    ///
    /// # Arguments
    /// * `stream` - Destination stream, positioned where the data goes
    /// * `clear_dirty` - Reset the dirty flag after saving
    fn save(&self, stream: &IStream, clear_dirty: bool) -> MonikerResult<()> {
        let this = self.persist_stream()?;
        let clear_dirty = if clear_dirty { TRUE } else { FALSE };
        // SAFETY: both interfaces are live for the duration of the call.
        let hr = unsafe { (this.vtable().Save)(this.as_raw(), stream.as_raw(), clear_dirty) };
        check(hr)
    }

    /// Upper bound, in bytes, of what [`save`] will write.
    ///
    /// [`save`]: PersistStreamTrait::save
    fn size_max(&self) -> MonikerResult<u64> {
        let this = self.persist_stream()?;
        let mut size = 0u64;
        // SAFETY: `this` is a live interface and `size` outlives the call.
        let hr = unsafe { (this.vtable().GetSizeMax)(this.as_raw(), &mut size) };
        check(hr)?;
        Ok(size)
    }
}
