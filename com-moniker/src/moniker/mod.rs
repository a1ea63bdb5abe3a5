//! The [`Moniker`] handle and its constructors.
mod traits;

pub use traits::*;

use core::ffi::c_void;

use windows::Win32::System::Com::{
    CLSCTX_INPROC_SERVER, CoCreateInstance, CreateAntiMoniker, CreateClassMoniker,
    CreateFileMoniker, CreateGenericComposite, CreateItemMoniker, CreatePointerMoniker, IMoniker,
    IPersistStream, IStream, MkParseDisplayName,
};
use windows::core::{GUID, IUnknown, Interface};

use crate::bind_ctx::BindContext;
use crate::com_utils::{LocalWideString, require_interface};
use crate::errors::{MonikerError, MonikerResult};
use crate::status::check;

/// Owned reference to an `IMoniker`.
///
/// Cloning calls `AddRef`; dropping calls `Release`. Moniker interfaces
/// are apartment-bound, so the handle is neither `Send` nor `Sync`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moniker {
    inner: IMoniker,
}

/// Result of parsing a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// UTF-16 code units of the input consumed by the parse.
    pub eaten: usize,
    pub moniker: Moniker,
}

impl Moniker {
    /// Creates a file moniker for `path`.
    pub fn file(path: &str) -> MonikerResult<Self> {
        let path = LocalWideString::from(path);
        // SAFETY: `path` is null-terminated and outlives the call.
        let inner = unsafe { CreateFileMoniker(path.as_pcwstr())? };
        Ok(Self { inner })
    }

    /// Creates an item moniker, e.g. `("!", "Sheet1")`.
    pub fn item(delimiter: &str, item: &str) -> MonikerResult<Self> {
        let delimiter = LocalWideString::from(delimiter);
        let item = LocalWideString::from(item);
        // SAFETY: both strings are null-terminated and outlive the call.
        let inner = unsafe { CreateItemMoniker(delimiter.as_pcwstr(), item.as_pcwstr())? };
        Ok(Self { inner })
    }

    /// Creates an anti-moniker, the inverse of any simple moniker.
    pub fn anti() -> MonikerResult<Self> {
        // SAFETY: no arguments.
        let inner = unsafe { CreateAntiMoniker()? };
        Ok(Self { inner })
    }

    /// Creates a class moniker naming the class object of `clsid`.
    pub fn class(clsid: &GUID) -> MonikerResult<Self> {
        // SAFETY: `clsid` outlives the call.
        let inner = unsafe { CreateClassMoniker(clsid)? };
        Ok(Self { inner })
    }

    /// Creates a pointer moniker wrapping a live object.
    pub fn pointer(object: &IUnknown) -> MonikerResult<Self> {
        // SAFETY: `object` is live; the moniker AddRefs it.
        let inner = unsafe { CreatePointerMoniker(object)? };
        Ok(Self { inner })
    }

    /// Creates a generic composite of `left` followed by `right`.
    ///
    /// Unlike [`MonikerTrait::compose_with`], this always yields a moniker;
    /// adjacent pieces are still allowed to annihilate.
    pub fn composite(left: &Self, right: &Self) -> MonikerResult<Self> {
        // SAFETY: both interfaces are live for the call.
        let inner = unsafe { CreateGenericComposite(&left.inner, &right.inner)? };
        Ok(Self { inner })
    }

    /// Converts a full display name into a moniker (`MkParseDisplayName`).
    ///
    /// On failure the error carries the status; the number of characters
    /// consumed before the failure is logged.
    pub fn parse(bind_ctx: &BindContext, display_name: &str) -> MonikerResult<ParsedName> {
        let wide = LocalWideString::from(display_name);
        let mut eaten = 0u32;
        let mut moniker = None;
        // SAFETY: `wide` is null-terminated and outlives the call; the out
        // pointers are valid locals.
        let result = unsafe {
            MkParseDisplayName(bind_ctx.interface(), wide.as_pcwstr(), &mut eaten, &mut moniker)
        };
        if let Err(e) = result {
            let consumed = wide.prefix(eaten as usize).unwrap_or_default();
            tracing::debug!(error = ?e, eaten, consumed = %consumed, "MkParseDisplayName failed");
            return Err(e.into());
        }
        let inner = moniker.ok_or(MonikerError::NullInterface("MkParseDisplayName"))?;
        Ok(ParsedName {
            eaten: usize::try_from(eaten)?,
            moniker: Self { inner },
        })
    }

    /// Recreates a moniker written by [`save_to_stream`].
    ///
    /// Reads the class id, instantiates the class in-process and lets it
    /// load the rest of the stream.
    ///
    /// [`save_to_stream`]: Moniker::save_to_stream
    pub fn load_from_stream(stream: &IStream) -> MonikerResult<Self> {
        let mut clsid = GUID::zeroed();
        let mut read = 0u32;
        // SAFETY: `clsid` is 16 writable bytes; `read` outlives the call.
        unsafe {
            stream
                .Read(
                    (&raw mut clsid).cast::<c_void>(),
                    size_of::<GUID>() as u32,
                    Some(&mut read),
                )
                .ok()?;
        }
        if read as usize != size_of::<GUID>() {
            return Err(MonikerError::Conversion(format!(
                "stream ended after {read} bytes of class id"
            )));
        }

        // SAFETY: standard activation call; `clsid` outlives it.
        let persist: IPersistStream = unsafe { CoCreateInstance(&clsid, None, CLSCTX_INPROC_SERVER)? };
        let moniker = Self {
            inner: persist.cast()?,
        };
        moniker.load(stream)?;
        tracing::trace!(?clsid, "Moniker loaded from stream");
        Ok(moniker)
    }

    /// Writes the class id followed by the moniker data, the layout
    /// [`load_from_stream`](Moniker::load_from_stream) expects.
    pub fn save_to_stream(&self, stream: &IStream) -> MonikerResult<()> {
        let clsid = self.class_id()?;
        let mut written = 0u32;
        // SAFETY: `clsid` is 16 readable bytes; `written` outlives the call.
        let hr = unsafe {
            stream.Write(
                (&raw const clsid).cast::<c_void>(),
                size_of::<GUID>() as u32,
                Some(&mut written),
            )
        };
        check(hr)?;
        self.save(stream, true)
    }

    pub fn as_interface(&self) -> &IMoniker {
        &self.inner
    }

    pub fn into_interface(self) -> IMoniker {
        self.inner
    }

    /// Raw interface pointer, borrowed.
    pub fn as_raw(&self) -> *mut c_void {
        self.inner.as_raw()
    }
}

impl From<IMoniker> for Moniker {
    fn from(inner: IMoniker) -> Self {
        Self { inner }
    }
}

impl TryFrom<IUnknown> for Moniker {
    type Error = MonikerError;

    fn try_from(value: IUnknown) -> Result<Self, Self::Error> {
        Ok(Self {
            inner: value.cast()?,
        })
    }
}

impl MonikerTrait for Moniker {
    fn interface(&self) -> MonikerResult<&IMoniker> {
        Ok(&self.inner)
    }
}

impl PersistStreamTrait for Moniker {
    fn persist_stream(&self) -> MonikerResult<&IPersistStream> {
        Ok(&self.inner)
    }
}

/// Takes ownership of a raw `IMoniker` out-pointer, then applies `status`.
///
/// # Safety
/// `raw` must be null or an owned `IMoniker` reference.
pub(crate) unsafe fn moniker_from_raw(
    raw: *mut c_void,
    status: MonikerResult<()>,
    operation: &'static str,
) -> MonikerResult<Moniker> {
    // SAFETY: forwarded contract.
    unsafe { require_interface::<IMoniker>(raw, status, operation) }.map(Moniker::from)
}
