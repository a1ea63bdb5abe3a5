use windows::core::GUID;

use crate::bind_ctx::BindContext;
use crate::errors::MonikerResult;
use crate::moniker::{Moniker, MonikerTrait, PersistStreamTrait};
use crate::typedefs::{BindOptions, FileTime, MonikerHash, MonikerKind};

/// Source of monikers for the COM worker.
///
/// The resolver itself is shared with the worker thread; the handles it
/// produces are created and dropped on that thread only.
pub trait MonikerResolver: Send + Sync {
    type Handle: ResolvedMoniker + Clone;

    /// Parses a full display name, returning the consumed length and the moniker.
    fn parse(&self, display_name: &str) -> MonikerResult<(usize, Self::Handle)>;

    /// Monikers of every object in the Running Object Table.
    fn running(&self) -> MonikerResult<Vec<Self::Handle>>;
}

/// The per-moniker queries the worker composes into its answers.
pub trait ResolvedMoniker: Sized {
    fn display_name(&self) -> MonikerResult<String>;
    fn kind(&self) -> MonikerResult<MonikerKind>;
    fn hash(&self) -> MonikerResult<MonikerHash>;
    fn is_running(&self) -> MonikerResult<bool>;
    fn time_of_last_change(&self) -> MonikerResult<FileTime>;
    fn class_id(&self) -> MonikerResult<GUID>;
    fn size_max(&self) -> MonikerResult<u64>;
    /// Components left to right; empty for non-composites.
    fn components(&self) -> MonikerResult<Vec<Self>>;
    fn is_equal(&self, other: &Self) -> MonikerResult<bool>;
    fn common_prefix_with(&self, other: &Self) -> MonikerResult<Self>;
    fn relative_path_to(&self, other: &Self) -> MonikerResult<Self>;
}

/// Resolves display names through the system (`MkParseDisplayName`, ROT).
///
/// Each parse gets a fresh bind context carrying `options`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComResolver {
    options: BindOptions,
}

impl ComResolver {
    pub fn new(options: BindOptions) -> Self {
        Self { options }
    }

    fn context(&self) -> MonikerResult<BindContext> {
        BindContext::with_options(&self.options)
    }
}

impl MonikerResolver for ComResolver {
    type Handle = ComMoniker;

    fn parse(&self, display_name: &str) -> MonikerResult<(usize, ComMoniker)> {
        let ctx = self.context()?;
        let parsed = Moniker::parse(&ctx, display_name)?;
        Ok((parsed.eaten, ComMoniker::new(parsed.moniker, ctx)))
    }

    fn running(&self) -> MonikerResult<Vec<ComMoniker>> {
        let ctx = self.context()?;
        let rot = ctx.running_object_table()?;
        let monikers = readable_entries(rot.enum_running()?);
        Ok(monikers
            .into_iter()
            .map(|moniker| ComMoniker::new(moniker, ctx.clone()))
            .collect())
    }
}

/// Keeps the entries that could be fetched; a failed fetch is logged and
/// skipped. Entries from other processes can fail with RPC or access errors.
fn readable_entries<T>(entries: impl Iterator<Item = MonikerResult<T>>) -> Vec<T> {
    entries
        .filter_map(|entry| match entry {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = ?e, "Skipping unreadable ROT entry");
                None
            }
        })
        .collect()
}

/// A moniker together with the bind context it was resolved in.
#[derive(Debug, Clone)]
pub struct ComMoniker {
    moniker: Moniker,
    ctx: BindContext,
}

impl ComMoniker {
    pub fn new(moniker: Moniker, ctx: BindContext) -> Self {
        Self { moniker, ctx }
    }

    pub fn moniker(&self) -> &Moniker {
        &self.moniker
    }

    fn sibling(&self, moniker: Moniker) -> Self {
        Self::new(moniker, self.ctx.clone())
    }
}

impl ResolvedMoniker for ComMoniker {
    fn display_name(&self) -> MonikerResult<String> {
        self.moniker.display_name(&self.ctx, None)
    }

    fn kind(&self) -> MonikerResult<MonikerKind> {
        self.moniker.system_kind()
    }

    fn hash(&self) -> MonikerResult<MonikerHash> {
        self.moniker.hash()
    }

    fn is_running(&self) -> MonikerResult<bool> {
        self.moniker.is_running(&self.ctx, None, None)
    }

    fn time_of_last_change(&self) -> MonikerResult<FileTime> {
        self.moniker.time_of_last_change(&self.ctx, None)
    }

    fn class_id(&self) -> MonikerResult<GUID> {
        self.moniker.class_id()
    }

    fn size_max(&self) -> MonikerResult<u64> {
        self.moniker.size_max()
    }

    fn components(&self) -> MonikerResult<Vec<Self>> {
        match self.moniker.enumerate(true)? {
            Some(iter) => iter.map(|part| part.map(|m| self.sibling(m))).collect(),
            None => Ok(Vec::new()),
        }
    }

    fn is_equal(&self, other: &Self) -> MonikerResult<bool> {
        self.moniker.is_equal(&other.moniker)
    }

    fn common_prefix_with(&self, other: &Self) -> MonikerResult<Self> {
        self.moniker
            .common_prefix_with(&other.moniker)
            .map(|m| self.sibling(m))
    }

    fn relative_path_to(&self, other: &Self) -> MonikerResult<Self> {
        self.moniker
            .relative_path_to(&other.moniker)
            .map(|m| self.sibling(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComGuard;
    use crate::errors::MonikerError;
    use crate::typedefs::codes;

    #[test]
    fn test_readable_entries_skips_failures() {
        let entries = vec![
            Ok("!a"),
            Err(MonikerError::from_hresult(codes::E_FAIL)),
            Ok("!b"),
        ];
        assert_eq!(readable_entries(entries.into_iter()), ["!a", "!b"]);
    }

    #[test]
    fn test_parse_class_moniker() {
        let _com = ComGuard::new().unwrap();
        let resolver = ComResolver::default();
        let name = "clsid:00000303-0000-0000-C000-000000000046:";
        let (eaten, handle) = resolver.parse(name).unwrap();
        assert_eq!(eaten, name.len());
        assert_eq!(handle.kind().unwrap(), MonikerKind::Class);
        assert!(handle.components().unwrap().is_empty());
    }

    #[test]
    fn test_components_of_composite() {
        let _com = ComGuard::new().unwrap();
        let ctx = BindContext::new().unwrap();
        let file = Moniker::file("C:\\data\\book.xls").unwrap();
        let sheet = Moniker::item("!", "Sheet1").unwrap();
        let handle = ComMoniker::new(Moniker::composite(&file, &sheet).unwrap(), ctx);

        let names: Vec<String> = handle
            .components()
            .unwrap()
            .iter()
            .map(|part| part.display_name().unwrap())
            .collect();
        assert_eq!(names, ["C:\\data\\book.xls", "!Sheet1"]);
    }

    #[test]
    fn test_running_lists_registered_object() {
        let _com = ComGuard::new().unwrap();
        let resolver = ComResolver::default();
        let ctx = BindContext::new().unwrap();
        let rot = ctx.running_object_table().unwrap();
        let name = Moniker::item("!", &format!("resolver-test-{}", std::process::id())).unwrap();
        let object: windows::core::IUnknown = windows::core::Interface::cast(name.as_interface()).unwrap();
        let cookie = rot.register(0, &object, &name).unwrap();

        let found = resolver
            .running()
            .unwrap()
            .iter()
            .any(|handle| handle.moniker().is_equal(&name).unwrap_or(false));
        rot.revoke(cookie).unwrap();
        assert!(found);
    }
}
