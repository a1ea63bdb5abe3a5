use windows::Win32::System::Com::{IEnumMoniker, IMoniker};
use windows::core::Interface;

use crate::errors::{MonikerError, MonikerResult};
use crate::moniker::Moniker;
use crate::status::{check, check_bool};

const MAX_CACHE_SIZE: usize = 16;

/// Iterator over an `IEnumMoniker`.
///
/// Fetches up to 16 monikers per `Next` call. A failed fetch is yielded
/// once and ends the iteration.
pub struct MonikerIterator {
    inner: IEnumMoniker,
    cache: Box<[Option<IMoniker>; MAX_CACHE_SIZE]>,
    index: u32,
    count: u32,
    done: bool,
}

impl MonikerIterator {
    pub fn new(inner: IEnumMoniker) -> Self {
        Self {
            inner,
            cache: Box::new([const { None }; MAX_CACHE_SIZE]),
            index: MAX_CACHE_SIZE as u32,
            count: 0,
            done: false,
        }
    }

    /// Rewinds to the first element, discarding anything cached.
    pub fn reset(&mut self) -> MonikerResult<()> {
        // SAFETY: `inner` is a live interface.
        let hr = unsafe { (self.inner.vtable().Reset)(self.inner.as_raw()) };
        check(hr)?;
        self.clear_cache();
        Ok(())
    }

    /// Skips `count` elements.
    ///
    /// # Returns
    /// `false` if the sequence ended before `count` elements were skipped
    pub fn skip_elements(&mut self, count: u32) -> MonikerResult<bool> {
        // Elements still cached were already fetched; skip them locally first.
        let cached = self.count.saturating_sub(self.index);
        if count <= cached {
            for slot in &mut self.cache[self.index as usize..(self.index + count) as usize] {
                *slot = None;
            }
            self.index += count;
            return Ok(true);
        }

        self.clear_cache();
        // SAFETY: `inner` is a live interface.
        let hr = unsafe { (self.inner.vtable().Skip)(self.inner.as_raw(), count - cached) };
        let skipped_all = check_bool(hr)?;
        if !skipped_all {
            self.done = true;
        }
        Ok(skipped_all)
    }

    fn clear_cache(&mut self) {
        for slot in self.cache.iter_mut() {
            *slot = None;
        }
        self.index = MAX_CACHE_SIZE as u32;
        self.count = 0;
        self.done = false;
    }
}

impl Iterator for MonikerIterator {
    type Item = MonikerResult<Moniker>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.index >= self.count {
            // SAFETY: the cache slots are all `None` (taken below), so the
            // callee may overwrite them without leaking references.
            let code = unsafe {
                self.inner
                    .Next(self.cache.as_mut_slice(), Some(&mut self.count))
            };

            if code.is_ok() {
                if self.count == 0 {
                    self.done = true;
                    return None;
                }

                self.index = 0;
            } else {
                self.done = true;
                return Some(Err(MonikerError::from_hresult(code)));
            }
        }

        let current = self.cache[self.index as usize].take();
        self.index += 1;
        Some(match current {
            Some(moniker) => Ok(Moniker::from(moniker)),
            None => Err(MonikerError::NullInterface("IEnumMoniker::Next")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComGuard, MonikerTrait};

    fn three_part_composite() -> Moniker {
        let file = Moniker::file("C:\\data\\book.xls").unwrap();
        let sheet = Moniker::item("!", "Sheet1").unwrap();
        let cell = Moniker::item("!", "R1C1").unwrap();
        let left = Moniker::composite(&file, &sheet).unwrap();
        Moniker::composite(&left, &cell).unwrap()
    }

    fn names(iter: MonikerIterator) -> Vec<String> {
        let ctx = crate::BindContext::new().unwrap();
        iter.map(|m| m.unwrap().display_name(&ctx, None).unwrap())
            .collect()
    }

    #[test]
    fn test_forward_and_backward() {
        let _com = ComGuard::new().unwrap();
        let composite = three_part_composite();

        let forward = names(composite.enumerate(true).unwrap().unwrap());
        assert_eq!(forward, ["C:\\data\\book.xls", "!Sheet1", "!R1C1"]);

        let backward = names(composite.enumerate(false).unwrap().unwrap());
        assert_eq!(backward, ["!R1C1", "!Sheet1", "C:\\data\\book.xls"]);
    }

    #[test]
    fn test_reset_and_skip() {
        let _com = ComGuard::new().unwrap();
        let composite = three_part_composite();
        let mut iter = composite.enumerate(true).unwrap().unwrap();

        assert!(iter.next().is_some());
        assert!(iter.skip_elements(1).unwrap());
        let ctx = crate::BindContext::new().unwrap();
        let last = iter.next().unwrap().unwrap();
        assert_eq!(last.display_name(&ctx, None).unwrap(), "!R1C1");
        assert!(iter.next().is_none());

        iter.reset().unwrap();
        assert!(!iter.skip_elements(5).unwrap());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_simple_moniker_is_not_enumerable() {
        let _com = ComGuard::new().unwrap();
        let item = Moniker::item("!", "Sheet1").unwrap();
        assert!(item.enumerate(true).unwrap().is_none());
    }
}
