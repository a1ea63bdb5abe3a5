use crate::backend::resolver::{MonikerResolver, ResolvedMoniker};
use crate::com_guard::{Apartment, ComGuard};
use crate::errors::{MonikerError, MonikerResult, is_unavailable};
use crate::helpers::guid_to_string;
use crate::provider::{Comparison, MonikerInfo};
use crate::typedefs::codes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Parsed monikers kept per display name before the cache is flushed.
const MAX_CACHED_MONIKERS: usize = 64;

pub enum MonikerRequest {
    Describe {
        display_name: String,
        reply: oneshot::Sender<MonikerResult<MonikerInfo>>,
    },
    Compare {
        left: String,
        right: String,
        reply: oneshot::Sender<MonikerResult<Comparison>>,
    },
    ListRunning {
        reply: oneshot::Sender<MonikerResult<Vec<String>>>,
    },
}

/// Dedicated COM thread serving [`MonikerRequest`]s.
///
/// Moniker interfaces cannot leave the apartment they were created in, so
/// every COM call happens on this thread and only plain data crosses back.
pub struct MonikerWorker<R: MonikerResolver + 'static> {
    pub sender: mpsc::Sender<MonikerRequest>,
    pub handle: Option<std::thread::JoinHandle<()>>,
    _phantom: std::marker::PhantomData<R>,
}

impl<R: MonikerResolver + 'static> MonikerWorker<R> {
    /// Spawns the worker and waits until COM is initialized on it.
    ///
    /// Blocks the caller; from async code run it inside `spawn_blocking`.
    pub fn start(resolver: Arc<R>, apartment: Apartment) -> MonikerResult<Self> {
        let (tx, mut rx) = mpsc::channel(32);
        let (init_tx, init_rx) = oneshot::channel();

        let handle = std::thread::spawn(move || {
            let _guard = match ComGuard::with_apartment(apartment) {
                Ok(g) => {
                    let _ = init_tx.send(Ok(()));
                    g
                }
                Err(e) => {
                    tracing::error!(error = ?e, ?apartment, "COM worker failed to initialize");
                    let _ = init_tx.send(Err(e));
                    return;
                }
            };

            let mut cache: HashMap<String, (usize, R::Handle)> = HashMap::new();

            while let Some(req) = rx.blocking_recv() {
                match req {
                    MonikerRequest::Describe {
                        display_name,
                        reply,
                    } => {
                        let result = Self::handle_describe(&mut cache, &resolver, &display_name);
                        let _ = reply.send(result);
                    }
                    MonikerRequest::Compare { left, right, reply } => {
                        let result = Self::handle_compare(&mut cache, &resolver, &left, &right);
                        let _ = reply.send(result);
                    }
                    MonikerRequest::ListRunning { reply } => {
                        let span = tracing::info_span!("moniker.list_running");
                        let _enter = span.enter();
                        let result = Self::handle_list_running(&resolver);
                        if let Ok(names) = &result {
                            tracing::info!(count = names.len(), "list_running completed");
                        }
                        let _ = reply.send(result);
                    }
                }
            }

            tracing::debug!("COM worker thread exiting cleanly");
        });

        init_rx
            .blocking_recv()
            .map_err(|_| MonikerError::Worker("COM worker thread panicked during init".into()))??;

        tracing::debug!(?apartment, "COM worker thread started");

        Ok(Self {
            sender: tx,
            handle: Some(handle),
            _phantom: std::marker::PhantomData,
        })
    }

    pub async fn send_request<F, T>(&self, req_builder: F) -> MonikerResult<T>
    where
        F: FnOnce(oneshot::Sender<MonikerResult<T>>) -> MonikerRequest,
    {
        if self
            .handle
            .as_ref()
            .is_some_and(std::thread::JoinHandle::is_finished)
        {
            tracing::error!("COM worker thread panicked or exited unexpectedly");
            return Err(MonikerError::Worker("COM worker thread is not running".into()));
        }

        let (tx, rx) = oneshot::channel();
        let req = req_builder(tx);

        self.sender
            .send(req)
            .await
            .map_err(|_| MonikerError::Worker("channel closed (worker stopped)".into()))?;

        rx.await
            .map_err(|_| MonikerError::Worker("worker shut down during request".into()))?
    }

    /// Parses `display_name`, reusing an earlier parse when cached.
    fn resolve<'c>(
        cache: &'c mut HashMap<String, (usize, R::Handle)>,
        resolver: &Arc<R>,
        display_name: &str,
    ) -> MonikerResult<&'c (usize, R::Handle)> {
        if !cache.contains_key(display_name) {
            tracing::debug!(name = %display_name, "Cache miss, parsing");
            let parsed = resolver.parse(display_name)?;
            if cache.len() >= MAX_CACHED_MONIKERS {
                tracing::trace!(size = cache.len(), "Flushing moniker cache");
                cache.clear();
            }
            cache.insert(display_name.to_string(), parsed);
        } else {
            tracing::trace!(name = %display_name, "Cache hit");
        }
        cache
            .get(display_name)
            .ok_or_else(|| MonikerError::Internal("parsed moniker missing from cache".into()))
    }

    fn handle_describe(
        cache: &mut HashMap<String, (usize, R::Handle)>,
        resolver: &Arc<R>,
        display_name: &str,
    ) -> MonikerResult<MonikerInfo> {
        let span = tracing::info_span!("moniker.describe", name = %display_name);
        let _enter = span.enter();

        let (eaten, moniker) = Self::resolve(cache, resolver, display_name)?;
        let kind = moniker.kind()?;

        let running = moniker.is_running().unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "is_running failed, reporting not running");
            false
        });

        let last_change = match moniker.time_of_last_change() {
            Ok(ft) => ft.to_datetime(),
            Err(e) if is_unavailable(&e) => {
                tracing::debug!("No change time without binding");
                None
            }
            Err(e) => {
                tracing::warn!(error = ?e, "time_of_last_change failed");
                None
            }
        };

        let class_id = match moniker.class_id() {
            Ok(clsid) => Some(guid_to_string(&clsid)),
            Err(e) => {
                tracing::warn!(error = ?e, "class_id failed");
                None
            }
        };

        let size_max = match moniker.size_max() {
            Ok(size) => Some(size),
            Err(e) => {
                tracing::warn!(error = ?e, "size_max failed");
                None
            }
        };

        let components = if kind.is_composite() {
            moniker
                .components()?
                .iter()
                .map(ResolvedMoniker::display_name)
                .collect::<MonikerResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let info = MonikerInfo {
            display_name: moniker.display_name()?,
            eaten: *eaten,
            kind,
            hash: moniker.hash()?,
            running,
            last_change,
            class_id,
            size_max,
            components,
        };
        tracing::info!(kind = %info.kind, running = info.running, "describe completed");
        Ok(info)
    }

    fn handle_compare(
        cache: &mut HashMap<String, (usize, R::Handle)>,
        resolver: &Arc<R>,
        left: &str,
        right: &str,
    ) -> MonikerResult<Comparison> {
        let span = tracing::info_span!("moniker.compare", left = %left, right = %right);
        let _enter = span.enter();

        // Owned copy; resolving the right side may flush the cache.
        let left_moniker = Self::resolve(cache, resolver, left)?.1.clone();
        let (_, right_moniker) = Self::resolve(cache, resolver, right)?;

        let equal = left_moniker.is_equal(right_moniker)?;

        let common_prefix = match left_moniker.common_prefix_with(right_moniker) {
            Ok(prefix) => Some(prefix.display_name()?),
            Err(e) if e.hresult() == Some(codes::MK_E_NOPREFIX) => None,
            Err(e) => return Err(e),
        };

        let relative_path = match left_moniker.relative_path_to(right_moniker) {
            Ok(path) => Some(path.display_name()?),
            Err(e) => {
                tracing::debug!(error = ?e, "No relative path");
                None
            }
        };

        tracing::info!(equal, "compare completed");
        Ok(Comparison {
            equal,
            common_prefix,
            relative_path,
        })
    }

    /// Display names of the running objects; entries that cannot report
    /// one are skipped.
    fn handle_list_running(resolver: &Arc<R>) -> MonikerResult<Vec<String>> {
        let names = resolver
            .running()?
            .iter()
            .filter_map(|moniker| match moniker.display_name() {
                Ok(name) => Some(name),
                Err(e) => {
                    tracing::warn!(error = ?e, "Skipping running object without a display name");
                    None
                }
            })
            .collect();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedefs::{FileTime, MonikerHash, MonikerKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use windows::core::GUID;

    #[derive(Clone)]
    struct FakeMoniker {
        name: String,
        kind: MonikerKind,
        parts: Vec<String>,
        change: Result<u64, windows::core::HRESULT>,
    }

    impl FakeMoniker {
        fn simple(name: &str) -> Self {
            Self {
                name: name.to_string(),
                kind: MonikerKind::Item,
                parts: Vec::new(),
                change: Err(codes::MK_E_UNAVAILABLE),
            }
        }
    }

    impl ResolvedMoniker for FakeMoniker {
        fn display_name(&self) -> MonikerResult<String> {
            if self.name.starts_with("!denied") {
                return Err(MonikerError::from_hresult(codes::E_FAIL));
            }
            Ok(self.name.clone())
        }
        fn kind(&self) -> MonikerResult<MonikerKind> {
            Ok(self.kind)
        }
        fn hash(&self) -> MonikerResult<MonikerHash> {
            #[allow(clippy::cast_possible_truncation)]
            Ok(MonikerHash(self.name.len() as u32))
        }
        fn is_running(&self) -> MonikerResult<bool> {
            Ok(self.name.contains("running"))
        }
        fn time_of_last_change(&self) -> MonikerResult<FileTime> {
            self.change.map(FileTime).map_err(MonikerError::from_hresult)
        }
        fn class_id(&self) -> MonikerResult<GUID> {
            Ok(GUID::from_u128(0x0000_0304_0000_0000_c000_0000_0000_0046))
        }
        fn size_max(&self) -> MonikerResult<u64> {
            Err(MonikerError::from_hresult(codes::E_NOTIMPL))
        }
        fn components(&self) -> MonikerResult<Vec<Self>> {
            Ok(self.parts.iter().map(|p| Self::simple(p)).collect())
        }
        fn is_equal(&self, other: &Self) -> MonikerResult<bool> {
            Ok(self.name == other.name)
        }
        fn common_prefix_with(&self, other: &Self) -> MonikerResult<Self> {
            let shared: String = self
                .name
                .chars()
                .zip(other.name.chars())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect();
            if shared.is_empty() {
                Err(MonikerError::from_hresult(codes::MK_E_NOPREFIX))
            } else {
                Ok(Self::simple(&shared))
            }
        }
        fn relative_path_to(&self, _other: &Self) -> MonikerResult<Self> {
            Err(MonikerError::from_hresult(codes::E_NOTIMPL))
        }
    }

    #[derive(Default)]
    struct FakeResolver {
        parses: AtomicUsize,
    }

    impl MonikerResolver for FakeResolver {
        type Handle = FakeMoniker;

        fn parse(&self, display_name: &str) -> MonikerResult<(usize, FakeMoniker)> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            match display_name {
                "" => Err(MonikerError::from_hresult(codes::MK_E_SYNTAX)),
                "boom" => panic!("resolver exploded"),
                "C:\\book.xls!Sheet1" => Ok((
                    display_name.len(),
                    FakeMoniker {
                        name: display_name.to_string(),
                        kind: MonikerKind::GenericComposite,
                        parts: vec!["C:\\book.xls".into(), "!Sheet1".into()],
                        change: Ok(FileTime::from_unix_seconds(1_600_000_000).0),
                    },
                )),
                other => Ok((other.len(), FakeMoniker::simple(other))),
            }
        }

        fn running(&self) -> MonikerResult<Vec<FakeMoniker>> {
            Ok(vec![
                FakeMoniker::simple("!running-a"),
                FakeMoniker::simple("!denied-remote"),
                FakeMoniker::simple("!running-b"),
            ])
        }
    }

    async fn start(resolver: Arc<FakeResolver>) -> MonikerWorker<FakeResolver> {
        tokio::task::spawn_blocking(move || {
            MonikerWorker::start(resolver, Apartment::MultiThreaded).unwrap()
        })
        .await
        .unwrap()
    }

    async fn describe(worker: &MonikerWorker<FakeResolver>, name: &str) -> MonikerResult<MonikerInfo> {
        worker
            .send_request(|reply| MonikerRequest::Describe {
                display_name: name.to_string(),
                reply,
            })
            .await
    }

    #[tokio::test]
    async fn test_worker_starts_and_stops() {
        let worker = start(Arc::default()).await;
        drop(worker);
    }

    #[tokio::test]
    async fn test_describe_simple() {
        let worker = start(Arc::default()).await;
        let info = describe(&worker, "!running-item").await.unwrap();
        assert_eq!(info.display_name, "!running-item");
        assert_eq!(info.eaten, "!running-item".len());
        assert_eq!(info.kind, MonikerKind::Item);
        assert!(info.running);
        assert_eq!(info.last_change, None);
        assert_eq!(
            info.class_id.as_deref(),
            Some("{00000304-0000-0000-C000-000000000046}")
        );
        assert_eq!(info.size_max, None);
        assert!(info.components.is_empty());
    }

    #[tokio::test]
    async fn test_describe_composite() {
        let worker = start(Arc::default()).await;
        let info = describe(&worker, "C:\\book.xls!Sheet1").await.unwrap();
        assert_eq!(info.kind, MonikerKind::GenericComposite);
        assert!(!info.running);
        assert_eq!(info.components, ["C:\\book.xls", "!Sheet1"]);
        assert_eq!(
            info.last_change.map(|t| t.timestamp()),
            Some(1_600_000_000)
        );
    }

    #[tokio::test]
    async fn test_describe_parse_error() {
        let worker = start(Arc::default()).await;
        let err = describe(&worker, "").await.unwrap_err();
        assert_eq!(err.hresult(), Some(codes::MK_E_SYNTAX));
    }

    #[tokio::test]
    async fn test_parse_cache_reuse() {
        let resolver = Arc::new(FakeResolver::default());
        let worker = start(Arc::clone(&resolver)).await;
        describe(&worker, "!cached").await.unwrap();
        describe(&worker, "!cached").await.unwrap();
        assert_eq!(resolver.parses.load(Ordering::SeqCst), 1);

        describe(&worker, "!other").await.unwrap();
        assert_eq!(resolver.parses.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_compare() {
        let worker = start(Arc::default()).await;
        let cmp = worker
            .send_request(|reply| MonikerRequest::Compare {
                left: "!Sheet1".into(),
                right: "!Sheet2".into(),
                reply,
            })
            .await
            .unwrap();
        assert!(!cmp.equal);
        assert_eq!(cmp.common_prefix.as_deref(), Some("!Sheet"));
        assert_eq!(cmp.relative_path, None);

        let cmp = worker
            .send_request(|reply| MonikerRequest::Compare {
                left: "abc".into(),
                right: "xyz".into(),
                reply,
            })
            .await
            .unwrap();
        assert_eq!(cmp.common_prefix, None);

        let cmp = worker
            .send_request(|reply| MonikerRequest::Compare {
                left: "same".into(),
                right: "same".into(),
                reply,
            })
            .await
            .unwrap();
        assert!(cmp.equal);
    }

    #[tokio::test]
    async fn test_list_running_skips_unnamed_entries() {
        let worker = start(Arc::default()).await;
        let names = worker
            .send_request(|reply| MonikerRequest::ListRunning { reply })
            .await
            .unwrap();
        assert_eq!(names, ["!running-a", "!running-b"]);
    }

    #[tokio::test]
    async fn test_worker_panic_propagation() {
        let worker = start(Arc::default()).await;
        let err = describe(&worker, "boom").await.unwrap_err();
        assert!(matches!(err, MonikerError::Worker(_)));

        let err = describe(&worker, "!after").await.unwrap_err();
        assert!(matches!(err, MonikerError::Worker(_)));
    }
}
