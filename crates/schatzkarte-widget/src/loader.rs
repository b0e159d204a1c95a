//! One-time loading of the provider client library.
//!
//! The library is loaded at most once per [`SdkLoader`]. Concurrent callers
//! share the same in-flight fetch and all observe the same handle or the same
//! [`LoadFailure`]. A failure is cached: nothing retries automatically.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::OnceCell;
use tracing::{debug, error, info};
use url::Url;

use crate::error::LoadFailure;
use crate::provider::{BoxFuture, ConferenceSdk, SdkFetcher};

/// Result of a load, shared by every waiter.
pub type LoadOutcome = Result<Arc<dyn ConferenceSdk>, LoadFailure>;

/// A load handed to the host, to be awaited and fed back into the widget.
pub type PendingLoad = BoxFuture<'static, LoadOutcome>;

static SHARED: OnceLock<Arc<SdkLoader>> = OnceLock::new();

/// Lazily loads the provider SDK exactly once.
pub struct SdkLoader {
    fetcher: Arc<dyn SdkFetcher>,
    loaded: OnceCell<LoadOutcome>,
}

impl fmt::Debug for SdkLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkLoader")
            .field("settled", &self.loaded.initialized())
            .finish_non_exhaustive()
    }
}

impl SdkLoader {
    /// Creates an isolated loader.
    pub fn new(fetcher: Arc<dyn SdkFetcher>) -> Self {
        Self {
            fetcher,
            loaded: OnceCell::new(),
        }
    }

    /// Returns the process-wide loader, installing one on first use.
    ///
    /// `fetcher` is only called by the first caller; later callers get the
    /// already installed loader.
    pub fn shared(fetcher: impl FnOnce() -> Arc<dyn SdkFetcher>) -> Arc<SdkLoader> {
        SHARED
            .get_or_init(|| Arc::new(Self::new(fetcher())))
            .clone()
    }

    /// Returns true once a load has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.loaded.initialized()
    }

    /// Loads the SDK, or returns the cached outcome.
    ///
    /// Only the first call's `script_url` is used.
    pub async fn load(&self, script_url: Url) -> LoadOutcome {
        self.loaded
            .get_or_init(|| async {
                debug!(%script_url, "Loading conferencing SDK");
                self.fetcher.purge_stale_globals();
                match self.fetcher.fetch(script_url.clone()).await {
                    Ok(sdk) => {
                        info!(provider = sdk.name(), "Conferencing SDK loaded");
                        Ok(sdk)
                    }
                    Err(e) => {
                        error!(error = %e, %script_url, "Conferencing SDK failed to load");
                        Err(LoadFailure::from(e))
                    }
                }
            })
            .await
            .clone()
    }

    /// Starts a load as an owned future.
    pub fn begin(self: &Arc<Self>, script_url: Url) -> PendingLoad {
        let loader = Arc::clone(self);
        Box::pin(async move { loader.load(script_url).await })
    }
}
