use arc_swap::ArcSwap;
use http::Method;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use super::core::{MatchResult, Router};
use crate::context::HandlersChain;
use crate::error::RouterError;

/// A [`Router`] that can gain routes while requests are being matched.
///
/// Readers load an immutable snapshot without locking. Writers are serialized,
/// clone the current snapshot, register into the clone and publish it with a
/// single atomic swap. A reader therefore sees either the old table or the new
/// one, never a partially built one.
///
/// With `precompile` set, a snapshot's fallback tables are built before it is
/// published. Otherwise each table is built once, by the first request that needs
/// it.
pub struct SharedRouter {
    current: ArcSwap<Router>,
    writer: Mutex<()>,
    precompile: bool,
}

impl SharedRouter {
    /// Wrap `router` as the first snapshot, building its fallback tables eagerly
    /// when `precompile` is set.
    pub fn new(router: Router, precompile: bool) -> Self {
        if precompile {
            router.finalize();
        }
        Self {
            current: ArcSwap::from_pointee(router),
            writer: Mutex::new(()),
            precompile,
        }
    }

    pub fn precompile(&self) -> bool {
        self.precompile
    }

    /// Current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<Router> {
        self.current.load_full()
    }

    /// Match against the current snapshot.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str, unescape: bool) -> MatchResult {
        self.current.load().match_route(method, path, unescape)
    }

    /// Register a route and publish the new snapshot.
    ///
    /// # Errors
    ///
    /// Same as [`Router::register`]; on error the published snapshot is unchanged.
    pub fn register(
        &self,
        method: Method,
        pattern: &str,
        handlers: HandlersChain,
    ) -> Result<(), RouterError> {
        let _guard = self.writer.lock();
        let mut next = Router::clone(&self.current.load());
        next.register(method, pattern, handlers)?;
        if self.precompile {
            next.build_tables();
        }
        self.current.store(Arc::new(next));
        Ok(())
    }

    /// Replace the whole routing table, e.g. after reloading route definitions.
    pub fn replace(&self, router: Router) {
        let _guard = self.writer.lock();
        if self.precompile {
            router.build_tables();
        }
        let routes_count = router.routes().len();
        self.current.store(Arc::new(router));
        info!(routes_count, "Routing table replaced");
    }
}

impl Default for SharedRouter {
    fn default() -> Self {
        Self::new(Router::new(), true)
    }
}
