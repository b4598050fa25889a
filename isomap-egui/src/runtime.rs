//! Spawning of the background work of the widget: data load passes and tile requests.

use std::future::Future;

/// Runs futures in the background.
///
/// Natively futures run on a tokio runtime. In the browser they are spawned on the JS event loop.
#[derive(Debug, Clone)]
pub struct Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    handle: tokio::runtime::Handle,
}

#[cfg(not(target_arch = "wasm32"))]
impl Spawner {
    /// Spawner running futures on the runtime of the given handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the calling thread is in, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }

    /// Spawns the future.
    pub fn spawn<T>(&self, future: T)
    where
        T: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

#[cfg(target_arch = "wasm32")]
impl Spawner {
    /// Spawner for the browser event loop.
    pub fn new() -> Self {
        Self {}
    }

    /// Spawner for the browser event loop.
    pub fn current() -> Option<Self> {
        Some(Self::new())
    }

    /// Spawns the future.
    pub fn spawn<T>(&self, future: T)
    where
        T: Future<Output = ()> + 'static,
    {
        wasm_bindgen_futures::spawn_local(future);
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for Spawner {
    fn default() -> Self {
        Self::new()
    }
}
