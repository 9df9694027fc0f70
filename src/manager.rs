// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The `Manager` façade: pairs a [`Registry`] with a [`ThreadPool`] and
//! dispatches bulk operations across it (spec §4.6).
//!
//! Every method here respects the registry > archetype > slot-map lock
//! hierarchy (spec §5) by construction: it never holds more than one of
//! those locks at a time itself, leaving the actual locking to `Registry`
//! and `ArchetypeCell`.

use std::sync::Arc;

use crate::component::{Bundle, Component};
use crate::handle::Handle;
use crate::registry::Registry;
use crate::threadpool::ThreadPool;
use crate::typeid::ComponentTypeId;

/// Library-level configuration for a [`Manager`] (spec §2 expansion): just
/// the worker pool size today. The engine has no binary entry point of its
/// own, so there is no CLI/file config loader to wire this up to — callers
/// that do have one pass the value through here.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub worker_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { worker_count: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1) }
    }
}

/// Pairs a [`Registry`] with a worker pool and exposes the bulk,
/// parallel-dispatch operations built on top of it.
pub struct Manager {
    registry: Arc<Registry>,
    pool: Arc<ThreadPool>,
}

impl Manager {
    pub fn new(registry: Arc<Registry>, pool: Arc<ThreadPool>) -> Self {
        Self { registry, pool }
    }

    /// Convenience constructor: a fresh registry backed by a pool of
    /// `worker_count` threads.
    pub fn with_worker_count(worker_count: usize) -> Self {
        Self::new(Arc::new(Registry::new()), Arc::new(ThreadPool::new(worker_count)))
    }

    /// Convenience constructor: a fresh registry backed by a pool sized
    /// from `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_worker_count(config.worker_count)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<ThreadPool> {
        &self.pool
    }

    /// `Insert<B>(bundle)`, single entity.
    pub fn insert<B: Bundle>(&self, bundle: B) -> Handle {
        self.registry.insert(bundle)
    }

    /// `InsertBulk<B>(bundles)`: one worker task per bundle, collected back
    /// in input order once the pool goes idle.
    pub fn insert_bulk<B: Bundle>(&self, bundles: Vec<B>) -> Vec<Handle> {
        let results: Arc<parking_lot::Mutex<Vec<Option<Handle>>>> =
            Arc::new(parking_lot::Mutex::new(vec![None; bundles.len()]));
        for (i, bundle) in bundles.into_iter().enumerate() {
            let registry = self.registry.clone();
            let results = results.clone();
            self.pool.enqueue(move || {
                let h = registry.insert(bundle);
                results.lock()[i] = Some(h);
            });
        }
        self.pool.wait_for_idle();
        results
            .lock()
            .clone()
            .into_iter()
            .map(|h| h.expect("every dispatched insert task completed before wait_for_idle returned"))
            .collect()
    }

    /// `EraseBulk(handles)`: one worker task per handle. Safe to call with
    /// handles that share an archetype — `Registry::erase_entity` takes
    /// that archetype's own write lock for the duration of each erase.
    pub fn erase_bulk(&self, handles: Vec<Handle>) {
        for h in handles {
            let registry = self.registry.clone();
            self.pool.enqueue(move || {
                let _ = registry.erase_entity(h);
            });
        }
        self.pool.wait_for_idle();
    }

    /// `ForEachView<T>(excluded, f)`: one worker task per matched
    /// archetype, each holding that archetype's read lock for its own
    /// sub-iteration only (spec §4.6).
    pub fn for_each_view<T, F>(&self, excluded: &[ComponentTypeId], f: F)
    where
        T: Component,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let view = self.registry.get_view::<T>(excluded);
        let f = Arc::new(f);
        for (arch, size) in view.archetypes() {
            let arch = arch.clone();
            let size = *size;
            let f = f.clone();
            self.pool.enqueue(move || {
                let data = arch.read();
                for row in 0..size {
                    if let Ok(value) = data.get::<T>(row) {
                        f(value);
                    }
                }
            });
        }
        self.pool.wait_for_idle();
    }

    /// `ForEachView<T>(excluded, f)`, mutable: one worker task per matched
    /// archetype, each holding that archetype's write lock for its own
    /// sub-iteration only.
    pub fn for_each_view_mut<T, F>(&self, excluded: &[ComponentTypeId], f: F)
    where
        T: Component,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let view = self.registry.get_view::<T>(excluded);
        let f = Arc::new(f);
        for (arch, size) in view.archetypes() {
            let arch = arch.clone();
            let size = *size;
            let f = f.clone();
            self.pool.enqueue(move || {
                let mut data = arch.write();
                for row in 0..size {
                    if let Ok(value) = data.get_mut::<T>(row) {
                        f(value);
                    }
                }
            });
        }
        self.pool.wait_for_idle();
    }

    /// Block until every outstanding bulk/view task has finished.
    pub fn wait_idle(&self) {
        self.pool.wait_for_idle();
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Counter(i64);

    #[test]
    fn default_config_picks_at_least_one_worker() {
        let config = EngineConfig::default();
        assert!(config.worker_count >= 1);
        let manager = Manager::default();
        assert!(manager.pool().worker_count() >= 1);
    }

    #[test]
    fn s5_parallel_for_each_view_mut_touches_every_row() {
        let manager = Manager::with_worker_count(4);
        let handles: Vec<Handle> = (0..10_000).map(|_| manager.insert((Counter(0),))).collect();

        manager.for_each_view_mut::<Counter, _>(&[], |c| c.0 += 1);

        for h in handles {
            assert_eq!(manager.registry().get::<Counter, _>(h, |c| c.0).unwrap(), 1);
        }
    }

    #[test]
    fn insert_bulk_returns_handles_in_order() {
        let manager = Manager::with_worker_count(4);
        let bundles: Vec<(Counter,)> = (0..50).map(|i| (Counter(i),)).collect();
        let handles = manager.insert_bulk(bundles);
        assert_eq!(handles.len(), 50);
        for (i, h) in handles.iter().enumerate() {
            assert_eq!(manager.registry().get::<Counter, _>(*h, |c| c.0).unwrap(), i as i64);
        }
    }

    #[test]
    fn erase_bulk_removes_every_handle() {
        let manager = Manager::with_worker_count(4);
        let handles: Vec<Handle> = (0..200).map(|_| manager.insert((Counter(0),))).collect();
        manager.erase_bulk(handles.clone());
        for h in handles {
            assert!(!manager.registry().exists(h));
        }
    }

    #[test]
    fn for_each_view_counts_are_consistent() {
        let manager = Manager::with_worker_count(2);
        for _ in 0..100 {
            manager.insert((Counter(5),));
        }
        let total = Arc::new(AtomicI64::new(0));
        let total_clone = total.clone();
        manager.for_each_view::<Counter, _>(&[], move |c| {
            total_clone.fetch_add(c.0, Ordering::SeqCst);
        });
        assert_eq!(total.load(Ordering::SeqCst), 500);
    }
}
