// Copyright (C) 2026 The Loomhaven Authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Keyed store of compiled artifacts. Two namespaces (verb, function)
//! over lock-free concurrent maps, so reads never block behind a
//! recompile of an unrelated artifact.

use crate::host_lang::CompiledUnit;
use ahash::AHasher;
use std::hash::BuildHasherDefault;
use std::sync::Arc;
use std::time::Instant;

type FastMap<K, V> = papaya::HashMap<K, V, BuildHasherDefault<AHasher>>;

/// Which keyspace a cache operation targets. Verbs and functions may
/// reuse the same id scheme in the object store, so the namespace keeps
/// them from colliding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Namespace {
    Verb,
    Function,
}

#[derive(Clone)]
struct CacheEntry {
    compiled_unit: Arc<dyn CompiledUnit>,
    source_hash: String,
    /// Number of prologue lines prepended ahead of the unit's user source;
    /// carried alongside the unit so a cache hit can
    /// still recover user-source line numbers on a runtime fault, the same
    /// way a fresh compile does.
    line_offset: usize,
    #[allow(dead_code)]
    inserted_at: Instant,
}

/// A thread-safe cache of compiled units keyed by artifact id. `get` only
/// returns a hit when the caller-supplied content hash matches what's
/// stored; a mismatch is treated as a stale entry, not evicted until the
/// next successful `set`, so concurrent callers tolerate a redundant
/// recompile rather than blocking on each other.
pub struct CompilationCache {
    verbs: FastMap<String, CacheEntry>,
    functions: FastMap<String, CacheEntry>,
}

impl Default for CompilationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilationCache {
    pub fn new() -> Self {
        CompilationCache {
            verbs: FastMap::default(),
            functions: FastMap::default(),
        }
    }

    fn map_for(&self, ns: Namespace) -> &FastMap<String, CacheEntry> {
        match ns {
            Namespace::Verb => &self.verbs,
            Namespace::Function => &self.functions,
        }
    }

    /// Returns the cached unit (and its prologue line offset) for `id` iff
    /// its stored content hash equals `current_hash`.
    pub fn get(&self, ns: Namespace, id: &str, current_hash: &str) -> Option<(Arc<dyn CompiledUnit>, usize)> {
        let guard = self.map_for(ns).pin();
        guard
            .get(id)
            .filter(|entry| entry.source_hash == current_hash)
            .map(|entry| (entry.compiled_unit.clone(), entry.line_offset))
    }

    /// Stores `unit` under `id`, stamped with `source_hash` and
    /// `line_offset`. Should only be called after at least one successful
    /// execution of the unit; last write wins on races.
    pub fn set(
        &self,
        ns: Namespace,
        id: impl Into<String>,
        unit: Arc<dyn CompiledUnit>,
        source_hash: impl Into<String>,
        line_offset: usize,
    ) {
        let guard = self.map_for(ns).pin();
        guard.insert(
            id.into(),
            CacheEntry {
                compiled_unit: unit,
                source_hash: source_hash.into(),
                line_offset,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Removes a single entry, e.g. after an artifact is edited or
    /// deleted.
    pub fn invalidate(&self, ns: Namespace, id: &str) {
        let guard = self.map_for(ns).pin();
        guard.remove(id);
    }

    /// Removes every entry in both namespaces.
    pub fn clear(&self) {
        self.verbs.pin().clear();
        self.functions.pin().clear();
    }

    pub fn len(&self, ns: Namespace) -> usize {
        self.map_for(ns).pin().len()
    }

    pub fn is_empty(&self, ns: Namespace) -> bool {
        self.len(ns) == 0
    }
}
