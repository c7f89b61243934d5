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

//! The external collaborator contracts: the object store and the command
//! processor. Persistence itself is out of scope for this crate -- only
//! the interfaces are pinned down here, as traits, so the kernel compiles
//! against a boundary instead of a concrete store.

use loom_values::{Dbref, Function, GameObject, ObjectClass, ObjectId, Var, Verb};
use thiserror::Error;

/// Failures surfaced by an [`ObjectStore`] implementation. Distinct from
/// [`loom_values::EngineError`]: this is the store's own error channel,
/// which the engine translates into `EngineError::ContextError` or
/// `EngineError::ResolutionFailed` at the call site.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such property '{0}' on object '{1}'")]
    NoSuchProperty(String, ObjectId),
    #[error("permission denied writing property '{0}' on object '{1}'")]
    PropertyPermissionDenied(String, ObjectId),
}

/// The object/property store contract consumed by the kernel.
/// Implementations own persistence; the kernel only reads and writes
/// through this trait.
pub trait ObjectStore: Send + Sync {
    fn get_object(&self, id: &ObjectId) -> Option<GameObject>;
    fn get_object_by_dbref(&self, n: Dbref) -> Option<GameObject>;
    fn get_all_objects(&self) -> Vec<GameObject>;
    fn get_objects_in_location(&self, loc: &ObjectId) -> Vec<GameObject>;

    fn get_class(&self, id: &ObjectId) -> Option<ObjectClass>;
    fn get_class_by_name(&self, name: &str) -> Option<ObjectClass>;
    fn get_all_object_classes(&self) -> Vec<ObjectClass>;

    /// Walks `child`'s class chain looking for `parent`. Used by
    /// `Function` access-control's `Protected` check (same class id) and
    /// by administrative tooling; the engine's own verb/function lookup
    /// chain walks this same link directly rather than through this
    /// helper.
    fn inherits_from(&self, child_class_id: &ObjectId, parent_class_id: &ObjectId) -> bool {
        let mut current = self.get_class(child_class_id);
        while let Some(class) = current {
            if &class.id == parent_class_id {
                return true;
            }
            current = class.parent_class_id.as_ref().and_then(|p| self.get_class(p));
        }
        false
    }

    fn get_property(&self, obj: &ObjectId, name: &str) -> Option<Var>;
    fn set_property(&self, obj: &ObjectId, name: &str, value: Var) -> Result<(), StoreError>;

    /// Verbs directly on `id` (not walking the class chain); the
    /// engine's inheritance walk calls this once per link.
    fn find_verbs_by_object_id(&self, id: &ObjectId) -> Vec<Verb>;
    /// Functions on `id`. When `include_inherited` is true, the result
    /// also includes functions reachable through `id`'s class chain
    /// (convenience for administrative listing; the engine's own lookup
    /// walks the chain itself rather than relying on this flag).
    fn find_functions_for_object(&self, id: &ObjectId, include_inherited: bool) -> Vec<Function>;

    fn get_online_players(&self) -> Vec<GameObject>;

    /// All verbs in the store, for [`crate::initializer::CompilationInitializer`]'s
    /// warm-up pass.
    fn get_all_verbs(&self) -> Vec<Verb>;
    /// All functions in the store, for the same warm-up pass.
    fn get_all_functions(&self) -> Vec<Function>;
}

/// The output sink for player-visible messages. Delivery ordering is
/// per-session FIFO at the processor's discretion.
pub trait CommandProcessor: Send + Sync {
    fn send_to_player(&self, message: &str, session_handle: Option<&str>);
}
