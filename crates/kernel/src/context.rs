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

//! The per-invocation `ExecutionContext` ("Globals") scripts see, and the
//! thread-local ambient slot that publishes the current one. Builtins read
//! their ambient context from thread-local storage: set on entry by a
//! [`ContextGuard`], restored on exit.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use loom_values::{GameObject, Var};

use crate::resolver::Helpers;
use crate::store::CommandProcessor;

/// A marker distinguishing admin from non-admin globals. Functionally
/// identical today -- reserved for permission-dependent helpers that don't
/// exist yet; the engine only uses it to pick which marker to stamp.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GlobalsFlavor {
    User,
    Admin,
}

/// The per-invocation record visible to user code. One is created per
/// invocation and destroyed on return; nested calls stack the previous
/// one as "caller context" via [`ContextGuard`].
#[derive(Clone)]
pub struct ExecutionContext {
    pub flavor: GlobalsFlavor,
    pub player: GameObject,
    pub this_obj: GameObject,
    pub caller: Option<GameObject>,
    pub call_depth: u32,
    pub command_processor: Arc<dyn CommandProcessor>,
    pub helpers: Helpers,

    // Verb-specific; empty/default for function frames.
    pub input: Option<String>,
    pub args: Vec<String>,
    pub verb_name: Option<String>,
    pub variables: HashMap<String, String>,

    // Function-specific; empty for verb frames.
    pub parameters: Vec<Var>,
    pub named_parameters: HashMap<String, Var>,
}

impl ExecutionContext {
    /// `Caller`/`CallerGameObject`: the previous frame's `This`, defaulting
    /// to `Player` at the top level.
    pub fn caller_or_player(&self) -> &GameObject {
        self.caller.as_ref().unwrap_or(&self.player)
    }

    /// `Location`: convenience accessor over `Player`'s location, resolved
    /// through the store since only the id is stored on `GameObject`.
    pub fn location(&self) -> Option<GameObject> {
        self.player
            .location
            .as_ref()
            .and_then(|loc| self.helpers.store().get_object(loc))
    }
}

thread_local! {
    static CURRENT: RefCell<Option<ExecutionContext>> = const { RefCell::new(None) };
}

/// Returns a clone of the ambient context active on this thread, if any.
pub fn current() -> Option<ExecutionContext> {
    CURRENT.with(|c| c.borrow().clone())
}

/// RAII guard publishing a new ambient `ExecutionContext` for the
/// invocation's duration. Constructing one saves whatever was previously
/// current (the caller's context, if any); dropping it restores that
/// saved value, so the previous context is always a stack-saved value
/// restored on return.
pub struct ContextGuard {
    previous: Option<ExecutionContext>,
}

impl ContextGuard {
    pub fn enter(new_ctx: ExecutionContext) -> Self {
        let previous = CURRENT.with(|c| c.replace(Some(new_ctx)));
        ContextGuard { previous }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|c| *c.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_store::MockObjectStore;
    use crate::testing::mock_command_processor::MockCommandProcessor;
    use loom_values::ObjectId;
    use std::collections::HashSet;

    fn game_object(id: &str) -> GameObject {
        GameObject {
            id: ObjectId::new(id),
            dbref: 1,
            class_id: ObjectId::new("generic"),
            owner: None,
            location: None,
            contents: Vec::new(),
            properties: Default::default(),
            permissions: HashSet::new(),
            session: None,
            is_null_object: false,
        }
    }

    fn ctx(this_id: &str) -> ExecutionContext {
        let store: Arc<dyn crate::store::ObjectStore> = Arc::new(MockObjectStore::new());
        ExecutionContext {
            flavor: GlobalsFlavor::User,
            player: game_object("player1"),
            this_obj: game_object(this_id),
            caller: None,
            call_depth: 1,
            command_processor: Arc::new(MockCommandProcessor::new()),
            helpers: Helpers::new(store, ObjectId::new("player1")),
            input: None,
            args: Vec::new(),
            verb_name: None,
            variables: HashMap::new(),
            parameters: Vec::new(),
            named_parameters: HashMap::new(),
        }
    }

    #[test]
    fn no_ambient_context_outside_a_guard() {
        assert!(current().is_none());
    }

    #[test]
    fn guard_publishes_and_restores() {
        assert!(current().is_none());
        {
            let _g1 = ContextGuard::enter(ctx("o1"));
            assert_eq!(current().unwrap().this_obj.id, ObjectId::new("o1"));
            {
                let _g2 = ContextGuard::enter(ctx("o2"));
                assert_eq!(current().unwrap().this_obj.id, ObjectId::new("o2"));
            }
            assert_eq!(current().unwrap().this_obj.id, ObjectId::new("o1"));
        }
        assert!(current().is_none());
    }

    #[test]
    fn caller_defaults_to_player_at_top_level() {
        let c = ctx("o1");
        assert_eq!(c.caller_or_player().id, c.player.id);
    }
}
