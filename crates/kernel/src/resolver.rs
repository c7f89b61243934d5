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

//! Object resolution and the `Helpers` facade scripts see. Resolution
//! walks a staged list of candidate pools -- keywords, dbrefs, classes,
//! online players, then name containment -- and returns the first match.

use loom_values::{Function, GameObject, ObjectClass, ObjectId, Verb};
use std::sync::Arc;

use crate::store::ObjectStore;

/// The `Helpers` facade carried by [`crate::context::ExecutionContext`]:
/// inherited from the caller's frame when present, otherwise constructed
/// fresh bound to the invocation's `Player`.
#[derive(Clone)]
pub struct Helpers {
    store: Arc<dyn ObjectStore>,
    bound_player: ObjectId,
}

impl Helpers {
    pub fn new(store: Arc<dyn ObjectStore>, bound_player: ObjectId) -> Self {
        Helpers { store, bound_player }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn bound_player(&self) -> &ObjectId {
        &self.bound_player
    }

    /// `ResolveObject(ref, callerThis)`: walks a seven-rule resolution
    /// order, first match wins.
    pub fn resolve_object(&self, reference: &str, caller_this: &GameObject) -> Option<GameObject> {
        resolve_object(&self.store, reference, caller_this, &self.bound_player)
    }

    /// Walks `obj`'s object, then class, then parent-class chain looking
    /// for a verb matching `name` (name or alias, case-insensitive).
    /// Returns the first match: a verb on the object itself masks one of
    /// the same name further up the class chain.
    pub fn find_verb(&self, obj: &ObjectId, name: &str) -> Option<Verb> {
        find_verb(&*self.store, obj, name)
    }

    /// Same chain walk as [`Self::find_verb`], matching by name only.
    pub fn find_function(&self, obj: &ObjectId, name: &str) -> Option<Function> {
        find_function(&*self.store, obj, name)
    }
}

fn class_chain(store: &dyn ObjectStore, obj: &GameObject) -> Vec<ObjectClass> {
    let mut chain = Vec::new();
    let mut current = store.get_class(&obj.class_id);
    while let Some(class) = current {
        let parent = class.parent_class_id.clone();
        chain.push(class);
        current = parent.and_then(|p| store.get_class(&p));
    }
    chain
}

fn find_verb(store: &dyn ObjectStore, obj_id: &ObjectId, name: &str) -> Option<Verb> {
    let obj = store.get_object(obj_id)?;
    for verb in store.find_verbs_by_object_id(&obj.id) {
        if verb.active && verb.matches_name(name) {
            return Some(verb);
        }
    }
    for class in class_chain(store, &obj) {
        for verb in store.find_verbs_by_object_id(&class.id) {
            if verb.active && verb.matches_name(name) {
                return Some(verb);
            }
        }
    }
    None
}

fn find_function(store: &dyn ObjectStore, obj_id: &ObjectId, name: &str) -> Option<Function> {
    let obj = store.get_object(obj_id)?;
    for func in store.find_functions_for_object(&obj.id, false) {
        if func.active && func.name.eq_ignore_case(name) {
            return Some(func);
        }
    }
    for class in class_chain(store, &obj) {
        for func in store.find_functions_for_object(&class.id, false) {
            if func.active && func.name.eq_ignore_case(name) {
                return Some(func);
            }
        }
    }
    None
}

/// The seven-rule resolution order. `me`/`here` resolve against
/// `bound_player`: the calling frame's Player, which is the invocation's
/// actor at the top level and the nearest enclosing Player otherwise.
fn resolve_object(
    store: &Arc<dyn ObjectStore>,
    reference: &str,
    caller_this: &GameObject,
    bound_player: &ObjectId,
) -> Option<GameObject> {
    let trimmed = reference.trim();

    // Rule 1: literal keywords.
    match trimmed.to_ascii_lowercase().as_str() {
        "me" => return store.get_object(bound_player),
        "here" => {
            let player = store.get_object(bound_player)?;
            return player.location.as_ref().and_then(|loc| store.get_object(loc));
        }
        "system" => return store.get_object(&ObjectId::new("system")),
        _ => {}
    }

    // Rule 2: #N dbref.
    if let Some(rest) = trimmed.strip_prefix('#') {
        if let Ok(n) = rest.parse::<i64>() {
            if let Some(obj) = store.get_object_by_dbref(n) {
                return Some(obj);
            }
        }
    }

    // Rule 3: class:Name or Name.class.
    if let Some(name) = trimmed.strip_prefix("class:") {
        if let Some(class) = store.get_class_by_name(name) {
            return class_as_object(store, &class);
        }
    }
    if let Some(name) = trimmed.strip_suffix(".class") {
        if let Some(class) = store.get_class_by_name(name) {
            return class_as_object(store, &class);
        }
    }

    // Rule 4: exact class id.
    if let Some(class) = store.get_class(&ObjectId::new(trimmed)) {
        if let Some(obj) = class_as_object(store, &class) {
            return Some(obj);
        }
    }

    // Rule 5: player name, case-insensitive containment against online players.
    let lower = trimmed.to_ascii_lowercase();
    for player in store.get_online_players() {
        if let Some(name) = player
            .properties
            .get("name")
            .and_then(|v| v.as_str())
        {
            if name.to_ascii_lowercase().contains(&lower) {
                return Some(player);
            }
        }
    }

    // Rule 6: name/short-description containment: location, then
    // inventory, then everything. Prefix match preferred over plain
    // containment within each pool.
    let pools: Vec<Vec<GameObject>> = vec![
        caller_this
            .location
            .as_ref()
            .map(|loc| store.get_objects_in_location(loc))
            .unwrap_or_default(),
        caller_this
            .contents
            .iter()
            .filter_map(|id| store.get_object(id))
            .collect(),
        store.get_all_objects(),
    ];
    for pool in &pools {
        if let Some(found) = best_name_match(pool, &lower) {
            return Some(found);
        }
    }

    // Rule 7: class by plain name.
    if let Some(class) = store.get_class_by_name(trimmed) {
        if let Some(obj) = class_as_object(store, &class) {
            return Some(obj);
        }
    }

    None
}

fn class_as_object(store: &Arc<dyn ObjectStore>, class: &ObjectClass) -> Option<GameObject> {
    store.get_object(&class.id)
}

fn object_display_name(obj: &GameObject) -> Option<String> {
    obj.properties
        .get("name")
        .or_else(|| obj.properties.get("short_description"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn best_name_match(pool: &[GameObject], lower_ref: &str) -> Option<GameObject> {
    let mut containment_fallback: Option<GameObject> = None;
    for obj in pool {
        let Some(name) = object_display_name(obj) else {
            continue;
        };
        let lower_name = name.to_ascii_lowercase();
        if lower_name.starts_with(lower_ref) {
            return Some(obj.clone());
        }
        if containment_fallback.is_none() && lower_name.contains(lower_ref) {
            containment_fallback = Some(obj.clone());
        }
    }
    containment_fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_store::MockObjectStore;
    use loom_values::{v_str, AccessModifier, ObjectClass, Permission, Symbol};
    use std::collections::HashSet;

    fn object(id: &str, dbref: i64, name: &str, location: Option<&str>) -> GameObject {
        let mut obj = GameObject {
            id: ObjectId::new(id),
            dbref,
            class_id: ObjectId::new("generic"),
            owner: None,
            location: location.map(ObjectId::new),
            contents: Vec::new(),
            properties: Default::default(),
            permissions: HashSet::new(),
            session: None,
            is_null_object: false,
        };
        obj.properties.insert("name".to_string(), v_str(name));
        obj
    }

    #[test]
    fn resolves_me_to_bound_player() {
        let store = MockObjectStore::new();
        let player = object("p1", 1, "Ada", None);
        store.put_object(player.clone());
        let helpers = Helpers::new(Arc::new(store), ObjectId::new("p1"));
        let resolved = helpers.resolve_object("me", &player).unwrap();
        assert_eq!(resolved.id, player.id);
    }

    #[test]
    fn resolves_dbref() {
        let store = MockObjectStore::new();
        let obj = object("room1", 42, "R1", None);
        store.put_object(obj.clone());
        let helpers = Helpers::new(Arc::new(store), ObjectId::new("room1"));
        let resolved = helpers.resolve_object("#42", &obj).unwrap();
        assert_eq!(resolved.id, obj.id);
    }

    #[test]
    fn resolves_by_name_containment_in_location_first() {
        let store = MockObjectStore::new();
        let room = object("r1", 1, "Room", None);
        let here = object("p1", 2, "Ada", Some("r1"));
        let box_obj = object("box1", 3, "wooden box", Some("r1"));
        store.put_object(room);
        store.put_object(here.clone());
        store.put_object(box_obj.clone());
        let helpers = Helpers::new(Arc::new(store), ObjectId::new("p1"));
        let resolved = helpers.resolve_object("box", &here).unwrap();
        assert_eq!(resolved.id, box_obj.id);
    }

    #[test]
    fn verb_lookup_walks_inheritance_chain_first_match_wins() {
        let store = MockObjectStore::new();
        let parent_class = ObjectClass {
            id: ObjectId::new("parent"),
            name: Symbol::new("Parent"),
            parent_class_id: None,
        };
        let child_class = ObjectClass {
            id: ObjectId::new("child"),
            name: Symbol::new("Child"),
            parent_class_id: Some(ObjectId::new("parent")),
        };
        store.put_class(parent_class);
        store.put_class(child_class);
        let mut obj = object("o1", 1, "Obj", None);
        obj.class_id = ObjectId::new("child");
        store.put_object(obj.clone());

        store.put_verb(Verb {
            id: ObjectId::new("v-parent"),
            owning_object_id: ObjectId::new("parent"),
            name: Symbol::new("look"),
            aliases: vec![],
            pattern: None,
            source: "return false;".to_string(),
            active: true,
        });
        store.put_verb(Verb {
            id: ObjectId::new("v-child"),
            owning_object_id: ObjectId::new("child"),
            name: Symbol::new("look"),
            aliases: vec![],
            pattern: None,
            source: "return true;".to_string(),
            active: true,
        });

        let found = find_verb(&store, &ObjectId::new("o1"), "look").unwrap();
        assert_eq!(found.owning_object_id, ObjectId::new("child"));
    }

    #[test]
    fn function_lookup_matches_by_name_only() {
        let store = MockObjectStore::new();
        let mut obj = object("o1", 1, "Obj", None);
        obj.class_id = ObjectId::new("generic");
        store.put_object(obj);
        store.put_function(Function {
            id: ObjectId::new("f1"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("secret"),
            parameter_names: vec![],
            parameter_types: vec![],
            return_type: "string".to_string(),
            access: AccessModifier::Private,
            source: r#"return "s";"#.to_string(),
            active: true,
        });
        let found = find_function(&store, &ObjectId::new("o1"), "SECRET").unwrap();
        assert_eq!(found.id, ObjectId::new("f1"));
    }
}
