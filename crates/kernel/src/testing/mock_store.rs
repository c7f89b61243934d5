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

//! An in-memory [`ObjectStore`]: plain `HashMap`s behind a lock, `put_*`
//! builders for test fixtures instead of a real persistence layer.

use std::collections::HashMap;

use parking_lot::RwLock;

use loom_values::{Dbref, Function, GameObject, ObjectClass, ObjectId, Var, Verb};

use crate::store::{ObjectStore, StoreError};

#[derive(Default)]
pub struct MockObjectStore {
    objects: RwLock<HashMap<ObjectId, GameObject>>,
    classes: RwLock<HashMap<ObjectId, ObjectClass>>,
    verbs: RwLock<Vec<Verb>>,
    functions: RwLock<Vec<Function>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        MockObjectStore::default()
    }

    pub fn put_object(&self, obj: GameObject) {
        self.objects.write().insert(obj.id.clone(), obj);
    }

    pub fn put_class(&self, class: ObjectClass) {
        self.classes.write().insert(class.id.clone(), class);
    }

    pub fn put_verb(&self, verb: Verb) {
        self.verbs.write().push(verb);
    }

    pub fn put_function(&self, function: Function) {
        self.functions.write().push(function);
    }
}

impl ObjectStore for MockObjectStore {
    fn get_object(&self, id: &ObjectId) -> Option<GameObject> {
        self.objects.read().get(id).cloned()
    }

    fn get_object_by_dbref(&self, n: Dbref) -> Option<GameObject> {
        self.objects.read().values().find(|o| o.dbref == n).cloned()
    }

    fn get_all_objects(&self) -> Vec<GameObject> {
        self.objects.read().values().cloned().collect()
    }

    fn get_objects_in_location(&self, loc: &ObjectId) -> Vec<GameObject> {
        self.objects
            .read()
            .values()
            .filter(|o| o.location.as_ref() == Some(loc))
            .cloned()
            .collect()
    }

    fn get_class(&self, id: &ObjectId) -> Option<ObjectClass> {
        self.classes.read().get(id).cloned()
    }

    fn get_class_by_name(&self, name: &str) -> Option<ObjectClass> {
        self.classes
            .read()
            .values()
            .find(|c| c.name.eq_ignore_case(name))
            .cloned()
    }

    fn get_all_object_classes(&self) -> Vec<ObjectClass> {
        self.classes.read().values().cloned().collect()
    }

    fn get_property(&self, obj: &ObjectId, name: &str) -> Option<Var> {
        self.objects.read().get(obj).and_then(|o| o.properties.get(name).cloned())
    }

    fn set_property(&self, obj: &ObjectId, name: &str, value: Var) -> Result<(), StoreError> {
        let mut guard = self.objects.write();
        let object = guard
            .get_mut(obj)
            .ok_or_else(|| StoreError::NoSuchProperty(name.to_string(), obj.clone()))?;
        object.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn find_verbs_by_object_id(&self, id: &ObjectId) -> Vec<Verb> {
        self.verbs.read().iter().filter(|v| &v.owning_object_id == id).cloned().collect()
    }

    fn find_functions_for_object(&self, id: &ObjectId, include_inherited: bool) -> Vec<Function> {
        let mut result: Vec<Function> = self
            .functions
            .read()
            .iter()
            .filter(|f| &f.owning_object_id == id)
            .cloned()
            .collect();
        if include_inherited {
            if let Some(obj) = self.get_object(id) {
                let mut current = self.get_class(&obj.class_id);
                while let Some(class) = current {
                    result.extend(
                        self.functions
                            .read()
                            .iter()
                            .filter(|f| f.owning_object_id == class.id)
                            .cloned(),
                    );
                    current = class.parent_class_id.as_ref().and_then(|p| self.get_class(p));
                }
            }
        }
        result
    }

    fn get_online_players(&self) -> Vec<GameObject> {
        self.objects.read().values().filter(|o| o.session.is_some()).cloned().collect()
    }

    fn get_all_verbs(&self) -> Vec<Verb> {
        self.verbs.read().clone()
    }

    fn get_all_functions(&self) -> Vec<Function> {
        self.functions.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_values::{v_str, Symbol};
    use std::collections::HashSet;

    fn object(id: &str, dbref: i64) -> GameObject {
        GameObject {
            id: ObjectId::new(id),
            dbref,
            class_id: ObjectId::new("generic"),
            owner: None,
            location: None,
            contents: Vec::new(),
            properties: HashMap::new(),
            permissions: HashSet::new(),
            session: None,
            is_null_object: false,
        }
    }

    #[test]
    fn put_and_get_object_round_trips() {
        let store = MockObjectStore::new();
        store.put_object(object("o1", 1));
        assert_eq!(store.get_object(&ObjectId::new("o1")).unwrap().dbref, 1);
        assert!(store.get_object(&ObjectId::new("missing")).is_none());
    }

    #[test]
    fn set_property_fails_on_unknown_object() {
        let store = MockObjectStore::new();
        let err = store.set_property(&ObjectId::new("ghost"), "name", v_str("x"));
        assert!(err.is_err());
    }

    #[test]
    fn set_and_get_property_round_trip() {
        let store = MockObjectStore::new();
        store.put_object(object("o1", 1));
        store.set_property(&ObjectId::new("o1"), "name", v_str("Ada")).unwrap();
        assert_eq!(
            store.get_property(&ObjectId::new("o1"), "name").unwrap().as_str(),
            Some("Ada")
        );
    }

    #[test]
    fn find_verbs_only_returns_verbs_owned_by_the_given_id() {
        let store = MockObjectStore::new();
        store.put_verb(Verb {
            id: ObjectId::new("v1"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("look"),
            aliases: vec![],
            pattern: None,
            source: String::new(),
            active: true,
        });
        store.put_verb(Verb {
            id: ObjectId::new("v2"),
            owning_object_id: ObjectId::new("o2"),
            name: Symbol::new("look"),
            aliases: vec![],
            pattern: None,
            source: String::new(),
            active: true,
        });
        assert_eq!(store.find_verbs_by_object_id(&ObjectId::new("o1")).len(), 1);
    }
}
