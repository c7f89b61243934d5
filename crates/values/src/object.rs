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

use crate::symbol::Symbol;
use crate::var::Var;
use arcstr::ArcStr;
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

/// A stable small-integer reference to an object, renderable as `#N`.
pub type Dbref = i64;

/// The store-assigned identifier used by `$IDENT` syntax and
/// `GetObjectById`. Distinct from [`Dbref`]: a dbref is always the small
/// integer form, an id is the store's own key (string in this core, since
/// `$foo-bar` idents may contain `-`/`_`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ObjectId(ArcStr);

impl ObjectId {
    pub fn new(id: impl AsRef<str>) -> Self {
        ObjectId(ArcStr::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId::new(s)
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        ObjectId::new(s)
    }
}

/// Permission/role markers carried by a [`GameObject`]. `Admin` is the
/// marker an engine uses to choose between admin and user globals surfaces;
/// the rest mirror a trimmed-down `ObjFlag` bit set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Permission {
    Admin,
    Programmer,
    Player,
    Read,
    Write,
}

/// Access modifier carried by a [`Function`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AccessModifier {
    Public,
    Private,
    Protected,
    Internal,
}

/// A named, pattern-triggered script attached to an object or class.
#[derive(Clone, Debug)]
pub struct Verb {
    pub id: ObjectId,
    pub owning_object_id: ObjectId,
    pub name: Symbol,
    pub aliases: Vec<Symbol>,
    pub pattern: Option<String>,
    pub source: String,
    /// Disabled verbs stay in the store but are skipped by warm-up and
    /// lookup rather than deleted outright.
    pub active: bool,
}

impl Verb {
    /// True if `name` matches this verb's name or any alias, case
    /// insensitively.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_case(name) || self.aliases.iter().any(|a| a.eq_ignore_case(name))
    }
}

/// A named script attached to an object or class with a declared signature.
#[derive(Clone, Debug)]
pub struct Function {
    pub id: ObjectId,
    pub owning_object_id: ObjectId,
    pub name: Symbol,
    pub parameter_names: Vec<String>,
    pub parameter_types: Vec<String>,
    pub return_type: String,
    pub access: AccessModifier,
    pub source: String,
    pub active: bool,
}

/// A template providing verbs, functions, and default properties; classes
/// form single-inheritance chains.
#[derive(Clone, Debug)]
pub struct ObjectClass {
    pub id: ObjectId,
    pub name: Symbol,
    pub parent_class_id: Option<ObjectId>,
}

/// An in-world entity with properties, a class, a location, and optional
/// contents. A player is modeled as a `GameObject` with `session` set
/// rather than a separate type, favoring composition over a parallel
/// inheritance hierarchy.
#[derive(Clone, Debug)]
pub struct GameObject {
    pub id: ObjectId,
    pub dbref: Dbref,
    pub class_id: ObjectId,
    pub owner: Option<ObjectId>,
    pub location: Option<ObjectId>,
    pub contents: Vec<ObjectId>,
    pub properties: HashMap<String, Var>,
    pub permissions: HashSet<Permission>,
    /// Present only for player objects; carries the session handle the
    /// command processor uses to route messages.
    pub session: Option<String>,
    /// Set on the tombstone synthesized when the underlying store object
    /// is missing, so reads of `This`/`Player` never fail outright.
    pub is_null_object: bool,
}

impl GameObject {
    /// Builds the tombstone object substituted when a referenced object id
    /// can't be resolved: a `GameObject` with a `_isNullObject` marker
    /// property and a `<missing object ID>` name.
    pub fn tombstone(id: ObjectId) -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "name".to_string(),
            crate::var::v_str(format!("<missing object {id}>")),
        );
        properties.insert("_isNullObject".to_string(), crate::var::v_bool(true));
        GameObject {
            id: id.clone(),
            dbref: -1,
            class_id: ObjectId::new("nothing"),
            owner: None,
            location: None,
            contents: Vec::new(),
            properties,
            permissions: HashSet::new(),
            session: None,
            is_null_object: true,
        }
    }

    pub fn has_permission(&self, p: Permission) -> bool {
        self.permissions.contains(&p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_alias_matching_is_case_insensitive() {
        let v = Verb {
            id: ObjectId::new("v1"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("look"),
            aliases: vec![Symbol::new("l"), Symbol::new("examine")],
            pattern: None,
            source: String::new(),
            active: true,
        };
        assert!(v.matches_name("LOOK"));
        assert!(v.matches_name("Examine"));
        assert!(v.matches_name("l"));
        assert!(!v.matches_name("take"));
    }

    #[test]
    fn tombstone_is_marked_and_named() {
        let t = GameObject::tombstone(ObjectId::new("missing-1"));
        assert!(t.is_null_object);
        assert_eq!(
            t.properties.get("_isNullObject").and_then(|v| v.as_bool()),
            Some(true)
        );
    }
}
