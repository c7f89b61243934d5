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

use crate::object::ObjectId;
use arcstr::ArcStr;
use chrono::{DateTime, Utc};
use std::fmt::{Debug, Display, Formatter};

/// One store-tagged scalar or document value: null, bool, int, float,
/// string, timestamp, or an opaque document value, plus an object
/// reference so `GetProperty`/`SetProperty` can round-trip object-valued
/// properties.
#[derive(Clone, Debug, PartialEq)]
pub enum Variant {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(ArcStr),
    Timestamp(DateTime<Utc>),
    Document(serde_json::Value),
    Obj(ObjectId),
}

/// A value as seen by scripts and the property store. Wraps [`Variant`]
/// behind constructors so call sites read `v_int(1)` rather than matching
/// on the enum directly, mirroring how the store's tagged representation
/// is meant to be opaque to everything but `GetProperty`/`SetProperty`.
#[derive(Clone, PartialEq)]
pub struct Var(Variant);

impl Var {
    pub fn from_variant(variant: Variant) -> Self {
        Var(variant)
    }

    pub fn variant(&self) -> &Variant {
        &self.0
    }

    pub fn into_variant(self) -> Variant {
        self.0
    }

    pub fn is_null(&self) -> bool {
        matches!(self.0, Variant::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.0 {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.0 {
            Variant::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match &self.0 {
            Variant::Float(f) => Some(*f),
            Variant::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            Variant::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<&ObjectId> {
        match &self.0 {
            Variant::Obj(o) => Some(o),
            _ => None,
        }
    }

    /// Best-effort stringification used when a verb returns a non-boolean
    /// value: anything else becomes its display form, or an empty string.
    pub fn to_display_string(&self) -> String {
        match &self.0 {
            Variant::Null => String::new(),
            Variant::Bool(b) => b.to_string(),
            Variant::Int(i) => i.to_string(),
            Variant::Float(f) => f.to_string(),
            Variant::Str(s) => s.to_string(),
            Variant::Timestamp(t) => t.to_rfc3339(),
            Variant::Document(d) => d.to_string(),
            Variant::Obj(o) => o.to_string(),
        }
    }
}

impl Debug for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

pub fn v_none() -> Var {
    Var(Variant::Null)
}

pub fn v_bool(b: bool) -> Var {
    Var(Variant::Bool(b))
}

pub fn v_int(i: i64) -> Var {
    Var(Variant::Int(i))
}

pub fn v_float(f: f64) -> Var {
    Var(Variant::Float(f))
}

pub fn v_str(s: impl AsRef<str>) -> Var {
    Var(Variant::Str(ArcStr::from(s.as_ref())))
}

pub fn v_timestamp(t: DateTime<Utc>) -> Var {
    Var(Variant::Timestamp(t))
}

pub fn v_doc(d: serde_json::Value) -> Var {
    Var(Variant::Document(d))
}

pub fn v_obj(o: ObjectId) -> Var {
    Var(Variant::Obj(o))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalar_kinds() {
        assert_eq!(v_int(42).as_int(), Some(42));
        assert_eq!(v_bool(true).as_bool(), Some(true));
        assert_eq!(v_str("hi").as_str(), Some("hi"));
        assert!(v_none().is_null());
    }

    #[test]
    fn display_matches_to_string_contract() {
        assert_eq!(v_bool(true).to_display_string(), "true");
        assert_eq!(v_int(7).to_display_string(), "7");
        assert_eq!(v_none().to_display_string(), "");
    }
}
