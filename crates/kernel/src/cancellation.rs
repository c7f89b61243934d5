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

//! The cooperative cancellation token scripts run under. There is no
//! preemptive interrupt of user code; the interpreter checks this flag at
//! its own yield points. Thread-local like [`crate::context`] and
//! [`crate::stack`]: the top-level invocation that spawns a call's
//! dedicated worker thread publishes a fresh token once; nested, reentrant
//! calls on that same thread share it, so a timeout aborts the whole call
//! tree rather than just its outermost frame.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

thread_local! {
    static CANCEL: RefCell<Option<Arc<AtomicBool>>> = const { RefCell::new(None) };
}

/// Publishes `flag` as this thread's cancellation token. Called once, by
/// the worker thread a top-level `ExecuteVerb`/`ExecuteFunction` spawns.
pub fn publish(flag: Arc<AtomicBool>) {
    CANCEL.with(|c| *c.borrow_mut() = Some(flag));
}

pub fn is_cancelled() -> bool {
    CANCEL.with(|c| {
        c.borrow()
            .as_ref()
            .map(|f| f.load(Ordering::Relaxed))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_token_means_not_cancelled() {
        assert!(!is_cancelled());
    }
}
