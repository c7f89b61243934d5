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

//! The per-thread script call stack: pushed on invocation, popped in the
//! invocation's cleanup regardless of outcome, strictly thread-local so no
//! synchronization is needed. A scoped RAII guard drives push/pop, with a
//! real stack rather than a single slot since nested calls keep more than
//! one frame live at once.

use std::cell::RefCell;

/// Whether a frame belongs to a verb or a function invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameKind {
    Verb,
    Function,
}

/// One frame of the per-thread script stack.
#[derive(Clone, Debug)]
pub struct ScriptStackFrame {
    pub kind: FrameKind,
    pub name: String,
    pub owning_object_name: String,
    pub line_number: usize,
    /// The original (un-preprocessed, un-prologued) user source, kept so
    /// a failure can show a context window around the failing line.
    pub source: String,
    pub error_context: Option<String>,
}

impl ScriptStackFrame {
    pub fn new(kind: FrameKind, name: impl Into<String>, owning_object_name: impl Into<String>, source: impl Into<String>) -> Self {
        ScriptStackFrame {
            kind,
            name: name.into(),
            owning_object_name: owning_object_name.into(),
            line_number: 0,
            source: source.into(),
            error_context: None,
        }
    }

    /// Records a failure's line number and computes a small surrounding
    /// window of the user source for readable error context.
    pub fn record_failure(&mut self, line: usize) {
        self.line_number = line;
        self.error_context = Some(render_context_window(&self.source, line));
    }

    fn separator(&self) -> char {
        match self.kind {
            FrameKind::Function => '.',
            FrameKind::Verb => ':',
        }
    }

    /// `kind object-name . name (line N)` for functions, `kind
    /// object-name : name (line N)` for verbs.
    pub fn format_line(&self) -> String {
        let kind = match self.kind {
            FrameKind::Verb => "verb",
            FrameKind::Function => "function",
        };
        format!(
            "{kind} {}{}{} (line {})",
            self.owning_object_name,
            self.separator(),
            self.name,
            self.line_number
        )
    }
}

/// A small window of source centered on `line` (1-indexed), with the
/// failing line marked `>>> N: ...`.
fn render_context_window(source: &str, line: usize) -> String {
    if line == 0 {
        return String::new();
    }
    let lines: Vec<&str> = source.lines().collect();
    if line > lines.len() {
        return String::new();
    }
    let idx = line - 1;
    let start = idx.saturating_sub(2);
    let end = (idx + 3).min(lines.len());
    let mut out = String::new();
    for (i, text) in lines[start..end].iter().enumerate() {
        let line_no = start + i + 1;
        if line_no == line {
            out.push_str(&format!(">>> {line_no}: {text}\n"));
        } else {
            out.push_str(&format!("    {line_no}: {text}\n"));
        }
    }
    out
}

/// At most this many frames are shown, innermost first.
const MAX_DISPLAYED_FRAMES: usize = 4;

thread_local! {
    static STACK: RefCell<Vec<ScriptStackFrame>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard pushing a frame on construction and popping it on drop,
/// guaranteeing the stack depth is restored regardless of how the
/// invocation returns -- a thrown error unwinds through the guard's
/// `Drop` the same as a normal return.
pub struct FrameGuard;

impl FrameGuard {
    pub fn push(frame: ScriptStackFrame) -> Self {
        STACK.with(|s| s.borrow_mut().push(frame));
        FrameGuard
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        STACK.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// Mutates the innermost (most recently pushed) frame, used to record a
/// failure's line/context before the error propagates out.
pub fn update_top(f: impl FnOnce(&mut ScriptStackFrame)) {
    STACK.with(|s| {
        if let Some(top) = s.borrow_mut().last_mut() {
            f(top);
        }
    });
}

pub fn depth() -> usize {
    STACK.with(|s| s.borrow().len())
}

/// Innermost-first snapshot of the current thread's stack, capped at
/// [`MAX_DISPLAYED_FRAMES`].
pub fn snapshot() -> Vec<ScriptStackFrame> {
    STACK.with(|s| {
        s.borrow()
            .iter()
            .rev()
            .take(MAX_DISPLAYED_FRAMES)
            .cloned()
            .collect()
    })
}

/// Plain-text form for logs: one frame per line, no markup.
pub fn format_log(frames: &[ScriptStackFrame]) -> String {
    frames
        .iter()
        .map(ScriptStackFrame::format_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Marked-up form for end-user display: `at <frame>` per line.
pub fn format_user(frames: &[ScriptStackFrame]) -> String {
    frames
        .iter()
        .map(|f| format!("at {}", f.format_line()))
        .collect::<Vec<_>>()
        .join("\n")
}

thread_local! {
    static PENDING_TRACE: RefCell<Option<(String, String)>> = const { RefCell::new(None) };
}

/// Snapshots the current (still-unwound) stack into `(log, user)` rendered
/// traces, but only the first time this is called on the thread. The
/// engine calls this right where an invocation observes its own
/// `interpreter.run()` failing -- the innermost failing level, at which
/// point every ancestor frame is still pushed. Later, outer levels seeing
/// the same error propagate past this call without overwriting it.
pub fn capture_trace_once() {
    PENDING_TRACE.with(|p| {
        let mut p = p.borrow_mut();
        if p.is_none() {
            let frames = snapshot();
            *p = Some((format_log(&frames), format_user(&frames)));
        }
    });
}

/// Takes (clears) the pending trace captured by [`capture_trace_once`], if
/// any was captured on this thread.
pub fn take_pending_trace() -> Option<(String, String)> {
    PENDING_TRACE.with(|p| p.borrow_mut().take())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop_restore_depth() {
        assert_eq!(depth(), 0);
        {
            let _g = FrameGuard::push(ScriptStackFrame::new(FrameKind::Verb, "look", "R1", ""));
            assert_eq!(depth(), 1);
        }
        assert_eq!(depth(), 0);
    }

    #[test]
    fn depth_restored_even_when_frame_updated() {
        let before = depth();
        {
            let _g = FrameGuard::push(ScriptStackFrame::new(FrameKind::Verb, "boom", "O1", "x"));
            update_top(|f| f.record_failure(1));
        }
        assert_eq!(depth(), before);
    }

    #[test]
    fn formats_verb_frame_with_colon_separator() {
        let mut f = ScriptStackFrame::new(FrameKind::Verb, "boom", "O1", "var x = 1;\nthrow new Exception(\"no\");");
        f.record_failure(2);
        assert_eq!(f.format_line(), "verb O1:boom (line 2)");
    }

    #[test]
    fn formats_function_frame_with_dot_separator() {
        let f = ScriptStackFrame::new(FrameKind::Function, "secret", "O1", "");
        assert_eq!(f.format_line(), "function O1.secret (line 0)");
    }

    #[test]
    fn context_window_centers_on_failing_line_with_marker() {
        let mut f = ScriptStackFrame::new(FrameKind::Verb, "boom", "O1", "var x = 1;\nthrow new Exception(\"no\");");
        f.record_failure(2);
        let window = f.error_context.unwrap();
        assert!(window.contains(">>> 2: throw"));
        assert!(window.contains("    1: var x"));
    }

    #[test]
    fn capture_trace_once_only_captures_the_first_call() {
        let _g = FrameGuard::push(ScriptStackFrame::new(FrameKind::Verb, "a", "O", "x;"));
        capture_trace_once();
        {
            let _g2 = FrameGuard::push(ScriptStackFrame::new(FrameKind::Verb, "b", "O", "y;"));
            // A second call while a deeper frame is active must not
            // overwrite the first capture.
            capture_trace_once();
        }
        let (log, _user) = take_pending_trace().unwrap();
        assert!(log.contains("verb O:a"));
        assert!(take_pending_trace().is_none());
    }

    #[test]
    fn snapshot_caps_at_four_frames_innermost_first() {
        let _g1 = FrameGuard::push(ScriptStackFrame::new(FrameKind::Verb, "a", "O", ""));
        let _g2 = FrameGuard::push(ScriptStackFrame::new(FrameKind::Verb, "b", "O", ""));
        let _g3 = FrameGuard::push(ScriptStackFrame::new(FrameKind::Verb, "c", "O", ""));
        let _g4 = FrameGuard::push(ScriptStackFrame::new(FrameKind::Verb, "d", "O", ""));
        let _g5 = FrameGuard::push(ScriptStackFrame::new(FrameKind::Verb, "e", "O", ""));
        let snap = snapshot();
        assert_eq!(snap.len(), 4);
        assert_eq!(snap[0].name, "e");
    }
}
