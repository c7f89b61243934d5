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

use crate::diagnostics::DiagnosticInfo;
use thiserror::Error;

/// A small stable code for an [`EngineError`], usable without matching the
/// full error for callers that just need to branch on error category.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    CompilationFailed,
    ResolutionFailed,
    AccessDenied,
    ArityMismatch,
    TypeMismatch,
    Timeout,
    RecursionLimit,
    ScriptRuntime,
    ContextError,
}

/// The engine's error taxonomy. All variants are raised synchronously from
/// the engine; nested frames wrap host exceptions in `ScriptRuntime`
/// exactly once, at the lowest layer that sees them.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("compilation failed: {} diagnostic(s)", .0.len())]
    CompilationFailed(Vec<DiagnosticInfo>),

    #[error("could not resolve '{0}'")]
    ResolutionFailed(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("expected {expected} argument(s), got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("parameter '{name}' expected type '{expected}'")]
    TypeMismatch { name: String, expected: String },

    #[error("execution exceeded the time limit")]
    Timeout,

    #[error("call depth exceeded the configured maximum")]
    RecursionLimit,

    #[error("{headline}")]
    ScriptRuntime {
        headline: String,
        #[source]
        cause: Option<Box<EngineError>>,
    },

    #[error("{0}")]
    ContextError(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::CompilationFailed(_) => ErrorKind::CompilationFailed,
            EngineError::ResolutionFailed(_) => ErrorKind::ResolutionFailed,
            EngineError::AccessDenied(_) => ErrorKind::AccessDenied,
            EngineError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            EngineError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            EngineError::Timeout => ErrorKind::Timeout,
            EngineError::RecursionLimit => ErrorKind::RecursionLimit,
            EngineError::ScriptRuntime { .. } => ErrorKind::ScriptRuntime,
            EngineError::ContextError(_) => ErrorKind::ContextError,
        }
    }

    /// Wraps a root-cause error in `ScriptRuntime` exactly once; calling
    /// this on an already-wrapped error returns it unchanged so outer
    /// frames can re-throw without double-wrapping.
    pub fn wrap_script_runtime(self) -> Self {
        if matches!(self, EngineError::ScriptRuntime { .. }) {
            return self;
        }
        let headline = self.to_string();
        EngineError::ScriptRuntime {
            headline,
            cause: Some(Box::new(self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_idempotent() {
        let e = EngineError::Timeout.wrap_script_runtime();
        assert!(matches!(e, EngineError::ScriptRuntime { .. }));
        let wrapped_again = e.wrap_script_runtime();
        assert_eq!(wrapped_again.kind(), ErrorKind::ScriptRuntime);
        match wrapped_again {
            EngineError::ScriptRuntime { cause, .. } => {
                assert!(matches!(cause.as_deref(), Some(EngineError::Timeout)))
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn kind_matches_taxonomy() {
        assert_eq!(EngineError::RecursionLimit.kind(), ErrorKind::RecursionLimit);
        assert_eq!(
            EngineError::ArityMismatch { expected: 1, got: 2 }.kind(),
            ErrorKind::ArityMismatch
        );
    }
}
