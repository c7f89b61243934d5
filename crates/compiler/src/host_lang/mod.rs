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

//! The pluggable host-language boundary.
//!
//! The precompiler (`crate::precompiler`) hands each unit's preprocessed
//! source to a `HostCompiler` and gets back diagnostics plus, on success,
//! an opaque `CompiledUnit` it can stash in the cache and the engine can
//! later execute. This crate ships exactly one `HostCompiler` —
//! [`ReferenceHostCompiler`] — built on a small bundled grammar. It exists
//! so the worked examples have something real to run end to end; it is
//! not a claim about what a production host language looks like. Swap it
//! out for your own `HostCompiler` binding a real toolchain.

pub mod ast;
mod parse;

use loom_values::{DiagnosticInfo, Severity};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A successfully parsed unit, handed back to callers as an opaque blob.
///
/// The engine downcasts this to whatever concrete type its paired
/// `HostCompiler` produces; the compiler crate itself never inspects it.
pub trait CompiledUnit: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

impl CompiledUnit for ast::HostProgram {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Result of compiling one preprocessed unit's source through a
/// `HostCompiler`.
#[derive(Debug, Clone)]
pub struct HostCompileOutcome {
    pub diagnostics: Vec<DiagnosticInfo>,
    pub unit: Option<Arc<dyn CompiledUnit>>,
}

impl HostCompileOutcome {
    pub fn is_success(&self) -> bool {
        self.unit.is_some()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// The seam a production deployment replaces to bind its own host
/// toolchain. Parsing and typechecking the host language is deliberately
/// not this core's own responsibility; this trait is the delegation
/// point.
pub trait HostCompiler: Send + Sync {
    /// Parse (and, if the implementation wants, typecheck) one
    /// preprocessed unit's source. `unit_name` is the verb or function
    /// name, used only for diagnostics and tracing spans.
    fn compile_unit(&self, unit_source: &str, unit_name: &str) -> HostCompileOutcome;
}

/// The bundled reference `HostCompiler`. Parses a small statement/
/// expression language: literals, typed `let` declarations, `??`,
/// string concatenation via `+`, `if`/`while`/`return`/`throw`, member
/// access, calls, and `new Identifier(args)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceHostCompiler;

impl ReferenceHostCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl HostCompiler for ReferenceHostCompiler {
    fn compile_unit(&self, unit_source: &str, unit_name: &str) -> HostCompileOutcome {
        match parse::parse_program(unit_source) {
            Ok(program) => HostCompileOutcome {
                diagnostics: Vec::new(),
                unit: Some(Arc::new(program)),
            },
            Err(err) => {
                tracing::debug!(unit_name, line = err.line, "host parse failed");
                HostCompileOutcome {
                    diagnostics: vec![DiagnosticInfo {
                        severity: Severity::Error,
                        error_code: "HOST0001".to_string(),
                        message: err.message,
                        line: err.line,
                        column: err.column,
                    }],
                    unit: None,
                }
            }
        }
    }
}
