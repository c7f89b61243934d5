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

//! Source preprocessing, compilation, and caching for the scripting core.
//!
//! Pipeline: [`preprocessor::preprocess`] rewrites friendly dbref/id/method
//! syntax, [`precompiler`] wraps the result in a prologue and hands it to a
//! [`host_lang::HostCompiler`], and [`cache::CompilationCache`] keeps the
//! resulting [`host_lang::CompiledUnit`]s around keyed by content hash.
//! `loom-kernel` is the only consumer; this crate knows nothing about
//! execution.

extern crate pest_derive;

pub mod cache;
pub mod host_lang;
pub mod precompiler;
pub mod preprocessor;

pub use cache::{CompilationCache, Namespace};
pub use host_lang::{CompiledUnit, HostCompileOutcome, HostCompiler, ReferenceHostCompiler};
pub use precompiler::{precompile_function, precompile_verb, CompilationResult, PrecompileOptions};
pub use preprocessor::preprocess;
