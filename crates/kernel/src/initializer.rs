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

//! The startup warm-up pass: precompile every active verb and function up
//! front and seed the cache, so the first real invocation of each artifact
//! is never the one paying a cold compile. Walks everything once at boot,
//! logs failures, and never aborts the process over one bad artifact.

use std::time::{Duration, Instant};

use loom_compiler::{precompile_function, precompile_verb, Namespace};

use crate::engine::ScriptEngine;

/// Tally from one [`warm_up`] pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WarmupReport {
    pub verbs_compiled: usize,
    pub verbs_failed: usize,
    pub functions_compiled: usize,
    pub functions_failed: usize,
    pub elapsed: Duration,
}

impl WarmupReport {
    pub fn total_compiled(&self) -> usize {
        self.verbs_compiled + self.functions_compiled
    }

    pub fn total_failed(&self) -> usize {
        self.verbs_failed + self.functions_failed
    }
}

/// Precompiles every active verb and function known to `engine`'s store
/// and seeds the cache with the results. A single artifact's compile
/// failure is logged and skipped, not fatal to the pass. Inactive
/// artifacts are skipped entirely -- nothing would ever execute them.
pub fn warm_up(engine: &ScriptEngine) -> WarmupReport {
    let span = tracing::info_span!("compilation_warmup");
    let _enter = span.enter();
    let start = Instant::now();
    let options = engine.config().precompile_options();
    let mut report = WarmupReport::default();

    for verb in engine.store().get_all_verbs() {
        if !verb.active {
            continue;
        }
        let unit_name = format!("{}:{}", verb.owning_object_id, verb.name);
        let result = precompile_verb(
            engine.compiler().as_ref(),
            &unit_name,
            &verb.source,
            verb.pattern.as_deref(),
            None,
            &options,
        );
        if result.success {
            let unit = result.compiled_unit.expect("success implies a unit");
            engine
                .cache()
                .set(Namespace::Verb, verb.id.as_str(), unit, result.source_hash, result.line_offset);
            report.verbs_compiled += 1;
        } else {
            tracing::warn!(
                unit = unit_name.as_str(),
                diagnostics = ?result.diagnostics,
                "verb failed to precompile during warm-up"
            );
            report.verbs_failed += 1;
        }
        std::thread::yield_now();
    }

    for function in engine.store().get_all_functions() {
        if !function.active {
            continue;
        }
        let unit_name = format!("{}.{}", function.owning_object_id, function.name);
        let result = precompile_function(
            engine.compiler().as_ref(),
            &unit_name,
            &function.source,
            &function.parameter_names,
            &function.parameter_types,
            &options,
        );
        if result.success {
            let unit = result.compiled_unit.expect("success implies a unit");
            engine.cache().set(
                Namespace::Function,
                function.id.as_str(),
                unit,
                result.source_hash,
                result.line_offset,
            );
            report.functions_compiled += 1;
        } else {
            tracing::warn!(
                unit = unit_name.as_str(),
                diagnostics = ?result.diagnostics,
                "function failed to precompile during warm-up"
            );
            report.functions_failed += 1;
        }
        std::thread::yield_now();
    }

    report.elapsed = start.elapsed();
    tracing::info!(
        verbs_compiled = report.verbs_compiled,
        verbs_failed = report.verbs_failed,
        functions_compiled = report.functions_compiled,
        functions_failed = report.functions_failed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "compilation warm-up complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::mock_store::MockObjectStore;
    use loom_compiler::ReferenceHostCompiler;
    use loom_values::{AccessModifier, Function, ObjectId, Symbol, Verb};
    use std::sync::Arc;

    fn engine(store: MockObjectStore) -> ScriptEngine {
        ScriptEngine::new(Arc::new(store), Arc::new(ReferenceHostCompiler::new()), Config::default())
    }

    #[test]
    fn compiles_every_active_verb_and_function_and_seeds_the_cache() {
        let store = MockObjectStore::new();
        store.put_verb(Verb {
            id: ObjectId::new("v1"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("look"),
            aliases: vec![],
            pattern: None,
            source: "return true;".to_string(),
            active: true,
        });
        store.put_function(Function {
            id: ObjectId::new("f1"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("helper"),
            parameter_names: vec![],
            parameter_types: vec![],
            return_type: "string".to_string(),
            access: AccessModifier::Public,
            source: r#"return "ok";"#.to_string(),
            active: true,
        });
        let engine = engine(store);
        let report = warm_up(&engine);
        assert_eq!(report.verbs_compiled, 1);
        assert_eq!(report.functions_compiled, 1);
        assert_eq!(report.total_failed(), 0);
        assert_eq!(engine.cache().len(Namespace::Verb), 1);
        assert_eq!(engine.cache().len(Namespace::Function), 1);
    }

    #[test]
    fn skips_inactive_artifacts_entirely() {
        let store = MockObjectStore::new();
        store.put_verb(Verb {
            id: ObjectId::new("v-dead"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("old"),
            aliases: vec![],
            pattern: None,
            source: "return true;".to_string(),
            active: false,
        });
        let engine = engine(store);
        let report = warm_up(&engine);
        assert_eq!(report.verbs_compiled, 0);
        assert_eq!(report.verbs_failed, 0);
        assert!(engine.cache().is_empty(Namespace::Verb));
    }

    #[test]
    fn a_failing_artifact_is_counted_but_does_not_abort_the_pass() {
        let store = MockObjectStore::new();
        store.put_verb(Verb {
            id: ObjectId::new("v-bad"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("broken"),
            aliases: vec![],
            pattern: None,
            source: "return x +;".to_string(),
            active: true,
        });
        store.put_verb(Verb {
            id: ObjectId::new("v-good"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("fine"),
            aliases: vec![],
            pattern: None,
            source: "return true;".to_string(),
            active: true,
        });
        let engine = engine(store);
        let report = warm_up(&engine);
        assert_eq!(report.verbs_compiled, 1);
        assert_eq!(report.verbs_failed, 1);
    }
}
