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

//! `ScriptEngine`: `execute_verb`/`execute_function`, the state machine
//! driving them (resolve, check, compile-or-reuse, execute, classify), and
//! the worker-thread/timeout model. A dedicated thread runs each top-level
//! invocation against a wall-clock budget; there is no resumable
//! bytecode loop or suspend/resume story here, just a single-shot
//! tree-walk that either finishes or is timed out.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use loom_compiler::{precompile_function, precompile_verb, CompilationCache, HostCompiler, Namespace};
use loom_values::{AccessModifier, EngineError, ErrorKind, Function, GameObject, ObjectId, Var, Verb};

use crate::cancellation;
use crate::context::{ContextGuard, ExecutionContext, GlobalsFlavor};
use crate::config::Config;
use crate::interpreter::{Interpreter, NestedCallHost};
use crate::resolver::Helpers;
use crate::stack::{self, FrameGuard, FrameKind, ScriptStackFrame};
use crate::store::{CommandProcessor, ObjectStore};

/// Extra slack added on top of [`Config::max_execution_time`] before the
/// worker thread's join is given up on.
const WATCHDOG_SLACK: Duration = Duration::from_millis(50);

/// Pairs a structured [`EngineError`] with the script-stack trace captured
/// before the failing frame unwound, in both a plain-text log form and a
/// marked-up user form.
#[derive(Debug)]
pub struct ScriptFailure {
    pub error: EngineError,
    pub log_trace: String,
    pub user_trace: String,
}

impl ScriptFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for ScriptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ScriptFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Builds a [`ScriptFailure`] by taking whatever trace [`stack::capture_trace_once`]
/// left behind in the *current* thread's TLS. Must be called on the same
/// thread that ran the failing invocation: for a nested call that's the
/// calling thread itself; for a top-level call that's the dedicated
/// worker thread, before it hands the result back across the channel.
fn build_failure(error: EngineError) -> ScriptFailure {
    let (log_trace, user_trace) = stack::take_pending_trace().unwrap_or_default();
    ScriptFailure {
        error,
        log_trace,
        user_trace,
    }
}

/// Resolves, checks, compiles-or-reuses, and runs verb and function bodies
/// against the bundled reference host language. Cheaply `Clone`, since
/// every field is an `Arc` -- a clone is moved into each top-level
/// invocation's dedicated worker thread.
#[derive(Clone)]
pub struct ScriptEngine {
    store: Arc<dyn ObjectStore>,
    compiler: Arc<dyn HostCompiler>,
    cache: Arc<CompilationCache>,
    config: Arc<Config>,
}

impl ScriptEngine {
    pub fn new(store: Arc<dyn ObjectStore>, compiler: Arc<dyn HostCompiler>, config: Config) -> Self {
        ScriptEngine {
            store,
            compiler,
            cache: Arc::new(CompilationCache::new()),
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn compiler(&self) -> &Arc<dyn HostCompiler> {
        &self.compiler
    }

    pub fn cache(&self) -> &CompilationCache {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `ExecuteVerb(verb, input, actor, commandProcessor, thisObjectId?,
    /// variables?)`. Top-level calls run on a dedicated worker thread
    /// under a wall-clock deadline; calls made while already inside an
    /// invocation (nested `CallVerb`/`CallFunction`) stay on the calling
    /// thread, sharing its cancellation token so a parent's timeout aborts
    /// the whole call tree.
    pub fn execute_verb(
        &self,
        verb: &Verb,
        input: &str,
        actor: &GameObject,
        command_processor: Arc<dyn CommandProcessor>,
        this_object_id: Option<ObjectId>,
        variables: Option<HashMap<String, String>>,
    ) -> Result<(bool, String), ScriptFailure> {
        if crate::context::current().is_some() {
            return self
                .execute_verb_inner(verb, input, actor, command_processor, this_object_id, variables)
                .map(classify_verb_result)
                .map_err(build_failure);
        }
        let engine = self.clone();
        let verb = verb.clone();
        let actor = actor.clone();
        let input = input.to_string();
        self.run_on_worker(move || {
            engine.execute_verb_inner(&verb, &input, &actor, command_processor, this_object_id, variables)
        })
        .map(classify_verb_result)
    }

    /// `ExecuteFunction(function, parameters, actor, commandProcessor?,
    /// thisObjectId?)`. Same worker/timeout model as [`Self::execute_verb`].
    pub fn execute_function(
        &self,
        function: &Function,
        parameters: Vec<Var>,
        actor: &GameObject,
        command_processor: Option<Arc<dyn CommandProcessor>>,
        this_object_id: Option<ObjectId>,
    ) -> Result<Var, ScriptFailure> {
        if crate::context::current().is_some() {
            return self
                .execute_function_inner(function, parameters, actor, command_processor, this_object_id)
                .map_err(build_failure);
        }
        let engine = self.clone();
        let function = function.clone();
        let actor = actor.clone();
        self.run_on_worker(move || {
            engine.execute_function_inner(&function, parameters, &actor, command_processor, this_object_id)
        })
    }

    /// Spawns a dedicated worker thread, publishes a fresh cancellation
    /// token for it, and waits up to `max_execution_time + WATCHDOG_SLACK`
    /// before declaring the call timed out. The worker thread is not
    /// forcibly killed on timeout -- only signalled -- since Rust has no
    /// safe mechanism to abort a running thread; a script that ignores
    /// cancellation checks (this interpreter never does) would keep the
    /// thread alive until it next checks.
    ///
    /// `f` runs entirely on the worker thread, so any failure is turned
    /// into a [`ScriptFailure`] there too: the script stack trace lives in
    /// thread-local storage, and [`stack::capture_trace_once`] (called
    /// from deep inside `f`) writes it to the worker thread's TLS, not the
    /// calling thread's. Reading it back only works from the same thread
    /// that wrote it.
    fn run_on_worker<T, F>(&self, f: F) -> Result<T, ScriptFailure>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let worker_flag = cancel_flag.clone();
        let max_time = self.config.max_execution_time();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name("loom-script-worker".to_string())
            .spawn(move || {
                cancellation::publish(worker_flag);
                let result = f().map_err(build_failure);
                let _ = tx.send(result);
            })
            .expect("failed to spawn script worker thread");

        match rx.recv_timeout(max_time + WATCHDOG_SLACK) {
            Ok(result) => {
                let _ = handle.join();
                result
            }
            Err(_) => {
                cancel_flag.store(true, Ordering::Relaxed);
                let _ = handle.join();
                Err(build_failure(EngineError::Timeout))
            }
        }
    }

    fn resolve_or_tombstone(&self, id: &ObjectId) -> GameObject {
        match self.store.get_object(id) {
            Some(obj) => obj,
            None => {
                tracing::warn!(object_id = %id, "referenced object not found; substituting a tombstone");
                GameObject::tombstone(id.clone())
            }
        }
    }

    fn execute_verb_inner(
        &self,
        verb: &Verb,
        input: &str,
        actor: &GameObject,
        command_processor: Arc<dyn CommandProcessor>,
        this_object_id: Option<ObjectId>,
        variables: Option<HashMap<String, String>>,
    ) -> Result<Var, EngineError> {
        let previous = crate::context::current();
        let call_depth = previous.as_ref().map(|p| p.call_depth + 1).unwrap_or(1);

        let this_id = this_object_id.unwrap_or_else(|| verb.owning_object_id.clone());
        let this_obj = self.resolve_or_tombstone(&this_id);
        let actor_obj = self.resolve_or_tombstone(&actor.id);

        let flavor = if this_obj.has_permission(loom_values::Permission::Admin) {
            GlobalsFlavor::Admin
        } else {
            GlobalsFlavor::User
        };
        let helpers = previous
            .as_ref()
            .map(|p| p.helpers.clone())
            .unwrap_or_else(|| Helpers::new(self.store.clone(), actor_obj.id.clone()));
        let caller = previous.as_ref().map(|p| p.this_obj.clone());
        let args = tokenize_args(input, verb.name.as_str());

        let ctx = ExecutionContext {
            flavor,
            player: actor_obj.clone(),
            this_obj: this_obj.clone(),
            caller,
            call_depth,
            command_processor,
            helpers,
            input: Some(input.to_string()),
            args,
            verb_name: Some(verb.name.as_str().to_string()),
            variables: variables.unwrap_or_default(),
            parameters: Vec::new(),
            named_parameters: HashMap::new(),
        };

        if call_depth > self.config.max_call_depth {
            return Err(EngineError::RecursionLimit);
        }

        let options = self.config.precompile_options();
        let unit_name = format!("{}:{}", object_label(&this_obj), verb.name);
        let source_hash = loom_compiler::precompiler::hash_source(&verb.source);
        let (unit, line_offset) = match self.cache.get(Namespace::Verb, verb.id.as_str(), &source_hash) {
            Some(hit) => hit,
            None => {
                let result = precompile_verb(
                    self.compiler.as_ref(),
                    &unit_name,
                    &verb.source,
                    verb.pattern.as_deref(),
                    None,
                    &options,
                );
                if !result.success {
                    return Err(EngineError::CompilationFailed(result.diagnostics));
                }
                (result.compiled_unit.expect("success implies a unit"), result.line_offset)
            }
        };

        let _ctx_guard = ContextGuard::enter(ctx);
        let frame = ScriptStackFrame::new(FrameKind::Verb, verb.name.as_str(), object_label(&this_obj), verb.source.clone());
        let _frame_guard = FrameGuard::push(frame);

        let active_ctx = crate::context::current().expect("just entered");
        let program = unit
            .as_any()
            .downcast_ref::<loom_compiler::host_lang::ast::HostProgram>()
            .expect("the bundled ReferenceHostCompiler always produces a HostProgram");

        let mut interpreter = Interpreter::new(&active_ctx, self, line_offset);
        match interpreter.run(program) {
            Ok(value) => {
                self.cache
                    .set(Namespace::Verb, verb.id.as_str(), unit.clone(), source_hash, line_offset);
                Ok(value)
            }
            Err(e) => {
                stack::capture_trace_once();
                Err(e)
            }
        }
    }

    fn execute_function_inner(
        &self,
        function: &Function,
        parameters: Vec<Var>,
        actor: &GameObject,
        command_processor: Option<Arc<dyn CommandProcessor>>,
        this_object_id: Option<ObjectId>,
    ) -> Result<Var, EngineError> {
        let previous = crate::context::current();
        let call_depth = previous.as_ref().map(|p| p.call_depth + 1).unwrap_or(1);

        let this_id = this_object_id.unwrap_or_else(|| function.owning_object_id.clone());
        let this_obj = self.store.get_object(&this_id).ok_or_else(|| {
            EngineError::ContextError(format!("'{this_id}' does not exist; ExecuteFunction requires thisObject"))
        })?;

        let actor_obj = self.resolve_or_tombstone(&actor.id);
        let caller_this = previous.as_ref().map(|p| p.this_obj.clone()).unwrap_or_else(|| actor_obj.clone());
        check_access(function, &this_obj, &caller_this)?;

        if parameters.len() != function.parameter_types.len() {
            return Err(EngineError::ArityMismatch {
                expected: function.parameter_types.len(),
                got: parameters.len(),
            });
        }
        for (i, (value, declared)) in parameters.iter().zip(function.parameter_types.iter()).enumerate() {
            if !type_matches(declared, value) {
                return Err(EngineError::TypeMismatch {
                    name: function.parameter_names.get(i).cloned().unwrap_or_else(|| format!("arg{i}")),
                    expected: declared.clone(),
                });
            }
        }

        let flavor = if this_obj.has_permission(loom_values::Permission::Admin) {
            GlobalsFlavor::Admin
        } else {
            GlobalsFlavor::User
        };
        let helpers = previous
            .as_ref()
            .map(|p| p.helpers.clone())
            .unwrap_or_else(|| Helpers::new(self.store.clone(), actor_obj.id.clone()));
        let caller = previous.as_ref().map(|p| p.this_obj.clone());
        let named_parameters: HashMap<String, Var> = function
            .parameter_names
            .iter()
            .cloned()
            .zip(parameters.iter().cloned())
            .collect();
        let command_processor = command_processor
            .or_else(|| previous.as_ref().map(|p| p.command_processor.clone()))
            .ok_or_else(|| EngineError::ContextError("no command processor available for this invocation".to_string()))?;

        let ctx = ExecutionContext {
            flavor,
            player: actor_obj,
            this_obj: this_obj.clone(),
            caller,
            call_depth,
            command_processor,
            helpers,
            input: None,
            args: Vec::new(),
            verb_name: None,
            variables: HashMap::new(),
            parameters: parameters.clone(),
            named_parameters,
        };

        if call_depth > self.config.max_call_depth {
            return Err(EngineError::RecursionLimit);
        }

        let options = self.config.precompile_options();
        let unit_name = format!("{}.{}", object_label(&this_obj), function.name);
        let source_hash = loom_compiler::precompiler::hash_source(&function.source);
        let (unit, line_offset) = match self.cache.get(Namespace::Function, function.id.as_str(), &source_hash) {
            Some(hit) => hit,
            None => {
                let result = precompile_function(
                    self.compiler.as_ref(),
                    &unit_name,
                    &function.source,
                    &function.parameter_names,
                    &function.parameter_types,
                    &options,
                );
                if !result.success {
                    return Err(EngineError::CompilationFailed(result.diagnostics));
                }
                (result.compiled_unit.expect("success implies a unit"), result.line_offset)
            }
        };

        let _ctx_guard = ContextGuard::enter(ctx);
        let frame = ScriptStackFrame::new(
            FrameKind::Function,
            function.name.as_str(),
            object_label(&this_obj),
            function.source.clone(),
        );
        let _frame_guard = FrameGuard::push(frame);

        let active_ctx = crate::context::current().expect("just entered");
        let program = unit
            .as_any()
            .downcast_ref::<loom_compiler::host_lang::ast::HostProgram>()
            .expect("the bundled ReferenceHostCompiler always produces a HostProgram");

        let mut interpreter = Interpreter::new(&active_ctx, self, line_offset);
        match interpreter.run(program) {
            Ok(value) => {
                self.cache.set(
                    Namespace::Function,
                    function.id.as_str(),
                    unit.clone(),
                    source_hash,
                    line_offset,
                );
                if !type_matches(&function.return_type, &value) {
                    tracing::warn!(
                        function = function.name.as_str(),
                        declared = function.return_type.as_str(),
                        "function returned a value not matching its declared return type"
                    );
                }
                Ok(value)
            }
            Err(e) => {
                stack::capture_trace_once();
                Err(e)
            }
        }
    }
}

impl NestedCallHost for ScriptEngine {
    fn call_verb(&self, target: &GameObject, name: &str, args: Vec<Var>) -> Result<Var, EngineError> {
        let helpers = Helpers::new(self.store.clone(), target.id.clone());
        let verb = helpers
            .find_verb(&target.id, name)
            .ok_or_else(|| EngineError::ResolutionFailed(format!("verb '{name}' on {}", object_label(target))))?;
        let ctx = crate::context::current()
            .ok_or_else(|| EngineError::ContextError("CallVerb requires an active invocation".to_string()))?;
        let input = std::iter::once(verb.name.as_str().to_string())
            .chain(args.iter().map(Var::to_display_string))
            .collect::<Vec<_>>()
            .join(" ");
        self.execute_verb_inner(
            &verb,
            &input,
            &ctx.player,
            ctx.command_processor.clone(),
            Some(target.id.clone()),
            None,
        )
    }

    fn call_function(&self, target: &GameObject, name: &str, args: Vec<Var>) -> Result<Var, EngineError> {
        let helpers = Helpers::new(self.store.clone(), target.id.clone());
        let function = helpers
            .find_function(&target.id, name)
            .ok_or_else(|| EngineError::ResolutionFailed(format!("function '{name}' on {}", object_label(target))))?;
        let ctx = crate::context::current()
            .ok_or_else(|| EngineError::ContextError("CallFunction requires an active invocation".to_string()))?;
        self.execute_function_inner(
            &function,
            args,
            &ctx.player,
            Some(ctx.command_processor.clone()),
            Some(target.id.clone()),
        )
    }
}

/// The access-modifier check, evaluated against the caller's `This` (the
/// actor itself, at the top level).
fn check_access(function: &Function, this_obj: &GameObject, caller_this: &GameObject) -> Result<(), EngineError> {
    match function.access {
        AccessModifier::Public => Ok(()),
        AccessModifier::Private => {
            if caller_this.id == this_obj.id {
                Ok(())
            } else {
                Err(EngineError::AccessDenied(format!(
                    "Function '{}' is private to {}",
                    function.name,
                    object_label(this_obj)
                )))
            }
        }
        AccessModifier::Protected => {
            if caller_this.class_id == this_obj.class_id {
                Ok(())
            } else {
                Err(EngineError::AccessDenied(format!(
                    "Function '{}' is protected on {}",
                    function.name,
                    object_label(this_obj)
                )))
            }
        }
        AccessModifier::Internal => match (&this_obj.owner, &caller_this.owner) {
            (Some(a), Some(b)) if a == b => Ok(()),
            _ => Err(EngineError::AccessDenied(format!(
                "Function '{}' is internal to {}",
                function.name,
                object_label(this_obj)
            ))),
        },
    }
}

/// Maps a declared parameter/return type name to whether `value` matches
/// it. A trailing `?` marks the type nullable; unknown type names accept
/// anything.
fn type_matches(declared: &str, value: &Var) -> bool {
    let (base, nullable) = match declared.strip_suffix('?') {
        Some(b) => (b, true),
        None => (declared, false),
    };
    if value.is_null() {
        return nullable;
    }
    match base.to_ascii_lowercase().as_str() {
        "string" => value.as_str().is_some(),
        "int" => value.as_int().is_some(),
        "bool" | "boolean" => value.as_bool().is_some(),
        "float" | "double" | "decimal" => value.as_float().is_some(),
        "player" | "gameobject" | "objectclass" | "object" => value.as_obj().is_some(),
        _ => true,
    }
}

/// Splits `input` on whitespace and drops the leading verb-name token to
/// derive the verb's `Args`.
fn tokenize_args(input: &str, verb_name: &str) -> Vec<String> {
    let mut tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.first().is_some_and(|first| first.eq_ignore_ascii_case(verb_name)) {
        tokens.remove(0);
    }
    tokens.into_iter().map(str::to_string).collect()
}

/// The name shown in unit names, stack frames, and access-denied messages:
/// an object's `name` property if it has one, otherwise its id.
fn object_label(obj: &GameObject) -> String {
    obj.properties
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| obj.id.to_string())
}

/// Convenience boolean/string classification of an `ExecuteVerb` result: a
/// `bool` return is the `success` flag with empty text; anything else
/// renders via `to_display_string()` as message text with `success = true`.
pub fn classify_verb_result(value: Var) -> (bool, String) {
    match value.as_bool() {
        Some(b) => (b, String::new()),
        None => (true, value.to_display_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_command_processor::MockCommandProcessor;
    use crate::testing::mock_store::MockObjectStore;
    use loom_compiler::ReferenceHostCompiler;
    use loom_values::{v_str, Symbol};
    use std::collections::HashSet;

    fn object(id: &str, dbref: i64, name: Option<&str>) -> GameObject {
        let mut obj = GameObject {
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
        };
        if let Some(name) = name {
            obj.properties.insert("name".to_string(), v_str(name));
        }
        obj
    }

    fn engine(store: MockObjectStore, config: Config) -> ScriptEngine {
        ScriptEngine::new(Arc::new(store), Arc::new(ReferenceHostCompiler::new()), config)
    }

    #[test]
    fn executes_a_simple_verb_and_classifies_bool_return() {
        let store = MockObjectStore::new();
        let room = object("r1", 1, Some("Room"));
        let mut player = object("p1", 2, Some("Ada"));
        player.session = Some("sess-x".to_string());
        player.location = Some(room.id.clone());
        store.put_object(room);
        store.put_object(player.clone());
        let verb = Verb {
            id: ObjectId::new("v-say"),
            owning_object_id: ObjectId::new("r1"),
            name: Symbol::new("say"),
            aliases: vec![],
            pattern: Some("say {text}".to_string()),
            source: r#"notify(Player, "You say: " + text); return true;"#.to_string(),
            active: true,
        };
        let engine = engine(store, Config::default());
        let cp = Arc::new(MockCommandProcessor::new());
        let mut variables = HashMap::new();
        variables.insert("text".to_string(), "hello world".to_string());

        let (success, text) = engine
            .execute_verb(&verb, "say hello world", &player, cp.clone(), None, Some(variables))
            .unwrap();
        assert!(success);
        assert_eq!(text, "");
        assert_eq!(
            cp.sent_messages(),
            vec![("You say: hello world".to_string(), Some("sess-x".to_string()))]
        );
    }

    #[test]
    fn private_function_rejects_an_unrelated_caller() {
        let store = MockObjectStore::new();
        let owner = object("o1", 1, Some("O1"));
        let actor = object("p1", 2, Some("Ada"));
        store.put_object(owner.clone());
        store.put_object(actor.clone());
        store.put_function(Function {
            id: ObjectId::new("f-secret"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("secret"),
            parameter_names: vec![],
            parameter_types: vec![],
            return_type: "string".to_string(),
            access: AccessModifier::Private,
            source: r#"return "s";"#.to_string(),
            active: true,
        });
        let engine = engine(store, Config::default());
        let function = Function {
            id: ObjectId::new("f-secret"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("secret"),
            parameter_names: vec![],
            parameter_types: vec![],
            return_type: "string".to_string(),
            access: AccessModifier::Private,
            source: r#"return "s";"#.to_string(),
            active: true,
        };
        let err = engine
            .execute_function(&function, vec![], &actor, None, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert_eq!(err.error.to_string(), "Function 'secret' is private to O1");
    }

    #[test]
    fn recursion_limit_stops_unbounded_self_calls() {
        let store = MockObjectStore::new();
        let owner = object("o1", 1, Some("O1"));
        let actor = object("p1", 2, Some("Ada"));
        store.put_object(owner.clone());
        store.put_object(actor.clone());
        let verb = Verb {
            id: ObjectId::new("v-loop"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("loop"),
            aliases: vec![],
            pattern: Some("loop".to_string()),
            source: r#"CallVerb("this", "loop"); return true;"#.to_string(),
            active: true,
        };
        store.put_verb(verb.clone());
        let mut config = Config::default();
        config.max_call_depth = 4;
        let engine = engine(store, config);
        let cp = Arc::new(MockCommandProcessor::new());
        let err = engine.execute_verb(&verb, "loop", &actor, cp, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecursionLimit);
    }

    #[test]
    fn timeout_aborts_an_infinite_loop_verb() {
        let store = MockObjectStore::new();
        let owner = object("o1", 1, Some("O1"));
        let actor = object("p1", 2, Some("Ada"));
        store.put_object(owner);
        store.put_object(actor.clone());
        let verb = Verb {
            id: ObjectId::new("v-spin"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("spin"),
            aliases: vec![],
            pattern: Some("spin".to_string()),
            source: "while (true) { var x = 1; }".to_string(),
            active: true,
        };
        let mut config = Config::default();
        config.max_execution_time_ms = 100;
        let engine = engine(store, config);
        let cp = Arc::new(MockCommandProcessor::new());
        let start = std::time::Instant::now();
        let err = engine.execute_verb(&verb, "spin", &actor, cp, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn cache_reuses_the_compiled_unit_across_different_inputs() {
        let store = MockObjectStore::new();
        let owner = object("o1", 1, Some("O1"));
        let mut actor = object("p1", 2, Some("Ada"));
        actor.session = Some("sess".to_string());
        store.put_object(owner);
        store.put_object(actor.clone());
        let verb = Verb {
            id: ObjectId::new("v-greet"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("greet"),
            aliases: vec![],
            pattern: Some("greet {name}".to_string()),
            source: r#"notify(Player, "Hi, " + name); return true;"#.to_string(),
            active: true,
        };
        let engine = engine(store, Config::default());
        let cp = Arc::new(MockCommandProcessor::new());

        let mut vars_a = HashMap::new();
        vars_a.insert("name".to_string(), "Ada".to_string());
        engine
            .execute_verb(&verb, "greet Ada", &actor, cp.clone(), None, Some(vars_a))
            .unwrap();
        assert_eq!(engine.cache().len(Namespace::Verb), 1);

        let mut vars_b = HashMap::new();
        vars_b.insert("name".to_string(), "Bob".to_string());
        engine
            .execute_verb(&verb, "greet Bob", &actor, cp.clone(), None, Some(vars_b))
            .unwrap();
        assert_eq!(engine.cache().len(Namespace::Verb), 1);

        assert_eq!(
            cp.sent_messages(),
            vec![
                ("Hi, Ada".to_string(), Some("sess".to_string())),
                ("Hi, Bob".to_string(), Some("sess".to_string())),
            ]
        );
    }

    #[test]
    fn failure_reports_a_headline_and_stack_trace_with_context() {
        let store = MockObjectStore::new();
        let owner = object("o1", 1, Some("O1"));
        let actor = object("p1", 2, Some("Ada"));
        store.put_object(owner);
        store.put_object(actor.clone());
        let verb = Verb {
            id: ObjectId::new("v-boom"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("boom"),
            aliases: vec![],
            pattern: Some("boom".to_string()),
            source: "var x = 1;\nthrow new Exception(\"no\");".to_string(),
            active: true,
        };
        let engine = engine(store, Config::default());
        let cp = Arc::new(MockCommandProcessor::new());
        let failure = engine.execute_verb(&verb, "boom", &actor, cp, None, None).unwrap_err();
        assert_eq!(failure.error.to_string(), "Exception: no");
        assert!(failure.user_trace.contains("at verb O1:boom (line 2)"));
        assert!(failure.log_trace.contains("verb O1:boom (line 2)"));
    }

    #[test]
    fn nested_access_denied_does_not_run_the_callees_user_code() {
        let store = MockObjectStore::new();
        let owner = object("o1", 1, Some("O1"));
        let caller_obj = object("o2", 2, Some("O2"));
        let actor = object("p1", 3, Some("Ada"));
        store.put_object(owner);
        store.put_object(caller_obj.clone());
        store.put_object(actor.clone());
        store.put_function(Function {
            id: ObjectId::new("f-secret"),
            owning_object_id: ObjectId::new("o1"),
            name: Symbol::new("secret"),
            parameter_names: vec![],
            parameter_types: vec![],
            return_type: "string".to_string(),
            access: AccessModifier::Private,
            source: "SetProperty(This, \"ran\", true); return \"s\";".to_string(),
            active: true,
        });
        let verb = Verb {
            id: ObjectId::new("v-try"),
            owning_object_id: ObjectId::new("o2"),
            name: Symbol::new("try"),
            aliases: vec![],
            pattern: Some("try".to_string()),
            source: r#"CallFunction("#1", "secret"); return true;"#.to_string(),
            active: true,
        };
        let engine = engine(store, Config::default());
        let cp = Arc::new(MockCommandProcessor::new());
        let failure = engine.execute_verb(&verb, "try", &actor, cp, None, None).unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::AccessDenied);
        assert!(engine
            .store()
            .get_property(&ObjectId::new("o1"), "ran")
            .is_none());
    }
}
