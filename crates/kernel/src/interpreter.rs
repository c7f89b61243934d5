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

//! Executes a [`loom_compiler::host_lang::ast::HostProgram`] against an
//! [`ExecutionContext`], dispatching the Globals/Builtins surface scripts
//! see. Rather than a dynamic-typed host runtime, the reference
//! `HostCompiler`'s program is walked directly against a narrow,
//! explicitly-typed game-object surface (here, [`GameObject`] plus the
//! `ObjectStore` trait) -- a plain tree-walking interpreter over the
//! bundled AST.

use std::collections::HashMap;

use loom_compiler::host_lang::ast::{BinaryOp, Expr, HostProgram, Literal, Stmt, UnaryOp};
use loom_values::{
    v_bool, v_doc, v_float, v_int, v_none, v_obj, v_str, EngineError, GameObject, ObjectId, Var, Variant,
};

use crate::cancellation;
use crate::context::ExecutionContext;
use crate::stack;

/// Callback surface the interpreter uses for nested invocations
/// (`CallVerb`/`CallFunction`/`CallFunctionOnObject`).
/// [`crate::engine::ScriptEngine`] implements this; kept as a trait here
/// so `interpreter` doesn't need to depend on `engine`'s concrete type
/// (the dependency would otherwise be circular, since `engine` drives the
/// interpreter).
pub trait NestedCallHost {
    fn call_verb(&self, target: &GameObject, name: &str, args: Vec<Var>) -> Result<Var, EngineError>;
    fn call_function(&self, target: &GameObject, name: &str, args: Vec<Var>) -> Result<Var, EngineError>;
}

enum Flow {
    Normal,
    Return(Var),
}

/// Scans `source` for the first line containing a `throw` keyword or a
/// dot-call expression, as a last-resort line-recovery tier. Used
/// only when a runtime fault carries no precise line (this reference
/// interpreter normally does, via the AST's own line numbers, but the
/// heuristic is kept -- and tested -- as the fallback a `HostCompiler`
/// binding without structured debug info would need).
pub fn heuristic_line(source: &str) -> usize {
    for (idx, line) in source.lines().enumerate() {
        if line.contains("throw") || DOT_CALL_RE.is_match(line) {
            return idx + 1;
        }
    }
    0
}

static DOT_CALL_RE: once_cell::sync::Lazy<regex::Regex> =
    once_cell::sync::Lazy::new(|| regex::Regex::new(r"\.[A-Za-z_][A-Za-z0-9_]*\s*\(").unwrap());

pub struct Interpreter<'a> {
    ctx: &'a ExecutionContext,
    env: HashMap<String, Var>,
    host: &'a dyn NestedCallHost,
    /// Number of prologue lines prepended before this unit's user source;
    /// subtracted from AST line numbers so a runtime failure's reported
    /// line matches the user's own source, exactly as
    /// `precompiler::map_diagnostics` does for compile-time diagnostics.
    line_offset: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(ctx: &'a ExecutionContext, host: &'a dyn NestedCallHost, line_offset: usize) -> Self {
        Interpreter {
            ctx,
            env: HashMap::new(),
            host,
            line_offset,
        }
    }

    fn user_line(&self, raw_line: usize) -> usize {
        raw_line.saturating_sub(self.line_offset)
    }

    /// Runs `program` to completion. Classifying the return into a
    /// verb's `(success, text)` shape is the caller's job (engine); this
    /// returns the raw [`Var`] the program produced (or `Var::Null` if it
    /// fell off the end without an explicit `return`).
    pub fn run(&mut self, program: &HostProgram) -> Result<Var, EngineError> {
        match self.exec_block(&program.statements)? {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(v_none()),
        }
    }

    fn check_cancelled(&self) -> Result<(), EngineError> {
        if cancellation::is_cancelled() {
            return Err(EngineError::Timeout);
        }
        Ok(())
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, EngineError> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => continue,
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, EngineError> {
        self.check_cancelled()?;
        match stmt {
            Stmt::Let { name, value, .. } => {
                let v = self.eval(value).map_err(|e| self.at_stmt(stmt, e))?;
                self.env.insert(name.clone(), v);
                Ok(Flow::Normal)
            }
            Stmt::Assign { target, value, .. } => {
                let v = self.eval(value).map_err(|e| self.at_stmt(stmt, e))?;
                self.assign(target, v).map_err(|e| self.at_stmt(stmt, e))?;
                Ok(Flow::Normal)
            }
            Stmt::ExprStmt(expr, _) => {
                self.eval(expr).map_err(|e| self.at_stmt(stmt, e))?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let cond_val = self.eval(cond).map_err(|e| self.at_stmt(stmt, e))?;
                if truthy(&cond_val) {
                    self.exec_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body, .. } => {
                loop {
                    self.check_cancelled()?;
                    let cond_val = self.eval(cond).map_err(|e| self.at_stmt(stmt, e))?;
                    if !truthy(&cond_val) {
                        break;
                    }
                    match self.exec_stmt(body)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => self.eval(e).map_err(|e| self.at_stmt(stmt, e))?,
                    None => v_none(),
                };
                Ok(Flow::Return(v))
            }
            Stmt::Throw { value, .. } => Err(self.throw_error(value)),
            Stmt::Block(stmts) => self.exec_block(stmts),
        }
    }

    fn at_stmt(&self, stmt: &Stmt, err: EngineError) -> EngineError {
        let line = self.user_line(stmt.line().unwrap_or(0));
        stack::update_top(|f| f.record_failure(line));
        // These kinds are raised by the engine's own gating (resolution,
        // abort, access control), not by a user-code fault. Timeouts and
        // recursion limits bypass user catch paths since they're enforced
        // by the engine rather than user code, and the same reasoning
        // extends to access-denied and resolution-failed, so none of the
        // four get reclassified as a generic script fault on their way out.
        if matches!(
            err,
            EngineError::ResolutionFailed(_)
                | EngineError::Timeout
                | EngineError::RecursionLimit
                | EngineError::AccessDenied(_)
        ) {
            return err;
        }
        err.wrap_script_runtime()
    }

    /// Builds the error for a `throw` statement. `throw new Exception(msg)`
    /// produces the literal `"Exception: {msg}"` headline; `throw new
    /// ResolutionError(msg)` (emitted by the precompiler's auto-resolve
    /// prologue) maps to `RESOLUTION_FAILED` rather than a generic script
    /// fault.
    fn throw_error(&mut self, value: &Expr) -> EngineError {
        let (type_name, msg, line) = match value {
            Expr::New { type_name, args, line } => {
                let msg = match args.first() {
                    Some(e) => self
                        .eval(e)
                        .map(|v| v.to_display_string())
                        .unwrap_or_else(|err| err.to_string()),
                    None => String::new(),
                };
                (type_name.clone(), msg, *line)
            }
            other => {
                let v = self.eval(other).unwrap_or_else(|e| v_str(e.to_string()));
                ("Exception".to_string(), v.to_display_string(), 0)
            }
        };
        if type_name == "ResolutionError" {
            // Auto-resolve prologue failures live in the injected prologue
            // lines, not the user's own source, so no meaningful context
            // window can be rendered for them.
            return EngineError::ResolutionFailed(msg);
        }
        stack::update_top(|f| f.record_failure(self.user_line(line)));
        EngineError::ScriptRuntime {
            headline: format!("{type_name}: {msg}"),
            cause: None,
        }
    }

    fn assign(&mut self, target: &Expr, value: Var) -> Result<(), EngineError> {
        match target {
            Expr::Ident(name) => {
                self.env.insert(name.clone(), value);
                Ok(())
            }
            Expr::Member { target, name, .. } => {
                let obj_val = self.eval(target)?;
                let obj = self.require_object(&obj_val)?;
                self.ctx
                    .helpers
                    .store()
                    .set_property(&obj.id, name, value)
                    .map_err(|e| EngineError::ContextError(e.to_string()))
            }
            other => Err(EngineError::ContextError(format!(
                "cannot assign to expression {other:?}"
            ))),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Var, EngineError> {
        self.check_cancelled()?;
        match expr {
            Expr::Literal(lit) => Ok(literal_to_var(lit)),
            Expr::Ident(name) => self.eval_ident(name),
            Expr::New { type_name, args, .. } => {
                // `new` outside a `throw` only makes sense for container
                // literals in the full host language; the bundled
                // reference language only gives `new` exception-constructor
                // meaning (see `throw_error`).
                let _ = args;
                Err(EngineError::ContextError(format!(
                    "'new {type_name}' is only meaningful in a throw statement"
                )))
            }
            Expr::Unary { op, expr } => {
                let v = self.eval(expr)?;
                Ok(apply_unary(*op, &v))
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
            Expr::Coalesce { lhs, rhs } => {
                let l = self.eval(lhs)?;
                if l.is_null() {
                    self.eval(rhs)
                } else {
                    Ok(l)
                }
            }
            Expr::Member { .. } => self.eval_member(expr),
            Expr::Call { target, args, .. } => self.eval_call(target, args),
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Var, EngineError> {
        if op == BinaryOp::And {
            let l = self.eval(lhs)?;
            if !truthy(&l) {
                return Ok(v_bool(false));
            }
            let r = self.eval(rhs)?;
            return Ok(v_bool(truthy(&r)));
        }
        if op == BinaryOp::Or {
            let l = self.eval(lhs)?;
            if truthy(&l) {
                return Ok(v_bool(true));
            }
            let r = self.eval(rhs)?;
            return Ok(v_bool(truthy(&r)));
        }

        let l = self.eval(lhs)?;
        let r = self.eval(rhs)?;
        apply_binary(op, &l, &r)
    }

    fn eval_ident(&self, name: &str) -> Result<Var, EngineError> {
        if let Some(v) = self.env.get(name) {
            return Ok(v.clone());
        }
        match name {
            "Player" | "ThisPlayer" | "CallerPlayer" | "player" | "me" => Ok(v_obj(self.ctx.player.id.clone())),
            "This" | "ThisGameObject" | "ThisObject" | "ThisRoom" | "ThisExit" => {
                Ok(v_obj(self.ctx.this_obj.id.clone()))
            }
            "Caller" | "CallerGameObject" => Ok(v_obj(self.ctx.caller_or_player().id.clone())),
            "Location" | "here" => Ok(self
                .ctx
                .location()
                .map(|o| v_obj(o.id))
                .unwrap_or_else(v_none)),
            "Input" => Ok(v_str(self.ctx.input.clone().unwrap_or_default())),
            "Verb" => Ok(v_str(self.ctx.verb_name.clone().unwrap_or_default())),
            "Args" => {
                let arr: Vec<serde_json::Value> =
                    self.ctx.args.iter().map(|a| serde_json::Value::String(a.clone())).collect();
                Ok(v_doc(serde_json::Value::Array(arr)))
            }
            "Parameters" => {
                let arr: Vec<serde_json::Value> = self
                    .ctx
                    .parameters
                    .iter()
                    .map(|p| serde_json::Value::String(p.to_display_string()))
                    .collect();
                Ok(v_doc(serde_json::Value::Array(arr)))
            }
            "true" => Ok(v_bool(true)),
            "false" => Ok(v_bool(false)),
            "null" => Ok(v_none()),
            other => Err(EngineError::ContextError(format!("undefined variable '{other}'"))),
        }
    }

    fn eval_member(&mut self, expr: &Expr) -> Result<Var, EngineError> {
        let Expr::Member { target, name, .. } = expr else {
            unreachable!("eval_member called on non-Member expr")
        };

        // Namespace dispatch: `Variables.TryGet` and similar are resolved
        // one level up, in `eval_call`, because they're always called.
        // A bare member access (no call) on `Variables`/`Parameters` isn't
        // part of this reference language's supported surface.
        if let Expr::Ident(base) = target.as_ref() {
            if base == "Variables" || base == "ObjectResolver" {
                return Err(EngineError::ContextError(format!(
                    "'{base}.{name}' must be called, not read as a value"
                )));
            }
        }

        let target_val = self.eval(target)?;
        let obj = self.require_object(&target_val)?;
        match name.as_str() {
            "id" => Ok(v_str(obj.id.to_string())),
            "dbref" => Ok(v_int(obj.dbref)),
            "location" => Ok(obj
                .location
                .map(|loc| v_obj(loc))
                .unwrap_or_else(v_none)),
            other => Ok(self
                .ctx
                .helpers
                .store()
                .get_property(&obj.id, other)
                .unwrap_or_else(v_none)),
        }
    }

    fn eval_call(&mut self, target: &Expr, args: &[Expr]) -> Result<Var, EngineError> {
        match target {
            Expr::Ident(name) => self.eval_plain_call(name, args),
            Expr::Member { target: inner, name, .. } => {
                if let Expr::Ident(base) = inner.as_ref() {
                    if base == "Variables" {
                        return self.eval_variables_call(name, args);
                    }
                    if base == "ObjectResolver" {
                        return self.eval_resolver_call(name, args);
                    }
                }
                // Method call on an already-resolved object value, e.g. a
                // rewrite target the preprocessor didn't recognize, or one
                // produced by a nested `GetObjectByDbRef(n).Method(...)`
                // expression.
                let obj_val = self.eval(inner)?;
                let obj = self.require_object(&obj_val)?;
                let call_args = self.eval_args(args)?;
                self.host.call_function(&obj, name, call_args)
            }
            other => Err(EngineError::ContextError(format!("cannot call expression {other:?}"))),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Var>, EngineError> {
        args.iter().map(|a| self.eval(a)).collect()
    }

    fn eval_variables_call(&mut self, method: &str, args: &[Expr]) -> Result<Var, EngineError> {
        match method {
            "TryGet" => {
                let key = self.eval_string_arg(args, 0)?;
                Ok(self
                    .ctx
                    .variables
                    .get(&key)
                    .map(v_str)
                    .unwrap_or_else(v_none))
            }
            other => Err(EngineError::ContextError(format!("Variables.{other} is not supported"))),
        }
    }

    fn eval_resolver_call(&mut self, method: &str, args: &[Expr]) -> Result<Var, EngineError> {
        match method {
            "ResolveObject" => {
                let reference = self.eval_string_arg(args, 0)?;
                let caller_this = match args.get(1) {
                    Some(e) => {
                        let v = self.eval(e)?;
                        self.require_object(&v)?
                    }
                    None => self.ctx.this_obj.clone(),
                };
                Ok(self
                    .ctx
                    .helpers
                    .resolve_object(&reference, &caller_this)
                    .map(|o| v_obj(o.id))
                    .unwrap_or_else(v_none))
            }
            other => Err(EngineError::ContextError(format!(
                "ObjectResolver.{other} is not supported"
            ))),
        }
    }

    fn eval_plain_call(&mut self, name: &str, args: &[Expr]) -> Result<Var, EngineError> {
        match name {
            "notify" => {
                let target_val = self.eval_arg(args, 0)?;
                let msg = self.eval_string_arg(args, 1)?;
                let obj = self.require_object(&target_val)?;
                self.ctx.command_processor.send_to_player(&msg, obj.session.as_deref());
                Ok(v_none())
            }
            "Say" => {
                let msg = self.eval_string_arg(args, 0)?;
                self.ctx
                    .command_processor
                    .send_to_player(&msg, self.ctx.player.session.as_deref());
                Ok(v_none())
            }
            "SayToRoom" => {
                let msg = self.eval_string_arg(args, 0)?;
                let exclude_self = match args.get(1) {
                    Some(e) => truthy(&self.eval(e)?),
                    None => false,
                };
                if let Some(loc) = &self.ctx.player.location {
                    for occupant in self.ctx.helpers.store().get_objects_in_location(loc) {
                        if exclude_self && occupant.id == self.ctx.player.id {
                            continue;
                        }
                        if let Some(session) = occupant.session.as_deref() {
                            self.ctx.command_processor.send_to_player(&msg, Some(session));
                        }
                    }
                }
                Ok(v_none())
            }
            "GetObjectByDbRef" => {
                let n = self.eval_int_arg(args, 0)?;
                Ok(self
                    .ctx
                    .helpers
                    .store()
                    .get_object_by_dbref(n)
                    .map(|o| v_obj(o.id))
                    .unwrap_or_else(|| v_obj(ObjectId::new(format!("#{n}")))))
            }
            "GetObjectById" => {
                let id = self.eval_string_arg(args, 0)?;
                Ok(v_obj(ObjectId::new(id)))
            }
            "GetObject" => {
                let reference = self.eval_string_arg(args, 0)?;
                if let Some(n) = reference.strip_prefix('#').and_then(|s| s.parse::<i64>().ok()) {
                    return Ok(self
                        .ctx
                        .helpers
                        .store()
                        .get_object_by_dbref(n)
                        .map(|o| v_obj(o.id))
                        .unwrap_or_else(|| v_obj(ObjectId::new(reference))));
                }
                Ok(v_obj(ObjectId::new(reference)))
            }
            "GetProperty" => {
                let obj_val = self.eval_arg(args, 0)?;
                let prop = self.eval_string_arg(args, 1)?;
                let obj = self.require_object(&obj_val)?;
                Ok(self
                    .ctx
                    .helpers
                    .store()
                    .get_property(&obj.id, &prop)
                    .unwrap_or_else(v_none))
            }
            "SetProperty" => {
                let obj_val = self.eval_arg(args, 0)?;
                let prop = self.eval_string_arg(args, 1)?;
                let value = self.eval_arg(args, 2)?;
                let obj = self.require_object(&obj_val)?;
                self.ctx
                    .helpers
                    .store()
                    .set_property(&obj.id, &prop, value)
                    .map_err(|e| EngineError::ContextError(e.to_string()))?;
                Ok(v_none())
            }
            "GetParameter" => {
                let param_name = self.eval_string_arg(args, 0)?;
                self.ctx
                    .named_parameters
                    .get(&param_name)
                    .cloned()
                    .ok_or_else(|| EngineError::ContextError(format!("no such parameter '{param_name}'")))
            }
            "CallVerb" => {
                let obj = self.eval_ref_arg(args, 0)?;
                let verb_name = self.eval_string_arg(args, 1)?;
                let call_args = self.eval_args(&args[2.min(args.len())..])?;
                self.host.call_verb(&obj, &verb_name, call_args)
            }
            "CallFunction" => {
                let obj = self.eval_ref_arg(args, 0)?;
                let fn_name = self.eval_string_arg(args, 1)?;
                let call_args = self.eval_args(&args[2.min(args.len())..])?;
                self.host.call_function(&obj, &fn_name, call_args)
            }
            "CallFunctionOnObject" => {
                let obj_val = self.eval_arg(args, 0)?;
                let fn_name = self.eval_string_arg(args, 1)?;
                let obj = self.require_object(&obj_val)?;
                let call_args = self.eval_args(&args[2.min(args.len())..])?;
                self.host.call_function(&obj, &fn_name, call_args)
            }
            other => Err(EngineError::ContextError(format!("undefined function '{other}'"))),
        }
    }

    fn eval_arg(&mut self, args: &[Expr], idx: usize) -> Result<Var, EngineError> {
        match args.get(idx) {
            Some(e) => self.eval(e),
            None => Err(EngineError::ArityMismatch {
                expected: idx + 1,
                got: args.len(),
            }),
        }
    }

    fn eval_string_arg(&mut self, args: &[Expr], idx: usize) -> Result<String, EngineError> {
        Ok(self.eval_arg(args, idx)?.to_display_string())
    }

    fn eval_int_arg(&mut self, args: &[Expr], idx: usize) -> Result<i64, EngineError> {
        let v = self.eval_arg(args, idx)?;
        v.as_int()
            .ok_or_else(|| EngineError::TypeMismatch {
                name: format!("arg{idx}"),
                expected: "int".to_string(),
            })
    }

    /// Evaluates a "which object" argument for `CallVerb`/`CallFunction`:
    /// either an already-resolved object value, or a bare reference string
    /// resolved through the `Helpers` facade (e.g. `"this"`, `"#1"`).
    fn eval_ref_arg(&mut self, args: &[Expr], idx: usize) -> Result<GameObject, EngineError> {
        let v = self.eval_arg(args, idx)?;
        if let Some(id) = v.as_obj() {
            return self
                .ctx
                .helpers
                .store()
                .get_object(id)
                .ok_or_else(|| EngineError::ResolutionFailed(id.to_string()));
        }
        if let Some(s) = v.as_str() {
            if s.eq_ignore_ascii_case("this") {
                return Ok(self.ctx.this_obj.clone());
            }
            return self
                .ctx
                .helpers
                .resolve_object(s, &self.ctx.this_obj)
                .ok_or_else(|| EngineError::ResolutionFailed(s.to_string()));
        }
        Err(EngineError::TypeMismatch {
            name: format!("arg{idx}"),
            expected: "object reference".to_string(),
        })
    }

    fn require_object(&self, v: &Var) -> Result<GameObject, EngineError> {
        let id = v
            .as_obj()
            .ok_or_else(|| EngineError::TypeMismatch {
                name: "object".to_string(),
                expected: "GameObject".to_string(),
            })?;
        Ok(self
            .ctx
            .helpers
            .store()
            .get_object(id)
            .unwrap_or_else(|| GameObject::tombstone(id.clone())))
    }
}

fn literal_to_var(lit: &Literal) -> Var {
    match lit {
        Literal::Null => v_none(),
        Literal::Bool(b) => v_bool(*b),
        Literal::Int(i) => v_int(*i),
        Literal::Float(f) => v_float(*f),
        Literal::Str(s) => v_str(s),
    }
}

fn truthy(v: &Var) -> bool {
    match v.variant() {
        Variant::Null => false,
        Variant::Bool(b) => *b,
        Variant::Int(i) => *i != 0,
        Variant::Float(f) => *f != 0.0,
        Variant::Str(s) => !s.is_empty(),
        _ => true,
    }
}

fn apply_unary(op: UnaryOp, v: &Var) -> Var {
    match op {
        UnaryOp::Not => v_bool(!truthy(v)),
        UnaryOp::Neg => match v.variant() {
            Variant::Int(i) => v_int(-i),
            Variant::Float(f) => v_float(-f),
            _ => v_int(0),
        },
    }
}

fn apply_binary(op: BinaryOp, l: &Var, r: &Var) -> Result<Var, EngineError> {
    use BinaryOp::*;
    match op {
        Add => {
            if matches!(l.variant(), Variant::Str(_)) || matches!(r.variant(), Variant::Str(_)) {
                return Ok(v_str(format!("{}{}", l.to_display_string(), r.to_display_string())));
            }
            numeric_binop(l, r, |a, b| a + b, |a, b| a + b)
        }
        Sub => numeric_binop(l, r, |a, b| a - b, |a, b| a - b),
        Mul => numeric_binop(l, r, |a, b| a * b, |a, b| a * b),
        Div => numeric_binop(l, r, |a, b| a / b, |a, b| a / b),
        Mod => numeric_binop(l, r, |a, b| a % b, |a, b| a % b),
        Eq => Ok(v_bool(l == r)),
        Ne => Ok(v_bool(l != r)),
        Lt => numeric_cmp(l, r, |o| o == std::cmp::Ordering::Less),
        Le => numeric_cmp(l, r, |o| o != std::cmp::Ordering::Greater),
        Gt => numeric_cmp(l, r, |o| o == std::cmp::Ordering::Greater),
        Ge => numeric_cmp(l, r, |o| o != std::cmp::Ordering::Less),
        And | Or => unreachable!("short-circuited in eval_binary"),
    }
}

fn numeric_binop(
    l: &Var,
    r: &Var,
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Var, EngineError> {
    match (l.variant(), r.variant()) {
        (Variant::Int(a), Variant::Int(b)) => Ok(v_int(int_op(*a, *b))),
        _ => {
            let a = l.as_float().ok_or_else(|| EngineError::TypeMismatch {
                name: "lhs".to_string(),
                expected: "number".to_string(),
            })?;
            let b = r.as_float().ok_or_else(|| EngineError::TypeMismatch {
                name: "rhs".to_string(),
                expected: "number".to_string(),
            })?;
            Ok(v_float(float_op(a, b)))
        }
    }
}

fn numeric_cmp(l: &Var, r: &Var, accept: impl Fn(std::cmp::Ordering) -> bool) -> Result<Var, EngineError> {
    let a = l.as_float().ok_or_else(|| EngineError::TypeMismatch {
        name: "lhs".to_string(),
        expected: "number".to_string(),
    })?;
    let b = r.as_float().ok_or_else(|| EngineError::TypeMismatch {
        name: "rhs".to_string(),
        expected: "number".to_string(),
    })?;
    let ordering = a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
    Ok(v_bool(accept(ordering)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_finds_throw_line() {
        let src = "var x = 1;\nthrow new Exception(\"no\");";
        assert_eq!(heuristic_line(src), 2);
    }

    #[test]
    fn heuristic_finds_dot_call_line_when_no_throw() {
        let src = "var x = 1;\nPlayer.Notify(\"hi\");";
        assert_eq!(heuristic_line(src), 2);
    }

    #[test]
    fn heuristic_returns_zero_when_nothing_matches() {
        assert_eq!(heuristic_line("var x = 1;\nreturn x;"), 0);
    }
}
