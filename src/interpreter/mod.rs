//! The interpreter module defines the main entrypoint to the Brewin
//! interpreter, `eval`, and the tree-walking evaluator behind it.
//!
//! Two failure channels exist side by side. A [`HostError`] is a true
//! abort: an unbound name, a type mismatch, a nil dereference. A Brewin
//! `raise`/`try`/`catch` is not a Rust error at all; it is ordinary control
//! flow threaded through [`Flow`] and [`Outcome`], exactly like `return`.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::node::{
    BinOp, Exp, ExpRef, FCall, FunctionDef, LValue, Program, Statement, TypeName,
};
use crate::host::Host;

pub mod operations;
pub mod structs;
pub mod types;
pub mod value;

use structs::StructRegistry;
use types::{coerce_assign, coerce_to_bool, default_value_for, validate_type};
use value::environment::Environment;
use value::{StructHandle, StructInstance, Thunk, Value, Variable};

#[derive(Debug, Error, Clone)]
pub enum HostError {
    #[error("name error: {0}")]
    Name(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("fault: {0}")]
    Fault(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// The outcome of forcing an expression: either a concrete value, or a
/// Brewin-level exception still in flight.
pub enum Outcome<T> {
    Value(T),
    Raise(String),
}

/// The outcome of executing a statement (or a block of them).
enum Flow {
    Continue,
    Return(Value),
    Raise(String),
}

/// Runs a parsed program to completion against `host`, calling `main`
/// with no arguments. An uncaught Brewin exception becomes a
/// [`HostError::Fault`].
pub fn eval<H: Host>(program: &Program, host: &mut H) -> Result<(), HostError> {
    let mut structs = StructRegistry::new();
    for struct_def in &program.structs {
        structs.define(struct_def)?;
    }

    let mut functions = HashMap::new();
    for func_def in &program.functions {
        for param in &func_def.params {
            validate_type(&param.var_type, &structs, false)?;
        }
        if let Some(return_type) = &func_def.return_type {
            validate_type(return_type, &structs, true)?;
        }
        functions.insert((func_def.name.clone(), func_def.params.len()), func_def);
    }

    let main_key = ("main".to_string(), 0);
    let main_def = functions
        .get(&main_key)
        .copied()
        .ok_or_else(|| HostError::Name("no function 'main' with 0 arguments".to_string()))?;

    let mut interp = Interpreter { functions, structs, host, env: Environment::new() };

    interp.env.push_func(None);
    let result = interp.exec_block(&main_def.statements);
    interp.env.pop_func();

    match result? {
        Flow::Raise(exc) => Err(HostError::Fault(format!("uncaught exception: {}", exc))),
        Flow::Return(_) | Flow::Continue => Ok(()),
    }
}

struct Interpreter<'p, H: Host> {
    functions: HashMap<(String, usize), &'p FunctionDef>,
    structs: StructRegistry,
    host: &'p mut H,
    env: Environment,
}

impl<'p, H: Host> Interpreter<'p, H> {
    fn exec_block(&mut self, statements: &[Statement]) -> Result<Flow, HostError> {
        for statement in statements {
            match self.exec_statement(statement)? {
                Flow::Continue => continue,
                other => return Ok(other),
            }
        }
        Ok(Flow::Continue)
    }

    fn exec_statement(&mut self, statement: &Statement) -> Result<Flow, HostError> {
        log::trace!("executing statement: {:?}", statement);

        match statement {
            Statement::VarDef { name, var_type } => {
                let value = match var_type {
                    Some(t) => {
                        validate_type(t, &self.structs, false)?;
                        default_value_for(t)
                    }
                    None => Value::Nil,
                };
                self.env
                    .create(name, Variable::new(var_type.clone(), value))
                    .map_err(HostError::Name)?;
                Ok(Flow::Continue)
            }
            Statement::Assign { lvalue, rhs } => self.exec_assign(lvalue, rhs),
            Statement::FCall(fcall) => match self.call_function(fcall)? {
                Outcome::Raise(exc) => Ok(Flow::Raise(exc)),
                Outcome::Value(_) => Ok(Flow::Continue),
            },
            Statement::If { condition, statements, else_statements } => {
                let cond = match self.eval_forced(condition)? {
                    Outcome::Raise(exc) => return Ok(Flow::Raise(exc)),
                    Outcome::Value(v) => coerce_to_bool(v)?,
                };

                self.env.push_block();
                let result = if cond {
                    self.exec_block(statements)
                } else {
                    self.exec_block(else_statements)
                };
                self.env.pop_block();
                result
            }
            Statement::For { init, condition, update, statements } => {
                if let Flow::Raise(exc) = self.exec_assign(&init.0, &init.1)? {
                    return Ok(Flow::Raise(exc));
                }

                loop {
                    let cond = match self.eval_forced(condition)? {
                        Outcome::Raise(exc) => return Ok(Flow::Raise(exc)),
                        Outcome::Value(v) => coerce_to_bool(v)?,
                    };
                    if !cond {
                        break;
                    }

                    self.env.push_block();
                    let body_result = self.exec_block(statements);
                    self.env.pop_block();

                    match body_result? {
                        Flow::Continue => {}
                        other => return Ok(other),
                    }

                    if let Flow::Raise(exc) = self.exec_assign(&update.0, &update.1)? {
                        return Ok(Flow::Raise(exc));
                    }
                }

                Ok(Flow::Continue)
            }
            Statement::Return(expr) => {
                let value = match expr {
                    Some(e) => self.make_lazy(e),
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            Statement::Raise(expr) => {
                let value = match self.eval_forced(expr)? {
                    Outcome::Raise(exc) => return Ok(Flow::Raise(exc)),
                    Outcome::Value(v) => v,
                };
                match value {
                    Value::Str(s) => Ok(Flow::Raise(s)),
                    other => Err(HostError::Type(format!(
                        "raise requires a string, got '{}'",
                        other.type_name()
                    ))),
                }
            }
            Statement::Try { statements, catchers } => {
                self.env.push_block();
                let result = self.exec_block(statements);
                self.env.pop_block();

                match result? {
                    Flow::Raise(exc) => {
                        for catcher in catchers {
                            if catcher.exception_type == exc {
                                self.env.push_block();
                                let result = self.exec_block(&catcher.statements);
                                self.env.pop_block();
                                return result;
                            }
                        }
                        Ok(Flow::Raise(exc))
                    }
                    other => Ok(other),
                }
            }
        }
    }

    fn exec_assign(&mut self, lvalue: &LValue, rhs: &ExpRef) -> Result<Flow, HostError> {
        let target = match self.resolve_write_target(lvalue)? {
            Outcome::Raise(exc) => return Ok(Flow::Raise(exc)),
            Outcome::Value(t) => t,
        };
        let rhs_value = self.make_lazy(rhs);

        match target {
            WriteTarget::Var(name) => {
                let declared = self
                    .env
                    .get(&name)
                    .ok_or_else(|| HostError::Name(format!("unknown variable '{}'", name)))?
                    .var_type
                    .clone();

                let final_value = match declared {
                    Some(t) => match self.force(rhs_value)? {
                        Outcome::Raise(exc) => return Ok(Flow::Raise(exc)),
                        Outcome::Value(v) => coerce_assign(&t, v)?,
                    },
                    None => rhs_value,
                };

                self.env.get_mut(&name).expect("checked above").value = final_value;
            }
            WriteTarget::Field(handle, field) => {
                let declared = handle
                    .borrow()
                    .get(&field)
                    .unwrap_or_else(|| panic!("field '{}' missing after resolution", field))
                    .var_type
                    .clone()
                    .expect("struct fields are always declared with a type");

                let final_value = match self.force(rhs_value)? {
                    Outcome::Raise(exc) => return Ok(Flow::Raise(exc)),
                    Outcome::Value(v) => coerce_assign(&declared, v)?,
                };

                handle.borrow_mut().get_mut(&field).expect("checked above").value = final_value;
            }
        }

        Ok(Flow::Continue)
    }

    /// Wraps `exp` as a lazy value bound to the current activation's
    /// snapshot, unless it's a literal (which is always eager and can
    /// never fail or need forcing).
    fn make_lazy(&self, exp: &ExpRef) -> Value {
        match exp.as_ref() {
            Exp::IntLit(n) => Value::Int(*n),
            Exp::StringLit(s) => Value::Str(s.clone()),
            Exp::BoolLit(b) => Value::Bool(*b),
            Exp::NilLit => Value::Nil,
            _ => Value::Lazy(Rc::new(std::cell::RefCell::new(Thunk {
                expr: exp.clone(),
                env: Some(self.env.snapshot_current()),
                cached: None,
            }))),
        }
    }

    /// Evaluates `exp` and forces the result in one step.
    fn eval_forced(&mut self, exp: &ExpRef) -> Result<Outcome<Value>, HostError> {
        let lazy = self.make_lazy(exp);
        self.force(lazy)
    }

    /// Resolves a lazy value to a concrete one. A thunk that raises keeps
    /// its captured environment, so a later force can retry it; only a
    /// successful force caches a value and releases the snapshot.
    fn force(&mut self, value: Value) -> Result<Outcome<Value>, HostError> {
        // Covers both an already-concrete value and an already-cached thunk.
        if value.is_evaluated() {
            return Ok(Outcome::Value(value.value().expect("is_evaluated implies a value")));
        }

        let cell = match value {
            Value::Lazy(cell) => cell,
            concrete => return Ok(Outcome::Value(concrete)),
        };

        let snapshot = cell
            .borrow()
            .env
            .clone()
            .expect("an uncached thunk always still holds its captured environment");
        let expr = cell.borrow().expr.clone();

        self.env.push_func(Some(snapshot));
        let outcome = self.eval_expr_eager(&expr);
        self.env.pop_func();

        match outcome? {
            Outcome::Raise(exc) => Ok(Outcome::Raise(exc)),
            // `v` may itself be an unforced thunk (e.g. this expression was
            // just a variable read, and that variable still holds a lazy
            // value) — resolve fully before caching, so `cached` always
            // holds a concrete value.
            Outcome::Value(v) => {
                let resolved = self.force(v)?;
                if let Outcome::Value(ref rv) = resolved {
                    let mut thunk = cell.borrow_mut();
                    thunk.cached = Some(rv.clone());
                    thunk.env = None;
                }
                Ok(resolved)
            }
        }
    }

    fn eval_expr_eager(&mut self, exp: &Exp) -> Result<Outcome<Value>, HostError> {
        Ok(match exp {
            Exp::IntLit(n) => Outcome::Value(Value::Int(*n)),
            Exp::StringLit(s) => Outcome::Value(Value::Str(s.clone())),
            Exp::BoolLit(b) => Outcome::Value(Value::Bool(*b)),
            Exp::NilLit => Outcome::Value(Value::Nil),
            Exp::Var(lvalue) => self.read_lvalue(lvalue)?,
            Exp::FCall(fcall) => self.call_function(fcall)?,
            Exp::New(type_name) => {
                let name = match type_name {
                    TypeName::Struct(name) => name.clone(),
                    other => {
                        return Err(HostError::Type(format!(
                            "cannot instantiate non-struct type '{:?}'",
                            other
                        )))
                    }
                };
                let handle = self.structs.new_instance(&name)?;
                Outcome::Value(Value::Struct(StructInstance { type_name: name, handle: Some(handle) }))
            }
            Exp::Neg(inner) => match self.eval_forced(inner)? {
                Outcome::Raise(exc) => Outcome::Raise(exc),
                Outcome::Value(v) => Outcome::Value(operations::neg(v)?),
            },
            Exp::Not(inner) => match self.eval_forced(inner)? {
                Outcome::Raise(exc) => Outcome::Raise(exc),
                Outcome::Value(v) => Outcome::Value(operations::not(v)?),
            },
            Exp::BinOp { op, lhs, rhs } => self.eval_binop(*op, lhs, rhs)?,
        })
    }

    fn eval_binop(&mut self, op: BinOp, lhs: &ExpRef, rhs: &ExpRef) -> Result<Outcome<Value>, HostError> {
        let left = match self.eval_forced(lhs)? {
            Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
            Outcome::Value(v) => v,
        };

        match op {
            BinOp::Or => {
                if coerce_to_bool(left)? {
                    return Ok(Outcome::Value(Value::Bool(true)));
                }
                let right = match self.eval_forced(rhs)? {
                    Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
                    Outcome::Value(v) => v,
                };
                Ok(Outcome::Value(Value::Bool(coerce_to_bool(right)?)))
            }
            BinOp::And => {
                if !coerce_to_bool(left)? {
                    return Ok(Outcome::Value(Value::Bool(false)));
                }
                let right = match self.eval_forced(rhs)? {
                    Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
                    Outcome::Value(v) => v,
                };
                Ok(Outcome::Value(Value::Bool(coerce_to_bool(right)?)))
            }
            _ => {
                let right = match self.eval_forced(rhs)? {
                    Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
                    Outcome::Value(v) => v,
                };
                operations::apply(op, left, right)
            }
        }
    }

    /// Reads a (possibly dotted) lvalue, forcing every non-final segment
    /// so it can be dereferenced. The final segment's value is returned
    /// without forcing it.
    fn read_lvalue(&mut self, lvalue: &LValue) -> Result<Outcome<Value>, HostError> {
        let (first, rest) = lvalue.path.split_first().expect("an lvalue always has a segment");

        let mut current = self
            .env
            .get(first)
            .ok_or_else(|| HostError::Name(format!("unknown variable '{}'", first)))?
            .value
            .clone();

        if rest.is_empty() {
            return Ok(Outcome::Value(current));
        }

        for field in rest {
            current = match self.force(current)? {
                Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
                Outcome::Value(v) => v,
            };
            let handle = struct_handle_for_field(&current, field)?;
            let next = {
                let map = handle.borrow();
                map.get(field.as_str())
                    .ok_or_else(|| HostError::Name(format!("unknown field '{}'", field)))?
                    .value
                    .clone()
            };
            current = next;
        }

        Ok(Outcome::Value(current))
    }

    fn resolve_write_target(&mut self, lvalue: &LValue) -> Result<Outcome<WriteTarget>, HostError> {
        if lvalue.path.len() == 1 {
            return Ok(Outcome::Value(WriteTarget::Var(lvalue.path[0].clone())));
        }

        let (first, rest) = lvalue.path.split_first().expect("checked len above");
        let mut current = self
            .env
            .get(first)
            .ok_or_else(|| HostError::Name(format!("unknown variable '{}'", first)))?
            .value
            .clone();

        let (middle, last) = rest.split_at(rest.len() - 1);
        let last = &last[0];

        for field in middle {
            current = match self.force(current)? {
                Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
                Outcome::Value(v) => v,
            };
            let handle = struct_handle_for_field(&current, field)?;
            let next = {
                let map = handle.borrow();
                map.get(field.as_str())
                    .ok_or_else(|| HostError::Name(format!("unknown field '{}'", field)))?
                    .value
                    .clone()
            };
            current = next;
        }

        current = match self.force(current)? {
            Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
            Outcome::Value(v) => v,
        };
        let handle = struct_handle_for_field(&current, last)?;
        Ok(Outcome::Value(WriteTarget::Field(handle, last.clone())))
    }

    fn call_function(&mut self, fcall: &FCall) -> Result<Outcome<Value>, HostError> {
        match fcall.name.as_str() {
            "print" => self.call_print(&fcall.args),
            "inputi" => self.call_inputi(&fcall.args),
            "inputs" => self.call_inputs(&fcall.args),
            _ => self.call_user_function(fcall),
        }
    }

    fn call_print(&mut self, args: &[ExpRef]) -> Result<Outcome<Value>, HostError> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            let value = match self.eval_forced(arg)? {
                Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
                Outcome::Value(v) => v,
            };
            parts.push(printable(&value)?);
        }
        // Built up entirely before the single `output` call, so a type
        // error on a later argument never produces partial output.
        self.host.output(&parts.concat());
        Ok(Outcome::Value(Value::Void))
    }

    fn call_inputi(&mut self, args: &[ExpRef]) -> Result<Outcome<Value>, HostError> {
        if args.len() > 1 {
            return Err(HostError::Name("invalid number of input prompts".to_string()));
        }
        if let Some(prompt) = args.first() {
            let value = match self.eval_forced(prompt)? {
                Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
                Outcome::Value(v) => v,
            };
            self.host.output(&printable(&value)?);
        }

        let line = self.host.input().map_err(|e| HostError::Fault(e.to_string()))?;
        let n: i64 = line
            .trim()
            .parse()
            .map_err(|_| HostError::Type(format!("inputi expected an integer, got '{}'", line)))?;
        Ok(Outcome::Value(Value::Int(n)))
    }

    fn call_inputs(&mut self, args: &[ExpRef]) -> Result<Outcome<Value>, HostError> {
        if args.len() > 1 {
            return Err(HostError::Name("invalid number of input prompts".to_string()));
        }
        if let Some(prompt) = args.first() {
            let value = match self.eval_forced(prompt)? {
                Outcome::Raise(exc) => return Ok(Outcome::Raise(exc)),
                Outcome::Value(v) => v,
            };
            self.host.output(&printable(&value)?);
        }

        let line = self.host.input().map_err(|e| HostError::Fault(e.to_string()))?;
        Ok(Outcome::Value(Value::Str(line)))
    }

    fn call_user_function(&mut self, fcall: &FCall) -> Result<Outcome<Value>, HostError> {
        let key = (fcall.name.clone(), fcall.args.len());
        let def = *self.functions.get(&key).ok_or_else(|| {
            HostError::Name(format!("no function '{}' with {} argument(s)", fcall.name, fcall.args.len()))
        })?;

        let mut bindings = Vec::with_capacity(fcall.args.len());
        for (param, arg_expr) in def.params.iter().zip(fcall.args.iter()) {
            let value = self.make_lazy(arg_expr);
            bindings.push((param.name.clone(), Variable::new(Some(param.var_type.clone()), value)));
        }

        self.env.push_func(None);
        for (name, var) in bindings {
            self.env.create(&name, var).map_err(HostError::Name)?;
        }
        let result = self.exec_block(&def.statements);
        self.env.pop_func();

        match result? {
            Flow::Raise(exc) => Ok(Outcome::Raise(exc)),
            Flow::Return(v) => match &def.return_type {
                Some(t) => match self.force(v)? {
                    Outcome::Raise(exc) => Ok(Outcome::Raise(exc)),
                    Outcome::Value(raw) => Ok(Outcome::Value(coerce_assign(t, raw)?)),
                },
                None => Ok(Outcome::Value(v)),
            },
            Flow::Continue => match &def.return_type {
                Some(t) => Ok(Outcome::Value(default_value_for(t))),
                None => Ok(Outcome::Value(Value::Nil)),
            },
        }
    }
}

enum WriteTarget {
    Var(String),
    Field(StructHandle, String),
}

fn struct_handle_for_field(value: &Value, field: &str) -> Result<StructHandle, HostError> {
    match value {
        Value::Struct(StructInstance { handle: Some(h), .. }) => Ok(h.clone()),
        Value::Struct(StructInstance { handle: None, type_name }) => Err(HostError::Fault(format!(
            "attempted to access field '{}' through a nil '{}' reference",
            field, type_name
        ))),
        other => Err(HostError::Type(format!(
            "cannot access field '{}' of non-struct value '{}'",
            field,
            other.type_name()
        ))),
    }
}

/// Renders a value for `print`/`inputi`/`inputs`. `Void` and a non-nil
/// struct are not printable; both are a type error.
fn printable(value: &Value) -> Result<String, HostError> {
    match value {
        Value::Void => Err(HostError::Type("cannot print a void value".to_string())),
        Value::Struct(StructInstance { handle: Some(_), type_name }) => Err(HostError::Type(format!(
            "cannot print a struct value of type '{}'",
            type_name
        ))),
        other => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod test;
