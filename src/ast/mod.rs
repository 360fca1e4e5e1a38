//! Builds the interpreter's AST (see `node`) from the parse tree produced
//! by the bundled `pest` grammar. This module performs no type-checking or
//! scope analysis; it is a direct, mechanical tree-shape translation.

use std::rc::Rc;

use pest::iterators::Pair;
use thiserror::Error;

use crate::{BrewinParser, Rule};
use node::*;

pub mod node;


#[derive(Debug, Error)]
pub enum ASTError {
    #[error("unexpected parse node: {0}")]
    UnexpectedPair(String),
    #[error("expected {expected} children, got {got}")]
    ChildMismatch { expected: usize, got: usize },
    #[error("invalid operator: {0}")]
    InvalidOperator(String),
    #[error("invalid integer literal: {0}")]
    InvalidInt(String),
}

// Rule: program
pub fn ast(program: Pair<Rule>) -> Result<Program, ASTError> {
    match program.as_rule() {
        Rule::program => build_program(program),
        _ => Err(unexpected_pair(program)),
    }
}

// Rule: program
fn build_program(program: Pair<Rule>) -> Result<Program, ASTError> {
    let mut structs = Vec::new();
    let mut functions = Vec::new();

    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::struct_def => structs.push(build_struct_def(pair)?),
            Rule::func_def => functions.push(build_func_def(pair)?),
            Rule::EOI => break,
            _ => return Err(unexpected_pair(pair)),
        }
    }

    Ok(Program { structs, functions })
}

// rule: struct_def
fn build_struct_def(struct_def: Pair<Rule>) -> Result<StructDef, ASTError> {
    let mut children: Vec<Pair<Rule>> = struct_def.into_inner().collect();
    let name = children.remove(0).as_str().to_string();
    let fields = children
        .into_iter()
        .map(build_param)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StructDef { name, fields })
}

// rule: func_def
fn build_func_def(func_def: Pair<Rule>) -> Result<FunctionDef, ASTError> {
    let mut children: Vec<Pair<Rule>> = func_def.into_inner().collect();
    expect_children(3, children.len().min(3))?;

    let name = children.remove(0).as_str().to_string();
    let params = build_param_list(children.remove(0))?;

    let mut return_type = None;
    let mut statements = Vec::new();

    for pair in children {
        match pair.as_rule() {
            Rule::type_name => return_type = Some(TypeName::parse(pair.as_str())),
            Rule::block => statements = build_block(pair)?,
            _ => return Err(unexpected_pair(pair)),
        }
    }

    Ok(FunctionDef {
        name,
        params,
        return_type,
        statements,
    })
}

// rule: param_list
fn build_param_list(param_list: Pair<Rule>) -> Result<Vec<Param>, ASTError> {
    param_list.into_inner().map(build_param).collect()
}

// rule: param
fn build_param(param: Pair<Rule>) -> Result<Param, ASTError> {
    let mut children: Vec<Pair<Rule>> = param.into_inner().collect();
    expect_children(2, children.len())?;

    let name = children.remove(0).as_str().to_string();
    let var_type = TypeName::parse(children.remove(0).as_str());

    Ok(Param { name, var_type })
}

// rule: block
fn build_block(block: Pair<Rule>) -> Result<Vec<Statement>, ASTError> {
    block.into_inner().map(build_statement).collect()
}

// rule: statement
fn build_statement(statement: Pair<Rule>) -> Result<Statement, ASTError> {
    let mut children: Vec<Pair<Rule>> = statement.into_inner().collect();
    expect_children(1, children.len())?;
    let child = children.remove(0);

    match child.as_rule() {
        Rule::vardef_stmt => build_vardef(child),
        Rule::assign_stmt => build_assign_stmt(child),
        Rule::fcall_stmt => build_fcall_stmt(child),
        Rule::if_stmt => build_if(child),
        Rule::for_stmt => build_for(child),
        Rule::return_stmt => build_return(child),
        Rule::raise_stmt => build_raise(child),
        Rule::try_stmt => build_try(child),
        _ => Err(unexpected_pair(child)),
    }
}

// rule: vardef_stmt
fn build_vardef(vardef: Pair<Rule>) -> Result<Statement, ASTError> {
    let mut children: Vec<Pair<Rule>> = vardef.into_inner().collect();
    let name = children.remove(0).as_str().to_string();
    let var_type = children.pop().map(|p| TypeName::parse(p.as_str()));

    Ok(Statement::VarDef { name, var_type })
}

// rule: lvalue
fn build_lvalue(lvalue: Pair<Rule>) -> LValue {
    let path = lvalue
        .into_inner()
        .map(|p| p.as_str().to_string())
        .collect();
    LValue { path }
}

/// Rule: assign_expr. Returns the pieces rather than a `Statement` so this
/// is reusable for the `for` loop's init/update, which carry no semicolon.
fn build_assign_expr(assign_expr: Pair<Rule>) -> Result<(LValue, ExpRef), ASTError> {
    let mut children: Vec<Pair<Rule>> = assign_expr.into_inner().collect();
    expect_children(2, children.len())?;

    let lvalue = build_lvalue(children.remove(0));
    let rhs = build_expr(children.remove(0))?;

    Ok((lvalue, rhs))
}

// rule: assign_stmt
fn build_assign_stmt(assign_stmt: Pair<Rule>) -> Result<Statement, ASTError> {
    let mut children: Vec<Pair<Rule>> = assign_stmt.into_inner().collect();
    expect_children(1, children.len())?;
    let (lvalue, rhs) = build_assign_expr(children.remove(0))?;
    Ok(Statement::Assign { lvalue, rhs })
}

// rule: fcall
fn build_fcall(fcall: Pair<Rule>) -> Result<FCall, ASTError> {
    let mut children: Vec<Pair<Rule>> = fcall.into_inner().collect();
    expect_children(2, children.len())?;

    let name = children.remove(0).as_str().to_string();
    let args = children
        .remove(0)
        .into_inner()
        .map(build_expr)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FCall { name, args })
}

// rule: fcall_stmt
fn build_fcall_stmt(fcall_stmt: Pair<Rule>) -> Result<Statement, ASTError> {
    let mut children: Vec<Pair<Rule>> = fcall_stmt.into_inner().collect();
    expect_children(1, children.len())?;
    Ok(Statement::FCall(build_fcall(children.remove(0))?))
}

// rule: if_stmt
fn build_if(if_stmt: Pair<Rule>) -> Result<Statement, ASTError> {
    let mut children: Vec<Pair<Rule>> = if_stmt.into_inner().collect();

    let condition = build_expr(children.remove(0))?;
    let statements = build_block(children.remove(0))?;
    let else_statements = match children.pop() {
        Some(else_block) => build_block(else_block)?,
        None => Vec::new(),
    };

    Ok(Statement::If {
        condition,
        statements,
        else_statements,
    })
}

// rule: for_stmt
fn build_for(for_stmt: Pair<Rule>) -> Result<Statement, ASTError> {
    let mut children: Vec<Pair<Rule>> = for_stmt.into_inner().collect();
    expect_children(4, children.len())?;

    let init = build_assign_expr(children.remove(0))?;
    let condition = build_expr(children.remove(0))?;
    let update = build_assign_expr(children.remove(0))?;
    let statements = build_block(children.remove(0))?;

    Ok(Statement::For {
        init,
        condition,
        update,
        statements,
    })
}

// rule: return_stmt
fn build_return(return_stmt: Pair<Rule>) -> Result<Statement, ASTError> {
    let expr = return_stmt.into_inner().next();
    Ok(Statement::Return(expr.map(build_expr).transpose()?))
}

// rule: raise_stmt
fn build_raise(raise_stmt: Pair<Rule>) -> Result<Statement, ASTError> {
    let mut children: Vec<Pair<Rule>> = raise_stmt.into_inner().collect();
    expect_children(1, children.len())?;
    Ok(Statement::Raise(build_expr(children.remove(0))?))
}

// rule: try_stmt
fn build_try(try_stmt: Pair<Rule>) -> Result<Statement, ASTError> {
    let mut children: Vec<Pair<Rule>> = try_stmt.into_inner().collect();
    let statements = build_block(children.remove(0))?;
    let catchers = children
        .into_iter()
        .map(build_catch)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Statement::Try {
        statements,
        catchers,
    })
}

// rule: catch_clause
fn build_catch(catch_clause: Pair<Rule>) -> Result<Catcher, ASTError> {
    let mut children: Vec<Pair<Rule>> = catch_clause.into_inner().collect();
    expect_children(2, children.len())?;

    let exception_type = string_literal_text(children.remove(0));
    let statements = build_block(children.remove(0))?;

    Ok(Catcher {
        exception_type,
        statements,
    })
}

// rule: expr
fn build_expr(expr: Pair<Rule>) -> Result<ExpRef, ASTError> {
    let mut children: Vec<Pair<Rule>> = expr.into_inner().collect();
    expect_children(1, children.len())?;
    build_or_expr(children.remove(0))
}

/// Folds a left-associative `level ~ (op ~ level)*` rule into a left-leaning
/// `BinOp` tree, e.g. `a + b - c` becomes `(a + b) - c`.
fn fold_binary(
    pair: Pair<Rule>,
    next: impl Fn(Pair<Rule>) -> Result<ExpRef, ASTError>,
    op_of: impl Fn(&str) -> Result<BinOp, ASTError>,
) -> Result<ExpRef, ASTError> {
    let mut children: Vec<Pair<Rule>> = pair.into_inner().collect();
    let mut acc = next(children.remove(0))?;

    while !children.is_empty() {
        let op_pair = children.remove(0);
        let rhs_pair = children.remove(0);
        let op = op_of(op_pair.as_str())?;
        let rhs = next(rhs_pair)?;
        acc = Rc::new(Exp::BinOp { op, lhs: acc, rhs });
    }

    Ok(acc)
}

fn build_or_expr(pair: Pair<Rule>) -> Result<ExpRef, ASTError> {
    fold_binary(pair, build_and_expr, |_| Ok(BinOp::Or))
}

fn build_and_expr(pair: Pair<Rule>) -> Result<ExpRef, ASTError> {
    fold_binary(pair, build_eq_expr, |_| Ok(BinOp::And))
}

fn build_eq_expr(pair: Pair<Rule>) -> Result<ExpRef, ASTError> {
    fold_binary(pair, build_rel_expr, |op| match op {
        "==" => Ok(BinOp::Eq),
        "!=" => Ok(BinOp::Ne),
        _ => Err(ASTError::InvalidOperator(op.to_string())),
    })
}

fn build_rel_expr(pair: Pair<Rule>) -> Result<ExpRef, ASTError> {
    fold_binary(pair, build_add_expr, |op| match op {
        "<=" => Ok(BinOp::Le),
        ">=" => Ok(BinOp::Ge),
        "<" => Ok(BinOp::Lt),
        ">" => Ok(BinOp::Gt),
        _ => Err(ASTError::InvalidOperator(op.to_string())),
    })
}

fn build_add_expr(pair: Pair<Rule>) -> Result<ExpRef, ASTError> {
    fold_binary(pair, build_mul_expr, |op| match op {
        "+" => Ok(BinOp::Add),
        "-" => Ok(BinOp::Sub),
        _ => Err(ASTError::InvalidOperator(op.to_string())),
    })
}

fn build_mul_expr(pair: Pair<Rule>) -> Result<ExpRef, ASTError> {
    fold_binary(pair, build_unary_expr, |op| match op {
        "*" => Ok(BinOp::Mul),
        "/" => Ok(BinOp::Div),
        _ => Err(ASTError::InvalidOperator(op.to_string())),
    })
}

// rule: unary_expr
fn build_unary_expr(pair: Pair<Rule>) -> Result<ExpRef, ASTError> {
    let mut children: Vec<Pair<Rule>> = pair.into_inner().collect();
    let first = children.remove(0);

    match first.as_rule() {
        Rule::unary_op => {
            let op = first.as_str().to_string();
            let operand = build_unary_expr(children.remove(0))?;
            match op.as_str() {
                "-" => Ok(Rc::new(Exp::Neg(operand))),
                "!" => Ok(Rc::new(Exp::Not(operand))),
                _ => Err(ASTError::InvalidOperator(op)),
            }
        }
        Rule::primary => build_primary(first),
        _ => Err(unexpected_pair(first)),
    }
}

// rule: primary
fn build_primary(primary: Pair<Rule>) -> Result<ExpRef, ASTError> {
    let mut children: Vec<Pair<Rule>> = primary.into_inner().collect();
    expect_children(1, children.len())?;
    let child = children.remove(0);

    match child.as_rule() {
        Rule::paren_expr => {
            let mut inner: Vec<Pair<Rule>> = child.into_inner().collect();
            build_expr(inner.remove(0))
        }
        Rule::new_expr => {
            let mut inner: Vec<Pair<Rule>> = child.into_inner().collect();
            Ok(Rc::new(Exp::New(TypeName::parse(inner.remove(0).as_str()))))
        }
        Rule::fcall => Ok(Rc::new(Exp::FCall(build_fcall(child)?))),
        Rule::literal => build_literal(child),
        Rule::lvalue => Ok(Rc::new(Exp::Var(build_lvalue(child)))),
        _ => Err(unexpected_pair(child)),
    }
}

// rule: literal
fn build_literal(literal: Pair<Rule>) -> Result<ExpRef, ASTError> {
    let mut children: Vec<Pair<Rule>> = literal.into_inner().collect();
    expect_children(1, children.len())?;
    let child = children.remove(0);

    Ok(Rc::new(match child.as_rule() {
        Rule::int_lit => {
            let n: i64 = child
                .as_str()
                .parse()
                .map_err(|_| ASTError::InvalidInt(child.as_str().to_string()))?;
            Exp::IntLit(n)
        }
        Rule::bool_lit => Exp::BoolLit(child.as_str() == "true"),
        Rule::nil_lit => Exp::NilLit,
        Rule::string => Exp::StringLit(string_literal_text(child)),
        _ => return Err(unexpected_pair(child)),
    }))
}

/// Extracts the text between the quotes of a `string` pair.
fn string_literal_text(string: Pair<Rule>) -> String {
    let raw = string.as_str();
    raw[1..raw.len() - 1].to_string()
}

#[track_caller]
fn expect_children(expected: usize, got: usize) -> Result<(), ASTError> {
    if expected != got {
        let caller_location = std::panic::Location::caller();
        return Err(ASTError::ChildMismatch { expected, got }).map_err(|e| {
            log::trace!("child mismatch at {}:{}", caller_location.file(), caller_location.line());
            e
        });
    }

    Ok(())
}

#[track_caller]
fn unexpected_pair(pair: Pair<Rule>) -> ASTError {
    let caller_location = std::panic::Location::caller();
    log::trace!(
        "unexpected pair at {}:{}",
        caller_location.file(),
        caller_location.line()
    );
    ASTError::UnexpectedPair(format!("{:?}: {}", pair.as_rule(), pair.as_str()))
}

/// Parses a complete program from source text, from raw text through to
/// the interpreter's AST.
pub fn parse_program(source: &str) -> Result<Program, ASTError> {
    use pest::Parser;

    let mut parsed = BrewinParser::parse(Rule::program, source)
        .map_err(|e| ASTError::UnexpectedPair(e.to_string()))?;
    let pair = parsed.next().expect("program rule always produces one pair");
    ast(pair)
}
