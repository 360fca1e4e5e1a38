//! Arithmetic, comparison, logical, and unary operator semantics. Brewin is
//! strictly typed here: no numeric promotion and no string conversion.
//! Division raises the Brewin-level exception `"div0"` rather than
//! aborting, so its result is an [`Outcome`] rather than a bare `Value`.

use crate::ast::node::BinOp;
use crate::interpreter::value::{StructInstance, Value};
use crate::interpreter::{HostError, Outcome};

pub fn apply(op: BinOp, lhs: Value, rhs: Value) -> Result<Outcome<Value>, HostError> {
    use BinOp::*;

    Ok(match op {
        Add => Outcome::Value(add(lhs, rhs)?),
        Sub => Outcome::Value(Value::Int(int(lhs)? - int(rhs)?)),
        Mul => Outcome::Value(Value::Int(int(lhs)? * int(rhs)?)),
        Div => {
            let (l, r) = (int(lhs)?, int(rhs)?);
            if r == 0 {
                return Ok(Outcome::Raise("div0".to_string()));
            }
            Outcome::Value(Value::Int(l / r))
        }
        Lt => Outcome::Value(Value::Bool(int(lhs)? < int(rhs)?)),
        Le => Outcome::Value(Value::Bool(int(lhs)? <= int(rhs)?)),
        Gt => Outcome::Value(Value::Bool(int(lhs)? > int(rhs)?)),
        Ge => Outcome::Value(Value::Bool(int(lhs)? >= int(rhs)?)),
        Eq => Outcome::Value(Value::Bool(values_equal(&lhs, &rhs)?)),
        Ne => Outcome::Value(Value::Bool(!values_equal(&lhs, &rhs)?)),
        // And/Or short-circuit before either operand reaches here.
        And | Or => unreachable!("short-circuit operators are handled by the caller"),
    })
}

pub fn neg(value: Value) -> Result<Value, HostError> {
    Ok(Value::Int(-int(value)?))
}

pub fn not(value: Value) -> Result<Value, HostError> {
    Ok(Value::Bool(!bool_operand(value)?))
}

fn add(lhs: Value, rhs: Value) -> Result<Value, HostError> {
    match lhs {
        Value::Int(l) => Ok(Value::Int(l + int(rhs)?)),
        Value::Str(l) => Ok(Value::Str(l + &string(rhs)?)),
        other => Err(unexpected_type("int or string", &other)),
    }
}

/// `==`/`!=` coerce an int operand to bool when the other side is a bool
/// (the same rule applied at assignment); every other cross-type
/// comparison is just unequal, never a type error.
fn values_equal(lhs: &Value, rhs: &Value) -> Result<bool, HostError> {
    Ok(match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Bool(a), Value::Int(b)) | (Value::Int(b), Value::Bool(a)) => *a == (*b != 0),
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Nil, Value::Nil) => true,
        (Value::Nil, Value::Struct(StructInstance { handle, .. }))
        | (Value::Struct(StructInstance { handle, .. }), Value::Nil) => handle.is_none(),
        (Value::Struct(a), Value::Struct(b)) => match (&a.handle, &b.handle) {
            (None, None) => true,
            (Some(x), Some(y)) => std::rc::Rc::ptr_eq(x, y),
            _ => false,
        },
        _ => false,
    })
}

fn int(value: Value) -> Result<i64, HostError> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(unexpected_type("int", &other)),
    }
}

fn string(value: Value) -> Result<String, HostError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(unexpected_type("string", &other)),
    }
}

fn bool_operand(value: Value) -> Result<bool, HostError> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Int(n) => Ok(n != 0),
        other => Err(unexpected_type("bool", &other)),
    }
}

fn unexpected_type(expected: &str, got: &Value) -> HostError {
    HostError::Type(format!("expected {}, got '{}'", expected, got.type_name()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_div_by_zero_raises() {
        let result = apply(BinOp::Div, Value::Int(1), Value::Int(0)).unwrap();
        assert!(matches!(result, Outcome::Raise(s) if s == "div0"));
    }

    #[test]
    fn test_string_concat() {
        let result = apply(BinOp::Add, Value::Str("a".into()), Value::Str("b".into())).unwrap();
        assert!(matches!(result, Outcome::Value(Value::Str(s)) if s == "ab"));
    }

    #[test]
    fn test_int_plus_string_is_type_error() {
        assert!(apply(BinOp::Add, Value::Int(1), Value::Str("b".into())).is_err());
    }

    #[test]
    fn test_int_bool_equality_coercion() {
        let result = apply(BinOp::Eq, Value::Int(0), Value::Bool(false)).unwrap();
        assert!(matches!(result, Outcome::Value(Value::Bool(true))));
    }

    #[test]
    fn test_nil_equals_null_struct() {
        let null = Value::null_struct("N");
        let result = apply(BinOp::Eq, Value::Nil, null).unwrap();
        assert!(matches!(result, Outcome::Value(Value::Bool(true))));
    }
}
