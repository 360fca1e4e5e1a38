//! Coercion rules applied at assignment, argument binding, typed return,
//! and condition checks. Everything else is a hard type error: Brewin does
//! not do numeric promotion, string conversion, or struct upcasting.

use crate::ast::node::TypeName;
use crate::interpreter::structs::StructRegistry;
use crate::interpreter::value::Value;
use crate::interpreter::HostError;

/// The value a freshly declared variable or struct field gets before any
/// assignment.
pub fn default_value_for(var_type: &TypeName) -> Value {
    match var_type {
        TypeName::Int => Value::Int(0),
        TypeName::Bool => Value::Bool(false),
        TypeName::String => Value::Str(String::new()),
        TypeName::Void => Value::Void,
        TypeName::Struct(name) => Value::null_struct(name.clone()),
    }
}

/// Whether `name` names one of the built-in scalar/void types, which a
/// struct definition may not reuse as its own name.
pub fn is_builtin_type_name(name: &str) -> bool {
    matches!(name, "int" | "bool" | "string" | "void")
}

/// Validates a declared type against the known built-ins and the struct
/// registry. `void` is rejected unless `allow_void` is set (only a function's
/// return-type annotation may name it); a struct name must already be
/// registered.
pub fn validate_type(declared: &TypeName, structs: &StructRegistry, allow_void: bool) -> Result<(), HostError> {
    match declared {
        TypeName::Int | TypeName::Bool | TypeName::String => Ok(()),
        TypeName::Void if allow_void => Ok(()),
        TypeName::Void => Err(HostError::Type(
            "'void' may only be used as a function's return type".to_string(),
        )),
        TypeName::Struct(name) => {
            if structs.contains(name) {
                Ok(())
            } else {
                Err(HostError::Type(format!("unknown type '{}'", name)))
            }
        }
    }
}

/// Coerces `value` into something assignable to a slot declared `declared`.
/// The only coercions are int-to-bool (nonzero is true) and nil-to-struct
/// (nil becomes that struct type's null reference); everything else must
/// already match.
pub fn coerce_assign(declared: &TypeName, value: Value) -> Result<Value, HostError> {
    match (declared, value) {
        (TypeName::Int, v @ Value::Int(_)) => Ok(v),
        (TypeName::Bool, v @ Value::Bool(_)) => Ok(v),
        (TypeName::Bool, Value::Int(n)) => Ok(Value::Bool(n != 0)),
        (TypeName::String, v @ Value::Str(_)) => Ok(v),
        (TypeName::Struct(name), Value::Nil) => Ok(Value::null_struct(name.clone())),
        (TypeName::Struct(name), v @ Value::Struct(_)) => {
            let actual = match &v {
                Value::Struct(s) => &s.type_name,
                _ => unreachable!(),
            };
            if actual == name {
                Ok(v)
            } else {
                Err(HostError::Type(format!(
                    "cannot assign a value of struct type '{}' to a slot of struct type '{}'",
                    actual, name
                )))
            }
        }
        (declared, value) => Err(HostError::Type(format!(
            "cannot assign a value of type '{}' to a slot declared '{:?}'",
            value.type_name(),
            declared
        ))),
    }
}

/// Coerces a forced value into a condition's boolean, per the same
/// int-to-bool rule used at assignment.
pub fn coerce_to_bool(value: Value) -> Result<bool, HostError> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Int(n) => Ok(n != 0),
        other => Err(HostError::Type(format!(
            "expected a bool or int condition, got '{}'",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_int_to_bool_coercion() {
        assert_eq!(coerce_assign(&TypeName::Bool, Value::Int(0)).unwrap().type_name(), "bool");
        assert!(matches!(coerce_assign(&TypeName::Bool, Value::Int(5)).unwrap(), Value::Bool(true)));
        assert!(matches!(coerce_assign(&TypeName::Bool, Value::Int(0)).unwrap(), Value::Bool(false)));
    }

    #[test]
    fn test_nil_to_struct_coercion() {
        let v = coerce_assign(&TypeName::Struct("N".into()), Value::Nil).unwrap();
        match v {
            Value::Struct(s) => {
                assert_eq!(s.type_name, "N");
                assert!(s.handle.is_none());
            }
            _ => panic!("expected a null struct value"),
        }
    }

    #[test]
    fn test_mismatched_struct_type_rejected() {
        let v = Value::Struct(crate::interpreter::value::StructInstance::null("A".into()));
        assert!(coerce_assign(&TypeName::Struct("B".into()), v).is_err());
    }

    #[test]
    fn test_string_to_int_rejected() {
        assert!(coerce_assign(&TypeName::Int, Value::Str("5".into())).is_err());
    }

    #[test]
    fn test_coerce_to_bool_rejects_string() {
        assert!(coerce_to_bool(Value::Str("x".into())).is_err());
    }

    #[test]
    fn test_validate_type_rejects_void_outside_return_position() {
        let structs = StructRegistry::new();
        assert!(validate_type(&TypeName::Void, &structs, false).is_err());
        assert!(validate_type(&TypeName::Void, &structs, true).is_ok());
    }

    #[test]
    fn test_validate_type_rejects_unknown_struct() {
        let structs = StructRegistry::new();
        assert!(validate_type(&TypeName::Struct("NoSuchStruct".into()), &structs, false).is_err());
    }
}
