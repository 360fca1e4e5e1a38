//! The struct type table. Struct definitions are registered in source
//! order; a struct may reference its own name or any struct declared
//! before it, but never one declared later, so there is no separate
//! forward-declaration pass.

use std::collections::HashMap;

use crate::ast::node::{Param, StructDef};
use crate::interpreter::types::{default_value_for, is_builtin_type_name, validate_type};
use crate::interpreter::value::{StructHandle, Variable};
use crate::interpreter::HostError;

pub struct StructRegistry {
    defs: HashMap<String, Vec<Param>>,
}

impl StructRegistry {
    pub fn new() -> StructRegistry {
        StructRegistry { defs: HashMap::new() }
    }

    /// Whether `name` is a struct type already registered.
    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Registers one struct definition. The name is recorded before its
    /// fields are validated, so a field may reference the struct currently
    /// being defined; fields referencing a struct not yet seen (or a bare
    /// `void`) are a type error. A struct name colliding with a built-in
    /// type is also rejected.
    pub fn define(&mut self, def: &StructDef) -> Result<(), HostError> {
        if is_builtin_type_name(&def.name) {
            return Err(HostError::Type(format!(
                "struct name '{}' collides with a built-in type",
                def.name
            )));
        }

        if self.defs.contains_key(&def.name) {
            return Err(HostError::Name(format!("struct '{}' is already defined", def.name)));
        }

        self.defs.insert(def.name.clone(), Vec::new());

        for field in &def.fields {
            validate_type(&field.var_type, self, false).map_err(|_| {
                HostError::Type(format!(
                    "struct '{}' field '{}' has an invalid type",
                    def.name, field.name
                ))
            })?;
        }

        self.defs.insert(def.name.clone(), def.fields.clone());
        Ok(())
    }

    /// Allocates a fresh instance of `name`, with every field set to its
    /// type's default value.
    pub fn new_instance(&self, name: &str) -> Result<StructHandle, HostError> {
        let fields = self
            .defs
            .get(name)
            .ok_or_else(|| HostError::Name(format!("no struct type named '{}'", name)))?;

        let mut map = HashMap::with_capacity(fields.len());
        for field in fields {
            map.insert(
                field.name.clone(),
                Variable::new(Some(field.var_type.clone()), default_value_for(&field.var_type)),
            );
        }

        Ok(std::rc::Rc::new(std::cell::RefCell::new(map)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::node::{Param, TypeName};

    fn param(name: &str, var_type: TypeName) -> Param {
        Param { name: name.to_string(), var_type }
    }

    #[test]
    fn test_self_referential_field_allowed() {
        let mut reg = StructRegistry::new();
        let def = StructDef {
            name: "N".to_string(),
            fields: vec![param("v", TypeName::Int), param("n", TypeName::Struct("N".to_string()))],
        };
        reg.define(&def).expect("self-reference should be allowed");

        let handle = reg.new_instance("N").unwrap();
        let n_field = &handle.borrow()["n"];
        match &n_field.value {
            crate::interpreter::value::Value::Struct(s) => {
                assert_eq!(s.type_name, "N");
                assert!(s.handle.is_none());
            }
            _ => panic!("expected a null struct default"),
        }
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut reg = StructRegistry::new();
        let def = StructDef {
            name: "A".to_string(),
            fields: vec![param("b", TypeName::Struct("B".to_string()))],
        };
        assert!(reg.define(&def).is_err());
    }

    #[test]
    fn test_earlier_declared_struct_allowed() {
        let mut reg = StructRegistry::new();
        reg.define(&StructDef { name: "A".to_string(), fields: vec![] }).unwrap();
        let def = StructDef {
            name: "B".to_string(),
            fields: vec![param("a", TypeName::Struct("A".to_string()))],
        };
        assert!(reg.define(&def).is_ok());
    }

    #[test]
    fn test_builtin_type_name_collision_rejected() {
        let mut reg = StructRegistry::new();
        assert!(reg.define(&StructDef { name: "int".to_string(), fields: vec![] }).is_err());
        assert!(reg.define(&StructDef { name: "void".to_string(), fields: vec![] }).is_err());
    }

    #[test]
    fn test_void_field_rejected() {
        let mut reg = StructRegistry::new();
        let def = StructDef { name: "N".to_string(), fields: vec![param("v", TypeName::Void)] };
        assert!(reg.define(&def).is_err());
    }
}
