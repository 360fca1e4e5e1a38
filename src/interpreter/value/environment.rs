//! Variable storage. Brewin scoping is not a parent chain: each function
//! call gets its own activation, and an activation is a stack of blocks
//! (one per nested `{ }`). A lookup only ever searches the *current*
//! activation's blocks, innermost first; it never crosses into an enclosing
//! function's activation, and it never crosses into a caller's activation
//! either, except via whatever a lazy thunk explicitly captured.

use std::collections::HashMap;

use super::Variable;

/// The blocks of a single function activation, innermost last.
pub type Block = HashMap<String, Variable>;
pub type Blocks = Vec<Block>;

pub struct Environment {
    activations: Vec<Blocks>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Environment {
        Environment { activations: Vec::new() }
    }

    /// Pushes a new function activation. `captured` seeds it with a
    /// snapshot taken from [`snapshot_current`] (used for argument thunks
    /// and the callee's own arguments); `None` starts a fresh activation
    /// with a single empty block.
    pub fn push_func(&mut self, captured: Option<Blocks>) {
        self.activations.push(captured.unwrap_or_else(|| vec![Block::new()]));
    }

    pub fn pop_func(&mut self) {
        self.activations.pop();
    }

    pub fn push_block(&mut self) {
        self.current_mut().push(Block::new());
    }

    pub fn pop_block(&mut self) {
        self.current_mut().pop();
    }

    fn current(&self) -> &Blocks {
        self.activations.last().expect("no active function")
    }

    fn current_mut(&mut self) -> &mut Blocks {
        self.activations.last_mut().expect("no active function")
    }

    /// Declares `name` in the innermost block of the current activation.
    /// Fails if `name` is already declared in that exact block (shadowing
    /// an outer block's name is fine; redeclaring in the same block is
    /// not).
    pub fn create(&mut self, name: &str, var: Variable) -> Result<(), String> {
        let block = self
            .current_mut()
            .last_mut()
            .expect("a function activation always has at least one block");

        if block.contains_key(name) {
            return Err(format!("variable '{}' is already declared in this scope", name));
        }

        block.insert(name.to_string(), var);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.current().iter().rev().find_map(|block| block.get(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.current_mut().iter_mut().rev().find_map(|block| block.get_mut(name))
    }

    /// Captures the current activation's blocks for a lazy thunk. The
    /// clone allocates fresh block maps, so later pushes/pops/creates in
    /// the live environment never disturb a snapshot already handed out;
    /// values inside each map are cloned too, which is shallow for
    /// everything but struct handles and thunk cells (both reference
    /// counted), matching the language's by-handle aliasing.
    pub fn snapshot_current(&self) -> Blocks {
        self.current().clone()
    }
}
