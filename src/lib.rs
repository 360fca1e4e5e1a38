#[macro_use]
extern crate pest_derive;

pub mod ast;
pub mod host;
pub mod interpreter;
pub mod parser;

pub use interpreter::HostError;
pub use parser::{BrewinParser, Rule};
pub use pest::Parser;
