extern crate pest;

pub mod utils;

#[derive(Parser)]
#[grammar = "parser/brewin.pest"]
pub struct BrewinParser;
