pub use brewin::{ast::parse_program, host::MockHost, interpreter::eval};

/// Parses and runs `source` against a fresh `MockHost`, returning the
/// lines it printed.
pub fn run(source: &str) -> Vec<String> {
    let program = parse_program(source).unwrap_or_else(|e| panic!("parse error: {}\n{}", e, source));
    let mut host = MockHost::default();
    eval(&program, &mut host).unwrap_or_else(|e| panic!("runtime error: {}\n{}", e, source));
    host.output
}

/// Same as [`run`], but with a queue of input lines available to
/// `inputi`/`inputs`.
pub fn run_with_input<'a>(source: &str, input: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let program = parse_program(source).unwrap_or_else(|e| panic!("parse error: {}\n{}", e, source));
    let mut host = MockHost::with_input(input);
    eval(&program, &mut host).unwrap_or_else(|e| panic!("runtime error: {}\n{}", e, source));
    host.output
}
