//! Main entrypoint of the Brewin interpreter binary.

use std::fs;
use std::process;

use clap::Parser as ClapParser;
use log::LevelFilter;

use brewin::ast::parse_program;
use brewin::host::StdHost;
use brewin::interpreter::eval;
use brewin::{BrewinParser, Parser as PestParser, Rule};

/// Runs a Brewin program.
#[derive(ClapParser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Source file to run. Reads from stdin if omitted.
    file: Option<String>,

    /// Prints the parsed AST instead of running the program.
    #[arg(long)]
    dump_ast: bool,

    /// Prints the raw parse tree instead of running the program.
    #[arg(long)]
    dump_pairs: bool,

    /// Enables statement-level execution tracing, same as RUST_LOG=trace.
    #[arg(long)]
    trace: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.trace {
        env_logger::Builder::new().filter_level(LevelFilter::Trace).init();
    } else {
        env_logger::init();
    }

    let source = match &cli.file {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|err| {
            eprintln!("could not read '{}': {}", path, err);
            process::exit(1);
        }),
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).unwrap_or_else(|err| {
                eprintln!("could not read stdin: {}", err);
                process::exit(1);
            });
            buf
        }
    };

    if cli.dump_pairs {
        let pairs = BrewinParser::parse(Rule::program, &source).unwrap_or_else(|err| {
            eprintln!("parse error: {}", err);
            process::exit(1);
        });
        brewin::parser::utils::clean_print(pairs, 0);
        return;
    }

    let program = parse_program(&source).unwrap_or_else(|err| {
        eprintln!("parse error: {}", err);
        process::exit(1);
    });

    if cli.dump_ast {
        println!("{:#?}", program);
        return;
    }

    let mut host = StdHost::new();
    if let Err(err) = eval(&program, &mut host) {
        eprintln!("{}", err);
        process::exit(1);
    }
}
