use super::*;
use crate::ast::parse_program;
use crate::host::MockHost;

fn run(source: &str) -> Result<Vec<String>, HostError> {
    let program = parse_program(source).expect("valid program");
    let mut host = MockHost::default();
    eval(&program, &mut host)?;
    Ok(host.output)
}

fn run_with_input<'a>(source: &str, input: impl IntoIterator<Item = &'a str>) -> Result<Vec<String>, HostError> {
    let program = parse_program(source).expect("valid program");
    let mut host = MockHost::with_input(input);
    eval(&program, &mut host)?;
    Ok(host.output)
}

#[test]
fn test_for_loop_prints_0_1_2() {
    let output = run(
        r#"
        func main() {
            var i:int;
            for (i = 0; i < 3; i = i + 1) {
                print(i);
            }
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["0", "1", "2"]);
}

#[test]
fn test_lazy_argument_never_forced() {
    let output = run(
        r#"
        func f(x:int) {
            print("called");
        }
        func main() {
            f(1/0);
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["called"]);
}

#[test]
fn test_discarded_call_return_never_forced() {
    let output = run(
        r#"
        func f(x:int) {
            return 1/0;
        }
        func main() {
            f(5);
            print("ok");
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["ok"]);
}

#[test]
fn test_print_is_all_or_nothing() {
    let program = parse_program(
        r#"
        struct N { v:int; }
        func main() {
            var n:N;
            n = new N;
            print("a", n);
        }
        "#,
    )
    .unwrap();
    let mut host = MockHost::default();
    assert!(eval(&program, &mut host).is_err());
    assert!(host.output.is_empty());
}

#[test]
fn test_struct_aliasing_shares_mutation() {
    let output = run(
        r#"
        struct N { v:int; }
        func main() {
            var a:N;
            var b:N;
            a = new N;
            b = a;
            b.v = 7;
            print(a.v);
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["7"]);
}

#[test]
fn test_try_catch_matches_by_string() {
    let output = run(
        r#"
        func main() {
            try {
                raise "oops";
            } catch "nope" {
                print("wrong");
            } catch "oops" {
                print("caught");
            }
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["caught"]);
}

#[test]
fn test_lazy_assignment_forced_by_typed_condition() {
    let output = run(
        r#"
        func main() {
            var a:int;
            a = 1/0;
            print("never");
        }
        "#,
    );
    assert!(output.is_err());
}

#[test]
fn test_untyped_assignment_not_forced() {
    let output = run(
        r#"
        func main() {
            var a;
            a = 1/0;
            print("ok");
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["ok"]);
}

#[test]
fn test_same_name_different_arity() {
    let output = run(
        r#"
        func f() { print("zero"); }
        func f(x:int) { print("one"); }
        func main() {
            f();
            f(1);
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["zero", "one"]);
}

#[test]
fn test_block_scoped_shadowing_restored() {
    let output = run(
        r#"
        func main() {
            var x:int;
            x = 1;
            if (true) {
                var x:int;
                x = 2;
                print(x);
            }
            print(x);
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["2", "1"]);
}

#[test]
fn test_self_referential_struct_field_defaults_nil() {
    let output = run(
        r#"
        struct N { v:int; n:N; }
        func main() {
            var root:N;
            root = new N;
            print(root.n == nil);
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["true"]);
}

#[test]
fn test_uncaught_exception_is_fault() {
    let result = run(
        r#"
        func main() {
            raise "boom";
        }
        "#,
    );
    assert!(matches!(result, Err(HostError::Fault(_))));
}

#[test]
fn test_inputi_reads_and_echoes_prompt() {
    let output = run_with_input(
        r#"
        func main() {
            var x:int;
            x = inputi("enter a number:");
            print(x);
        }
        "#,
        vec!["42"],
    )
    .unwrap();
    assert_eq!(output, vec!["enter a number:", "42"]);
}

#[test]
fn test_short_circuit_or_does_not_evaluate_rhs() {
    let output = run(
        r#"
        func boom():bool {
            return 1/0;
        }
        func main() {
            if (true || boom()) {
                print("short circuited");
            }
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["short circuited"]);
}

#[test]
fn test_inputi_rejects_extra_prompt_arguments() {
    let result = run_with_input(
        r#"
        func main() {
            var x:int;
            x = inputi("a", "b");
            print(x);
        }
        "#,
        vec!["42"],
    );
    assert!(matches!(result, Err(HostError::Name(msg)) if msg == "invalid number of input prompts"));
}

#[test]
fn test_inputs_rejects_extra_prompt_arguments() {
    let result = run_with_input(
        r#"
        func main() {
            var x:string;
            x = inputs("a", "b");
            print(x);
        }
        "#,
        vec!["hi"],
    );
    assert!(matches!(result, Err(HostError::Name(msg)) if msg == "invalid number of input prompts"));
}

#[test]
fn test_vardef_rejects_unknown_struct_type() {
    let result = run(
        r#"
        func main() {
            var x:NoSuchStruct;
        }
        "#,
    );
    assert!(matches!(result, Err(HostError::Type(_))));
}

#[test]
fn test_vardef_rejects_void_type() {
    let result = run(
        r#"
        func main() {
            var x:void;
        }
        "#,
    );
    assert!(matches!(result, Err(HostError::Type(_))));
}
