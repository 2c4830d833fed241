use ram::error::{ArgumentFault, ArithmeticFault, ErrorKind, NameFault, ResourceFault, TypeFault};
use ram::{load, run_captured, Config, Evaluator, RunOutcome};

fn run(source: &str) -> RunOutcome {
    run_captured(source, "", &Config::default())
}

fn run_with_input(source: &str, input: &str) -> RunOutcome {
    run_captured(source, input, &Config::default())
}

/// Wraps statement lines in a `main` function and calls it.
fn main_body(body: &str) -> String {
    format!(
        "new function main takes (none) {{\n{}\n}}\n\ncall main[none=0]\n",
        body
    )
}

fn output_of(source: &str) -> Vec<String> {
    let outcome = run(source);
    if let Err(error) = &outcome.result {
        panic!("program failed: {} ({})", error.message, error.kind);
    }
    outcome.output
}

fn error_kind(source: &str) -> ErrorKind {
    match run(source).result {
        Ok(()) => panic!("expected the program to fail"),
        Err(error) => error.kind,
    }
}

// ============================================================================
// Sample programs
// ============================================================================

#[test]
fn sum_numbers_program() {
    assert_eq!(output_of(include_str!("programs/sum_numbers.ram")), vec!["55"]);
}

#[test]
fn equals_program() {
    assert_eq!(
        output_of(include_str!("programs/equals.ram")),
        vec!["true", "false"]
    );
}

#[test]
fn countdown_program() {
    assert_eq!(
        output_of(include_str!("programs/countdown.ram")),
        vec!["5", "18"]
    );
}

#[test]
fn greeting_program_reads_console() {
    let outcome = run_with_input(include_str!("programs/greeting.ram"), "Ada\n30\n");
    assert!(outcome.result.is_ok());
    // prompts carry no newline of their own
    assert_eq!(
        outcome.output,
        vec!["What is your name? Age? Hello Ada", "thirty"]
    );
}

#[test]
fn recursive_sum_matches_closed_form() {
    let source = |n: i64| {
        format!(
            "new function sum takes (n) {{\n\
             if n is 0 {{\n\
             send back 0\n\
             }}\n\
             send back n + sum[n=n-1]\n\
             }}\n\
             new function main takes (none) {{\n\
             display sum[n={}]\n\
             }}\n\
             call main[none=0]\n",
            n
        )
    };
    for n in [0, 1, 7, 100, 300] {
        assert_eq!(output_of(&source(n)), vec![(n * (n + 1) / 2).to_string()]);
    }
}

// ============================================================================
// Scoping
// ============================================================================

#[test]
fn loop_with_empty_range_never_runs() {
    assert_eq!(
        output_of(&main_body("loop with i from 5 to 1 {\n    display i\n}\ndisplay \"done\"")),
        vec!["done"]
    );
}

#[test]
fn loop_bounds_are_inclusive() {
    assert_eq!(
        output_of(&main_body("loop with i from 2 to 4 {\n    display i\n}")),
        vec!["2", "3", "4"]
    );
}

#[test]
fn loop_locals_are_fresh_each_iteration() {
    assert_eq!(
        output_of(&main_body(
            "loop with i from 1 to 3 {\n    set integer doubled to i * 2\n    display doubled\n}"
        )),
        vec!["2", "4", "6"]
    );
}

#[test]
fn loop_variable_is_gone_after_loop() {
    let outcome = run(&main_body("loop with i from 1 to 2 {\n    display i\n}\ndisplay i"));
    assert_eq!(outcome.output, vec!["1", "2"]);
    let error = outcome.result.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Name(NameFault::Undeclared));
    assert!(error.message.contains("Undeclared variable 'i'"));
}

#[test]
fn loop_body_locals_are_gone_after_loop() {
    let outcome = run(&main_body(
        "loop with i from 1 to 3 {\n    set integer t to i\n}\ndisplay t",
    ));
    let error = outcome.result.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Name(NameFault::Undeclared));
    assert!(error.message.contains("'t'"));
}

#[test]
fn loop_body_locals_of_an_empty_loop_are_undeclared() {
    assert_eq!(
        error_kind(&main_body(
            "loop with i from 5 to 1 {\n    set integer t to i\n}\ndisplay t"
        )),
        ErrorKind::Name(NameFault::Undeclared)
    );
}

#[test]
fn block_locals_do_not_leak() {
    assert_eq!(
        error_kind(&main_body("if true {\n    set integer x to 1\n}\ndisplay x")),
        ErrorKind::Name(NameFault::Undeclared)
    );
}

#[test]
fn inner_declaration_shadows_outer() {
    assert_eq!(
        output_of(&main_body(
            "set integer x to 1\nif true {\n    set integer x to 2\n    display x\n}\ndisplay x"
        )),
        vec!["2", "1"]
    );
}

#[test]
fn reset_updates_enclosing_binding() {
    assert_eq!(
        output_of(&main_body(
            "set integer x to 1\nif true {\n    reset integer x to 5\n}\ndisplay x"
        )),
        vec!["5"]
    );
}

#[test]
fn reset_of_undeclared_variable_fails() {
    let outcome = run(&main_body("reset integer y to 3"));
    let error = outcome.result.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Name(NameFault::Undeclared));
    assert!(error.help.is_some());
}

#[test]
fn declaring_twice_in_one_scope_fails() {
    assert_eq!(
        error_kind(&main_body("set integer x to 1\nset integer x to 2")),
        ErrorKind::Name(NameFault::AlreadyDeclaredInScope)
    );
}

#[test]
fn redeclaring_a_parameter_fails() {
    let source = "new function f takes (x) {\n    set integer x to 2\n}\ncall f[x=1]\n";
    assert_eq!(
        error_kind(source),
        ErrorKind::Name(NameFault::AlreadyDeclaredInScope)
    );
}

#[test]
fn callee_cannot_see_caller_locals() {
    let source = "new function peek takes (none) {\n    display secret\n}\n\
                  new function main takes (none) {\n    set integer secret to 42\n    call peek[none=0]\n}\n\
                  call main[none=0]\n";
    assert_eq!(error_kind(source), ErrorKind::Name(NameFault::Undeclared));
}

#[test]
fn callee_changes_do_not_reach_caller() {
    let source = "new function bump takes (x) {\n    reset integer x to x + 1\n    display x\n}\n\
                  new function main takes (none) {\n    set integer x to 1\n    call bump[x=x]\n    display x\n}\n\
                  call main[none=0]\n";
    assert_eq!(output_of(source), vec!["2", "1"]);
}

// ============================================================================
// Values and operators
// ============================================================================

#[test]
fn arithmetic_precedence() {
    assert_eq!(
        output_of(&main_body("display 2 + 3 * 4\ndisplay (2 + 3) * 4\ndisplay 10 - 4 - 3\ndisplay 7 / 2")),
        vec!["14", "20", "3", "3"]
    );
}

#[test]
fn text_concatenation() {
    assert_eq!(
        output_of(&main_body("set text a to \"ab\"\ndisplay a + \"cd\" + \"\"")),
        vec!["abcd"]
    );
}

#[test]
fn booleans_display_as_words() {
    assert_eq!(
        output_of(&main_body("display true\ndisplay 1 is 2\ndisplay \"a\" is \"a\"")),
        vec!["true", "false", "true"]
    );
}

#[test]
fn adding_text_to_integer_fails() {
    assert_eq!(
        error_kind(&main_body("display 1 + \"1\"")),
        ErrorKind::Type(TypeFault::IncompatibleOperands)
    );
}

#[test]
fn comparing_different_kinds_fails() {
    assert_eq!(
        error_kind(&main_body("display 1 is true")),
        ErrorKind::Type(TypeFault::IncompatibleOperands)
    );
}

#[test]
fn non_boolean_condition_fails() {
    assert_eq!(
        error_kind(&main_body("if 1 {\n    display 1\n}")),
        ErrorKind::Type(TypeFault::ExpectedBoolean)
    );
}

#[test]
fn non_integer_loop_bound_fails() {
    assert_eq!(
        error_kind(&main_body("loop with i from \"1\" to 3 {\n}")),
        ErrorKind::Type(TypeFault::ExpectedInteger)
    );
}

#[test]
fn division_by_zero_fails() {
    assert_eq!(
        error_kind(&main_body("display 1 / 0")),
        ErrorKind::Arithmetic(ArithmeticFault::DivisionByZero)
    );
}

#[test]
fn overflow_is_reported() {
    assert_eq!(
        error_kind(&main_body("display 9223372036854775807 + 1")),
        ErrorKind::Arithmetic(ArithmeticFault::Overflow)
    );
}

#[test]
fn logical_operators_short_circuit() {
    // the right side would fail if it ran
    assert_eq!(
        output_of(&main_body("display false and 1 / 0 is 1\ndisplay true or 1 / 0 is 1")),
        vec!["false", "true"]
    );
}

#[test]
fn logical_operators_need_booleans() {
    assert_eq!(
        error_kind(&main_body("display true and 1")),
        ErrorKind::Type(TypeFault::ExpectedBoolean)
    );
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn keyword_arguments_ignore_order() {
    let source = "new function minus takes (a, b) {\n    send back a - b\n}\n\
                  new function main takes (none) {\n    display minus[a=10,b=3]\n    display minus[b=3,a=10]\n}\n\
                  call main[none=0]\n";
    assert_eq!(output_of(source), vec!["7", "7"]);
}

#[test]
fn send_back_inside_loop_ends_the_call() {
    let source = "new function first_over takes (limit) {\n\
                  loop with i from 1 to 100 {\n\
                  if i * i is limit {\n\
                  send back i\n\
                  }\n\
                  }\n\
                  send back 0\n\
                  }\n\
                  new function main takes (none) {\n    display first_over[limit=49]\n}\n\
                  call main[none=0]\n";
    assert_eq!(output_of(source), vec!["7"]);
}

#[test]
fn unknown_function_fails() {
    assert_eq!(
        error_kind("call nowhere[x=1]\n"),
        ErrorKind::Name(NameFault::UnknownFunction)
    );
}

#[test]
fn missing_argument_fails() {
    let source = "new function f takes (a, b) {\n    display a\n}\ncall f[a=1]\n";
    let error = run(source).result.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Argument(ArgumentFault::MissingParameter));
    assert!(error.message.contains("'b'"));
}

#[test]
fn unknown_argument_fails() {
    let source = "new function f takes (a) {\n    display a\n}\ncall f[a=1,c=2]\n";
    assert_eq!(
        error_kind(source),
        ErrorKind::Argument(ArgumentFault::UnknownParameter)
    );
}

#[test]
fn function_without_send_back_has_no_value() {
    let source = "new function quiet takes (none) {\n    display 1\n}\n\
                  new function main takes (none) {\n    set integer x to quiet[none=0]\n}\n\
                  call main[none=0]\n";
    let outcome = run(source);
    assert_eq!(outcome.output, vec!["1"]);
    assert_eq!(
        outcome.result.unwrap_err().kind,
        ErrorKind::Type(TypeFault::NoReturnValue)
    );
}

#[test]
fn duplicate_function_is_rejected_before_running() {
    let source = "new function f takes (none) {\n    display 1\n}\n\
                  new function f takes (x) {\n    display 2\n}\n\
                  call f[none=0]\n";
    let outcome = run(source);
    assert!(outcome.output.is_empty());
    assert_eq!(
        outcome.result.unwrap_err().kind,
        ErrorKind::Name(NameFault::DuplicateFunction)
    );
}

#[test]
fn built_in_names_cannot_be_redefined() {
    let source = "new function GET_TEXT takes (m) {\n    send back m\n}\ncall GET_TEXT[m=\"x\"]\n";
    assert_eq!(
        error_kind(source),
        ErrorKind::Name(NameFault::DuplicateFunction)
    );
}

#[test]
fn runaway_recursion_exhausts_the_stack() {
    let source = "new function down takes (n) {\n    display n\n    call down[n=n+1]\n}\ncall down[n=1]\n";
    let config = Config::default().with_max_call_depth(40);
    let outcome = run_captured(source, "", &config);

    // output produced before the failure is kept
    assert_eq!(outcome.output.len(), 40);
    assert_eq!(outcome.output[39], "40");
    assert_eq!(outcome.exit_status(), 1);
    assert_eq!(
        outcome.result.unwrap_err().kind,
        ErrorKind::Resource(ResourceFault::StackExhausted)
    );
}

fn counting_program(depth: usize) -> String {
    format!(
        "new function count takes (n) {{\n\
         if n is 1 {{\n\
         send back 1\n\
         }}\n\
         send back 1 + count[n=n-1]\n\
         }}\n\
         new function main takes (none) {{\n\
         display count[n={}]\n\
         }}\n\
         call main[none=0]\n",
        depth
    )
}

#[test]
fn recursion_up_to_the_default_limit_succeeds() {
    // main plus 999 nested calls sits exactly at the default limit of 1000
    assert_eq!(output_of(&counting_program(999)), vec!["999"]);
}

#[test]
fn recursion_past_the_default_limit_is_reported() {
    let outcome = run(&counting_program(5000));
    assert!(outcome.output.is_empty());
    assert_eq!(
        outcome.result.unwrap_err().kind,
        ErrorKind::Resource(ResourceFault::StackExhausted)
    );
}

#[test]
fn output_before_a_failure_is_kept() {
    let outcome = run(&main_body("display \"before\"\ndisplay 1 / 0\ndisplay \"after\""));
    assert_eq!(outcome.output, vec!["before"]);
    assert_eq!(outcome.exit_status(), 1);
}

#[test]
fn load_errors_run_nothing() {
    let outcome = run(&main_body("display \"never\"\ndisplay 1 +"));
    assert!(outcome.output.is_empty());
    assert!(outcome.result.unwrap_err().kind.is_load_error());
}

#[test]
fn successful_run_exits_cleanly() {
    let outcome = run(&main_body("display 1"));
    assert_eq!(outcome.exit_status(), 0);
}

// ============================================================================
// Built-ins
// ============================================================================

#[test]
fn get_text_prompts_and_reads_a_line() {
    let outcome = run_with_input(
        &main_body("set text name to GET_TEXT[m=\"Name: \"]\ndisplay name"),
        "Grace Hopper\r\nignored\n",
    );
    assert!(outcome.result.is_ok());
    assert_eq!(outcome.output, vec!["Name: Grace Hopper"]);
}

#[test]
fn get_number_reads_an_integer() {
    let outcome = run_with_input(
        &main_body("set integer n to GET_NUMBER[m=\"\"]\ndisplay n * 2"),
        " 21 \n",
    );
    assert!(outcome.result.is_ok());
    assert_eq!(outcome.output, vec!["42"]);
}

#[test]
fn get_number_rejects_words() {
    let outcome = run_with_input(&main_body("display GET_NUMBER[m=\"\"]"), "twelve\n");
    assert_eq!(
        outcome.result.unwrap_err().kind,
        ErrorKind::Type(TypeFault::NotANumber)
    );
}

#[test]
fn convert_number_parses_text() {
    assert_eq!(
        output_of(&main_body("display CONVERT_NUMBER[arg=\"-17\"] + 1")),
        vec!["-16"]
    );
}

#[test]
fn convert_number_needs_text() {
    assert_eq!(
        error_kind(&main_body("display CONVERT_NUMBER[arg=5]")),
        ErrorKind::Type(TypeFault::ExpectedText)
    );
}

#[test]
fn convert_number_rejects_garbage() {
    assert_eq!(
        error_kind(&main_body("display CONVERT_NUMBER[arg=\"12abc\"]")),
        ErrorKind::Type(TypeFault::NotANumber)
    );
}

#[test]
fn built_ins_check_their_argument_name() {
    assert_eq!(
        error_kind(&main_body("display GET_TEXT[prompt=\"x\"]")),
        ErrorKind::Argument(ArgumentFault::MissingParameter)
    );
}

#[test]
fn reading_past_end_of_input_fails() {
    let outcome = run_with_input(&main_body("display GET_TEXT[m=\"> \"]"), "");
    assert_eq!(
        outcome.result.unwrap_err().kind,
        ErrorKind::Resource(ResourceFault::InputExhausted)
    );
}

// ============================================================================
// Host interface
// ============================================================================

#[test]
fn evaluator_can_run_a_program_twice() {
    let program = load(&main_body("set integer x to 3\ndisplay x")).unwrap();
    let mut buffer = Vec::new();
    {
        let mut evaluator = Evaluator::new("".as_bytes(), &mut buffer);
        evaluator.execute(&program).unwrap();
        // globals and functions are reset on each run
        evaluator.execute(&program).unwrap();
    }
    assert_eq!(String::from_utf8(buffer).unwrap(), "3\n3\n");
}

#[test]
fn top_level_calls_run_in_order() {
    let source = "new function say takes (w) {\n    display w\n}\n\
                  call say[w=\"one\"]\nsay[w=\"two\"]\ncall say[w=\"three\"]\n";
    assert_eq!(output_of(source), vec!["one", "two", "three"]);
}
