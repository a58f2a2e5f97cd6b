use super::*;
use crate::lexer;
use crate::parser;

fn validate_source(src: &str) -> Result<()> {
    let tokens = lexer::lex(src).expect("should lex");
    let program = parser::parse(&tokens).expect("should parse");
    validate(&program)
}

#[test]
fn test_valid_declarations() {
    let src = "void main() { int x = 10; bool flag = true; int y = x + 1; }";
    assert!(validate_source(src).is_ok());
}

#[test]
fn test_undeclared_variable() {
    let err = validate_source("void main() { x = 10; }").unwrap_err();
    assert_eq!(
        &InnerSemError::UndeclaredVariable("x".into()),
        err.inner()
    );
    assert_eq!("NameError", err.kind());
}

#[test]
fn test_redeclaration_same_scope() {
    let err = validate_source("void main() { int x = 1; int x = 2; }").unwrap_err();
    assert_eq!(&InnerSemError::Redeclaration("x".into()), err.inner());
}

#[test]
fn test_shadowing_in_inner_scope_is_legal() {
    let src = "void main() { int x = 1; { int x = 2; print(x); } print(x); }";
    assert!(validate_source(src).is_ok());
}

#[test]
fn test_type_mismatch_assignment() {
    let err = validate_source("void main() { int x = true; }").unwrap_err();
    assert_eq!(
        &InnerSemError::TypeMismatch {
            expected: Type::Int,
            got: Type::Bool
        },
        err.inner()
    );
    assert_eq!("TypeError", err.kind());
}

#[test]
fn test_arithmetic_requires_int() {
    let err = validate_source("void main() { int x = 1 + true; }").unwrap_err();
    assert_eq!(
        &InnerSemError::BinaryOperandsMustBeInt("+"),
        err.inner()
    );
}

#[test]
fn test_logical_requires_bool() {
    let err = validate_source("void main() { bool b = 1 && 2; }").unwrap_err();
    assert_eq!(
        &InnerSemError::LogicalOperandsMustBeBool("&&"),
        err.inner()
    );
}

#[test]
fn test_relational_produces_bool() {
    assert!(validate_source("void main() { bool b = 1 < 2; }").is_ok());
    let err = validate_source("void main() { int x = 1 < 2; }").unwrap_err();
    assert!(matches!(err.inner(), InnerSemError::TypeMismatch { .. }));
}

#[test]
fn test_assign_to_const() {
    let err = validate_source("const int C = 10; void main() { C = 20; }").unwrap_err();
    assert_eq!(&InnerSemError::AssignToConst("C".into()), err.inner());
    assert_eq!("NameError", err.kind());
    let rendered = err.to_string();
    assert!(
        rendered.starts_with("NameError: cannot assign to const C at line 1, col "),
        "unexpected diagnostic: {rendered}"
    );
}

#[test]
fn test_increment_of_const() {
    let err = validate_source("void main() { const int x = 5; ++x; }").unwrap_err();
    assert_eq!(&InnerSemError::AssignToConst("x".into()), err.inner());
}

#[test]
fn test_const_must_be_initialized() {
    let err = validate_source("void main() { const int x; }").unwrap_err();
    assert_eq!(&InnerSemError::ConstWithoutInit("x".into()), err.inner());
}

#[test]
fn test_const_may_be_read() {
    assert!(validate_source("void main() { const int x = 10; int y = x; print(y); }").is_ok());
}

#[test]
fn test_function_hoisting() {
    let src = "void main() { helper(); } void helper() { print(1); }";
    assert!(validate_source(src).is_ok());
}

#[test]
fn test_call_arity() {
    let err =
        validate_source("int add(int a, int b) { return a + b; } void main() { add(1); }")
            .unwrap_err();
    assert_eq!(
        &InnerSemError::ArityMismatch {
            name: "add".into(),
            expected: 2,
            got: 1
        },
        err.inner()
    );
    assert_eq!("ArityError", err.kind());
}

#[test]
fn test_call_param_types() {
    let err = validate_source("int id(int a) { return a; } void main() { id(true); }")
        .unwrap_err();
    assert!(matches!(err.inner(), InnerSemError::TypeMismatch { .. }));
}

#[test]
fn test_array_rules() {
    assert!(validate_source("void main() { int a[5]; a[0] = 1; print(a[0]); }").is_ok());

    let err = validate_source("void main() { int x = 1; x[0] = 2; }").unwrap_err();
    assert_eq!(&InnerSemError::NotAnArray("x".into()), err.inner());

    let err = validate_source("void main() { int a[5]; a[true] = 1; }").unwrap_err();
    assert_eq!(
        &InnerSemError::ArrayIndexMustBeInt(Type::Bool),
        err.inner()
    );

    let err = validate_source("void main() { int a[0]; }").unwrap_err();
    assert_eq!(
        &InnerSemError::ArraySizeMustBePositive("a".into()),
        err.inner()
    );
}

#[test]
fn test_break_outside_loop() {
    let err = validate_source("void main() { break; }").unwrap_err();
    assert_eq!(&InnerSemError::BreakOutsideOfLoop, err.inner());
    assert_eq!("ControlFlowError", err.kind());
}

#[test]
fn test_continue_inside_loop_is_legal() {
    assert!(
        validate_source("void main() { while (1 < 2) { continue; } }").is_ok()
    );
}

#[test]
fn test_missing_return() {
    let err = validate_source("int f() { print(1); } void main() { print(f()); }").unwrap_err();
    assert_eq!(&InnerSemError::MissingReturn("f".into()), err.inner());
    assert_eq!("ReturnError", err.kind());
}

#[test]
fn test_return_on_both_if_arms() {
    let src = "int sign(int n) { if (n < 0) { return 0 - 1; } else { return 1; } } void main() { print(sign(3)); }";
    assert!(validate_source(src).is_ok());
}

#[test]
fn test_missing_main() {
    let err = validate_source("void helper() { print(1); }").unwrap_err();
    assert_eq!(&InnerSemError::MissingMain, err.inner());
}

#[test]
fn test_bad_main_signature() {
    let err = validate_source("int main(int argc) { return argc; }").unwrap_err();
    assert_eq!(&InnerSemError::BadMainSignature, err.inner());
}

#[test]
fn test_print_requires_int() {
    let err = validate_source("void main() { print(true); }").unwrap_err();
    assert_eq!(&InnerSemError::PrintRequiresInt(Type::Bool), err.inner());
}

#[test]
fn test_read_int_is_int() {
    assert!(validate_source("void main() { int x = readInt(); print(x); }").is_ok());
}

#[test]
fn test_float_literal_rejected() {
    let err = validate_source("void main() { 3.14; }").unwrap_err();
    assert_eq!(&InnerSemError::FloatUnsupported, err.inner());
}

#[test]
fn test_global_init_must_be_constant() {
    let err = validate_source("int g = readInt(); void main() { print(g); }").unwrap_err();
    assert_eq!(&InnerSemError::NonConstantInit("g".into()), err.inner());
}

#[test]
fn test_global_visible_in_all_functions() {
    let src = "int counter = 0; void bump() { counter = counter + 1; } void main() { bump(); print(counter); }";
    assert!(validate_source(src).is_ok());
}
