use super::*;
use crate::lexer;
use crate::parser;
use crate::semantic_analysis;

fn lower_source(src: &str) -> IrProgram {
    let tokens = lexer::lex(src).expect("should lex");
    let program = parser::parse(&tokens).expect("should parse");
    semantic_analysis::validate(&program).expect("should validate");
    lower(&program)
}

fn body_of<'a>(program: &'a IrProgram, name: &str) -> &'a Instructions {
    program
        .functions()
        .find(|f| f.name == name)
        .map(|f| &f.body)
        .expect("function should exist")
}

fn var(name: &str) -> Value {
    Value::Var(name.into())
}

#[test]
fn test_arithmetic_lowering() {
    let program = lower_source("void main() { int x = 1 + 2 * 3; }");
    let expected = vec![
        Instruction::Binary {
            op: BinaryOp::Mul,
            dst: "t0".into(),
            src1: Value::Constant(2),
            src2: Value::Constant(3),
        },
        Instruction::Binary {
            op: BinaryOp::Add,
            dst: "t1".into(),
            src1: Value::Constant(1),
            src2: var("t0"),
        },
        Instruction::Mov {
            dst: "x_0".into(),
            src: var("t1"),
        },
        Instruction::Return(None),
    ];
    assert_eq!(&expected, body_of(&program, "main"));
}

#[test]
fn test_if_else_shape() {
    let program = lower_source("void main() { if (1 < 2) print(1); else print(2); }");
    let expected = vec![
        Instruction::Binary {
            op: BinaryOp::Lt,
            dst: "t0".into(),
            src1: Value::Constant(1),
            src2: Value::Constant(2),
        },
        Instruction::JumpIfFalse(var("t0"), "L0".into()),
        Instruction::Print(Value::Constant(1)),
        Instruction::Jump("L1".into()),
        Instruction::Label("L0".into()),
        Instruction::Print(Value::Constant(2)),
        Instruction::Label("L1".into()),
        Instruction::Return(None),
    ];
    assert_eq!(&expected, body_of(&program, "main"));
}

#[test]
fn test_while_shape() {
    let program = lower_source("void main() { int i = 0; while (i < 3) { ++i; } }");
    let expected = vec![
        Instruction::Mov {
            dst: "i_0".into(),
            src: Value::Constant(0),
        },
        Instruction::Label("L0".into()),
        Instruction::Binary {
            op: BinaryOp::Lt,
            dst: "t0".into(),
            src1: var("i_0"),
            src2: Value::Constant(3),
        },
        Instruction::JumpIfFalse(var("t0"), "L1".into()),
        Instruction::Binary {
            op: BinaryOp::Add,
            dst: "t1".into(),
            src1: var("i_0"),
            src2: Value::Constant(1),
        },
        Instruction::Mov {
            dst: "i_0".into(),
            src: var("t1"),
        },
        Instruction::Jump("L0".into()),
        Instruction::Label("L1".into()),
        Instruction::Return(None),
    ];
    assert_eq!(&expected, body_of(&program, "main"));
}

#[test]
fn test_for_shape_and_continue_target() {
    let program = lower_source("void main() { for (int i = 0; i < 3; ++i) { continue; } }");
    let body = body_of(&program, "main");
    // head, continue and end labels in allocation order
    assert!(body.contains(&Instruction::Label("L0".into())));
    assert!(body.contains(&Instruction::Label("L1".into())));
    assert!(body.contains(&Instruction::Label("L2".into())));
    // continue jumps to the update label, not the head
    assert!(body.contains(&Instruction::Jump("L1".into())));
    // the update jumps back to the head
    assert!(body.contains(&Instruction::Jump("L0".into())));
    // the condition exits to the end label
    assert!(body
        .iter()
        .any(|i| matches!(i, Instruction::JumpIfFalse(_, l) if l == "L2")));
}

#[test]
fn test_break_jumps_to_loop_end() {
    let program = lower_source("void main() { while (1 < 2) { break; } }");
    let body = body_of(&program, "main");
    let breaks: Vec<_> = body
        .iter()
        .filter(|i| matches!(i, Instruction::Jump(l) if l == "L1"))
        .collect();
    // the break itself; the loop back-edge targets L0
    assert_eq!(1, breaks.len());
}

#[test]
fn test_shadowing_gets_distinct_suffixes() {
    let program =
        lower_source("void main() { int x = 999; { int x = 111; print(x); } print(x); }");
    let expected = vec![
        Instruction::Mov {
            dst: "x_0".into(),
            src: Value::Constant(999),
        },
        Instruction::Mov {
            dst: "x_1".into(),
            src: Value::Constant(111),
        },
        Instruction::Print(var("x_1")),
        Instruction::Print(var("x_0")),
        Instruction::Return(None),
    ];
    assert_eq!(&expected, body_of(&program, "main"));
}

#[test]
fn test_shortcircuit_and() {
    let program = lower_source("void main() { bool b = true && false; }");
    let expected = vec![
        Instruction::JumpIfFalse(Value::Constant(1), "L0".into()),
        Instruction::JumpIfFalse(Value::Constant(0), "L0".into()),
        Instruction::Mov {
            dst: "t0".into(),
            src: Value::Constant(1),
        },
        Instruction::Jump("L1".into()),
        Instruction::Label("L0".into()),
        Instruction::Mov {
            dst: "t0".into(),
            src: Value::Constant(0),
        },
        Instruction::Label("L1".into()),
        Instruction::Mov {
            dst: "b_0".into(),
            src: var("t0"),
        },
        Instruction::Return(None),
    ];
    assert_eq!(&expected, body_of(&program, "main"));
}

#[test]
fn test_shortcircuit_or_skips_rhs() {
    let program = lower_source("void main() { bool b = true || false; }");
    let body = body_of(&program, "main");
    // the first true-arm write happens before the rhs label
    let rhs_label_at = body
        .iter()
        .position(|i| matches!(i, Instruction::Label(l) if l == "L0"))
        .expect("rhs label present");
    let first_write = body
        .iter()
        .position(|i| matches!(i, Instruction::Mov { dst, .. } if dst == "t0"))
        .expect("result write present");
    assert!(first_write < rhs_label_at);
}

#[test]
fn test_call_pushes_params_right_to_left() {
    let program = lower_source(
        "int add(int a, int b) { return a + b; } void main() { print(add(1, 2)); }",
    );
    let expected = vec![
        Instruction::Param(Value::Constant(2)),
        Instruction::Param(Value::Constant(1)),
        Instruction::Call {
            dst: "t0".into(),
            name: "add".into(),
            arity: 2,
        },
        Instruction::Print(var("t0")),
        Instruction::Return(None),
    ];
    assert_eq!(&expected, body_of(&program, "main"));
}

#[test]
fn test_function_params_are_renamed() {
    let program = lower_source("int id(int n) { return n; } void main() { print(id(4)); }");
    let id = program
        .functions()
        .find(|f| f.name == "id")
        .expect("id exists");
    assert_eq!(vec![String::from("n_0")], id.params);
    assert_eq!(
        &vec![Instruction::Return(Some(var("n_0")))],
        &id.body
    );
}

#[test]
fn test_post_increment_yields_old_value() {
    let program = lower_source("void main() { int i = 5; int j = i++; print(j); }");
    let expected = vec![
        Instruction::Mov {
            dst: "i_0".into(),
            src: Value::Constant(5),
        },
        Instruction::Mov {
            dst: "t0".into(),
            src: var("i_0"),
        },
        Instruction::Binary {
            op: BinaryOp::Add,
            dst: "t1".into(),
            src1: var("i_0"),
            src2: Value::Constant(1),
        },
        Instruction::Mov {
            dst: "i_0".into(),
            src: var("t1"),
        },
        Instruction::Mov {
            dst: "j_1".into(),
            src: var("t0"),
        },
        Instruction::Print(var("j_1")),
        Instruction::Return(None),
    ];
    assert_eq!(&expected, body_of(&program, "main"));
}

#[test]
fn test_array_element_increment() {
    let program = lower_source("void main() { int a[5]; ++a[0]; }");
    let body = body_of(&program, "main");
    assert!(body.contains(&Instruction::Alloca {
        name: "a_0".into(),
        size: 5
    }));
    assert!(body
        .iter()
        .any(|i| matches!(i, Instruction::ArrayLoad { .. })));
    assert!(body
        .iter()
        .any(|i| matches!(i, Instruction::ArrayStore { .. })));
}

#[test]
fn test_unary_minus_is_sub_from_zero() {
    let program = lower_source("void main() { int x = -5; print(x); }");
    let body = body_of(&program, "main");
    assert!(body.contains(&Instruction::Binary {
        op: BinaryOp::Sub,
        dst: "t0".into(),
        src1: Value::Constant(0),
        src2: Value::Constant(5),
    }));
}

#[test]
fn test_globals_become_statics() {
    let program = lower_source("const int M = 5; int g = -3; void main() { print(M + g); }");
    let statics: Vec<_> = program.statics().collect();
    assert_eq!(2, statics.len());
    assert_eq!(
        &StaticVariable {
            name: "M_0".into(),
            init: 5,
            slots: 1
        },
        statics[0]
    );
    assert_eq!(
        &StaticVariable {
            name: "g_1".into(),
            init: -3,
            slots: 1
        },
        statics[1]
    );
}

#[test]
fn test_non_void_fallthrough_returns_zero() {
    let program = lower_source(
        "int f() { while (1 < 2) { return 3; } } void main() { print(f()); }",
    );
    let body = body_of(&program, "f");
    assert_eq!(
        Some(&Instruction::Return(Some(Value::Constant(0)))),
        body.last()
    );
}

#[test]
fn test_read_int_lowering() {
    let program = lower_source("void main() { int x = readInt(); print(x); }");
    let expected = vec![
        Instruction::ReadInt { dst: "t0".into() },
        Instruction::Mov {
            dst: "x_0".into(),
            src: var("t0"),
        },
        Instruction::Print(var("x_0")),
        Instruction::Return(None),
    ];
    assert_eq!(&expected, body_of(&program, "main"));
}
