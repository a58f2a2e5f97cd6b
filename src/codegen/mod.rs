//! x86-64 code generation: lowers optimized TAC into an assembly AST with
//! every operand resolved to a register, an immediate, a frame slot or a
//! static reference. Rendering to NASM text lives in [`crate::emission`].
//!
//! Every value travels through `rax`; there is no register allocation
//! beyond the scratch registers the templates name (`rbx`, `rcx`, `rdx`).
//! Arguments are pushed right-to-left and the caller cleans the stack.

mod frame;

use crate::ir::{
    BinaryOp, Instruction, InternalError, IrFunction, IrProgram, StaticVariable, Value,
};
use std::collections::{HashMap, HashSet};

pub type Identifier = String;
pub type AsmInstructions = Vec<AsmInstruction>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmProgram {
    pub statics: Vec<StaticVariable>,
    pub functions: Vec<AsmFunction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmFunction {
    pub name: Identifier,
    pub frame_size: i64,
    pub body: AsmInstructions,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    Ax,
    Bx,
    Cx,
    Dx,
    Si,
    Di,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Imm(i64),
    Reg(Register),
    /// Unresolved variable; replaced by `Stack`/`Data` before emission.
    Pseudo(Identifier),
    /// Signed offset from `rbp`; negative offsets are locals.
    Stack(i64),
    /// RIP-relative static storage.
    Data(Identifier),
    /// Memory through a register, `[rcx]`.
    Indirect(Register),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AsmBinaryOp {
    Add,
    Sub,
    Imul,
    And,
    Or,
    Xor,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    E,
    Ne,
    L,
    Le,
    G,
    Ge,
}

/// Operand order is Intel: destination first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmInstruction {
    Mov(Operand, Operand),
    Lea(Register, Operand),
    Binary(AsmBinaryOp, Operand, Operand),
    Shl(Operand, i64),
    Sar(Operand, i64),
    Cqo,
    Idiv(Operand),
    Cmp(Operand, Operand),
    /// `set<cc> al`
    SetCC(Condition),
    /// `movzx rax, al`
    Movzx,
    Jmp(Identifier),
    JmpCC(Condition, Identifier),
    Label(Identifier),
    Push(Operand),
    Call(Identifier),
    AllocateStack(i64),
    DeallocateStack(i64),
    Ret,
}

impl From<&Value> for Operand {
    fn from(value: &Value) -> Self {
        match value {
            Value::Constant(c) => Self::Imm(*c),
            Value::Var(name) => Self::Pseudo(name.clone()),
        }
    }
}

impl TryFrom<BinaryOp> for Condition {
    type Error = ();
    fn try_from(op: BinaryOp) -> Result<Self, ()> {
        match op {
            BinaryOp::Lt => Ok(Self::L),
            BinaryOp::Le => Ok(Self::Le),
            BinaryOp::Gt => Ok(Self::G),
            BinaryOp::Ge => Ok(Self::Ge),
            BinaryOp::Eq => Ok(Self::E),
            BinaryOp::Neq => Ok(Self::Ne),
            _ => Err(()),
        }
    }
}

fn exit_label(name: &str) -> Identifier {
    format!("exit_{name}")
}

/// `mov rax, <src>; mov <dst>, rax`
fn store_via_rax(out: &mut AsmInstructions, dst: Operand, src: Operand) {
    out.push(AsmInstruction::Mov(Operand::Reg(Register::Ax), src));
    out.push(AsmInstruction::Mov(dst, Operand::Reg(Register::Ax)));
}

/// Compute the address of `array[index]` into `rcx`.
fn array_slot_to_rcx(out: &mut AsmInstructions, array: &str, index: &Value) {
    out.push(AsmInstruction::Mov(
        Operand::Reg(Register::Ax),
        Operand::from(index),
    ));
    out.push(AsmInstruction::Binary(
        AsmBinaryOp::Imul,
        Operand::Reg(Register::Ax),
        Operand::Imm(8),
    ));
    out.push(AsmInstruction::Lea(
        Register::Cx,
        Operand::Pseudo(array.to_owned()),
    ));
    out.push(AsmInstruction::Binary(
        AsmBinaryOp::Add,
        Operand::Reg(Register::Cx),
        Operand::Reg(Register::Ax),
    ));
}

fn translate_binary(
    out: &mut AsmInstructions,
    op: BinaryOp,
    dst: &str,
    src1: &Value,
    src2: &Value,
) -> Result<(), InternalError> {
    let ax = Operand::Reg(Register::Ax);
    let dst = Operand::Pseudo(dst.to_owned());

    if let Ok(condition) = Condition::try_from(op) {
        // cmp; set<cc> al; movzx rax, al
        out.push(AsmInstruction::Mov(ax.clone(), Operand::from(src1)));
        out.push(AsmInstruction::Cmp(ax.clone(), Operand::from(src2)));
        out.push(AsmInstruction::SetCC(condition));
        out.push(AsmInstruction::Movzx);
        out.push(AsmInstruction::Mov(dst, ax));
        return Ok(());
    }

    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::And | BinaryOp::Or => {
            let asm_op = match op {
                BinaryOp::Add => AsmBinaryOp::Add,
                BinaryOp::Sub => AsmBinaryOp::Sub,
                BinaryOp::Mul => AsmBinaryOp::Imul,
                BinaryOp::And => AsmBinaryOp::And,
                _ => AsmBinaryOp::Or,
            };
            let bx = Operand::Reg(Register::Bx);
            out.push(AsmInstruction::Mov(ax.clone(), Operand::from(src1)));
            out.push(AsmInstruction::Mov(bx.clone(), Operand::from(src2)));
            out.push(AsmInstruction::Binary(asm_op, ax.clone(), bx));
            out.push(AsmInstruction::Mov(dst, ax));
        }
        BinaryOp::Div | BinaryOp::Mod => {
            let cx = Operand::Reg(Register::Cx);
            out.push(AsmInstruction::Mov(ax.clone(), Operand::from(src1)));
            out.push(AsmInstruction::Cqo);
            out.push(AsmInstruction::Mov(cx.clone(), Operand::from(src2)));
            out.push(AsmInstruction::Idiv(cx));
            let result = if op == BinaryOp::Mod {
                Operand::Reg(Register::Dx)
            } else {
                ax
            };
            out.push(AsmInstruction::Mov(dst, result));
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            let Some(count) = src2.as_constant() else {
                return Err(InternalError::new(
                    op.mnemonic(),
                    "shift count must be an immediate",
                ));
            };
            out.push(AsmInstruction::Mov(ax.clone(), Operand::from(src1)));
            let shift = if op == BinaryOp::Shl {
                AsmInstruction::Shl(ax.clone(), count)
            } else {
                AsmInstruction::Sar(ax.clone(), count)
            };
            out.push(shift);
            out.push(AsmInstruction::Mov(dst, ax));
        }
        _ => unreachable!("relational ops handled above"),
    }
    Ok(())
}

fn translate_instruction(
    out: &mut AsmInstructions,
    instruction: &Instruction,
    function_name: &str,
) -> Result<(), InternalError> {
    let ax = Operand::Reg(Register::Ax);
    match instruction {
        Instruction::Mov { dst, src } => {
            store_via_rax(out, Operand::Pseudo(dst.clone()), Operand::from(src));
        }
        Instruction::Binary {
            op,
            dst,
            src1,
            src2,
        } => translate_binary(out, *op, dst, src1, src2)?,
        Instruction::Not { dst, src } => {
            out.push(AsmInstruction::Mov(ax.clone(), Operand::from(src)));
            out.push(AsmInstruction::Cmp(ax.clone(), Operand::Imm(0)));
            out.push(AsmInstruction::SetCC(Condition::E));
            out.push(AsmInstruction::Movzx);
            out.push(AsmInstruction::Mov(Operand::Pseudo(dst.clone()), ax));
        }
        Instruction::Label(name) => out.push(AsmInstruction::Label(name.clone())),
        Instruction::Jump(target) => out.push(AsmInstruction::Jmp(target.clone())),
        Instruction::JumpIfFalse(cond, target) => {
            out.push(AsmInstruction::Mov(ax.clone(), Operand::from(cond)));
            out.push(AsmInstruction::Cmp(ax, Operand::Imm(0)));
            out.push(AsmInstruction::JmpCC(Condition::E, target.clone()));
        }
        Instruction::Param(value) => {
            out.push(AsmInstruction::Mov(ax.clone(), Operand::from(value)));
            out.push(AsmInstruction::Push(ax));
        }
        Instruction::Call { dst, name, arity } => {
            out.push(AsmInstruction::Call(name.clone()));
            if *arity > 0 {
                out.push(AsmInstruction::DeallocateStack(8 * *arity as i64));
            }
            out.push(AsmInstruction::Mov(Operand::Pseudo(dst.clone()), ax));
        }
        Instruction::Return(value) => {
            if let Some(value) = value {
                out.push(AsmInstruction::Mov(ax, Operand::from(value)));
            }
            out.push(AsmInstruction::Jmp(exit_label(function_name)));
        }
        Instruction::Print(value) => {
            out.push(AsmInstruction::Mov(
                Operand::Reg(Register::Si),
                Operand::from(value),
            ));
            out.push(AsmInstruction::Lea(Register::Di, Operand::Data("fmt_int".into())));
            out.push(AsmInstruction::Binary(
                AsmBinaryOp::Xor,
                ax.clone(),
                ax,
            ));
            out.push(AsmInstruction::Call("printf".into()));
        }
        Instruction::ReadInt { dst } => {
            // scanf("%d") fills 32 bits of the 8-byte slot
            store_via_rax(out, Operand::Pseudo(dst.clone()), Operand::Imm(0));
            out.push(AsmInstruction::Lea(Register::Di, Operand::Data("fmt_in".into())));
            out.push(AsmInstruction::Lea(Register::Si, Operand::Pseudo(dst.clone())));
            out.push(AsmInstruction::Binary(
                AsmBinaryOp::Xor,
                ax.clone(),
                ax,
            ));
            out.push(AsmInstruction::Call("scanf".into()));
        }
        // pure frame reservation; the allocator reads the size map
        Instruction::Alloca { .. } => (),
        Instruction::ArrayLoad { dst, array, index } => {
            array_slot_to_rcx(out, array, index);
            out.push(AsmInstruction::Mov(
                Operand::Reg(Register::Dx),
                Operand::Indirect(Register::Cx),
            ));
            out.push(AsmInstruction::Mov(
                Operand::Pseudo(dst.clone()),
                Operand::Reg(Register::Dx),
            ));
        }
        Instruction::ArrayStore {
            array,
            index,
            value,
        } => {
            array_slot_to_rcx(out, array, index);
            out.push(AsmInstruction::Mov(ax.clone(), Operand::from(value)));
            out.push(AsmInstruction::Mov(Operand::Indirect(Register::Cx), ax));
        }
    }
    Ok(())
}

fn array_sizes(fun: &IrFunction) -> HashMap<Identifier, usize> {
    let mut sizes = HashMap::new();
    for instruction in &fun.body {
        if let Instruction::Alloca { name, size } = instruction {
            sizes.insert(name.clone(), *size);
        }
    }
    sizes
}

fn gen_function(
    fun: &IrFunction,
    globals: &HashSet<Identifier>,
) -> Result<AsmFunction, InternalError> {
    let mut body = AsmInstructions::new();

    // incoming arguments sit above the saved rbp / return address pair,
    // first argument lowest
    for (i, param) in fun.params.iter().enumerate() {
        store_via_rax(
            &mut body,
            Operand::Pseudo(param.clone()),
            Operand::Stack(16 + 8 * i as i64),
        );
    }

    for instruction in &fun.body {
        translate_instruction(&mut body, instruction, &fun.name)?;
    }

    body.push(AsmInstruction::Label(exit_label(&fun.name)));
    body.push(AsmInstruction::Ret);

    let frame_size = frame::allocate_stack(&mut body, array_sizes(fun), globals.clone());
    if frame_size > 0 {
        body.insert(0, AsmInstruction::AllocateStack(frame_size));
    }

    Ok(AsmFunction {
        name: fun.name.clone(),
        frame_size,
        body,
    })
}

/// Lower a whole IR program. Static variables keep their IR names as
/// assembly symbols; functions are emitted in IR order.
pub fn codegen(program: &IrProgram) -> Result<AsmProgram, InternalError> {
    let statics: Vec<StaticVariable> = program.statics().cloned().collect();
    let globals: HashSet<Identifier> = statics.iter().map(|s| s.name.clone()).collect();

    let mut functions = Vec::new();
    for fun in program.functions() {
        functions.push(gen_function(fun, &globals)?);
    }

    Ok(AsmProgram { statics, functions })
}
