//! NASM text rendering for the assembly AST via [`Display`] impls, so the
//! driver can `write!` a whole [`AsmProgram`] to any target.
//!
//! Labels inside a function are printed with a leading dot, which makes
//! them NASM-local to the preceding function symbol; per-function `L0`
//! numbering can therefore never collide across functions.

use crate::codegen::*;

use std::fmt;

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ax => write!(f, "rax"),
            Self::Bx => write!(f, "rbx"),
            Self::Cx => write!(f, "rcx"),
            Self::Dx => write!(f, "rdx"),
            Self::Si => write!(f, "rsi"),
            Self::Di => write!(f, "rdi"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Imm(i) => write!(f, "{i}"),
            Self::Reg(r) => write!(f, "{r}"),
            Self::Stack(offset) if *offset < 0 => write!(f, "[rbp - {}]", -offset),
            Self::Stack(offset) => write!(f, "[rbp + {offset}]"),
            Self::Data(name) => write!(f, "[rel {name}]"),
            Self::Indirect(r) => write!(f, "[{r}]"),
            Self::Pseudo(_) => unreachable!("pseudos are resolved before emission"),
        }
    }
}

impl fmt::Display for AsmBinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Imul => write!(f, "imul"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Xor => write!(f, "xor"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::E => write!(f, "e"),
            Self::Ne => write!(f, "ne"),
            Self::L => write!(f, "l"),
            Self::Le => write!(f, "le"),
            Self::G => write!(f, "g"),
            Self::Ge => write!(f, "ge"),
        }
    }
}

impl fmt::Display for AsmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Mov(dst, src) => write!(f, "mov {dst}, {src}"),
            Self::Lea(dst, addr) => write!(f, "lea {dst}, {addr}"),
            Self::Binary(op, dst, src) => write!(f, "{op} {dst}, {src}"),
            Self::Shl(dst, count) => write!(f, "shl {dst}, {count}"),
            Self::Sar(dst, count) => write!(f, "sar {dst}, {count}"),
            Self::Cqo => write!(f, "cqo"),
            Self::Idiv(operand) => write!(f, "idiv {operand}"),
            Self::Cmp(lhs, rhs) => write!(f, "cmp {lhs}, {rhs}"),
            Self::SetCC(condition) => write!(f, "set{condition} al"),
            Self::Movzx => write!(f, "movzx rax, al"),
            Self::Jmp(target) => write!(f, "jmp .{target}"),
            Self::JmpCC(condition, target) => write!(f, "j{condition} .{target}"),
            Self::Label(name) => write!(f, ".{name}:"),
            Self::Push(operand) => write!(f, "push {operand}"),
            Self::Call(name) => write!(f, "call {name}"),
            Self::AllocateStack(bytes) => write!(f, "sub rsp, {bytes}"),
            Self::DeallocateStack(bytes) => write!(f, "add rsp, {bytes}"),
            Self::Ret => write!(f, "mov rsp, rbp\n    pop rbp\n    ret"),
        }
    }
}

impl fmt::Display for AsmFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        writeln!(f, "    push rbp")?;
        writeln!(f, "    mov rbp, rsp")?;
        for instruction in &self.body {
            if matches!(instruction, AsmInstruction::Label(_)) {
                writeln!(f, "{instruction}")?;
            } else {
                writeln!(f, "    {instruction}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for AsmProgram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "section .data")?;
        writeln!(f, "    fmt_int db \"%d\", 10, 0")?;
        writeln!(f, "    fmt_in db \"%d\", 0")?;
        for var in self.statics.iter().filter(|s| s.slots == 1) {
            writeln!(f, "    {}: dq {}", var.name, var.init)?;
        }

        let arrays: Vec<_> = self.statics.iter().filter(|s| s.slots > 1).collect();
        if !arrays.is_empty() {
            writeln!(f)?;
            writeln!(f, "section .bss")?;
            for var in arrays {
                writeln!(f, "    {}: resq {}", var.name, var.slots)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "section .text")?;
        writeln!(f, "    extern printf")?;
        writeln!(f, "    extern scanf")?;
        writeln!(f, "    global main")?;
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}
