//! Strength reduction: replace multiplications and divisions by powers of
//! two with shifts, and strip arithmetic identities.
//!
//! The right shift is arithmetic (`sar`), which matches truncating division
//! only for non-negative operands; a documented assumption of the NanoC
//! abstract machine.

use crate::ir::*;

/// `Some(k)` when `value` is `2^k` with `k` in `1..=30`.
fn power_of_two(value: i64) -> Option<i64> {
    if value >= 2 && value <= (1 << 30) && value & (value - 1) == 0 {
        Some(i64::from(value.trailing_zeros()))
    } else {
        None
    }
}

fn reduce_mul(dst: &str, src1: &Value, src2: &Value) -> Option<Instruction> {
    // either side may hold the constant
    let (konst, other) = match (src1.as_constant(), src2.as_constant()) {
        (_, Some(c)) => (c, src1),
        (Some(c), _) => (c, src2),
        _ => return None,
    };

    if konst == 0 {
        return Some(Instruction::Mov {
            dst: dst.to_owned(),
            src: Value::Constant(0),
        });
    }
    if konst == 1 {
        return Some(Instruction::Mov {
            dst: dst.to_owned(),
            src: other.clone(),
        });
    }
    power_of_two(konst).map(|k| Instruction::Binary {
        op: BinaryOp::Shl,
        dst: dst.to_owned(),
        src1: other.clone(),
        src2: Value::Constant(k),
    })
}

fn reduce_div(dst: &str, src1: &Value, src2: &Value) -> Option<Instruction> {
    let konst = src2.as_constant()?;
    power_of_two(konst).map(|k| Instruction::Binary {
        op: BinaryOp::Shr,
        dst: dst.to_owned(),
        src1: src1.clone(),
        src2: Value::Constant(k),
    })
}

fn reduce_add(dst: &str, src1: &Value, src2: &Value) -> Option<Instruction> {
    let kept = match (src1.as_constant(), src2.as_constant()) {
        (_, Some(0)) => src1,
        (Some(0), _) => src2,
        _ => return None,
    };
    Some(Instruction::Mov {
        dst: dst.to_owned(),
        src: kept.clone(),
    })
}

pub(super) fn run(body: &Instructions) -> Instructions {
    body.iter()
        .map(|instruction| {
            let reduced = match instruction {
                Instruction::Binary {
                    op: BinaryOp::Mul,
                    dst,
                    src1,
                    src2,
                } => reduce_mul(dst, src1, src2),
                Instruction::Binary {
                    op: BinaryOp::Div,
                    dst,
                    src1,
                    src2,
                } => reduce_div(dst, src1, src2),
                Instruction::Binary {
                    op: BinaryOp::Add,
                    dst,
                    src1,
                    src2,
                } => reduce_add(dst, src1, src2),
                _ => None,
            };
            reduced.unwrap_or_else(|| instruction.clone())
        })
        .collect()
}
