//! Dead code elimination. Deliberately conservative: only writes to
//! generator temporaries (`tN`) are ever candidates; writes to user-named
//! variables count as observable and always survive, as does anything
//! side-effecting (I/O, calls, stores, control flow).

use crate::ir::*;
use std::collections::HashSet;

fn mark<'a>(used: &mut HashSet<&'a str>, value: &'a Value) {
    if let Value::Var(name) = value {
        used.insert(name.as_str());
    }
}

fn collect_used(body: &Instructions) -> HashSet<&str> {
    let mut used = HashSet::new();

    for instruction in body {
        match instruction {
            Instruction::Mov { src, .. } | Instruction::Not { src, .. } => mark(&mut used, src),
            Instruction::Binary { src1, src2, .. } => {
                mark(&mut used, src1);
                mark(&mut used, src2);
            }
            Instruction::JumpIfFalse(cond, _) => mark(&mut used, cond),
            Instruction::Param(value) | Instruction::Print(value) => mark(&mut used, value),
            Instruction::Return(Some(value)) => mark(&mut used, value),
            Instruction::ArrayLoad { index, .. } => mark(&mut used, index),
            Instruction::ArrayStore { index, value, .. } => {
                mark(&mut used, index);
                mark(&mut used, value);
            }
            _ => (),
        }
    }
    used
}

fn sweep(body: &Instructions) -> (bool, Instructions) {
    let used = collect_used(body);
    let mut changed = false;
    let mut kept = Instructions::with_capacity(body.len());

    for instruction in body {
        if instruction.has_side_effects() {
            kept.push(instruction.clone());
            continue;
        }
        let dead = instruction
            .dst()
            .is_some_and(|dst| is_temp(dst) && !used.contains(dst));
        if dead {
            changed = true;
            continue;
        }
        kept.push(instruction.clone());
    }

    (changed, kept)
}

/// Sweep until no instruction dies; each round can expose new dead temps
/// (removing `MOV t1, t0` frees `t0`).
pub(super) fn run(body: &Instructions) -> Instructions {
    let mut body = body.clone();
    loop {
        let (changed, kept) = sweep(&body);
        body = kept;
        if !changed {
            return body;
        }
    }
}
