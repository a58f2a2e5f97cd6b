mod constant_fold;
mod dead_code;
mod strength_reduction;

use crate::ir::*;
use std::collections::HashMap;

/// Fixpoint bound. Each pass is monotonic, so in practice two or three
/// rounds converge; the bound guarantees termination regardless.
const MAX_ROUNDS: usize = 8;

/// Optimize one program. Every function is handled independently; statics
/// pass through untouched. The input is never mutated.
pub fn optimize(program: &IrProgram) -> IrProgram {
    let items = program
        .items
        .iter()
        .map(|item| match item {
            TopLevel::Fun(fun) => TopLevel::Fun(optimize_function(fun)),
            TopLevel::Static(var) => TopLevel::Static(var.clone()),
        })
        .collect();

    IrProgram { items }
}

fn optimize_function(fun: &IrFunction) -> IrFunction {
    let mut body = fun.body.clone();

    for _ in 0..MAX_ROUNDS {
        let folded = constant_fold::run(&body);
        let reduced = strength_reduction::run(&folded);
        let cleaned = dead_code::run(&reduced);
        let stable = cleaned == body;
        body = cleaned;
        if stable {
            break;
        }
    }

    IrFunction {
        name: fun.name.clone(),
        params: fun.params.clone(),
        body,
    }
}

/// Check the IR invariants the backend relies on: within each function,
/// every label is unique and every jump targets an existing label.
pub fn verify(program: &IrProgram) -> Result<(), InternalError> {
    for fun in program.functions() {
        let mut labels = HashMap::new();
        for instruction in &fun.body {
            if let Instruction::Label(name) = instruction {
                if labels.insert(name.clone(), ()).is_some() {
                    return Err(InternalError::new(
                        "LABEL",
                        format!("duplicate label {name} in function {}", fun.name),
                    ));
                }
            }
        }
        for instruction in &fun.body {
            let target = match instruction {
                Instruction::Jump(target) | Instruction::JumpIfFalse(_, target) => target,
                _ => continue,
            };
            if !labels.contains_key(target) {
                return Err(InternalError::new(
                    "JMP",
                    format!("jump to unknown label {target} in function {}", fun.name),
                ));
            }
        }
    }
    Ok(())
}

/// Mark every instruction that sits inside a loop: the span from a label to
/// any backward jump targeting it. Named variables in these spans are
/// opaque to the folder (induction variables must keep their definitions).
pub(crate) fn loop_mask(body: &Instructions) -> Vec<bool> {
    let mut label_index = HashMap::new();
    for (i, instruction) in body.iter().enumerate() {
        if let Instruction::Label(name) = instruction {
            label_index.insert(name.as_str(), i);
        }
    }

    let mut mask = vec![false; body.len()];
    for (i, instruction) in body.iter().enumerate() {
        let target = match instruction {
            Instruction::Jump(target) | Instruction::JumpIfFalse(_, target) => target.as_str(),
            _ => continue,
        };
        if let Some(&j) = label_index.get(target) {
            if j < i {
                for flag in &mut mask[j..=i] {
                    *flag = true;
                }
            }
        }
    }
    mask
}
