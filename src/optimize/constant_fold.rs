//! Constant folding and propagation, strictly intra-basic-block.
//!
//! A per-block map of known constants is seeded empty at every block entry
//! and never survives a label or jump, so nothing propagates across control
//! flow. Branches are never folded away even when their condition turns out
//! constant; `JMP_IF_FALSE 1, L` style guards are preserved as-is.

use crate::ir::*;
use crate::optimize::loop_mask;
use std::collections::HashMap;

struct Known {
    map: HashMap<String, i64>,
}

impl Known {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn invalidate(&mut self, name: &str) {
        self.map.remove(name);
    }

    /// A call may write any static variable; only temporaries survive it.
    fn invalidate_named(&mut self) {
        self.map.retain(|name, _| is_temp(name));
    }

    fn record(&mut self, name: &str, value: i64) {
        self.map.insert(name.to_owned(), value);
    }

    /// Substitute `value` if its variable is known. Named (non-temporary)
    /// variables inside loop spans are left untouched.
    fn substitute(&self, value: &Value, in_loop: bool) -> Value {
        match value {
            Value::Var(name) if !(in_loop && !is_temp(name)) => self
                .map
                .get(name)
                .map_or_else(|| value.clone(), |v| Value::Constant(*v)),
            _ => value.clone(),
        }
    }
}

pub(super) fn run(body: &Instructions) -> Instructions {
    let in_loop = loop_mask(body);
    let mut known = Known::new();
    let mut out = Instructions::with_capacity(body.len());

    for (i, instruction) in body.iter().enumerate() {
        let in_loop = in_loop[i];
        match instruction {
            Instruction::Label(_) => {
                known.clear();
                out.push(instruction.clone());
            }
            Instruction::Jump(_) => {
                out.push(instruction.clone());
                known.clear();
            }
            Instruction::JumpIfFalse(cond, target) => {
                let cond = known.substitute(cond, in_loop);
                out.push(Instruction::JumpIfFalse(cond, target.clone()));
                known.clear();
            }
            Instruction::Mov { dst, src } => {
                let src = known.substitute(src, in_loop);
                if in_loop && !is_temp(dst) {
                    known.invalidate(dst);
                } else if let Some(value) = src.as_constant() {
                    known.record(dst, value);
                } else {
                    known.invalidate(dst);
                }
                out.push(Instruction::Mov {
                    dst: dst.clone(),
                    src,
                });
            }
            Instruction::Binary {
                op,
                dst,
                src1,
                src2,
            } => {
                let src1 = known.substitute(src1, in_loop);
                let src2 = known.substitute(src2, in_loop);
                let dst_opaque = in_loop && !is_temp(dst);
                let folded = match (src1.as_constant(), src2.as_constant()) {
                    (Some(a), Some(b)) if !dst_opaque => op.eval(a, b),
                    _ => None,
                };
                if let Some(value) = folded {
                    known.record(dst, value);
                    out.push(Instruction::Mov {
                        dst: dst.clone(),
                        src: Value::Constant(value),
                    });
                } else {
                    known.invalidate(dst);
                    out.push(Instruction::Binary {
                        op: *op,
                        dst: dst.clone(),
                        src1,
                        src2,
                    });
                }
            }
            Instruction::Not { dst, src } => {
                let src = known.substitute(src, in_loop);
                let dst_opaque = in_loop && !is_temp(dst);
                match src.as_constant() {
                    Some(value) if !dst_opaque => {
                        let value = i64::from(value == 0);
                        known.record(dst, value);
                        out.push(Instruction::Mov {
                            dst: dst.clone(),
                            src: Value::Constant(value),
                        });
                    }
                    _ => {
                        known.invalidate(dst);
                        out.push(Instruction::Not {
                            dst: dst.clone(),
                            src,
                        });
                    }
                }
            }
            Instruction::Param(value) => {
                let value = known.substitute(value, in_loop);
                out.push(Instruction::Param(value));
            }
            Instruction::Print(value) => {
                let value = known.substitute(value, in_loop);
                out.push(Instruction::Print(value));
            }
            Instruction::Return(value) => {
                let value = value.as_ref().map(|v| known.substitute(v, in_loop));
                out.push(Instruction::Return(value));
            }
            Instruction::Call { dst, name, arity } => {
                known.invalidate_named();
                known.invalidate(dst);
                out.push(Instruction::Call {
                    dst: dst.clone(),
                    name: name.clone(),
                    arity: *arity,
                });
            }
            Instruction::ReadInt { dst } => {
                known.invalidate(dst);
                out.push(instruction.clone());
            }
            Instruction::Alloca { .. } => out.push(instruction.clone()),
            Instruction::ArrayLoad { dst, array, index } => {
                let index = known.substitute(index, in_loop);
                known.invalidate(dst);
                out.push(Instruction::ArrayLoad {
                    dst: dst.clone(),
                    array: array.clone(),
                    index,
                });
            }
            Instruction::ArrayStore {
                array,
                index,
                value,
            } => {
                let index = known.substitute(index, in_loop);
                let value = known.substitute(value, in_loop);
                out.push(Instruction::ArrayStore {
                    array: array.clone(),
                    index,
                    value,
                });
            }
        }
    }

    out
}
