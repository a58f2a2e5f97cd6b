use crate::ast::Identifier;
use crate::codegen::{AsmInstruction, AsmInstructions, Operand};
use std::collections::{HashMap, HashSet};

type SlotMap = HashMap<Identifier, i64>;

/// Assigns every pseudo-operand of a function an 8-byte frame slot at a
/// descending offset from `rbp`, arrays getting `size * 8` contiguous
/// bytes with their base at the lowest address. Globals resolve to static
/// storage instead of a slot.
pub(super) struct StackAllocator {
    offset: i64,
    map: SlotMap,
    arrays: HashMap<Identifier, usize>,
    globals: HashSet<Identifier>,
}

impl StackAllocator {
    pub(super) fn new(arrays: HashMap<Identifier, usize>, globals: HashSet<Identifier>) -> Self {
        Self {
            offset: 0,
            map: SlotMap::new(),
            arrays,
            globals,
        }
    }

    fn allocate_if_pseudo(&mut self, operand: Operand) -> Operand {
        match operand {
            Operand::Pseudo(name) => self.allocate(&name),
            _ => operand,
        }
    }

    fn allocate(&mut self, name: &Identifier) -> Operand {
        if self.globals.contains(name) {
            return Operand::Data(name.clone());
        }
        if let Some(offset) = self.map.get(name) {
            return Operand::Stack(*offset);
        }

        let size = self.arrays.get(name).map_or(8, |slots| 8 * *slots as i64);
        self.offset += size;
        self.map.insert(name.clone(), -self.offset);
        Operand::Stack(-self.offset)
    }

    /// Frame bytes rounded up to 16. Alignment before external calls stays
    /// best-effort beyond this.
    fn frame_size(&self) -> i64 {
        (self.offset + 15) & !15
    }
}

/// Replace every pseudo operand with its frame slot (or static reference)
/// and return the rounded frame size.
pub(super) fn allocate_stack(
    instructions: &mut AsmInstructions,
    arrays: HashMap<Identifier, usize>,
    globals: HashSet<Identifier>,
) -> i64 {
    let mut allocator = StackAllocator::new(arrays, globals);

    for instruction in instructions.iter_mut() {
        match instruction {
            AsmInstruction::Push(operand) | AsmInstruction::Idiv(operand) => {
                *operand = allocator.allocate_if_pseudo(operand.clone());
            }
            AsmInstruction::Lea(_, operand) => {
                *operand = allocator.allocate_if_pseudo(operand.clone());
            }
            AsmInstruction::Mov(dst, src) | AsmInstruction::Cmp(dst, src) => {
                *dst = allocator.allocate_if_pseudo(dst.clone());
                *src = allocator.allocate_if_pseudo(src.clone());
            }
            AsmInstruction::Binary(_, dst, src) => {
                *dst = allocator.allocate_if_pseudo(dst.clone());
                *src = allocator.allocate_if_pseudo(src.clone());
            }
            AsmInstruction::Shl(operand, _) | AsmInstruction::Sar(operand, _) => {
                *operand = allocator.allocate_if_pseudo(operand.clone());
            }
            _ => (),
        }
    }

    allocator.frame_size()
}
