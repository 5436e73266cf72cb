//! Assembled programs.
//!
//! A `Program` is the pipeline's only view of the code it runs: an ordered list
//! of shared instruction descriptors plus the label table. Instruction `i` lives
//! at address `i * INSTRUCTION_WIDTH`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::common::constants::{index_of, pc_of};
use crate::common::error::SimError;
use crate::isa::instruction::{Instruction, LabelTable};

/// Shared handle to an immutable instruction descriptor.
pub type InstructionRef = Arc<dyn Instruction>;

/// An ordered list of instructions and their labels.
#[derive(Clone, Default)]
pub struct Program {
    instructions: Vec<InstructionRef>,
    labels: LabelTable,
}

impl Program {
    /// Builds a program from already-decoded instructions.
    pub fn new(instructions: Vec<InstructionRef>, labels: LabelTable) -> Self {
        Self {
            instructions,
            labels,
        }
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at a fetch address.
    ///
    /// Returns `None` for misaligned addresses or addresses past the end.
    pub fn fetch(&self, pc: u32) -> Option<&InstructionRef> {
        if pc % crate::common::INSTRUCTION_WIDTH != 0 {
            return None;
        }
        self.instructions.get(index_of(pc))
    }

    /// Whether `pc` is past the last instruction.
    pub fn is_past_end(&self, pc: u32) -> bool {
        index_of(pc) >= self.instructions.len()
    }

    /// The label table.
    pub const fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Iterates `(address, instruction)` pairs in program order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &InstructionRef)> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, inst)| (pc_of(i), inst))
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("instructions", &self.instructions.len())
            .field("labels", &self.labels.len())
            .finish()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, inst) in self.iter() {
            writeln!(f, "{pc:#06x}  {inst}")?;
        }
        Ok(())
    }
}

impl FromStr for Program {
    type Err = SimError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        crate::isa::asm::assemble(source)
    }
}
