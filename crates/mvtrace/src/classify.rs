//! Instruction classification.
//!
//! Four total, side-effect-free predicates over one executed instruction.
//! An instruction whose kind the engine does not report (`opcode()` is
//! `None`) matches none of them.

use mvtrace_types::{Instruction, Opcode};

/// Instructions that reposition a cursor or probe for a row's existence.
/// Each one ends the engine's attention on the current row.
pub const CURSOR_MOVEMENTS: [Opcode; 9] = [
    Opcode::Next,
    Opcode::Rewind,
    Opcode::Prev,
    Opcode::SeekRowid,
    Opcode::Found,
    Opcode::NotFound,
    Opcode::IsUnique,
    Opcode::NotExists,
    Opcode::NoConflict,
];

#[must_use]
pub fn is_cursor_movement<I: Instruction + ?Sized>(insn: &I) -> bool {
    insn.opcode().is_some_and(|op| CURSOR_MOVEMENTS.contains(&op))
}

/// The column extraction instruction, the engine's only read signal.
#[must_use]
pub fn is_column_op<I: Instruction + ?Sized>(insn: &I) -> bool {
    insn.opcode() == Some(Opcode::Column)
}

#[must_use]
pub fn is_row_id_op<I: Instruction + ?Sized>(insn: &I) -> bool {
    insn.opcode() == Some(Opcode::Rowid)
}

#[must_use]
pub fn is_autocommit_op<I: Instruction + ?Sized>(insn: &I) -> bool {
    insn.opcode() == Some(Opcode::AutoCommit)
}

/// What the interceptor should do with one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionClass {
    CursorMovement,
    Column,
    RowId,
    /// `enabled == true` means the transaction just committed.
    AutoCommit { enabled: bool },
    Other,
}

/// Classify `insn`. The predicates are checked in interceptor order, so an
/// instruction never lands in more than one class.
#[must_use]
pub fn classify<I: Instruction + ?Sized>(insn: &I) -> InstructionClass {
    if is_cursor_movement(insn) {
        InstructionClass::CursorMovement
    } else if is_column_op(insn) {
        InstructionClass::Column
    } else if is_autocommit_op(insn) {
        InstructionClass::AutoCommit {
            enabled: insn.p1() != 0,
        }
    } else if is_row_id_op(insn) {
        InstructionClass::RowId
    } else {
        InstructionClass::Other
    }
}

/// An instruction reported by display name, for engines that expose only
/// their opcode-name table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedInstruction<'a> {
    pub name: &'a str,
    pub p1: i32,
}

impl<'a> NamedInstruction<'a> {
    #[must_use]
    pub const fn new(name: &'a str, p1: i32) -> Self {
        Self { name, p1 }
    }
}

impl Instruction for NamedInstruction<'_> {
    fn opcode(&self) -> Option<Opcode> {
        Opcode::from_name(self.name)
    }

    fn p1(&self) -> i32 {
        self.p1
    }
}

#[cfg(test)]
mod tests {
    use mvtrace_types::VdbeOp;
    use proptest::prelude::*;

    use super::*;

    fn op(kind: Opcode, p1: i32) -> VdbeOp {
        VdbeOp::new(kind, p1, 0, 0)
    }

    #[test]
    fn movement_set_is_exact() {
        for kind in Opcode::ALL {
            let named = NamedInstruction::new(kind.name(), 0);
            assert_eq!(
                is_cursor_movement(&named),
                CURSOR_MOVEMENTS.contains(&kind),
                "{kind}"
            );
        }
    }

    #[test]
    fn single_kind_predicates() {
        assert!(is_column_op(&op(Opcode::Column, 0)));
        assert!(!is_column_op(&op(Opcode::MakeRecord, 0)));
        assert!(is_row_id_op(&op(Opcode::Rowid, 0)));
        assert!(!is_row_id_op(&op(Opcode::IdxRowid, 0)));
        assert!(!is_row_id_op(&op(Opcode::NewRowid, 0)));
        assert!(is_autocommit_op(&op(Opcode::AutoCommit, 1)));
        assert!(!is_autocommit_op(&op(Opcode::Transaction, 1)));
    }

    #[test]
    fn autocommit_operand_truthiness() {
        assert_eq!(
            classify(&op(Opcode::AutoCommit, 1)),
            InstructionClass::AutoCommit { enabled: true }
        );
        assert_eq!(
            classify(&op(Opcode::AutoCommit, -3)),
            InstructionClass::AutoCommit { enabled: true }
        );
        assert_eq!(
            classify(&op(Opcode::AutoCommit, 0)),
            InstructionClass::AutoCommit { enabled: false }
        );
    }

    #[test]
    fn unknown_codes_are_other() {
        assert_eq!(classify(&VdbeOp::raw(u8::MAX, 1, 0, 0)), InstructionClass::Other);
        assert_eq!(
            classify(&NamedInstruction::new("VNext", 0)),
            InstructionClass::Other
        );
    }

    #[test]
    fn named_lookup_accepts_legacy_spelling() {
        assert_eq!(classify(&NamedInstruction::new("RowId", 0)), InstructionClass::RowId);
        assert_eq!(
            classify(&NamedInstruction::new("IsUnique", 0)),
            InstructionClass::CursorMovement
        );
    }

    proptest! {
        #[test]
        fn classification_is_total(code in any::<u8>(), p1 in any::<i32>()) {
            let insn = VdbeOp::raw(code, p1, 0, 0);
            let hits = [
                is_cursor_movement(&insn),
                is_column_op(&insn),
                is_row_id_op(&insn),
                is_autocommit_op(&insn),
            ]
            .into_iter()
            .filter(|hit| *hit)
            .count();
            prop_assert!(hits <= 1);
            prop_assert_eq!(hits == 0, classify(&insn) == InstructionClass::Other);
        }
    }
}
