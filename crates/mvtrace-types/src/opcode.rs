/// Instruction kinds the engine reports to the tracer.
///
/// This is the subset of the upstream SQLite VDBE opcode set that the tracer
/// classifies, plus the kinds a typical read/update program executes around
/// them. Classification keys off these symbolic kinds, never off display
/// names, so a renamed opcode in the engine's name table does not silently
/// disable tracing.
///
/// Reference: canonical upstream SQLite opcode definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // === Control Flow ===
    /// Program entry; jump to P2.
    Init,
    /// Jump to address P2.
    Goto,
    /// Halt execution (with optional error).
    Halt,
    /// No operation.
    Noop,

    // === Constants & Registers ===
    /// Set register P2 to integer value P1.
    Integer,
    /// Set register P2 to string P4.
    String8,
    /// Copy register P1 to P2.
    Copy,
    /// P3 = P2 + P1.
    Add,
    /// Output a row of P2 registers starting at P1.
    ResultRow,

    // === Comparison & Branching ===
    /// Jump to P2 if P1 == P3.
    Eq,
    /// Jump to P2 if P1 != P3.
    Ne,
    /// Jump to P2 if register P1 > 0, then decrement it by P3.
    IfPos,
    /// Decrement register P1, jump to P2 if it reaches zero.
    DecrJumpZero,

    // === Transaction ===
    /// Set the autocommit flag to P1. P1 != 0 ends a transaction, P1 == 0
    /// starts one.
    AutoCommit,
    /// Begin a read or write transaction on database P1.
    Transaction,

    // === Cursor Open/Close ===
    /// Open a read cursor P1 on root page P2.
    OpenRead,
    /// Open a write cursor P1 on root page P2.
    OpenWrite,
    /// Close cursor P1.
    Close,

    // === Column Access ===
    /// Read column P2 of the row cursor P1 points at into register P3.
    Column,
    /// Build a record from registers P1..P1+P2-1 into P3.
    MakeRecord,

    // === Seek & Existence Probes ===
    /// Jump to P2 if no index entry conflicts with the key in P3.
    NoConflict,
    /// Jump to P2 if the key in P3 is not found by cursor P1.
    NotFound,
    /// Jump to P2 if the key in P3 is found by cursor P1.
    Found,
    /// Position cursor P1 on the rowid in P3, jump to P2 if absent.
    SeekRowid,
    /// Like SeekRowid, used when the row is expected to exist.
    NotExists,
    /// Jump to P2 if the index key in P3 is unique (legacy SQLite opcode).
    IsUnique,

    // === Row Identity ===
    /// Allocate a new rowid for cursor P1 into register P2.
    NewRowid,
    /// Store the rowid of the row cursor P1 points at into register P2.
    Rowid,
    /// Store the rowid referenced by index cursor P1 into register P2.
    IdxRowid,

    // === Insert/Delete ===
    /// Write the record in P2 with rowid P3 through cursor P1.
    Insert,
    /// Delete the row cursor P1 points at.
    Delete,

    // === Cursor Movement ===
    /// Position cursor P1 on the first row; jump to P2 if empty.
    Rewind,
    /// Move cursor P1 to the previous row; jump to P2 if one exists.
    Prev,
    /// Move cursor P1 to the next row; jump to P2 if one exists.
    Next,
}

impl Opcode {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 34] = [
        Self::Init,
        Self::Goto,
        Self::Halt,
        Self::Noop,
        Self::Integer,
        Self::String8,
        Self::Copy,
        Self::Add,
        Self::ResultRow,
        Self::Eq,
        Self::Ne,
        Self::IfPos,
        Self::DecrJumpZero,
        Self::AutoCommit,
        Self::Transaction,
        Self::OpenRead,
        Self::OpenWrite,
        Self::Close,
        Self::Column,
        Self::MakeRecord,
        Self::NoConflict,
        Self::NotFound,
        Self::Found,
        Self::SeekRowid,
        Self::NotExists,
        Self::IsUnique,
        Self::NewRowid,
        Self::Rowid,
        Self::IdxRowid,
        Self::Insert,
        Self::Delete,
        Self::Rewind,
        Self::Prev,
        Self::Next,
    ];

    /// Get the opcode name as a static string slice.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::Goto => "Goto",
            Self::Halt => "Halt",
            Self::Noop => "Noop",
            Self::Integer => "Integer",
            Self::String8 => "String8",
            Self::Copy => "Copy",
            Self::Add => "Add",
            Self::ResultRow => "ResultRow",
            Self::Eq => "Eq",
            Self::Ne => "Ne",
            Self::IfPos => "IfPos",
            Self::DecrJumpZero => "DecrJumpZero",
            Self::AutoCommit => "AutoCommit",
            Self::Transaction => "Transaction",
            Self::OpenRead => "OpenRead",
            Self::OpenWrite => "OpenWrite",
            Self::Close => "Close",
            Self::Column => "Column",
            Self::MakeRecord => "MakeRecord",
            Self::NoConflict => "NoConflict",
            Self::NotFound => "NotFound",
            Self::Found => "Found",
            Self::SeekRowid => "SeekRowid",
            Self::NotExists => "NotExists",
            Self::IsUnique => "IsUnique",
            Self::NewRowid => "NewRowid",
            Self::Rowid => "Rowid",
            Self::IdxRowid => "IdxRowid",
            Self::Insert => "Insert",
            Self::Delete => "Delete",
            Self::Rewind => "Rewind",
            Self::Prev => "Prev",
            Self::Next => "Next",
        }
    }

    /// Reverse name lookup, for engines that only expose display names.
    ///
    /// Matching is exact except that `RowId` is accepted as an alias of
    /// `Rowid` (both spellings appear in engine name tables).
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "RowId" {
            return Some(Self::Rowid);
        }
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// The upstream SQLite numeric code, if the opcode still exists upstream.
    pub const fn code(self) -> Option<u8> {
        let code = match self {
            Self::Goto => 1,
            Self::Halt => 8,
            Self::Integer => 9,
            Self::String8 => 12,
            Self::Copy => 20,
            Self::ResultRow => 24,
            Self::Add => 26,
            Self::Eq => 40,
            Self::Ne => 41,
            Self::Column => 64,
            Self::MakeRecord => 67,
            Self::AutoCommit => 70,
            Self::Transaction => 71,
            Self::OpenRead => 75,
            Self::OpenWrite => 76,
            Self::Close => 83,
            Self::NoConflict => 93,
            Self::NotFound => 94,
            Self::Found => 95,
            Self::SeekRowid => 96,
            Self::NotExists => 97,
            Self::NewRowid => 99,
            Self::Insert => 100,
            Self::Delete => 102,
            Self::Rowid => 107,
            Self::Rewind => 114,
            Self::Prev => 117,
            Self::Next => 118,
            Self::IdxRowid => 123,
            Self::IfPos => 148,
            Self::DecrJumpZero => 151,
            Self::Init => 186,
            Self::Noop => 191,
            Self::IsUnique => return None,
        };
        Some(code)
    }

    /// Look up an opcode by its upstream SQLite numeric code.
    ///
    /// Codes outside the traced subset yield `None`; that is not an error.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == Some(code))
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only view of one executed instruction.
///
/// Engines with their own instruction representation implement this
/// directly; [`VdbeOp`] is the raw form for engines that report numeric
/// codes.
pub trait Instruction {
    /// Symbolic kind, or `None` for an instruction outside the traced set.
    fn opcode(&self) -> Option<Opcode>;

    /// First operand (cursor index, register, or flag).
    fn p1(&self) -> i32;

    /// Second operand (often a jump target).
    fn p2(&self) -> i32 {
        0
    }

    /// Third operand.
    fn p3(&self) -> i32 {
        0
    }
}

/// A single raw VDBE instruction as the interpreter executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VdbeOp {
    /// Upstream SQLite numeric opcode.
    pub opcode: u8,
    /// First operand (typically a register number or cursor index).
    pub p1: i32,
    /// Second operand (often a jump target address).
    pub p2: i32,
    /// Third operand.
    pub p3: i32,
}

impl VdbeOp {
    /// Build an instruction from a known kind.
    ///
    /// Kinds without an upstream code (legacy opcodes) are encoded as
    /// `u8::MAX`, which never resolves back to a kind.
    pub fn new(opcode: Opcode, p1: i32, p2: i32, p3: i32) -> Self {
        Self {
            opcode: opcode.code().unwrap_or(u8::MAX),
            p1,
            p2,
            p3,
        }
    }

    /// Build an instruction from a raw numeric code.
    pub const fn raw(opcode: u8, p1: i32, p2: i32, p3: i32) -> Self {
        Self { opcode, p1, p2, p3 }
    }
}

impl Instruction for VdbeOp {
    fn opcode(&self) -> Option<Opcode> {
        Opcode::from_code(self.opcode)
    }

    fn p1(&self) -> i32 {
        self.p1
    }

    fn p2(&self) -> i32 {
        self.p2
    }

    fn p3(&self) -> i32 {
        self.p3
    }
}
