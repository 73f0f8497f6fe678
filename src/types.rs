//! Type and instruction definitions consumed by the form checker.
//!
//! The instruction representation mirrors what the decoder produces: each
//! instruction carries its opcode together with the opcode-specific
//! immediates, plus the byte offset it was decoded from. Block instructions
//! additionally carry the relative jump metadata the decoder precomputes
//! (`jump_end`, and `jump_else` for `if`), which the checker uses to resolve
//! branch targets.

use derive_more::Display;
use std::fmt;

/// Indices
pub type TypeIndex = u32;
pub type FuncIndex = u32;
pub type TableIndex = u32;
pub type MemIndex = u32;
pub type GlobalIndex = u32;
pub type LocalIndex = u32;
pub type LabelIndex = u32;
pub type DataIndex = u32;
pub type ElemIndex = u32;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
/// The referent kind of a reference value, either one of the abstract
/// categories or a concrete index into the module's function-type table.
pub enum HeapType {
    #[display(fmt = "func")]
    Func,
    #[display(fmt = "extern")]
    Extern,
    #[display(fmt = "{}", _0)]
    TypeIdx(TypeIndex),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// A reference type, i.e., a heap type together with a nullability flag.
pub struct RefType {
    pub nullable: bool,
    pub heap:     HeapType,
}

impl RefType {
    /// The non-nullable reference to the same heap type.
    pub fn as_non_null(self) -> Self {
        Self {
            nullable: false,
            heap:     self.heap,
        }
    }

    /// The nullable reference to the same heap type.
    pub fn as_nullable(self) -> Self {
        Self {
            nullable: true,
            heap:     self.heap,
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "(ref null {})", self.heap)
        } else {
            write!(f, "(ref {})", self.heap)
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// A Wasm value type: a numeric type, the 128-bit vector type, or a reference.
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    V128,
    Ref(RefType),
}

/// The nullable reference to any function, `funcref`.
pub const FUNC_REF: ValueType = ValueType::Ref(RefType {
    nullable: true,
    heap:     HeapType::Func,
});

/// The nullable reference to an external object, `externref`.
pub const EXTERN_REF: ValueType = ValueType::Ref(RefType {
    nullable: true,
    heap:     HeapType::Extern,
});

impl ValueType {
    /// A nullable reference to the function type at the given index.
    pub fn func_ref(idx: TypeIndex) -> Self {
        ValueType::Ref(RefType {
            nullable: true,
            heap:     HeapType::TypeIdx(idx),
        })
    }

    pub fn is_ref(self) -> bool { matches!(self, ValueType::Ref(_)) }

    pub fn is_num(self) -> bool {
        matches!(self, ValueType::I32 | ValueType::I64 | ValueType::F32 | ValueType::F64)
    }

    pub fn is_vec(self) -> bool { matches!(self, ValueType::V128) }

    /// Whether a table element type is some reference to a function. Both the
    /// abstract `funcref` and any concrete type index qualify.
    pub fn is_func_ref(self) -> bool {
        matches!(
            self,
            ValueType::Ref(RefType {
                heap: HeapType::Func | HeapType::TypeIdx(_),
                ..
            })
        )
    }

    /// A type is defaultable if it has a canonical zero value: numerics,
    /// vectors, and nullable references. Non-nullable references must be
    /// initialised before first read.
    pub fn is_defaultable(self) -> bool {
        match self {
            ValueType::Ref(rt) => rt.nullable,
            _ => true,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::I32 => f.write_str("i32"),
            ValueType::I64 => f.write_str("i64"),
            ValueType::F32 => f.write_str("f32"),
            ValueType::F64 => f.write_str("f64"),
            ValueType::V128 => f.write_str("v128"),
            ValueType::Ref(rt) => rt.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A function type. In contrast to Wasm MVP both the parameter and the result
/// lists may have arbitrary length.
pub struct FunctionType {
    pub parameters: Vec<ValueType>,
    pub results:    Vec<ValueType>,
}

impl FunctionType {
    /// A function type with no arguments and no results.
    pub fn empty() -> Self {
        Self {
            parameters: Vec::new(),
            results:    Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// The block type immediate of a structured instruction: empty, a single
/// result type, or an index into the module's function-type table.
pub enum BlockType {
    Empty,
    Value(ValueType),
    Func(TypeIndex),
}

#[derive(Debug, Clone, Copy)]
/// A global declaration the checker consults, i.e., its value type and
/// whether it may be written.
pub struct Global {
    pub ty:      ValueType,
    pub mutable: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// The immediate memory argument of a load, store or atomic access.
pub struct MemArg {
    /// The linear memory the access targets.
    pub memory: MemIndex,
    /// The alignment exponent. Checked against the natural alignment of the
    /// access width.
    pub align:  u32,
    /// The static offset into the linear memory.
    pub offset: u32,
}

impl MemArg {
    /// An access to memory 0 with the given alignment exponent and no offset.
    pub fn aligned(align: u32) -> Self {
        Self {
            memory: 0,
            align,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
/// A decoded instruction: the opcode with its immediates, and the byte offset
/// the decoder read it from. The offset only feeds error reporting.
pub struct Instruction {
    pub opcode: OpCode,
    pub offset: u32,
}

impl Instruction {
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            offset: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OpCode {
    // Control instructions
    Unreachable,
    Nop,
    Block {
        ty:       BlockType,
        /// Relative distance to the matching `end`, precomputed by the
        /// decoder. A branch to this block lands there.
        jump_end: u32,
    },
    Loop {
        ty: BlockType,
    },
    If {
        ty:        BlockType,
        /// Relative distance to the `else` instruction, or equal to
        /// `jump_end` when the `if` has no else arm.
        jump_else: u32,
        /// Relative distance to the matching `end`.
        jump_end:  u32,
    },
    Else,
    End,
    Br(LabelIndex),
    BrIf(LabelIndex),
    BrTable {
        labels:  Vec<LabelIndex>,
        default: LabelIndex,
    },
    BrOnNull(LabelIndex),
    BrOnNonNull(LabelIndex),
    Return,
    Call(FuncIndex),
    CallIndirect {
        ty:    TypeIndex,
        table: TableIndex,
    },
    ReturnCall(FuncIndex),
    ReturnCallIndirect {
        ty:    TypeIndex,
        table: TableIndex,
    },
    CallRef(TypeIndex),
    ReturnCallRef(TypeIndex),

    // Reference instructions
    RefNull(RefType),
    RefIsNull,
    RefFunc(FuncIndex),
    RefAsNonNull,

    // Parametric instructions
    Drop,
    Select,
    SelectT(Vec<ValueType>),

    // Variable instructions
    LocalGet(LocalIndex),
    LocalSet(LocalIndex),
    LocalTee(LocalIndex),
    GlobalGet(GlobalIndex),
    GlobalSet(GlobalIndex),

    // Table instructions
    TableGet(TableIndex),
    TableSet(TableIndex),
    TableGrow(TableIndex),
    TableSize(TableIndex),
    TableFill(TableIndex),
    TableInit {
        table: TableIndex,
        elem:  ElemIndex,
    },
    TableCopy {
        dst: TableIndex,
        src: TableIndex,
    },
    ElemDrop(ElemIndex),

    // Memory instructions
    I32Load(MemArg),
    I64Load(MemArg),
    F32Load(MemArg),
    F64Load(MemArg),
    I32Load8S(MemArg),
    I32Load8U(MemArg),
    I32Load16S(MemArg),
    I32Load16U(MemArg),
    I64Load8S(MemArg),
    I64Load8U(MemArg),
    I64Load16S(MemArg),
    I64Load16U(MemArg),
    I64Load32S(MemArg),
    I64Load32U(MemArg),
    I32Store(MemArg),
    I64Store(MemArg),
    F32Store(MemArg),
    F64Store(MemArg),
    I32Store8(MemArg),
    I32Store16(MemArg),
    I64Store8(MemArg),
    I64Store16(MemArg),
    I64Store32(MemArg),
    MemorySize(MemIndex),
    MemoryGrow(MemIndex),
    MemoryInit {
        memory: MemIndex,
        data:   DataIndex,
    },
    MemoryCopy {
        dst: MemIndex,
        src: MemIndex,
    },
    MemoryFill(MemIndex),
    DataDrop(DataIndex),

    // Numeric instructions
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),

    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,
    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,
    F32Abs,
    F32Neg,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Sqrt,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,
    F64Abs,
    F64Neg,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Sqrt,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,

    I32WrapI64,
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64ExtendI32S,
    I64ExtendI32U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,
    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F32DemoteF64,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,
    I32Extend8S,
    I32Extend16S,
    I64Extend8S,
    I64Extend16S,
    I64Extend32S,
    I32TruncSatF32S,
    I32TruncSatF32U,
    I32TruncSatF64S,
    I32TruncSatF64U,
    I64TruncSatF32S,
    I64TruncSatF32U,
    I64TruncSatF64S,
    I64TruncSatF64U,

    // SIMD memory instructions
    V128Load(MemArg),
    V128Load8x8S(MemArg),
    V128Load8x8U(MemArg),
    V128Load16x4S(MemArg),
    V128Load16x4U(MemArg),
    V128Load32x2S(MemArg),
    V128Load32x2U(MemArg),
    V128Load8Splat(MemArg),
    V128Load16Splat(MemArg),
    V128Load32Splat(MemArg),
    V128Load64Splat(MemArg),
    V128Load32Zero(MemArg),
    V128Load64Zero(MemArg),
    V128Store(MemArg),
    V128Load8Lane(MemArg, u8),
    V128Load16Lane(MemArg, u8),
    V128Load32Lane(MemArg, u8),
    V128Load64Lane(MemArg, u8),
    V128Store8Lane(MemArg, u8),
    V128Store16Lane(MemArg, u8),
    V128Store32Lane(MemArg, u8),
    V128Store64Lane(MemArg, u8),

    // SIMD constant and shuffle instructions
    V128Const(u128),
    /// The immediate packs sixteen lane indices, one per byte.
    I8x16Shuffle(u128),

    // SIMD lane instructions
    I8x16ExtractLaneS(u8),
    I8x16ExtractLaneU(u8),
    I8x16ReplaceLane(u8),
    I16x8ExtractLaneS(u8),
    I16x8ExtractLaneU(u8),
    I16x8ReplaceLane(u8),
    I32x4ExtractLane(u8),
    I32x4ReplaceLane(u8),
    I64x2ExtractLane(u8),
    I64x2ReplaceLane(u8),
    F32x4ExtractLane(u8),
    F32x4ReplaceLane(u8),
    F64x2ExtractLane(u8),
    F64x2ReplaceLane(u8),

    // SIMD numeric instructions
    I8x16Splat,
    I16x8Splat,
    I32x4Splat,
    I64x2Splat,
    F32x4Splat,
    F64x2Splat,

    V128Not,
    I8x16Abs,
    I8x16Neg,
    I8x16Popcnt,
    I16x8Abs,
    I16x8Neg,
    I16x8ExtendLowI8x16S,
    I16x8ExtendHighI8x16S,
    I16x8ExtendLowI8x16U,
    I16x8ExtendHighI8x16U,
    I16x8ExtaddPairwiseI8x16S,
    I16x8ExtaddPairwiseI8x16U,
    I32x4Abs,
    I32x4Neg,
    I32x4ExtendLowI16x8S,
    I32x4ExtendHighI16x8S,
    I32x4ExtendLowI16x8U,
    I32x4ExtendHighI16x8U,
    I32x4ExtaddPairwiseI16x8S,
    I32x4ExtaddPairwiseI16x8U,
    I64x2Abs,
    I64x2Neg,
    I64x2ExtendLowI32x4S,
    I64x2ExtendHighI32x4S,
    I64x2ExtendLowI32x4U,
    I64x2ExtendHighI32x4U,
    F32x4Abs,
    F32x4Neg,
    F32x4Sqrt,
    F64x2Abs,
    F64x2Neg,
    F64x2Sqrt,
    I32x4TruncSatF32x4S,
    I32x4TruncSatF32x4U,
    F32x4ConvertI32x4S,
    F32x4ConvertI32x4U,
    I32x4TruncSatF64x2SZero,
    I32x4TruncSatF64x2UZero,
    F64x2ConvertLowI32x4S,
    F64x2ConvertLowI32x4U,
    F32x4DemoteF64x2Zero,
    F64x2PromoteLowF32x4,
    F32x4Ceil,
    F32x4Floor,
    F32x4Trunc,
    F32x4Nearest,
    F64x2Ceil,
    F64x2Floor,
    F64x2Trunc,
    F64x2Nearest,

    I8x16Swizzle,
    I8x16Eq,
    I8x16Ne,
    I8x16LtS,
    I8x16LtU,
    I8x16GtS,
    I8x16GtU,
    I8x16LeS,
    I8x16LeU,
    I8x16GeS,
    I8x16GeU,
    I16x8Eq,
    I16x8Ne,
    I16x8LtS,
    I16x8LtU,
    I16x8GtS,
    I16x8GtU,
    I16x8LeS,
    I16x8LeU,
    I16x8GeS,
    I16x8GeU,
    I32x4Eq,
    I32x4Ne,
    I32x4LtS,
    I32x4LtU,
    I32x4GtS,
    I32x4GtU,
    I32x4LeS,
    I32x4LeU,
    I32x4GeS,
    I32x4GeU,
    I64x2Eq,
    I64x2Ne,
    I64x2LtS,
    I64x2GtS,
    I64x2LeS,
    I64x2GeS,
    F32x4Eq,
    F32x4Ne,
    F32x4Lt,
    F32x4Gt,
    F32x4Le,
    F32x4Ge,
    F64x2Eq,
    F64x2Ne,
    F64x2Lt,
    F64x2Gt,
    F64x2Le,
    F64x2Ge,
    V128And,
    V128Andnot,
    V128Or,
    V128Xor,
    I8x16NarrowI16x8S,
    I8x16NarrowI16x8U,
    I8x16Add,
    I8x16AddSatS,
    I8x16AddSatU,
    I8x16Sub,
    I8x16SubSatS,
    I8x16SubSatU,
    I8x16MinS,
    I8x16MinU,
    I8x16MaxS,
    I8x16MaxU,
    I8x16AvgrU,
    I16x8NarrowI32x4S,
    I16x8NarrowI32x4U,
    I16x8Add,
    I16x8AddSatS,
    I16x8AddSatU,
    I16x8Sub,
    I16x8SubSatS,
    I16x8SubSatU,
    I16x8Mul,
    I16x8MinS,
    I16x8MinU,
    I16x8MaxS,
    I16x8MaxU,
    I16x8AvgrU,
    I16x8ExtmulLowI8x16S,
    I16x8ExtmulHighI8x16S,
    I16x8ExtmulLowI8x16U,
    I16x8ExtmulHighI8x16U,
    I16x8Q15MulrSatS,
    I32x4Add,
    I32x4Sub,
    I32x4Mul,
    I32x4MinS,
    I32x4MinU,
    I32x4MaxS,
    I32x4MaxU,
    I32x4ExtmulLowI16x8S,
    I32x4ExtmulHighI16x8S,
    I32x4ExtmulLowI16x8U,
    I32x4ExtmulHighI16x8U,
    I32x4DotI16x8S,
    I64x2Add,
    I64x2Sub,
    I64x2Mul,
    I64x2ExtmulLowI32x4S,
    I64x2ExtmulHighI32x4S,
    I64x2ExtmulLowI32x4U,
    I64x2ExtmulHighI32x4U,
    F32x4Add,
    F32x4Sub,
    F32x4Mul,
    F32x4Div,
    F32x4Min,
    F32x4Max,
    F32x4Pmin,
    F32x4Pmax,
    F64x2Add,
    F64x2Sub,
    F64x2Mul,
    F64x2Div,
    F64x2Min,
    F64x2Max,
    F64x2Pmin,
    F64x2Pmax,

    V128Bitselect,
    V128AnyTrue,
    I8x16AllTrue,
    I8x16Bitmask,
    I16x8AllTrue,
    I16x8Bitmask,
    I32x4AllTrue,
    I32x4Bitmask,
    I64x2AllTrue,
    I64x2Bitmask,
    I8x16Shl,
    I8x16ShrS,
    I8x16ShrU,
    I16x8Shl,
    I16x8ShrS,
    I16x8ShrU,
    I32x4Shl,
    I32x4ShrS,
    I32x4ShrU,
    I64x2Shl,
    I64x2ShrS,
    I64x2ShrU,

    // Atomic instructions
    AtomicFence,
    MemoryAtomicNotify(MemArg),
    MemoryAtomicWait32(MemArg),
    MemoryAtomicWait64(MemArg),
    I32AtomicLoad(MemArg),
    I64AtomicLoad(MemArg),
    I32AtomicLoad8U(MemArg),
    I32AtomicLoad16U(MemArg),
    I64AtomicLoad8U(MemArg),
    I64AtomicLoad16U(MemArg),
    I64AtomicLoad32U(MemArg),
    I32AtomicStore(MemArg),
    I64AtomicStore(MemArg),
    I32AtomicStore8(MemArg),
    I32AtomicStore16(MemArg),
    I64AtomicStore8(MemArg),
    I64AtomicStore16(MemArg),
    I64AtomicStore32(MemArg),
    I32AtomicRmwAdd(MemArg),
    I64AtomicRmwAdd(MemArg),
    I32AtomicRmw8AddU(MemArg),
    I32AtomicRmw16AddU(MemArg),
    I64AtomicRmw8AddU(MemArg),
    I64AtomicRmw16AddU(MemArg),
    I64AtomicRmw32AddU(MemArg),
    I32AtomicRmwSub(MemArg),
    I64AtomicRmwSub(MemArg),
    I32AtomicRmw8SubU(MemArg),
    I32AtomicRmw16SubU(MemArg),
    I64AtomicRmw8SubU(MemArg),
    I64AtomicRmw16SubU(MemArg),
    I64AtomicRmw32SubU(MemArg),
    I32AtomicRmwAnd(MemArg),
    I64AtomicRmwAnd(MemArg),
    I32AtomicRmw8AndU(MemArg),
    I32AtomicRmw16AndU(MemArg),
    I64AtomicRmw8AndU(MemArg),
    I64AtomicRmw16AndU(MemArg),
    I64AtomicRmw32AndU(MemArg),
    I32AtomicRmwOr(MemArg),
    I64AtomicRmwOr(MemArg),
    I32AtomicRmw8OrU(MemArg),
    I32AtomicRmw16OrU(MemArg),
    I64AtomicRmw8OrU(MemArg),
    I64AtomicRmw16OrU(MemArg),
    I64AtomicRmw32OrU(MemArg),
    I32AtomicRmwXor(MemArg),
    I64AtomicRmwXor(MemArg),
    I32AtomicRmw8XorU(MemArg),
    I32AtomicRmw16XorU(MemArg),
    I64AtomicRmw8XorU(MemArg),
    I64AtomicRmw16XorU(MemArg),
    I64AtomicRmw32XorU(MemArg),
    I32AtomicRmwXchg(MemArg),
    I64AtomicRmwXchg(MemArg),
    I32AtomicRmw8XchgU(MemArg),
    I32AtomicRmw16XchgU(MemArg),
    I64AtomicRmw8XchgU(MemArg),
    I64AtomicRmw16XchgU(MemArg),
    I64AtomicRmw32XchgU(MemArg),
    I32AtomicRmwCmpxchg(MemArg),
    I64AtomicRmwCmpxchg(MemArg),
    I32AtomicRmw8CmpxchgU(MemArg),
    I32AtomicRmw16CmpxchgU(MemArg),
    I64AtomicRmw8CmpxchgU(MemArg),
    I64AtomicRmw16CmpxchgU(MemArg),
    I64AtomicRmw32CmpxchgU(MemArg),
}
