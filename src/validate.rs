//! The form checker for Wasm function bodies.
//!
//! The checking algorithm is the abstract type-stack algorithm from the
//! appendix of the Wasm specification: an operand stack of possibly-unknown
//! types, a stack of control frames for block nesting, and a journal of
//! locals initialised in the current frame. On top of deciding
//! well-typedness, the checker records for every branch instruction the
//! stack-erase counts and the jump distance the execution engine consumes,
//! and for every local access the slot offset used for addressing.
//!
//! A [`FormChecker`] is a mutable workspace. The module context is populated
//! once through the `add_*` methods, in declaration order, and is read-only
//! during checking. A failed [`validate`](FormChecker::validate) leaves the
//! workspace in an unspecified state; callers are expected to
//! [`reset`](FormChecker::reset) before reuse.

use crate::{
    constants::{MAX_ALIGNMENT, SHUFFLE_LANE_MASK},
    errors::{CheckError, CheckResult, CodeError, TypeMismatch},
    types::*,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
/// A possibly known type. Unknown types appear on the stack after we enter an
/// unreachable part of the code. That part must still be type-checked, but
/// the stack at that point is arbitrary.
pub enum MaybeKnown {
    Unknown,
    Known(ValueType),
}

use MaybeKnown::*;

impl MaybeKnown {
    pub fn is_unknown(self) -> bool { self == MaybeKnown::Unknown }
}

#[derive(Debug, Default)]
/// The operand stack containing either known or unknown types.
///
/// The default instance produces an empty operand stack.
pub struct OperandStack {
    pub(crate) stack: Vec<MaybeKnown>,
}

#[derive(Debug, Default)]
/// The stack of control frames, one per entered block.
///
/// The default instance produces an empty control stack.
pub struct ControlStack {
    pub(crate) stack: Vec<CtrlFrame>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// The originating opcode of a control frame. Loops are the only kind whose
/// label consumes the start types rather than the end types.
pub enum FrameKind {
    Block,
    Loop,
    If,
    Else,
}

#[derive(Debug)]
/// A single control frame. This records the types for jumping to the label of
/// this block or exiting it normally, the instruction a branch to it lands
/// on, and the stack and journal heights at entry.
pub struct CtrlFrame {
    /// Parameter types of the block.
    pub(crate) start_types:   Vec<ValueType>,
    /// Result types of the block.
    pub(crate) end_types:     Vec<ValueType>,
    /// Index of the instruction a branch to this frame lands on: the `loop`
    /// header for loops, the matching `end` otherwise.
    pub(crate) jump_target:   usize,
    /// Height of the operand stack at entry of this block.
    pub(crate) height:        usize,
    /// Length of the local-init journal at entry of this block.
    pub(crate) inited_locals: usize,
    pub(crate) kind:          FrameKind,
    /// Whether we are in the unreachable part of this block, i.e., after an
    /// unconditional jump or a trap instruction.
    pub(crate) unreachable:   bool,
}

/// The types a branch to the given frame consumes.
fn label_types(frame: &CtrlFrame) -> &[ValueType] {
    if frame.kind == FrameKind::Loop {
        &frame.start_types
    } else {
        &frame.end_types
    }
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
/// The stack-erase bookkeeping a branch needs at run time: how many values
/// sit above the target frame's base at the branch site (including the
/// preserved arity), how many of those are preserved across the erase, and
/// the signed instruction distance to the landing point.
pub struct BranchFixup {
    pub stack_erase_begin: u32,
    pub stack_erase_end:   u32,
    pub pc_offset:         i32,
}

#[derive(Debug, Default)]
/// Bookkeeping produced by a successful validation, keyed by the index of the
/// instruction in the checked sequence. The decoded instruction stream itself
/// is never written to; the engine pairs it with this table.
pub struct CodeAnnotations {
    /// For `br`, `br_if`, `br_on_null` and `br_on_non_null`.
    pub branches:             BTreeMap<usize, BranchFixup>,
    /// For `br_table`, one fixup per labelled target in immediate order,
    /// followed by the default target.
    pub branch_tables:        BTreeMap<usize, Vec<BranchFixup>>,
    /// For `local.get`, `local.set` and `local.tee`, the distance the engine
    /// uses to address the local slot relative to the operand stack.
    pub stack_offsets:        BTreeMap<usize, u32>,
    /// Maximum operand stack height reachable in the validated expression.
    /// Unreachable code does not contribute.
    pub max_reachable_height: usize,
}

#[derive(Debug, Clone, Copy)]
/// A local slot: its declared type and whether it is initialised at the
/// current point of checking.
struct LocalEntry {
    ty:      ValueType,
    is_init: bool,
}

/// Emit the diagnostic for an error before handing it back. The `log` facade
/// is the sink the caller installs; the checker never owns one.
fn log_err(error: CheckError) -> CheckError {
    log::error!("{}", error);
    error
}

#[derive(Debug, Default)]
/// The form checker workspace: the accumulated module context together with
/// the transient state of the expression currently being checked.
///
/// The default instance is a checker for the empty module.
pub struct FormChecker {
    // Module context, populated via the `add_*` methods.
    types:              Vec<Rc<FunctionType>>,
    funcs:              Vec<TypeIndex>,
    tables:             Vec<ValueType>,
    mems:               u32,
    globals:            Vec<Global>,
    datas:              u32,
    elems:              Vec<ValueType>,
    refs:               BTreeSet<FuncIndex>,
    num_import_funcs:   u32,
    num_import_globals: u32,
    // Transient state of the current validation.
    locals:             Vec<LocalEntry>,
    local_inits:        Vec<LocalIndex>,
    returns:            Vec<ValueType>,
    vals:               OperandStack,
    ctrls:              ControlStack,
    annots:             CodeAnnotations,
}

impl FormChecker {
    pub fn new() -> Self { Self::default() }

    /// Clear the transient per-expression state. With `clean_module` the
    /// accumulated module context is dropped as well.
    pub fn reset(&mut self, clean_module: bool) {
        self.vals.stack.clear();
        self.ctrls.stack.clear();
        self.locals.clear();
        self.local_inits.clear();
        self.returns.clear();

        if clean_module {
            self.types.clear();
            self.funcs.clear();
            self.tables.clear();
            self.mems = 0;
            self.globals.clear();
            self.datas = 0;
            self.elems.clear();
            self.refs.clear();
            self.num_import_funcs = 0;
            self.num_import_globals = 0;
        }
    }

    /// Register a function type, in type-section order.
    pub fn add_type(&mut self, ty: FunctionType) { self.types.push(Rc::new(ty)); }

    /// Register a function by the index of its type. Indices that do not
    /// refer to a registered type are dropped; an earlier loading phase has
    /// already rejected them.
    pub fn add_func(&mut self, type_idx: TypeIndex, is_import: bool) {
        if (type_idx as usize) < self.types.len() {
            self.funcs.push(type_idx);
        }
        if is_import {
            self.num_import_funcs += 1;
        }
    }

    /// Register a table by its element reference type.
    pub fn add_table(&mut self, element_type: ValueType) { self.tables.push(element_type); }

    pub fn add_memory(&mut self) { self.mems += 1; }

    pub fn add_global(&mut self, ty: ValueType, mutable: bool, is_import: bool) {
        self.globals.push(Global {
            ty,
            mutable,
        });
        if is_import {
            self.num_import_globals += 1;
        }
    }

    pub fn add_data(&mut self) { self.datas += 1; }

    /// Register an element segment by its element reference type.
    pub fn add_elem(&mut self, element_type: ValueType) { self.elems.push(element_type); }

    /// Mark a function index as declared for reference, allowing `ref.func`.
    pub fn add_ref(&mut self, func_idx: FuncIndex) { self.refs.insert(func_idx); }

    /// Append a local slot. Parameters are locals too and must be added
    /// first, as initialised. Defaultable types start out initialised.
    pub fn add_local(&mut self, ty: ValueType, initialized: bool) {
        self.locals.push(LocalEntry {
            ty,
            is_init: false,
        });
        if initialized || ty.is_defaultable() {
            let idx = (self.locals.len() - 1) as LocalIndex;
            self.local_inits.push(idx);
            if let Some(entry) = self.locals.last_mut() {
                entry.is_init = true;
            }
        }
    }

    /// Number of imported functions registered so far.
    pub fn num_imported_funcs(&self) -> u32 { self.num_import_funcs }

    /// Number of imported globals registered so far.
    pub fn num_imported_globals(&self) -> u32 { self.num_import_globals }

    /// Check one expression against the expected return types and produce the
    /// branch and local-slot annotations for it.
    ///
    /// Instructions are checked strictly in program order. The first failure
    /// aborts checking and is surfaced together with the offending opcode and
    /// its byte offset.
    pub fn validate(
        &mut self,
        instrs: &[Instruction],
        returns: &[ValueType],
    ) -> Result<CodeAnnotations, CodeError> {
        self.annots = CodeAnnotations::default();
        self.returns.extend_from_slice(returns);
        if instrs.is_empty() {
            return Ok(std::mem::take(&mut self.annots));
        }
        // The outermost frame: no parameters, the function returns as
        // results, and the final instruction as the landing point of
        // `return`-like branches.
        let outer_results = self.returns.clone();
        self.push_ctrl(Vec::new(), outer_results, instrs.len() - 1, FrameKind::Block);
        for (at, instr) in instrs.iter().enumerate() {
            if let Err(error) = self.check_instr(instr, at) {
                return Err(error.at(instr));
            }
        }
        if !self.ctrls.stack.is_empty() {
            if let Some(instr) = instrs.last() {
                let error = CheckError::TypeCheckFailed(TypeMismatch::UnterminatedExpression);
                return Err(log_err(error).at(instr));
            }
        }
        Ok(std::mem::take(&mut self.annots))
    }

    /// Check that a value type is well-formed with respect to the module
    /// context, i.e., a type-indexed reference stays within the type table.
    pub fn check_value_type(&self, ty: ValueType) -> CheckResult<()> {
        if let ValueType::Ref(RefType {
            heap: HeapType::TypeIdx(idx),
            ..
        }) = ty
        {
            if idx as usize >= self.types.len() {
                return Err(log_err(CheckError::InvalidFuncTypeIdx {
                    index: idx,
                    bound: self.types.len() as u32,
                }));
            }
        }
        Ok(())
    }

    /// Whether `got` is assignable to `expect`.
    ///
    /// Non-reference types match by equality. For references, a nullable
    /// value never matches a non-nullable expectation; equal abstract heap
    /// types match; any concrete function reference matches the abstract
    /// `func` heap type; and two concrete references match if the referenced
    /// function types match pointwise in both directions of the signature.
    /// The recursion through concrete references is bounded by the number of
    /// declared types, which suffices because type indices are well-founded.
    pub fn match_type(&self, expect: ValueType, got: ValueType) -> CheckResult<bool> {
        self.match_type_bounded(expect, got, 0)
    }

    /// Pointwise [`match_type`](Self::match_type) of two type lists of equal
    /// length. The comparison is ordered and positional.
    pub fn match_types(&self, expect: &[ValueType], got: &[ValueType]) -> CheckResult<bool> {
        self.match_types_bounded(expect, got, 0)
    }

    fn match_type_bounded(
        &self,
        expect: ValueType,
        got: ValueType,
        depth: usize,
    ) -> CheckResult<bool> {
        if depth > self.types.len() {
            return Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::MatchDepthExceeded)));
        }
        match (expect, got) {
            (ValueType::Ref(e), ValueType::Ref(g)) => {
                if !e.nullable && g.nullable {
                    return Ok(false);
                }
                match (e.heap, g.heap) {
                    (HeapType::TypeIdx(i), HeapType::TypeIdx(j)) => {
                        match (self.types.get(i as usize), self.types.get(j as usize)) {
                            (Some(ei), Some(gj)) => Ok(self.match_types_bounded(
                                &ei.parameters,
                                &gj.parameters,
                                depth + 1,
                            )? && self.match_types_bounded(
                                &ei.results,
                                &gj.results,
                                depth + 1,
                            )?),
                            _ => Ok(false),
                        }
                    }
                    // Any concrete function reference is a funcref.
                    (HeapType::Func, HeapType::TypeIdx(_)) => Ok(true),
                    (he, hg) => Ok(he == hg),
                }
            }
            (e, g) if !e.is_ref() && !g.is_ref() => Ok(e == g),
            _ => Ok(false),
        }
    }

    fn match_types_bounded(
        &self,
        expect: &[ValueType],
        got: &[ValueType],
        depth: usize,
    ) -> CheckResult<bool> {
        if expect.len() != got.len() {
            return Ok(false);
        }
        for (&e, &g) in expect.iter().zip(got.iter()) {
            if !self.match_type_bounded(e, g, depth)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// As [`match_types`](Self::match_types), but a failure to match is an
    /// error carrying both lists.
    fn require_matching(&self, expect: &[ValueType], got: &[ValueType]) -> CheckResult<()> {
        if self.match_types(expect, got)? {
            Ok(())
        } else {
            Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::Lists {
                expected: expect.to_vec(),
                actual:   got.to_vec(),
            })))
        }
    }

    #[cfg_attr(not(feature = "fuzz-coverage"), inline(always))]
    fn push_maybe(&mut self, m_type: MaybeKnown) {
        self.vals.stack.push(m_type);
        if let Some(frame) = self.ctrls.stack.last() {
            if !frame.unreachable {
                self.annots.max_reachable_height =
                    std::cmp::max(self.annots.max_reachable_height, self.vals.stack.len());
            }
        }
    }

    #[cfg_attr(not(feature = "fuzz-coverage"), inline(always))]
    fn push_type(&mut self, ty: ValueType) { self.push_maybe(Known(ty)); }

    fn push_types(&mut self, tys: &[ValueType]) {
        for &ty in tys {
            self.push_type(ty);
        }
    }

    /// Pop a type from the stack. At the base of an unreachable frame this
    /// yields `Unknown` without shrinking the stack; at the base of a
    /// reachable frame it is an underflow.
    fn pop_any(&mut self) -> CheckResult<MaybeKnown> {
        match self.ctrls.stack.last() {
            None => {
                Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::ControlStackUnderflow)))
            }
            Some(frame) => {
                if self.vals.stack.len() == frame.height {
                    if frame.unreachable {
                        Ok(Unknown)
                    } else {
                        Err(log_err(CheckError::TypeCheckFailed(
                            TypeMismatch::ValueStackUnderflow,
                        )))
                    }
                } else {
                    self.vals.stack.pop().ok_or_else(|| {
                        log_err(CheckError::TypeCheckFailed(TypeMismatch::ValueStackUnderflow))
                    })
                }
            }
        }
    }

    /// Pop a type and check it against the expectation. An unknown entry
    /// assumes the expected type.
    fn pop_expect(&mut self, expect: ValueType) -> CheckResult<ValueType> {
        match self.pop_any()? {
            Unknown => Ok(expect),
            Known(actual) => {
                if self.match_type(expect, actual)? {
                    Ok(actual)
                } else {
                    Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::Single {
                        expected: expect,
                        actual,
                    })))
                }
            }
        }
    }

    /// Pop a list of expected types, in reverse order of the list.
    fn pop_types(&mut self, expected: &[ValueType]) -> CheckResult<()> {
        for &ty in expected.iter().rev() {
            self.pop_expect(ty)?;
        }
        Ok(())
    }

    fn stack_trans(&mut self, take: &[ValueType], put: &[ValueType]) -> CheckResult<()> {
        self.pop_types(take)?;
        self.push_types(put);
        Ok(())
    }

    fn stack_pop_any(&mut self) -> CheckResult<()> { self.pop_any().map(|_| ()) }

    /// Push a new control frame and re-push its parameter types.
    fn push_ctrl(
        &mut self,
        start_types: Vec<ValueType>,
        end_types: Vec<ValueType>,
        jump_target: usize,
        kind: FrameKind,
    ) {
        let frame = CtrlFrame {
            height: self.vals.stack.len(),
            inited_locals: self.local_inits.len(),
            start_types,
            end_types,
            jump_target,
            kind,
            unreachable: false,
        };
        let params = frame.start_types.clone();
        self.ctrls.stack.push(frame);
        self.push_types(&params);
    }

    /// Pop the current control frame: its result types must sit on the stack
    /// and nothing else above the frame's base. Locals initialised during
    /// the frame become uninitialised again.
    fn pop_ctrl(&mut self) -> CheckResult<CtrlFrame> {
        let (end_types, height, inited) = match self.ctrls.stack.last() {
            None => {
                return Err(log_err(CheckError::TypeCheckFailed(
                    TypeMismatch::ControlStackUnderflow,
                )))
            }
            Some(frame) => (frame.end_types.clone(), frame.height, frame.inited_locals),
        };
        self.pop_types(&end_types)?;
        if self.vals.stack.len() != height {
            return Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::ValueStackLeftover)));
        }
        let journal = self.local_inits.split_off(inited.min(self.local_inits.len()));
        for idx in journal {
            if let Some(entry) = self.locals.get_mut(idx as usize) {
                entry.is_init = false;
            }
        }
        self.ctrls.stack.pop().ok_or_else(|| {
            log_err(CheckError::TypeCheckFailed(TypeMismatch::ControlStackUnderflow))
        })
    }

    /// Discard everything above the current frame's base and mark the rest
    /// of the frame unreachable. Subsequent pops in this frame yield
    /// `Unknown` until the matching `end` or `else`.
    fn mark_unreachable(&mut self) -> CheckResult<()> {
        match self.ctrls.stack.last_mut() {
            None => {
                Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::ControlStackUnderflow)))
            }
            Some(frame) => {
                self.vals.stack.truncate(frame.height);
                frame.unreachable = true;
                Ok(())
            }
        }
    }

    fn top_frame_unreachable(&self) -> bool {
        self.ctrls.stack.last().map_or(false, |frame| frame.unreachable)
    }

    /// Resolve a label index to the absolute position of its frame on the
    /// control stack.
    fn frame_at_depth(&self, label: LabelIndex) -> CheckResult<usize> {
        let depth = self.ctrls.stack.len();
        if (label as usize) < depth {
            Ok(depth - 1 - label as usize)
        } else {
            Err(log_err(CheckError::InvalidLabelIdx {
                index: label,
                bound: depth as u32,
            }))
        }
    }

    /// The fixup for a branch at instruction `at` to the frame at absolute
    /// position `target`, to be computed after the label types were popped.
    fn branch_fixup(&self, target: usize, arity: usize, at: usize) -> BranchFixup {
        let frame = &self.ctrls.stack[target];
        let remain = (self.vals.stack.len() - frame.height) as u32;
        BranchFixup {
            stack_erase_begin: remain + arity as u32,
            stack_erase_end:   arity as u32,
            pc_offset:         (frame.jump_target as i64 - at as i64) as i32,
        }
    }

    fn note_stack_offset(&mut self, at: usize, idx: LocalIndex) {
        let offset = (self.vals.stack.len() + (self.locals.len() - idx as usize)) as u32;
        self.annots.stack_offsets.insert(at, offset);
    }

    fn local_entry(&self, idx: LocalIndex) -> CheckResult<LocalEntry> {
        match self.locals.get(idx as usize) {
            Some(&entry) => Ok(entry),
            None => Err(log_err(CheckError::InvalidLocalIdx {
                index: idx,
                bound: self.locals.len() as u32,
            })),
        }
    }

    fn init_local(&mut self, idx: LocalIndex) {
        if let Some(entry) = self.locals.get_mut(idx as usize) {
            if !entry.is_init {
                entry.is_init = true;
                self.local_inits.push(idx);
            }
        }
    }

    fn get_type(&self, idx: TypeIndex) -> CheckResult<Rc<FunctionType>> {
        match self.types.get(idx as usize) {
            Some(ty) => Ok(ty.clone()),
            None => Err(log_err(CheckError::InvalidFuncTypeIdx {
                index: idx,
                bound: self.types.len() as u32,
            })),
        }
    }

    fn get_func_type(&self, idx: FuncIndex) -> CheckResult<Rc<FunctionType>> {
        match self.funcs.get(idx as usize) {
            Some(&type_idx) => self.get_type(type_idx),
            None => Err(log_err(CheckError::InvalidFuncIdx {
                index: idx,
                bound: self.funcs.len() as u32,
            })),
        }
    }

    fn get_table(&self, idx: TableIndex) -> CheckResult<ValueType> {
        match self.tables.get(idx as usize) {
            Some(&ty) => Ok(ty),
            None => Err(log_err(CheckError::InvalidTableIdx {
                index: idx,
                bound: self.tables.len() as u32,
            })),
        }
    }

    fn get_global(&self, idx: GlobalIndex) -> CheckResult<Global> {
        match self.globals.get(idx as usize) {
            Some(&global) => Ok(global),
            None => Err(log_err(CheckError::InvalidGlobalIdx {
                index: idx,
                bound: self.globals.len() as u32,
            })),
        }
    }

    /// Require a funcref table at the given index, as `call_indirect` does.
    fn get_funcref_table(&self, idx: TableIndex) -> CheckResult<()> {
        let ty = self.get_table(idx)?;
        if !ty.is_func_ref() {
            return Err(log_err(CheckError::InvalidTableIdx {
                index: idx,
                bound: self.tables.len() as u32,
            }));
        }
        Ok(())
    }

    /// Resolve the block type immediate into parameter and result lists.
    fn resolve_block_type(&self, ty: BlockType) -> CheckResult<(Vec<ValueType>, Vec<ValueType>)> {
        match ty {
            BlockType::Empty => Ok((Vec::new(), Vec::new())),
            BlockType::Value(v) => {
                self.check_value_type(v)?;
                Ok((Vec::new(), vec![v]))
            }
            BlockType::Func(idx) => {
                let ty = self.get_type(idx)?;
                Ok((ty.parameters.clone(), ty.results.clone()))
            }
        }
    }

    fn check_mem(&self, memory: MemIndex) -> CheckResult<()> {
        if memory >= self.mems {
            return Err(log_err(CheckError::InvalidMemoryIdx {
                index: memory,
                bound: self.mems,
            }));
        }
        Ok(())
    }

    fn check_mem_and_trans(
        &mut self,
        memory: MemIndex,
        take: &[ValueType],
        put: &[ValueType],
    ) -> CheckResult<()> {
        self.check_mem(memory)?;
        self.stack_trans(take, put)
    }

    /// Check the memory index and the natural-alignment rule, `2^align <=
    /// bits / 8`, and perform the stack transformation.
    fn check_align_and_trans(
        &mut self,
        bits: u32,
        memarg: MemArg,
        take: &[ValueType],
        put: &[ValueType],
    ) -> CheckResult<()> {
        self.check_mem(memarg.memory)?;
        if memarg.align > MAX_ALIGNMENT || (1u64 << memarg.align) > u64::from(bits / 8) {
            return Err(log_err(CheckError::InvalidAlignment {
                align:   memarg.align,
                natural: bits / 8,
            }));
        }
        self.stack_trans(take, put)
    }

    fn check_lane(&self, lane: u8, bound: u32) -> CheckResult<()> {
        if u32::from(lane) >= bound {
            return Err(log_err(CheckError::InvalidLaneIdx {
                index: lane.into(),
                bound,
            }));
        }
        Ok(())
    }

    fn check_lane_and_trans(
        &mut self,
        bound: u32,
        lane: u8,
        take: &[ValueType],
        put: &[ValueType],
    ) -> CheckResult<()> {
        self.check_lane(lane, bound)?;
        self.stack_trans(take, put)
    }

    /// Lane variant of the aligned memory access: a `bits`-wide access has
    /// `128 / bits` addressable lanes.
    fn check_align_lane_and_trans(
        &mut self,
        bits: u32,
        memarg: MemArg,
        lane: u8,
        take: &[ValueType],
        put: &[ValueType],
    ) -> CheckResult<()> {
        self.check_mem(memarg.memory)?;
        if memarg.align > MAX_ALIGNMENT || (1u64 << memarg.align) > u64::from(bits / 8) {
            return Err(log_err(CheckError::InvalidAlignment {
                align:   memarg.align,
                natural: bits / 8,
            }));
        }
        self.check_lane(lane, 128 / bits)?;
        self.stack_trans(take, put)
    }

    /// Check a single instruction, updating the workspace and recording
    /// annotations. `at` is the index of the instruction in the sequence.
    fn check_instr(&mut self, instr: &Instruction, at: usize) -> CheckResult<()> {
        use OpCode::*;
        use ValueType::{F32, F64, I32, I64, V128};
        match &instr.opcode {
            // Control instructions.
            Unreachable => self.mark_unreachable(),
            Nop => Ok(()),

            Block {
                ty,
                jump_end,
            } => {
                let (t1, t2) = self.resolve_block_type(*ty)?;
                self.pop_types(&t1)?;
                self.push_ctrl(t1, t2, at + *jump_end as usize, FrameKind::Block);
                Ok(())
            }
            Loop {
                ty,
            } => {
                let (t1, t2) = self.resolve_block_type(*ty)?;
                self.pop_types(&t1)?;
                // Branches to a loop land on the loop header itself.
                self.push_ctrl(t1, t2, at, FrameKind::Loop);
                Ok(())
            }
            If {
                ty,
                jump_else,
                jump_end,
            } => {
                let (t1, t2) = self.resolve_block_type(*ty)?;
                self.pop_expect(I32)?;
                self.pop_types(&t1)?;
                if jump_else == jump_end {
                    // No else arm; the implicit empty one must be
                    // type-compatible.
                    self.require_matching(&t2, &t1)?;
                }
                self.push_ctrl(t1, t2, at + *jump_end as usize, FrameKind::If);
                Ok(())
            }
            Else => {
                let frame = self.pop_ctrl()?;
                let jump_target = frame.jump_target;
                self.push_ctrl(frame.start_types, frame.end_types, jump_target, FrameKind::Else);
                Ok(())
            }
            End => {
                let frame = self.pop_ctrl()?;
                self.push_types(&frame.end_types);
                Ok(())
            }

            Br(label) => {
                let target = self.frame_at_depth(*label)?;
                let tys = label_types(&self.ctrls.stack[target]).to_vec();
                self.pop_types(&tys)?;
                let fixup = self.branch_fixup(target, tys.len(), at);
                self.annots.branches.insert(at, fixup);
                self.mark_unreachable()
            }
            BrIf(label) => {
                let target = self.frame_at_depth(*label)?;
                self.pop_expect(I32)?;
                let tys = label_types(&self.ctrls.stack[target]).to_vec();
                self.pop_types(&tys)?;
                let fixup = self.branch_fixup(target, tys.len(), at);
                self.annots.branches.insert(at, fixup);
                // Not taking the branch leaves the stack as it was.
                self.push_types(&tys);
                Ok(())
            }
            BrTable {
                labels,
                default,
            } => {
                self.pop_expect(I32)?;
                let m = self.frame_at_depth(*default)?;
                let m_arity = label_types(&self.ctrls.stack[m]).len();
                let mut fixups = Vec::with_capacity(labels.len() + 1);
                for &label in labels {
                    let n = self.frame_at_depth(label)?;
                    let n_tys = label_types(&self.ctrls.stack[n]).to_vec();
                    if n_tys.len() != m_arity {
                        let m_tys = label_types(&self.ctrls.stack[m]).to_vec();
                        return self.require_matching(&m_tys, &n_tys);
                    }
                    // Pop every expected type, remembering what came off so
                    // the stack can be restored for the remaining targets.
                    // Inside an unreachable frame the popped prefix stays
                    // unknown.
                    let mut buffer = vec![Unknown; n_tys.len()];
                    for (i, &ty) in n_tys.iter().enumerate().rev() {
                        let popped = self.pop_expect(ty)?;
                        if !self.top_frame_unreachable() {
                            buffer[i] = Known(popped);
                        }
                    }
                    fixups.push(self.branch_fixup(n, n_tys.len(), at));
                    for v in buffer {
                        self.push_maybe(v);
                    }
                }
                let m_tys = label_types(&self.ctrls.stack[m]).to_vec();
                self.pop_types(&m_tys)?;
                fixups.push(self.branch_fixup(m, m_tys.len(), at));
                self.annots.branch_tables.insert(at, fixups);
                self.mark_unreachable()
            }
            BrOnNull(label) => {
                let target = self.frame_at_depth(*label)?;
                match self.pop_any()? {
                    // Unreachable code; nothing to check or record.
                    Unknown => Ok(()),
                    Known(ValueType::Ref(rt)) => {
                        let tys = label_types(&self.ctrls.stack[target]).to_vec();
                        self.pop_types(&tys)?;
                        let fixup = self.branch_fixup(target, tys.len(), at);
                        self.annots.branches.insert(at, fixup);
                        self.push_types(&tys);
                        // When not taken the reference is known non-null.
                        self.push_type(ValueType::Ref(rt.as_non_null()));
                        Ok(())
                    }
                    Known(_) => Err(log_err(CheckError::InvalidBrRefType)),
                }
            }
            BrOnNonNull(label) => {
                let target = self.frame_at_depth(*label)?;
                let mut tys = label_types(&self.ctrls.stack[target]).to_vec();
                let rt = match tys.pop() {
                    Some(ValueType::Ref(rt)) if !rt.nullable => rt,
                    _ => return Err(log_err(CheckError::InvalidBrRefType)),
                };
                self.pop_expect(ValueType::Ref(rt.as_nullable()))
                    .map_err(|_| log_err(CheckError::InvalidBrRefType))?;
                self.pop_types(&tys).map_err(|_| log_err(CheckError::InvalidBrRefType))?;
                // The reference itself counts towards the branch arity.
                let fixup = self.branch_fixup(target, tys.len() + 1, at);
                self.annots.branches.insert(at, fixup);
                self.push_types(&tys);
                Ok(())
            }
            Return => {
                let returns = self.returns.clone();
                self.pop_types(&returns)?;
                self.mark_unreachable()
            }

            Call(idx) => {
                let ty = self.get_func_type(*idx)?;
                self.stack_trans(&ty.parameters, &ty.results)
            }
            CallIndirect {
                ty,
                table,
            } => {
                self.get_funcref_table(*table)?;
                let ty = self.get_type(*ty)?;
                self.pop_expect(I32)?;
                self.stack_trans(&ty.parameters, &ty.results)
            }
            ReturnCall(idx) => {
                let ty = self.get_func_type(*idx)?;
                let returns = self.returns.clone();
                self.require_matching(&returns, &ty.results)?;
                self.pop_types(&ty.parameters)?;
                self.mark_unreachable()
            }
            ReturnCallIndirect {
                ty,
                table,
            } => {
                self.get_funcref_table(*table)?;
                let ty = self.get_type(*ty)?;
                let returns = self.returns.clone();
                self.require_matching(&returns, &ty.results)?;
                self.pop_expect(I32)?;
                self.pop_types(&ty.parameters)?;
                self.mark_unreachable()
            }
            CallRef(type_idx) => {
                let ty = self.get_type(*type_idx)?;
                let mut input = ty.parameters.clone();
                input.push(ValueType::func_ref(*type_idx));
                self.pop_types(&input)?;
                self.push_types(&ty.results);
                Ok(())
            }
            ReturnCallRef(type_idx) => {
                let ty = self.get_type(*type_idx)?;
                let returns = self.returns.clone();
                self.require_matching(&returns, &ty.results)?;
                let mut input = ty.parameters.clone();
                input.push(ValueType::func_ref(*type_idx));
                self.pop_types(&input)?;
                self.mark_unreachable()
            }

            // Reference instructions.
            RefNull(rt) => {
                self.check_value_type(ValueType::Ref(*rt))?;
                self.push_type(ValueType::Ref(*rt));
                Ok(())
            }
            RefIsNull => {
                if let Known(ty) = self.pop_any()? {
                    if !ty.is_ref() {
                        return Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::Single {
                            expected: FUNC_REF,
                            actual:   ty,
                        })));
                    }
                }
                self.push_type(I32);
                Ok(())
            }
            RefFunc(idx) => {
                if !self.refs.contains(idx) {
                    return Err(log_err(CheckError::InvalidRefIdx {
                        index: *idx,
                    }));
                }
                match self.funcs.get(*idx as usize) {
                    Some(&type_idx) => {
                        self.push_type(ValueType::Ref(RefType {
                            nullable: false,
                            heap:     HeapType::TypeIdx(type_idx),
                        }));
                        Ok(())
                    }
                    None => Err(log_err(CheckError::InvalidFuncIdx {
                        index: *idx,
                        bound: self.funcs.len() as u32,
                    })),
                }
            }
            RefAsNonNull => match self.pop_any()? {
                Unknown => {
                    self.push_maybe(Unknown);
                    Ok(())
                }
                Known(ValueType::Ref(rt)) => {
                    self.push_type(ValueType::Ref(rt.as_non_null()));
                    Ok(())
                }
                Known(ty) => Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::Single {
                    expected: FUNC_REF,
                    actual:   ty,
                }))),
            },

            // Parametric instructions.
            Drop => self.stack_pop_any(),
            Select => {
                self.pop_expect(I32)?;
                let t1 = self.pop_any()?;
                let t2 = self.pop_any()?;
                // The untyped form is restricted to numeric and vector
                // operands; references need the annotated form.
                for t in [t1, t2] {
                    if let Known(ty) = t {
                        if !ty.is_num() && !ty.is_vec() {
                            return Err(log_err(CheckError::TypeCheckFailed(
                                TypeMismatch::Single {
                                    expected: I32,
                                    actual:   ty,
                                },
                            )));
                        }
                    }
                }
                if let (Known(c1), Known(c2)) = (t1, t2) {
                    if c1 != c2 {
                        return Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::Single {
                            expected: c1,
                            actual:   c2,
                        })));
                    }
                }
                if t1.is_unknown() {
                    self.push_maybe(t2);
                } else {
                    self.push_maybe(t1);
                }
                Ok(())
            }
            SelectT(tys) => match tys.as_slice() {
                [ty] => {
                    let ty = *ty;
                    self.check_value_type(ty)?;
                    self.pop_types(&[ty, ty, I32])?;
                    self.push_type(ty);
                    Ok(())
                }
                _ => Err(log_err(CheckError::InvalidResultArity {
                    arity: tys.len(),
                })),
            },

            // Variable instructions.
            LocalGet(idx) => {
                let entry = self.local_entry(*idx)?;
                self.note_stack_offset(at, *idx);
                if !entry.is_init {
                    return Err(log_err(CheckError::InvalidUninitLocal {
                        index: *idx,
                    }));
                }
                self.push_type(entry.ty);
                Ok(())
            }
            LocalSet(idx) => {
                let entry = self.local_entry(*idx)?;
                self.note_stack_offset(at, *idx);
                self.pop_expect(entry.ty)?;
                self.init_local(*idx);
                Ok(())
            }
            LocalTee(idx) => {
                let entry = self.local_entry(*idx)?;
                self.note_stack_offset(at, *idx);
                self.pop_expect(entry.ty)?;
                self.push_type(entry.ty);
                self.init_local(*idx);
                Ok(())
            }
            GlobalGet(idx) => {
                let global = self.get_global(*idx)?;
                self.push_type(global.ty);
                Ok(())
            }
            GlobalSet(idx) => {
                let global = self.get_global(*idx)?;
                if !global.mutable {
                    return Err(log_err(CheckError::ImmutableGlobal {
                        index: *idx,
                    }));
                }
                self.pop_expect(global.ty)?;
                Ok(())
            }

            // Table instructions.
            TableGet(idx) => {
                let ty = self.get_table(*idx)?;
                self.stack_trans(&[I32], &[ty])
            }
            TableSet(idx) => {
                let ty = self.get_table(*idx)?;
                self.stack_trans(&[I32, ty], &[])
            }
            TableGrow(idx) => {
                let ty = self.get_table(*idx)?;
                self.stack_trans(&[ty, I32], &[I32])
            }
            TableSize(idx) => {
                self.get_table(*idx)?;
                self.stack_trans(&[], &[I32])
            }
            TableFill(idx) => {
                let ty = self.get_table(*idx)?;
                self.stack_trans(&[I32, ty, I32], &[])
            }
            TableInit {
                table,
                elem,
            } => {
                let table_ty = self.get_table(*table)?;
                let elem_ty = match self.elems.get(*elem as usize) {
                    Some(&ty) => ty,
                    None => {
                        return Err(log_err(CheckError::InvalidElemIdx {
                            index: *elem,
                            bound: self.elems.len() as u32,
                        }))
                    }
                };
                if !self.match_type(table_ty, elem_ty)? {
                    return Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::Single {
                        expected: table_ty,
                        actual:   elem_ty,
                    })));
                }
                self.stack_trans(&[I32, I32, I32], &[])
            }
            TableCopy {
                dst,
                src,
            } => {
                let dst_ty = self.get_table(*dst)?;
                let src_ty = self.get_table(*src)?;
                if !self.match_type(dst_ty, src_ty)? {
                    return Err(log_err(CheckError::TypeCheckFailed(TypeMismatch::Single {
                        expected: dst_ty,
                        actual:   src_ty,
                    })));
                }
                self.stack_trans(&[I32, I32, I32], &[])
            }
            ElemDrop(idx) => {
                if (*idx as usize) >= self.elems.len() {
                    return Err(log_err(CheckError::InvalidElemIdx {
                        index: *idx,
                        bound: self.elems.len() as u32,
                    }));
                }
                Ok(())
            }

            // Memory instructions.
            I32Load(m) => self.check_align_and_trans(32, *m, &[I32], &[I32]),
            I64Load(m) => self.check_align_and_trans(64, *m, &[I32], &[I64]),
            F32Load(m) => self.check_align_and_trans(32, *m, &[I32], &[F32]),
            F64Load(m) => self.check_align_and_trans(64, *m, &[I32], &[F64]),
            I32Load8S(m) | I32Load8U(m) => self.check_align_and_trans(8, *m, &[I32], &[I32]),
            I32Load16S(m) | I32Load16U(m) => self.check_align_and_trans(16, *m, &[I32], &[I32]),
            I64Load8S(m) | I64Load8U(m) => self.check_align_and_trans(8, *m, &[I32], &[I64]),
            I64Load16S(m) | I64Load16U(m) => self.check_align_and_trans(16, *m, &[I32], &[I64]),
            I64Load32S(m) | I64Load32U(m) => self.check_align_and_trans(32, *m, &[I32], &[I64]),
            I32Store(m) => self.check_align_and_trans(32, *m, &[I32, I32], &[]),
            I64Store(m) => self.check_align_and_trans(64, *m, &[I32, I64], &[]),
            F32Store(m) => self.check_align_and_trans(32, *m, &[I32, F32], &[]),
            F64Store(m) => self.check_align_and_trans(64, *m, &[I32, F64], &[]),
            I32Store8(m) => self.check_align_and_trans(8, *m, &[I32, I32], &[]),
            I32Store16(m) => self.check_align_and_trans(16, *m, &[I32, I32], &[]),
            I64Store8(m) => self.check_align_and_trans(8, *m, &[I32, I64], &[]),
            I64Store16(m) => self.check_align_and_trans(16, *m, &[I32, I64], &[]),
            I64Store32(m) => self.check_align_and_trans(32, *m, &[I32, I64], &[]),
            MemorySize(mem) => self.check_mem_and_trans(*mem, &[], &[I32]),
            MemoryGrow(mem) => self.check_mem_and_trans(*mem, &[I32], &[I32]),
            MemoryInit {
                memory,
                data,
            } => {
                // The memory index is checked first.
                self.check_mem(*memory)?;
                if *data >= self.datas {
                    return Err(log_err(CheckError::InvalidDataIdx {
                        index: *data,
                        bound: self.datas,
                    }));
                }
                self.stack_trans(&[I32, I32, I32], &[])
            }
            MemoryCopy {
                dst,
                src,
            } => {
                self.check_mem(*src)?;
                self.check_mem_and_trans(*dst, &[I32, I32, I32], &[])
            }
            MemoryFill(mem) => self.check_mem_and_trans(*mem, &[I32, I32, I32], &[]),
            DataDrop(idx) => {
                if *idx >= self.datas {
                    return Err(log_err(CheckError::InvalidDataIdx {
                        index: *idx,
                        bound: self.datas,
                    }));
                }
                Ok(())
            }

            // Const instructions.
            I32Const(_) => self.stack_trans(&[], &[I32]),
            I64Const(_) => self.stack_trans(&[], &[I64]),
            F32Const(_) => self.stack_trans(&[], &[F32]),
            F64Const(_) => self.stack_trans(&[], &[F64]),

            // Unary numeric instructions.
            I32Eqz => self.stack_trans(&[I32], &[I32]),
            I64Eqz => self.stack_trans(&[I64], &[I32]),
            I32Clz | I32Ctz | I32Popcnt => self.stack_trans(&[I32], &[I32]),
            I64Clz | I64Ctz | I64Popcnt => self.stack_trans(&[I64], &[I64]),
            F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt => {
                self.stack_trans(&[F32], &[F32])
            }
            F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt => {
                self.stack_trans(&[F64], &[F64])
            }
            I32WrapI64 => self.stack_trans(&[I64], &[I32]),
            I32TruncF32S | I32TruncF32U => self.stack_trans(&[F32], &[I32]),
            I32TruncF64S | I32TruncF64U => self.stack_trans(&[F64], &[I32]),
            I64ExtendI32S | I64ExtendI32U => self.stack_trans(&[I32], &[I64]),
            I64TruncF32S | I64TruncF32U => self.stack_trans(&[F32], &[I64]),
            I64TruncF64S | I64TruncF64U => self.stack_trans(&[F64], &[I64]),
            F32ConvertI32S | F32ConvertI32U => self.stack_trans(&[I32], &[F32]),
            F32ConvertI64S | F32ConvertI64U => self.stack_trans(&[I64], &[F32]),
            F32DemoteF64 => self.stack_trans(&[F64], &[F32]),
            F64ConvertI32S | F64ConvertI32U => self.stack_trans(&[I32], &[F64]),
            F64ConvertI64S | F64ConvertI64U => self.stack_trans(&[I64], &[F64]),
            F64PromoteF32 => self.stack_trans(&[F32], &[F64]),
            I32ReinterpretF32 => self.stack_trans(&[F32], &[I32]),
            I64ReinterpretF64 => self.stack_trans(&[F64], &[I64]),
            F32ReinterpretI32 => self.stack_trans(&[I32], &[F32]),
            F64ReinterpretI64 => self.stack_trans(&[I64], &[F64]),
            I32Extend8S | I32Extend16S => self.stack_trans(&[I32], &[I32]),
            I64Extend8S | I64Extend16S | I64Extend32S => self.stack_trans(&[I64], &[I64]),
            I32TruncSatF32S | I32TruncSatF32U => self.stack_trans(&[F32], &[I32]),
            I32TruncSatF64S | I32TruncSatF64U => self.stack_trans(&[F64], &[I32]),
            I64TruncSatF32S | I64TruncSatF32U => self.stack_trans(&[F32], &[I64]),
            I64TruncSatF64S | I64TruncSatF64U => self.stack_trans(&[F64], &[I64]),

            // Binary numeric instructions.
            I32Eq | I32Ne | I32LtS | I32LtU | I32GtS | I32GtU | I32LeS | I32LeU | I32GeS
            | I32GeU => self.stack_trans(&[I32, I32], &[I32]),
            I64Eq | I64Ne | I64LtS | I64LtU | I64GtS | I64GtU | I64LeS | I64LeU | I64GeS
            | I64GeU => self.stack_trans(&[I64, I64], &[I32]),
            F32Eq | F32Ne | F32Lt | F32Gt | F32Le | F32Ge => {
                self.stack_trans(&[F32, F32], &[I32])
            }
            F64Eq | F64Ne | F64Lt | F64Gt | F64Le | F64Ge => {
                self.stack_trans(&[F64, F64], &[I32])
            }
            I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU | I32And | I32Or
            | I32Xor | I32Shl | I32ShrS | I32ShrU | I32Rotl | I32Rotr => {
                self.stack_trans(&[I32, I32], &[I32])
            }
            I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And | I64Or
            | I64Xor | I64Shl | I64ShrS | I64ShrU | I64Rotl | I64Rotr => {
                self.stack_trans(&[I64, I64], &[I64])
            }
            F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign => {
                self.stack_trans(&[F32, F32], &[F32])
            }
            F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign => {
                self.stack_trans(&[F64, F64], &[F64])
            }

            // SIMD memory instructions.
            V128Load(m) => self.check_align_and_trans(128, *m, &[I32], &[V128]),
            V128Load8x8S(m) | V128Load8x8U(m) | V128Load16x4S(m) | V128Load16x4U(m)
            | V128Load32x2S(m) | V128Load32x2U(m) | V128Load64Splat(m) | V128Load64Zero(m) => {
                self.check_align_and_trans(64, *m, &[I32], &[V128])
            }
            V128Load8Splat(m) => self.check_align_and_trans(8, *m, &[I32], &[V128]),
            V128Load16Splat(m) => self.check_align_and_trans(16, *m, &[I32], &[V128]),
            V128Load32Splat(m) | V128Load32Zero(m) => {
                self.check_align_and_trans(32, *m, &[I32], &[V128])
            }
            V128Store(m) => self.check_align_and_trans(128, *m, &[I32, V128], &[]),
            V128Load8Lane(m, l) => {
                self.check_align_lane_and_trans(8, *m, *l, &[I32, V128], &[V128])
            }
            V128Load16Lane(m, l) => {
                self.check_align_lane_and_trans(16, *m, *l, &[I32, V128], &[V128])
            }
            V128Load32Lane(m, l) => {
                self.check_align_lane_and_trans(32, *m, *l, &[I32, V128], &[V128])
            }
            V128Load64Lane(m, l) => {
                self.check_align_lane_and_trans(64, *m, *l, &[I32, V128], &[V128])
            }
            V128Store8Lane(m, l) => self.check_align_lane_and_trans(8, *m, *l, &[I32, V128], &[]),
            V128Store16Lane(m, l) => {
                self.check_align_lane_and_trans(16, *m, *l, &[I32, V128], &[])
            }
            V128Store32Lane(m, l) => {
                self.check_align_lane_and_trans(32, *m, *l, &[I32, V128], &[])
            }
            V128Store64Lane(m, l) => {
                self.check_align_lane_and_trans(64, *m, *l, &[I32, V128], &[])
            }

            // SIMD const and shuffle instructions.
            V128Const(_) => self.stack_trans(&[], &[V128]),
            I8x16Shuffle(imm) => {
                if imm & SHUFFLE_LANE_MASK != 0 {
                    let lane = (0..16u32)
                        .map(|i| (imm >> (8 * i)) as u8)
                        .find(|b| b & 0xe0 != 0)
                        .unwrap_or(0);
                    return Err(log_err(CheckError::InvalidLaneIdx {
                        index: lane.into(),
                        bound: 32,
                    }));
                }
                self.stack_trans(&[V128, V128], &[V128])
            }

            // SIMD lane instructions.
            I8x16ExtractLaneS(l) | I8x16ExtractLaneU(l) => {
                self.check_lane_and_trans(16, *l, &[V128], &[I32])
            }
            I8x16ReplaceLane(l) => self.check_lane_and_trans(16, *l, &[V128, I32], &[V128]),
            I16x8ExtractLaneS(l) | I16x8ExtractLaneU(l) => {
                self.check_lane_and_trans(8, *l, &[V128], &[I32])
            }
            I16x8ReplaceLane(l) => self.check_lane_and_trans(8, *l, &[V128, I32], &[V128]),
            I32x4ExtractLane(l) => self.check_lane_and_trans(4, *l, &[V128], &[I32]),
            I32x4ReplaceLane(l) => self.check_lane_and_trans(4, *l, &[V128, I32], &[V128]),
            I64x2ExtractLane(l) => self.check_lane_and_trans(2, *l, &[V128], &[I64]),
            I64x2ReplaceLane(l) => self.check_lane_and_trans(2, *l, &[V128, I64], &[V128]),
            F32x4ExtractLane(l) => self.check_lane_and_trans(4, *l, &[V128], &[F32]),
            F32x4ReplaceLane(l) => self.check_lane_and_trans(4, *l, &[V128, F32], &[V128]),
            F64x2ExtractLane(l) => self.check_lane_and_trans(2, *l, &[V128], &[F64]),
            F64x2ReplaceLane(l) => self.check_lane_and_trans(2, *l, &[V128, F64], &[V128]),

            // SIMD numeric instructions.
            I8x16Splat | I16x8Splat | I32x4Splat => self.stack_trans(&[I32], &[V128]),
            I64x2Splat => self.stack_trans(&[I64], &[V128]),
            F32x4Splat => self.stack_trans(&[F32], &[V128]),
            F64x2Splat => self.stack_trans(&[F64], &[V128]),
            V128Not | I8x16Abs | I8x16Neg | I8x16Popcnt | I16x8Abs | I16x8Neg
            | I16x8ExtendLowI8x16S | I16x8ExtendHighI8x16S | I16x8ExtendLowI8x16U
            | I16x8ExtendHighI8x16U | I16x8ExtaddPairwiseI8x16S | I16x8ExtaddPairwiseI8x16U
            | I32x4Abs | I32x4Neg | I32x4ExtendLowI16x8S | I32x4ExtendHighI16x8S
            | I32x4ExtendLowI16x8U | I32x4ExtendHighI16x8U | I32x4ExtaddPairwiseI16x8S
            | I32x4ExtaddPairwiseI16x8U | I64x2Abs | I64x2Neg | I64x2ExtendLowI32x4S
            | I64x2ExtendHighI32x4S | I64x2ExtendLowI32x4U | I64x2ExtendHighI32x4U | F32x4Abs
            | F32x4Neg | F32x4Sqrt | F64x2Abs | F64x2Neg | F64x2Sqrt | I32x4TruncSatF32x4S
            | I32x4TruncSatF32x4U | F32x4ConvertI32x4S | F32x4ConvertI32x4U
            | I32x4TruncSatF64x2SZero | I32x4TruncSatF64x2UZero | F64x2ConvertLowI32x4S
            | F64x2ConvertLowI32x4U | F32x4DemoteF64x2Zero | F64x2PromoteLowF32x4 | F32x4Ceil
            | F32x4Floor | F32x4Trunc | F32x4Nearest | F64x2Ceil | F64x2Floor | F64x2Trunc
            | F64x2Nearest => self.stack_trans(&[V128], &[V128]),
            I8x16Swizzle | I8x16Eq | I8x16Ne | I8x16LtS | I8x16LtU | I8x16GtS | I8x16GtU
            | I8x16LeS | I8x16LeU | I8x16GeS | I8x16GeU | I16x8Eq | I16x8Ne | I16x8LtS
            | I16x8LtU | I16x8GtS | I16x8GtU | I16x8LeS | I16x8LeU | I16x8GeS | I16x8GeU
            | I32x4Eq | I32x4Ne | I32x4LtS | I32x4LtU | I32x4GtS | I32x4GtU | I32x4LeS
            | I32x4LeU | I32x4GeS | I32x4GeU | I64x2Eq | I64x2Ne | I64x2LtS | I64x2GtS
            | I64x2LeS | I64x2GeS | F32x4Eq | F32x4Ne | F32x4Lt | F32x4Gt | F32x4Le | F32x4Ge
            | F64x2Eq | F64x2Ne | F64x2Lt | F64x2Gt | F64x2Le | F64x2Ge | V128And | V128Andnot
            | V128Or | V128Xor | I8x16NarrowI16x8S | I8x16NarrowI16x8U | I8x16Add
            | I8x16AddSatS | I8x16AddSatU | I8x16Sub | I8x16SubSatS | I8x16SubSatU | I8x16MinS
            | I8x16MinU | I8x16MaxS | I8x16MaxU | I8x16AvgrU | I16x8NarrowI32x4S
            | I16x8NarrowI32x4U | I16x8Add | I16x8AddSatS | I16x8AddSatU | I16x8Sub
            | I16x8SubSatS | I16x8SubSatU | I16x8Mul | I16x8MinS | I16x8MinU | I16x8MaxS
            | I16x8MaxU | I16x8AvgrU | I16x8ExtmulLowI8x16S | I16x8ExtmulHighI8x16S
            | I16x8ExtmulLowI8x16U | I16x8ExtmulHighI8x16U | I16x8Q15MulrSatS | I32x4Add
            | I32x4Sub | I32x4Mul | I32x4MinS | I32x4MinU | I32x4MaxS | I32x4MaxU
            | I32x4ExtmulLowI16x8S | I32x4ExtmulHighI16x8S | I32x4ExtmulLowI16x8U
            | I32x4ExtmulHighI16x8U | I32x4DotI16x8S | I64x2Add | I64x2Sub | I64x2Mul
            | I64x2ExtmulLowI32x4S | I64x2ExtmulHighI32x4S | I64x2ExtmulLowI32x4U
            | I64x2ExtmulHighI32x4U | F32x4Add | F32x4Sub | F32x4Mul | F32x4Div | F32x4Min
            | F32x4Max | F32x4Pmin | F32x4Pmax | F64x2Add | F64x2Sub | F64x2Mul | F64x2Div
            | F64x2Min | F64x2Max | F64x2Pmin | F64x2Pmax => {
                self.stack_trans(&[V128, V128], &[V128])
            }
            V128Bitselect => self.stack_trans(&[V128, V128, V128], &[V128]),
            V128AnyTrue | I8x16AllTrue | I8x16Bitmask | I16x8AllTrue | I16x8Bitmask
            | I32x4AllTrue | I32x4Bitmask | I64x2AllTrue | I64x2Bitmask => {
                self.stack_trans(&[V128], &[I32])
            }
            I8x16Shl | I8x16ShrS | I8x16ShrU | I16x8Shl | I16x8ShrS | I16x8ShrU | I32x4Shl
            | I32x4ShrS | I32x4ShrU | I64x2Shl | I64x2ShrS | I64x2ShrU => {
                self.stack_trans(&[V128, I32], &[V128])
            }

            // Atomic instructions.
            AtomicFence => Ok(()),
            MemoryAtomicNotify(m) => self.check_align_and_trans(32, *m, &[I32, I32], &[I32]),
            MemoryAtomicWait32(m) => {
                self.check_align_and_trans(32, *m, &[I32, I32, I64], &[I32])
            }
            MemoryAtomicWait64(m) => {
                self.check_align_and_trans(64, *m, &[I32, I64, I64], &[I32])
            }
            I32AtomicLoad(m) => self.check_align_and_trans(32, *m, &[I32], &[I32]),
            I64AtomicLoad(m) => self.check_align_and_trans(64, *m, &[I32], &[I64]),
            I32AtomicLoad8U(m) => self.check_align_and_trans(8, *m, &[I32], &[I32]),
            I32AtomicLoad16U(m) => self.check_align_and_trans(16, *m, &[I32], &[I32]),
            I64AtomicLoad8U(m) => self.check_align_and_trans(8, *m, &[I32], &[I64]),
            I64AtomicLoad16U(m) => self.check_align_and_trans(16, *m, &[I32], &[I64]),
            I64AtomicLoad32U(m) => self.check_align_and_trans(32, *m, &[I32], &[I64]),
            I32AtomicStore(m) => self.check_align_and_trans(32, *m, &[I32, I32], &[]),
            I64AtomicStore(m) => self.check_align_and_trans(64, *m, &[I32, I64], &[]),
            I32AtomicStore8(m) => self.check_align_and_trans(8, *m, &[I32, I32], &[]),
            I32AtomicStore16(m) => self.check_align_and_trans(16, *m, &[I32, I32], &[]),
            I64AtomicStore8(m) => self.check_align_and_trans(8, *m, &[I32, I64], &[]),
            I64AtomicStore16(m) => self.check_align_and_trans(16, *m, &[I32, I64], &[]),
            I64AtomicStore32(m) => self.check_align_and_trans(32, *m, &[I32, I64], &[]),
            I32AtomicRmwAdd(m) | I32AtomicRmwSub(m) | I32AtomicRmwAnd(m) | I32AtomicRmwOr(m)
            | I32AtomicRmwXor(m) | I32AtomicRmwXchg(m) => {
                self.check_align_and_trans(32, *m, &[I32, I32], &[I32])
            }
            I64AtomicRmwAdd(m) | I64AtomicRmwSub(m) | I64AtomicRmwAnd(m) | I64AtomicRmwOr(m)
            | I64AtomicRmwXor(m) | I64AtomicRmwXchg(m) => {
                self.check_align_and_trans(64, *m, &[I32, I64], &[I64])
            }
            I32AtomicRmw8AddU(m) | I32AtomicRmw8SubU(m) | I32AtomicRmw8AndU(m)
            | I32AtomicRmw8OrU(m) | I32AtomicRmw8XorU(m) | I32AtomicRmw8XchgU(m) => {
                self.check_align_and_trans(8, *m, &[I32, I32], &[I32])
            }
            I32AtomicRmw16AddU(m) | I32AtomicRmw16SubU(m) | I32AtomicRmw16AndU(m)
            | I32AtomicRmw16OrU(m) | I32AtomicRmw16XorU(m) | I32AtomicRmw16XchgU(m) => {
                self.check_align_and_trans(16, *m, &[I32, I32], &[I32])
            }
            I64AtomicRmw8AddU(m) | I64AtomicRmw8SubU(m) | I64AtomicRmw8AndU(m)
            | I64AtomicRmw8OrU(m) | I64AtomicRmw8XorU(m) | I64AtomicRmw8XchgU(m) => {
                self.check_align_and_trans(8, *m, &[I32, I64], &[I64])
            }
            I64AtomicRmw16AddU(m) | I64AtomicRmw16SubU(m) | I64AtomicRmw16AndU(m)
            | I64AtomicRmw16OrU(m) | I64AtomicRmw16XorU(m) | I64AtomicRmw16XchgU(m) => {
                self.check_align_and_trans(16, *m, &[I32, I64], &[I64])
            }
            I64AtomicRmw32AddU(m) | I64AtomicRmw32SubU(m) | I64AtomicRmw32AndU(m)
            | I64AtomicRmw32OrU(m) | I64AtomicRmw32XorU(m) | I64AtomicRmw32XchgU(m) => {
                self.check_align_and_trans(32, *m, &[I32, I64], &[I64])
            }
            I32AtomicRmwCmpxchg(m) => {
                self.check_align_and_trans(32, *m, &[I32, I32, I32], &[I32])
            }
            I64AtomicRmwCmpxchg(m) => {
                self.check_align_and_trans(64, *m, &[I32, I64, I64], &[I64])
            }
            I32AtomicRmw8CmpxchgU(m) => {
                self.check_align_and_trans(8, *m, &[I32, I32, I32], &[I32])
            }
            I32AtomicRmw16CmpxchgU(m) => {
                self.check_align_and_trans(16, *m, &[I32, I32, I32], &[I32])
            }
            I64AtomicRmw8CmpxchgU(m) => {
                self.check_align_and_trans(8, *m, &[I32, I64, I64], &[I64])
            }
            I64AtomicRmw16CmpxchgU(m) => {
                self.check_align_and_trans(16, *m, &[I32, I64, I64], &[I64])
            }
            I64AtomicRmw32CmpxchgU(m) => {
                self.check_align_and_trans(32, *m, &[I32, I64, I64], &[I64])
            }
        }
    }
}
