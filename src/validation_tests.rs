//! Tests of the form checker: the universal invariants of the type-stack
//! algorithm as properties, and concrete instruction sequences pinned to
//! their expected outcome.

use crate::{
    errors::{CheckError, TypeMismatch},
    types::*,
    validate::FormChecker,
};
use anyhow::ensure;
use quickcheck::*;
use ValueType::{I32, I64};

const NUM_TESTS: u64 = 1000;

fn instrs(ops: Vec<OpCode>) -> Vec<Instruction> {
    ops.into_iter().map(Instruction::new).collect()
}

/// A checker with no module context at all.
fn empty_checker() -> FormChecker { FormChecker::new() }

/// A checker with a couple of function types registered so that concrete
/// reference types have something to point at.
fn checker_with_types() -> FormChecker {
    let mut checker = FormChecker::new();
    checker.add_type(FunctionType::empty());
    checker.add_type(FunctionType {
        parameters: vec![I32],
        results:    vec![I32],
    });
    checker
}

fn value_type_from_seed(seed: u8) -> ValueType {
    match seed % 8 {
        0 => I32,
        1 => I64,
        2 => ValueType::F32,
        3 => ValueType::F64,
        4 => ValueType::V128,
        5 => FUNC_REF,
        6 => EXTERN_REF,
        _ => ValueType::Ref(RefType {
            nullable: seed & 0x10 == 0,
            heap:     HeapType::TypeIdx(u32::from(seed >> 5) % 2),
        }),
    }
}

fn heap_type_from_seed(seed: u8) -> HeapType {
    match seed % 4 {
        0 => HeapType::Func,
        1 => HeapType::Extern,
        _ => HeapType::TypeIdx(u32::from(seed) % 2),
    }
}

#[test]
/// A well-typed straight-line program of numeric operations nets exactly the
/// sum of the per-operation stack effects.
fn prop_straight_line_stack_conservation() {
    let prop = |choices: Vec<u8>| -> anyhow::Result<()> {
        let mut ops = Vec::new();
        let mut height: usize = 0;
        for c in choices {
            match c % 4 {
                0 => {
                    ops.push(OpCode::I32Const(1));
                    height += 1;
                }
                1 if height >= 2 => {
                    ops.push(OpCode::I32Add);
                    height -= 1;
                }
                2 if height >= 1 => {
                    ops.push(OpCode::I32Eqz);
                }
                3 if height >= 1 => {
                    ops.push(OpCode::Drop);
                    height -= 1;
                }
                _ => {}
            }
        }
        ops.push(OpCode::End);
        let mut checker = empty_checker();
        let returns = vec![I32; height];
        let annots = checker.validate(&instrs(ops), &returns)?;
        ensure!(
            annots.max_reachable_height >= height,
            "the final stack height must have been reached"
        );
        Ok(())
    };
    QuickCheck::new().tests(NUM_TESTS).quickcheck(prop as fn(Vec<_>) -> anyhow::Result<()>);
}

#[test]
/// After `unreachable` any number of pops succeeds until the closing `end`,
/// which still enforces the block's result types.
fn prop_unreachable_polymorphism() {
    let prop = |k: u8| -> anyhow::Result<()> {
        let k = usize::from(k % 32);
        let mut ops = vec![
            OpCode::Block {
                ty:       BlockType::Value(I32),
                jump_end: 2 + k as u32,
            },
            OpCode::Unreachable,
        ];
        ops.extend(std::iter::repeat(OpCode::Drop).take(k));
        ops.push(OpCode::End);
        ops.push(OpCode::End);
        let mut checker = empty_checker();
        checker.validate(&instrs(ops), &[I32])?;
        Ok(())
    };
    QuickCheck::new().tests(NUM_TESTS).quickcheck(prop as fn(u8) -> anyhow::Result<()>);
}

#[test]
/// A branch to a loop consumes the loop's parameter types and lands on the
/// loop header, i.e., one instruction before the branch for a loop directly
/// wrapping it.
fn prop_loop_label_resupplies_parameters() {
    let prop = |n: u8| -> anyhow::Result<()> {
        let n = usize::from(n % 6);
        let mut checker = empty_checker();
        checker.add_type(FunctionType {
            parameters: vec![I32; n],
            results:    vec![I32; n],
        });
        let mut ops = vec![OpCode::I32Const(0); n];
        ops.push(OpCode::Loop {
            ty: BlockType::Func(0),
        });
        ops.push(OpCode::Br(0));
        ops.push(OpCode::End);
        ops.push(OpCode::End);
        let annots = checker.validate(&instrs(ops), &vec![I32; n])?;
        let fixup = annots.branches.get(&(n + 1)).ok_or_else(|| anyhow::anyhow!("no fixup"))?;
        ensure!(fixup.pc_offset == -1, "loop branches land on the header");
        ensure!(fixup.stack_erase_end == n as u32, "arity is the loop parameter count");
        Ok(())
    };
    QuickCheck::new().tests(NUM_TESTS).quickcheck(prop as fn(u8) -> anyhow::Result<()>);
}

#[test]
/// `match(t, t)` holds for every value type.
fn prop_match_reflexive() {
    let prop = |seeds: Vec<u8>| -> anyhow::Result<()> {
        let checker = checker_with_types();
        for seed in seeds {
            let ty = value_type_from_seed(seed);
            ensure!(checker.match_type(ty, ty)?, "{} must match itself", ty);
        }
        Ok(())
    };
    QuickCheck::new().tests(NUM_TESTS).quickcheck(prop as fn(Vec<_>) -> anyhow::Result<()>);
}

#[test]
/// A non-nullable reference is assignable to the nullable expectation of the
/// same heap type, but never the other way around.
fn prop_nullable_subtyping() {
    let prop = |seeds: Vec<u8>| -> anyhow::Result<()> {
        let checker = checker_with_types();
        for seed in seeds {
            let heap = heap_type_from_seed(seed);
            let nullable = ValueType::Ref(RefType {
                nullable: true,
                heap,
            });
            let non_null = ValueType::Ref(RefType {
                nullable: false,
                heap,
            });
            ensure!(checker.match_type(nullable, non_null)?, "null-excluding value widens");
            ensure!(!checker.match_type(non_null, nullable)?, "nullable value does not narrow");
        }
        Ok(())
    };
    QuickCheck::new().tests(NUM_TESTS).quickcheck(prop as fn(Vec<_>) -> anyhow::Result<()>);
}

#[test]
fn test_add_two_constants() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let ops = vec![OpCode::I32Const(1), OpCode::I32Const(2), OpCode::I32Add, OpCode::End];
    let annots = checker.validate(&instrs(ops), &[I32])?;
    assert_eq!(annots.max_reachable_height, 2);
    Ok(())
}

#[test]
fn test_return_type_mismatch() {
    let mut checker = empty_checker();
    let ops = vec![OpCode::I32Const(1), OpCode::End];
    let err = checker.validate(&instrs(ops), &[I64]).expect_err("i32 is not i64");
    assert!(matches!(
        err.error,
        CheckError::TypeCheckFailed(TypeMismatch::Single {
            expected: I64,
            actual:   I32,
        })
    ));
}

#[test]
/// Unreachable code supplies the block result out of thin air.
fn test_unreachable_supplies_result() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Value(I32),
            jump_end: 2,
        },
        OpCode::Unreachable,
        OpCode::End,
        OpCode::End,
    ];
    checker.validate(&instrs(ops), &[I32])?;
    Ok(())
}

#[test]
fn test_branch_to_loop_header() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::Loop {
            ty: BlockType::Empty,
        },
        OpCode::Br(0),
        OpCode::End,
        OpCode::End,
    ];
    let annots = checker.validate(&instrs(ops), &[])?;
    let fixup = annots.branches[&1];
    assert_eq!(fixup.stack_erase_begin, 0);
    assert_eq!(fixup.stack_erase_end, 0);
    assert_eq!(fixup.pc_offset, -1);
    Ok(())
}

#[test]
fn test_branch_with_result_records_erase_counts() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Value(I32),
            jump_end: 3,
        },
        OpCode::I32Const(7),
        OpCode::Br(0),
        OpCode::End,
        OpCode::End,
    ];
    let annots = checker.validate(&instrs(ops), &[I32])?;
    let fixup = annots.branches[&2];
    assert_eq!(fixup.stack_erase_begin, 1);
    assert_eq!(fixup.stack_erase_end, 1);
    assert_eq!(fixup.pc_offset, 1, "lands on the block's end");
    Ok(())
}

#[test]
fn test_call_with_parameter() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    checker.add_type(FunctionType {
        parameters: vec![I32],
        results:    vec![I32],
    });
    checker.add_func(0, false);
    checker.add_local(I32, true);
    let ops = vec![OpCode::LocalGet(0), OpCode::Call(0), OpCode::End];
    checker.validate(&instrs(ops), &[I32])?;
    Ok(())
}

#[test]
fn test_set_of_const_global_rejected() {
    let mut checker = empty_checker();
    checker.add_global(I32, false, false);
    let ops = vec![OpCode::I32Const(1), OpCode::GlobalSet(0), OpCode::End];
    let err = checker.validate(&instrs(ops), &[]).expect_err("global is immutable");
    assert!(matches!(err.error, CheckError::ImmutableGlobal {
        index: 0,
    }));
}

#[test]
fn test_overaligned_load_rejected() {
    let mut checker = empty_checker();
    checker.add_memory();
    let ops = vec![
        OpCode::I32Const(0),
        OpCode::I32Load(MemArg::aligned(3)),
        OpCode::Drop,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("2^3 exceeds 32/8");
    assert!(matches!(err.error, CheckError::InvalidAlignment {
        align:   3,
        natural: 4,
    }));
}

#[test]
fn test_uninitialised_local_read_rejected() {
    let mut checker = empty_checker();
    let non_null = ValueType::Ref(RefType {
        nullable: false,
        heap:     HeapType::Func,
    });
    checker.add_local(non_null, false);
    let ops = vec![OpCode::LocalGet(0), OpCode::Drop, OpCode::End];
    let err = checker.validate(&instrs(ops), &[]).expect_err("local starts uninitialised");
    assert!(matches!(err.error, CheckError::InvalidUninitLocal {
        index: 0,
    }));
}

#[test]
/// A local initialised inside a block reverts to uninitialised when the
/// block is popped, and is readable inside the block after the write.
fn test_local_init_rolls_back_at_block_end() {
    let non_null = ValueType::Ref(RefType {
        nullable: false,
        heap:     HeapType::Func,
    });

    // Readable between the set and the end of the block.
    let mut checker = empty_checker();
    checker.add_type(FunctionType::empty());
    checker.add_func(0, false);
    checker.add_ref(0);
    checker.add_local(non_null, false);
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Empty,
            jump_end: 5,
        },
        OpCode::RefFunc(0),
        OpCode::LocalSet(0),
        OpCode::LocalGet(0),
        OpCode::Drop,
        OpCode::End,
        OpCode::End,
    ];
    checker.validate(&instrs(ops), &[]).expect("initialised local is readable");

    // Not readable after the block has been popped.
    let mut checker = empty_checker();
    checker.add_type(FunctionType::empty());
    checker.add_func(0, false);
    checker.add_ref(0);
    checker.add_local(non_null, false);
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Empty,
            jump_end: 3,
        },
        OpCode::RefFunc(0),
        OpCode::LocalSet(0),
        OpCode::End,
        OpCode::LocalGet(0),
        OpCode::Drop,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("init must roll back");
    assert!(matches!(err.error, CheckError::InvalidUninitLocal {
        index: 0,
    }));
}

#[test]
/// `br_if` leaves the stack exactly as it was when the branch is not taken.
fn test_conditional_branch_is_transparent() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Value(I32),
            jump_end: 4,
        },
        OpCode::I32Const(7),
        OpCode::I32Const(0),
        OpCode::BrIf(0),
        OpCode::End,
        OpCode::End,
    ];
    let annots = checker.validate(&instrs(ops), &[I32])?;
    assert_eq!(annots.branches[&3].stack_erase_end, 1);
    Ok(())
}

#[test]
/// Every non-default `br_table` target must agree with the default target's
/// arity; matching targets each get their own fixup, the default last.
fn test_branch_table_fixups_and_arity() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Value(I32),
            jump_end: 6,
        },
        OpCode::Block {
            ty:       BlockType::Value(I32),
            jump_end: 4,
        },
        OpCode::I32Const(1),
        OpCode::I32Const(0),
        OpCode::BrTable {
            labels:  vec![0, 1],
            default: 1,
        },
        OpCode::End,
        OpCode::End,
        OpCode::End,
    ];
    let annots = checker.validate(&instrs(ops), &[I32])?;
    let fixups = &annots.branch_tables[&4];
    assert_eq!(fixups.len(), 3);
    assert_eq!(fixups[0].pc_offset, 1, "inner block's end");
    assert_eq!(fixups[1].pc_offset, 2, "outer block's end");
    assert_eq!(fixups[2].pc_offset, 2, "default equals the outer target");
    for fixup in fixups {
        assert_eq!(fixup.stack_erase_end, 1);
    }
    Ok(())
}

#[test]
fn test_branch_table_arity_mismatch_rejected() {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Value(I32),
            jump_end: 6,
        },
        OpCode::Block {
            ty:       BlockType::Empty,
            jump_end: 4,
        },
        OpCode::I32Const(1),
        OpCode::I32Const(0),
        OpCode::BrTable {
            labels:  vec![0],
            default: 1,
        },
        OpCode::End,
        OpCode::End,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[I32]).expect_err("arities differ");
    assert!(matches!(
        err.error,
        CheckError::TypeCheckFailed(TypeMismatch::Lists {
            ..
        })
    ));
}

#[test]
fn test_branch_out_of_depth_rejected() {
    let mut checker = empty_checker();
    let ops = vec![OpCode::Br(3), OpCode::End];
    let err = checker.validate(&instrs(ops), &[]).expect_err("only one frame exists");
    assert!(matches!(err.error, CheckError::InvalidLabelIdx {
        index: 3,
        bound: 1,
    }));
}

#[test]
fn test_if_without_else_needs_balanced_type() {
    let mut checker = empty_checker();
    // An if with a result but no else arm cannot be balanced.
    let ops = vec![
        OpCode::I32Const(1),
        OpCode::If {
            ty:        BlockType::Value(I32),
            jump_else: 2,
            jump_end:  2,
        },
        OpCode::I32Const(2),
        OpCode::End,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[I32]).expect_err("missing else arm");
    assert!(matches!(
        err.error,
        CheckError::TypeCheckFailed(TypeMismatch::Lists {
            ..
        })
    ));
}

#[test]
fn test_if_with_both_arms() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::I32Const(1),
        OpCode::If {
            ty:        BlockType::Value(I32),
            jump_else: 2,
            jump_end:  4,
        },
        OpCode::I32Const(1),
        OpCode::Else,
        OpCode::I32Const(2),
        OpCode::End,
        OpCode::End,
    ];
    checker.validate(&instrs(ops), &[I32])?;
    Ok(())
}

#[test]
fn test_tail_call_result_mismatch_rejected() {
    let mut checker = empty_checker();
    checker.add_type(FunctionType {
        parameters: Vec::new(),
        results:    vec![I64],
    });
    checker.add_func(0, false);
    let ops = vec![OpCode::ReturnCall(0), OpCode::End];
    let err = checker.validate(&instrs(ops), &[I32]).expect_err("i64 caller of i32 function");
    assert!(matches!(
        err.error,
        CheckError::TypeCheckFailed(TypeMismatch::Lists {
            ..
        })
    ));
}

#[test]
fn test_tail_call_skips_result_push() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    checker.add_type(FunctionType {
        parameters: Vec::new(),
        results:    vec![I32],
    });
    checker.add_func(0, false);
    let ops = vec![OpCode::ReturnCall(0), OpCode::End];
    checker.validate(&instrs(ops), &[I32])?;
    Ok(())
}

#[test]
fn test_indirect_call_requires_funcref_table() {
    let mut checker = empty_checker();
    checker.add_type(FunctionType::empty());
    checker.add_table(EXTERN_REF);
    let ops = vec![
        OpCode::I32Const(0),
        OpCode::CallIndirect {
            ty:    0,
            table: 0,
        },
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("extern table cannot hold funcs");
    assert!(matches!(err.error, CheckError::InvalidTableIdx {
        ..
    }));
}

#[test]
fn test_call_through_function_reference() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    checker.add_type(FunctionType {
        parameters: vec![I32],
        results:    vec![I32],
    });
    checker.add_func(0, false);
    checker.add_ref(0);
    let ops =
        vec![OpCode::I32Const(1), OpCode::RefFunc(0), OpCode::CallRef(0), OpCode::End];
    checker.validate(&instrs(ops), &[I32])?;
    Ok(())
}

#[test]
fn test_undeclared_function_reference_rejected() {
    let mut checker = empty_checker();
    checker.add_type(FunctionType::empty());
    checker.add_func(0, false);
    let ops = vec![OpCode::RefFunc(0), OpCode::Drop, OpCode::End];
    let err = checker.validate(&instrs(ops), &[]).expect_err("function 0 is not declared");
    assert!(matches!(err.error, CheckError::InvalidRefIdx {
        index: 0,
    }));
}

#[test]
fn test_is_null_of_non_reference_rejected() {
    let mut checker = empty_checker();
    let ops = vec![OpCode::I32Const(1), OpCode::RefIsNull, OpCode::Drop, OpCode::End];
    let err = checker.validate(&instrs(ops), &[]).expect_err("i32 is not a reference");
    assert!(matches!(
        err.error,
        CheckError::TypeCheckFailed(TypeMismatch::Single {
            actual: I32,
            ..
        })
    ));
}

#[test]
/// `br_on_null` strips the nullability from the reference left behind, so a
/// following `ref.as_non_null` is a no-op that still type-checks.
fn test_branch_on_null_leaves_non_null() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Empty,
            jump_end: 5,
        },
        OpCode::RefNull(RefType {
            nullable: true,
            heap:     HeapType::Func,
        }),
        OpCode::BrOnNull(0),
        OpCode::RefAsNonNull,
        OpCode::Drop,
        OpCode::End,
        OpCode::End,
    ];
    let annots = checker.validate(&instrs(ops), &[])?;
    assert_eq!(annots.branches[&2].stack_erase_end, 0);
    Ok(())
}

#[test]
fn test_branch_on_non_null_counts_the_reference() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let non_null = ValueType::Ref(RefType {
        nullable: false,
        heap:     HeapType::Func,
    });
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Value(non_null),
            jump_end: 4,
        },
        OpCode::RefNull(RefType {
            nullable: true,
            heap:     HeapType::Func,
        }),
        OpCode::BrOnNonNull(0),
        OpCode::Unreachable,
        OpCode::End,
        OpCode::Drop,
        OpCode::End,
    ];
    let annots = checker.validate(&instrs(ops), &[])?;
    assert_eq!(annots.branches[&2].stack_erase_end, 1);
    Ok(())
}

#[test]
fn test_branch_on_non_null_needs_non_null_label() {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::Block {
            ty:       BlockType::Value(FUNC_REF),
            jump_end: 4,
        },
        OpCode::RefNull(RefType {
            nullable: true,
            heap:     HeapType::Func,
        }),
        OpCode::BrOnNonNull(0),
        OpCode::Unreachable,
        OpCode::End,
        OpCode::Drop,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("label type is nullable");
    assert!(matches!(err.error, CheckError::InvalidBrRefType));
}

#[test]
fn test_untyped_select_rejects_mixed_operands() {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::I32Const(1),
        OpCode::I64Const(1),
        OpCode::I32Const(0),
        OpCode::Select,
        OpCode::Drop,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("operands disagree");
    assert!(matches!(
        err.error,
        CheckError::TypeCheckFailed(TypeMismatch::Single {
            ..
        })
    ));
}

#[test]
fn test_untyped_select_rejects_references() {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::RefNull(RefType {
            nullable: true,
            heap:     HeapType::Func,
        }),
        OpCode::RefNull(RefType {
            nullable: true,
            heap:     HeapType::Func,
        }),
        OpCode::I32Const(0),
        OpCode::Select,
        OpCode::Drop,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("references need select t");
    assert!(matches!(
        err.error,
        CheckError::TypeCheckFailed(TypeMismatch::Single {
            ..
        })
    ));
}

#[test]
fn test_typed_select_accepts_references() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let null_func = RefType {
        nullable: true,
        heap:     HeapType::Func,
    };
    let ops = vec![
        OpCode::RefNull(null_func),
        OpCode::RefNull(null_func),
        OpCode::I32Const(0),
        OpCode::SelectT(vec![FUNC_REF]),
        OpCode::Drop,
        OpCode::End,
    ];
    checker.validate(&instrs(ops), &[])?;
    Ok(())
}

#[test]
fn test_typed_select_arity_is_fixed_at_one() {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::I32Const(1),
        OpCode::I32Const(2),
        OpCode::I32Const(0),
        OpCode::SelectT(vec![I32, I32]),
        OpCode::Drop,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("arity two is not supported");
    assert!(matches!(err.error, CheckError::InvalidResultArity {
        arity: 2,
    }));
}

#[test]
fn test_local_accesses_record_stack_offsets() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    checker.add_local(I32, true);
    checker.add_local(I64, true);
    let ops = vec![
        OpCode::LocalGet(0),
        OpCode::Drop,
        OpCode::LocalGet(1),
        OpCode::Drop,
        OpCode::End,
    ];
    let annots = checker.validate(&instrs(ops), &[])?;
    assert_eq!(annots.stack_offsets[&0], 2);
    assert_eq!(annots.stack_offsets[&2], 1);
    Ok(())
}

#[test]
fn test_table_init_requires_matching_element_type() {
    let mut checker = empty_checker();
    checker.add_table(FUNC_REF);
    checker.add_elem(EXTERN_REF);
    let ops = vec![
        OpCode::I32Const(0),
        OpCode::I32Const(0),
        OpCode::I32Const(0),
        OpCode::TableInit {
            table: 0,
            elem:  0,
        },
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("extern elems in func table");
    assert!(matches!(
        err.error,
        CheckError::TypeCheckFailed(TypeMismatch::Single {
            ..
        })
    ));
}

#[test]
fn test_memory_init_checks_data_segment_index() {
    let mut checker = empty_checker();
    checker.add_memory();
    checker.add_data();
    let ops = vec![
        OpCode::I32Const(0),
        OpCode::I32Const(0),
        OpCode::I32Const(0),
        OpCode::MemoryInit {
            memory: 0,
            data:   1,
        },
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("only one data segment");
    assert!(matches!(err.error, CheckError::InvalidDataIdx {
        index: 1,
        bound: 1,
    }));
}

#[test]
fn test_memory_ops_need_a_memory() {
    let mut checker = empty_checker();
    let ops = vec![OpCode::MemorySize(0), OpCode::Drop, OpCode::End];
    let err = checker.validate(&instrs(ops), &[]).expect_err("no memory declared");
    assert!(matches!(err.error, CheckError::InvalidMemoryIdx {
        index: 0,
        bound: 0,
    }));
}

#[test]
fn test_shuffle_lane_bits_must_be_low() {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::V128Const(0),
        OpCode::V128Const(0),
        OpCode::I8x16Shuffle(0x40),
        OpCode::Drop,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("lane index 0x40 is out of range");
    assert!(matches!(err.error, CheckError::InvalidLaneIdx {
        index: 0x40,
        bound: 32,
    }));
}

#[test]
fn test_extract_lane_bound() {
    let mut checker = empty_checker();
    let ops = vec![
        OpCode::V128Const(0),
        OpCode::I32x4ExtractLane(4),
        OpCode::Drop,
        OpCode::End,
    ];
    let err = checker.validate(&instrs(ops), &[]).expect_err("i32x4 has four lanes");
    assert!(matches!(err.error, CheckError::InvalidLaneIdx {
        index: 4,
        bound: 4,
    }));
}

#[test]
fn test_atomic_rmw_and_fence() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    checker.add_memory();
    let ops = vec![
        OpCode::AtomicFence,
        OpCode::I32Const(0),
        OpCode::I32Const(1),
        OpCode::I32AtomicRmwAdd(MemArg::aligned(2)),
        OpCode::End,
    ];
    checker.validate(&instrs(ops), &[I32])?;
    Ok(())
}

#[test]
fn test_unclosed_block_rejected() {
    let mut checker = empty_checker();
    let ops = vec![OpCode::I32Const(1)];
    let err = checker.validate(&instrs(ops), &[I32]).expect_err("no end instruction");
    assert!(matches!(
        err.error,
        CheckError::TypeCheckFailed(TypeMismatch::UnterminatedExpression)
    ));
}

#[test]
/// A checker can be reused across functions with `reset(false)`, and across
/// modules with `reset(true)`.
fn test_reset_and_reuse() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    checker.add_memory();
    let ops = vec![OpCode::MemorySize(0), OpCode::Drop, OpCode::End];
    checker.validate(&instrs(ops.clone()), &[])?;

    checker.reset(false);
    // The memory declaration survives a per-function reset.
    checker.validate(&instrs(ops.clone()), &[])?;

    checker.reset(true);
    let err = checker.validate(&instrs(ops), &[]).expect_err("module context was cleared");
    assert!(matches!(err.error, CheckError::InvalidMemoryIdx {
        ..
    }));
    Ok(())
}

#[test]
fn test_empty_sequence_is_trivially_valid() -> anyhow::Result<()> {
    let mut checker = empty_checker();
    let annots = checker.validate(&[], &[I32])?;
    assert!(annots.branches.is_empty());
    Ok(())
}
