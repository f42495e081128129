//! Rewriter integration tests.
//!
//! These tests drive the rewriter through the public API only:
//! 1. Assemble a method body by hand
//! 2. Rewrite it (per method and per class)
//! 3. Decode the result and check the dispatcher calls, branch targets and exception table

use pathcond::{
    assembly::{decode_stream, opcodes, Operand},
    rewriter::{
        DispatcherRefs, ExceptionHandler, MethodBody, RewriteConfig, Rewriter, Transformation,
        DEFAULT_DISPATCHER_OWNER,
    },
    Result,
};

const ICMP_JUMP: u16 = 25;
const ACMP_JUMP: u16 = 26;

fn rewriter() -> Rewriter {
    let refs = DispatcherRefs::from_indices(
        DEFAULT_DISPATCHER_OWNER,
        [20, 21, 22, 23, 24, ICMP_JUMP, ACMP_JUMP],
    );
    Rewriter::new(refs, RewriteConfig::default())
}

/// `return x > 10 ? 1 : 0` compiled with `if_icmple`.
fn threshold_method() -> MethodBody {
    MethodBody::new(
        vec![
            0x1A, // 0: iload_0
            0x10, 0x0A, // 1: bipush 10
            0xA4, 0x00, 0x05, // 3: if_icmple 8
            0x04, // 6: iconst_1
            0xAC, // 7: ireturn
            0x03, // 8: iconst_0
            0xAC, // 9: ireturn
        ],
        2,
        1,
    )
}

#[test]
fn branch_becomes_selector_call_and_ifne() -> Result<()> {
    let rewritten = rewriter()
        .rewrite_method(&threshold_method())?
        .expect("method contains a branch compare");

    assert_eq!(
        rewritten.body.code,
        vec![
            0x1A, // iload_0
            0x10, 0x0A, // bipush 10
            0x08, // iconst_5 (LE)
            0xB8, 0x00, 0x19, // invokestatic icmp_jump
            0x9A, 0x00, 0x05, // ifne 12
            0x04, 0xAC, // iconst_1; ireturn
            0x03, 0xAC, // iconst_0; ireturn
        ]
    );
    assert_eq!(rewritten.body.max_stack, 3);
    assert_eq!(rewritten.body.max_locals, 1);
    assert_eq!(rewritten.stats.branches, 1);
    assert_eq!(rewritten.stats.ordered_compares, 0);

    // The original branch target now lives four bytes further down
    assert_eq!(rewritten.map_offset(8), Some(12));
    assert_eq!(rewritten.map_offset(10), Some(14));
    Ok(())
}

#[test]
fn rewriting_twice_changes_nothing() -> Result<()> {
    let rewriter = rewriter();
    let once = rewriter
        .rewrite_method(&threshold_method())?
        .expect("first pass rewrites");
    assert!(rewriter.rewrite_method(&once.body)?.is_none());
    Ok(())
}

#[test]
fn reference_branch_uses_acmp_entry_point() -> Result<()> {
    let body = MethodBody::new(
        vec![
            0x2A, // 0: aload_0
            0x2B, // 1: aload_1
            0xA6, 0x00, 0x05, // 2: if_acmpne 7
            0x04, // 5: iconst_1
            0xAC, // 6: ireturn
            0x03, // 7: iconst_0
            0xAC, // 8: ireturn
        ],
        2,
        2,
    );
    let rewritten = rewriter().rewrite_method(&body)?.expect("rewritten");

    let instructions = decode_stream(&rewritten.body.code)?;
    let mnemonics: Vec<_> = instructions.iter().map(|i| i.mnemonic).collect();
    assert_eq!(
        mnemonics,
        vec![
            "aload_0",
            "aload_1",
            "bipush",
            "invokestatic",
            "ifne",
            "iconst_1",
            "ireturn",
            "iconst_0",
            "ireturn"
        ]
    );
    assert_eq!(instructions[2].operand, Operand::Int(7));
    assert_eq!(instructions[3].operand, Operand::ConstantPool(ACMP_JUMP));
    assert_eq!(instructions[4].opcode, opcodes::IFNE);
    assert_eq!(
        instructions[4].operand,
        Operand::Target(instructions[7].offset)
    );
    Ok(())
}

#[test]
fn exception_ranges_follow_their_instructions() -> Result<()> {
    let body = threshold_method().with_exception_table(vec![ExceptionHandler {
        start_pc: 0,
        end_pc: 8,
        handler_pc: 8,
        catch_type: 0,
    }]);
    let rewritten = rewriter().rewrite_method(&body)?.expect("rewritten");

    assert_eq!(
        rewritten.body.exception_table,
        vec![ExceptionHandler {
            start_pc: 0,
            end_pc: 12,
            handler_pc: 12,
            catch_type: 0,
        }]
    );
    Ok(())
}

#[test]
fn class_transformations() {
    let rewriter = rewriter();
    let plain = MethodBody::new(vec![0x04, 0xAC], 1, 0);

    match rewriter.transform_class("app/Gauge", &[plain.clone(), threshold_method()]) {
        Transformation::Rewritten(methods) => {
            assert_eq!(methods.len(), 2);
            assert!(methods[0].is_none());
            assert!(methods[1].is_some());
        }
        Transformation::Unchanged => panic!("class with a compare must be rewritten"),
    }

    assert!(rewriter
        .transform_class("app/Plain", &[plain])
        .is_unchanged());
    assert!(rewriter
        .transform_class("pathcond/runtime/Dispatch", &[threshold_method()])
        .is_unchanged());

    // Truncated operand makes the class undecodable
    let broken = MethodBody::new(vec![0x1A, 0x10], 1, 1);
    assert!(rewriter
        .transform_class("app/Broken", &[threshold_method(), broken])
        .is_unchanged());
}
