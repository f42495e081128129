//! Static opcode table.
//!
//! [`INSTRUCTIONS`] is indexed by opcode and describes every defined opcode of the
//! instruction set (`0x00` - `0xC9`). Reserved opcodes (`breakpoint`, `impdep1`, `impdep2`)
//! are intentionally absent; they never appear in loadable method code.

use crate::assembly::instruction::{FlowType, OperandType};

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Lower-case mnemonic
    pub mnemonic: &'static str,
    /// Operand layout
    pub op_type: OperandType,
    /// Control flow classification
    pub flow: FlowType,
}

macro_rules! op {
    ($mnemonic:literal, $op_type:ident, $flow:ident) => {
        OpcodeInfo {
            mnemonic: $mnemonic,
            op_type: OperandType::$op_type,
            flow: FlowType::$flow,
        }
    };
}

/// Opcode descriptions, indexed by opcode.
pub static INSTRUCTIONS: [OpcodeInfo; 202] = [
    op!("nop", None, Sequential), // 0x00
    op!("aconst_null", None, Sequential), // 0x01
    op!("iconst_m1", None, Sequential), // 0x02
    op!("iconst_0", None, Sequential), // 0x03
    op!("iconst_1", None, Sequential), // 0x04
    op!("iconst_2", None, Sequential), // 0x05
    op!("iconst_3", None, Sequential), // 0x06
    op!("iconst_4", None, Sequential), // 0x07
    op!("iconst_5", None, Sequential), // 0x08
    op!("lconst_0", None, Sequential), // 0x09
    op!("lconst_1", None, Sequential), // 0x0A
    op!("fconst_0", None, Sequential), // 0x0B
    op!("fconst_1", None, Sequential), // 0x0C
    op!("fconst_2", None, Sequential), // 0x0D
    op!("dconst_0", None, Sequential), // 0x0E
    op!("dconst_1", None, Sequential), // 0x0F
    op!("bipush", Int8, Sequential), // 0x10
    op!("sipush", Int16, Sequential), // 0x11
    op!("ldc", ConstantPool8, Sequential), // 0x12
    op!("ldc_w", ConstantPool16, Sequential), // 0x13
    op!("ldc2_w", ConstantPool16, Sequential), // 0x14
    op!("iload", Local, Sequential), // 0x15
    op!("lload", Local, Sequential), // 0x16
    op!("fload", Local, Sequential), // 0x17
    op!("dload", Local, Sequential), // 0x18
    op!("aload", Local, Sequential), // 0x19
    op!("iload_0", None, Sequential), // 0x1A
    op!("iload_1", None, Sequential), // 0x1B
    op!("iload_2", None, Sequential), // 0x1C
    op!("iload_3", None, Sequential), // 0x1D
    op!("lload_0", None, Sequential), // 0x1E
    op!("lload_1", None, Sequential), // 0x1F
    op!("lload_2", None, Sequential), // 0x20
    op!("lload_3", None, Sequential), // 0x21
    op!("fload_0", None, Sequential), // 0x22
    op!("fload_1", None, Sequential), // 0x23
    op!("fload_2", None, Sequential), // 0x24
    op!("fload_3", None, Sequential), // 0x25
    op!("dload_0", None, Sequential), // 0x26
    op!("dload_1", None, Sequential), // 0x27
    op!("dload_2", None, Sequential), // 0x28
    op!("dload_3", None, Sequential), // 0x29
    op!("aload_0", None, Sequential), // 0x2A
    op!("aload_1", None, Sequential), // 0x2B
    op!("aload_2", None, Sequential), // 0x2C
    op!("aload_3", None, Sequential), // 0x2D
    op!("iaload", None, Sequential), // 0x2E
    op!("laload", None, Sequential), // 0x2F
    op!("faload", None, Sequential), // 0x30
    op!("daload", None, Sequential), // 0x31
    op!("aaload", None, Sequential), // 0x32
    op!("baload", None, Sequential), // 0x33
    op!("caload", None, Sequential), // 0x34
    op!("saload", None, Sequential), // 0x35
    op!("istore", Local, Sequential), // 0x36
    op!("lstore", Local, Sequential), // 0x37
    op!("fstore", Local, Sequential), // 0x38
    op!("dstore", Local, Sequential), // 0x39
    op!("astore", Local, Sequential), // 0x3A
    op!("istore_0", None, Sequential), // 0x3B
    op!("istore_1", None, Sequential), // 0x3C
    op!("istore_2", None, Sequential), // 0x3D
    op!("istore_3", None, Sequential), // 0x3E
    op!("lstore_0", None, Sequential), // 0x3F
    op!("lstore_1", None, Sequential), // 0x40
    op!("lstore_2", None, Sequential), // 0x41
    op!("lstore_3", None, Sequential), // 0x42
    op!("fstore_0", None, Sequential), // 0x43
    op!("fstore_1", None, Sequential), // 0x44
    op!("fstore_2", None, Sequential), // 0x45
    op!("fstore_3", None, Sequential), // 0x46
    op!("dstore_0", None, Sequential), // 0x47
    op!("dstore_1", None, Sequential), // 0x48
    op!("dstore_2", None, Sequential), // 0x49
    op!("dstore_3", None, Sequential), // 0x4A
    op!("astore_0", None, Sequential), // 0x4B
    op!("astore_1", None, Sequential), // 0x4C
    op!("astore_2", None, Sequential), // 0x4D
    op!("astore_3", None, Sequential), // 0x4E
    op!("iastore", None, Sequential), // 0x4F
    op!("lastore", None, Sequential), // 0x50
    op!("fastore", None, Sequential), // 0x51
    op!("dastore", None, Sequential), // 0x52
    op!("aastore", None, Sequential), // 0x53
    op!("bastore", None, Sequential), // 0x54
    op!("castore", None, Sequential), // 0x55
    op!("sastore", None, Sequential), // 0x56
    op!("pop", None, Sequential), // 0x57
    op!("pop2", None, Sequential), // 0x58
    op!("dup", None, Sequential), // 0x59
    op!("dup_x1", None, Sequential), // 0x5A
    op!("dup_x2", None, Sequential), // 0x5B
    op!("dup2", None, Sequential), // 0x5C
    op!("dup2_x1", None, Sequential), // 0x5D
    op!("dup2_x2", None, Sequential), // 0x5E
    op!("swap", None, Sequential), // 0x5F
    op!("iadd", None, Sequential), // 0x60
    op!("ladd", None, Sequential), // 0x61
    op!("fadd", None, Sequential), // 0x62
    op!("dadd", None, Sequential), // 0x63
    op!("isub", None, Sequential), // 0x64
    op!("lsub", None, Sequential), // 0x65
    op!("fsub", None, Sequential), // 0x66
    op!("dsub", None, Sequential), // 0x67
    op!("imul", None, Sequential), // 0x68
    op!("lmul", None, Sequential), // 0x69
    op!("fmul", None, Sequential), // 0x6A
    op!("dmul", None, Sequential), // 0x6B
    op!("idiv", None, Sequential), // 0x6C
    op!("ldiv", None, Sequential), // 0x6D
    op!("fdiv", None, Sequential), // 0x6E
    op!("ddiv", None, Sequential), // 0x6F
    op!("irem", None, Sequential), // 0x70
    op!("lrem", None, Sequential), // 0x71
    op!("frem", None, Sequential), // 0x72
    op!("drem", None, Sequential), // 0x73
    op!("ineg", None, Sequential), // 0x74
    op!("lneg", None, Sequential), // 0x75
    op!("fneg", None, Sequential), // 0x76
    op!("dneg", None, Sequential), // 0x77
    op!("ishl", None, Sequential), // 0x78
    op!("lshl", None, Sequential), // 0x79
    op!("ishr", None, Sequential), // 0x7A
    op!("lshr", None, Sequential), // 0x7B
    op!("iushr", None, Sequential), // 0x7C
    op!("lushr", None, Sequential), // 0x7D
    op!("iand", None, Sequential), // 0x7E
    op!("land", None, Sequential), // 0x7F
    op!("ior", None, Sequential), // 0x80
    op!("lor", None, Sequential), // 0x81
    op!("ixor", None, Sequential), // 0x82
    op!("lxor", None, Sequential), // 0x83
    op!("iinc", Increment, Sequential), // 0x84
    op!("i2l", None, Sequential), // 0x85
    op!("i2f", None, Sequential), // 0x86
    op!("i2d", None, Sequential), // 0x87
    op!("l2i", None, Sequential), // 0x88
    op!("l2f", None, Sequential), // 0x89
    op!("l2d", None, Sequential), // 0x8A
    op!("f2i", None, Sequential), // 0x8B
    op!("f2l", None, Sequential), // 0x8C
    op!("f2d", None, Sequential), // 0x8D
    op!("d2i", None, Sequential), // 0x8E
    op!("d2l", None, Sequential), // 0x8F
    op!("d2f", None, Sequential), // 0x90
    op!("i2b", None, Sequential), // 0x91
    op!("i2c", None, Sequential), // 0x92
    op!("i2s", None, Sequential), // 0x93
    op!("lcmp", None, Sequential), // 0x94
    op!("fcmpl", None, Sequential), // 0x95
    op!("fcmpg", None, Sequential), // 0x96
    op!("dcmpl", None, Sequential), // 0x97
    op!("dcmpg", None, Sequential), // 0x98
    op!("ifeq", Branch16, ConditionalBranch), // 0x99
    op!("ifne", Branch16, ConditionalBranch), // 0x9A
    op!("iflt", Branch16, ConditionalBranch), // 0x9B
    op!("ifge", Branch16, ConditionalBranch), // 0x9C
    op!("ifgt", Branch16, ConditionalBranch), // 0x9D
    op!("ifle", Branch16, ConditionalBranch), // 0x9E
    op!("if_icmpeq", Branch16, ConditionalBranch), // 0x9F
    op!("if_icmpne", Branch16, ConditionalBranch), // 0xA0
    op!("if_icmplt", Branch16, ConditionalBranch), // 0xA1
    op!("if_icmpge", Branch16, ConditionalBranch), // 0xA2
    op!("if_icmpgt", Branch16, ConditionalBranch), // 0xA3
    op!("if_icmple", Branch16, ConditionalBranch), // 0xA4
    op!("if_acmpeq", Branch16, ConditionalBranch), // 0xA5
    op!("if_acmpne", Branch16, ConditionalBranch), // 0xA6
    op!("goto", Branch16, UnconditionalBranch), // 0xA7
    op!("jsr", Branch16, Subroutine), // 0xA8
    op!("ret", Local, SubroutineReturn), // 0xA9
    op!("tableswitch", TableSwitch, Switch), // 0xAA
    op!("lookupswitch", LookupSwitch, Switch), // 0xAB
    op!("ireturn", None, Return), // 0xAC
    op!("lreturn", None, Return), // 0xAD
    op!("freturn", None, Return), // 0xAE
    op!("dreturn", None, Return), // 0xAF
    op!("areturn", None, Return), // 0xB0
    op!("return", None, Return), // 0xB1
    op!("getstatic", ConstantPool16, Sequential), // 0xB2
    op!("putstatic", ConstantPool16, Sequential), // 0xB3
    op!("getfield", ConstantPool16, Sequential), // 0xB4
    op!("putfield", ConstantPool16, Sequential), // 0xB5
    op!("invokevirtual", ConstantPool16, Call), // 0xB6
    op!("invokespecial", ConstantPool16, Call), // 0xB7
    op!("invokestatic", ConstantPool16, Call), // 0xB8
    op!("invokeinterface", InvokeInterface, Call), // 0xB9
    op!("invokedynamic", InvokeDynamic, Call), // 0xBA
    op!("new", ConstantPool16, Sequential), // 0xBB
    op!("newarray", ArrayType, Sequential), // 0xBC
    op!("anewarray", ConstantPool16, Sequential), // 0xBD
    op!("arraylength", None, Sequential), // 0xBE
    op!("athrow", None, Throw), // 0xBF
    op!("checkcast", ConstantPool16, Sequential), // 0xC0
    op!("instanceof", ConstantPool16, Sequential), // 0xC1
    op!("monitorenter", None, Sequential), // 0xC2
    op!("monitorexit", None, Sequential), // 0xC3
    op!("wide", Wide, Sequential), // 0xC4
    op!("multianewarray", MultiNewArray, Sequential), // 0xC5
    op!("ifnull", Branch16, ConditionalBranch), // 0xC6
    op!("ifnonnull", Branch16, ConditionalBranch), // 0xC7
    op!("goto_w", Branch32, UnconditionalBranch), // 0xC8
    op!("jsr_w", Branch32, Subroutine), // 0xC9
];

/// Look up the description of `opcode`.
#[must_use]
pub fn opcode_info(opcode: u8) -> Option<&'static OpcodeInfo> {
    INSTRUCTIONS.get(usize::from(opcode))
}
