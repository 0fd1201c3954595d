use spvopt_ir::{PrettyPrint, Section};

use super::*;

const STRUCT_MODULE: &str = r#"
; SPIR-V
; Version: 1.3
OpCapability Shader
OpMemoryModel Logical GLSL450
OpName %v "v"
OpDecorate %v Restrict
%void = OpTypeVoid
%fn = OpTypeFunction %void
%int = OpTypeInt 32 1
%s = OpTypeStruct %int %int
%ptr = OpTypePointer Function %s
%minus_one = OpConstant %int -1
%main = OpFunction %void None %fn
%entry = OpLabel
%v = OpVariable %ptr Function
%l = OpLoad %s %v Volatile|Aligned 4
OpReturn
OpFunctionEnd
"#;

#[test]
fn test_assemble_module() {
    let asm = assemble(STRUCT_MODULE).unwrap();
    let module = &asm.module;

    assert_eq!(module.version, (1, 3));
    assert_eq!(asm.id("v"), Some(Id::new(1)));
    assert_eq!(asm.id("void"), Some(Id::new(2)));
    assert_eq!(module.section(Section::Debug).len(), 1);
    assert_eq!(module.section(Section::Annotations).len(), 1);
    assert_eq!(module.section(Section::TypesValues).len(), 6);
    assert_eq!(module.function_count(), 1);
    assert_eq!(module.validate(), Ok(()));

    let constant = module.inst(module.section(Section::TypesValues)[5]).unwrap();
    assert_eq!(constant.literal_operand(0), Some(0xFFFF_FFFF));

    let (_, function) = module.functions().next().unwrap();
    let (_, entry) = function.blocks().next().unwrap();
    let load = module.inst(entry.instructions()[1]).unwrap();
    assert_eq!(
        load.memory_access(),
        MemoryAccess::VOLATILE | MemoryAccess::ALIGNED
    );
    assert_eq!(load.operand(2), Some(&Operand::Literal(4)));
}

#[test]
fn test_symbolic_names_skip_numeric_ids() {
    let asm = assemble("%a = OpTypeBool\n%1 = OpTypeVoid\n%b = OpTypeFloat 32\n").unwrap();
    assert_eq!(asm.id("a"), Some(Id::new(2)));
    assert_eq!(asm.id("1"), Some(Id::new(1)));
    assert_eq!(asm.id("b"), Some(Id::new(3)));
    assert_eq!(asm.module.id_bound(), 4);
}

#[test]
fn test_disassembly_round_trip() {
    let first = assemble(STRUCT_MODULE).unwrap().module;
    let text = first.pretty_print(0);
    let second = assemble(&text).unwrap().module;
    assert_eq!(second.pretty_print(0), text);
    assert_eq!(second.id_bound(), first.id_bound());
}

#[test]
fn test_spec_constant_op() {
    let asm = assemble(
        "%int = OpTypeInt 32 0\n%s = OpTypeStruct %int\n%c = OpSpecConstantComposite %s %k\n%k = OpSpecConstant %int 3\n%e = OpSpecConstantOp %int CompositeExtract %c 0\n",
    )
    .unwrap();
    let e = asm.module.section(Section::TypesValues)[4];
    let inst = asm.module.inst(e).unwrap();
    assert_eq!(inst.operand(0), Some(&Operand::Opcode(Opcode::CompositeExtract)));
    assert_eq!(inst.pretty_print(0), "%5 = OpSpecConstantOp %1 CompositeExtract %3 0");
}

#[test]
fn test_errors_carry_spans() {
    let err = assemble("%x = OpBogus\n").unwrap_err();
    assert_eq!(
        err,
        AsmError::UnknownOpcode {
            name: "OpBogus".to_string(),
            span: 5..12,
        }
    );

    let err = assemble("%p = OpTypePointer Nowhere %x\n").unwrap_err();
    assert!(matches!(err, AsmError::InvalidEnumerant { kind: "storage class", .. }));

    let err = assemble("OpTypeVoid\n").unwrap_err();
    assert!(matches!(err, AsmError::MissingResult { opcode: Opcode::TypeVoid, .. }));

    let err = assemble("%t = OpTypeVoid\n%f = OpFunction %t None %t\n%l = OpLabel\nOpReturn\n").unwrap_err();
    assert!(matches!(err, AsmError::UnterminatedFunction { .. }));

    let err = assemble("%v = OpLoad %t %p\n").unwrap_err();
    assert!(matches!(err, AsmError::Ir { .. }));
}

#[test]
fn test_render_points_at_source() {
    let source = "%x = OpBogus\n";
    let err = assemble(source).unwrap_err();
    let rendered = err.render(source, false);
    assert!(rendered.contains("unknown opcode `OpBogus`"));
}

mod properties {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn test_integer_literals_use_type_width(value in any::<i32>(), wide in any::<i64>()) {
            let source = format!(
                "%int = OpTypeInt 32 1\n%long = OpTypeInt 64 1\n%a = OpConstant %int {value}\n%b = OpConstant %long {wide}\n"
            );
            let asm = assemble(&source).unwrap();
            let constants = asm.module.section(Section::TypesValues);
            let a = asm.module.inst(constants[2]).unwrap();
            let b = asm.module.inst(constants[3]).unwrap();
            prop_assert_eq!(a.literal_operand(0), Some(u64::from(value as u32)));
            prop_assert_eq!(b.literal_operand(0), Some(wide as u64));
        }
    }
}
