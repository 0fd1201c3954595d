use spvopt_asm::assemble;

use super::*;

const HEADER: &str = r#"
OpCapability Shader
OpMemoryModel Logical GLSL450
OpName %main "main"
%void = OpTypeVoid
%bool = OpTypeBool
%int = OpTypeInt 32 0
%fn = OpTypeFunction %int
%s = OpTypeStruct %int %int
%ptr_s = OpTypePointer Function %s
%ptr_int = OpTypePointer Function %int
%c0 = OpConstant %int 0
%c1 = OpConstant %int 1
%c7 = OpConstant %int 7
%c9 = OpConstant %int 9
"#;

fn run(globals: &str, body: &str) -> Result<Option<Value>, InterpError> {
    let source = format!(
        "{HEADER}{globals}\n%main = OpFunction %int None %fn\n%entry = OpLabel\n{body}\nOpFunctionEnd\n"
    );
    let module = assemble(&source).unwrap().module;
    Interpreter::new(&module)?.run("main", &[])
}

#[test]
fn test_store_then_load_through_chain() {
    let result = run(
        "",
        r#"
%v = OpVariable %ptr_s Function
%p1 = OpAccessChain %ptr_int %v %c1
OpStore %p1 %c9
%l = OpLoad %int %p1
%sum = OpIAdd %int %l %c7
OpReturnValue %sum
"#,
    );
    assert_eq!(result, Ok(Some(Value::Scalar(16))));
}

#[test]
fn test_initializers() {
    let result = run(
        "%null = OpConstantNull %s\n%init = OpConstantComposite %s %c7 %c9\n",
        r#"
%a = OpVariable %ptr_s Function %null
%b = OpVariable %ptr_s Function %init
%la = OpLoad %s %a
%lb = OpLoad %s %b
%x = OpCompositeExtract %int %la 1
%y = OpCompositeExtract %int %lb 1
%sum = OpIAdd %int %x %y
OpReturnValue %sum
"#,
    );
    assert_eq!(result, Ok(Some(Value::Scalar(9))));
}

#[test]
fn test_uninitialized_variable_is_undef() {
    let result = run(
        "",
        r#"
%v = OpVariable %ptr_s Function
%l = OpLoad %s %v
OpReturnValue %l
"#,
    );
    assert_eq!(
        result,
        Ok(Some(Value::Composite(vec![Value::Undef, Value::Undef])))
    );
}

#[test]
fn test_arithmetic_wraps_at_type_width() {
    let result = run(
        "%max = OpConstant %int 0xFFFFFFFF\n",
        "%x = OpIAdd %int %max %c1\nOpReturnValue %x\n",
    );
    assert_eq!(result, Ok(Some(Value::Scalar(0))));
}

#[test]
fn test_branches_and_select() {
    let result = run(
        "",
        r#"
%eq = OpIEqual %bool %c7 %c7
OpBranchConditional %eq %yes %no
%yes = OpLabel
%picked = OpSelect %int %eq %c1 %c0
OpReturnValue %picked
%no = OpLabel
OpReturnValue %c0
"#,
    );
    assert_eq!(result, Ok(Some(Value::Scalar(1))));
}

#[test]
fn test_composite_insert_and_spec_constant_op() {
    let result = run(
        "%sc = OpSpecConstantComposite %s %c7 %c9\n%e = OpSpecConstantOp %int CompositeExtract %sc 1\n%base = OpConstantComposite %s %c0 %c0\n",
        r#"
%x = OpCompositeInsert %s %e %base 0
%y = OpCompositeExtract %int %x 0
OpReturnValue %y
"#,
    );
    assert_eq!(result, Ok(Some(Value::Scalar(9))));
}

#[test]
fn test_errors() {
    let out_of_range = run(
        "%c5 = OpConstant %int 5\n",
        "%v = OpVariable %ptr_s Function\n%p = OpAccessChain %ptr_int %v %c5\n%l = OpLoad %int %p\nOpReturnValue %l\n",
    );
    assert_eq!(
        out_of_range,
        Err(InterpError::IndexOutOfRange { index: 5, len: 2 })
    );

    let unsupported = run("", "%x = OpSDiv %int %c7 %c1\nOpReturnValue %x\n");
    assert_eq!(unsupported, Err(InterpError::Unsupported(Opcode::SDiv)));

    let looping = run("", "OpBranch %entry\n");
    let module = assemble(&format!(
        "{HEADER}\n%main = OpFunction %int None %fn\n%entry = OpLabel\nOpBranch %entry\nOpFunctionEnd\n"
    ))
    .unwrap()
    .module;
    assert_eq!(looping, Err(InterpError::StepLimit(10_000)));
    assert_eq!(
        Interpreter::new(&module).unwrap().with_step_limit(5).run("main", &[]),
        Err(InterpError::StepLimit(5))
    );

    let module = assemble(HEADER).unwrap().module;
    assert_eq!(
        Interpreter::new(&module).unwrap().run("main", &[]),
        Err(InterpError::UnknownFunction("main".to_string()))
    );
}
