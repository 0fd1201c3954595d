use super::*;
use crate::Decoration;

struct Fixture {
    ctx: IrContext,
    function: FunctionId,
    block: BlockId,
    var: InstId,
    load: InstId,
    ret: InstId,
}

/// ```text
/// OpExtension "SPV_KHR_variable_pointers"
/// OpName %10 "v"
/// OpDecorate %10 Restrict
/// %1 = OpTypeInt 32 1
/// %2 = OpTypePointer Function %1
/// %5 = OpConstant %1 7
/// %6 = OpConstantNull %1
/// %3 = OpFunction %1 None %4
/// %7 = OpLabel
/// %10 = OpVariable %2 Function
/// %11 = OpLoad %1 %10
/// OpReturnValue %11
/// OpFunctionEnd
/// ```
fn fixture() -> Fixture {
    let mut module = Module::new();
    module
        .push_global(Instruction::new(
            Opcode::Extension,
            None,
            None,
            [Operand::String("SPV_KHR_variable_pointers".into())],
        ))
        .unwrap();
    module
        .push_global(Instruction::new(
            Opcode::Name,
            None,
            None,
            [Operand::Id(Id::new(10)), Operand::String("v".into())],
        ))
        .unwrap();
    module
        .push_global(Instruction::new(
            Opcode::Decorate,
            None,
            None,
            [Operand::Id(Id::new(10)), Operand::Decoration(Decoration::Restrict)],
        ))
        .unwrap();
    module
        .push_global(Instruction::new(
            Opcode::TypeInt,
            None,
            Some(Id::new(1)),
            [Operand::Literal(32), Operand::Literal(1)],
        ))
        .unwrap();
    module
        .push_global(Instruction::new(
            Opcode::TypePointer,
            None,
            Some(Id::new(2)),
            [Operand::StorageClass(StorageClass::Function), Operand::Id(Id::new(1))],
        ))
        .unwrap();
    module
        .push_global(Instruction::new(
            Opcode::Constant,
            Some(Id::new(1)),
            Some(Id::new(5)),
            [Operand::Literal(7)],
        ))
        .unwrap();
    module
        .push_global(Instruction::new(Opcode::ConstantNull, Some(Id::new(1)), Some(Id::new(6)), []))
        .unwrap();
    let function = module.begin_function(Instruction::new(
        Opcode::Function,
        Some(Id::new(1)),
        Some(Id::new(3)),
        [Operand::Keyword("None".into()), Operand::Id(Id::new(4))],
    ));
    let block = module.push_block(function, Instruction::new(Opcode::Label, None, Some(Id::new(7)), []));
    let var = module.push_block_inst(
        function,
        block,
        Instruction::variable(Id::new(2), Id::new(10), StorageClass::Function, None),
    );
    let load = module.push_block_inst(function, block, Instruction::load(Id::new(1), Id::new(11), Id::new(10)));
    let ret = module.push_block_inst(
        function,
        block,
        Instruction::new(Opcode::ReturnValue, None, None, [Operand::Id(Id::new(11))]),
    );
    module.end_function(function, Instruction::new(Opcode::FunctionEnd, None, None, []));

    Fixture {
        ctx: IrContext::new(module),
        function,
        block,
        var,
        load,
        ret,
    }
}

#[test]
fn test_queries() {
    let f = fixture();
    assert!(f.ctx.has_extension(Extension::KhrVariablePointers));
    assert!(!f.ctx.has_extension(Extension::KhrStorageBufferStorageClass));
    assert_eq!(f.ctx.constant_integer(Id::new(5)), Some(7));
    assert_eq!(f.ctx.constant_integer(Id::new(6)), Some(0));
    assert_eq!(f.ctx.constant_integer(Id::new(1)), None);
    assert_eq!(f.ctx.instr_block(f.load), Some((f.function, f.block)));
    let var = f.ctx.inst(f.var).unwrap();
    assert_eq!(f.ctx.storage_type_of(var), Some(Id::new(1)));
}

#[test]
fn test_insert_registers_uses_immediately() {
    let mut f = fixture();
    let id = f.ctx.take_next_id().unwrap();
    assert_eq!(id, Id::new(12));
    let second = f
        .ctx
        .insert_before(f.ret, Instruction::load(Id::new(1), id, Id::new(10)))
        .unwrap();

    assert_eq!(f.ctx.get_def(id), Some(second));
    // The name and decoration of %10 are users too; only body users count here.
    let body_users: Vec<_> = f
        .ctx
        .def_use()
        .users(Id::new(10))
        .into_iter()
        .filter(|&user| f.ctx.instr_block(user).is_some())
        .collect();
    assert_eq!(body_users, vec![f.load, second]);
    assert_eq!(f.ctx.instr_block(second), Some((f.function, f.block)));

    let header = f.ctx.module().function(f.function).unwrap().def();
    let err = f
        .ctx
        .insert_before(header, Instruction::load(Id::new(1), id, Id::new(10)))
        .unwrap_err();
    assert!(matches!(err, IrError::NotInBlock(_)));
}

#[test]
fn test_replace_all_uses_with() {
    let mut f = fixture();
    assert!(f.ctx.replace_all_uses_with(Id::new(11), Id::new(5)));
    assert_eq!(f.ctx.def_use().num_users(Id::new(11)), 0);
    assert_eq!(f.ctx.def_use().users(Id::new(5)), vec![f.ret]);
    assert_eq!(f.ctx.inst(f.ret).unwrap().id_operand(0), Some(Id::new(5)));
    assert!(!f.ctx.replace_all_uses_with(Id::new(11), Id::new(5)));
}

#[test]
fn test_kill_inst_removes_names_and_decorations() {
    let mut f = fixture();
    assert_eq!(f.ctx.decorations_for(Id::new(10), false).len(), 1);

    f.ctx.kill_inst(f.load);
    f.ctx.kill_inst(f.var);

    assert!(f.ctx.inst(f.var).is_none());
    assert_eq!(f.ctx.get_def(Id::new(10)), None);
    assert_eq!(f.ctx.def_use().num_users(Id::new(10)), 0);
    assert!(f.ctx.module().section(Section::Debug).is_empty());
    assert!(f.ctx.module().section(Section::Annotations).is_empty());
}

#[test]
fn test_group_decorate_loses_killed_target() {
    let mut module = Module::new();
    let group = module
        .push_global(Instruction::new(Opcode::DecorationGroup, None, Some(Id::new(1)), []))
        .unwrap();
    let group_decorate = module
        .push_global(Instruction::new(
            Opcode::GroupDecorate,
            None,
            None,
            [Operand::Id(Id::new(1)), Operand::Id(Id::new(2)), Operand::Id(Id::new(3))],
        ))
        .unwrap();
    let mut ctx = IrContext::new(module);

    ctx.kill_names_and_decorates(Id::new(2));
    assert_eq!(
        ctx.inst(group_decorate).unwrap().operands(),
        &[Operand::Id(Id::new(1)), Operand::Id(Id::new(3))]
    );
    assert_eq!(ctx.def_use().num_users(Id::new(2)), 0);

    ctx.kill_names_and_decorates(Id::new(3));
    assert!(ctx.inst(group_decorate).is_none());
    assert!(ctx.inst(group).is_some());
}

#[test]
fn test_pointer_type_is_declared_once() {
    let mut f = fixture();
    assert_eq!(f.ctx.pointer_type_to(Id::new(1), StorageClass::Function), Ok(Id::new(2)));

    let private = f.ctx.pointer_type_to(Id::new(1), StorageClass::Private).unwrap();
    assert_eq!(private, Id::new(12));
    assert_eq!(f.ctx.pointer_type_to(Id::new(1), StorageClass::Private), Ok(private));
    assert_eq!(f.ctx.pointee_type_id(private), Some(Id::new(1)));
}

#[test]
fn test_invalidation_rebuilds_equivalent_analyses() {
    let mut f = fixture();
    let before = f.ctx.def_use().clone();
    f.ctx.invalidate_analyses_except(Analysis::empty());
    assert_eq!(f.ctx.def_use(), &before);
}
