use std::cell::RefCell;
use std::rc::Rc;

use spvopt_asm::assemble;
use spvopt_ir::{Instruction, Opcode};

use super::*;

/// Records its runs and returns a fixed status
struct Scripted {
    name: &'static str,
    status: Status,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Pass for Scripted {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&mut self, _ctx: &mut IrContext) -> Status {
        self.log.borrow_mut().push(self.name);
        self.status
    }
}

/// Declares a type without registering it with the type manager and
/// preserves nothing
struct DeclareBool;

impl Pass for DeclareBool {
    fn name(&self) -> &'static str {
        "declare-bool"
    }

    fn process(&mut self, ctx: &mut IrContext) -> Status {
        match ctx.take_next_id() {
            Ok(id) => {
                ctx.add_global_value(Instruction::new(Opcode::TypeBool, None, Some(id), []));
                Status::SuccessWithChange
            }
            Err(_) => Status::Failure,
        }
    }
}

fn empty_context() -> IrContext {
    IrContext::new(
        assemble("OpCapability Shader\nOpMemoryModel Logical GLSL450\n")
            .unwrap()
            .module,
    )
}

#[test]
fn test_status_combine() {
    use Status::*;

    assert_eq!(SuccessWithoutChange.combine(SuccessWithoutChange), SuccessWithoutChange);
    assert_eq!(SuccessWithoutChange.combine(SuccessWithChange), SuccessWithChange);
    assert_eq!(SuccessWithChange.combine(SuccessWithoutChange), SuccessWithChange);
    assert_eq!(SuccessWithChange.combine(Failure), Failure);
    assert_eq!(Failure.combine(SuccessWithoutChange), Failure);
    assert!(Failure.is_failure());
    assert!(SuccessWithChange.is_changed());
}

#[test]
fn test_pass_manager_runs_in_order_and_stops_at_failure() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let scripted = |name, status| Scripted {
        name,
        status,
        log: Rc::clone(&log),
    };

    let mut manager = PassManager::new()
        .add_pass(scripted("first", Status::SuccessWithoutChange))
        .add_pass(scripted("second", Status::SuccessWithChange))
        .add_pass(scripted("third", Status::SuccessWithoutChange));
    assert_eq!(manager.pass_names(), vec!["first", "second", "third"]);
    assert_eq!(manager.run(&mut empty_context()), Status::SuccessWithChange);
    assert_eq!(*log.borrow(), vec!["first", "second", "third"]);

    log.borrow_mut().clear();
    let mut manager = PassManager::new()
        .add_pass(scripted("first", Status::Failure))
        .add_pass(scripted("second", Status::SuccessWithChange));
    assert_eq!(manager.run(&mut empty_context()), Status::Failure);
    assert_eq!(*log.borrow(), vec!["first"]);
}

#[test]
fn test_pass_manager_rebuilds_stale_analyses() {
    let mut ctx = empty_context();
    let types_before = ctx.types().len();

    let status = PassManager::new().add_pass(DeclareBool).run(&mut ctx);

    assert_eq!(status, Status::SuccessWithChange);
    assert_eq!(ctx.types().len(), types_before + 1);
}

#[test]
fn test_empty_pass_manager() {
    let mut manager = PassManager::new();
    assert!(manager.is_empty());
    assert_eq!(manager.run(&mut empty_context()), Status::SuccessWithoutChange);
}

#[test]
fn test_create_pass_by_name() {
    let options = PassOptions::default();
    let pass = create_pass("scalar-replacement", &options).unwrap();
    assert_eq!(pass.name(), "scalar-replacement");
    assert_eq!(
        pass.preserved_analyses(),
        Analysis::DEF_USE
            | Analysis::INSTR_TO_BLOCK_MAPPING
            | Analysis::DECORATIONS
            | Analysis::COMBINATORS
            | Analysis::CFG
            | Analysis::NAME_MAP
    );

    assert_eq!(
        create_pass("inline", &options).err(),
        Some(PassError::UnknownPass("inline".to_string()))
    );

    let manager = PassManager::from_names(["scalar-replacement", "scalar-replacement"], &options)
        .unwrap();
    assert_eq!(manager.len(), 2);
    assert!(PassManager::from_names(["scalar-replacement", "dce"], &options).is_err());
}

#[test]
fn test_standard_pipeline_uses_options() {
    let options = PassOptions {
        scalar_replacement: ScalarReplacementConfig {
            max_num_elements: 1,
            ..ScalarReplacementConfig::default()
        },
    };
    let asm = assemble(
        r#"
OpCapability Shader
OpMemoryModel Logical GLSL450
%void = OpTypeVoid
%fn = OpTypeFunction %void
%int = OpTypeInt 32 1
%s = OpTypeStruct %int %int
%ptr_s = OpTypePointer Function %s
%main = OpFunction %void None %fn
%entry = OpLabel
%v = OpVariable %ptr_s Function
%l = OpLoad %s %v
OpReturn
OpFunctionEnd
"#,
    )
    .unwrap();

    let mut ctx = IrContext::new(asm.module.clone());
    let status = PassManager::standard_pipeline(&options).run(&mut ctx);
    assert_eq!(status, Status::SuccessWithoutChange);

    let mut ctx = IrContext::new(asm.module);
    let status = PassManager::standard_pipeline(&PassOptions::default()).run(&mut ctx);
    assert_eq!(status, Status::SuccessWithChange);
    let loads = ctx
        .module()
        .instructions_in_order()
        .into_iter()
        .filter_map(|inst| ctx.inst(inst))
        .filter(|inst| inst.opcode() == Opcode::Load)
        .count();
    assert_eq!(loads, 2);
}
