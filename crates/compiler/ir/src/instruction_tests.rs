use super::*;

#[test]
fn test_variable_with_initializer() {
    let var = Instruction::variable(Id::new(3), Id::new(7), StorageClass::Function, Some(Id::new(5)));
    assert_eq!(var.opcode(), Opcode::Variable);
    assert_eq!(var.storage_class(), Some(StorageClass::Function));
    assert_eq!(var.initializer(), Some(Id::new(5)));
    assert_eq!(var.pretty_print(0), "%7 = OpVariable %3 Function %5");
}

#[test]
fn test_variable_without_initializer() {
    let var = Instruction::variable(Id::new(3), Id::new(7), StorageClass::Private, None);
    assert_eq!(var.initializer(), None);
    assert_eq!(var.num_operands(), 1);
}

#[test]
fn test_used_ids_include_type_slot() {
    let load = Instruction::load(Id::new(2), Id::new(9), Id::new(4));
    let used: Vec<_> = load.used_ids().collect();
    assert_eq!(
        used,
        vec![(UseSlot::Type, Id::new(2)), (UseSlot::Operand(0), Id::new(4))]
    );
}

#[test]
fn test_memory_access_detection() {
    let mut load = Instruction::load(Id::new(2), Id::new(9), Id::new(4));
    assert!(!load.is_volatile_access());
    load.push_operand(Operand::MemoryAccess(MemoryAccess::VOLATILE | MemoryAccess::ALIGNED));
    load.push_operand(Operand::Literal(4));
    assert!(load.is_volatile_access());
    assert_eq!(load.pretty_print(0), "%9 = OpLoad %2 %4 Volatile|Aligned 4");

    let mut store = Instruction::store(Id::new(4), Id::new(9));
    store.push_operand(Operand::MemoryAccess(MemoryAccess::NONTEMPORAL));
    assert!(!store.is_volatile_access());
    assert_eq!(store.memory_access(), MemoryAccess::NONTEMPORAL);
}

#[test]
fn test_set_slot_rewrites_operand() {
    let mut extract = Instruction::composite_extract(Id::new(1), Id::new(2), Id::new(3), 1);
    extract.set_slot(UseSlot::Operand(0), Id::new(30));
    assert_eq!(extract.id_operand(0), Some(Id::new(30)));
    assert_eq!(extract.literal_operand(1), Some(1));
}
