//! Operand enumerations shared by the IR, the assembler and the passes.

use bitflags::bitflags;

use crate::opcode::numbered_enum;

numbered_enum! {
    /// Memory region a variable or pointer lives in
    pub enum StorageClass: "" {
        UniformConstant = 0,
        Input = 1,
        Uniform = 2,
        Output = 3,
        Workgroup = 4,
        CrossWorkgroup = 5,
        Private = 6,
        Function = 7,
        Generic = 8,
        PushConstant = 9,
        AtomicCounter = 10,
        Image = 11,
        StorageBuffer = 12,
    }
}

numbered_enum! {
    /// Decorations attachable to ids and struct members
    pub enum Decoration: "" {
        RelaxedPrecision = 0,
        SpecId = 1,
        Block = 2,
        BufferBlock = 3,
        RowMajor = 4,
        ColMajor = 5,
        ArrayStride = 6,
        MatrixStride = 7,
        GLSLShared = 8,
        GLSLPacked = 9,
        CPacked = 10,
        BuiltIn = 11,
        NoPerspective = 13,
        Flat = 14,
        Patch = 15,
        Centroid = 16,
        Sample = 17,
        Invariant = 18,
        Restrict = 19,
        Aliased = 20,
        Volatile = 21,
        Constant = 22,
        Coherent = 23,
        NonWritable = 24,
        NonReadable = 25,
        Uniform = 26,
        SaturatedConversion = 28,
        Stream = 29,
        Location = 30,
        Component = 31,
        Index = 32,
        Binding = 33,
        DescriptorSet = 34,
        Offset = 35,
        XfbBuffer = 36,
        XfbStride = 37,
        FuncParamAttr = 38,
        FPRoundingMode = 39,
        FPFastMathMode = 40,
        LinkageAttributes = 41,
        NoContraction = 42,
        InputAttachmentIndex = 43,
        Alignment = 44,
        MaxByteOffset = 45,
        AlignmentId = 46,
        MaxByteOffsetId = 47,
    }
}

bitflags! {
    /// Memory operand mask of loads, stores and copies
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryAccess: u32 {
        const VOLATILE = 0x1;
        const ALIGNED = 0x2;
        const NONTEMPORAL = 0x4;
        const MAKE_POINTER_AVAILABLE = 0x8;
        const MAKE_POINTER_VISIBLE = 0x10;
        const NON_PRIVATE_POINTER = 0x20;
    }
}

impl MemoryAccess {
    const NAMES: &'static [(&'static str, Self)] = &[
        ("Volatile", Self::VOLATILE),
        ("Aligned", Self::ALIGNED),
        ("Nontemporal", Self::NONTEMPORAL),
        ("MakePointerAvailable", Self::MAKE_POINTER_AVAILABLE),
        ("MakePointerVisible", Self::MAKE_POINTER_VISIBLE),
        ("NonPrivatePointer", Self::NON_PRIVATE_POINTER),
    ];

    /// Parses a single mask name as SPIR-V spells it; `None` is the empty
    /// mask
    pub fn from_spirv_name(name: &str) -> Option<Self> {
        if name == "None" {
            return Some(Self::empty());
        }
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, flag)| *flag)
    }
}

impl std::fmt::Display for MemoryAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let mut first = true;
        for (name, flag) in Self::NAMES {
            if self.contains(*flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        let unknown = self.bits() & !Self::all().bits();
        if unknown != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "0x{unknown:x}")?;
        }
        Ok(())
    }
}

/// Extensions whose presence changes optimizer behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    KhrVariablePointers,
    KhrStorageBufferStorageClass,
}

impl Extension {
    pub const fn name(self) -> &'static str {
        match self {
            Self::KhrVariablePointers => "SPV_KHR_variable_pointers",
            Self::KhrStorageBufferStorageClass => "SPV_KHR_storage_buffer_storage_class",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_class_names() {
        assert_eq!(StorageClass::Function.to_u32(), 7);
        assert_eq!(StorageClass::from_name("Private"), Some(StorageClass::Private));
        assert_eq!(StorageClass::Function.to_string(), "Function");
    }

    #[test]
    fn test_decoration_names() {
        assert_eq!(Decoration::Invariant.to_u32(), 18);
        assert_eq!(Decoration::from_name("CPacked"), Some(Decoration::CPacked));
        assert_eq!(Decoration::from_u32(12), None);
    }

    #[test]
    fn test_memory_access_display() {
        assert_eq!(MemoryAccess::empty().to_string(), "None");
        assert_eq!(
            (MemoryAccess::VOLATILE | MemoryAccess::ALIGNED).to_string(),
            "Volatile|Aligned"
        );
        assert_eq!(
            MemoryAccess::from_spirv_name("Nontemporal"),
            Some(MemoryAccess::NONTEMPORAL)
        );
        assert_eq!(MemoryAccess::from_spirv_name("Bogus"), None);
        assert_eq!(MemoryAccess::from_spirv_name("None"), Some(MemoryAccess::empty()));
        // The bitflags parser keeps the constant spellings.
        assert_eq!(MemoryAccess::from_name("VOLATILE"), Some(MemoryAccess::VOLATILE));
    }
}
