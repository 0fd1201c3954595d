/// Errors raised when decoding raw opcode values
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InstructionError {
    #[error("Invalid opcode: {0}")]
    InvalidOpcode(u32),
}

/// Defines an enum whose variants map to fixed numeric values and to a
/// printable name, with lookups in both directions.
macro_rules! numbered_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $prefix:literal {
            $($variant:ident = $value:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        $vis enum $name {
            $($variant = $value,)*
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Numeric value of this variant
            pub const fn to_u32(self) -> u32 {
                self as u32
            }

            /// Looks a variant up by its numeric value
            pub const fn from_u32(value: u32) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Printable name of this variant
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => concat!($prefix, stringify!($variant)),)*
                }
            }

            /// Looks a variant up by its printable name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(concat!($prefix, stringify!($variant)) => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value as Self
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub(crate) use numbered_enum;

numbered_enum! {
    /// SPIR-V opcodes understood by the toolkit.
    ///
    /// Values are the real opcode numbers from the SPIR-V grammar so that
    /// modules can be cross-checked against other tools.
    pub enum Opcode: "Op" {
        Nop = 0,
        Undef = 1,
        SourceContinued = 2,
        Source = 3,
        SourceExtension = 4,
        Name = 5,
        MemberName = 6,
        String = 7,
        Line = 8,
        Extension = 10,
        ExtInstImport = 11,
        ExtInst = 12,
        MemoryModel = 14,
        EntryPoint = 15,
        ExecutionMode = 16,
        Capability = 17,
        TypeVoid = 19,
        TypeBool = 20,
        TypeInt = 21,
        TypeFloat = 22,
        TypeVector = 23,
        TypeMatrix = 24,
        TypeImage = 25,
        TypeSampler = 26,
        TypeSampledImage = 27,
        TypeArray = 28,
        TypeRuntimeArray = 29,
        TypeStruct = 30,
        TypeOpaque = 31,
        TypePointer = 32,
        TypeFunction = 33,
        ConstantTrue = 41,
        ConstantFalse = 42,
        Constant = 43,
        ConstantComposite = 44,
        ConstantSampler = 45,
        ConstantNull = 46,
        SpecConstantTrue = 48,
        SpecConstantFalse = 49,
        SpecConstant = 50,
        SpecConstantComposite = 51,
        SpecConstantOp = 52,
        Function = 54,
        FunctionParameter = 55,
        FunctionEnd = 56,
        FunctionCall = 57,
        Variable = 59,
        Load = 61,
        Store = 62,
        CopyMemory = 63,
        AccessChain = 65,
        InBoundsAccessChain = 66,
        PtrAccessChain = 67,
        Decorate = 71,
        MemberDecorate = 72,
        DecorationGroup = 73,
        GroupDecorate = 74,
        GroupMemberDecorate = 75,
        VectorExtractDynamic = 77,
        VectorInsertDynamic = 78,
        VectorShuffle = 79,
        CompositeConstruct = 80,
        CompositeExtract = 81,
        CompositeInsert = 82,
        CopyObject = 83,
        SNegate = 126,
        IAdd = 128,
        FAdd = 129,
        ISub = 130,
        FSub = 131,
        IMul = 132,
        FMul = 133,
        UDiv = 134,
        SDiv = 135,
        FDiv = 136,
        LogicalNot = 168,
        Select = 169,
        IEqual = 170,
        INotEqual = 171,
        SLessThan = 177,
        Phi = 245,
        LoopMerge = 246,
        SelectionMerge = 247,
        Label = 248,
        Branch = 249,
        BranchConditional = 250,
        Switch = 251,
        Kill = 252,
        Return = 253,
        ReturnValue = 254,
        Unreachable = 255,
        DecorateId = 332,
    }
}

impl TryFrom<u32> for Opcode {
    type Error = InstructionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_u32(value).ok_or(InstructionError::InvalidOpcode(value))
    }
}

impl Opcode {
    /// Decoration instructions living in the annotation section
    pub const fn is_annotation(self) -> bool {
        matches!(
            self,
            Self::Decorate
                | Self::MemberDecorate
                | Self::DecorationGroup
                | Self::GroupDecorate
                | Self::GroupMemberDecorate
                | Self::DecorateId
        )
    }

    /// Debug instructions (names, sources, strings)
    pub const fn is_debug(self) -> bool {
        matches!(
            self,
            Self::SourceContinued
                | Self::Source
                | Self::SourceExtension
                | Self::Name
                | Self::MemberName
                | Self::String
        )
    }

    /// Type declarations
    pub const fn is_type(self) -> bool {
        matches!(
            self,
            Self::TypeVoid
                | Self::TypeBool
                | Self::TypeInt
                | Self::TypeFloat
                | Self::TypeVector
                | Self::TypeMatrix
                | Self::TypeImage
                | Self::TypeSampler
                | Self::TypeSampledImage
                | Self::TypeArray
                | Self::TypeRuntimeArray
                | Self::TypeStruct
                | Self::TypeOpaque
                | Self::TypePointer
                | Self::TypeFunction
        )
    }

    /// Non-specialization constants
    pub const fn is_constant(self) -> bool {
        matches!(
            self,
            Self::ConstantTrue
                | Self::ConstantFalse
                | Self::Constant
                | Self::ConstantComposite
                | Self::ConstantSampler
                | Self::ConstantNull
        )
    }

    /// Specialization constants, whose value is only fixed at specialization time
    pub const fn is_spec_constant(self) -> bool {
        matches!(
            self,
            Self::SpecConstantTrue
                | Self::SpecConstantFalse
                | Self::SpecConstant
                | Self::SpecConstantComposite
                | Self::SpecConstantOp
        )
    }

    pub const fn is_compile_time_constant(self) -> bool {
        self.is_constant() || self.is_spec_constant()
    }

    /// Instructions that end a basic block
    pub const fn is_block_terminator(self) -> bool {
        matches!(
            self,
            Self::Branch
                | Self::BranchConditional
                | Self::Switch
                | Self::Kill
                | Self::Return
                | Self::ReturnValue
                | Self::Unreachable
        )
    }

    /// Whether the instruction defines a result id
    pub const fn has_result(self) -> bool {
        !matches!(
            self,
            Self::Nop
                | Self::SourceContinued
                | Self::Source
                | Self::SourceExtension
                | Self::Name
                | Self::MemberName
                | Self::Line
                | Self::Extension
                | Self::MemoryModel
                | Self::EntryPoint
                | Self::ExecutionMode
                | Self::Capability
                | Self::FunctionEnd
                | Self::Store
                | Self::CopyMemory
                | Self::Decorate
                | Self::MemberDecorate
                | Self::GroupDecorate
                | Self::GroupMemberDecorate
                | Self::LoopMerge
                | Self::SelectionMerge
                | Self::Branch
                | Self::BranchConditional
                | Self::Switch
                | Self::Kill
                | Self::Return
                | Self::ReturnValue
                | Self::Unreachable
                | Self::DecorateId
        )
    }

    /// Whether the instruction carries a result type id
    pub const fn has_type(self) -> bool {
        self.has_result()
            && !self.is_type()
            && !matches!(
                self,
                Self::String
                    | Self::ExtInstImport
                    | Self::DecorationGroup
                    | Self::Label
            )
    }
}
