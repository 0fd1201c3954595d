//! Optimized and unoptimized modules must compute the same results.

use std::fmt::Write as _;

use proptest::prelude::*;
use spvopt_asm::assemble;
use spvopt_ir::{IrContext, Module, Opcode, StorageClass};
use spvopt_opt::{Pass, ScalarReplacementPass, Status};
use spvopt_test_utils::{Interpreter, Value};

/// How the aggregate variable gets its first value
#[derive(Debug, Clone)]
enum Init {
    Null,
    Constant(Vec<u64>),
    WholeStore(Vec<u64>),
}

#[derive(Debug, Clone)]
struct Program {
    /// One entry per field of the outer struct, `true` for a nested pair
    fields: Vec<bool>,
    init: Init,
    /// (leaf, value) stores made through access chains
    stores: Vec<(usize, u64)>,
}

impl Program {
    /// Access path of every scalar leaf, in layout order
    fn leaves(&self) -> Vec<Vec<usize>> {
        self.fields
            .iter()
            .enumerate()
            .flat_map(|(i, &nested)| {
                if nested {
                    vec![vec![i, 0], vec![i, 1]]
                } else {
                    vec![vec![i]]
                }
            })
            .collect()
    }

    /// Sum of the leaves after all stores
    fn expected(&self) -> u64 {
        let mut leaves = match &self.init {
            Init::Null => vec![0; self.leaves().len()],
            Init::Constant(values) | Init::WholeStore(values) => values.clone(),
        };
        for &(leaf, value) in &self.stores {
            leaves[leaf] = value;
        }
        leaves.iter().sum()
    }

    /// Builds `%outer` and the operands of a composite holding `values`,
    /// declaring inner pairs with `pair` (a constant or a construct)
    fn composite(&self, values: &[u64], mut pair: impl FnMut(u64, u64) -> String) -> Vec<String> {
        let mut values = values.iter();
        let mut next = || values.next().copied().unwrap_or(0);
        self.fields
            .iter()
            .map(|&nested| {
                if nested {
                    let (a, b) = (next(), next());
                    pair(a, b)
                } else {
                    format!("%k{}", next())
                }
            })
            .collect()
    }

    fn source(&self) -> String {
        let mut src = String::from(
            "OpCapability Shader\nOpMemoryModel Logical GLSL450\nOpName %main \"main\"\n\
             %int = OpTypeInt 32 0\n%fn = OpTypeFunction %int\n%inner = OpTypeStruct %int %int\n",
        );
        let members: Vec<&str> = self
            .fields
            .iter()
            .map(|&nested| if nested { "%inner" } else { "%int" })
            .collect();
        writeln!(src, "%outer = OpTypeStruct {}", members.join(" ")).unwrap();
        src.push_str("%ptr_outer = OpTypePointer Function %outer\n");
        src.push_str("%ptr_int = OpTypePointer Function %int\n");
        for k in 0..16 {
            writeln!(src, "%k{k} = OpConstant %int {k}").unwrap();
        }

        let mut globals = String::new();
        let init = match &self.init {
            Init::Null => {
                globals.push_str("%init = OpConstantNull %outer\n");
                " %init"
            }
            Init::Constant(values) => {
                let mut n = 0;
                let operands = self.composite(values, |a, b| {
                    n += 1;
                    writeln!(globals, "%cp{n} = OpConstantComposite %inner %k{a} %k{b}").unwrap();
                    format!("%cp{n}")
                });
                writeln!(globals, "%init = OpConstantComposite %outer {}", operands.join(" ")).unwrap();
                " %init"
            }
            Init::WholeStore(_) => "",
        };
        src.push_str(&globals);

        src.push_str("%main = OpFunction %int None %fn\n%entry = OpLabel\n");
        writeln!(src, "%v = OpVariable %ptr_outer Function{init}").unwrap();

        if let Init::WholeStore(values) = &self.init {
            let mut body = String::new();
            let mut n = 0;
            let operands = self.composite(values, |a, b| {
                n += 1;
                writeln!(body, "%wp{n} = OpCompositeConstruct %inner %k{a} %k{b}").unwrap();
                format!("%wp{n}")
            });
            src.push_str(&body);
            writeln!(src, "%whole = OpCompositeConstruct %outer {}", operands.join(" ")).unwrap();
            src.push_str("OpStore %v %whole\n");
        }

        let leaves = self.leaves();
        let chain = |path: &[usize]| {
            path.iter()
                .map(|i| format!("%k{i}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        for (n, &(leaf, value)) in self.stores.iter().enumerate() {
            writeln!(src, "%s{n} = OpAccessChain %ptr_int %v {}", chain(&leaves[leaf])).unwrap();
            writeln!(src, "OpStore %s{n} %k{value}").unwrap();
        }

        src.push_str("%acc0 = OpCopyObject %int %k0\n");
        for (n, path) in leaves.iter().enumerate() {
            writeln!(src, "%q{n} = OpAccessChain %ptr_int %v {}", chain(path)).unwrap();
            writeln!(src, "%l{n} = OpLoad %int %q{n}").unwrap();
            writeln!(src, "%acc{} = OpIAdd %int %acc{n} %l{n}", n + 1).unwrap();
        }
        writeln!(src, "OpReturnValue %acc{}\nOpFunctionEnd", leaves.len()).unwrap();
        src
    }
}

fn program() -> impl Strategy<Value = Program> {
    prop::collection::vec(any::<bool>(), 1..=5).prop_flat_map(|fields| {
        let leaves = fields.iter().map(|&n| if n { 2 } else { 1 }).sum::<usize>();
        let values = prop::collection::vec(0u64..16, leaves);
        let init = prop_oneof![
            Just(Init::Null),
            values.clone().prop_map(Init::Constant),
            values.prop_map(Init::WholeStore),
        ];
        let stores = prop::collection::vec((0..leaves, 0u64..16), 0..6);
        (Just(fields), init, stores).prop_map(|(fields, init, stores)| Program {
            fields,
            init,
            stores,
        })
    })
}

fn run(module: &Module) -> Option<Value> {
    Interpreter::new(module).unwrap().run("main", &[]).unwrap()
}

fn function_variables(module: &Module) -> usize {
    module
        .instructions_in_order()
        .into_iter()
        .filter_map(|inst| module.inst(inst))
        .filter(|inst| {
            inst.opcode() == Opcode::Variable
                && inst.storage_class() == Some(StorageClass::Function)
        })
        .count()
}

proptest! {
    #[test]
    fn scalar_replacement_preserves_results(program in program()) {
        let module = assemble(&program.source()).unwrap().module;
        let mut ctx = IrContext::new(module.clone());
        let status = ScalarReplacementPass::new().process(&mut ctx);
        let optimized = ctx.into_module();

        prop_assert_eq!(status, Status::SuccessWithChange);
        prop_assert_eq!(optimized.validate(), Ok(()));
        // Every leaf is read, so each one keeps its own scalar variable.
        prop_assert_eq!(function_variables(&optimized), program.leaves().len());

        let before = run(&module);
        prop_assert_eq!(&before, &Some(Value::Scalar(program.expected())));
        prop_assert_eq!(run(&optimized), before);
    }
}
