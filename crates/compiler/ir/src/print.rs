//! Text disassembly of modules.
//!
//! The output is the assembly language accepted by `spvopt-asm`, with ids
//! always printed numerically, so printing and re-assembling a module
//! reproduces it.

use crate::{indent_str, Module, PrettyPrint};

impl PrettyPrint for Module {
    fn pretty_print(&self, indent: usize) -> String {
        let base = indent_str(indent);
        let mut out = String::new();
        out.push_str(&format!("{base}; SPIR-V\n"));
        out.push_str(&format!(
            "{base}; Version: {}.{}\n",
            self.version.0, self.version.1
        ));
        out.push_str(&format!("{base}; Generator: {}\n", self.generator));
        out.push_str(&format!("{base}; Bound: {}\n", self.id_bound()));

        for id in self.instructions_in_order() {
            if let Some(inst) = self.inst(id) {
                out.push_str(&base);
                out.push_str(&inst.pretty_print(0));
                out.push('\n');
            }
        }
        out
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pretty_print(0))
    }
}
