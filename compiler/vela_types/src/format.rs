//! Human-readable rendering of types, for diagnostics.

use std::fmt::Write;

use crate::{GenericArg, TypeData, TypeId, TypeStore};

impl<H> TypeStore<H> {
    /// Render `id` as source-like text.
    pub fn display(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id);
        out
    }

    fn write_type(&self, out: &mut String, id: TypeId) {
        let Ok(data) = self.lookup(id) else {
            write!(out, "<unknown {}>", id.raw()).ok();
            return;
        };
        match data {
            TypeData::Void => out.push_str("void"),
            TypeData::F16 => out.push_str("f16"),
            TypeData::F32 => out.push_str("f32"),
            TypeData::F64 => out.push_str("f64"),
            TypeData::F128 => out.push_str("f128"),
            TypeData::Int { bits } => {
                write!(out, "i{bits}").ok();
            }
            TypeData::Uint { bits } => {
                write!(out, "u{bits}").ok();
            }
            TypeData::Function {
                ret,
                params,
                variadic,
            } => {
                out.push_str("fn(");
                self.write_list(out, &params);
                if variadic {
                    out.push_str(if params.is_empty() { "..." } else { ", ..." });
                }
                out.push_str(") -> ");
                self.write_type(out, ret);
            }
            TypeData::Pointer { elem, addr_space } => {
                Self::write_addr_space(out, addr_space);
                out.push('*');
                self.write_type(out, elem);
            }
            TypeData::Reference { elem, addr_space } => {
                Self::write_addr_space(out, addr_space);
                out.push('&');
                self.write_type(out, elem);
            }
            TypeData::NamedStruct { name } => out.push_str(name.as_str()),
            TypeData::Tuple { elems, packed } => {
                out.push_str(if packed { "<{" } else { "{" });
                self.write_list(out, &elems);
                out.push_str(if packed { "}>" } else { "}" });
            }
            TypeData::Array { elem, len } => {
                out.push('[');
                self.write_type(out, elem);
                write!(out, "; {len}]").ok();
            }
            TypeData::Vector { elem, lanes } => {
                write!(out, "<{lanes} x ").ok();
                self.write_type(out, elem);
                out.push('>');
            }
            TypeData::ScalableVector { elem, lanes } => {
                write!(out, "<vscale x {lanes} x ").ok();
                self.write_type(out, elem);
                out.push('>');
            }
            TypeData::Generic { cons, args } => {
                out.push_str(cons.as_str());
                out.push('<');
                self.write_args(out, &args);
                out.push('>');
            }
        }
    }

    fn write_list(&self, out: &mut String, ids: &[TypeId]) {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_type(out, *id);
        }
    }

    fn write_args(&self, out: &mut String, args: &[GenericArg]) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match arg {
                GenericArg::Number(n) => {
                    write!(out, "{n}").ok();
                }
                GenericArg::String(s) => {
                    write!(out, "{s:?}").ok();
                }
                GenericArg::Symbol(sym) => out.push_str(sym.as_str()),
                GenericArg::Type(id) => self.write_type(out, *id),
                GenericArg::Cons { cons, args } => {
                    out.push_str(cons.as_str());
                    out.push('<');
                    self.write_args(out, args);
                    out.push('>');
                }
            }
        }
    }

    fn write_addr_space(out: &mut String, addr_space: u32) {
        if addr_space != 0 {
            write!(out, "addrspace({addr_space}) ").ok();
        }
    }
}
