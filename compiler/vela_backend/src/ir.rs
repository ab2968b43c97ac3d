//! Module IR of the reference backend.
//!
//! A module is a flat, ID-based program: functions hold instruction lists
//! over numbered registers, and everything outside the module is referred
//! to by name and bound when the module is linked.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::NativeType;

/// SSA register within one function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reg(pub u32);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int { bits: u32, value: i64 },
    Float { bits: u32, value: f64 },
    Null,
}

/// Instruction operand; also the backend's value handle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Reg(Reg),
    Const(Constant),
    /// Address of a global, defined here or bound at link time.
    Global(String),
    /// A function, bound at link time.
    Function(String),
    /// Address of the module's string literal with this index.
    Str(u32),
    /// Result of an instruction emitted outside any function.
    Undef,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Inst {
    Alloca {
        dst: Reg,
        ty: NativeType,
    },
    Load {
        dst: Reg,
        ty: NativeType,
        ptr: Operand,
    },
    Store {
        value: Operand,
        ptr: Operand,
    },
    Call {
        dst: Reg,
        callee: Operand,
        args: Vec<Operand>,
    },
    IntCast {
        dst: Reg,
        value: Operand,
        to_bits: u32,
        signed: bool,
    },
    PtrCast {
        dst: Reg,
        value: Operand,
    },
    RetVoid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub insts: Vec<Inst>,
    pub regs: u32,
}

/// A global this module defines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalDef {
    pub name: String,
    pub ty: NativeType,
}

/// A symbol this module expects another unit or the host to define.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternDecl {
    pub name: String,
    pub ty: NativeType,
    pub is_function: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalDef>,
    pub externs: Vec<ExternDecl>,
    pub strings: Vec<String>,
    pub metadata: BTreeMap<String, Vec<u8>>,
    /// Index of the function run when the unit executes.
    pub entry: Option<u32>,
    /// Function receiving new instructions.
    #[serde(skip)]
    pub(crate) cursor: Option<u32>,
    /// Instructions requested while no function was positioned.
    #[serde(skip)]
    pub(crate) misplaced: u32,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            functions: Vec::new(),
            globals: Vec::new(),
            externs: Vec::new(),
            strings: Vec::new(),
            metadata: BTreeMap::new(),
            entry: None,
            cursor: None,
            misplaced: 0,
        }
    }

    pub fn entry_function(&self) -> Option<&Function> {
        self.functions.get(self.entry? as usize)
    }

    /// Append an instruction producing a register to the current function.
    pub(crate) fn emit(&mut self, make: impl FnOnce(Reg) -> Inst) -> Operand {
        let Some(func) = self.cursor.and_then(|c| self.functions.get_mut(c as usize)) else {
            self.misplaced += 1;
            return Operand::Undef;
        };
        let dst = Reg(func.regs);
        func.regs += 1;
        func.insts.push(make(dst));
        Operand::Reg(dst)
    }

    /// Append an instruction without a result.
    pub(crate) fn emit_void(&mut self, inst: Inst) {
        match self.cursor.and_then(|c| self.functions.get_mut(c as usize)) {
            Some(func) => func.insts.push(inst),
            None => self.misplaced += 1,
        }
    }

    pub(crate) fn declare_extern(&mut self, name: &str, ty: &NativeType, is_function: bool) {
        if self.externs.iter().any(|e| e.name == name)
            || self.globals.iter().any(|g| g.name == name)
        {
            return;
        }
        self.externs.push(ExternDecl {
            name: name.to_owned(),
            ty: ty.clone(),
            is_function,
        });
    }

    pub(crate) fn intern_string(&mut self, text: &str) -> u32 {
        let index = match self.strings.iter().position(|s| s == text) {
            Some(index) => index,
            None => {
                self.strings.push(text.to_owned());
                self.strings.len() - 1
            }
        };
        #[expect(
            clippy::cast_possible_truncation,
            reason = "string literal count per module stays far below u32::MAX"
        )]
        let index = index as u32;
        index
    }
}
