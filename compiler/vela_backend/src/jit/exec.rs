//! Interpreter for unit entry functions.

use crate::ir::{Constant, Inst, Operand};
use crate::traits::UnitHandle;
use crate::value::{HostMemory, NativeAddress, Pointer, RtValue};
use crate::BackendError;

use super::{Jit, LinkedUnit};

struct Frame<'a> {
    unit: &'a LinkedUnit,
    regs: Vec<RtValue>,
    slots: Vec<RtValue>,
}

impl Frame<'_> {
    fn fail(&self, message: impl Into<String>) -> BackendError {
        BackendError::Execution {
            unit: self.unit.module.name.clone(),
            message: message.into(),
        }
    }

    fn address(&self, name: &str) -> Result<NativeAddress, BackendError> {
        self.unit
            .resolved
            .get(name)
            .copied()
            .ok_or_else(|| self.fail(format!("unbound symbol `{name}`")))
    }

    fn eval(&self, operand: &Operand) -> Result<RtValue, BackendError> {
        Ok(match operand {
            Operand::Reg(reg) => self
                .regs
                .get(reg.0 as usize)
                .cloned()
                .ok_or_else(|| self.fail(format!("register %{} out of range", reg.0)))?,
            Operand::Const(Constant::Int { bits, value }) => RtValue::int(*bits, *value),
            Operand::Const(Constant::Float { value, .. }) => RtValue::Float(*value),
            Operand::Const(Constant::Null) => RtValue::Ptr(Pointer::Null),
            Operand::Global(name) | Operand::Function(name) => match self.address(name)? {
                NativeAddress::Data(cell) => RtValue::Ptr(Pointer::Cell(cell)),
                NativeAddress::Code(index) => RtValue::Func(index),
            },
            Operand::Str(index) => RtValue::Ptr(Pointer::Str {
                id: self.unit.string_base + index,
                offset: 0,
            }),
            Operand::Undef => RtValue::Void,
        })
    }

    fn set(&mut self, reg: crate::ir::Reg, value: RtValue) {
        let index = reg.0 as usize;
        if self.regs.len() <= index {
            self.regs.resize(index + 1, RtValue::Void);
        }
        self.regs[index] = value;
    }
}

impl Jit {
    pub(super) fn execute(&mut self, handle: UnitHandle) -> Result<(), BackendError> {
        let Jit {
            host_fns,
            cells,
            strings,
            units,
            ..
        } = self;
        let Some(unit) = units.get(handle.0 as usize) else {
            return Err(BackendError::UnknownUnit(handle.0));
        };
        let Some(func) = unit.module.entry_function() else {
            return Ok(());
        };
        tracing::trace!(unit = %unit.module.name, insts = func.insts.len(), "run unit");

        let mut frame = Frame {
            unit,
            regs: vec![RtValue::Void; func.regs as usize],
            slots: Vec::new(),
        };

        for inst in &func.insts {
            match inst {
                Inst::Alloca { dst, ty } => {
                    #[expect(
                        clippy::cast_possible_truncation,
                        reason = "stack slots per unit stay far below u32::MAX"
                    )]
                    let slot = frame.slots.len() as u32;
                    frame.slots.push(RtValue::zero(ty));
                    frame.set(*dst, RtValue::Ptr(Pointer::Stack(slot)));
                }
                Inst::Load { dst, ptr, .. } => {
                    let ptr = frame.eval(ptr)?;
                    let value = match ptr.as_pointer() {
                        Some(Pointer::Cell(cell)) => cells.get(cell as usize).cloned(),
                        Some(Pointer::Stack(slot)) => frame.slots.get(slot as usize).cloned(),
                        Some(Pointer::Str { id, offset }) => strings
                            .get(id as usize)
                            .map(|s| {
                                let byte = s.as_bytes().get(offset as usize).copied().unwrap_or(0);
                                RtValue::int(8, i64::from(byte))
                            }),
                        Some(Pointer::Null) | None => None,
                    };
                    let value = value.ok_or_else(|| frame.fail(format!("invalid load from {ptr:?}")))?;
                    frame.set(*dst, value);
                }
                Inst::Store { value, ptr } => {
                    let value = frame.eval(value)?;
                    let ptr = frame.eval(ptr)?;
                    let target = match ptr.as_pointer() {
                        Some(Pointer::Cell(cell)) => cells.get_mut(cell as usize),
                        Some(Pointer::Stack(slot)) => frame.slots.get_mut(slot as usize),
                        _ => None,
                    };
                    match target {
                        Some(target) => *target = value,
                        None => return Err(frame.fail(format!("invalid store to {ptr:?}"))),
                    }
                }
                Inst::Call { dst, callee, args } => {
                    let callee = frame.eval(callee)?;
                    let RtValue::Func(index) = callee else {
                        return Err(frame.fail(format!("call through non-function {callee:?}")));
                    };
                    let (name, function) = host_fns
                        .get(index as usize)
                        .ok_or_else(|| frame.fail(format!("no function at {index}")))?;
                    let args = args
                        .iter()
                        .map(|a| frame.eval(a))
                        .collect::<Result<Vec<_>, _>>()?;
                    let memory = HostMemory {
                        cells: cells.as_slice(),
                        strings: strings.as_slice(),
                    };
                    let result = function(&memory, &args)
                        .map_err(|message| frame.fail(format!("`{name}`: {message}")))?;
                    frame.set(*dst, result);
                }
                Inst::IntCast {
                    dst,
                    value,
                    to_bits,
                    signed,
                } => {
                    let value = frame.eval(value)?;
                    let cast = value
                        .int_cast(*to_bits, *signed)
                        .ok_or_else(|| frame.fail(format!("integer cast of {value:?}")))?;
                    frame.set(*dst, cast);
                }
                Inst::PtrCast { dst, value } => {
                    let value = frame.eval(value)?;
                    frame.set(*dst, value);
                }
                Inst::RetVoid => break,
            }
        }
        Ok(())
    }
}
