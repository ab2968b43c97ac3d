//! Instruction building for the reference backend.

use crate::ir::{Constant, Function, Inst, Module, Operand};
use crate::traits::{BackendTypes, BuilderMethods, InsertPoint, TypeMethods};
use crate::{native, BackendError, Jit, NativeType};

impl BackendTypes for Jit {
    type Type = NativeType;
    type Value = Operand;
    type Module = Module;
}

impl TypeMethods for Jit {
    fn install_type_hooks(&self, store: &vela_types::TypeStore<NativeType>) {
        native::install_native_hooks(store);
    }

    fn size_of(&self, ty: &NativeType) -> Option<u64> {
        ty.size_of()
    }

    fn align_of(&self, ty: &NativeType) -> Option<u64> {
        ty.align_of()
    }
}

impl BuilderMethods for Jit {
    fn create_module(&self, name: &str) -> Module {
        Module::new(name)
    }

    fn begin_function(&self, module: &mut Module, name: &str) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "function count per module stays far below u32::MAX"
        )]
        let index = module.functions.len() as u32;
        module.functions.push(Function {
            name: name.to_owned(),
            insts: Vec::new(),
            regs: 0,
        });
        module.entry.get_or_insert(index);
        module.cursor = Some(index);
    }

    fn insert_point(&self, module: &Module) -> InsertPoint {
        InsertPoint(module.cursor)
    }

    fn set_insert_point(&self, module: &mut Module, ip: InsertPoint) {
        module.cursor = ip.0;
    }

    fn const_int(&self, ty: &NativeType, value: i64) -> Operand {
        match ty {
            #[expect(clippy::cast_precision_loss, reason = "int-to-float constant")]
            NativeType::Float { bits } => Operand::Const(Constant::Float {
                bits: *bits,
                value: value as f64,
            }),
            _ => Operand::Const(Constant::Int {
                bits: ty.int_bits().unwrap_or(64),
                value,
            }),
        }
    }

    fn const_float(&self, ty: &NativeType, value: f64) -> Operand {
        let bits = match ty {
            NativeType::Float { bits } => *bits,
            _ => 64,
        };
        Operand::Const(Constant::Float { bits, value })
    }

    fn const_null(&self, _ty: &NativeType) -> Operand {
        Operand::Const(Constant::Null)
    }

    fn const_string(&self, module: &mut Module, value: &str) -> Operand {
        Operand::Str(module.intern_string(value))
    }

    fn const_int_value(&self, value: &Operand) -> Option<i64> {
        match value {
            Operand::Const(Constant::Int { value, .. }) => Some(*value),
            _ => None,
        }
    }

    fn declare_global(&self, module: &mut Module, name: &str, ty: &NativeType) -> Operand {
        module.declare_extern(name, ty, false);
        Operand::Global(name.to_owned())
    }

    fn define_global(&self, module: &mut Module, name: &str, ty: &NativeType) -> Operand {
        module.externs.retain(|e| e.name != name);
        if !module.globals.iter().any(|g| g.name == name) {
            module.globals.push(crate::ir::GlobalDef {
                name: name.to_owned(),
                ty: ty.clone(),
            });
        }
        Operand::Global(name.to_owned())
    }

    fn declare_function(&self, module: &mut Module, name: &str, fn_ty: &NativeType) -> Operand {
        module.declare_extern(name, fn_ty, true);
        Operand::Function(name.to_owned())
    }

    fn build_alloca(&self, module: &mut Module, ty: &NativeType) -> Operand {
        module.emit(|dst| Inst::Alloca {
            dst,
            ty: ty.clone(),
        })
    }

    fn build_load(&self, module: &mut Module, ty: &NativeType, ptr: &Operand) -> Operand {
        module.emit(|dst| Inst::Load {
            dst,
            ty: ty.clone(),
            ptr: ptr.clone(),
        })
    }

    fn build_store(&self, module: &mut Module, value: &Operand, ptr: &Operand) {
        module.emit_void(Inst::Store {
            value: value.clone(),
            ptr: ptr.clone(),
        });
    }

    fn build_call(
        &self,
        module: &mut Module,
        _fn_ty: &NativeType,
        callee: &Operand,
        args: &[Operand],
    ) -> Operand {
        module.emit(|dst| Inst::Call {
            dst,
            callee: callee.clone(),
            args: args.to_vec(),
        })
    }

    fn build_int_cast(
        &self,
        module: &mut Module,
        value: &Operand,
        to: &NativeType,
        signed: bool,
    ) -> Operand {
        let to_bits = to.int_bits().unwrap_or(64);
        module.emit(|dst| Inst::IntCast {
            dst,
            value: value.clone(),
            to_bits,
            signed,
        })
    }

    fn build_pointer_cast(&self, module: &mut Module, value: &Operand, _to: &NativeType) -> Operand {
        module.emit(|dst| Inst::PtrCast {
            dst,
            value: value.clone(),
        })
    }

    fn build_ret_void(&self, module: &mut Module) {
        module.emit_void(Inst::RetVoid);
    }

    fn verify_module(&self, module: &Module) -> Result<(), BackendError> {
        let invalid = |message: String| BackendError::InvalidModule {
            module: module.name.clone(),
            message,
        };
        if module.misplaced > 0 {
            return Err(invalid(format!(
                "{} instruction(s) emitted outside a function",
                module.misplaced
            )));
        }
        for func in &module.functions {
            if func.insts.last() != Some(&Inst::RetVoid) {
                return Err(invalid(format!("function `{}` is not terminated", func.name)));
            }
        }
        Ok(())
    }
}
