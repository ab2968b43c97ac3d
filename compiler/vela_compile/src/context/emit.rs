//! Expression results and code emission.
//!
//! An expression handler never returns its value. It calls
//! [`Emit::adopt_result`], which converts the value to what the consumer
//! asked for (the [`Expected`] target of the current result slot) and
//! stores it there; [`Emit::compile_expression`] installs a fresh slot,
//! dispatches, and hands the slot's contents back.

use vela_backend::BuilderMethods;
use vela_ir::{Node, Symbol};
use vela_types::TypeId;

use crate::context::local::ResultSlot;
use crate::context::{CompileContext, Expected, ModuleOf, NativeTypeOf, ValueOf};
use crate::decls::ConstValue;
use crate::temporaries::{run_cleaners, Cleaner};
use crate::{CompileError, CompilerVisitor, Result};

pub trait Emit: CompileContext {
    /// Run `build` against the backend and the module being built.
    fn with_module<R>(
        &mut self,
        build: impl FnOnce(&Self::Backend, &mut ModuleOf<Self>) -> R,
    ) -> Result<R> {
        let (global, local) = self.split_mut();
        let module = local.module_mut()?;
        Ok(build(global.backend(), module))
    }

    fn materialize(&self, ty: TypeId) -> Result<NativeTypeOf<Self>> {
        Ok(self.global().types().materialize(ty)?)
    }

    fn load(&mut self, ty: TypeId, ptr: &ValueOf<Self>) -> Result<ValueOf<Self>> {
        let native = self.materialize(ty)?;
        self.with_module(|backend, module| backend.build_load(module, &native, ptr))
    }

    /// Store `value` of type `ty` as the current expression's result,
    /// converted to the current target.
    fn adopt_result(&mut self, ty: TypeId, value: ValueOf<Self>) -> Result<()> {
        let produced = match self.local().expected() {
            Expected::Inviolable => (ty, value),
            Expected::Unreference => match self.global().types().reference_target(ty) {
                Some(target) => {
                    let loaded = self.load(target, &value)?;
                    (target, loaded)
                }
                None => (ty, value),
            },
            Expected::Type(to) => {
                let converted = self.convert_to_type(ty, value, to)?;
                (to, converted)
            }
        };
        self.local_mut().result.produced = Some(produced);
        Ok(())
    }

    /// Convert `value` from `from` to `to`: identity, load through a
    /// reference, integer resize, pointer cast, or a temporary holding the
    /// value when `to` is a reference.
    fn convert_to_type(
        &mut self,
        from: TypeId,
        value: ValueOf<Self>,
        to: TypeId,
    ) -> Result<ValueOf<Self>> {
        if from == to {
            return Ok(value);
        }
        let types = self.global().types().clone();

        if let Some(target) = types.reference_target(from) {
            let loaded = self.load(target, &value)?;
            return self.convert_to_type(target, loaded, to);
        }
        if let Some(target) = types.reference_target(to) {
            let inner = self.convert_to_type(from, value, target)?;
            let slot = self.make_temporary(target)?;
            self.with_module(|backend, module| backend.build_store(module, &inner, &slot))?;
            return Ok(slot);
        }
        if let (Some(source), Some(_)) = (types.int_info(from), types.int_info(to)) {
            let native = self.materialize(to)?;
            return self.with_module(|backend, module| {
                backend.build_int_cast(module, &value, &native, source.signed)
            });
        }
        if types.is_pointer(from) && types.is_pointer(to) {
            let native = self.materialize(to)?;
            return self
                .with_module(|backend, module| backend.build_pointer_cast(module, &value, &native));
        }

        Err(CompileError::TypeMismatch {
            expected: types.display(to),
            found: types.display(from),
        })
    }

    /// Stack storage for a value of type `ty`, valid until the unit returns.
    fn make_temporary(&mut self, ty: TypeId) -> Result<ValueOf<Self>> {
        let native = self.materialize(ty)?;
        self.with_module(|backend, module| backend.build_alloca(module, &native))
    }

    /// Native value of the constant `name`.
    fn const_value(
        &mut self,
        name: Symbol,
        ty: TypeId,
        value: &ConstValue,
    ) -> Result<ValueOf<Self>> {
        match value {
            ConstValue::Type(_) => Err(CompileError::TypeAsValue { name }),
            ConstValue::Str(text) => {
                self.with_module(|backend, module| backend.const_string(module, text))
            }
            ConstValue::Int(int) => {
                let native = self.materialize(ty)?;
                Ok(self.global().backend().const_int(&native, *int))
            }
            ConstValue::Char(ch) => {
                let native = self.materialize(ty)?;
                Ok(self
                    .global()
                    .backend()
                    .const_int(&native, i64::from(u32::from(*ch))))
            }
            ConstValue::Null => {
                let native = self.materialize(ty)?;
                Ok(self.global().backend().const_null(&native))
            }
        }
    }

    /// Compile `node` against `expected`; `None` when it produced no value.
    fn compile_expression_opt(
        &mut self,
        vis: &CompilerVisitor<Self>,
        node: &Node,
        expected: Expected,
    ) -> Result<Option<(TypeId, ValueOf<Self>)>> {
        let saved = std::mem::replace(&mut self.local_mut().result, ResultSlot::new(expected));
        let outcome = vis.visit(self, node);
        let slot = std::mem::replace(&mut self.local_mut().result, saved);
        outcome?;
        Ok(slot.produced)
    }

    /// Compile `node` against `expected`; it must produce a value.
    fn compile_expression(
        &mut self,
        vis: &CompilerVisitor<Self>,
        node: &Node,
        expected: Expected,
    ) -> Result<(TypeId, ValueOf<Self>)> {
        self.compile_expression_opt(vis, node, expected)?
            .ok_or(CompileError::NoValue { kind: node.kind() })
    }

    // -- Scopes --

    /// Save the current declarations and variables.
    fn push_variables(&mut self) {
        let local = self.local_mut();
        let saved = (local.decls.clone(), local.vars.child());
        local.saved.push(saved);
    }

    /// Restore the declarations and variables saved by the matching
    /// [`Emit::push_variables`].
    fn pop_variables(&mut self) -> Result<()> {
        let local = self.local_mut();
        let (decls, vars) = local.saved.pop().ok_or(CompileError::StackUnderflow {
            what: "variables",
        })?;
        local.decls = decls;
        local.vars = vars;
        Ok(())
    }

    fn push_temporaries(&mut self) {
        self.local_mut().temporaries.push();
    }

    fn add_temporary(&mut self, cleaner: Cleaner<Self>) -> Result<()> {
        self.local_mut().temporaries.add(cleaner)
    }

    /// Run the top frame's cleaners, most recent first.
    fn pop_temporaries(&mut self) -> Result<()> {
        let cleaners = self.local_mut().temporaries.pop()?;
        run_cleaners(self, cleaners)
    }

    /// Run cleaners registered for the whole local context.
    fn run_context_cleaners(&mut self) -> Result<()> {
        let mut cleaners = std::mem::take(&mut self.local_mut().cleaners);
        cleaners.reverse();
        run_cleaners(self, cleaners)
    }

    // -- Builder position --

    fn push_builder_ip(&mut self) -> Result<()> {
        let ip = self.with_module(|backend, module| backend.insert_point(module))?;
        self.local_mut().builder_ips.push(ip);
        Ok(())
    }

    fn pop_builder_ip(&mut self) -> Result<()> {
        let ip = self
            .local_mut()
            .builder_ips
            .pop()
            .ok_or(CompileError::StackUnderflow {
                what: "builder position",
            })?;
        self.with_module(|backend, module| backend.set_insert_point(module, ip))
    }
}

impl<C: CompileContext> Emit for C {}
