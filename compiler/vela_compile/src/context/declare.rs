//! Declaring names in the local context.

use vela_ir::Symbol;
use vela_types::TypeId;

use crate::context::CompileContext;
use crate::decls::{ConstValue, Declarations, Intrinsic};
use crate::manifest::{ConstDesc, DeclRecord};
use crate::Result;

/// `add_*` declares in the current file; `export_*` also makes the name
/// visible to files importing it.
pub trait Declare: CompileContext {
    fn add_alias(&mut self, name: Symbol, target: Symbol) -> Result<()> {
        self.local_mut().decls.insert_alias(name, target)
    }

    fn export_alias(&mut self, name: Symbol, target: Symbol) -> Result<()> {
        self.add_alias(name, target)?;
        self.local_mut().export_decls.insert_alias(name, target)
    }

    fn add_constant(&mut self, name: Symbol, ty: TypeId, value: ConstValue) -> Result<()> {
        self.local_mut().decls.insert_constant(name, ty, value)
    }

    fn export_constant(&mut self, name: Symbol, ty: TypeId, value: ConstValue) -> Result<()> {
        self.add_constant(name, ty, value.clone())?;
        self.local_mut().export_decls.insert_constant(name, ty, value)
    }

    fn add_symbol(&mut self, name: Symbol, ty: TypeId) -> Result<()> {
        self.local_mut().decls.insert_symbol(name, ty)
    }

    fn export_symbol(&mut self, name: Symbol, ty: TypeId) -> Result<()> {
        self.add_symbol(name, ty)?;
        self.local_mut().export_decls.insert_symbol(name, ty)
    }

    fn add_intrinsic(&mut self, name: Symbol, intrinsic: Intrinsic<Self>) -> Result<()> {
        self.local_mut().decls.insert_intrinsic(name, intrinsic)
    }

    fn export_intrinsic(&mut self, name: Symbol, intrinsic: Intrinsic<Self>) -> Result<()> {
        self.add_intrinsic(name, intrinsic.clone())?;
        self.local_mut().export_decls.insert_intrinsic(name, intrinsic)
    }

    /// Declare `name` as a type: a constant of type `static_type`.
    fn add_type(&mut self, name: Symbol, ty: TypeId) -> Result<()> {
        let static_type = self.global().types().common().static_type;
        self.add_constant(name, static_type, ConstValue::Type(ty))
    }

    fn export_type(&mut self, name: Symbol, ty: TypeId) -> Result<()> {
        let static_type = self.global().types().common().static_type;
        self.export_constant(name, static_type, ConstValue::Type(ty))
    }

    /// Merge another file's exports into the current file.
    fn import_declarations(&mut self, decls: &Declarations<Self>) -> Result<()> {
        self.local_mut().decls.merge(decls)
    }

    /// Carry out one declaration a unit recorded.
    fn apply_record(&mut self, record: DeclRecord) -> Result<()> {
        let types = self.global().types().clone();
        match record {
            DeclRecord::Alias {
                name,
                target,
                export,
            } => {
                let (name, target) = (Symbol::intern(&name), Symbol::intern(&target));
                if export {
                    self.export_alias(name, target)
                } else {
                    self.add_alias(name, target)
                }
            }
            DeclRecord::Constant {
                name,
                ty,
                value,
                export,
            } => {
                let name = Symbol::intern(&name);
                let ty = types.from_desc(&ty);
                let value = match value {
                    ConstDesc::Int(v) => ConstValue::Int(v),
                    ConstDesc::Char(c) => ConstValue::Char(c),
                    ConstDesc::Str(s) => ConstValue::Str(s.into()),
                    ConstDesc::Null => ConstValue::Null,
                    ConstDesc::Type(desc) => ConstValue::Type(types.from_desc(&desc)),
                };
                if export {
                    self.export_constant(name, ty, value)
                } else {
                    self.add_constant(name, ty, value)
                }
            }
            DeclRecord::Symbol { name, ty, export } => {
                let name = Symbol::intern(&name);
                let ty = types.from_desc(&ty);
                if export {
                    self.export_symbol(name, ty)
                } else {
                    self.add_symbol(name, ty)
                }
            }
            DeclRecord::StructBody {
                name,
                elems,
                packed,
            } => {
                let id = types.named_struct(Symbol::intern(&name));
                let elems: Vec<TypeId> = elems.iter().map(|e| types.from_desc(e)).collect();
                Ok(types.set_struct_body(id, &elems, packed)?)
            }
            DeclRecord::Import { path } => self.import(&path),
        }
    }
}

impl<C: CompileContext> Declare for C {}
