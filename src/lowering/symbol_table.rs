//! Scoped symbol table: a stack of frames, innermost last.
//!
//! Grounded in the teacher's `codegen::context::Scope` (separate
//! `variables`/`functions` maps per frame, walked parent-first on lookup).
//! Frames are shared (`Rc<RefCell<_>>`) rather than arena-indexed, since a
//! single-threaded lowering run never needs more than one owner at a time —
//! the `Rc` only exists so [`SymbolTable`] can hand out a frame without
//! borrowing itself for the frame's whole lifetime.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use inkwell::values::{FunctionValue, PointerValue};

use crate::ast::types::Type;

/// A bound name: either a stack slot (a local variable or parameter),
/// tagged with its declared source type so a later load knows what to read,
/// or a function handle registered during `preprocess`, tagged with its
/// declared return type so a call through it can fill in its own inferred
/// type the same way every other expression arm does.
#[derive(Debug, Clone)]
pub enum Symbol<'ctx> {
    Variable(PointerValue<'ctx>, Type),
    Function(FunctionValue<'ctx>, Type),
}

#[derive(Debug, Default)]
pub struct Frame<'ctx> {
    bindings: HashMap<String, Symbol<'ctx>>,
}

impl<'ctx> Frame<'ctx> {
    fn insert(&mut self, name: impl Into<String>, symbol: Symbol<'ctx>) {
        self.bindings.insert(name.into(), symbol);
    }

    fn get(&self, name: &str) -> Option<Symbol<'ctx>> {
        self.bindings.get(name).cloned()
    }

    fn remove(&mut self, name: &str) {
        self.bindings.remove(name);
    }
}

/// The stack itself. The root frame is pushed once, at construction, by the
/// lowerer, and is never popped.
#[derive(Debug)]
pub struct SymbolTable<'ctx> {
    frames: Vec<Rc<RefCell<Frame<'ctx>>>>,
}

impl<'ctx> SymbolTable<'ctx> {
    pub fn new() -> Self {
        Self {
            frames: vec![Rc::new(RefCell::new(Frame::default()))],
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self) {
        self.frames.push(Rc::new(RefCell::new(Frame::default())));
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// The frame currently in scope; callers insert/remove bindings through it.
    pub fn current(&self) -> Rc<RefCell<Frame<'ctx>>> {
        self.frames
            .last()
            .expect("root frame is never popped")
            .clone()
    }

    pub fn declare_variable(&self, name: impl Into<String>, slot: PointerValue<'ctx>, ty: Type) {
        self.current()
            .borrow_mut()
            .insert(name, Symbol::Variable(slot, ty));
    }

    pub fn declare_function(
        &self,
        name: impl Into<String>,
        handle: FunctionValue<'ctx>,
        return_type: Type,
    ) {
        self.current()
            .borrow_mut()
            .insert(name, Symbol::Function(handle, return_type));
    }

    pub fn remove(&self, name: &str) {
        self.current().borrow_mut().remove(name);
    }

    /// Walks from the innermost frame outward, returning the first binding found.
    pub fn lookup(&self, name: &str) -> Option<Symbol<'ctx>> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.borrow().get(name))
    }
}

impl<'ctx> Default for SymbolTable<'ctx> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    #[test]
    fn lookup_walks_innermost_first() {
        let llvm = Context::create();
        let module = llvm.create_module("t");
        let builder = llvm.create_builder();
        let fn_ty = llvm.void_type().fn_type(&[], false);
        let function = module.add_function("f", fn_ty, None);
        let block = llvm.append_basic_block(function, "entry");
        builder.position_at_end(block);
        let outer_slot = builder.build_alloca(llvm.i32_type(), "x").unwrap();
        let inner_slot = builder.build_alloca(llvm.i32_type(), "x").unwrap();

        let int_ty = crate::ast::types::Type::simple(
            crate::ast::types::PrimitiveIdentifier::Int,
            false,
        );

        let mut table = SymbolTable::new();
        table.declare_variable("x", outer_slot, int_ty.clone());
        table.push();
        table.declare_variable("x", inner_slot, int_ty.clone());

        match table.lookup("x") {
            Some(Symbol::Variable(slot, _)) => assert_eq!(slot, inner_slot),
            _ => panic!("expected inner binding"),
        }

        table.pop();
        match table.lookup("x") {
            Some(Symbol::Variable(slot, _)) => assert_eq!(slot, outer_slot),
            _ => panic!("expected outer binding"),
        }
    }

    #[test]
    fn pop_restores_depth() {
        let mut table = SymbolTable::new();
        let start = table.depth();
        table.push();
        table.push();
        table.pop();
        table.pop();
        assert_eq!(table.depth(), start);
    }
}
