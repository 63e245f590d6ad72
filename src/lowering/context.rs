//! `LoweringContext`: the single threaded-through object that owns every
//! piece of ambient lowering state named in the design — the backend
//! builder, the symbol-table stack, `in_unsafe_block`, `current_function` —
//! mirroring the teacher's `CodegenContext`.

use std::cell::{Cell, RefCell};

use inkwell::{
    builder::Builder,
    context::Context,
    module::Module,
    passes::PassManager,
    values::FunctionValue,
};

use crate::diagnostics::Diagnostics;

use super::symbol_table::SymbolTable;

pub struct LoweringContext<'ctx> {
    pub llvm: &'ctx Context,
    pub module: Module<'ctx>,
    pub builder: Builder<'ctx>,
    pub symbols: RefCell<SymbolTable<'ctx>>,
    pub in_unsafe_block: Cell<bool>,
    pub current_function: RefCell<Option<FunctionValue<'ctx>>>,
    pub diagnostics: RefCell<Diagnostics>,
    fpm: PassManager<FunctionValue<'ctx>>,
}

impl<'ctx> LoweringContext<'ctx> {
    pub fn new(llvm: &'ctx Context, module_name: &str) -> Self {
        let module = llvm.create_module(module_name);
        let fpm = PassManager::create(&module);
        // Per the design's "a thin wrapper requesting exactly one
        // function-level optimization pass": instruction combining is
        // enough to fold the `+x`/`-x` unary desugaring (`x * 1`, `x * -1`)
        // without reaching for a whole pipeline.
        fpm.add_instruction_combining_pass();
        fpm.initialize();

        let builder = llvm.create_builder();

        // The top-level `block` production (spec.md §4.1) can hold ordinary
        // statements directly — a declaration's initializer, even a bare
        // `return` — with no enclosing `FunctionDeclaration`. Every one of
        // those still needs a basic block to emit into, so this context
        // synthesizes one void-returning implicit function up front and
        // starts out positioned inside it; a real top-level
        // `FunctionDeclaration` (the common case) just becomes a sibling
        // function, and lowering returns to this block afterwards (see
        // `lower_function_declaration`'s insertion-point save/restore).
        let top_level_fn = module.add_function("top_level", llvm.void_type().fn_type(&[], false), None);
        let top_level_entry = llvm.append_basic_block(top_level_fn, "entry");
        builder.position_at_end(top_level_entry);

        Self {
            llvm,
            module,
            builder,
            symbols: RefCell::new(SymbolTable::new()),
            in_unsafe_block: Cell::new(false),
            current_function: RefCell::new(Some(top_level_fn)),
            diagnostics: RefCell::new(Diagnostics::new()),
            fpm,
        }
    }

    pub fn optimize(&self, function: FunctionValue<'ctx>) {
        self.fpm.run_on(&function);
    }

    /// Terminates the implicit top-level function once the whole AST has
    /// been lowered, if nothing else already did (an explicit top-level
    /// `return;` is legal per the grammar and would have terminated it
    /// already). Must run after `Statement::lower` on the root node.
    pub fn finish_top_level(&self) {
        if let Some(block) = self.builder.get_insert_block() {
            if block.get_terminator().is_none() {
                self.builder.build_return(None).expect("ret void never fails");
            }
        }
    }

    /// Pushes a fresh symbol frame; the returned guard pops it on drop, so
    /// the stack depth invariant holds across `?`-propagated failures too.
    pub fn enter_scope(&self) -> ScopeGuard<'_, 'ctx> {
        log::trace!("entering scope");
        self.symbols.borrow_mut().push();
        ScopeGuard { ctx: self }
    }

    /// Flips `in_unsafe_block` to `true`; the returned guard restores the
    /// prior value on drop. Callers decide separately whether entry was
    /// "unnecessary" (prior value already `true`) and warn accordingly.
    pub fn enter_unsafe(&self) -> UnsafeGuard<'_, 'ctx> {
        let previous = self.in_unsafe_block.replace(true);
        log::trace!("entering unsafe context (was {previous})");
        UnsafeGuard {
            ctx: self,
            previous,
        }
    }
}

pub struct ScopeGuard<'a, 'ctx> {
    ctx: &'a LoweringContext<'ctx>,
}

impl Drop for ScopeGuard<'_, '_> {
    fn drop(&mut self) {
        log::trace!("leaving scope");
        self.ctx.symbols.borrow_mut().pop();
    }
}

pub struct UnsafeGuard<'a, 'ctx> {
    ctx: &'a LoweringContext<'ctx>,
    previous: bool,
}

impl Drop for UnsafeGuard<'_, '_> {
    fn drop(&mut self) {
        log::trace!("leaving unsafe context (restoring {})", self.previous);
        self.ctx.in_unsafe_block.set(self.previous);
    }
}
