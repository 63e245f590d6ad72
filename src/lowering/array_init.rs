//! Array-initializer lowering (§4.6): stores an `ArrayInitList`'s elements
//! into successive addresses inside a destination array slot.
//!
//! The shape of `L` is never checked against the declared array type or
//! against `length`; mismatches are an open question upstream, preserved
//! here rather than invented.

use inkwell::values::PointerValue;

use crate::ast::{expression::ArrayInitList, expression::Expression, types::Type};

use super::{context::LoweringContext, error::LowerError};

pub fn lower_array_init<'ctx>(
    ctx: &LoweringContext<'ctx>,
    slot: PointerValue<'ctx>,
    declared_type: &Type,
    init: &ArrayInitList,
) -> Result<(), LowerError> {
    let Type::Array(element_ty, _length) = declared_type else {
        return Err(LowerError::PromotionFailure(
            init.token.clone(),
            "array initializer used on a non-array declaration".to_string(),
        ));
    };

    let backend_array_ty = declared_type.lower(ctx.llvm).into_array_type();
    let zero = ctx.llvm.i32_type().const_zero();

    // Two-index `[0, 0]` address computation: from a pointer-to-array down
    // to a pointer-to-first-element.
    let mut element_ptr = unsafe {
        ctx.builder
            .build_in_bounds_gep(backend_array_ty, slot, &[zero, zero], "arrinit")
            .expect("in-bounds gep on a freshly allocated array never fails")
    };

    let count = init.elements.len();
    for (i, element) in init.elements.iter().enumerate() {
        store_element(ctx, element_ptr, element_ty, element)?;

        let is_last = i + 1 == count;
        if !is_last {
            let one = ctx.llvm.i32_type().const_int(1, false);
            let backend_elem_ty = element_ty.lower(ctx.llvm);
            element_ptr = unsafe {
                ctx.builder
                    .build_in_bounds_gep(backend_elem_ty, element_ptr, &[one], "arrnext")
                    .expect("in-bounds gep within a freshly allocated array never fails")
            };
        }
    }

    Ok(())
}

fn store_element<'ctx>(
    ctx: &LoweringContext<'ctx>,
    ptr: PointerValue<'ctx>,
    element_ty: &Type,
    element: &Expression,
) -> Result<(), LowerError> {
    match element {
        Expression::ArrayInit(nested) => lower_array_init(ctx, ptr, element_ty, nested),
        _ => {
            let value = element.lower(ctx)?.ok_or_else(|| {
                LowerError::PromotionFailure(
                    element.token().clone(),
                    "array element produced no value".to_string(),
                )
            })?;
            ctx.builder
                .build_store(ptr, value)
                .expect("store to a valid array element never fails");
            Ok(())
        }
    }
}
