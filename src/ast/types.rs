//! Type tree: the AST's representation of source-language types.
//!
//! Polymorphic over `{render, lower, is_safe}`, mirrored here as inherent
//! methods on a closed `Type` enum rather than as a trait object hierarchy —
//! the re-architecture spec.md §9 calls for ("tagged variants with a uniform
//! trait" collapsed, in idiomatic Rust, into one `enum` plus `impl` block).

use inkwell::{context::Context, types::BasicTypeEnum, AddressSpace};

/// The nine primitive identifiers a `SimpleType` can name. Only `char`,
/// `short`, `int`, `long` and `void` are reachable through the documented
/// grammar (`simple_type`); `byte`, `half`, `single`, `double` exist in the
/// type tree for the primitive-arithmetic promotion table and for any
/// future grammar extension, but the parser never constructs them itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PrimitiveIdentifier {
    Char,
    Byte,
    Short,
    Int,
    Long,
    Half,
    Single,
    Double,
    Void,
}

impl PrimitiveIdentifier {
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveIdentifier::Char => "char",
            PrimitiveIdentifier::Byte => "byte",
            PrimitiveIdentifier::Short => "short",
            PrimitiveIdentifier::Int => "int",
            PrimitiveIdentifier::Long => "long",
            PrimitiveIdentifier::Half => "half",
            PrimitiveIdentifier::Single => "single",
            PrimitiveIdentifier::Double => "double",
            PrimitiveIdentifier::Void => "void",
        }
    }

    /// `true` for the three floating-point identifiers.
    pub fn is_floating(&self) -> bool {
        matches!(
            self,
            PrimitiveIdentifier::Half | PrimitiveIdentifier::Single | PrimitiveIdentifier::Double
        )
    }

    /// Bit width used both for LLVM lowering and for the integer-promotion
    /// table's "widest width wins" rule. Meaningless for `Void`.
    pub fn width(&self) -> u32 {
        match self {
            PrimitiveIdentifier::Char | PrimitiveIdentifier::Byte => 8,
            PrimitiveIdentifier::Short | PrimitiveIdentifier::Half => 16,
            PrimitiveIdentifier::Int | PrimitiveIdentifier::Single => 32,
            PrimitiveIdentifier::Long | PrimitiveIdentifier::Double => 64,
            PrimitiveIdentifier::Void => 0,
        }
    }
}

/// `SimpleType{identifier, is_unsigned}` as specified. `is_unsigned` only
/// affects semantics (promotion, rendering); LLVM's integer types carry no
/// sign of their own, so it has no effect on `lower`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SimpleType {
    pub identifier: PrimitiveIdentifier,
    pub is_unsigned: bool,
}

impl SimpleType {
    pub fn new(identifier: PrimitiveIdentifier, is_unsigned: bool) -> Self {
        Self { identifier, is_unsigned }
    }

    pub fn signed(identifier: PrimitiveIdentifier) -> Self {
        Self::new(identifier, false)
    }

    /// The integer backend type matching this identifier's width. All
    /// arithmetic in the IR subset is integer arithmetic (§6 lists no float
    /// instructions), so floating-point identifiers still lower to an
    /// integer type of matching width here.
    pub fn identifier_width_int_type<'ctx>(
        &self,
        llvm: &'ctx inkwell::context::Context,
    ) -> inkwell::types::IntType<'ctx> {
        match self.identifier.width() {
            8 => llvm.i8_type(),
            16 => llvm.i16_type(),
            32 => llvm.i32_type(),
            64 => llvm.i64_type(),
            _ => unreachable!("void has no arithmetic width"),
        }
    }
}

/// Semantic type tree. A type is **safe** iff no [`Type::Pointer`] appears
/// anywhere in its structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Type {
    Simple(SimpleType),
    /// Unsafe: a bare pointer to `pointee`.
    Pointer(Box<Type>),
    /// An lvalue reference to `referent`. Always safe.
    LValueReference(Box<Type>),
    /// A fixed-length array of `length` elements of type `element`.
    Array(Box<Type>, u64),
}

impl Type {
    pub fn simple(identifier: PrimitiveIdentifier, is_unsigned: bool) -> Self {
        Type::Simple(SimpleType::new(identifier, is_unsigned))
    }

    pub fn pointer(pointee: Type) -> Self {
        Type::Pointer(Box::new(pointee))
    }

    pub fn reference(referent: Type) -> Self {
        Type::LValueReference(Box::new(referent))
    }

    pub fn array(element: Type, length: u64) -> Self {
        Type::Array(Box::new(element), length)
    }

    /// `true` iff no `Pointer` appears anywhere in this type's structure.
    pub fn is_safe(&self) -> bool {
        match self {
            Type::Simple(_) => true,
            Type::Pointer(_) => false,
            Type::LValueReference(referent) => referent.is_safe(),
            Type::Array(element, _) => element.is_safe(),
        }
    }

    /// Human-readable indented tree, for debugging and golden comparisons.
    /// Source positions are intentionally never part of this output.
    pub fn render(&self, depth: usize) -> String {
        let indent = "  ".repeat(depth);
        match self {
            Type::Simple(SimpleType { identifier, is_unsigned }) => {
                let sign = if *is_unsigned { "unsigned " } else { "" };
                format!("{indent}Type: {sign}{}", identifier.name())
            }
            Type::Pointer(pointee) => {
                format!("{indent}Pointer:\n{}", pointee.render(depth + 1))
            }
            Type::LValueReference(referent) => {
                format!("{indent}LValueReference:\n{}", referent.render(depth + 1))
            }
            Type::Array(element, length) => {
                format!(
                    "{indent}Array[{length}]:\n{}",
                    element.render(depth + 1)
                )
            }
        }
    }

    /// Lowers to the corresponding backend (LLVM) primitive/aggregate type.
    /// `Void` has no `BasicTypeEnum` representation in LLVM and must be
    /// handled separately by callers that need a function return type.
    pub fn lower<'ctx>(&self, llvm: &'ctx Context) -> BasicTypeEnum<'ctx> {
        match self {
            Type::Simple(SimpleType { identifier, .. }) => match identifier {
                PrimitiveIdentifier::Char | PrimitiveIdentifier::Byte => llvm.i8_type().into(),
                PrimitiveIdentifier::Short | PrimitiveIdentifier::Half => llvm.i16_type().into(),
                PrimitiveIdentifier::Int | PrimitiveIdentifier::Single => llvm.i32_type().into(),
                PrimitiveIdentifier::Long | PrimitiveIdentifier::Double => llvm.i64_type().into(),
                PrimitiveIdentifier::Void => {
                    unreachable!("Type::lower called on void; callers must special-case it")
                }
            },
            // Pointers and lvalue references both lower to a pointer-to-pointee backend
            // type; only `is_safe` distinguishes them afterwards.
            Type::Pointer(_) | Type::LValueReference(_) => {
                llvm.ptr_type(AddressSpace::default()).into()
            }
            Type::Array(element, length) => {
                element.lower(llvm).array_type(*length as u32).into()
            }
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Simple(SimpleType { identifier: PrimitiveIdentifier::Void, .. }))
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Type::Simple(SimpleType { identifier, .. }) if identifier.is_floating())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_types_are_unsafe() {
        let t = Type::pointer(Type::simple(PrimitiveIdentifier::Int, false));
        assert!(!t.is_safe());
    }

    #[test]
    fn reference_to_pointer_is_still_unsafe() {
        let t = Type::reference(Type::pointer(Type::simple(PrimitiveIdentifier::Char, false)));
        assert!(!t.is_safe());
    }

    #[test]
    fn array_of_simple_is_safe() {
        let t = Type::array(Type::simple(PrimitiveIdentifier::Int, false), 4);
        assert!(t.is_safe());
    }

    #[test]
    fn render_is_position_free() {
        let t = Type::simple(PrimitiveIdentifier::Int, true);
        assert_eq!(t.render(0), "Type: unsigned int");
    }
}
