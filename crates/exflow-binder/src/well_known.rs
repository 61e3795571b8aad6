//! Well-known library types and numeric conversion facts.

/// Types the analysis refers to by identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WellKnownType {
    Object,
    String,
    Boolean,
    Decimal,
    Nullable,
    Array,
    IEnumerable,
    Exception,
    ArgumentException,
    ArgumentNullException,
    ArgumentOutOfRangeException,
    InvalidOperationException,
    InvalidCastException,
    OverflowException,
}

impl WellKnownType {
    pub const fn full_name(self) -> &'static str {
        match self {
            WellKnownType::Object => "System.Object",
            WellKnownType::String => "System.String",
            WellKnownType::Boolean => "System.Boolean",
            WellKnownType::Decimal => "System.Decimal",
            WellKnownType::Nullable => "System.Nullable",
            WellKnownType::Array => "System.Array",
            WellKnownType::IEnumerable => "System.Collections.Generic.IEnumerable",
            WellKnownType::Exception => "System.Exception",
            WellKnownType::ArgumentException => "System.ArgumentException",
            WellKnownType::ArgumentNullException => "System.ArgumentNullException",
            WellKnownType::ArgumentOutOfRangeException => "System.ArgumentOutOfRangeException",
            WellKnownType::InvalidOperationException => "System.InvalidOperationException",
            WellKnownType::InvalidCastException => "System.InvalidCastException",
            WellKnownType::OverflowException => "System.OverflowException",
        }
    }

    /// Generic arity of the definition.
    pub const fn arity(self) -> usize {
        match self {
            WellKnownType::Nullable | WellKnownType::IEnumerable => 1,
            _ => 0,
        }
    }
}

/// Keyword aliases for predefined types.
pub fn predefined_alias(name: &str) -> Option<&'static str> {
    Some(match name {
        "object" => "System.Object",
        "string" => "System.String",
        "bool" => "System.Boolean",
        "char" => "System.Char",
        "sbyte" => "System.SByte",
        "byte" => "System.Byte",
        "short" => "System.Int16",
        "ushort" => "System.UInt16",
        "int" => "System.Int32",
        "uint" => "System.UInt32",
        "long" => "System.Int64",
        "ulong" => "System.UInt64",
        "float" => "System.Single",
        "double" => "System.Double",
        "decimal" => "System.Decimal",
        _ => return None,
    })
}

/// Built-in numeric types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericKind {
    SByte,
    Byte,
    Int16,
    UInt16,
    Char,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
}

impl NumericKind {
    pub fn from_full_name(name: &str) -> Option<NumericKind> {
        Some(match name {
            "System.SByte" => NumericKind::SByte,
            "System.Byte" => NumericKind::Byte,
            "System.Int16" => NumericKind::Int16,
            "System.UInt16" => NumericKind::UInt16,
            "System.Char" => NumericKind::Char,
            "System.Int32" => NumericKind::Int32,
            "System.UInt32" => NumericKind::UInt32,
            "System.Int64" => NumericKind::Int64,
            "System.UInt64" => NumericKind::UInt64,
            "System.Single" => NumericKind::Single,
            "System.Double" => NumericKind::Double,
            "System.Decimal" => NumericKind::Decimal,
            _ => return None,
        })
    }

    pub const fn is_integral(self) -> bool {
        !matches!(
            self,
            NumericKind::Single | NumericKind::Double | NumericKind::Decimal
        )
    }

    /// Inclusive value range of an integral type.
    pub const fn range(self) -> Option<(i128, i128)> {
        Some(match self {
            NumericKind::SByte => (i8::MIN as i128, i8::MAX as i128),
            NumericKind::Byte => (0, u8::MAX as i128),
            NumericKind::Int16 => (i16::MIN as i128, i16::MAX as i128),
            NumericKind::UInt16 | NumericKind::Char => (0, u16::MAX as i128),
            NumericKind::Int32 => (i32::MIN as i128, i32::MAX as i128),
            NumericKind::UInt32 => (0, u32::MAX as i128),
            NumericKind::Int64 => (i64::MIN as i128, i64::MAX as i128),
            NumericKind::UInt64 => (0, u64::MAX as i128),
            NumericKind::Single | NumericKind::Double | NumericKind::Decimal => return None,
        })
    }

    /// An implicit conversion exists from `self` to `target`.
    pub fn widens_to(self, target: NumericKind) -> bool {
        if self == target {
            return true;
        }
        match (self.range(), target.range()) {
            // nothing converts implicitly to char
            (Some((lo, hi)), Some((tlo, thi))) => {
                target != NumericKind::Char && lo >= tlo && hi <= thi
            }
            // integral to floating point or decimal
            (Some(_), None) => true,
            (None, None) => self == NumericKind::Single && target == NumericKind::Double,
            (None, Some(_)) => false,
        }
    }

    /// A conversion from `self` to `target` can lose magnitude and is
    /// therefore explicit-only.
    pub fn is_narrowing_to(self, target: NumericKind) -> bool {
        !self.widens_to(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_follows_ranges() {
        assert!(NumericKind::Int32.widens_to(NumericKind::Int64));
        assert!(NumericKind::Int32.widens_to(NumericKind::Decimal));
        assert!(NumericKind::Byte.widens_to(NumericKind::Int16));
        assert!(NumericKind::Char.widens_to(NumericKind::Int32));
        assert!(!NumericKind::Char.widens_to(NumericKind::Int16));
        assert!(!NumericKind::Int64.widens_to(NumericKind::Int32));
        assert!(!NumericKind::Double.widens_to(NumericKind::Int32));
        assert!(NumericKind::Int64.is_narrowing_to(NumericKind::Byte));
    }

    #[test]
    fn aliases_map_to_system_types() {
        assert_eq!(predefined_alias("int"), Some("System.Int32"));
        assert_eq!(predefined_alias("Foo"), None);
    }
}
