//! Nominal subtyping over exception types and policy classification.

use crate::policy::{Classification, ClassificationPolicy};
use exflow_binder::{TypeHierarchy, TypeId, WellKnownType};
use exflow_common::limits::MAX_BASE_CHAIN_DEPTH;

/// Answers "is `a` a kind of `b`" and "how is `t` classified" for one session.
pub struct Oracle<'a, H: TypeHierarchy + ?Sized> {
    hierarchy: &'a H,
    policy: &'a ClassificationPolicy,
}

impl<H: TypeHierarchy + ?Sized> Clone for Oracle<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: TypeHierarchy + ?Sized> Copy for Oracle<'_, H> {}

impl<'a, H: TypeHierarchy + ?Sized> Oracle<'a, H> {
    pub const fn new(hierarchy: &'a H, policy: &'a ClassificationPolicy) -> Self {
        Oracle { hierarchy, policy }
    }

    /// Walk the base chain of `a` looking for `b`. Cyclic or overly deep
    /// chains answer `false`.
    pub fn is_subtype_or_equal(&self, a: TypeId, b: TypeId) -> bool {
        let mut current = Some(a);
        let mut depth = 0;
        while let Some(ty) = current {
            if ty == b {
                return true;
            }
            depth += 1;
            if depth > MAX_BASE_CHAIN_DEPTH {
                return false;
            }
            current = self.hierarchy.base_type(ty);
        }
        false
    }

    /// Either type is a kind of the other.
    pub fn is_related(&self, a: TypeId, b: TypeId) -> bool {
        self.is_subtype_or_equal(a, b) || self.is_subtype_or_equal(b, a)
    }

    /// `ty` is a kind of some type in `covering`.
    pub fn is_covered_by(&self, ty: TypeId, mut covering: impl Iterator<Item = TypeId>) -> bool {
        covering.any(|c| self.is_subtype_or_equal(ty, c))
    }

    pub fn classify(&self, ty: TypeId) -> Classification {
        self.policy.classify(
            self.hierarchy.full_type_name(ty),
            self.hierarchy.type_name(ty),
        )
    }

    /// `System.Exception` itself.
    pub fn is_most_general(&self, ty: TypeId) -> bool {
        self.hierarchy.well_known(WellKnownType::Exception) == Some(ty)
    }

    pub fn well_known(&self, kind: WellKnownType) -> Option<TypeId> {
        self.hierarchy.well_known(kind)
    }

    pub fn full_name(&self, ty: TypeId) -> &'a str {
        self.hierarchy.full_type_name(ty)
    }

    pub fn simple_name(&self, ty: TypeId) -> &'a str {
        self.hierarchy.type_name(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_settings;

    /// Exception, IOException : Exception, FileNotFoundException : IOException,
    /// FormatException : Exception, and a two-type cycle.
    struct FakeHierarchy;

    const EXCEPTION: TypeId = TypeId(0);
    const IO: TypeId = TypeId(1);
    const FILE_NOT_FOUND: TypeId = TypeId(2);
    const FORMAT: TypeId = TypeId(3);
    const CYCLE_A: TypeId = TypeId(4);
    const CYCLE_B: TypeId = TypeId(5);

    const NAMES: [(&str, &str); 6] = [
        ("Exception", "System.Exception"),
        ("IOException", "System.IO.IOException"),
        ("FileNotFoundException", "System.IO.FileNotFoundException"),
        ("FormatException", "System.FormatException"),
        ("A", "Cycle.A"),
        ("B", "Cycle.B"),
    ];

    impl TypeHierarchy for FakeHierarchy {
        fn base_type(&self, ty: TypeId) -> Option<TypeId> {
            match ty {
                IO | FORMAT => Some(EXCEPTION),
                FILE_NOT_FOUND => Some(IO),
                CYCLE_A => Some(CYCLE_B),
                CYCLE_B => Some(CYCLE_A),
                _ => None,
            }
        }

        fn type_name(&self, ty: TypeId) -> &str {
            NAMES[ty.0 as usize].0
        }

        fn full_type_name(&self, ty: TypeId) -> &str {
            NAMES[ty.0 as usize].1
        }

        fn well_known(&self, kind: WellKnownType) -> Option<TypeId> {
            (kind == WellKnownType::Exception).then_some(EXCEPTION)
        }

        fn resolve_type_name(&self, name: &str) -> Option<TypeId> {
            NAMES
                .iter()
                .position(|(simple, full)| *simple == name || *full == name)
                .map(|i| TypeId(i as u32))
        }
    }

    const ALL: [TypeId; 4] = [EXCEPTION, IO, FILE_NOT_FOUND, FORMAT];

    #[test]
    fn subtyping_is_reflexive() {
        let policy = ClassificationPolicy::default();
        let oracle = Oracle::new(&FakeHierarchy, &policy);
        for ty in ALL {
            assert!(oracle.is_subtype_or_equal(ty, ty));
        }
    }

    #[test]
    fn subtyping_is_transitive() {
        let policy = ClassificationPolicy::default();
        let oracle = Oracle::new(&FakeHierarchy, &policy);
        for t in ALL {
            for u in ALL {
                for v in ALL {
                    if oracle.is_subtype_or_equal(t, u) && oracle.is_subtype_or_equal(u, v) {
                        assert!(oracle.is_subtype_or_equal(t, v), "{t:?} {u:?} {v:?}");
                    }
                }
            }
        }
        assert!(oracle.is_subtype_or_equal(FILE_NOT_FOUND, EXCEPTION));
        assert!(!oracle.is_subtype_or_equal(IO, FILE_NOT_FOUND));
        assert!(!oracle.is_subtype_or_equal(FORMAT, IO));
    }

    #[test]
    fn related_in_either_direction() {
        let policy = ClassificationPolicy::default();
        let oracle = Oracle::new(&FakeHierarchy, &policy);
        assert!(oracle.is_related(IO, FILE_NOT_FOUND));
        assert!(oracle.is_related(FILE_NOT_FOUND, IO));
        assert!(!oracle.is_related(FORMAT, IO));
    }

    #[test]
    fn cyclic_bases_terminate() {
        let policy = ClassificationPolicy::default();
        let oracle = Oracle::new(&FakeHierarchy, &policy);
        assert!(!oracle.is_subtype_or_equal(CYCLE_A, EXCEPTION));
        assert!(oracle.is_subtype_or_equal(CYCLE_A, CYCLE_B));
    }

    #[test]
    fn classification_uses_full_and_simple_names() {
        let settings =
            parse_settings(r#"{ "ignoredExceptions": ["FormatException", "System.IO.*"] }"#)
                .unwrap();
        let policy = ClassificationPolicy::from_settings(&settings).unwrap();
        let oracle = Oracle::new(&FakeHierarchy, &policy);
        assert_eq!(oracle.classify(FORMAT), Classification::Ignored);
        assert_eq!(oracle.classify(FILE_NOT_FOUND), Classification::Ignored);
        assert_eq!(oracle.classify(EXCEPTION), Classification::Strict);
        assert!(oracle.is_most_general(EXCEPTION));
        assert!(!oracle.is_most_general(IO));
    }
}
