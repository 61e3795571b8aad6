//! Per-construct result of exception-flow propagation.

use exflow_binder::TypeId;
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

/// Exception types that can leave a construct, in discovery order.
/// Never holds an Ignored type.
pub type EscapeSet = IndexSet<TypeId, FxBuildHasher>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowResult {
    /// Control can fall off the end of the construct.
    pub end_reachable: bool,
    pub contains_return: bool,
    /// A `break` that targets an enclosing loop or switch.
    pub contains_break: bool,
    pub contains_continue: bool,
    pub escapes: EscapeSet,
    /// Innermost catch type in effect, for nested rethrow queries.
    pub caught_type: Option<TypeId>,
}

impl FlowResult {
    pub fn reachable() -> Self {
        FlowResult {
            end_reachable: true,
            ..FlowResult::default()
        }
    }

    pub fn unreachable() -> Self {
        FlowResult::default()
    }

    pub fn with_escapes(mut self, escapes: EscapeSet) -> Self {
        self.escapes = escapes;
        self
    }

    /// Fold a following construct's jump flags and escapes into this one.
    pub fn absorb(&mut self, other: FlowResult) {
        self.contains_return |= other.contains_return;
        self.contains_break |= other.contains_break;
        self.contains_continue |= other.contains_continue;
        self.escapes.extend(other.escapes);
    }

    /// Join of two alternative paths.
    pub fn join(mut self, other: FlowResult) -> FlowResult {
        self.end_reachable |= other.end_reachable;
        self.absorb(other);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_unions_escapes_in_order() {
        let mut a = FlowResult::unreachable();
        a.escapes.insert(TypeId(3));
        let mut b = FlowResult::reachable();
        b.escapes.insert(TypeId(1));
        b.escapes.insert(TypeId(3));
        b.contains_return = true;
        let joined = a.join(b);
        assert!(joined.end_reachable);
        assert!(joined.contains_return);
        assert_eq!(joined.escapes.iter().copied().collect::<Vec<_>>(), vec![TypeId(3), TypeId(1)]);
    }
}
