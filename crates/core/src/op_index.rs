use std::collections::HashMap;
use std::sync::LazyLock;

use crate::xform_op::{OpKind, XformOp};

/// Canonical stack position. Declaration order is the required authoring
/// order: an op list is canonical when its positions strictly increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpNdx {
    Translate,
    Pivot,
    RotatePivotTranslate,
    RotatePivot,
    Rotate,
    RotateAxis,
    RotatePivotInverse,
    ScalePivotTranslate,
    ScalePivot,
    Shear,
    Scale,
    ScalePivotInverse,
    PivotInverse,
}

static OP_NAME_TO_NDX: LazyLock<HashMap<&'static str, OpNdx>> = LazyLock::new(|| {
    HashMap::from([
        ("xformOp:translate", OpNdx::Translate),
        ("xformOp:translate:pivot", OpNdx::Pivot),
        ("xformOp:translate:rotatePivotTranslate", OpNdx::RotatePivotTranslate),
        ("xformOp:translate:rotatePivot", OpNdx::RotatePivot),
        ("xformOp:rotateX", OpNdx::Rotate),
        ("xformOp:rotateY", OpNdx::Rotate),
        ("xformOp:rotateZ", OpNdx::Rotate),
        ("xformOp:rotateXYZ", OpNdx::Rotate),
        ("xformOp:rotateXZY", OpNdx::Rotate),
        ("xformOp:rotateYXZ", OpNdx::Rotate),
        ("xformOp:rotateYZX", OpNdx::Rotate),
        ("xformOp:rotateZXY", OpNdx::Rotate),
        ("xformOp:rotateZYX", OpNdx::Rotate),
        ("xformOp:orient", OpNdx::Rotate),
        ("xformOp:rotateXYZ:rotateAxis", OpNdx::RotateAxis),
        ("!invert!xformOp:translate:rotatePivot", OpNdx::RotatePivotInverse),
        ("xformOp:translate:scalePivotTranslate", OpNdx::ScalePivotTranslate),
        ("xformOp:translate:scalePivot", OpNdx::ScalePivot),
        ("xformOp:transform:shear", OpNdx::Shear),
        ("xformOp:scale", OpNdx::Scale),
        ("!invert!xformOp:translate:scalePivot", OpNdx::ScalePivotInverse),
        ("!invert!xformOp:translate:pivot", OpNdx::PivotInverse),
    ])
});

impl OpNdx {
    pub const ALL: [OpNdx; 13] = [
        OpNdx::Translate,
        OpNdx::Pivot,
        OpNdx::RotatePivotTranslate,
        OpNdx::RotatePivot,
        OpNdx::Rotate,
        OpNdx::RotateAxis,
        OpNdx::RotatePivotInverse,
        OpNdx::ScalePivotTranslate,
        OpNdx::ScalePivot,
        OpNdx::Shear,
        OpNdx::Scale,
        OpNdx::ScalePivotInverse,
        OpNdx::PivotInverse,
    ];

    /// Resolve an op name as it appears in the op order (inverse ops carry
    /// the `!invert!` prefix). `None` means the op is foreign to this stack.
    pub fn resolve(op_name: &str) -> Option<OpNdx> {
        OP_NAME_TO_NDX.get(op_name).copied()
    }

    pub fn of_op(op: &XformOp) -> Option<OpNdx> {
        Self::resolve(&op.op_name())
    }

    /// Attribute suffix used when the op at this position is created.
    /// Translate, rotate and scale use the empty TRS suffix.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Self::Translate | Self::Rotate | Self::Scale => None,
            Self::Pivot | Self::PivotInverse => Some("pivot"),
            Self::RotatePivotTranslate => Some("rotatePivotTranslate"),
            Self::RotatePivot | Self::RotatePivotInverse => Some("rotatePivot"),
            Self::RotateAxis => Some("rotateAxis"),
            Self::ScalePivotTranslate => Some("scalePivotTranslate"),
            Self::ScalePivot | Self::ScalePivotInverse => Some("scalePivot"),
            Self::Shear => Some("shear"),
        }
    }

    /// Op kind used to materialize this position.
    pub fn default_kind(&self) -> OpKind {
        match self {
            Self::Rotate | Self::RotateAxis => OpKind::RotateXYZ,
            Self::Shear => OpKind::Transform,
            Self::Scale => OpKind::Scale,
            _ => OpKind::Translate,
        }
    }

    pub fn is_inverse(&self) -> bool {
        matches!(
            self,
            Self::RotatePivotInverse | Self::ScalePivotInverse | Self::PivotInverse
        )
    }

    /// The other half of a pivot pair.
    pub fn companion(&self) -> Option<OpNdx> {
        match self {
            Self::Pivot => Some(Self::PivotInverse),
            Self::PivotInverse => Some(Self::Pivot),
            Self::RotatePivot => Some(Self::RotatePivotInverse),
            Self::RotatePivotInverse => Some(Self::RotatePivot),
            Self::ScalePivot => Some(Self::ScalePivotInverse),
            Self::ScalePivotInverse => Some(Self::ScalePivot),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xform_op::{Precision, op_attr_name};

    #[test]
    fn every_rotation_encoding_maps_to_rotate() {
        for kind in OpKind::ALL.into_iter().filter(|k| k.is_rotation()) {
            let name = op_attr_name(kind, None);
            assert_eq!(OpNdx::resolve(&name), Some(OpNdx::Rotate), "{name}");
        }
    }

    #[test]
    fn forward_and_inverse_pivots_are_distinct() {
        assert_eq!(OpNdx::resolve("xformOp:translate:pivot"), Some(OpNdx::Pivot));
        assert_eq!(
            OpNdx::resolve("!invert!xformOp:translate:pivot"),
            Some(OpNdx::PivotInverse)
        );
        let inv = XformOp::new(OpKind::Translate, Precision::Float, Some("scalePivot"), true);
        assert_eq!(OpNdx::of_op(&inv), Some(OpNdx::ScalePivotInverse));
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert_eq!(OpNdx::resolve("xformOp:translate:foo"), None);
        assert_eq!(OpNdx::resolve("!invert!xformOp:translate"), None);
        assert_eq!(OpNdx::resolve("xformOp:rotateX:rotateAxis"), None);
    }

    #[test]
    fn declaration_order_is_authoring_order() {
        let mut sorted = OpNdx::ALL;
        sorted.sort();
        assert_eq!(sorted, OpNdx::ALL);
        assert!(OpNdx::Translate < OpNdx::Rotate);
        assert!(OpNdx::Scale < OpNdx::PivotInverse);
    }

    #[test]
    fn suffix_and_kind_reconstruct_the_table() {
        for ndx in OpNdx::ALL {
            let op = XformOp::new(ndx.default_kind(), Precision::Float, ndx.suffix(), ndx.is_inverse());
            assert_eq!(OpNdx::of_op(&op), Some(ndx), "{op}");
        }
    }

    #[test]
    fn companions_are_symmetric() {
        for ndx in OpNdx::ALL {
            if let Some(other) = ndx.companion() {
                assert_eq!(other.companion(), Some(ndx));
                assert_ne!(ndx.is_inverse(), other.is_inverse());
            }
        }
    }
}
