use std::fmt;

use crate::attr_value::ValueType;
use crate::error::CoreError;

pub const XFORM_OP_PREFIX: &str = "xformOp:";
pub const INVERT_PREFIX: &str = "!invert!";
pub const RESET_XFORM_STACK: &str = "!resetXformStack!";
pub const XFORM_OP_ORDER: &str = "xformOpOrder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    Float,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Translate,
    Scale,
    RotateX,
    RotateY,
    RotateZ,
    RotateXYZ,
    RotateXZY,
    RotateYXZ,
    RotateYZX,
    RotateZXY,
    RotateZYX,
    Orient,
    Transform,
}

impl OpKind {
    pub const ALL: [OpKind; 13] = [
        OpKind::Translate,
        OpKind::Scale,
        OpKind::RotateX,
        OpKind::RotateY,
        OpKind::RotateZ,
        OpKind::RotateXYZ,
        OpKind::RotateXZY,
        OpKind::RotateYXZ,
        OpKind::RotateYZX,
        OpKind::RotateZXY,
        OpKind::RotateZYX,
        OpKind::Orient,
        OpKind::Transform,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::Scale => "scale",
            Self::RotateX => "rotateX",
            Self::RotateY => "rotateY",
            Self::RotateZ => "rotateZ",
            Self::RotateXYZ => "rotateXYZ",
            Self::RotateXZY => "rotateXZY",
            Self::RotateYXZ => "rotateYXZ",
            Self::RotateYZX => "rotateYZX",
            Self::RotateZXY => "rotateZXY",
            Self::RotateZYX => "rotateZYX",
            Self::Orient => "orient",
            Self::Transform => "transform",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.token() == token)
    }

    pub fn is_rotation(&self) -> bool {
        !matches!(self, Self::Translate | Self::Scale | Self::Transform)
    }

    /// Storage type of the op attribute at the given precision.
    pub fn value_type(&self, precision: Precision) -> ValueType {
        match (self, precision) {
            (Self::RotateX | Self::RotateY | Self::RotateZ, Precision::Float) => ValueType::Float,
            (Self::RotateX | Self::RotateY | Self::RotateZ, Precision::Double) => ValueType::Double,
            (Self::Orient, _) => ValueType::Quatf,
            (Self::Transform, _) => ValueType::Matrix4d,
            (_, Precision::Float) => ValueType::Float3,
            (_, Precision::Double) => ValueType::Double3,
        }
    }
}

/// Attribute name of an op: `xformOp:<kind>[:<suffix>]`.
pub fn op_attr_name(kind: OpKind, suffix: Option<&str>) -> String {
    match suffix {
        Some(s) if !s.is_empty() => format!("{XFORM_OP_PREFIX}{}:{s}", kind.token()),
        _ => format!("{XFORM_OP_PREFIX}{}", kind.token()),
    }
}

/// One authored transform operation: the attribute it reads plus whether it
/// is applied inverted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XformOp {
    attr_name: String,
    kind: OpKind,
    precision: Precision,
    is_inverse: bool,
}

impl XformOp {
    pub fn new(kind: OpKind, precision: Precision, suffix: Option<&str>, is_inverse: bool) -> Self {
        Self {
            attr_name: op_attr_name(kind, suffix),
            kind,
            precision,
            is_inverse,
        }
    }

    /// Parse an order token such as `!invert!xformOp:translate:pivot`.
    /// Precision is not part of the token and must be supplied from the
    /// attribute's declared type.
    pub fn parse_token(token: &str, precision: Precision) -> Result<Self, CoreError> {
        let (is_inverse, attr_name) = match token.strip_prefix(INVERT_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let kind = Self::kind_of_attr(attr_name)?;
        Ok(Self {
            attr_name: attr_name.to_string(),
            kind,
            precision,
            is_inverse,
        })
    }

    /// Op kind encoded in an attribute name.
    pub fn kind_of_attr(attr_name: &str) -> Result<OpKind, CoreError> {
        let body = attr_name
            .strip_prefix(XFORM_OP_PREFIX)
            .ok_or_else(|| CoreError::UnknownOp(attr_name.to_string()))?;
        let kind_token = body.split(':').next().unwrap_or_default();
        OpKind::from_token(kind_token).ok_or_else(|| CoreError::UnknownOp(attr_name.to_string()))
    }

    /// Name of the backing attribute (never carries the invert prefix).
    pub fn attr_name(&self) -> &str {
        &self.attr_name
    }

    /// Name as it appears in the op order, including the invert prefix.
    pub fn op_name(&self) -> String {
        if self.is_inverse {
            format!("{INVERT_PREFIX}{}", self.attr_name)
        } else {
            self.attr_name.clone()
        }
    }

    pub fn suffix(&self) -> Option<&str> {
        let body = self.attr_name.strip_prefix(XFORM_OP_PREFIX)?;
        body.split_once(':').map(|(_, s)| s)
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn is_inverse(&self) -> bool {
        self.is_inverse
    }

    pub fn value_type(&self) -> ValueType {
        self.kind.value_type(self.precision)
    }
}

impl fmt::Display for XformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.op_name())
    }
}
