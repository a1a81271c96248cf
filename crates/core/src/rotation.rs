use crate::attr_value::AttrValue;
use crate::error::CoreError;
use crate::math::Vector3d;
use crate::xform_op::{OpKind, Precision};

type Mat3 = [[f64; 3]; 3];

const GIMBAL_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationEncoding {
    X,
    Y,
    Z,
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
    Orient,
}

impl RotationEncoding {
    pub fn of_kind(kind: OpKind) -> Option<Self> {
        match kind {
            OpKind::RotateX => Some(Self::X),
            OpKind::RotateY => Some(Self::Y),
            OpKind::RotateZ => Some(Self::Z),
            OpKind::RotateXYZ => Some(Self::XYZ),
            OpKind::RotateXZY => Some(Self::XZY),
            OpKind::RotateYXZ => Some(Self::YXZ),
            OpKind::RotateYZX => Some(Self::YZX),
            OpKind::RotateZXY => Some(Self::ZXY),
            OpKind::RotateZYX => Some(Self::ZYX),
            OpKind::Orient => Some(Self::Orient),
            OpKind::Translate | OpKind::Scale | OpKind::Transform => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::X => "rotateX",
            Self::Y => "rotateY",
            Self::Z => "rotateZ",
            Self::XYZ => "rotateXYZ",
            Self::XZY => "rotateXZY",
            Self::YXZ => "rotateYXZ",
            Self::YZX => "rotateYZX",
            Self::ZXY => "rotateZXY",
            Self::ZYX => "rotateZYX",
            Self::Orient => "orient",
        }
    }
}

pub type ToStorageFn = fn(Vector3d, Precision) -> AttrValue;
pub type FromStorageFn = fn(&AttrValue) -> Result<Vector3d, CoreError>;

/// Conversion pair for one encoding.
#[derive(Debug, Clone, Copy)]
pub struct RotationCodec {
    pub encoding: RotationEncoding,
    pub to_storage: ToStorageFn,
    pub from_storage: FromStorageFn,
}

static CODECS: [RotationCodec; 9] = [
    RotationCodec {
        encoding: RotationEncoding::X,
        to_storage: to_single::<0>,
        from_storage: from_single::<0>,
    },
    RotationCodec {
        encoding: RotationEncoding::Y,
        to_storage: to_single::<1>,
        from_storage: from_single::<1>,
    },
    RotationCodec {
        encoding: RotationEncoding::Z,
        to_storage: to_single::<2>,
        from_storage: from_single::<2>,
    },
    RotationCodec {
        encoding: RotationEncoding::XYZ,
        to_storage: to_xyz,
        from_storage: from_xyz,
    },
    RotationCodec {
        encoding: RotationEncoding::XZY,
        to_storage: to_order::<0, 2, 1>,
        from_storage: from_order::<0, 2, 1>,
    },
    RotationCodec {
        encoding: RotationEncoding::YXZ,
        to_storage: to_order::<1, 0, 2>,
        from_storage: from_order::<1, 0, 2>,
    },
    RotationCodec {
        encoding: RotationEncoding::YZX,
        to_storage: to_order::<1, 2, 0>,
        from_storage: from_order::<1, 2, 0>,
    },
    RotationCodec {
        encoding: RotationEncoding::ZXY,
        to_storage: to_order::<2, 0, 1>,
        from_storage: from_order::<2, 0, 1>,
    },
    RotationCodec {
        encoding: RotationEncoding::ZYX,
        to_storage: to_order::<2, 1, 0>,
        from_storage: from_order::<2, 1, 0>,
    },
];

/// Look up the codec for an encoding. Orient has none.
pub fn codec(encoding: RotationEncoding) -> Result<&'static RotationCodec, CoreError> {
    CODECS
        .iter()
        .find(|c| c.encoding == encoding)
        .ok_or_else(|| CoreError::UnsupportedEncoding(encoding.name().to_string()))
}

/// Codec for the op kind of an authored rotate op.
pub fn codec_for_kind(kind: OpKind) -> Result<&'static RotationCodec, CoreError> {
    let encoding = RotationEncoding::of_kind(kind)
        .ok_or_else(|| CoreError::InvalidData(format!("{} is not a rotation", kind.token())))?;
    codec(encoding)
}

fn to_single<const AXIS: usize>(v: Vector3d, precision: Precision) -> AttrValue {
    AttrValue::scalar(v.to_array()[AXIS], precision)
}

fn from_single<const AXIS: usize>(value: &AttrValue) -> Result<Vector3d, CoreError> {
    let angle = value
        .as_scalar()
        .ok_or_else(|| CoreError::InvalidData(format!("expected scalar rotation, got {value:?}")))?;
    let mut out = [0.0; 3];
    out[AXIS] = angle;
    Ok(Vector3d::from_array(out))
}

fn to_xyz(v: Vector3d, precision: Precision) -> AttrValue {
    AttrValue::vec3(v, precision)
}

fn from_xyz(value: &AttrValue) -> Result<Vector3d, CoreError> {
    stored_vec3(value)
}

fn to_order<const I: usize, const J: usize, const K: usize>(
    v: Vector3d,
    precision: Precision,
) -> AttrValue {
    let m = matrix_from_xyz(v);
    AttrValue::vec3(decompose(&m, [I, J, K]), precision)
}

fn from_order<const I: usize, const J: usize, const K: usize>(
    value: &AttrValue,
) -> Result<Vector3d, CoreError> {
    let angles = stored_vec3(value)?;
    Ok(xyz_from_matrix(&compose(angles, [I, J, K])))
}

fn stored_vec3(value: &AttrValue) -> Result<Vector3d, CoreError> {
    value
        .as_vec3()
        .ok_or_else(|| CoreError::InvalidData(format!("expected 3-axis rotation, got {value:?}")))
}

fn axis_matrix(axis: usize, degrees: f64) -> Mat3 {
    let (s, c) = degrees.to_radians().sin_cos();
    match axis {
        0 => [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]],
        1 => [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
        _ => [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]],
    }
}

fn mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[r][k] * b[k][c]).sum();
        }
    }
    out
}

/// Column-vector rotation applying the per-axis angles of `angles` in
/// `order` (first entry applied first).
fn compose(angles: Vector3d, order: [usize; 3]) -> Mat3 {
    let a = angles.to_array();
    let [first, second, third] = order.map(|axis| axis_matrix(axis, a[axis]));
    mul(&third, &mul(&second, &first))
}

pub(crate) fn matrix_from_xyz(v: Vector3d) -> Mat3 {
    compose(v, [0, 1, 2])
}

pub(crate) fn xyz_from_matrix(m: &Mat3) -> Vector3d {
    decompose(m, [0, 1, 2])
}

/// Per-axis Euler angles (degrees) for a fixed-axis rotation order.
fn decompose(m: &Mat3, order: [usize; 3]) -> Vector3d {
    let [i, j, k] = order;
    let odd = j != (i + 1) % 3;

    let cy = (m[i][i] * m[i][i] + m[j][i] * m[j][i]).sqrt();
    let (mut ai, mut aj, mut ak) = if cy > GIMBAL_EPS {
        (
            m[k][j].atan2(m[k][k]),
            (-m[k][i]).atan2(cy),
            m[j][i].atan2(m[i][i]),
        )
    } else {
        ((-m[j][k]).atan2(m[j][j]), (-m[k][i]).atan2(cy), 0.0)
    };
    if odd {
        ai = -ai;
        aj = -aj;
        ak = -ak;
    }

    let mut out = [0.0; 3];
    out[i] = ai.to_degrees();
    out[j] = aj.to_degrees();
    out[k] = ak.to_degrees();
    Vector3d::from_array(out)
}
