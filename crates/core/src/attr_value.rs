use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::math::{Matrix4d, Vector3d};
use crate::xform_op::Precision;

/// Declared type of a stored attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Double,
    Float3,
    Double3,
    Quatf,
    Matrix4d,
    TokenArray,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Double => "double",
            Self::Float3 => "float3",
            Self::Double3 => "double3",
            Self::Quatf => "quatf",
            Self::Matrix4d => "matrix4d",
            Self::TokenArray => "token[]",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "float3" => Ok(Self::Float3),
            "double3" => Ok(Self::Double3),
            "quatf" => Ok(Self::Quatf),
            "matrix4d" => Ok(Self::Matrix4d),
            "token[]" => Ok(Self::TokenArray),
            _ => Err(CoreError::InvalidData(format!("unknown value type: {s}"))),
        }
    }

    pub fn precision(&self) -> Precision {
        match self {
            Self::Double | Self::Double3 | Self::Matrix4d => Precision::Double,
            _ => Precision::Float,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttrValue {
    /// Sentinel for "no value"; never written to the store.
    Empty,
    Float(f32),
    Double(f64),
    Vec3f([f32; 3]),
    Vec3d([f64; 3]),
    /// Real part first.
    Quatf([f32; 4]),
    Matrix4d([[f64; 4]; 4]),
    TokenArray(Vec<String>),
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        fn all_eq<T: Copy, const N: usize>(a: &[T; N], b: &[T; N], eq: fn(T, T) -> bool) -> bool {
            a.iter().zip(b.iter()).all(|(x, y)| eq(*x, *y))
        }
        let f32_eq = |a: f32, b: f32| a.total_cmp(&b).is_eq();
        let f64_eq = |a: f64, b: f64| a.total_cmp(&b).is_eq();
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Float(a), Self::Float(b)) => f32_eq(*a, *b),
            (Self::Double(a), Self::Double(b)) => f64_eq(*a, *b),
            (Self::Vec3f(a), Self::Vec3f(b)) => all_eq(a, b, f32_eq),
            (Self::Vec3d(a), Self::Vec3d(b)) => all_eq(a, b, f64_eq),
            (Self::Quatf(a), Self::Quatf(b)) => all_eq(a, b, f32_eq),
            (Self::Matrix4d(a), Self::Matrix4d(b)) => a
                .iter()
                .zip(b.iter())
                .all(|(ra, rb)| all_eq(ra, rb, f64_eq)),
            (Self::TokenArray(a), Self::TokenArray(b)) => a == b,
            _ => false,
        }
    }
}

impl AttrValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, AttrValue::Empty)
    }

    /// Build a 3-vector value at the requested storage precision.
    pub fn vec3(v: Vector3d, precision: Precision) -> Self {
        match precision {
            Precision::Float => AttrValue::Vec3f([v.x as f32, v.y as f32, v.z as f32]),
            Precision::Double => AttrValue::Vec3d(v.to_array()),
        }
    }

    pub fn scalar(v: f64, precision: Precision) -> Self {
        match precision {
            Precision::Float => AttrValue::Float(v as f32),
            Precision::Double => AttrValue::Double(v),
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            AttrValue::Empty => None,
            AttrValue::Float(_) => Some(ValueType::Float),
            AttrValue::Double(_) => Some(ValueType::Double),
            AttrValue::Vec3f(_) => Some(ValueType::Float3),
            AttrValue::Vec3d(_) => Some(ValueType::Double3),
            AttrValue::Quatf(_) => Some(ValueType::Quatf),
            AttrValue::Matrix4d(_) => Some(ValueType::Matrix4d),
            AttrValue::TokenArray(_) => Some(ValueType::TokenArray),
        }
    }

    pub fn as_vec3(&self) -> Option<Vector3d> {
        match self {
            AttrValue::Vec3f(v) => Some(Vector3d::new(v[0] as f64, v[1] as f64, v[2] as f64)),
            AttrValue::Vec3d(v) => Some(Vector3d::from_array(*v)),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v as f64),
            AttrValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<Matrix4d> {
        match self {
            AttrValue::Matrix4d(m) => Some(Matrix4d(*m)),
            _ => None,
        }
    }

    pub fn as_tokens(&self) -> Option<&[String]> {
        match self {
            AttrValue::TokenArray(t) => Some(t),
            _ => None,
        }
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_respects_precision() {
        let v = Vector3d::new(1.5, 2.0, -3.0);
        assert_eq!(AttrValue::vec3(v, Precision::Float).value_type(), Some(ValueType::Float3));
        assert_eq!(AttrValue::vec3(v, Precision::Double).value_type(), Some(ValueType::Double3));
        assert_eq!(AttrValue::vec3(v, Precision::Float).as_vec3(), Some(v));
    }

    #[test]
    fn msgpack_preserves_tokens() {
        let value = AttrValue::TokenArray(vec![
            "xformOp:translate".into(),
            "!invert!xformOp:translate:pivot".into(),
        ]);
        let bytes = value.to_msgpack().unwrap();
        assert_eq!(AttrValue::from_msgpack(&bytes).unwrap(), value);
    }

    #[test]
    fn value_type_names_parse_back() {
        for ty in [
            ValueType::Float,
            ValueType::Double,
            ValueType::Float3,
            ValueType::Double3,
            ValueType::Quatf,
            ValueType::Matrix4d,
            ValueType::TokenArray,
        ] {
            assert_eq!(ValueType::parse(ty.as_str()).unwrap(), ty);
        }
        assert!(ValueType::parse("half3").is_err());
    }

    #[test]
    fn nan_values_compare_equal_to_themselves() {
        assert_eq!(AttrValue::Float(f32::NAN), AttrValue::Float(f32::NAN));
        assert_ne!(AttrValue::Float(1.0), AttrValue::Double(1.0));
    }
}
