pub mod attr_value;
pub mod error;
pub mod ids;
pub mod math;
pub mod op_index;
pub mod rotation;
pub mod time_code;
pub mod xform_op;

pub use attr_value::{AttrValue, ValueType};
pub use error::CoreError;
pub use ids::*;
pub use math::{Matrix4d, Vector3d};
pub use op_index::OpNdx;
pub use time_code::TimeCode;
pub use xform_op::{OpKind, Precision, XformOp};
