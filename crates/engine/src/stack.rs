use xformstack_core::{
    ids::*,
    math::{Matrix4d, Vector3d},
    op_index::OpNdx,
    rotation,
    time_code::TimeCode,
    xform_op::{Precision, XFORM_OP_ORDER, XformOp},
};
use xformstack_storage::SceneStore;

use crate::command::{SetMatrixCommand, SetXformOpCommand, ValueConverter};
use crate::error::EngineError;
use crate::mutator::{self, OpRecipe};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XformStack {
    entity_id: EntityId,
    time: TimeCode,
}

impl XformStack {
    pub fn new(entity_id: EntityId) -> Self {
        Self::with_time(entity_id, TimeCode::Default)
    }

    pub fn with_time(entity_id: EntityId, time: TimeCode) -> Self {
        Self { entity_id, time }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn time(&self) -> TimeCode {
        self.time
    }

    pub fn ops<S: SceneStore>(&self, store: &S) -> Result<Vec<XformOp>, EngineError> {
        Ok(store.get_ordered_ops(self.entity_id)?.0)
    }

    pub fn find_op<S: SceneStore>(
        &self,
        store: &S,
        ndx: OpNdx,
    ) -> Result<Option<XformOp>, EngineError> {
        mutator::find_op(store, self.entity_id, ndx)
    }

    pub fn has_op<S: SceneStore>(&self, store: &S, ndx: OpNdx) -> Result<bool, EngineError> {
        Ok(self.find_op(store, ndx)?.is_some())
    }

    // Readers

    pub fn translation<S: SceneStore>(&self, store: &S) -> Result<Vector3d, EngineError> {
        self.read_vector(store, OpNdx::Translate, Vector3d::ZERO)
    }

    /// XYZ rotation in degrees, converted from whichever encoding is
    /// authored.
    pub fn rotation<S: SceneStore>(&self, store: &S) -> Result<Vector3d, EngineError> {
        let Some(op) = self.find_op(store, OpNdx::Rotate)? else {
            return Ok(Vector3d::ZERO);
        };
        let Some(value) = store.get_value(self.entity_id, op.attr_name(), self.time)? else {
            return Ok(Vector3d::ZERO);
        };
        let codec = rotation::codec_for_kind(op.kind())?;
        Ok((codec.from_storage)(&value)?)
    }

    pub fn scale<S: SceneStore>(&self, store: &S) -> Result<Vector3d, EngineError> {
        self.read_vector(store, OpNdx::Scale, Vector3d::ONE)
    }

    pub fn pivot<S: SceneStore>(&self, store: &S) -> Result<Vector3d, EngineError> {
        self.read_vector(store, OpNdx::Pivot, Vector3d::ZERO)
    }

    pub fn rotate_pivot<S: SceneStore>(&self, store: &S) -> Result<Vector3d, EngineError> {
        self.read_vector(store, OpNdx::RotatePivot, Vector3d::ZERO)
    }

    pub fn scale_pivot<S: SceneStore>(&self, store: &S) -> Result<Vector3d, EngineError> {
        self.read_vector(store, OpNdx::ScalePivot, Vector3d::ZERO)
    }

    pub fn rotate_pivot_translation<S: SceneStore>(
        &self,
        store: &S,
    ) -> Result<Vector3d, EngineError> {
        self.read_vector(store, OpNdx::RotatePivotTranslate, Vector3d::ZERO)
    }

    pub fn scale_pivot_translation<S: SceneStore>(
        &self,
        store: &S,
    ) -> Result<Vector3d, EngineError> {
        self.read_vector(store, OpNdx::ScalePivotTranslate, Vector3d::ZERO)
    }

    fn read_vector<S: SceneStore>(
        &self,
        store: &S,
        ndx: OpNdx,
        default: Vector3d,
    ) -> Result<Vector3d, EngineError> {
        let Some(op) = self.find_op(store, ndx)? else {
            return Ok(default);
        };
        match store.get_value(self.entity_id, op.attr_name(), self.time)? {
            None => Ok(default),
            Some(value) => value.as_vec3().ok_or_else(|| {
                EngineError::ValueRejected(format!(
                    "{} holds {value:?}, expected a 3-vector",
                    op.attr_name()
                ))
            }),
        }
    }

    // Command factories. `Ok(None)` means the edit is not allowed; the
    // reason has already been reported.

    pub fn translate_cmd<S: SceneStore>(
        &self,
        store: &S,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        self.vector_cmd(store, OpNdx::Translate, Precision::Double, value)
    }

    /// Rotation edit in XYZ degrees. An existing rotate op keeps its
    /// encoding and precision; otherwise a float `rotateXYZ` is created.
    pub fn rotate_cmd<S: SceneStore>(
        &self,
        store: &S,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        self.rotation_cmd(store, OpNdx::Rotate, value)
    }

    pub fn scale_cmd<S: SceneStore>(
        &self,
        store: &S,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        self.vector_cmd(store, OpNdx::Scale, Precision::Float, value)
    }

    pub fn rotate_pivot_cmd<S: SceneStore>(
        &self,
        store: &S,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        self.vector_cmd(store, OpNdx::RotatePivot, Precision::Float, value)
    }

    pub fn scale_pivot_cmd<S: SceneStore>(
        &self,
        store: &S,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        self.vector_cmd(store, OpNdx::ScalePivot, Precision::Float, value)
    }

    pub fn translate_rotate_pivot_cmd<S: SceneStore>(
        &self,
        store: &S,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        self.vector_cmd(store, OpNdx::RotatePivotTranslate, Precision::Float, value)
    }

    pub fn translate_scale_pivot_cmd<S: SceneStore>(
        &self,
        store: &S,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        self.vector_cmd(store, OpNdx::ScalePivotTranslate, Precision::Float, value)
    }

    /// Edit of any position that holds a 3-vector.
    pub fn set_vector3d_cmd<S: SceneStore>(
        &self,
        store: &S,
        ndx: OpNdx,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        match ndx {
            OpNdx::Rotate | OpNdx::RotateAxis => self.rotation_cmd(store, ndx, value),
            OpNdx::Translate => self.vector_cmd(store, ndx, Precision::Double, value),
            OpNdx::Shear => Err(EngineError::ValueRejected(
                "shear is a matrix op, not a 3-vector".to_string(),
            )),
            _ if ndx.is_inverse() => Err(EngineError::ValueRejected(format!(
                "{ndx:?} mirrors its forward op and has no value of its own"
            ))),
            _ => self.vector_cmd(store, ndx, Precision::Float, value),
        }
    }

    /// Matrix edit split into translate, rotate and scale.
    pub fn set_matrix_cmd<S: SceneStore>(
        &self,
        store: &S,
        matrix: &Matrix4d,
    ) -> Result<Option<SetMatrixCommand>, EngineError> {
        let (t, r, s) = matrix.decompose_trs();
        let Some(translate) = self.translate_cmd(store, t)? else {
            return Ok(None);
        };
        let Some(rotate) = self.rotate_cmd(store, r)? else {
            return Ok(None);
        };
        let Some(scale) = self.scale_cmd(store, s)? else {
            return Ok(None);
        };
        Ok(Some(SetMatrixCommand::new(
            self.entity_id,
            translate,
            rotate,
            scale,
        )))
    }

    /// Whether the op at `ndx` (or the op order, while the op does not
    /// exist yet) may be authored. A refusal is logged.
    pub fn is_attribute_edit_allowed<S: SceneStore>(
        &self,
        store: &S,
        ndx: OpNdx,
    ) -> Result<bool, EngineError> {
        let name = match self.find_op(store, ndx)? {
            Some(op) => op.attr_name().to_string(),
            None => XFORM_OP_ORDER.to_string(),
        };
        let editability = store.is_editable(self.entity_id, &name)?;
        if !editability.allowed {
            let reason = editability
                .reason
                .unwrap_or_else(|| format!("Cannot edit [{name}]."));
            tracing::error!("{reason}");
        }
        Ok(editability.allowed)
    }

    fn vector_cmd<S: SceneStore>(
        &self,
        store: &S,
        ndx: OpNdx,
        precision: Precision,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        if !self.is_attribute_edit_allowed(store, ndx)? {
            return Ok(None);
        }
        let recipe = OpRecipe::new(ndx, ndx.default_kind(), precision);
        Ok(Some(
            SetXformOpCommand::new(self.entity_id, recipe, ValueConverter::Vector)
                .with_value(value),
        ))
    }

    fn rotation_cmd<S: SceneStore>(
        &self,
        store: &S,
        ndx: OpNdx,
        value: Vector3d,
    ) -> Result<Option<SetXformOpCommand>, EngineError> {
        let recipe = match self.find_op(store, ndx)? {
            Some(op) => {
                // Fails for orient before anything is written.
                rotation::codec_for_kind(op.kind())?;
                OpRecipe::new(ndx, op.kind(), op.precision())
            }
            None => OpRecipe::new(ndx, ndx.default_kind(), Precision::Float),
        };
        if !self.is_attribute_edit_allowed(store, ndx)? {
            return Ok(None);
        }
        Ok(Some(
            SetXformOpCommand::new(self.entity_id, recipe, ValueConverter::Rotation)
                .with_value(value),
        ))
    }
}
