use xformstack_core::ids::*;
use xformstack_engine::{
    EditTransform3dHint, EngineError, Resolution, Transform3dHandle, Transform3dHandler,
};
use xformstack_storage::SceneStore;

/// Fallback that claims every entity it is asked about, except for pivot
/// edits, which it cannot express.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatchAllHandler;

impl CatchAllHandler {
    pub const NAME: &'static str = "catchAll";
}

impl<S: SceneStore> Transform3dHandler<S> for CatchAllHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn transform3d(&self, _store: &S, entity_id: EntityId) -> Result<Resolution, EngineError> {
        Ok(Resolution::Found(Transform3dHandle::Other {
            handler: Self::NAME,
            entity_id,
        }))
    }

    fn edit_transform3d(
        &self,
        store: &S,
        entity_id: EntityId,
        hint: EditTransform3dHint,
    ) -> Result<Resolution, EngineError> {
        match hint {
            EditTransform3dHint::Default => self.transform3d(store, entity_id),
            EditTransform3dHint::RotatePivot | EditTransform3dHint::ScalePivot => {
                tracing::debug!("{} cannot edit pivots of {entity_id}", Self::NAME);
                Ok(Resolution::Delegate)
            }
        }
    }
}
