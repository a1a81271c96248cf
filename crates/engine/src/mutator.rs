use xformstack_core::{
    ids::*,
    op_index::OpNdx,
    xform_op::{OpKind, Precision, XformOp},
};
use xformstack_storage::SceneStore;

use crate::error::EngineError;
use crate::undo::UndoBlock;

/// How the op at a canonical position is materialized when missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRecipe {
    pub ndx: OpNdx,
    pub kind: OpKind,
    pub precision: Precision,
}

impl OpRecipe {
    pub fn new(ndx: OpNdx, kind: OpKind, precision: Precision) -> Self {
        Self {
            ndx,
            kind,
            precision,
        }
    }

    pub fn suffix(&self) -> Option<&'static str> {
        self.ndx.suffix()
    }
}

/// First authored op sitting at `ndx`, if any.
pub fn find_op<S: SceneStore>(
    store: &S,
    entity_id: EntityId,
    ndx: OpNdx,
) -> Result<Option<XformOp>, EngineError> {
    let (ops, _) = store.get_ordered_ops(entity_id)?;
    Ok(ops.into_iter().find(|op| OpNdx::of_op(op) == Some(ndx)))
}

/// Return the op at the recipe's position, creating it (and the other half
/// of a pivot pair) when absent. Creation is followed by a reorder so the
/// authored list leaves this call in canonical order.
pub fn ensure_operation<S: SceneStore>(
    block: &mut UndoBlock<'_, S>,
    entity_id: EntityId,
    recipe: &OpRecipe,
) -> Result<XformOp, EngineError> {
    let (ops, _) = block.store().get_ordered_ops(entity_id)?;
    if let Some(op) = ops.iter().find(|op| OpNdx::of_op(op) == Some(recipe.ndx)) {
        return Ok(op.clone());
    }

    let op = add_op(block, entity_id, recipe, recipe.ndx.is_inverse())?;

    if let Some(companion) = recipe.ndx.companion() {
        let present = ops.iter().any(|op| OpNdx::of_op(op) == Some(companion));
        if !present {
            add_op(block, entity_id, recipe, companion.is_inverse())?;
        }
    }

    reorder_ops(block, entity_id)?;
    Ok(op)
}

fn add_op<S: SceneStore>(
    block: &mut UndoBlock<'_, S>,
    entity_id: EntityId,
    recipe: &OpRecipe,
    is_inverse: bool,
) -> Result<XformOp, EngineError> {
    let op = block
        .add_xform_op(
            entity_id,
            recipe.kind,
            recipe.precision,
            recipe.suffix(),
            is_inverse,
        )?
        .ok_or_else(|| {
            EngineError::StructuralFailure(format!(
                "could not add {:?} op ({}) to {entity_id}",
                recipe.ndx,
                recipe.kind.token()
            ))
        })?;
    tracing::debug!("created {op} on {entity_id}");
    Ok(op)
}

/// Rewrite the op order sorted by canonical position. The sort is stable
/// and the reset flag is preserved.
pub fn reorder_ops<S: SceneStore>(
    block: &mut UndoBlock<'_, S>,
    entity_id: EntityId,
) -> Result<(), EngineError> {
    let (ops, resets) = block.store().get_ordered_ops(entity_id)?;

    let mut keyed = Vec::with_capacity(ops.len());
    for op in ops {
        let ndx = OpNdx::of_op(&op).ok_or_else(|| {
            EngineError::StructuralFailure(format!("{op} has no position in the transform stack"))
        })?;
        keyed.push((ndx, op));
    }
    keyed.sort_by_key(|(ndx, _)| *ndx);
    let sorted: Vec<XformOp> = keyed.into_iter().map(|(_, op)| op).collect();

    if !block.set_ordered_ops(entity_id, &sorted, resets)? {
        return Err(EngineError::StructuralFailure(format!(
            "could not write op order on {entity_id}"
        )));
    }
    tracing::debug!("reordered {} op(s) on {entity_id}", sorted.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use crate::undo::UndoableItem;
    use xformstack_storage::SqliteSceneStore;

    fn op_names(store: &SqliteSceneStore, id: EntityId) -> Vec<String> {
        store
            .get_ordered_ops(id)
            .unwrap()
            .0
            .iter()
            .map(XformOp::op_name)
            .collect()
    }

    #[test]
    fn pivot_creation_adds_both_halves_in_order() {
        let mut store = SqliteSceneStore::open_in_memory().unwrap();
        let id = store.create_entity("/a").unwrap();
        store
            .add_xform_op(id, OpKind::Scale, Precision::Float, None, false)
            .unwrap();
        store
            .add_xform_op(id, OpKind::Translate, Precision::Double, None, false)
            .unwrap();
        let notifier = Notifier::new();

        let mut item = UndoableItem::new();
        let mut block = UndoBlock::new(&mut store, &notifier);
        let recipe = OpRecipe::new(OpNdx::RotatePivot, OpKind::Translate, Precision::Float);
        let op = ensure_operation(&mut block, id, &recipe).unwrap();
        block.commit(&mut item);

        assert_eq!(op.op_name(), "xformOp:translate:rotatePivot");
        assert_eq!(
            op_names(&store, id),
            vec![
                "xformOp:translate",
                "xformOp:translate:rotatePivot",
                "!invert!xformOp:translate:rotatePivot",
                "xformOp:scale",
            ]
        );
    }

    #[test]
    fn existing_op_is_returned_untouched() {
        let mut store = SqliteSceneStore::open_in_memory().unwrap();
        let id = store.create_entity("/a").unwrap();
        store
            .add_xform_op(id, OpKind::RotateZYX, Precision::Double, None, false)
            .unwrap();
        let notifier = Notifier::new();

        let mut block = UndoBlock::new(&mut store, &notifier);
        let recipe = OpRecipe::new(OpNdx::Rotate, OpKind::RotateXYZ, Precision::Float);
        let op = ensure_operation(&mut block, id, &recipe).unwrap();
        assert!(block.edits().is_empty());
        assert_eq!(op.kind(), OpKind::RotateZYX);
    }

    #[test]
    fn reorder_keeps_reset_flag() {
        let mut store = SqliteSceneStore::open_in_memory().unwrap();
        let id = store.create_entity("/a").unwrap();
        let scale = store
            .add_xform_op(id, OpKind::Scale, Precision::Float, None, false)
            .unwrap()
            .unwrap();
        let translate = store
            .add_xform_op(id, OpKind::Translate, Precision::Double, None, false)
            .unwrap()
            .unwrap();
        store.set_ordered_ops(id, &[scale, translate], true).unwrap();
        let notifier = Notifier::new();

        let mut item = UndoableItem::new();
        let mut block = UndoBlock::new(&mut store, &notifier);
        reorder_ops(&mut block, id).unwrap();
        block.commit(&mut item);

        let (ops, resets) = store.get_ordered_ops(id).unwrap();
        assert!(resets);
        assert_eq!(ops[0].kind(), OpKind::Translate);
        assert_eq!(ops[1].kind(), OpKind::Scale);
    }

    #[test]
    fn foreign_op_fails_reorder_and_rolls_back() {
        let mut store = SqliteSceneStore::open_in_memory().unwrap();
        let id = store.create_entity("/a").unwrap();
        store
            .add_xform_op(id, OpKind::Translate, Precision::Float, Some("custom"), false)
            .unwrap();
        let before = op_names(&store, id);
        let notifier = Notifier::new();

        {
            let mut block = UndoBlock::new(&mut store, &notifier);
            let recipe = OpRecipe::new(OpNdx::Scale, OpKind::Scale, Precision::Float);
            let err = ensure_operation(&mut block, id, &recipe).unwrap_err();
            assert!(matches!(err, EngineError::StructuralFailure(_)));
        }
        assert_eq!(op_names(&store, id), before);
        assert!(store.get_attribute(id, "xformOp:scale").unwrap().is_none());
    }
}
