use std::collections::VecDeque;

use xformstack_core::{
    attr_value::AttrValue,
    ids::*,
    time_code::TimeCode,
    xform_op::{OpKind, Precision, XFORM_OP_ORDER, XformOp},
};
use xformstack_storage::{SceneStore, StorageError};

use crate::error::EngineError;
use crate::notify::Notifier;
use crate::Engine;

/// Inverse of one recorded store write.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoEdit {
    CreatedAttribute {
        entity_id: EntityId,
        name: String,
    },
    ChangedValue {
        entity_id: EntityId,
        name: String,
        time: TimeCode,
        previous: Option<AttrValue>,
    },
}

impl UndoEdit {
    fn entity_id(&self) -> EntityId {
        match self {
            UndoEdit::CreatedAttribute { entity_id, .. }
            | UndoEdit::ChangedValue { entity_id, .. } => *entity_id,
        }
    }

    /// Apply the inverse. `false` when the store refused the write.
    fn revert<S: SceneStore>(&self, store: &mut S) -> Result<bool, StorageError> {
        match self {
            UndoEdit::CreatedAttribute { entity_id, name } => {
                store.remove_attribute(*entity_id, name)
            }
            UndoEdit::ChangedValue {
                entity_id,
                name,
                time,
                previous: Some(value),
            } => store.set_value(*entity_id, name, value, *time),
            UndoEdit::ChangedValue {
                entity_id,
                name,
                time,
                previous: None,
            } => store.clear_value(*entity_id, name, *time),
        }
    }

    fn attr_name(&self) -> &str {
        match self {
            UndoEdit::CreatedAttribute { name, .. } | UndoEdit::ChangedValue { name, .. } => name,
        }
    }
}

/// Revert `edits` newest first, popping each one once it has been reverted.
/// On failure the edits not yet reverted stay in place.
fn revert_all<S: SceneStore>(
    edits: &mut Vec<UndoEdit>,
    store: &mut S,
    notifier: &Notifier,
) -> Result<(), EngineError> {
    while let Some(edit) = edits.last() {
        if !edit.revert(store)? {
            return Err(EngineError::StructuralFailure(format!(
                "store refused to revert {} on {}",
                edit.attr_name(),
                edit.entity_id()
            )));
        }
        notifier.mark_changed(edit.entity_id());
        edits.pop();
    }
    Ok(())
}

/// Ordered edits recorded by committed [`UndoBlock`]s.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UndoableItem {
    edits: Vec<UndoEdit>,
}

impl UndoableItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn edits(&self) -> &[UndoEdit] {
        &self.edits
    }

    pub fn append(&mut self, mut other: UndoableItem) {
        self.edits.append(&mut other.edits);
    }

    /// Revert every edit, newest first. The item is empty afterwards unless
    /// the store refuses a write, in which case the edits still to revert
    /// are kept and `StructuralFailure` is returned.
    pub fn undo<S: SceneStore>(
        &mut self,
        store: &mut S,
        notifier: &Notifier,
    ) -> Result<(), EngineError> {
        revert_all(&mut self.edits, store, notifier)
    }
}

/// Transaction guard around a store. Writes made through the block are
/// recorded; dropping the block without [`UndoBlock::commit`] reverts them.
pub struct UndoBlock<'a, S: SceneStore> {
    store: &'a mut S,
    notifier: Notifier,
    edits: Vec<UndoEdit>,
    committed: bool,
}

impl<'a, S: SceneStore> UndoBlock<'a, S> {
    pub fn new(store: &'a mut S, notifier: &Notifier) -> Self {
        Self {
            store,
            notifier: notifier.clone(),
            edits: Vec::new(),
            committed: false,
        }
    }

    pub fn store(&self) -> &S {
        &*self.store
    }

    pub fn edits(&self) -> &[UndoEdit] {
        &self.edits
    }

    fn record_attribute_write(
        &self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<UndoEdit, StorageError> {
        Ok(match self.store.get_attribute(entity_id, name)? {
            Some(_) => UndoEdit::ChangedValue {
                entity_id,
                name: name.to_string(),
                time,
                previous: self.store.get_authored_value(entity_id, name, time)?,
            },
            None => UndoEdit::CreatedAttribute {
                entity_id,
                name: name.to_string(),
            },
        })
    }

    pub fn add_xform_op(
        &mut self,
        entity_id: EntityId,
        kind: OpKind,
        precision: Precision,
        suffix: Option<&str>,
        is_inverse: bool,
    ) -> Result<Option<XformOp>, StorageError> {
        let order_edit = self.record_attribute_write(entity_id, XFORM_OP_ORDER, TimeCode::Default)?;
        let probe = XformOp::new(kind, precision, suffix, is_inverse);
        let attr_existed = self
            .store
            .get_attribute(entity_id, probe.attr_name())?
            .is_some();

        let Some(op) = self
            .store
            .add_xform_op(entity_id, kind, precision, suffix, is_inverse)?
        else {
            return Ok(None);
        };
        if !attr_existed {
            self.edits.push(UndoEdit::CreatedAttribute {
                entity_id,
                name: op.attr_name().to_string(),
            });
        }
        self.edits.push(order_edit);
        self.notifier.mark_changed(entity_id);
        Ok(Some(op))
    }

    pub fn set_ordered_ops(
        &mut self,
        entity_id: EntityId,
        ops: &[XformOp],
        resets_xform_stack: bool,
    ) -> Result<bool, StorageError> {
        let edit = self.record_attribute_write(entity_id, XFORM_OP_ORDER, TimeCode::Default)?;
        if !self
            .store
            .set_ordered_ops(entity_id, ops, resets_xform_stack)?
        {
            return Ok(false);
        }
        self.edits.push(edit);
        self.notifier.mark_changed(entity_id);
        Ok(true)
    }

    pub fn set_value(
        &mut self,
        entity_id: EntityId,
        name: &str,
        value: &AttrValue,
        time: TimeCode,
    ) -> Result<bool, StorageError> {
        let previous = self.store.get_authored_value(entity_id, name, time)?;
        if !self.store.set_value(entity_id, name, value, time)? {
            return Ok(false);
        }
        self.edits.push(UndoEdit::ChangedValue {
            entity_id,
            name: name.to_string(),
            time,
            previous,
        });
        self.notifier.mark_changed(entity_id);
        Ok(true)
    }

    /// Keep the recorded writes and hand their inverses to `into`.
    pub fn commit(mut self, into: &mut UndoableItem) {
        self.committed = true;
        into.edits.append(&mut self.edits);
    }
}

impl<S: SceneStore> Drop for UndoBlock<'_, S> {
    fn drop(&mut self) {
        if self.committed || self.edits.is_empty() {
            return;
        }
        tracing::warn!("rolling back {} uncommitted edit(s)", self.edits.len());
        if let Err(e) = revert_all(&mut self.edits, self.store, &self.notifier) {
            tracing::error!("rollback failed: {e}");
        }
    }
}

/// A host-level unit of work that can be undone and redone.
pub trait UndoableCommand<S: SceneStore> {
    fn execute(&mut self, engine: &mut Engine<S>) -> Result<(), EngineError>;
    fn undo(&mut self, engine: &mut Engine<S>) -> Result<(), EngineError>;
    fn redo(&mut self, engine: &mut Engine<S>) -> Result<(), EngineError>;
}

pub struct UndoManager<S: SceneStore> {
    undo_stack: VecDeque<Box<dyn UndoableCommand<S>>>,
    redo_stack: VecDeque<Box<dyn UndoableCommand<S>>>,
    max_depth: usize,
}

impl<S: SceneStore> UndoManager<S> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
        }
    }

    pub fn push_undo(&mut self, command: Box<dyn UndoableCommand<S>>) {
        self.undo_stack.push_back(command);
        // Enforce depth limit by dropping oldest entry
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    pub fn pop_undo(&mut self) -> Option<Box<dyn UndoableCommand<S>>> {
        self.undo_stack.pop_back()
    }

    pub fn push_redo(&mut self, command: Box<dyn UndoableCommand<S>>) {
        self.redo_stack.push_back(command);
    }

    pub fn pop_redo(&mut self) -> Option<Box<dyn UndoableCommand<S>>> {
        self.redo_stack.pop_back()
    }

    pub fn clear_redo(&mut self) {
        self.redo_stack.clear();
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xformstack_storage::SqliteSceneStore;

    fn store_with_entity() -> (SqliteSceneStore, EntityId) {
        let mut store = SqliteSceneStore::open_in_memory().unwrap();
        let id = store.create_entity("/a").unwrap();
        (store, id)
    }

    #[test]
    fn dropped_block_rolls_back_created_ops() {
        let (mut store, id) = store_with_entity();
        let notifier = Notifier::new();
        {
            let mut block = UndoBlock::new(&mut store, &notifier);
            block
                .add_xform_op(id, OpKind::Translate, Precision::Float, Some("pivot"), false)
                .unwrap()
                .unwrap();
            block
                .add_xform_op(id, OpKind::Translate, Precision::Float, Some("pivot"), true)
                .unwrap()
                .unwrap();
            assert_eq!(block.edits().len(), 3);
        }
        assert!(store.get_ordered_ops(id).unwrap().0.is_empty());
        assert!(store.get_attribute(id, "xformOp:translate:pivot").unwrap().is_none());
        assert!(store.get_attribute(id, XFORM_OP_ORDER).unwrap().is_none());
    }

    #[test]
    fn committed_item_undoes_in_reverse() {
        let (mut store, id) = store_with_entity();
        let notifier = Notifier::new();
        store
            .add_xform_op(id, OpKind::Scale, Precision::Float, None, false)
            .unwrap();
        store
            .set_value(id, "xformOp:scale", &AttrValue::Vec3f([2.0; 3]), TimeCode::Default)
            .unwrap();

        let mut item = UndoableItem::new();
        let mut block = UndoBlock::new(&mut store, &notifier);
        block
            .add_xform_op(id, OpKind::Translate, Precision::Double, None, false)
            .unwrap()
            .unwrap();
        block
            .set_value(id, "xformOp:scale", &AttrValue::Vec3f([3.0; 3]), TimeCode::Default)
            .unwrap();
        block.commit(&mut item);
        assert_eq!(store.get_ordered_ops(id).unwrap().0.len(), 2);

        item.undo(&mut store, &notifier).unwrap();
        assert!(item.is_empty());
        let (ops, _) = store.get_ordered_ops(id).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind(), OpKind::Scale);
        assert_eq!(
            store
                .get_value(id, "xformOp:scale", TimeCode::Default)
                .unwrap(),
            Some(AttrValue::Vec3f([2.0; 3]))
        );
        assert!(store.get_attribute(id, "xformOp:translate").unwrap().is_none());
    }

    #[test]
    fn refused_writes_are_not_recorded() {
        let (mut store, id) = store_with_entity();
        let notifier = Notifier::new();
        store.set_read_only(true).unwrap();
        let mut block = UndoBlock::new(&mut store, &notifier);
        assert!(block
            .add_xform_op(id, OpKind::Scale, Precision::Float, None, false)
            .unwrap()
            .is_none());
        assert!(block.edits().is_empty());
    }

    #[test]
    fn refused_revert_keeps_pending_edits() {
        let (mut store, id) = store_with_entity();
        let notifier = Notifier::new();
        let mut item = UndoableItem::new();
        let mut block = UndoBlock::new(&mut store, &notifier);
        block
            .add_xform_op(id, OpKind::Scale, Precision::Float, None, false)
            .unwrap()
            .unwrap();
        block.commit(&mut item);
        let recorded = item.edits().len();

        store.set_read_only(true).unwrap();
        assert!(matches!(
            item.undo(&mut store, &notifier),
            Err(EngineError::StructuralFailure(_))
        ));
        assert_eq!(item.edits().len(), recorded);

        store.set_read_only(false).unwrap();
        item.undo(&mut store, &notifier).unwrap();
        assert!(item.is_empty());
        assert!(store.get_ordered_ops(id).unwrap().0.is_empty());
        assert!(store.get_attribute(id, "xformOp:scale").unwrap().is_none());
    }
}
