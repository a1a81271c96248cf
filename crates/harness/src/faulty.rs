use xformstack_core::{
    attr_value::{AttrValue, ValueType},
    ids::*,
    time_code::TimeCode,
    xform_op::{OpKind, Precision, XformOp},
};
use xformstack_storage::{AttributeRecord, Editability, SceneStore, StorageError};

/// Store wrapper that refuses selected structural writes, the way a store
/// rejects writes it cannot author.
pub struct FaultyStore<S: SceneStore> {
    inner: S,
    /// Refuse every `set_ordered_ops`.
    pub refuse_reorder: bool,
    refuse_add_at: Option<usize>,
    adds_seen: usize,
}

impl<S: SceneStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            refuse_reorder: false,
            refuse_add_at: None,
            adds_seen: 0,
        }
    }

    /// Refuse the n-th `add_xform_op` from now (0 = the next one).
    pub fn refuse_add_at(&mut self, n: usize) {
        self.refuse_add_at = Some(n);
        self.adds_seen = 0;
    }

    pub fn heal(&mut self) {
        self.refuse_reorder = false;
        self.refuse_add_at = None;
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SceneStore> SceneStore for FaultyStore<S> {
    fn create_entity(&mut self, path: &str) -> Result<EntityId, StorageError> {
        self.inner.create_entity(path)
    }

    fn entity_path(&self, entity_id: EntityId) -> Result<Option<String>, StorageError> {
        self.inner.entity_path(entity_id)
    }

    fn get_attribute(
        &self,
        entity_id: EntityId,
        name: &str,
    ) -> Result<Option<AttributeRecord>, StorageError> {
        self.inner.get_attribute(entity_id, name)
    }

    fn create_attribute(
        &mut self,
        entity_id: EntityId,
        name: &str,
        value_type: ValueType,
    ) -> Result<bool, StorageError> {
        self.inner.create_attribute(entity_id, name, value_type)
    }

    fn remove_attribute(&mut self, entity_id: EntityId, name: &str) -> Result<bool, StorageError> {
        self.inner.remove_attribute(entity_id, name)
    }

    fn get_value(
        &self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<Option<AttrValue>, StorageError> {
        self.inner.get_value(entity_id, name, time)
    }

    fn get_authored_value(
        &self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<Option<AttrValue>, StorageError> {
        self.inner.get_authored_value(entity_id, name, time)
    }

    fn set_value(
        &mut self,
        entity_id: EntityId,
        name: &str,
        value: &AttrValue,
        time: TimeCode,
    ) -> Result<bool, StorageError> {
        self.inner.set_value(entity_id, name, value, time)
    }

    fn clear_value(
        &mut self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<bool, StorageError> {
        self.inner.clear_value(entity_id, name, time)
    }

    fn get_ordered_ops(&self, entity_id: EntityId) -> Result<(Vec<XformOp>, bool), StorageError> {
        self.inner.get_ordered_ops(entity_id)
    }

    fn set_ordered_ops(
        &mut self,
        entity_id: EntityId,
        ops: &[XformOp],
        resets_xform_stack: bool,
    ) -> Result<bool, StorageError> {
        if self.refuse_reorder {
            return Ok(false);
        }
        self.inner.set_ordered_ops(entity_id, ops, resets_xform_stack)
    }

    fn add_xform_op(
        &mut self,
        entity_id: EntityId,
        kind: OpKind,
        precision: Precision,
        suffix: Option<&str>,
        is_inverse: bool,
    ) -> Result<Option<XformOp>, StorageError> {
        if let Some(n) = self.refuse_add_at {
            let seen = self.adds_seen;
            self.adds_seen += 1;
            if seen == n {
                return Ok(None);
            }
        }
        self.inner
            .add_xform_op(entity_id, kind, precision, suffix, is_inverse)
    }

    fn is_editable(&self, entity_id: EntityId, name: &str) -> Result<Editability, StorageError> {
        self.inner.is_editable(entity_id, name)
    }

    fn set_attribute_locked(
        &mut self,
        entity_id: EntityId,
        name: &str,
        locked: bool,
    ) -> Result<(), StorageError> {
        self.inner.set_attribute_locked(entity_id, name, locked)
    }

    fn is_instance_proxy(&self, entity_id: EntityId) -> Result<bool, StorageError> {
        self.inner.is_instance_proxy(entity_id)
    }

    fn set_instance_proxy(&mut self, entity_id: EntityId, proxy: bool) -> Result<(), StorageError> {
        self.inner.set_instance_proxy(entity_id, proxy)
    }

    fn edit_target_editability(&self) -> Result<Editability, StorageError> {
        self.inner.edit_target_editability()
    }

    fn set_read_only(&mut self, read_only: bool) -> Result<(), StorageError> {
        self.inner.set_read_only(read_only)
    }
}
