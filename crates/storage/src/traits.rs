use xformstack_core::{
    attr_value::{AttrValue, ValueType},
    ids::*,
    time_code::TimeCode,
    xform_op::{OpKind, Precision, XformOp},
};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    pub entity_id: EntityId,
    pub name: String,
    pub value_type: ValueType,
    pub locked: bool,
}

/// Answer of the editability predicate. `reason` is a user-facing message
/// when the edit is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editability {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl Editability {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Scene-graph attribute storage consumed by the transform stack.
///
/// Writes refused by the authoring context (read-only layer, duplicate op)
/// report `false`/`None`; `Err` is reserved for store malfunctions.
pub trait SceneStore {
    fn create_entity(&mut self, path: &str) -> Result<EntityId, StorageError>;

    fn entity_path(&self, entity_id: EntityId) -> Result<Option<String>, StorageError>;

    fn get_attribute(
        &self,
        entity_id: EntityId,
        name: &str,
    ) -> Result<Option<AttributeRecord>, StorageError>;

    fn create_attribute(
        &mut self,
        entity_id: EntityId,
        name: &str,
        value_type: ValueType,
    ) -> Result<bool, StorageError>;

    /// Removes the attribute with its default value and time samples.
    fn remove_attribute(&mut self, entity_id: EntityId, name: &str) -> Result<bool, StorageError>;

    /// Resolved value: held time samples when any exist, else the default.
    fn get_value(
        &self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<Option<AttrValue>, StorageError>;

    /// The opinion authored exactly at `time`, without fallback.
    fn get_authored_value(
        &self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<Option<AttrValue>, StorageError>;

    fn set_value(
        &mut self,
        entity_id: EntityId,
        name: &str,
        value: &AttrValue,
        time: TimeCode,
    ) -> Result<bool, StorageError>;

    fn clear_value(
        &mut self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<bool, StorageError>;

    /// The authored op order and the reset-xform-stack flag.
    fn get_ordered_ops(&self, entity_id: EntityId) -> Result<(Vec<XformOp>, bool), StorageError>;

    fn set_ordered_ops(
        &mut self,
        entity_id: EntityId,
        ops: &[XformOp],
        resets_xform_stack: bool,
    ) -> Result<bool, StorageError>;

    /// Create the op attribute if needed and append the op to the order.
    fn add_xform_op(
        &mut self,
        entity_id: EntityId,
        kind: OpKind,
        precision: Precision,
        suffix: Option<&str>,
        is_inverse: bool,
    ) -> Result<Option<XformOp>, StorageError>;

    fn is_editable(&self, entity_id: EntityId, name: &str) -> Result<Editability, StorageError>;

    fn set_attribute_locked(
        &mut self,
        entity_id: EntityId,
        name: &str,
        locked: bool,
    ) -> Result<(), StorageError>;

    fn is_instance_proxy(&self, entity_id: EntityId) -> Result<bool, StorageError>;

    fn set_instance_proxy(&mut self, entity_id: EntityId, proxy: bool) -> Result<(), StorageError>;

    /// Whether the current edit target accepts writes at all.
    fn edit_target_editability(&self) -> Result<Editability, StorageError>;

    fn set_read_only(&mut self, read_only: bool) -> Result<(), StorageError>;
}
