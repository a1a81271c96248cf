use xformstack_core::{
    attr_value::AttrValue,
    ids::*,
    math::{Matrix4d, Vector3d},
    rotation,
    time_code::TimeCode,
    xform_op::XformOp,
};
use xformstack_storage::SceneStore;

use crate::error::EngineError;
use crate::mutator::{self, OpRecipe};
use crate::undo::{UndoBlock, UndoableCommand, UndoableItem};
use crate::Engine;

/// How an external XYZ value becomes the op's stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueConverter {
    Vector,
    /// Converted with the codec of the op actually authored.
    Rotation,
}

impl ValueConverter {
    fn to_storage(&self, op: &XformOp, value: Vector3d) -> Result<AttrValue, EngineError> {
        match self {
            ValueConverter::Vector => Ok(AttrValue::vec3(value, op.precision())),
            ValueConverter::Rotation => {
                let codec = rotation::codec_for_kind(op.kind())?;
                Ok((codec.to_storage)(value, op.precision()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Constructed, no value yet.
    Unbound,
    /// Value set, nothing written.
    Pending,
    Committed,
    Undone,
    Redone,
}

/// Undoable edit of one stack op. The op is created on first commit if the
/// entity does not have it yet; undo removes whatever that commit created.
#[derive(Debug)]
pub struct SetXformOpCommand {
    entity_id: EntityId,
    recipe: OpRecipe,
    converter: ValueConverter,
    state: CommandState,
    new_value: Option<Vector3d>,
    committed_value: Option<Vector3d>,
    op: Option<XformOp>,
    /// Inverses of every write since the last undo, oldest first.
    history: UndoableItem,
}

impl SetXformOpCommand {
    pub fn new(entity_id: EntityId, recipe: OpRecipe, converter: ValueConverter) -> Self {
        Self {
            entity_id,
            recipe,
            converter,
            state: CommandState::Unbound,
            new_value: None,
            committed_value: None,
            op: None,
            history: UndoableItem::new(),
        }
    }

    pub(crate) fn with_value(mut self, value: Vector3d) -> Self {
        self.new_value = Some(value);
        self.state = CommandState::Pending;
        self
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn recipe(&self) -> &OpRecipe {
        &self.recipe
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn new_value(&self) -> Option<Vector3d> {
        self.new_value
    }

    /// The backing op, once a commit has resolved it.
    pub fn op(&self) -> Option<&XformOp> {
        self.op.as_ref()
    }

    /// Update the value. Before the first commit this only stores it; after a
    /// commit the value is written through at once.
    pub fn set<S: SceneStore>(
        &mut self,
        engine: &mut Engine<S>,
        value: Vector3d,
    ) -> Result<(), EngineError> {
        if !value.is_finite() {
            return Err(EngineError::ValueRejected(format!(
                "non-finite value {value:?}"
            )));
        }
        match self.state {
            CommandState::Unbound | CommandState::Pending => {
                self.new_value = Some(value);
                self.state = CommandState::Pending;
            }
            CommandState::Committed | CommandState::Redone => {
                self.new_value = Some(value);
                self.apply(engine, value)?;
                self.committed_value = Some(value);
            }
            CommandState::Undone => {
                tracing::debug!("ignoring set on undone command for {}", self.entity_id);
            }
        }
        Ok(())
    }

    /// Like [`set`](Self::set) for a host-supplied value. An empty value is
    /// ignored.
    pub fn set_value<S: SceneStore>(
        &mut self,
        engine: &mut Engine<S>,
        value: &AttrValue,
    ) -> Result<(), EngineError> {
        if value.is_empty() {
            tracing::debug!("ignoring empty value for {}", self.entity_id);
            return Ok(());
        }
        let v = value
            .as_vec3()
            .ok_or_else(|| EngineError::ValueRejected(format!("expected a 3-vector, got {value:?}")))?;
        self.set(engine, v)
    }

    /// Ensure the op and write `value` in one undo block. Everything the
    /// block records lands in `history`; a failure rolls the block back.
    fn apply<S: SceneStore>(
        &mut self,
        engine: &mut Engine<S>,
        value: Vector3d,
    ) -> Result<(), EngineError> {
        let entity_id = self.entity_id;
        let notifier = engine.notifier().clone();
        let _guard = notifier.guard();
        let store = engine.store_mut();

        let cached = match &self.op {
            Some(op) if store.get_ordered_ops(entity_id)?.0.contains(op) => Some(op.clone()),
            _ => None,
        };
        let mut block = UndoBlock::new(&mut *store, &notifier);
        let op = match cached {
            Some(op) => op,
            None => mutator::ensure_operation(&mut block, entity_id, &self.recipe)?,
        };
        let stored = self.converter.to_storage(&op, value)?;
        if !block.set_value(entity_id, op.attr_name(), &stored, TimeCode::Default)? {
            return Err(EngineError::StructuralFailure(format!(
                "could not write {} on {entity_id}",
                op.attr_name()
            )));
        }
        block.commit(&mut self.history);
        self.op = Some(op);
        Ok(())
    }

    fn transition(&mut self, next: CommandState) {
        tracing::debug!(
            "{:?} command on {}: {:?} -> {:?}",
            self.recipe.ndx,
            self.entity_id,
            self.state,
            next
        );
        self.state = next;
    }
}

impl<S: SceneStore> UndoableCommand<S> for SetXformOpCommand {
    fn execute(&mut self, engine: &mut Engine<S>) -> Result<(), EngineError> {
        match self.state {
            CommandState::Unbound => {
                tracing::debug!("execute without a value on {}", self.entity_id);
                Ok(())
            }
            CommandState::Undone => UndoableCommand::<S>::redo(self, engine),
            CommandState::Pending | CommandState::Committed | CommandState::Redone => {
                let Some(value) = self.new_value else {
                    return Ok(());
                };
                self.apply(engine, value)?;
                self.committed_value = Some(value);
                if self.state == CommandState::Pending {
                    self.transition(CommandState::Committed);
                }
                Ok(())
            }
        }
    }

    fn undo(&mut self, engine: &mut Engine<S>) -> Result<(), EngineError> {
        if !matches!(self.state, CommandState::Committed | CommandState::Redone) {
            tracing::debug!("undo ignored in {:?} on {}", self.state, self.entity_id);
            return Ok(());
        }
        let notifier = engine.notifier().clone();
        let _guard = notifier.guard();
        // A refused revert leaves the command committed with the edits not
        // yet reverted, so the undo can be retried.
        self.history.undo(engine.store_mut(), &notifier)?;
        self.transition(CommandState::Undone);
        Ok(())
    }

    fn redo(&mut self, engine: &mut Engine<S>) -> Result<(), EngineError> {
        if self.state != CommandState::Undone {
            tracing::debug!("redo ignored in {:?} on {}", self.state, self.entity_id);
            return Ok(());
        }
        let Some(value) = self.committed_value else {
            return Ok(());
        };
        self.apply(engine, value)?;
        self.new_value = Some(value);
        self.transition(CommandState::Redone);
        Ok(())
    }
}

/// Matrix edit driven as translate, rotate and scale child edits.
#[derive(Debug)]
pub struct SetMatrixCommand {
    entity_id: EntityId,
    translate: SetXformOpCommand,
    rotate: SetXformOpCommand,
    scale: SetXformOpCommand,
}

impl SetMatrixCommand {
    pub fn new(
        entity_id: EntityId,
        translate: SetXformOpCommand,
        rotate: SetXformOpCommand,
        scale: SetXformOpCommand,
    ) -> Self {
        Self {
            entity_id,
            translate,
            rotate,
            scale,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn state(&self) -> CommandState {
        self.translate.state()
    }

    pub fn set<S: SceneStore>(
        &mut self,
        engine: &mut Engine<S>,
        matrix: &Matrix4d,
    ) -> Result<(), EngineError> {
        let (t, r, s) = matrix.decompose_trs();
        self.translate.set(engine, t)?;
        self.rotate.set(engine, r)?;
        self.scale.set(engine, s)
    }

    fn children(&mut self) -> [&mut SetXformOpCommand; 3] {
        [&mut self.translate, &mut self.rotate, &mut self.scale]
    }
}

impl<S: SceneStore> UndoableCommand<S> for SetMatrixCommand {
    fn execute(&mut self, engine: &mut Engine<S>) -> Result<(), EngineError> {
        let notifier = engine.notifier().clone();
        let _guard = notifier.guard();
        let mut children = self.children();
        for i in 0..children.len() {
            if let Err(e) = UndoableCommand::<S>::execute(&mut *children[i], engine) {
                for done in children[..i].iter_mut().rev() {
                    UndoableCommand::<S>::undo(&mut **done, engine)?;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn undo(&mut self, engine: &mut Engine<S>) -> Result<(), EngineError> {
        let notifier = engine.notifier().clone();
        let _guard = notifier.guard();
        for child in self.children().into_iter().rev() {
            UndoableCommand::<S>::undo(child, engine)?;
        }
        Ok(())
    }

    fn redo(&mut self, engine: &mut Engine<S>) -> Result<(), EngineError> {
        let notifier = engine.notifier().clone();
        let _guard = notifier.guard();
        for child in self.children() {
            UndoableCommand::<S>::redo(child, engine)?;
        }
        Ok(())
    }
}
