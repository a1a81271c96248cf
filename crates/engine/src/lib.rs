pub mod command;
pub mod error;
pub mod handler;
pub mod mutator;
pub mod notify;
pub mod stack;
pub mod undo;

pub use command::{CommandState, SetMatrixCommand, SetXformOpCommand, ValueConverter};
pub use error::EngineError;
pub use handler::{
    EditTransform3dHint, HandlerChain, Resolution, Transform3dHandle, Transform3dHandler,
    XformStackHandler, create_transform3d,
};
pub use mutator::OpRecipe;
pub use notify::{ChangeEvent, NotifGuard, Notifier};
pub use stack::XformStack;
pub use undo::{UndoBlock, UndoEdit, UndoManager, UndoableCommand, UndoableItem};

use xformstack_core::{ids::*, time_code::TimeCode};
use xformstack_storage::SceneStore;

pub const DEFAULT_UNDO_DEPTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub undo_depth: usize,
    /// Time code used by stacks handed out by [`Engine::stack`].
    pub read_time: TimeCode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_depth: DEFAULT_UNDO_DEPTH,
            read_time: TimeCode::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoResult {
    Applied,
    Empty,
}

pub struct Engine<S: SceneStore> {
    store: S,
    notifier: Notifier,
    undo_manager: UndoManager<S>,
    config: EngineConfig,
}

impl<S: SceneStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            notifier: Notifier::new(),
            undo_manager: UndoManager::new(config.undo_depth),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn undo_manager(&self) -> &UndoManager<S> {
        &self.undo_manager
    }

    /// Stack accessor for an entity at the configured read time.
    pub fn stack(&self, entity_id: EntityId) -> Result<XformStack, EngineError> {
        if self.store.entity_path(entity_id)?.is_none() {
            return Err(EngineError::EntityNotFound(entity_id.to_string()));
        }
        Ok(XformStack::with_time(entity_id, self.config.read_time))
    }

    /// Run a command and record it for undo. A failed command is not
    /// recorded.
    pub fn execute(&mut self, mut command: Box<dyn UndoableCommand<S>>) -> Result<(), EngineError> {
        command.execute(self)?;
        self.undo_manager.push_undo(command);
        self.undo_manager.clear_redo();
        Ok(())
    }

    /// Undo the latest command. A command that fails to undo stays on top of
    /// the undo stack.
    pub fn undo(&mut self) -> Result<UndoResult, EngineError> {
        let Some(mut command) = self.undo_manager.pop_undo() else {
            return Ok(UndoResult::Empty);
        };
        if let Err(e) = command.undo(self) {
            self.undo_manager.push_undo(command);
            return Err(e);
        }
        self.undo_manager.push_redo(command);
        Ok(UndoResult::Applied)
    }

    pub fn redo(&mut self) -> Result<UndoResult, EngineError> {
        let Some(mut command) = self.undo_manager.pop_redo() else {
            return Ok(UndoResult::Empty);
        };
        if let Err(e) = command.redo(self) {
            self.undo_manager.push_redo(command);
            return Err(e);
        }
        self.undo_manager.push_undo(command);
        Ok(UndoResult::Applied)
    }
}
