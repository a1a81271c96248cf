use std::cell::Cell;
use std::rc::Rc;

use xformstack_core::{
    ids::*,
    xform_op::{OpKind, Precision, XformOp},
};
use xformstack_engine::{Engine, EngineConfig, XformStack};
use xformstack_storage::{SceneStore, SqliteSceneStore, StorageError};

/// An engine over an in-memory store plus a counter of emitted change
/// events.
pub struct TestScene<S: SceneStore = SqliteSceneStore> {
    pub engine: Engine<S>,
    events: Rc<Cell<usize>>,
}

impl TestScene<SqliteSceneStore> {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::with_store(SqliteSceneStore::open_in_memory()?))
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, StorageError> {
        Ok(Self::wrap(Engine::with_config(
            SqliteSceneStore::open_in_memory()?,
            config,
        )))
    }
}

impl<S: SceneStore> TestScene<S> {
    pub fn with_store(store: S) -> Self {
        Self::wrap(Engine::new(store))
    }

    fn wrap(engine: Engine<S>) -> Self {
        let events = Rc::new(Cell::new(0));
        let counter = events.clone();
        engine
            .notifier()
            .subscribe(move |_| counter.set(counter.get() + 1));
        Self { engine, events }
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.engine.store_mut()
    }

    pub fn create_entity(&mut self, path: &str) -> Result<EntityId, StorageError> {
        self.engine.store_mut().create_entity(path)
    }

    /// Author ops directly in the given order, bypassing the mutator.
    /// The plain translate op is double precision, everything else float,
    /// matching what the command factories create.
    pub fn author_ops(
        &mut self,
        entity_id: EntityId,
        op_names: &[&str],
    ) -> Result<Vec<XformOp>, Box<dyn std::error::Error>> {
        let mut authored = Vec::with_capacity(op_names.len());
        for name in op_names {
            let parsed = XformOp::parse_token(name, Precision::Float)?;
            let precision = match (parsed.kind(), parsed.suffix()) {
                (OpKind::Translate, None) => Precision::Double,
                _ => Precision::Float,
            };
            let op = self
                .engine
                .store_mut()
                .add_xform_op(
                    entity_id,
                    parsed.kind(),
                    precision,
                    parsed.suffix(),
                    parsed.is_inverse(),
                )?
                .ok_or_else(|| format!("could not author {name}"))?;
            authored.push(op);
        }
        Ok(authored)
    }

    /// Authored op order as tokens.
    pub fn op_names(&self, entity_id: EntityId) -> Result<Vec<String>, StorageError> {
        let (ops, _) = self.engine.store().get_ordered_ops(entity_id)?;
        Ok(ops.iter().map(XformOp::op_name).collect())
    }

    pub fn stack(&self, entity_id: EntityId) -> XformStack {
        XformStack::with_time(entity_id, self.engine.config().read_time)
    }

    pub fn event_count(&self) -> usize {
        self.events.get()
    }

    pub fn reset_events(&self) {
        self.events.set(0);
    }
}
