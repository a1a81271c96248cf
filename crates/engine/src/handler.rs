use xformstack_core::{CoreError, ids::*, op_index::OpNdx, time_code::TimeCode};
use xformstack_storage::{SceneStore, StorageError};

use crate::error::EngineError;
use crate::stack::XformStack;

#[derive(Debug, Clone, PartialEq)]
pub enum Transform3dHandle {
    XformStack(XformStack),
    /// Claimed by a handler outside this crate.
    Other {
        handler: &'static str,
        entity_id: EntityId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Transform3dHandle),
    Delegate,
    Rejected,
}

/// Which part of the transform an interactive edit is about to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditTransform3dHint {
    #[default]
    Default,
    RotatePivot,
    ScalePivot,
}

pub trait Transform3dHandler<S: SceneStore> {
    fn name(&self) -> &'static str;

    fn transform3d(&self, store: &S, entity_id: EntityId) -> Result<Resolution, EngineError>;

    fn edit_transform3d(
        &self,
        store: &S,
        entity_id: EntityId,
        _hint: EditTransform3dHint,
    ) -> Result<Resolution, EngineError> {
        self.transform3d(store, entity_id)
    }
}

/// Positions authored on the entity, in authored order. `None` when any op
/// is foreign to the stack, including ops whose kind is not known at all.
fn authored_positions<S: SceneStore>(
    store: &S,
    entity_id: EntityId,
) -> Result<Option<Vec<OpNdx>>, EngineError> {
    let ops = match store.get_ordered_ops(entity_id) {
        Ok((ops, _)) => ops,
        Err(StorageError::Core(CoreError::UnknownOp(name))) => {
            tracing::debug!("{name} on {entity_id} is not a stack op");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    Ok(ops.iter().map(OpNdx::of_op).collect())
}

/// Exact substack: positions strictly increasing and every pivot pair
/// complete.
fn is_substack(positions: &[OpNdx]) -> bool {
    let increasing = positions.windows(2).all(|w| w[0] < w[1]);
    let paired = positions.iter().all(|ndx| match ndx.companion() {
        Some(other) => positions.contains(&other),
        None => true,
    });
    increasing && paired
}

/// The stack selection gate. An empty stack always matches; foreign or
/// out-of-order ops fall through to `next`.
pub fn create_transform3d<S, F>(
    store: &S,
    entity_id: EntityId,
    time: TimeCode,
    next: F,
) -> Result<Resolution, EngineError>
where
    S: SceneStore,
    F: FnOnce() -> Result<Resolution, EngineError>,
{
    match authored_positions(store, entity_id)? {
        Some(positions) if positions.is_empty() || is_substack(&positions) => Ok(
            Resolution::Found(Transform3dHandle::XformStack(XformStack::with_time(entity_id, time))),
        ),
        _ => next(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XformStackHandler {
    time: TimeCode,
}

impl XformStackHandler {
    pub fn new(time: TimeCode) -> Self {
        Self { time }
    }
}

impl<S: SceneStore> Transform3dHandler<S> for XformStackHandler {
    fn name(&self) -> &'static str {
        "xformStack"
    }

    fn transform3d(&self, store: &S, entity_id: EntityId) -> Result<Resolution, EngineError> {
        create_transform3d(store, entity_id, self.time, || Ok(Resolution::Delegate))
    }
}

/// Ordered list of handlers, tried first to last.
pub struct HandlerChain<S: SceneStore> {
    handlers: Vec<Box<dyn Transform3dHandler<S>>>,
}

impl<S: SceneStore> Default for HandlerChain<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SceneStore> HandlerChain<S> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn push(&mut self, handler: Box<dyn Transform3dHandler<S>>) {
        self.handlers.push(handler);
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn resolve_for_entity(
        &self,
        store: &S,
        entity_id: EntityId,
    ) -> Result<Resolution, EngineError> {
        for handler in &self.handlers {
            match handler.transform3d(store, entity_id)? {
                Resolution::Delegate => continue,
                resolved => return Ok(resolved),
            }
        }
        Ok(Resolution::Delegate)
    }

    /// Like [`resolve_for_entity`](Self::resolve_for_entity) but first
    /// refuses entities that cannot be authored at all. A refusal ends the
    /// chain.
    pub fn resolve_for_edit_intent(
        &self,
        store: &S,
        entity_id: EntityId,
        hint: EditTransform3dHint,
    ) -> Result<Resolution, EngineError> {
        if store.is_instance_proxy(entity_id)? {
            let path = store
                .entity_path(entity_id)?
                .unwrap_or_else(|| entity_id.to_string());
            tracing::error!(
                "Authoring to the descendant of an instance [{path}] is not allowed. \
                 Please mark 'instanceable=false' to author edits to instance proxies."
            );
            return Ok(Resolution::Rejected);
        }
        let target = store.edit_target_editability()?;
        if !target.allowed {
            tracing::error!(
                "{}",
                target
                    .reason
                    .unwrap_or_else(|| "The edit target is not editable.".to_string())
            );
            return Ok(Resolution::Rejected);
        }

        for handler in &self.handlers {
            match handler.edit_transform3d(store, entity_id, hint)? {
                Resolution::Delegate => continue,
                resolved => return Ok(resolved),
            }
        }
        Ok(Resolution::Delegate)
    }
}
