use std::cell::RefCell;
use std::rc::Rc;

use xformstack_core::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Transform3dChanged { entity: EntityId },
}

type Callback = Box<dyn FnMut(&ChangeEvent)>;

#[derive(Default)]
struct NotifierState {
    depth: usize,
    pending: Vec<EntityId>,
    subscribers: Vec<(SubscriptionId, Callback)>,
}

/// Cheap handle; clones share the same subscribers and guard depth.
#[derive(Clone, Default)]
pub struct Notifier {
    state: Rc<RefCell<NotifierState>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.state
            .borrow_mut()
            .subscribers
            .push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.subscribers.len();
        state.subscribers.retain(|(sid, _)| *sid != id);
        state.subscribers.len() != before
    }

    /// Suppress emission until the returned guard (and every enclosing one)
    /// is dropped.
    pub fn guard(&self) -> NotifGuard {
        self.state.borrow_mut().depth += 1;
        NotifGuard {
            notifier: self.clone(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.state.borrow().depth > 0
    }

    pub fn mark_changed(&self, entity: EntityId) {
        {
            let mut state = self.state.borrow_mut();
            if state.depth > 0 {
                if !state.pending.contains(&entity) {
                    state.pending.push(entity);
                }
                return;
            }
        }
        self.emit(vec![entity]);
    }

    fn emit(&self, entities: Vec<EntityId>) {
        if entities.is_empty() {
            return;
        }
        // Callbacks run with the subscriber list detached so they may use
        // the notifier themselves.
        let mut subscribers = std::mem::take(&mut self.state.borrow_mut().subscribers);
        for entity in entities {
            let event = ChangeEvent::Transform3dChanged { entity };
            for (_, callback) in subscribers.iter_mut() {
                callback(&event);
            }
        }
        let mut state = self.state.borrow_mut();
        subscribers.append(&mut state.subscribers);
        state.subscribers = subscribers;
    }
}

pub struct NotifGuard {
    notifier: Notifier,
}

impl Drop for NotifGuard {
    fn drop(&mut self) {
        let flushed = {
            let mut state = self.notifier.state.borrow_mut();
            state.depth = state.depth.saturating_sub(1);
            if state.depth == 0 {
                std::mem::take(&mut state.pending)
            } else {
                Vec::new()
            }
        };
        self.notifier.emit(flushed);
    }
}
