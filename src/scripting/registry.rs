use crate::entities::defs::DefId;
use crate::entities::ids::ObjectId;
use crate::scripting::hooks::{
    DenyArgs, Flow, HandlerError, HandlerRegistry, Hook, HookArgs, Participant,
};
use crate::world::region::RegionId;
use crate::world::state::World;
use std::collections::HashMap;
use tracing::warn;

pub type DenyHandler = Box<dyn Fn(&mut World, &mut DenyArgs) -> Result<Flow, HandlerError>>;
pub type NotifyHandler = Box<dyn Fn(&mut World, &HookArgs) -> Result<(), HandlerError>>;

/// What a handler is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Object(ObjectId),
    Def(DefId),
    Region(RegionId),
    Any,
}

/// In-process registry of closures keyed by hook and scope. For one
/// participant, handlers run from the most specific scope to the least
/// (object, template, then global), each scope in registration order.
#[derive(Default)]
pub struct TriggerRegistry {
    deny: HashMap<(Hook, Scope), Vec<DenyHandler>>,
    notify: HashMap<(Hook, Scope), Vec<NotifyHandler>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_deny<F>(&mut self, hook: Hook, scope: Scope, handler: F) -> &mut Self
    where
        F: Fn(&mut World, &mut DenyArgs) -> Result<Flow, HandlerError> + 'static,
    {
        self.deny.entry((hook, scope)).or_default().push(Box::new(handler));
        self
    }

    pub fn on_notify<F>(&mut self, hook: Hook, scope: Scope, handler: F) -> &mut Self
    where
        F: Fn(&mut World, &HookArgs) -> Result<(), HandlerError> + 'static,
    {
        self.notify.entry((hook, scope)).or_default().push(Box::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.deny.values().map(Vec::len).sum::<usize>()
            + self.notify.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scopes(world: &World, participant: Participant) -> Vec<Scope> {
        match participant {
            Participant::Object(id) => {
                let mut scopes = vec![Scope::Object(id)];
                if let Ok(object) = world.object(id) {
                    scopes.push(Scope::Def(object.def()));
                }
                scopes.push(Scope::Any);
                scopes
            }
            Participant::Region(region) => vec![Scope::Region(region), Scope::Any],
        }
    }
}

impl HandlerRegistry for TriggerRegistry {
    fn run_deny(
        &self,
        world: &mut World,
        hook: Hook,
        participant: Participant,
        args: &mut DenyArgs,
    ) -> Result<Flow, HandlerError> {
        for scope in Self::scopes(world, participant) {
            let Some(handlers) = self.deny.get(&(hook, scope)) else {
                continue;
            };
            for handler in handlers {
                match handler(world, args) {
                    Ok(Flow::Stop) => return Ok(Flow::Stop),
                    Ok(Flow::Continue) => {}
                    Err(err) => warn!(?hook, %participant, "deny handler failed: {err}"),
                }
                if args.result.is_denied() {
                    return Ok(Flow::Continue);
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn run_notify(
        &self,
        world: &mut World,
        hook: Hook,
        participant: Participant,
        args: &HookArgs,
    ) -> Result<(), HandlerError> {
        for scope in Self::scopes(world, participant) {
            let Some(handlers) = self.notify.get(&(hook, scope)) else {
                continue;
            };
            for handler in handlers {
                if let Err(err) = handler(world, args) {
                    warn!(?hook, %participant, "notify handler failed: {err}");
                }
            }
        }
        Ok(())
    }
}
