//! Named arguments of an audited call
//!
//! Arguments are either entities, which can be re-read from storage, or plain
//! JSON values. The audited operation gets mutable access to them, so an id
//! assigned during the call is visible to the post-call capture.

use std::any::Any;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::RepoResult;
use crate::models::Entity;
use crate::repository::to_record;

/// Type-erased argument
pub(crate) trait Argument: Send {
    /// Entity name, `None` for plain values
    fn entity_name(&self) -> Option<&'static str>;

    /// Persistent id of an entity argument
    fn persistent_id(&self) -> Option<String>;

    /// Current state as JSON
    fn snapshot(&self) -> RepoResult<Value>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

struct EntityArgument<T: Entity>(T);

impl<T: Entity> Argument for EntityArgument<T> {
    fn entity_name(&self) -> Option<&'static str> {
        Some(T::ENTITY_NAME)
    }

    fn persistent_id(&self) -> Option<String> {
        self.0.persistent_id().map(str::to_string)
    }

    fn snapshot(&self) -> RepoResult<Value> {
        to_record(&self.0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

struct ValueArgument(Value);

impl Argument for ValueArgument {
    fn entity_name(&self) -> Option<&'static str> {
        None
    }

    fn persistent_id(&self) -> Option<String> {
        None
    }

    fn snapshot(&self) -> RepoResult<Value> {
        Ok(self.0.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Named arguments passed to an audited operation
#[derive(Default)]
pub struct Invocation {
    args: IndexMap<String, Box<dyn Argument>>,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("args", &self.args.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity argument
    pub fn with_entity<T: Entity>(mut self, name: impl Into<String>, entity: T) -> Self {
        self.args.insert(name.into(), Box::new(EntityArgument(entity)));
        self
    }

    /// Add a plain value argument
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args
            .insert(name.into(), Box::new(ValueArgument(value.into())));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.keys().map(String::as_str)
    }

    /// Entity argument of type `T`
    pub fn entity<T: Entity>(&self, name: &str) -> Option<&T> {
        self.args
            .get(name)?
            .as_any()
            .downcast_ref::<EntityArgument<T>>()
            .map(|arg| &arg.0)
    }

    pub fn entity_mut<T: Entity>(&mut self, name: &str) -> Option<&mut T> {
        self.args
            .get_mut(name)?
            .as_any_mut()
            .downcast_mut::<EntityArgument<T>>()
            .map(|arg| &mut arg.0)
    }

    /// Remove an entity argument and hand it back
    ///
    /// Returns `None` and leaves the argument in place if it is not a `T`.
    pub fn take_entity<T: Entity>(&mut self, name: &str) -> Option<T> {
        self.entity::<T>(name)?;
        let arg = self.args.shift_remove(name)?;
        arg.into_any()
            .downcast::<EntityArgument<T>>()
            .ok()
            .map(|arg| arg.0)
    }

    /// Plain value argument
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.args
            .get(name)?
            .as_any()
            .downcast_ref::<ValueArgument>()
            .map(|arg| &arg.0)
    }

    pub(crate) fn argument(&self, name: &str) -> Option<&dyn Argument> {
        self.args.get(name).map(|arg| &**arg)
    }
}
