//! Named action and condition registries
//!
//! Designers reference behavior by name; the registries resolve those names
//! to implementations at call time. The two registries deliberately handle
//! trouble differently:
//!
//! | situation        | `ActionRegistry::run` | `ConditionRegistry::check` |
//! |------------------|-----------------------|----------------------------|
//! | unknown name     | warn, no-op           | warn, `true`               |
//! | handler `Err`    | error, skipped        | error, `false`             |

use crate::{ActionContext, Result, ValueMap};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A named effect
pub trait Action {
    /// Registry key
    fn name(&self) -> &str;

    /// Perform the effect
    fn run(&self, ctx: &ActionContext, params: &ValueMap) -> Result<()>;
}

/// A named boolean test
pub trait Condition {
    /// Registry key
    fn name(&self) -> &str;

    /// Evaluate the test
    fn check(&self, ctx: &ActionContext, params: &ValueMap) -> Result<bool>;
}

/// Action backed by a closure
pub struct FnAction<F> {
    name: String,
    f: F,
}

impl<F> FnAction<F>
where
    F: Fn(&ActionContext, &ValueMap) -> Result<()>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Action for FnAction<F>
where
    F: Fn(&ActionContext, &ValueMap) -> Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &ActionContext, params: &ValueMap) -> Result<()> {
        (self.f)(ctx, params)
    }
}

/// Condition backed by a closure
pub struct FnCondition<F> {
    name: String,
    f: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&ActionContext, &ValueMap) -> Result<bool>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Condition for FnCondition<F>
where
    F: Fn(&ActionContext, &ValueMap) -> Result<bool>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, ctx: &ActionContext, params: &ValueMap) -> Result<bool> {
        (self.f)(ctx, params)
    }
}

/// Name → action table
#[derive(Default)]
pub struct ActionRegistry {
    actions: RefCell<IndexMap<String, Rc<dyn Action>>>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action; an existing one with the same name is replaced
    pub fn register<A: Action + 'static>(&self, action: A) {
        let name = action.name().to_string();
        let previous = self.actions.borrow_mut().insert(name.clone(), Rc::new(action));
        if previous.is_some() {
            tracing::warn!(action = %name, "action is being overwritten");
        }
    }

    /// Register a closure as an action
    pub fn register_fn<F>(&self, name: &str, f: F)
    where
        F: Fn(&ActionContext, &ValueMap) -> Result<()> + 'static,
    {
        self.register(FnAction::new(name, f));
    }

    /// Run an action by name
    ///
    /// Unknown names and failing actions are logged and otherwise ignored.
    pub fn run(&self, name: &str, ctx: &ActionContext, params: &ValueMap) {
        // Release the table borrow before running: actions may register others.
        let action = self.actions.borrow().get(name).cloned();
        let Some(action) = action else {
            tracing::warn!(action = %name, "action not found");
            return;
        };

        if let Err(err) = action.run(ctx, params) {
            tracing::error!(action = %name, entity = %ctx.entity_id, error = %err, "action failed");
        }
    }

    /// Check whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.actions.borrow().contains_key(name)
    }

    /// Registered action names, in registration order
    pub fn available(&self) -> Vec<String> {
        self.actions.borrow().keys().cloned().collect()
    }
}

/// Name → condition table
#[derive(Default)]
pub struct ConditionRegistry {
    conditions: RefCell<IndexMap<String, Rc<dyn Condition>>>,
}

impl ConditionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a condition; an existing one with the same name is replaced
    pub fn register<C: Condition + 'static>(&self, condition: C) {
        let name = condition.name().to_string();
        let previous = self
            .conditions
            .borrow_mut()
            .insert(name.clone(), Rc::new(condition));
        if previous.is_some() {
            tracing::warn!(condition = %name, "condition is being overwritten");
        }
    }

    /// Register a closure as a condition
    pub fn register_fn<F>(&self, name: &str, f: F)
    where
        F: Fn(&ActionContext, &ValueMap) -> Result<bool> + 'static,
    {
        self.register(FnCondition::new(name, f));
    }

    /// Evaluate a condition by name
    ///
    /// Unknown names pass (`true`); failing conditions block (`false`).
    pub fn check(&self, name: &str, ctx: &ActionContext, params: &ValueMap) -> bool {
        let condition = self.conditions.borrow().get(name).cloned();
        let Some(condition) = condition else {
            tracing::warn!(condition = %name, "condition not found, defaulting to true");
            return true;
        };

        match condition.check(ctx, params) {
            Ok(passed) => passed,
            Err(err) => {
                tracing::error!(condition = %name, entity = %ctx.entity_id, error = %err, "condition failed");
                false
            }
        }
    }

    /// Check whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.conditions.borrow().contains_key(name)
    }

    /// Registered condition names, in registration order
    pub fn available(&self) -> Vec<String> {
        self.conditions.borrow().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, EntityStore, EventBus, Globals};
    use std::cell::Cell;

    fn ctx() -> ActionContext {
        let globals = Globals::new(EntityStore::shared(), Rc::new(EventBus::new()));
        ActionContext::new("hero", globals)
    }

    #[test]
    fn test_unknown_condition_defaults_true() {
        let conditions = ConditionRegistry::new();
        assert!(conditions.check("NoSuchCondition", &ctx(), &ValueMap::new()));
    }

    #[test]
    fn test_failing_condition_defaults_false() {
        let conditions = ConditionRegistry::new();
        conditions.register_fn("Broken", |_, _| Err(Error::ConditionFailed("bad".into())));
        assert!(!conditions.check("Broken", &ctx(), &ValueMap::new()));
    }

    #[test]
    fn test_unknown_and_failing_actions_are_ignored() {
        let actions = ActionRegistry::new();
        actions.register_fn("Broken", |_, _| Err(Error::ActionFailed("bad".into())));
        actions.run("Broken", &ctx(), &ValueMap::new());
        actions.run("Missing", &ctx(), &ValueMap::new());
    }

    #[test]
    fn test_register_overwrites() {
        let actions = ActionRegistry::new();
        let hits = Rc::new(Cell::new(0));

        actions.register_fn("Jump", |_, _| Ok(()));
        let h = Rc::clone(&hits);
        actions.register_fn("Jump", move |_, _| {
            h.set(h.get() + 10);
            Ok(())
        });

        actions.run("Jump", &ctx(), &ValueMap::new());
        assert_eq!(hits.get(), 10);
        assert_eq!(actions.available(), vec!["Jump".to_string()]);
    }
}
