//! Named module templates

use crate::{Error, ModuleGraph, ModuleRuntime, Result};
use indexmap::IndexMap;
use std::rc::Rc;
use tickflow_core::{EntityId, InstanceId, ValueMap};

/// Module graphs indexed by id, in load order
#[derive(Debug, Default)]
pub struct ModuleLibrary {
    graphs: IndexMap<String, Rc<ModuleGraph>>,
}

impl ModuleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a graph; returns the graph it replaced, if any
    pub fn insert(&mut self, graph: ModuleGraph) -> Option<Rc<ModuleGraph>> {
        self.graphs.insert(graph.id.clone(), Rc::new(graph))
    }

    pub fn get(&self, id: &str) -> Option<Rc<ModuleGraph>> {
        self.graphs.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.graphs.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Start a module by id on an entity
    pub fn start(
        &self,
        runtime: &ModuleRuntime,
        entity_id: &EntityId,
        module_id: &str,
        overrides: &ValueMap,
    ) -> Result<InstanceId> {
        let graph = self
            .get(module_id)
            .ok_or_else(|| Error::UnknownModule(module_id.to_string()))?;
        runtime.start_module(entity_id, graph, overrides)
    }
}

impl FromIterator<ModuleGraph> for ModuleLibrary {
    fn from_iter<I: IntoIterator<Item = ModuleGraph>>(iter: I) -> Self {
        let mut library = Self::new();
        for graph in iter {
            library.insert(graph);
        }
        library
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BasicHooks, NodeKind};
    use tickflow_core::{ActionRegistry, EntityStore, EventBus, Globals};

    #[test]
    fn test_start_by_id() {
        let globals = Globals::new(EntityStore::shared(), Rc::new(EventBus::new()));
        let runtime = ModuleRuntime::new(
            &globals,
            Rc::new(ActionRegistry::new()),
            Rc::new(BasicHooks::new(globals.clone())),
        );
        let library: ModuleLibrary =
            [ModuleGraph::new("idle", "entry").node("entry", NodeKind::Entry)]
                .into_iter()
                .collect();

        assert_eq!(library.ids().collect::<Vec<_>>(), vec!["idle"]);
        assert!(library.start(&runtime, &"hero".into(), "idle", &ValueMap::new()).is_ok());
        assert!(matches!(
            library.start(&runtime, &"hero".into(), "patrol", &ValueMap::new()),
            Err(Error::UnknownModule(id)) if id == "patrol"
        ));
        assert_eq!(runtime.instance_count(), 1);
    }
}
