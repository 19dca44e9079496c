//! RON scene loader
//!
//! A scene file lists any of `rules`, `modules` and `entities`:
//!
//! ```ron
//! (
//!     rules: [(event: "PowerUp", actions: [(kind: "Heal", params: {"amount": Int(10)})])],
//!     modules: [(id: "idle", entry_node_id: "entry", nodes: [(id: "entry", kind: Entry)])],
//!     entities: [(id: "hero", x: 10.0, role: Some("player"))],
//! )
//! ```

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tickflow_core::{Entity, EntityId, Rule};
use tickflow_flow::{ModuleGraph, ModuleLibrary};
use tickflow_logic::LogicSystem;

/// Loaded scene definitions
#[derive(Debug, Default)]
pub struct SceneDefs {
    /// Scene-scoped rules, in file order
    pub rules: Vec<Rule>,
    /// Module graphs by id
    pub modules: IndexMap<String, ModuleGraph>,
    /// Entities by id
    pub entities: IndexMap<EntityId, Entity>,
}

impl SceneDefs {
    /// Create empty scene definitions
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_module(&self, id: &str) -> Option<&ModuleGraph> {
        self.modules.get(id)
    }

    pub fn get_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Module graphs as a library for starting modules by id
    pub fn module_library(&self) -> ModuleLibrary {
        self.modules.values().cloned().collect()
    }

    /// Hand everything to a running system
    ///
    /// Replaces its scene rules and module library, and inserts the
    /// entities into its store (replacing entities with the same id).
    pub fn install(self, system: &LogicSystem) {
        let library = self.module_library();
        tracing::info!(
            rules = self.rules.len(),
            modules = library.len(),
            entities = self.entities.len(),
            "installing scene"
        );

        system.load_rules(self.rules);
        system.set_library(library);
        let mut store = system.globals().entities.borrow_mut();
        for entity in self.entities.into_values() {
            store.insert(entity);
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SceneFile {
    rules: Vec<Rule>,
    modules: Vec<ModuleGraph>,
    entities: Vec<Entity>,
}

/// Loader for RON scene files
pub struct Loader {
    defs: SceneDefs,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            defs: SceneDefs::new(),
        }
    }

    /// Load scene definitions from a RON string
    ///
    /// Rules accumulate; a module or entity id seen before is an error.
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let file: SceneFile = ron::from_str(content)?;

        for graph in &file.modules {
            if self.defs.modules.contains_key(&graph.id) {
                return Err(Error::DuplicateDefinition(format!("module {}", graph.id)));
            }
        }
        for entity in &file.entities {
            if self.defs.entities.contains_key(&entity.id) {
                return Err(Error::DuplicateDefinition(format!("entity {}", entity.id)));
            }
        }

        let mut modules = IndexMap::new();
        for graph in file.modules {
            if modules.contains_key(&graph.id) {
                return Err(Error::DuplicateDefinition(format!("module {}", graph.id)));
            }
            modules.insert(graph.id.clone(), graph);
        }
        let mut entities = IndexMap::new();
        for entity in file.entities {
            if entities.contains_key(&entity.id) {
                return Err(Error::DuplicateDefinition(format!("entity {}", entity.id)));
            }
            entities.insert(entity.id.clone(), entity);
        }

        tracing::debug!(
            rules = file.rules.len(),
            modules = modules.len(),
            entities = entities.len(),
            "scene definitions parsed"
        );
        self.defs.rules.extend(file.rules);
        self.defs.modules.extend(modules);
        self.defs.entities.extend(entities);
        Ok(())
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        self.load_str(&content)?;
        tracing::debug!(path = %path.display(), "scene file loaded");
        Ok(())
    }

    /// Load all RON files under a directory, in file name order
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for file_path in entries {
            if file_path.is_dir() {
                self.load_directory(&file_path)?;
            } else if file_path.extension().is_some_and(|e| e == "ron") {
                self.load_file(&file_path)?;
            }
        }

        Ok(())
    }

    /// Finish loading and return the scene definitions
    pub fn finish(self) -> SceneDefs {
        self.defs
    }

    /// Get the current definitions (for inspection during loading)
    pub fn defs(&self) -> &SceneDefs {
        &self.defs
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tickflow_core::{
        params, ActionRegistry, ConditionRegistry, EntityStore, EventBus, Globals, Value,
    };
    use tickflow_logic::LogicConfig;

    const ARENA: &str = r#"
    (
        rules: [
            (
                event: "PowerUp",
                conditions: [(kind: "HpBelow", params: {"value": Int(50)})],
                actions: [(kind: "Heal", params: {"amount": Int(25)})],
            ),
        ],
        modules: [
            (
                id: "guard",
                entry_node_id: "entry",
                nodes: [
                    (id: "entry", kind: Entry),
                    (id: "wait", kind: Flow((block_type: "Wait", params: {"seconds": Float(0.5)}))),
                ],
                edges: [Flow(from_node_id: "entry", from_port: "out", to_node_id: "wait")],
            ),
        ],
        entities: [
            (
                id: "hero",
                x: 10.0,
                role: Some("player"),
                variables: [(name: "hp", value: Int(40), kind: Int)],
                components: [
                    (id: "tick", rule: (event: "OnUpdate", actions: [(kind: "Rotate")])),
                ],
            ),
            (id: "slime", role: Some("enemy"), active: false),
        ],
    )
    "#;

    #[test]
    fn test_load_scene() {
        let mut loader = Loader::new();
        loader.load_str(ARENA).unwrap();
        let defs = loader.finish();

        assert_eq!(defs.rules.len(), 1);
        assert_eq!(defs.rules[0].actions[0].kind, "Heal");
        assert!(defs.get_module("guard").is_some());

        let hero = defs.get_entity(&EntityId::from("hero")).unwrap();
        assert_eq!(hero.hp(), Some(40.0));
        assert_eq!(hero.components[0].trigger(), "OnUpdate");
        assert!(hero.components[0].enabled);
        assert!(!defs.get_entity(&EntityId::from("slime")).unwrap().active);
        assert_eq!(defs.module_library().len(), 1);
    }

    #[test]
    fn test_sections_are_optional() {
        let mut loader = Loader::new();
        loader.load_str("(rules: [(event: \"OnStart\")])").unwrap();
        loader.load_str("()").unwrap();
        assert_eq!(loader.defs().rules.len(), 1);
        assert!(loader.defs().modules.is_empty());
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let mut loader = Loader::new();
        loader.load_str(ARENA).unwrap();
        let again = r#"(modules: [(id: "guard", entry_node_id: "entry")])"#;
        assert!(matches!(loader.load_str(again), Err(Error::DuplicateDefinition(_))));

        let twice = r#"(modules: [
            (id: "a", entry_node_id: "entry"),
            (id: "a", entry_node_id: "entry"),
        ])"#;
        let mut fresh = Loader::new();
        assert!(matches!(fresh.load_str(twice), Err(Error::DuplicateDefinition(_))));
        assert!(fresh.defs().modules.is_empty());
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut loader = Loader::new();
        let text = r#"(entities: [(id: "hero"), (id: "hero")])"#;
        assert!(matches!(loader.load_str(text), Err(Error::DuplicateDefinition(_))));
    }

    #[test]
    fn test_parse_error() {
        let mut loader = Loader::new();
        assert!(matches!(loader.load_str("(rules: [(event: 3)])"), Err(Error::Ron(_))));
        assert!(matches!(
            loader.load_directory("/nonexistent/tickflow/scenes"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_install_into_system() {
        let mut loader = Loader::new();
        loader.load_str(ARENA).unwrap();

        let globals = Globals::new(EntityStore::shared(), Rc::new(EventBus::new()));
        let system = LogicSystem::new(
            globals,
            Rc::new(ActionRegistry::new()),
            Rc::new(ConditionRegistry::new()),
            LogicConfig::default(),
        );
        loader.finish().install(&system);

        assert_eq!(system.rules().rule_count(), 1);
        assert_eq!(system.globals().entities.borrow().len(), 2);

        let hero = EntityId::from("hero");
        let instance = system.start_module(&hero, "guard", &params! {}).unwrap();
        system.on_update(0.1);
        assert_eq!(system.modules().instances_for(&hero), vec![instance]);
        assert_eq!(
            system.globals().entities.borrow().get(&hero).unwrap().get_var("hp"),
            Some(&Value::Int(40))
        );
    }
}
