//! Runtime entities and the shared entity store

use crate::{EntityId, LogicComponent, Value, Vec2};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Declared type of an entity variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    Int,
    Float,
    Bool,
    String,
    Vector2,
}

impl VariableKind {
    /// Infer the kind of a freshly assigned value
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Bool(_) => VariableKind::Bool,
            Value::String(s) if s == "true" || s == "false" => VariableKind::Bool,
            Value::Vec2(_) => VariableKind::Vector2,
            Value::Int(_) => VariableKind::Int,
            Value::Float(_) => VariableKind::Float,
            Value::String(s) if s.trim().parse::<f64>().is_ok() => VariableKind::Float,
            _ => VariableKind::String,
        }
    }

    /// Check if this kind holds numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self, VariableKind::Int | VariableKind::Float)
    }
}

/// A named, typed variable on an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: Value,
    pub kind: VariableKind,
}

impl Variable {
    /// Create a variable, inferring its kind from the value
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let kind = VariableKind::infer(&value);
        let value = coerce_to_kind(kind, value);
        Self {
            name: name.into(),
            value,
            kind,
        }
    }

    /// Assign a new value, coercing it to the declared kind
    ///
    /// Numeric variables upgrade to vector2 when a vector is assigned.
    pub fn assign(&mut self, value: Value) {
        if self.kind.is_numeric() && matches!(value, Value::Vec2(_)) {
            self.kind = VariableKind::Vector2;
        } else if self.kind == VariableKind::Vector2 {
            self.kind = VariableKind::infer(&value);
        }
        self.value = coerce_to_kind(self.kind, value);
    }
}

fn coerce_to_kind(kind: VariableKind, value: Value) -> Value {
    match kind {
        VariableKind::Int | VariableKind::Float => match value {
            Value::Int(_) | Value::Float(_) => value,
            other => Value::Float(other.coerce_number().unwrap_or(0.0)),
        },
        VariableKind::Bool => Value::Bool(value.coerce_bool()),
        VariableKind::String => Value::String(value.to_plain_string()),
        VariableKind::Vector2 => value,
    }
}

fn default_scale() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

/// A game entity as seen by the logic runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Rotation in radians
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    /// Gameplay role used by targeting ("player", "enemy", ...)
    #[serde(default)]
    pub role: Option<String>,
    /// Collision tag
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Logic components (rules bound to this entity)
    #[serde(default)]
    pub components: Vec<LogicComponent>,
}

impl Entity {
    /// Create a new entity at the origin
    pub fn new(id: impl Into<EntityId>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            role: None,
            tag: None,
            active: true,
            variables: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Builder: set position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Builder: set role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Builder: set collision tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Builder: add a variable
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.push(Variable::new(name, value));
        self
    }

    /// Builder: add a logic component
    pub fn with_component(mut self, component: LogicComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Current position
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Look up a variable
    pub fn var(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Get a variable's value
    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.var(name).map(|v| &v.value)
    }

    /// Check whether a variable exists
    pub fn has_var(&self, name: &str) -> bool {
        self.var(name).is_some()
    }

    /// Get a variable only if it holds a number
    pub fn number_var(&self, name: &str) -> Option<f64> {
        self.get_var(name).and_then(Value::as_float)
    }

    /// Set a variable, coercing to an existing declaration or inferring a new one
    pub fn set_var(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.variables.iter_mut().find(|v| v.name == name) {
            Some(existing) => existing.assign(value),
            None => self.variables.push(Variable::new(name, value)),
        }
    }

    /// Current hit points, if the entity tracks them
    pub fn hp(&self) -> Option<f64> {
        self.number_var("hp")
    }

    /// An entity without a numeric `hp` is alive
    pub fn is_alive(&self) -> bool {
        self.hp().is_none_or(|hp| hp > 0.0)
    }

    /// Read a transform field or, failing that, a variable
    pub fn property(&self, name: &str) -> Option<Value> {
        match name {
            "position" => Some(Value::Vec2(self.position())),
            "x" => Some(Value::Float(self.x)),
            "y" => Some(Value::Float(self.y)),
            "z" => Some(Value::Float(self.z)),
            "rotation" => Some(Value::Float(self.rotation)),
            "scaleX" | "scale_x" => Some(Value::Float(self.scale_x)),
            "scaleY" | "scale_y" => Some(Value::Float(self.scale_y)),
            "active" => Some(Value::Bool(self.active)),
            _ => self.get_var(name).cloned(),
        }
    }
}

/// Insertion-ordered storage for runtime entities
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: IndexMap<EntityId, Entity>,
}

/// Entity map shared between the host, the rule path and the interpreter
pub type SharedEntities = Rc<RefCell<EntityStore>>;

impl EntityStore {
    /// Create a new empty entity store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind a shared handle
    pub fn shared() -> SharedEntities {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Insert (or replace) an entity
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id.clone(), entity)
    }

    /// Get an entity by ID
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Get a mutable entity by ID
    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Check whether an entity exists
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Remove an entity
    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        self.entities.shift_remove(id)
    }

    /// Iterate over all entities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// All entity ids in insertion order
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().cloned().collect()
    }

    /// Get all entities with a given role
    pub fn by_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities
            .values()
            .filter(move |e| e.role.as_deref() == Some(role))
    }

    /// Nearest active entity with the given role, excluding `exclude`
    ///
    /// The result borrows only the store, so `role` may be a temporary.
    pub fn nearest_by_role(
        &self,
        from: Vec2,
        role: &str,
        exclude: Option<&EntityId>,
    ) -> Option<&Entity> {
        self.entities
            .values()
            .filter(|e| e.active && e.role.as_deref() == Some(role) && Some(&e.id) != exclude)
            .min_by(|a, b| {
                from.distance_squared(a.position())
                    .total_cmp(&from.distance_squared(b.position()))
            })
    }

    /// Get the number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
