//! Arithmetic operations applied to variable values

use crate::{Value, Vec2};
use serde::{Deserialize, Serialize};

/// An operation to modify a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ModifyOp {
    /// Set to the value
    #[default]
    Set,
    /// Add the value
    Add,
    /// Subtract the value
    Sub,
    /// Multiply by the value
    Mul,
    /// Divide by the value
    Div,
    /// Set to minimum of current and value
    Min,
    /// Set to maximum of current and value
    Max,
}

impl ModifyOp {
    /// Parse an operation name as written in designer content
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Set" | "set" | "=" => Some(ModifyOp::Set),
            "Add" | "add" | "+" => Some(ModifyOp::Add),
            "Sub" | "Subtract" | "sub" | "subtract" | "-" => Some(ModifyOp::Sub),
            "Mul" | "Multiply" | "mul" | "multiply" | "*" => Some(ModifyOp::Mul),
            "Div" | "Divide" | "div" | "divide" | "/" => Some(ModifyOp::Div),
            "Min" | "min" => Some(ModifyOp::Min),
            "Max" | "max" => Some(ModifyOp::Max),
            _ => None,
        }
    }

    /// Apply this operation to a current number
    pub fn apply(&self, current: f64, operand: f64) -> f64 {
        match self {
            ModifyOp::Set => operand,
            ModifyOp::Add => current + operand,
            ModifyOp::Sub => current - operand,
            ModifyOp::Mul => current * operand,
            ModifyOp::Div => {
                if operand != 0.0 {
                    current / operand
                } else {
                    current
                }
            }
            ModifyOp::Min => current.min(operand),
            ModifyOp::Max => current.max(operand),
        }
    }

    /// Apply this operation to dynamic values
    ///
    /// Vectors combine component-wise with vectors and scale by numbers.
    /// Everything else is coerced to numbers; two integers stay integral
    /// unless dividing.
    pub fn apply_value(&self, current: &Value, operand: &Value) -> Value {
        if *self == ModifyOp::Set {
            return operand.clone();
        }

        match (current, operand) {
            (Value::Vec2(a), Value::Vec2(b)) => Value::Vec2(Vec2::new(
                self.apply(a.x, b.x),
                self.apply(a.y, b.y),
            )),
            (Value::Vec2(a), other) => {
                let k = other.coerce_number().unwrap_or(0.0);
                Value::Vec2(Vec2::new(self.apply(a.x, k), self.apply(a.y, k)))
            }
            (Value::Int(a), Value::Int(b)) if *self != ModifyOp::Div => {
                Value::Int(self.apply(*a as f64, *b as f64) as i64)
            }
            _ => {
                let a = current.coerce_number().unwrap_or(0.0);
                let b = operand.coerce_number().unwrap_or(0.0);
                Value::Float(self.apply(a, b))
            }
        }
    }
}
