//! Value: runtime payloads carried along block-graph edges.
//!
//! Numeric components are f64 throughout; control loops routinely integrate over
//! thousands of ticks and f32 drift shows up in exactly the places (integrators,
//! odometry) where it hurts most.

use serde::{Deserialize, Serialize};

/// Lightweight kind enum for pattern-matching and quick dispatch without
/// touching the payload data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Bool,
    Vec2,
    Vec3,
    Quat,
    Vector,
    Text,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Value {
    /// Scalar float
    Float(f64),

    /// Boolean
    Bool(bool),

    /// 2D vector
    Vec2([f64; 2]),

    /// 3D vector
    Vec3([f64; 3]),

    /// Quaternion (x, y, z, w)
    Quat([f64; 4]),

    /// Generic, variable-length numeric vector
    Vector(Vec<f64>),

    /// Text / string payload
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Float(0.0)
    }
}

impl Value {
    /// Return the coarse kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Vec2(_) => ValueKind::Vec2,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Quat(_) => ValueKind::Quat,
            Value::Vector(_) => ValueKind::Vector,
            Value::Text(_) => ValueKind::Text,
        }
    }

    /// Convenience constructors
    pub fn f(v: f64) -> Self {
        Value::Float(v)
    }

    pub fn vec2(x: f64, y: f64) -> Self {
        Value::Vec2([x, y])
    }

    pub fn vec3(x: f64, y: f64, z: f64) -> Self {
        Value::Vec3([x, y, z])
    }

    pub fn quat(x: f64, y: f64, z: f64, w: f64) -> Self {
        Value::Quat([x, y, z, w])
    }
}
