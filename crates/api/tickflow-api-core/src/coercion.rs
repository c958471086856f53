//! Coercion helpers between Value shapes.
//!
//! Blocks downcast edge payloads through these rules so a mis-typed wire degrades
//! predictably (scalar broadcast, first-component truncation) instead of panicking.

use crate::Value;

/// Coerce a Value into a scalar f64.
/// Rules:
/// - Float -> its value
/// - Bool -> 1.0 / 0.0
/// - Vec2/Vec3/Quat -> first component
/// - Vector -> first element or 0.0 if empty
/// - Text -> 0.0
pub fn to_float(v: &Value) -> f64 {
    match v {
        Value::Float(f) => *f,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Vec2(a) => a[0],
        Value::Vec3(a) => a[0],
        Value::Quat(a) => a[0],
        Value::Vector(vec) => vec.first().copied().unwrap_or(0.0),
        Value::Text(_) => 0.0,
    }
}

/// Coerce a Value into a boolean. Non-zero numeric components are `true`;
/// text is `true` when non-empty.
pub fn to_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Text(s) => !s.is_empty(),
        _ => to_vector(v).iter().any(|x| *x != 0.0),
    }
}

/// Convert a Value into a flat Vec<f64>.
/// - VecN/Quat -> vector of components
/// - Float -> single-element vec
/// - Bool -> single 0/1
/// - Vector -> clone
/// - Text -> empty
pub fn to_vector(v: &Value) -> Vec<f64> {
    match v {
        Value::Float(f) => vec![*f],
        Value::Bool(b) => vec![if *b { 1.0 } else { 0.0 }],
        Value::Vec2(a) => vec![a[0], a[1]],
        Value::Vec3(a) => vec![a[0], a[1], a[2]],
        Value::Quat(a) => vec![a[0], a[1], a[2], a[3]],
        Value::Vector(vec) => vec.clone(),
        Value::Text(_) => vec![],
    }
}

/// Coerce a Value into a Vec3, zero-padding or truncating as needed.
/// Scalars broadcast to all three components.
pub fn to_vec3(v: &Value) -> [f64; 3] {
    match v {
        Value::Vec3(a) => *a,
        Value::Vec2(a) => [a[0], a[1], 0.0],
        Value::Float(f) => [*f, *f, *f],
        Value::Bool(b) => {
            if *b {
                [1.0, 1.0, 1.0]
            } else {
                [0.0, 0.0, 0.0]
            }
        }
        Value::Quat(a) => [a[0], a[1], a[2]],
        Value::Vector(vec) => {
            let mut out = [0.0f64; 3];
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = *vec.get(i).unwrap_or(&0.0);
            }
            out
        }
        Value::Text(_) => [0.0, 0.0, 0.0],
    }
}
