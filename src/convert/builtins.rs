//! Built-in conversion functions.
//!
//! These reproduce the transforms the stock preset schemas depend on.
//! Scaling conversions truncate toward zero (`float_to_byte(0.999)` is
//! 254, not 255) and do not clamp; out-of-range results are caught by
//! the codec at pack time.

use smallvec::SmallVec;

use super::ConversionRegistry;
use crate::host::TraversalContext;
use crate::util::{Error, Result};
use crate::value::{Components, Value};

fn fail(name: &str, reason: &str) -> Error {
    Error::ConversionFailed {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn scalar(name: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| fail(name, "expected a scalar"))
}

fn components<'a>(name: &str, value: &'a Value) -> Result<&'a [f64]> {
    value
        .components()
        .ok_or_else(|| fail(name, "expected a vector"))
}

/// `none`: pass the value through unchanged.
fn none(value: &Value, _ctx: &TraversalContext<'_>, _args: Option<&serde_json::Value>) -> Result<Value> {
    Ok(value.clone())
}

/// `float_to_byte`: scale a `[0,1]` float to `[0,255]`, truncating
/// toward zero.
fn float_to_byte(
    value: &Value,
    _ctx: &TraversalContext<'_>,
    _args: Option<&serde_json::Value>,
) -> Result<Value> {
    let v = scalar("float_to_byte", value)?;
    Ok(Value::Int((v * 255.0).trunc() as i64))
}

/// `vec_to_bytes`: element-wise `float_to_byte` over a vector.
fn vec_to_bytes(
    value: &Value,
    _ctx: &TraversalContext<'_>,
    _args: Option<&serde_json::Value>,
) -> Result<Value> {
    let input = components("vec_to_bytes", value)?;
    let scaled: Components = input.iter().map(|x| (x * 255.0).trunc()).collect();
    Ok(Value::Vector(scaled))
}

/// `invert_v`: flip the second axis of a texture coordinate,
/// `(u, v) -> (u, 1 - v)`.
fn invert_v(
    value: &Value,
    _ctx: &TraversalContext<'_>,
    _args: Option<&serde_json::Value>,
) -> Result<Value> {
    let c = components("invert_v", value)?;
    if c.len() < 2 {
        return Err(fail("invert_v", "expected at least 2 components"));
    }
    Ok(Value::vec2(c[0], 1.0 - c[1]))
}

/// `invert_y`: flip the second spatial axis, `(x, y, z) -> (x, -y, z)`.
fn invert_y(
    value: &Value,
    _ctx: &TraversalContext<'_>,
    _args: Option<&serde_json::Value>,
) -> Result<Value> {
    let c = components("invert_y", value)?;
    if c.len() < 3 {
        return Err(fail("invert_y", "expected at least 3 components"));
    }
    Ok(Value::vec3(c[0], -c[1], c[2]))
}

/// `vertex_group_ids_to_bitmask`: OR `1 << index` over a collection of
/// small integer indices. Order-independent; duplicates are idempotent.
fn vertex_group_ids_to_bitmask(
    value: &Value,
    _ctx: &TraversalContext<'_>,
    _args: Option<&serde_json::Value>,
) -> Result<Value> {
    const NAME: &str = "vertex_group_ids_to_bitmask";
    let indices: SmallVec<[f64; 4]> = match value {
        Value::Vector(c) => c.clone(),
        Value::Int(i) => SmallVec::from_slice(&[*i as f64]),
        _ => return Err(fail(NAME, "expected an index vector or integer")),
    };
    let mut mask: i64 = 0;
    for raw in indices {
        if raw.fract() != 0.0 || !(0.0..63.0).contains(&raw) {
            return Err(fail(NAME, "group index must be an integer in 0..63"));
        }
        mask |= 1 << (raw as u32);
    }
    Ok(Value::Int(mask))
}

/// `constant_from_args`: ignore the input and return `args["value"]`.
/// Used for schema-declared literals.
fn constant_from_args(
    _value: &Value,
    _ctx: &TraversalContext<'_>,
    args: Option<&serde_json::Value>,
) -> Result<Value> {
    const NAME: &str = "constant_from_args";
    let args = args.ok_or_else(|| fail(NAME, "requires args"))?;
    let constant = args
        .get("value")
        .ok_or_else(|| fail(NAME, "args missing \"value\" key"))?;
    Value::from_json(constant).ok_or_else(|| fail(NAME, "args \"value\" is not a number, bool or numeric array"))
}

pub(super) fn register_all(registry: &mut ConversionRegistry) {
    registry.register("none", none);
    registry.register("float_to_byte", float_to_byte);
    registry.register("vec_to_bytes", vec_to_bytes);
    registry.register("invert_v", invert_v);
    registry.register("invert_y", invert_y);
    registry.register("vertex_group_ids_to_bitmask", vertex_group_ids_to_bitmask);
    registry.register("constant_from_args", constant_from_args);
}
