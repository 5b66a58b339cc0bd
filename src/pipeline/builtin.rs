//! Built-in arithmetic stages
//!
//! All of them operate on the `passthrough` key and hand back the full bag
//! with that key rewritten. Integer operands stay integers; anything else
//! is computed as `f64`.

use crate::error::{FlowError, FlowResult};
use crate::pipeline::stage::Stage;
use crate::types::{value_kind, Bag};
use anyhow::{anyhow, bail};
use serde_json::{Number, Value};

/// Key the built-in stages read and write.
pub const PASSTHROUGH: &str = "passthrough";

/// Names accepted by [`builtin_stage`].
pub const BUILTIN_NAMES: &[&str] = &["add", "subtract", "multiply", "square", "set"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltinOp {
    Add,
    Subtract,
    Multiply,
    Square,
    Set,
}

/// A stage from the built-in table, with its parameters bound.
#[derive(Debug, Clone)]
pub struct BuiltinStage {
    name: String,
    op: BuiltinOp,
    params: Bag,
}

/// Resolve a built-in stage by name.
///
/// `params` binds the stage's keyword arguments (`value` for add/subtract,
/// a fallback `m` for multiply, the entries to write for set).
pub fn builtin_stage(name: &str, params: Bag) -> FlowResult<Box<dyn Stage>> {
    let op = match name {
        "add" => BuiltinOp::Add,
        "subtract" => BuiltinOp::Subtract,
        "multiply" => BuiltinOp::Multiply,
        "square" => BuiltinOp::Square,
        "set" => BuiltinOp::Set,
        other => {
            return Err(FlowError::InvalidStage {
                name: other.to_string(),
                reason: format!("unknown builtin, expected one of {:?}", BUILTIN_NAMES),
            })
        }
    };
    Ok(Box::new(BuiltinStage {
        name: name.to_string(),
        op,
        params,
    }))
}

impl BuiltinStage {
    fn param_or(&self, key: &str, default: i64) -> Value {
        self.params
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::from(default))
    }
}

impl Stage for BuiltinStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, bag: &Bag) -> anyhow::Result<Value> {
        let mut out = bag.clone();

        let result = match self.op {
            BuiltinOp::Add => {
                let current = operand(bag, PASSTHROUGH, 0);
                arith(&current, &self.param_or("value", 1), Arith::Add)?
            }
            BuiltinOp::Subtract => {
                let current = operand(bag, PASSTHROUGH, 0);
                arith(&current, &self.param_or("value", 3), Arith::Sub)?
            }
            BuiltinOp::Multiply => {
                let current = operand(bag, PASSTHROUGH, 1);
                let m = match bag.get("m") {
                    Some(v) => v.clone(),
                    None => self.param_or("m", 1),
                };
                arith(&current, &m, Arith::Mul)?
            }
            BuiltinOp::Square => {
                let current = operand(bag, PASSTHROUGH, 0);
                arith(&current, &current, Arith::Mul)?
            }
            BuiltinOp::Set => {
                for (key, value) in &self.params {
                    out.insert(key.clone(), value.clone());
                }
                return Ok(Value::Object(out));
            }
        };

        out.insert(PASSTHROUGH.to_string(), result);
        Ok(Value::Object(out))
    }
}

fn operand(bag: &Bag, key: &str, default: i64) -> Value {
    bag.get(key).cloned().unwrap_or_else(|| Value::from(default))
}

#[derive(Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
}

fn arith(lhs: &Value, rhs: &Value, op: Arith) -> anyhow::Result<Value> {
    let (Value::Number(a), Value::Number(b)) = (lhs, rhs) else {
        bail!(
            "unsupported operand types: {} and {}",
            value_kind(lhs),
            value_kind(rhs)
        );
    };

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let exact = match op {
            Arith::Add => x.checked_add(y),
            Arith::Sub => x.checked_sub(y),
            Arith::Mul => x.checked_mul(y),
        };
        if let Some(v) = exact {
            return Ok(Value::from(v));
        }
    }

    let (x, y) = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x, y),
        _ => bail!("operands are not representable as numbers"),
    };
    let v = match op {
        Arith::Add => x + y,
        Arith::Sub => x - y,
        Arith::Mul => x * y,
    };
    Number::from_f64(v)
        .map(Value::Number)
        .ok_or_else(|| anyhow!("result {} is not a finite number", v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::bag_from;
    use serde_json::json;

    fn run(name: &str, params: Value, bag: Value) -> anyhow::Result<Value> {
        builtin_stage(name, bag_from(params))
            .unwrap()
            .call(&bag_from(bag))
    }

    #[test]
    fn test_add_uses_bound_value() {
        let out = run("add", json!({"value": 5}), json!({"passthrough": 10})).unwrap();
        assert_eq!(out, json!({"passthrough": 15}));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(run("add", json!({}), json!({})).unwrap()["passthrough"], json!(1));
        assert_eq!(
            run("subtract", json!({}), json!({"passthrough": 10})).unwrap()["passthrough"],
            json!(7)
        );
        assert_eq!(run("multiply", json!({}), json!({})).unwrap()["passthrough"], json!(1));
        assert_eq!(run("square", json!({}), json!({})).unwrap()["passthrough"], json!(0));
    }

    #[test]
    fn test_multiply_prefers_bag_m() {
        let out = run("multiply", json!({"m": 7}), json!({"passthrough": 10, "m": 3})).unwrap();
        assert_eq!(out, json!({"passthrough": 30, "m": 3}));

        let out = run("multiply", json!({"m": 7}), json!({"passthrough": 10})).unwrap();
        assert_eq!(out["passthrough"], json!(70));
    }

    #[test]
    fn test_square_keeps_other_keys() {
        let out = run("square", json!({}), json!({"passthrough": 15, "tag": "x"})).unwrap();
        assert_eq!(out, json!({"passthrough": 225, "tag": "x"}));
    }

    #[test]
    fn test_float_arithmetic() {
        let out = run("add", json!({"value": 0.5}), json!({"passthrough": 2})).unwrap();
        assert_eq!(out["passthrough"], json!(2.5));
    }

    #[test]
    fn test_integer_overflow_falls_back_to_float() {
        let out = run("square", json!({}), json!({"passthrough": i64::MAX})).unwrap();
        assert!(out["passthrough"].is_f64());
    }

    #[test]
    fn test_non_numeric_operand_raises() {
        let err = run("add", json!({}), json!({"passthrough": "ten"})).unwrap_err();
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_set_writes_params() {
        let out = run("set", json!({"m": 3, "label": "mix"}), json!({"passthrough": 1})).unwrap();
        assert_eq!(out, json!({"passthrough": 1, "m": 3, "label": "mix"}));
    }

    #[test]
    fn test_unknown_builtin_is_invalid_stage() {
        let err = builtin_stage("divide", Bag::new()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidStage { ref name, .. } if name == "divide"));
    }
}
