//! Constant values and folding.
//!
//! Covers the bool/int/float/string subset the checker folds: enough for
//! untyped constant conversion, `iota`, constant conditions, and the
//! entangled-boolean literal rule.

use crate::types::BasicKind;
use sgo_parser::BinOp;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn from_int_literal(text: &str) -> Option<Value> {
        let digits: String = text.chars().filter(|c| *c != '_').collect();
        let parsed = if let Some(hex) = digits.strip_prefix("0x").or(digits.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16)
        } else if let Some(oct) = digits.strip_prefix("0o").or(digits.strip_prefix("0O")) {
            i64::from_str_radix(oct, 8)
        } else if let Some(bin) = digits.strip_prefix("0b").or(digits.strip_prefix("0B")) {
            i64::from_str_radix(bin, 2)
        } else {
            digits.parse::<i64>()
        };
        parsed.ok().map(Value::Int)
    }

    pub fn from_float_literal(text: &str) -> Option<Value> {
        let digits: String = text.chars().filter(|c| *c != '_').collect();
        digits.parse::<f64>().ok().map(Value::Float)
    }

    pub fn from_char_literal(text: &str) -> Option<Value> {
        let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
        let c = match inner.strip_prefix('\\') {
            Some("n") => '\n',
            Some("t") => '\t',
            Some("r") => '\r',
            Some("\\") => '\\',
            Some("'") => '\'',
            Some("0") => '\0',
            Some(_) => return None,
            None => inner.chars().next()?,
        };
        Some(Value::Int(c as i64))
    }

    pub fn from_string_literal(text: &str) -> Value {
        if let Some(raw) = text
            .strip_prefix('`')
            .and_then(|s| s.strip_suffix('`'))
        {
            return Value::Str(raw.to_string());
        }
        let inner = text
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(text);
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        }
        Value::Str(out)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// Whether the value is representable by the given basic kind.
    pub fn representable(&self, kind: BasicKind) -> bool {
        match self {
            Value::Bool(_) => kind.is_boolean(),
            Value::Str(_) => kind.is_string(),
            Value::Float(_) => kind.is_float() || kind.is_complex(),
            Value::Int(v) => {
                if kind.is_float() || kind.is_complex() {
                    return true;
                }
                if !kind.is_integer() {
                    return false;
                }
                use BasicKind::*;
                match kind {
                    Int8 => i8::try_from(*v).is_ok(),
                    Int16 => i16::try_from(*v).is_ok(),
                    Int32 | UntypedRune => i32::try_from(*v).is_ok(),
                    Uint8 => u8::try_from(*v).is_ok(),
                    Uint16 => u16::try_from(*v).is_ok(),
                    Uint32 => u32::try_from(*v).is_ok(),
                    Uint | Uint64 | Uintptr => *v >= 0,
                    _ => true,
                }
            }
        }
    }
}

pub fn unary_op(op: sgo_parser::UnOp, v: &Value) -> Option<Value> {
    use sgo_parser::UnOp;
    Some(match (op, v) {
        (UnOp::Plus, v) => v.clone(),
        (UnOp::Minus, Value::Int(i)) => Value::Int(i.checked_neg()?),
        (UnOp::Minus, Value::Float(f)) => Value::Float(-f),
        (UnOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnOp::Xor, Value::Int(i)) => Value::Int(!i),
        _ => return None,
    })
}

pub fn binary_op(op: BinOp, a: &Value, b: &Value) -> Option<Value> {
    use BinOp::*;
    Some(match (a, b) {
        (Value::Int(x), Value::Int(y)) => match op {
            Add => Value::Int(x.checked_add(*y)?),
            Sub => Value::Int(x.checked_sub(*y)?),
            Mul => Value::Int(x.checked_mul(*y)?),
            Quo => Value::Int(x.checked_div(*y)?),
            Rem => Value::Int(x.checked_rem(*y)?),
            And => Value::Int(x & y),
            Or => Value::Int(x | y),
            Xor => Value::Int(x ^ y),
            AndNot => Value::Int(x & !y),
            Shl => Value::Int(x.checked_shl(u32::try_from(*y).ok()?)?),
            Shr => Value::Int(x.checked_shr(u32::try_from(*y).ok()?)?),
            Eql => Value::Bool(x == y),
            Neq => Value::Bool(x != y),
            Lss => Value::Bool(x < y),
            Leq => Value::Bool(x <= y),
            Gtr => Value::Bool(x > y),
            Geq => Value::Bool(x >= y),
            LAnd | LOr => return None,
        },
        (Value::Float(x), Value::Float(y)) => match op {
            Add => Value::Float(x + y),
            Sub => Value::Float(x - y),
            Mul => Value::Float(x * y),
            Quo => Value::Float(x / y),
            Eql => Value::Bool(x == y),
            Neq => Value::Bool(x != y),
            Lss => Value::Bool(x < y),
            Leq => Value::Bool(x <= y),
            Gtr => Value::Bool(x > y),
            Geq => Value::Bool(x >= y),
            _ => return None,
        },
        (Value::Int(x), Value::Float(_)) => {
            return binary_op(op, &Value::Float(*x as f64), b)
        }
        (Value::Float(_), Value::Int(y)) => {
            return binary_op(op, a, &Value::Float(*y as f64))
        }
        (Value::Bool(x), Value::Bool(y)) => match op {
            LAnd => Value::Bool(*x && *y),
            LOr => Value::Bool(*x || *y),
            Eql => Value::Bool(x == y),
            Neq => Value::Bool(x != y),
            _ => return None,
        },
        (Value::Str(x), Value::Str(y)) => match op {
            Add => Value::Str(format!("{x}{y}")),
            Eql => Value::Bool(x == y),
            Neq => Value::Bool(x != y),
            Lss => Value::Bool(x < y),
            Leq => Value::Bool(x <= y),
            Gtr => Value::Bool(x > y),
            Geq => Value::Bool(x >= y),
            _ => return None,
        },
        _ => return None,
    })
}

/// The default type of an untyped constant kind.
pub fn default_kind(kind: BasicKind) -> BasicKind {
    use BasicKind::*;
    match kind {
        UntypedBool => Bool,
        UntypedInt => Int,
        UntypedRune => Int32,
        UntypedFloat => Float64,
        UntypedComplex => Complex128,
        UntypedString => String,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literals() {
        assert_eq!(Value::from_int_literal("42"), Some(Value::Int(42)));
        assert_eq!(Value::from_int_literal("0x2a"), Some(Value::Int(42)));
        assert_eq!(Value::from_int_literal("0b101"), Some(Value::Int(5)));
        assert_eq!(Value::from_int_literal("1_000"), Some(Value::Int(1000)));
    }

    #[test]
    fn representability() {
        assert!(Value::Int(255).representable(BasicKind::Uint8));
        assert!(!Value::Int(256).representable(BasicKind::Uint8));
        assert!(!Value::Int(-1).representable(BasicKind::Uint));
        assert!(Value::Int(1).representable(BasicKind::Float64));
    }

    #[test]
    fn string_unquoting() {
        assert_eq!(
            Value::from_string_literal("\"a\\nb\""),
            Value::Str("a\nb".to_string())
        );
        assert_eq!(
            Value::from_string_literal("`raw\\n`"),
            Value::Str("raw\\n".to_string())
        );
    }
}
