//! Structural shapes for the type checker.
//!
//! Shapes are a light structural lattice, not a full type system: `any` and
//! `unknown` are bidirectional wildcards, arrays compare by element, and
//! objects compare structurally (every key required by the expected side
//! must exist and be compatible on the actual side).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A structural shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Nothing is known yet.
    Unknown,
    /// Anything is allowed.
    Any,
    /// A number.
    Number,
    /// A string.
    String,
    /// A boolean.
    Boolean,
    /// `null`.
    Null,
    /// No value (statement position, `return;`).
    Void,
    /// An array with an element shape.
    Array(Box<Shape>),
    /// An object with named properties.
    Object(BTreeMap<String, Shape>),
    /// A function.
    Function {
        /// Parameter shapes.
        params: Vec<Shape>,
        /// Return shape.
        ret: Box<Shape>,
    },
    /// An enum with numeric-kinded members.
    Enum {
        /// Enum name.
        name: String,
        /// Member names in declaration order.
        members: Vec<String>,
    },
}

impl Shape {
    /// An object shape from a property list.
    pub fn object(props: impl IntoIterator<Item = (String, Shape)>) -> Shape {
        Shape::Object(props.into_iter().collect())
    }

    /// A function shape with `n` unconstrained parameters.
    pub fn function_any(n: usize) -> Shape {
        Shape::Function {
            params: vec![Shape::Any; n],
            ret: Box::new(Shape::Unknown),
        }
    }

    /// Whether this shape accepts any member access without complaint.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Shape::Any | Shape::Unknown)
    }

    /// Whether a value of shape `actual` can be used where `self` is
    /// expected.
    pub fn compatible(&self, actual: &Shape) -> bool {
        if self.is_wildcard() || actual.is_wildcard() {
            return true;
        }
        match (self, actual) {
            (Shape::Number, Shape::Number)
            | (Shape::String, Shape::String)
            | (Shape::Boolean, Shape::Boolean)
            | (Shape::Null, Shape::Null)
            | (Shape::Void, Shape::Void) => true,
            (Shape::Array(expected), Shape::Array(found)) => expected.compatible(found),
            (Shape::Object(expected), Shape::Object(found)) => expected
                .iter()
                .all(|(key, shape)| found.get(key).is_some_and(|f| shape.compatible(f))),
            (Shape::Function { .. }, Shape::Function { .. }) => true,
            (Shape::Enum { name: a, .. }, Shape::Enum { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Unknown => write!(f, "unknown"),
            Shape::Any => write!(f, "any"),
            Shape::Number => write!(f, "number"),
            Shape::String => write!(f, "string"),
            Shape::Boolean => write!(f, "boolean"),
            Shape::Null => write!(f, "null"),
            Shape::Void => write!(f, "void"),
            Shape::Array(el) => write!(f, "array<{}>", el),
            Shape::Object(props) => {
                write!(f, "{{")?;
                for (i, (key, shape)) in props.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, shape)?;
                }
                write!(f, "}}")
            }
            Shape::Function { params, ret } => {
                write!(f, "fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", ret)
            }
            Shape::Enum { name, .. } => write!(f, "enum {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards_compatible_both_ways() {
        assert!(Shape::Any.compatible(&Shape::Number));
        assert!(Shape::Number.compatible(&Shape::Any));
        assert!(Shape::Unknown.compatible(&Shape::String));
        assert!(Shape::String.compatible(&Shape::Unknown));
    }

    #[test]
    fn test_primitive_mismatch() {
        assert!(!Shape::Number.compatible(&Shape::String));
        assert!(!Shape::Boolean.compatible(&Shape::Null));
    }

    #[test]
    fn test_array_by_element() {
        let nums = Shape::Array(Box::new(Shape::Number));
        let strs = Shape::Array(Box::new(Shape::String));
        let anys = Shape::Array(Box::new(Shape::Any));
        assert!(nums.compatible(&nums.clone()));
        assert!(!nums.compatible(&strs));
        assert!(nums.compatible(&anys));
    }

    #[test]
    fn test_object_structural() {
        let expected = Shape::object([("foo".to_string(), Shape::String)]);
        let actual = Shape::object([
            ("foo".to_string(), Shape::String),
            ("extra".to_string(), Shape::Number),
        ]);
        // Extra keys on the actual side are fine; missing keys are not.
        assert!(expected.compatible(&actual));
        assert!(!actual.compatible(&expected));
    }

    #[test]
    fn test_enum_by_name() {
        let a = Shape::Enum {
            name: "Color".to_string(),
            members: vec!["Red".to_string()],
        };
        let b = Shape::Enum {
            name: "Size".to_string(),
            members: vec!["Big".to_string()],
        };
        assert!(a.compatible(&a.clone()));
        assert!(!a.compatible(&b));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", Shape::Array(Box::new(Shape::Number))),
            "array<number>"
        );
        assert_eq!(format!("{}", Shape::function_any(2)), "fn(any, any) -> unknown");
    }
}
