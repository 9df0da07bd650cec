//! Builtin identifiers and builtin method return shapes.
//!
//! Two tables live here: the whitelist of host identifiers that resolve
//! without a declaration, and the return shapes of common array/string
//! members that the emitter's runtime preamble provides or that plain
//! JavaScript provides. The checker carries these shapes through member
//! accesses so chained calls stay checkable.

use super::shape::Shape;

/// Check whether an unresolved identifier is a known host builtin.
pub fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "console"
            | "Math"
            | "JSON"
            | "Object"
            | "Array"
            | "String"
            | "Number"
            | "Boolean"
            | "Date"
            | "Promise"
            | "fetch"
            | "setTimeout"
            | "setInterval"
            | "clearTimeout"
            | "clearInterval"
            | "parseInt"
            | "parseFloat"
            | "isNaN"
            | "isFinite"
            | "encodeURI"
            | "decodeURI"
            | "encodeURIComponent"
            | "decodeURIComponent"
            | "Error"
            | "TypeError"
            | "RangeError"
            | "SyntaxError"
            | "RegExp"
            | "Map"
            | "Set"
            | "WeakMap"
            | "WeakSet"
            | "Symbol"
            | "Proxy"
            | "Reflect"
            | "Intl"
            | "undefined"
            | "null"
            | "NaN"
            | "Infinity"
            | "globalThis"
            | "process"
            | "Buffer"
            | "require"
            | "module"
            | "exports"
            | "__dirname"
            | "__filename"
            | "_pipe"
            | "_range"
            | "_deepFreeze"
            | "true"
            | "false"
            | "error"
    )
}

/// Return shape of a builtin member on an array value.
pub fn array_member(element: &Shape, name: &str) -> Option<Shape> {
    let self_shape = || Shape::Array(Box::new(element.clone()));
    match name {
        "map" => Some(Shape::Array(Box::new(Shape::Unknown))),
        "filter" | "slice" | "concat" | "take" | "drop" | "unique" | "reverse" | "sort" => {
            Some(self_shape())
        }
        "flatten" | "flat" => Some(Shape::Array(Box::new(Shape::Unknown))),
        "find" | "first" | "last" | "pop" | "shift" => Some(element.clone()),
        "some" | "every" | "includes" | "isEmpty" => Some(Shape::Boolean),
        "join" => Some(Shape::String),
        "length" | "indexOf" | "findIndex" | "sum" | "product" | "average" | "max" | "min" => {
            Some(Shape::Number)
        }
        "reduce" => Some(Shape::Unknown),
        "forEach" => Some(Shape::Void),
        _ => None,
    }
}

/// Return shape of a builtin member on a string value.
pub fn string_member(name: &str) -> Option<Shape> {
    match name {
        "length" | "indexOf" | "charCodeAt" => Some(Shape::Number),
        "toUpperCase" | "toLowerCase" | "trim" | "trimStart" | "trimEnd" | "capitalize"
        | "slice" | "substring" | "replace" | "replaceAll" | "repeat" | "padStart"
        | "padEnd" | "charAt" | "concat" => Some(Shape::String),
        "split" | "toChars" | "toLines" => Some(Shape::Array(Box::new(Shape::String))),
        "includes" | "startsWith" | "endsWith" | "isEmpty" | "isBlank" => Some(Shape::Boolean),
        "match" => Some(Shape::Unknown),
        _ => None,
    }
}

/// Return shape of a builtin member on a number value.
pub fn number_member(name: &str) -> Option<Shape> {
    match name {
        "toFixed" | "toString" | "toPrecision" => Some(Shape::String),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist() {
        assert!(is_builtin("console"));
        assert!(is_builtin("process"));
        assert!(is_builtin("_deepFreeze"));
        assert!(!is_builtin("myVariable"));
    }

    #[test]
    fn test_array_member_shapes() {
        let el = Shape::Number;
        assert_eq!(
            array_member(&el, "map"),
            Some(Shape::Array(Box::new(Shape::Unknown)))
        );
        assert_eq!(
            array_member(&el, "filter"),
            Some(Shape::Array(Box::new(Shape::Number)))
        );
        assert_eq!(array_member(&el, "find"), Some(Shape::Number));
        assert_eq!(array_member(&el, "some"), Some(Shape::Boolean));
        assert_eq!(array_member(&el, "join"), Some(Shape::String));
        assert_eq!(array_member(&el, "length"), Some(Shape::Number));
        assert_eq!(array_member(&el, "nonsense"), None);
    }

    #[test]
    fn test_string_member_shapes() {
        assert_eq!(string_member("length"), Some(Shape::Number));
        assert_eq!(
            string_member("toLines"),
            Some(Shape::Array(Box::new(Shape::String)))
        );
        assert_eq!(string_member("isBlank"), Some(Shape::Boolean));
    }
}
