//! The fixed runtime preamble emitted ahead of every compiled module.
//!
//! The preamble is deterministic text: prototype helpers guarded by a
//! marker flag so repeated evaluation is idempotent, the immutable-object
//! utilities, the error factories carrying `_id` identity tags, the
//! `_Secret` wrapper, `_deepFreeze`, and the testing harness. The shell
//! helper is appended only when the compiled program contains shell blocks.

/// Runtime preamble emitted once per compile.
pub const PREAMBLE: &str = r#"// --- KimchiLang runtime ---
if (!globalThis.__kimchi_helpers__) {
  globalThis.__kimchi_helpers__ = true;

  const defineHelper = (proto, name, fn) => {
    if (!Object.prototype.hasOwnProperty.call(proto, name)) {
      Object.defineProperty(proto, name, { value: fn, enumerable: false, writable: true });
    }
  };

  defineHelper(Array.prototype, "first", function () { return this[0]; });
  defineHelper(Array.prototype, "last", function () { return this[this.length - 1]; });
  defineHelper(Array.prototype, "isEmpty", function () { return this.length === 0; });
  defineHelper(Array.prototype, "sum", function () { return this.reduce((a, b) => a + b, 0); });
  defineHelper(Array.prototype, "product", function () { return this.reduce((a, b) => a * b, 1); });
  defineHelper(Array.prototype, "average", function () { return this.length === 0 ? 0 : this.sum() / this.length; });
  defineHelper(Array.prototype, "max", function () { return Math.max(...this); });
  defineHelper(Array.prototype, "min", function () { return Math.min(...this); });
  defineHelper(Array.prototype, "take", function (n) { return this.slice(0, n); });
  defineHelper(Array.prototype, "drop", function (n) { return this.slice(n); });
  defineHelper(Array.prototype, "flatten", function () { return this.flat(Infinity); });
  defineHelper(Array.prototype, "unique", function () { return [...new Set(this)]; });

  defineHelper(String.prototype, "isEmpty", function () { return this.length === 0; });
  defineHelper(String.prototype, "isBlank", function () { return this.trim().length === 0; });
  defineHelper(String.prototype, "toChars", function () { return this.split(""); });
  defineHelper(String.prototype, "toLines", function () { return this.split("\n"); });
  defineHelper(String.prototype, "capitalize", function () { return this.length === 0 ? "" : this[0].toUpperCase() + this.slice(1); });
}

const _deepFreeze = (value) => {
  if (value && typeof value === "object" && !Object.isFrozen(value)) {
    for (const key of Object.getOwnPropertyNames(value)) {
      _deepFreeze(value[key]);
    }
    Object.freeze(value);
  }
  return value;
};

const _obj = Object.freeze({
  set: (target, key, value) => _deepFreeze({ ...target, [key]: value }),
  merge: (a, b) => _deepFreeze({ ...a, ...b }),
  remove: (target, key) => {
    const { [key]: _dropped, ...rest } = target;
    return _deepFreeze(rest);
  },
  keys: (target) => Object.keys(target),
  values: (target) => Object.values(target),
});

const error = (message) => {
  const e = new Error(message);
  e._id = "Error";
  return e;
};
error.create = (name) => {
  const factory = (message) => {
    const e = new Error(message || name);
    e._id = name;
    e.name = name;
    return e;
  };
  factory._id = name;
  return factory;
};

class _Secret {
  constructor(value) {
    this._value = value;
  }
  toString() {
    return "********";
  }
  toJSON() {
    return "********";
  }
  [Symbol.toPrimitive](hint) {
    return hint === "string" ? "********" : this._value;
  }
  valueOf() {
    return this._value;
  }
}
const _secret = (value) => (value instanceof _Secret ? value : new _Secret(value));

const _pipe = (value, ...fns) => fns.reduce((acc, fn) => fn(acc), value);
const _range = (start, end) => Array.from({ length: end - start }, (_, i) => start + i);

const _tests = [];
const _suites = [];
const _describe = (name, fn) => {
  _suites.push(name);
  fn();
  _suites.pop();
};
const _test = (name, fn) => {
  _tests.push({ name: [..._suites, name].join(" > "), fn });
};
const _expect = (actual) => ({
  toBe: (expected) => {
    if (actual !== expected) throw error(`Expected ${expected} but got ${actual}`);
  },
  toEqual: (expected) => {
    if (JSON.stringify(actual) !== JSON.stringify(expected))
      throw error(`Expected ${JSON.stringify(expected)} but got ${JSON.stringify(actual)}`);
  },
  toContain: (expected) => {
    if (!actual.includes(expected)) throw error(`Expected ${actual} to contain ${expected}`);
  },
  toBeTruthy: () => {
    if (!actual) throw error(`Expected a truthy value but got ${actual}`);
  },
  toBeFalsy: () => {
    if (actual) throw error(`Expected a falsy value but got ${actual}`);
  },
  toBeNull: () => {
    if (actual !== null) throw error(`Expected null but got ${actual}`);
  },
  toBeGreaterThan: (expected) => {
    if (!(actual > expected)) throw error(`Expected ${actual} > ${expected}`);
  },
  toBeLessThan: (expected) => {
    if (!(actual < expected)) throw error(`Expected ${actual} < ${expected}`);
  },
  toThrow: () => {
    let threw = false;
    try {
      actual();
    } catch (_e) {
      threw = true;
    }
    if (!threw) throw error("Expected function to throw");
  },
});
const _assert = (condition, message) => {
  if (!condition) throw error(message || "Assertion failed");
};
const _runTests = async () => {
  let passed = 0;
  let failed = 0;
  for (const { name, fn } of _tests) {
    try {
      await fn();
      passed += 1;
      console.log(`  ok ${name}`);
    } catch (e) {
      failed += 1;
      console.error(`  fail ${name}: ${e.message}`);
    }
  }
  console.log(`${passed} passed, ${failed} failed`);
  return failed === 0;
};
// --- end runtime ---
"#;

/// Shell-spawn helper, emitted only when the program contains shell blocks.
pub const SHELL_HELPER: &str = r#"const _shell = (command, inputs = {}) => {
  const { spawnSync } = require("child_process");
  let resolved = command;
  for (const name of Object.keys(inputs)) {
    const raw = inputs[name];
    const value = raw instanceof _Secret ? raw.valueOf() : raw;
    resolved = resolved.split("$" + name).join(String(value));
  }
  const result = spawnSync(resolved, { shell: true, encoding: "utf8" });
  return _deepFreeze({
    stdout: result.stdout ?? "",
    stderr: result.stderr ?? "",
    exitCode: result.status ?? 0,
  });
};
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_defines_runtime_names() {
        for name in [
            "_deepFreeze",
            "_obj",
            "error.create",
            "class _Secret",
            "const _secret",
            "const _pipe",
            "const _range",
            "const _describe",
            "const _test",
            "const _expect",
            "const _assert",
            "const _runTests",
        ] {
            assert!(PREAMBLE.contains(name), "preamble is missing {}", name);
        }
    }

    #[test]
    fn test_preamble_is_guarded() {
        assert!(PREAMBLE.contains("globalThis.__kimchi_helpers__"));
    }

    #[test]
    fn test_secret_masks_string_coercion() {
        assert!(PREAMBLE.contains("\"********\""));
    }

    #[test]
    fn test_shell_helper_returns_streams() {
        assert!(SHELL_HELPER.contains("stdout"));
        assert!(SHELL_HELPER.contains("stderr"));
        assert!(SHELL_HELPER.contains("exitCode"));
    }
}
