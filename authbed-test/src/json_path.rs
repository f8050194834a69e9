//! A small JSON path dialect for response assertions.
//!
//! `a.b[0].c` walks fields and indices, `len()` (or `size()`) yields the
//! length of an array, object or string. A path may start with an index,
//! e.g. `[1].value` on a top-level array. Missing steps resolve to `null`.

use serde_json::Value;

#[derive(Debug, PartialEq, Eq)]
enum Step<'a> {
    Field(&'a str),
    Index(usize),
    Len,
}

/// Panics on malformed paths; these are test assertions.
fn parse(path: &str) -> Vec<Step<'_>> {
    let mut steps = Vec::new();
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        if segment == "len()" || segment == "size()" {
            steps.push(Step::Len);
            continue;
        }
        let (field, mut rest) = segment.split_at(segment.find('[').unwrap_or(segment.len()));
        if !field.is_empty() {
            steps.push(Step::Field(field));
        }
        while let Some(inner) = rest.strip_prefix('[') {
            let (index, tail) = inner
                .split_once(']')
                .unwrap_or_else(|| panic!("unclosed bracket in JSON path {path:?}"));
            let index = index
                .parse()
                .unwrap_or_else(|_| panic!("non-numeric index {index:?} in JSON path {path:?}"));
            steps.push(Step::Index(index));
            rest = tail;
        }
    }
    steps
}

/// Resolve `path` against `root`.
pub fn resolve_path(root: &Value, path: &str) -> Value {
    let mut current = Some(root);
    let mut len = None;
    for step in parse(path) {
        if len.is_some() {
            panic!("len() must be the last step of JSON path {path:?}");
        }
        current = match step {
            Step::Field(name) => current.and_then(|v| v.get(name)),
            Step::Index(i) => current.and_then(|v| v.get(i)),
            Step::Len => {
                len = Some(match current {
                    Some(Value::Array(a)) => a.len(),
                    Some(Value::Object(o)) => o.len(),
                    Some(Value::String(s)) => s.len(),
                    other => panic!("len() applied to non-collection {other:?} in {path:?}"),
                });
                current
            }
        };
    }
    match len {
        Some(len) => Value::from(len),
        None => current.cloned().unwrap_or(Value::Null),
    }
}
