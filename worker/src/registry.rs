//! The reference worker's built-in callables.
//!
//! Real embedding applications would have their own registry; this one
//! exists only so the pool has something real to call during tests (spec
//! §1 supplement, "reference worker").

use protocol::WorkerFailure;
use std::collections::BTreeMap;

type Args = Vec<serde_json::Value>;
type Kwargs = BTreeMap<String, serde_json::Value>;
type Callable = fn(Args, Kwargs) -> Result<serde_json::Value, WorkerFailure>;

/// Look up a callable by name, as the Design Notes' "registry of named
/// callables" option recommends for systems languages (spec §6 supplement).
pub fn lookup(name: &str) -> Option<Callable> {
    match name {
        "add" => Some(add),
        "echo" => Some(echo),
        "fail" => Some(fail),
        "sleep_ms" => Some(sleep_ms),
        "crash" => Some(crash),
        _ => None,
    }
}

fn add(args: Args, _kwargs: Kwargs) -> Result<serde_json::Value, WorkerFailure> {
    let mut total = 0f64;
    for arg in &args {
        total += arg
            .as_f64()
            .ok_or_else(|| WorkerFailure::new("value_error", format!("{arg} is not a number")))?;
    }
    Ok(serde_json::json!(total))
}

fn echo(args: Args, kwargs: Kwargs) -> Result<serde_json::Value, WorkerFailure> {
    Ok(serde_json::json!({ "args": args, "kwargs": kwargs }))
}

fn fail(args: Args, _kwargs: Kwargs) -> Result<serde_json::Value, WorkerFailure> {
    let message = args
        .first()
        .and_then(|v| v.as_str())
        .unwrap_or("deliberate failure")
        .to_string();
    Err(WorkerFailure::new("value_error", message))
}

fn sleep_ms(args: Args, _kwargs: Kwargs) -> Result<serde_json::Value, WorkerFailure> {
    let millis = args
        .first()
        .and_then(|v| v.as_u64())
        .ok_or_else(|| WorkerFailure::new("value_error", "sleep_ms requires a millisecond count"))?;
    std::thread::sleep(std::time::Duration::from_millis(millis));
    Ok(serde_json::json!(null))
}

/// Exits the process immediately with a fixed code, without ever replying
/// on the socket — the pool's test for the "worker crash" scenario drives
/// this deliberately, rather than relying on an unpredictable real crash.
fn crash(_args: Args, _kwargs: Kwargs) -> Result<serde_json::Value, WorkerFailure> {
    std::process::exit(7);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_sums_numeric_args() {
        let result = add(vec![serde_json::json!(2), serde_json::json!(3.5)], Kwargs::new());
        assert_eq!(result.unwrap(), serde_json::json!(5.5));
    }

    #[test]
    fn add_rejects_non_numeric_args() {
        let err = add(vec![serde_json::json!("nope")], Kwargs::new()).unwrap_err();
        assert_eq!(err.kind, "value_error");
    }

    #[test]
    fn lookup_misses_unknown_names() {
        assert!(lookup("does_not_exist").is_none());
    }
}
