use std::{cell::RefCell, ffi::OsStr};

#[derive(Clone, Copy, Debug)]
struct Env {
    trace: bool,
    minimal: bool,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Read configuration from the environment. Must only be called once per thread.
///
/// - `LC3VM_TRACE=1` logs every executed instruction to stderr.
/// - `LC3VM_MINIMAL=1` hides status messages, same as `--minimal`.
pub fn init() {
    let value = Env {
        trace: var_is("LC3VM_TRACE", "1"),
        minimal: var_is("LC3VM_MINIMAL", "1"),
    };
    set_env(value);
}

pub fn is_trace_enabled() -> bool {
    with_env(|env| env.trace)
}

pub fn is_minimal() -> bool {
    with_env(|env| env.minimal)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}
