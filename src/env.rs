//! Settings read once from the process environment.
//!
//! - `FEMTO_VERBOSE=1`: trace every executed instruction, as with `run --verbose`.

use std::cell::RefCell;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Env {
    verbose: bool,
}

impl Env {
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| lookup(name).is_some_and(|v| v.trim() == "1");
        Env {
            verbose: flag("FEMTO_VERBOSE"),
        }
    }
}

thread_local! {
    /// Set once by `init`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env::from_lookup(|name| std::env::var(name).ok());
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

pub fn is_verbose() -> bool {
    with_env(|env| env.verbose)
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
