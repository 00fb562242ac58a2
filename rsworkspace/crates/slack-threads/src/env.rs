//! Environment lookups behind a trait, so [`SenderConfig`](crate::SenderConfig)
//! can be read from a fake environment in tests.

use std::env::{self, VarError};

/// Looks up configuration variables by name.
///
/// Readers are only borrowed for the length of a `from_env` call, so no
/// `Send + Sync` bound is imposed here.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Result<String, VarError>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Result<String, VarError> {
        env::var(key)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use in_memory::InMemoryEnv;

#[cfg(any(test, feature = "test-support"))]
mod in_memory {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::env;

    use super::ReadEnv;

    /// `RefCell`-backed environment for tests. Not `Send + Sync`.
    #[derive(Default)]
    pub struct InMemoryEnv {
        vars: RefCell<HashMap<String, String>>,
    }

    impl InMemoryEnv {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, key: &str, value: &str) {
            self.vars
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
        }

        pub fn remove(&self, key: &str) {
            self.vars.borrow_mut().remove(key);
        }
    }

    impl ReadEnv for InMemoryEnv {
        fn var(&self, key: &str) -> Result<String, env::VarError> {
            self.vars
                .borrow()
                .get(key)
                .cloned()
                .ok_or(env::VarError::NotPresent)
        }
    }
}
