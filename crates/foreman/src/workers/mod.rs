//! Builtin Workers
//!
//! Compiled-in workers registered in the default composition registry.
//! They double as reference implementations of the capability contract.

mod echo;
mod heartbeat;

pub use echo::EchoWorker;
pub use heartbeat::HeartbeatWorker;

use foreman_worker::{RegistryError, WorkerRegistry};

/// Register every builtin worker kind
pub fn register_builtins(registry: &mut WorkerRegistry) -> Result<(), RegistryError> {
    registry.register("echo", |_ctx| Box::new(EchoWorker::new()))?;
    registry.register("heartbeat", |_ctx| Box::new(HeartbeatWorker::new()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_register_once() {
        let mut registry = WorkerRegistry::new();
        register_builtins(&mut registry).unwrap();

        assert_eq!(registry.kinds(), vec!["echo", "heartbeat"]);
        assert!(register_builtins(&mut registry).is_err());
    }
}
