// compensation.rs — CompensationStack: ordered undo actions for shutdown.
//
// Every acquired external resource pushes its undo action right after the
// acquisition succeeds. `unwind()` pops and runs them strictly last-in,
// first-out. Each action is best-effort: a failure is logged and collected,
// and the remaining actions still run.

use std::future::Future;
use std::pin::Pin;

use kb_record::ErrorRecord;

type CompensationFuture = Pin<Box<dyn Future<Output = Result<(), ErrorRecord>> + Send>>;
type CompensationFn = Box<dyn FnOnce() -> CompensationFuture + Send>;

struct Compensation {
    name: String,
    action: CompensationFn,
}

/// What `unwind()` did.
#[derive(Debug, Default, Clone)]
pub struct UnwindReport {
    /// Names of the actions that ran, in execution order.
    pub executed: Vec<String>,
    /// Records of the actions that failed, annotated with `compensation`.
    pub failures: Vec<ErrorRecord>,
}

impl UnwindReport {
    /// True when every action succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A LIFO stack of compensating actions.
#[derive(Default)]
pub struct CompensationStack {
    actions: Vec<Compensation>,
}

impl CompensationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an undo action. It runs before everything pushed earlier.
    pub fn push<F, Fut>(&mut self, name: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ErrorRecord>> + Send + 'static,
    {
        let name = name.into();
        tracing::debug!(compensation = %name, "compensation registered");
        self.actions.push(Compensation {
            name,
            action: Box::new(move || -> CompensationFuture { Box::pin(action()) }),
        });
    }

    /// Names of the pending actions in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|c| c.name.as_str()).collect()
    }

    /// Run every pending action, newest first, leaving the stack empty.
    pub async fn unwind(&mut self) -> UnwindReport {
        let mut report = UnwindReport::default();
        tracing::info!(pending = ?self.names(), "unwinding compensation stack");

        while let Some(Compensation { name, action }) = self.actions.pop() {
            match action().await {
                Ok(()) => tracing::debug!(compensation = %name, "compensation done"),
                Err(record) => {
                    let record = record.set("compensation", &name);
                    record.log_error();
                    report.failures.push(record);
                }
            }
            report.executed.push(name);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_stack(names: &[&'static str], log: &Arc<Mutex<Vec<&'static str>>>) -> CompensationStack {
        let mut stack = CompensationStack::new();
        for name in names {
            let log = Arc::clone(log);
            let name = *name;
            stack.push(name, move || async move {
                log.lock().unwrap().push(name);
                Ok(())
            });
        }
        stack
    }

    #[tokio::test]
    async fn unwind_runs_in_reverse_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = recording_stack(&["store", "connector", "commands", "role"], &log);
        assert_eq!(stack.names(), vec!["store", "connector", "commands", "role"]);

        let report = stack.unwind().await;

        assert_eq!(*log.lock().unwrap(), vec!["role", "commands", "connector", "store"]);
        assert_eq!(report.executed, vec!["role", "commands", "connector", "store"]);
        assert!(report.is_clean());
        assert!(stack.names().is_empty());
    }

    #[tokio::test]
    async fn failure_does_not_stop_remaining_actions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = recording_stack(&["first"], &log);
        stack.push("broken", || async {
            Err(ErrorRecord::from_message("role delete failed"))
        });
        let log2 = Arc::clone(&log);
        stack.push("last", move || async move {
            log2.lock().unwrap().push("last");
            Ok(())
        });

        let report = stack.unwind().await;

        assert_eq!(*log.lock().unwrap(), vec!["last", "first"]);
        assert_eq!(report.executed, vec!["last", "broken", "first"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].get("compensation"), Some("broken"));
    }

    #[tokio::test]
    async fn unwinding_twice_runs_nothing_the_second_time() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = recording_stack(&["only"], &log);

        stack.unwind().await;
        let second = stack.unwind().await;

        assert!(second.executed.is_empty());
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
