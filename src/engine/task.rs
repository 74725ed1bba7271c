use crate::error::{PipelineError, PipelineResult};
use std::any::Any;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a computation running on a worker thread.
///
/// The handle can be polled and joined. It cannot cancel the worker: a
/// started task always runs to completion (or panics).
pub struct TaskHandle<T> {
    handle: JoinHandle<()>,
    receiver: Receiver<T>,
    result: Option<T>,
    finished: bool,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Start `work` on a named worker thread
    pub fn spawn<F>(name: &str, work: F) -> PipelineResult<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // the receiver only disappears if the handle was dropped
                let _ = sender.send(work());
            })?;

        Ok(TaskHandle {
            handle,
            receiver,
            result: None,
            finished: false,
        })
    }

    /// Wait up to `timeout` for the worker; true once it has finished
    pub fn wait(&mut self, timeout: Duration) -> bool {
        if self.finished {
            return true;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => {
                self.result = Some(value);
                self.finished = true;
            }
            Err(RecvTimeoutError::Disconnected) => self.finished = true,
            Err(RecvTimeoutError::Timeout) => {}
        }
        self.finished
    }

    /// True once the worker has produced its value or died
    pub fn is_finished(&self) -> bool {
        self.finished || self.handle.is_finished()
    }

    /// Block until the worker ends and take its value
    pub fn join(mut self) -> PipelineResult<T> {
        if !self.finished {
            if let Ok(value) = self.receiver.recv() {
                self.result = Some(value);
            }
        }

        let name = self.handle.thread().name().unwrap_or("worker").to_string();
        self.handle
            .join()
            .map_err(|payload| PipelineError::execution(format!(
                "{} panicked: {}",
                name,
                panic_message(payload.as_ref())
            )))?;

        self.result
            .ok_or_else(|| PipelineError::execution(format!("{} exited without a result", name)))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_returns_value() {
        let task = TaskHandle::spawn("adder", || 2 + 2).unwrap();
        assert_eq!(task.join().unwrap(), 4);
    }

    #[test]
    fn test_wait_times_out_then_finishes() {
        let (release, gate) = mpsc::channel::<()>();
        let mut task = TaskHandle::spawn("gated", move || {
            let _ = gate.recv();
            "done"
        })
        .unwrap();

        assert!(!task.wait(Duration::from_millis(10)));
        release.send(()).unwrap();
        assert!(task.wait(Duration::from_secs(5)));
        assert!(task.is_finished());
        assert_eq!(task.join().unwrap(), "done");
    }

    #[test]
    fn test_panic_becomes_execution_error() {
        let task: TaskHandle<i32> = TaskHandle::spawn("doomed", || panic!("bad input")).unwrap();

        let err = task.join().unwrap_err();
        assert!(err.is_execution());
        assert!(err.to_string().contains("bad input"));
    }
}
