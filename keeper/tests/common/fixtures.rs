//! Test fixtures: worker specs and an in-memory launcher

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Notify;

use keeper::{KeeperError, KeeperResult, WorkerHandle, WorkerLauncher, WorkerSpec};

pub struct TestFixtures;

impl TestFixtures {
    pub const TEACHER: &'static str = "teacher_bot";
    pub const STUDENT: &'static str = "student_bot";

    /// The two default workers, never actually executed by the fake launcher
    pub fn workers() -> Vec<WorkerSpec> {
        vec![
            WorkerSpec::new(Self::TEACHER, "python3", &["TelegramBot.py"]),
            WorkerSpec::new(Self::STUDENT, "python3", &["StudentBot.py"]),
        ]
    }
}

#[derive(Default)]
struct FakeInner {
    attempts: Mutex<Vec<(String, Instant)>>,
    workers: Mutex<Vec<(String, Arc<AtomicBool>)>>,
    failing: Mutex<HashSet<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
    stops: AtomicUsize,
}

/// Launcher whose workers are flags: alive until killed or stopped
#[derive(Clone, Default)]
pub struct FakeLauncher {
    inner: Arc<FakeInner>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher on which the named workers always fail to start
    pub fn failing(names: &[&str]) -> Self {
        let launcher = Self::new();
        launcher.set_failing(names);
        launcher
    }

    pub fn set_failing(&self, names: &[&str]) {
        let mut failing = self.inner.failing.lock().unwrap();
        failing.clear();
        failing.extend(names.iter().map(|n| n.to_string()));
    }

    /// Make every later launch wait until the returned gate is notified once
    pub fn hold_launches(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.inner.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn attempts(&self, worker: &str) -> Vec<Instant> {
        self.inner
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == worker)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn launch_count(&self, worker: &str) -> usize {
        self.attempts(worker).len()
    }

    /// Simulate the newest instance of `worker` crashing
    pub fn kill(&self, worker: &str) {
        let workers = self.inner.workers.lock().unwrap();
        if let Some((_, alive)) = workers.iter().rev().find(|(name, _)| name == worker) {
            alive.store(false, Ordering::SeqCst);
        }
    }

    pub fn stop_count(&self) -> usize {
        self.inner.stops.load(Ordering::SeqCst)
    }

    pub fn any_alive(&self) -> bool {
        self.inner
            .workers
            .lock()
            .unwrap()
            .iter()
            .any(|(_, alive)| alive.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl WorkerLauncher for FakeLauncher {
    async fn launch(&self, spec: &WorkerSpec) -> KeeperResult<Box<dyn WorkerHandle>> {
        self.inner
            .attempts
            .lock()
            .unwrap()
            .push((spec.name.clone(), Instant::now()));

        let gate = self.inner.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.inner.failing.lock().unwrap().contains(&spec.name) {
            return Err(KeeperError::launch(&spec.name, "exited within the grace window"));
        }

        let alive = Arc::new(AtomicBool::new(true));
        self.inner
            .workers
            .lock()
            .unwrap()
            .push((spec.name.clone(), alive.clone()));

        Ok(Box::new(FakeWorker {
            alive,
            inner: self.inner.clone(),
        }))
    }
}

struct FakeWorker {
    alive: Arc<AtomicBool>,
    inner: Arc<FakeInner>,
}

#[async_trait]
impl WorkerHandle for FakeWorker {
    fn pid(&self) -> Option<u32> {
        None
    }

    fn is_alive(&mut self) -> KeeperResult<bool> {
        Ok(self.alive.load(Ordering::SeqCst))
    }

    async fn stop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.inner.stops.fetch_add(1, Ordering::SeqCst);
    }
}
