//! Test utilities shared by the integration tests
//!
//! `FakeProvider` stands in for the browser: every navigated URL has a script
//! of per-attempt steps, and the provider counts sessions so tests can check
//! that each one is released and that concurrency stays bounded.

#![allow(dead_code)]

use anyhow::{Result, anyhow, bail};
use answer_harvest::job::{PageSession, SessionProvider, WaitPolicy};
use answer_harvest::pipeline::scripts::select_sort_option_program;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// What one attempt against a URL does
#[derive(Debug, Clone)]
pub enum Step {
    /// Navigation succeeds and extraction returns these records
    Records(Vec<Value>),
    /// Navigation fails
    NavigationError,
    /// Navigation succeeds, extraction fails
    ExtractError,
    /// Navigation never completes
    Hang,
    /// Extraction panics
    Panic,
}

#[derive(Default)]
struct Shared {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    default_step: Mutex<Option<Step>>,
    navigations: Mutex<Vec<String>>,
    fail_open: AtomicBool,
    opens: AtomicUsize,
    closes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    failing_clicks: AtomicUsize,
    scroll_heights: Mutex<Vec<u64>>,
    latency: Mutex<Duration>,
}

/// Scripted, in-memory session provider
#[derive(Clone, Default)]
pub struct FakeProvider {
    shared: Arc<Shared>,
}

impl FakeProvider {
    pub fn new() -> Self {
        let provider = Self::default();
        provider.set_latency(Duration::from_millis(10));
        provider
    }

    /// Queue steps for `url`; once they run out the default step applies
    pub fn script(&self, url: impl Into<String>, steps: Vec<Step>) -> &Self {
        self.shared
            .scripts
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .extend(steps);
        self
    }

    /// Step used for URLs without (remaining) script
    pub fn set_default(&self, step: Step) {
        *self.shared.default_step.lock().unwrap() = Some(step);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.shared.latency.lock().unwrap() = latency;
    }

    pub fn fail_open(&self) {
        self.shared.fail_open.store(true, Ordering::SeqCst);
    }

    /// The next `n` clicks fail
    pub fn fail_clicks(&self, n: usize) {
        self.shared.failing_clicks.store(n, Ordering::SeqCst);
    }

    /// Heights reported by successive scrolls; the last one repeats
    pub fn set_scroll_heights(&self, heights: Vec<u64>) {
        *self.shared.scroll_heights.lock().unwrap() = heights;
    }

    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.shared.navigations.lock().unwrap().clone()
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.navigations().iter().filter(|u| *u == url).count()
    }
}

impl SessionProvider for FakeProvider {
    type Session = FakeSession;

    async fn open(&self) -> Result<FakeSession> {
        if self.shared.fail_open.load(Ordering::SeqCst) {
            bail!("browser crashed");
        }
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_in_flight.fetch_max(now, Ordering::SeqCst);

        Ok(FakeSession {
            shared: Arc::clone(&self.shared),
            current: None,
            scrolls: 0,
            closed: false,
        })
    }
}

pub struct FakeSession {
    shared: Arc<Shared>,
    current: Option<Step>,
    scrolls: usize,
    closed: bool,
}

impl FakeSession {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
            self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &str, _wait: &WaitPolicy) -> Result<()> {
        self.shared.navigations.lock().unwrap().push(url.to_string());
        let step = {
            let mut scripts = self.shared.scripts.lock().unwrap();
            scripts.get_mut(url).and_then(VecDeque::pop_front)
        }
        .or_else(|| self.shared.default_step.lock().unwrap().clone())
        .unwrap_or(Step::Records(Vec::new()));

        let latency = *self.shared.latency.lock().unwrap();
        tokio::time::sleep(latency).await;

        match step {
            Step::NavigationError => Err(anyhow!("net::ERR_CONNECTION_RESET at {url}")),
            Step::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            step => {
                self.current = Some(step);
                Ok(())
            }
        }
    }

    async fn evaluate(&mut self, program: &str) -> Result<Value> {
        if program.contains("option.click()") {
            let expected = select_sort_option_program("Recent");
            return Ok(Value::Bool(program == expected));
        }
        match self.current.clone() {
            Some(Step::Records(records)) => Ok(Value::Array(records)),
            Some(Step::ExtractError) => Err(anyhow!("Execution context was destroyed")),
            Some(Step::Panic) => panic!("extraction program crashed"),
            _ => Err(anyhow!("nothing loaded")),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let failing = &self.shared.failing_clicks;
        if failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            bail!("No element matches '{selector}'");
        }
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<u64> {
        let heights = self.shared.scroll_heights.lock().unwrap().clone();
        let height = heights
            .get(self.scrolls)
            .or_else(|| heights.last())
            .copied()
            .unwrap_or(1000);
        self.scrolls += 1;
        Ok(height)
    }

    async fn close(mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates a temporary directory for test output
pub fn create_test_dir() -> TempDir {
    TempDir::new().unwrap()
}

pub fn search_result(rank: u32, title: &str, url: &str) -> Value {
    json!({"rank": rank, "title": title, "url": url})
}

pub fn answer(author: &str, body: &str) -> Value {
    json!({"author": author, "body": body})
}

pub fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// Data rows of a CSV file, header excluded
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}
