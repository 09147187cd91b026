// ABOUTME: Test support utilities.
// ABOUTME: In-memory fleet with simulated symlinks, plus scripted operator collaborators.

// Each test binary only uses some of these helpers, so allow dead_code.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use relink::output::{Output, OutputMode};
use relink::prompt::{ConfirmationGate, UrlOpener};
use relink::remote::{HostOutput, RemoteCommand, RemoteError, RemoteExecutor};
use relink::transition::TransitionContext;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("relink=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Filesystem state of one simulated host.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    pub links: HashMap<String, String>,
    pub dirs: BTreeSet<String>,
}

impl HostState {
    /// Follow a link at `path` or at one of its ancestors.
    fn resolve(&self, path: &str) -> String {
        let path = path.trim_end_matches('/');
        for (link, target) in &self.links {
            if path == link.as_str() {
                return target.clone();
            }
            if let Some(rest) = path.strip_prefix(link.as_str())
                && rest.starts_with('/')
            {
                return format!("{target}{rest}");
            }
        }
        path.to_string()
    }

    fn subtree(&self, root: &str) -> Vec<String> {
        let prefix = format!("{root}/");
        self.dirs
            .iter()
            .filter(|d| *d == root || d.starts_with(&prefix))
            .cloned()
            .collect()
    }

    fn children(&self, root: &str) -> Vec<String> {
        let prefix = format!("{root}/");
        self.dirs
            .iter()
            .filter_map(|d| d.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect()
    }
}

struct Response {
    pattern: String,
    host: Option<usize>,
    stdout: String,
}

struct Failure {
    pattern: String,
    host: Option<usize>,
    skip: usize,
}

/// A [`RemoteExecutor`] that simulates pointer and directory commands and
/// answers everything else from scripted responses.
pub struct FakeFleet {
    hosts: Vec<String>,
    states: Mutex<Vec<HostState>>,
    responses: Mutex<Vec<Response>>,
    failures: Mutex<Vec<Failure>>,
    frozen_links: Mutex<HashSet<String>>,
    log: Mutex<Vec<(String, String)>>,
}

impl FakeFleet {
    pub fn new(hosts: &[&str]) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            states: Mutex::new(vec![HostState::default(); hosts.len()]),
            responses: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            frozen_links: Mutex::new(HashSet::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Add a directory (and its parents up to `/`) on every host.
    pub fn add_dir(&self, path: &str) {
        for index in 0..self.hosts.len() {
            self.add_dir_on(index, path);
        }
    }

    pub fn add_dir_on(&self, host: usize, path: &str) {
        let mut states = self.states.lock();
        let mut current = String::new();
        for part in path.trim_matches('/').split('/') {
            current.push('/');
            current.push_str(part);
            states[host].dirs.insert(current.clone());
        }
    }

    pub fn set_link(&self, link: &str, target: &str) {
        for state in self.states.lock().iter_mut() {
            state.links.insert(link.to_string(), target.to_string());
        }
    }

    pub fn set_link_on(&self, host: usize, link: &str, target: &str) {
        self.states.lock()[host]
            .links
            .insert(link.to_string(), target.to_string());
    }

    pub fn link(&self, host: usize, link: &str) -> Option<String> {
        self.states.lock()[host].links.get(link).cloned()
    }

    pub fn has_dir(&self, host: usize, path: &str) -> bool {
        self.states.lock()[host].dirs.contains(path)
    }

    pub fn state(&self, host: usize) -> HostState {
        self.states.lock()[host].clone()
    }

    /// Answer commands containing `pattern` with `stdout`. Later entries win.
    pub fn respond(&self, pattern: &str, stdout: &str) {
        self.responses.lock().push(Response {
            pattern: pattern.to_string(),
            host: None,
            stdout: stdout.to_string(),
        });
    }

    pub fn respond_on(&self, host: usize, pattern: &str, stdout: &str) {
        self.responses.lock().push(Response {
            pattern: pattern.to_string(),
            host: Some(host),
            stdout: stdout.to_string(),
        });
    }

    /// Make commands containing `pattern` exit with status 1 on every host.
    pub fn fail_on(&self, pattern: &str) {
        self.failures.lock().push(Failure {
            pattern: pattern.to_string(),
            host: None,
            skip: 0,
        });
    }

    /// Like [`fail_on`](Self::fail_on), but the first `skip` matching
    /// commands still succeed.
    pub fn fail_after(&self, pattern: &str, skip: usize) {
        self.failures.lock().push(Failure {
            pattern: pattern.to_string(),
            host: None,
            skip,
        });
    }

    pub fn fail_on_host(&self, host: usize, pattern: &str) {
        self.failures.lock().push(Failure {
            pattern: pattern.to_string(),
            host: Some(host),
            skip: 0,
        });
    }

    /// `ln -nfs` onto `link` succeeds without changing it.
    pub fn freeze_link(&self, link: &str) {
        self.frozen_links.lock().insert(link.to_string());
    }

    /// Every rendered command, as `(host, command)`.
    pub fn commands(&self) -> Vec<(String, String)> {
        self.log.lock().clone()
    }

    pub fn ran(&self, fragment: &str) -> bool {
        self.log.lock().iter().any(|(_, c)| c.contains(fragment))
    }

    pub fn count(&self, fragment: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|(_, c)| c.contains(fragment))
            .count()
    }

    fn output(&self, host: usize, exit_code: u32, stdout: String, stderr: &str) -> HostOutput {
        HostOutput {
            host: self.hosts[host].clone(),
            exit_code,
            stdout,
            stderr: stderr.to_string(),
        }
    }

    fn run(&self, host: usize, command: &RemoteCommand) -> HostOutput {
        let rendered = command.render();
        self.log
            .lock()
            .push((self.hosts[host].clone(), rendered.clone()));

        let failed = self.failures.lock().iter_mut().any(|f| {
            if !rendered.contains(&f.pattern) || f.host.is_some_and(|h| h != host) {
                return false;
            }
            if f.skip > 0 {
                f.skip -= 1;
                return false;
            }
            true
        });
        if failed {
            return self.output(host, 1, String::new(), "simulated failure");
        }

        if let Some(output) = self.simulate(host, command) {
            return output;
        }

        let responses = self.responses.lock();
        let stdout = responses
            .iter()
            .rev()
            .find(|r| rendered.contains(&r.pattern) && r.host.is_none_or(|h| h == host))
            .map(|r| r.stdout.clone())
            .unwrap_or_default();
        self.output(host, 0, stdout, "")
    }

    fn simulate(&self, host: usize, command: &RemoteCommand) -> Option<HostOutput> {
        let script = command.script();
        let args: Vec<&str> = script.split_whitespace().collect();
        let mut states = self.states.lock();
        let state = &mut states[host];

        let ok = |stdout: String| Some(self.output(host, 0, stdout, ""));
        match args.as_slice() {
            ["readlink", link] => match state.links.get(*link) {
                Some(target) => ok(format!("{target}\n")),
                None => Some(self.output(host, 1, String::new(), "")),
            },
            ["ln", "-nfs", target, link] => {
                if !self.frozen_links.lock().contains(*link) {
                    state.links.insert(link.to_string(), target.to_string());
                }
                ok(String::new())
            }
            ["mv", from, to] => {
                for dir in state.subtree(from) {
                    state.dirs.remove(&dir);
                    state.dirs.insert(format!("{to}{}", &dir[from.len()..]));
                }
                ok(String::new())
            }
            ["rm", "-Rf", path] => {
                for dir in state.subtree(path) {
                    state.dirs.remove(&dir);
                }
                state.links.remove(*path);
                ok(String::new())
            }
            ["cp", "-r", "--preserve=links", from, to] => {
                let source = state.resolve(from);
                for dir in state.subtree(&source) {
                    state.dirs.insert(format!("{to}{}", &dir[source.len()..]));
                }
                ok(String::new())
            }
            ["test", "-d", path] => {
                let exists = state.dirs.contains(*path);
                Some(self.output(host, u32::from(!exists), String::new(), ""))
            }
            _ if script.starts_with("ls -d */") => {
                let cwd = state.resolve(command.cwd().unwrap_or("/"));
                let names = state.children(&cwd);
                ok(names.iter().map(|n| format!("{n}\n")).collect())
            }
            _ => None,
        }
    }
}

#[async_trait]
impl RemoteExecutor for FakeFleet {
    fn hosts(&self) -> &[String] {
        &self.hosts
    }

    async fn execute(&self, command: &RemoteCommand) -> Result<Vec<HostOutput>, RemoteError> {
        Ok((0..self.hosts.len())
            .map(|host| self.run(host, command))
            .collect())
    }

    async fn execute_on(
        &self,
        host: usize,
        command: &RemoteCommand,
    ) -> Result<HostOutput, RemoteError> {
        if host >= self.hosts.len() {
            return Err(RemoteError::NoSuchHost(host));
        }
        Ok(self.run(host, command))
    }
}

/// Answers gates by rule and records every question.
pub struct ScriptedGate {
    rules: Vec<(String, bool)>,
    fallback: Option<bool>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedGate {
    /// Answer yes to everything.
    pub fn yes() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Some(true),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Take each question's default answer.
    pub fn defaults() -> Self {
        Self {
            rules: Vec::new(),
            fallback: None,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Answer `answer` to questions containing `fragment`.
    pub fn answer(mut self, fragment: &str, answer: bool) -> Self {
        self.rules.push((fragment.to_string(), answer));
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    pub fn was_asked(&self, fragment: &str) -> bool {
        self.asked.lock().iter().any(|q| q.contains(fragment))
    }
}

#[async_trait]
impl ConfirmationGate for ScriptedGate {
    async fn confirm(&self, message: &str, default: bool) -> bool {
        self.asked.lock().push(message.to_string());
        self.rules
            .iter()
            .find(|(fragment, _)| message.contains(fragment.as_str()))
            .map(|(_, answer)| *answer)
            .or(self.fallback)
            .unwrap_or(default)
    }
}

#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl UrlOpener for RecordingOpener {
    async fn open(&self, url: &str) {
        self.opened.lock().push(url.to_string());
    }
}

pub fn quiet() -> Output {
    Output::new(OutputMode::Quiet)
}

pub fn context<'a>(
    fleet: &'a FakeFleet,
    gate: &'a ScriptedGate,
    opener: &'a RecordingOpener,
    output: &'a Output,
) -> TransitionContext<'a> {
    TransitionContext::new(fleet, gate, opener, output)
}
