//! In-memory stand-in for the Bitwarden CLI
//!
//! [`ScriptedRunner`] implements [`ProcessRunner`] by emulating the `bw`
//! commands the bridge uses against an in-memory vault. It records every
//! request, can inject failures per subcommand and can delay responses, so
//! service behaviour is testable without the real binary or a server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use crate::bitwarden::{PASSWORD_ENV, SESSION_ENV};
use crate::error::{VaultError, VaultResult};
use crate::process::{ProcessOutput, ProcessRequest, ProcessRunner, timeout_secs};

/// Account the runner accepts unless configured otherwise
pub const DEFAULT_EMAIL: &str = "a@b.com";

/// Master password the runner accepts unless configured otherwise
pub const DEFAULT_PASSWORD: &str = "hunter2";

/// Version printed by `bw --version`
pub const CLI_VERSION: &str = "2025.1.3";

const NOT_LOGGED_IN: &str = "You are not logged in.";
const LOCKED: &str = "Vault is locked.";
const NOT_FOUND: &str = "Not found.";

/// Failure injected for a subcommand
#[derive(Debug, Clone)]
pub enum ScriptedFailure {
    /// The CLI exits with code 1 and prints this text on stderr
    Exit(String),
    /// The invocation times out
    Timeout,
    /// The executable cannot be started
    Spawn,
}

#[derive(Debug)]
struct VaultState {
    email: String,
    password: String,
    two_factor: Option<String>,
    logged_in: bool,
    session_key: Option<String>,
    keys_issued: usize,
    server_url: String,
    items: Vec<Value>,
    next_id: usize,
    revision: i64,
    failures: HashMap<String, ScriptedFailure>,
    calls: Vec<ProcessRequest>,
}

/// Scripted fake of the `bw` executable
#[derive(Debug)]
pub struct ScriptedRunner {
    state: Mutex<VaultState>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp(offset_secs: i64) -> String {
    let base: DateTime<Utc> = Utc
        .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    (base + chrono::Duration::seconds(offset_secs))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn id_of(item: &Value) -> Option<&str> {
    item.get("id").and_then(Value::as_str)
}

fn is_deleted(item: &Value) -> bool {
    item.get("deletedDate").is_some_and(|d| !d.is_null())
}

fn generated_password(args: &[&str]) -> String {
    let mut pool = String::new();
    for (flag, chars) in [
        ("-u", "ABCDEFGHJKLMNPQRSTUVWXYZ"),
        ("-l", "abcdefghijkmnopqrstuvwxyz"),
        ("-n", "23456789"),
        ("-s", "!@#$%^&*"),
    ] {
        if args.contains(&flag) {
            pool.push_str(chars);
        }
    }
    let length = args
        .iter()
        .position(|a| *a == "--length")
        .and_then(|i| args.get(i + 1))
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(14);
    let pool: Vec<char> = pool.chars().collect();
    if pool.is_empty() {
        return String::new();
    }
    (0..length).map(|i| pool[(i * 7) % pool.len()]).collect()
}

impl ScriptedRunner {
    /// Creates a runner with the default account, logged out, and no items
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(VaultState {
                email: DEFAULT_EMAIL.to_string(),
                password: DEFAULT_PASSWORD.to_string(),
                two_factor: None,
                logged_in: false,
                session_key: None,
                keys_issued: 0,
                server_url: "https://vault.bitwarden.com".to_string(),
                items: Vec::new(),
                next_id: 1,
                revision: 0,
                failures: HashMap::new(),
                calls: Vec::new(),
            }),
            delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VaultState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requires this two-step code on login
    #[must_use]
    pub fn with_two_factor(self, code: impl Into<String>) -> Self {
        self.lock().two_factor = Some(code.into());
        self
    }

    /// Replaces the accepted account
    #[must_use]
    pub fn with_account(self, email: impl Into<String>, password: impl Into<String>) -> Self {
        {
            let mut state = self.lock();
            state.email = email.into();
            state.password = password.into();
        }
        self
    }

    /// Starts with the account logged in but the vault locked
    #[must_use]
    pub fn with_logged_in_account(self) -> Self {
        self.lock().logged_in = true;
        self
    }

    /// Adds a raw item; an id and timestamps are assigned if missing
    #[must_use]
    pub fn with_item(self, item: Value) -> Self {
        {
            let mut state = self.lock();
            let item = state.stamp_new(item);
            state.items.push(item);
        }
        self
    }

    /// Delays every response, to let calls overlap
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes every call of `subcommand` fail until cleared
    pub fn fail_command(&self, subcommand: &str, failure: ScriptedFailure) {
        self.lock().failures.insert(subcommand.to_string(), failure);
    }

    /// Removes an injected failure
    pub fn clear_failure(&self, subcommand: &str) {
        self.lock().failures.remove(subcommand);
    }

    /// Every request received so far
    #[must_use]
    pub fn calls(&self) -> Vec<ProcessRequest> {
        self.lock().calls.clone()
    }

    /// Number of requests whose first argument is `subcommand`
    #[must_use]
    pub fn count_calls(&self, subcommand: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.subcommand() == subcommand)
            .count()
    }

    /// Highest number of requests that were being handled at once
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Whether the CLI side has an account logged in
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.lock().logged_in
    }

    /// Server configured through `bw config server`
    #[must_use]
    pub fn server_url(&self) -> String {
        self.lock().server_url.clone()
    }

    /// Raw copy of an item as the fake vault stores it
    #[must_use]
    pub fn raw_item(&self, id: &str) -> Option<Value> {
        self.lock()
            .items
            .iter()
            .find(|item| id_of(item) == Some(id))
            .cloned()
    }

    /// Number of items in the fake vault, trashed included
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.lock().items.len()
    }
}

impl VaultState {
    fn next_timestamp(&mut self) -> String {
        self.revision += 1;
        timestamp(self.revision)
    }

    fn stamp_new(&mut self, mut item: Value) -> Value {
        let id = format!("item-{}", self.next_id);
        self.next_id += 1;
        let now = self.next_timestamp();
        if let Value::Object(map) = &mut item {
            if map.get("id").is_none_or(Value::is_null) {
                map.insert("id".to_string(), Value::String(id));
            }
            for key in ["creationDate", "revisionDate"] {
                if map.get(key).is_none_or(Value::is_null) {
                    map.insert(key.to_string(), Value::String(now.clone()));
                }
            }
            map.entry("deletedDate").or_insert(Value::Null);
        }
        item
    }

    fn issue_key(&mut self) -> String {
        self.keys_issued += 1;
        let key = format!("session-key-{}", self.keys_issued);
        self.session_key = Some(key.clone());
        key
    }

    fn check_session(&self, request: &ProcessRequest) -> Result<(), ProcessOutput> {
        if !self.logged_in {
            return Err(ProcessOutput::failed(1, NOT_LOGGED_IN));
        }
        match (&self.session_key, request.env_value(SESSION_ENV)) {
            (Some(key), Some(given)) if key == given => Ok(()),
            _ => Err(ProcessOutput::failed(1, LOCKED)),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| id_of(item) == Some(id))
    }

    fn decode_stdin(request: &ProcessRequest) -> Option<Value> {
        let encoded = request.stdin.as_ref()?;
        let bytes = STANDARD.decode(encoded.expose_secret().trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn handle(&mut self, request: &ProcessRequest) -> ProcessOutput {
        let args: Vec<&str> = request
            .args
            .iter()
            .map(String::as_str)
            .filter(|a| !matches!(*a, "--raw" | "--nointeraction"))
            .collect();

        match args.as_slice() {
            ["--version"] => ProcessOutput::ok(format!("{CLI_VERSION}\n")),
            ["status", ..] => self.status(request),
            ["login", email, rest @ ..] => self.login(request, email, rest),
            ["unlock", ..] => self.unlock(request),
            ["logout", ..] => {
                if !self.logged_in {
                    return ProcessOutput::failed(1, NOT_LOGGED_IN);
                }
                self.logged_in = false;
                self.session_key = None;
                ProcessOutput::ok("You have logged out.")
            }
            ["config", "server", url] => {
                if self.logged_in {
                    return ProcessOutput::failed(1, "Logout required before server config update.");
                }
                self.server_url = (*url).to_string();
                ProcessOutput::ok("Saved setting `config`.")
            }
            _ => match self.check_session(request) {
                Ok(()) => self.vault_command(request, &args),
                Err(output) => output,
            },
        }
    }

    fn status(&self, request: &ProcessRequest) -> ProcessOutput {
        let status = if !self.logged_in {
            "unauthenticated"
        } else if self.check_session(request).is_ok() {
            "unlocked"
        } else {
            "locked"
        };
        let email = if self.logged_in {
            Value::String(self.email.clone())
        } else {
            Value::Null
        };
        ProcessOutput::ok(
            json!({
                "serverUrl": self.server_url,
                "lastSync": null,
                "userEmail": email,
                "status": status,
            })
            .to_string(),
        )
    }

    fn login(&mut self, request: &ProcessRequest, email: &str, rest: &[&str]) -> ProcessOutput {
        if self.logged_in {
            return ProcessOutput::failed(1, format!("You are already logged in as {}.", self.email));
        }
        if email != self.email || request.env_value(PASSWORD_ENV) != Some(self.password.as_str()) {
            return ProcessOutput::failed(1, "Username or password is incorrect. Try again.");
        }
        if let Some(expected) = &self.two_factor {
            let code = rest
                .iter()
                .position(|a| *a == "--code")
                .and_then(|i| rest.get(i + 1));
            match code {
                None => return ProcessOutput::failed(1, "No provider selected."),
                Some(code) if *code != expected.as_str() => {
                    return ProcessOutput::failed(1, "Two-step token is invalid. Try again.");
                }
                Some(_) => {}
            }
        }
        self.logged_in = true;
        ProcessOutput::ok(self.issue_key())
    }

    fn unlock(&mut self, request: &ProcessRequest) -> ProcessOutput {
        if !self.logged_in {
            return ProcessOutput::failed(1, NOT_LOGGED_IN);
        }
        if request.env_value(PASSWORD_ENV) != Some(self.password.as_str()) {
            return ProcessOutput::failed(1, "Invalid master password.");
        }
        ProcessOutput::ok(self.issue_key())
    }

    fn vault_command(&mut self, request: &ProcessRequest, args: &[&str]) -> ProcessOutput {
        match args {
            ["sync", ..] => ProcessOutput::ok("Syncing complete."),
            ["list", "items", rest @ ..] => {
                let trash = rest.contains(&"--trash");
                let items: Vec<Value> = self
                    .items
                    .iter()
                    .filter(|item| is_deleted(item) == trash)
                    .cloned()
                    .collect();
                ProcessOutput::ok(Value::Array(items).to_string())
            }
            ["get", "item", id] => match self.position(id) {
                Some(pos) => ProcessOutput::ok(self.items[pos].to_string()),
                None => ProcessOutput::failed(1, NOT_FOUND),
            },
            ["create", "item"] => {
                let Some(payload) = Self::decode_stdin(request) else {
                    return ProcessOutput::failed(1, "Error parsing the encoded request data.");
                };
                let mut item = payload;
                if let Value::Object(map) = &mut item {
                    map.remove("id");
                    map.insert("creationDate".to_string(), Value::Null);
                    map.insert("revisionDate".to_string(), Value::Null);
                    map.insert("deletedDate".to_string(), Value::Null);
                }
                let item = self.stamp_new(item);
                self.items.push(item.clone());
                ProcessOutput::ok(item.to_string())
            }
            ["edit", "item", id] => {
                let Some(pos) = self.position(id) else {
                    return ProcessOutput::failed(1, NOT_FOUND);
                };
                let Some(Value::Object(mut map)) = Self::decode_stdin(request) else {
                    return ProcessOutput::failed(1, "Error parsing the encoded request data.");
                };
                let existing = &self.items[pos];
                for key in ["id", "creationDate", "deletedDate"] {
                    map.insert(key.to_string(), existing.get(key).cloned().unwrap_or(Value::Null));
                }
                map.insert("revisionDate".to_string(), Value::String(self.next_timestamp()));
                self.items[pos] = Value::Object(map);
                ProcessOutput::ok(self.items[pos].to_string())
            }
            ["delete", "item", id, rest @ ..] => {
                let Some(pos) = self.position(id) else {
                    return ProcessOutput::failed(1, NOT_FOUND);
                };
                if rest.contains(&"--permanent") {
                    self.items.remove(pos);
                } else if !is_deleted(&self.items[pos]) {
                    let now = self.next_timestamp();
                    self.items[pos]["deletedDate"] = Value::String(now);
                }
                ProcessOutput::ok("")
            }
            ["restore", "item", id] => {
                let Some(pos) = self.position(id) else {
                    return ProcessOutput::failed(1, NOT_FOUND);
                };
                self.items[pos]["deletedDate"] = Value::Null;
                ProcessOutput::ok("")
            }
            ["generate", rest @ ..] => ProcessOutput::ok(generated_password(rest)),
            _ => ProcessOutput::failed(1, format!("Invalid command: {}", args.join(" "))),
        }
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, request: ProcessRequest) -> VaultResult<ProcessOutput> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut state = self.lock();
            state.calls.push(request.clone());
            let failure = state.failures.get(request.subcommand()).cloned();
            match failure {
                Some(ScriptedFailure::Exit(text)) => Ok(ProcessOutput::failed(1, text)),
                Some(ScriptedFailure::Timeout) => {
                    Err(VaultError::ProcessTimeout(timeout_secs(request.timeout)))
                }
                Some(ScriptedFailure::Spawn) => Err(VaultError::ProcessSpawn {
                    program: "bw".to_string(),
                    reason: "No such file or directory (os error 2)".to_string(),
                }),
                None => Ok(state.handle(&request)),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn program(&self) -> String {
        "bw (scripted)".to_string()
    }
}
