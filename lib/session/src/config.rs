//! Per-session settings.

use serde::Deserialize;
use std::time::Duration;

/// Settings of one huddle session, loaded from the `SESSION__*` environment.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Title of the space; also used in the welcome and reminder texts.
    #[serde(default = "default_title")]
    pub title: String,

    /// Contacts to invite, as a comma-separated list of email addresses.
    #[serde(default)]
    pub contacts: String,

    /// Seconds to wait after placing the call before checking who joined.
    #[serde(default = "default_wait_seconds")]
    pub join_wait_seconds: u64,

    /// Seconds to wait after reminding before tearing the session down.
    #[serde(default = "default_wait_seconds")]
    pub reminder_wait_seconds: u64,

    /// Extra attempts at reading the space's call address.
    #[serde(default)]
    pub lookup_retries: u32,

    /// Delay between call address attempts, in milliseconds.
    #[serde(default = "default_lookup_retry_delay_ms")]
    pub lookup_retry_delay_ms: u64,

    /// Welcome text template; `{title}` is replaced with the session title.
    #[serde(default)]
    pub welcome_text: Option<String>,

    /// Reminder text template; `{title}` is replaced with the session title.
    #[serde(default)]
    pub reminder_text: Option<String>,
}

fn default_title() -> String {
    "unnamed space".to_string()
}

fn default_wait_seconds() -> u64 {
    20
}

fn default_lookup_retry_delay_ms() -> u64 {
    1000
}

const DEFAULT_WELCOME: &str = "Welcome to the {title} huddle space";
const DEFAULT_REMINDER: &str = "Hey, can you join our call in the {title} space";

impl SessionSettings {
    /// Creates settings with defaults for everything but title and contacts.
    #[must_use]
    pub fn new(title: impl Into<String>, contacts: &[&str]) -> Self {
        Self {
            title: title.into(),
            contacts: contacts.join(","),
            join_wait_seconds: default_wait_seconds(),
            reminder_wait_seconds: default_wait_seconds(),
            lookup_retries: 0,
            lookup_retry_delay_ms: default_lookup_retry_delay_ms(),
            welcome_text: None,
            reminder_text: None,
        }
    }

    /// Overrides both waits.
    #[must_use]
    pub fn with_waits(mut self, join_wait_seconds: u64, reminder_wait_seconds: u64) -> Self {
        self.join_wait_seconds = join_wait_seconds;
        self.reminder_wait_seconds = reminder_wait_seconds;
        self
    }

    /// Returns the contacts in invitation order.
    ///
    /// Blank entries are kept so resolution can reject them by position.
    #[must_use]
    pub fn contacts(&self) -> Vec<String> {
        if self.contacts.trim().is_empty() {
            return Vec::new();
        }
        self.contacts
            .split(',')
            .map(|c| c.trim().to_string())
            .collect()
    }

    /// Duration of the wait before the join check.
    #[must_use]
    pub fn join_wait(&self) -> Duration {
        Duration::from_secs(self.join_wait_seconds)
    }

    /// Duration of the wait after reminding.
    #[must_use]
    pub fn reminder_wait(&self) -> Duration {
        Duration::from_secs(self.reminder_wait_seconds)
    }

    /// Delay between call address attempts.
    #[must_use]
    pub fn lookup_retry_delay(&self) -> Duration {
        Duration::from_millis(self.lookup_retry_delay_ms)
    }

    /// The welcome text posted into the space.
    #[must_use]
    pub fn welcome_message(&self) -> String {
        self.render(self.welcome_text.as_deref().unwrap_or(DEFAULT_WELCOME))
    }

    /// The reminder text sent to participants who have not joined.
    #[must_use]
    pub fn reminder_message(&self) -> String {
        self.render(self.reminder_text.as_deref().unwrap_or(DEFAULT_REMINDER))
    }

    fn render(&self, template: &str) -> String {
        template.replace("{title}", &self.title)
    }
}
