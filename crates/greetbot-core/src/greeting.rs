//! Greeting text storage: one process-wide default plus per-chat overrides.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::warn;

use crate::{domain::ChatId, Result};

const BUILTIN_DEFAULT: &str = "Hello";
const DEFAULT_FILE: &str = "default.md";

/// Holds the default greeting and any per-chat custom greetings.
///
/// Custom texts persist one file per chat (`chat<ID>.md`, overwritten
/// wholesale); the write is best-effort and the in-memory map stays
/// authoritative for the process lifetime. An empty custom text falls back
/// to the default.
pub struct GreetingStore {
    dir: Option<PathBuf>,
    default_text: String,
    custom: Mutex<HashMap<i64, String>>,
}

impl GreetingStore {
    /// Scan `dir`: `default.md` overrides the built-in default text,
    /// `chat<ID>.md` loads a per-chat greeting, anything else is skipped
    /// with a warning. An unreadable matching file aborts startup.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut default_text = BUILTIN_DEFAULT.to_string();
        let mut custom = HashMap::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();

            if name == DEFAULT_FILE {
                default_text = fs::read_to_string(entry.path())?;
                continue;
            }
            let Some(chat_id) = parse_chat_file_name(&name) else {
                warn!("can not extract chat id from file name {name}, skipping");
                continue;
            };
            custom.insert(chat_id, fs::read_to_string(entry.path())?);
        }

        Ok(Self {
            dir: Some(dir.to_path_buf()),
            default_text,
            custom: Mutex::new(custom),
        })
    }

    /// A store without a backing directory; nothing is persisted.
    pub fn in_memory(default_text: impl Into<String>) -> Self {
        Self {
            dir: None,
            default_text: default_text.into(),
            custom: Mutex::new(HashMap::new()),
        }
    }

    /// The chat's custom greeting if set and non-empty, else the default.
    pub fn get(&self, chat_id: ChatId) -> String {
        self.custom
            .lock()
            .expect("greeting map poisoned")
            .get(&chat_id.0)
            .filter(|text| !text.is_empty())
            .cloned()
            .unwrap_or_else(|| self.default_text.clone())
    }

    pub fn default_text(&self) -> &str {
        &self.default_text
    }

    /// Set the chat's greeting and persist it best-effort.
    pub fn set(&self, chat_id: ChatId, text: String) {
        self.custom
            .lock()
            .expect("greeting map poisoned")
            .insert(chat_id.0, text.clone());

        let Some(dir) = &self.dir else {
            return;
        };
        let path = dir.join(format!("chat{}.md", chat_id.0));
        if let Err(e) = fs::write(&path, &text) {
            warn!("failed to save greeting to {}: {e}", path.display());
        }
    }
}

fn parse_chat_file_name(name: &str) -> Option<i64> {
    name.strip_prefix("chat")?
        .strip_suffix(".md")?
        .parse()
        .ok()
}
