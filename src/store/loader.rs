use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::locale::Locale;
use crate::store::Catalog;
use crate::store::source::TranslationSource;

/// A `.properties` line that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    pub line: usize,
    pub message: String,
}

/// Parse the flat `key=value` property format
///
/// Supported syntax:
/// - `#` and `!` start comment lines; blank lines are ignored
/// - the key ends at the first unescaped `=`, `:` or whitespace
/// - a trailing backslash continues the entry on the next line
/// - escapes: `\n`, `\t`, `\r`, `\f`, `\uXXXX`; any other escaped
///   character stands for itself
///
/// # Arguments
/// * `content` - The file contents
///
/// # Returns
/// The entries by key; a repeated key keeps its last value.
pub fn parse_properties(content: &str) -> Result<HashMap<String, String>, MalformedLine> {
    let mut entries = HashMap::new();
    let mut lines = content.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let first_line = index + 1;
        let trimmed = raw.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        // Join continuation lines into one logical line
        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let key = unescape(key).map_err(|message| MalformedLine {
            line: first_line,
            message,
        })?;
        let value = unescape(value).map_err(|message| MalformedLine {
            line: first_line,
            message,
        })?;
        entries.insert(key, value);
    }

    Ok(entries)
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (offset, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = offset;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\u{c}']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\u{c}']);
    }
    (key, rest)
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let code = hex_escape(&mut chars)?;
                let code = if (0xD800..=0xDBFF).contains(&code) {
                    low_surrogate(&mut chars)
                        .map(|low| 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00))
                        .ok_or_else(|| format!("Unpaired surrogate \\u{:04x}", code))?
                } else {
                    code
                };
                let decoded = char::from_u32(code)
                    .ok_or_else(|| format!("Invalid character code \\u{:04x}", code))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// Read the four hex digits of a `\uXXXX` escape.
fn hex_escape(chars: &mut std::str::Chars<'_>) -> Result<u32, String> {
    let digits: String = chars.by_ref().take(4).collect();
    u32::from_str_radix(&digits, 16)
        .ok()
        .filter(|_| digits.len() == 4 && digits.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| format!("Malformed \\uXXXX escape: \\u{}", digits))
}

/// Consume a `\uXXXX` low surrogate if one comes next.
fn low_surrogate(chars: &mut std::str::Chars<'_>) -> Option<u32> {
    let mut lookahead = chars.clone();
    if lookahead.next() != Some('\\') || lookahead.next() != Some('u') {
        return None;
    }
    let low = hex_escape(&mut lookahead).ok()?;
    if !(0xDC00..=0xDFFF).contains(&low) {
        return None;
    }
    *chars = lookahead;
    Some(low)
}

/// List `*.<extension>` files in `dir`, with the locale named by each file stem.
///
/// For example: `en.properties` -> locale `"en"`, `en-US.json` -> locale `"en_us"`
async fn locale_files(dir: &Path, extension: &str) -> StoreResult<Vec<(Locale, PathBuf)>> {
    let metadata = tokio::fs::metadata(dir)
        .await
        .map_err(|_| StoreError::MissingDirectory(dir.to_path_buf()))?;
    if !metadata.is_dir() {
        return Err(StoreError::NotADirectory(dir.to_path_buf()));
    }

    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| StoreError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| StoreError::Io {
        path: dir.to_path_buf(),
        source: e,
    })? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }

        let locale = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(Locale::new)
            .filter(|locale| !locale.is_empty())
            .ok_or_else(|| StoreError::InvalidFileName(path.clone()))?;

        files.push((locale, path));
    }

    if files.is_empty() {
        warn!(dir = %dir.display(), extension, "no translation files found");
    }

    Ok(files)
}

async fn read_file(path: &Path) -> StoreResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Read a `.properties` file: UTF-8, or ISO-8859-1 when it is not valid UTF-8.
async fn read_properties_file(path: &Path) -> StoreResult<String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(decode_properties(bytes, path))
}

fn decode_properties(bytes: Vec<u8>, path: &Path) -> String {
    match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), "not UTF-8, reading as ISO-8859-1");
            e.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

/// A directory of `<locale>.properties` files, one per locale.
///
/// Files are read as UTF-8; a file that is not valid UTF-8 is read as
/// ISO-8859-1 instead.
#[derive(Debug, Clone)]
pub struct PropertiesSource {
    dir: PathBuf,
}

impl PropertiesSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PropertiesSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl TranslationSource for PropertiesSource {
    async fn load(&self) -> StoreResult<Catalog> {
        let mut catalog = Catalog::new();
        for (locale, path) in locale_files(&self.dir, "properties").await? {
            let content = read_properties_file(&path).await?;
            let messages = parse_properties(&content).map_err(|e| StoreError::Malformed {
                path: path.clone(),
                line: e.line,
                message: e.message,
            })?;
            catalog.with_messages_for_locale(locale, messages);
        }
        Ok(catalog)
    }

    fn source_name(&self) -> &str {
        "properties"
    }
}

/// A directory of `<locale>.json` message files
///
/// Each file should have the following structure:
/// ```json
/// {
///     "@metadata": { ... },  // Ignored
///     "message-key": "message text",
///     "list-key": ["first line", "second line"]
/// }
/// ```
/// Arrays of strings become list translations joined with `\n`.
#[derive(Debug, Clone)]
pub struct JsonSource {
    dir: PathBuf,
}

impl JsonSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Extract messages from one JSON document, skipping `@`-prefixed keys.
pub fn messages_from_json(path: &Path, content: &str) -> StoreResult<HashMap<String, String>> {
    let json: Value = serde_json::from_str(content).map_err(|e| StoreError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;

    let obj = json.as_object().ok_or_else(|| StoreError::Malformed {
        path: path.to_path_buf(),
        line: 1,
        message: "root must be an object".to_string(),
    })?;

    let mut messages = HashMap::new();
    for (key, value) in obj {
        if key.starts_with('@') {
            continue;
        }

        match value {
            Value::String(message) => {
                messages.insert(key.clone(), message.clone());
            }
            Value::Array(items) if items.iter().all(Value::is_string) => {
                let lines: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                messages.insert(key.clone(), lines.join("\n"));
            }
            _ => warn!(key = %key, path = %path.display(), "message is not a string, skipping"),
        }
    }

    Ok(messages)
}

#[async_trait]
impl TranslationSource for JsonSource {
    async fn load(&self) -> StoreResult<Catalog> {
        let mut catalog = Catalog::new();
        for (locale, path) in locale_files(&self.dir, "json").await? {
            let content = read_file(&path).await?;
            catalog.with_messages_for_locale(locale, messages_from_json(&path, &content)?);
        }
        Ok(catalog)
    }

    fn source_name(&self) -> &str {
        "json"
    }
}
