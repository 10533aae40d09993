// src/i18n.rs
//
// Lightweight runtime i18n:
// - Strings live in assets/i18n/<lang>.json ({ "key": "value" })
// - English is compiled in and always serves as the fallback table
// - Lookup: tr("key") / tr_with("key", [("name", "...")]) with {name} placeholders
//
// Language selection:
// - CLI: --lang <code> (en, zh-Hans)
// - Env: GLOBE_LANG
// - Default: en

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

const FALLBACK_LANG: &str = "en";
const BUILTIN_EN: &str = include_str!("../assets/i18n/en.json");

#[derive(Debug, Clone)]
pub struct I18n {
    pub lang: String,
    map: HashMap<String, String>,
    fallback_map: HashMap<String, String>,
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

fn load_json_map(path: &Path) -> Option<HashMap<String, String>> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Find assets/i18n/<lang>.json next to the executable, then in the
/// working directory.
fn find_lang_file(lang: &str) -> Option<PathBuf> {
    let file = format!("{}.json", lang);

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join("i18n").join(&file);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join("i18n").join(&file);
    p.exists().then_some(p)
}

fn builtin_fallback() -> HashMap<String, String> {
    serde_json::from_str(BUILTIN_EN).unwrap_or_default()
}

fn load_lang(lang: &str) -> HashMap<String, String> {
    find_lang_file(lang)
        .and_then(|p| load_json_map(&p))
        .unwrap_or_default()
}

/// Initialize global i18n. Safe to call again to switch language.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();
    let map = if lang == FALLBACK_LANG {
        HashMap::new()
    } else {
        load_lang(&lang)
    };

    let i = I18n {
        lang,
        map,
        fallback_map: builtin_fallback(),
    };

    if let Some(lock) = I18N.get() {
        if let Ok(mut w) = lock.write() {
            *w = i;
        }
    } else {
        let _ = I18N.set(RwLock::new(i));
    }
}

fn get_locked() -> Option<std::sync::RwLockReadGuard<'static, I18n>> {
    I18N.get().and_then(|l| l.read().ok())
}

/// Localized text by key; the key itself when no table has it.
pub fn tr(key: &str) -> String {
    let Some(i) = get_locked() else {
        return key.to_string();
    };

    i.map
        .get(key)
        .or_else(|| i.fallback_map.get(key))
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// Localized text with `{name}` placeholders substituted.
/// Any placeholder not provided is kept as-is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    let mut s = tr(key);
    for (k, v) in args {
        let placeholder = format!("{{{}}}", k);
        s = s.replace(&placeholder, v);
    }
    s
}

/// Choose language from CLI/env.
pub fn resolve_lang_from_args() -> String {
    let mut it = std::env::args();
    while let Some(a) = it.next() {
        if a == "--lang" {
            if let Some(v) = it.next() {
                return v;
            }
        }
    }

    if let Ok(v) = std::env::var("GLOBE_LANG") {
        if !v.trim().is_empty() {
            return v;
        }
    }

    FALLBACK_LANG.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_parses_and_substitutes() {
        init("en");
        assert_eq!(tr("app.title"), "Globe Viewer");
        assert_eq!(
            tr_with("log.map_loaded", &[("name", "earth.jpg".into()), ("w", "4".into()), ("h", "2".into())]),
            "Loaded map earth.jpg (4x2)"
        );
        assert_eq!(tr("no.such.key"), "no.such.key");
    }
}
