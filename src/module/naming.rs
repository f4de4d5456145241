//! Module identifier arithmetic: plugin prefixes, aliases, relative paths and file suffixes.

use std::collections::BTreeMap;

/// Pseudo-dependencies injected by the executor instead of resolved from the registry.
pub const BUILTIN_DEPS: [&str; 5] = ["require", "exports", "module", "host", "finish"];

/// Plugin prefix that requests a fresh, independently executed copy of a module.
pub const RESET_PLUGIN: &str = "new";

pub fn is_builtin(id: &str) -> bool {
    BUILTIN_DEPS.contains(&id)
}

/// Split `plugin!id` into its parts. Ids without a `!` have no plugin.
pub fn split_plugin(raw: &str) -> (Option<&str>, &str) {
    match raw.rfind('!') {
        Some(i) if i + 1 < raw.len() => (Some(&raw[..i]), &raw[i + 1..]),
        _ => (None, raw),
    }
}

/// Substitute a leading `alias/` segment. Unknown first segments are kept as-is.
pub fn realname(id: &str, aliases: &BTreeMap<String, String>) -> String {
    if aliases.is_empty() {
        return id.to_string();
    }
    let Some(slash) = id.find('/') else {
        return id.to_string();
    };
    let head = &id[..slash];
    let is_word = !head.is_empty()
        && head
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !is_word {
        return id.to_string();
    }
    match aliases.get(head) {
        Some(target) => format!("{target}{}", &id[slash + 1..]),
        None => id.to_string(),
    }
}

/// Whether `id` is written relative to the referencing file (`./x`, `../x`).
pub fn is_relative(id: &str) -> bool {
    let dots = id.chars().take_while(|c| *c == '.').count();
    dots > 0 && id[dots..].starts_with('/') && id.len() > dots + 1
}

/// Resolve `id` against the directory of `file_url` when it is relative, then normalize.
pub fn basename(id: &str, file_url: Option<&str>) -> String {
    if is_relative(id) {
        let dir = dirname(file_url.unwrap_or(""));
        resolve_name(&format!("{dir}{id}"))
    } else {
        resolve_name(id)
    }
}

/// Everything up to and including the last `/`.
pub fn dirname(url: &str) -> &str {
    match url.rfind('/') {
        Some(i) => &url[..=i],
        None => "",
    }
}

/// Drop `.` segments, collapse `seg/..` pairs and empty segments. Leading `..` that
/// cannot be collapsed are kept.
pub fn resolve_name(url: &str) -> String {
    let absolute = url.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for part in url.split('/') {
        match part {
            "" | "." => {}
            ".." => match out.last() {
                Some(last) if *last != ".." => {
                    out.pop();
                }
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    let mut joined = out.join("/");
    if url.ends_with('/') && !joined.is_empty() {
        joined.push('/');
    }
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Append `.{suffix}` unless the id already names a script or JSON file.
pub fn filesuffix(id: &str, suffix: &str) -> String {
    let dotted = format!(".{suffix}");
    if id.ends_with(".js") || id.ends_with(".json") || id.ends_with(&dotted) {
        id.to_string()
    } else {
        format!("{id}{dotted}")
    }
}

/// Packed file naming: `x.js -> x_pack.js`, `x_src.js -> x_combo.js`.
pub fn namesuffix(file: &str) -> String {
    let name_start = file.rfind('/').map_or(0, |i| i + 1);
    let Some(dot) = file[name_start..].rfind('.').map(|i| name_start + i) else {
        return file.to_string();
    };
    let ext = &file[dot..];
    let valid_ext = ext.len() > 1
        && ext[1..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_ext || dot == 0 {
        return file.to_string();
    }
    let stem = &file[..dot];
    let skip = stem.chars().next().map_or(0, char::len_utf8);
    match stem[skip..].find("_src").map(|i| i + skip) {
        Some(src) => format!("{}_combo{ext}", &stem[..src]),
        None => format!("{stem}_pack{ext}"),
    }
}

/// `scheme://` urls bypass the base url.
pub fn has_scheme(url: &str) -> bool {
    match url.find("://") {
        Some(i) if i > 0 => url[..i]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Replace `{alias}` placeholders in a remote url; unknown aliases become empty.
pub fn expand_url_aliases(url: &str, aliases: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(url.len());
    let mut rest = url;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        let key = &rest[open + 1..close];
        let is_word = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        out.push_str(&rest[..open]);
        if is_word {
            out.push_str(aliases.get(key).map(String::as_str).unwrap_or(""));
        } else {
            out.push_str(&rest[open..=close]);
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "../../tests/unit/module/naming.rs"]
mod tests;
