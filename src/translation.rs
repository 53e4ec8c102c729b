use std::borrow::Cow;

/// Numbered placeholder syntax understood by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ...
    Postgres,
    /// `?1`, `?2`, ...
    Sqlite,
}

impl PlaceholderStyle {
    #[must_use]
    pub fn placeholder(self, number: usize) -> String {
        match self {
            PlaceholderStyle::Postgres => format!("${number}"),
            PlaceholderStyle::Sqlite => format!("?{number}"),
        }
    }
}

/// How to resolve translation for a call relative to the pool default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationMode {
    #[default]
    PoolDefault,
    ForceOn,
    ForceOff,
}

impl TranslationMode {
    #[must_use]
    pub fn resolve(self, pool_default: bool) -> bool {
        match self {
            TranslationMode::PoolDefault => pool_default,
            TranslationMode::ForceOn => true,
            TranslationMode::ForceOff => false,
        }
    }
}

/// Per-call options for query/dml paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    pub translation: TranslationMode,
}

impl QueryOptions {
    #[must_use]
    pub fn with_translation(mut self, translation: TranslationMode) -> Self {
        self.translation = translation;
        self
    }
}

/// Translate placeholders between Postgres-style `$N` and SQLite-style `?N`.
///
/// Placeholders inside string literals, quoted identifiers, comments and dollar-quoted blocks
/// are left alone. Returns a borrowed `Cow` when nothing changes.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(sql);
    }
    rewrite_placeholders(sql, |found, number| {
        (found != target).then(|| target.placeholder(number))
    })
}

/// Rewrite every numbered placeholder (either style) into `target`, adding `offset` to its
/// number.
///
/// Used to append a caller's `WHERE` predicate, numbered from 1, after placeholders the
/// repository generated itself. A placeholder whose shifted number would overflow is left as
/// written.
#[must_use]
pub fn renumber_placeholders(sql: &str, target: PlaceholderStyle, offset: usize) -> Cow<'_, str> {
    rewrite_placeholders(sql, |found, number| {
        let shifted = number.checked_add(offset)?;
        (found != target || offset != 0).then(|| target.placeholder(shifted))
    })
}

/// Highest placeholder number referenced by `sql`, or 0 when there are none.
#[must_use]
pub fn max_placeholder(sql: &str) -> usize {
    let mut max = 0;
    let _ = rewrite_placeholders(sql, |_, number| {
        max = max.max(number);
        None
    });
    max
}

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

fn rewrite_placeholders<F>(sql: &str, mut replace: F) -> Cow<'_, str>
where
    F: FnMut(PlaceholderStyle, usize) -> Option<String>,
{
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' | b'?' => {
                    if b == b'$'
                        && let Some((tag, tag_end)) = try_start_dollar_quote(bytes, idx)
                    {
                        state = State::DollarQuoted(tag);
                        idx = tag_end;
                    } else if let Some((digits_end, number)) = scan_number(bytes, idx + 1) {
                        let found = if b == b'$' {
                            PlaceholderStyle::Postgres
                        } else {
                            PlaceholderStyle::Sqlite
                        };
                        if let Some(replacement) = replace(found, number) {
                            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
                            buf.push_str(&sql[copied_to..idx]);
                            buf.push_str(&replacement);
                            copied_to = digits_end;
                        }
                        idx = digits_end - 1;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && closes_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

fn scan_number(bytes: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        return None;
    }
    std::str::from_utf8(&bytes[start..idx])
        .ok()
        .and_then(|digits| digits.parse().ok())
        .map(|number| (idx, number))
}

// `$tag$` or `$$`; a tag never starts with a digit, so `$1` is not a quote opener.
fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    if bytes.get(start + 1).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }
    if idx < bytes.len() {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

fn closes_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx + 1..end) == Some(tag.as_bytes()) && bytes.get(end) == Some(&b'$')
}
