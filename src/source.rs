//! Source text lookup for assertion diagnostics.
//!
//! When enabled, an assertion records the source text of its operands next to
//! their rendered values. The text is recovered by reading the file named in
//! the assertion's call site location and scanning forward from there.
//!
//! Files are read once and shared: [`SourceCache`] memoizes every file behind a
//! mutex, so suites running on different threads can ask for the same file.
//! Nothing here influences pass/fail results, lookup problems only drop the
//! optional source fields.

use std::{
    collections::HashMap,
    fs,
    ops::Range,
    panic::Location,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tracing::{debug, warn};

use crate::error::SourceError;

/// A file split into lines.
#[derive(Debug)]
pub struct SourceFile {
    content: String,
    lines: Vec<Range<usize>>,
}

impl SourceFile {
    pub fn new(content: String) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        let bytes = content.as_bytes();
        let mut index = 0;
        while index < bytes.len() {
            match bytes[index] {
                b'\n' => {
                    lines.push(start..index);
                    start = index + 1;
                }
                b'\r' => {
                    lines.push(start..index);
                    if bytes.get(index + 1) == Some(&b'\n') {
                        index += 1;
                    }
                    start = index + 1;
                }
                _ => (),
            }
            index += 1;
        }
        lines.push(start..content.len());
        Self { content, lines }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        fs::read_to_string(path)
            .map(Self::new)
            .map_err(|source| SourceError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The zero based line `line` without its line terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(|range| &self.content[range.clone()])
    }

    /// All text starting at byte `offset` of the zero based line `line`, up to
    /// the end of the file.
    ///
    /// An offset past the line or inside a multi byte character falls back to
    /// the start of the line.
    pub fn substr(&self, line: usize, offset: usize) -> Option<&str> {
        let range = self.lines.get(line)?;
        let line_start = &self.content[range.start..];
        match offset <= range.len() {
            true => line_start.get(offset..).or(Some(line_start)),
            false => Some(line_start),
        }
    }
}

/// A process wide, thread safe cache of [`SourceFile`]s.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Mutex<HashMap<PathBuf, Arc<SourceFile>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the file at `path`, reading it on first access.
    ///
    /// Read failures are not cached, a later call tries again.
    pub fn get(&self, path: impl AsRef<Path>) -> Result<Arc<SourceFile>, SourceError> {
        let path = path.as_ref();
        let mut files = self
            .files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(file) = files.get(path) {
            return Ok(Arc::clone(file));
        }

        let file = Arc::new(SourceFile::read(path)?);
        files.insert(path.to_path_buf(), Arc::clone(&file));
        Ok(file)
    }

    pub fn len(&self) -> usize {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where and how to look up assertion source text.
#[derive(Debug, Clone)]
pub struct SourceLookup {
    cache: Arc<SourceCache>,
    root: PathBuf,
    size_limit: usize,
}

impl SourceLookup {
    pub const DEFAULT_SIZE_LIMIT: usize = 80;

    /// Look up files relative to `root`, the directory `file!()` paths are
    /// relative to (usually the workspace root).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            cache: Arc::new(SourceCache::new()),
            root: root.into(),
            size_limit: Self::DEFAULT_SIZE_LIMIT,
        }
    }

    pub fn with_cache(self, cache: Arc<SourceCache>) -> Self {
        Self { cache, ..self }
    }

    pub fn with_size_limit(self, size_limit: usize) -> Self {
        Self { size_limit, ..self }
    }

    pub fn cache(&self) -> &Arc<SourceCache> {
        &self.cache
    }

    /// Source text of both operands of the assertion at `location`.
    ///
    /// `keyword` is the method that received the left operand (`expect` or
    /// `require`), `method` the comparison that received the right one.
    pub fn operands(
        &self,
        location: &Location<'_>,
        keyword: &str,
        method: &str,
    ) -> Option<(String, String)> {
        let path = self.root.join(location.file());
        let file = match self.cache.get(&path) {
            Ok(file) => file,
            Err(err) => {
                warn!(error = %err, "assertion source text unavailable");
                return None;
            }
        };

        let line = (location.line() as usize).checked_sub(1)?;
        let offset = (location.column() as usize).saturating_sub(1);
        let text = file.substr(line, offset)?;
        let extracted = extract_operands(text, keyword, method, self.size_limit);
        if extracted.is_none() {
            debug!(
                file = %location.file(),
                line = location.line(),
                "could not extract assertion operands"
            );
        }
        extracted
    }
}

/// Pull the argument of `keyword(...)` and of the following `.method(...)`
/// out of `text`.
pub fn extract_operands(
    text: &str,
    keyword: &str,
    method: &str,
    size_limit: usize,
) -> Option<(String, String)> {
    let lhs_start = find_call(text, keyword, 0)?;
    let lhs_len = balanced_len(&text[lhs_start..])?;
    let lhs_end = lhs_start + lhs_len;

    let rhs_start = find_call(text, method, lhs_end + 1)?;
    let rhs_len = balanced_len(&text[rhs_start..])?;

    Some((
        condense(&text[lhs_start..lhs_end], size_limit),
        condense(&text[rhs_start..rhs_start + rhs_len], size_limit),
    ))
}

/// Byte offset right after the `(` of the first call to `name` at or after `from`.
fn find_call(text: &str, name: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(found) = text.get(search..)?.find(name) {
        let start = search + found;
        let end = start + name.len();
        search = end;

        let preceded_by_ident = text[..start]
            .chars()
            .next_back()
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_');
        if preceded_by_ident {
            continue;
        }

        let rest = &text[end..];
        let trimmed = rest.trim_start();
        if trimmed.starts_with('(') {
            return Some(end + (rest.len() - trimmed.len()) + 1);
        }
    }
    None
}

/// Length of the text up to the `)` closing an already opened parenthesis.
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut chars = text.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            '"' => {
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => (),
                    }
                }
            }
            '\'' => skip_char_literal(&text[index + 1..], &mut chars),
            _ => (),
        }
    }
    None
}

// A quote may open a char literal or name a lifetime, only literals are skipped.
fn skip_char_literal(
    rest: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) {
    let mut inner = rest.chars();
    let literal_len = match (inner.next(), inner.next()) {
        (Some('\\'), Some(_)) => rest
            .get(2..)
            .and_then(|tail| tail.find('\''))
            .map(|close| rest[..close + 3].chars().count()),
        (Some(_), Some('\'')) => Some(2),
        _ => None,
    };

    if let Some(len) = literal_len {
        for _ in 0..len {
            chars.next();
        }
    }
}

fn condense(text: &str, size_limit: usize) -> String {
    let condensed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if condensed.chars().count() <= size_limit {
        return condensed;
    }

    let keep = size_limit.saturating_sub(3);
    let mut truncated: String = condensed.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn lines_split_on_any_terminator() {
        let file = SourceFile::new("a\nbb\r\nccc\rd".into());
        assert_eq!(file.line_count(), 4);
        assert_eq!(file.line(1), Some("bb"));
        assert_eq!(file.line(2), Some("ccc"));
        assert_eq!(file.line(3), Some("d"));
        assert_eq!(file.line(4), None);
    }

    #[test]
    fn substr_runs_to_end_of_file() {
        let file = SourceFile::new("first\nsecond line\nthird".into());
        assert_eq!(file.substr(1, 7), Some("line\nthird"));
        assert_eq!(file.substr(1, 99), Some("second line\nthird"));
        assert_eq!(file.substr(9, 0), None);
    }

    #[test]
    fn extracts_both_operands() {
        let text = "ctx.expect(vec.len()).is_eq(3 + x);\n";
        let (lhs, rhs) = extract_operands(text, "expect", "is_eq", 80).unwrap();
        assert_eq!(lhs, "vec.len()");
        assert_eq!(rhs, "3 + x");
    }

    #[test]
    fn extraction_handles_nesting_strings_and_chars() {
        let text = "ctx.require(f(\")(\", ')'))\n    .is_ne(\n        g([1, 2]),\n    );";
        let (lhs, rhs) = extract_operands(text, "require", "is_ne", 80).unwrap();
        assert_eq!(lhs, "f(\")(\", ')')");
        assert_eq!(rhs, "g([1, 2]),");
    }

    #[test]
    fn extraction_skips_longer_identifiers() {
        let text = "let expected = 1; unexpect(0); ctx.expect(n).is_ge(expected)";
        let (lhs, rhs) = extract_operands(text, "expect", "is_ge", 80).unwrap();
        assert_eq!(lhs, "n");
        assert_eq!(rhs, "expected");
    }

    #[test]
    fn escaped_char_literals_are_skipped() {
        let text = "ctx.expect(c == '\\'').is_eq(true)";
        let (lhs, rhs) = extract_operands(text, "expect", "is_eq", 80).unwrap();
        assert_eq!(lhs, "c == '\\''");
        assert_eq!(rhs, "true");
    }

    #[test]
    fn long_operands_are_truncated() {
        let text = "ctx.expect(a_really_long_identifier_name).is_eq(0)";
        let (lhs, _) = extract_operands(text, "expect", "is_eq", 10).unwrap();
        assert_eq!(lhs, "a_reall...");
    }

    #[test]
    fn missing_call_yields_nothing() {
        assert_eq!(extract_operands("let x = 5;", "expect", "is_eq", 80), None);
    }

    #[test]
    fn cache_memoizes_across_threads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/source.rs");
        let cache = SourceCache::new();

        let files: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| cache.get(&path).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), 1);
        assert!(files.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let cache = SourceCache::new();
        let err = cache.get("does/not/exist.rs").unwrap_err();
        assert!(matches!(err, SourceError::Read { .. }));
        assert!(cache.is_empty());
    }
}
