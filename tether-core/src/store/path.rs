//! Path Resolver
//!
//! Turns dotted path strings into segment lists.
//!
//! - `a.b.c` is three segments.
//! - `a\.b.c` is two: `a.b` and `c`. The escape joins a segment with the
//!   next one, keeping the separator.
//! - `$a.b` is absolute: the caller's base path is ignored.
//! - Empty segments (`a..b`, leading or trailing separators) are dropped.
//!
//! A path that ends in a lone escape character is rejected with
//! [`Error::DanglingEscape`].

use smallvec::SmallVec;

use crate::config::PathSyntax;
use crate::error::{Error, Result};

/// Resolved path segments, root first.
pub type Segments = SmallVec<[String; 4]>;

/// Strip leading and trailing separators.
pub fn trim(raw: &str, separator: char) -> &str {
    raw.trim_matches(separator)
}

/// Resolve `raw` against `base`.
///
/// `base` is ignored when `raw` starts with the absolute marker or when it
/// is empty.
pub fn parse_path(raw: &str, base: &str, syntax: &PathSyntax) -> Result<Segments> {
    let path = trim(raw, syntax.separator);
    let joined;
    let path = if let Some(rest) = path.strip_prefix(syntax.absolute) {
        rest.strip_prefix(syntax.separator).unwrap_or(rest)
    } else {
        let base = trim(base, syntax.separator);
        if base.is_empty() {
            path
        } else {
            joined = format!("{base}{}{path}", syntax.separator);
            &joined
        }
    };
    split(path, syntax)
}

/// Split on the separator, honouring escapes, and drop empty segments.
pub fn split(path: &str, syntax: &PathSyntax) -> Result<Segments> {
    let raw_parts: SmallVec<[&str; 8]> = path.split(syntax.separator).collect();
    let mut segments = Segments::new();
    let mut i = 0;
    while i < raw_parts.len() {
        let mut segment = String::new();
        while let Some(head) = raw_parts[i].strip_suffix(syntax.escape) {
            segment.push_str(head);
            segment.push(syntax.separator);
            i += 1;
            if i == raw_parts.len() {
                return Err(Error::DanglingEscape {
                    path: path.to_string(),
                });
            }
        }
        segment.push_str(raw_parts[i]);
        if !segment.is_empty() {
            segments.push(segment);
        }
        i += 1;
    }
    Ok(segments)
}

/// Escape separators inside a single segment.
pub fn escape_segment(segment: &str, syntax: &PathSyntax) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c == syntax.separator {
            out.push(syntax.escape);
        }
        out.push(c);
    }
    out
}

/// Inverse of [`split`] for segments that round-trip.
pub fn join<S: AsRef<str>>(segments: &[S], syntax: &PathSyntax) -> String {
    let mut out = String::new();
    for segment in segments {
        push_segment(&mut out, segment.as_ref(), syntax);
    }
    out
}

/// Append one segment to a joined path.
pub fn push_segment(path: &mut String, segment: &str, syntax: &PathSyntax) {
    if !path.is_empty() {
        path.push(syntax.separator);
    }
    path.push_str(&escape_segment(segment, syntax));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str, base: &str) -> Result<Vec<String>> {
        parse_path(raw, base, &PathSyntax::default()).map(|s| s.into_vec())
    }

    #[test]
    fn splits_on_separator() {
        assert_eq!(parse("a.b.c", "").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn drops_empty_segments() {
        assert_eq!(parse("..a..b.", "").unwrap(), vec!["a", "b"]);
        assert!(parse("", "").unwrap().is_empty());
    }

    #[test]
    fn escaped_separator_stays_in_segment() {
        assert_eq!(parse(r"a\.b.c", "").unwrap(), vec!["a.b", "c"]);
        assert_eq!(parse(r"a\.b\.c", "").unwrap(), vec!["a.b.c"]);
    }

    #[test]
    fn base_is_prepended() {
        assert_eq!(parse("other.foo", "mymodel").unwrap(), vec!["mymodel", "other", "foo"]);
        assert_eq!(parse("x", ".m.").unwrap(), vec!["m", "x"]);
    }

    #[test]
    fn absolute_marker_ignores_base() {
        assert_eq!(parse("$a.b", "mymodel").unwrap(), vec!["a", "b"]);
        assert_eq!(parse("$.a", "mymodel").unwrap(), vec!["a"]);
        assert!(parse("$", "mymodel").unwrap().is_empty());
    }

    #[test]
    fn dangling_escape_is_an_error() {
        let err = parse(r"a.b\", "").unwrap_err();
        assert_eq!(
            err,
            Error::DanglingEscape {
                path: r"a.b\".to_string()
            }
        );
    }

    #[test]
    fn trim_strips_both_ends() {
        assert_eq!(trim("..a.b..", '.'), "a.b");
        assert_eq!(trim("a", '.'), "a");
    }

    #[test]
    fn join_escapes_separators() {
        let syntax = PathSyntax::default();
        assert_eq!(join(&["a.b", "c"], &syntax), r"a\.b.c");
        assert_eq!(split(&join(&["a.b", "c"], &syntax), &syntax).unwrap().into_vec(), vec!["a.b", "c"]);
    }

    #[test]
    fn custom_syntax() {
        let syntax = PathSyntax {
            separator: '/',
            escape: '~',
            absolute: '@',
        };
        let segments = parse_path("@/a~/b/c", "base", &syntax).unwrap();
        assert_eq!(segments.into_vec(), vec!["a/b", "c"]);
    }
}
