// Copyright (C) 2026 The Loomhaven Authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Text-to-text rewriting of friendly dbref/id syntax and typed member
//! calls into canonical host calls. Pure: `String in, String out`, no
//! state carried between calls.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Identifiers that are always treated as `GameObject`-typed, regardless
/// of any declaration found in the source.
pub(crate) const WELL_KNOWN_CONTEXT_NAMES: &[&str] = &[
    "Player",
    "This",
    "ThisGameObject",
    "ThisPlayer",
    "ThisRoom",
    "ThisExit",
    "ThisObject",
    "Caller",
    "CallerGameObject",
    "CallerPlayer",
    "Location",
];

/// Built-in method names that are never rewritten even when called on a
/// known `GameObject` variable.
const BUILTIN_METHOD_NAMES: &[&str] = &[
    "ToString",
    "GetType",
    "Equals",
    "GetHashCode",
    "ReferenceEquals",
    "MemberwiseClone",
    "CompareTo",
    "Clone",
];

/// Host-language reserved words and built-in type names. An identifier
/// that is one of these is never treated as a rewrite target, even if it
/// would otherwise look like a `GameObject` reference.
pub(crate) const RESERVED_WORDS: &[&str] = &[
    "string", "int", "long", "bool", "float", "double", "decimal", "object", "void", "var",
    "new", "this", "base", "null", "true", "false", "if", "else", "while", "for", "foreach",
    "return", "throw", "try", "catch", "finally", "class", "struct", "interface", "namespace",
    "using", "public", "private", "protected", "internal", "static", "readonly", "const",
    "override", "virtual", "abstract", "async", "await", "switch", "case", "break", "continue",
    "default", "out", "ref", "params", "List", "Dictionary", "IEnumerable", "Task", "Exception",
];

static DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:GameObject|Room|Player|Exit|Item|Container)\??\s+([A-Za-z_][A-Za-z0-9_]*)\b")
        .expect("valid regex")
});

static ASSIGN_RESOLVER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?:ObjectResolver\.ResolveObject|GetObjectById|GetObjectByDbRef|GetObject)\s*\(",
    )
    .expect("valid regex")
});

static ASSIGN_NEW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*=\s*new\s+(?:GameObject|Room|Player|Exit|Item|Container)\b")
        .expect("valid regex")
});

pub(crate) enum Segment {
    Code(String),
    /// String/char literals and comments: copied to the output verbatim
    /// and never scanned for rewrite targets.
    Verbatim(String),
}

/// Split `src` into alternating code/verbatim spans so literals and
/// comments can be passed through untouched.
pub(crate) fn split_segments(src: &str) -> Vec<Segment> {
    let bytes = src.as_bytes();
    let n = bytes.len();
    let mut segments = Vec::new();
    let mut code_start = 0usize;
    let mut i = 0usize;

    macro_rules! flush_code {
        ($end:expr) => {
            if $end > code_start {
                segments.push(Segment::Code(src[code_start..$end].to_string()));
            }
        };
    }

    while i < n {
        let c = bytes[i];
        if c == b'/' && i + 1 < n && bytes[i + 1] == b'/' {
            flush_code!(i);
            let start = i;
            while i < n && bytes[i] != b'\n' {
                i += 1;
            }
            segments.push(Segment::Verbatim(src[start..i].to_string()));
            code_start = i;
        } else if c == b'/' && i + 1 < n && bytes[i + 1] == b'*' {
            flush_code!(i);
            let start = i;
            i += 2;
            while i + 1 < n && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(n);
            segments.push(Segment::Verbatim(src[start..i].to_string()));
            code_start = i;
        } else if c == b'"' {
            flush_code!(i);
            let start = i;
            i += 1;
            while i < n {
                if bytes[i] == b'\\' && i + 1 < n {
                    i += 2;
                    continue;
                }
                if bytes[i] == b'"' {
                    i += 1;
                    break;
                }
                i += 1;
            }
            segments.push(Segment::Verbatim(src[start..i].to_string()));
            code_start = i;
        } else if c == b'\'' {
            flush_code!(i);
            let start = i;
            i += 1;
            while i < n {
                if bytes[i] == b'\\' && i + 1 < n {
                    i += 2;
                    continue;
                }
                if bytes[i] == b'\'' {
                    i += 1;
                    break;
                }
                i += 1;
            }
            segments.push(Segment::Verbatim(src[start..i].to_string()));
            code_start = i;
        } else {
            i += 1;
        }
    }
    flush_code!(n);
    segments
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_id_ref_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Read a contiguous identifier starting at byte offset `i`. Returns the
/// identifier text and the byte offset just past it.
pub(crate) fn read_ident(text: &str, i: usize) -> (&str, usize) {
    let rest = &text[i..];
    let end = rest
        .char_indices()
        .find(|(_, c)| !is_ident_continue(*c))
        .map(|(idx, _)| idx)
        .unwrap_or(rest.len());
    (&rest[..end], i + end)
}

/// Collect the set of identifiers known (by declaration or
/// resolver-assignment) to hold a `GameObject`-typed value, across all
/// code segments of the preprocessed unit.
fn collect_known_objects(segments: &[Segment]) -> HashSet<String> {
    let mut known: HashSet<String> = WELL_KNOWN_CONTEXT_NAMES.iter().map(|s| s.to_string()).collect();
    for seg in segments {
        if let Segment::Code(text) = seg {
            for caps in DECL_RE.captures_iter(text) {
                known.insert(caps[1].to_string());
            }
            for caps in ASSIGN_RESOLVER_RE.captures_iter(text) {
                known.insert(caps[1].to_string());
            }
            for caps in ASSIGN_NEW_RE.captures_iter(text) {
                known.insert(caps[1].to_string());
            }
        }
    }
    known
}

/// Rewrite one code-only span, applying the dbref/id/method-call rewrite
/// rules in priority order at each position.
fn rewrite_code(text: &str, known: &HashSet<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0usize;
    let n = text.len();

    while i < n {
        let c = text[i..].chars().next().unwrap();

        // Rule 1: dbref reference #N.member
        if c == '#' {
            if let Some((dbref, member, end)) = match_dbref(text, i) {
                out.push_str(&format!("GetObjectByDbRef({dbref}).{member}"));
                i = end;
                continue;
            }
        }

        // Rule 2: id reference $IDENT.member
        if c == '$' {
            if let Some((ident, member, end)) = match_id_ref(text, i) {
                out.push_str(&format!("GetObjectById(\"{ident}\").{member}"));
                i = end;
                continue;
            }
        }

        // Rule 3: method call on a known GameObject-typed variable.
        if is_ident_start(c) {
            if let Some((prefix, args_start)) = match_method_call(text, i, known) {
                out.push_str(&prefix);
                i = args_start;
                continue;
            }
            // Not a rewrite target: copy the whole identifier token so we
            // don't re-examine its interior characters.
            let (ident, end) = read_ident(text, i);
            out.push_str(ident);
            i = end;
            continue;
        }

        out.push(c);
        i += c.len_utf8();
    }

    out
}

/// Matches `#<digits>.<member>` at byte offset `i` (where `text[i] ==
/// '#'`). Returns (dbref digits, member name, end offset of the matched
/// `#N.member` token).
fn match_dbref(text: &str, i: usize) -> Option<(String, String, usize)> {
    let rest = &text[i + 1..];
    let digit_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digit_len == 0 {
        return None;
    }
    let digits = &rest[..digit_len];
    let mut j = i + 1 + digit_len;
    if text[j..].chars().next() != Some('.') {
        return None;
    }
    j += 1;
    if !text[j..].chars().next().map(is_ident_start).unwrap_or(false) {
        return None;
    }
    let (member, end) = read_ident(text, j);
    Some((digits.to_string(), member.to_string(), end))
}

/// Matches `$IDENT.member` at byte offset `i` (where `text[i] == '$'`).
/// `IDENT` may contain `-` and `_`.
fn match_id_ref(text: &str, i: usize) -> Option<(String, String, usize)> {
    let rest = &text[i + 1..];
    if !rest.chars().next().map(is_ident_start).unwrap_or(false) {
        return None;
    }
    let id_len = rest
        .char_indices()
        .find(|(_, c)| !is_id_ref_continue(*c))
        .map(|(idx, _)| idx)
        .unwrap_or(rest.len());
    let ident = &rest[..id_len];
    let mut j = i + 1 + id_len;
    if text[j..].chars().next() != Some('.') {
        return None;
    }
    j += 1;
    if !text[j..].chars().next().map(is_ident_start).unwrap_or(false) {
        return None;
    }
    let (member, end) = read_ident(text, j);
    Some((ident.to_string(), member.to_string(), end))
}

/// Matches `ident.Method(` at byte offset `i`, where `ident` is a known
/// `GameObject` variable and `Method` starts with an upper-case letter.
/// Returns the rewritten `CallFunctionOnObject(ident, "Method"[, ]`
/// prefix and the byte offset of the first argument character (or the
/// closing paren, if the call has no arguments) so the caller can resume
/// scanning from there.
fn match_method_call(text: &str, i: usize, known: &HashSet<String>) -> Option<(String, usize)> {
    let (ident, after_ident) = read_ident(text, i);
    if text[after_ident..].chars().next() != Some('.') {
        return None;
    }
    let after_dot = after_ident + 1;
    if !text[after_dot..]
        .chars()
        .next()
        .map(is_ident_start)
        .unwrap_or(false)
    {
        return None;
    }
    let (method, after_method) = read_ident(text, after_dot);
    if !method.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
        return None;
    }
    if text[after_method..].chars().next() != Some('(') {
        return None;
    }

    if RESERVED_WORDS.contains(&ident) || !known.contains(ident) {
        return None;
    }
    if BUILTIN_METHOD_NAMES.contains(&method) {
        return None;
    }

    let paren_end = after_method + 1;
    let args_empty = text[paren_end..]
        .trim_start()
        .starts_with(')');

    let mut prefix = format!("CallFunctionOnObject({ident}, \"{method}\"");
    if !args_empty {
        prefix.push_str(", ");
    }
    Some((prefix, paren_end))
}

/// Applies the dbref/id/method-call rewrites to `source`, producing
/// host-compilable text. Pure and idempotent: see the property test below.
pub fn preprocess(source: &str) -> String {
    let segments = split_segments(source);
    let known = collect_known_objects(&segments);

    let mut out = String::with_capacity(source.len());
    for seg in &segments {
        match seg {
            Segment::Code(text) => out.push_str(&rewrite_code(text, &known)),
            Segment::Verbatim(text) => out.push_str(text),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_dbref_member_access() {
        assert_eq!(preprocess("#5.name"), "GetObjectByDbRef(5).name");
    }

    #[test]
    fn rewrites_dbref_call_form() {
        assert_eq!(
            preprocess(r#"#5.tell("hi")"#),
            r#"GetObjectByDbRef(5).tell("hi")"#
        );
    }

    #[test]
    fn rewrites_dbref_assignment_form() {
        assert_eq!(
            preprocess("#5.name = \"Bob\";"),
            "GetObjectByDbRef(5).name = \"Bob\";"
        );
    }

    #[test]
    fn rewrites_id_reference() {
        assert_eq!(
            preprocess("$sys-util.count"),
            "GetObjectById(\"sys-util\").count"
        );
    }

    #[test]
    fn rewrites_method_call_on_well_known_context_name() {
        assert_eq!(
            preprocess("This.Notify(\"hi\")"),
            "CallFunctionOnObject(This, \"Notify\", \"hi\")"
        );
    }

    #[test]
    fn rewrites_method_call_with_no_args() {
        assert_eq!(
            preprocess("Player.Refresh()"),
            "CallFunctionOnObject(Player, \"Refresh\")"
        );
    }

    #[test]
    fn rewrites_method_call_on_declared_game_object() {
        assert_eq!(
            preprocess("GameObject target = GetObject(x); target.Attack(Player);"),
            "GameObject target = GetObject(x); CallFunctionOnObject(target, \"Attack\", Player);"
        );
    }

    #[test]
    fn rewrites_method_call_on_resolver_assigned_variable() {
        assert_eq!(
            preprocess("var box = ObjectResolver.ResolveObject(\"box\", This); box.Open();"),
            "var box = ObjectResolver.ResolveObject(\"box\", This); CallFunctionOnObject(box, \"Open\");"
        );
    }

    #[test]
    fn does_not_rewrite_unknown_identifier() {
        assert_eq!(preprocess("helper.Run(x);"), "helper.Run(x);");
    }

    #[test]
    fn does_not_rewrite_builtin_method_names() {
        assert_eq!(preprocess("This.ToString();"), "This.ToString();");
    }

    #[test]
    fn does_not_rewrite_lowercase_methods() {
        assert_eq!(preprocess("This.notify(x);"), "This.notify(x);");
    }

    #[test]
    fn does_not_rewrite_plain_function_calls() {
        assert_eq!(preprocess("Notify(x);"), "Notify(x);");
    }

    #[test]
    fn skips_string_literals() {
        let src = r#"notify(Player, "This.Attack() #5.foo $bar.baz");"#;
        assert_eq!(preprocess(src), src);
    }

    #[test]
    fn skips_comments() {
        let src = "// This.Attack(#5.foo)\nThis.Notify(\"hi\")";
        assert_eq!(
            preprocess(src),
            "// This.Attack(#5.foo)\nCallFunctionOnObject(This, \"Notify\", \"hi\")"
        );
    }

    #[test]
    fn skips_block_comments() {
        let src = "/* #5.foo */ var x = 1;";
        assert_eq!(preprocess(src), src);
    }

    #[test]
    fn preserves_escaped_quotes_in_strings() {
        let src = r#"notify(Player, "she said \"hi #5.x\"");"#;
        assert_eq!(preprocess(src), src);
    }

    #[test]
    fn idempotent_on_already_rewritten_source() {
        let once = preprocess("#5.tell(\"hi\"); This.Attack(Player);");
        let twice = preprocess(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn idempotent_on_plain_source() {
        let src = "return true;";
        assert_eq!(preprocess(src), preprocess(&preprocess(src)));
    }

    #[test]
    fn does_not_rewrite_reserved_type_names() {
        // `string` is a reserved word even if someone smuggled it into
        // the known-object set; Method access on it is left alone.
        assert_eq!(preprocess("string.Format(x);"), "string.Format(x);");
    }
}
