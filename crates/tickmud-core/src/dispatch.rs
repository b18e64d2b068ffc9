//! Command parsing and name matching
//!
//! Player input is a verb plus a remainder. Targets are picked from the
//! room's occupants by name, with exact matches preferred over close ones
//! so "guard" finds "guard" before "guard captain".

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The verb, lowercased
    pub verb: String,
    /// Everything after the verb, trimmed
    pub rest: String,
}

/// Split a raw command line into verb and remainder
///
/// Returns None for blank input.
pub fn parse_command(input: &str) -> Option<ParsedCommand> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => Some(ParsedCommand {
            verb: verb.to_lowercase(),
            rest: rest.trim().to_string(),
        }),
        None => Some(ParsedCommand {
            verb: trimmed.to_lowercase(),
            rest: String::new(),
        }),
    }
}

/// How strictly a query must match a candidate name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Accept exact, prefix and word-prefix matches
    #[default]
    Any,
    /// Only a full case-insensitive name match counts
    ExactPhrase,
}

/// The outcome of matching a query against a candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchResult {
    /// Index of the first exact match, if any
    pub exact: Option<usize>,
    /// Index of the first close (prefix) match, if any
    pub close: Option<usize>,
}

impl MatchResult {
    /// The best available match: exact if present, otherwise close
    pub fn best(&self) -> Option<usize> {
        self.exact.or(self.close)
    }

    /// Whether anything matched at all
    pub fn is_miss(&self) -> bool {
        self.exact.is_none() && self.close.is_none()
    }
}

/// Find the candidate best matching a query
///
/// Comparison is case-insensitive. Under `MatchMode::Any` a close match is
/// a candidate whose full name, or any word of it, starts with the query.
/// Under `MatchMode::ExactPhrase` only full equality is considered.
pub fn find_match_in<S: AsRef<str>>(query: &str, candidates: &[S], mode: MatchMode) -> MatchResult {
    let query = query.trim().to_lowercase();
    let mut result = MatchResult::default();
    if query.is_empty() {
        return result;
    }

    for (i, candidate) in candidates.iter().enumerate() {
        let name = candidate.as_ref().to_lowercase();
        if name == query {
            result.exact.get_or_insert(i);
            continue;
        }
        if mode == MatchMode::ExactPhrase {
            continue;
        }
        let close = name.starts_with(&query) || name.split_whitespace().any(|w| w.starts_with(&query));
        if close {
            result.close.get_or_insert(i);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let cmd = parse_command("ask guard about the gate").unwrap();
        assert_eq!(cmd.verb, "ask");
        assert_eq!(cmd.rest, "guard about the gate");

        let cmd = parse_command("  LOOK  ").unwrap();
        assert_eq!(cmd.verb, "look");
        assert_eq!(cmd.rest, "");

        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn test_exact_preferred_over_close() {
        let names = ["guard captain", "guard"];
        let result = find_match_in("guard", &names, MatchMode::Any);
        assert_eq!(result.exact, Some(1));
        assert_eq!(result.close, Some(0));
        assert_eq!(result.best(), Some(1));
    }

    #[test]
    fn test_word_prefix_matches() {
        let names = ["frost wolf", "town crier"];
        let result = find_match_in("wol", &names, MatchMode::Any);
        assert_eq!(result.best(), Some(0));

        let result = find_match_in("crier", &names, MatchMode::Any);
        assert_eq!(result.best(), Some(1));
    }

    #[test]
    fn test_exact_phrase_mode() {
        let names = ["guard captain", "guard"];
        let result = find_match_in("guard cap", &names, MatchMode::ExactPhrase);
        assert!(result.is_miss());

        let result = find_match_in("Guard Captain", &names, MatchMode::ExactPhrase);
        assert_eq!(result.exact, Some(0));
    }

    #[test]
    fn test_first_match_wins_ties() {
        let names = ["rat", "rat"];
        let result = find_match_in("rat", &names, MatchMode::Any);
        assert_eq!(result.exact, Some(0));
    }

    #[test]
    fn test_empty_query_misses() {
        let names = ["guard"];
        assert!(find_match_in("", &names, MatchMode::Any).is_miss());
    }
}
