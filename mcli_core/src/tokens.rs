//! Token-level argv transforms applied ahead of flag binding.

/// Partition `argv` into the tokens preceding the first `-`-prefixed token
/// (the ambiguous-argument buffer, later bound as leading positionals) and
/// the suffix starting at that flag.
pub(crate) fn split_ambiguous(argv: &[String]) -> (Vec<String>, Vec<String>) {
    let split = argv
        .iter()
        .position(|token| token.starts_with('-'))
        .unwrap_or(argv.len());
    (argv[..split].to_vec(), argv[split..].to_vec())
}

/// Expand POSIX-bundled boolean shorts: a token `-xyz` becomes `-x -y -z`
/// iff the full string is not itself an accepted flag name and every
/// character is a registered short boolean flag. Tokens after a `--`
/// terminator pass through untouched, as does any token that fails the
/// all-boolean test.
pub(crate) fn expand_bundles(
    tokens: &[String],
    is_known_name: impl Fn(&str) -> bool,
    is_short_bool: impl Fn(char) -> bool,
) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut terminated = false;

    for token in tokens {
        if terminated {
            out.push(token.clone());
            continue;
        }
        if token.as_str() == "--" {
            terminated = true;
            out.push(token.clone());
            continue;
        }

        match bundle_chars(token) {
            Some(chars) if !is_known_name(&token[1..]) && chars.iter().all(|c| is_short_bool(*c)) => {
                out.extend(chars.into_iter().map(|c| format!("-{c}")));
            }
            _ => out.push(token.clone()),
        }
    }

    out
}

/// The candidate characters of a bundle token, or `None` when the token is
/// not bundle-shaped (`-` followed by two or more characters, no second
/// hyphen, no attached value).
fn bundle_chars(token: &str) -> Option<Vec<char>> {
    let rest = token.strip_prefix('-')?;
    if rest.len() < 2 || rest.starts_with('-') || rest.contains('=') {
        return None;
    }
    Some(rest.chars().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[rstest]
    #[case(&[], &[], &[])]
    #[case(&["a", "b"], &["a", "b"], &[])]
    #[case(&["-v"], &[], &["-v"])]
    #[case(&["a", "-v", "b"], &["a"], &["-v", "b"])]
    #[case(&["a", "--", "b"], &["a"], &["--", "b"])]
    fn ambiguous_split(
        #[case] argv: &[&str],
        #[case] expected_prefix: &[&str],
        #[case] expected_suffix: &[&str],
    ) {
        let (prefix, suffix) = split_ambiguous(&strings(argv));
        assert_eq!(prefix, strings(expected_prefix));
        assert_eq!(suffix, strings(expected_suffix));
    }

    fn booleans(c: char) -> bool {
        matches!(c, 'a' | 'b' | 'c')
    }

    #[test]
    fn expands_all_boolean_bundle() {
        let out = expand_bundles(&strings(&["-abc", "x"]), |_| false, booleans);
        assert_eq!(out, strings(&["-a", "-b", "-c", "x"]));
    }

    #[rstest]
    #[case(&["-abz"])]
    #[case(&["-a"])]
    #[case(&["--abc"])]
    #[case(&["-ab=1"])]
    #[case(&["-"])]
    fn leaves_non_bundles_verbatim(#[case] tokens: &[&str]) {
        let out = expand_bundles(&strings(tokens), |_| false, booleans);
        assert_eq!(out, strings(tokens));
    }

    #[test]
    fn known_name_beats_expansion() {
        // "-ab" is an accepted flag name in its own right.
        let out = expand_bundles(&strings(&["-ab"]), |name| name == "ab", booleans);
        assert_eq!(out, strings(&["-ab"]));
    }

    #[test]
    fn terminator_stops_expansion() {
        let out = expand_bundles(&strings(&["-ab", "--", "-abc"]), |_| false, booleans);
        assert_eq!(out, strings(&["-a", "-b", "--", "-abc"]));
    }
}
