//! # Error Suggestions
//!
//! Helper functions for generating configuration errors with hints and
//! "did you mean" suggestions. Errors should tell users what went wrong AND
//! how to fix it, so every closed backend registry (providers, provisioners,
//! acquirers, installers) routes its unknown-name failures through here.

use crate::error::Error;

/// Generate an error for an unknown backend name (provider, provisioner,
/// acquirer, installer).
///
/// Includes the list of valid names and, when a close match exists, a
/// did-you-mean suggestion.
pub fn unknown_backend(kind: &str, name: &str, known: &[&str]) -> Error {
    let suggestion = find_similar(name, known)
        .map(|s| format!("Did you mean '{}'? ", s))
        .unwrap_or_default();

    Error::Config {
        message: format!("{} '{}' doesn't exist", kind, name),
        hint: Some(format!(
            "{}Valid {}s are: {}",
            suggestion,
            kind,
            known.join(", ")
        )),
    }
}

/// Generate an error for a stack name that isn't defined in the stack file.
pub fn stack_not_found(name: &str, file: &str, available: &[String]) -> Error {
    let candidates: Vec<&str> = available.iter().map(String::as_str).collect();
    let suggestion = find_similar(name, &candidates)
        .map(|s| format!("Did you mean '{}'? ", s))
        .unwrap_or_default();

    Error::Config {
        message: format!("stack '{}' not found in {}", name, file),
        hint: Some(format!(
            "{}Stacks defined in the file: {}",
            suggestion,
            available.join(", ")
        )),
    }
}

/// Generate an error for a stack name supplied without a stack file, or the
/// reverse. The two flags are mutually required.
pub fn stack_args_incomplete(have_name: bool) -> Error {
    let message = if have_name {
        "a stack config file is required when passing a stack name"
    } else {
        "a stack name is required when passing a stack config file"
    };

    Error::Config {
        message: message.to_string(),
        hint: Some("Pass both --stack-name and --stack-config, or neither".to_string()),
    }
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}
