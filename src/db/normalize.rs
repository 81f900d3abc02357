use crate::db::pool::Row;

/// Rewrites every key of every row into camelCase, keeping values and row order.
pub fn normalize_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(key, value)| (camel_case(&key), value))
                .collect()
        })
        .collect()
}

/// Converts a snake_case, kebab-case or PascalCase identifier into camelCase.
///
/// Words are split on non-alphanumeric characters and on case boundaries
/// (`userID` splits into `user` and `ID`, `HTTPServer` into `HTTP` and
/// `Server`). A letter following a digit starts a new word.
pub fn camel_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for (index, word) in split_words(input).iter().enumerate() {
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if index == 0 {
            out.extend(first.to_lowercase());
        } else {
            out.extend(first.to_uppercase());
        }
        out.extend(chars.flat_map(char::to_lowercase));
    }

    out
}

fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if !current.is_empty() && chars[i - 1].is_numeric() && c.is_alphabetic() {
            // "line2text" breaks before t
            words.push(std::mem::take(&mut current));
        } else if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // "fooBar" breaks before B, "HTTPServer" breaks before S
            if prev.is_lowercase() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}
