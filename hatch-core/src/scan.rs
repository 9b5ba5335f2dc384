/// Calls `f` with the byte offset of every character of `sql` that is plain
/// code, skipping quoted strings, quoted identifiers and comments.
pub fn for_each_code_char(sql: &str, mut f: impl FnMut(usize, char)) {
    let mut chars = sql.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                // Doubled quote stays inside, backslash escapes the next char.
                while let Some((_, n)) = chars.next() {
                    if n == '\\' && c != '`' {
                        chars.next();
                    } else if n == c {
                        if chars.peek().map(|(_, v)| *v) == Some(c) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek().map(|(_, v)| *v) == Some('-') => {
                while chars.next_if(|(_, v)| *v != '\n').is_some() {}
            }
            '#' => {
                while chars.next_if(|(_, v)| *v != '\n').is_some() {}
            }
            '/' if chars.peek().map(|(_, v)| *v) == Some('*') => {
                chars.next();
                let mut previous = ' ';
                for (_, n) in chars.by_ref() {
                    if previous == '*' && n == '/' {
                        break;
                    }
                    previous = n;
                }
            }
            _ => f(i, c),
        }
    }
}

/// Byte offsets of the `?` placeholders of `sql`.
pub fn placeholders(sql: &str) -> Vec<usize> {
    let mut result = Vec::new();
    for_each_code_char(sql, |i, c| {
        if c == '?' {
            result.push(i);
        }
    });
    result
}

/// True when `sql` holds more than one statement separated by `;`.
pub fn is_multi_statement(sql: &str) -> bool {
    let mut separator = false;
    let mut multi = false;
    for_each_code_char(sql, |_, c| {
        if c == ';' {
            separator = true;
        } else if separator && !c.is_whitespace() {
            multi = true;
        }
    });
    multi
}

/// SQL text split around its placeholders, ready for literal substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParts {
    fragments: Vec<String>,
}

impl QueryParts {
    pub fn new(sql: &str) -> Self {
        let mut fragments = Vec::new();
        let mut start = 0;
        for position in placeholders(sql) {
            fragments.push(sql[start..position].to_string());
            start = position + 1;
        }
        fragments.push(sql[start..].to_string());
        Self { fragments }
    }
    pub fn parameter_count(&self) -> usize {
        self.fragments.len() - 1
    }
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn ignores_quoted_and_commented() {
        let sql = indoc! {r#"
            SELECT '?', "?", `?`, 'it''s ?', ? -- ?
            FROM t /* ? */ WHERE a = ? # ?
        "#};
        assert_eq!(placeholders(sql).len(), 2);
        assert_eq!(QueryParts::new(sql).parameter_count(), 2);
    }

    #[test]
    fn backslash_escape() {
        assert_eq!(placeholders(r"SELECT 'a\'?', ?").len(), 1);
    }

    #[test]
    fn multi_statement() {
        assert!(!is_multi_statement("SELECT 1;"));
        assert!(!is_multi_statement("SELECT ';DROP'"));
        assert!(is_multi_statement("SELECT 1; SELECT 2"));
        assert!(!is_multi_statement("SELECT 1; -- trailing"));
    }

    #[test]
    fn fragments() {
        let parts = QueryParts::new("INSERT INTO t VALUES (?, ?)");
        assert_eq!(parts.fragments(), ["INSERT INTO t VALUES (", ", ", ")"]);
    }
}
