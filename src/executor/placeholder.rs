//! Portable `?` placeholders and their driver-native spellings.

use std::borrow::Cow;

/// How a driver spells a positional bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` (MySQL, SQLite). Templates pass through untouched.
    #[default]
    QuestionMark,
    /// `%s` (pyformat-style drivers). A literal `%` is written `%%`.
    Format,
    /// `$1`, `$2`, ... (PostgreSQL).
    Numbered,
}

impl PlaceholderStyle {
    /// Rewrites every portable placeholder outside quoted text.
    pub fn translate<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        let escapes_percent = *self == Self::Format && sql.contains('%');
        if *self == Self::QuestionMark || (!sql.contains('?') && !escapes_percent) {
            return Cow::Borrowed(sql);
        }

        let mut out = String::with_capacity(sql.len() + 8);
        let mut index = 0usize;
        scan(sql, |piece| match piece {
            Piece::Placeholder => {
                index += 1;
                match self {
                    Self::Format => out.push_str("%s"),
                    Self::Numbered => {
                        out.push('$');
                        out.push_str(&index.to_string());
                    }
                    Self::QuestionMark => out.push('?'),
                }
            }
            Piece::Char('%') if escapes_percent => out.push_str("%%"),
            Piece::Char(c) => out.push(c),
        });
        Cow::Owned(out)
    }
}

/// Number of portable placeholders outside quoted text.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    scan(sql, |piece| {
        if matches!(piece, Piece::Placeholder) {
            count += 1;
        }
    });
    count
}

enum Piece {
    Placeholder,
    Char(char),
}

fn scan(sql: &str, mut emit: impl FnMut(Piece)) {
    let mut quote: Option<char> = None;
    let mut chars = sql.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                emit(Piece::Char(c));
                if c == '\\' && q != '`' {
                    if let Some(escaped) = chars.next() {
                        emit(Piece::Char(escaped));
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '?' => emit(Piece::Placeholder),
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    emit(Piece::Char(c));
                }
                _ => emit(Piece::Char(c)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_mark_is_identity() {
        let sql = "select * from `t` where a = ?";
        assert!(matches!(
            PlaceholderStyle::QuestionMark.translate(sql),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_format_style() {
        let sql = "insert into `t` (`a`, `b`) values (?, ?)";
        assert_eq!(
            PlaceholderStyle::Format.translate(sql),
            "insert into `t` (`a`, `b`) values (%s, %s)"
        );
    }

    #[test]
    fn test_format_style_escapes_percent() {
        assert_eq!(
            PlaceholderStyle::Format.translate("select * from t where a % 2 = ? and b like 'x%'"),
            "select * from t where a %% 2 = %s and b like 'x%%'"
        );
        assert_eq!(PlaceholderStyle::Format.translate("select 10 % 3"), "select 10 %% 3");
        assert_eq!(PlaceholderStyle::Numbered.translate("select a % 2 = ?"), "select a % 2 = $1");
    }

    #[test]
    fn test_numbered_style() {
        let sql = "update t set a = ?, b = ? where id = ?";
        assert_eq!(
            PlaceholderStyle::Numbered.translate(sql),
            "update t set a = $1, b = $2 where id = $3"
        );
    }

    #[test]
    fn test_quoted_question_marks_untouched() {
        let sql = r#"select * from t where note = 'why?' and q = "?" and `odd?` = ? and s = 'it\'s ?'"#;
        assert_eq!(count_placeholders(sql), 1);
        assert_eq!(
            PlaceholderStyle::Numbered.translate(sql),
            r#"select * from t where note = 'why?' and q = "?" and `odd?` = $1 and s = 'it\'s ?'"#
        );
    }

    #[test]
    fn test_count() {
        assert_eq!(count_placeholders("delete from `t` where `id` = ?"), 1);
        assert_eq!(count_placeholders("select 1"), 0);
        assert_eq!(count_placeholders("limit ?, ?"), 2);
    }
}
