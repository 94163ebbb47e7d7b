//! Single-pass tokenizer. Tolerates anything: unknown characters become
//! punctuation tokens, unterminated literals run to end of input.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    /// String literal body without the surrounding quotes.
    Str,
    Number,
    /// `'20240101'` date literal.
    Date,
    Punct(char),
    /// `&AtServer` without the ampersand.
    Directive,
    /// `#Region Name` without the hash.
    Preproc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// 1-based line the token starts on.
    pub line: u32,
}

impl Token<'_> {
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

/// A `//` comment; `text` excludes the slashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment<'a> {
    pub text: &'a str,
    pub line: u32,
}

#[derive(Debug, Default)]
pub struct Lexed<'a> {
    pub tokens: Vec<Token<'a>>,
    pub comments: Vec<Comment<'a>>,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn tokenize(src: &str) -> Lexed<'_> {
    let mut out = Lexed::default();
    let mut chars = src.char_indices().peekable();
    let mut line: u32 = 1;

    while let Some((start, c)) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                chars.next();
                let body_start = start + 2;
                let mut end = src.len();
                while let Some(&(i, ch)) = chars.peek() {
                    if ch == '\n' {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                out.comments.push(Comment {
                    text: &src[body_start..end],
                    line,
                });
            }
            '"' => {
                let token_line = line;
                let body_start = start + 1;
                let mut end = src.len();
                while let Some((i, ch)) = chars.next() {
                    match ch {
                        '\n' => line += 1,
                        '"' => {
                            if matches!(chars.peek(), Some((_, '"'))) {
                                chars.next();
                            } else {
                                end = i;
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                out.tokens.push(Token {
                    kind: TokenKind::Str,
                    text: &src[body_start..end],
                    line: token_line,
                });
            }
            '\'' => {
                let body_start = start + 1;
                let mut end = src.len();
                for (i, ch) in chars.by_ref() {
                    if ch == '\'' || ch == '\n' {
                        end = i;
                        if ch == '\n' {
                            line += 1;
                        }
                        break;
                    }
                }
                out.tokens.push(Token {
                    kind: TokenKind::Date,
                    text: &src[body_start..end],
                    line,
                });
            }
            '#' | '&' => {
                let kind = if c == '#' {
                    TokenKind::Preproc
                } else {
                    TokenKind::Directive
                };
                let body_start = start + c.len_utf8();
                let mut end = src.len();
                while let Some(&(i, ch)) = chars.peek() {
                    let stop = if kind == TokenKind::Preproc {
                        ch == '\n'
                    } else {
                        !is_ident_continue(ch)
                    };
                    if stop {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                out.tokens.push(Token {
                    kind,
                    text: src[body_start..end].trim(),
                    line,
                });
            }
            c if is_ident_start(c) => {
                let mut end = src.len();
                while let Some(&(i, ch)) = chars.peek() {
                    if !is_ident_continue(ch) {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                out.tokens.push(Token {
                    kind: TokenKind::Ident,
                    text: &src[start..end],
                    line,
                });
            }
            c if c.is_ascii_digit() => {
                let mut end = src.len();
                while let Some(&(i, ch)) = chars.peek() {
                    if !(ch.is_ascii_digit() || ch == '.') {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                out.tokens.push(Token {
                    kind: TokenKind::Number,
                    text: &src[start..end],
                    line,
                });
            }
            other => out.tokens.push(Token {
                kind: TokenKind::Punct(other),
                text: &src[start..start + other.len_utf8()],
                line,
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn idents_strings_and_punct() {
        let lexed = tokenize("Результат = Утилиты.Посчитать(\"a\"\"b\", 1.5);");
        let texts: Vec<_> = lexed.tokens.iter().map(|t| t.text).collect();
        assert_eq!(
            texts,
            vec!["Результат", "=", "Утилиты", ".", "Посчитать", "(", "a\"\"b", ",", "1.5", ")", ";"]
        );
    }

    #[test]
    fn comments_are_separate_and_keep_lines() {
        let lexed = tokenize("// first\nA(); // trailing\n");
        assert_eq!(lexed.comments.len(), 2);
        assert_eq!(lexed.comments[0].text, " first");
        assert_eq!(lexed.comments[1].line, 2);
        assert_eq!(lexed.tokens[0].line, 2);
    }

    #[test]
    fn multiline_string_advances_lines() {
        let lexed = tokenize("Т = \"ВЫБРАТЬ\n|ИЗ Справочник.Товары\";\nX();");
        let last = lexed.tokens.iter().find(|t| t.text == "X").unwrap();
        assert_eq!(last.line, 3);
    }

    #[test]
    fn directives_and_preprocessor() {
        assert_eq!(
            kinds("&НаСервере\n#Область Служебные\n"),
            vec![TokenKind::Directive, TokenKind::Preproc]
        );
        let lexed = tokenize("#Region Internal\n");
        assert_eq!(lexed.tokens[0].text, "Region Internal");
    }

    #[test]
    fn unterminated_string_does_not_panic() {
        let lexed = tokenize("A = \"open");
        assert_eq!(lexed.tokens.last().unwrap().kind, TokenKind::Str);
    }
}
