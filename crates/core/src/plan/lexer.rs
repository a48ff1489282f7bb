use crate::errors::PlanParseError;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Equals,
    /// Statement separator: newline or semicolon.
    Separator,
}

/// Tokenize plan source. `#` starts a comment running to end of line;
/// strings take single or double quotes without escapes.
pub fn lex(source: &str) -> Result<Vec<Token>, PlanParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&character) = chars.peek() {
        match character {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '\n' | ';' => {
                chars.next();
                tokens.push(Token::Separator);
            }
            '#' => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        tokens.push(Token::Separator);
                        break;
                    }
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Equals);
            }
            '"' | '\'' => {
                let quote = character;
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == quote {
                        closed = true;
                        break;
                    }
                    if next == '\n' {
                        return Err(PlanParseError::UnterminatedString);
                    }
                    literal.push(next);
                }
                if !closed {
                    return Err(PlanParseError::UnterminatedString);
                }
                tokens.push(Token::Str(literal));
            }
            '-' | '0'..='9' => {
                let mut literal = String::new();
                literal.push(character);
                chars.next();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        literal.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| PlanParseError::UnexpectedToken(literal.clone()))?;
                tokens.push(Token::Num(value));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(PlanParseError::UnexpectedCharacter(other)),
        }
    }

    Ok(tokens)
}
