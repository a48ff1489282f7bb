use crate::errors::PlanParseError;
use crate::plan::lexer::{lex, Token};

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Str(String),
    Num(f64),
    List(Vec<Expr>),
    Ident(String),
    Call { name: String, args: Vec<Expr> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub target: String,
    pub expr: Expr,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// Parse plan source into a statement list. Every statement must be an
/// assignment `name = expr`; expressions are literals, identifiers, lists,
/// and function calls.
pub fn parse(source: &str) -> Result<Program, PlanParseError> {
    let tokens = lex(source)?;
    Parser { tokens, position: 0 }.program()
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn program(mut self) -> Result<Program, PlanParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.peek().is_none() {
                break;
            }
            statements.push(self.statement()?);
            match self.peek() {
                None => break,
                Some(Token::Separator) => continue,
                Some(other) => return Err(PlanParseError::UnexpectedToken(describe(other))),
            }
        }
        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Stmt, PlanParseError> {
        let target = match self.next() {
            Some(Token::Ident(name)) => name,
            Some(other) => return Err(PlanParseError::MissingAssignment(describe(&other))),
            None => return Err(PlanParseError::UnexpectedEnd),
        };
        match self.next() {
            Some(Token::Equals) => {}
            Some(other) => return Err(PlanParseError::MissingAssignment(describe(&other))),
            None => return Err(PlanParseError::UnexpectedEnd),
        }
        let expr = self.expression()?;
        Ok(Stmt { target, expr })
    }

    fn expression(&mut self) -> Result<Expr, PlanParseError> {
        match self.next() {
            Some(Token::Str(value)) => Ok(Expr::Str(value)),
            Some(Token::Num(value)) => Ok(Expr::Num(value)),
            Some(Token::LBracket) => self.list(),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.next();
                    let args = self.arguments()?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(other) => Err(PlanParseError::UnexpectedToken(describe(&other))),
            None => Err(PlanParseError::UnexpectedEnd),
        }
    }

    fn list(&mut self) -> Result<Expr, PlanParseError> {
        let mut items = Vec::new();
        if matches!(self.peek(), Some(Token::RBracket)) {
            self.next();
            return Ok(Expr::List(items));
        }
        loop {
            items.push(self.expression()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBracket) => return Ok(Expr::List(items)),
                Some(other) => return Err(PlanParseError::UnexpectedToken(describe(&other))),
                None => return Err(PlanParseError::UnexpectedEnd),
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, PlanParseError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.next();
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(other) => return Err(PlanParseError::UnexpectedToken(describe(&other))),
                None => return Err(PlanParseError::UnexpectedEnd),
            }
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(Token::Separator)) {
            self.position += 1;
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => name.clone(),
        Token::Str(value) => format!("\"{value}\""),
        Token::Num(value) => value.to_string(),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::LBracket => "[".to_string(),
        Token::RBracket => "]".to_string(),
        Token::Comma => ",".to_string(),
        Token::Equals => "=".to_string(),
        Token::Separator => "newline".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, Expr};
    use crate::errors::PlanParseError;

    #[test]
    fn parses_multi_statement_pipeline() {
        let program = parse(
            "filtered = filter(dataset, and(eq(\"ledger_type\", \"revenue\"), eq(\"quarter\", \"2024-Q1\")))\n\
             result = group_sum(filtered, [\"ledger_type\"], \"profit\")",
        )
        .expect("valid program");

        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[0].target, "filtered");
        assert_eq!(program.statements[1].target, "result");
        match &program.statements[1].expr {
            Expr::Call { name, args } => {
                assert_eq!(name, "group_sum");
                assert_eq!(args.len(), 3);
                assert!(matches!(args[1], Expr::List(_)));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn bare_identifier_expression_is_allowed() {
        let program = parse("x = dataset\nresult = x").expect("valid program");
        assert_eq!(program.statements[1].expr, Expr::Ident("x".to_string()));
    }

    #[test]
    fn statement_without_assignment_is_rejected() {
        let error = parse("filter(dataset, eq(\"a\", 1))").expect_err("must fail");
        assert!(matches!(error, PlanParseError::MissingAssignment(_)));
    }

    #[test]
    fn empty_source_parses_to_empty_program() {
        assert!(parse("\n\n").expect("empty ok").statements.is_empty());
    }

    #[test]
    fn trailing_garbage_after_expression_is_rejected() {
        let error = parse("a = count(dataset) count(dataset)").expect_err("must fail");
        assert!(matches!(error, PlanParseError::UnexpectedToken(_)));
    }
}
