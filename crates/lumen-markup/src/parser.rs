use crate::ast::{Node, Prop, Props, SceneDocument, Value};
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenWithPos};

// ── Parser ────────────────────────────────────────────────────────────────

pub struct Parser {
    tokens: Vec<TokenWithPos>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<TokenWithPos>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current_pos(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos)
            .map(|t| (t.line, t.col))
            .or_else(|| self.tokens.last().map(|t| (t.line, t.col)))
            .unwrap_or((1, 1))
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    /// Look at the token `offset` positions ahead of current without consuming.
    fn peek_ahead(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos)
            .map(|t| t.token.clone())
            .unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        let (line, col) = self.current_pos();
        ParseError::new(msg, line, col)
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let err = self.err("expected identifier");
        match self.advance() {
            Token::Ident(s) => Ok(s),
            tok => Err(ParseError { message: format!("expected identifier, got {:?}", tok), ..err }),
        }
    }

    // ── Document ──────────────────────────────────────────────────────────

    pub fn parse_document(&mut self) -> Result<SceneDocument, ParseError> {
        let mut roots = Vec::new();
        while self.peek() != &Token::Eof {
            roots.push(self.parse_node()?);
        }
        Ok(SceneDocument { roots })
    }

    // ── Node ──────────────────────────────────────────────────────────────

    fn parse_node(&mut self) -> Result<Node, ParseError> {
        let (line, _) = self.current_pos();
        let tag = self.expect_ident()?;

        let (props, children) = if self.peek() == &Token::LBrace {
            self.parse_block()?
        } else {
            (Props::new(), Vec::new())
        };

        Ok(Node { tag, props, children, line })
    }

    // ── Block ─────────────────────────────────────────────────────────────

    /// Parse `{ item* }` where each item is either a `key: value` property
    /// or a child node.
    ///
    /// `Ident ":"` is a property, any other `Ident` starts a child node.
    fn parse_block(&mut self) -> Result<(Props, Vec<Node>), ParseError> {
        self.advance(); // consume `{`
        let mut props = Vec::new();
        let mut children = Vec::new();

        loop {
            match self.peek() {
                Token::RBrace => { self.advance(); break; }
                Token::Eof    => return Err(self.err("unclosed '{' block")),
                Token::Ident(_) => {
                    if self.peek_ahead(1) == &Token::Colon {
                        props.push(self.parse_prop()?);
                    } else {
                        children.push(self.parse_node()?);
                    }
                }
                tok => {
                    return Err(self.err(format!(
                        "unexpected {:?} inside block, expected a property (key: value) or an element tag",
                        tok
                    )));
                }
            }
        }

        Ok((Props(props), children))
    }

    // ── Prop ──────────────────────────────────────────────────────────────

    fn parse_prop(&mut self) -> Result<Prop, ParseError> {
        let key = self.expect_ident()?;
        self.advance(); // consume `:`
        let value = self.parse_value()?;
        Ok(Prop { key, value })
    }

    // ── Value ─────────────────────────────────────────────────────────────

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let err = self.err("expected a value");
        match self.advance() {
            Token::Str(s)    => Ok(Value::Str(s)),
            Token::Number(n) => Ok(Value::Number(n)),
            Token::Ident(s)  => Ok(Value::Ident(s)),
            Token::LBracket  => self.parse_list(),
            Token::LBrace    => self.parse_record(),
            tok => Err(ParseError { message: format!("expected a value, got {:?}", tok), ..err }),
        }
    }

    /// Items after `[`, separated by optional commas, up to `]`.
    fn parse_list(&mut self) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Token::RBracket => { self.advance(); break; }
                Token::Comma    => { self.advance(); }
                Token::Eof      => return Err(self.err("unclosed '[' list")),
                _ => items.push(self.parse_value()?),
            }
        }
        Ok(Value::List(items))
    }

    /// Properties after `{`, separated by optional commas, up to `}`.
    fn parse_record(&mut self) -> Result<Value, ParseError> {
        let mut props = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => { self.advance(); break; }
                Token::Comma  => { self.advance(); }
                Token::Eof    => return Err(self.err("unclosed '{' record")),
                Token::Ident(_) if self.peek_ahead(1) == &Token::Colon => {
                    props.push(self.parse_prop()?);
                }
                tok => {
                    return Err(self.err(format!(
                        "unexpected {:?} inside record, expected key: value",
                        tok
                    )));
                }
            }
        }
        Ok(Value::Record(Props(props)))
    }
}

// ── Public parse entry point ──────────────────────────────────────────────

/// Parse an `.lsm` source string into a [`SceneDocument`].
pub fn parse_str(src: &str) -> Result<SceneDocument, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens).parse_document()
}
