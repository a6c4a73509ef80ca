//! Token cursor and the molecule-pattern / reaction-rule grammar shared by both parsers.
//!
//! ```text
//! species   := '0' | 'NULL' | ['@' IDENT ':'] molecule ('.' molecule)* ["'"]
//! molecule  := IDENT ['(' [component (',' component)*] ')'] ['@' IDENT]
//! component := IDENT ('~' state)* ['!' (INT | '+' | '?')]
//! rule      := [IDENT ':'] species ('+' species)* ('->' | '<->') species ('+' species)* rate
//! ```
use super::GrammarError;
use super::ast::{BondAst, ComponentAst, MoleculeAst, RuleAst, SpeciesAst};
use super::lexer::{Span, Token, TokenKind};

pub struct TokenCursor<'a> {
    tokens: Vec<Token>,
    pos: usize,
    src: &'a str,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: Vec<Token>, src: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            src,
        }
    }

    pub fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    pub fn peek_nth(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub fn kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub fn at(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    pub fn at_eof(&self) -> bool {
        self.at(&TokenKind::Eof)
    }

    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: &TokenKind, context: &str) -> Result<Token, GrammarError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("expected {} {}", kind.describe(), context)))
        }
    }

    pub fn expect_ident(&mut self, context: &str) -> Result<(String, Span), GrammarError> {
        match self.kind().clone() {
            TokenKind::Ident(name) => {
                let token = self.advance();
                Ok((name, token.span))
            }
            _ => Err(self.unexpected(&format!("expected identifier {}", context))),
        }
    }

    pub fn skip_newlines(&mut self) {
        while self.at(&TokenKind::Newline) {
            self.advance();
        }
    }

    pub fn error(&self, message: &str, span: Span) -> GrammarError {
        GrammarError::new(message, span, self.src)
    }

    pub fn unexpected(&self, message: &str) -> GrammarError {
        let token = self.peek();
        self.error(
            &format!("{}, found {}", message, token.kind.describe()),
            token.span,
        )
    }

    pub fn slice(&self, span: &Span) -> &'a str {
        &self.src[span.start..span.end]
    }

    /// Collects tokens up to (not including) the first token for which `stop` holds
    /// outside any bracket pair, and returns the source text they cover.
    /// Unbalanced closers inside the run are reported as errors.
    pub fn capture_until(
        &mut self,
        stop: impl Fn(&TokenKind) -> bool,
    ) -> Result<(String, Span), GrammarError> {
        let first = self.peek().span;
        let mut last: Option<Span> = None;
        let mut stack: Vec<(TokenKind, Span)> = Vec::new();
        loop {
            let token = self.peek().clone();
            if stack.is_empty() && stop(&token.kind) {
                break;
            }
            match &token.kind {
                TokenKind::Eof => {
                    if let Some((open, span)) = stack.last() {
                        return Err(self.error(
                            &format!("unterminated {}", open.describe()),
                            *span,
                        ));
                    }
                    break;
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    stack.push((token.kind.clone(), token.span));
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    match stack.pop() {
                        Some((open, _)) if closes(&open, &token.kind) => {}
                        Some((open, span)) => {
                            return Err(self.error(
                                &format!(
                                    "{} closed by {}",
                                    open.describe(),
                                    token.kind.describe()
                                ),
                                span.to(&token.span),
                            ));
                        }
                        None => {
                            return Err(self.error(
                                &format!("unbalanced {}", token.kind.describe()),
                                token.span,
                            ));
                        }
                    }
                }
                _ => {}
            }
            last = Some(token.span);
            self.advance();
        }
        match last {
            Some(last) => {
                let span = first.to(&last);
                Ok((self.slice(&span).trim().to_string(), span))
            }
            None => Ok((String::new(), Span { end: first.start, ..first })),
        }
    }

    /// Skips a balanced `{ ... }` block starting at the current `{` and returns its inner text.
    pub fn balanced_block(&mut self) -> Result<(String, Span), GrammarError> {
        let open = self.expect(&TokenKind::LBrace, "to open block")?;
        let mut stack: Vec<(TokenKind, Span)> = vec![(TokenKind::LBrace, open.span)];
        loop {
            let token = self.advance();
            match &token.kind {
                TokenKind::Eof => {
                    let (kind, span) = stack.last().cloned().unwrap_or((TokenKind::LBrace, open.span));
                    return Err(self.error(&format!("unterminated {}", kind.describe()), span));
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    stack.push((token.kind.clone(), token.span));
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    match stack.pop() {
                        Some((kind, _)) if closes(&kind, &token.kind) => {
                            if stack.is_empty() {
                                let inner = &self.src[open.span.end..token.span.start];
                                return Ok((inner.to_string(), open.span.to(&token.span)));
                            }
                        }
                        Some((kind, span)) => {
                            return Err(self.error(
                                &format!("{} closed by {}", kind.describe(), token.kind.describe()),
                                span.to(&token.span),
                            ));
                        }
                        None => {
                            return Err(self.error(
                                &format!("unbalanced {}", token.kind.describe()),
                                token.span,
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn closes(open: &TokenKind, close: &TokenKind) -> bool {
    matches!(
        (open, close),
        (TokenKind::LParen, TokenKind::RParen)
            | (TokenKind::LBracket, TokenKind::RBracket)
            | (TokenKind::LBrace, TokenKind::RBrace)
    )
}

/// How the rate of a rule is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateStyle {
    /// `[kf]` or `[kf, kr]`, optionally followed by `: name`
    Bracketed,
    /// rest of the line: `kf` or `kf, kr`
    Trailing,
}

/// rule modifiers the expansion tool accepts after the rate; dropped on read
const RULE_MODIFIERS: &[&str] = &[
    "DeleteMolecules",
    "MoveConnected",
    "TotalRate",
    "include_reactants",
    "exclude_reactants",
    "include_products",
    "exclude_products",
];

pub fn parse_species(cur: &mut TokenCursor) -> Result<SpeciesAst, GrammarError> {
    let start = cur.peek().span;
    match cur.kind().clone() {
        TokenKind::Number(n) if n == "0" => {
            cur.advance();
            return Ok(SpeciesAst {
                compartment: None,
                molecules: Vec::new(),
                oriented: false,
                span: start,
            });
        }
        TokenKind::Ident(n) if n == "NULL" => {
            cur.advance();
            return Ok(SpeciesAst {
                compartment: None,
                molecules: Vec::new(),
                oriented: false,
                span: start,
            });
        }
        _ => {}
    }

    let mut compartment = None;
    if cur.at(&TokenKind::At)
        && matches!(cur.peek_nth(1).kind, TokenKind::Ident(_))
        && cur.peek_nth(2).kind == TokenKind::Colon
    {
        cur.advance();
        let (name, _) = cur.expect_ident("after '@'")?;
        cur.advance();
        // `@C::A` is accepted as a synonym
        cur.eat(&TokenKind::Colon);
        compartment = Some(name);
    }

    let mut molecules = vec![parse_molecule(cur)?];
    while cur.at(&TokenKind::Dot) {
        cur.advance();
        molecules.push(parse_molecule(cur)?);
    }
    let oriented = cur.eat(&TokenKind::Quote);
    let end = molecules.last().map(|m| m.span).unwrap_or(start);
    Ok(SpeciesAst {
        compartment,
        molecules,
        oriented,
        span: start.to(&end),
    })
}

pub fn parse_molecule(cur: &mut TokenCursor) -> Result<MoleculeAst, GrammarError> {
    let (name, start) = cur.expect_ident("as molecule name")?;
    let mut end = start;
    let mut components = Vec::new();
    if cur.at(&TokenKind::LParen) {
        let open = cur.advance();
        if !cur.at(&TokenKind::RParen) {
            loop {
                components.push(parse_component(cur)?);
                if !cur.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if !cur.at(&TokenKind::RParen) {
            if cur.at_eof() || cur.at(&TokenKind::Newline) {
                return Err(cur.error(&format!("unterminated '(' in molecule '{}'", name), open.span));
            }
            return Err(cur.unexpected(&format!("expected ',' or ')' in molecule '{}'", name)));
        }
        end = cur.advance().span;
    }
    let mut compartment = None;
    if cur.at(&TokenKind::At)
        && matches!(cur.peek_nth(1).kind, TokenKind::Ident(_))
        && cur.peek_nth(2).kind != TokenKind::Colon
    {
        cur.advance();
        let (comp, span) = cur.expect_ident("as compartment")?;
        compartment = Some(comp);
        end = span;
    }
    Ok(MoleculeAst {
        name,
        components,
        compartment,
        span: start.to(&end),
    })
}

pub fn parse_component(cur: &mut TokenCursor) -> Result<ComponentAst, GrammarError> {
    let (name, start) = cur.expect_ident("as component name")?;
    let mut end = start;
    let mut states = Vec::new();
    while cur.at(&TokenKind::Tilde) {
        cur.advance();
        let token = cur.advance();
        let state = match &token.kind {
            TokenKind::Ident(s) | TokenKind::Number(s) => s.clone(),
            TokenKind::Question => "?".to_string(),
            _ => {
                return Err(cur.error(
                    &format!("malformed state of component '{}'", name),
                    start.to(&token.span),
                ));
            }
        };
        states.push(state);
        end = token.span;
    }
    let mut bond = BondAst::Unbound;
    if cur.at(&TokenKind::Bang) {
        let bang = cur.advance();
        let token = cur.advance();
        bond = match &token.kind {
            TokenKind::Number(n) => match n.parse::<u32>() {
                Ok(label) => BondAst::Label(label),
                Err(_) => {
                    return Err(cur.error(
                        &format!("malformed bond syntax '!{}': bond label must be an integer", n),
                        bang.span.to(&token.span),
                    ));
                }
            },
            TokenKind::Plus => BondAst::AnyBound,
            TokenKind::Question => BondAst::Any,
            _ => {
                return Err(cur.error(
                    "malformed bond syntax: expected integer, '+' or '?' after '!'",
                    bang.span.to(&token.span),
                ));
            }
        };
        end = token.span;
        if cur.at(&TokenKind::Bang) {
            return Err(cur.error(
                &format!("component '{}' carries more than one bond", name),
                start.to(&cur.peek().span),
            ));
        }
    }
    Ok(ComponentAst {
        name,
        states,
        bond,
        span: start.to(&end),
    })
}

fn parse_species_list(cur: &mut TokenCursor) -> Result<Vec<SpeciesAst>, GrammarError> {
    let mut list = vec![parse_species(cur)?];
    while cur.at(&TokenKind::Plus) {
        cur.advance();
        list.push(parse_species(cur)?);
    }
    Ok(list)
}

pub fn parse_rule(cur: &mut TokenCursor, style: RateStyle) -> Result<RuleAst, GrammarError> {
    let start = cur.peek().span;
    let mut name = None;
    if matches!(cur.kind(), TokenKind::Ident(_)) && cur.peek_nth(1).kind == TokenKind::Colon {
        let (label, _) = cur.expect_ident("as rule name")?;
        cur.advance();
        name = Some(label);
    }
    let reactants = parse_species_list(cur)?;
    let reversible = match cur.kind() {
        TokenKind::Arrow => false,
        TokenKind::BiArrow => true,
        _ => return Err(cur.unexpected("expected '->' or '<->' in reaction rule")),
    };
    cur.advance();
    let products = parse_species_list(cur)?;

    let rates = match style {
        RateStyle::Bracketed => {
            if !cur.at(&TokenKind::LBracket) {
                return Err(cur.error("reaction rule is missing its rate clause '[...]'", start.to(&cur.peek().span)));
            }
            cur.advance();
            let mut rates = Vec::new();
            loop {
                let (rate, span) =
                    cur.capture_until(|k| matches!(k, TokenKind::Comma | TokenKind::RBracket | TokenKind::Newline))?;
                if rate.is_empty() {
                    return Err(cur.error("empty rate expression", span));
                }
                rates.push(rate);
                if !cur.eat(&TokenKind::Comma) {
                    break;
                }
            }
            if !cur.at(&TokenKind::RBracket) {
                return Err(cur.unexpected("expected ']' to close rate clause"));
            }
            cur.advance();
            if cur.at(&TokenKind::Colon) {
                cur.advance();
                let (label, _) = cur.expect_ident("as rule name after ':'")?;
                name = Some(label);
            }
            rates
        }
        RateStyle::Trailing => {
            let mut rates = Vec::new();
            loop {
                let (rate, _) = cur.capture_until(|k| {
                    matches!(k, TokenKind::Comma | TokenKind::Newline | TokenKind::Eof)
                })?;
                let rate = strip_modifiers(&rate);
                if !rate.is_empty() {
                    rates.push(rate);
                }
                if !cur.eat(&TokenKind::Comma) {
                    break;
                }
            }
            if rates.is_empty() {
                return Err(cur.error("reaction rule is missing its rate", start.to(&cur.peek().span)));
            }
            rates
        }
    };

    let expected = if reversible { 2 } else { 1 };
    if rates.len() != expected {
        return Err(cur.error(
            &format!(
                "{} rule needs {} rate expression(s), found {}",
                if reversible { "reversible" } else { "irreversible" },
                expected,
                rates.len()
            ),
            start.to(&cur.peek().span),
        ));
    }
    Ok(RuleAst {
        name,
        reactants,
        products,
        reversible,
        rates,
        span: start,
    })
}

/// Cuts the rate at the first modifier that stands as a whole word.
fn strip_modifiers(rate: &str) -> String {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut cut = rate.len();
    for modifier in RULE_MODIFIERS {
        for (idx, _) in rate.match_indices(modifier) {
            let before = rate[..idx].chars().next_back();
            let after = rate[idx + modifier.len()..].chars().next();
            if !before.is_some_and(is_ident) && !after.is_some_and(is_ident) {
                cut = cut.min(idx);
                break;
            }
        }
    }
    rate[..cut].trim().to_string()
}
