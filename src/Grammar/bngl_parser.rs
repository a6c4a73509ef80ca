//! Reader for the rule-language text format (`begin <section>` ... `end <section>`).
//!
//! Accepts the files written by the rule-language emitter and the common hand-written
//! subset: `#` comments, `\` line continuation, an optional `begin model` / `end model`
//! wrapper, `name:` rule labels and action calls such as `generate_network({...})`,
//! which are skipped.
use super::GrammarError;
use super::ast::{
    Assignment, CompartmentAst, CountKind, FunctionAst, ObservableAst, Section, SectionTree,
    SeedAst,
};
use super::lexer::{LexMode, Span, TokenKind, tokenize};
use super::pattern::{RateStyle, TokenCursor, parse_molecule, parse_rule, parse_species};
use log::debug;

pub fn parse_rule_language(src: &str) -> Result<SectionTree, GrammarError> {
    let tokens = tokenize(src, LexMode::RuleLanguage)?;
    let mut cur = TokenCursor::new(tokens, src);
    let mut sections = Vec::new();
    loop {
        cur.skip_newlines();
        if cur.at_eof() {
            break;
        }
        let (keyword, span) = cur.expect_ident("('begin', 'end' or an action)")?;
        match keyword.as_str() {
            "begin" => {
                let name = section_name(&mut cur)?;
                let section = match name.as_str() {
                    "model" => continue,
                    "parameters" => Section::Parameters(section_lines(&mut cur, &name, span, parse_parameter)?),
                    "molecule types" => {
                        Section::MoleculeTypes(section_lines(&mut cur, &name, span, parse_molecule)?)
                    }
                    "compartments" => {
                        Section::Compartments(section_lines(&mut cur, &name, span, parse_compartment)?)
                    }
                    "seed species" | "species" => {
                        Section::SeedSpecies(section_lines(&mut cur, &name, span, parse_seed)?)
                    }
                    "observables" => {
                        Section::Observables(section_lines(&mut cur, &name, span, parse_observable)?)
                    }
                    "functions" => Section::Functions(section_lines(&mut cur, &name, span, parse_function)?),
                    "reaction rules" => Section::ReactionRules(section_lines(&mut cur, &name, span, |c| {
                        parse_rule(c, RateStyle::Trailing)
                    })?),
                    "actions" => {
                        section_lines(&mut cur, &name, span, |c| {
                            c.capture_until(|k| matches!(k, TokenKind::Newline | TokenKind::Eof))
                        })?;
                        continue;
                    }
                    other => {
                        return Err(cur.error(&format!("unknown section 'begin {}'", other), span));
                    }
                };
                debug!("parsed section {}", section.name());
                sections.push(section);
            }
            "end" => {
                let name = section_name(&mut cur)?;
                if name != "model" {
                    return Err(cur.error(&format!("'end {}' without matching 'begin'", name), span));
                }
            }
            _ if cur.at(&TokenKind::LParen) => {
                let (call, _) = cur.capture_until(|k| matches!(k, TokenKind::Newline | TokenKind::Eof))?;
                debug!("skipping action {}{}", keyword, call);
            }
            other => {
                return Err(cur.error(&format!("unexpected '{}' outside of a section", other), span));
            }
        }
    }
    Ok(SectionTree { sections })
}

/// words up to the end of the line, joined by single spaces
fn section_name(cur: &mut TokenCursor) -> Result<String, GrammarError> {
    let mut words = Vec::new();
    while let TokenKind::Ident(word) = cur.kind().clone() {
        cur.advance();
        words.push(word);
    }
    if words.is_empty() {
        return Err(cur.unexpected("expected section name"));
    }
    expect_line_end(cur)?;
    Ok(words.join(" "))
}

fn expect_line_end(cur: &mut TokenCursor) -> Result<(), GrammarError> {
    if cur.at(&TokenKind::Newline) || cur.at_eof() {
        Ok(())
    } else {
        Err(cur.unexpected("expected end of line"))
    }
}

fn section_lines<'a, T>(
    cur: &mut TokenCursor<'a>,
    name: &str,
    open: Span,
    mut item: impl FnMut(&mut TokenCursor<'a>) -> Result<T, GrammarError>,
) -> Result<Vec<T>, GrammarError> {
    let mut items = Vec::new();
    loop {
        cur.skip_newlines();
        if cur.at_eof() {
            return Err(cur.error(&format!("unterminated section 'begin {}'", name), open));
        }
        if cur.at(&TokenKind::Ident("end".to_string())) {
            let end = cur.advance();
            let closing = section_name(cur)?;
            if closing != name {
                return Err(cur.error(
                    &format!("expected 'end {}', found 'end {}'", name, closing),
                    end.span,
                ));
            }
            return Ok(items);
        }
        items.push(item(cur)?);
        expect_line_end(cur)?;
    }
}

fn rest_of_line(cur: &mut TokenCursor) -> Result<(String, Span), GrammarError> {
    cur.capture_until(|k| matches!(k, TokenKind::Newline | TokenKind::Eof))
}

fn parse_parameter(cur: &mut TokenCursor) -> Result<Assignment, GrammarError> {
    let (key, span) = cur.expect_ident("as parameter name")?;
    cur.eat(&TokenKind::Equals);
    let (value, value_span) = rest_of_line(cur)?;
    if value.is_empty() {
        return Err(cur.error(&format!("parameter '{}' has no value", key), span));
    }
    Ok(Assignment {
        key,
        value,
        span: span.to(&value_span),
    })
}

fn parse_compartment(cur: &mut TokenCursor) -> Result<CompartmentAst, GrammarError> {
    let (name, span) = cur.expect_ident("as compartment name")?;
    let dims_token = cur.advance();
    let dimensions = match &dims_token.kind {
        TokenKind::Number(n) if n == "2" => 2,
        TokenKind::Number(n) if n == "3" => 3,
        _ => {
            return Err(cur.error(
                &format!("compartment '{}' must have dimension 2 or 3", name),
                dims_token.span,
            ));
        }
    };
    let (rest, rest_span) = rest_of_line(cur)?;
    let words: Vec<&str> = rest.split_whitespace().collect();
    let (size, parent) = match words.as_slice() {
        [] => {
            return Err(cur.error(&format!("compartment '{}' has no size", name), span));
        }
        [size] => (size.to_string(), None),
        [init @ .., last] if is_identifier(last) => (init.join(" "), Some(last.to_string())),
        _ => (rest.clone(), None),
    };
    Ok(CompartmentAst {
        name,
        dimensions,
        size,
        parent,
        span: span.to(&rest_span),
    })
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_seed(cur: &mut TokenCursor) -> Result<SeedAst, GrammarError> {
    let species = parse_species(cur)?;
    let (amount, _) = rest_of_line(cur)?;
    if amount.is_empty() {
        return Err(cur.error("seed species has no initial amount", species.span));
    }
    Ok(SeedAst { species, amount })
}

fn parse_observable(cur: &mut TokenCursor) -> Result<ObservableAst, GrammarError> {
    let (kind_word, span) = cur.expect_ident("as observable type")?;
    let kind = match kind_word.as_str() {
        "Molecules" => CountKind::Molecules,
        "Species" => CountKind::Species,
        other => {
            return Err(cur.error(&format!("unknown observable type '{}'", other), span));
        }
    };
    let (name, _) = cur.expect_ident("as observable name")?;
    let mut patterns = vec![parse_species(cur)?];
    while !cur.at(&TokenKind::Newline) && !cur.at_eof() {
        cur.eat(&TokenKind::Comma);
        patterns.push(parse_species(cur)?);
    }
    Ok(ObservableAst {
        kind,
        name,
        patterns,
        span,
    })
}

fn parse_function(cur: &mut TokenCursor) -> Result<FunctionAst, GrammarError> {
    let (name, span) = cur.expect_ident("as function name")?;
    let mut args = Vec::new();
    if cur.eat(&TokenKind::LParen) {
        while let TokenKind::Ident(arg) = cur.kind().clone() {
            cur.advance();
            args.push(arg);
            if !cur.eat(&TokenKind::Comma) {
                break;
            }
        }
        cur.expect(&TokenKind::RParen, &format!("to close arguments of '{}'", name))?;
    }
    cur.eat(&TokenKind::Equals);
    let (expression, _) = rest_of_line(cur)?;
    if expression.is_empty() {
        return Err(cur.error(&format!("function '{}' has no expression", name), span));
    }
    Ok(FunctionAst {
        name,
        args,
        expression,
        span,
    })
}
