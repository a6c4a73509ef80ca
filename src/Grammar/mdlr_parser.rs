//! Recursive-descent parser for the extended model-description language.
//!
//! Recognised sections: `DEFINE_MOLECULES`, `DEFINE_REACTIONS`, `INSTANTIATE`,
//! `REACTION_DATA_OUTPUT`, `MODIFY_SURFACE_REGIONS`, `DEFINE_SURFACE_CLASSES`,
//! hashed extensions `#NAME { ... }` and top-level `KEY = value` statements.
//! Every other `HEADER { ... }` block (geometry and the like) is kept as raw text
//! after checking that its brackets are balanced.
use super::GrammarError;
use super::ast::{
    Assignment, CountKind, ExtensionEntry, GenericBlock, InstantiateAst, MoleculeDecl, ObjectAst,
    OutputEntry, ReleaseSiteAst, Section, SectionTree, SpeciesAst,
};
use super::lexer::{LexMode, TokenKind, tokenize};
use super::pattern::{RateStyle, TokenCursor, parse_molecule, parse_rule, parse_species};
use log::debug;

pub fn parse_model_description(src: &str) -> Result<SectionTree, GrammarError> {
    let tokens = tokenize(src, LexMode::ModelDescription)?;
    let mut cur = TokenCursor::new(tokens, src);
    let mut sections = Vec::new();
    loop {
        cur.skip_newlines();
        if cur.at_eof() {
            break;
        }
        let section = parse_section(&mut cur)?;
        debug!("parsed section {}", section.name());
        sections.push(section);
    }
    Ok(SectionTree { sections })
}

fn parse_section(cur: &mut TokenCursor) -> Result<Section, GrammarError> {
    if cur.at(&TokenKind::Hash) {
        cur.advance();
        let (name, _) = cur.expect_ident("after '#'")?;
        cur.skip_newlines();
        let entries = block_items(cur, &format!("#{}", name), parse_extension_entry)?;
        return Ok(Section::Extension { name, entries });
    }

    let keyword = match cur.kind() {
        TokenKind::Ident(s) => s.clone(),
        _ => return Err(cur.unexpected("expected section name or assignment")),
    };
    if cur.peek_nth(1).kind == TokenKind::Equals {
        return Ok(Section::Statement(parse_assignment(cur)?));
    }

    match keyword.as_str() {
        "DEFINE_MOLECULES" => {
            cur.advance();
            cur.skip_newlines();
            let decls = block_items(cur, "DEFINE_MOLECULES", parse_molecule_decl)?;
            Ok(Section::DefineMolecules(decls))
        }
        "DEFINE_REACTIONS" => {
            cur.advance();
            cur.skip_newlines();
            let rules = block_items(cur, "DEFINE_REACTIONS", |c| parse_rule(c, RateStyle::Bracketed))?;
            Ok(Section::DefineReactions(rules))
        }
        "INSTANTIATE" => {
            cur.advance();
            let (name, _) = cur.expect_ident("as instantiated object name")?;
            let (kind, _) = cur.expect_ident("as instantiated object kind")?;
            cur.skip_newlines();
            Ok(Section::Instantiate(parse_instantiate_body(cur, name, kind)?))
        }
        "REACTION_DATA_OUTPUT" => {
            cur.advance();
            cur.skip_newlines();
            let entries = block_items(cur, "REACTION_DATA_OUTPUT", parse_output_entry)?;
            Ok(Section::ReactionDataOutput(entries))
        }
        "MODIFY_SURFACE_REGIONS" => {
            cur.advance();
            cur.skip_newlines();
            let (raw, span) = cur.balanced_block()?;
            Ok(Section::ModifySurfaceRegions(GenericBlock { raw, span }))
        }
        "DEFINE_SURFACE_CLASSES" => {
            cur.advance();
            cur.skip_newlines();
            let (raw, span) = cur.balanced_block()?;
            Ok(Section::DefineSurfaceClasses(GenericBlock { raw, span }))
        }
        _ => {
            let (header, header_span) = cur.capture_until(|k| {
                matches!(k, TokenKind::LBrace | TokenKind::Newline | TokenKind::Eof)
            })?;
            cur.skip_newlines();
            if !cur.at(&TokenKind::LBrace) {
                return Err(cur.error(
                    &format!("expected '{{' or '=' after '{}'", header),
                    header_span,
                ));
            }
            let (raw, span) = cur.balanced_block()?;
            Ok(Section::Generic {
                header,
                block: GenericBlock { raw, span },
            })
        }
    }
}

/// `{ item* }` where items are separated by line breaks
fn block_items<'a, T>(
    cur: &mut TokenCursor<'a>,
    section: &str,
    mut item: impl FnMut(&mut TokenCursor<'a>) -> Result<T, GrammarError>,
) -> Result<Vec<T>, GrammarError> {
    let open = cur.expect(&TokenKind::LBrace, &format!("to open {}", section))?;
    let mut items = Vec::new();
    loop {
        cur.skip_newlines();
        if cur.eat(&TokenKind::RBrace) {
            return Ok(items);
        }
        if cur.at_eof() {
            return Err(cur.error(&format!("unterminated '{{' of {}", section), open.span));
        }
        items.push(item(cur)?);
    }
}

/// `KEY = value` up to the end of the line or the closing brace; a bare `KEY` has an empty value
fn parse_assignment(cur: &mut TokenCursor) -> Result<Assignment, GrammarError> {
    let (key, span) = cur.expect_ident("as property name")?;
    if !cur.eat(&TokenKind::Equals) {
        return Ok(Assignment {
            key,
            value: String::new(),
            span,
        });
    }
    let (value, value_span) = cur.capture_until(|k| {
        matches!(k, TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof)
    })?;
    if value.is_empty() {
        return Err(cur.error(&format!("missing value for '{}'", key), span));
    }
    Ok(Assignment {
        key,
        value,
        span: span.to(&value_span),
    })
}

fn parse_molecule_decl(cur: &mut TokenCursor) -> Result<MoleculeDecl, GrammarError> {
    let molecule = parse_molecule(cur)?;
    cur.skip_newlines();
    let properties = if cur.at(&TokenKind::LBrace) {
        block_items(cur, &format!("molecule '{}'", molecule.name), parse_assignment)?
    } else {
        Vec::new()
    };
    Ok(MoleculeDecl {
        molecule,
        properties,
    })
}

fn parse_extension_entry(cur: &mut TokenCursor) -> Result<ExtensionEntry, GrammarError> {
    if cur.peek_nth(1).kind == TokenKind::Equals {
        return Ok(ExtensionEntry::Assignment(parse_assignment(cur)?));
    }
    let name = if cur.peek_nth(1).kind == TokenKind::LParen {
        parse_molecule(cur)?.name
    } else {
        cur.expect_ident("as extension target")?.0
    };
    cur.skip_newlines();
    let properties = block_items(cur, &format!("'{}'", name), parse_assignment)?;
    Ok(ExtensionEntry::Target { name, properties })
}

fn parse_instantiate_body(
    cur: &mut TokenCursor,
    name: String,
    kind: String,
) -> Result<InstantiateAst, GrammarError> {
    let mut objects = Vec::new();
    let mut release_sites = Vec::new();
    let open = cur.expect(&TokenKind::LBrace, "to open INSTANTIATE")?;
    loop {
        cur.skip_newlines();
        if cur.eat(&TokenKind::RBrace) {
            break;
        }
        if cur.at_eof() {
            return Err(cur.error("unterminated '{' of INSTANTIATE", open.span));
        }
        let (item_name, span) = cur.expect_ident("as object or release site name")?;
        let (item_kind, kind_span) = cur.expect_ident("as OBJECT or RELEASE_SITE")?;
        match item_kind.as_str() {
            "RELEASE_SITE" => {
                cur.skip_newlines();
                release_sites.push(parse_release_site(cur, item_name, span)?);
            }
            "OBJECT" => {
                let (geometry, _) = cur.capture_until(|k| {
                    matches!(k, TokenKind::LBrace | TokenKind::Newline | TokenKind::Eof)
                })?;
                cur.skip_newlines();
                let (properties, raw_body) = parse_object_body(cur)?;
                objects.push(ObjectAst {
                    name: item_name,
                    geometry,
                    properties,
                    raw_body,
                    span,
                });
            }
            other => {
                return Err(cur.error(
                    &format!("expected OBJECT or RELEASE_SITE, found '{}'", other),
                    kind_span,
                ));
            }
        }
    }
    Ok(InstantiateAst {
        name,
        kind,
        objects,
        release_sites,
    })
}

/// Top-level assignments of an object body; nested blocks are skipped but kept in the raw text.
fn parse_object_body(cur: &mut TokenCursor) -> Result<(Vec<Assignment>, String), GrammarError> {
    let open = cur.expect(&TokenKind::LBrace, "to open object body")?;
    let mut properties = Vec::new();
    loop {
        cur.skip_newlines();
        if cur.at(&TokenKind::RBrace) {
            let close = cur.advance();
            let raw = cur.slice(&open.span.to(&close.span));
            let inner = raw[1..raw.len() - 1].trim().to_string();
            return Ok((properties, inner));
        }
        if cur.at_eof() {
            return Err(cur.error("unterminated '{' of object body", open.span));
        }
        if matches!(cur.kind(), TokenKind::Ident(_)) && cur.peek_nth(1).kind == TokenKind::Equals {
            properties.push(parse_assignment(cur)?);
            continue;
        }
        cur.capture_until(|k| {
            matches!(k, TokenKind::LBrace | TokenKind::RBrace | TokenKind::Newline | TokenKind::Eof)
        })?;
        cur.skip_newlines();
        if cur.at(&TokenKind::LBrace) {
            cur.balanced_block()?;
        }
    }
}

fn parse_release_site(
    cur: &mut TokenCursor,
    name: String,
    span: super::lexer::Span,
) -> Result<ReleaseSiteAst, GrammarError> {
    let mut molecule: Option<SpeciesAst> = None;
    let properties = block_items(cur, &format!("release site '{}'", name), |c| {
        if let TokenKind::Ident(key) = c.kind().clone() {
            if key == "MOLECULE" && c.peek_nth(1).kind == TokenKind::Equals {
                let key_token = c.advance();
                c.advance();
                let species = parse_species(c)?;
                let value = c.slice(&species.span).to_string();
                let span = key_token.span.to(&species.span);
                molecule = Some(species);
                return Ok(Assignment { key, value, span });
            }
        }
        parse_assignment(c)
    })?;
    Ok(ReleaseSiteAst {
        name,
        molecule,
        properties,
        span,
    })
}

fn parse_output_entry(cur: &mut TokenCursor) -> Result<OutputEntry, GrammarError> {
    if !cur.at(&TokenKind::LBrace) {
        return Ok(OutputEntry::Assignment(parse_assignment(cur)?));
    }
    let open = cur.advance();
    let mut kind;
    let mut patterns = Vec::new();
    let mut location;
    loop {
        let (counter, counter_span) = cur.expect_ident("as count expression (COUNT or COUNT_SPECIES)")?;
        kind = match counter.as_str() {
            "COUNT" => CountKind::Molecules,
            "COUNT_SPECIES" => CountKind::Species,
            other => {
                return Err(cur.error(&format!("unsupported counter '{}'", other), counter_span));
            }
        };
        cur.expect(&TokenKind::LBracket, "after COUNT")?;
        patterns.push(parse_species(cur)?);
        cur.expect(&TokenKind::Comma, "between count pattern and location")?;
        let (loc, _) = cur.capture_until(|k| matches!(k, TokenKind::RBracket | TokenKind::Newline))?;
        location = loc;
        cur.expect(&TokenKind::RBracket, "to close COUNT")?;
        if !cur.eat(&TokenKind::Plus) {
            break;
        }
    }
    cur.expect(&TokenKind::RBrace, "to close count expression")?;
    cur.expect(&TokenKind::FatArrow, "after count expression")?;
    let (path_raw, path_span) =
        cur.capture_until(|k| matches!(k, TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof))?;
    let path = match path_raw.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(inner) if !inner.contains('"') => inner.to_string(),
        _ => path_raw,
    };
    if path.is_empty() {
        return Err(cur.error("missing output file after '=>'", path_span));
    }
    Ok(OutputEntry::Count {
        kind,
        patterns,
        location,
        path,
        span: open.span.to(&path_span),
    })
}
