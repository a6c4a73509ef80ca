//! Split utility: moves `ListOfSpecies` out of an interchange document and back.
//!
//! Works on byte positions reported by the event reader so everything outside the
//! species list is kept exactly as the external tool wrote it.
use super::InterchangeError;
use quick_xml::Reader;
use quick_xml::events::Event;

const SPECIES_LIST: &str = "ListOfSpecies";
const PLACEHOLDER: &str = "<ListOfSpecies/>";
const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Byte ranges of every element named `name` at any depth (outermost only).
fn element_ranges(xml: &str, name: &str) -> Result<Vec<(usize, usize)>, InterchangeError> {
    let mut reader = Reader::from_str(xml);
    let mut ranges = Vec::new();
    let mut open: Option<(usize, usize)> = None; // (start, depth of nested same-name tags)
    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| InterchangeError::Xml {
            position: reader.error_position() as usize,
            message: e.to_string(),
        })?;
        let after = reader.buffer_position() as usize;
        match event {
            Event::Start(e) if e.name().as_ref() == name.as_bytes() => match open {
                Some((_, ref mut depth)) => *depth += 1,
                None => open = Some((before, 0)),
            },
            Event::End(e) if e.name().as_ref() == name.as_bytes() => match open {
                Some((_, ref mut depth)) if *depth > 0 => *depth -= 1,
                Some((start, _)) => {
                    ranges.push((start, after));
                    open = None;
                }
                None => {
                    return Err(InterchangeError::malformed(&format!("stray </{}>", name)));
                }
            },
            Event::Empty(e) if e.name().as_ref() == name.as_bytes() && open.is_none() => {
                ranges.push((before, after));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if open.is_some() {
        return Err(InterchangeError::malformed(&format!("unclosed <{}>", name)));
    }
    Ok(ranges)
}

fn species_range(xml: &str) -> Result<(usize, usize), InterchangeError> {
    match element_ranges(xml, SPECIES_LIST)?.as_slice() {
        [range] => Ok(*range),
        [] => Err(InterchangeError::malformed(SPECIES_LIST)),
        _ => Err(InterchangeError::malformed("more than one ListOfSpecies")),
    }
}

/// Returns `(rest, fragment)`: the document with an empty `<ListOfSpecies/>` placeholder
/// and a standalone document holding the original species list.
pub fn split_species(doc: &str) -> Result<(String, String), InterchangeError> {
    let (start, end) = species_range(doc)?;
    let mut rest = String::with_capacity(doc.len());
    rest.push_str(&doc[..start]);
    rest.push_str(PLACEHOLDER);
    rest.push_str(&doc[end..]);
    let fragment = format!("{}{}\n", DECLARATION, &doc[start..end]);
    Ok((rest, fragment))
}

/// Puts a species fragment (with or without XML declaration) back in place of the placeholder.
pub fn merge_species(rest: &str, fragment: &str) -> Result<String, InterchangeError> {
    let (start, end) = species_range(rest)?;
    let (f_start, f_end) = species_range(fragment)?;
    let mut doc = String::with_capacity(rest.len() + fragment.len());
    doc.push_str(&rest[..start]);
    doc.push_str(&fragment[f_start..f_end]);
    doc.push_str(&rest[end..]);
    Ok(doc)
}

/// One standalone `ListOfSpecies` document per `Species` of the fragment, keyed by species id.
pub fn single_species_documents(fragment: &str) -> Result<Vec<(String, String)>, InterchangeError> {
    let mut docs = Vec::new();
    for (start, end) in element_ranges(fragment, "Species")? {
        let text = &fragment[start..end];
        let element = super::xml_tree::parse_xml(text)?;
        let id = element.required_attr("id")?.to_string();
        docs.push((id, format!("{}<{}>\n{}\n</{}>\n", DECLARATION, SPECIES_LIST, text, SPECIES_LIST)));
    }
    Ok(docs)
}
