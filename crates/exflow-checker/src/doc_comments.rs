//! `<exception>` tags from XML documentation.
//!
//! Two sources are understood: the `///` fragment attached to a declaration
//! and the per-module sidecar file in the .NET documentation format
//! (`<doc><members><member name="M:...">`). Both are read with the same
//! streaming parser; the fragment is wrapped in a synthetic `<doc>` root.
//!
//! Member ids follow the documentation-id grammar: a kind prefix (`M:` or
//! `P:`), the owner's full name with a `` `N`` arity suffix for generic
//! types, `#ctor` for constructors, `Item` for indexers, and the full
//! parameter type names in parentheses (`` `N`` / ``` ``N``` for type and
//! method type parameters).

use exflow_binder::{MemberInfo, MemberKind, SemanticModel, Ty};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocException {
    /// `cref` as written, e.g. `T:System.FormatException`.
    pub cref: String,
    /// Prose of the tag with `<paramref>` and `<see>` flattened to names.
    pub description: String,
    pub param_names: SmallVec<[String; 1]>,
}

/// A parsed sidecar documentation file.
#[derive(Clone, Debug, Default)]
pub struct DocFile {
    members: FxHashMap<String, Vec<DocException>>,
    /// Member ids without their parameter list, for overload-insensitive lookup.
    by_stem: FxHashMap<String, Vec<String>>,
}

impl DocFile {
    pub fn parse(xml: &str) -> Result<DocFile, quick_xml::Error> {
        let mut file = DocFile::default();
        for (member, exception) in parse_exceptions(xml)? {
            let Some(member) = member else {
                continue;
            };
            if !file.members.contains_key(&member) {
                file.by_stem
                    .entry(stem(&member).to_string())
                    .or_default()
                    .push(member.clone());
            }
            file.members.entry(member).or_default().push(exception);
        }
        Ok(file)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Exceptions documented for `id`. An id whose parameter list does not
    /// match any entry falls back to the single member with the same stem.
    pub fn exceptions(&self, id: &str) -> Option<&[DocException]> {
        if let Some(found) = self.members.get(id) {
            return Some(found);
        }
        match self.by_stem.get(stem(id))?.as_slice() {
            [only] => self.members.get(only).map(Vec::as_slice),
            _ => None,
        }
    }
}

fn stem(id: &str) -> &str {
    id.split('(').next().unwrap_or(id)
}

/// Parse the `///` fragment of one declaration.
pub fn parse_fragment(fragment: &str) -> Result<Vec<DocException>, quick_xml::Error> {
    let wrapped = format!("<doc>{fragment}</doc>");
    Ok(parse_exceptions(&wrapped)?
        .into_iter()
        .map(|(_, exception)| exception)
        .collect())
}

fn attribute(start: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Every `<exception>` element, paired with the enclosing `<member name>`.
fn parse_exceptions(xml: &str) -> Result<Vec<(Option<String>, DocException)>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut out = Vec::new();
    let mut member: Option<String> = None;
    let mut current: Option<DocException> = None;
    let mut nested = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"member" => member = attribute(&start, b"name")?,
                b"exception" if current.is_none() => {
                    current = Some(DocException {
                        cref: attribute(&start, b"cref")?.unwrap_or_default(),
                        ..DocException::default()
                    });
                    nested = 0;
                }
                _ => {
                    if current.is_some() {
                        nested += 1;
                    }
                }
            },
            Event::Empty(empty) => {
                if let Some(exception) = current.as_mut() {
                    inline_reference(&empty, exception)?;
                } else if empty.name().as_ref() == b"exception" {
                    out.push((
                        member.clone(),
                        DocException {
                            cref: attribute(&empty, b"cref")?.unwrap_or_default(),
                            ..DocException::default()
                        },
                    ));
                }
            }
            Event::Text(text) => {
                if let Some(exception) = current.as_mut() {
                    let text = match text.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(_) => String::from_utf8_lossy(&text).into_owned(),
                    };
                    exception.description.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(exception) = current.as_mut() {
                    exception
                        .description
                        .push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(end) => match end.name().as_ref() {
                b"exception" if nested == 0 => {
                    if let Some(mut exception) = current.take() {
                        exception.description = normalize_whitespace(&exception.description);
                        out.push((member.clone(), exception));
                    }
                }
                b"member" => member = None,
                _ => nested = nested.saturating_sub(1),
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// `<paramref name="x"/>`, `<see cref="..."/>` and `<see langword="..."/>`
/// inside an exception description.
fn inline_reference(
    element: &BytesStart<'_>,
    exception: &mut DocException,
) -> Result<(), quick_xml::Error> {
    match element.name().as_ref() {
        b"paramref" => {
            if let Some(name) = attribute(element, b"name")? {
                exception.description.push_str(&name);
                if !exception.param_names.contains(&name) {
                    exception.param_names.push(name);
                }
            }
        }
        b"see" | b"seealso" => {
            if let Some(cref) = attribute(element, b"cref")? {
                let name = cref.rsplit(['.', ':']).next().unwrap_or(&cref);
                exception.description.push_str(name);
            } else if let Some(word) = attribute(element, b"langword")? {
                exception.description.push_str(&word);
            }
        }
        _ => {}
    }
    Ok(())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// Accessor affinity
// =============================================================================

/// Which accessor a piece of property documentation talks about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Affinity {
    Getter,
    Setter,
    Unattributed,
}

const GETTER_VERBS: &[&str] = &["get", "retriev", "return", "read"];
const SETTER_VERBS: &[&str] = &["set", "assign", "updat", "write"];

/// Classify exception prose by the accessor verbs it uses. Prose that uses
/// both kinds of verb, or neither, is unattributed.
pub fn accessor_affinity(description: &str) -> Affinity {
    let lower = description.to_ascii_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();
    let uses = |verbs: &[&str]| {
        words
            .iter()
            .any(|word| verbs.iter().any(|verb| word.starts_with(verb)))
    };
    match (uses(GETTER_VERBS), uses(SETTER_VERBS)) {
        (true, false) => Affinity::Getter,
        (false, true) => Affinity::Setter,
        _ => Affinity::Unattributed,
    }
}

// =============================================================================
// Documentation ids
// =============================================================================

/// Documentation id of a library member, if it has one.
pub fn documentation_id(model: &dyn SemanticModel, member: &MemberInfo) -> Option<String> {
    let owner = model.type_info(member.owner)?;
    let mut owner_name = owner.full_name.clone();
    if !owner.type_params.is_empty() {
        owner_name.push_str(&format!("`{}", owner.type_params.len()));
    }
    let (prefix, name) = match member.kind {
        MemberKind::Method => {
            let mut name = member.name.clone();
            if !member.type_params.is_empty() {
                name.push_str(&format!("``{}", member.type_params.len()));
            }
            ('M', name)
        }
        MemberKind::Constructor => ('M', "#ctor".to_string()),
        MemberKind::Property => ('P', member.name.clone()),
        MemberKind::Indexer => ('P', "Item".to_string()),
        MemberKind::Event => ('E', member.name.clone()),
        _ => return None,
    };
    let mut id = format!("{prefix}:{owner_name}.{name}");
    if !member.params.is_empty() {
        let params: Vec<String> = member
            .params
            .iter()
            .map(|p| doc_type_name(model, &p.ty, &owner.type_params, &member.type_params))
            .collect();
        id.push('(');
        id.push_str(&params.join(","));
        id.push(')');
    }
    Some(id)
}

fn doc_type_name(
    model: &dyn SemanticModel,
    ty: &Ty,
    type_params: &[String],
    method_type_params: &[String],
) -> String {
    match ty {
        Ty::Named(def, args) => {
            let mut name = model.full_type_name(*def).to_string();
            if !args.is_empty() {
                let args: Vec<String> = args
                    .iter()
                    .map(|a| doc_type_name(model, a, type_params, method_type_params))
                    .collect();
                name.push('{');
                name.push_str(&args.join(","));
                name.push('}');
            }
            name
        }
        Ty::Array(element) => {
            format!("{}[]", doc_type_name(model, element, type_params, method_type_params))
        }
        Ty::Param(name) => {
            if let Some(index) = method_type_params.iter().position(|p| p == name) {
                format!("``{index}")
            } else if let Some(index) = type_params.iter().position(|p| p == name) {
                format!("`{index}")
            } else {
                name.clone()
            }
        }
        Ty::Null | Ty::Unknown => "System.Object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fragment_with_paramrefs() {
        let fragment = r#"<summary>Parses.</summary>
<param name="s">Text.</param>
<exception cref="T:System.ArgumentNullException"><paramref name="s" /> is <see langword="null" />.</exception>
<exception cref="T:System.FormatException"><paramref name="s" /> is not in the correct format.</exception>"#;
        let exceptions = parse_fragment(fragment).unwrap();
        assert_eq!(exceptions.len(), 2);
        assert_eq!(exceptions[0].cref, "T:System.ArgumentNullException");
        assert_eq!(exceptions[0].description, "s is null.");
        assert_eq!(exceptions[0].param_names.as_slice(), ["s".to_string()]);
        assert_eq!(exceptions[1].cref, "T:System.FormatException");
    }

    #[test]
    fn nested_markup_stays_inside_description() {
        let fragment = r#"<exception cref="IOException">Thrown when <b>the disk</b> fails.</exception>"#;
        let exceptions = parse_fragment(fragment).unwrap();
        assert_eq!(exceptions[0].description, "Thrown when the disk fails.");
    }

    #[test]
    fn malformed_fragment_is_an_error() {
        assert!(parse_fragment(r#"<exception cref="X">a <b>b</exception>"#).is_err());
        assert!(parse_fragment("<exception cref=\"X\"></exceptio>").is_err());
    }

    #[test]
    fn parses_sidecar_members() {
        let xml = r#"<?xml version="1.0"?>
<doc>
  <assembly><name>Lib</name></assembly>
  <members>
    <member name="M:Lib.Store.Load(System.String)">
      <exception cref="T:System.IO.IOException">The store is unavailable.</exception>
    </member>
    <member name="M:Lib.Store.Save">
      <summary>No exceptions.</summary>
    </member>
    <member name="P:Lib.Store.Name">
      <exception cref="T:System.ArgumentException">When set to an empty string.</exception>
    </member>
  </members>
</doc>"#;
        let file = DocFile::parse(xml).unwrap();
        assert_eq!(file.len(), 2);
        let load = file.exceptions("M:Lib.Store.Load(System.String)").unwrap();
        assert_eq!(load[0].cref, "T:System.IO.IOException");
        assert!(file.exceptions("M:Lib.Store.Save").is_none());
        assert_eq!(file.exceptions("P:Lib.Store.Name").map(<[_]>::len), Some(1));
    }

    #[test]
    fn falls_back_to_unique_stem() {
        let xml = r#"<doc><members>
            <member name="M:Lib.A.Run(System.Int32)"><exception cref="T:X"/></member>
            <member name="M:Lib.B.Go(System.Int32)"><exception cref="T:Y"/></member>
            <member name="M:Lib.B.Go(System.String)"><exception cref="T:Z"/></member>
        </members></doc>"#;
        let file = DocFile::parse(xml).unwrap();
        assert!(file.exceptions("M:Lib.A.Run(System.Object)").is_some());
        assert!(file.exceptions("M:Lib.B.Go(System.Object)").is_none());
    }

    #[test]
    fn accessor_verbs_decide_affinity() {
        assert_eq!(
            accessor_affinity("The property is retrieved before initialization."),
            Affinity::Getter
        );
        assert_eq!(accessor_affinity("The value is set to null."), Affinity::Setter);
        assert_eq!(
            accessor_affinity("Attempted to write while reading."),
            Affinity::Unattributed
        );
        assert_eq!(accessor_affinity("The object was disposed."), Affinity::Unattributed);
    }
}
