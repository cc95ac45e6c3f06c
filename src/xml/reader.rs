//! Parse bytes into an [`Element`] tree.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use super::{Attribute, Element, NS_XML};
use crate::error::{Error, Result};

/// Parse a complete document and return its root element.
///
/// Text content is kept verbatim, except that whitespace-only text of an
/// element that also has children is treated as indentation and dropped.
/// Comments, processing instructions and the XML declaration are dropped.
pub fn parse(input: &[u8]) -> Result<Element> {
    let mut reader = NsReader::from_reader(input);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        let (resolved, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| Error::Xml(e.to_string()))?;
        let namespace = namespace_uri(resolved)?;

        match event {
            Event::Start(start) => {
                let element = open(&reader, namespace, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open(&reader, namespace, &start)?;
                close(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                close(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(Error::Xml(format!("element '{}' is never closed", open.name)));
    }
    root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
}

fn namespace_uri(resolved: ResolveResult<'_>) -> Result<String> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) if prefix == b"xml" => Ok(NS_XML.to_string()),
        ResolveResult::Unknown(prefix) => Err(Error::Xml(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn open(reader: &NsReader<&[u8]>, namespace: String, start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(
        String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        namespace,
    );

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = namespace_uri(resolved)?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();
        element.attributes.push(Attribute {
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            namespace,
            value,
        });
    }

    Ok(element)
}

fn close(mut element: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<()> {
    if !element.children.is_empty() && element.text.trim().is_empty() {
        element.text.clear();
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::Xml("document has more than one root".to_string())),
    }
    Ok(())
}
