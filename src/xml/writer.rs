//! Serialize an [`Element`] tree.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::{Element, NS_XML};
use crate::error::{Error, Result};
use crate::namespaces::Namespace;

/// Namespace URI -> prefix, in first-use order.
type Prefixes = Vec<(String, String)>;

/// Serialize `root` as a standalone document.
///
/// Every namespace used anywhere in the tree is declared once on the root
/// element. Namespaces from the [`Namespace`] table get their usual prefix,
/// anything else gets `ns0`, `ns1`, ...
pub fn write(root: &Element, pretty: bool) -> Result<String> {
    let prefixes = assign_prefixes(root);
    let mut writer = if pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::Xml(e.to_string()))?;
    write_element(&mut writer, root, &prefixes, true)?;

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

fn assign_prefixes(root: &Element) -> Prefixes {
    let mut prefixes = Prefixes::new();
    let mut unknown = 0usize;
    collect(root, &mut prefixes, &mut unknown);
    prefixes
}

fn collect(element: &Element, prefixes: &mut Prefixes, unknown: &mut usize) {
    let uris = std::iter::once(element.namespace.as_str())
        .chain(element.attributes.iter().map(|a| a.namespace.as_str()));
    for uri in uris {
        if uri.is_empty() || uri == NS_XML || prefixes.iter().any(|(u, _)| u == uri) {
            continue;
        }
        let prefix = match Namespace::from_uri(uri) {
            Some(ns) => ns.prefix().to_string(),
            None => {
                let prefix = format!("ns{unknown}");
                *unknown += 1;
                prefix
            }
        };
        prefixes.push((uri.to_string(), prefix));
    }
    for child in &element.children {
        collect(child, prefixes, unknown);
    }
}

fn qualify(name: &str, namespace: &str, prefixes: &Prefixes) -> String {
    if namespace.is_empty() {
        return name.to_string();
    }
    if namespace == NS_XML {
        return format!("xml:{name}");
    }
    match prefixes.iter().find(|(uri, _)| uri == namespace) {
        Some((_, prefix)) => format!("{prefix}:{name}"),
        None => name.to_string(),
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    prefixes: &Prefixes,
    is_root: bool,
) -> Result<()> {
    let qname = qualify(&element.name, &element.namespace, prefixes);
    let mut start = BytesStart::new(qname.as_str());

    if is_root {
        for (uri, prefix) in prefixes {
            let key = format!("xmlns:{prefix}");
            start.push_attribute((key.as_str(), uri.as_str()));
        }
    }
    for attr in &element.attributes {
        let key = qualify(&attr.name, &attr.namespace, prefixes);
        start.push_attribute((key.as_str(), attr.value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| Error::Xml(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::Xml(e.to_string()))?;
    if !element.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&element.text)))
            .map_err(|e| Error::Xml(e.to_string()))?;
    }
    for child in &element.children {
        write_element(writer, child, prefixes, false)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(qname.as_str())))
        .map_err(|e| Error::Xml(e.to_string()))
}
