//! WS-Management messages.
//!
//! A [`Message`] is an owned SOAP envelope plus the WS-Management header and
//! body conventions: addressing headers, `ResourceURI`, `OptionSet`,
//! `SelectorSet`, and the `<Method>_INPUT` / instance-value body containers.
//! Builder methods consume and return the message, so a request is never
//! shared between callers while it is being assembled.

use uuid::Uuid;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::namespaces::{ANONYMOUS_ADDRESS, NS_SOAP_ENV, NS_WSA, NS_WSMAN, NS_WSMID};
use crate::soap::{Envelope, Fault};
use crate::xml::{self, Element, ANY_NAMESPACE};

/// A WS-Management request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    envelope: Envelope,
}

impl Message {
    /// Create a request for `action` addressed to `to`.
    ///
    /// Populates `Action`, `To`, a fresh `MessageID` (`uuid:<v4>`) and an
    /// anonymous `ReplyTo`.
    pub fn new(action: &str, to: &str) -> Self {
        let mut message = Self {
            envelope: Envelope::new(),
        };
        message.set_header(must_understand(
            Element::new("Action", NS_WSA).with_text(action),
        ));
        message.set_header(must_understand(Element::new("To", NS_WSA).with_text(to)));
        message.set_header(must_understand(
            Element::new("MessageID", NS_WSA).with_text(format!("uuid:{}", Uuid::new_v4())),
        ));
        message.set_header(
            Element::new("ReplyTo", NS_WSA).with_child(must_understand(
                Element::new("Address", NS_WSA).with_text(ANONYMOUS_ADDRESS),
            )),
        );
        message
    }

    /// The WSMID `Identify` request: no headers, a bare `wsmid:Identify` body.
    pub fn identify() -> Self {
        let mut message = Self {
            envelope: Envelope::new(),
        };
        message.set_body(Element::new("Identify", NS_WSMID));
        message
    }

    /// The underlying envelope.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Unwrap into the underlying envelope.
    pub fn into_envelope(self) -> Envelope {
        self.envelope
    }

    /// Header blocks.
    pub fn header(&self) -> &[Element] {
        &self.envelope.header
    }

    /// Body elements.
    pub fn body(&self) -> &[Element] {
        &self.envelope.body
    }

    /// Mutable body elements.
    pub fn body_mut(&mut self) -> &mut Vec<Element> {
        &mut self.envelope.body
    }

    /// Text of the first header with this tag.
    pub fn header_text(&self, name: &str, namespace: &str) -> Option<&str> {
        self.header_element(name, namespace).map(Element::text)
    }

    /// First header with this tag.
    pub fn header_element(&self, name: &str, namespace: &str) -> Option<&Element> {
        self.envelope.header.iter().find(|h| h.is(name, namespace))
    }

    /// `Action` header.
    pub fn action(&self) -> Option<&str> {
        self.header_text("Action", NS_WSA)
    }

    /// `ResourceURI` header.
    pub fn resource_uri(&self) -> Option<&str> {
        self.header_text("ResourceURI", NS_WSMAN)
    }

    /// `MessageID` header.
    pub fn message_id(&self) -> Option<&str> {
        self.header_text("MessageID", NS_WSA)
    }

    /// Depth-first search through the body.
    pub fn find(&self, name: &str, namespace: &str) -> Option<&Element> {
        xml::find_in(&self.envelope.body, name, namespace)
    }

    /// The `Items` container of an enumeration response, in any namespace.
    pub fn items(&self) -> Option<&Element> {
        self.find("Items", ANY_NAMESPACE)
    }

    /// The SOAP Fault carried by this message, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.envelope.fault()
    }

    /// Set a header, replacing an existing one with the same tag.
    pub fn set_header(&mut self, element: Element) {
        replace_or_push(&mut self.envelope.header, element);
    }

    /// Set a body element, replacing an existing one with the same tag.
    pub fn set_body(&mut self, element: Element) {
        replace_or_push(&mut self.envelope.body, element);
    }

    /// Set or replace the `ResourceURI` header.
    pub fn with_resource_uri(mut self, uri: &str) -> Self {
        self.set_header(must_understand(
            Element::new("ResourceURI", NS_WSMAN).with_text(uri),
        ));
        self
    }

    /// Builder form of [`Message::set_body`].
    pub fn with_body(mut self, element: Element) -> Self {
        self.set_body(element);
        self
    }

    /// Add a single option to the `OptionSet`.
    pub fn with_option(mut self, name: &str, value: &str) -> Self {
        self.merge_named_set("OptionSet", "Option", vec![(name.to_string(), value.to_string())]);
        self
    }

    /// Add a single selector to the `SelectorSet`.
    pub fn with_selector(mut self, name: &str, value: &str) -> Self {
        self.merge_named_set(
            "SelectorSet",
            "Selector",
            vec![(name.to_string(), value.to_string())],
        );
        self
    }

    /// Add options from alternating name/value strings.
    ///
    /// Options are appended to an existing `OptionSet` in the order given.
    pub fn with_options<I, S>(mut self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pairs = name_value_pairs(pairs, "options")?;
        self.merge_named_set("OptionSet", "Option", pairs);
        Ok(self)
    }

    /// Add selectors from alternating name/value strings.
    pub fn with_selectors<I, S>(mut self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pairs = name_value_pairs(pairs, "selectors")?;
        self.merge_named_set("SelectorSet", "Selector", pairs);
        Ok(self)
    }

    /// Add method parameters from alternating name/value strings.
    ///
    /// For an action `<ns>/<Method>` the parameters live in a
    /// `<Method>_INPUT` body element in namespace `<ns>`.
    pub fn with_parameters<I, S>(mut self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pairs = name_value_pairs(pairs, "parameters")?;
        let action = self
            .action()
            .ok_or_else(|| Error::protocol("message has no Action header"))?;
        let (namespace, method) = split_last_segment(action)
            .ok_or_else(|| Error::protocol(format!("Action '{action}' is malformed")))?;
        let container = format!("{method}_INPUT");
        let namespace = namespace.to_string();

        let children = pairs
            .into_iter()
            .map(|(name, value)| Element::new(name, namespace.as_str()).with_text(value));
        self.merge_body_container(&container, &namespace, children);
        Ok(self)
    }

    /// Add instance values from alternating name/value strings.
    ///
    /// Values live in a body element named after the last segment of the
    /// `ResourceURI`, in the resource URI's namespace.
    pub fn with_values<I, S>(mut self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pairs = name_value_pairs(pairs, "values")?;
        let resource = self
            .resource_uri()
            .ok_or_else(|| Error::protocol("message has no ResourceURI header"))?
            .to_string();
        let (_, class) = split_last_segment(&resource)
            .ok_or_else(|| Error::protocol(format!("ResourceURI '{resource}' is malformed")))?;
        let container = class.to_string();

        let children = pairs
            .into_iter()
            .map(|(name, value)| Element::new(name, resource.as_str()).with_text(value));
        self.merge_body_container(&container, &resource, children);
        Ok(self)
    }

    /// Send through `client`, returning the response as a new message.
    pub async fn send(&self, client: &mut Client) -> Result<Message> {
        client.send(self).await
    }

    /// Encode for the wire.
    pub fn to_xml(&self) -> Result<String> {
        self.envelope.to_xml()
    }

    /// Encode with indentation.
    pub fn to_pretty_xml(&self) -> Result<String> {
        self.envelope.to_pretty_xml()
    }

    fn merge_named_set(&mut self, set: &str, item: &str, pairs: Vec<(String, String)>) {
        let header = &mut self.envelope.header;
        let index = match header.iter().position(|h| h.is(set, NS_WSMAN)) {
            Some(index) => index,
            None => {
                header.push(Element::new(set, NS_WSMAN));
                header.len() - 1
            }
        };
        header[index].extend(
            pairs
                .into_iter()
                .map(|(name, value)| Element::new(item, NS_WSMAN).with_attr("Name", name).with_text(value)),
        );
    }

    fn merge_body_container(
        &mut self,
        name: &str,
        namespace: &str,
        children: impl IntoIterator<Item = Element>,
    ) {
        let body = &mut self.envelope.body;
        let index = match body.iter().position(|b| b.is(name, namespace)) {
            Some(index) => index,
            None => {
                body.push(Element::new(name, namespace));
                body.len() - 1
            }
        };
        body[index].extend(children);
    }
}

impl From<Envelope> for Message {
    fn from(envelope: Envelope) -> Self {
        Self { envelope }
    }
}

/// Mark a header block `s:mustUnderstand="true"`.
pub fn must_understand(element: Element) -> Element {
    element.with_ns_attr("mustUnderstand", NS_SOAP_ENV, "true")
}

fn replace_or_push(list: &mut Vec<Element>, element: Element) {
    match list
        .iter_mut()
        .find(|e| e.is(element.name(), element.namespace()))
    {
        Some(existing) => *existing = element,
        None => list.push(element),
    }
}

fn split_last_segment(uri: &str) -> Option<(&str, &str)> {
    uri.rsplit_once('/')
}

fn name_value_pairs<I, S>(values: I, what: &str) -> Result<Vec<(String, String)>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let values: Vec<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();
    if values.len() % 2 != 0 {
        return Err(Error::argument(format!(
            "{what} take name/value pairs, got {} string(s)",
            values.len()
        )));
    }
    Ok(values
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}
