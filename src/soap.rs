//! SOAP 1.2 envelope codec.
//!
//! An [`Envelope`] is just the header and body element lists; everything
//! WS-Management specific lives in [`crate::message`].

use std::fmt;

use crate::error::{Error, Result};
use crate::namespaces::NS_SOAP_ENV;
use crate::xml::{self, Element};

/// Content type for every WS-Management POST.
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

/// A decoded SOAP envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Header blocks, in document order
    pub header: Vec<Element>,
    /// Body elements, in document order
    pub body: Vec<Element>,
}

impl Envelope {
    /// Create an empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an envelope from raw bytes.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut root = xml::parse(input)?;
        if !root.is("Envelope", NS_SOAP_ENV) {
            return Err(Error::protocol(format!(
                "expected a SOAP 1.2 Envelope, found '{}' in '{}'",
                root.name(),
                root.namespace()
            )));
        }

        let mut header = Vec::new();
        let mut body = None;
        for mut child in root.take_children() {
            if child.is("Header", NS_SOAP_ENV) {
                header = child.take_children();
            } else if child.is("Body", NS_SOAP_ENV) {
                body = Some(child.take_children());
            }
        }

        let body = body.ok_or_else(|| Error::protocol("envelope has no Body"))?;
        Ok(Self { header, body })
    }

    /// Build the `Envelope` element.
    pub fn to_element(&self) -> Element {
        let mut header = Element::new("Header", NS_SOAP_ENV);
        header.extend(self.header.iter().cloned());
        let mut body = Element::new("Body", NS_SOAP_ENV);
        body.extend(self.body.iter().cloned());
        Element::new("Envelope", NS_SOAP_ENV)
            .with_child(header)
            .with_child(body)
    }

    /// Encode for the wire.
    pub fn to_xml(&self) -> Result<String> {
        xml::write(&self.to_element(), false)
    }

    /// Encode with indentation, for humans.
    pub fn to_pretty_xml(&self) -> Result<String> {
        xml::write(&self.to_element(), true)
    }

    /// The SOAP Fault carried in the body, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.body
            .iter()
            .find(|e| e.is("Fault", NS_SOAP_ENV))
            .map(Fault::from_element)
    }
}

/// A decoded SOAP 1.2 Fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// `Code/Value`, e.g. `s:Sender`
    pub code: String,
    /// `Code/Subcode/Value`, e.g. `w:InvalidSelectors`
    pub subcode: Option<String>,
    /// First `Reason/Text`
    pub reason: String,
    /// `Detail`, verbatim
    pub detail: Option<Element>,
}

impl Fault {
    fn from_element(fault: &Element) -> Self {
        let code = fault.child("Code", NS_SOAP_ENV);
        let value = |e: Option<&Element>| {
            e.and_then(|e| e.child("Value", NS_SOAP_ENV))
                .map(|v| v.text().to_string())
        };

        Self {
            code: value(code).unwrap_or_default(),
            subcode: value(code.and_then(|c| c.child("Subcode", NS_SOAP_ENV))),
            reason: fault
                .child("Reason", NS_SOAP_ENV)
                .and_then(|r| r.child("Text", NS_SOAP_ENV))
                .map(|t| t.text().to_string())
                .unwrap_or_default(),
            detail: fault.child("Detail", NS_SOAP_ENV).cloned(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(subcode) = &self.subcode {
            write!(f, " ({subcode})")?;
        }
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NS_WSMAN;

    const FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
            xmlns:w="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd">
  <s:Header/>
  <s:Body>
    <s:Fault>
      <s:Code>
        <s:Value>s:Sender</s:Value>
        <s:Subcode><s:Value>w:InvalidSelectors</s:Value></s:Subcode>
      </s:Code>
      <s:Reason><s:Text xml:lang="en">The selectors for the resource are not valid.</s:Text></s:Reason>
      <s:Detail><w:FaultDetail>http://schemas.dmtf.org/wbem/wsman/1/wsman/faultDetail/UnexpectedSelectors</w:FaultDetail></s:Detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

    #[test]
    fn test_fault_is_detected() {
        let envelope = Envelope::parse(FAULT.as_bytes()).unwrap();
        let fault = envelope.fault().expect("fault");

        assert_eq!(fault.code, "s:Sender");
        assert_eq!(fault.subcode.as_deref(), Some("w:InvalidSelectors"));
        assert_eq!(fault.reason, "The selectors for the resource are not valid.");
        assert!(fault
            .detail
            .as_ref()
            .and_then(|d| d.child("FaultDetail", NS_WSMAN))
            .is_some());
        assert_eq!(
            fault.to_string(),
            "s:Sender (w:InvalidSelectors): The selectors for the resource are not valid."
        );
    }

    #[test]
    fn test_parse_requires_envelope_and_body() {
        assert!(matches!(
            Envelope::parse(b"<Envelope/>"),
            Err(Error::Protocol(_))
        ));
        let no_body = format!(r#"<s:Envelope xmlns:s="{NS_SOAP_ENV}"><s:Header/></s:Envelope>"#);
        assert!(matches!(
            Envelope::parse(no_body.as_bytes()),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_encoded_envelope_decodes_to_same_content() {
        let envelope = Envelope {
            header: vec![Element::new("To", "urn:a").with_text("https://bmc/wsman")],
            body: vec![Element::new("Get", "urn:b")],
        };
        let xml = envelope.to_xml().unwrap();
        assert_eq!(Envelope::parse(xml.as_bytes()).unwrap(), envelope);
        assert!(envelope.fault().is_none());
    }
}
