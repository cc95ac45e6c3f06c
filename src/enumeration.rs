//! WS-Enumeration pagination.
//!
//! `Enumerate` only opens a server-side cursor; the client has to keep
//! issuing `Pull` with the latest `EnumerationContext` until the server says
//! `EndOfSequence`, and should `Release` the cursor if it gives up early.
//! [`EnumerationDriver`] runs that loop and folds every page into the
//! `Items` container of the first response.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::message::Message;
use crate::namespaces::{action, NS_WSMAN, NS_WSMEN};
use crate::transport::{self, Exchange};
use crate::xml::{self, Element, ANY_NAMESPACE};

/// `MaxElements` requested when enumeration is optimized.
pub const DEFAULT_MAX_ELEMENTS: u32 = 100;

/// Default safety cap on the number of pages of one enumeration.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

const ENUMERATION_MODE: &str = "EnumerationMode";

/// What an enumeration returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumerationMode {
    /// Full resource instances
    #[default]
    Objects,
    /// Endpoint references (`EnumerationMode=EnumerateEPR`)
    EndpointReferences,
}

/// Build an `Enumerate` request for `resource`.
///
/// With `optimize`, the first response already carries up to
/// [`DEFAULT_MAX_ELEMENTS`] items.
pub fn enumerate_request(
    to: &str,
    resource: &str,
    mode: EnumerationMode,
    optimize: bool,
) -> Message {
    let mut body = Element::new("Enumerate", NS_WSMEN);
    if optimize {
        body.push(Element::new("OptimizeEnumeration", NS_WSMAN));
        body.push(Element::new("MaxElements", NS_WSMAN).with_text(DEFAULT_MAX_ELEMENTS.to_string()));
    }

    let request = Message::new(action::ENUMERATE, to)
        .with_resource_uri(resource)
        .with_body(body);
    match mode {
        EnumerationMode::Objects => request,
        EnumerationMode::EndpointReferences => request.with_option(ENUMERATION_MODE, "EnumerateEPR"),
    }
}

/// Drives Enumerate → Pull* → (Release on failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationDriver {
    max_pages: Option<usize>,
}

impl Default for EnumerationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl EnumerationDriver {
    /// Driver with the default page cap.
    pub fn new() -> Self {
        Self {
            max_pages: Some(DEFAULT_MAX_PAGES),
        }
    }

    /// Driver with an explicit page cap; `None` trusts the server to finish.
    pub fn with_max_pages(max_pages: Option<usize>) -> Self {
        Self { max_pages }
    }

    /// Page cap.
    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    /// Send `request` and pull every remaining page.
    ///
    /// Returns the first response with all items aggregated in its `Items`
    /// container, in arrival order. If a later page fails, the cursor is
    /// released (best effort) and the failure is returned as
    /// [`Error::Enumeration`] together with the items gathered so far.
    pub async fn run<E: Exchange + ?Sized>(&self, exchange: &mut E, request: &Message) -> Result<Message> {
        let resource = request
            .resource_uri()
            .ok_or_else(|| Error::protocol("Enumerate request has no ResourceURI"))?
            .to_string();
        let pull = PullTemplate::from_request(request);

        let mut response = transport::send(exchange, request).await?;
        if has_end_of_sequence(&response) {
            debug!(resource = %resource, "enumeration complete in first response");
            return Ok(response);
        }
        let Some(mut context) = enumeration_context(&response) else {
            return Ok(response);
        };

        let mut items = match items_container(&mut response) {
            Some(container) => container.take_children(),
            None => {
                let err = Error::protocol("Enumerate response has neither Items nor EnumerateResponse");
                return Err(abort(exchange, &resource, &context, Vec::new(), err).await);
            }
        };

        let mut pages = 1usize;
        loop {
            if let Some(max) = self.max_pages {
                if pages >= max {
                    let err = Error::protocol(format!("enumeration did not finish within {max} pages"));
                    return Err(abort(exchange, &resource, &context, items, err).await);
                }
            }

            let request = pull.build(exchange.endpoint(), &resource, &context);
            let mut page = match transport::send(exchange, &request).await {
                Ok(page) => page,
                Err(err) => return Err(abort(exchange, &resource, &context, items, err).await),
            };
            pages += 1;

            if let Some(page_items) = xml::find_in_mut(page.body_mut(), "Items", ANY_NAMESPACE) {
                items.extend(page_items.take_children());
            }
            debug!(resource = %resource, page = pages, items = items.len(), "pulled enumeration page");

            if has_end_of_sequence(&page) {
                break;
            }
            match enumeration_context(&page) {
                Some(next) => context = next,
                None => break,
            }
        }

        if let Some(container) = items_container(&mut response) {
            *container.children_mut() = items;
        }
        Ok(response)
    }
}

/// Release the server-side cursor identified by `context`.
pub async fn release<E: Exchange + ?Sized>(exchange: &mut E, resource: &str, context: &str) -> Result<()> {
    let request = Message::new(action::RELEASE, exchange.endpoint())
        .with_resource_uri(resource)
        .with_body(Element::new("Release", NS_WSMEN).with_child(context_element(context)));
    transport::send(exchange, &request).await.map(drop)
}

/// Options of the Enumerate request that every Pull repeats.
struct PullTemplate {
    max_elements: Option<String>,
    mode: Option<String>,
}

impl PullTemplate {
    fn from_request(request: &Message) -> Self {
        let max_elements = request
            .find("MaxElements", ANY_NAMESPACE)
            .map(|e| e.text().to_string());
        let mode = request
            .header_element("OptionSet", NS_WSMAN)
            .and_then(|set| {
                set.children()
                    .iter()
                    .find(|o| o.is("Option", NS_WSMAN) && o.attr("Name") == Some(ENUMERATION_MODE))
            })
            .map(|o| o.text().to_string());
        Self { max_elements, mode }
    }

    fn build(&self, to: &str, resource: &str, context: &str) -> Message {
        let mut body = Element::new("Pull", NS_WSMEN).with_child(context_element(context));
        if let Some(max) = &self.max_elements {
            body.push(Element::new("MaxElements", NS_WSMEN).with_text(max.as_str()));
        }
        let request = Message::new(action::PULL, to)
            .with_resource_uri(resource)
            .with_body(body);
        match &self.mode {
            Some(mode) => request.with_option(ENUMERATION_MODE, mode),
            None => request,
        }
    }
}

async fn abort<E: Exchange + ?Sized>(
    exchange: &mut E,
    resource: &str,
    context: &str,
    items: Vec<Element>,
    source: Error,
) -> Error {
    debug!(resource = %resource, error = %source, "enumeration aborted, releasing context");
    if let Err(err) = release(exchange, resource, context).await {
        warn!(resource = %resource, error = %err, "best-effort Release failed");
    }
    Error::Enumeration {
        items,
        source: Box::new(source),
    }
}

fn context_element(context: &str) -> Element {
    Element::new("EnumerationContext", NS_WSMEN).with_text(context)
}

fn enumeration_context(message: &Message) -> Option<String> {
    message
        .find("EnumerationContext", NS_WSMEN)
        .map(|c| c.text().to_string())
}

fn has_end_of_sequence(message: &Message) -> bool {
    message.find("EndOfSequence", ANY_NAMESPACE).is_some()
}

/// The response's `Items`, created under `EnumerateResponse` when the
/// server left it out.
fn items_container(response: &mut Message) -> Option<&mut Element> {
    let body = response.body_mut();
    if xml::find_in(body, "Items", ANY_NAMESPACE).is_none() {
        let parent = xml::find_in_mut(body, "EnumerateResponse", ANY_NAMESPACE)?;
        parent.push(Element::new("Items", NS_WSMAN));
    }
    xml::find_in_mut(body, "Items", ANY_NAMESPACE)
}
