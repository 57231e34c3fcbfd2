//! Namespace-agnostic XML traversal.
//!
//! The three registry dialects are inconsistent about namespace prefixes:
//! the same logical element shows up as `soap:Envelope`, `s:Envelope`, or a
//! default-namespace `Envelope` depending on the client stack. All lookups
//! here therefore match on the local (prefix-stripped) name only. The same
//! helpers back the SAML assertion validator.

use std::sync::LazyLock;

use regex::bytes::Regex;
use roxmltree::{Document, Node};

use crate::error::{CoreError, Result};

/// Valueless boolean-style attributes emitted by one upstream XACML stack
/// (`<Attribute IncludeInResult>` instead of `IncludeInResult="true"`).
/// They are not well-formed XML, so they get an explicit value before the
/// document is handed to the parser.
static BARE_INCLUDE_IN_RESULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s)(IncludeInResult)(\s|/|>)").expect("valid regex"));

/// Normalize valueless boolean attributes so strict parsing can proceed.
pub fn sanitize(body: &[u8]) -> Vec<u8> {
    BARE_INCLUDE_IN_RESULT
        .replace_all(body, &b"${1}${2}=\"true\"${3}"[..])
        .into_owned()
}

/// Parse a request body into a DOM, reporting any failure as `MalformedXml`.
pub fn parse(text: &str) -> Result<Document<'_>> {
    Document::parse(text).map_err(|e| CoreError::malformed_xml(e.to_string()))
}

/// Decode body bytes as UTF-8, reporting failure as `MalformedXml`.
pub fn decode(body: &[u8]) -> Result<&str> {
    std::str::from_utf8(body).map_err(|e| CoreError::malformed_xml(e.to_string()))
}

/// First element in `node`'s subtree (including `node` itself) whose local
/// name matches, in document order.
pub fn first_descendant<'a, 'input>(
    node: Node<'a, 'input>,
    local: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == local)
}

/// All elements in `node`'s subtree whose local name matches, in document
/// order.
pub fn descendants<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants()
        .filter(move |n| n.is_element() && n.tag_name().name() == local)
}

/// First direct child element whose local name matches.
pub fn child<'a, 'input>(node: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local)
}

/// All direct child elements whose local name matches.
pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == local)
}

/// Attribute value looked up by local name.
pub fn attr<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == local)
        .map(|a| a.value())
}

/// Trimmed text content of the first matching direct child element.
pub fn child_text<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    child(node, local).and_then(|n| n.text()).map(str::trim)
}

/// Escape a string for use in XML text content or attribute values.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
