//! Canonical XML serialization for signature computation.
//!
//! Implements the exclusive-canonicalization rules the assertion signatures
//! use: namespace declarations are emitted where a prefix is first visibly
//! utilized, attributes are sorted by namespace URI then local name, text and
//! attribute values use the canonical escape set, and comments and processing
//! instructions are dropped. The enveloped-signature transform is realized by
//! excluding the `Signature` subtree during serialization.
//!
//! Prefixes are resolved from the in-scope namespace axis of the parsed
//! document, so serialization is a deterministic function of the document —
//! any change to element structure, attribute values, or character data
//! changes the canonical form and therefore the digest.

use roxmltree::Node;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Canonical form of `node`'s subtree.
pub fn canonicalize(node: Node) -> String {
    serialize(node, None)
}

/// Canonical form of `node`'s subtree with one element subtree left out
/// (the enveloped-signature transform).
pub fn canonicalize_excluding(node: Node, excluded: Node) -> String {
    serialize(node, Some(excluded))
}

fn serialize(node: Node, excluded: Option<Node>) -> String {
    let mut out = String::new();
    let mut declared: Vec<(Option<String>, String)> = Vec::new();
    write_node(&mut out, node, excluded, &mut declared);
    out
}

fn write_node(
    out: &mut String,
    node: Node,
    excluded: Option<Node>,
    declared: &mut Vec<(Option<String>, String)>,
) {
    if Some(node) == excluded {
        return;
    }
    if node.is_element() {
        write_element(out, node, excluded, declared);
    } else if node.is_text() {
        escape_text(out, node.text().unwrap_or(""));
    }
    // Comments and processing instructions do not contribute.
}

fn write_element(
    out: &mut String,
    el: Node,
    excluded: Option<Node>,
    declared: &mut Vec<(Option<String>, String)>,
) {
    let local = el.tag_name().name();
    let ns_uri = el.tag_name().namespace();
    let prefix = ns_uri.and_then(|uri| element_prefix(el, uri));
    let qname = match prefix {
        Some(p) => format!("{p}:{local}"),
        None => local.to_string(),
    };

    // Namespace declarations this element has to emit: its own binding plus
    // the binding of every prefixed attribute, minus whatever an output
    // ancestor already declared identically.
    let mut decls: Vec<(Option<&str>, &str)> = Vec::new();
    match ns_uri {
        Some(uri) if uri != XML_NS => {
            if !is_declared(declared, prefix, uri) {
                decls.push((prefix, uri));
            }
        }
        None => {
            // No namespace: an inherited non-empty default binding has to be
            // undeclared for this subtree.
            let inherited_default = declared
                .iter()
                .rev()
                .find(|(p, _)| p.is_none())
                .map(|(_, u)| u.as_str());
            if inherited_default.is_some_and(|u| !u.is_empty()) {
                decls.push((None, ""));
            }
        }
        _ => {}
    }
    for attr in el.attributes() {
        match attr.namespace() {
            Some(uri) if uri != XML_NS => {
                if let Some(p) = named_prefix(el, uri)
                    && !is_declared(declared, Some(p), uri)
                    && !decls.contains(&(Some(p), uri))
                {
                    decls.push((Some(p), uri));
                }
            }
            _ => {}
        }
    }
    decls.sort();

    // Attributes sorted by namespace URI, then local name.
    let mut attrs: Vec<(&str, &str, String, &str)> = el
        .attributes()
        .map(|a| {
            let uri = a.namespace().unwrap_or("");
            let qname = match a.namespace() {
                Some(ns) if ns == XML_NS => format!("xml:{}", a.name()),
                Some(ns) => match named_prefix(el, ns) {
                    Some(p) => format!("{p}:{}", a.name()),
                    None => a.name().to_string(),
                },
                None => a.name().to_string(),
            };
            (uri, a.name(), qname, a.value())
        })
        .collect();
    attrs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    out.push('<');
    out.push_str(&qname);
    let frame = declared.len();
    for (p, uri) in decls {
        match p {
            None => {
                out.push_str(" xmlns=\"");
                escape_attr(out, uri);
            }
            Some(p) => {
                out.push_str(" xmlns:");
                out.push_str(p);
                out.push_str("=\"");
                escape_attr(out, uri);
            }
        }
        out.push('"');
        declared.push((p.map(str::to_string), uri.to_string()));
    }
    for (_, _, qname, value) in &attrs {
        out.push(' ');
        out.push_str(qname);
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
    out.push('>');

    for child in el.children() {
        write_node(out, child, excluded, declared);
    }

    out.push_str("</");
    out.push_str(&qname);
    out.push('>');
    declared.truncate(frame);
}

/// Prefix to serialize an element in namespace `uri` with; a matching
/// default-namespace binding wins over a prefixed one.
fn element_prefix<'a>(el: Node<'a, '_>, uri: &str) -> Option<&'a str> {
    let mut named = None;
    for ns in el.namespaces() {
        if ns.uri() == uri {
            if ns.name().is_none() {
                return None;
            }
            if named.is_none() {
                named = ns.name();
            }
        }
    }
    named
}

/// Prefix for an attribute namespace; attributes never use the default
/// binding, so only named bindings qualify.
fn named_prefix<'a>(el: Node<'a, '_>, uri: &str) -> Option<&'a str> {
    el.namespaces()
        .find(|ns| ns.name().is_some() && ns.uri() == uri)
        .and_then(|ns| ns.name())
}

fn is_declared(declared: &[(Option<String>, String)], prefix: Option<&str>, uri: &str) -> bool {
    declared
        .iter()
        .rev()
        .find(|(p, _)| p.as_deref() == prefix)
        .is_some_and(|(_, u)| u == uri)
}

fn escape_text(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn c14n(input: &str) -> String {
        let doc = Document::parse(input).unwrap();
        canonicalize(doc.root_element())
    }

    #[test]
    fn test_empty_element_gets_full_closing_tag() {
        assert_eq!(c14n("<a/>"), "<a></a>");
    }

    #[test]
    fn test_attributes_sorted_by_local_name() {
        assert_eq!(c14n(r#"<a z="1" b="2"/>"#), r#"<a b="2" z="1"></a>"#);
    }

    #[test]
    fn test_prefixed_element_declares_namespace_once() {
        let input = r#"<x:a xmlns:x="urn:u"><x:b/><x:b/></x:a>"#;
        assert_eq!(
            c14n(input),
            r#"<x:a xmlns:x="urn:u"><x:b></x:b><x:b></x:b></x:a>"#
        );
    }

    #[test]
    fn test_default_namespace_declared_on_root() {
        assert_eq!(
            c14n(r#"<a xmlns="urn:u"><b/></a>"#),
            r#"<a xmlns="urn:u"><b></b></a>"#
        );
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(c14n("<a>x &amp; y &lt; z</a>"), "<a>x &amp; y &lt; z</a>");
    }

    #[test]
    fn test_attribute_escaping() {
        assert_eq!(
            c14n(r#"<a v="a&quot;b&amp;c"/>"#),
            r#"<a v="a&quot;b&amp;c"></a>"#
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(c14n("<a><!-- hidden -->t</a>"), "<a>t</a>");
    }

    #[test]
    fn test_excluded_subtree_is_skipped() {
        let doc = Document::parse("<a><keep/><drop><inner/></drop><keep/></a>").unwrap();
        let drop = doc
            .descendants()
            .find(|n| n.has_tag_name("drop"))
            .unwrap();
        let out = canonicalize_excluding(doc.root_element(), drop);
        assert_eq!(out, "<a><keep></keep><keep></keep></a>");
    }

    #[test]
    fn test_exclusion_matches_serialization_without_subtree() {
        let with = Document::parse(r#"<a i="1"><s xmlns:d="urn:d"><d:x/></s><b>t</b></a>"#).unwrap();
        let without = Document::parse(r#"<a i="1"><b>t</b></a>"#).unwrap();
        let s = with.descendants().find(|n| n.has_tag_name("s")).unwrap();
        assert_eq!(
            canonicalize_excluding(with.root_element(), s),
            canonicalize(without.root_element())
        );
    }

    #[test]
    fn test_subtree_canonicalization_redeclares_inherited_prefix() {
        let doc =
            Document::parse(r#"<p:a xmlns:p="urn:p"><p:b><p:c/></p:b></p:a>"#).unwrap();
        let b = doc.descendants().find(|n| n.has_tag_name(("urn:p", "b"))).unwrap();
        assert_eq!(
            canonicalize(b),
            r#"<p:b xmlns:p="urn:p"><p:c></p:c></p:b>"#
        );
    }

    #[test]
    fn test_same_document_same_form() {
        let input = r#"<a xmlns="urn:u" z="1" b="2"><c>text</c></a>"#;
        assert_eq!(c14n(input), c14n(input));
    }
}
