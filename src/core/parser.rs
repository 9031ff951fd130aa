//! XMP XML/RDF parser
//!
//! Reads a packet into a namespace-resolved node [`Tree`]. The parser knows
//! nothing about models: it resolves prefixes, collects text and attributes
//! and reports the `xmlns` declarations it saw. Interpretation of the RDF
//! structure is left to the [`Decoder`](crate::model::unmarshal::Decoder).

use crate::core::context::Context;
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::{ns, Namespace};
use crate::core::node::{NodeId, QName, Tree};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::sync::Arc;

/// Result of parsing a packet
#[derive(Debug)]
pub struct ParsedPacket {
    /// Wire tree owning all parsed nodes
    pub tree: Tree,
    /// Document element, `x:xmpmeta` or `rdf:RDF`
    pub root: NodeId,
    /// `xmlns` declarations in document order
    pub declarations: Vec<Namespace>,
}

/// Parser for XMP Packets
pub struct XmpParser {
    ctx: Arc<Context>,
}

impl XmpParser {
    /// Create a parser allocating nodes from `ctx`
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Parse an XMP Packet from a string
    ///
    /// The `<?xpacket?>` wrapper is optional.
    pub fn parse_packet(&self, xml: &str) -> XmpResult<ParsedPacket> {
        let content = extract_packet_content(xml)?;
        self.parse_rdf(content)
    }

    fn parse_rdf(&self, xml: &str) -> XmpResult<ParsedPacket> {
        let mut reader = Reader::from_str(xml);
        let mut tree = Tree::new(self.ctx.clone());
        let mut scopes = ScopeStack::default();
        let mut declarations = Vec::new();
        let mut open: Vec<(NodeId, String)> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = open_element(&e, &mut tree, &mut scopes, &mut declarations)?;
                    attach(&mut tree, &open, &mut root, id)?;
                    open.push((id, String::new()));
                }
                Ok(Event::Empty(e)) => {
                    let id = open_element(&e, &mut tree, &mut scopes, &mut declarations)?;
                    attach(&mut tree, &open, &mut root, id)?;
                    scopes.pop();
                }
                Ok(Event::End(_)) => {
                    let Some((id, text)) = open.pop() else {
                        return Err(XmpError::ParseError("unbalanced end tag".to_string()));
                    };
                    // whitespace between child elements is not content
                    if tree.children(id).is_empty() {
                        tree[id].value = text;
                    }
                    scopes.pop();
                }
                Ok(Event::Text(e)) => {
                    if let Some((_, text)) = open.last_mut() {
                        let raw = String::from_utf8_lossy(e.as_ref());
                        match unescape(&raw) {
                            Ok(unescaped) => text.push_str(&unescaped),
                            Err(_) => text.push_str(&raw),
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some((_, text)) = open.last_mut() {
                        text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    let name = String::from_utf8_lossy(e.as_ref()).to_string();
                    let resolved = resolve_entity(&name).ok_or_else(|| {
                        XmpError::ParseError(format!("unknown entity '&{};'", name))
                    })?;
                    if let Some((_, text)) = open.last_mut() {
                        text.push_str(&resolved);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(XmpError::ParseError(format!(
                        "XML parsing error at position {}: {}",
                        reader.error_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        if let Some((id, _)) = open.last() {
            return Err(XmpError::ParseError(format!(
                "unexpected end of input inside {}",
                tree[*id].name
            )));
        }
        let root = root.ok_or_else(|| XmpError::ParseError("no root element".to_string()))?;
        Ok(ParsedPacket {
            tree,
            root,
            declarations,
        })
    }
}

/// Prefix bindings of the open elements
#[derive(Default)]
struct ScopeStack {
    frames: Vec<Vec<(String, String)>>,
}

impl ScopeStack {
    fn push(&mut self, frame: Vec<(String, String)>) {
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == ns::XML_PREFIX {
            return Some(ns::XML);
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}

fn open_element(
    e: &BytesStart<'_>,
    tree: &mut Tree,
    scopes: &mut ScopeStack,
    declarations: &mut Vec<Namespace>,
) -> XmpResult<NodeId> {
    let attrs = collect_attributes(e)?;
    let mut frame = Vec::new();
    for (key, value) in &attrs {
        if key == "xmlns" {
            frame.push((String::new(), value.clone()));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            frame.push((prefix.to_string(), value.clone()));
            declarations.push(Namespace::new(prefix, value.as_str()));
        }
    }
    scopes.push(frame);

    let raw_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let name = resolve_name(scopes, &raw_name, None)?;
    let id = tree.acquire(name.clone());
    for (key, value) in attrs {
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        // unprefixed attributes belong to their element
        let attr_name = resolve_name(scopes, &key, Some(&name.space))?;
        tree.set_attr(id, attr_name, value);
    }
    Ok(id)
}

fn attach(
    tree: &mut Tree,
    open: &[(NodeId, String)],
    root: &mut Option<NodeId>,
    id: NodeId,
) -> XmpResult<()> {
    match (open.last(), *root) {
        (Some((parent, _)), _) => tree.append_child(*parent, id),
        (None, None) => *root = Some(id),
        (None, Some(_)) => {
            return Err(XmpError::ParseError(
                "more than one root element".to_string(),
            ))
        }
    }
    Ok(())
}

fn resolve_name(scopes: &ScopeStack, raw: &str, unprefixed: Option<&str>) -> XmpResult<QName> {
    let (prefix, local) = match raw.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", raw),
    };
    if prefix.is_empty() {
        if let Some(space) = unprefixed {
            return Ok(QName::new(space, local));
        }
    }
    let space = scopes.resolve(prefix).ok_or_else(|| {
        XmpError::ParseError(format!("unbound namespace prefix '{}' on {}", prefix, raw))
    })?;
    Ok(QName::new(space, local))
}

fn collect_attributes(e: &BytesStart<'_>) -> XmpResult<Vec<(String, String)>> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| XmpError::ParseError(format!("bad attribute: {}", err)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let raw_value = String::from_utf8_lossy(attr.value.as_ref());
            let value = match unescape(&raw_value) {
                Ok(unescaped) => unescaped.to_string(),
                Err(_) => raw_value.to_string(),
            };
            Ok((key, value))
        })
        .collect()
}

fn resolve_entity(name: &str) -> Option<String> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse().ok()?,
        };
        return char::from_u32(value).map(String::from);
    }
    let text = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => return None,
    };
    Some(text.to_string())
}

/// Extract the XMP Packet content from the `<?xpacket>` wrapper
fn extract_packet_content(xml: &str) -> XmpResult<&str> {
    let Some(start_pos) = xml.find("<?xpacket") else {
        return validate_xml(xml);
    };
    let Some(end_pos) = xml[start_pos..].find("?>") else {
        return validate_xml(xml);
    };
    let pi_end = start_pos + end_pos + 2;
    let Some(close_pos) = xml[pi_end..].find("<?xpacket end") else {
        return validate_xml(&xml[pi_end..]);
    };
    Ok(xml[pi_end..pi_end + close_pos].trim())
}

fn validate_xml(xml: &str) -> XmpResult<&str> {
    let trimmed = xml.trim_start_matches('\u{feff}').trim();
    if !trimmed.starts_with('<') {
        return Err(XmpError::ParseError("Invalid XML content".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKET: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="kit">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about="" xmlns:dc="http://purl.org/dc/elements/1.1/">
      <dc:format>image/jpeg</dc:format>
      <dc:title>
        <rdf:Alt>
          <rdf:li xml:lang="x-default">Tom &amp; Jerry</rdf:li>
        </rdf:Alt>
      </dc:title>
      <dc:source><![CDATA[<raw>]]></dc:source>
      <dc:empty/>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    fn parse(xml: &str) -> XmpResult<ParsedPacket> {
        XmpParser::new(Arc::new(Context::new())).parse_packet(xml)
    }

    #[test]
    fn test_parse_packet_structure() {
        let packet = parse(PACKET).unwrap();
        let tree = &packet.tree;
        assert!(tree[packet.root].name.is(ns::X, "xmpmeta"));
        assert_eq!(tree[packet.root].attr(ns::X, "xmptk"), Some("kit"));

        let rdf = tree.children(packet.root)[0];
        let desc = tree.children(rdf)[0];
        assert!(tree[desc].name.is_rdf("Description"));
        assert_eq!(tree[desc].attr(ns::RDF, "about"), Some(""));

        let children = tree.children(desc);
        assert_eq!(children.len(), 4);
        assert_eq!(tree[children[0]].name, QName::new(ns::DC, "format"));
        assert_eq!(tree[children[0]].value, "image/jpeg");

        let alt = tree.children(children[1])[0];
        let li = tree.children(alt)[0];
        assert_eq!(tree[li].value, "Tom & Jerry");
        assert_eq!(tree[li].attr(ns::XML, "lang"), Some("x-default"));
        assert_eq!(tree[children[2]].value, "<raw>");
        assert_eq!(tree[children[3]].value, "");

        let prefixes: Vec<&str> = packet.declarations.iter().map(|ns| ns.prefix()).collect();
        assert_eq!(prefixes, vec!["x", "rdf", "dc"]);
    }

    #[test]
    fn test_parse_without_wrapper() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description/></rdf:RDF>"#;
        let packet = parse(xml).unwrap();
        assert!(packet.tree[packet.root].name.is_rdf("RDF"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("not xml").is_err());
        assert!(parse("<a:b/>").is_err());
        assert!(parse(r#"<rdf:RDF xmlns:rdf="r"><rdf:Description>"#).is_err());
        assert!(matches!(
            parse(r#"<r xmlns="u">&bogus;</r>"#),
            Err(XmpError::ParseError(_))
        ));
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("#65").as_deref(), Some("A"));
        assert_eq!(resolve_entity("#x41").as_deref(), Some("A"));
        assert_eq!(resolve_entity("lt").as_deref(), Some("<"));
        assert_eq!(resolve_entity("nbsp"), None);
    }
}
