//! XMP XML/RDF serializer
//!
//! Writes an encoded `rdf:RDF` node tree as an XMP Packet. Namespace
//! declarations are placed on each `rdf:Description`, the `rdf:RDF` element
//! only declares `rdf` itself.

use crate::core::context::Context;
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::{ns, NamespaceMap, NamespaceScope};
use crate::core::node::{NodeId, QName, Tree};
use crate::core::options::SerializeOptions;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;
use std::io::{self, Write};

const PACKET_HEADER: &str = "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>";
const PACKET_TRAILER: &str = "<?xpacket end=\"w\"?>";
const PADDING_LINE: usize = 100;

/// Serializer for XMP Packets
pub struct XmpSerializer<'a> {
    ctx: &'a Context,
    scope: &'a NamespaceScope,
    local: Option<&'a NamespaceMap>,
    options: SerializeOptions,
}

impl<'a> XmpSerializer<'a> {
    pub fn new(ctx: &'a Context, scope: &'a NamespaceScope, options: SerializeOptions) -> Self {
        Self {
            ctx,
            scope,
            local: None,
            options,
        }
    }

    /// Prefer `local` prefixes, normally the encoder's model namespaces
    pub fn with_namespaces(mut self, local: &'a NamespaceMap) -> Self {
        self.local = Some(local);
        self
    }

    /// Serialize to a string
    pub fn serialize_packet(
        &self,
        tree: &Tree,
        rdf: NodeId,
        about: &str,
        toolkit: &str,
    ) -> XmpResult<String> {
        let mut buffer = Vec::new();
        self.write_packet(&mut buffer, tree, rdf, about, toolkit)?;
        String::from_utf8(buffer)
            .map_err(|e| XmpError::SerializationError(format!("UTF-8 encoding error: {}", e)))
    }

    /// Write the packet rooted at `rdf`, returning the number of bytes written
    pub fn write_packet<W: Write>(
        &self,
        out: W,
        tree: &Tree,
        rdf: NodeId,
        about: &str,
        toolkit: &str,
    ) -> XmpResult<usize> {
        let mut sink = LimitedWriter::new(out, self.options.max_size);
        let newline = if self.options.compact { "" } else { "\n" };

        if !self.options.omit_packet {
            raw(&mut sink, PACKET_HEADER)?;
            raw(&mut sink, newline)?;
        }

        let mut writer = if self.options.compact {
            Writer::new(sink)
        } else {
            Writer::new_with_indent(sink, b' ', 1)
        };

        let mut meta = BytesStart::new("x:xmpmeta");
        meta.push_attribute(("xmlns:x", ns::X));
        if !self.options.omit_toolkit && !toolkit.is_empty() {
            meta.push_attribute(("x:xmptk", toolkit));
        }
        emit(&mut writer, Event::Start(meta))?;

        let mut rdf_start = BytesStart::new("rdf:RDF");
        rdf_start.push_attribute(("xmlns:rdf", ns::RDF));
        emit(&mut writer, Event::Start(rdf_start))?;

        let descriptions: Vec<NodeId> = tree
            .children(rdf)
            .iter()
            .copied()
            .filter(|&id| tree[id].name.is_rdf("Description"))
            .collect();
        if descriptions.is_empty() {
            let mut desc = BytesStart::new("rdf:Description");
            desc.push_attribute(("rdf:about", about));
            emit(&mut writer, Event::Empty(desc))?;
        }
        for desc in descriptions {
            self.write_description(&mut writer, tree, desc, about)?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("rdf:RDF")))?;
        emit(&mut writer, Event::End(BytesEnd::new("x:xmpmeta")))?;

        let mut sink = writer.into_inner();
        if !self.options.omit_packet {
            raw(&mut sink, newline)?;
            let fixed = sink.written + PACKET_TRAILER.len();
            if self.options.pad_to > fixed {
                write_padding(&mut sink, self.options.pad_to - fixed)?;
            }
            raw(&mut sink, PACKET_TRAILER)?;
        }
        sink.flush().map_err(|e| sink.error(e))?;
        Ok(sink.written)
    }

    fn write_description<W: Write>(
        &self,
        writer: &mut Writer<LimitedWriter<W>>,
        tree: &Tree,
        desc: NodeId,
        about: &str,
    ) -> XmpResult<()> {
        let mut used = BTreeMap::new();
        self.collect_namespaces(tree, desc, &mut used)?;

        let mut start = BytesStart::new("rdf:Description");
        start.push_attribute(("rdf:about", about));
        for (prefix, uri) in &used {
            start.push_attribute((format!("xmlns:{}", prefix).as_str(), uri.as_str()));
        }
        self.push_attributes(&mut start, tree, desc, true)?;

        if tree.children(desc).is_empty() {
            return emit(writer, Event::Empty(start));
        }
        emit(writer, Event::Start(start))?;
        for &child in tree.children(desc) {
            self.write_node(writer, tree, child)?;
        }
        emit(writer, Event::End(BytesEnd::new("rdf:Description")))
    }

    fn write_node<W: Write>(
        &self,
        writer: &mut Writer<LimitedWriter<W>>,
        tree: &Tree,
        id: NodeId,
    ) -> XmpResult<()> {
        let node = &tree[id];
        let name = self.prefixed(&node.name)?;
        let mut start = BytesStart::new(name.as_str());
        self.push_attributes(&mut start, tree, id, false)?;

        if !node.children().is_empty() {
            emit(writer, Event::Start(start))?;
            for &child in node.children() {
                self.write_node(writer, tree, child)?;
            }
            emit(writer, Event::End(BytesEnd::new(name.as_str())))
        } else if node.value.is_empty() {
            emit(writer, Event::Empty(start))
        } else {
            emit(writer, Event::Start(start))?;
            emit(writer, Event::Text(BytesText::new(&node.value)))?;
            emit(writer, Event::End(BytesEnd::new(name.as_str())))
        }
    }

    fn push_attributes(
        &self,
        start: &mut BytesStart<'_>,
        tree: &Tree,
        id: NodeId,
        skip_about: bool,
    ) -> XmpResult<()> {
        for attr in &tree[id].attrs {
            if skip_about && attr.name.is_rdf("about") {
                continue;
            }
            let name = self.prefixed(&attr.name)?;
            start.push_attribute((name.as_str(), attr.value.as_str()));
        }
        Ok(())
    }

    fn collect_namespaces(
        &self,
        tree: &Tree,
        id: NodeId,
        used: &mut BTreeMap<String, String>,
    ) -> XmpResult<()> {
        let node = &tree[id];
        let names = std::iter::once(&node.name).chain(node.attrs.iter().map(|a| &a.name));
        for name in names {
            if name.space == ns::RDF || name.space == ns::XML {
                continue;
            }
            let prefix = self.prefix(&name.space)?;
            if let Some(previous) = used.insert(prefix.clone(), name.space.clone()) {
                if previous != name.space {
                    return Err(XmpError::SerializationError(format!(
                        "prefix '{}' bound to both {} and {}",
                        prefix, previous, name.space
                    )));
                }
            }
        }
        for &child in node.children() {
            self.collect_namespaces(tree, child, used)?;
        }
        Ok(())
    }

    fn prefix(&self, uri: &str) -> XmpResult<String> {
        match uri {
            ns::RDF => return Ok(ns::RDF_PREFIX.to_string()),
            ns::XML => return Ok(ns::XML_PREFIX.to_string()),
            _ => {}
        }
        self.local
            .and_then(|local| local.get_by_uri(uri))
            .map(|ns| ns.prefix().to_string())
            .or_else(|| self.scope.prefix_for(self.ctx.registry(), uri))
            .ok_or_else(|| XmpError::UnknownNamespace(uri.to_string()))
    }

    fn prefixed(&self, name: &QName) -> XmpResult<String> {
        Ok(format!("{}:{}", self.prefix(&name.space)?, name.local))
    }
}

/// Byte-counting writer enforcing an optional size limit
struct LimitedWriter<W> {
    inner: W,
    written: usize,
    limit: Option<usize>,
    overflow: Option<usize>,
}

impl<W: Write> LimitedWriter<W> {
    fn new(inner: W, limit: Option<usize>) -> Self {
        Self {
            inner,
            written: 0,
            limit,
            overflow: None,
        }
    }

    fn error(&self, err: io::Error) -> XmpError {
        match (self.overflow, self.limit) {
            (Some(written), Some(limit)) => XmpError::SizeLimitExceeded { written, limit },
            _ => XmpError::IoError(err),
        }
    }
}

impl<W: Write> Write for LimitedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(limit) = self.limit {
            if self.written + buf.len() > limit {
                let room = limit - self.written;
                self.inner.write_all(&buf[..room])?;
                self.written += room;
                self.overflow = Some(self.written - room + buf.len());
                return Err(io::Error::other("size limit exceeded"));
            }
        }
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn emit<W: Write>(writer: &mut Writer<LimitedWriter<W>>, event: Event<'_>) -> XmpResult<()> {
    writer
        .write_event(event)
        .map_err(|e| writer.get_ref().error(e))
}

fn raw<W: Write>(sink: &mut LimitedWriter<W>, text: &str) -> XmpResult<()> {
    sink.write_all(text.as_bytes()).map_err(|e| sink.error(e))
}

fn write_padding<W: Write>(sink: &mut LimitedWriter<W>, mut remaining: usize) -> XmpResult<()> {
    let line = " ".repeat(PADDING_LINE);
    while remaining > 0 {
        let take = remaining.min(PADDING_LINE + 1);
        if take > PADDING_LINE {
            raw(sink, &line)?;
            raw(sink, "\n")?;
        } else {
            raw(sink, &line[..take])?;
        }
        remaining -= take;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Namespace;
    use std::sync::Arc;

    fn sample(ctx: &Arc<Context>) -> (Tree, NodeId) {
        let mut tree = Tree::new(ctx.clone());
        let rdf = tree.acquire(QName::rdf("RDF"));
        let desc = tree.acquire(QName::rdf("Description"));
        tree.append_child(rdf, desc);
        let format = tree.acquire_text(QName::new(ns::DC, "format"), "a < b");
        tree.append_child(desc, format);
        let title = tree.acquire(QName::new(ns::DC, "title"));
        let alt = tree.acquire(QName::rdf("Alt"));
        let li = tree.acquire_text(QName::rdf("li"), "Title");
        tree.set_attr(li, QName::new(ns::XML, "lang"), "x-default");
        tree.append_child(alt, li);
        tree.append_child(title, alt);
        tree.append_child(desc, title);
        (tree, rdf)
    }

    #[test]
    fn test_serialize_packet() {
        let ctx = Arc::new(Context::new());
        let scope = NamespaceScope::new();
        let (tree, rdf) = sample(&ctx);
        let xml = XmpSerializer::new(&ctx, &scope, SerializeOptions::default())
            .serialize_packet(&tree, rdf, "uuid:1", "kit 1.0")
            .unwrap();

        assert!(xml.starts_with("<?xpacket begin="));
        assert!(xml.ends_with(PACKET_TRAILER));
        assert!(xml.contains(r#"x:xmptk="kit 1.0""#));
        assert!(xml.contains(r#"rdf:about="uuid:1""#));
        assert!(xml.contains(r#"xmlns:dc="http://purl.org/dc/elements/1.1/""#));
        assert!(xml.contains("<dc:format>a &lt; b</dc:format>"));
        assert!(xml.contains(r#"<rdf:li xml:lang="x-default">Title</rdf:li>"#));
    }

    #[test]
    fn test_serialize_options() {
        let ctx = Arc::new(Context::new());
        let scope = NamespaceScope::new();
        let (tree, rdf) = sample(&ctx);
        let options = SerializeOptions::default().omit_packet().omit_toolkit().compact();
        let xml = XmpSerializer::new(&ctx, &scope, options)
            .serialize_packet(&tree, rdf, "", "kit")
            .unwrap();
        assert!(xml.starts_with("<x:xmpmeta"));
        assert!(!xml.contains("xmptk"));
        assert!(!xml.contains('\n'));
    }

    #[test]
    fn test_padding_and_limit() {
        let ctx = Arc::new(Context::new());
        let scope = NamespaceScope::new();
        let (tree, rdf) = sample(&ctx);

        let padded = XmpSerializer::new(&ctx, &scope, SerializeOptions::default().pad_to(4096))
            .serialize_packet(&tree, rdf, "", "")
            .unwrap();
        assert_eq!(padded.len(), 4096);

        let mut out = Vec::new();
        let err = XmpSerializer::new(&ctx, &scope, SerializeOptions::default().max_size(64))
            .write_packet(&mut out, &tree, rdf, "", "")
            .unwrap_err();
        assert!(matches!(err, XmpError::SizeLimitExceeded { limit: 64, .. }));
        assert_eq!(out.len(), 64);
    }

    #[test]
    fn test_unknown_namespace() {
        let ctx = Arc::new(Context::new());
        let mut scope = NamespaceScope::new();
        let mut tree = Tree::new(ctx.clone());
        let rdf = tree.acquire(QName::rdf("RDF"));
        let desc = tree.acquire(QName::rdf("Description"));
        tree.append_child(rdf, desc);
        let prop = tree.acquire_text(QName::new("http://vendor.example/", "prop"), "v");
        tree.append_child(desc, prop);

        let serializer = XmpSerializer::new(&ctx, &scope, SerializeOptions::default());
        assert!(matches!(
            serializer.serialize_packet(&tree, rdf, "", ""),
            Err(XmpError::UnknownNamespace(_))
        ));

        scope
            .add_external(Arc::new(Namespace::new("vnd", "http://vendor.example/")))
            .unwrap();
        let xml = XmpSerializer::new(&ctx, &scope, SerializeOptions::default())
            .serialize_packet(&tree, rdf, "", "")
            .unwrap();
        assert!(xml.contains("<vnd:prop>v</vnd:prop>"));
    }
}
