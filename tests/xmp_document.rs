//! Tests for the Document API

use std::sync::Arc;
use xmpdoc::schemas::{DublinCore, MediaManagement, XmpBasic};
use xmpdoc::{Context, Document, SyncFlags};

const SIMPLE_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="TestApp"
                   dc:title="Test Title"/>
</rdf:RDF>
<?xpacket end="w"?>"#;

const FULL_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Test Toolkit 1.0">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="uuid:abc"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmlns:xmpMM="http://ns.adobe.com/xap/1.0/mm/"
    xmlns:stEvt="http://ns.adobe.com/xap/1.0/sType/ResourceEvent#"
    xmlns:vnd="http://vendor.example/ns/"
    xmp:CreatorTool="TestApp"
    xmp:Rating="3"
    dc:format="image/jpeg">
   <dc:title>
    <rdf:Alt>
     <rdf:li xml:lang="x-default">Harbor</rdf:li>
     <rdf:li xml:lang="de">Hafen</rdf:li>
    </rdf:Alt>
   </dc:title>
   <dc:subject>
    <rdf:Bag>
     <rdf:li>boats</rdf:li>
     <rdf:li>sea</rdf:li>
    </rdf:Bag>
   </dc:subject>
   <xmpMM:History>
    <rdf:Seq>
     <rdf:li rdf:parseType="Resource">
      <stEvt:action>created</stEvt:action>
      <stEvt:softwareAgent>TestApp</stEvt:softwareAgent>
     </rdf:li>
    </rdf:Seq>
   </xmpMM:History>
   <vnd:Lens>50mm</vnd:Lens>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

#[test]
fn new_empty() {
    let doc = Document::new();
    assert!(doc.models().is_empty());
    assert!(doc.namespaces().is_empty());
    assert!(!doc.is_dirty());
}

#[test]
fn default() {
    let doc = Document::default();
    assert!(doc.get("xmp:CreatorTool").is_err());
}

mod from_str {
    use super::*;

    #[test]
    fn happy_path() {
        let doc = SIMPLE_XMP.parse::<Document>().unwrap();
        assert_eq!(doc.get("xmp:CreatorTool").unwrap(), "TestApp");
        assert_eq!(doc.get("dc:title").unwrap(), "Test Title");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn invalid_xml() {
        assert!("not valid xml".parse::<Document>().is_err());
        assert!("<rdf:RDF><unclosed></rdf:RDF>".parse::<Document>().is_err());
    }

    #[test]
    fn from_bytes_with_bom() {
        let mut bytes = b"\xef\xbb\xbf".to_vec();
        bytes.extend_from_slice(SIMPLE_XMP.as_bytes());
        let doc = Document::from_bytes(&bytes).unwrap();
        assert_eq!(doc.get("xmp:CreatorTool").unwrap(), "TestApp");
    }
}

mod typed_models {
    use super::*;

    #[test]
    fn packet_fields() {
        let doc = Document::parse(FULL_XMP).unwrap();
        assert_eq!(doc.about(), "uuid:abc");
        assert_eq!(doc.toolkit(), "Test Toolkit 1.0");
    }

    #[test]
    fn decoded_into_models() {
        let doc = Document::parse(FULL_XMP).unwrap();

        let dc = doc.find::<DublinCore>().unwrap();
        assert_eq!(dc.format, "image/jpeg");
        assert_eq!(dc.title.get("de"), Some("Hafen"));
        assert_eq!(dc.title.default_value(), "Harbor");
        assert_eq!(dc.subject.len(), 2);

        let basic = doc.find::<XmpBasic>().unwrap();
        assert_eq!(basic.creator_tool, "TestApp");
        assert_eq!(basic.rating, Some(3));

        let mm = doc.find::<MediaManagement>().unwrap();
        assert_eq!(mm.history.len(), 1);
        assert_eq!(mm.history[0].action, "created");
        assert_eq!(mm.history[0].software_agent, "TestApp");
    }

    #[test]
    fn find_model_by_prefix_or_uri() {
        let doc = Document::parse(FULL_XMP).unwrap();
        let by_prefix = doc.find_model("xmpMM").unwrap();
        assert_eq!(by_prefix.type_name(), "MediaManagement");
        assert!(doc.find_model("http://ns.adobe.com/xap/1.0/mm/").is_some());
        assert!(doc.find_model("vnd").is_none());
    }

    #[test]
    fn typed_mutation_is_serialized() {
        let mut doc = Document::parse(FULL_XMP).unwrap();
        doc.find_mut::<XmpBasic>().unwrap().label = "Approved".into();
        assert!(doc.is_dirty());

        let xml = doc.serialize().unwrap();
        let back = Document::parse(&xml).unwrap();
        assert_eq!(back.get("xmp:Label").unwrap(), "Approved");
    }

    #[test]
    fn make_model_creates_once() {
        let mut doc = Document::with_context(Arc::new(Context::new()));
        doc.make_model("xmp").unwrap();
        doc.make_model("xmp").unwrap();
        assert_eq!(doc.models().len(), 1);
        assert!(doc.make_model("stEvt").is_err());
        assert!(doc.make_model("nope").is_err());
    }
}

mod namespaces {
    use super::*;
    use xmpdoc::Namespace;

    #[test]
    fn unknown_namespace_kept_raw() {
        let doc = Document::parse(FULL_XMP).unwrap();
        assert_eq!(doc.get("vnd:Lens").unwrap(), "50mm");
        let prefixes: Vec<String> = doc
            .namespaces()
            .iter()
            .map(|ns| ns.prefix().to_string())
            .collect();
        assert!(prefixes.contains(&"vnd".to_string()));
        assert!(prefixes.contains(&"dc".to_string()));
    }

    #[test]
    fn filter_by_group() {
        let mut doc = Document::parse(FULL_XMP).unwrap();
        doc.filter_namespaces(&["dc"]);
        assert!(doc.find::<DublinCore>().is_some());
        assert!(doc.find::<XmpBasic>().is_none());
        assert!(doc.get("vnd:Lens").is_err());
    }

    #[test]
    fn remove_namespace() {
        let mut doc = Document::parse(FULL_XMP).unwrap();
        doc.remove_namespace("vnd").unwrap();
        assert!(doc.get("vnd:Lens").is_err());
        assert!(!doc.serialize().unwrap().contains("vendor.example"));
    }

    #[test]
    fn declared_namespace_for_new_content() {
        let mut doc = Document::with_context(Arc::new(Context::new()));
        assert!(doc.set("cam:Mode", "auto", SyncFlags::DEFAULT).is_err());

        doc.add_namespace(Namespace::new("cam", "http://camera.example/1.0/"))
            .unwrap();
        doc.set("cam:Mode", "auto", SyncFlags::DEFAULT).unwrap();
        assert_eq!(doc.get("cam:Mode").unwrap(), "auto");

        let xml = doc.serialize().unwrap();
        assert!(xml.contains(r#"xmlns:cam="http://camera.example/1.0/""#));
    }

    #[test]
    fn conflicting_prefix_rejected() {
        let mut doc = Document::with_context(Arc::new(Context::new()));
        doc.add_namespace(Namespace::new("cam", "http://camera.example/1.0/"))
            .unwrap();
        assert!(doc
            .add_namespace(Namespace::new("cam", "http://other.example/"))
            .is_err());
    }
}

#[test]
fn close_releases_nodes() {
    let ctx = Arc::new(Context::new());
    let doc = Document::parse_with(ctx.clone(), FULL_XMP, Default::default()).unwrap();
    let before = ctx.pool().len();
    doc.close();
    assert!(ctx.pool().len() > before);
}
