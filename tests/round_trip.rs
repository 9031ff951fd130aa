//! Parse/serialize round trips

use pretty_assertions::assert_eq;
use std::sync::Arc;
use xmpdoc::schemas::MediaManagement;
use xmpdoc::{
    Context, Document, ParseOptions, SerializeOptions, SyncFlags, XmpError, DEFAULT_TOOLKIT,
};

const PACKET: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Test Toolkit 1.0">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="uuid:abc"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmlns:vnd="http://vendor.example/ns/"
    xmp:CreatorTool="TestApp"
    dc:format="image/jpeg"
    vnd:Mode="auto">
   <dc:title>
    <rdf:Alt>
     <rdf:li xml:lang="x-default">Harbor &amp; Sea</rdf:li>
     <rdf:li xml:lang="de">Hafen</rdf:li>
    </rdf:Alt>
   </dc:title>
   <dc:creator>
    <rdf:Seq>
     <rdf:li>Ann</rdf:li>
     <rdf:li>Bo</rdf:li>
    </rdf:Seq>
   </dc:creator>
   <vnd:Lens rdf:parseType="Resource">
    <vnd:Model>50mm</vnd:Model>
    <vnd:Maker>Acme</vnd:Maker>
   </vnd:Lens>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

const NESTED_EXTRAS: &str = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    xmlns:xmpMM="http://ns.adobe.com/xap/1.0/mm/"
    xmlns:stRef="http://ns.adobe.com/xap/1.0/sType/ResourceRef#"
    xmlns:stEvt="http://ns.adobe.com/xap/1.0/sType/ResourceEvent#"
    xmlns:vnd="http://vendor.example/ns/">
 <rdf:Description rdf:about="">
  <xmpMM:DerivedFrom rdf:parseType="Resource">
   <stRef:documentID>d1</stRef:documentID>
   <stRef:vendorExtra>KEEP</stRef:vendorExtra>
   <vnd:Note>KEEP2</vnd:Note>
  </xmpMM:DerivedFrom>
  <xmpMM:History>
   <rdf:Seq>
    <rdf:li rdf:parseType="Resource">
     <stEvt:action>created</stEvt:action>
    </rdf:li>
    <rdf:li rdf:parseType="Resource">
     <stEvt:action>saved</stEvt:action>
     <vnd:Step>2</vnd:Step>
    </rdf:li>
   </rdf:Seq>
  </xmpMM:History>
 </rdf:Description>
</rdf:RDF>"#;

fn parse(xml: &str) -> Document {
    Document::parse_with(Arc::new(Context::new()), xml, ParseOptions::default()).unwrap()
}

#[test]
fn values_survive() {
    let mut doc = parse(PACKET);
    let before = doc.list_paths().unwrap();
    assert_eq!(doc.get("vnd:Lens/vnd:Maker").unwrap(), "Acme");

    let xml = doc.serialize().unwrap();
    let back = parse(&xml);
    assert_eq!(back.list_paths().unwrap(), before);
    assert_eq!(back.about(), "uuid:abc");
    assert_eq!(back.toolkit(), "Test Toolkit 1.0");
    assert_eq!(back.get("dc:title").unwrap(), "Harbor & Sea");
    assert_eq!(back.get("dc:creator[1]").unwrap(), "Bo");
}

#[test]
fn serialized_layout() {
    let mut doc = parse(PACKET);
    let xml = doc.serialize().unwrap();
    assert!(xml.starts_with("<?xpacket begin=\"\u{feff}\""));
    assert!(xml.ends_with("<?xpacket end=\"w\"?>"));
    assert!(xml.contains(r#"rdf:about="uuid:abc""#));
    assert!(xml.contains(r#"xmlns:vnd="http://vendor.example/ns/""#));
    assert!(xml.contains("Harbor &amp; Sea"));
    assert!(xml.contains("<rdf:Seq>"));
}

#[test]
fn new_document_gets_default_toolkit() {
    let mut doc = Document::with_context(Arc::new(Context::new()));
    doc.set("dc:format", "image/png", SyncFlags::DEFAULT).unwrap();
    let xml = doc.serialize().unwrap();
    assert!(xml.contains(DEFAULT_TOOLKIT));

    let xml = doc
        .serialize_with(SerializeOptions::default().omit_toolkit())
        .unwrap();
    assert!(!xml.contains("xmptk"));
}

#[test]
fn empty_document() {
    let mut doc = Document::with_context(Arc::new(Context::new()));
    let xml = doc.serialize().unwrap();
    assert!(xml.contains("rdf:Description"));
    let back = parse(&xml);
    assert!(back.list_paths().unwrap().is_empty());
}

#[test]
fn alternative_default_not_duplicated() {
    let mut doc = Document::with_context(Arc::new(Context::new()));
    doc.set("dc:title", "Hello", SyncFlags::DEFAULT).unwrap();
    doc.set("dc:title[en]", "Hello", SyncFlags::DEFAULT).unwrap();

    let mut xml = doc.serialize().unwrap();
    for _ in 0..3 {
        assert_eq!(xml.matches("<rdf:li").count(), 2);
        let mut back = parse(&xml);
        assert_eq!(back.get("dc:title[en]").unwrap(), "Hello");
        assert_eq!(back.get("dc:title").unwrap(), "Hello");
        xml = back.serialize().unwrap();
    }
}

#[test]
fn compact_and_bare() {
    let mut doc = parse(PACKET);
    let xml = doc
        .serialize_with(SerializeOptions::default().compact().omit_packet())
        .unwrap();
    assert!(xml.starts_with("<x:xmpmeta"));
    assert!(!xml.contains('\n'));
    assert_eq!(parse(&xml).get("vnd:Mode").unwrap(), "auto");
}

#[test]
fn padded_packet() {
    let mut doc = parse(PACKET);
    let xml = doc
        .serialize_with(SerializeOptions::default().pad_to(8192))
        .unwrap();
    assert_eq!(xml.len(), 8192);
    assert_eq!(parse(&xml).get("xmp:CreatorTool").unwrap(), "TestApp");
}

#[test]
fn size_limit() {
    let mut doc = parse(PACKET);
    let mut out = Vec::new();
    let err = doc
        .write_to(&mut out, SerializeOptions::default().max_size(128))
        .unwrap_err();
    assert!(matches!(err, XmpError::SizeLimitExceeded { limit: 128, .. }));
    assert_eq!(out.len(), 128);

    let mut out = Vec::new();
    let written = doc.write_to(&mut out, SerializeOptions::default()).unwrap();
    assert_eq!(written, out.len());
}

#[test]
fn strict_parse_rejects_unknown_namespaces() {
    let result = Document::parse_with(
        Arc::new(Context::new()),
        PACKET,
        ParseOptions::default().strict(),
    );
    assert!(matches!(result, Err(XmpError::UnknownNamespace(_))));
}

#[test]
fn unknown_nested_content_survives() {
    let mut doc = parse(NESTED_EXTRAS);
    let expected = vec![
        "xmpMM:DerivedFrom/stRef:documentID = d1",
        "xmpMM:DerivedFrom/stRef:vendorExtra = KEEP",
        "xmpMM:DerivedFrom/vnd:Note = KEEP2",
        "xmpMM:History[0]/stEvt:action = created",
        "xmpMM:History[1]/stEvt:action = saved",
        "xmpMM:History[1]/vnd:Step = 2",
    ];
    let listed = |doc: &Document| -> Vec<String> {
        doc.list_paths()
            .unwrap()
            .iter()
            .map(|pv| pv.to_string())
            .collect()
    };
    assert_eq!(listed(&doc), expected);
    assert_eq!(doc.get("xmpMM:DerivedFrom/vnd:Note").unwrap(), "KEEP2");

    let xml = doc.serialize().unwrap();
    assert_eq!(xml.matches("<xmpMM:DerivedFrom").count(), 1);
    assert_eq!(xml.matches("<xmpMM:History").count(), 1);
    assert!(xml.contains("KEEP2"));

    let back = parse(&xml);
    assert_eq!(listed(&back), expected);
    let mm = back.find::<MediaManagement>().unwrap();
    assert_eq!(mm.derived_from.document_id, "d1");
    assert_eq!(mm.history[1].action, "saved");
}
