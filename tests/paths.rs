//! Path get/set/list through the Document API

use pretty_assertions::assert_eq;
use std::sync::Arc;
use xmpdoc::{Context, Document, Namespace, Path, PathValue, SyncFlags, XmpError};

fn doc() -> Document {
    Document::with_context(Arc::new(Context::new()))
}

fn vendor_doc() -> Document {
    let ctx = Arc::new(Context::new());
    ctx.register(Namespace::new("vnd", "http://vendor.example/ns/"), &["vendor"])
        .unwrap();
    Document::with_context(ctx)
}

mod get {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar() {
        let mut d = doc();
        d.set("xmp:Label", "Red", SyncFlags::DEFAULT).unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "Red");
        assert!(d.is_dirty());
    }

    #[test]
    fn unset_model_field_reads_empty() {
        let mut d = doc();
        d.set("xmp:Label", "Red", SyncFlags::DEFAULT).unwrap();
        assert_eq!(d.get("xmp:Nickname").unwrap(), "");
    }

    #[test]
    fn missing_model_is_not_found() {
        let d = doc();
        assert!(matches!(d.get("dc:format"), Err(XmpError::NotFound(_))));
    }

    #[test]
    fn unknown_prefix() {
        let d = doc();
        assert!(matches!(
            d.get("nope:Thing"),
            Err(XmpError::UnknownNamespace(_))
        ));
    }

    #[test]
    fn malformed_path() {
        let mut d = doc();
        assert!(d.get("dc:title[").unwrap_err().is_parse_error());
        let err = d
            .set("dc:title[", "x", SyncFlags::DEFAULT | SyncFlags::NOFAIL)
            .unwrap_err();
        assert!(err.is_parse_error());
    }
}

mod set {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_gate_transitions() {
        let mut d = doc();
        d.set("xmp:Label", "Red", SyncFlags::CREATE).unwrap();

        let err = d.set("xmp:Label", "Green", SyncFlags::CREATE).unwrap_err();
        assert!(matches!(err, XmpError::UnsupportedFlags(_)));
        assert_eq!(d.get("xmp:Label").unwrap(), "Red");

        d.set("xmp:Label", "Green", SyncFlags::REPLACE).unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "Green");

        assert!(d.set("xmp:Label", "", SyncFlags::REPLACE).is_err());
        d.set("xmp:Label", "", SyncFlags::DELETE).unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "");
    }

    #[test]
    fn nofail_suppresses_errors() {
        let mut d = doc();
        d.set("xmp:Label", "Red", SyncFlags::DEFAULT).unwrap();
        d.set("xmp:Label", "Blue", SyncFlags::CREATE | SyncFlags::NOFAIL)
            .unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "Red");

        d.set("nope:Thing", "x", SyncFlags::NOFAIL).unwrap();
    }

    #[test]
    fn empty_flags_mean_default() {
        let mut d = doc();
        d.set("xmp:Label", "Red", SyncFlags::empty()).unwrap();
        d.set("xmp:Label", "Blue", SyncFlags::empty()).unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "Blue");
    }

    #[test]
    fn typed_value_rejected() {
        let mut d = doc();
        let err = d.set("xmp:Rating", "five", SyncFlags::DEFAULT).unwrap_err();
        assert!(matches!(err, XmpError::BadValue(_)));
        assert!(d.models().is_empty());
    }

    #[test]
    fn array_items() {
        let mut d = doc();
        d.set("dc:subject[0]", "boats", SyncFlags::DEFAULT).unwrap();
        d.set("dc:subject[1]", "sea", SyncFlags::DEFAULT).unwrap();
        assert_eq!(d.get("dc:subject").unwrap(), "boats");
        assert_eq!(d.get("dc:subject[1]").unwrap(), "sea");

        // unique add of an existing value is a no-op
        d.set("dc:subject", "sea", SyncFlags::UNIQUE).unwrap();
        d.set("dc:subject", "sky", SyncFlags::UNIQUE).unwrap();
        assert_eq!(d.get("dc:subject[2]").unwrap(), "sky");
        assert_eq!(d.get("dc:subject[3]").unwrap(), "");
    }

    #[test]
    fn language_alternatives() {
        let mut d = doc();
        d.set("dc:title", "Hello", SyncFlags::DEFAULT).unwrap();
        d.set("dc:title[de]", "Hallo", SyncFlags::DEFAULT).unwrap();
        assert_eq!(d.get("dc:title[x-default]").unwrap(), "Hello");
        assert_eq!(d.get("dc:title[de]").unwrap(), "Hallo");

        d.set("dc:title[de]", "", SyncFlags::DELETE).unwrap();
        assert_eq!(d.get("dc:title[de]").unwrap(), "");
        assert_eq!(d.get("dc:title").unwrap(), "Hello");
    }

    #[test]
    fn default_written_after_language() {
        let mut d = doc();
        d.set("dc:title[de]", "Hallo", SyncFlags::DEFAULT).unwrap();
        d.set("dc:title[x-default]", "Hello", SyncFlags::DEFAULT).unwrap();
        assert_eq!(d.get("dc:title").unwrap(), "Hello");
        assert_eq!(d.get("dc:title[de]").unwrap(), "Hallo");

        let back = Document::parse(&d.serialize().unwrap()).unwrap();
        assert_eq!(back.get("dc:title[x-default]").unwrap(), "Hello");
        assert_eq!(back.get("dc:title[de]").unwrap(), "Hallo");
    }

    #[test]
    fn huge_index_rejected() {
        let mut d = doc();
        let err = d
            .set("dc:subject[9223372036854775807]", "x", SyncFlags::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, XmpError::BadValue(_)));
        assert!(d.models().is_empty());
    }

    #[test]
    fn nested_struct_in_list() {
        let mut d = doc();
        d.set("xmpMM:History[0]/stEvt:action", "created", SyncFlags::DEFAULT)
            .unwrap();
        d.set("xmpMM:History[0]/stEvt:softwareAgent", "TestApp", SyncFlags::DEFAULT)
            .unwrap();
        assert_eq!(d.get("xmpMM:History[0]/stEvt:action").unwrap(), "created");
        assert_eq!(d.get("xmpMM:History[0]/softwareAgent").unwrap(), "TestApp");
    }

    #[test]
    fn path_value_carries_flags() {
        let mut d = doc();
        let value = PathValue::new(Path::parse("xmp:Label").unwrap(), "Red")
            .with_flags(SyncFlags::CREATE);
        d.set_path_value(&value).unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "Red");
    }
}

mod raw {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_and_array() {
        let mut d = vendor_doc();
        d.set("vnd:Mode", "auto", SyncFlags::DEFAULT).unwrap();
        d.set("vnd:Tags[0]", "a", SyncFlags::DEFAULT).unwrap();
        d.set("vnd:Tags[1]", "b", SyncFlags::DEFAULT).unwrap();
        assert_eq!(d.get("vnd:Mode").unwrap(), "auto");
        assert_eq!(d.get("vnd:Tags[1]").unwrap(), "b");
        assert!(d.models().is_empty());

        let err = d.set("vnd:Mode", "manual", SyncFlags::CREATE).unwrap_err();
        assert!(matches!(err, XmpError::UnsupportedFlags(_)));
    }

    #[test]
    fn language_alternative() {
        let mut d = vendor_doc();
        d.set("vnd:Caption[en]", "Boat", SyncFlags::DEFAULT).unwrap();
        d.set("vnd:Caption[fr]", "Bateau", SyncFlags::DEFAULT).unwrap();
        assert_eq!(d.get("vnd:Caption[fr]").unwrap(), "Bateau");

        let xml = d.serialize().unwrap();
        assert!(xml.contains("<rdf:Alt>"));
        assert!(xml.contains(r#"<rdf:li xml:lang="fr">Bateau</rdf:li>"#));
    }

    #[test]
    fn unindexed_array_writes() {
        let mut d = vendor_doc();
        d.set("vnd:Mode", "auto", SyncFlags::DEFAULT).unwrap();
        d.set("vnd:Tags[0]", "a", SyncFlags::DEFAULT).unwrap();
        d.set("vnd:Tags[1]", "b", SyncFlags::DEFAULT).unwrap();

        d.set("vnd:Tags", "b", SyncFlags::UNIQUE).unwrap();
        d.set("vnd:Tags", "c", SyncFlags::UNIQUE).unwrap();
        d.set("vnd:Tags", "d", SyncFlags::APPEND).unwrap();
        let tags: Vec<String> = (0..4)
            .map(|i| d.get(&format!("vnd:Tags[{}]", i)).unwrap())
            .collect();
        assert_eq!(tags, vec!["a", "b", "c", "d"]);

        let err = d
            .set("vnd:Tags[9223372036854775807]", "x", SyncFlags::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, XmpError::BadValue(_)));

        d.set("vnd:Tags", "", SyncFlags::DELETE).unwrap();
        let listed: Vec<String> = d
            .list_paths()
            .unwrap()
            .iter()
            .map(|pv| pv.to_string())
            .collect();
        assert_eq!(listed, vec!["vnd:Mode = auto"]);
    }

    #[test]
    fn empty_value_creates_nothing() {
        let mut d = vendor_doc();
        d.set("vnd:Mode", "", SyncFlags::DEFAULT).unwrap_err();
        assert!(d.list_paths().unwrap().is_empty());
    }
}

#[test]
fn list_paths_sorted() {
    let mut d = vendor_doc();
    d.set("xmp:Label", "Red", SyncFlags::DEFAULT).unwrap();
    d.set("vnd:Mode", "auto", SyncFlags::DEFAULT).unwrap();
    d.set("dc:subject[0]", "boats", SyncFlags::DEFAULT).unwrap();
    d.set("dc:format", "image/png", SyncFlags::DEFAULT).unwrap();

    let listed: Vec<String> = d
        .list_paths()
        .unwrap()
        .iter()
        .map(|pv| pv.to_string())
        .collect();
    assert_eq!(
        listed,
        vec![
            "dc:format = image/png",
            "dc:subject[0] = boats",
            "vnd:Mode = auto",
            "xmp:Label = Red",
        ]
    );

    // every listed path reads back
    for pv in &d.list_paths().unwrap() {
        assert_eq!(d.get_path(&pv.path).unwrap(), pv.value);
    }
}
