//! Sync, diff and merge

use pretty_assertions::assert_eq;
use std::sync::Arc;
use xmpdoc::schemas::{DublinCore, XmpBasic};
use xmpdoc::{Context, Document, Path, SyncFlags, XmpDateTime, XmpError};

fn doc() -> Document {
    Document::with_context(Arc::new(Context::new()))
}

fn p(s: &str) -> Path {
    Path::parse(s).unwrap()
}

// RUST_LOG=xmpdoc=debug shows the suppressed errors
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

mod sync {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn copies_into_empty_destination() {
        let mut d = doc();
        d.set("xmp:CreatorTool", "Cam 1.0", SyncFlags::DEFAULT).unwrap();
        d.sync("xmp:CreatorTool", "xmp:Label", SyncFlags::CREATE)
            .unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "Cam 1.0");
    }

    #[test]
    fn creates_destination_model() {
        let mut d = doc();
        d.set("xmp:CreatorTool", "Cam 1.0", SyncFlags::DEFAULT).unwrap();
        d.sync("xmp:CreatorTool", "dc:source", SyncFlags::CREATE)
            .unwrap();
        assert_eq!(d.find::<DublinCore>().unwrap().source, "Cam 1.0");

        // a second sync finds equal values and changes nothing
        d.clear_dirty();
        d.sync("xmp:CreatorTool", "dc:source", SyncFlags::CREATE)
            .unwrap();
        assert_eq!(d.get("dc:source").unwrap(), "Cam 1.0");
        assert!(!d.is_dirty());
    }

    #[test]
    fn any_overwrite_flag_replaces_scalar() {
        let presets = [
            ("default", SyncFlags::DEFAULT),
            ("merge", SyncFlags::MERGE),
            ("extend", SyncFlags::EXTEND),
            ("add", SyncFlags::ADD),
            ("replace", SyncFlags::REPLACE),
            ("delete", SyncFlags::DELETE),
            ("append", SyncFlags::APPEND),
            ("unique", SyncFlags::UNIQUE),
        ];
        for (name, flags) in presets {
            let mut d = doc();
            d.set("xmp:CreatorTool", "new", SyncFlags::DEFAULT).unwrap();
            d.set("xmp:Label", "old", SyncFlags::DEFAULT).unwrap();
            d.sync("xmp:CreatorTool", "xmp:Label", flags)
                .unwrap_or_else(|e| panic!("{}: {}", name, e));
            assert_eq!(d.get("xmp:Label").unwrap(), "new", "{}", name);
        }

        let mut d = doc();
        d.set("xmp:CreatorTool", "new", SyncFlags::DEFAULT).unwrap();
        d.set("xmp:Label", "old", SyncFlags::DEFAULT).unwrap();
        d.sync("xmp:CreatorTool", "xmp:Label", SyncFlags::CREATE | SyncFlags::NOFAIL)
            .unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "old");
    }

    #[test]
    fn list_destination_keeps_list_rules() {
        let subjects = |flags: SyncFlags| {
            let mut d = doc();
            d.set("xmp:Label", "b", SyncFlags::DEFAULT).unwrap();
            d.set("dc:subject", "a", SyncFlags::DEFAULT).unwrap();
            d.sync("xmp:Label", "dc:subject", flags).unwrap();
            d.find::<DublinCore>().unwrap().subject.to_vec()
        };
        assert_eq!(subjects(SyncFlags::UNIQUE), vec!["a", "b"]);
        assert_eq!(subjects(SyncFlags::APPEND), vec!["a", "b"]);
        assert_eq!(subjects(SyncFlags::REPLACE), vec!["b"]);
    }

    #[test]
    fn overwrite_needs_permission() {
        let mut d = doc();
        d.set("xmp:CreatorTool", "Cam 1.0", SyncFlags::DEFAULT).unwrap();
        d.set("xmp:Label", "old", SyncFlags::DEFAULT).unwrap();

        d.sync("xmp:CreatorTool", "xmp:Label", SyncFlags::CREATE)
            .unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "old");

        d.sync("xmp:CreatorTool", "xmp:Label", SyncFlags::REPLACE)
            .unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "Cam 1.0");
    }

    #[test]
    fn empty_source_needs_delete() {
        let mut d = doc();
        d.set("xmp:Label", "old", SyncFlags::DEFAULT).unwrap();

        d.sync("xmp:Nickname", "xmp:Label", SyncFlags::REPLACE)
            .unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "old");

        d.sync("xmp:Nickname", "xmp:Label", SyncFlags::DELETE)
            .unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "");
    }

    #[test]
    fn converter_applied() {
        let mut d = doc();
        d.set("xmp:CreatorTool", "cam", SyncFlags::DEFAULT).unwrap();
        let upper = |s: &str| s.to_uppercase();
        d.sync_with(&p("xmp:CreatorTool"), &p("xmp:Label"), SyncFlags::DEFAULT, Some(&upper))
            .unwrap();
        assert_eq!(d.get("xmp:Label").unwrap(), "CAM");
    }

    #[test]
    fn into_detached_model() {
        let mut d = doc();
        d.set("xmp:CreatorTool", "Cam 1.0", SyncFlags::DEFAULT).unwrap();
        let mut basic = XmpBasic::default();
        d.sync_to(&mut basic, &p("xmp:CreatorTool"), &p("xmp:Nickname"), SyncFlags::DEFAULT, None)
            .unwrap();
        assert_eq!(basic.nickname, "Cam 1.0");
        assert_eq!(d.get("xmp:Nickname").unwrap(), "");
    }

    #[test]
    fn nofail() {
        init_tracing();
        let mut d = doc();
        d.set("xmp:CreatorTool", "Cam 1.0", SyncFlags::DEFAULT).unwrap();
        let err = d
            .sync("xmp:CreatorTool", "nope:Thing", SyncFlags::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, XmpError::UnknownNamespace(_)));
        d.sync("xmp:CreatorTool", "nope:Thing", SyncFlags::DEFAULT | SyncFlags::NOFAIL)
            .unwrap();
    }

    #[test]
    fn models_reconcile() {
        let mut d = doc();
        d.add(XmpBasic {
            create_date: XmpDateTime::parse("2024-05-01T10:00:00Z").unwrap(),
            ..Default::default()
        })
        .unwrap();
        d.add(DublinCore::default()).unwrap();
        d.sync_models().unwrap();

        let dc = d.find::<DublinCore>().unwrap();
        assert_eq!(dc.date.len(), 1);
        assert_eq!(d.get("dc:date").unwrap(), "2024-05-01T10:00:00Z");
    }
}

mod diff {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_each_change() {
        let mut a = doc();
        a.set("xmp:Label", "x", SyncFlags::DEFAULT).unwrap();
        a.set("xmp:Nickname", "y", SyncFlags::DEFAULT).unwrap();

        let mut b = doc();
        b.set("xmp:Nickname", "z", SyncFlags::DEFAULT).unwrap();
        b.set("xmp:BaseURL", "w", SyncFlags::DEFAULT).unwrap();

        let changes: Vec<(String, String, SyncFlags)> = a
            .diff(&b)
            .unwrap()
            .iter()
            .map(|pv| (pv.path.to_string(), pv.value.clone(), pv.flags))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("xmp:BaseURL".to_string(), "w".to_string(), SyncFlags::CREATE),
                ("xmp:Label".to_string(), "x".to_string(), SyncFlags::DELETE),
                ("xmp:Nickname".to_string(), "y".to_string(), SyncFlags::REPLACE),
            ]
        );
    }

    #[test]
    fn identical_documents() {
        let mut a = doc();
        a.set("dc:format", "image/png", SyncFlags::DEFAULT).unwrap();
        let mut b = doc();
        b.set("dc:format", "image/png", SyncFlags::DEFAULT).unwrap();
        assert!(a.diff(&b).unwrap().is_empty());
    }
}

mod merge {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sources() -> (Document, Document) {
        let mut target = doc();
        target.set("dc:format", "image/png", SyncFlags::DEFAULT).unwrap();

        let mut other = doc();
        other.set_about("uuid:other");
        other.set("dc:format", "image/jpeg", SyncFlags::DEFAULT).unwrap();
        other.set("xmp:Label", "Red", SyncFlags::DEFAULT).unwrap();
        (target, other)
    }

    #[test]
    fn merge_fills_gaps() {
        init_tracing();
        let (mut target, other) = sources();
        target.merge(&other, SyncFlags::MERGE).unwrap();
        assert_eq!(target.get("dc:format").unwrap(), "image/png");
        assert_eq!(target.get("xmp:Label").unwrap(), "Red");
        assert_eq!(target.about(), "uuid:other");
    }

    #[test]
    fn merge_with_replace() {
        let (mut target, other) = sources();
        target.merge(&other, SyncFlags::DEFAULT).unwrap();
        assert_eq!(target.get("dc:format").unwrap(), "image/jpeg");
        assert!(target.diff(&other).unwrap().is_empty());
    }

    #[test]
    fn merge_without_nofail_reports_conflicts() {
        let (mut target, other) = sources();
        let err = target.merge(&other, SyncFlags::CREATE).unwrap_err();
        assert!(matches!(err, XmpError::UnsupportedFlags(_)));
    }

    #[test]
    fn merge_raw_content() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                         xmlns:vnd="http://vendor.example/ns/">
            <rdf:Description rdf:about="" vnd:Mode="auto"/>
        </rdf:RDF>"#;
        let other = Document::parse(xml).unwrap();
        let mut target = doc();
        target.merge(&other, SyncFlags::MERGE).unwrap();
        assert_eq!(target.get("vnd:Mode").unwrap(), "auto");
    }
}
