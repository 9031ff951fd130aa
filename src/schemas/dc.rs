//! Dublin Core schema (`dc:`)

use crate::core::error::XmpResult;
use crate::core::namespace::{ns, Namespace};
use crate::model::Model;
use crate::schemas::xmp::XmpBasic;
use crate::types::array::{AltString, Bag};
use crate::utils::datetime::XmpDateTime;
use crate::xmp_record;

/// Dublin Core properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DublinCore {
    pub contributor: Bag<String>,
    pub coverage: String,
    pub creator: Vec<String>,
    pub date: Vec<XmpDateTime>,
    pub description: AltString,
    /// MIME type of the resource
    pub format: String,
    pub identifier: String,
    pub language: Bag<String>,
    pub publisher: Bag<String>,
    pub relation: Bag<String>,
    pub rights: AltString,
    pub source: String,
    pub subject: Bag<String>,
    pub title: AltString,
    pub type_: Bag<String>,
}

xmp_record!(DublinCore {
    contributor: "dc:contributor",
    coverage: "dc:coverage",
    creator: "dc:creator",
    date: "dc:date",
    description: "dc:description",
    format: "dc:format",
    identifier: "dc:identifier",
    language: "dc:language",
    publisher: "dc:publisher",
    relation: "dc:relation",
    rights: "dc:rights",
    source: "dc:source",
    subject: "dc:subject",
    title: "dc:title",
    type_: "dc:type",
});

impl Model for DublinCore {
    fn namespaces(&self) -> Vec<Namespace> {
        vec![Namespace::new(ns::DC_PREFIX, ns::DC)]
    }

    fn sync_to_xmp(&mut self) -> XmpResult<()> {
        for alt in [&mut self.title, &mut self.description, &mut self.rights] {
            alt.ensure_default();
        }
        Ok(())
    }

    /// Fill `dc:date` from `xmp:CreateDate`
    fn sync_model(&mut self, other: &dyn Model) -> XmpResult<()> {
        if let Some(basic) = other.downcast_ref::<XmpBasic>() {
            if self.date.is_empty() && !basic.create_date.is_zero() {
                self.date.push(basic.create_date.clone());
            }
        }
        Ok(())
    }
}

pub(crate) fn new_model() -> Box<dyn Model> {
    Box::new(DublinCore::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Context;
    use crate::core::xpath::Path;
    use crate::model::path::{get_model_path, list_model_paths};

    #[test]
    fn test_dublin_core_paths() {
        let ctx = Context::new();
        let mut dc = DublinCore::default();
        dc.title.set("en", "Harbor");
        dc.subject.push("boats".to_string());
        dc.type_.push("Image".to_string());

        let get = |p: &str| get_model_path(&ctx, &dc, &Path::parse(p).unwrap()).unwrap();
        assert_eq!(get("dc:title[en]"), "Harbor");
        assert_eq!(get("dc:subject[0]"), "boats");
        assert_eq!(get("dc:type"), "Image");
        assert_eq!(get("dc:format"), "");

        let paths = list_model_paths(&ctx, &dc).unwrap();
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn test_date_from_create_date() {
        let mut dc = DublinCore::default();
        let basic = XmpBasic {
            create_date: XmpDateTime::parse("2024-05-01").unwrap(),
            ..Default::default()
        };
        dc.sync_model(&basic).unwrap();
        assert_eq!(dc.date.len(), 1);
        assert_eq!(dc.date[0].to_string(), "2024-05-01");

        dc.sync_model(&basic).unwrap();
        assert_eq!(dc.date.len(), 1);
    }
}
