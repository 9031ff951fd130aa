//! XMP Basic schema (`xmp:`)

use crate::core::error::XmpResult;
use crate::core::namespace::{ns, Namespace};
use crate::model::Model;
use crate::types::array::Bag;
use crate::utils::datetime::XmpDateTime;
use crate::xmp_record;

/// XMP Basic properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmpBasic {
    pub base_url: String,
    pub create_date: XmpDateTime,
    /// Name of the first tool that created the resource
    pub creator_tool: String,
    pub identifier: Bag<String>,
    pub label: String,
    pub metadata_date: XmpDateTime,
    pub modify_date: XmpDateTime,
    pub nickname: String,
    /// -1 for rejected, 0 for unrated, 1 to 5 otherwise
    pub rating: Option<i64>,
}

xmp_record!(XmpBasic {
    base_url: "xmp:BaseURL",
    create_date: "xmp:CreateDate",
    creator_tool: "xmp:CreatorTool",
    identifier: "xmp:Identifier",
    label: "xmp:Label",
    metadata_date: "xmp:MetadataDate",
    modify_date: "xmp:ModifyDate",
    nickname: "xmp:Nickname",
    rating: "xmp:Rating",
});

impl Model for XmpBasic {
    fn namespaces(&self) -> Vec<Namespace> {
        vec![Namespace::new(ns::XMP_PREFIX, ns::XMP)]
    }

    fn sync_to_xmp(&mut self) -> XmpResult<()> {
        if self.metadata_date.is_zero() && !self.modify_date.is_zero() {
            self.metadata_date = self.modify_date.clone();
        }
        Ok(())
    }
}

pub(crate) fn new_model() -> Box<dyn Model> {
    Box::new(XmpBasic::default())
}
