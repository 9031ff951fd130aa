//! XMP Media Management schema (`xmpMM:`) with its resource event and
//! resource reference structures (`stEvt:`, `stRef:`)

use crate::core::namespace::{ns, Namespace};
use crate::model::Model;
use crate::types::array::Bag;
use crate::utils::datetime::XmpDateTime;
use crate::xmp_record;

/// One entry of `xmpMM:History`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceEvent {
    pub action: String,
    pub changed: String,
    pub instance_id: String,
    pub parameters: String,
    pub software_agent: String,
    pub when: XmpDateTime,
}

xmp_record!(ResourceEvent {
    action: "stEvt:action",
    changed: "stEvt:changed",
    instance_id: "stEvt:instanceID",
    parameters: "stEvt:parameters",
    software_agent: "stEvt:softwareAgent",
    when: "stEvt:when",
});

/// Reference to another resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceRef {
    pub document_id: String,
    pub file_path: String,
    pub instance_id: String,
    pub rendition_class: String,
    pub version_id: String,
}

xmp_record!(ResourceRef {
    document_id: "stRef:documentID",
    file_path: "stRef:filePath",
    instance_id: "stRef:instanceID",
    rendition_class: "stRef:renditionClass",
    version_id: "stRef:versionID",
});

/// XMP Media Management properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaManagement {
    pub derived_from: ResourceRef,
    pub document_id: String,
    pub history: Vec<ResourceEvent>,
    pub ingredients: Bag<ResourceRef>,
    pub instance_id: String,
    pub original_document_id: String,
    pub rendition_class: String,
    pub version_id: String,
}

xmp_record!(MediaManagement {
    derived_from: "xmpMM:DerivedFrom",
    document_id: "xmpMM:DocumentID",
    history: "xmpMM:History",
    ingredients: "xmpMM:Ingredients",
    instance_id: "xmpMM:InstanceID",
    original_document_id: "xmpMM:OriginalDocumentID",
    rendition_class: "xmpMM:RenditionClass",
    version_id: "xmpMM:VersionID",
});

impl Model for MediaManagement {
    fn namespaces(&self) -> Vec<Namespace> {
        vec![
            Namespace::new(ns::XMP_MM_PREFIX, ns::XMP_MM),
            Namespace::new(ns::ST_EVT_PREFIX, ns::ST_EVT),
            Namespace::new(ns::ST_REF_PREFIX, ns::ST_REF),
        ]
    }
}

pub(crate) fn new_model() -> Box<dyn Model> {
    Box::new(MediaManagement::default())
}
