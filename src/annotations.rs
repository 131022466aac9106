//! Page annotations and links.
//!
//! Annotations are read from a page's `/Annots` array. Only the fields that
//! survive a cross-document copy are modelled: subtype, rectangle, contents,
//! author and, for links, the action.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};

/// An annotation on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Indirect object holding the annotation, when it is not a direct value
    pub reference: Option<ObjectRef>,

    /// Annotation subtype (Text, Link, Square, ...)
    pub subtype: Option<String>,

    /// Rectangle bounds [x1, y1, x2, y2]
    pub rect: Option<[f64; 4]>,

    /// Text contents of the annotation
    pub contents: Option<String>,

    /// Author (T entry)
    pub author: Option<String>,

    /// Link action (for Link annotations)
    pub action: Option<LinkAction>,
}

/// Link action associated with an annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkAction {
    /// URI action - navigate to a web URL
    Uri(String),
    /// Destination inside the same document (GoTo action or /Dest entry)
    Internal,
    /// Other action types (Launch, Named, etc.)
    Other {
        /// Action type (/S field)
        action_type: String,
    },
}

impl Annotation {
    /// Whether this is a link annotation.
    pub fn is_link(&self) -> bool {
        self.subtype.as_deref() == Some("Link")
    }

    /// Target URI of a link, if it points outside the document.
    pub fn uri(&self) -> Option<&str> {
        match &self.action {
            Some(LinkAction::Uri(uri)) => Some(uri),
            _ => None,
        }
    }
}

impl Document {
    /// All annotations on the page at `page_index`.
    ///
    /// Entries that are not dictionaries are skipped.
    pub fn page_annotations(&self, page_index: usize) -> Result<Vec<Annotation>> {
        let page = Object::Reference(self.find_page(page_index)?);
        let annots = self.resolve(self.get(&page, &["Annots".into()]));
        let annots = match annots.as_array() {
            Some(annots) => annots,
            None => return Ok(Vec::new()),
        };

        let mut result = Vec::new();
        for entry in annots {
            let dict = match self.resolve(entry).as_dict() {
                Some(dict) => dict,
                None => {
                    log::debug!("skipping non-dictionary annotation {:?}", entry);
                    continue;
                },
            };
            result.push(self.parse_annotation(entry.as_reference(), dict));
        }
        Ok(result)
    }

    fn parse_annotation(&self, reference: Option<ObjectRef>, dict: &Dictionary) -> Annotation {
        let text = |key: &str| {
            dict.get(key)
                .and_then(|v| self.resolve(v).as_bytes())
                .map(|b| String::from_utf8_lossy(b).into_owned())
        };
        let subtype = dict
            .get("Subtype")
            .and_then(Object::as_name)
            .map(str::to_string);
        let rect = dict.get("Rect").and_then(|r| self.resolve(r).as_rect());

        let action = if subtype.as_deref() == Some("Link") {
            self.parse_link_action(dict)
        } else {
            None
        };

        Annotation {
            reference,
            subtype,
            rect,
            contents: text("Contents"),
            author: text("T"),
            action,
        }
    }

    fn parse_link_action(&self, dict: &Dictionary) -> Option<LinkAction> {
        if let Some(action) = dict.get("A").and_then(|a| self.resolve(a).as_dict()) {
            let action_type = action.get("S").and_then(Object::as_name).unwrap_or("");
            return Some(match action_type {
                "URI" => {
                    let uri = action.get("URI").and_then(|u| self.resolve(u).as_bytes())?;
                    LinkAction::Uri(String::from_utf8_lossy(uri).into_owned())
                },
                "GoTo" => LinkAction::Internal,
                other => LinkAction::Other {
                    action_type: other.to_string(),
                },
            });
        }
        dict.get("Dest").map(|_| LinkAction::Internal)
    }

    /// Add an annotation to the page at `page_index`.
    pub fn create_annotation(
        &mut self,
        page_index: usize,
        subtype: &str,
        rect: [f64; 4],
        contents: Option<&str>,
        author: Option<&str>,
    ) -> Result<ObjectRef> {
        let page = self.find_page(page_index)?;
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("Annot"));
        dict.insert("Subtype".to_string(), Object::name(subtype));
        dict.insert("Rect".to_string(), Object::rect(rect));
        if let Some(contents) = contents {
            dict.insert("Contents".to_string(), Object::text(contents));
        }
        if let Some(author) = author {
            dict.insert("T".to_string(), Object::text(author));
        }
        dict.insert("P".to_string(), Object::Reference(page));
        self.attach_annotation(page, dict)
    }

    /// Add a URI link to the page at `page_index`.
    pub fn create_link(&mut self, page_index: usize, rect: [f64; 4], uri: &str) -> Result<ObjectRef> {
        let page = self.find_page(page_index)?;
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("Annot"));
        dict.insert("Subtype".to_string(), Object::name("Link"));
        dict.insert("Rect".to_string(), Object::rect(rect));
        dict.insert(
            "Border".to_string(),
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
        );
        dict.insert(
            "A".to_string(),
            Object::dict([("S", Object::name("URI")), ("URI", Object::text(uri))]),
        );
        dict.insert("P".to_string(), Object::Reference(page));
        self.attach_annotation(page, dict)
    }

    fn attach_annotation(&mut self, page: ObjectRef, dict: Dictionary) -> Result<ObjectRef> {
        let annots = self
            .resolve_ref(page)
            .as_dict()
            .and_then(|d| d.get("Annots"))
            .cloned();
        let annot = self.add_object(Object::Dictionary(dict));
        match annots {
            Some(Object::Reference(array)) => self.push(array, annot)?,
            Some(Object::Array(_)) => {
                let page_obj = self
                    .object_mut(page.id)
                    .ok_or(Error::ObjectNotFound(page.id, page.gen))?;
                if let Some(Object::Array(items)) =
                    page_obj.as_dict_mut().and_then(|d| d.get_mut("Annots"))
                {
                    items.push(Object::Reference(annot));
                }
            },
            _ => self.put(page, "Annots", Object::Array(vec![Object::Reference(annot)]))?,
        }
        Ok(annot)
    }
}
