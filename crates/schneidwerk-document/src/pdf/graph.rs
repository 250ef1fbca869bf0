// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Object-graph assembly for produced documents.
//
// Both the splitter and the repairer emit fresh documents: pages are
// deep-cloned out of the source (stream data, fonts, and images referenced by
// the page dictionary become new objects in the target), then hung off a new
// /Pages node with a new catalog.  Cloning only what a kept page references
// is also what discards unreachable and corrupt objects during repair.

use lopdf::{Dictionary, Document, Object, ObjectId};
use schneidwerk_core::error::{Result, SchneidwerkError};
use tracing::warn;

/// Reference chains deeper than this are treated as unresolvable.
const MAX_CLONE_DEPTH: usize = 64;

/// A fresh document under construction.
///
/// Pages are appended in order; `finish` writes the /Pages node, the catalog,
/// and the trailer, then serializes.
pub(crate) struct TargetDocument {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl TargetDocument {
    /// Start a new document carrying the given format version.
    pub(crate) fn new(version: &str) -> Self {
        let mut document = Document::with_version(version);
        // Reserve the /Pages id up front so cloned pages can point their
        // /Parent at it before the node itself exists.
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Deep-clone one page (and everything it references) out of `source`
    /// and append it as the last page of this document.
    pub(crate) fn append_page(&mut self, source: &Document, page_id: ObjectId) -> Result<()> {
        let page_object = source.get_object(page_id).map_err(|err| {
            SchneidwerkError::Pdf(format!("cannot read page object {page_id:?}: {err}"))
        })?;

        let cloned = deep_clone_object(source, &mut self.document, page_object, 0)?;
        let cloned_id = self.document.add_object(cloned);

        if let Ok(Object::Dictionary(dict)) = self.document.get_object_mut(cloned_id) {
            dict.set("Parent", Object::Reference(self.pages_id));
        }

        self.kids.push(Object::Reference(cloned_id));
        Ok(())
    }

    /// Carry over the source document's string-valued /Info entries
    /// (Title, Author, ...).  Structural metadata is never copied.
    pub(crate) fn copy_info_strings(&mut self, source: &Document) {
        let Some(info) = resolve_info(source) else {
            return;
        };

        let mut copied = Dictionary::new();
        for (key, value) in info.iter() {
            if let Object::String(_, _) = value {
                copied.set(key.clone(), value.clone());
            }
        }
        if copied.is_empty() {
            return;
        }

        let info_id = self.document.add_object(Object::Dictionary(copied));
        self.document.trailer.set("Info", Object::Reference(info_id));
    }

    /// Number of pages appended so far.
    pub(crate) fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Write the page tree, catalog, and trailer, then serialize.
    pub(crate) fn finish(mut self) -> Result<Vec<u8>> {
        let count = self.kids.len() as i64;

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Kids", Object::Array(self.kids));
        pages_dict.set("Count", Object::Integer(count));
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.document.add_object(Object::Dictionary(catalog));
        self.document.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            SchneidwerkError::Pdf(format!("failed to serialize produced document: {err}"))
        })?;
        Ok(output)
    }
}

/// Resolve the source trailer's /Info dictionary, if present and readable.
fn resolve_info(source: &Document) -> Option<&Dictionary> {
    match source.trailer.get(b"Info").ok()? {
        Object::Reference(id) => match source.get_object(*id).ok()? {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        },
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Deep-clone a single lopdf object, recursively resolving references.
///
/// /Parent is deliberately skipped (the caller re-points it at the target's
/// /Pages node); unresolvable references degrade to Null rather than failing
/// the whole clone.
fn deep_clone_object(
    source: &Document,
    target: &mut Document,
    object: &Object,
    depth: usize,
) -> Result<Object> {
    if depth > MAX_CLONE_DEPTH {
        warn!(depth, "object graph exceeds clone depth cap, using Null");
        return Ok(Object::Null);
    }

    match object {
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned_value = deep_clone_object(source, target, value, depth + 1)?;
                new_dict.set(key.clone(), cloned_value);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(array) => {
            let mut new_array = Vec::with_capacity(array.len());
            for item in array {
                new_array.push(deep_clone_object(source, target, item, depth + 1)?);
            }
            Ok(Object::Array(new_array))
        }
        Object::Reference(ref_id) => match source.get_object(*ref_id) {
            Ok(referenced) => {
                let cloned = deep_clone_object(source, target, referenced, depth + 1)?;
                let new_id = target.add_object(cloned);
                Ok(Object::Reference(new_id))
            }
            Err(err) => {
                warn!(?ref_id, %err, "cannot resolve reference, using Null");
                Ok(Object::Null)
            }
        },
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned_value = deep_clone_object(source, target, value, depth + 1)?;
                new_dict.set(key.clone(), cloned_value);
            }
            Ok(Object::Stream(lopdf::Stream::new(
                new_dict,
                stream.content.clone(),
            )))
        }
        // Boolean, Integer, Real, String, Name, Null are trivially cloneable.
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::sample;

    #[test]
    fn rebuilt_single_page_document_is_loadable() {
        let source_bytes = sample::pdf_with_pages(2);
        let source = Document::load_mem(&source_bytes).expect("load source");
        let pages = source.get_pages();

        let mut target = TargetDocument::new(&source.version);
        target
            .append_page(&source, pages[&1])
            .expect("append page 1");
        assert_eq!(target.page_count(), 1);

        let bytes = target.finish().expect("finish");
        let rebuilt = Document::load_mem(&bytes).expect("load rebuilt");
        assert_eq!(rebuilt.get_pages().len(), 1);
    }

    #[test]
    fn broken_reference_degrades_to_null() {
        let source_bytes = sample::pdf_with_pages(1);
        let mut source = Document::load_mem(&source_bytes).expect("load source");

        // Point the page's /Contents at an object that does not exist.
        let page_id = source.get_pages()[&1];
        if let Ok(Object::Dictionary(dict)) = source.get_object_mut(page_id) {
            dict.set("Contents", Object::Reference((9999, 0)));
        }

        let mut target = TargetDocument::new("1.5");
        target.append_page(&source, page_id).expect("append");
        let bytes = target.finish().expect("finish");
        assert_eq!(Document::load_mem(&bytes).expect("load").get_pages().len(), 1);
    }
}
