//! Construction-library plumbing shared by every lopdf-backed action.
//!
//! [`PageAssembler`] is the "new empty document + copy pages by index + add
//! page with explicit size" primitive that split, merge and image assembly
//! are built from. Copied pages carry their inherited attributes with them,
//! so a page that relied on its old parent's `/MediaBox` or `/Resources`
//! still renders the same in the new document.

use crate::error::PdfDeskError;
use crate::output::DocumentInfo;
use crate::pipeline::input::SourceFile;
use lopdf::{Dictionary, Document, Object, ObjectId, SaveOptions};
use std::collections::HashSet;
use tracing::debug;

/// Page attributes that a page may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed, cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Parse a source file with the construction library.
pub fn load(source: &SourceFile) -> Result<Document, PdfDeskError> {
    source.ensure_pdf()?;
    let doc = Document::load_mem(&source.bytes).map_err(|e| PdfDeskError::CorruptPdf {
        name: source.name.clone(),
        detail: e.to_string(),
    })?;
    debug!(
        "Loaded '{}': {} pages, PDF {}",
        source.name,
        doc.get_pages().len(),
        doc.version
    );
    Ok(doc)
}

/// Serialise a document to bytes.
pub fn save(doc: &mut Document) -> Result<Vec<u8>, PdfDeskError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfDeskError::PdfOperation(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

/// Serialise a document with explicit writer options, e.g. object streams.
pub fn save_with(doc: &mut Document, options: SaveOptions) -> Result<Vec<u8>, PdfDeskError> {
    let mut buffer = Vec::new();
    doc.save_with_options(&mut buffer, options)
        .map_err(|e| PdfDeskError::PdfOperation(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

/// Page object ids in page order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Look up `key` on a page, walking up `/Parent` links when the page itself
/// does not define it.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// The `/Rotate` a viewer would apply to the page (0 when unset).
pub fn effective_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(id).ok().and_then(|o| o.as_i64().ok()),
            other => other.as_i64().ok(),
        })
        .unwrap_or(0)
}

/// Copy inherited attributes onto the page dictionary itself.
fn materialise_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), PdfDeskError> {
    let mut missing = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        for key in INHERITABLE {
            if page.get(key).is_err() {
                missing.push(key);
            }
        }
    }

    let resolved: Vec<(&[u8], Object)> = missing
        .into_iter()
        .filter_map(|key| inherited_attribute(doc, page_id, key).map(|v| (key, v)))
        .collect();

    let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
    for (key, value) in resolved {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

fn type_name(object: &Object) -> Option<&[u8]> {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return None,
    };
    dict.get(b"Type").and_then(Object::as_name).ok()
}

/// Push every indirect reference inside `object`. A page's own `/Parent`
/// is left out so the walk never climbs into the old page tree.
fn collect_references(object: &Object, is_page: bool, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => {
            for item in items {
                collect_references(item, false, out);
            }
        }
        Object::Dictionary(dict) => collect_dict_references(dict, is_page, out),
        Object::Stream(stream) => collect_dict_references(&stream.dict, is_page, out),
        _ => {}
    }
}

fn collect_dict_references(dict: &Dictionary, is_page: bool, out: &mut Vec<ObjectId>) {
    for (key, value) in dict.iter() {
        if is_page && key.as_slice() == b"Parent" {
            continue;
        }
        collect_references(value, false, out);
    }
}

/// A source document made ready for page copying: every page carries its
/// inherited attributes and object ids start at a fixed number.
///
/// Preparing clones and renumbers the source once, so one preparation can
/// feed any number of assemblers whose ids stay below `first_id`.
pub struct PreparedSource {
    doc: Document,
    pages: Vec<ObjectId>,
    first_id: u32,
}

impl PreparedSource {
    pub fn new(source: &Document, first_id: u32) -> Result<Self, PdfDeskError> {
        let mut doc = source.clone();
        for id in page_ids(&doc) {
            materialise_inherited(&mut doc, id)?;
        }
        doc.renumber_objects_with(first_id);
        let pages = page_ids(&doc);
        Ok(Self {
            doc,
            pages,
            first_id,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Builds a fresh document page by page.
pub struct PageAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl PageAssembler {
    /// Start an empty document at the given PDF version.
    pub fn new(version: &str) -> Self {
        let mut doc = Document::with_version(version);
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Pages added so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// The first object id this assembler has not handed out yet.
    pub fn next_id(&self) -> u32 {
        self.doc.max_id + 1
    }

    /// Add a non-page object (image, content stream, …).
    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Append a page. `/Type` and `/Parent` are filled in.
    pub fn add_page(&mut self, mut page: Dictionary) -> ObjectId {
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        let id = self.doc.add_object(page);
        self.kids.push(id);
        id
    }

    /// Append copies of `source`'s pages at `indices` (0-based), in the order
    /// given. Returns the number of pages copied.
    pub fn copy_pages(
        &mut self,
        source: &Document,
        indices: &[usize],
    ) -> Result<usize, PdfDeskError> {
        let prepared = PreparedSource::new(source, self.next_id())?;
        self.copy_prepared(&prepared, indices)
    }

    /// Like [`copy_pages`](Self::copy_pages), from an already prepared source.
    ///
    /// Only objects reachable from the selected pages are copied. Other
    /// pages, the old page tree, catalog and outlines stay behind.
    pub fn copy_prepared(
        &mut self,
        source: &PreparedSource,
        indices: &[usize],
    ) -> Result<usize, PdfDeskError> {
        if source.first_id <= self.doc.max_id {
            return Err(PdfDeskError::PdfOperation(format!(
                "Source objects start at {} but ids up to {} are taken",
                source.first_id, self.doc.max_id
            )));
        }

        let total = source.page_count();
        let mut selected = Vec::with_capacity(indices.len());
        for &idx in indices {
            let id = *source.pages.get(idx).ok_or_else(|| {
                PdfDeskError::PdfOperation(format!(
                    "Page {} is out of range (document has {} pages)",
                    idx + 1,
                    total
                ))
            })?;
            selected.push(id);
        }

        let all_pages: HashSet<ObjectId> = source.pages.iter().copied().collect();
        let wanted: HashSet<ObjectId> = selected.iter().copied().collect();
        let mut visited = HashSet::new();
        let mut stack = selected.clone();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if all_pages.contains(&id) && !wanted.contains(&id) {
                continue;
            }
            let Ok(object) = source.doc.get_object(id) else {
                continue;
            };
            if matches!(
                type_name(object),
                Some(b"Catalog") | Some(b"Pages") | Some(b"Outlines") | Some(b"Outline")
            ) {
                continue;
            }

            let mut object = object.clone();
            let is_page = wanted.contains(&id);
            if is_page {
                object
                    .as_dict_mut()?
                    .set("Parent", Object::Reference(self.pages_id));
            }
            collect_references(&object, is_page, &mut stack);
            self.doc.objects.insert(id, object);
        }

        self.kids.extend(selected);
        self.doc.max_id = self.doc.max_id.max(source.doc.max_id);
        debug!("Copied {} of {} pages", indices.len(), total);
        Ok(indices.len())
    }

    /// Write the page tree and catalog, drop unreachable objects and hand
    /// back the finished document.
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        self.doc.prune_objects();
        self.doc
    }
}

/// Read document facts without rendering anything.
pub fn inspect(source: &SourceFile) -> Result<DocumentInfo, PdfDeskError> {
    let doc = load(source)?;
    let ids = page_ids(&doc);

    Ok(DocumentInfo {
        page_count: ids.len(),
        pdf_version: doc.version.clone(),
        encrypted: doc.trailer.get(b"Encrypt").is_ok(),
        title: info_entry(&doc, b"Title"),
        author: info_entry(&doc, b"Author"),
        producer: info_entry(&doc, b"Producer"),
        page_rotations: ids.iter().map(|&id| effective_rotation(&doc, id)).collect(),
    })
}

fn info_entry(doc: &Document, key: &[u8]) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    match info.get(key).ok()? {
        Object::String(bytes, _) => {
            let text = decode_text_string(bytes);
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
        _ => None,
    }
}

/// PDF text strings are UTF-16BE with a BOM, or PDFDocEncoding (treated as Latin-1).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{page_labels, sample_pdf, sample_pdf_with_root_rotation};

    fn source(name: &str, bytes: Vec<u8>) -> SourceFile {
        SourceFile::new(name, bytes)
    }

    #[test]
    fn load_rejects_non_pdf() {
        let err = load(&source("x.pdf", b"not a pdf".to_vec())).unwrap_err();
        assert!(matches!(err, PdfDeskError::NotAPdf { .. }));
    }

    #[test]
    fn load_rejects_truncated_pdf() {
        let err = load(&source("x.pdf", b"%PDF-1.7\n1 0 obj".to_vec())).unwrap_err();
        assert!(matches!(err, PdfDeskError::CorruptPdf { .. }), "got: {err:?}");
    }

    #[test]
    fn inherited_attributes_are_found_on_parent() {
        let doc = Document::load_mem(&sample_pdf(2, "Inh")).unwrap();
        let first = page_ids(&doc)[0];
        let media_box = inherited_attribute(&doc, first, b"MediaBox").unwrap();
        assert_eq!(media_box.as_array().unwrap().len(), 4);
        assert!(inherited_attribute(&doc, first, b"NoSuchKey").is_none());
    }

    #[test]
    fn effective_rotation_reads_inherited_value() {
        let doc = Document::load_mem(&sample_pdf_with_root_rotation(2, "Rot", 180)).unwrap();
        for id in page_ids(&doc) {
            assert_eq!(effective_rotation(&doc, id), 180);
        }
    }

    #[test]
    fn assembler_copies_selected_pages_in_order() {
        let doc = Document::load_mem(&sample_pdf(4, "Src")).unwrap();
        let mut assembler = PageAssembler::new("1.7");
        assert_eq!(assembler.copy_pages(&doc, &[3, 0]).unwrap(), 2);
        let mut out = assembler.finish();
        let bytes = save(&mut out).unwrap();

        assert_eq!(page_labels(&bytes), vec!["Src-Page-4", "Src-Page-1"]);
    }

    #[test]
    fn copied_pages_keep_inherited_media_box() {
        let doc = Document::load_mem(&sample_pdf(1, "Box")).unwrap();
        let mut assembler = PageAssembler::new("1.7");
        assembler.copy_pages(&doc, &[0]).unwrap();
        let out = assembler.finish();

        let id = page_ids(&out)[0];
        let page = out.get_dictionary(id).unwrap();
        assert!(page.get(b"MediaBox").is_ok());
        assert!(page.get(b"Resources").is_ok());
    }

    #[test]
    fn assembler_rejects_out_of_range_index() {
        let doc = Document::load_mem(&sample_pdf(2, "Oor")).unwrap();
        let mut assembler = PageAssembler::new("1.7");
        let err = assembler.copy_pages(&doc, &[5]).unwrap_err();
        assert!(err.to_string().contains("out of range"), "got: {err}");
    }

    #[test]
    fn copying_twice_from_same_source_does_not_collide() {
        let doc = Document::load_mem(&sample_pdf(2, "Dup")).unwrap();
        let mut assembler = PageAssembler::new("1.7");
        assembler.copy_pages(&doc, &[0, 1]).unwrap();
        assembler.copy_pages(&doc, &[0, 1]).unwrap();
        assert_eq!(assembler.page_count(), 4);
        let mut out = assembler.finish();
        let bytes = save(&mut out).unwrap();
        assert_eq!(
            page_labels(&bytes),
            vec!["Dup-Page-1", "Dup-Page-2", "Dup-Page-1", "Dup-Page-2"]
        );
    }

    #[test]
    fn prepared_source_feeds_several_assemblers() {
        let doc = Document::load_mem(&sample_pdf(3, "Prep")).unwrap();
        let first_id = PageAssembler::new("1.7").next_id();
        let prepared = PreparedSource::new(&doc, first_id).unwrap();
        assert_eq!(prepared.page_count(), 3);

        for idx in [2, 0, 1] {
            let mut assembler = PageAssembler::new("1.7");
            assembler.copy_prepared(&prepared, &[idx]).unwrap();
            let mut out = assembler.finish();
            let bytes = save(&mut out).unwrap();
            assert_eq!(page_labels(&bytes), vec![format!("Prep-Page-{}", idx + 1)]);
        }
    }

    #[test]
    fn prepared_source_below_assembler_ids_is_rejected() {
        let doc = Document::load_mem(&sample_pdf(1, "Low")).unwrap();
        let prepared = PreparedSource::new(&doc, 1).unwrap();
        let mut assembler = PageAssembler::new("1.7");
        let err = assembler.copy_prepared(&prepared, &[0]).unwrap_err();
        assert!(err.to_string().contains("are taken"), "got: {err}");
    }

    #[test]
    fn save_with_object_streams_reloads() {
        let mut doc = Document::load_mem(&sample_pdf(4, "Obj")).unwrap();
        let options = SaveOptions::builder()
            .use_object_streams(true)
            .use_xref_streams(true)
            .compression_level(6)
            .build();
        let bytes = save_with(&mut doc, options).unwrap();
        assert!(bytes.windows(7).any(|w| w == b"/ObjStm"));
        assert_eq!(page_labels(&bytes).len(), 4);
    }

    #[test]
    fn inspect_reports_pages_and_info() {
        let info = inspect(&source("i.pdf", sample_pdf_with_root_rotation(3, "Info", 90))).unwrap();
        assert_eq!(info.page_count, 3);
        assert_eq!(info.page_rotations, vec![90, 90, 90]);
        assert_eq!(info.title.as_deref(), Some("Info fixture"));
        assert!(!info.encrypted);
    }

    #[test]
    fn decode_utf16_text_string() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_string(&bytes), "Hi");
        assert_eq!(decode_text_string(b"Plain"), "Plain");
    }
}
