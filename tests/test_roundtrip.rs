//! Load → save → load round-trips through the complete writer.

use pdf_mend::{Document, LoadOptions, Object, ObjectRef, SaveOptions};

/// Assemble a well-formed PDF with exact offsets from `(id, body)` pairs.
/// Object 1 must be the catalog.
fn build_pdf(objects: &[(u32, String)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n%\x80\x81\x82\x83\n");

    let mut offsets = Vec::new();
    for (id, body) in objects {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f\r\n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n\r\n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

fn minimal_pdf() -> Vec<u8> {
    build_pdf(&[
        (1, "<< /Type /Catalog /Pages 2 0 R >>".to_string()),
        (2, "<< /Type /Pages /Kids [] /Count 0 >>".to_string()),
    ])
}

#[test]
fn load_save_load_preserves_structure() {
    let mut doc = Document::load(minimal_pdf(), LoadOptions::default()).unwrap();
    let saved = doc.save(&SaveOptions::default()).unwrap();

    let mut reloaded = Document::load(saved, LoadOptions::default()).unwrap();
    assert_eq!(reloaded.version_string(), "1.4");
    assert_eq!(reloaded.page_count().unwrap(), 0);

    let catalog = reloaded.catalog().unwrap();
    let dict = catalog.as_dict().unwrap();
    assert_eq!(dict.get("Type").unwrap().as_name(), Some("Catalog"));
    assert_eq!(
        dict.get("Pages").unwrap().as_reference(),
        Some(ObjectRef::new(2, 0))
    );
}

#[test]
fn save_preserves_dictionary_entry_order() {
    let mut doc = Document::load(
        build_pdf(&[
            (1, "<< /Type /Catalog /Pages 2 0 R >>".to_string()),
            (
                2,
                "<< /Type /Pages /Kids [] /Count 0 /Zebra 1 /Apple 2 /Mango 3 >>".to_string(),
            ),
        ]),
        LoadOptions::default(),
    )
    .unwrap();
    let saved = doc.save(&SaveOptions::default()).unwrap();

    let mut reloaded = Document::load(saved, LoadOptions::default()).unwrap();
    let pages = reloaded.resolve(ObjectRef::new(2, 0)).unwrap();
    let keys: Vec<&str> = pages.as_dict().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Type", "Kids", "Count", "Zebra", "Apple", "Mango"]);
}

#[test]
fn save_preserves_stream_payloads() {
    let payload = "BT /F1 12 Tf (Hello) Tj ET";
    let mut doc = Document::load(
        build_pdf(&[
            (1, "<< /Type /Catalog /Pages 2 0 R >>".to_string()),
            (
                2,
                "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            ),
            (
                3,
                "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>".to_string(),
            ),
            (
                4,
                format!("<< /Length {} >>\nstream\n{}\nendstream", payload.len(), payload),
            ),
        ]),
        LoadOptions::default(),
    )
    .unwrap();
    assert_eq!(doc.page_count().unwrap(), 1);

    let saved = doc.save(&SaveOptions::default()).unwrap();
    let mut reloaded = Document::load(saved, LoadOptions::default()).unwrap();
    let contents = reloaded.resolve(ObjectRef::new(4, 0)).unwrap();
    assert_eq!(contents.decoded_stream_data().unwrap(), payload.as_bytes());
}

#[test]
fn save_with_compression_roundtrips_payloads() {
    let payload = "q 0 0 0 rg 0 0 100 100 re f Q ".repeat(30);
    let mut doc = Document::load(
        build_pdf(&[
            (1, "<< /Type /Catalog /Pages 2 0 R >>".to_string()),
            (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string()),
            (
                3,
                "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>".to_string(),
            ),
            (
                4,
                format!("<< /Length {} >>\nstream\n{}\nendstream", payload.len(), payload),
            ),
        ]),
        LoadOptions::default(),
    )
    .unwrap();

    let options = SaveOptions {
        compress_streams: true,
        ..Default::default()
    };
    let saved = doc.save(&options).unwrap();

    let mut reloaded = Document::load(saved, LoadOptions::default()).unwrap();
    let contents = reloaded.resolve(ObjectRef::new(4, 0)).unwrap();
    let (dict, raw) = contents.as_stream().unwrap();
    assert_eq!(dict.get("Filter").unwrap().as_name(), Some("FlateDecode"));
    assert!(raw.len() < payload.len());
    assert_eq!(contents.decoded_stream_data().unwrap(), payload.as_bytes());
}

#[test]
fn saved_file_gets_an_id_and_keeps_it() {
    let mut doc = Document::load(minimal_pdf(), LoadOptions::default()).unwrap();
    let saved = doc.save(&SaveOptions::default()).unwrap();

    let reloaded = Document::load(saved, LoadOptions::default()).unwrap();
    let id = reloaded.trailer().get("ID").unwrap().as_array().unwrap().to_vec();
    assert_eq!(id.len(), 2);
    let first = id[0].as_string_bytes().unwrap().to_vec();
    let second = id[1].as_string_bytes().unwrap().to_vec();
    assert_eq!(first.len(), 16);
    // Both elements are identical on first save
    assert_eq!(first, second);

    // A further save keeps the existing /ID
    let mut reloaded = reloaded;
    let saved_again = reloaded.save(&SaveOptions::default()).unwrap();
    let third = Document::load(saved_again, LoadOptions::default()).unwrap();
    let id2 = third.trailer().get("ID").unwrap().as_array().unwrap().to_vec();
    assert_eq!(id2[0].as_string_bytes().unwrap(), first.as_slice());
}

#[test]
fn save_as_xref_stream_is_loadable() {
    let mut doc = Document::load(minimal_pdf(), LoadOptions::default()).unwrap();
    let options = SaveOptions {
        use_xref_stream: Some(true),
        ..Default::default()
    };
    let saved = doc.save(&options).unwrap();
    // The output has no traditional table
    assert!(!saved.windows(6).any(|w| w == b"xref\r\n" || w == b"xref\n0"));

    let mut reloaded = Document::load(saved, LoadOptions::default()).unwrap();
    assert!(reloaded.catalog().is_ok());
    assert_eq!(reloaded.page_count().unwrap(), 0);
}

#[test]
fn registered_objects_survive_a_save() {
    let mut doc = Document::load(minimal_pdf(), LoadOptions::default()).unwrap();
    let note = doc.register(Object::text_string("attached note"));

    // Hook the new object into the catalog so it is reachable
    let root = doc.catalog_ref().unwrap();
    let mut catalog = doc.catalog().unwrap();
    catalog
        .as_dict_mut()
        .unwrap()
        .insert("Note".to_string(), Object::Reference(note));
    doc.update(root, catalog).unwrap();

    let saved = doc.save(&SaveOptions::default()).unwrap();
    let mut reloaded = Document::load(saved, LoadOptions::default()).unwrap();
    let catalog = reloaded.catalog().unwrap();
    let note_ref = catalog
        .as_dict()
        .unwrap()
        .get("Note")
        .unwrap()
        .as_reference()
        .unwrap();
    let note = reloaded.resolve(note_ref).unwrap();
    assert_eq!(note.as_text().unwrap(), "attached note");
}
