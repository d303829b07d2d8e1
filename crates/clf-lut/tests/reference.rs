//! Reference resolution against files on disk.

use clf_lut::{ClfError, ClfResult, NodeOp, ParseOptions, ProcessList, WriteOptions};
use std::fs;
use std::path::Path;

fn scale_doc(id: &str, s: f64) -> String {
    format!(
        r#"<ProcessList id="{id}">
  <Matrix inBitDepth="32f" outBitDepth="32f">
    <Array dim="3 3">{s} 0 0 0 {s} 0 0 0 {s}</Array>
  </Matrix>
</ProcessList>"#
    )
}

fn reference_doc(id: &str, path: &str, extra: &str) -> String {
    format!(
        r#"<ProcessList id="{id}">
  <Reference inBitDepth="32f" outBitDepth="32f" path="{path}"{extra}/>
  <Matrix inBitDepth="32f" outBitDepth="32f">
    <Array dim="3 3">3 0 0 0 3 0 0 0 3</Array>
  </Matrix>
</ProcessList>"#
    )
}

fn load(dir: &Path, name: &str, opts: &ParseOptions) -> ClfResult<ProcessList> {
    ProcessList::read_from_path(dir.join(name), opts)
}

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn resolves_relative_to_document() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("luts")).unwrap();
    write(&dir.path().join("luts"), "child.clf", &scale_doc("child", 2.0));
    write(dir.path(), "parent.clf", &reference_doc("parent", "luts/child.clf", ""));

    let list = load(dir.path(), "parent.clf", &ParseOptions::default()).unwrap();
    let NodeOp::Reference(reference) = &list.nodes[0].op else {
        panic!("expected Reference");
    };
    assert!(reference.is_resolved());
    assert_eq!(list.process(&[1.0, 1.0, 1.0], 3), vec![6.0, 6.0, 6.0]);
}

#[test]
fn base_path_attribute() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("shared")).unwrap();
    write(&dir.path().join("shared"), "child.clf", &scale_doc("child", 2.0));
    write(dir.path(), "parent.clf", &reference_doc("parent", "child.clf", r#" basePath="shared""#));

    let list = load(dir.path(), "parent.clf", &ParseOptions::default()).unwrap();
    assert_eq!(list.process(&[0.5, 1.0, 2.0], 3), vec![3.0, 6.0, 12.0]);
}

#[test]
fn in_memory_documents_use_base_path_option() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "child.clf", &scale_doc("child", 2.0));
    let doc = reference_doc("parent", "child.clf", "");

    let opts = ParseOptions::default().base_path(dir.path());
    let list = ProcessList::from_bytes(doc.as_bytes(), &opts).unwrap();
    assert_eq!(list.process(&[1.0, 1.0, 1.0], 3), vec![6.0, 6.0, 6.0]);
}

#[test]
fn nested_references_resolve_from_their_own_directory() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    write(&sub, "leaf.clf", &scale_doc("leaf", 2.0));
    write(&sub, "middle.clf", &reference_doc("middle", "leaf.clf", ""));
    write(dir.path(), "top.clf", &reference_doc("top", "sub/middle.clf", ""));

    let list = load(dir.path(), "top.clf", &ParseOptions::default()).unwrap();
    // leaf x2, middle x3, top x3
    assert_eq!(list.process(&[1.0, 1.0, 1.0], 3), vec![18.0, 18.0, 18.0]);
}

#[test]
fn missing_target_degrades_to_identity() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "parent.clf", &reference_doc("parent", "gone.clf", ""));

    let list = load(dir.path(), "parent.clf", &ParseOptions::default()).unwrap();
    assert_eq!(list.nodes.len(), 2);
    assert_eq!(list.process(&[1.0, 1.0, 1.0], 3), vec![3.0, 3.0, 3.0]);

    // unresolved references are written back as links even when self-contained
    let xml = list.to_bytes(&WriteOptions::new().self_contained(true)).unwrap();
    assert!(String::from_utf8(xml).unwrap().contains(r#"path="gone.clf""#));
}

#[test]
fn cycle_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.clf", &reference_doc("a", "b.clf", ""));
    write(dir.path(), "b.clf", &reference_doc("b", "a.clf", ""));

    let err = load(dir.path(), "a.clf", &ParseOptions::default()).unwrap_err();
    match err {
        ClfError::CircularReference { chain } => {
            assert!(chain.contains("a.clf"));
            assert!(chain.contains("b.clf"));
        }
        other => panic!("expected CircularReference, got {other}"),
    }
}

#[test]
fn self_reference_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "self.clf", &reference_doc("self", "self.clf", ""));
    let err = load(dir.path(), "self.clf", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, ClfError::CircularReference { .. }));
}

#[test]
fn depth_limit_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "leaf.clf", &scale_doc("leaf", 2.0));
    write(dir.path(), "middle.clf", &reference_doc("middle", "leaf.clf", ""));
    write(dir.path(), "top.clf", &reference_doc("top", "middle.clf", ""));

    let top = dir.path().join("top.clf");
    let opts = ParseOptions::default().max_reference_depth(1);
    let err = ProcessList::read_from_path(&top, &opts).unwrap_err();
    assert!(matches!(err, ClfError::ReferenceDepth { depth: 1 }));
    let opts = ParseOptions::default().max_reference_depth(2);
    assert!(ProcessList::read_from_path(&top, &opts).is_ok());
}

#[test]
fn strict_profile_rejects_reference() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "parent.clf", &reference_doc("parent", "child.clf", ""));
    let err = load(dir.path(), "parent.clf", &ParseOptions::strict()).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn self_contained_write_inlines_target() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "child.clf", &scale_doc("child", 2.0));
    write(dir.path(), "parent.clf", &reference_doc("parent", "child.clf", ""));
    let list = load(dir.path(), "parent.clf", &ParseOptions::default()).unwrap();

    let linked = String::from_utf8(list.to_bytes(&WriteOptions::default()).unwrap()).unwrap();
    assert!(linked.contains("<Reference"));

    let out = dir.path().join("flat.clf");
    list.write_to_path(&out, &WriteOptions::new().self_contained(true)).unwrap();
    let flat_xml = fs::read_to_string(&out).unwrap();
    assert!(!flat_xml.contains("<Reference"));
    assert_eq!(flat_xml.matches("<Matrix").count(), 2);

    // the inlined copy no longer needs the referenced file
    fs::remove_file(dir.path().join("child.clf")).unwrap();
    let flat = ProcessList::read_from_path(&out, &ParseOptions::default()).unwrap();
    assert_eq!(flat.nodes.len(), 2);
    let input = [0.1, 0.5, 1.0];
    assert_eq!(flat.process(&input, 3), list.process(&input, 3));
}

#[test]
fn bypassed_reference_inlines_bypassed_nodes() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "child.clf", &scale_doc("child", 2.0));
    write(dir.path(), "parent.clf", &reference_doc("parent", "child.clf", r#" bypass="true""#));
    let list = load(dir.path(), "parent.clf", &ParseOptions::default()).unwrap();
    assert_eq!(list.process(&[1.0, 1.0, 1.0], 3), vec![3.0, 3.0, 3.0]);

    let flat_bytes = list.to_bytes(&WriteOptions::new().self_contained(true)).unwrap();
    let flat = ProcessList::from_bytes(&flat_bytes, &ParseOptions::default()).unwrap();
    assert!(flat.nodes[0].is_bypassed());
    assert_eq!(flat.process(&[1.0, 1.0, 1.0], 3), vec![3.0, 3.0, 3.0]);
}
