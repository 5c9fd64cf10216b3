use super::*;
use crate::artwork::{ArtworkEntry, ArtworkTier};

fn catalog() -> MemoryCatalog {
    MemoryCatalog::from_records(vec![
        ProgramRecord::new("EP0001").with_title("Pilot"),
        ProgramRecord::new("MV0002").with_title("A Movie"),
        ProgramRecord::new("EP0003"),
        ProgramRecord::new("EP0001").with_title("Duplicate"),
    ])
}

#[test]
fn test_duplicates_are_ignored() {
    let catalog = catalog();
    assert_eq!(catalog.len(), 3);
    let first = catalog.get(&ProgramId::from("EP0001")).unwrap();
    assert_eq!(first.title.as_deref(), Some("Pilot"));
}

#[test]
fn test_candidate_ids_keep_catalog_order() {
    let catalog = catalog();
    let ids = catalog.candidate_ids(&|id: &ProgramId| id.as_str().starts_with("EP"));
    assert_eq!(ids, vec![ProgramId::from("EP0001"), ProgramId::from("EP0003")]);
}

#[test]
fn test_insert_appends_new_programs_only() {
    let catalog = catalog();
    assert!(catalog.insert(ProgramRecord::new("EP0004")));
    assert!(!catalog.insert(ProgramRecord::new("EP0001").with_title("Again")));
    assert_eq!(catalog.len(), 4);
    let ids = catalog.candidate_ids(&|_: &ProgramId| true);
    assert_eq!(ids.last(), Some(&ProgramId::from("EP0004")));
    assert_eq!(
        catalog.get(&ProgramId::from("EP0001")).unwrap().title.as_deref(),
        Some("Pilot")
    );
}

#[test]
fn test_set_artwork_requires_known_program() {
    let catalog = catalog();
    let set = ArtworkSet::new(vec![ArtworkEntry::new(
        ArtworkTier::Series,
        "Md",
        "4x3",
        "assets/p.jpg",
    )]);

    assert!(catalog.set_artwork(&ProgramId::from("EP0003"), &set));
    assert_eq!(catalog.artwork(&ProgramId::from("EP0003")), Some(set.clone()));
    assert!(!catalog.set_artwork(&ProgramId::from("EP9999"), &set));
}

#[test]
fn test_snapshot_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");

    let catalog = catalog();
    let set = ArtworkSet::new(vec![ArtworkEntry::new(
        ArtworkTier::Episode,
        "Md",
        "16x9",
        "assets/e.jpg",
    )]);
    catalog.set_artwork(&ProgramId::from("EP0001"), &set);
    catalog.save(&path).unwrap();

    let loaded = MemoryCatalog::load(&path).unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.artwork(&ProgramId::from("EP0001")), Some(set));
    assert!(loaded.artwork(&ProgramId::from("MV0002")).is_none());
}
