use super::*;

#[test]
fn test_tier_from_service_tag() {
    assert_eq!(ArtworkTier::from_service_tag("Series"), ArtworkTier::Series);
    assert_eq!(ArtworkTier::from_service_tag("Sport Event"), ArtworkTier::Sport);
    assert_eq!(ArtworkTier::from_service_tag("Team Event"), ArtworkTier::Sport);
    assert_eq!(ArtworkTier::from_service_tag(" episode "), ArtworkTier::Episode);
    assert_eq!(ArtworkTier::from_service_tag("Season"), ArtworkTier::Season);
    assert_eq!(ArtworkTier::from_service_tag(""), ArtworkTier::Other);
    assert_eq!(ArtworkTier::from_service_tag("Organization"), ArtworkTier::Other);
}

#[test]
fn test_tier_parse_rejects_unknown() {
    assert_eq!("SERIES".parse::<ArtworkTier>(), Ok(ArtworkTier::Series));
    assert!("poster".parse::<ArtworkTier>().is_err());
}

#[test]
fn test_parse_aspect() {
    assert_eq!(parse_aspect("4x3"), Some(4.0 / 3.0));
    assert_eq!(parse_aspect("16X9"), Some(16.0 / 9.0));
    assert_eq!(parse_aspect("2:3"), Some(2.0 / 3.0));
    assert_eq!(parse_aspect("square"), None);
    assert_eq!(parse_aspect("0x3"), None);
    assert_eq!(parse_aspect(""), None);
}

#[test]
fn test_entry_usable() {
    let ok = ArtworkEntry::new(ArtworkTier::Series, "Md", "4x3", "assets/p1.jpg");
    assert!(ok.is_usable());
    assert!(!ok.clone().with_code(5000).is_usable());

    let no_uri = ArtworkEntry::new(ArtworkTier::Series, "Md", "4x3", " ");
    assert!(!no_uri.is_usable());

    let no_aspect = ArtworkEntry::new(ArtworkTier::Series, "Md", "", "assets/p1.jpg");
    assert!(!no_aspect.is_usable());
}

#[test]
fn test_artwork_set_serializes_as_list() {
    let set = ArtworkSet::new(vec![
        ArtworkEntry::new(ArtworkTier::Episode, "Md", "16x9", "assets/e1.jpg")
            .with_category("Iconic")
            .with_dimensions(240, 135),
    ]);
    let json = serde_json::to_value(&set).unwrap();
    assert!(json.is_array());
    assert_eq!(json[0]["tier"], "episode");
    assert_eq!(json[0]["category"], "Iconic");

    let back: ArtworkSet = serde_json::from_value(json).unwrap();
    assert_eq!(back, set);
}

#[test]
fn test_metadata_response_status() {
    let ok = MetadataResponse::ok("EP0001", Vec::new());
    assert!(ok.is_success());
    let failed = MetadataResponse::failed("EP0002", 6000, "Program not found");
    assert!(!failed.is_success());
    assert!(failed.entries.is_empty());
    assert_eq!(failed.message.as_deref(), Some("Program not found"));
}
