use super::*;

fn parse(json: &str) -> Vec<MetadataResponse> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json).unwrap();
    metadata_responses(values)
}

#[test]
fn test_token_error_codes() {
    assert!(is_token_error_code(4001));
    assert!(is_token_error_code(4003));
    assert!(is_token_error_code(4006));
    assert!(!is_token_error_code(0));
    assert!(!is_token_error_code(5000));
}

#[test]
fn test_token_response() {
    let json = r#"{"code":0,"message":"OK","serverID":"20141201.web.1",
        "datetime":"2016-08-23T13:55:25Z","token":"f3fca79989cafe7dead71beefedc812b"}"#;
    let resp: TokenResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.code, 0);
    assert_eq!(resp.token.as_deref(), Some("f3fca79989cafe7dead71beefedc812b"));
    assert_eq!(resp.server_id.as_deref(), Some("20141201.web.1"));
    assert!(resp.datetime.is_some());
    assert!(resp.token_expires.is_none());
}

#[test]
fn test_artwork_list() {
    let responses = parse(
        r#"[{"programID":"EP012345670001","data":[
            {"width":"240","height":"180","uri":"assets/p1.jpg","size":"Md","aspect":"4x3",
             "category":"Banner-L1","text":"yes","primary":"true","tier":"Series"},
            {"width":120,"height":180,"uri":"assets/p2.jpg","size":"Sm","aspect":"2x3",
             "category":"Iconic","tier":"Episode"}
        ]}]"#,
    );
    assert_eq!(responses.len(), 1);
    let r = &responses[0];
    assert!(r.is_success());
    assert_eq!(r.program_id.as_str(), "EP012345670001");
    assert_eq!(r.entries.len(), 2);

    let first = &r.entries[0];
    assert_eq!(first.tier, ArtworkTier::Series);
    assert_eq!(first.width, Some(240));
    assert_eq!(first.height, Some(180));
    assert!(first.primary);
    assert_eq!(first.category.as_deref(), Some("Banner-L1"));

    let second = &r.entries[1];
    assert_eq!(second.tier, ArtworkTier::Episode);
    assert_eq!(second.width, Some(120));
    assert!(!second.primary);
}

#[test]
fn test_error_object() {
    let responses = parse(
        r#"[{"programID":"EP000000000001","data":{"code":5000,"response":"IMAGE_NOT_FOUND","message":"No images"}}]"#,
    );
    let r = &responses[0];
    assert!(!r.is_success());
    assert_eq!(r.code, 5000);
    assert!(r.entries.is_empty());
    assert_eq!(r.message.as_deref(), Some("IMAGE_NOT_FOUND: No images"));
}

#[test]
fn test_error_items_in_list() {
    let responses = parse(
        r#"[{"programID":"EP000000000002","data":[{"code":5000,"message":"Not found"}]}]"#,
    );
    assert_eq!(responses[0].code, 5000);
    assert_eq!(responses[0].message.as_deref(), Some("Not found"));
}

#[test]
fn test_malformed_items_are_skipped() {
    let responses = parse(
        r#"[{"programID":"EP000000000003","data":[
            {"uri":"assets/ok.jpg","size":"Md","aspect":"4x3","tier":"Series"},
            {"uri":null,"size":"Md","aspect":"4x3"},
            {"uri":"assets/no-aspect.jpg","size":"Md"},
            {"uri":"","size":"Md","aspect":"16x9"}
        ]}]"#,
    );
    let r = &responses[0];
    assert!(r.is_success());
    assert_eq!(r.entries.len(), 1);
    assert_eq!(r.entries[0].uri, "assets/ok.jpg");
}

#[test]
fn test_missing_data_is_empty_success() {
    let responses = parse(r#"[{"programID":"EP000000000004"},{"programID":"EP000000000005","data":[]}]"#);
    assert!(responses.iter().all(|r| r.is_success() && r.entries.is_empty()));
}

#[test]
fn test_unknown_tier_is_other() {
    let responses = parse(
        r#"[{"programID":"SP000000000006","data":[
            {"uri":"a.jpg","size":"Md","aspect":"4x3","tier":"Team Event"},
            {"uri":"b.jpg","size":"Md","aspect":"4x3","tier":"Something"},
            {"uri":"c.jpg","size":"Md","aspect":"4x3"}
        ]}]"#,
    );
    let tiers: Vec<ArtworkTier> = responses[0].entries.iter().map(|e| e.tier).collect();
    assert_eq!(tiers, vec![ArtworkTier::Sport, ArtworkTier::Other, ArtworkTier::Other]);
}

#[test]
fn test_status_response() {
    let json = r#"{"account":{"expires":"2027-01-01T00:00:00Z","messages":[],"maxLineups":4},
        "lineups":[],"lastDataUpdate":"2026-10-18T22:10:00Z","notifications":[],
        "systemStatus":[{"date":"2026-10-01T00:00:00Z","status":"Online","message":"No known issues."}],
        "serverID":"20141201.web.1","datetime":"2026-10-19T08:00:00Z","code":0}"#;
    let status: StatusResponse = serde_json::from_str(json).unwrap();
    assert!(status.is_online());
    assert_eq!(status.account.unwrap().max_lineups, Some(4));
}

#[test]
fn test_error_envelope_describe() {
    let err: ApiErrorResponse =
        serde_json::from_str(r#"{"response":"INVALID_USER","code":4003,"message":"Invalid user."}"#).unwrap();
    assert_eq!(err.code, 4003);
    assert_eq!(err.describe(), "INVALID_USER: Invalid user.");
}

#[test]
fn test_mistyped_item_does_not_sink_the_batch() {
    let bad_items = [
        r#"{"uri":"assets/bad.jpg","size":"Md","aspect":"4x3","code":"0"}"#,
        r#"{"uri":"assets/bad.jpg","size":"Md","aspect":"4x3","tier":7}"#,
        "null",
    ];
    for bad in bad_items {
        let json = format!(
            r#"[{{"programID":"EP1","data":[{bad},
                {{"uri":"assets/ep1.jpg","size":"Md","aspect":"4x3","tier":"Episode"}}]}},
               {{"programID":"EP2","data":[{{"uri":"assets/ep2.jpg","size":"Md","aspect":"16x9","tier":"Series"}}]}}]"#
        );
        let responses = parse(&json);
        assert_eq!(responses.len(), 2, "{bad}");

        assert!(responses[0].is_success());
        assert_eq!(responses[0].entries.len(), 1, "{bad}");
        assert_eq!(responses[0].entries[0].uri, "assets/ep1.jpg");

        assert!(responses[1].is_success());
        assert_eq!(responses[1].entries[0].uri, "assets/ep2.jpg");
    }
}

#[test]
fn test_unrecognized_data_fails_only_that_program() {
    let responses = parse(
        r#"[{"programID":"EP1","data":"garbage"},
            {"programID":"EP2","data":{"unexpected":true}},
            {"programID":7},
            {"programID":"EP3","data":[{"uri":"assets/ep3.jpg","size":"Md","aspect":"4x3"}]}]"#,
    );
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].code, CODE_MALFORMED);
    assert_eq!(responses[1].code, CODE_MALFORMED);
    assert!(responses[2].is_success());
    assert_eq!(responses[2].program_id.as_str(), "EP3");
}
