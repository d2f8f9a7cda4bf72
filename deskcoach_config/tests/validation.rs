use deskcoach_config::ConfigDocument;

#[test]
fn rejects_fps_below_range() {
    let mut cfg = ConfigDocument::from_json(r#"{"pose_loop": {"fps": 1}}"#).unwrap();
    cfg.pose_loop.fps = 1;
    let err = cfg.validate().expect_err("should reject fps=1");
    assert!(format!("{err}").contains("fps"));
}

#[test]
fn accepts_valid_fps() {
    let cfg = ConfigDocument::from_json(r#"{"pose_loop": {"fps": 8}}"#).unwrap();
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.pose_loop.fps, 8);
}

#[test]
fn rejects_cumulative_min_greater_than_window() {
    let mut cfg = ConfigDocument::default();
    cfg.policy.neck.cumulative_min_sec = cfg.policy.neck.window_sec + 1.0;
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("neck"));
}

#[test]
fn missing_document_fields_use_defaults() {
    let cfg = ConfigDocument::from_json("{}").unwrap();
    cfg.validate().expect("defaults are valid");
}
