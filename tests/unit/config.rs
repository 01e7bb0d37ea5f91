use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "darkroom_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn minimal_json_takes_defaults() {
    let cfg: BakeConfig =
        serde_json::from_str(r#"{ "name": "sunset", "image": "a.png", "ripeness": 256 }"#)
            .unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.ripeness, Ripeness(256));
    assert_eq!(cfg.period().unwrap(), Duration::from_secs(1));
    assert_eq!(cfg.overlap, OverlapPolicy::Overlap);
    assert_eq!(cfg.scale, ThresholdScale::Byte);
    assert_eq!(cfg.threads, None);
    assert_eq!(cfg.align_second, None);
}

#[test]
fn full_json_round_trips_enums() {
    let cfg: BakeConfig = serde_json::from_str(
        r#"{
            "name": "n1",
            "image": "a.png",
            "ripeness": 10,
            "interval_secs": 0.5,
            "overlap": "serial",
            "scale": "full",
            "threads": 4,
            "align_second": 30
        }"#,
    )
    .unwrap();
    cfg.validate().unwrap();
    let opts = cfg.schedule_options().unwrap();
    assert_eq!(opts.period, Duration::from_millis(500));
    assert_eq!(opts.overlap, OverlapPolicy::Serial);
    assert_eq!(cfg.column_baker().unwrap().scale(), ThresholdScale::Full);
}

#[test]
fn unknown_fields_are_rejected() {
    let res: Result<BakeConfig, _> = serde_json::from_str(
        r#"{ "name": "n", "image": "a.png", "ripeness": 1, "intervl_secs": 2 }"#,
    );
    assert!(res.is_err());
}

#[test]
fn validate_rejects_bad_settings() {
    let base = BakeConfig::new("ok", "a.png", Ripeness(8));
    base.validate().unwrap();

    let mut bad = base.clone();
    bad.name = "no/slashes".to_string();
    assert!(matches!(bad.validate(), Err(DarkroomError::Validation(_))));

    for secs in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let mut bad = base.clone();
        bad.interval_secs = secs;
        assert!(bad.validate().is_err(), "interval {secs}");
    }

    let mut bad = base.clone();
    bad.threads = Some(0);
    bad.validate().unwrap();
    assert!(matches!(
        bad.column_baker(),
        Err(DarkroomError::Validation(_))
    ));

    let mut bad = base;
    bad.align_second = Some(60);
    assert!(bad.validate().is_err());
}

#[test]
fn from_path_resolves_image_next_to_config() {
    let dir = temp_dir("config_from_path");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("bake.json");
    std::fs::write(
        &path,
        r#"{ "name": "n", "image": "img/a.png", "ripeness": 3, "interval_secs": 2 }"#,
    )
    .unwrap();

    let cfg = BakeConfig::from_path(&path).unwrap();
    assert_eq!(cfg.image, dir.join("img/a.png"));
    assert_eq!(cfg.period().unwrap(), Duration::from_secs(2));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn from_path_reports_missing_file() {
    let err = BakeConfig::from_path(temp_dir("config_missing").join("nope.json")).unwrap_err();
    assert!(err.to_string().contains("open config"));
}
