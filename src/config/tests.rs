use std::io::Write;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.backend.request_timeout_seconds = Some(10);
    raw.logging.level = Some("info".to_string());

    let overrides = Overrides {
        request_timeout_seconds: Some(45),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.backend.request_timeout_seconds, 45);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn backend_defaults() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(settings.backend.base_url.is_none());
    assert!(settings.backend.token.is_none());
    assert_eq!(settings.backend.request_timeout_seconds, 30);
    assert_eq!(settings.backend.upload_chunk_bytes, 256 * 1024);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn blank_token_means_anonymous() {
    let mut raw = RawSettings::default();
    raw.backend.token = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.backend.token.is_none());
}

#[test]
fn zero_timeout_is_rejected_with_key() {
    let mut raw = RawSettings::default();
    raw.backend.request_timeout_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("invalid");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "backend.request_timeout_seconds",
            ..
        }
    ));
}

#[test]
fn zero_chunk_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.backend.upload_chunk_bytes = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn malformed_base_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.backend.base_url = Some("not a url".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid");
    assert_eq!(
        err.to_string().split(':').next(),
        Some("invalid configuration for `backend.base_url`")
    );
}

#[test]
fn settings_debug_hides_token() {
    let mut raw = RawSettings::default();
    raw.backend.token = Some("s3cr3t".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!format!("{settings:?}").contains("s3cr3t"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = Overrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn config_file_is_layered_under_cli_flags() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    writeln!(
        file,
        "[backend]\nbase_url = \"https://site.example.com/\"\nrequest_timeout_seconds = 12\n\n[logging]\nlevel = \"warn\""
    )
    .expect("write config");

    let path = file.path().to_string_lossy().into_owned();
    let args = CliArgs::parse_from([
        "vetrina",
        "--config-file",
        path.as_str(),
        "--log-level",
        "trace",
        "stats",
    ]);
    let settings = load(&args).expect("load");

    assert_eq!(
        settings.backend.base_url.as_ref().map(Url::as_str),
        Some("https://site.example.com/")
    );
    assert_eq!(settings.backend.request_timeout_seconds, 12);
    assert_eq!(settings.logging.level, LevelFilter::TRACE);
}

#[test]
fn parse_ai_arguments() {
    let args = CliArgs::parse_from(["vetrina", "ai", "--full"]);
    match args.command {
        Command::Ai(ai) => assert!(ai.full),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_add_post_arguments() {
    let args = CliArgs::parse_from([
        "vetrina",
        "add-post",
        "--title",
        "Hello",
        "--content-file",
        "/tmp/post.md",
        "--image",
        "/tmp/cover.png",
        "--backend-url",
        "https://site.example.com/",
    ]);

    assert_eq!(
        args.overrides.backend_url.as_deref(),
        Some("https://site.example.com/")
    );
    match args.command {
        Command::AddPost(post) => {
            assert_eq!(post.title, "Hello");
            assert_eq!(post.content_file, std::path::Path::new("/tmp/post.md"));
            assert_eq!(
                post.image.as_deref(),
                Some(std::path::Path::new("/tmp/cover.png"))
            );
            assert!(post.date.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_contact_arguments() {
    let args = CliArgs::parse_from([
        "vetrina",
        "contact",
        "--name",
        "Jo",
        "--email",
        "jo@example.com",
        "--message",
        "Hello there",
    ]);

    match args.command {
        Command::Contact(contact) => {
            assert_eq!(contact.name, "Jo");
            assert_eq!(contact.message, "Hello there");
        }
        _ => panic!("wrong command parsed"),
    }
}
