use howto_import::persist::{load_guides, render_guides, save_guides};
use howto_import::{extract, GuideRecord, SiteProfile};
use tempfile::tempdir;

fn records() -> Vec<GuideRecord> {
    let pages = [
        r#"<h1>Café Table Refinish</h1><div class="step"><p>Sand the top down to bare wood.</p></div>"#,
        r#"<h1>Photo Only</h1><img src="https://cdn.x.com/p.jpg">"#,
    ];
    pages
        .iter()
        .map(|html| extract(html, "https://x.com/g", &SiteProfile::generic()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("guides.json");

    let records = records();
    save_guides(&path, &records).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, render_guides(&records).unwrap());
    assert!(written.contains("Café Table Refinish"));
    assert!(written.contains("\n        \"title\""));

    let loaded = load_guides(&path).await.unwrap();
    assert_eq!(loaded, records);
}

#[tokio::test]
async fn test_loading_invalid_record_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"[{"title": "No content", "steps": [], "images": []}]"#).unwrap();

    assert!(load_guides(&path).await.is_err());
}

#[tokio::test]
async fn test_missing_directory_is_io_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope").join("guides.json");
    let result = save_guides(&path, &records()).await;
    assert!(matches!(result, Err(howto_import::ImportError::IoError(_))));
}
