#![cfg(feature = "async")]

use rfprint::host::HostConfig;
use rfprint::{ContentSource, Error, PrintConfig, Printer};

const PAGE: &str = r#"<html><head><title>Strategy</title></head><body>
<div class="container"><div id="action-plan"><h4>Action Plan</h4><ol><li>Hire</li></ol></div></div>
</body></html>"#;

#[tokio::test]
async fn printer_runs_lifecycle_on_worker() -> anyhow::Result<()> {
    let printer = Printer::new(None).await?;
    printer.load_html(PAGE, None).await?;

    let config = PrintConfig {
        title: "Action Plan".into(),
        timestamp_title: false,
        auto_close_delay_ms: 20,
        ..Default::default()
    };
    let report = printer
        .print(ContentSource::id("action-plan"), config)
        .await?;
    assert_eq!(report.title, "Action Plan");
    assert_eq!(report.popup, "print-popup-1");

    let popups = printer.popups().await?;
    assert_eq!(popups.len(), 1);
    assert!(popups[0].closed);
    assert_eq!(popups[0].print_count, 1);
    assert!(popups[0].document.contains("<li>Hire</li>"));

    printer.close().await?;
    Ok(())
}

#[tokio::test]
async fn printer_reports_failures_and_notices() -> anyhow::Result<()> {
    let printer = Printer::new(Some(HostConfig::default())).await?;
    printer.load_html(PAGE, None).await?;

    let err = printer
        .print(ContentSource::id("missing"), PrintConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ContentNotFound(_)));
    assert_eq!(printer.notices().await?, vec!["Content not found!".to_string()]);

    let silent = printer
        .print(ContentSource::id("missing").optional(), PrintConfig::default())
        .await;
    assert!(silent.is_err());
    assert_eq!(printer.notices().await?.len(), 1);

    printer.close().await?;
    Ok(())
}

#[tokio::test]
async fn clones_share_one_worker() -> anyhow::Result<()> {
    let printer = Printer::new(None).await?;
    let other = printer.clone();
    other.load_html(PAGE, None).await?;

    let config = PrintConfig {
        auto_close_delay_ms: 0,
        ..Default::default()
    };
    printer
        .print(ContentSource::id("action-plan"), config.clone())
        .await?;
    other.print(ContentSource::id("action-plan"), config).await?;
    assert_eq!(printer.popups().await?.len(), 2);

    printer.close().await?;
    assert!(other.notices().await.is_err());
    Ok(())
}
