use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use rfprint::host::{HostConfig, Locator, PageHost, PrintHost};
use rfprint::{extract, PresetCatalog, PrintDocument};

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

fn payslip_document() -> PrintDocument {
    let page = fs::read_to_string("tests/goldens/pages/payslip.html").expect("read fixture");
    let mut host = PageHost::new(HostConfig::default()).expect("host");
    host.load_html(&page, Some("https://payroll.example/employees/7/"))
        .expect("load");

    let labels = [("id", "payslip-summary")]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let (source, config) = PresetCatalog::builtin()
        .resolve("payslip", &labels)
        .expect("preset");

    // Fixed print time so the title and footer are stable
    let snapshot = host.resolve(Locator::Id(&source.id)).expect("element");
    let at = Utc.with_ymd_and_hms(2024, 3, 31, 17, 45, 0).unwrap();
    PrintDocument::compose(&config, &extract::content(&snapshot, &config), at, host.base_url())
}

#[test]
fn payslip_document_structure() {
    let doc = payslip_document();
    assert_eq!(
        doc.title(),
        "Compensation_And_Payroll_Summary_2024-03-31T17-45-00-000Z"
    );
    let markup = doc.markup();
    assert!(markup.starts_with("<!DOCTYPE html>\n"));
    assert!(markup.contains("<h2>Payslip for March 2024</h2>"));
    assert!(markup.contains("@page { size: A4; margin: 0; }"));
    assert!(markup.contains("<td>Housing &amp; Transport</td>"));
    assert!(markup.contains("Printed on: 2024-03-31 17:45:00 UTC"));
    assert!(!markup.contains("<script>"));
}

#[test]
fn golden_payslip_matches_fixture() {
    let doc = payslip_document();

    let expected_path = golden_path("payslip.sha256");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, doc.digest()).expect("write golden");
        fs::write(golden_path("payslip.html"), doc.markup()).expect("write golden markup");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    let markup = fs::read_to_string(golden_path("payslip.html")).expect("unable to read golden");
    assert_eq!(doc.markup(), markup);

    let exp = fs::read_to_string(&expected_path).expect("unable to read golden");
    assert_eq!(doc.digest(), exp.trim());
}
