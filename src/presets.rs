//! Named print layouts
//!
//! Each preset pairs an element identifier template with a [`PrintConfig`].
//! Labels passed at invocation fill `{name}` placeholders in both, so a
//! single preset covers e.g. every month's compensation summary.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::labels::{apply_labels, missing_label};
use crate::{
    ContentSource, Error, Geometry, Heading, PageSetup, Payload, PrintConfig, Result, Stylesheet,
};

const BOOTSTRAP_5_1: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.1.3/dist/css/bootstrap.min.css";
const BOOTSTRAP_5_3: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css";

fn default_required() -> bool {
    true
}

/// A named layout: where the content lives and how it is printed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Element id, with optional `{label}` placeholders
    pub element_id: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub fallback_selector: Option<String>,
    #[serde(default)]
    pub config: PrintConfig,
}

impl Preset {
    pub fn new(element_id: &str, config: PrintConfig) -> Self {
        Self {
            element_id: element_id.to_string(),
            required: true,
            fallback_selector: None,
            config,
        }
    }

    /// Content source and configuration with `labels` applied.
    ///
    /// Fails if the element id still has a placeholder no label filled.
    pub fn instantiate(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<(ContentSource, PrintConfig)> {
        let mut config = self.config.clone();
        for (k, v) in labels {
            config.labels.insert(k.clone(), v.clone());
        }
        let id = apply_labels(&self.element_id, &config.labels);
        if let Some(name) = missing_label(&id) {
            return Err(Error::ConfigError(format!(
                "element id '{}' needs a value for label '{}'",
                self.element_id, name
            )));
        }
        let source = ContentSource {
            id,
            required: self.required,
            fallback_selector: self.fallback_selector.clone(),
        };
        Ok((source, config))
    }
}

/// A set of presets keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetCatalog {
    presets: BTreeMap<String, Preset>,
}

impl PresetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layouts of the payroll and strategy report pages
    pub fn builtin() -> Self {
        let mut c = Self::new();

        c.insert(
            "summary",
            Preset::new(
                "{id}",
                PrintConfig {
                    title: "print_Summary".into(),
                    heading: Heading::FromContent {
                        selector: "h4".into(),
                        fallback: "Summary".into(),
                        title: Some("Print Summary".into()),
                    },
                    payload: Payload::Nested {
                        selector: "table".into(),
                    },
                    stylesheets: vec![
                        Stylesheet::Link(BOOTSTRAP_5_1.into()),
                        Stylesheet::Inline(
                            ".bg-info, .table-primary { background-color: #d1e7ff !important; }"
                                .into(),
                        ),
                    ],
                    page: PageSetup {
                        size: "auto".into(),
                        margin: "10mm".into(),
                    },
                    auto_close_delay_ms: 300,
                    ..Default::default()
                },
            ),
        );

        c.insert(
            "payslip",
            Preset::new(
                "{id}",
                PrintConfig {
                    title: "Compensation_And_Payroll_Summary".into(),
                    heading: Heading::FromContent {
                        selector: "h4".into(),
                        fallback: "Summary".into(),
                        title: None,
                    },
                    stylesheets: vec![
                        Stylesheet::Link(BOOTSTRAP_5_1.into()),
                        Stylesheet::Inline(
                            ".row { display: flex; flex-wrap: wrap; } \
                             .col-md-6 { width: 50%; padding: 5px; }"
                                .into(),
                        ),
                    ],
                    page: PageSetup {
                        size: "A4".into(),
                        margin: "0".into(),
                    },
                    table_border: "1px solid #ccc".into(),
                    avoid_break_selectors: vec![
                        ".print-body".into(),
                        ".row".into(),
                        ".col-md-6".into(),
                        "table".into(),
                    ],
                    geometry: Geometry {
                        width: 1000,
                        height: 800,
                    },
                    ..Default::default()
                },
            ),
        );

        c.insert(
            "combined-detail",
            Preset::new(
                "{id}",
                PrintConfig {
                    title: "Compensation_And_Payroll_Detail".into(),
                    stylesheets: vec![Stylesheet::Inline(
                        ".row { display: flex; flex-wrap: nowrap; gap: 16px; } \
                         .border-end { border-right: 1px solid #ccc !important; \
                         padding-right: 10px !important; }"
                            .into(),
                    )],
                    page: PageSetup {
                        size: "A4".into(),
                        margin: "1.2cm".into(),
                    },
                    table_border: "1px solid #aaa".into(),
                    geometry: Geometry {
                        width: 800,
                        height: 1000,
                    },
                    ..Default::default()
                },
            ),
        );

        let compensation = |subtitle: &str, title: &str| PrintConfig {
            title: title.into(),
            timestamp_title: false,
            heading: Heading::Fixed {
                title: "Compensation Summary".into(),
                subtitle: Some(subtitle.into()),
            },
            stylesheets: vec![
                Stylesheet::Link(BOOTSTRAP_5_3.into()),
                Stylesheet::Inline(
                    ".card { margin-top: 20px; padding: 20px; border: 1px solid #ddd; }".into(),
                ),
            ],
            ..Default::default()
        };
        c.insert(
            "monthly-compensation",
            Preset::new(
                "monthly-compensation-summary-{month}-{year}",
                compensation("{month} {year}", "Compensation Summary for {month} {year}"),
            ),
        );
        c.insert(
            "yearly-compensation",
            Preset::new(
                "yearly-compensation-summary-{year}",
                compensation("{year}", "Compensation Summary for {year}"),
            ),
        );

        // Journal and leave/severance pages print the bare content with a
        // shaded table header and close as soon as printing returns.
        let journal = |title: &str, heading: Heading| PrintConfig {
            title: title.into(),
            timestamp_title: false,
            heading,
            stylesheets: vec![Stylesheet::Inline(
                "th { background-color: #f2f2f2; font-weight: bold; }".into(),
            )],
            footer_timestamp: false,
            auto_close_delay_ms: 0,
            ..Default::default()
        };

        let mut action_plan_journal = journal(
            "{title}",
            Heading::Fixed {
                title: "Payroll Journal Entry".into(),
                subtitle: Some("{title}".into()),
            },
        );
        action_plan_journal.table_border = "1px solid #000".into();
        action_plan_journal.footer_timestamp = true;
        action_plan_journal.footer_label = "Generated on".into();
        action_plan_journal.footer_format = "%Y-%m-%d".into();
        c.insert(
            "action-plan-journal-entry",
            Preset::new("{id}", action_plan_journal),
        );

        c.insert(
            "multi-month-bonus-summary",
            Preset::new(
                "{id}",
                journal(
                    "{title}",
                    Heading::Fixed {
                        title: "{title}".into(),
                        subtitle: None,
                    },
                ),
            ),
        );
        c.insert(
            "multi-month-bonus-journal-entry",
            Preset::new(
                "{id}",
                journal("Journal Entry Summary for {month} - {year}", Heading::None),
            ),
        );
        c.insert(
            "annual-leave-pay-summary",
            Preset::new("{id}", journal("Print", Heading::None)),
        );
        c.insert(
            "annual-leave-pay-journal-entry",
            Preset::new("{id}", journal("Journal Entry Summary", Heading::None)),
        );
        c.insert(
            "severance-pay-summary",
            Preset::new(
                "{id}",
                journal("Severance Pay Summary for {month} {year}", Heading::None),
            ),
        );
        c.insert(
            "severance-pay-journal-entry",
            Preset::new(
                "{id}",
                journal(
                    "Severance Pay Journal Entry for {month} {year}",
                    Heading::Fixed {
                        title: "Severance Pay Journal Entry".into(),
                        subtitle: None,
                    },
                ),
            ),
        );

        c.insert(
            "earning-adjustment",
            Preset::new(
                "{id}",
                PrintConfig {
                    title: "Monthly Earnings Adjustment".into(),
                    timestamp_title: false,
                    payload: Payload::OuterHtml,
                    stylesheets: vec![
                        Stylesheet::Link(BOOTSTRAP_5_3.into()),
                        Stylesheet::Inline(
                            ".card-header { font-size: 1.5rem; } table { font-size: 0.95rem; }"
                                .into(),
                        ),
                    ],
                    footer_timestamp: false,
                    geometry: Geometry {
                        width: 900,
                        height: 700,
                    },
                    ..Default::default()
                },
            ),
        );

        let mut content = Preset::new(
            "{id}",
            PrintConfig {
                title: "{title}".into(),
                timestamp_title: false,
                heading: Heading::Fixed {
                    title: "{title}".into(),
                    subtitle: None,
                },
                stylesheets: vec![Stylesheet::Link(BOOTSTRAP_5_3.into())],
                ..Default::default()
            },
        );
        content.required = false;
        content.fallback_selector = Some(".container".into());
        c.insert("content", content);

        c
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn insert(&mut self, name: &str, preset: Preset) -> Option<Preset> {
        self.presets.insert(name.to_string(), preset)
    }

    /// Add `other`'s presets, replacing same-named ones
    pub fn merge(&mut self, other: PresetCatalog) {
        self.presets.extend(other.presets);
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Look up `name` and instantiate it with `labels`
    pub fn resolve(
        &self,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<(ContentSource, PrintConfig)> {
        let preset = self
            .get(name)
            .ok_or_else(|| Error::ConfigError(format!("unknown preset '{}'", name)))?;
        preset.instantiate(labels)
    }
}
