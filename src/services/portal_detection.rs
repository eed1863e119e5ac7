use serde::Serialize;
use url::Url;

/// Confidence every candidate starts from
const BASE_CONFIDENCE: f64 = 0.3;
const PLATFORM_BOOST: f64 = 0.4;
const PLATFORM_CAP: f64 = 0.95;
const STRONG_MATCH: f64 = 0.7;
const KEYWORD_BOOST: f64 = 0.1;
const KEYWORD_CAP: f64 = 0.9;
/// Anything scoring lower is not treated as a portal
pub const MIN_CONFIDENCE: f64 = 0.4;

const FALLBACK_SITE_NAME: &str = "Healthcare Portal";

/// A lowercase pattern: the parts must all occur, in order, without overlapping
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Contains(&'static str),
    InOrder(&'static [&'static str]),
}

impl Pattern {
    fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Contains(needle) => text.contains(needle),
            Pattern::InOrder(parts) => {
                let mut rest = text;
                for part in parts.iter() {
                    match rest.find(part) {
                        Some(at) => rest = &rest[at + part.len()..],
                        None => return false,
                    }
                }
                true
            }
        }
    }
}

const PLATFORMS: &[(&str, &[Pattern])] = &[
    (
        "MyChart",
        &[
            Pattern::Contains("mychart"),
            Pattern::Contains("epic"),
            Pattern::InOrder(&["chart.", ".com"]),
            Pattern::InOrder(&["mychart.", ".org"]),
        ],
    ),
    (
        "Epic",
        &[Pattern::Contains("epic"), Pattern::Contains("myepic"), Pattern::Contains("epicmychart")],
    ),
    (
        "Cerner",
        &[Pattern::Contains("cerner"), Pattern::Contains("powerchart"), Pattern::Contains("healthelife")],
    ),
    (
        "AllScripts",
        &[
            Pattern::Contains("allscripts"),
            Pattern::Contains("followmyhealth"),
            Pattern::Contains("myallscripts"),
        ],
    ),
    (
        "athenahealth",
        &[
            Pattern::Contains("athenahealth"),
            Pattern::Contains("athenacollector"),
            Pattern::Contains("athenanet"),
        ],
    ),
    ("NextGen", &[Pattern::Contains("nextgen"), Pattern::Contains("nextmd")]),
    (
        "Patient Portal",
        &[
            Pattern::InOrder(&["patient", "portal"]),
            Pattern::InOrder(&["portal", "patient"]),
            Pattern::Contains("healthportal"),
        ],
    ),
];

const HEALTHCARE_KEYWORDS: &[&str] = &[
    "health",
    "medical",
    "clinic",
    "hospital",
    "doctor",
    "physician",
    "patient",
    "care",
    "wellness",
    "medicine",
    "therapy",
    "dental",
    "vision",
    "eye",
    "cardiology",
    "pediatric",
    "family practice",
    "urgent care",
    "emergency",
    "surgery",
    "orthopedic",
    "dermatology",
];

/// Suggested quick-add metadata for a page that looks like a patient portal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalDetection {
    pub site_name: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// Score `url` (plus the page title and site name when known) against known
/// portal platforms and healthcare vocabulary.
///
/// Returns `None` when the URL does not parse or the score stays below
/// [`MIN_CONFIDENCE`].
pub fn detect_healthcare_portal(url: &str, page_title: Option<&str>, site_name: Option<&str>) -> Option<PortalDetection> {
    let parsed = Url::parse(url.trim()).ok()?;
    let text = format!("{} {} {}", url, page_title.unwrap_or(""), site_name.unwrap_or("")).to_lowercase();

    let confidence = score(&text);
    if confidence < MIN_CONFIDENCE {
        return None;
    }

    let site_name = site_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| parsed.host_str().map(site_name_from_host))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_SITE_NAME.to_string());

    let origin = parsed.origin();
    let favicon = origin
        .is_tuple()
        .then(|| format!("{}/favicon.ico", origin.ascii_serialization()));

    Some(PortalDetection { site_name, confidence, favicon })
}

fn score(text: &str) -> f64 {
    let mut confidence = BASE_CONFIDENCE;

    // One boost per platform, stopping once a strong match is reached
    for (_, patterns) in PLATFORMS {
        if patterns.iter().any(|p| p.matches(text)) {
            confidence = PLATFORM_CAP.min(confidence + PLATFORM_BOOST);
        }
        if confidence > STRONG_MATCH {
            break;
        }
    }

    let keywords = HEALTHCARE_KEYWORDS.iter().filter(|k| text.contains(*k)).count();
    if keywords > 0 {
        confidence = KEYWORD_CAP.min(confidence + keywords as f64 * KEYWORD_BOOST);
    }
    confidence
}

/// "www.city-kids_clinic.example.com" becomes "City Kids Clinic"
fn site_name_from_host(host: &str) -> String {
    let host = host.replacen("www.", "", 1);
    let label = host.split('.').next().unwrap_or_default();
    label
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
