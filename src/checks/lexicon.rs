// src/checks/lexicon.rs
//! Shared word books for the check catalog: free-hosting suffixes, brand
//! keywords and their official domains, suspicious TLDs, phishing keywords.
//!
//! Matching is label/token aware. Short brand names ("td", "ups") must match
//! a whole token; longer ones may appear embedded ("mypaypal").

use strsim::jaro_winkler;

pub static FREE_HOSTING_SUFFIXES: &[&str] = &[
    "000webhostapp.com",
    "weebly.com",
    "wordpress.com",
    "blogspot.com",
    "github.io",
    "netlify.app",
    "vercel.app",
    "wixsite.com",
    "herokuapp.com",
    "glitch.me",
    "firebaseapp.com",
    "web.app",
    "pages.dev",
    "repl.co",
    "surge.sh",
    "neocities.org",
];

/// Brand keyword plus the registrable domains the brand actually owns.
pub static BRAND_BOOK: &[(&str, &[&str])] = &[
    ("paypal", &["paypal.com", "paypal.me"]),
    ("amazon", &["amazon.com", "amazon.ca", "amazon.co.uk", "amazon.de"]),
    ("microsoft", &["microsoft.com", "live.com", "outlook.com", "office.com"]),
    ("apple", &["apple.com", "icloud.com"]),
    ("google", &["google.com", "gmail.com", "youtube.com"]),
    ("netflix", &["netflix.com"]),
    ("facebook", &["facebook.com", "fb.com"]),
    ("instagram", &["instagram.com"]),
    ("whatsapp", &["whatsapp.com"]),
    ("chase", &["chase.com"]),
    ("wellsfargo", &["wellsfargo.com"]),
    ("bankofamerica", &["bankofamerica.com"]),
    ("citibank", &["citibank.com", "citi.com"]),
    ("hsbc", &["hsbc.com"]),
    ("cibc", &["cibc.com"]),
    ("td", &["td.com", "tdbank.com"]),
    ("rbc", &["rbc.com", "royalbank.com"]),
    ("scotiabank", &["scotiabank.com"]),
    ("dhl", &["dhl.com", "dhl.de"]),
    ("fedex", &["fedex.com"]),
    ("ups", &["ups.com"]),
    ("usps", &["usps.com"]),
    ("irs", &["irs.gov"]),
    ("norton", &["norton.com"]),
    ("mcafee", &["mcafee.com"]),
    ("ebay", &["ebay.com"]),
    ("steam", &["steampowered.com", "steamcommunity.com"]),
    ("coinbase", &["coinbase.com"]),
    ("binance", &["binance.com"]),
    ("metamask", &["metamask.io"]),
];

pub static SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "club", "work", "click", "loan",
    "racing", "date", "stream", "download", "review", "zip", "mov",
];

pub static PHISHING_PATH_KEYWORDS: &[&str] = &[
    "login", "verify", "secure", "account", "update", "confirm", "signin",
    "webscr", "suspend", "unlock", "billing", "recover", "password",
];

pub static CREDENTIAL_KEYWORDS: &[&str] = &[
    "password", "passphrase", "ssn", "social security", "card number", "cvv",
    "cvc", "pin", "security question", "mother's maiden",
];

pub static URGENCY_PHRASES: &[&str] = &[
    "act now", "immediately", "account suspended", "within 24 hours",
    "final notice", "verify now", "urgent action", "will be closed",
    "limited time", "unusual activity",
];

/// Similarity bound above which two registrable domains count as lookalikes.
pub const HOMOGLYPH_SIMILARITY: f64 = 0.86;

/// Whole-token match for short brands, embedded match for longer ones.
fn token_matches_brand(token: &str, brand: &str) -> bool {
    if brand.len() >= 5 {
        token.contains(brand)
    } else {
        token == brand
    }
}

/// First brand keyword found in `text` (lowercased token scan).
pub fn brand_in(text: &str) -> Option<&'static str> {
    let lower = text.to_ascii_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    for (brand, _) in BRAND_BOOK {
        if tokens.iter().any(|t| token_matches_brand(t, brand)) {
            return Some(brand);
        }
    }
    None
}

/// Domains the brand actually owns; empty when the brand is unknown.
pub fn official_domains(brand: &str) -> &'static [&'static str] {
    BRAND_BOOK
        .iter()
        .find(|(b, _)| *b == brand)
        .map(|(_, d)| *d)
        .unwrap_or(&[])
}

/// Whether `registrable` is one of any brand's official domains.
pub fn is_brand_official(registrable: &str) -> bool {
    BRAND_BOOK
        .iter()
        .any(|(_, domains)| domains.contains(&registrable))
}

/// Free-hosting suffix the host sits under, if any.
pub fn free_host_suffix(host: &str) -> Option<&'static str> {
    FREE_HOSTING_SUFFIXES
        .iter()
        .find(|s| host == **s || host.ends_with(&format!(".{s}")))
        .copied()
}

/// Closest official brand domain by Jaro-Winkler, with its similarity.
/// Exact matches are excluded: an official domain is not a lookalike.
pub fn closest_brand_domain(registrable: &str) -> Option<(&'static str, f64)> {
    let mut best: Option<(&'static str, f64)> = None;
    for (_, domains) in BRAND_BOOK {
        for d in *domains {
            if *d == registrable {
                return None;
            }
            let sim = jaro_winkler(registrable, d);
            if best.map_or(true, |(_, b)| sim > b) {
                best = Some((d, sim));
            }
        }
    }
    best
}

pub fn count_distinct(haystack: &str, needles: &[&str]) -> usize {
    let lower = haystack.to_ascii_lowercase();
    needles.iter().filter(|n| lower.contains(**n)).count()
}
