//! Normalisation of raw register records into [`TidiedAsset`]s.
//!
//! The register's free-text contact fields are noisy in predictable ways:
//! phone numbers pasted onto the end of addresses, `+44` and `0044` prefixes
//! mixed with domestic formats, the same number appearing in up to three
//! different fields, and comma-run addresses with or without a trailing
//! county. Everything in this module is pure and deterministic; the same raw
//! record always tidies to the same canonical record.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::{
  asset::{TidiedAsset, TidiedContact},
  raw::RawRecord,
};

/// UK postcode, e.g. `EC4A 1LT` or `rg21 4eq` (the register is not
/// consistent about case or internal spacing).
static POSTCODE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)[A-Z]{1,2}\d[A-Z\d]?\s*\d[A-Z]{2}").expect("postcode pattern")
});

/// UK landline/mobile shapes: `0207 123 4567`, `01256-406300`,
/// `+44 207 123 4567`, `07123 456789`.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?:(?:\+44|0044)\s*)?0?\d{2,5}[\s-]?\d{3,4}[\s-]?\d{3,4}")
    .expect("phone pattern")
});

/// Substrings marking a trailing address part as a county rather than a
/// city. Best-effort and UK-only; anything else falls through to the plain
/// last-part-is-city policy.
const COUNTY_HINTS: [&str; 17] = [
  "SHIRE",
  "YORKSHIRE",
  "LANCASHIRE",
  "CORNWALL",
  "DEVON",
  "DORSET",
  "SUFFOLK",
  "NORFOLK",
  "SUSSEX",
  "KENT",
  "ESSEX",
  "SURREY",
  "BERKSHIRE",
  "HAMPSHIRE",
  "WILTSHIRE",
  "SOMERSET",
  "GLOUCESTERSHIRE",
];

// ─── Phone handling ──────────────────────────────────────────────────────────

/// Normalise a phone number to a digits-only domestic form.
///
/// Whitespace and hyphens are stripped, a `+44`/`0044` prefix collapses to a
/// leading `0`, and any remaining non-digit characters are dropped.
pub fn normalize_phone(raw: &str) -> String {
  if raw.is_empty() {
    return String::new();
  }

  let mut digits: String = raw
    .chars()
    .filter(|c| !c.is_whitespace() && *c != '-')
    .collect();

  if let Some(rest) = digits.strip_prefix("+44") {
    digits = format!("0{rest}");
  } else if let Some(rest) = digits.strip_prefix("0044") {
    digits = format!("0{rest}");
  }

  digits.chars().filter(char::is_ascii_digit).collect()
}

/// Extract a phone number trailing a free-text address.
///
/// The last postcode occurrence anchors the search: the first phone-shaped
/// token after it is taken (so `"01256 406300 or 0207 236 4232"` keeps the
/// first number) and the address is truncated back to the postcode. Without
/// a postcode, a phone is only extracted when the string ends with it.
pub fn extract_phone(address: &str) -> (String, Option<String>) {
  if address.is_empty() {
    return (String::new(), None);
  }

  let Some(postcode) = POSTCODE.find_iter(address).last() else {
    if let Some(m) = PHONE.find(address)
      && address.ends_with(m.as_str())
    {
      let clean = address[..m.start()]
        .trim_end_matches([',', ' '])
        .to_string();
      return (clean, Some(normalize_phone(m.as_str())));
    }
    return (address.to_string(), None);
  };

  let after = &address[postcode.end()..];
  if let Some(m) = PHONE.find(after) {
    let clean = address[..postcode.end()]
      .trim_end_matches([',', ' '])
      .to_string();
    return (clean, Some(normalize_phone(m.as_str())));
  }

  (address.to_string(), None)
}

/// Pick one telephone number from the up-to-three places the register can
/// carry it. Priority: explicit telephone field, then the access-details
/// phone, then the number recovered from the address. The first normalised
/// candidate of plausible UK length (≥ 10 digits) wins; failing that, the
/// first non-empty candidate.
pub fn dedupe_phone(
  address_phone: Option<&str>,
  telephone_field: Option<&str>,
  access_phone: Option<&str>,
) -> Option<String> {
  let normalized: Vec<String> = [telephone_field, access_phone, address_phone]
    .into_iter()
    .flatten()
    .filter(|p| !p.is_empty())
    .map(normalize_phone)
    .collect();

  normalized
    .iter()
    .find(|p| p.len() >= 10)
    .or_else(|| normalized.first())
    .filter(|p| !p.is_empty())
    .cloned()
}

// ─── Address parsing ─────────────────────────────────────────────────────────

/// Address components recovered from a comma-run address string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAddress {
  pub line1:    Option<String>,
  pub line2:    Option<String>,
  pub city:     Option<String>,
  pub postcode: Option<String>,
}

/// Split a UK address of the shape `"ORG, BUILDING, STREET, CITY, COUNTY,
/// POSTCODE"` into components. The postcode is removed first; the remainder
/// is split on commas and assigned by part count. A trailing county part is
/// recognised by substring (see [`COUNTY_HINTS`]) and discarded.
pub fn parse_address(address: &str) -> ParsedAddress {
  let mut out = ParsedAddress::default();
  if address.is_empty() {
    return out;
  }

  let mut rest = address;
  if let Some(m) = POSTCODE.find(address) {
    out.postcode = Some(m.as_str().trim().to_uppercase());
    rest = address[..m.start()].trim_end_matches([',', ' ']);
  }

  let parts: Vec<&str> = rest
    .split(',')
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .collect();

  match parts.len() {
    0 => {}
    1 => out.line1 = Some(parts[0].to_string()),
    2 => {
      out.line1 = Some(parts[0].to_string());
      out.city = Some(parts[1].to_string());
    }
    3 => {
      out.line1 = Some(parts[0].to_string());
      out.line2 = Some(parts[1].to_string());
      out.city = Some(parts[2].to_string());
    }
    n => {
      let last_upper = parts[n - 1].to_uppercase();
      let is_county = COUNTY_HINTS.iter().any(|c| last_upper.contains(c));

      out.line1 = Some(parts[0].to_string());
      if is_county {
        out.line2 = non_empty(parts[1..n - 2].join(", "));
        out.city = Some(parts[n - 2].to_string());
      } else {
        out.line2 = non_empty(parts[1..n - 1].join(", "));
        out.city = Some(parts[n - 1].to_string());
      }
    }
  }

  out
}

// ─── Scalar cleaning ─────────────────────────────────────────────────────────

/// Clean one raw scalar: trim whitespace, map empty to absent, and format
/// whole-valued numbers as integers (spreadsheet-sourced snapshots carry
/// ids like `12345.0`).
pub fn clean_value(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::Null => None,
    Value::String(s) => non_empty(s.trim().to_string()),
    Value::Number(n) => {
      if let Some(i) = n.as_i64() {
        Some(i.to_string())
      } else if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
          Some((f as i64).to_string())
        } else {
          Some(n.to_string())
        }
      } else {
        Some(n.to_string())
      }
    }
    Value::Bool(b) => Some(b.to_string()),
    other => non_empty(other.to_string()),
  }
}

fn non_empty(s: String) -> Option<String> {
  if s.is_empty() { None } else { Some(s) }
}

// ─── Tidy ────────────────────────────────────────────────────────────────────

/// Normalise one raw record into its canonical form.
///
/// Reads the register's known field names; anything else in the record is
/// ignored here but preserved in the raw layer.
pub fn tidy(raw: &RawRecord) -> TidiedAsset {
  let contact_address = clean_value(raw.get("contact_address")).unwrap_or_default();
  let (clean_address, address_phone) = extract_phone(&contact_address);
  let parsed = parse_address(&clean_address);

  let telephone = dedupe_phone(
    address_phone.as_deref(),
    clean_value(raw.get("telephone_no")).as_deref(),
    clean_value(raw.get("access_phone")).as_deref(),
  );

  let fax = clean_value(raw.get("fax_no"))
    .map(|f| normalize_phone(&f))
    .and_then(non_empty);

  let contact = TidiedContact {
    name: clean_value(raw.get("contact_name")),
    line1: parsed.line1,
    line2: parsed.line2,
    city: parsed.city,
    postcode: parsed.postcode,
    telephone,
    fax,
    email: clean_value(raw.get("email")),
    website: clean_value(raw.get("website")),
  };

  TidiedAsset {
    asset_id: raw.asset_id.clone(),
    owner_id: clean_value(raw.get("owner_id")),
    description: clean_value(raw.get("description")).unwrap_or_default(),
    location: clean_value(raw.get("location")).unwrap_or_default(),
    category: clean_value(raw.get("category")).unwrap_or_default(),
    access_details: clean_value(raw.get("access_details")),
    contact,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  // ── Phone normalisation ─────────────────────────────────────────────────

  #[test]
  fn normalize_phone_strips_spacing_and_prefix() {
    assert_eq!(normalize_phone("+44 207 123 4567"), "02071234567");
    assert_eq!(normalize_phone("0044 207 123 4567"), "02071234567");
    assert_eq!(normalize_phone("0207 1234567"), "02071234567");
    assert_eq!(normalize_phone("0207-123-4567"), "02071234567");
  }

  #[test]
  fn normalize_phone_drops_stray_characters() {
    assert_eq!(normalize_phone("(0207) 123 4567"), "02071234567");
    assert_eq!(normalize_phone(""), "");
  }

  #[test]
  fn equivalent_formats_normalise_identically() {
    let forms = ["+44 207 123 4567", "0207 1234567", "02071234567"];
    for form in forms {
      assert_eq!(normalize_phone(form), "02071234567", "input {form:?}");
    }
  }

  // ── Phone extraction ────────────────────────────────────────────────────

  #[test]
  fn extracts_phone_after_postcode() {
    let (addr, phone) = extract_phone("LONDON, EC4A 1LT, 0207 831 9222");
    assert_eq!(addr, "LONDON, EC4A 1LT");
    assert_eq!(phone.as_deref(), Some("02078319222"));
  }

  #[test]
  fn keeps_first_of_alternative_numbers() {
    let (addr, phone) =
      extract_phone("BASINGSTOKE, RG21 4EQ, 01256 406300 or 0207 236 4232");
    assert_eq!(addr, "BASINGSTOKE, RG21 4EQ");
    assert_eq!(phone.as_deref(), Some("01256406300"));
  }

  #[test]
  fn anchors_on_last_postcode() {
    // Two postcodes; only a number after the second one is extracted.
    let (addr, phone) = extract_phone("EC4A 1LT, YORK, YO1 7HH, 01904 557216");
    assert_eq!(addr, "EC4A 1LT, YORK, YO1 7HH");
    assert_eq!(phone.as_deref(), Some("01904557216"));
  }

  #[test]
  fn no_postcode_takes_trailing_phone_only() {
    let (addr, phone) = extract_phone("The Old Rectory, 01904 557216");
    assert_eq!(addr, "The Old Rectory");
    assert_eq!(phone.as_deref(), Some("01904557216"));
  }

  #[test]
  fn without_postcode_an_embedded_phone_is_left_alone() {
    let input = "Call 01904 557216 for entry, The Old Rectory";
    let (addr, phone) = extract_phone(input);
    assert_eq!(addr, input);
    assert!(phone.is_none());
  }

  #[test]
  fn address_without_phone_is_unchanged() {
    let (addr, phone) = extract_phone("LONDON, EC4A 1LT");
    assert_eq!(addr, "LONDON, EC4A 1LT");
    assert!(phone.is_none());
  }

  // ── Phone dedupe ────────────────────────────────────────────────────────

  #[test]
  fn telephone_field_wins_over_other_sources() {
    let phone = dedupe_phone(
      Some("0207 831 9222"),
      Some("01256 406300"),
      Some("01904 557216"),
    );
    assert_eq!(phone.as_deref(), Some("01256406300"));
  }

  #[test]
  fn short_candidates_lose_to_a_full_length_one() {
    // The explicit field is a truncated number; the address-derived one is
    // complete and should win.
    let phone = dedupe_phone(Some("0207 831 9222"), Some("0207 831"), None);
    assert_eq!(phone.as_deref(), Some("02078319222"));
  }

  #[test]
  fn all_short_falls_back_to_first_candidate() {
    let phone = dedupe_phone(Some("831 9222"), Some("406 300"), None);
    assert_eq!(phone.as_deref(), Some("406300"));
  }

  #[test]
  fn no_candidates_yields_none() {
    assert!(dedupe_phone(None, None, None).is_none());
    assert!(dedupe_phone(Some(""), None, Some("")).is_none());
  }

  // ── Address parsing ─────────────────────────────────────────────────────

  #[test]
  fn single_part_is_line1() {
    let parsed = parse_address("The Manor House");
    assert_eq!(parsed.line1.as_deref(), Some("The Manor House"));
    assert!(parsed.line2.is_none());
    assert!(parsed.city.is_none());
  }

  #[test]
  fn two_parts_are_line1_and_city() {
    let parsed = parse_address("The Manor House, YORK");
    assert_eq!(parsed.line1.as_deref(), Some("The Manor House"));
    assert_eq!(parsed.city.as_deref(), Some("YORK"));
  }

  #[test]
  fn three_parts_fill_both_lines() {
    let parsed = parse_address("The Manor House, Main Street, YORK");
    assert_eq!(parsed.line1.as_deref(), Some("The Manor House"));
    assert_eq!(parsed.line2.as_deref(), Some("Main Street"));
    assert_eq!(parsed.city.as_deref(), Some("YORK"));
  }

  #[test]
  fn postcode_is_lifted_out_and_uppercased() {
    let parsed = parse_address("The Manor House, YORK, yo1 7hh");
    assert_eq!(parsed.postcode.as_deref(), Some("YO1 7HH"));
    assert_eq!(parsed.city.as_deref(), Some("YORK"));
  }

  #[test]
  fn trailing_county_is_discarded() {
    let parsed =
      parse_address("Estate Office, The Manor House, Main Street, YORK, NORTH YORKSHIRE");
    assert_eq!(parsed.line1.as_deref(), Some("Estate Office"));
    assert_eq!(parsed.line2.as_deref(), Some("The Manor House, Main Street"));
    assert_eq!(parsed.city.as_deref(), Some("YORK"));
  }

  #[test]
  fn four_parts_without_county_keep_last_as_city() {
    let parsed = parse_address("Estate Office, The Manor House, Main Street, YORK");
    assert_eq!(parsed.line1.as_deref(), Some("Estate Office"));
    assert_eq!(parsed.line2.as_deref(), Some("The Manor House, Main Street"));
    assert_eq!(parsed.city.as_deref(), Some("YORK"));
  }

  #[test]
  fn empty_address_parses_to_nothing() {
    assert_eq!(parse_address(""), ParsedAddress::default());
  }

  // ── Scalar cleaning ─────────────────────────────────────────────────────

  #[test]
  fn clean_value_trims_and_drops_empty() {
    assert_eq!(clean_value(Some(&json!("  hello "))).as_deref(), Some("hello"));
    assert!(clean_value(Some(&json!("   "))).is_none());
    assert!(clean_value(Some(&json!(null))).is_none());
    assert!(clean_value(None).is_none());
  }

  #[test]
  fn clean_value_formats_whole_floats_as_integers() {
    assert_eq!(clean_value(Some(&json!(12345.0))).as_deref(), Some("12345"));
    assert_eq!(clean_value(Some(&json!(12345))).as_deref(), Some("12345"));
    assert_eq!(clean_value(Some(&json!(1.5))).as_deref(), Some("1.5"));
  }

  // ── Full tidy ───────────────────────────────────────────────────────────

  fn sample_record() -> RawRecord {
    RawRecord::new("12345")
      .with_field("description", "A medieval church bell ")
      .with_field("location", "York")
      .with_field("category", "Artefact")
      .with_field("owner_id", 271.0)
      .with_field("access_details", "By appointment only")
      .with_field("contact_name", "Estate Office")
      .with_field(
        "contact_address",
        "The Manor House, Main Street, YORK, YO1 7HH, 01904 557216",
      )
      .with_field("telephone_no", "")
      .with_field("email", "office@example.org")
  }

  #[test]
  fn tidy_produces_canonical_record() {
    let tidied = tidy(&sample_record());

    assert_eq!(tidied.asset_id, "12345");
    assert_eq!(tidied.owner_id.as_deref(), Some("271"));
    assert_eq!(tidied.description, "A medieval church bell");
    assert_eq!(tidied.location, "York");
    assert_eq!(tidied.category, "Artefact");
    assert_eq!(tidied.access_details.as_deref(), Some("By appointment only"));

    assert_eq!(tidied.contact.name.as_deref(), Some("Estate Office"));
    assert_eq!(tidied.contact.line1.as_deref(), Some("The Manor House"));
    assert_eq!(tidied.contact.line2.as_deref(), Some("Main Street"));
    assert_eq!(tidied.contact.city.as_deref(), Some("YORK"));
    assert_eq!(tidied.contact.postcode.as_deref(), Some("YO1 7HH"));
    // The address-derived number is used because the explicit field is blank.
    assert_eq!(tidied.contact.telephone.as_deref(), Some("01904557216"));
    assert!(tidied.contact.fax.is_none());
    assert_eq!(tidied.contact.email.as_deref(), Some("office@example.org"));
    assert!(tidied.contact.website.is_none());
  }

  #[test]
  fn tidy_defaults_missing_identity_fields_to_empty() {
    let tidied = tidy(&RawRecord::new("99"));
    assert_eq!(tidied.description, "");
    assert_eq!(tidied.location, "");
    assert_eq!(tidied.category, "");
    assert!(tidied.owner_id.is_none());
    assert_eq!(tidied.contact, TidiedContact::default());
  }
}
