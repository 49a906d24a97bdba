//! Field-level comparison of two tidied assets.
//!
//! The comparison list is fixed and explicit: adding a field to
//! [`TidiedAsset`] without teaching the differ about it would silently
//! exempt it from change tracking, so the list lives here in one place.

use crate::asset::TidiedAsset;

/// Every field the differ inspects, in report order.
pub const COMPARED_FIELDS: [&str; 14] = [
  "owner_id",
  "description",
  "location",
  "category",
  "access_details",
  "contact_name",
  "address_line1",
  "address_line2",
  "address_city",
  "address_postcode",
  "telephone",
  "fax",
  "email",
  "website",
];

/// Compare two tidied assets and return the names of the fields that
/// differ, in [`COMPARED_FIELDS`] order. Empty means equivalent. Absent
/// versus present counts as a difference.
pub fn diff(old: &TidiedAsset, new: &TidiedAsset) -> Vec<&'static str> {
  let mut changed = Vec::new();

  if old.owner_id != new.owner_id {
    changed.push("owner_id");
  }
  if old.description != new.description {
    changed.push("description");
  }
  if old.location != new.location {
    changed.push("location");
  }
  if old.category != new.category {
    changed.push("category");
  }
  if old.access_details != new.access_details {
    changed.push("access_details");
  }

  let (oc, nc) = (&old.contact, &new.contact);
  if oc.name != nc.name {
    changed.push("contact_name");
  }
  if oc.line1 != nc.line1 {
    changed.push("address_line1");
  }
  if oc.line2 != nc.line2 {
    changed.push("address_line2");
  }
  if oc.city != nc.city {
    changed.push("address_city");
  }
  if oc.postcode != nc.postcode {
    changed.push("address_postcode");
  }
  if oc.telephone != nc.telephone {
    changed.push("telephone");
  }
  if oc.fax != nc.fax {
    changed.push("fax");
  }
  if oc.email != nc.email {
    changed.push("email");
  }
  if oc.website != nc.website {
    changed.push("website");
  }

  changed
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{raw::RawRecord, tidy::tidy};

  fn asset(category: &str) -> TidiedAsset {
    TidiedAsset {
      asset_id: "A1".into(),
      description: "Bell".into(),
      location: "York".into(),
      category: category.into(),
      ..Default::default()
    }
  }

  #[test]
  fn identical_assets_diff_empty() {
    assert!(diff(&asset("Artefact"), &asset("Artefact")).is_empty());
  }

  #[test]
  fn tidy_is_a_diff_fixed_point() {
    let raw = RawRecord::new("7")
      .with_field("description", " Bell ")
      .with_field(
        "contact_address",
        "The Manor House, YORK, YO1 7HH, 01904 557216",
      );
    assert!(diff(&tidy(&raw), &tidy(&raw)).is_empty());
  }

  #[test]
  fn changed_category_is_reported() {
    assert_eq!(diff(&asset("Artefact"), &asset("Relic")), vec!["category"]);
  }

  #[test]
  fn absent_versus_present_is_a_difference() {
    let old = asset("Artefact");
    let mut new = asset("Artefact");
    new.contact.telephone = Some("02071234567".into());
    assert_eq!(diff(&old, &new), vec!["telephone"]);
  }

  #[test]
  fn report_order_follows_the_fixed_list() {
    let old = asset("Artefact");
    let mut new = asset("Relic");
    new.owner_id = Some("271".into());
    new.contact.email = Some("office@example.org".into());

    let changed = diff(&old, &new);
    assert_eq!(changed, vec!["owner_id", "category", "email"]);

    // Everything reported must come from the published list.
    for name in &changed {
      assert!(COMPARED_FIELDS.contains(name));
    }
  }
}
