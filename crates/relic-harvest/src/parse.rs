//! HTML extraction for the register's listing and detail pages.
//!
//! The pages are table soup from a very old servlet application, so the
//! extractors work positionally: listing rows are `<tr align="left"
//! valign="top">` with at least four cells, and detail fields are found by
//! locating a label cell and taking the text of the cell that follows it.
//! A row or label that does not match is skipped, never an error.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// Owner links look like `...?Owner=271.2&...`.
static OWNER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"Owner=([0-9.]+)&").expect("owner pattern"));

/// Owner id recorded when the detail page has no owner link at all.
pub const SINGLE_OWNER: &str = "single owner";

fn selector(css: &str) -> Selector {
  Selector::parse(css).expect("static selector")
}

// ─── Listing page ────────────────────────────────────────────────────────────

/// One row of the register's listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSummary {
  pub asset_id:    String,
  pub description: String,
  pub location:    String,
  pub category:    String,
}

/// Parse the listing page into summaries.
///
/// Rows without at least four cells, without a detail link, or without a
/// numeric id in that link are skipped individually; one malformed row
/// never aborts the listing.
pub fn parse_summaries(html: &str) -> Vec<AssetSummary> {
  let doc = Html::parse_document(html);
  let row_sel = selector(r#"tr[align="left"][valign="top"]"#);
  let cell_sel = selector("td");
  let link_sel = selector("a");

  let mut summaries = Vec::new();
  for row in doc.select(&row_sel) {
    let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
    if cells.len() < 4 {
      continue;
    }

    let Some(href) = cells[0]
      .select(&link_sel)
      .next()
      .and_then(|a| a.value().attr("href"))
    else {
      continue;
    };

    let Some(asset_id) = asset_id_from_href(href) else {
      warn!(href, "listing row without a usable asset id");
      continue;
    };

    summaries.push(AssetSummary {
      asset_id,
      description: cell_text(&cells[1]),
      location: cell_text(&cells[2]),
      category: cell_text(&cells[3]),
    });
  }

  summaries
}

/// Pull the numeric id out of a detail-page href (`...?ID=12345&...`).
fn asset_id_from_href(href: &str) -> Option<String> {
  let (_, rest) = href.split_once("ID=")?;
  let id = rest.split('&').next().unwrap_or_default();
  (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
    .then(|| id.to_string())
}

// ─── Detail page ─────────────────────────────────────────────────────────────

/// Labelled fields from one asset's detail page. Absent labels come back as
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetDetails {
  pub asset_id:          String,
  pub owner_id:          String,
  pub access_details:    String,
  pub contact_name:      String,
  pub contact_address:   String,
  pub contact_reference: String,
  pub telephone_no:      String,
  pub fax_no:            String,
  pub email:             String,
  pub website:           String,
}

/// Extract the labelled fields of a detail page.
pub fn parse_details(asset_id: &str, html: &str) -> AssetDetails {
  let doc = Html::parse_document(html);
  let cell_sel = selector("td");
  let link_sel = selector("a");

  let cells: Vec<ElementRef<'_>> = doc.select(&cell_sel).collect();

  // The cell following the one that carries the label text.
  let labelled = |label: &str| -> String {
    cells
      .iter()
      .position(|cell| cell_text(cell) == label)
      .and_then(|i| cells.get(i + 1))
      .map(cell_text)
      .unwrap_or_default()
  };

  // Website is a link, not a text cell: the first anchor after the label.
  let website = cells
    .iter()
    .position(|cell| cell_text(cell) == "Web Site(s):")
    .and_then(|i| {
      cells[i + 1..]
        .iter()
        .find_map(|cell| cell.select(&link_sel).next())
    })
    .and_then(|a| a.value().attr("href"))
    .unwrap_or_default()
    .trim()
    .to_string();

  let owner_id = doc
    .select(&selector(r#"a[href*="Owner="]"#))
    .next()
    .and_then(|a| a.value().attr("href"))
    .and_then(|href| OWNER_RE.captures(href))
    .map(|c| c[1].to_string())
    .unwrap_or_else(|| SINGLE_OWNER.to_string());

  AssetDetails {
    asset_id: asset_id.to_string(),
    owner_id,
    access_details: labelled("Access Details:"),
    contact_name: labelled("Contact Name:"),
    contact_address: labelled("Contact Address:"),
    contact_reference: labelled("Contact Reference:"),
    telephone_no: labelled("Telephone No:"),
    fax_no: labelled("Fax Number:"),
    email: labelled("Email:"),
    website,
  }
}

/// Cell text with whitespace collapsed, the way the register's nested
/// markup needs it.
fn cell_text(cell: &ElementRef<'_>) -> String {
  cell
    .text()
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  const LISTING: &str = r#"
    <html><body><table>
      <tr align="left" valign="top">
        <td><a href="CtoDetailServlet?ID=12345&class=1">view</a></td>
        <td>A medieval
            church bell</td>
        <td>York</td>
        <td>Artefact</td>
      </tr>
      <tr align="left" valign="top">
        <td><a href="CtoDetailServlet?ID=not-a-number">view</a></td>
        <td>Broken link row</td><td>Leeds</td><td>Artefact</td>
      </tr>
      <tr align="left" valign="top">
        <td>no link here</td>
        <td>Linkless row</td><td>Leeds</td><td>Artefact</td>
      </tr>
      <tr align="left" valign="top">
        <td>too few cells</td>
      </tr>
      <tr>
        <td><a href="CtoDetailServlet?ID=777&class=1">view</a></td>
        <td>Not a data row</td><td>Hull</td><td>Artefact</td>
      </tr>
    </table></body></html>"#;

  #[test]
  fn listing_parses_good_rows_and_skips_bad_ones() {
    let summaries = parse_summaries(LISTING);
    assert_eq!(summaries.len(), 1);
    assert_eq!(
      summaries[0],
      AssetSummary {
        asset_id:    "12345".into(),
        description: "A medieval church bell".into(),
        location:    "York".into(),
        category:    "Artefact".into(),
      }
    );
  }

  #[test]
  fn listing_of_garbage_is_empty_not_an_error() {
    assert!(parse_summaries("<html><p>maintenance page</p></html>").is_empty());
  }

  #[test]
  fn href_id_extraction_requires_digits() {
    assert_eq!(asset_id_from_href("x?ID=12345&y=1").as_deref(), Some("12345"));
    assert_eq!(asset_id_from_href("x?ID=12345").as_deref(), Some("12345"));
    assert!(asset_id_from_href("x?ID=12a45&y=1").is_none());
    assert!(asset_id_from_href("x?ID=&y=1").is_none());
    assert!(asset_id_from_href("x?nothing=here").is_none());
  }

  const DETAIL: &str = r#"
    <html><body><table>
      <tr><td>Access Details:</td><td>By appointment only</td></tr>
      <tr><td>Contact Name:</td><td>Estate Office</td></tr>
      <tr><td>Contact Address:</td>
          <td>The Manor House, YORK, YO1 7HH, 01904 557216</td></tr>
      <tr><td>Telephone No:</td><td>01904 557216</td></tr>
      <tr><td>Email:</td><td>office@example.org</td></tr>
      <tr><td>Owner:</td>
          <td><a href="CtoOwnerServlet?Owner=271.2&class=1">owner</a></td></tr>
      <tr><td>Web Site(s):</td>
          <td><a href="http://www.example.org/ ">site</a></td></tr>
    </table></body></html>"#;

  #[test]
  fn detail_extracts_labelled_cells() {
    let details = parse_details("12345", DETAIL);
    assert_eq!(details.asset_id, "12345");
    assert_eq!(details.owner_id, "271.2");
    assert_eq!(details.access_details, "By appointment only");
    assert_eq!(details.contact_name, "Estate Office");
    assert_eq!(
      details.contact_address,
      "The Manor House, YORK, YO1 7HH, 01904 557216"
    );
    assert_eq!(details.telephone_no, "01904 557216");
    assert_eq!(details.email, "office@example.org");
    assert_eq!(details.website, "http://www.example.org/");
  }

  #[test]
  fn absent_labels_yield_empty_strings() {
    let details = parse_details("12345", "<html><table></table></html>");
    assert_eq!(details.owner_id, SINGLE_OWNER);
    assert_eq!(details.access_details, "");
    assert_eq!(details.fax_no, "");
    assert_eq!(details.website, "");
  }
}
