//! Request body for `Put Block List`, serialised via `quick-xml` and `serde`.

use boxpub::store::{BlockListEntry, BlockStatus};
use serde::Serialize;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

#[derive(Serialize)]
#[serde(rename = "BlockList")]
struct BlockList<'a> {
    #[serde(rename = "Latest", default)]
    latest: Vec<&'a str>,
}

/// Render the ordered block list as the XML body Azure expects.
///
/// # Errors
///
/// Returns [`quick_xml::SeError`] if the list cannot be serialised.
///
/// # Examples
///
/// ```
/// use boxpub::store::BlockListEntry;
/// use boxpub::upload::BlockId;
/// use boxpub_publisher::azure::block_list_xml;
///
/// let xml = block_list_xml(&[BlockListEntry::latest(BlockId::for_index(0))]).unwrap();
/// assert!(xml.ends_with("<BlockList><Latest>MDAwMDAwMDAwMDA=</Latest></BlockList>"));
/// ```
pub fn block_list_xml(blocks: &[BlockListEntry]) -> Result<String, quick_xml::SeError> {
    let latest = blocks
        .iter()
        .map(|entry| match entry.status {
            BlockStatus::Latest => entry.id.as_str(),
        })
        .collect();
    let body = quick_xml::se::to_string(&BlockList { latest })?;
    Ok(format!("{XML_DECLARATION}{body}"))
}
